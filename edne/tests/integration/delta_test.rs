use config::shared::MissingFilePolicy;
use edne::error::ErrorKind;
use edne::pipeline::{Importer, Phase};
use edne::store::Store;
use edne::store::memory::MemoryStore;
use edne::tables::{
    LOG_BAIRRO, LOG_FAIXA_BAIRRO, LOG_FAIXA_LOCALIDADE, LOG_GRANDE_USUARIO, LOG_LOCALIDADE,
};
use edne::test_utils::fixtures::EdneFiles;
use telemetry::tracing::init_test_tracing;

fn importer(files: &EdneFiles) -> Importer<MemoryStore> {
    Importer::new(
        files.import_config(MissingFilePolicy::Lenient),
        MemoryStore::new(),
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn row_count_reflects_inserts_and_deletes() {
    init_test_tracing();

    let files = EdneFiles::new();
    files.write_snapshot(
        "LOG_BAIRRO.TXT",
        &["1@SP@96@Centro@", "2@SP@96@Sé@", "3@SP@96@Liberdade@"],
    );
    files.write_delta(
        "DELTA_LOG_BAIRRO.TXT",
        &[
            "4@SP@96@Luz@@INS",
            "5@SP@96@Brás@@INS",
            "2@SP@96@Sé Nova@@UPD",
            "3@SP@96@Liberdade@@DEL",
        ],
    );

    let importer = importer(&files);
    let summary = importer.run().await.unwrap();

    assert_eq!(summary.total_records, 3 + 2 - 1);

    let delta = summary.phase(Phase::Delta).unwrap();
    assert_eq!(delta.files.len(), 1);
    let report = &delta.files[0];
    assert_eq!(
        (report.inserts, report.updates, report.deletes),
        (2, 1, 1)
    );

    let store = importer.store();
    assert_eq!(store.get(&LOG_BAIRRO, &["2"]).await.unwrap().get(3), Some("Sé Nova"));
    assert!(store.get(&LOG_BAIRRO, &["3"]).await.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn insert_then_delete_leaves_no_row() {
    init_test_tracing();

    let files = EdneFiles::new();
    files.write_delta(
        "DELTA_LOG_BAIRRO.TXT",
        &["9@SP@96@Pari@@INS", "9@SP@96@Pari@@DEL"],
    );

    let importer = importer(&files);
    let summary = importer.run().await.unwrap();

    assert_eq!(summary.total_records, 0);
    assert!(importer.store().get(&LOG_BAIRRO, &["9"]).await.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn update_splices_the_replacement_cep() {
    init_test_tracing();

    let files = EdneFiles::new();
    files.write_snapshot(
        "LOG_LOCALIDADE.TXT",
        &["96@SP@São Paulo@@0@M@@S Paulo@3550308"],
    );
    files.write_delta(
        "DELTA_LOG_LOCALIDADE.TXT",
        &["96@SP@São Paulo@@0@M@@S Paulo@3550308@UPD@01000000"],
    );

    let importer = importer(&files);
    let summary = importer.run().await.unwrap();

    assert_eq!(summary.total_ceps, 1);
    let row = importer
        .store()
        .get(&LOG_LOCALIDADE, &["96"])
        .await
        .unwrap();
    assert_eq!(row.get(3), Some("01000000"));
    assert_eq!(row.get(2), Some("São Paulo"));
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_matches_the_reappended_key_column() {
    init_test_tracing();

    let files = EdneFiles::new();
    files.write_snapshot(
        "LOG_FAIXA_LOCALIDADE.TXT",
        &["96@01000000@05999999@C", "96@01000000@05999999@D"],
    );
    files.write_delta(
        "DELTA_LOG_FAIXA_LOCALIDADE.TXT",
        &["96@01000000@05999999@DEL@C"],
    );

    let importer = importer(&files);
    importer.run().await.unwrap();

    let store = importer.store();
    assert!(
        store
            .get(&LOG_FAIXA_LOCALIDADE, &["96", "01000000", "C"])
            .await
            .is_none()
    );
    assert!(
        store
            .get(&LOG_FAIXA_LOCALIDADE, &["96", "01000000", "D"])
            .await
            .is_some()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_with_a_different_key_value_is_a_no_op() {
    init_test_tracing();

    let files = EdneFiles::new();
    files.write_snapshot("LOG_FAIXA_BAIRRO.TXT", &["1@01001000@01099999"]);
    files.write_delta("DELTA_LOG_FAIXA_BAI.TXT", &["1@01001001@01099999@DEL"]);

    let importer = importer(&files);
    let summary = importer.run().await.unwrap();

    assert_eq!(summary.phase(Phase::Delta).unwrap().total_deletes(), 1);
    assert_eq!(
        importer.store().count_rows(&LOG_FAIXA_BAIRRO).await.unwrap(),
        1
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn discarded_trailer_is_not_stored() {
    init_test_tracing();

    let files = EdneFiles::new();
    files.write_delta(
        "DELTA_LOG_GRANDE_USUARIO.TXT",
        &["7@SP@96@1@@Banco Central@Av Paulista 1804@01310200@BC@INS@99999999"],
    );

    let importer = importer(&files);
    let summary = importer.run().await.unwrap();

    assert_eq!(summary.total_ceps, 1);
    let row = importer
        .store()
        .get(&LOG_GRANDE_USUARIO, &["7"])
        .await
        .unwrap();
    assert_eq!(row.len(), LOG_GRANDE_USUARIO.columns.len());
    assert_eq!(row.get(7), Some("01310200"));
}

#[tokio::test(flavor = "multi_thread")]
async fn unsupported_operation_fails_the_run_after_other_files_finish() {
    init_test_tracing();

    let files = EdneFiles::new();
    files.write_delta(
        "DELTA_LOG_BAIRRO.TXT",
        &["1@SP@96@Centro@@INS", "2@SP@96@Luz@@MRG", "3@SP@96@Brás@@INS"],
    );
    files.write_delta("DELTA_LOG_FAIXA_BAIRRO.TXT", &["1@01001000@01099999@INS"]);

    let importer = importer(&files);
    let err = importer.run().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
    assert!(err.to_string().contains("DELTA_LOG_BAIRRO.TXT line 2"));

    let store = importer.store();
    assert!(store.get(&LOG_BAIRRO, &["1"]).await.is_some());
    assert!(store.get(&LOG_BAIRRO, &["3"]).await.is_none());
    assert_eq!(store.count_rows(&LOG_FAIXA_BAIRRO).await.unwrap(), 1);
    assert!(store.runs().await.is_empty());
}
