use config::shared::MissingFilePolicy;
use edne::error::ErrorKind;
use edne::pipeline::{Importer, Phase, PhaseSelection};
use edne::store::Store;
use edne::store::memory::MemoryStore;
use edne::tables::{ALL_TABLES, LOG_BAIRRO, LOG_LOCALIDADE, LOG_LOGRADOURO, cep_tables};
use edne::test_utils::fixtures::{EdneFiles, SAMPLE_CEPS, SAMPLE_ROWS};
use telemetry::tracing::init_test_tracing;

fn importer(files: &EdneFiles, policy: MissingFilePolicy) -> Importer<MemoryStore> {
    Importer::new(files.import_config(policy), MemoryStore::new())
}

#[tokio::test(flavor = "multi_thread")]
async fn full_import_loads_every_table() {
    init_test_tracing();

    let files = EdneFiles::new();
    files.write_sample_snapshot();
    files.write_empty_deltas();

    let importer = importer(&files, MissingFilePolicy::Strict);
    let summary = importer.run().await.unwrap();

    assert_eq!(summary.total_records, SAMPLE_ROWS);
    assert_eq!(summary.total_ceps, SAMPLE_CEPS);

    let snapshot = summary.phase(Phase::Snapshot).unwrap();
    assert_eq!(snapshot.files.len(), 16);
    assert_eq!(snapshot.total_lines(), SAMPLE_ROWS);
    let delta = summary.phase(Phase::Delta).unwrap();
    assert_eq!(delta.files.len(), 11);
    assert_eq!(delta.total_lines(), 0);

    let logradouro = importer.store().rows(&LOG_LOGRADOURO).await;
    assert_eq!(logradouro.len(), 1);
    assert_eq!(logradouro[0].get(6), Some("- lado ímpar"));
}

#[tokio::test(flavor = "multi_thread")]
async fn locality_without_cep_is_not_counted_as_a_cep() {
    init_test_tracing();

    let files = EdneFiles::new();
    files.write_sample_snapshot();

    let importer = importer(&files, MissingFilePolicy::Lenient);
    let summary = importer.run().await.unwrap();

    let store = importer.store();
    let sao_paulo = store.get(&LOG_LOCALIDADE, &["96"]).await.unwrap();
    assert_eq!(sao_paulo.get(3), None);

    let mut cep_rows = 0;
    for table in cep_tables() {
        cep_rows += store.count_rows(table).await.unwrap();
    }
    assert_eq!(cep_rows, SAMPLE_CEPS + 1);
    assert_eq!(summary.total_ceps, SAMPLE_CEPS);
}

#[tokio::test(flavor = "multi_thread")]
async fn finished_run_is_recorded() {
    init_test_tracing();

    let files = EdneFiles::new();
    files.write_sample_snapshot();
    files.write_empty_deltas();

    let importer = importer(&files, MissingFilePolicy::Strict);
    importer.run().await.unwrap();

    let runs = importer.store().runs().await;
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].total_records, SAMPLE_ROWS as i64);
    assert_eq!(runs[0].total_ceps, SAMPLE_CEPS as i64);
    assert_eq!(runs[0].edne_version.as_deref(), Some("2024-test"));
    assert_eq!(
        runs[0].notes.as_deref(),
        Some("snapshot: 16 files, 17 lines; delta: 11 files, 0 lines")
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn running_the_snapshot_twice_is_idempotent() {
    init_test_tracing();

    let files = EdneFiles::new();
    files.write_sample_snapshot();

    let importer = importer(&files, MissingFilePolicy::Lenient)
        .with_phases(PhaseSelection::SnapshotOnly);

    let first = importer.run().await.unwrap();
    let mut rows_after_first = vec![];
    for table in ALL_TABLES {
        rows_after_first.push(importer.store().rows(table).await);
    }

    let second = importer.run().await.unwrap();
    let mut rows_after_second = vec![];
    for table in ALL_TABLES {
        rows_after_second.push(importer.store().rows(table).await);
    }

    assert_eq!(first.total_records, second.total_records);
    assert_eq!(first.total_ceps, second.total_ceps);
    assert_eq!(rows_after_first, rows_after_second);
    assert_eq!(importer.store().runs().await.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_files_are_skipped_when_lenient() {
    init_test_tracing();

    let files = EdneFiles::new();
    files.write_snapshot("LOG_BAIRRO.TXT", &["1@SP@96@Centro@"]);

    let importer = importer(&files, MissingFilePolicy::Lenient);
    let summary = importer.run().await.unwrap();

    assert_eq!(summary.total_records, 1);
    assert_eq!(summary.total_ceps, 0);
    assert_eq!(summary.phase(Phase::Snapshot).unwrap().files.len(), 1);
    assert!(summary.phase(Phase::Delta).unwrap().files.is_empty());

    for table in ALL_TABLES {
        assert!(importer.store().has_table(table).await, "{} missing", table.name);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_files_fail_the_run_when_strict() {
    init_test_tracing();

    let files = EdneFiles::new();
    files.write_snapshot("LOG_BAIRRO.TXT", &["1@SP@96@Centro@"]);

    let importer = importer(&files, MissingFilePolicy::Strict);
    let err = importer.run().await.unwrap_err();

    assert_eq!(err.error_count(), 15);
    assert!(err.kinds().iter().all(|kind| *kind == ErrorKind::MissingFile));

    // Nothing is loaded when any file of the phase is missing.
    assert_eq!(importer.store().count_rows(&LOG_BAIRRO).await.unwrap(), 0);
    assert!(importer.store().runs().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_snapshot_skips_the_delta_phase() {
    init_test_tracing();

    let files = EdneFiles::new();
    files.write_snapshot("LOG_BAIRRO.TXT", &["1@SP@96@Centro@", "2@SP@96"]);
    files.write_delta("DELTA_LOG_BAIRRO.TXT", &["3@SP@96@Luz@@INS"]);

    let importer = importer(&files, MissingFilePolicy::Lenient);
    let err = importer.run().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidData);
    assert!(err.to_string().contains("LOG_BAIRRO.TXT line 2"));

    let store = importer.store();
    assert!(store.get(&LOG_BAIRRO, &["1"]).await.is_some());
    assert!(store.get(&LOG_BAIRRO, &["3"]).await.is_none());
    assert!(store.runs().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn delta_only_run_skips_snapshot_files() {
    init_test_tracing();

    let files = EdneFiles::new();
    files.write_snapshot("LOG_BAIRRO.TXT", &["1@SP@96@Centro@"]);
    files.write_delta("DELTA_LOG_BAIRRO.TXT", &["3@SP@96@Luz@@INS"]);

    let importer = importer(&files, MissingFilePolicy::Lenient)
        .with_phases(PhaseSelection::DeltaOnly);
    let summary = importer.run().await.unwrap();

    assert!(summary.phase(Phase::Snapshot).is_none());
    assert_eq!(summary.total_records, 1);
    assert!(importer.store().get(&LOG_BAIRRO, &["3"]).await.is_some());
}
