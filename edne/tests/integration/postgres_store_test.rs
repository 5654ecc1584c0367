use config::shared::MissingFilePolicy;
use edne::error::{ErrorKind, ImportError};
use edne::pipeline::Importer;
use edne::record::Record;
use edne::store::Store;
use edne::store::postgres::IMPORT_REPORT_TABLE;
use edne::tables::{LOG_BAIRRO, LOG_FAIXA_BAIRRO, LOG_LOCALIDADE};
use edne::test_utils::database::{TEST_SCHEMA, spawn_test_database};
use edne::test_utils::fixtures::{EdneFiles, SAMPLE_CEPS, SAMPLE_ROWS};
use telemetry::tracing::init_test_tracing;

fn record(values: &[Option<&str>]) -> Record {
    Record::new(values.iter().map(|v| v.map(str::to_string)).collect())
}

#[tokio::test(flavor = "multi_thread")]
async fn import_into_postgres_is_repeatable() {
    init_test_tracing();

    let Some(database) = spawn_test_database().await else {
        eprintln!("TESTS_DATABASE_HOST is not set, skipping");
        return;
    };

    let files = EdneFiles::new();
    files.write_sample_snapshot();
    files.write_delta(
        "DELTA_LOG_BAIRRO.TXT",
        &["2@SP@96@Luz@@INS", "1@SP@96@Sé@@DEL"],
    );

    let mut config = files.import_config(MissingFilePolicy::Lenient);
    config.schema = TEST_SCHEMA.to_string();
    let importer = Importer::new(config, database.store.clone());

    let first = importer.run().await.unwrap();
    let second = importer.run().await.unwrap();

    assert_eq!(first.total_records, SAMPLE_ROWS);
    assert_eq!(first.total_ceps, SAMPLE_CEPS);
    assert_eq!(second.total_records, first.total_records);

    let runs: i64 = database
        .store
        .client()
        .query_one(
            &format!("select count(*) from {TEST_SCHEMA}.{IMPORT_REPORT_TABLE}"),
            &[],
        )
        .await
        .unwrap()
        .get(0);
    assert_eq!(runs, 2);

    database.cleanup().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn numeric_keys_compare_by_value() {
    init_test_tracing();

    let Some(database) = spawn_test_database().await else {
        eprintln!("TESTS_DATABASE_HOST is not set, skipping");
        return;
    };
    let store = &database.store;

    store.prepare().await.unwrap();
    store.create_table(&LOG_FAIXA_BAIRRO).await.unwrap();
    store
        .upsert(
            &LOG_FAIXA_BAIRRO,
            &record(&[Some("7"), Some("01000000"), Some("01099999")]),
        )
        .await
        .unwrap();

    let deleted = store
        .delete(
            &LOG_FAIXA_BAIRRO,
            &[Some("007".to_string()), Some("01000000".to_string())],
        )
        .await
        .unwrap();

    assert_eq!(deleted, 1);
    assert_eq!(store.count_rows(&LOG_FAIXA_BAIRRO).await.unwrap(), 0);

    database.cleanup().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn null_cep_is_stored_as_null() {
    init_test_tracing();

    let Some(database) = spawn_test_database().await else {
        eprintln!("TESTS_DATABASE_HOST is not set, skipping");
        return;
    };
    let store = &database.store;

    store.prepare().await.unwrap();
    store.create_table(&LOG_LOCALIDADE).await.unwrap();
    store
        .upsert(
            &LOG_LOCALIDADE,
            &record(&[
                Some("96"),
                Some("SP"),
                Some("São Paulo"),
                None,
                Some("0"),
                Some("M"),
                None,
                None,
                Some("3550308"),
            ]),
        )
        .await
        .unwrap();

    assert_eq!(store.count_rows(&LOG_LOCALIDADE).await.unwrap(), 1);
    assert_eq!(
        store.count_non_null(&LOG_LOCALIDADE, "cep").await.unwrap(),
        0
    );

    database.cleanup().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn constraint_violations_are_classified() {
    init_test_tracing();

    let Some(database) = spawn_test_database().await else {
        eprintln!("TESTS_DATABASE_HOST is not set, skipping");
        return;
    };
    let store = &database.store;

    store.prepare().await.unwrap();
    store.create_table(&LOG_BAIRRO).await.unwrap();
    let err = store
        .upsert(
            &LOG_BAIRRO,
            &record(&[Some("1"), Some("SP"), Some("96"), None, None]),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);

    database.cleanup().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_schema_is_a_schema_error() {
    init_test_tracing();

    let Some(database) = spawn_test_database().await else {
        eprintln!("TESTS_DATABASE_HOST is not set, skipping");
        return;
    };

    let err: ImportError = database
        .store
        .client()
        .batch_execute("create table missing_schema.log_bairro (bai_nu numeric)")
        .await
        .unwrap_err()
        .into();

    assert_eq!(err.kind(), ErrorKind::StoreSchemaError);

    database.cleanup().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn line_statements_are_prepared_once_per_table() {
    init_test_tracing();

    let Some(database) = spawn_test_database().await else {
        eprintln!("TESTS_DATABASE_HOST is not set, skipping");
        return;
    };
    let store = &database.store;

    store.prepare().await.unwrap();
    store.create_table(&LOG_BAIRRO).await.unwrap();
    for (key, name) in [("1", "Sé"), ("2", "Luz"), ("1", "Sé Nova")] {
        store
            .upsert(
                &LOG_BAIRRO,
                &record(&[Some(key), Some("SP"), Some("96"), Some(name), None]),
            )
            .await
            .unwrap();
    }
    for key in ["2", "3"] {
        store
            .delete(&LOG_BAIRRO, &[Some(key.to_string())])
            .await
            .unwrap();
    }

    let row = store
        .client()
        .query_one(
            "select count(*) from pg_prepared_statements \
             where statement like 'insert into%' or statement like 'delete from%'",
            &[],
        )
        .await
        .unwrap();
    let prepared: i64 = row.get(0);

    assert_eq!(prepared, 2);
    assert_eq!(store.count_rows(&LOG_BAIRRO).await.unwrap(), 1);

    database.cleanup().await;
}
