use std::collections::HashMap;
use std::sync::Arc;

use ::postgres::schema::{TableName, quote_ident};
use config::shared::PgConnectionConfig;
use pg_escape::quote_literal;
use tokio::sync::RwLock;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, Statement};
use tracing::{debug, info};

use crate::error::ImportResult;
use crate::record::{Field, Record};
use crate::report::RunReport;
use crate::store::Store;
use crate::tables::TableSpec;

/// Name of the table that keeps one row per finished run.
pub const IMPORT_REPORT_TABLE: &str = "import_report";

/// Per-line statements, prepared once per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum LineStatement {
    Upsert,
    Delete,
}

/// Store writing into Postgres through a single shared connection.
///
/// All clones share one [`Client`]; statements from concurrent tasks are pipelined on it.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    client: Arc<Client>,
    schema: String,
    statements: Arc<RwLock<HashMap<(&'static str, LineStatement), Statement>>>,
}

impl PostgresStore {
    pub fn new(client: Client, schema: impl Into<String>) -> Self {
        Self {
            client: Arc::new(client),
            schema: schema.into(),
            statements: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Connects to the configured database and returns a store for `schema`.
    pub async fn connect(
        config: &PgConnectionConfig,
        schema: impl Into<String>,
    ) -> ImportResult<Self> {
        let connection = ::postgres::tokio::connect(config).await?;

        if let Some(version) = connection.server_version {
            info!(server_version = version.get(), "postgres server version");
        }

        Ok(Self::new(connection.client, schema))
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn table_name(&self, table: &TableSpec) -> TableName {
        TableName::new(self.schema.as_str(), table.name)
    }

    /// Returns the prepared `kind` statement of `table`, preparing it on first use.
    async fn statement(
        &self,
        table: &'static TableSpec,
        kind: LineStatement,
    ) -> ImportResult<Statement> {
        let cache_key = (table.name, kind);
        if let Some(statement) = self.statements.read().await.get(&cache_key) {
            return Ok(statement.clone());
        }

        let table_name = self.table_name(table);
        let sql = match kind {
            LineStatement::Upsert => upsert_sql(&table_name, table),
            LineStatement::Delete => delete_sql(&table_name, table),
        };
        let statement = self.client.prepare(&sql).await?;
        debug!(%sql, "prepared statement");
        self.statements
            .write()
            .await
            .insert(cache_key, statement.clone());

        Ok(statement)
    }

    async fn execute_fields(
        &self,
        table: &'static TableSpec,
        kind: LineStatement,
        values: &[Field],
    ) -> ImportResult<u64> {
        let statement = self.statement(table, kind).await?;
        let values: Vec<Option<&str>> = values.iter().map(|value| value.as_deref()).collect();
        let params: Vec<&(dyn ToSql + Sync)> = values
            .iter()
            .map(|value| value as &(dyn ToSql + Sync))
            .collect();

        Ok(self.client.execute(&statement, &params).await?)
    }

    async fn query_count(&self, sql: &str) -> ImportResult<u64> {
        let row = self.client.query_one(sql, &[]).await?;
        let count: i64 = row.try_get(0)?;

        Ok(u64::try_from(count).unwrap_or_default())
    }
}

impl Store for PostgresStore {
    fn name() -> &'static str {
        "postgres"
    }

    async fn prepare(&self) -> ImportResult<()> {
        self.client.batch_execute(&prepare_sql(&self.schema)).await?;

        info!(schema = %self.schema, "prepared schema");

        Ok(())
    }

    async fn create_table(&self, table: &'static TableSpec) -> ImportResult<()> {
        let table_name = self.table_name(table);
        self.client
            .batch_execute(&create_table_sql(&table_name, table))
            .await?;

        info!(table = %table_name, "ensured table exists");

        Ok(())
    }

    async fn upsert(&self, table: &'static TableSpec, record: &Record) -> ImportResult<()> {
        self.execute_fields(table, LineStatement::Upsert, record.fields())
            .await?;

        Ok(())
    }

    async fn delete(&self, table: &'static TableSpec, key: &[Field]) -> ImportResult<u64> {
        self.execute_fields(table, LineStatement::Delete, key).await
    }

    async fn count_rows(&self, table: &'static TableSpec) -> ImportResult<u64> {
        let sql = format!(
            "select count(*) from {}",
            self.table_name(table).as_quoted_identifier()
        );
        self.query_count(&sql).await
    }

    async fn count_non_null(
        &self,
        table: &'static TableSpec,
        column: &'static str,
    ) -> ImportResult<u64> {
        let sql = format!(
            "select count({}) from {}",
            quote_ident(column),
            self.table_name(table).as_quoted_identifier()
        );
        self.query_count(&sql).await
    }

    async fn record_run(&self, report: &RunReport) -> ImportResult<()> {
        let report_table = TableName::new(self.schema.as_str(), IMPORT_REPORT_TABLE);
        let sql = format!(
            "insert into {} (total_records, total_ceps, edne_version, duration_ms, notes) \
             values ($1, $2, $3, $4, $5)",
            report_table.as_quoted_identifier()
        );

        self.client
            .execute(
                sql.as_str(),
                &[
                    &report.total_records,
                    &report.total_ceps,
                    &report.edne_version,
                    &report.duration_ms,
                    &report.notes,
                ],
            )
            .await?;

        info!(
            total_records = report.total_records,
            total_ceps = report.total_ceps,
            "recorded import report"
        );

        Ok(())
    }
}

/// Creates the schema and the import report table.
fn prepare_sql(schema: &str) -> String {
    let report_table = TableName::new(schema, IMPORT_REPORT_TABLE);
    format!(
        "create schema if not exists {};\n\
         create table if not exists {} (\n  \
           id bigserial primary key,\n  \
           total_records bigint not null,\n  \
           total_ceps bigint not null,\n  \
           edne_version text,\n  \
           duration_ms bigint not null,\n  \
           notes text,\n  \
           created_at timestamptz not null default now()\n\
         );",
        quote_ident(schema),
        report_table.as_quoted_identifier()
    )
}

fn create_table_sql(table_name: &TableName, table: &TableSpec) -> String {
    let quoted_table = table_name.as_quoted_identifier();

    let mut definitions: Vec<String> = table
        .columns
        .iter()
        .map(|column| {
            let null = if column.nullable { "" } else { " not null" };
            format!(
                "  {} {}{}",
                quote_ident(column.name),
                column.column_type.sql_type(),
                null
            )
        })
        .collect();

    let key_columns: Vec<String> = table
        .key_columns()
        .map(|column| quote_ident(column.name))
        .collect();
    definitions.push(format!("  primary key ({})", key_columns.join(", ")));

    let mut sql = format!(
        "create table if not exists {} (\n{}\n);",
        quoted_table,
        definitions.join(",\n")
    );

    for column in table.columns {
        sql.push_str(&format!(
            "\ncomment on column {}.{} is {};",
            quoted_table,
            quote_ident(column.name),
            quote_literal(column.comment)
        ));
    }

    sql
}

fn upsert_sql(table_name: &TableName, table: &TableSpec) -> String {
    let columns: Vec<String> = table.column_names().map(quote_ident).collect();
    let values: Vec<String> = table
        .columns
        .iter()
        .enumerate()
        .map(|(index, column)| format!("${}{}", index + 1, column.column_type.parameter_cast()))
        .collect();
    let key_columns: Vec<String> = table
        .key_columns()
        .map(|column| quote_ident(column.name))
        .collect();
    let updates: Vec<String> = table
        .non_key_columns()
        .map(|(_, column)| {
            let column = quote_ident(column.name);
            format!("{column} = excluded.{column}")
        })
        .collect();

    let conflict_action = if updates.is_empty() {
        "do nothing".to_string()
    } else {
        format!("do update set {}", updates.join(", "))
    };

    format!(
        "insert into {} ({}) values ({}) on conflict ({}) {}",
        table_name.as_quoted_identifier(),
        columns.join(", "),
        values.join(", "),
        key_columns.join(", "),
        conflict_action
    )
}

fn delete_sql(table_name: &TableName, table: &TableSpec) -> String {
    let conditions: Vec<String> = table
        .key_columns()
        .enumerate()
        .map(|(index, column)| {
            format!(
                "{} = ${}{}",
                quote_ident(column.name),
                index + 1,
                column.column_type.parameter_cast()
            )
        })
        .collect();

    format!(
        "delete from {} where {}",
        table_name.as_quoted_identifier(),
        conditions.join(" and ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{LOG_FAIXA_LOCALIDADE, LOG_FAIXA_UF, LOG_VAR_LOC};

    fn name(table: &TableSpec) -> TableName {
        TableName::new("correios", table.name)
    }

    #[test]
    fn upsert_updates_every_non_key_column() {
        let sql = upsert_sql(&name(&LOG_FAIXA_LOCALIDADE), &LOG_FAIXA_LOCALIDADE);

        assert_eq!(
            sql,
            "insert into correios.log_faixa_localidade \
             (loc_nu, loc_cep_ini, loc_cep_fim, loc_tipo_faixa) \
             values ($1::text::numeric, $2::text, $3::text, $4::text) \
             on conflict (loc_nu, loc_cep_ini, loc_tipo_faixa) \
             do update set loc_cep_fim = excluded.loc_cep_fim"
        );
    }

    #[test]
    fn upsert_without_non_key_columns_does_nothing_on_conflict() {
        let table = TableSpec {
            name: "key_only",
            columns: &LOG_FAIXA_UF.columns[..2],
            primary_key: &[0, 1],
            snapshot: LOG_FAIXA_UF.snapshot,
            delta: None,
        };

        let sql = upsert_sql(&TableName::new("correios", "key_only"), &table);

        assert!(sql.ends_with("on conflict (ufe_sg, ufe_cep_ini) do nothing"));
    }

    #[test]
    fn delete_matches_every_key_column() {
        let sql = delete_sql(&name(&LOG_VAR_LOC), &LOG_VAR_LOC);

        assert_eq!(
            sql,
            "delete from correios.log_var_loc \
             where loc_nu = $1::text::numeric and val_nu = $2::text::numeric"
        );
    }

    #[test]
    fn create_table_declares_key_and_comments() {
        let sql = create_table_sql(&name(&LOG_FAIXA_UF), &LOG_FAIXA_UF);

        assert!(sql.starts_with("create table if not exists correios.log_faixa_uf (\n"));
        assert!(sql.contains("  ufe_sg char(2) not null,\n"));
        assert!(sql.contains("  primary key (ufe_sg, ufe_cep_ini)\n);"));
        assert!(sql.contains(
            "comment on column correios.log_faixa_uf.ufe_sg is 'state abbreviation';"
        ));
    }

    #[test]
    fn prepare_creates_schema_and_report_table() {
        let sql = prepare_sql("correios");

        assert!(sql.starts_with("create schema if not exists correios;"));
        assert!(sql.contains("create table if not exists correios.import_report ("));
    }
}
