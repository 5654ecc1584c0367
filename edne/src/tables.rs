//! Catalog of the eDNE reference tables.
//!
//! Each [`TableSpec`] describes the columns of one table, its primary key, where its snapshot
//! rows come from and how the control fields of its delta lines are laid out. Column positions
//! in the catalog match field positions in the files.

use std::fmt;

/// Column type as stored in Postgres.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Numeric,
    Char(u16),
    Varchar(u16),
}

impl ColumnType {
    /// Type name used in `CREATE TABLE`.
    pub fn sql_type(&self) -> String {
        match self {
            ColumnType::Numeric => "numeric".to_string(),
            ColumnType::Char(len) => format!("char({len})"),
            ColumnType::Varchar(len) => format!("varchar({len})"),
        }
    }

    /// Cast applied to a text parameter before it is written to the column.
    pub fn parameter_cast(&self) -> &'static str {
        match self {
            ColumnType::Numeric => "::text::numeric",
            ColumnType::Char(_) | ColumnType::Varchar(_) => "::text",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub comment: &'static str,
}

impl ColumnSpec {
    const fn required(name: &'static str, column_type: ColumnType, comment: &'static str) -> Self {
        Self {
            name,
            column_type,
            nullable: false,
            comment,
        }
    }

    const fn optional(name: &'static str, column_type: ColumnType, comment: &'static str) -> Self {
        Self {
            name,
            column_type,
            nullable: true,
            comment,
        }
    }
}

/// Where the snapshot rows of a table are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    /// One file for the whole country.
    Single(&'static str),
    /// One file per state, named `{prefix}_{UF}.TXT`.
    PerState { prefix: &'static str },
    /// The first of several accepted names that exists.
    FirstOf(&'static [&'static str]),
}

/// Layout of the control fields that follow the data fields of a delta line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaTrailer {
    /// `columns…@OP`
    None,
    /// `columns…@OP@VALUE`. A non-empty `VALUE` replaces `column` on updates.
    ReplacementValue { column: usize },
    /// `columns…@OP@IGNORED`
    Discarded,
    /// `columns[..n-1]…@OP@LAST`, where `LAST` is the value of the last column.
    TrailingColumn,
}

impl DeltaTrailer {
    /// Number of fields after the data fields.
    pub fn control_fields(&self) -> usize {
        match self {
            DeltaTrailer::None => 1,
            DeltaTrailer::ReplacementValue { .. }
            | DeltaTrailer::Discarded
            | DeltaTrailer::TrailingColumn => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaLayout {
    /// Accepted file names, in lookup order.
    pub files: &'static [&'static str],
    pub trailer: DeltaTrailer,
}

impl DeltaLayout {
    /// Name written by current eDNE releases.
    pub fn file(&self) -> &'static str {
        self.files.first().copied().unwrap_or_default()
    }

    pub fn source(&self) -> SnapshotSource {
        match self.files {
            &[file] => SnapshotSource::Single(file),
            files => SnapshotSource::FirstOf(files),
        }
    }
}

/// Static description of one reference table.
#[derive(Debug, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [ColumnSpec],
    /// Indices into `columns`, in key order.
    pub primary_key: &'static [usize],
    pub snapshot: SnapshotSource,
    pub delta: Option<DeltaLayout>,
}

impl TableSpec {
    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|column| column.name)
    }

    pub fn key_columns(&self) -> impl Iterator<Item = &'static ColumnSpec> + '_ {
        self.primary_key.iter().map(|&index| &self.columns[index])
    }

    pub fn non_key_columns(&self) -> impl Iterator<Item = (usize, &'static ColumnSpec)> + '_ {
        self.columns
            .iter()
            .enumerate()
            .filter(|(index, _)| !self.primary_key.contains(index))
    }

    pub fn is_key_column(&self, index: usize) -> bool {
        self.primary_key.contains(&index)
    }

    /// Position of the `cep` column, if the table has one.
    pub fn cep_column(&self) -> Option<usize> {
        self.columns.iter().position(|column| column.name == "cep")
    }

    /// Delta layout, or a plain `columns…@OP` layout for tables without a delta file.
    pub fn delta_trailer(&self) -> DeltaTrailer {
        self.delta
            .map(|layout| layout.trailer)
            .unwrap_or(DeltaTrailer::None)
    }
}

impl fmt::Display for TableSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

use ColumnType::{Char, Numeric, Varchar};

pub static LOG_FAIXA_UF: TableSpec = TableSpec {
    name: "log_faixa_uf",
    columns: &[
        ColumnSpec::required("ufe_sg", Char(2), "state abbreviation"),
        ColumnSpec::required("ufe_cep_ini", Char(8), "first CEP of the state range"),
        ColumnSpec::required("ufe_cep_fim", Char(8), "last CEP of the state range"),
    ],
    primary_key: &[0, 1],
    snapshot: SnapshotSource::Single("LOG_FAIXA_UF.TXT"),
    delta: None,
};

pub static LOG_LOCALIDADE: TableSpec = TableSpec {
    name: "log_localidade",
    columns: &[
        ColumnSpec::required("loc_nu", Numeric, "locality key"),
        ColumnSpec::required("ufe_sg", Char(2), "state abbreviation"),
        ColumnSpec::required("loc_no", Varchar(72), "locality name"),
        ColumnSpec::optional("cep", Char(8), "CEP of a locality without street-level codes"),
        ColumnSpec::required("loc_in_sit", Char(1), "coding situation of the locality"),
        ColumnSpec::required("loc_in_tipo_loc", Char(1), "locality type"),
        ColumnSpec::optional("loc_nu_sub", Numeric, "key of the parent locality"),
        ColumnSpec::optional("loc_no_abrev", Varchar(36), "abbreviated locality name"),
        ColumnSpec::optional("mun_nu", Char(7), "IBGE municipality code"),
    ],
    primary_key: &[0],
    snapshot: SnapshotSource::Single("LOG_LOCALIDADE.TXT"),
    delta: Some(DeltaLayout {
        files: &["DELTA_LOG_LOCALIDADE.TXT"],
        trailer: DeltaTrailer::ReplacementValue { column: 3 },
    }),
};

pub static LOG_VAR_LOC: TableSpec = TableSpec {
    name: "log_var_loc",
    columns: &[
        ColumnSpec::required("loc_nu", Numeric, "locality key"),
        ColumnSpec::required("val_nu", Numeric, "variation sequence"),
        ColumnSpec::required("val_tx", Varchar(72), "alternative locality name"),
    ],
    primary_key: &[0, 1],
    snapshot: SnapshotSource::Single("LOG_VAR_LOC.TXT"),
    delta: None,
};

pub static LOG_FAIXA_LOCALIDADE: TableSpec = TableSpec {
    name: "log_faixa_localidade",
    columns: &[
        ColumnSpec::required("loc_nu", Numeric, "locality key"),
        ColumnSpec::required("loc_cep_ini", Char(8), "first CEP of the range"),
        ColumnSpec::required("loc_cep_fim", Char(8), "last CEP of the range"),
        ColumnSpec::required("loc_tipo_faixa", Char(1), "range type"),
    ],
    primary_key: &[0, 1, 3],
    snapshot: SnapshotSource::Single("LOG_FAIXA_LOCALIDADE.TXT"),
    delta: Some(DeltaLayout {
        files: &["DELTA_LOG_FAIXA_LOCALIDADE.TXT"],
        trailer: DeltaTrailer::TrailingColumn,
    }),
};

pub static LOG_BAIRRO: TableSpec = TableSpec {
    name: "log_bairro",
    columns: &[
        ColumnSpec::required("bai_nu", Numeric, "neighbourhood key"),
        ColumnSpec::required("ufe_sg", Char(2), "state abbreviation"),
        ColumnSpec::required("loc_nu", Numeric, "locality key"),
        ColumnSpec::required("bai_no", Varchar(72), "neighbourhood name"),
        ColumnSpec::optional("bai_no_abrev", Varchar(36), "abbreviated neighbourhood name"),
    ],
    primary_key: &[0],
    snapshot: SnapshotSource::Single("LOG_BAIRRO.TXT"),
    delta: Some(DeltaLayout {
        files: &["DELTA_LOG_BAIRRO.TXT"],
        trailer: DeltaTrailer::None,
    }),
};

pub static LOG_VAR_BAI: TableSpec = TableSpec {
    name: "log_var_bai",
    columns: &[
        ColumnSpec::required("bai_nu", Numeric, "neighbourhood key"),
        ColumnSpec::required("vdb_nu", Char(2), "variation sequence"),
        ColumnSpec::required("vdb_tx", Varchar(72), "alternative neighbourhood name"),
    ],
    primary_key: &[0, 1],
    snapshot: SnapshotSource::Single("LOG_VAR_BAI.TXT"),
    delta: None,
};

pub static LOG_FAIXA_BAIRRO: TableSpec = TableSpec {
    name: "log_faixa_bairro",
    columns: &[
        ColumnSpec::required("bai_nu", Numeric, "neighbourhood key"),
        ColumnSpec::required("fcb_cep_ini", Char(8), "first CEP of the range"),
        ColumnSpec::required("fcb_cep_fim", Char(8), "last CEP of the range"),
    ],
    primary_key: &[0, 1],
    snapshot: SnapshotSource::Single("LOG_FAIXA_BAIRRO.TXT"),
    delta: Some(DeltaLayout {
        files: &["DELTA_LOG_FAIXA_BAI.TXT", "DELTA_LOG_FAIXA_BAIRRO.TXT"],
        trailer: DeltaTrailer::None,
    }),
};

pub static LOG_CPC: TableSpec = TableSpec {
    name: "log_cpc",
    columns: &[
        ColumnSpec::required("cpc_nu", Numeric, "community postal box key"),
        ColumnSpec::required("ufe_sg", Char(2), "state abbreviation"),
        ColumnSpec::required("loc_nu", Numeric, "locality key"),
        ColumnSpec::required("cpc_no", Varchar(72), "community postal box name"),
        ColumnSpec::required("cpc_endereco", Varchar(100), "community postal box address"),
        ColumnSpec::required("cep", Char(8), "CEP of the community postal box"),
    ],
    primary_key: &[0],
    snapshot: SnapshotSource::Single("LOG_CPC.TXT"),
    delta: Some(DeltaLayout {
        files: &["DELTA_LOG_CPC.TXT"],
        trailer: DeltaTrailer::ReplacementValue { column: 5 },
    }),
};

pub static LOG_FAIXA_CPC: TableSpec = TableSpec {
    name: "log_faixa_cpc",
    columns: &[
        ColumnSpec::required("cpc_nu", Numeric, "community postal box key"),
        ColumnSpec::required("cpc_inicial", Varchar(6), "first box number"),
        ColumnSpec::required("cpc_final", Varchar(6), "last box number"),
    ],
    primary_key: &[0, 1],
    snapshot: SnapshotSource::Single("LOG_FAIXA_CPC.TXT"),
    delta: Some(DeltaLayout {
        files: &["DELTA_LOG_FAIXA_CPC.TXT"],
        trailer: DeltaTrailer::None,
    }),
};

pub static LOG_LOGRADOURO: TableSpec = TableSpec {
    name: "log_logradouro",
    columns: &[
        ColumnSpec::required("log_nu", Numeric, "street key"),
        ColumnSpec::required("ufe_sg", Char(2), "state abbreviation"),
        ColumnSpec::required("loc_nu", Numeric, "locality key"),
        ColumnSpec::required("bai_nu_ini", Numeric, "first neighbourhood key"),
        ColumnSpec::optional("bai_nu_fim", Numeric, "last neighbourhood key"),
        ColumnSpec::required("log_no", Varchar(100), "street name"),
        ColumnSpec::optional("log_complemento", Varchar(100), "street complement"),
        ColumnSpec::required("cep", Char(8), "CEP of the street"),
        ColumnSpec::required("tlo_tx", Varchar(100), "street type"),
        ColumnSpec::optional("log_sta_tlo", Char(1), "whether the street type is used"),
        ColumnSpec::optional("log_no_abrev", Varchar(100), "abbreviated street name"),
    ],
    primary_key: &[0],
    snapshot: SnapshotSource::PerState {
        prefix: "LOG_LOGRADOURO",
    },
    delta: Some(DeltaLayout {
        files: &["DELTA_LOG_LOGRADOURO.TXT"],
        trailer: DeltaTrailer::ReplacementValue { column: 7 },
    }),
};

pub static LOG_VAR_LOG: TableSpec = TableSpec {
    name: "log_var_log",
    columns: &[
        ColumnSpec::required("log_nu", Numeric, "street key"),
        ColumnSpec::required("vlo_nu", Numeric, "variation sequence"),
        ColumnSpec::required("tlo_tx", Varchar(36), "street type"),
        ColumnSpec::required("vlo_tx", Varchar(150), "alternative street name"),
    ],
    primary_key: &[0, 1],
    snapshot: SnapshotSource::Single("LOG_VAR_LOG.TXT"),
    delta: None,
};

pub static LOG_NUM_SEC: TableSpec = TableSpec {
    name: "log_num_sec",
    columns: &[
        ColumnSpec::required("log_nu", Numeric, "street key"),
        ColumnSpec::required("sec_nu_ini", Varchar(10), "first number of the section"),
        ColumnSpec::required("sec_nu_fim", Varchar(10), "last number of the section"),
        ColumnSpec::required("sec_in_lado", Char(1), "side of the street"),
    ],
    primary_key: &[0],
    snapshot: SnapshotSource::Single("LOG_NUM_SEC.TXT"),
    delta: Some(DeltaLayout {
        files: &["DELTA_LOG_NUM_SEC.TXT"],
        trailer: DeltaTrailer::None,
    }),
};

pub static LOG_GRANDE_USUARIO: TableSpec = TableSpec {
    name: "log_grande_usuario",
    columns: &[
        ColumnSpec::required("gru_nu", Numeric, "large user key"),
        ColumnSpec::required("ufe_sg", Char(2), "state abbreviation"),
        ColumnSpec::required("loc_nu", Numeric, "locality key"),
        ColumnSpec::required("bai_nu", Numeric, "neighbourhood key"),
        ColumnSpec::optional("log_nu", Numeric, "street key"),
        ColumnSpec::required("gru_no", Varchar(255), "large user name"),
        ColumnSpec::required("gru_endereco", Varchar(255), "large user address"),
        ColumnSpec::required("cep", Char(8), "CEP of the large user"),
        ColumnSpec::optional("gru_no_abrev", Varchar(255), "abbreviated large user name"),
    ],
    primary_key: &[0],
    snapshot: SnapshotSource::Single("LOG_GRANDE_USUARIO.TXT"),
    delta: Some(DeltaLayout {
        files: &["DELTA_LOG_GRANDE_USUARIO.TXT"],
        trailer: DeltaTrailer::Discarded,
    }),
};

pub static LOG_UNID_OPER: TableSpec = TableSpec {
    name: "log_unid_oper",
    columns: &[
        ColumnSpec::required("uop_nu", Numeric, "operational unit key"),
        ColumnSpec::required("ufe_sg", Char(2), "state abbreviation"),
        ColumnSpec::required("loc_nu", Numeric, "locality key"),
        ColumnSpec::required("bai_nu", Numeric, "neighbourhood key"),
        ColumnSpec::optional("log_nu", Numeric, "street key"),
        ColumnSpec::required("uop_no", Varchar(100), "operational unit name"),
        ColumnSpec::required("uop_endereco", Varchar(100), "operational unit address"),
        ColumnSpec::required("cep", Char(8), "CEP of the operational unit"),
        ColumnSpec::required("uop_in_cp", Char(1), "whether the unit has postal boxes"),
        ColumnSpec::optional("uop_no_abrev", Varchar(100), "abbreviated operational unit name"),
    ],
    primary_key: &[0],
    snapshot: SnapshotSource::Single("LOG_UNID_OPER.TXT"),
    delta: Some(DeltaLayout {
        files: &["DELTA_LOG_UNID_OPER.TXT"],
        trailer: DeltaTrailer::ReplacementValue { column: 7 },
    }),
};

pub static LOG_FAIXA_UOP: TableSpec = TableSpec {
    name: "log_faixa_uop",
    columns: &[
        ColumnSpec::required("uop_nu", Numeric, "operational unit key"),
        ColumnSpec::required("fnc_inicial", Numeric, "first postal box number"),
        ColumnSpec::required("fnc_final", Numeric, "last postal box number"),
    ],
    primary_key: &[0, 1],
    snapshot: SnapshotSource::Single("LOG_FAIXA_UOP.TXT"),
    delta: Some(DeltaLayout {
        files: &["DELTA_LOG_FAIXA_UOP.TXT"],
        trailer: DeltaTrailer::None,
    }),
};

pub static ECT_PAIS: TableSpec = TableSpec {
    name: "ect_pais",
    columns: &[
        ColumnSpec::required("pai_sg", Char(2), "country code"),
        ColumnSpec::required("pai_sg_alternativa", Char(3), "alternative country code"),
        ColumnSpec::required("pai_no_portugues", Varchar(100), "country name in Portuguese"),
        ColumnSpec::required("pai_no_ingles", Varchar(100), "country name in English"),
        ColumnSpec::required("pai_no_frances", Varchar(100), "country name in French"),
        ColumnSpec::required("pai_abreviatura", Varchar(100), "country abbreviation"),
    ],
    primary_key: &[0],
    snapshot: SnapshotSource::Single("ECT_PAIS.TXT"),
    delta: None,
};

/// Every table, in creation order.
pub static ALL_TABLES: [&TableSpec; 16] = [
    &LOG_FAIXA_UF,
    &LOG_LOCALIDADE,
    &LOG_VAR_LOC,
    &LOG_FAIXA_LOCALIDADE,
    &LOG_BAIRRO,
    &LOG_VAR_BAI,
    &LOG_FAIXA_BAIRRO,
    &LOG_CPC,
    &LOG_FAIXA_CPC,
    &LOG_LOGRADOURO,
    &LOG_VAR_LOG,
    &LOG_NUM_SEC,
    &LOG_GRANDE_USUARIO,
    &LOG_UNID_OPER,
    &LOG_FAIXA_UOP,
    &ECT_PAIS,
];

/// Looks a table up by its SQL name, ignoring ASCII case.
pub fn find(name: &str) -> Option<&'static TableSpec> {
    ALL_TABLES
        .iter()
        .copied()
        .find(|table| table.name.eq_ignore_ascii_case(name))
}

/// Tables whose `cep` column counts towards the CEP total of a run.
pub fn cep_tables() -> impl Iterator<Item = &'static TableSpec> {
    [
        &LOG_LOCALIDADE,
        &LOG_LOGRADOURO,
        &LOG_GRANDE_USUARIO,
        &LOG_UNID_OPER,
        &LOG_CPC,
    ]
    .into_iter()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn primary_keys_point_at_existing_columns() {
        for table in ALL_TABLES {
            assert!(!table.primary_key.is_empty(), "{table} has no key");
            for &index in table.primary_key {
                assert!(index < table.columns.len(), "{table} key {index} out of range");
                assert!(!table.columns[index].nullable, "{table} key column is nullable");
            }
        }
    }

    #[test]
    fn replacement_columns_are_cep_columns() {
        for table in ALL_TABLES {
            if let DeltaTrailer::ReplacementValue { column } = table.delta_trailer() {
                assert_eq!(table.cep_column(), Some(column), "{table}");
            }
        }
    }

    #[test]
    fn faixa_bairro_delta_accepts_both_names() {
        let layout = LOG_FAIXA_BAIRRO.delta.unwrap();

        assert_eq!(layout.file(), "DELTA_LOG_FAIXA_BAI.TXT");
        assert_eq!(
            layout.source(),
            SnapshotSource::FirstOf(&["DELTA_LOG_FAIXA_BAI.TXT", "DELTA_LOG_FAIXA_BAIRRO.TXT"])
        );
        assert_eq!(
            LOG_BAIRRO.delta.unwrap().source(),
            SnapshotSource::Single("DELTA_LOG_BAIRRO.TXT")
        );
    }

    #[test]
    fn table_names_are_unique() {
        let names: HashSet<_> = ALL_TABLES.iter().map(|table| table.name).collect();

        assert_eq!(names.len(), ALL_TABLES.len());
    }

    #[test]
    fn non_key_columns_exclude_the_key() {
        let columns: Vec<_> = LOG_FAIXA_LOCALIDADE
            .non_key_columns()
            .map(|(_, column)| column.name)
            .collect();

        assert_eq!(columns, vec!["loc_cep_fim"]);
    }

    #[test]
    fn every_cep_table_has_a_cep_column() {
        for table in cep_tables() {
            assert!(table.cep_column().is_some(), "{table}");
        }
    }

    #[test]
    fn find_ignores_case() {
        assert_eq!(find("LOG_BAIRRO").map(|t| t.name), Some("log_bairro"));
        assert!(find("log_unknown").is_none());
    }

    #[test]
    fn numeric_columns_cast_through_text() {
        assert_eq!(ColumnType::Numeric.parameter_cast(), "::text::numeric");
        assert_eq!(ColumnType::Char(8).sql_type(), "char(8)");
        assert_eq!(ColumnType::Varchar(72).sql_type(), "varchar(72)");
    }
}
