use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::columns::{HOUR_BIN, STAY_ID};
use crate::error::{ModelError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// 64-bit integer identifier.
    Id,
    /// Hour bucket, written as a millisecond datetime.
    Hour,
    Float,
    /// Integral flag or score.
    Int,
}

impl ColumnKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnKind::Id => "id",
            ColumnKind::Hour => "hour",
            ColumnKind::Float => "float",
            ColumnKind::Int => "int",
        }
    }

    pub fn is_feature(self) -> bool {
        matches!(self, ColumnKind::Float | ColumnKind::Int)
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnKind {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "id" => Ok(ColumnKind::Id),
            "hour" => Ok(ColumnKind::Hour),
            "float" => Ok(ColumnKind::Float),
            "int" => Ok(ColumnKind::Int),
            _ => Err(ModelError::UnknownColumnKind(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputColumn {
    pub name: String,
    pub kind: ColumnKind,
}

impl OutputColumn {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Fixed, ordered column list of the output artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputSchema {
    columns: Vec<OutputColumn>,
}

impl OutputSchema {
    /// Builds a schema, placing the key columns first regardless of input order.
    pub fn new(columns: Vec<OutputColumn>) -> Self {
        let mut ordered = vec![
            OutputColumn::new(STAY_ID, ColumnKind::Id),
            OutputColumn::new(HOUR_BIN, ColumnKind::Hour),
        ];
        ordered.extend(
            columns
                .into_iter()
                .filter(|c| c.name != STAY_ID && c.name != HOUR_BIN),
        );
        Self { columns: ordered }
    }

    pub fn columns(&self) -> &[OutputColumn] {
        &self.columns
    }

    pub fn features(&self) -> impl Iterator<Item = &OutputColumn> {
        self.columns.iter().filter(|c| c.kind.is_feature())
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
