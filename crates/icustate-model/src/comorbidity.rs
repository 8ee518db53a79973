use std::fmt;

use serde::{Deserialize, Serialize};

/// Diagnosis coding system a prefix table applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CodeSystem {
    Icd9,
    Icd10,
}

impl CodeSystem {
    /// Version 9 selects ICD-9; every other version is read as ICD-10.
    pub fn from_version(version: i64) -> Self {
        if version == 9 {
            CodeSystem::Icd9
        } else {
            CodeSystem::Icd10
        }
    }
}

impl fmt::Display for CodeSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeSystem::Icd9 => f.write_str("ICD-9"),
            CodeSystem::Icd10 => f.write_str("ICD-10"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComorbidityCategory {
    pub name: String,
    pub system: CodeSystem,
    pub prefixes: Vec<String>,
}

impl ComorbidityCategory {
    pub fn new(name: impl Into<String>, system: CodeSystem, prefixes: Vec<String>) -> Self {
        Self {
            name: name.into(),
            system,
            prefixes,
        }
    }

    pub fn matches(&self, code: &str) -> bool {
        self.prefixes.iter().any(|prefix| code.starts_with(prefix.as_str()))
    }
}
