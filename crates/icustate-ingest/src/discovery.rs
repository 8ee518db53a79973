//! Locating raw tables inside a data directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{IngestError, Result};
use crate::tables::{self, TableSpec};

const MAX_DEPTH: usize = 4;

/// Raw tables found under a data directory, keyed by table name.
#[derive(Debug, Clone, Default)]
pub struct DiscoveredTables {
    root: PathBuf,
    paths: BTreeMap<String, PathBuf>,
}

impl DiscoveredTables {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn get(&self, table: &str) -> Option<&Path> {
        self.paths.get(table).map(PathBuf::as_path)
    }

    pub fn require(&self, spec: TableSpec) -> Result<&Path> {
        self.get(spec.name)
            .ok_or_else(|| IngestError::MissingRequired {
                table: spec.name.to_string(),
                root: self.root.clone(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.paths.iter().map(|(k, v)| (k.as_str(), v.as_path()))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Table name of a raw file: `chartevents.csv.gz` -> `chartevents`.
pub fn table_stem(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?.to_ascii_lowercase();
    let stem = name
        .strip_suffix(".csv.gz")
        .or_else(|| name.strip_suffix(".csv"))?;
    Some(stem.to_string())
}

/// Recursively finds known tables (`.csv` or `.csv.gz`) under `root`.
///
/// When a table appears more than once the lexicographically first path wins,
/// so an uncompressed copy is preferred over its `.gz` sibling.
pub fn discover_tables(root: &Path) -> Result<DiscoveredTables> {
    if !root.is_dir() {
        return Err(IngestError::DirectoryNotFound {
            path: root.to_path_buf(),
        });
    }

    let mut candidates = Vec::new();
    let mut stack = vec![(root.to_path_buf(), 0usize)];
    while let Some((dir, depth)) = stack.pop() {
        let entries = std::fs::read_dir(&dir).map_err(|e| IngestError::DirectoryRead {
            path: dir.clone(),
            source: e,
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| IngestError::DirectoryRead {
                path: dir.clone(),
                source: e,
            })?;
            let path = entry.path();
            if path.is_dir() {
                if depth < MAX_DEPTH {
                    stack.push((path, depth + 1));
                }
            } else if path.is_file() {
                candidates.push(path);
            }
        }
    }
    candidates.sort();

    let mut paths = BTreeMap::new();
    for path in candidates {
        let Some(stem) = table_stem(&path) else {
            continue;
        };
        if tables::by_name(&stem).is_some() {
            paths.entry(stem).or_insert(path);
        }
    }

    Ok(DiscoveredTables {
        root: root.to_path_buf(),
        paths,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stems_strip_compression_suffix() {
        assert_eq!(
            table_stem(Path::new("hosp/labevents.csv.gz")).as_deref(),
            Some("labevents")
        );
        assert_eq!(
            table_stem(Path::new("ICU/ICUSTAYS.CSV")).as_deref(),
            Some("icustays")
        );
        assert_eq!(table_stem(Path::new("notes.txt")), None);
    }

    #[test]
    fn finds_nested_tables_and_prefers_plain_csv() {
        let dir = tempfile::tempdir().unwrap();
        let icu = dir.path().join("icu");
        let hosp = dir.path().join("hosp");
        std::fs::create_dir_all(&icu).unwrap();
        std::fs::create_dir_all(&hosp).unwrap();
        std::fs::write(icu.join("icustays.csv"), "x\n").unwrap();
        std::fs::write(icu.join("icustays.csv.gz"), "x\n").unwrap();
        std::fs::write(hosp.join("labevents.csv.gz"), "x\n").unwrap();
        std::fs::write(hosp.join("unrelated.csv"), "x\n").unwrap();

        let found = discover_tables(dir.path()).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found.get("icustays"), Some(icu.join("icustays.csv").as_path()));
        assert!(found.get("labevents").is_some());
        assert!(found.require(tables::ICUSTAYS).is_ok());
        assert!(matches!(
            found.require(tables::CHARTEVENTS),
            Err(IngestError::MissingRequired { .. })
        ));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let err = discover_tables(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, IngestError::DirectoryNotFound { .. }));
    }
}
