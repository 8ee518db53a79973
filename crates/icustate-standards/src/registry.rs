#![deny(unsafe_code)]

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use icustate_model::{
    CodeSystem, ComorbidityCategory, ConversionFactor, FeatureDefinition, FeatureMap,
    FeatureSource, OutputSchema,
};

use crate::csv::comorbidity::parse_comorbidity_csv;
use crate::csv::features::parse_features_csv;
use crate::csv::schema::parse_state_features_csv;
use crate::csv::vasopressors::parse_vasopressors_csv;
use crate::error::StandardsError;
use crate::hash::sha256_file;
use crate::manifest::{MANIFEST_SCHEMA, MANIFEST_SCHEMA_VERSION, Manifest, ManifestFile, Pins};

const REQUIRED_ROLES: &[&str] = &[
    "features",
    "vasopressors",
    "elixhauser_icd9",
    "elixhauser_icd10",
    "state_features",
];

const ALLOWED_KINDS: &[&str] = &["csv", "toml", "other"];

#[derive(Debug, Clone, serde::Serialize)]
pub struct VerifySummary {
    pub standards_dir: PathBuf,
    pub manifest_pins: Pins,
    pub file_count: usize,
    pub feature_count: usize,
    pub item_count: usize,
    pub icd9_categories: usize,
    pub icd10_categories: usize,
    pub vasopressor_count: usize,
    pub output_columns: usize,
}

/// Verified, immutable configuration tables for one run.
#[derive(Debug, Clone)]
pub struct StandardsRegistry {
    pub manifest: Manifest,
    pub files: Vec<ManifestFile>,
    pub features: Vec<FeatureDefinition>,
    pub elixhauser_icd9: Vec<ComorbidityCategory>,
    pub elixhauser_icd10: Vec<ComorbidityCategory>,
    pub vasopressors: Vec<ConversionFactor>,
    pub output_schema: OutputSchema,
}

impl StandardsRegistry {
    pub fn verify_and_load(standards_dir: &Path) -> Result<(Self, VerifySummary), StandardsError> {
        let manifest = load_manifest(&standards_dir.join("manifest.toml"))?;

        validate_manifest(&manifest, standards_dir)?;

        let mut files = manifest.files.clone();
        files.sort_by(|a, b| a.path.cmp(&b.path));

        for file in &files {
            verify_file(standards_dir, file)?;
        }

        let features = parse_features_csv(&resolve_role_path(standards_dir, &files, "features")?)?;
        let vasopressors =
            parse_vasopressors_csv(&resolve_role_path(standards_dir, &files, "vasopressors")?)?;
        let elixhauser_icd9 = parse_comorbidity_csv(
            &resolve_role_path(standards_dir, &files, "elixhauser_icd9")?,
            CodeSystem::Icd9,
        )?;
        let elixhauser_icd10 = parse_comorbidity_csv(
            &resolve_role_path(standards_dir, &files, "elixhauser_icd10")?,
            CodeSystem::Icd10,
        )?;
        let output_schema =
            parse_state_features_csv(&resolve_role_path(standards_dir, &files, "state_features")?)?;

        let item_count = features.iter().map(|f| f.item_ids.len()).sum();
        let summary = VerifySummary {
            standards_dir: standards_dir.to_path_buf(),
            manifest_pins: manifest.pins.clone(),
            file_count: files.len(),
            feature_count: features.len(),
            item_count,
            icd9_categories: elixhauser_icd9.len(),
            icd10_categories: elixhauser_icd10.len(),
            vasopressor_count: vasopressors.len(),
            output_columns: output_schema.len(),
        };

        Ok((
            Self {
                manifest,
                files,
                features,
                elixhauser_icd9,
                elixhauser_icd10,
                vasopressors,
                output_schema,
            },
            summary,
        ))
    }

    /// Feature map of one source, in file order.
    pub fn feature_map(&self, source: FeatureSource) -> Result<FeatureMap, StandardsError> {
        let features = self
            .features
            .iter()
            .filter(|f| f.source == source)
            .cloned()
            .collect();
        FeatureMap::new(source, features).map_err(|e| StandardsError::InvalidManifest {
            message: e.to_string(),
        })
    }

    pub fn comorbidity_categories(&self) -> impl Iterator<Item = &ComorbidityCategory> {
        self.elixhauser_icd9.iter().chain(&self.elixhauser_icd10)
    }
}

fn load_manifest(path: &Path) -> Result<Manifest, StandardsError> {
    let contents = std::fs::read_to_string(path).map_err(|e| StandardsError::io(path, e))?;
    toml::from_str(&contents).map_err(|e| StandardsError::Toml {
        path: path.to_path_buf(),
        source: e,
    })
}

fn validate_manifest(manifest: &Manifest, standards_dir: &Path) -> Result<(), StandardsError> {
    if manifest.manifest.schema != MANIFEST_SCHEMA {
        return Err(StandardsError::InvalidManifest {
            message: format!("unsupported schema: {}", manifest.manifest.schema),
        });
    }
    if manifest.manifest.schema_version != MANIFEST_SCHEMA_VERSION {
        return Err(StandardsError::InvalidManifest {
            message: format!(
                "unsupported schema_version: {}",
                manifest.manifest.schema_version
            ),
        });
    }

    let mut roles: BTreeSet<&str> = BTreeSet::new();
    let mut manifest_paths: BTreeSet<PathBuf> = BTreeSet::new();

    for file in &manifest.files {
        if !roles.insert(file.role.as_str()) {
            return Err(StandardsError::DuplicateRole {
                role: file.role.clone(),
            });
        }

        if !ALLOWED_KINDS.contains(&file.kind.as_str()) {
            return Err(StandardsError::InvalidManifest {
                message: format!("unsupported kind '{}' for {}", file.kind, file.path),
            });
        }

        validate_sha(&file.sha256, &file.path)?;
        manifest_paths.insert(normalize_path(&validate_path(&file.path)?));
    }

    for role in REQUIRED_ROLES {
        if !roles.contains(role) {
            return Err(StandardsError::MissingRole {
                role: (*role).to_string(),
            });
        }
    }

    for path in list_files_under(standards_dir)? {
        if path == Path::new("manifest.toml") {
            continue;
        }
        if !manifest_paths.contains(&normalize_path(&path)) {
            return Err(StandardsError::UnexpectedFile {
                path: standards_dir.join(path),
            });
        }
    }

    Ok(())
}

fn verify_file(standards_dir: &Path, file: &ManifestFile) -> Result<(), StandardsError> {
    let full_path = standards_dir.join(&file.path);
    let actual = sha256_file(&full_path)?;
    let expected = file.sha256.to_ascii_lowercase();
    if actual != expected {
        return Err(StandardsError::Sha256Mismatch {
            path: full_path,
            expected,
            actual,
        });
    }
    Ok(())
}

fn resolve_role_path(
    standards_dir: &Path,
    files: &[ManifestFile],
    role: &str,
) -> Result<PathBuf, StandardsError> {
    let f = files
        .iter()
        .find(|f| f.role == role)
        .ok_or_else(|| StandardsError::MissingRole {
            role: role.to_string(),
        })?;
    Ok(standards_dir.join(&f.path))
}

fn validate_sha(sha: &str, path: &str) -> Result<(), StandardsError> {
    if sha.len() != 64 || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(StandardsError::InvalidSha256 {
            path: PathBuf::from(path),
            message: "sha256 must be 64 hex characters".to_string(),
        });
    }
    Ok(())
}

fn validate_path(path: &str) -> Result<PathBuf, StandardsError> {
    if path.contains('\\') {
        return Err(StandardsError::InvalidPath {
            path: PathBuf::from(path),
            message: "manifest path must use '/' separators".to_string(),
        });
    }

    let p = PathBuf::from(path);
    if p.is_absolute() {
        return Err(StandardsError::InvalidPath {
            path: p,
            message: "manifest path must be relative".to_string(),
        });
    }
    if p.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(StandardsError::InvalidPath {
            path: p,
            message: "manifest path must not traverse out of standards/".to_string(),
        });
    }
    Ok(p)
}

fn list_files_under(root: &Path) -> Result<BTreeSet<PathBuf>, StandardsError> {
    let mut stack = vec![root.to_path_buf()];
    let mut files = BTreeSet::new();

    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).map_err(|e| StandardsError::io(&dir, e))? {
            let entry = entry.map_err(|e| StandardsError::io(&dir, e))?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.is_file() {
                let rel = path
                    .strip_prefix(root)
                    .map_err(|e| StandardsError::InvalidPath {
                        path: path.clone(),
                        message: format!("failed to relativize path: {e}"),
                    })?
                    .to_path_buf();
                files.insert(rel);
            }
        }
    }

    Ok(files)
}

fn normalize_path(p: &Path) -> PathBuf {
    p.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
