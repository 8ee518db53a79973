#![deny(unsafe_code)]

use std::path::Path;

use sha2::Digest;

use crate::error::StandardsError;

pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    hex::encode(digest)
}

/// Hashes a file, mapping a missing file to [`StandardsError::MissingFile`].
pub fn sha256_file(path: &Path) -> Result<String, StandardsError> {
    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StandardsError::MissingFile {
                path: path.to_path_buf(),
            }
        } else {
            StandardsError::io(path, e)
        }
    })?;
    Ok(sha256_hex(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
