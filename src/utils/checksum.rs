//! SHA-256 digests and `.sha256` sidecar files
//!
//! Sidecars use the `sha256sum` layout (`<hex>  <file name>`), so an operator
//! can check an artifact by hand with `sha256sum -c`.

use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Suffix appended to an artifact path to get its sidecar path
pub const SIDECAR_SUFFIX: &str = ".sha256";

/// Outcome of checking an artifact against its sidecar
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumStatus {
    Valid,
    Missing,
    Mismatch { expected: String, actual: String },
}

impl ChecksumStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, ChecksumStatus::Valid)
    }
}

/// Sidecar path for an artifact: `<artifact>.sha256`
pub fn sidecar_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_os_string();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

/// Hex-encoded SHA-256 of a file, read in chunks
pub fn digest(file: &Path) -> io::Result<String> {
    let mut reader = File::open(file)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Write `<digest>  <file name>` next to the artifact and return the sidecar path
pub fn write_sidecar(file: &Path, digest: &str) -> io::Result<PathBuf> {
    let sidecar = sidecar_path(file);
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    fs::write(&sidecar, format!("{}  {}\n", digest, file_name))?;
    Ok(sidecar)
}

/// Compare an artifact against its sidecar
pub fn check_sidecar(file: &Path) -> io::Result<ChecksumStatus> {
    let sidecar = sidecar_path(file);
    if !sidecar.exists() {
        return Ok(ChecksumStatus::Missing);
    }

    let contents = fs::read_to_string(&sidecar)?;
    let expected = contents.split_whitespace().next().unwrap_or_default().to_lowercase();
    let actual = digest(file)?;

    if expected == actual {
        Ok(ChecksumStatus::Valid)
    } else {
        Ok(ChecksumStatus::Mismatch { expected, actual })
    }
}

/// True when the sidecar exists and matches the artifact's current content
pub fn verify_sidecar(file: &Path) -> bool {
    check_sidecar(file).map(|s| s.is_valid()).unwrap_or(false)
}
