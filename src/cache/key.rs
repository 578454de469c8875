//! Cache key derivation
//!
//! Keys must be bit-exact across engine versions:
//! `version-arch-job-<sha256(file1)>-<sha256(file2)>...`, components in
//! declared order, lowercase hex digests of the files' bytes.

use crate::core::CachePolicy;
use crate::error::{EngineError, EngineResult};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

/// A derived, deterministic cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Checksum of a file's bytes as lowercase hex
pub fn checksum_file(path: &Path) -> EngineResult<String> {
    let bytes = std::fs::read(path).map_err(|e| {
        EngineError::Configuration(format!(
            "cache checksum input '{}' is not readable: {}",
            path.display(),
            e
        ))
    })?;
    let digest = Sha256::digest(&bytes);
    Ok(hex::encode(digest))
}

/// Derive the cache key for a job.
///
/// `extra_inputs` is appended after the policy's declared files (the fixture
/// fetch script arrives this way). Relative inputs resolve against
/// `base_dir`. A missing input is a `Configuration` error, never a cache
/// miss: a key must always be computable before steps run.
pub fn derive_key(
    policy: &CachePolicy,
    job_id: &str,
    extra_inputs: &[std::path::PathBuf],
    base_dir: &Path,
) -> EngineResult<CacheKey> {
    let mut components = vec![
        policy.version.clone(),
        std::env::consts::ARCH.to_string(),
        job_id.to_string(),
    ];

    for input in policy.checksum_files.iter().chain(extra_inputs.iter()) {
        let path = if input.is_absolute() {
            input.clone()
        } else {
            base_dir.join(input)
        };
        components.push(checksum_file(&path)?);
    }

    Ok(CacheKey(components.join("-")))
}
