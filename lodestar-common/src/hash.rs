//! SHA-256 fingerprint utilities
//!
//! Identities are compared and displayed by the SHA-256 fingerprint of
//! their certificate, formatted as colon-separated uppercase hex
//! (`AB:CD:...`), the same form servers show for TOFU prompts.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::HASH_BUFFER_SIZE;

/// Colon-separated uppercase SHA-256 fingerprint of a file's contents
///
/// Reads in fixed-size chunks rather than loading the whole file.
pub fn fingerprint_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format_digest(&hasher.finalize()))
}

fn format_digest(digest: &[u8]) -> String {
    digest
        .iter()
        .map(|byte| format!("{:02X}", byte))
        .collect::<Vec<_>>()
        .join(":")
}
