use sha2::{Digest, Sha256};

/// Derives a stable 16-hex-char identifier from a URL (or any string
/// identity). Used for output subtrees and cache filenames, so it must never
/// change between releases.
pub fn generate_id(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    format!("{:x}", digest)[..16].to_string()
}
