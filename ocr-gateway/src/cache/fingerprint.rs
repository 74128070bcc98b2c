use sha2::{Digest, Sha256};
use std::fmt;

const KEY_PREFIX: &str = "ocr:v1:";

/// SHA-256 digest of an original (not preprocessed) image and the requested
/// language, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn compute(image: &[u8], language: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(language.as_bytes());
        // Language codes never contain NUL, so the boundary is unambiguous.
        hasher.update([0u8]);
        hasher.update(image);
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn cache_key(&self) -> String {
        format!("{KEY_PREFIX}{}", self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
