//! Cache keys: function name plus a digest of the call arguments.

use serde::Serialize;
use std::fmt;

/// Identity of one call signature.
///
/// Arguments are serialized to JSON and hashed with BLAKE3, so two calls
/// with equal arguments map to the same entry across runs and platforms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    function: String,
    digest: String,
}

impl CacheKey {
    pub fn new<A: Serialize + ?Sized>(function: &str, args: &A) -> Result<Self, serde_json::Error> {
        let canonical = serde_json::to_string(args)?;
        Ok(Self {
            function: function.to_string(),
            digest: blake3::hash(canonical.as_bytes()).to_hex().to_string(),
        })
    }

    /// Key for a function that takes no arguments.
    pub fn unit(function: &str) -> Self {
        Self {
            function: function.to_string(),
            digest: blake3::hash(b"null").to_hex().to_string(),
        }
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.function, &self.digest[..12.min(self.digest.len())])
    }
}
