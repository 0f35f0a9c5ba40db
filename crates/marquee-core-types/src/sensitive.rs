//! Redacting wrapper for secrets
//!
//! Device codes are bearer secrets: anyone holding one can poll for the
//! display identity once it is paired. They are wrapped in `Sensitive` before
//! they reach a log line, and logged by `fingerprint()` when correlation is
//! needed.

use sha2::{Digest, Sha256};
use std::fmt;

const REDACTED: &str = "<redacted>";

/// Wrapper that never prints its contents through `Debug` or `Display`
///
/// ```
/// use marquee_core_types::Sensitive;
///
/// let code = Sensitive::new("s3cr3t".to_string());
/// assert_eq!(format!("{code:?}"), "<redacted>");
/// assert_eq!(code.expose(), "s3cr3t");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: AsRef<[u8]>> Sensitive<T> {
    /// First 12 hex chars of SHA-256 over the secret, safe to log
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_ref());
        hex::encode(&digest[..6])
    }
}

impl<T> fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl<T> fmt::Display for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}
