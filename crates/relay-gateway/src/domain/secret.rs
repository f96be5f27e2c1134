//! Static shared secrets presented in request headers.

use std::fmt;

/// A configured shared secret, or none.
///
/// An unset secret never verifies. Callers that want "no secret configured
/// means open" must check [`is_configured`](Self::is_configured) themselves.
#[derive(Clone, Default)]
pub struct SharedSecret(Option<String>);

impl SharedSecret {
    pub fn new(secret: Option<String>) -> Self {
        Self(secret.filter(|s| !s.is_empty()))
    }

    pub fn is_configured(&self) -> bool {
        self.0.is_some()
    }

    /// Exact match against the configured secret.
    pub fn verify(&self, presented: Option<&str>) -> bool {
        match (&self.0, presented) {
            (Some(expected), Some(presented)) => constant_time_compare(presented, expected),
            _ => false,
        }
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("SharedSecret(<redacted>)"),
            None => f.write_str("SharedSecret(<unset>)"),
        }
    }
}

/// Constant-time string comparison.
///
/// Runs in time independent of where the inputs first differ, and does not
/// short-circuit on a length mismatch.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    use subtle::ConstantTimeEq;

    let max_len = std::cmp::max(a.len(), b.len());

    // Different pad bytes so a length mismatch can never compare equal
    let mut a_padded = vec![0u8; max_len];
    let mut b_padded = vec![0xFFu8; max_len];

    a_padded[..a.len()].copy_from_slice(a.as_bytes());
    b_padded[..b.len()].copy_from_slice(b.as_bytes());

    let lengths_equal = a.len().ct_eq(&b.len());
    let contents_equal = a_padded.ct_eq(&b_padded);

    (lengths_equal & contents_equal).into()
}
