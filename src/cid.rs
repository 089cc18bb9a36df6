//! Content identifiers.
//!
//! A [`Cid`] is the BLAKE3 hash of a block's bytes, rendered as lowercase
//! hex. Equal byte strings always produce equal CIDs, which is what makes
//! record storage deduplicating and lets readers verify every block they
//! fetch.

use std::fmt;

/// Content identifier for a block in the DAG store.
///
/// Opaque to callers; the only ways to obtain one are hashing bytes with
/// [`Cid::of`] or parsing a previously stored identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cid(String);

impl Cid {
    /// Compute the CID of a byte string.
    pub fn of(bytes: &[u8]) -> Self {
        Cid(blake3::hash(bytes).to_hex().to_string())
    }

    /// View the CID as its hex string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the CID, returning the hex string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for Cid {
    fn from(s: String) -> Self {
        Cid(s)
    }
}

impl From<&str> for Cid {
    fn from(s: &str) -> Self {
        Cid(s.to_string())
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_bytes_identical_cids() {
        let a = Cid::of(b"hello world");
        let b = Cid::of(b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_bytes_distinct_cids() {
        assert_ne!(Cid::of(b"a"), Cid::of(b"b"));
    }

    #[test]
    fn display_round_trips() {
        let cid = Cid::of(b"block");
        let parsed = Cid::from(cid.to_string());
        assert_eq!(cid, parsed);
    }
}
