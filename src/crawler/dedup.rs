//! Exact and near-duplicate content detection

use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::{LazyLock, Mutex, PoisonError};

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("valid regex"));

/// Hex SHA-256 digest of the raw content
pub fn exact_fingerprint(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// 64-bit simhash of the content's word tokens
///
/// Tokens are `\w+` runs of the lossily decoded text, weighted by their
/// count. Each token contributes its 64-bit hash (the first eight bytes of
/// its SHA-256); a fingerprint bit is set where the weighted sum is positive.
pub fn simhash(content: &[u8]) -> u64 {
    let text = String::from_utf8_lossy(content);

    let mut weights: HashMap<&str, i64> = HashMap::new();
    for token in WORD_RE.find_iter(&text) {
        *weights.entry(token.as_str()).or_insert(0) += 1;
    }

    let mut sums = [0i64; 64];
    for (token, weight) in weights {
        let hash = token_hash(token);
        for (bit, sum) in sums.iter_mut().enumerate() {
            if hash & (1 << bit) != 0 {
                *sum += weight;
            } else {
                *sum -= weight;
            }
        }
    }

    sums.iter()
        .enumerate()
        .filter(|(_, sum)| **sum > 0)
        .fold(0u64, |acc, (bit, _)| acc | (1 << bit))
}

fn token_hash(token: &str) -> u64 {
    let digest = Sha256::digest(token.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

/// Sets of fingerprints seen so far, each behind its own lock
#[derive(Default)]
pub struct DedupEngine {
    exact: Mutex<HashSet<String>>,
    near: Mutex<HashSet<u64>>,
}

impl DedupEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if identical content was seen before; records it otherwise
    pub fn check_and_record_exact(&self, content: &[u8]) -> bool {
        let fingerprint = exact_fingerprint(content);
        let mut seen = self.exact.lock().unwrap_or_else(PoisonError::into_inner);
        !seen.insert(fingerprint)
    }

    /// Returns true if content with the same simhash was seen before; records it otherwise
    pub fn check_and_record_near(&self, content: &[u8]) -> bool {
        let fingerprint = simhash(content);
        let mut seen = self.near.lock().unwrap_or_else(PoisonError::into_inner);
        !seen.insert(fingerprint)
    }

    /// Number of distinct exact fingerprints recorded
    pub fn exact_len(&self) -> usize {
        self.exact
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_duplicate() {
        let dedup = DedupEngine::new();
        assert!(!dedup.check_and_record_exact(b"<html>hello</html>"));
        assert!(dedup.check_and_record_exact(b"<html>hello</html>"));
        assert!(!dedup.check_and_record_exact(b"<html>hello!</html>"));
        assert_eq!(dedup.exact_len(), 2);
    }

    #[test]
    fn test_near_duplicate_ignores_token_order() {
        let dedup = DedupEngine::new();
        assert!(!dedup.check_and_record_near(b"<p>graduate seminar schedule</p>"));
        // same tokens with the same counts give the same fingerprint
        assert!(dedup.check_and_record_near(b"<p>schedule seminar graduate</p>"));
    }

    #[test]
    fn test_near_duplicate_is_case_sensitive() {
        assert_ne!(simhash(b"Research Areas"), simhash(b"research areas"));
    }

    #[test]
    fn test_simhash_of_empty_content() {
        assert_eq!(simhash(b""), 0);
        assert_eq!(simhash(b"   ...   "), 0);
    }

    #[test]
    fn test_simhash_single_token_is_its_hash() {
        assert_eq!(simhash(b"informatics"), token_hash("informatics"));
    }

    #[test]
    fn test_exact_fingerprint_format() {
        let fp = exact_fingerprint(b"abc");
        assert_eq!(
            fp,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
