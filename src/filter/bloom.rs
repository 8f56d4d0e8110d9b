//! Bloom filter keyed by URL strings

use crate::FilterError;
use sha2::{Digest, Sha256};
use std::f64::consts::LN_2;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Probabilistic set of URLs already seen during a walk
///
/// Sized once at construction for `expected` insertions at the target false
/// positive rate; it never grows. Membership answers have no false
/// negatives.
///
/// All bit updates go through one mutex so that [`SeenFilter::check_and_record`]
/// is a single linearizable step for concurrent callers.
#[derive(Debug)]
pub struct SeenFilter {
    state: Mutex<BitState>,
    num_bits: u64,
    num_hashes: u32,
}

#[derive(Debug)]
struct BitState {
    words: Vec<u64>,
    inserted: usize,
}

impl SeenFilter {
    /// Creates a filter for `expected` URLs at false positive rate `fp_rate`
    ///
    /// # Errors
    ///
    /// * `FilterError::ZeroCapacity` - `expected` is 0
    /// * `FilterError::InvalidFalsePositiveRate` - `fp_rate` is not in (0, 1)
    ///
    /// # Example
    ///
    /// ```
    /// use sumi_walk::filter::SeenFilter;
    ///
    /// let filter = SeenFilter::new(1000, 0.01).unwrap();
    /// assert!(filter.check_and_record("https://example.com/"));
    /// assert!(!filter.check_and_record("https://example.com/"));
    /// assert!(filter.contains("https://example.com/"));
    /// ```
    pub fn new(expected: usize, fp_rate: f64) -> Result<Self, FilterError> {
        if expected == 0 {
            return Err(FilterError::ZeroCapacity);
        }
        if !(fp_rate > 0.0 && fp_rate < 1.0) {
            return Err(FilterError::InvalidFalsePositiveRate(fp_rate));
        }

        let n = expected as f64;
        let num_bits = ((-n * fp_rate.ln()) / (LN_2 * LN_2)).ceil().max(64.0) as u64;
        let num_hashes = ((num_bits as f64 / n) * LN_2).round().max(1.0) as u32;
        let num_words = num_bits.div_ceil(64) as usize;

        tracing::debug!(
            "Sized seen filter: {} bits, {} hashes for {} urls at p={}",
            num_bits,
            num_hashes,
            expected,
            fp_rate
        );

        Ok(Self {
            state: Mutex::new(BitState {
                words: vec![0; num_words],
                inserted: 0,
            }),
            num_bits,
            num_hashes,
        })
    }

    /// Marks `url` as seen. Recording the same URL again is a no-op.
    pub fn record(&self, url: &str) {
        self.check_and_record(url);
    }

    /// Returns true if `url` was (very likely) recorded before
    pub fn contains(&self, url: &str) -> bool {
        let positions = self.positions(url);
        let state = self.lock();
        positions.iter().all(|&bit| state.is_set(bit))
    }

    /// Records `url` and reports whether it was new
    ///
    /// Returns `true` exactly when the URL was not already (probably)
    /// present. Two callers racing on the same URL never both get `true`.
    pub fn check_and_record(&self, url: &str) -> bool {
        let positions = self.positions(url);
        let mut state = self.lock();

        let mut fresh = false;
        for &bit in &positions {
            fresh |= !state.set(bit);
        }
        if fresh {
            state.inserted += 1;
        }
        fresh
    }

    /// Number of URLs accepted as new so far
    pub fn len(&self) -> usize {
        self.lock().inserted
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the bit array
    pub fn bit_count(&self) -> u64 {
        self.num_bits
    }

    /// Number of bit positions checked per URL
    pub fn hash_count(&self) -> u32 {
        self.num_hashes
    }

    /// Double hashing over the SHA-256 digest of the URL
    fn positions(&self, url: &str) -> Vec<u64> {
        let digest = Sha256::digest(url.as_bytes());
        let mut first = [0u8; 8];
        let mut second = [0u8; 8];
        first.copy_from_slice(&digest[0..8]);
        second.copy_from_slice(&digest[8..16]);

        let h1 = u64::from_le_bytes(first);
        // odd step so consecutive positions never collapse onto one bit
        let h2 = u64::from_le_bytes(second) | 1;

        (0..u64::from(self.num_hashes))
            .map(|i| h1.wrapping_add(i.wrapping_mul(h2)) % self.num_bits)
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, BitState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BitState {
    fn is_set(&self, bit: u64) -> bool {
        let (word, mask) = locate(bit);
        self.words[word] & mask != 0
    }

    /// Sets `bit`, returning whether it was already set
    fn set(&mut self, bit: u64) -> bool {
        let (word, mask) = locate(bit);
        let was_set = self.words[word] & mask != 0;
        self.words[word] |= mask;
        was_set
    }
}

fn locate(bit: u64) -> (usize, u64) {
    ((bit / 64) as usize, 1u64 << (bit % 64))
}
