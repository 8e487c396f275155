use crate::{check_length, Error, Generator};
use portkey_core::shortcode::BASE62_ALPHABET;
use portkey_core::ShortCode;
use std::sync::atomic::{AtomicU64, Ordering};

/// Encodes `value` in base62, most significant digit first.
pub fn encode_base62(mut value: u64) -> String {
    if value == 0 {
        return (BASE62_ALPHABET[0] as char).to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE62_ALPHABET[(value % 62) as usize]);
        value /= 62;
    }
    digits.iter().rev().map(|&b| b as char).collect()
}

/// A short code generator backed by an in-process counter.
///
/// Codes are the base62 encoding of the counter, left-padded with `0` to
/// the configured length. `length` is a minimum: once the counter needs
/// more digits, codes grow past it (at most 11 characters for a `u64`)
/// rather than wrapping or repeating. They are unique within one instance but
/// trivially guessable, so this generator suits tests and private
/// deployments rather than public links.
#[derive(Debug)]
pub struct SeqGenerator {
    counter: AtomicU64,
    length: usize,
}

impl Clone for SeqGenerator {
    fn clone(&self) -> Self {
        Self {
            counter: AtomicU64::new(self.counter.load(Ordering::SeqCst)),
            length: self.length,
        }
    }
}

impl SeqGenerator {
    /// Creates a generator starting at zero.
    pub fn new(length: usize) -> Result<Self, Error> {
        Self::with_offset(length, 0)
    }

    /// Creates a generator starting from a specific counter value.
    ///
    /// Useful for resuming from a known state or distributing
    /// counter ranges across nodes (e.g., node 1 starts at 0, node 2 at 1_000_000).
    pub fn with_offset(length: usize, offset: u64) -> Result<Self, Error> {
        Ok(Self {
            counter: AtomicU64::new(offset),
            length: check_length(length)?,
        })
    }
}

impl Generator for SeqGenerator {
    type Output = ShortCode;

    fn generate(&self) -> Self::Output {
        let count = self.counter.fetch_add(1, Ordering::SeqCst);
        let digits = encode_base62(count);
        ShortCode::new_unchecked(format!("{:0>width$}", digits, width = self.length))
    }
}
