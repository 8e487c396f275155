use crate::{check_length, Error, Generator};
use portkey_core::shortcode::BASE62_ALPHABET;
use portkey_core::ShortCode;
use rand::Rng;

/// Default length of generated codes: 62^7 ≈ 3.5 × 10^12 possible codes.
pub const DEFAULT_LENGTH: usize = 7;

/// Generates fixed-length codes drawn uniformly from the base62 alphabet.
///
/// Each character comes from the thread-local CSPRNG, so codes carry
/// `length × log2(62)` bits of entropy and cannot be enumerated by
/// counting.
#[derive(Debug, Clone)]
pub struct RandomGenerator {
    length: usize,
}

impl RandomGenerator {
    pub fn new(length: usize) -> Result<Self, Error> {
        Ok(Self {
            length: check_length(length)?,
        })
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
        }
    }
}

impl Generator for RandomGenerator {
    type Output = ShortCode;

    fn generate(&self) -> Self::Output {
        let mut rng = rand::thread_rng();
        let code: String = (0..self.length)
            .map(|_| BASE62_ALPHABET[rng.gen_range(0..BASE62_ALPHABET.len())] as char)
            .collect();
        ShortCode::new_unchecked(code)
    }
}
