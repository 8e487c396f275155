//! Short code generators.
//!
//! Generators only produce candidates. Uniqueness is enforced by the
//! repository on insert; callers regenerate on conflict.

pub mod error;
pub mod random;
pub mod seq;

pub use error::Error;
pub use random::RandomGenerator;
pub use seq::SeqGenerator;

use portkey_core::ShortCode;

/// Shortest code any generator may be configured to produce.
pub const MIN_CODE_LENGTH: usize = 4;
/// Longest code any generator may be configured to produce.
pub const MAX_CODE_LENGTH: usize = 16;

/// Trait for generating short codes.
///
/// Implementations are pure generators that don't interact with storage.
pub trait Generator: Send + Sync + 'static {
    type Output: Into<ShortCode>;

    /// Produces a candidate code.
    ///
    /// Two calls are not required to differ; the caller handles collisions.
    fn generate(&self) -> Self::Output;
}

pub(crate) fn check_length(length: usize) -> Result<usize, Error> {
    if (MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&length) {
        Ok(length)
    } else {
        Err(Error::InvalidLength {
            length,
            min: MIN_CODE_LENGTH,
            max: MAX_CODE_LENGTH,
        })
    }
}
