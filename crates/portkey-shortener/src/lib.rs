//! Creation, listing and deletion of short URLs.
//!
//! Every operation takes the requester explicitly and runs the ownership
//! gate from `portkey_core::access` before touching a record.

pub mod error;
pub mod service;
pub mod shortener;
pub mod validate;

pub use error::{Result, ShortenerError};
pub use service::{ShortenerConfig, ShortenerService};
pub use shortener::Shortener;
