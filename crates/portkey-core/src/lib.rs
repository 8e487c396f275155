//! Core types and traits for the Portkey URL shortener.
//!
//! This crate provides the shared domain model used by the shortener,
//! redirector and analytics services: short codes, URL records, click
//! events, the storage contracts and the ownership gate.

pub mod access;
pub mod cache;
pub mod click;
pub mod error;
pub mod id;
pub mod repository;
pub mod shortcode;
pub mod url;

pub use access::{AccessError, Identity};
pub use cache::UrlCache;
pub use click::{ClickEvent, ClickSink, NewClick, Page};
pub use error::{CacheError, CoreError, StorageError};
pub use id::{ClickId, OwnerId, UrlId};
pub use repository::{ClickRepository, CodeReuse, ReadRepository, UrlRepository};
pub use shortcode::ShortCode;
pub use url::{NewShortUrl, ShortUrl};
