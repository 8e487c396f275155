//! Redirection resolver with in-process caching.
//!
//! [`RedirectorService`] turns a short code into a [`Resolution`] and hands
//! every successful visit to a [`ClickSink`](portkey_core::ClickSink)
//! without waiting for it to be stored. Caching is added with the
//! [`CachedRepository`] decorator, which also invalidates entries when
//! records are created or soft-deleted through it.
//!
//! ```rust
//! use std::sync::Arc;
//! use portkey_core::{ClickSink, NewClick, ShortCode};
//! use portkey_redirector::{CachedRepository, MokaUrlCache, RedirectorService, Resolution, Visit};
//! use portkey_storage::InMemoryRepository;
//!
//! struct Discard;
//!
//! impl ClickSink for Discard {
//!     fn record(&self, _click: NewClick) {}
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let inner = Arc::new(InMemoryRepository::new());
//! let cached = Arc::new(CachedRepository::new(inner, MokaUrlCache::new()));
//! let service = RedirectorService::new(cached, Arc::new(Discard));
//!
//! let code = ShortCode::new("abc123")?;
//! if let Resolution::Redirect(url) = service.resolve(&code, Visit::default()).await? {
//!     println!("Redirect to: {}", url.original_url);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod redirector;
pub mod repository;
pub mod service;

pub use cache::{CacheConfig, MokaUrlCache};
pub use error::{RedirectorError, Result};
pub use redirector::{Redirector, Resolution, Visit};
pub use repository::CachedRepository;
pub use service::{RedirectorConfig, RedirectorService};
