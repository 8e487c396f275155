//! Click recording and analytics.
//!
//! [`ClickRecorder`] is the [`ClickSink`](portkey_core::ClickSink) used on
//! the redirect path: it queues clicks and a background worker appends them
//! to the click log with bounded retries. [`Aggregator`] reads the log back
//! for URL owners.

pub mod aggregator;
pub mod error;
pub mod recorder;
pub mod retry;

pub use aggregator::{Aggregator, Analytics, UrlAnalytics, UrlClicks};
pub use error::{AnalyticsError, Result};
pub use recorder::{ClickRecorder, RecorderConfig, RecorderHandle};
pub use retry::RetryPolicy;
