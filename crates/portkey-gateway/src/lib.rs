//! HTTP surface of Portkey.
//!
//! [`App::router`] mounts the dashboard API under `/api/urls/`, the public
//! redirect under `/{code}` and `/s/{code}`, and the small account and
//! health endpoints. Identity comes from a [`SessionStore`]; the gateway
//! itself never authenticates anyone.

pub mod app;
pub mod csrf;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod model;
pub mod session;
pub mod state;

pub use app::App;
pub use error::{AppError, Result};
pub use session::{SessionStore, StaticSessions};
pub use state::AppState;
