//! HTTP/JSON API.
//!
//! `api_router()` returns the full axum `Router`; `server` binds it and
//! manages shutdown. Protected routes run behind Auth → Audit.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;
pub mod validation;

pub use router::api_router;
pub use server::{start_api_server, ApiServer};
pub use types::ApiContext;
