//! HTTP API: `POST /api/search`, `GET /health` and optional `GET /metrics`

pub mod error;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{ApiServer, AppState};
