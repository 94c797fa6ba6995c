//! HTTP surface of the Overseer orchestrator.
//!
//! [`GatewayServer::build`] returns an axum [`Router`](axum::Router) serving
//! task submission, listing and cancellation, system state, and direct
//! access to the decision, automation and healing agents.

/// Error to HTTP status mapping.
pub mod error;
/// API-key authentication.
pub mod middleware;
/// Router and request handlers.
pub mod server;

pub use error::ApiError;
pub use middleware::AuthConfig;
pub use server::{GatewayServer, TaskRequest};
