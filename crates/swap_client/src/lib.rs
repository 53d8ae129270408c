//! HTTP access to the battery-swap backend.
//!
//! [`ApiClient`] covers the pillar and slot endpoints used by the grid
//! manager. All failures are normalized into [`ApiError`].

mod api;
mod auth;
mod config;
mod error;

pub use crate::api::ApiClient;
pub use crate::auth::{MemoryTokenStore, TokenStore};
pub use crate::config::{ClientConfig, DEFAULT_TIMEOUT};
pub use crate::error::{ApiError, ErrorBody, NETWORK_ERROR_MESSAGE};
