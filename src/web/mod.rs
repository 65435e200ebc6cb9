//! Web API module.
//!
//! This module provides the HTTP surface: multipart uploads, downloads,
//! range-aware streaming and the polling chat.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::{create_health_router, create_router};
pub use server::WebServer;
