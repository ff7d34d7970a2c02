//! Axum middleware settings applied to the router.
//!
//! Includes request tracing, timeout enforcement, response compression, and a
//! request body cap.

use std::time::Duration;

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest accepted request body, in bytes.
pub const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;
