//! # Middleware Stack
//!
//! - [`metrics`]: in-process request and error counters.
//!
//! Request tracing uses `tower_http::trace::TraceLayer` directly and
//! authentication lives in [`crate::auth`].

pub mod metrics;
