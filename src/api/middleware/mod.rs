//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Auth validator: bearer token → `Caller` (protected routes only)
//! 2. Access logger: method, path, status, user id, latency

pub mod audit;
pub mod auth;
