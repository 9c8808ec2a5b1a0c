//! # Middleware
//!
//! The cross-cutting stages of the request pipeline. Ordering matters and is
//! fixed at construction time in `routes.rs`:
//!
//! recover → trace → timeout → security headers → session → csrf →
//! authenticate → [require_auth] → handler
//!
//! ## Submodules
//! - `recover`: outermost panic/error recovery and failure logging
//! - `headers`: security headers on every response
//! - `session`: loads session state before the handler, persists it after
//! - `csrf`: anti-forgery token minting and validation
//! - `auth`: auth propagation (`AuthContext`) and the protected-route guard

pub mod auth;
pub mod csrf;
pub mod headers;
pub mod recover;
pub mod session;
