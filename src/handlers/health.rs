//! Liveness endpoint for load balancers and uptime checks.
//!
//! Deliberately wired outside the dynamic chain: no session, no CSRF, no
//! auth propagation.

pub async fn ping() -> &'static str {
    "OK"
}
