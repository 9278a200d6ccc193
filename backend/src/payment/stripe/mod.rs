//! Stripe over its REST API. No SDK: form-encoded requests via `reqwest` and
//! HMAC-SHA256 webhook verification.

pub mod client;
pub mod signature;
pub mod types;

pub use client::StripeGateway;
