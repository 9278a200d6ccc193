//! Domain model and pure decision logic for table reservations.
//!
//! Nothing in this crate performs I/O. Persistence, payment and transport live
//! in the `backend` crate and feed plain values into these functions.

pub mod assignment;
pub mod models;
pub mod overlap;
