//! Hold lifecycle: overlap reads, hold commits, confirmation, cancellation
//! and expiry.

pub mod confirmation;
pub mod expiry;
pub mod ledger;
pub mod model;
pub mod number;
pub mod overlap;
pub mod repository;
pub mod repository_sqlx;
