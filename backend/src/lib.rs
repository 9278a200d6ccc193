pub mod api;
pub mod catalog;
pub mod config;
pub mod db;
pub mod metrics;
pub mod payment;
pub mod pricing;
pub mod reservation;

pub mod error;
pub mod logger;
pub mod time;
