//! Read-only lookups of slots and tables.

pub mod repository_sqlx;

use anyhow::Result;
use async_trait::async_trait;

use corelib::models::{Slot, Table};

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn fetch_slot(&self, slot_id: &str) -> Result<Option<Slot>>;

    /// Active tables of one restaurant, in catalog order.
    async fn fetch_active_tables(&self, restaurant_id: &str) -> Result<Vec<Table>>;

    /// Active slots of one event, earliest first.
    async fn fetch_active_slots(&self, event_id: &str) -> Result<Vec<Slot>>;
}
