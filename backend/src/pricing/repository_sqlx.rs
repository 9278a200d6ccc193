use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{AnyPool, Row};

use crate::pricing::PriceLookup;

/// Menu prices from the `menu_items` table.
pub struct SqlxPriceLookup {
    pool: AnyPool,
}

impl SqlxPriceLookup {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PriceLookup for SqlxPriceLookup {
    async fn unit_prices(
        &self,
        restaurant_id: &str,
        item_ids: &[String],
    ) -> anyhow::Result<HashMap<String, i64>> {
        let mut out = HashMap::with_capacity(item_ids.len());

        for item_id in item_ids {
            if out.contains_key(item_id) {
                continue;
            }

            let row = sqlx::query(
                r#"
SELECT unit_price
FROM menu_items
WHERE item_id = ? AND restaurant_id = ?;
"#,
            )
            .bind(item_id)
            .bind(restaurant_id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("price lookup failed for {item_id}"))?;

            if let Some(r) = row {
                out.insert(item_id.clone(), r.get::<i64, _>("unit_price"));
            }
        }

        Ok(out)
    }
}
