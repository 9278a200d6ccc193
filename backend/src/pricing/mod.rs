//! Server-side pricing of hold requests.
//!
//! Amounts are never taken from the caller: every line is re-priced from the
//! menu catalog at hold time and the result is fixed on the reservation.

pub mod repository_sqlx;

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::AppError;

#[async_trait]
pub trait PriceLookup: Send + Sync {
    /// Unit prices in minor units, keyed by item id. Unknown ids are absent.
    async fn unit_prices(
        &self,
        restaurant_id: &str,
        item_ids: &[String],
    ) -> Result<HashMap<String, i64>>;
}

/// One ordered menu item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineItem {
    pub item_id: String,
    pub quantity: u32,
}

/// A line item with the unit price captured at hold time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PricedLine {
    pub item_id: String,
    pub quantity: u32,
    pub unit_price: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Quote {
    pub lines: Vec<PricedLine>,
    pub total_amount: i64,
}

/// Prices `items` against `prices`.
///
/// Duplicate item ids are merged. Unknown items and arithmetic overflow are
/// validation errors.
pub fn quote(items: &[LineItem], prices: &HashMap<String, i64>) -> Result<Quote, AppError> {
    let mut lines: Vec<PricedLine> = Vec::with_capacity(items.len());

    for item in items {
        if item.quantity == 0 {
            return Err(AppError::Validation(format!(
                "quantity for item {} must be at least 1",
                item.item_id
            )));
        }

        let Some(&unit_price) = prices.get(&item.item_id) else {
            return Err(AppError::Validation(format!(
                "unknown menu item: {}",
                item.item_id
            )));
        };

        match lines.iter_mut().find(|l| l.item_id == item.item_id) {
            Some(line) => {
                line.quantity = line.quantity.checked_add(item.quantity).ok_or_else(|| {
                    AppError::Validation(format!("quantity overflow for {}", item.item_id))
                })?;
            }
            None => lines.push(PricedLine {
                item_id: item.item_id.clone(),
                quantity: item.quantity,
                unit_price,
            }),
        }
    }

    let mut total_amount: i64 = 0;
    for line in &lines {
        total_amount = line
            .unit_price
            .checked_mul(i64::from(line.quantity))
            .and_then(|sub| total_amount.checked_add(sub))
            .ok_or_else(|| AppError::Validation("order total overflows".to_string()))?;
    }

    Ok(Quote {
        lines,
        total_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn prices() -> HashMap<String, i64> {
        HashMap::from([
            ("tasting".to_string(), 8_500),
            ("wine".to_string(), 3_200),
            ("water".to_string(), 0),
        ])
    }

    fn line(id: &str, quantity: u32) -> LineItem {
        LineItem {
            item_id: id.to_string(),
            quantity,
        }
    }

    #[test]
    fn sums_unit_price_times_quantity() {
        let q = quote(&[line("tasting", 2), line("wine", 1)], &prices()).unwrap();
        assert_eq!(q.total_amount, 2 * 8_500 + 3_200);
        assert_eq!(q.lines.len(), 2);
    }

    #[test]
    fn empty_order_costs_nothing() {
        let q = quote(&[], &prices()).unwrap();
        assert_eq!(q.total_amount, 0);
        assert!(q.lines.is_empty());
    }

    #[test]
    fn duplicate_lines_are_merged() {
        let q = quote(&[line("wine", 1), line("wine", 2)], &prices()).unwrap();
        assert_eq!(q.lines, vec![PricedLine {
            item_id: "wine".to_string(),
            quantity: 3,
            unit_price: 3_200,
        }]);
        assert_eq!(q.total_amount, 9_600);
    }

    #[test]
    fn unknown_item_is_rejected() {
        let err = quote(&[line("caviar", 1)], &prices()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let err = quote(&[line("wine", 0)], &prices()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn overflow_is_rejected() {
        let prices = HashMap::from([("gold".to_string(), i64::MAX)]);
        let err = quote(&[line("gold", 2)], &prices).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    proptest! {
        #[test]
        fn total_matches_catalog_sum(
            qtys in prop::collection::vec((0usize..3, 1u32..20), 0..12),
        ) {
            let ids = ["tasting", "wine", "water"];
            let items: Vec<LineItem> = qtys.iter().map(|(i, q)| line(ids[*i], *q)).collect();

            let expected: i64 = items
                .iter()
                .map(|it| prices()[&it.item_id] * i64::from(it.quantity))
                .sum();

            let q = quote(&items, &prices()).unwrap();
            prop_assert_eq!(q.total_amount, expected);
        }
    }
}
