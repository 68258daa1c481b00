//! Session-scoped shopping basket.
//!
//! Only product id → quantity pairs live in the cookie session. Prices
//! are never stored there: the basket is rehydrated against the live
//! catalog on every request, so a line always carries the current
//! product price.

use std::collections::BTreeMap;

use actix_session::Session;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::models::Product;
use crate::error::ApiError;

pub const BASKET_SESSION_KEY: &str = "basket";

/// Raw session form of the basket. Keys are stringified product ids so
/// the map survives JSON round-trips through the session store.
pub type StoredBasket = BTreeMap<String, u32>;

pub fn load(session: &Session) -> Result<StoredBasket, ApiError> {
    Ok(session.get::<StoredBasket>(BASKET_SESSION_KEY)?.unwrap_or_default())
}

pub fn store(session: &Session, stored: &StoredBasket) -> Result<(), ApiError> {
    if stored.is_empty() {
        session.remove(BASKET_SESSION_KEY);
        Ok(())
    } else {
        Ok(session.insert(BASKET_SESSION_KEY, stored)?)
    }
}

pub fn product_ids(stored: &StoredBasket) -> Vec<i32> {
    stored.keys().filter_map(|key| key.parse().ok()).collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct BasketLine {
    pub product_id: i32,
    pub title: String,
    pub slug: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
}

#[derive(Debug, Default, Serialize)]
pub struct Basket {
    pub lines: Vec<BasketLine>,
}

impl Basket {
    /// Hydrates the stored map against the given live catalog rows.
    ///
    /// Lines whose product is missing from `products` (deleted or no
    /// longer active) are dropped; the second value reports whether any
    /// pruning happened so the caller can rewrite the session.
    pub fn from_products(stored: &StoredBasket, products: &[Product]) -> (Basket, bool) {
        let mut lines = Vec::with_capacity(stored.len());
        let mut pruned = false;

        for (key, &quantity) in stored {
            let product = key
                .parse::<i32>()
                .ok()
                .and_then(|id| products.iter().find(|p| p.id == id));
            let Some(product) = product else {
                pruned = true;
                continue;
            };
            if quantity == 0 {
                pruned = true;
                continue;
            }
            let unit_price = product.price;
            lines.push(BasketLine {
                product_id: product.id,
                title: product.title.clone(),
                slug: product.slug.clone(),
                unit_price,
                quantity,
                line_total: unit_price * Decimal::from(quantity),
            });
        }

        (Basket { lines }, pruned)
    }

    /// Σ unit price × quantity over all lines. Zero for an empty basket.
    pub fn get_total_price(&self) -> Decimal {
        self.lines.iter().map(|line| line.line_total).sum()
    }

    pub fn total_items(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn to_stored(&self) -> StoredBasket {
        self.lines
            .iter()
            .map(|line| (line.product_id.to_string(), line.quantity))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use rust_decimal_macros::dec;

    fn product(id: i32, price: Decimal, is_active: bool) -> Product {
        Product {
            id,
            category_id: 1,
            created_by: 1,
            title: format!("Book {id}"),
            author: "admin".to_string(),
            description: String::new(),
            image: "images/placeholder.jpg".to_string(),
            price,
            in_stock: true,
            is_active,
            created_at: NaiveDateTime::default(),
            updated_at: NaiveDateTime::default(),
            slug: format!("book-{id}"),
        }
    }

    fn stored(entries: &[(i32, u32)]) -> StoredBasket {
        entries
            .iter()
            .map(|(id, qty)| (id.to_string(), *qty))
            .collect()
    }

    #[test]
    fn empty_basket_totals_zero() {
        let (basket, pruned) = Basket::from_products(&StoredBasket::new(), &[]);
        assert!(basket.is_empty());
        assert!(!pruned);
        assert_eq!(basket.get_total_price(), Decimal::ZERO);
    }

    #[test]
    fn total_is_sum_of_price_times_quantity() {
        let catalog = vec![
            product(1, dec!(10.50), true),
            product(2, dec!(3.99), true),
            product(3, dec!(0.01), true),
        ];
        let (basket, pruned) =
            Basket::from_products(&stored(&[(1, 2), (2, 3), (3, 7)]), &catalog);
        assert!(!pruned);
        assert_eq!(basket.get_total_price(), dec!(21.00) + dec!(11.97) + dec!(0.07));
        assert_eq!(basket.total_items(), 12);
    }

    #[test]
    fn single_line_scenario_from_the_catalog() {
        let catalog = vec![product(1, dec!(10.50), true)];
        let (basket, _) = Basket::from_products(&stored(&[(1, 2)]), &catalog);
        assert_eq!(basket.get_total_price(), dec!(21.00));
    }

    #[test]
    fn lines_for_vanished_products_are_pruned() {
        // Product 2 was deleted from the catalog between requests.
        let catalog = vec![product(1, dec!(5.00), true)];
        let (basket, pruned) = Basket::from_products(&stored(&[(1, 1), (2, 4)]), &catalog);
        assert!(pruned);
        assert_eq!(basket.lines.len(), 1);
        assert_eq!(basket.get_total_price(), dec!(5.00));
        assert_eq!(basket.to_stored(), stored(&[(1, 1)]));
    }

    #[test]
    fn hydration_uses_the_live_price() {
        // The session never stores prices, so a catalog price change is
        // reflected on the next hydration.
        let catalog = vec![product(1, dec!(12.00), true)];
        let (basket, _) = Basket::from_products(&stored(&[(1, 1)]), &catalog);
        assert_eq!(basket.get_total_price(), dec!(12.00));

        let repriced = vec![product(1, dec!(9.99), true)];
        let (basket, _) = Basket::from_products(&stored(&[(1, 1)]), &repriced);
        assert_eq!(basket.get_total_price(), dec!(9.99));
    }

    #[test]
    fn zero_quantity_entries_are_dropped() {
        let catalog = vec![product(1, dec!(5.00), true)];
        let (basket, pruned) = Basket::from_products(&stored(&[(1, 0)]), &catalog);
        assert!(pruned);
        assert!(basket.is_empty());
    }
}
