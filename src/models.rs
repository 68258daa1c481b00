use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::basket::{Basket, BasketLine};
use crate::db::models::{Category, Product};

fn default_author() -> String {
    "admin".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub category_id: i32,
    pub title: String,
    #[serde(default = "default_author")]
    pub author: String,
    #[serde(default)]
    pub description: String,
    pub image: String,
    pub price: Decimal,
    #[serde(default = "default_true")]
    pub in_stock: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub slug: String,
}

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub in_stock: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct CategoryDetail {
    pub category: Category,
    pub products: Vec<Product>,
}

#[derive(Debug, Deserialize)]
pub struct AddToBasketRequest {
    pub product_id: i32,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBasketRequest {
    pub product_id: i32,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct RemoveFromBasketRequest {
    pub product_id: i32,
}

#[derive(Debug, Serialize)]
pub struct BasketSummary {
    pub lines: Vec<BasketLine>,
    pub total_items: u32,
    pub total_price: Decimal,
}

impl BasketSummary {
    pub fn empty() -> Self {
        Self {
            lines: Vec::new(),
            total_items: 0,
            total_price: Decimal::ZERO,
        }
    }
}

impl From<Basket> for BasketSummary {
    fn from(basket: Basket) -> Self {
        Self {
            total_items: basket.total_items(),
            total_price: basket.get_total_price(),
            lines: basket.lines,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub client_secret: String,
    pub payment_intent_id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: i32,
    pub username: String,
    pub is_staff: bool,
}

/// Identity stored in the session after login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i32,
    pub is_staff: bool,
}
