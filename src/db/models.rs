use chrono::NaiveDateTime;
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::schema::{categories, products, users};

#[derive(Queryable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = categories)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub created_at: NaiveDateTime,
}

impl Category {
    pub fn url(&self) -> String {
        category_url(&self.slug)
    }
}

#[derive(Insertable, Deserialize)]
#[diesel(table_name = categories)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
}

#[derive(Queryable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = products)]
pub struct Product {
    pub id: i32,
    pub category_id: i32,
    pub created_by: i32,
    pub title: String,
    pub author: String,
    pub description: String,
    pub image: String,
    pub price: Decimal,
    pub in_stock: bool,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub slug: String,
}

impl Product {
    pub fn url(&self) -> String {
        product_url(&self.slug)
    }
}

#[derive(Insertable, Deserialize)]
#[diesel(table_name = products)]
pub struct NewProduct {
    pub category_id: i32,
    pub created_by: i32,
    pub title: String,
    pub author: String,
    pub description: String,
    pub image: String,
    pub price: Decimal,
    pub in_stock: bool,
    pub is_active: bool,
    pub slug: String,
}

#[derive(AsChangeset, Deserialize, Default)]
#[diesel(table_name = products)]
pub struct UpdateProduct {
    pub category_id: Option<i32>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub price: Option<Decimal>,
    pub in_stock: Option<bool>,
    pub is_active: Option<bool>,
    pub slug: Option<String>,
}

#[derive(Queryable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub is_staff: bool,
}

#[derive(Insertable, Deserialize)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub is_staff: bool,
}

/// Canonical page URL for a product. Deterministic in the slug.
pub fn product_url(slug: &str) -> String {
    format!("/store/product/{slug}/")
}

/// Canonical page URL for a category. Deterministic in the slug.
pub fn category_url(slug: &str) -> String {
    format!("/store/category/{slug}/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_url_is_pure_in_the_slug() {
        assert_eq!(product_url("war-and-peace"), "/store/product/war-and-peace/");
        assert_eq!(product_url("war-and-peace"), product_url("war-and-peace"));
    }

    #[test]
    fn category_url_is_pure_in_the_slug() {
        assert_eq!(category_url("fiction"), "/store/category/fiction/");
        assert_eq!(category_url("non_fiction"), "/store/category/non_fiction/");
    }
}
