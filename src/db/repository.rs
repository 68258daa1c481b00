use chrono::Utc;
use diesel::prelude::*;

use crate::db::models::*;
use crate::db::schema::{categories, products, users};

// Categories

pub fn create_category(conn: &mut PgConnection, new_category: NewCategory) -> QueryResult<Category> {
    diesel::insert_into(categories::table)
        .values(&new_category)
        .get_result(conn)
}

pub fn list_categories(conn: &mut PgConnection) -> QueryResult<Vec<Category>> {
    categories::table.order(categories::name.asc()).load(conn)
}

pub fn get_category(conn: &mut PgConnection, id: i32) -> QueryResult<Option<Category>> {
    categories::table.find(id).first(conn).optional()
}

pub fn get_category_by_slug(conn: &mut PgConnection, slug: &str) -> QueryResult<Option<Category>> {
    categories::table
        .filter(categories::slug.eq(slug))
        .first(conn)
        .optional()
}

// Products
//
// The active view excludes is_active = false rows everywhere; the
// unfiltered queries exist for the staff surface only.

pub fn create_product(conn: &mut PgConnection, new_product: NewProduct) -> QueryResult<Product> {
    diesel::insert_into(products::table)
        .values(&new_product)
        .get_result(conn)
}

pub fn update_product(
    conn: &mut PgConnection,
    id: i32,
    changes: UpdateProduct,
) -> QueryResult<Option<Product>> {
    diesel::update(products::table.find(id))
        .set((changes, products::updated_at.eq(Utc::now().naive_utc())))
        .get_result(conn)
        .optional()
}

pub fn list_products(conn: &mut PgConnection) -> QueryResult<Vec<Product>> {
    products::table
        .order(products::created_at.desc())
        .load(conn)
}

pub fn list_active_products(conn: &mut PgConnection) -> QueryResult<Vec<Product>> {
    products::table
        .filter(products::is_active.eq(true))
        .order(products::created_at.desc())
        .load(conn)
}

pub fn list_active_products_in_category(
    conn: &mut PgConnection,
    category_id: i32,
) -> QueryResult<Vec<Product>> {
    products::table
        .filter(products::category_id.eq(category_id))
        .filter(products::is_active.eq(true))
        .order(products::created_at.desc())
        .load(conn)
}

pub fn list_active_products_by_ids(
    conn: &mut PgConnection,
    ids: &[i32],
) -> QueryResult<Vec<Product>> {
    products::table
        .filter(products::id.eq_any(ids))
        .filter(products::is_active.eq(true))
        .load(conn)
}

pub fn get_active_product(conn: &mut PgConnection, id: i32) -> QueryResult<Option<Product>> {
    products::table
        .find(id)
        .filter(products::is_active.eq(true))
        .first(conn)
        .optional()
}

/// Slug lookup over the active view: an inactive product's slug behaves
/// exactly like a missing one.
pub fn get_product_by_slug(conn: &mut PgConnection, slug: &str) -> QueryResult<Option<Product>> {
    products::table
        .filter(products::slug.eq(slug))
        .filter(products::is_active.eq(true))
        .first(conn)
        .optional()
}

// Users

pub fn create_user(conn: &mut PgConnection, new_user: NewUser) -> QueryResult<User> {
    diesel::insert_into(users::table)
        .values(&new_user)
        .get_result(conn)
}

pub fn find_user_by_username(
    conn: &mut PgConnection,
    username: &str,
) -> QueryResult<Option<User>> {
    users::table
        .filter(users::username.eq(username))
        .first(conn)
        .optional()
}
