//! HTTP surface: application state, session-auth extractors, handlers
//! and the route table.

use std::future::{ready, Ready};

use actix_session::{Session, SessionExt};
use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest, HttpResponse};
use diesel::pg::PgConnection;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use rand::Rng;
use rust_decimal::Decimal;
use serde_json::json;

use crate::basket::{self, Basket};
use crate::db::connection::PgPool;
use crate::db::models::{NewCategory, NewProduct, NewUser, UpdateProduct};
use crate::db::repository;
use crate::error::ApiError;
use crate::models::*;
use crate::payment::{self, PaymentClient};

pub const SESSION_USER_KEY: &str = "user";

pub struct AppState {
    pub pool: PgPool,
    pub payments: PaymentClient,
}

// Session-auth extractors

pub struct AuthUser {
    pub id: i32,
    pub is_staff: bool,
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let session = req.get_session();
        match session.get::<SessionUser>(SESSION_USER_KEY) {
            Ok(Some(user)) => ready(Ok(AuthUser {
                id: user.id,
                is_staff: user.is_staff,
            })),
            _ => ready(Err(ApiError::Unauthorized("login required".into()))),
        }
    }
}

/// Staff gate for the catalog-mutation endpoints.
pub struct StaffUser(pub AuthUser);

impl FromRequest for StaffUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let session = req.get_session();
        let result = match session.get::<SessionUser>(SESSION_USER_KEY) {
            Ok(Some(user)) if user.is_staff => Ok(StaffUser(AuthUser {
                id: user.id,
                is_staff: true,
            })),
            Ok(Some(_)) => Err(ApiError::Forbidden("staff access required".into())),
            _ => Err(ApiError::Unauthorized("login required".into())),
        };
        ready(result)
    }
}

// Validation

fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn validate_product(product: &CreateProductRequest) -> Result<(), ApiError> {
    if product.title.trim().is_empty() {
        return Err(ApiError::Validation("product title cannot be empty".into()));
    }
    if product.price <= Decimal::ZERO {
        return Err(ApiError::Validation(
            "product price must be greater than 0".into(),
        ));
    }
    if product.image.trim().is_empty() {
        return Err(ApiError::Validation("product image cannot be empty".into()));
    }
    if !is_valid_slug(&product.slug) {
        return Err(ApiError::Validation(
            "slug may only contain letters, numbers, dashes and underscores".into(),
        ));
    }
    Ok(())
}

// Catalog handlers

async fn list_products(
    data: web::Data<AppState>,
    query: web::Query<ProductQuery>,
) -> Result<HttpResponse, ApiError> {
    let conn = &mut data.pool.get()?;
    let mut products = repository::list_active_products(conn)?;

    if let Some(search) = &query.search {
        let needle = search.to_lowercase();
        products.retain(|p| {
            p.title.to_lowercase().contains(&needle)
                || p.author.to_lowercase().contains(&needle)
                || p.description.to_lowercase().contains(&needle)
        });
    }
    if query.in_stock.unwrap_or(false) {
        products.retain(|p| p.in_stock);
    }

    Ok(HttpResponse::Ok().json(products))
}

async fn product_detail(
    data: web::Data<AppState>,
    slug: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let slug = slug.into_inner();
    let conn = &mut data.pool.get()?;
    let product = repository::get_product_by_slug(conn, &slug)?
        .ok_or_else(|| ApiError::NotFound(format!("no active product with slug '{slug}'")))?;
    Ok(HttpResponse::Ok().json(product))
}

async fn list_categories(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let conn = &mut data.pool.get()?;
    let categories = repository::list_categories(conn)?;
    Ok(HttpResponse::Ok().json(categories))
}

async fn category_detail(
    data: web::Data<AppState>,
    slug: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let slug = slug.into_inner();
    let conn = &mut data.pool.get()?;
    let category = repository::get_category_by_slug(conn, &slug)?
        .ok_or_else(|| ApiError::NotFound(format!("no category with slug '{slug}'")))?;
    let products = repository::list_active_products_in_category(conn, category.id)?;
    Ok(HttpResponse::Ok().json(CategoryDetail { category, products }))
}

async fn create_category(
    _staff: StaffUser,
    data: web::Data<AppState>,
    payload: web::Json<CreateCategoryRequest>,
) -> Result<HttpResponse, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("category name cannot be empty".into()));
    }
    if !is_valid_slug(&payload.slug) {
        return Err(ApiError::Validation(
            "slug may only contain letters, numbers, dashes and underscores".into(),
        ));
    }

    let conn = &mut data.pool.get()?;
    let new_category = NewCategory {
        name: payload.name.clone(),
        slug: payload.slug.clone(),
    };
    match repository::create_category(conn, new_category) {
        Ok(category) => Ok(HttpResponse::Created().json(category)),
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => Err(
            ApiError::Conflict(format!("category slug '{}' already exists", payload.slug)),
        ),
        Err(err) => Err(err.into()),
    }
}

async fn create_product(
    staff: StaffUser,
    data: web::Data<AppState>,
    payload: web::Json<CreateProductRequest>,
) -> Result<HttpResponse, ApiError> {
    validate_product(&payload)?;

    let conn = &mut data.pool.get()?;
    repository::get_category(conn, payload.category_id)?.ok_or_else(|| {
        ApiError::Validation(format!("category {} does not exist", payload.category_id))
    })?;

    let new_product = NewProduct {
        category_id: payload.category_id,
        // Recorded from the session identity; the body cannot set it.
        created_by: staff.0.id,
        title: payload.title.clone(),
        author: payload.author.clone(),
        description: payload.description.clone(),
        image: payload.image.clone(),
        price: payload.price,
        in_stock: payload.in_stock,
        is_active: payload.is_active,
        slug: payload.slug.clone(),
    };
    let product = repository::create_product(conn, new_product)?;
    log::info!("product {} created by user {}", product.id, staff.0.id);
    Ok(HttpResponse::Created().json(product))
}

async fn update_product(
    _staff: StaffUser,
    data: web::Data<AppState>,
    id: web::Path<i32>,
    payload: web::Json<UpdateProduct>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    if let Some(price) = payload.price {
        if price <= Decimal::ZERO {
            return Err(ApiError::Validation(
                "product price must be greater than 0".into(),
            ));
        }
    }
    if let Some(slug) = &payload.slug {
        if !is_valid_slug(slug) {
            return Err(ApiError::Validation(
                "slug may only contain letters, numbers, dashes and underscores".into(),
            ));
        }
    }

    let conn = &mut data.pool.get()?;
    let product = repository::update_product(conn, id, payload.into_inner())?
        .ok_or_else(|| ApiError::NotFound(format!("no product with id {id}")))?;
    Ok(HttpResponse::Ok().json(product))
}

// Basket handlers

fn refresh_summary(
    conn: &mut PgConnection,
    session: &Session,
    stored: basket::StoredBasket,
) -> Result<BasketSummary, ApiError> {
    let products = repository::list_active_products_by_ids(conn, &basket::product_ids(&stored))?;
    let (hydrated, pruned) = Basket::from_products(&stored, &products);
    if pruned {
        basket::store(session, &hydrated.to_stored())?;
    }
    Ok(BasketSummary::from(hydrated))
}

async fn basket_summary(
    session: Session,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let stored = basket::load(&session)?;
    if stored.is_empty() {
        return Ok(HttpResponse::Ok().json(BasketSummary::empty()));
    }
    let conn = &mut data.pool.get()?;
    let summary = refresh_summary(conn, &session, stored)?;
    Ok(HttpResponse::Ok().json(summary))
}

async fn basket_add(
    session: Session,
    data: web::Data<AppState>,
    payload: web::Json<AddToBasketRequest>,
) -> Result<HttpResponse, ApiError> {
    if payload.quantity == 0 {
        return Err(ApiError::Validation("quantity must be at least 1".into()));
    }

    let conn = &mut data.pool.get()?;
    let product = repository::get_active_product(conn, payload.product_id)?.ok_or_else(|| {
        ApiError::NotFound(format!("no active product with id {}", payload.product_id))
    })?;

    let mut stored = basket::load(&session)?;
    let entry = stored.entry(product.id.to_string()).or_insert(0);
    *entry = entry.saturating_add(payload.quantity);
    basket::store(&session, &stored)?;

    let summary = refresh_summary(conn, &session, stored)?;
    Ok(HttpResponse::Ok().json(summary))
}

async fn basket_update(
    session: Session,
    data: web::Data<AppState>,
    payload: web::Json<UpdateBasketRequest>,
) -> Result<HttpResponse, ApiError> {
    let mut stored = basket::load(&session)?;
    let key = payload.product_id.to_string();
    if !stored.contains_key(&key) {
        return Err(ApiError::NotFound(format!(
            "product {} is not in the basket",
            payload.product_id
        )));
    }

    if payload.quantity == 0 {
        stored.remove(&key);
    } else {
        stored.insert(key, payload.quantity);
    }
    basket::store(&session, &stored)?;

    if stored.is_empty() {
        return Ok(HttpResponse::Ok().json(BasketSummary::empty()));
    }
    let conn = &mut data.pool.get()?;
    let summary = refresh_summary(conn, &session, stored)?;
    Ok(HttpResponse::Ok().json(summary))
}

async fn basket_delete(
    session: Session,
    data: web::Data<AppState>,
    payload: web::Json<RemoveFromBasketRequest>,
) -> Result<HttpResponse, ApiError> {
    let mut stored = basket::load(&session)?;
    if stored.remove(&payload.product_id.to_string()).is_none() {
        return Err(ApiError::NotFound(format!(
            "product {} is not in the basket",
            payload.product_id
        )));
    }
    basket::store(&session, &stored)?;

    if stored.is_empty() {
        return Ok(HttpResponse::Ok().json(BasketSummary::empty()));
    }
    let conn = &mut data.pool.get()?;
    let summary = refresh_summary(conn, &session, stored)?;
    Ok(HttpResponse::Ok().json(summary))
}

// Checkout

async fn checkout(
    user: AuthUser,
    session: Session,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let stored = basket::load(&session)?;
    if stored.is_empty() {
        return Err(ApiError::Validation("basket is empty".into()));
    }

    let basket = {
        let conn = &mut data.pool.get()?;
        let products =
            repository::list_active_products_by_ids(conn, &basket::product_ids(&stored))?;
        let (hydrated, pruned) = Basket::from_products(&stored, &products);
        if pruned {
            basket::store(&session, &hydrated.to_stored())?;
        }
        hydrated
    };
    if basket.is_empty() {
        return Err(ApiError::Validation("basket is empty".into()));
    }

    let amount = payment::to_minor_units(basket.get_total_price())?;
    let intent = data.payments.create_payment_intent(amount, user.id).await?;
    log::info!(
        "payment intent {} created for user {} ({} {})",
        intent.id,
        user.id,
        intent.amount,
        intent.currency
    );

    Ok(HttpResponse::Ok().json(CheckoutResponse {
        client_secret: intent.client_secret,
        payment_intent_id: intent.id,
        amount: intent.amount,
        currency: intent.currency,
    }))
}

// Account handlers

async fn register(
    data: web::Data<AppState>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    if payload.username.trim().is_empty() {
        return Err(ApiError::Validation("username cannot be empty".into()));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::Validation(
            "password must be at least 8 characters".into(),
        ));
    }

    let conn = &mut data.pool.get()?;
    if repository::find_user_by_username(conn, &payload.username)?.is_some() {
        return Err(ApiError::Conflict("username already exists".into()));
    }

    let salt: [u8; 16] = rand::thread_rng().gen();
    let password_hash =
        argon2::hash_encoded(payload.password.as_bytes(), &salt, &argon2::Config::default())
            .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))?;

    let user = repository::create_user(
        conn,
        NewUser {
            username: payload.username.clone(),
            password_hash,
            is_staff: false,
        },
    )?;
    Ok(HttpResponse::Created().json(AccountResponse {
        id: user.id,
        username: user.username,
        is_staff: user.is_staff,
    }))
}

async fn login(
    session: Session,
    data: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let conn = &mut data.pool.get()?;
    let user = repository::find_user_by_username(conn, &payload.username)?
        .ok_or_else(|| ApiError::Unauthorized("invalid credentials".into()))?;

    let verified = argon2::verify_encoded(&user.password_hash, payload.password.as_bytes())
        .unwrap_or(false);
    if !verified {
        return Err(ApiError::Unauthorized("invalid credentials".into()));
    }

    session.renew();
    session.insert(
        SESSION_USER_KEY,
        SessionUser {
            id: user.id,
            is_staff: user.is_staff,
        },
    )?;
    log::info!("user {} logged in", user.id);

    Ok(HttpResponse::Ok().json(AccountResponse {
        id: user.id,
        username: user.username,
        is_staff: user.is_staff,
    }))
}

async fn logout(session: Session) -> HttpResponse {
    session.purge();
    HttpResponse::Ok().json(json!({ "message": "logged out" }))
}

// Route table

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/store/", web::get().to(list_products))
        .route("/store/product/{slug}/", web::get().to(product_detail))
        .route("/store/categories/", web::get().to(list_categories))
        .route("/store/categories/", web::post().to(create_category))
        .route("/store/category/{slug}/", web::get().to(category_detail))
        .route("/store/products/", web::post().to(create_product))
        .route("/store/products/{id}/", web::patch().to(update_product))
        .route("/basket/", web::get().to(basket_summary))
        .route("/basket/add/", web::post().to(basket_add))
        .route("/basket/update/", web::post().to(basket_update))
        .route("/basket/delete/", web::post().to(basket_delete))
        .route("/checkout/", web::post().to(checkout))
        .route("/account/register/", web::post().to(register))
        .route("/account/login/", web::post().to(login))
        .route("/account/logout/", web::post().to(logout));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(price: Decimal, title: &str, slug: &str) -> CreateProductRequest {
        CreateProductRequest {
            category_id: 1,
            title: title.to_string(),
            author: "admin".to_string(),
            description: String::new(),
            image: "images/cover.jpg".to_string(),
            price,
            in_stock: true,
            is_active: true,
            slug: slug.to_string(),
        }
    }

    #[test]
    fn slug_validation() {
        assert!(is_valid_slug("war-and-peace"));
        assert!(is_valid_slug("book_2"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("no spaces"));
        assert!(!is_valid_slug("nope/nope"));
    }

    #[test]
    fn product_validation_rejects_bad_input() {
        assert!(validate_product(&request(dec!(9.99), "Dune", "dune")).is_ok());
        assert!(validate_product(&request(dec!(0), "Dune", "dune")).is_err());
        assert!(validate_product(&request(dec!(-1), "Dune", "dune")).is_err());
        assert!(validate_product(&request(dec!(9.99), "  ", "dune")).is_err());
        assert!(validate_product(&request(dec!(9.99), "Dune", "bad slug")).is_err());
    }
}
