pub mod connection;
pub mod models;
pub mod repository;
pub mod schema;

use diesel_migrations::{embed_migrations, EmbeddedMigrations};

pub use connection::*;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");
