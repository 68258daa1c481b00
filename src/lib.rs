pub mod app;
pub mod basket;
pub mod db;
pub mod error;
pub mod models;
pub mod payment;
pub mod settings;
