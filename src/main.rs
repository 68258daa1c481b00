use actix_cors::Cors;
use actix_session::storage::CookieSessionStore;
use actix_session::SessionMiddleware;
use actix_web::cookie::Key;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use diesel_migrations::MigrationHarness;

use storefront_backend::app::{self, AppState};
use storefront_backend::db::{self, connection};
use storefront_backend::payment::{PaymentClient, PaymentConfig};
use storefront_backend::settings::Settings;

fn to_io_error(err: impl ToString) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let settings = Settings::load().map_err(to_io_error)?;

    let pool = connection::init_pool(&settings.database).map_err(to_io_error)?;
    {
        let conn = &mut pool.get().map_err(to_io_error)?;
        conn.run_pending_migrations(db::MIGRATIONS)
            .map_err(to_io_error)?;
    }

    let payments = PaymentClient::new(PaymentConfig {
        api_base: settings.stripe.api_base.clone(),
        secret_key: settings.stripe.secret_key.clone(),
        currency: settings.stripe.currency.clone(),
    });

    let state = web::Data::new(AppState { pool, payments });
    let session_key = Key::from(settings.session.secret.as_bytes());
    let bind = (settings.server.host.clone(), settings.server.port);

    log::info!("starting storefront backend on {}:{}", bind.0, bind.1);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(SessionMiddleware::new(
                CookieSessionStore::default(),
                session_key.clone(),
            ))
            .wrap(cors)
            .app_data(state.clone())
            .configure(app::config)
    })
    .bind(bind)?
    .run()
    .await
}
