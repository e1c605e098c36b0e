mod cors;

use std::sync::Arc;

use actix_web::{
    App, HttpServer,
    web::{self},
};
use api_subs::{PgSubscriptionStore, Reconciler, StripeProvider, WebhookQueue};
use common::env_config::Config;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // get env vars
    let config = Config::from_env().expect("Failed to load configuration");
    let config_data = config.clone();
    let origin = config.cors_allowed_origin.clone();

    // init logger
    logger::setup(config.console_logging_enabled).expect("Failed to set up logger");

    // init db connection
    let pool = db::setup(&config.database_url, config.is_production())
        .await
        .expect("Failed to set up database");

    // reconciler shared by the webhook worker and the sync endpoint
    let client = common::stripe::create_client(&config.stripe_secret_key);
    let reconciler = Reconciler::new(
        Arc::new(StripeProvider::new(client)),
        Arc::new(PgSubscriptionStore::new(pool)),
    );
    let (queue, _worker) = WebhookQueue::start(reconciler.clone(), config.webhook_queue_capacity);

    log::info!(
        "Starting server on {}:{} ({} workers)",
        config.server_host,
        config.server_port,
        config.num_workers
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(config_data.clone()))
            .app_data(web::Data::new(reconciler.clone()))
            .app_data(web::Data::new(queue.clone()))
            .wrap(logger::middleware()) // 2nd
            .wrap(cors::middleware(&origin)) // 1st
            .service(
                web::scope("/api")
                    .service(api_subs::mount_webhook())
                    .service(api_subs::mount_plans())
                    .service(
                        web::scope("/secured")
                            .wrap(api_auth::auth_middleware(config_data.session.clone()))
                            .service(api_subs::mount_subs()),
                    ),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}
