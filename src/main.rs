#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use rememberme::{
    configure_services, InMemoryIdentityStore, RememberMeService, RememberMeSettings,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Loads .env, initializes the logger, then Settings.toml and env overrides
    let settings = RememberMeSettings::load().context("Failed to load settings")?;

    let store = Arc::new(InMemoryIdentityStore::new());
    seed_demo_account(&store)?;

    let service = RememberMeService::from_settings(store.clone(), &settings)
        .context("Failed to initialize remember-me service")?;

    start_server(settings, store, service).await
}

/// Create the account named by `DEMO_USER`/`DEMO_PASSWORD`, if both are set
fn seed_demo_account(store: &InMemoryIdentityStore) -> anyhow::Result<()> {
    if let (Ok(user), Ok(password)) = (std::env::var("DEMO_USER"), std::env::var("DEMO_PASSWORD")) {
        store
            .create_account(&user, &password)
            .with_context(|| format!("Failed to create demo account '{user}'"))?;
    }
    Ok(())
}

/// Start the HTTP server
///
/// # Errors
///
/// Returns an error if binding fails or the server stops with an error.
async fn start_server(
    settings: RememberMeSettings,
    store: Arc<InMemoryIdentityStore>,
    service: RememberMeService,
) -> anyhow::Result<()> {
    let bind_address = settings.get_bind_address();
    print_startup_info(&bind_address, &settings);

    let context_path = settings.context_path();
    let admin_enabled = settings.application.admin_enabled;
    let settings = web::Data::new(settings);
    let store = web::Data::from(store);
    let service = web::Data::new(service);

    HttpServer::new(move || {
        let context_path = context_path.clone();
        App::new()
            .app_data(settings.clone())
            .app_data(store.clone())
            .app_data(service.clone())
            .wrap(Logger::default())
            .configure(move |cfg| configure_services(cfg, &context_path, admin_enabled))
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {bind_address}"))?
    .run()
    .await
    .context("Server error")
}

fn print_startup_info(bind_address: &str, settings: &RememberMeSettings) {
    let ctx = settings.context_path();
    let ctx = ctx.trim_end_matches('/');

    println!("Starting remember-me service on http://{bind_address}");
    println!(
        "Remember-me: {} (cookie '{}', validity {}s)",
        if settings.remember_me.enabled { "enabled" } else { "disabled" },
        settings.remember_me.cookie_name,
        settings.remember_me.token_validity_seconds
    );
    println!();
    println!("Endpoints:");
    println!("  POST {ctx}/login   - Username/password login (remember_me=on to persist)");
    println!("  GET  {ctx}/whoAmI  - Current identity");
    println!("  POST {ctx}/logout  - Drop the remember-me cookie");
    println!("  GET  {ctx}/ping    - Health check");
    if settings.application.admin_enabled {
        println!();
        println!("Admin endpoints (unauthenticated):");
        println!("  GET|POST {ctx}/admin/remember-me             - Runtime flags");
        println!("  POST     {ctx}/admin/users/{{id}}/seed/rotate - Invalidate all tokens of a user");
    }
}
