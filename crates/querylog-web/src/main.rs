//! querylog demo server.
//!
//! A tiny axum app whose handlers "run" queries through a fake repository and
//! report them to the query log. Hit it a few times and inspect the daily file
//! under the configured storage root.

use axum::{extract::Path, routing::get, Router};
use querylog_config::Config;
use querylog_core::{scope, Binding, QueryExecuted, QueryLog};
use querylog_web::with_query_log;
use std::net::SocketAddr;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Stand-in for a data-access layer. `#[track_caller]` forwards the handler's
/// source line into the event so the query is attributed to the handler.
struct Repository;

impl Repository {
    #[track_caller]
    fn query(&self, sql: &str, bindings: Vec<Binding>) {
        let started = Instant::now();
        // a real driver would execute here
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        scope::report(&QueryExecuted::new(sql, bindings, elapsed_ms, "demo"));
    }
}

async fn show_user(Path(id): Path<i64>) -> String {
    let repo = Repository;
    repo.query("select * from users where id = ?", vec![id.into()]);
    repo.query("select * from orders where user_id = ? and status = ?", vec![id.into(), "open".into()]);
    format!("user {id}\n")
}

async fn health() -> &'static str {
    "ok\n"
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("querylog=debug,info")),
        )
        .init();

    let config = Config::load()?;
    let log = QueryLog::from_config(&config)?;
    if log.is_none() {
        tracing::warn!("Query log disabled (set QUERY_LOG=true or enabled = true in querylog.toml)");
    }

    let app = Router::new()
        .route("/users/{id}", get(show_user))
        .route("/health", get(health));
    let app = with_query_log(app, log).layer(TraceLayer::new_for_http());

    let bind_addr = std::env::var("QUERY_LOG_DEMO_BIND")
        .unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Demo listening on http://{}", bind_addr);
    info!("   Try: curl http://{}/users/1", bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
