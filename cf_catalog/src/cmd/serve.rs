use crate::{
    cmd::{codeforces_client, connect_pool},
    modules::{
        handlers::{self, problem, user, AppState},
        migration::MIGRATOR,
    },
};
use anyhow::Result;
use axum::{extract::Extension, routing, Router, Server};
use clap::Args;
use std::{net::SocketAddr, sync::Arc};

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long)]
    port: Option<u16>,
}

pub async fn run(args: ServeArgs) -> Result<()> {
    let pool = connect_pool().await?;
    MIGRATOR.run(&pool).await?;
    let source = codeforces_client()?;

    let app = create_router(Arc::new(AppState { pool, source }));
    let port = match args.port {
        Some(port) => port,
        None => {
            tracing::warn!("API server will be launched at default port number 8000");
            8000u16
        }
    };
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Server start at port {}", port);
    Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to bind server.");

    Ok(())
}

fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/problems",
            routing::get(problem::list_problems).post(problem::add_problem),
        )
        .route("/api/problems/:problem_id", routing::get(problem::get_problem))
        .route(
            "/api/problems/:problem_id/rating",
            routing::put(problem::rate_problem).delete(problem::remove_rating),
        )
        .route(
            "/api/problems/:problem_id/status",
            routing::put(problem::mark_problem),
        )
        .route("/api/search", routing::get(problem::search))
        .route(
            "/api/users",
            routing::get(user::leaderboard).post(user::register),
        )
        .route("/api/users/:username", routing::get(user::get_user))
        .route(
            "/api/users/:username/profile",
            routing::put(user::update_profile),
        )
        .route("/api/liveness", routing::get(handlers::liveness))
        .route("/api/readiness", routing::get(handlers::readiness))
        .layer(Extension(state))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler.");
    };

    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("SIGINT signal received, starting graceful shutdown.");
}
