use crate::{
    cmd::{self, Services},
    modules::{
        auth::JwtVerifier,
        handlers::{
            friends::{add_friend, list_friends, remove_friend, search_users},
            health,
            leaderboard::{get_friend_leaderboard, refresh_leaderboard},
            liveness,
            websocket::leaderboard_socket,
        },
        storage::PgStore,
    },
};
use anyhow::{Context, Result};
use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue,
    },
    routing, Router, Server,
};
use clap::Args;
use std::{env, net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

#[derive(Debug, Args)]
pub struct ServerArgs {
    #[arg(long)]
    port: Option<u16>,
}

pub async fn run(args: ServerArgs) -> Result<()> {
    let jwt_secret = env::var("JWT_SECRET").with_context(|| {
        let message = "JWT_SECRET environment variable must be set";
        tracing::error!(message);
        message
    })?;
    let jwt_audience = env::var("JWT_AUDIENCE").unwrap_or_else(|_| String::from("authenticated"));
    let origin = match env::var("FRONTEND_ORIGIN_URL") {
        Ok(origin) => Some(origin.parse::<HeaderValue>().with_context(|| {
            let message = format!("FRONTEND_ORIGIN_URL is not a valid origin: {}", origin);
            tracing::error!(message);
            message
        })?),
        Err(_) => {
            tracing::warn!("FRONTEND_ORIGIN_URL is not set. Requests from any origin will be accepted.");
            None
        }
    };

    let pool = cmd::connect_database().await?;
    let store = PgStore::new(pool);
    store.ping().await.with_context(|| {
        let message = "database is not available";
        tracing::error!(message);
        message
    })?;

    let services = cmd::build_services(store, cmd::create_rating_client()?, cmd::refresh_interval()?);
    let verifier = JwtVerifier::new(&jwt_secret, &jwt_audience);
    let app = create_router(services, verifier, origin);

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

fn create_router(services: Services, verifier: JwtVerifier, origin: Option<HeaderValue>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(vec![CONTENT_TYPE, AUTHORIZATION]);
    let cors = match origin {
        Some(origin) => cors.allow_origin(AllowOrigin::exact(origin)),
        None => cors.allow_origin(Any),
    };

    Router::new()
        .route("/api/health", routing::get(health))
        .route("/api/liveness", routing::get(liveness))
        .route("/api/leaderboard/friends", routing::get(get_friend_leaderboard))
        .route("/api/leaderboard/refresh", routing::post(refresh_leaderboard))
        .route("/api/friends", routing::get(list_friends).post(add_friend))
        .route("/api/friends/:friend_id", routing::delete(remove_friend))
        .route("/api/users/search", routing::get(search_users))
        .route("/api/leaderboard/ws", routing::get(leaderboard_socket))
        .layer(Extension(services.store))
        .layer(Extension(services.publisher))
        .layer(Extension(services.orchestrator))
        .layer(Extension(services.hub))
        .layer(Extension(Arc::new(verifier)))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
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
