use anyhow::{Context, Result};
use axum::{
    Json, Router, middleware,
    routing::{get, post, put},
};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

use super::middleware::auth_middleware;
use super::rate_limit::{rate_limit_layer, rate_limit_middleware};
use super::{AppState, auth, games, leaderboard, leagues, picks, teams, users};

/// All `/api` routes. Routes needing a caller identity sit behind the JWT
/// middleware; register and login are rate limited.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // 10 credential attempts per minute per client
    let credentials_limiter = rate_limit_layer(10, 60);

    let credentials = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route_layer(middleware::from_fn_with_state(
            credentials_limiter,
            rate_limit_middleware,
        ));

    let protected = Router::new()
        .route("/api/auth/me", get(auth::get_current_user))
        .route("/api/users/me", put(users::update_me))
        .route(
            "/api/users/:id",
            get(users::get_user).delete(users::delete_user),
        )
        .route("/api/conferences", post(teams::create_conference))
        .route(
            "/api/conferences/:id",
            put(teams::update_conference).delete(teams::delete_conference),
        )
        .route("/api/teams", post(teams::create_team))
        .route(
            "/api/teams/:id",
            put(teams::update_team).delete(teams::delete_team),
        )
        .route("/api/leagues", post(leagues::create_league))
        .route(
            "/api/leagues/:id",
            put(leagues::update_league).delete(leagues::delete_league),
        )
        .route("/api/games", post(games::create_game))
        .route("/api/games/:id", axum::routing::delete(games::delete_game))
        .route("/api/games/:id/result", put(games::record_result))
        .route("/api/games/:id/score", post(games::score_game))
        .route("/api/games/:id/picks", get(games::list_game_picks))
        .route("/api/picks", post(picks::submit_pick))
        .route("/api/picks/me", get(picks::my_picks))
        .route(
            "/api/picks/:game_id",
            put(picks::change_pick).delete(picks::delete_pick),
        )
        .route_layer(middleware::from_fn_with_state(
            state.jwt_manager.clone(),
            auth_middleware,
        ));

    let public = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/conferences", get(teams::list_conferences))
        .route("/api/conferences/:id", get(teams::get_conference))
        .route("/api/conferences/:id/teams", get(teams::list_conference_teams))
        .route("/api/teams", get(teams::list_teams))
        .route("/api/teams/:id", get(teams::get_team))
        .route("/api/leagues", get(leagues::list_leagues))
        .route("/api/leagues/:id", get(leagues::get_league))
        .route("/api/leagues/:id/games", get(leagues::list_league_games))
        .route("/api/games/:id", get(games::get_game))
        .route("/api/leaderboard", get(leaderboard::get_leaderboard))
        .route(
            "/api/leaderboard/week/:week",
            get(leaderboard::get_week_leaderboard),
        )
        .route(
            "/api/leaderboard/users/:id",
            get(leaderboard::get_user_standing),
        );

    Router::new()
        .merge(public)
        .merge(credentials)
        .merge(protected)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn run_api_server(
    addr: &str,
    state: AppState,
    request_timeout: Duration,
    web_dir: Option<&str>,
) -> Result<()> {
    let mut app = router(state, request_timeout);

    if let Some(dir) = web_dir {
        let index_path = format!("{}/index.html", dir);
        let serve_dir = ServeDir::new(dir).not_found_service(ServeFile::new(&index_path));
        app = app.fallback_service(serve_dir);
        info!("Serving static files from: {}", dir);
    }

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API server to {}", addr))?;
    info!("API server listening on: {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received shutdown signal. Shutting down gracefully...");
    }
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "pickem-api"
    }))
}
