use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State, WebSocketUpgrade},
    http::{HeaderValue, Method, header},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use vibe_api::auth::{self, AppState, AppStateInner};
use vibe_api::middleware::require_auth;
use vibe_api::{comments, messages, posts, users};
use vibe_gateway::connection;
use vibe_gateway::dispatcher::Dispatcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vibe=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("VIBE_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("VIBE_DB_PATH").unwrap_or_else(|_| "vibe.db".into());
    let host = std::env::var("VIBE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("VIBE_PORT")
        .unwrap_or_else(|_| "8080".into())
        .parse()?;
    let cors_origin =
        std::env::var("VIBE_CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:5173".into());

    // Init database
    let db = vibe_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let dispatcher = Dispatcher::new();
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret,
        dispatcher,
    });

    // The frontend sends the session cookie, so the exact origin must be
    // echoed rather than a wildcard
    let cors = CorsLayer::new()
        .allow_origin(cors_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    // Routes
    let user_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", get(auth::logout))
        .merge(
            Router::new()
                .route("/{id}/profile", get(users::get_profile))
                .route("/profile/edit", post(users::edit_profile))
                .route("/suggested", get(users::get_suggested_users))
                .route("/followorunfollow/{id}", post(users::follow_or_unfollow))
                .layer(middleware::from_fn(require_auth)),
        );

    let post_routes = Router::new()
        .route("/addpost", post(posts::add_post))
        .route("/all", get(posts::get_all_posts))
        .route("/userpost/all", get(posts::get_user_posts))
        .route("/{id}/like", get(posts::like_post))
        .route("/{id}/dislike", get(posts::dislike_post))
        .route("/{id}/comment", post(comments::add_comment))
        .route("/{id}/comment/all", get(comments::get_comments))
        .route("/delete/{id}", delete(posts::delete_post))
        .route("/{id}/bookmark", get(posts::bookmark_post))
        .layer(middleware::from_fn(require_auth));

    let message_routes = Router::new()
        .route("/send/{id}", post(messages::send_message))
        .route("/all/{id}", get(messages::get_messages))
        .layer(middleware::from_fn(require_auth));

    let app = Router::new()
        .route("/", get(welcome))
        .route("/ws", get(ws_upgrade))
        .nest("/api/v1/user", user_routes)
        .nest("/api/v1/post", post_routes)
        .nest("/api/v1/message", message_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Vibe server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn welcome() -> impl IntoResponse {
    Json(json!({
        "success": true,
        "message": "Welcome to the Vibe API"
    }))
}

/// One socket per authenticated session, keyed by the `userId` query
/// parameter the client passes at connect time.
#[derive(Debug, Deserialize)]
struct WsParams {
    #[serde(rename = "userId")]
    user_id: Uuid,
}

async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let dispatcher = state.dispatcher.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, dispatcher, params.user_id))
}
