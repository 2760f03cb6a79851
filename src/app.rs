use crate::errors::AppError;
use crate::handlers;
use crate::session::token_from_headers;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/today", get(handlers::today_page))
        .route("/dashboard", get(handlers::dashboard_page))
        .route("/cyourpath", get(handlers::editor_page).post(handlers::editor_save))
        .route("/yourpath", get(handlers::path_page))
        .route("/yourpath/:habit", get(handlers::habit_page))
        .route("/logout", post(handlers::logout))
        .route("/api/today", get(handlers::get_today))
        .route("/api/today/habit", post(handlers::set_habit))
        .route("/api/today/task", post(handlers::set_task))
        .route("/api/dashboard", get(handlers::get_dashboard))
        .route("/api/habits", get(handlers::get_habits))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .route("/", get(|| async { Redirect::to("/today") }))
        .route("/login", get(handlers::login_page).post(handlers::login))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolves the session cookie and hands the `Session` to handlers through
/// request extensions. Pages redirect to the login view; the API answers 401.
async fn require_session(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let session = match token_from_headers(request.headers()) {
        Some(token) => state.sessions.resolve(token).await,
        None => None,
    };

    match session {
        Some(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        None if request.uri().path().starts_with("/api/") => AppError::unauthorized().into_response(),
        None => Redirect::to("/login").into_response(),
    }
}
