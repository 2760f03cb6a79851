use crate::errors::AppError;
use crate::habits::{HabitId, HabitMetadata};
use crate::remote::PendingWrite;
use crate::session::{Session, cleared_cookie, session_cookie, token_from_headers};
use crate::state::AppState;
use crate::ui::{self, Notice};
use crate::views::{
    MissingContainer,
    dashboard::{self, DashboardSnapshot, DayHistory, MonthCursor},
    editor, load_metadata, path,
    today::{HabitCard, TodaySnapshot, TodayView},
};
use axum::{
    Extension, Form, Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use tokio::sync::OwnedMutexGuard;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct HabitToggle {
    pub habit: HabitId,
    pub value: bool,
}

#[derive(Debug, Deserialize)]
pub struct TaskToggle {
    pub habit: HabitId,
    pub index: usize,
    pub value: bool,
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct EditorForm {
    #[serde(default)]
    pub text: String,
}

pub async fn login_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = token_from_headers(&headers) {
        if state.sessions.resolve(token).await.is_some() {
            return Redirect::to("/today").into_response();
        }
    }
    Html(ui::render_login(None)).into_response()
}

pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    match state.identity.sign_in(&form.name).await {
        Ok(session) => {
            info!(uid = %session.uid, "signed in");
            let token = state.sessions.open(session).await;
            ([(SET_COOKIE, session_cookie(token))], Redirect::to("/today")).into_response()
        }
        Err(err) => {
            warn!("sign-in rejected: {err}");
            (StatusCode::BAD_REQUEST, Html(ui::render_login(Some(&err.to_string())))).into_response()
        }
    }
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = token_from_headers(&headers) {
        if let Some(session) = state.sessions.close(token).await {
            info!(uid = %session.uid, "signed out");
        }
    }
    ([(SET_COOKIE, cleared_cookie())], Redirect::to("/")).into_response()
}

async fn load_today(state: &AppState, session: Session) -> TodayView {
    TodayView::load(
        session,
        today(),
        state.store.clone(),
        state.cache.clone(),
    )
    .await
}

/// Releases the user's day lock once the detached remote write has landed.
fn release_after(pending: PendingWrite, guard: OwnedMutexGuard<()>) {
    tokio::spawn(async move {
        pending.finished().await;
        drop(guard);
    });
}

pub async fn today_page(State(state): State<AppState>, Extension(session): Extension<Session>) -> Html<String> {
    let _guard = state.day_locks.acquire(&session.uid).await;
    let view = load_today(&state, session.clone()).await;
    Html(ui::render_today(&session, &view.snapshot()))
}

pub async fn get_today(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Json<TodaySnapshot> {
    let _guard = state.day_locks.acquire(&session.uid).await;
    Json(load_today(&state, session).await.snapshot())
}

pub async fn set_habit(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<HabitToggle>,
) -> Json<HabitCard> {
    let guard = state.day_locks.acquire(&session.uid).await;
    let mut view = load_today(&state, session).await;
    let pending = view.set_habit_top_level(payload.habit, payload.value).await;
    release_after(pending, guard);
    Json(view.card(payload.habit))
}

pub async fn set_task(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<TaskToggle>,
) -> Result<Json<HabitCard>, AppError> {
    let guard = state.day_locks.acquire(&session.uid).await;
    let mut view = load_today(&state, session).await;
    let pending = view
        .set_task(payload.habit, payload.index, payload.value)
        .await
        .map_err(|err| AppError::bad_request(err.to_string()))?;
    release_after(pending, guard);
    Ok(Json(view.card(payload.habit)))
}

async fn load_dashboard(state: &AppState, session: &Session, query: MonthQuery) -> Result<DashboardSnapshot, AppError> {
    let cursor = match (query.year, query.month) {
        (Some(year), Some(month)) => MonthCursor::new(year, month)
            .ok_or_else(|| AppError::bad_request("month must be 0-11 and the year within calendar range"))?,
        (None, None) => MonthCursor::containing(today()),
        _ => return Err(AppError::bad_request("year and month must be given together")),
    };
    let history = DayHistory::load(state.store.as_ref(), session).await;
    Ok(dashboard::snapshot(&history, cursor))
}

pub async fn dashboard_page(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<MonthQuery>,
) -> Result<Html<String>, AppError> {
    let snapshot = load_dashboard(&state, &session, query).await?;
    Ok(Html(ui::render_dashboard(&session, &snapshot)))
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<DashboardSnapshot>, AppError> {
    Ok(Json(load_dashboard(&state, &session, query).await?))
}

pub async fn editor_page(State(state): State<AppState>, Extension(session): Extension<Session>) -> Html<String> {
    let text = editor::load_text(state.store.as_ref(), &session).await;
    Html(ui::render_editor(&session, &text, None))
}

pub async fn editor_save(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(form): Form<EditorForm>,
) -> Response {
    match editor::save(state.store.as_ref(), &session, &form.text).await {
        Ok(()) => {
            let text = editor::load_text(state.store.as_ref(), &session).await;
            Html(ui::render_editor(&session, &text, Some(Notice::Ok("Saved successfully")))).into_response()
        }
        Err(err) => {
            warn!(uid = %session.uid, "editor save rejected: {err}");
            let message = err.to_string();
            (
                StatusCode::BAD_REQUEST,
                Html(ui::render_editor(&session, &form.text, Some(Notice::Error(&message)))),
            )
                .into_response()
        }
    }
}

pub async fn path_page(State(state): State<AppState>, Extension(session): Extension<Session>) -> Html<String> {
    let links = path::list(state.store.as_ref(), &session).await;
    Html(ui::render_path(&session, &links))
}

pub async fn habit_page(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(habit): Path<String>,
) -> Result<Html<String>, AppError> {
    let habit = habit
        .parse::<HabitId>()
        .map_err(|err| AppError::not_found(err.to_string()))?;
    let detail = path::detail(state.store.as_ref(), &session, habit).await;
    Ok(Html(ui::render_habit(&session, &detail)))
}

pub async fn get_habits(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Json<HabitMetadata> {
    Json(load_metadata(state.store.as_ref(), &session.uid, MissingContainer::Initialize).await)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
