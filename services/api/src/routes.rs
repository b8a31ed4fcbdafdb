//! API service routes

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde_json::json;
use tracker::{NewGroup, NewHabit, RecordCompletion, UpdateGroup, UpdateHabit};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::{AuthUser, auth_middleware},
    models::{AddMemberRequest, JoinByCodeRequest, ProgressQuery},
    state::AppState,
};

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/habits", get(list_habits).post(create_habit))
        .route(
            "/habits/:id",
            get(get_habit).patch(update_habit).delete(delete_habit),
        )
        .route(
            "/habits/:id/progress",
            get(progress_history).post(record_completion),
        )
        .route("/habits/:id/stats", get(habit_stats))
        .route("/dashboard", get(dashboard))
        .route("/groups", get(list_groups).post(create_group))
        .route("/groups/public", get(list_public_groups))
        .route("/groups/join", post(join_group_by_code))
        .route(
            "/groups/:id",
            get(get_group).patch(update_group).delete(delete_group),
        )
        .route("/groups/:id/join", post(join_group))
        .route("/groups/:id/leave", post(leave_group))
        .route("/groups/:id/members", post(add_member))
        .route("/groups/:id/members/:user_id", delete(remove_member))
        .route(
            "/groups/:id/habits/:habit_id",
            post(share_habit).delete(unshare_habit),
        )
        .route("/groups/:id/leaderboard", get(group_leaderboard))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .with_state(state)
}

/// Liveness, plus the database when one is attached
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.db_pool {
        Some(pool) => common::database::health_check(pool).await.unwrap_or(false),
        None => true,
    };
    let (status, label) = if database {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(json!({
            "status": label,
            "service": "api-service",
            "database": database,
        })),
    )
}

pub async fn list_habits(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.tracker.list_habits(user.id).await?))
}

pub async fn create_habit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<NewHabit>,
) -> ApiResult<impl IntoResponse> {
    let habit = state.tracker.create_habit(user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(habit)))
}

pub async fn get_habit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.tracker.get_habit(user.id, id).await?))
}

pub async fn update_habit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateHabit>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.tracker.update_habit(user.id, id, payload).await?))
}

pub async fn delete_habit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state.tracker.delete_habit(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn record_completion(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordCompletion>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.tracker.record_completion(user.id, id, payload).await?))
}

pub async fn progress_history(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<ProgressQuery>,
) -> ApiResult<impl IntoResponse> {
    let range = query.range()?;
    Ok(Json(state.tracker.progress_history(user.id, id, range).await?))
}

pub async fn habit_stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.tracker.habit_stats(user.id, id).await?))
}

pub async fn dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.tracker.dashboard(user.id).await?))
}

pub async fn list_groups(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.tracker.list_groups(user.id).await?))
}

pub async fn list_public_groups(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.tracker.list_public_groups().await?))
}

pub async fn create_group(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<NewGroup>,
) -> ApiResult<impl IntoResponse> {
    let group = state.tracker.create_group(user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn get_group(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.tracker.get_group(user.id, id).await?))
}

pub async fn update_group(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateGroup>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.tracker.update_group(user.id, id, payload).await?))
}

pub async fn delete_group(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state.tracker.delete_group(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn join_group(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.tracker.join_group(user.id, id).await?))
}

pub async fn join_group_by_code(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<JoinByCodeRequest>,
) -> ApiResult<impl IntoResponse> {
    let group = state
        .tracker
        .join_group_by_code(user.id, &payload.invite_code)
        .await?;
    Ok(Json(group))
}

pub async fn leave_group(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state.tracker.leave_group(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_member(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddMemberRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.tracker.add_member(user.id, id, payload.user_id).await?))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((id, member_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.tracker.remove_member(user.id, id, member_id).await?))
}

pub async fn share_habit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((id, habit_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.tracker.share_habit(user.id, id, habit_id).await?))
}

pub async fn unshare_habit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((id, habit_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.tracker.unshare_habit(user.id, id, habit_id).await?))
}

pub async fn group_leaderboard(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.tracker.group_leaderboard(user.id, id).await?))
}
