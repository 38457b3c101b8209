use axum::{extract::State, Json};

use crate::{
    error::{AppError, Result},
    models::{
        ActionOutcome, ApiResponse, ApproveRequest, CreateGameRequest, GameSnapshot, MoveOutcome,
        MoveRequest,
    },
};

use super::AppState;

/// GET /api/v1/game/state
pub async fn get_state(State(state): State<AppState>) -> Json<ApiResponse<GameSnapshot>> {
    Json(ApiResponse::success(state.reconciler.snapshot().await))
}

/// POST /api/v1/game/move
pub async fn submit_move(
    State(state): State<AppState>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<ApiResponse<MoveOutcome>>> {
    if req.from.trim().is_empty() || req.to.trim().is_empty() {
        return Err(AppError::BadRequest(
            "from and to squares are required".to_string(),
        ));
    }
    let outcome = state.reconciler.handle_move(&req.from, &req.to).await;
    Ok(Json(ApiResponse::success(outcome)))
}

/// POST /api/v1/game/create
pub async fn create_game(
    State(state): State<AppState>,
    Json(req): Json<CreateGameRequest>,
) -> Json<ApiResponse<ActionOutcome>> {
    let outcome = state.reconciler.create_game(&req.stake).await;
    Json(ApiResponse::success(outcome))
}

/// POST /api/v1/game/join
pub async fn join_game(State(state): State<AppState>) -> Json<ApiResponse<ActionOutcome>> {
    Json(ApiResponse::success(state.reconciler.join_game().await))
}

/// POST /api/v1/game/withdraw
pub async fn withdraw(State(state): State<AppState>) -> Json<ApiResponse<ActionOutcome>> {
    Json(ApiResponse::success(state.reconciler.withdraw().await))
}

/// POST /api/v1/game/approve
pub async fn approve(
    State(state): State<AppState>,
    Json(req): Json<ApproveRequest>,
) -> Json<ApiResponse<ActionOutcome>> {
    let outcome = state
        .reconciler
        .approve(&req.amount, req.spender.as_deref())
        .await;
    Json(ApiResponse::success(outcome))
}

/// POST /api/v1/game/reset
pub async fn reset(State(state): State<AppState>) -> Json<ApiResponse<GameSnapshot>> {
    state.reconciler.reset_session().await;
    Json(ApiResponse::success(state.reconciler.snapshot().await))
}

/// POST /api/v1/game/refresh
pub async fn refresh(State(state): State<AppState>) -> Result<Json<ApiResponse<GameSnapshot>>> {
    state.reconciler.refresh_game_details().await?;
    Ok(Json(ApiResponse::success(state.reconciler.snapshot().await)))
}
