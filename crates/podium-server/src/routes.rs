use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use podium_core::model::{LeaderboardRow, ScoreMap};
use podium_core::JudgingService;

use crate::error::ApiError;

pub fn router(service: Arc<JudgingService>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/login", post(login))
        .route("/api/teams", get(teams))
        .route("/api/evaluations", post(save_evaluation))
        .route("/api/evaluation", get(evaluation))
        .route("/api/judge-scores", get(judge_scores))
        .route("/api/leaderboard", get(leaderboard))
        .route("/api/submit", post(submit))
        .with_state(service)
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    token: String,
    name: String,
    is_admin: bool,
    submitted: bool,
}

async fn login(
    State(service): State<Arc<JudgingService>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if body.username.trim().is_empty() || body.password.trim().is_empty() {
        return Err(ApiError::validation("username and password are required"));
    }
    let outcome = service
        .login(&body.username, &body.password)
        .await
        .ok_or_else(|| ApiError::auth("invalid credentials"))?;
    Ok(Json(LoginResponse {
        token: outcome.token,
        name: outcome.user.display_name,
        is_admin: outcome.user.is_admin,
        submitted: outcome.user.has_submitted,
    }))
}

async fn teams(State(service): State<Arc<JudgingService>>) -> Json<Vec<String>> {
    Json(service.teams().to_vec())
}

#[derive(Debug, Deserialize)]
struct SaveEvaluationRequest {
    #[serde(default)]
    team: String,
    #[serde(default)]
    judge: String,
    scores: Option<serde_json::Map<String, Value>>,
}

#[derive(Debug, Serialize)]
struct SaveResponse {
    ok: bool,
    persisted: bool,
}

async fn save_evaluation(
    State(service): State<Arc<JudgingService>>,
    Json(body): Json<SaveEvaluationRequest>,
) -> Result<Json<SaveResponse>, ApiError> {
    let scores = body
        .scores
        .ok_or_else(|| ApiError::validation("team, judge, and scores are required"))?;
    if body.team.trim().is_empty() || body.judge.trim().is_empty() {
        return Err(ApiError::validation("team, judge, and scores are required"));
    }
    let outcome = service
        .save_evaluation(&body.team, &body.judge, &scores)
        .await;
    Ok(Json(SaveResponse {
        ok: true,
        persisted: outcome.persisted,
    }))
}

#[derive(Debug, Deserialize)]
struct EvaluationQuery {
    #[serde(default)]
    team: String,
    #[serde(default)]
    judge: String,
}

/// Stored scores for one (team, judge), `{}` when nothing was saved yet.
async fn evaluation(
    State(service): State<Arc<JudgingService>>,
    Query(query): Query<EvaluationQuery>,
) -> Result<Json<ScoreMap>, ApiError> {
    if query.team.trim().is_empty() || query.judge.trim().is_empty() {
        return Err(ApiError::validation("team and judge are required"));
    }
    let scores = service
        .evaluation(&query.team, &query.judge)
        .await
        .unwrap_or_default();
    Ok(Json(scores))
}

#[derive(Debug, Deserialize)]
struct JudgeScoresQuery {
    #[serde(default)]
    judge: String,
}

async fn judge_scores(
    State(service): State<Arc<JudgingService>>,
    Query(query): Query<JudgeScoresQuery>,
) -> Result<Json<BTreeMap<String, u32>>, ApiError> {
    if query.judge.trim().is_empty() {
        return Err(ApiError::validation("judge is required"));
    }
    Ok(Json(service.judge_totals(&query.judge).await))
}

async fn leaderboard(State(service): State<Arc<JudgingService>>) -> Json<Vec<LeaderboardRow>> {
    Json(service.leaderboard().await)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitRequest {
    #[serde(default)]
    user_id: String,
}

async fn submit(
    State(service): State<Arc<JudgingService>>,
    Json(body): Json<SubmitRequest>,
) -> Result<Json<SaveResponse>, ApiError> {
    if body.user_id.trim().is_empty() {
        return Err(ApiError::validation("userId is required"));
    }
    let outcome = service
        .submit(&body.user_id)
        .await
        .ok_or_else(|| ApiError::validation("unknown user"))?;
    Ok(Json(SaveResponse {
        ok: true,
        persisted: outcome.persisted,
    }))
}
