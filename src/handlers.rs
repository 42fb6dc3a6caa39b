use crate::errors::AppError;
use crate::intake::{self, JoinOutcome};
use crate::models::{
    AddFollowerResponse, CheckFollowerResponse, ContactRequest, ContactResponse, EmailRequest,
    FollowResponse, TribeCountResponse,
};
use crate::state::AppState;
use crate::ui::render_index;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::Html,
};
use tracing::debug;

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let count = intake::tribe_count(&state).await;
    Html(render_index(count))
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn get_tribe_count(State(state): State<AppState>) -> Json<TribeCountResponse> {
    Json(TribeCountResponse {
        count: intake::tribe_count(&state).await,
    })
}

pub async fn check_follower(
    State(state): State<AppState>,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> Json<CheckFollowerResponse> {
    let is_follower = match payload {
        Ok(Json(payload)) => intake::is_follower(&state, &payload.email).await,
        Err(rejection) => {
            debug!("unreadable check-follower body: {rejection}");
            false
        }
    };
    Json(CheckFollowerResponse { is_follower })
}

pub async fn add_follower(
    State(state): State<AppState>,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> Result<Json<AddFollowerResponse>, AppError> {
    let Json(payload) = payload?;
    let count = intake::add_follower(&state, &payload.email).await?;
    Ok(Json(AddFollowerResponse {
        success: true,
        message: Some("Welcome to the tribe!".to_string()),
        count,
    }))
}

pub async fn follow(
    State(state): State<AppState>,
    payload: Result<Json<ContactRequest>, JsonRejection>,
) -> Result<Json<FollowResponse>, AppError> {
    let Json(payload) = payload?;
    let outcome: JoinOutcome = intake::follow(&state, &payload).await?;
    Ok(Json(FollowResponse {
        success: true,
        count: Some(outcome.count()),
        error: None,
    }))
}

pub async fn contact(
    State(state): State<AppState>,
    payload: Result<Json<ContactRequest>, JsonRejection>,
) -> Result<Json<ContactResponse>, AppError> {
    let Json(payload) = payload?;
    intake::record_contact(&state, &payload).await?;
    Ok(Json(ContactResponse {
        success: true,
        message: "Thank you for your message! I'll get back to you soon.".to_string(),
    }))
}
