use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{error, instrument, warn};

use super::{
    dto::{ApiResponse, SignUpRequest},
    services::{self, SignUpError},
};
use crate::state::AppState;

const REGISTERED_MESSAGE: &str = "User registered successfully. Please verify your account.";

pub fn sign_up_routes() -> Router<AppState> {
    Router::new().route("/sign-up", post(sign_up))
}

impl SignUpError {
    fn status(&self) -> StatusCode {
        match self {
            SignUpError::Invalid(_)
            | SignUpError::MalformedBody
            | SignUpError::UsernameTaken
            | SignUpError::EmailTaken => StatusCode::BAD_REQUEST,
            SignUpError::EmailDispatch(_) | SignUpError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for SignUpError {
    fn into_response(self) -> Response {
        if let SignUpError::Internal(e) = &self {
            error!(error = ?e, "error registering user");
        }
        // Display never includes the wrapped infrastructure error.
        (self.status(), Json(ApiResponse::fail(self.to_string()))).into_response()
    }
}

#[instrument(skip(state, payload))]
pub async fn sign_up(
    State(state): State<AppState>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse>), SignUpError> {
    let Json(payload) = payload.map_err(|rejection| {
        warn!(reason = %rejection.body_text(), "unreadable sign-up body");
        SignUpError::MalformedBody
    })?;
    let payload = payload.normalized();
    if let Err(msg) = payload.validate() {
        warn!(reason = msg, "invalid sign-up payload");
        return Err(SignUpError::Invalid(msg));
    }

    services::sign_up(
        state.users.as_ref(),
        state.email.as_ref(),
        &state.config.email.from,
        payload,
        OffsetDateTime::now_utc(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(REGISTERED_MESSAGE))))
}
