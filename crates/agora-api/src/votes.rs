use axum::{Extension, extract::State, response::IntoResponse};

use agora_types::api::{Claims, VoteRequest, VoteResponse};

use crate::error::ApiResult;
use crate::extract::{Json, Path};
use crate::state::{AppState, blocking};

pub async fn cast_vote(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<VoteRequest>,
) -> ApiResult<impl IntoResponse> {
    let voter = claims.sub;
    let receipt = blocking(&state, move |db| db.cast_vote(voter, post_id, req.value)).await?;

    Ok(Json(VoteResponse {
        voted: true,
        points: receipt.points,
    }))
}
