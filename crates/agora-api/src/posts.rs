use axum::{Extension, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use tracing::{debug, info};

use agora_db::posts::{PostEdit, PostRemoval};
use agora_types::api::{Claims, CreatePostRequest, DeletePostResponse, PostPage, UpdatePostRequest};

use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Path, Query};
use crate::middleware::Viewer;
use crate::state::{AppState, blocking};
use crate::views;

const MAX_TITLE_LEN: usize = 300;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Id of the last post on the previous page.
    pub cursor: Option<i64>,
}

fn default_limit() -> u32 {
    20
}

pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
    Extension(viewer): Extension<Viewer>,
) -> ApiResult<impl IntoResponse> {
    let viewer_id = viewer.user_id();
    let page = blocking(&state, move |db| db.list_posts(query.limit, query.cursor, viewer_id)).await?;

    Ok(Json(PostPage {
        posts: page.posts.into_iter().map(views::post).collect(),
        has_more: page.has_more,
    }))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Extension(viewer): Extension<Viewer>,
) -> ApiResult<impl IntoResponse> {
    let viewer_id = viewer.user_id();
    let post = blocking(&state, move |db| db.get_post(post_id, viewer_id))
        .await?
        .ok_or(ApiError::NotFound("post"))?;

    Ok(Json(views::post(post)))
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_title(&req.title)?;

    let author = claims.sub;
    let post = blocking(&state, move |db| db.create_post(author, req.title.trim(), &req.content)).await?;

    info!(post_id = post.id, author, "Post created");
    Ok((StatusCode::CREATED, Json(views::post(post))))
}

/// Edits by anyone but the author are ignored and the current post is
/// returned as is, even when the edit would not have been valid.
pub async fn update_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    let caller = claims.sub;

    if let Err(invalid) = validate_title(&req.title) {
        let post = blocking(&state, move |db| db.get_post(post_id, Some(caller)))
            .await?
            .ok_or(ApiError::NotFound("post"))?;
        if post.user_id != caller {
            debug!(post_id, caller, "Ignoring edit from non-author");
            return Ok(Json(views::post(post)));
        }
        return Err(invalid);
    }

    let edit = blocking(&state, move |db| {
        db.update_post(post_id, caller, req.title.trim(), &req.content)
    })
    .await?;

    let post = match edit {
        PostEdit::Updated(post) => post,
        PostEdit::NotOwner(post) => {
            debug!(post_id, caller, "Ignoring edit from non-author");
            post
        }
    };
    Ok(Json(views::post(post)))
}

/// `deleted: false` when the post does not exist or the caller is not its author.
pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let caller = claims.sub;
    let removal = blocking(&state, move |db| db.delete_post(post_id, caller)).await?;

    let deleted = match removal {
        PostRemoval::Deleted { votes_removed } => {
            info!(post_id, votes_removed, "Post deleted");
            true
        }
        PostRemoval::NotOwner | PostRemoval::Missing => false,
    };
    Ok(Json(DeletePostResponse { deleted }))
}

fn validate_title(title: &str) -> ApiResult<()> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::field("title", "title cannot be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::field("title", "title is too long"));
    }
    Ok(())
}
