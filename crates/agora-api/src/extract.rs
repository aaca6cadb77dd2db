//! Drop-in replacements for axum's `Json`, `Query` and `Path` extractors.
//! Their rejections are `ApiError`s, so a malformed body, query string or
//! path answers with the same field-tagged JSON as any other validation
//! failure.

use axum::{
    extract::{
        FromRequest, FromRequestParts, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::request::Parts,
    response::{IntoResponse, Response},
};
use serde::{Serialize, de::DeserializeOwned};

use agora_types::api::FieldError;

use crate::error::ApiError;

/// JSON body extractor and response.
///
/// Deserialization goes through `serde_path_to_error`, so a bad field is
/// reported under its own name (`value`, `title`, ...). Errors that are not
/// tied to a field are reported under `body`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<serde_json::Value>::from_request(req, state).await?;

        serde_path_to_error::deserialize(value).map(Json).map_err(|err| {
            let path = err.path().to_string();
            let field = if path == "." { "body".to_string() } else { path };
            ApiError::Validation(vec![FieldError::new(field, err.inner().to_string())])
        })
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Query<T>(pub T);

impl<S, T> FromRequestParts<S> for Query<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Query(value) =
            axum::extract::Query::<T>::from_request_parts(parts, state).await?;
        Ok(Query(value))
    }
}

#[derive(Debug)]
pub struct Path<T>(pub T);

impl<S, T> FromRequestParts<S> for Path<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Path(value) =
            axum::extract::Path::<T>::from_request_parts(parts, state).await?;
        Ok(Path(value))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::field("body", &rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::field("query", &rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::field("path", &rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_types::api::VoteRequest;
    use axum::body::Body;

    fn json_request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn fields(err: ApiError) -> Vec<String> {
        match err {
            ApiError::Validation(errors) => errors.into_iter().map(|e| e.field).collect(),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn bad_field_is_named() {
        let err = Json::<VoteRequest>::from_request(json_request(r#"{"value":2}"#), &())
            .await
            .unwrap_err();
        assert_eq!(fields(err), ["value"]);
    }

    #[tokio::test]
    async fn missing_field_and_bad_syntax_fall_back_to_body() {
        let err = Json::<VoteRequest>::from_request(json_request("{}"), &())
            .await
            .unwrap_err();
        assert_eq!(fields(err), ["body"]);

        let err = Json::<VoteRequest>::from_request(json_request("{not json"), &())
            .await
            .unwrap_err();
        assert_eq!(fields(err), ["body"]);
    }

    #[tokio::test]
    async fn valid_body_is_extracted() {
        let Json(req) = Json::<VoteRequest>::from_request(json_request(r#"{"value":-1}"#), &())
            .await
            .unwrap();
        assert_eq!(i64::from(req.value), -1);
    }
}
