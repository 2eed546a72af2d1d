//! Axum extractors that reject with [`RelateError`]
//!
//! The stock `Path` and `Json` extractors answer malformed input with plain
//! text bodies. These wrappers keep the JSON `{error, code}` shape for every
//! 400 the API produces.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::core::error::{RelateError, RequestError};

/// Path parameters parsed as integer ids
///
/// Works for a single id (`Ids<i64>`) and for tuples (`Ids<(i64, i64)>`).
#[derive(Debug, Clone, Copy)]
pub struct Ids<T>(pub T);

impl<S, T> FromRequestParts<S> for Ids<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = RelateError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(ids)) => Ok(Ids(ids)),
            Err(rejection) => Err(path_error(rejection)),
        }
    }
}

fn path_error(rejection: PathRejection) -> RelateError {
    RequestError::InvalidId {
        message: rejection.body_text(),
    }
    .into()
}

/// JSON request body
///
/// An absent or empty body is not accepted; callers that treat every member
/// as optional still have to send `{}`.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = RelateError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(body_error(rejection)),
        }
    }
}

fn body_error(rejection: JsonRejection) -> RelateError {
    RequestError::InvalidBody {
        message: rejection.body_text(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_json_body_rejects_malformed_json() {
        let req = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let err = JsonBody::<serde_json::Value>::from_request(req, &())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "INVALID_BODY");
    }

    #[tokio::test]
    async fn test_json_body_accepts_object() {
        let req = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"bio":"hi"}"#))
            .unwrap();

        let JsonBody(value) = JsonBody::<serde_json::Value>::from_request(req, &())
            .await
            .unwrap();
        assert_eq!(value["bio"], "hi");
    }
}
