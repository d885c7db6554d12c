use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// JSON request body whose deserialization errors name the offending field.
/// An empty body is read as `{}` so required fields are reported by the
/// store's own validation.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|err| ApiError::BadRequest(err.body_text()))?;
        parse_json_body(&bytes).map(JsonBody)
    }
}

/// Query string extractor that reports parse failures in the error envelope.
#[derive(Debug, Clone)]
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| QueryParams(value))
            .map_err(|err| ApiError::BadRequest(err.body_text()))
    }
}

fn parse_json_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    let payload: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        bytes
    };

    let mut deserializer = serde_json::Deserializer::from_slice(payload);
    let parsed: Result<T, serde_path_to_error::Error<serde_json::Error>> =
        serde_path_to_error::deserialize(&mut deserializer);

    let value = parsed.map_err(|err| {
        let path = err.path().to_string();
        let inner = err.into_inner();
        if path == "." {
            ApiError::BadRequest(format!("Invalid JSON body: {inner}"))
        } else {
            ApiError::BadRequest(format!("Invalid value for `{path}`: {inner}"))
        }
    })?;
    deserializer
        .end()
        .map_err(|err| ApiError::BadRequest(format!("Invalid JSON body: {err}")))?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use db::models::task::{CreateTask, UpdateTask};

    use super::*;

    #[test]
    fn empty_body_reads_as_empty_object() {
        let parsed: CreateTask = parse_json_body(b"  ").unwrap();
        assert!(parsed.title.is_none());
    }

    #[test]
    fn type_errors_report_the_field_path() {
        let err = parse_json_body::<CreateTask>(br#"{"title": "a", "estimated_minutes": "soon"}"#)
            .unwrap_err();
        assert!(
            matches!(err, ApiError::BadRequest(ref msg) if msg.contains("`estimated_minutes`")),
            "{err:?}"
        );
    }

    #[test]
    fn malformed_json_is_a_bad_request() {
        let err = parse_json_body::<UpdateTask>(b"{\"title\": ").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err = parse_json_body::<UpdateTask>(b"{} {}").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
