use axum::{
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ApiError;

/// JSON response whose body is an object of named top-level keys,
/// e.g. `{"movie": {...}}` or `{"movies": [...], "metadata": {...}}`.
#[derive(Debug)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Result<Map<String, Value>, serde_json::Error>,
}

impl ApiResponse {
    pub fn with_status(status: StatusCode, key: &str, data: impl Serialize) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Ok(Map::new()),
        }
        .with(key, data)
    }

    /// 200 OK
    pub fn ok(key: &str, data: impl Serialize) -> Self {
        Self::with_status(StatusCode::OK, key, data)
    }

    /// 201 Created
    pub fn created(key: &str, data: impl Serialize) -> Self {
        Self::with_status(StatusCode::CREATED, key, data)
    }

    /// 202 Accepted
    pub fn accepted(key: &str, data: impl Serialize) -> Self {
        Self::with_status(StatusCode::ACCEPTED, key, data)
    }

    /// Add another top-level key to the body.
    pub fn with(mut self, key: &str, data: impl Serialize) -> Self {
        if let Ok(map) = &mut self.body {
            match serde_json::to_value(data) {
                Ok(value) => {
                    map.insert(key.to_string(), value);
                }
                Err(e) => self.body = Err(e),
            }
        }
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        match self.body {
            Ok(map) => (self.status, self.headers, Json(Value::Object(map))).into_response(),
            Err(e) => ApiError::internal(e).into_response(),
        }
    }
}

pub type ApiResult = Result<ApiResponse, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;
    use serde_json::json;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn renders_named_keys() {
        let response = ApiResponse::ok("movies", vec!["a", "b"])
            .with("metadata", json!({ "total_records": 2 }))
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "movies": ["a", "b"], "metadata": { "total_records": 2 } })
        );
    }

    #[tokio::test]
    async fn carries_status_and_headers() {
        let response = ApiResponse::created("movie", json!({ "id": 1 }))
            .header(header::LOCATION, HeaderValue::from_static("/v1/movies/1"))
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::LOCATION], "/v1/movies/1");
    }
}
