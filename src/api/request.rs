//! Request input helpers: a JSON body extractor with client-friendly
//! rejections, and readers for path ids and query strings.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Query, Request},
    http::StatusCode,
    Json,
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

use crate::error::ApiError;
use crate::validator::Validator;

/// Like [`axum::Json`], but rejections become 400 `{"error": ...}` envelopes.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(ApiError::BadRequest(describe(&rejection))),
        }
    }
}

fn describe(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => "body must be JSON (Content-Type: application/json)".to_string(),
        JsonRejection::JsonSyntaxError(_) => "body contains badly-formed JSON".to_string(),
        JsonRejection::JsonDataError(err) => err.body_text(),
        other if other.status() == StatusCode::PAYLOAD_TOO_LARGE => "body must not be larger than the request size limit".to_string(),
        other => other.body_text(),
    }
}

/// Ids in paths are positive integers; anything else is "not found".
pub fn parse_id(raw: &str) -> Result<i64, ApiError> {
    match raw.parse::<i64>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(ApiError::NotFound),
    }
}

/// Query-string values, read with defaults. Bad values are recorded on the validator.
pub struct QueryParams(HashMap<String, String>);

impl QueryParams {
    pub fn new(Query(params): Query<HashMap<String, String>>) -> Self {
        Self(params)
    }

    pub fn string(&self, key: &str, default: &str) -> String {
        match self.0.get(key) {
            Some(value) if !value.is_empty() => value.clone(),
            _ => default.to_string(),
        }
    }

    pub fn csv(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(value) if !value.is_empty() => value.split(',').map(|s| s.trim().to_string()).collect(),
            _ => Vec::new(),
        }
    }

    /// Out-of-range integers are clamped so the range checks report them.
    pub fn int(&self, key: &str, default: u32, v: &mut Validator) -> u32 {
        match self.0.get(key) {
            Some(value) if !value.is_empty() => match value.parse::<i64>() {
                Ok(n) => n.clamp(0, i64::from(u32::MAX)) as u32,
                Err(_) => {
                    v.add_error(key, "must be an integer value");
                    default
                }
            },
            _ => default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        QueryParams(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    #[test]
    fn ids_must_be_positive_integers() {
        assert_eq!(parse_id("12").unwrap(), 12);
        for bad in ["0", "-3", "abc", ""] {
            assert!(matches!(parse_id(bad), Err(ApiError::NotFound)));
        }
    }

    #[test]
    fn reads_query_values_with_defaults() {
        let q = params(&[("title", "godfather"), ("genres", "crime,drama"), ("page", "2"), ("page_size", "x")]);
        let mut v = Validator::new();

        assert_eq!(q.string("title", ""), "godfather");
        assert_eq!(q.string("sort", "id"), "id");
        assert_eq!(q.csv("genres"), vec!["crime", "drama"]);
        assert!(q.csv("missing").is_empty());
        assert_eq!(q.int("page", 1, &mut v), 2);
        assert_eq!(q.int("page_size", 20, &mut v), 20);

        let errors = v.into_errors();
        assert_eq!(errors["page_size"], "must be an integer value");
    }

    #[test]
    fn negative_integers_clamp_to_zero() {
        let mut v = Validator::new();
        assert_eq!(params(&[("page", "-1")]).int("page", 1, &mut v), 0);
        assert!(v.valid());
    }
}
