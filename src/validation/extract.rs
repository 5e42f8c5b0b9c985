use std::collections::HashMap;

use anyhow::Context;
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use super::schema::{Schema, Sections};
use crate::error::AppError;

/// A request DTO with a declared schema.
///
/// The DTO is deserialized from the normalised sections, so its shape is
/// `{ body, params, query }` with only the sections it cares about.
pub trait RequestSchema: DeserializeOwned {
    fn schema() -> Schema;
}

/// Extractor that rejects with the first schema failure as a 400.
pub struct Validated<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Validated<T>
where
    S: Send + Sync,
    T: RequestSchema,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let schema = T::schema();
        let (mut parts, body) = req.into_parts();

        let params = Path::<HashMap<String, String>>::from_request_parts(&mut parts, state)
            .await
            .map(|Path(p)| string_map(p))
            .unwrap_or_else(|_| Value::Object(Map::new()));

        let query = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map(|Query(pairs)| string_map(pairs))
            .map_err(|_| AppError::Validation("query string is malformed".into()))?;

        let body = if schema.expects_body() {
            let bytes = Bytes::from_request(Request::from_parts(parts, body), state)
                .await
                .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
            if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).map_err(|_| {
                    AppError::Validation("request body must be valid JSON".into())
                })?
            }
        } else {
            Value::Null
        };

        let checked = schema
            .check(&Sections {
                body,
                params,
                query,
            })
            .map_err(|message| {
                debug!(%message, "request rejected by schema");
                AppError::Validation(message)
            })?;

        let value = serde_json::to_value(checked).context("serialize validated request")?;
        let dto = serde_json::from_value(value).context("validated request does not fit its dto")?;
        Ok(Validated(dto))
    }
}

/// Later duplicates win, as with most query-string parsers.
fn string_map(pairs: impl IntoIterator<Item = (String, String)>) -> Value {
    Value::Object(
        pairs
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect(),
    )
}
