//! JSON body extractors. A body that is not valid JSON is a server-side failure (500) for
//! entity routes and a `{success:false}` failure for action routes.

use crate::error::{ActionError, AppError};
use async_trait::async_trait;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::Internal(format!("unreadable JSON body: {}", e.body_text())))?;
        Ok(JsonBody(value))
    }
}

/// `{action, data}` envelope used by the schema, modules, pages and system-config endpoints.
#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    #[serde(default)]
    pub data: Value,
}

impl ActionRequest {
    /// Typed `data`. Missing data reads as an empty object.
    pub fn data<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        let data = match &self.data {
            Value::Null => Value::Object(Default::default()),
            other => other.clone(),
        };
        serde_json::from_value(data).map_err(|e| AppError::BadRequest(format!("Invalid data: {}", e)))
    }
}

pub fn unknown_action() -> ActionError {
    ActionError(AppError::BadRequest("Unknown action".into()))
}

#[async_trait]
impl<S> FromRequest<S> for ActionRequest
where
    S: Send + Sync,
{
    type Rejection = ActionError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<ActionRequest>::from_request(req, state)
            .await
            .map_err(|e| ActionError(AppError::Internal(format!("unreadable action body: {}", e.body_text()))))?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Sync {
        #[serde(default)]
        apply: bool,
    }

    #[test]
    fn missing_data_reads_as_empty_object() {
        let req: ActionRequest = serde_json::from_value(json!({"action": "sync_schema_modules"})).unwrap();
        let data: Sync = req.data().unwrap();
        assert!(!data.apply);
    }

    #[test]
    fn ill_typed_data_is_a_bad_request() {
        let req: ActionRequest = serde_json::from_value(json!({"action": "x", "data": {"apply": "yes"}})).unwrap();
        assert!(matches!(req.data::<Sync>(), Err(AppError::BadRequest(_))));
    }
}
