//! Response helpers. Entity routes return bare records; action routes use a `success` envelope.

use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::{Map, Value};

pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(data))
}

pub fn ok<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::OK, Json(data))
}

#[derive(Serialize)]
pub struct Deleted<T> {
    pub success: bool,
    pub message: String,
    pub deleted: T,
}

pub fn deleted<T: Serialize>(singular: &str, record: T) -> (StatusCode, Json<Deleted<T>>) {
    (
        StatusCode::OK,
        Json(Deleted {
            success: true,
            message: format!("{} deleted successfully", singular),
            deleted: record,
        }),
    )
}

/// `{success: true, ..fields}` for action endpoints. Keys are merged in the given order.
pub fn action_ok(fields: Vec<(&str, Value)>) -> (StatusCode, Json<Value>) {
    let mut map = Map::new();
    map.insert("success".into(), Value::Bool(true));
    for (k, v) in fields {
        map.insert(k.to_string(), v);
    }
    (StatusCode::OK, Json(Value::Object(map)))
}
