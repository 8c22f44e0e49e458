//! Page file endpoints.

use crate::error::ActionError;
use crate::extractors::{unknown_action, ActionRequest};
use crate::response::action_ok;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::Value;

type ActionResult = Result<(StatusCode, Json<Value>), ActionError>;

#[derive(Debug, Deserialize)]
struct PageWrite {
    path: String,
    content: Value,
    #[serde(default)]
    overwrite: bool,
}

#[derive(Debug, Deserialize)]
struct PageRef {
    path: String,
}

fn done(message: &str, path: String) -> ActionResult {
    Ok(action_ok(vec![
        ("message", Value::String(message.into())),
        ("path", Value::String(path)),
    ]))
}

pub async fn list_pages(State(state): State<AppState>) -> ActionResult {
    let pages = state.pages.list().await?;
    Ok(action_ok(vec![("pages", serde_json::to_value(pages)?)]))
}

pub async fn post_pages(State(state): State<AppState>, req: ActionRequest) -> ActionResult {
    match req.action.as_str() {
        "create_page" => {
            let data: PageWrite = req.data()?;
            state.pages.create(&data.path, &data.content, data.overwrite).await?;
            done("Page created successfully", data.path)
        }
        "update_page" => {
            let data: PageWrite = req.data()?;
            state.pages.update(&data.path, &data.content).await?;
            done("Page updated successfully", data.path)
        }
        "delete_page" => {
            let data: PageRef = req.data()?;
            state.pages.delete(&data.path).await?;
            done("Page deleted successfully", data.path)
        }
        "list_pages" => list_pages(State(state)).await,
        _ => Err(unknown_action()),
    }
}
