//! Request extractors.

pub mod json;

pub use json::{unknown_action, ActionRequest, JsonBody};
