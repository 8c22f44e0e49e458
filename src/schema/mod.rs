//! Administrator-defined table metadata: document types, defaults, mutations and validation.

pub mod defaults;
pub mod registry;
pub mod resolve;
pub mod types;
pub mod validator;

pub use defaults::default_schema;
pub use resolve::{build_model, builtin_paths};
pub use types::*;
pub use validator::validate_schema;
