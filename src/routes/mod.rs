//! Route tables. Everything is mounted under `/api` by [`crate::app`].

mod builder;
mod common;
mod entity;
mod system;

pub use builder::builder_routes;
pub use common::common_routes;
pub use entity::entity_routes;
pub use system::system_routes;
