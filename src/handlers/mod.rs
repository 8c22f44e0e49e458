//! HTTP handlers. Entity and report endpoints answer with bare JSON; the schema, modules, pages
//! and system-config action endpoints use the `{success, ...}` envelope.

pub mod entity;
pub mod modules;
pub mod pages;
pub mod production;
pub mod reports;
pub mod schema;
pub mod system;
pub mod views;
