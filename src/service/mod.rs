//! Entity services: validated CRUD, production flows, design labels and report aggregates.

pub mod crud;
mod labels;
mod production;
mod reports;
mod validation;

pub use crud::CrudService;
pub use labels::LabelService;
pub use production::{CompleteRun, FlowOutcome, ProductionService, StartRun};
pub use reports::{DashboardStats, MaterialTypes, Report, ReportMetrics, ReportService};
pub use validation::RequestValidator;
