// Pure domain logic
pub mod lifecycle;
pub mod quote_calculator;

// Workflow services
pub mod dashboard;
pub mod quotes;
pub mod repair_jobs;

pub use dashboard::{DashboardService, OwnerDashboard, RecentRepair, TechnicianDashboard};
pub use lifecycle::{Intake, RepairJobLifecycle, TransitionPolicy};
pub use quote_calculator::{QuoteCalculator, QuoteLimits};
pub use quotes::{QuoteFilter, QuoteService};
pub use repair_jobs::RepairJobService;
