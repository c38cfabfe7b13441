/*!
 * # Role-Based Access Control (RBAC) Module
 *
 * Roles are a closed set and every gated action has a fixed list of roles
 * allowed to perform it. Checking access is a membership test.
 */

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

use crate::errors::ServiceError;

/// Who a caller is to the repair shop.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
pub enum Role {
    Customer,
    Technician,
    Owner,
}

impl FromStr for Role {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "technician" | "tech" => Ok(Role::Technician),
            "owner" => Ok(Role::Owner),
            other => Err(ServiceError::invalid_field(
                "role",
                format!("unknown role '{}'", other),
            )),
        }
    }
}

/// Shop staff: owners and technicians.
pub const STAFF: &[Role] = &[Role::Owner, Role::Technician];

/// Every operation that is gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum Action {
    SubmitRepairRequest,
    ViewOwnJobs,
    ViewAllJobs,
    ViewJob,
    TrackSerialNumber,
    GenerateQuote,
    AddNote,
    UpdateStatus,
    TechnicianDashboard,
    QuoteManagement,
    OwnerDashboard,
}

impl Action {
    pub fn required_roles(self) -> &'static [Role] {
        match self {
            Action::SubmitRepairRequest => &[Role::Customer, Role::Owner, Role::Technician],
            Action::ViewOwnJobs => &[Role::Customer],
            Action::ViewAllJobs | Action::ViewJob | Action::TrackSerialNumber => STAFF,
            Action::GenerateQuote
            | Action::AddNote
            | Action::UpdateStatus
            | Action::TechnicianDashboard => &[Role::Technician],
            Action::QuoteManagement | Action::OwnerDashboard => &[Role::Owner],
        }
    }
}

/// True when `role` is one of `required`.
pub fn authorize(role: Role, required: &[Role]) -> bool {
    required.contains(&role)
}

pub(crate) fn check(role: Role, action: Action) -> Result<(), ServiceError> {
    if authorize(role, action.required_roles()) {
        return Ok(());
    }
    warn!(%role, %action, "Access denied");
    Err(ServiceError::Forbidden(format!(
        "role {} may not perform {}",
        role, action
    )))
}
