//! Service layer for business logic with dependency injection.
//!
//! Services take any [`gitty_forge::Forge`] implementation, so their logic
//! is tested against in-memory mocks rather than live backends.

pub mod dashboard;
pub mod projects;
#[cfg(test)]
pub mod test_mocks;

pub use dashboard::{BranchRow, Dashboard, DashboardService};
pub use projects::ProjectsService;
