//! Business services for the office console.
//! - Every operation is a thin call into the hosted backend via the `backend` crate.
//! - Request contracts and state rules live in `models`.
//! - Identity + record creation goes through `provisioning` so a failed record write is compensated.

pub mod errors;
pub mod provisioning;
pub mod customers;
pub mod staff;
pub mod schemes;
pub mod market_rates;
pub mod withdrawals;
pub mod stats;
pub mod assignments;
pub mod enrollments;
pub mod sessions;
pub mod refresh;

pub use errors::{ServiceError, ServiceResult};
