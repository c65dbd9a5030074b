pub mod errors;
pub mod serde_helpers;
pub mod phone;
pub mod identity;
pub mod profile;
pub mod customer;
pub mod staff;
pub mod scheme;
pub mod enrollment;
pub mod assignment;
pub mod market_rate;
pub mod withdrawal;
pub mod stats;

pub use errors::{FieldErrors, ModelError};
