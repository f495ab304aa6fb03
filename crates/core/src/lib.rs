//! Domain records, listing queries, and error definitions.
//!
//! Foundation crate -- no async or I/O dependencies.

pub mod error;
pub mod finance;
pub mod query;
pub mod types;

pub use error::{EstateError, EstateResult, FieldError, NormalizedError};
pub use query::PropertyQuery;
pub use types::{
    Address, Agent, AgentRef, Credentials, DashboardStats, Image, ImageUpload, Property,
    PropertyDraft, PropertyStatus, Registration, Role, Session, SessionPatch,
};
