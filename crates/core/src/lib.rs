//! `orderlink-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model, aggregate traits and the vehicle data
//! carried across sale orders, purchase orders and invoices.

pub mod aggregate;
pub mod error;
pub mod id;
pub mod value_object;
pub mod vehicle;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, CompanyId};
pub use value_object::ValueObject;
pub use vehicle::{VehicleField, VehicleInfo};
