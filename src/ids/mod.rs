//! IDS (Information Delivery Specification) documents.

pub mod spec;
pub mod store;
pub mod xml;

pub use spec::{ifc_category, Cardinality, EntityFilter, PropertyRequirement, Specification};
pub use store::{parse_document, SpecificationStore};
