//! Association type registry and association reads.
//!
//! Association type ids come only from the registry; a pair outside it is a
//! caller error raised before any request is made.

pub mod registry;
mod resolver;

pub use registry::association_type_id;
pub use resolver::AssociationResolver;
