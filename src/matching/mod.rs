//! Lookup of CRM records from partial, human-supplied identifiers.
//!
//! Matching itself is delegated to the search API; this module decides which
//! queries to run and which candidate to keep.

pub mod fuzzy_resolver;

pub use fuzzy_resolver::{select_most_recent, FuzzyMatchResolver, LookupQuery};
