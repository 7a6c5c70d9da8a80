//! HubSpot MCP Server - a Model Context Protocol server for HubSpot CRM.
//!
//! The crate is built around a resilient client engine: every request goes
//! through one retry/backoff loop, every failure is classified into a closed
//! error taxonomy, and association links are built from a registry of
//! type ids.
//!
//! # Architecture
//!
//! - **client**: transport, error classification, retry engine and the typed CRM client
//! - **associations**: association type registry and link resolution
//! - **matching**: lookup of records from id, email or name
//! - **domain**: dates, client-side ordering, overdue evaluation
//! - **models**: CRM objects, search requests, association payloads
//! - **services**: the logical meeting, task and note operations
//! - **server**: MCP tool surface over stdio

pub mod associations;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod matching;
pub mod metrics;
pub mod models;
pub mod server;
pub mod services;

pub use associations::{association_type_id, AssociationResolver};
pub use client::{CrmClient, RetryEngine, RetryPolicy, Transport, UreqTransport};
pub use config::Config;
pub use error::{ConfigError, CrmApiError, CrmResult, ErrorKind, OperationContext, TransportError};
pub use matching::{FuzzyMatchResolver, LookupQuery};
pub use metrics::{HttpTimer, Metrics, MetricsSummary};
pub use models::{CrmObject, ObjectType, SearchFilter, SearchRequest, SortDirection};
pub use server::HubSpotMcpServer;
