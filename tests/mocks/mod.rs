//! Shared test doubles.

pub mod scripted_transport;

#[allow(unused_imports)]
pub use scripted_transport::{RecordedCall, Scripted, ScriptedTransport};
