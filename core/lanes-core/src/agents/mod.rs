//! Agent kinds and their marker-naming conventions.
//! Add new kinds in `types.rs` so the registry and aggregator pick them up.

mod registry;
mod types;

pub use registry::AgentRegistry;
pub use types::{validate_instance_token, AgentConfig, AgentKind, MarkerRule};
