//! VERSIONDROPPER - tracking-site drops to Read nodes
//!
//! Re-exports all modules for use by the binary target.

pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod event_bus;
pub mod handler;
pub mod node_graph;
pub mod query;
pub mod reader;
pub mod resolver;
pub mod utils;

pub use entity::{EntityKind, EntityRef};
pub use error::DropError;
pub use event_bus::{DropBus, DropCallback, DropEvent, DropSource};
pub use handler::DropHandler;
pub use node_graph::{FieldValue, MemoryGraph, NodeGraph, NodeHandle};
pub use query::{MemoryQuery, QueryClient, Record};
pub use resolver::Resolver;
pub use utils::sequences::{group_sequences, SequenceDescriptor};
