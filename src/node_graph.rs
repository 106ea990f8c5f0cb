//! Host node-graph seam.
//!
//! The handler only ever creates a node and sets fields on it. The host owns
//! the node afterwards; nothing here reads a node back.
//!
//! [`MemoryGraph`] keeps every created node with its fields in creation
//! order, standing in for the host in tests and in the command-line driver.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeGraphError {
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),
    #[error("Node graph error: {0}")]
    Host(String),
}

/// Value written to a node field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Str(String),
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

/// A node living in the host graph.
pub trait NodeHandle {
    fn name(&self) -> String;
    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), NodeGraphError>;
}

/// The host's node factory.
pub trait NodeGraph {
    type Node: NodeHandle;

    fn create_node(&mut self, type_name: &str) -> Result<Self::Node, NodeGraphError>;
}

/// Snapshot of one node created in a [`MemoryGraph`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub name: String,
    pub node_type: String,
    pub fields: IndexMap<String, FieldValue>,
}

impl NodeRecord {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        match self.fields.get(field) {
            Some(FieldValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_int(&self, field: &str) -> Option<i64> {
        match self.fields.get(field) {
            Some(FieldValue::Int(v)) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct GraphState {
    nodes: Vec<NodeRecord>,
    counters: HashMap<String, usize>,
}

/// In-memory node graph. Clones share the same nodes.
///
/// Node names follow the host convention of type name plus a per-type
/// counter (`Read1`, `Read2`, ...).
#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    state: Arc<Mutex<GraphState>>,
    allowed_types: Option<Vec<String>>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph that refuses to create any type not listed.
    pub fn with_types(types: &[&str]) -> Self {
        Self {
            state: Arc::default(),
            allowed_types: Some(types.iter().map(|t| t.to_string()).collect()),
        }
    }

    /// All nodes created so far, in creation order.
    pub fn nodes(&self) -> Vec<NodeRecord> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).nodes.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NodeGraph for MemoryGraph {
    type Node = MemoryNode;

    fn create_node(&mut self, type_name: &str) -> Result<MemoryNode, NodeGraphError> {
        if let Some(allowed) = &self.allowed_types {
            if !allowed.iter().any(|t| t == type_name) {
                return Err(NodeGraphError::UnknownNodeType(type_name.to_string()));
            }
        }

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let counter = state.counters.entry(type_name.to_string()).or_insert(0);
        *counter += 1;
        let name = format!("{}{}", type_name, counter);

        state.nodes.push(NodeRecord {
            name: name.clone(),
            node_type: type_name.to_string(),
            fields: IndexMap::new(),
        });
        let index = state.nodes.len() - 1;
        debug!("Created node {}", name);

        Ok(MemoryNode {
            state: Arc::clone(&self.state),
            index,
            name,
        })
    }
}

/// Handle to a node inside a [`MemoryGraph`].
#[derive(Debug, Clone)]
pub struct MemoryNode {
    state: Arc<Mutex<GraphState>>,
    index: usize,
    name: String,
}

impl NodeHandle for MemoryNode {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), NodeGraphError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let node = state
            .nodes
            .get_mut(self.index)
            .ok_or_else(|| NodeGraphError::Host(format!("node {} is gone", self.name)))?;
        node.fields.insert(name.to_string(), value);
        Ok(())
    }
}
