//! Production-tracking entity kinds and references extracted from drops.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity types a drop can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Version,
    PublishedFile,
    Shot,
    Asset,
}

impl EntityKind {
    /// Priority used when sniffing the kind from payload text.
    ///
    /// A payload mentioning several kind names resolves to the first one
    /// listed here ("Version" beats "Shot" even in a Shot URL that happens
    /// to contain the word).
    pub const DETECTION_ORDER: [EntityKind; 4] = [
        EntityKind::Version,
        EntityKind::PublishedFile,
        EntityKind::Shot,
        EntityKind::Asset,
    ];

    /// Entity type name as the tracking service spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Version => "Version",
            EntityKind::PublishedFile => "PublishedFile",
            EntityKind::Shot => "Shot",
            EntityKind::Asset => "Asset",
        }
    }

    /// Shots and assets carry no media themselves; their latest Version does.
    pub fn is_container(&self) -> bool {
        matches!(self, EntityKind::Shot | EntityKind::Asset)
    }

    /// Kind name found first in `text`, in [`Self::DETECTION_ORDER`].
    pub fn sniff(text: &str) -> Option<EntityKind> {
        Self::DETECTION_ORDER
            .into_iter()
            .find(|kind| text.contains(kind.as_str()))
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (kind, id) pair pointing at one record on the tracking service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: u64,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: u64) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.kind, self.id)
    }
}
