//! Reader-node configuration.
//!
//! Maps a tracking record to the fields of a `Read` node. The mapping is
//! computed first as a [`ReadPlan`] and applied to the host graph in one go.

use std::path::Path;

use log::{debug, info, warn};
use serde::Serialize;

use crate::config::DropperSettings;
use crate::entity::{EntityKind, EntityRef};
use crate::error::DropError;
use crate::node_graph::{NodeGraph, NodeGraphError, NodeHandle};
use crate::query::Record;
use crate::utils::sequences::find_sequence;

/// Host node type created for every drop.
pub const READ_NODE: &str = "Read";

// Record fields
pub const F_PATH_TO_FRAMES: &str = "sg_path_to_frames";
pub const F_PATH_TO_MOVIE: &str = "sg_path_to_movie";
pub const F_PATH: &str = "path";
pub const F_LOCAL_PATH: &str = "local_path";
pub const F_FIRST_FRAME: &str = "sg_first_frame";
pub const F_LAST_FRAME: &str = "sg_last_frame";
pub const F_FRAMES_COLORSPACE: &str = "sg_frames_colorspace";

/// Fields requested when fetching the dropped record.
pub const READ_FIELDS: [&str; 6] = [
    F_PATH_TO_MOVIE,
    F_PATH_TO_FRAMES,
    F_FIRST_FRAME,
    F_LAST_FRAME,
    F_PATH,
    F_FRAMES_COLORSPACE,
];

// Read node fields
pub const K_FILE: &str = "file";
pub const K_LOCALIZATION: &str = "localizationPolicy";
pub const K_FIRST: &str = "first";
pub const K_LAST: &str = "last";
pub const K_COLORSPACE: &str = "colorspace";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Numbered still images (EXR)
    Sequence,
    /// A single movie or image file
    Movie,
}

/// Everything the `Read` node will be configured with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadPlan {
    pub file: String,
    pub media: MediaKind,
    pub first: Option<i64>,
    pub last: Option<i64>,
    pub colorspace: String,
    pub localization_policy: i64,
}

/// Best path on the record: frames, then movie, then the file's local path.
pub fn source_path(record: &Record) -> Option<&str> {
    record
        .get_str(F_PATH_TO_FRAMES)
        .or_else(|| record.get_str(F_PATH_TO_MOVIE))
        .or_else(|| record.get_nested_str(F_PATH, F_LOCAL_PATH))
}

/// Frame bounds for a sequence path, read from disk.
///
/// Scans the directory of `file` and takes the range of the sequence whose
/// template is `file`. Any failure leaves the bounds unknown.
pub fn infer_frame_range(file: &str) -> Option<(i64, i64)> {
    match find_sequence(Path::new(file), None) {
        Ok(Some(seq)) => seq.frame_range(),
        Ok(None) => {
            warn!("No sequence on disk matches {}", file);
            None
        }
        Err(e) => {
            warn!("Cannot infer frame range for {}: {}", file, e);
            None
        }
    }
}

/// Work out the `Read` node configuration for a fetched record.
pub fn plan_read(
    entity: EntityRef,
    record: &Record,
    settings: &DropperSettings,
) -> Result<ReadPlan, DropError> {
    let file = source_path(record)
        .ok_or(DropError::NoResolvablePath(entity))?
        .to_string();

    if !file.contains("exr") {
        return Ok(ReadPlan {
            file,
            media: MediaKind::Movie,
            first: None,
            last: None,
            colorspace: settings.movie_colorspace.clone(),
            localization_policy: settings.localization_policy,
        });
    }

    let mut first = record.get_i64(F_FIRST_FRAME);
    let mut last = record.get_i64(F_LAST_FRAME);
    if first.is_none() || last.is_none() {
        debug!("{} lacks a frame range, scanning {}", entity, file);
        if let Some((start, end)) = infer_frame_range(&file) {
            first = Some(start);
            last = Some(end);
        }
    }

    let colorspace = match record.get_str(F_FRAMES_COLORSPACE) {
        Some(cs) => cs.to_string(),
        None if entity.kind == EntityKind::PublishedFile => {
            settings.published_file_colorspace.clone()
        }
        None => settings.exr_colorspace.clone(),
    };

    Ok(ReadPlan {
        file,
        media: MediaKind::Sequence,
        first,
        last,
        colorspace,
        localization_policy: settings.localization_policy,
    })
}

impl ReadPlan {
    /// Create the `Read` node and set its fields.
    pub fn apply<G: NodeGraph>(&self, graph: &mut G) -> Result<G::Node, NodeGraphError> {
        let mut node = graph.create_node(READ_NODE)?;
        node.set_field(K_FILE, self.file.as_str().into())?;
        node.set_field(K_LOCALIZATION, self.localization_policy.into())?;

        if self.media == MediaKind::Sequence {
            if let Some(first) = self.first {
                node.set_field(K_FIRST, first.into())?;
            }
            if let Some(last) = self.last {
                node.set_field(K_LAST, last.into())?;
            }
        }
        node.set_field(K_COLORSPACE, self.colorspace.as_str().into())?;

        info!(
            "{}: {} [{:?}] {}",
            node.name(),
            self.file,
            self.media,
            self.colorspace
        );
        Ok(node)
    }
}
