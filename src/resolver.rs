//! Identifier resolver: dropped text -> (entity kind, id).
//!
//! Recognized payloads are links copied out of the tracking site:
//! - detail pages:   `https://studio.shotgunstudio.com/detail/Version/1234`
//! - email links:    `https://...?entity_id=1234&entity_type=Version`
//! - page fragments: `https://.../page/99#Version_1234_Version`
//!
//! Kind detection is by plain substring in [`EntityKind::DETECTION_ORDER`];
//! the id is then looked for only in the shapes for that kind.

use std::collections::HashMap;
use std::sync::LazyLock;

use log::{debug, trace};
use regex::Regex;

use crate::entity::{EntityKind, EntityRef};

/// Only plain-text drops are considered.
pub const TEXT_MIME: &str = "text/plain";

/// Domain fragment of hosted tracking sites.
pub const DEFAULT_SITE_MARKER: &str = "shotgunstudio";

/// Id shapes per kind, in precedence order: path, email, fragment.
static ID_SHAPES: LazyLock<HashMap<EntityKind, [Regex; 3]>> = LazyLock::new(|| {
    EntityKind::DETECTION_ORDER
        .into_iter()
        .map(|kind| {
            let name = regex::escape(kind.as_str());
            let shapes = [
                format!(r"^.+{name}/([0-9]+)"),
                format!(r"^.+entity_id=([0-9]+).+entity_type={name}"),
                format!(r"^.+#{name}_([0-9]+)_"),
            ]
            .map(|p| Regex::new(&p).expect("id shape pattern is valid"));
            (kind, shapes)
        })
        .collect()
});

/// Find the id of a `kind` entity in `text`.
///
/// The first shape that matches decides: if its digits do not form a
/// positive integer the result is `None`, later shapes are not consulted.
pub fn extract_id(text: &str, kind: EntityKind) -> Option<u64> {
    let shapes = ID_SHAPES.get(&kind)?;
    let caps = shapes.iter().find_map(|re| re.captures(text))?;
    let digits = caps.get(1)?.as_str();
    match digits.parse::<u64>() {
        Ok(id) if id > 0 => Some(id),
        _ => {
            debug!("Rejecting {} id '{}': not a positive integer", kind, digits);
            None
        }
    }
}

/// Decides whether a drop belongs to the tracking site and what it points at.
#[derive(Debug, Clone)]
pub struct Resolver {
    site_marker: String,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(DEFAULT_SITE_MARKER)
    }
}

impl Resolver {
    pub fn new(site_marker: impl Into<String>) -> Self {
        Self {
            site_marker: site_marker.into(),
        }
    }

    pub fn site_marker(&self) -> &str {
        &self.site_marker
    }

    /// Does this payload look like something copied from the tracking site?
    pub fn accepts(&self, mime: &str, text: &str) -> bool {
        mime == TEXT_MIME && text.starts_with("http") && text.contains(&self.site_marker)
    }

    /// Resolve a drop payload to an entity reference.
    pub fn resolve(&self, mime: &str, text: &str) -> Option<EntityRef> {
        if !self.accepts(mime, text) {
            trace!("Declining drop ({}): not a tracking-site link", mime);
            return None;
        }

        let kind = EntityKind::sniff(text)?;
        let id = extract_id(text, kind)?;
        debug!("Resolved drop to {} #{}", kind, id);
        Some(EntityRef::new(kind, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITE: &str = "https://studio.shotgunstudio.com";

    fn resolve(text: &str) -> Option<EntityRef> {
        Resolver::default().resolve(TEXT_MIME, text)
    }

    #[test]
    fn test_all_shapes_agree() {
        let path = format!("{SITE}/detail/Version/4821");
        let email = format!("{SITE}/page/email_link?entity_id=4821&entity_type=Version");
        let fragment = format!("{SITE}/page/1337#Version_4821_Version");

        let expected = Some(EntityRef::new(EntityKind::Version, 4821));
        assert_eq!(resolve(&path), expected);
        assert_eq!(resolve(&email), expected);
        assert_eq!(resolve(&fragment), expected);
    }

    #[test]
    fn test_each_kind() {
        assert_eq!(
            resolve(&format!("{SITE}/detail/PublishedFile/77")),
            Some(EntityRef::new(EntityKind::PublishedFile, 77))
        );
        assert_eq!(
            resolve(&format!("{SITE}/detail/Shot/1202")),
            Some(EntityRef::new(EntityKind::Shot, 1202))
        );
        assert_eq!(
            resolve(&format!("{SITE}/page/5#Asset_88_Asset")),
            Some(EntityRef::new(EntityKind::Asset, 88))
        );
    }

    #[test]
    fn test_declines_wrong_mime() {
        let text = format!("{SITE}/detail/Version/4821");
        let resolver = Resolver::default();
        assert_eq!(resolver.resolve("text/uri-list", &text), None);
        assert_eq!(resolver.resolve("", &text), None);
    }

    #[test]
    fn test_declines_foreign_text() {
        assert_eq!(resolve("/mnt/show/detail/Version/4821"), None);
        assert_eq!(resolve("https://example.com/detail/Version/4821"), None);
        assert_eq!(resolve(" https://studio.shotgunstudio.com/detail/Version/1"), None);
    }

    #[test]
    fn test_custom_site_marker() {
        let resolver = Resolver::new("tracker.studio.lan");
        let text = "http://tracker.studio.lan/detail/Shot/9";
        assert_eq!(
            resolver.resolve(TEXT_MIME, text),
            Some(EntityRef::new(EntityKind::Shot, 9))
        );
        assert_eq!(resolver.resolve(TEXT_MIME, &format!("{SITE}/detail/Shot/9")), None);
    }

    #[test]
    fn test_kind_without_id_shape() {
        // Kind is sniffed, but no shape carries an id for it
        assert_eq!(resolve(&format!("{SITE}/page/Version_list")), None);
        assert_eq!(resolve(&format!("{SITE}/detail/Version/")), None);
    }

    #[test]
    fn test_priority_is_by_name_not_by_shape() {
        // Shot page whose query mentions "Version": kind sniffs as Version and
        // the Shot id is never looked at.
        let text = format!("{SITE}/detail/Shot/12?tab=Version");
        assert_eq!(resolve(&text), None);

        let text = format!("{SITE}/detail/Shot/12#Version_5_");
        assert_eq!(resolve(&text), Some(EntityRef::new(EntityKind::Version, 5)));
    }

    #[test]
    fn test_path_shape_takes_last_occurrence() {
        let text = format!("{SITE}/detail/Version/1/Version/2");
        assert_eq!(resolve(&text), Some(EntityRef::new(EntityKind::Version, 2)));
    }

    #[test]
    fn test_path_shape_wins_over_email() {
        let text = format!("{SITE}/detail/Version/10?entity_id=20&entity_type=Version");
        assert_eq!(resolve(&text), Some(EntityRef::new(EntityKind::Version, 10)));
    }

    #[test]
    fn test_unparseable_id_is_no_match() {
        assert_eq!(extract_id("x/Version/0", EntityKind::Version), None);
        assert_eq!(
            extract_id("x/Version/99999999999999999999999", EntityKind::Version),
            None
        );
        assert_eq!(extract_id("x/Version/17", EntityKind::Version), Some(17));
    }
}
