//! Image sequence detection utilities
//!
//! Scans a single directory level for frame-numbered files and groups them
//! into sequences, one [`SequenceDescriptor`] per template path.
//!
//! Example: `shot.0001.exr`, `shot.0002.exr` -> `shot.%04d.exr` with frames
//! `["0001", "0002"]`.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use indexmap::IndexMap;
use log::{debug, info};
use regex::Regex;
use thiserror::Error;

/// (prefix)(separator)(frame)(.extension) with the frame as the last
/// dot-delimited segment before the extension.
static FRAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.*)([._-])([0-9]+)\.([^.]+)$").expect("frame pattern is valid")
});

/// Hash padding in user-facing paths, e.g. `shot.####.exr`.
static HASH_PADDING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#+").expect("hash pattern is valid"));

#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("Failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One detected sequence: a template path plus the frame tokens found for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceDescriptor {
    /// Path inside the scanned directory with the frame replaced by the spec
    pub template_path: PathBuf,
    /// Frame tokens as they appear in file names, in listing order
    pub frames: Vec<String>,
}

impl SequenceDescriptor {
    /// Numeric frame numbers, sorted and deduplicated.
    pub fn frame_numbers(&self) -> Vec<i64> {
        let mut nums: Vec<i64> = self.frames.iter().filter_map(|f| f.parse().ok()).collect();
        nums.sort_unstable();
        nums.dedup();
        nums
    }

    /// First and last frame.
    ///
    /// Min/max are taken over the frame *strings* and parsed afterwards. For
    /// tokens of equal width this is the numeric range; mixed widths inside
    /// one group (`9` and `10`) compare lexicographically.
    pub fn frame_range(&self) -> Option<(i64, i64)> {
        let first = self.frames.iter().min()?.parse().ok()?;
        let last = self.frames.iter().max()?.parse().ok()?;
        Some((first, last))
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Whether `path` names this sequence.
    ///
    /// Accepts the exact template as well as the same path written with
    /// `#` padding (`shot.####.exr` for `shot.%04d.exr`).
    pub fn matches_path(&self, path: &Path) -> bool {
        if self.template_path == path {
            return true;
        }
        // Only the file name carries the frame; '#' in folders is literal
        let (Some(parent), Some(name)) = (path.parent(), path.file_name().and_then(|n| n.to_str()))
        else {
            return false;
        };
        let normalized = HASH_PADDING.replace_all(name, |caps: &regex::Captures| {
            format!("%0{}d", caps[0].len())
        });
        self.template_path == parent.join(&*normalized)
    }
}

/// Group frame-numbered files in `folder` into sequences.
///
/// # Arguments
/// * `folder` - Directory to scan (not recursed into)
/// * `extensions` - Only open sequences for these extensions; `None` or an
///   empty list accepts all
/// * `frame_spec` - Placeholder for the frame in the template; `None` or `""` uses
///   `%0Nd` with the padding of the first file seen for each sequence
///
/// The extension filter is applied when a sequence is first opened. A file
/// whose name reduces to an already opened sequence always adds its frame.
pub fn group_sequences(
    folder: &Path,
    extensions: Option<&[&str]>,
    frame_spec: Option<&str>,
) -> Result<Vec<SequenceDescriptor>, SequenceError> {
    let entries = std::fs::read_dir(folder).map_err(|source| SequenceError::ReadDir {
        path: folder.to_path_buf(),
        source,
    })?;

    // "prefix.ext" -> descriptor
    let mut groups: IndexMap<String, SequenceDescriptor> = IndexMap::new();

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!("Skipping unreadable entry in {}: {}", folder.display(), e);
                continue;
            }
        };

        let path = entry.path();
        if path.is_dir() {
            continue;
        }

        let Some(filename) = entry.file_name().to_str().map(str::to_owned) else {
            debug!("Skipping non UTF-8 file name in {}", folder.display());
            continue;
        };

        let Some(caps) = FRAME_REGEX.captures(&filename) else {
            continue;
        };
        let prefix = &caps[1];
        let separator = &caps[2];
        let frame = &caps[3];
        let extension = &caps[4];

        let key = format!("{}.{}", prefix, extension);
        if let Some(group) = groups.get_mut(&key) {
            group.frames.push(frame.to_string());
            continue;
        }

        // An empty list filters nothing
        if let Some(allowed) = extensions.filter(|a| !a.is_empty()) {
            if !allowed.contains(&extension) {
                continue;
            }
        }

        let spec = match frame_spec.filter(|s| !s.is_empty()) {
            Some(spec) => spec.to_string(),
            None => format!("%0{}d", frame.len()),
        };
        let seq_name = format!("{}{}{}.{}", prefix, separator, spec, extension);

        groups.insert(
            key,
            SequenceDescriptor {
                template_path: folder.join(seq_name),
                frames: vec![frame.to_string()],
            },
        );
    }

    let sequences: Vec<SequenceDescriptor> = groups.into_values().collect();
    info!(
        "Detected {} sequence(s) in {}",
        sequences.len(),
        folder.display()
    );
    Ok(sequences)
}

/// Find the sequence `path` belongs to by scanning its parent directory.
///
/// `path` is a template path (`%04d` or `####` style). Returns `Ok(None)`
/// when the directory holds no sequence with that template.
pub fn find_sequence(
    path: &Path,
    extensions: Option<&[&str]>,
) -> Result<Option<SequenceDescriptor>, SequenceError> {
    let folder = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let found = group_sequences(folder, extensions, None)?
        .into_iter()
        .find(|seq| seq.matches_path(path));

    match &found {
        Some(seq) => debug!(
            "Matched {} ({} frames)",
            seq.template_path.display(),
            seq.frame_count()
        ),
        None => debug!("No sequence in {} matches {}", folder.display(), path.display()),
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;

    fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            fs::write(dir.join(name), b"").unwrap();
        }
    }

    fn frame_set(seq: &SequenceDescriptor) -> HashSet<i64> {
        seq.frame_numbers().into_iter().collect()
    }

    #[test]
    fn test_single_sequence() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["shot01.0001.exr", "shot01.0002.exr", "shot01.0010.exr"]);

        let seqs = group_sequences(dir.path(), None, None).unwrap();
        assert_eq!(seqs.len(), 1);
        assert_eq!(seqs[0].template_path, dir.path().join("shot01.%04d.exr"));
        assert_eq!(frame_set(&seqs[0]), HashSet::from([1, 2, 10]));
        assert_eq!(seqs[0].frame_range(), Some((1, 10)));
    }

    #[test]
    fn test_extensions_split_sequences() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["a.1.jpg", "a.2.png"]);

        let seqs = group_sequences(dir.path(), None, None).unwrap();
        assert_eq!(seqs.len(), 2);
        let templates: HashSet<PathBuf> = seqs.iter().map(|s| s.template_path.clone()).collect();
        assert!(templates.contains(&dir.path().join("a.%01d.jpg")));
        assert!(templates.contains(&dir.path().join("a.%01d.png")));
    }

    #[test]
    fn test_extension_filter_excludes_all() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["plate.0001.jpg", "plate.0002.jpg"]);

        let seqs = group_sequences(dir.path(), Some(&["exr"]), None).unwrap();
        assert!(seqs.is_empty());
    }

    #[test]
    fn test_extension_filter_keeps_allowed() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["plate.0001.jpg", "beauty.0001.exr", "beauty.0002.exr"]);

        let seqs = group_sequences(dir.path(), Some(&["exr"]), None).unwrap();
        assert_eq!(seqs.len(), 1);
        assert_eq!(seqs[0].template_path, dir.path().join("beauty.%04d.exr"));
        assert_eq!(seqs[0].frame_count(), 2);
    }

    #[test]
    fn test_subdirectories_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("render.0001.exr")).unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        touch(&dir.path().join("nested"), &["inner.0001.exr"]);
        touch(dir.path(), &["render.0002.exr"]);

        let seqs = group_sequences(dir.path(), None, None).unwrap();
        assert_eq!(seqs.len(), 1);
        assert_eq!(seqs[0].frames, vec!["0002".to_string()]);
    }

    #[test]
    fn test_non_sequence_files_ignored() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["notes.txt", "movie.mov", "v001.exr", "README"]);

        let seqs = group_sequences(dir.path(), None, None).unwrap();
        assert!(seqs.is_empty());
    }

    #[test]
    fn test_separators() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["dash-001.tif", "under_01.dpx"]);

        let seqs = group_sequences(dir.path(), None, None).unwrap();
        let templates: HashSet<PathBuf> = seqs.iter().map(|s| s.template_path.clone()).collect();
        assert!(templates.contains(&dir.path().join("dash-%03d.tif")));
        assert!(templates.contains(&dir.path().join("under_%02d.dpx")));
    }

    #[test]
    fn test_separator_not_part_of_key() {
        // "a.1.exr" and "a_2.exr" reduce to the same "a.exr" sequence
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["a.1.exr", "a_2.exr"]);

        let seqs = group_sequences(dir.path(), None, None).unwrap();
        assert_eq!(seqs.len(), 1);
        assert_eq!(frame_set(&seqs[0]), HashSet::from([1, 2]));
    }

    #[test]
    fn test_custom_frame_spec() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["key_light1.0001.exr", "key_light1.0002.exr"]);

        let seqs = group_sequences(dir.path(), None, Some("{FRAME}")).unwrap();
        assert_eq!(seqs.len(), 1);
        assert_eq!(seqs[0].template_path, dir.path().join("key_light1.{FRAME}.exr"));
    }

    #[test]
    fn test_rescan_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        touch(
            dir.path(),
            &["bg.1001.exr", "bg.1002.exr", "fg.001.png", "fg.002.png", "fg.003.png"],
        );

        let key = |seqs: Vec<SequenceDescriptor>| -> HashSet<(PathBuf, Vec<i64>)> {
            seqs.into_iter().map(|s| (s.template_path.clone(), s.frame_numbers())).collect()
        };
        let first = key(group_sequences(dir.path(), None, None).unwrap());
        let second = key(group_sequences(dir.path(), None, None).unwrap());
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_frame_range_is_string_ordered() {
        let seq = SequenceDescriptor {
            template_path: PathBuf::from("/tmp/x.%01d.exr"),
            frames: vec!["9".into(), "10".into(), "8".into()],
        };
        // "10" < "8" < "9" as strings
        assert_eq!(seq.frame_range(), Some((10, 9)));
        assert_eq!(seq.frame_numbers(), vec![8, 9, 10]);
    }

    #[test]
    fn test_matches_hash_padding() {
        let seq = SequenceDescriptor {
            template_path: PathBuf::from("/show/sh010/comp.%04d.exr"),
            frames: vec!["0001".into()],
        };
        assert!(seq.matches_path(Path::new("/show/sh010/comp.%04d.exr")));
        assert!(seq.matches_path(Path::new("/show/sh010/comp.####.exr")));
        assert!(!seq.matches_path(Path::new("/show/sh010/comp.###.exr")));
        assert!(!seq.matches_path(Path::new("/show/sh010/other.%04d.exr")));
    }

    #[test]
    fn test_empty_extension_list_accepts_all() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["shot01.0001.exr", "shot01.0002.exr"]);

        let seqs = group_sequences(dir.path(), Some(&[]), None).unwrap();
        assert_eq!(seqs.len(), 1);
        assert_eq!(seqs[0].template_path, dir.path().join("shot01.%04d.exr"));
    }

    #[test]
    fn test_empty_frame_spec_uses_padding() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["shot01.0001.exr", "shot01.0002.exr"]);

        let seqs = group_sequences(dir.path(), None, Some("")).unwrap();
        assert_eq!(seqs.len(), 1);
        assert_eq!(seqs[0].template_path, dir.path().join("shot01.%04d.exr"));
    }

    #[test]
    fn test_hash_in_folder_name_is_literal() {
        let seq = SequenceDescriptor {
            template_path: PathBuf::from("/show/#1/comp.%04d.exr"),
            frames: vec!["0001".into()],
        };
        assert!(seq.matches_path(Path::new("/show/#1/comp.####.exr")));
        assert!(!seq.matches_path(Path::new("/show/%01d/comp.####.exr")));

        let rewritten = SequenceDescriptor {
            template_path: PathBuf::from("/show/%01d/comp.%04d.exr"),
            frames: vec!["0001".into()],
        };
        assert!(!rewritten.matches_path(Path::new("/show/#1/comp.####.exr")));
    }

    #[test]
    fn test_find_sequence() {
        let dir = tempfile::tempdir().unwrap();
        touch(
            dir.path(),
            &["comp.0101.exr", "comp.0102.exr", "comp.0103.exr", "denoise.0101.exr"],
        );

        let found = find_sequence(&dir.path().join("comp.####.exr"), None).unwrap().unwrap();
        assert_eq!(found.frame_range(), Some((101, 103)));

        let missing = find_sequence(&dir.path().join("comp.%03d.exr"), None).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_missing_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = group_sequences(&dir.path().join("gone"), None, None).unwrap_err();
        assert!(matches!(err, SequenceError::ReadDir { .. }));
    }
}
