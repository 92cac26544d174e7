// The nested directory/file structure the in-browser sandbox expects
// from its mount call. Built fresh from the flat map; content is
// carried verbatim, placeholders included, so flattening the
// descriptor reproduces the map exactly.

use crate::paths;
use crate::vfs::FlatFileMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub(crate) type MountDescriptor = BTreeMap<String, MountEntry>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum MountEntry {
    File { file: FileContents },
    Directory { directory: MountDescriptor },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct FileContents {
    pub(crate) contents: String,
}

/// Build the sandbox mount structure. Single-segment keys become file
/// entries at the root; deeper keys create or reuse directory entries
/// for every segment but the last. Malformed keys are skipped.
pub(crate) fn build_mount(flat: &FlatFileMap) -> MountDescriptor {
    let mut root = MountDescriptor::new();
    for (key, content) in flat {
        let segments = match paths::segments(key) {
            Some(segments) => segments,
            None => continue,
        };
        insert_entry(&mut root, &segments, content);
    }
    root
}

fn insert_entry(dir: &mut MountDescriptor, segments: &[&str], content: &str) {
    if segments.len() == 1 {
        dir.insert(
            segments[0].to_string(),
            MountEntry::File {
                file: FileContents {
                    contents: content.to_string(),
                },
            },
        );
        return;
    }
    let child = dir
        .entry(segments[0].to_string())
        .or_insert_with(|| MountEntry::Directory {
            directory: MountDescriptor::new(),
        });
    if let MountEntry::Directory { directory } = child {
        insert_entry(directory, &segments[1..], content);
    }
}

/// Depth-first traversal back to path→content pairs. Used when
/// materializing a session directory and to check mount fidelity.
pub(crate) fn flatten_mount(descriptor: &MountDescriptor) -> FlatFileMap {
    let mut flat = FlatFileMap::new();
    flatten_into(descriptor, "", &mut flat);
    flat
}

fn flatten_into(descriptor: &MountDescriptor, prefix: &str, flat: &mut FlatFileMap) {
    for (name, entry) in descriptor {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", prefix, name)
        };
        match entry {
            MountEntry::File { file } => {
                flat.insert(path, file.contents.clone());
            }
            MountEntry::Directory { directory } => {
                flatten_into(directory, &path, flat);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(entries: &[(&str, &str)]) -> FlatFileMap {
        entries
            .iter()
            .map(|(path, content)| (path.to_string(), content.to_string()))
            .collect()
    }

    #[test]
    fn single_segment_keys_sit_at_the_root() {
        let map = flat(&[("index.js", "x"), ("package.json", "{}")]);
        let mount = build_mount(&map);
        assert_eq!(mount.len(), 2);
        assert!(matches!(mount.get("index.js"), Some(MountEntry::File { .. })));
    }

    #[test]
    fn deep_keys_nest_directories() {
        let map = flat(&[("src/utils/c.js", "z"), ("src/b.js", "y")]);
        let mount = build_mount(&map);
        let src = match mount.get("src").unwrap() {
            MountEntry::Directory { directory } => directory,
            _ => panic!("src should be a directory"),
        };
        assert!(matches!(src.get("b.js"), Some(MountEntry::File { .. })));
        let utils = match src.get("utils").unwrap() {
            MountEntry::Directory { directory } => directory,
            _ => panic!("utils should be a directory"),
        };
        match utils.get("c.js").unwrap() {
            MountEntry::File { file } => assert_eq!(file.contents, "z"),
            _ => panic!("c.js should be a file"),
        }
    }

    #[test]
    fn flatten_round_trips_exactly() {
        let map = flat(&[
            ("a.js", "x"),
            ("src/b.js", "y"),
            ("src/utils/c.js", "z"),
            ("empty/.placeholder", ""),
        ]);
        assert_eq!(flatten_mount(&build_mount(&map)), map);
    }

    #[test]
    fn serializes_to_the_sandbox_wire_shape() {
        let map = flat(&[("index.js", "hi"), ("src/b.js", "y")]);
        let value = serde_json::to_value(build_mount(&map)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "index.js": { "file": { "contents": "hi" } },
                "src": { "directory": { "b.js": { "file": { "contents": "y" } } } }
            })
        );
    }

    #[test]
    fn malformed_keys_are_skipped() {
        let map = flat(&[("a.js", "x"), ("bad//key.js", "y")]);
        let mount = build_mount(&map);
        assert_eq!(mount.len(), 1);
        assert!(mount.contains_key("a.js"));
    }
}
