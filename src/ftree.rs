// Derived folder/file tree for navigation rendering. The tree is
// rebuilt from the flat map on every request; it is a view, never a
// second copy of the truth.

use crate::paths;
use crate::vfs::FlatFileMap;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub(crate) enum TreeNode {
    Folder(FolderNode),
    File(FileNode),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct FolderNode {
    pub(crate) name: String,
    pub(crate) path: String,
    pub(crate) children: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct FileNode {
    pub(crate) name: String,
    pub(crate) path: String,
}

impl TreeNode {
    pub(crate) fn get_name(&self) -> &str {
        match self {
            TreeNode::Folder(f) => &f.name,
            TreeNode::File(f) => &f.name,
        }
    }

    pub(crate) fn get_path(&self) -> &str {
        match self {
            TreeNode::Folder(f) => &f.path,
            TreeNode::File(f) => &f.path,
        }
    }
}

/// Build the folder/file forest from the flat map. Every proper prefix
/// of every key becomes exactly one folder, deduplicated by cumulative
/// path; child order is first-seen during derivation. Placeholder
/// entries derive their folders but are hidden as files. Keys with an
/// empty segment are skipped.
pub(crate) fn derive_tree(flat: &FlatFileMap) -> Vec<TreeNode> {
    let mut roots: Vec<TreeNode> = Vec::new();
    for key in flat.keys() {
        let segments = match paths::segments(key) {
            Some(segments) => segments,
            None => continue,
        };
        insert_key(&mut roots, &segments, "");
    }
    roots
}

fn insert_key(children: &mut Vec<TreeNode>, segments: &[&str], prefix: &str) {
    let name = segments[0];
    let path = if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    };
    if segments.len() == 1 {
        if name == paths::PLACEHOLDER_NAME {
            return;
        }
        children.push(TreeNode::File(FileNode {
            name: name.to_string(),
            path,
        }));
        return;
    }
    let index = children
        .iter()
        .position(|child| matches!(child, TreeNode::Folder(f) if f.path == path));
    let index = match index {
        Some(index) => index,
        None => {
            children.push(TreeNode::Folder(FolderNode {
                name: name.to_string(),
                path: path.clone(),
                children: Vec::new(),
            }));
            children.len() - 1
        }
    };
    if let TreeNode::Folder(folder) = &mut children[index] {
        insert_key(&mut folder.children, &segments[1..], &path);
    }
}

/// Depth-first search for the folder with exactly this path.
pub(crate) fn find_node<'a>(tree: &'a [TreeNode], target_path: &str) -> Option<&'a FolderNode> {
    for node in tree {
        if let TreeNode::Folder(folder) = node {
            if folder.path == target_path {
                return Some(folder);
            }
            if let Some(found) = find_node(&folder.children, target_path) {
                return Some(found);
            }
        }
    }
    None
}

/// Contents of the folder at `path`, or the root forest for `""`. A
/// missing folder renders as empty rather than erroring.
pub(crate) fn children_of<'a>(tree: &'a [TreeNode], path: &str) -> &'a [TreeNode] {
    if path.is_empty() {
        return tree;
    }
    find_node(tree, path)
        .map(|folder| folder.children.as_slice())
        .unwrap_or(&[])
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Breadcrumb {
    pub(crate) name: String,
    pub(crate) path: String,
}

/// Presentational navigation state: the current folder path, `""`
/// meaning the workspace root.
#[derive(Debug, Default)]
pub(crate) struct Navigator {
    current: String,
}

impl Navigator {
    pub(crate) fn new() -> Navigator {
        Navigator {
            current: String::new(),
        }
    }

    pub(crate) fn current(&self) -> &str {
        &self.current
    }

    pub(crate) fn navigate_into(&mut self, folder_path: &str) {
        self.current = folder_path.trim_matches('/').to_string();
    }

    pub(crate) fn navigate_up(&mut self) {
        // Root stays root.
        self.current = paths::parent(&self.current).unwrap_or("").to_string();
    }

    pub(crate) fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        let mut crumbs = Vec::new();
        let mut prefix = String::new();
        if self.current.is_empty() {
            return crumbs;
        }
        for segment in self.current.split('/') {
            if prefix.is_empty() {
                prefix.push_str(segment);
            } else {
                prefix.push('/');
                prefix.push_str(segment);
            }
            crumbs.push(Breadcrumb {
                name: segment.to_string(),
                path: prefix.clone(),
            });
        }
        crumbs
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

    fn folder_paths(tree: &[TreeNode], out: &mut Vec<String>) {
        for node in tree {
            if let TreeNode::Folder(folder) = node {
                out.push(folder.path.clone());
                folder_paths(&folder.children, out);
            }
        }
    }

    fn file_count(tree: &[TreeNode]) -> usize {
        tree.iter()
            .map(|node| match node {
                TreeNode::File(_) => 1,
                TreeNode::Folder(folder) => file_count(&folder.children),
            })
            .sum()
    }

    #[test]
    fn nested_scenario() {
        let map = flat(&[("a.js", "x"), ("src/b.js", "y"), ("src/utils/c.js", "z")]);
        let tree = derive_tree(&map);
        assert_eq!(tree.len(), 2);

        let root_file = tree
            .iter()
            .find(|n| matches!(n, TreeNode::File(_)))
            .unwrap();
        assert_eq!(root_file.get_name(), "a.js");

        let src = find_node(&tree, "src").unwrap();
        assert_eq!(src.name, "src");
        assert_eq!(src.children.len(), 2);

        let utils = find_node(&tree, "src/utils").unwrap();
        assert_eq!(utils.path, "src/utils");
        assert_eq!(utils.children.len(), 1);
        assert_eq!(utils.children[0].get_path(), "src/utils/c.js");
    }

    #[test]
    fn one_folder_per_distinct_prefix() {
        let map = flat(&[
            ("src/a.js", "1"),
            ("src/b.js", "2"),
            ("src/utils/c.js", "3"),
            ("src/utils/d.js", "4"),
            ("docs/readme.md", "5"),
        ]);
        let tree = derive_tree(&map);
        let mut seen = Vec::new();
        folder_paths(&tree, &mut seen);
        seen.sort();
        assert_eq!(seen, vec!["docs", "src", "src/utils"]);
    }

    #[test]
    fn file_count_ignores_malformed_keys_and_placeholders() {
        let map = flat(&[
            ("a.js", "x"),
            ("src//bad.js", "y"),
            ("src/b.js", "z"),
            ("empty/.placeholder", ""),
        ]);
        let tree = derive_tree(&map);
        assert_eq!(file_count(&tree), 2);
        // The placeholder still derives its folder
        assert!(find_node(&tree, "empty").is_some());
        assert!(find_node(&tree, "empty").unwrap().children.is_empty());
    }

    #[test]
    fn derivation_is_idempotent() {
        let map = flat(&[("a.js", "x"), ("src/b.js", "y"), ("src/utils/c.js", "z")]);
        assert_eq!(derive_tree(&map), derive_tree(&map));
    }

    #[test]
    fn missing_folder_renders_empty() {
        let map = flat(&[("a.js", "x")]);
        let tree = derive_tree(&map);
        assert!(find_node(&tree, "nope").is_none());
        assert!(children_of(&tree, "nope").is_empty());
        assert_eq!(children_of(&tree, "").len(), 1);
    }

    #[test]
    fn navigator_up_from_folder_returns_to_root() {
        let mut nav = Navigator::new();
        nav.navigate_into("src");
        assert_eq!(nav.current(), "src");
        nav.navigate_up();
        assert_eq!(nav.current(), "");
        nav.navigate_up();
        assert_eq!(nav.current(), "");
    }

    #[test]
    fn breadcrumbs_accumulate_prefixes() {
        let mut nav = Navigator::new();
        assert!(nav.breadcrumbs().is_empty());
        nav.navigate_into("src/utils/deep");
        let crumbs = nav.breadcrumbs();
        assert_eq!(crumbs.len(), 3);
        assert_eq!(crumbs[0].name, "src");
        assert_eq!(crumbs[0].path, "src");
        assert_eq!(crumbs[1].path, "src/utils");
        assert_eq!(crumbs[2].path, "src/utils/deep");
        nav.navigate_up();
        assert_eq!(nav.current(), "src/utils");
    }
}
