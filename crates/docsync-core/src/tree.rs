//! Directory listing served to the file browser.

use std::{fs, io, path::Path};

use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    pub name: String,
    /// Path relative to the tree root, `/`-separated. The root node carries
    /// the root directory's own name.
    pub path: String,
    pub is_dir: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FileNode>,
}

/// Walk `root`, skipping hidden entries and anything unreadable.
///
/// Directories sort before files; each group is alphabetical.
pub fn build_tree(root: &Path) -> io::Result<FileNode> {
    let meta = fs::metadata(root)?;
    let name = root
        .canonicalize()
        .ok()
        .and_then(|abs| abs.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| root.to_string_lossy().into_owned());

    let mut node = FileNode {
        path: name.clone(),
        name,
        is_dir: meta.is_dir(),
        children: Vec::new(),
    };
    if node.is_dir {
        node.children = list_children(root, "")?;
    }
    Ok(node)
}

fn list_children(dir: &Path, prefix: &str) -> io::Result<Vec<FileNode>> {
    let mut nodes = Vec::new();
    for entry in fs::read_dir(dir)? {
        let Ok(entry) = entry else { continue };
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_hidden(&name) {
            continue;
        }

        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };
        let Ok(meta) = fs::metadata(entry.path()) else {
            debug!("skipping unreadable {path}");
            continue;
        };

        let children = if meta.is_dir() {
            match list_children(&entry.path(), &path) {
                Ok(children) => children,
                Err(err) => {
                    debug!("skipping unreadable directory {path}: {err}");
                    continue;
                }
            }
        } else {
            Vec::new()
        };

        nodes.push(FileNode {
            name,
            path,
            is_dir: meta.is_dir(),
            children,
        });
    }

    nodes.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
    Ok(nodes)
}

pub(crate) fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}
