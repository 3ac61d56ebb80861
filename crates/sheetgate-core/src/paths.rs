use std::path::{Component, Path, PathBuf};

use crate::error::Error;

/// Lexical normalization: drops `.`, folds `..` into its parent. Never
/// touches the filesystem, so it works for paths that do not exist yet.
pub fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    result.push(component.as_os_str());
                }
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

fn traversal(name: &str, root: &Path) -> Error {
    Error::Traversal {
        name: name.to_string(),
        root: root.to_path_buf(),
    }
}

/// Resolves a flat file name directly under `root`. The normalized parent
/// must be `root` itself.
pub fn resolve_in_root(root: &Path, name: &str) -> Result<PathBuf, Error> {
    if name.is_empty() || name.contains(['/', '\\', '\0']) || name == "." || name == ".." {
        return Err(traversal(name, root));
    }

    let root = normalize(root);
    let candidate = normalize(&root.join(name));
    match candidate.parent() {
        Some(parent) if parent == root => Ok(candidate),
        _ => Err(traversal(name, &root)),
    }
}

/// Resolves a relative archive entry name somewhere beneath `root`.
/// Backslashes count as separators and percent-encoded sequences are decoded
/// before the check.
pub fn resolve_entry(root: &Path, entry_name: &str) -> Result<PathBuf, Error> {
    let decoded = urlencoding::decode(entry_name)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| entry_name.to_string());

    let unified = decoded.replace('\\', "/");
    if unified.is_empty() || unified.contains('\0') || unified.starts_with('/') {
        return Err(traversal(entry_name, root));
    }

    let relative = Path::new(&unified);
    if relative
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
    {
        return Err(traversal(entry_name, root));
    }
    // Drive-letter names like "C:evil" are only a prefix on Windows.
    if unified.as_bytes().get(1) == Some(&b':') {
        return Err(traversal(entry_name, root));
    }

    let root = normalize(root);
    let candidate = normalize(&root.join(relative));
    if candidate == root || !candidate.starts_with(&root) {
        return Err(traversal(entry_name, &root));
    }
    Ok(candidate)
}
