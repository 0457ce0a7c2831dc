//! Name hashing for asset identity.
//!
//! Every asset is identified by the hash of its normalized path relative to
//! the import root. The hash is the only key used by the manifest, the
//! loaded-asset index and the arenas.

use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hasher;
use std::path::{Component, Path};

/// Deterministic hash of a normalized relative asset path
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NameHash(pub u64);

impl NameHash {
    /// Reserved for procedurally generated fallback slots
    pub const MISSING: NameHash = NameHash(0);

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NameHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Normalize `path` into a forward-slash path relative to `import_root`.
///
/// The import-root prefix is stripped when present, `.` components are
/// dropped and `..` pops the previous component. Paths that are already
/// relative pass through with only separator and dot cleanup.
pub fn normalize_asset_path(import_root: &Path, path: impl AsRef<Path>) -> String {
    let path = path.as_ref();
    let relative = path.strip_prefix(import_root).unwrap_or(path);

    let mut parts: Vec<String> = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().replace('\\', "/")),
            Component::ParentDir => {
                parts.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    parts.join("/")
}

/// Hash an already normalized relative path
pub fn hash_normalized(normalized: &str) -> NameHash {
    let mut hasher = FxHasher::default();
    hasher.write(normalized.as_bytes());
    let hash = hasher.finish();
    // Zero is reserved for fallback slots
    if hash == NameHash::MISSING.0 {
        NameHash(1)
    } else {
        NameHash(hash)
    }
}

/// Strip the import root from `path`, normalize it and hash the result
pub fn compute_name_hash(import_root: &Path, path: impl AsRef<Path>) -> NameHash {
    hash_normalized(&normalize_asset_path(import_root, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_import_root_is_stripped() {
        let root = PathBuf::from("/project/assets");
        assert_eq!(
            normalize_asset_path(&root, "/project/assets/meshes/cube.mesh"),
            "meshes/cube.mesh"
        );
        assert_eq!(
            compute_name_hash(&root, "/project/assets/meshes/cube.mesh"),
            compute_name_hash(&root, "meshes/cube.mesh")
        );
    }

    #[test]
    fn test_dot_components_are_resolved() {
        let root = PathBuf::from("assets");
        assert_eq!(
            normalize_asset_path(&root, "./meshes/../textures/./brick.png"),
            "textures/brick.png"
        );
    }

    #[test]
    fn test_hash_is_deterministic() {
        let a = hash_normalized("fonts/mono.ttf");
        let b = hash_normalized("fonts/mono.ttf");
        assert_eq!(a, b);
        assert_ne!(a, hash_normalized("fonts/sans.ttf"));
        assert_ne!(a, NameHash::MISSING);
    }

    #[test]
    fn test_display_is_fixed_width_hex() {
        assert_eq!(NameHash(0x1f).to_string(), "000000000000001f");
    }
}
