use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Maps dotted module paths to the files that define them.
///
/// Example: `pkg.core.models` -> `/repo/pkg/core/models.py`,
/// `pkg.core` -> `/repo/pkg/core/__init__.py`.
#[derive(Debug, Default, Clone)]
pub struct ModuleMap {
    /// Module path to file.
    by_module: HashMap<String, PathBuf>,
}

impl ModuleMap {
    /// Creates a new empty module map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module. The first file registered for a module path
    /// keeps it; returns false when the path was already taken.
    pub fn insert(&mut self, module: String, file: PathBuf) -> bool {
        if self.by_module.contains_key(&module) {
            return false;
        }
        self.by_module.insert(module, file);
        true
    }

    /// Resolves an exact module path.
    pub fn resolve(&self, module: &str) -> Option<&Path> {
        self.by_module.get(module).map(PathBuf::as_path)
    }

    /// Resolves the longest prefix of `parts` that names a known module.
    pub fn resolve_longest_prefix(&self, parts: &[String]) -> Option<&Path> {
        (1..=parts.len())
            .rev()
            .find_map(|len| self.resolve(&parts[..len].join(".")))
    }

    pub fn len(&self) -> usize {
        self.by_module.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_module.is_empty()
    }
}

/// The dotted module path of `file` relative to `root`.
///
/// A package marker file (`__init__`) names its directory; the marker at
/// the root itself names nothing. Files outside `root` have no module path.
pub fn module_name(root: &Path, file: &Path, package_marker: Option<&str>) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let mut parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    let file_name = parts.pop()?;
    let stem = Path::new(&file_name).file_stem()?.to_str()?.to_string();

    if package_marker == Some(stem.as_str()) {
        if parts.is_empty() {
            return None;
        }
    } else {
        parts.push(stem);
    }

    Some(parts.join("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_names() {
        let root = Path::new("/repo");
        let marker = Some("__init__");

        assert_eq!(
            module_name(root, Path::new("/repo/pkg/core/models.py"), marker).as_deref(),
            Some("pkg.core.models")
        );
        assert_eq!(
            module_name(root, Path::new("/repo/pkg/__init__.py"), marker).as_deref(),
            Some("pkg")
        );
        assert_eq!(module_name(root, Path::new("/repo/__init__.py"), marker), None);
        assert_eq!(module_name(root, Path::new("/elsewhere/x.py"), marker), None);
        assert_eq!(
            module_name(root, Path::new("/repo/main.py"), marker).as_deref(),
            Some("main")
        );
    }

    #[test]
    fn test_longest_prefix_wins() {
        let mut map = ModuleMap::new();
        map.insert("pkg".into(), PathBuf::from("/repo/pkg/__init__.py"));
        map.insert("pkg.util".into(), PathBuf::from("/repo/pkg/util.py"));

        let parts = |s: &str| s.split('.').map(String::from).collect::<Vec<_>>();

        assert_eq!(
            map.resolve_longest_prefix(&parts("pkg.util.helper")),
            Some(Path::new("/repo/pkg/util.py"))
        );
        assert_eq!(
            map.resolve_longest_prefix(&parts("pkg.other")),
            Some(Path::new("/repo/pkg/__init__.py"))
        );
        assert_eq!(map.resolve_longest_prefix(&parts("numpy.linalg")), None);
    }

    #[test]
    fn test_first_registration_keeps_module() {
        let mut map = ModuleMap::new();
        assert!(map.insert("pkg".into(), PathBuf::from("/repo/pkg/__init__.py")));
        assert!(!map.insert("pkg".into(), PathBuf::from("/repo/pkg.py")));
        assert_eq!(map.resolve("pkg"), Some(Path::new("/repo/pkg/__init__.py")));
        assert_eq!(map.len(), 1);
    }
}
