use crate::core::interfaces::PathResolver;
use crate::utils::{Result, TabaError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs", "json", "css"];
const INDEX_FILES: &[&str] = &["index.js", "index.jsx", "index.mjs", "index.json"];

/// The package.json fields entry-point resolution cares about.
#[derive(Debug, Clone, Deserialize)]
struct PackageJson {
    #[serde(default)]
    main: Option<String>,
    #[serde(default)]
    module: Option<String>,
}

/// Node.js-style specifier resolution: relative and absolute specifiers
/// resolve against the importing file's directory or the source root; bare
/// specifiers walk up the directory tree through `node_modules`. Every
/// successful resolution is canonicalized so the same file always yields the
/// same cache and graph key.
pub struct NodePathResolver {
    source_root: PathBuf,
}

impl NodePathResolver {
    pub fn new(source_root: PathBuf) -> Self {
        Self { source_root }
    }

    fn resolution_error(&self, specifier: &str, base_dir: &Path) -> TabaError {
        TabaError::Resolution {
            specifier: specifier.to_string(),
            base: base_dir.to_path_buf(),
        }
    }

    fn resolve_file_or_directory(&self, path: &Path) -> Option<PathBuf> {
        if let Some(file) = self.resolve_as_file(path) {
            return Some(file);
        }
        if !path.is_dir() {
            return None;
        }

        let package_json = path.join("package.json");
        if package_json.is_file() {
            if let Some(package) = read_package_json(&package_json) {
                for entry in [package.module, package.main].into_iter().flatten() {
                    if let Some(resolved) = self.resolve_as_file(&path.join(entry)) {
                        return Some(resolved);
                    }
                }
            }
        }

        for index in INDEX_FILES {
            let candidate = path.join(index);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }

    fn resolve_as_file(&self, path: &Path) -> Option<PathBuf> {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        let file_name = path.file_name()?.to_string_lossy();
        for ext in EXTENSIONS {
            let with_ext = path.with_file_name(format!("{}.{}", file_name, ext));
            if with_ext.is_file() {
                return Some(with_ext);
            }
        }
        None
    }

    fn resolve_bare(&self, specifier: &str, base_dir: &Path) -> Option<PathBuf> {
        let mut current = base_dir;
        loop {
            let node_modules = current.join("node_modules");
            if node_modules.is_dir() {
                if let Some(resolved) =
                    self.resolve_file_or_directory(&node_modules.join(specifier))
                {
                    return Some(resolved);
                }
            }
            if current == self.source_root {
                break;
            }
            current = current.parent()?;
        }
        None
    }
}

#[async_trait::async_trait]
impl PathResolver for NodePathResolver {
    async fn resolve(&self, specifier: &str, base_dir: &Path) -> Result<PathBuf> {
        let candidate = if specifier.starts_with("./") || specifier.starts_with("../") {
            self.resolve_file_or_directory(&base_dir.join(specifier))
        } else if let Some(rooted) = specifier.strip_prefix('/') {
            self.resolve_file_or_directory(&self.source_root.join(rooted))
        } else {
            self.resolve_bare(specifier, base_dir)
        };

        let candidate =
            candidate.ok_or_else(|| self.resolution_error(specifier, base_dir))?;
        candidate
            .canonicalize()
            .map_err(|_| self.resolution_error(specifier, base_dir))
    }
}

fn read_package_json(path: &Path) -> Option<PackageJson> {
    let content = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn resolver_for(root: &Path) -> NodePathResolver {
        NodePathResolver::new(root.to_path_buf())
    }

    #[tokio::test]
    async fn test_relative_specifier_with_extension() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::write(root.join("util.js"), "").unwrap();

        let resolver = resolver_for(&root);
        let resolved = resolver.resolve("./util.js", &root).await.unwrap();
        assert_eq!(resolved, root.join("util.js"));
    }

    #[tokio::test]
    async fn test_extension_inference() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::write(root.join("util.js"), "").unwrap();

        let resolver = resolver_for(&root);
        let resolved = resolver.resolve("./util", &root).await.unwrap();
        assert_eq!(resolved, root.join("util.js"));
    }

    #[tokio::test]
    async fn test_directory_index_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir(root.join("lib")).unwrap();
        fs::write(root.join("lib/index.js"), "").unwrap();

        let resolver = resolver_for(&root);
        let resolved = resolver.resolve("./lib", &root).await.unwrap();
        assert_eq!(resolved, root.join("lib/index.js"));
    }

    #[tokio::test]
    async fn test_parent_relative_specifier() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir(root.join("nested")).unwrap();
        fs::write(root.join("shared.js"), "").unwrap();

        let resolver = resolver_for(&root);
        let resolved = resolver
            .resolve("../shared.js", &root.join("nested"))
            .await
            .unwrap();
        assert_eq!(resolved, root.join("shared.js"));
    }

    #[tokio::test]
    async fn test_bare_specifier_via_node_modules() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let package = root.join("node_modules/leftpad");
        fs::create_dir_all(&package).unwrap();
        fs::write(package.join("package.json"), r#"{"main": "lib/pad.js"}"#).unwrap();
        fs::create_dir(package.join("lib")).unwrap();
        fs::write(package.join("lib/pad.js"), "").unwrap();

        let resolver = resolver_for(&root);
        let resolved = resolver.resolve("leftpad", &root).await.unwrap();
        assert_eq!(resolved, package.join("lib/pad.js"));
    }

    #[tokio::test]
    async fn test_unresolvable_specifier_errors() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();

        let resolver = resolver_for(&root);
        let err = resolver.resolve("./missing.js", &root).await.unwrap_err();
        assert!(matches!(err, TabaError::Resolution { .. }));
    }
}
