use crate::core::models::{DependencyEdge, ModuleKind};
use crate::core::session::BuildSession;
use crate::utils::Result;
use futures::future::try_join_all;
use std::path::Path;

/// Resolve the ordered (specifier, absolute path) edges declared by one
/// file. Non-script files have no extractable dependencies. All specifiers
/// of one file resolve concurrently; an unresolvable specifier fails the
/// build for this entry.
pub(crate) async fn resolve_dependencies(
    session: &BuildSession,
    file: &Path,
) -> Result<Vec<DependencyEdge>> {
    if !ModuleKind::from_path(file).supports_imports() {
        return Ok(Vec::new());
    }

    let source = session.content(file).await?;
    let specifiers = session.scanner().scan(&source);
    if specifiers.is_empty() {
        return Ok(Vec::new());
    }

    let base_dir = file.parent().unwrap_or_else(|| Path::new("/"));
    let resolved = try_join_all(
        specifiers
            .iter()
            .map(|specifier| session.resolver().resolve(specifier, base_dir)),
    )
    .await?;

    Ok(specifiers
        .into_iter()
        .zip(resolved)
        .map(|(specifier, path)| DependencyEdge { specifier, path })
        .collect())
}

#[cfg(test)]
mod tests {
    use crate::core::models::BundleOptions;
    use crate::core::session::BuildSession;
    use std::fs;

    #[tokio::test]
    async fn test_edges_pair_specifiers_with_absolute_paths() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::write(root.join("entry.js"), "import { a } from './a.js';\nimport data from './data.json';\n").unwrap();
        fs::write(root.join("a.js"), "export const a = 1;\n").unwrap();
        fs::write(root.join("data.json"), "{\"x\":1}\n").unwrap();

        let session = BuildSession::new(BundleOptions::new(root.clone()));
        let edges = session.dependencies(&root.join("entry.js")).await.unwrap();

        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].specifier, "./a.js");
        assert_eq!(edges[0].path, root.join("a.js"));
        assert_eq!(edges[1].specifier, "./data.json");
        assert_eq!(edges[1].path, root.join("data.json"));
    }

    #[tokio::test]
    async fn test_non_script_files_have_no_edges() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::write(root.join("data.json"), "{\"import\":\"./nope.js\"}\n").unwrap();

        let session = BuildSession::new(BundleOptions::new(root.clone()));
        let edges = session.dependencies(&root.join("data.json")).await.unwrap();
        assert!(edges.is_empty());
    }

    #[tokio::test]
    async fn test_unresolvable_specifier_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::write(root.join("entry.js"), "import { a } from './missing.js';\n").unwrap();

        let session = BuildSession::new(BundleOptions::new(root.clone()));
        let err = session
            .dependencies(&root.join("entry.js"))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::utils::TabaError::Resolution { .. }));
    }
}
