use crate::core::models::*;
use crate::core::session::BuildSession;
use crate::utils::{Logger, Result, TabaError};
use std::path::Path;

/// Route one file to its extension-appropriate transform.
pub(crate) async fn compile_file(session: &BuildSession, file: &Path) -> Result<CompiledModule> {
    session.count_compilation();
    Logger::compiling(file);

    match ModuleKind::from_path(file) {
        ModuleKind::Script => compile_script(session, file).await,
        ModuleKind::Data => compile_data(session, file).await,
        ModuleKind::Stylesheet => compile_stylesheet(session, file).await,
        ModuleKind::Other => Ok(CompiledModule {
            file: file.to_path_buf(),
            code: String::new(),
            map: None,
        }),
    }
}

async fn compile_script(session: &BuildSession, file: &Path) -> Result<CompiledModule> {
    let source = session.content(file).await?;
    let source_root = &session.options.source_root;
    let source_file_name = file
        .strip_prefix(source_root)
        .unwrap_or(file)
        .to_string_lossy()
        .into_owned();

    let options = TransformOptions {
        source_root: source_root.clone(),
        source_maps: true,
        source_file_name,
        emit_comments: false,
    };
    let output = session.transformer().compile(&source, &options).await?;

    Ok(CompiledModule {
        file: file.to_path_buf(),
        code: output.code,
        map: output.map,
    })
}

/// JSON-like data becomes an assignment the runtime loader can execute.
async fn compile_data(session: &BuildSession, file: &Path) -> Result<CompiledModule> {
    let content = session.content(file).await?;
    Ok(CompiledModule {
        file: file.to_path_buf(),
        code: format!("module.exports = {};", content.trim_end()),
        map: None,
    })
}

async fn compile_stylesheet(session: &BuildSession, file: &Path) -> Result<CompiledModule> {
    let content = session.content(file).await?;
    let code = match session.stylesheets().render(&content).await {
        Ok(output) => format!("module.exports = {};", serde_json::to_string(&output.css)?),
        Err(err) => match session.options.style_policy {
            StylePolicy::Strict => {
                return Err(TabaError::Stylesheet {
                    file: file.to_path_buf(),
                    message: err.to_string(),
                })
            }
            StylePolicy::Stub => {
                Logger::warn(&format!(
                    "stylesheet {} failed to compile, emitting placeholder: {}",
                    file.display(),
                    err
                ));
                let name = file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file.display().to_string());
                format!(
                    "console.log({});",
                    serde_json::to_string(&format!("stylesheet {} failed to compile", name))?
                )
            }
        },
    };
    Ok(CompiledModule {
        file: file.to_path_buf(),
        code,
        map: None,
    })
}

#[cfg(test)]
mod tests {
    use crate::core::models::{BundleOptions, StylePolicy};
    use crate::core::session::BuildSession;
    use std::fs;

    #[tokio::test]
    async fn test_data_files_become_export_assignments() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::write(root.join("config.json"), "{\"debug\": true}\n").unwrap();

        let session = BuildSession::new(BundleOptions::new(root.clone()));
        let unit = session.compile(&root.join("config.json")).await.unwrap();

        assert_eq!(unit.code, "module.exports = {\"debug\": true};");
        assert!(unit.map.is_none());
    }

    #[tokio::test]
    async fn test_unrecognized_extensions_compile_to_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::write(root.join("logo.svg"), "<svg/>").unwrap();

        let session = BuildSession::new(BundleOptions::new(root.clone()));
        let unit = session.compile(&root.join("logo.svg")).await.unwrap();

        assert!(unit.code.is_empty());
        assert!(unit.map.is_none());
    }

    #[tokio::test]
    async fn test_stylesheet_compiles_to_string_export() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::write(root.join("app.css"), "body { color: red; }\n").unwrap();

        let session = BuildSession::new(BundleOptions::new(root.clone()));
        let unit = session.compile(&root.join("app.css")).await.unwrap();

        assert!(unit.code.starts_with("module.exports = \""));
        assert!(unit.code.contains("red"));
    }

    #[tokio::test]
    async fn test_broken_stylesheet_stubbed_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::write(root.join("bad.css"), "body { color:: } {").unwrap();

        let session = BuildSession::new(BundleOptions::new(root.clone()));
        let unit = session.compile(&root.join("bad.css")).await.unwrap();
        assert!(unit.code.starts_with("console.log("));
        assert!(unit.code.contains("bad.css"));
    }

    #[tokio::test]
    async fn test_broken_stylesheet_fails_in_strict_mode() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::write(root.join("bad.css"), "body { color:: } {").unwrap();

        let mut options = BundleOptions::new(root.clone());
        options.style_policy = StylePolicy::Strict;
        let session = BuildSession::new(options);

        let err = session.compile(&root.join("bad.css")).await.unwrap_err();
        assert!(matches!(err, crate::utils::TabaError::Stylesheet { .. }));
    }

    #[tokio::test]
    async fn test_compile_counter_counts_cache_misses_only() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::write(root.join("a.js"), "export const a = 1;\n").unwrap();

        let session = BuildSession::new(BundleOptions::new(root.clone()));
        session.compile(&root.join("a.js")).await.unwrap();
        session.compile(&root.join("a.js")).await.unwrap();
        assert_eq!(session.compiled_count(), 1);
    }
}
