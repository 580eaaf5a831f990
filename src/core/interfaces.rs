use crate::core::models::*;
use crate::utils::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// File system operations interface
#[async_trait]
pub trait FileSystemService: Send + Sync {
    async fn read_file(&self, path: &Path) -> Result<String>;
    async fn write_file(&self, path: &Path, content: &str) -> Result<()>;
    async fn create_directory(&self, path: &Path) -> Result<()>;
}

/// Script transformer: source text in, executable code plus optional
/// per-file source map out.
#[async_trait]
pub trait Transformer: Send + Sync {
    async fn compile(&self, source: &str, options: &TransformOptions) -> Result<TransformOutput>;

    /// File-addressed variant: reads the file, then compiles its text.
    async fn compile_file(&self, path: &Path, options: &TransformOptions) -> Result<TransformOutput> {
        let source = tokio::fs::read_to_string(path).await?;
        self.compile(&source, options).await
    }
}

/// Extracts a file's raw import specifiers, in source order.
pub trait ImportScanner: Send + Sync {
    fn scan(&self, source: &str) -> Vec<String>;
}

/// Resolves an import specifier to an absolute, normalized file path.
#[async_trait]
pub trait PathResolver: Send + Sync {
    async fn resolve(&self, specifier: &str, base_dir: &Path) -> Result<PathBuf>;
}

/// Stylesheet compiler interface
#[async_trait]
pub trait StylesheetCompiler: Send + Sync {
    async fn render(&self, source: &str) -> Result<StylesheetOutput>;
}
