use crate::core::cache::KeyedCache;
use crate::core::interfaces::*;
use crate::core::models::*;
use crate::core::{assembler, compiler, deps, graph};
use crate::infrastructure::{
    LightningStylesheetCompiler, NodePathResolver, OxcTransformer, RegexImportScanner,
    TokioFileSystemService,
};
use crate::utils::{Logger, Result, TabaError, Timer};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// One build session: owns the collaborators, the memoization caches and the
/// compiled-file counter. Watch mode keeps a session alive across rebuilds
/// and selectively evicts cache entries; a plain build uses one session per
/// process invocation.
pub struct BuildSession {
    pub options: BundleOptions,
    fs: Arc<dyn FileSystemService>,
    transformer: Arc<dyn Transformer>,
    scanner: Arc<dyn ImportScanner>,
    resolver: Arc<dyn PathResolver>,
    stylesheets: Arc<dyn StylesheetCompiler>,
    contents: KeyedCache<PathBuf, String>,
    dependencies: KeyedCache<PathBuf, Vec<DependencyEdge>>,
    compiled: KeyedCache<PathBuf, CompiledModule>,
    compiled_count: AtomicUsize,
}

impl BuildSession {
    pub fn new(options: BundleOptions) -> Self {
        let resolver = NodePathResolver::new(options.source_root.clone());
        Self::with_collaborators(
            options,
            Arc::new(TokioFileSystemService),
            Arc::new(OxcTransformer::new()),
            Arc::new(RegexImportScanner::new()),
            Arc::new(resolver),
            Arc::new(LightningStylesheetCompiler::new()),
        )
    }

    pub fn with_collaborators(
        options: BundleOptions,
        fs: Arc<dyn FileSystemService>,
        transformer: Arc<dyn Transformer>,
        scanner: Arc<dyn ImportScanner>,
        resolver: Arc<dyn PathResolver>,
        stylesheets: Arc<dyn StylesheetCompiler>,
    ) -> Self {
        Self {
            options,
            fs,
            transformer,
            scanner,
            resolver,
            stylesheets,
            contents: KeyedCache::new(),
            dependencies: KeyedCache::new(),
            compiled: KeyedCache::new(),
            compiled_count: AtomicUsize::new(0),
        }
    }

    pub fn file_system(&self) -> &dyn FileSystemService {
        self.fs.as_ref()
    }

    pub(crate) fn transformer(&self) -> &dyn Transformer {
        self.transformer.as_ref()
    }

    pub(crate) fn scanner(&self) -> &dyn ImportScanner {
        self.scanner.as_ref()
    }

    pub(crate) fn resolver(&self) -> &dyn PathResolver {
        self.resolver.as_ref()
    }

    pub(crate) fn stylesheets(&self) -> &dyn StylesheetCompiler {
        self.stylesheets.as_ref()
    }

    /// File content, memoized by absolute path.
    pub async fn content(&self, file: &Path) -> Result<String> {
        let fs = self.fs.clone();
        let path = file.to_path_buf();
        self.contents
            .get_or_compute(path.clone(), || async move { fs.read_file(&path).await })
            .await
    }

    /// The ordered dependency edges of one file, memoized by absolute path.
    pub async fn dependencies(&self, file: &Path) -> Result<Vec<DependencyEdge>> {
        self.dependencies
            .get_or_compute(file.to_path_buf(), || deps::resolve_dependencies(self, file))
            .await
    }

    /// The compiled output of one file, memoized by absolute path.
    pub async fn compile(&self, file: &Path) -> Result<CompiledModule> {
        self.compiled
            .get_or_compute(file.to_path_buf(), || compiler::compile_file(self, file))
            .await
    }

    pub(crate) fn count_compilation(&self) {
        self.compiled_count.fetch_add(1, Ordering::Relaxed);
    }

    /// How many files were actually compiled (cache misses) so far.
    pub fn compiled_count(&self) -> usize {
        self.compiled_count.load(Ordering::Relaxed)
    }

    /// Evict everything known about `file`; the next build recomputes it.
    pub fn forget(&self, file: &Path) {
        let key = file.to_path_buf();
        self.contents.forget(&key);
        self.dependencies.forget(&key);
        self.compiled.forget(&key);
    }

    /// Evict only the dependency edges of `file`, so its edge list is
    /// recomputed while its compiled output stays cached.
    pub fn forget_dependencies(&self, file: &Path) {
        self.dependencies.forget(&file.to_path_buf());
    }

    /// Resolve an entry argument to the canonical absolute path used as the
    /// graph key.
    pub async fn resolve_entry(&self, entry: &Path) -> Result<PathBuf> {
        let joined = if entry.is_absolute() {
            entry.to_path_buf()
        } else {
            self.options.source_root.join(entry)
        };
        Ok(tokio::fs::canonicalize(&joined).await?)
    }

    /// Full transitive file set reachable from `entry`, in deterministic
    /// discovery order.
    pub async fn collect_modules(&self, entry: &Path) -> Result<Vec<PathBuf>> {
        graph::collect_modules(self, entry).await
    }

    /// Compile the file set and assemble the executable bundle text.
    pub async fn emit_bundle(&self, files: &[PathBuf], entry: &Path) -> Result<String> {
        assembler::assemble(self, files, entry).await
    }

    /// The whole pipeline for one entry: graph, compile, assemble, write.
    /// Returns the output path.
    pub async fn build_entry(&self, entry: &Path) -> Result<PathBuf> {
        Logger::build_start(entry);
        let _timer = Timer::start("build");

        let entry_abs = self.resolve_entry(entry).await?;
        let files = self.collect_modules(&entry_abs).await?;
        Logger::graph_resolved(files.len());

        let bundle = self.emit_bundle(&files, &entry_abs).await?;

        let file_name = entry
            .file_name()
            .ok_or_else(|| TabaError::build(format!("entry has no file name: {}", entry.display())))?;
        let out_path = self.options.out_dir.join(file_name);
        self.fs.write_file(&out_path, &bundle).await?;
        Logger::bundle_written(&out_path, bundle.len());
        Ok(out_path)
    }
}
