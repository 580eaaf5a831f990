use crate::core::sourcemap::SourceMap;
use std::path::PathBuf;

/// How the composite source map is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMode {
    /// Index map with offset-tagged sections. Cheap, but only consumable by
    /// tools that support sectioned maps.
    Fast,
    /// One flattened standard map with rebased delta-encoded mappings.
    Compat,
}

/// What happens when a stylesheet fails to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StylePolicy {
    /// Fail the build.
    Strict,
    /// Log a warning and emit a placeholder diagnostic module.
    Stub,
}

/// Options for one build session.
#[derive(Debug, Clone)]
pub struct BundleOptions {
    /// Absolute root folder from which files can be required.
    pub source_root: PathBuf,
    /// Folder used as the basedir for the runtime `__dirname`.
    pub bundle_root: PathBuf,
    /// Output directory; each entry lands at `<out_dir>/<basename(entry)>`.
    pub out_dir: PathBuf,
    pub map_mode: MapMode,
    pub style_policy: StylePolicy,
}

impl BundleOptions {
    pub fn new(source_root: PathBuf) -> Self {
        Self {
            bundle_root: source_root.clone(),
            source_root,
            out_dir: PathBuf::from("out"),
            map_mode: MapMode::Fast,
            style_policy: StylePolicy::Stub,
        }
    }
}

/// Closed set of file kinds the compiler dispatches on, resolved once per
/// file from the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    Script,
    Data,
    Stylesheet,
    Other,
}

impl ModuleKind {
    pub fn from_path(path: &std::path::Path) -> Self {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "js" | "jsx" | "mjs" | "cjs" => ModuleKind::Script,
            "json" => ModuleKind::Data,
            "css" => ModuleKind::Stylesheet,
            _ => ModuleKind::Other,
        }
    }

    /// Only scripts can declare dependencies.
    pub fn supports_imports(&self) -> bool {
        matches!(self, ModuleKind::Script)
    }
}

/// One dependency declared by a file: the raw specifier as written, and the
/// absolute path it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    pub specifier: String,
    pub path: PathBuf,
}

/// Output of one compiler invocation. Code and map always correspond to the
/// same invocation.
#[derive(Debug, Clone)]
pub struct CompiledModule {
    pub file: PathBuf,
    pub code: String,
    pub map: Option<SourceMap>,
}

/// Options handed to the script transformer.
#[derive(Debug, Clone)]
pub struct TransformOptions {
    pub source_root: PathBuf,
    pub source_maps: bool,
    pub source_file_name: String,
    pub emit_comments: bool,
}

/// What the script transformer returns.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub code: String,
    pub map: Option<SourceMap>,
}

/// What the stylesheet compiler returns.
#[derive(Debug, Clone)]
pub struct StylesheetOutput {
    pub css: String,
    pub map: Option<SourceMap>,
    pub imports: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_module_kind_from_extension() {
        assert_eq!(ModuleKind::from_path(Path::new("a.js")), ModuleKind::Script);
        assert_eq!(ModuleKind::from_path(Path::new("a.mjs")), ModuleKind::Script);
        assert_eq!(ModuleKind::from_path(Path::new("a.json")), ModuleKind::Data);
        assert_eq!(
            ModuleKind::from_path(Path::new("a.css")),
            ModuleKind::Stylesheet
        );
        assert_eq!(ModuleKind::from_path(Path::new("a.png")), ModuleKind::Other);
        assert_eq!(ModuleKind::from_path(Path::new("Makefile")), ModuleKind::Other);
    }

    #[test]
    fn test_only_scripts_support_imports() {
        assert!(ModuleKind::Script.supports_imports());
        assert!(!ModuleKind::Data.supports_imports());
        assert!(!ModuleKind::Stylesheet.supports_imports());
        assert!(!ModuleKind::Other.supports_imports());
    }
}
