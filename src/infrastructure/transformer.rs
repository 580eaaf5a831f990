use crate::core::interfaces::Transformer;
use crate::core::models::{TransformOptions, TransformOutput};
use crate::core::sourcemap::SourceMap;
use crate::utils::{Logger, Result};
use once_cell::sync::Lazy;
use oxc_allocator::Allocator;
use oxc_parser::Parser;
use oxc_span::SourceType;
use regex::Regex;
use std::path::Path;

// Pre-compiled patterns for the line-oriented ESM -> CJS rewrite
static IMPORT_FROM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*import\s+(.+?)\s+from\s+['"]([^'"]+)['"]\s*;?\s*$"#).unwrap()
});
static IMPORT_BARE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*import\s+['"]([^'"]+)['"]\s*;?\s*$"#).unwrap());
static EXPORT_FROM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*export\s*\{([^}]*)\}\s*from\s+['"]([^'"]+)['"]\s*;?\s*$"#).unwrap()
});
static EXPORT_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*export\s*\{([^}]*)\}\s*;?\s*$"#).unwrap());
static EXPORT_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*export\s+(?:const|let|var|function|async\s+function|class)\s+([A-Za-z_$][\w$]*)"#)
        .unwrap()
});
static EXPORT_DEFAULT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*export\s+default\s"#).unwrap());

/// Script transform: validates the source with the oxc parser, rewrites
/// module syntax line by line into loader-executable code, and emits a
/// line-identity source map. Line numbers are preserved for every input
/// line; export bindings are re-published on appended (unmapped) trailer
/// lines.
pub struct OxcTransformer;

impl OxcTransformer {
    pub fn new() -> Self {
        Self
    }

    fn validate(&self, source: &str, options: &TransformOptions) {
        let allocator = Allocator::default();
        let source_type =
            SourceType::from_path(Path::new(&options.source_file_name)).unwrap_or_default();
        let result = Parser::new(&allocator, source, source_type).parse();
        if !result.errors.is_empty() {
            Logger::warn(&format!(
                "Parser warnings in {}: {} issues",
                options.source_file_name,
                result.errors.len()
            ));
        }
    }

    fn rewrite_line(&self, line: &str, options: &TransformOptions, trailer: &mut Vec<String>) -> String {
        let trimmed = line.trim_start();

        if !options.emit_comments && trimmed.starts_with("//") {
            return String::new();
        }

        if let Some(captures) = IMPORT_FROM.captures(line) {
            let clause = captures[1].trim().to_string();
            let request = js_string(&captures[2]);
            return rewrite_import_clause(&clause, &request);
        }
        if let Some(captures) = IMPORT_BARE.captures(line) {
            return format!("require({});", js_string(&captures[1]));
        }
        if let Some(captures) = EXPORT_FROM.captures(line) {
            let request = js_string(&captures[2]);
            let bindings = parse_bindings(&captures[1]);
            let locals: Vec<&str> = bindings.iter().map(|(local, _)| *local).collect();
            let mut out = format!("var {{ {} }} = require({});", locals.join(", "), request);
            for (local, exported) in &bindings {
                out.push_str(&format!(" module.exports.{} = {};", exported, local));
            }
            return out;
        }
        if let Some(captures) = EXPORT_LIST.captures(line) {
            let bindings = parse_bindings(&captures[1]);
            return bindings
                .iter()
                .map(|(local, exported)| format!("module.exports.{} = {};", exported, local))
                .collect::<Vec<_>>()
                .join(" ");
        }
        if EXPORT_DEFAULT.is_match(line) {
            return line.replacen("export default", "module.exports =", 1);
        }
        if let Some(captures) = EXPORT_DECL.captures(line) {
            trailer.push(format!("module.exports.{} = {};", &captures[1], &captures[1]));
            return line.replacen("export ", "", 1);
        }

        line.to_string()
    }
}

#[async_trait::async_trait]
impl Transformer for OxcTransformer {
    async fn compile(&self, source: &str, options: &TransformOptions) -> Result<TransformOutput> {
        self.validate(source, options);

        let mut trailer = Vec::new();
        let lines: Vec<String> = source
            .lines()
            .map(|line| self.rewrite_line(line, options, &mut trailer))
            .collect();
        let mapped_lines = lines.len();

        let mut code = lines.join("\n");
        if !trailer.is_empty() {
            code.push('\n');
            code.push_str(&trailer.join("\n"));
        }

        let map = options.source_maps.then(|| SourceMap {
            version: 3,
            file: None,
            source_root: source_root_string(&options.source_root),
            sources: vec![options.source_file_name.clone()],
            sources_content: Some(vec![Some(source.to_string())]),
            names: Vec::new(),
            mappings: identity_mappings(mapped_lines),
        });

        Ok(TransformOutput { code, map })
    }
}

impl Default for OxcTransformer {
    fn default() -> Self {
        Self::new()
    }
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
}

fn source_root_string(root: &Path) -> Option<String> {
    let root = root.to_string_lossy();
    if root.is_empty() {
        None
    } else {
        Some(root.into_owned())
    }
}

fn rewrite_import_clause(clause: &str, request: &str) -> String {
    if clause.starts_with('{') {
        return format!("var {} = require({});", clause, request);
    }
    if let Some(namespace) = clause.strip_prefix("* as ") {
        return format!("var {} = require({});", namespace.trim(), request);
    }
    if let Some((default_binding, rest)) = clause.split_once(',') {
        let rest = rest.trim();
        let mut out = format!("var {} = require({});", default_binding.trim(), request);
        if !rest.is_empty() {
            out.push(' ');
            out.push_str(&rewrite_import_clause(rest, request));
        }
        return out;
    }
    format!("var {} = require({});", clause, request)
}

/// Parse `a, b as c` into (local, exported) pairs.
fn parse_bindings(list: &str) -> Vec<(&str, &str)> {
    list.split(',')
        .map(str::trim)
        .filter(|binding| !binding.is_empty())
        .map(|binding| match binding.split_once(" as ") {
            Some((local, exported)) => (local.trim(), exported.trim()),
            None => (binding, binding),
        })
        .collect()
}

/// One segment per line, every line mapping to the same line of source 0.
fn identity_mappings(lines: usize) -> String {
    let mut mappings = String::with_capacity(lines * 5);
    for line in 0..lines {
        if line == 0 {
            mappings.push_str("AAAA");
        } else {
            mappings.push_str(";AACA");
        }
    }
    mappings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> TransformOptions {
        TransformOptions {
            source_root: std::path::PathBuf::from("/project"),
            source_maps: true,
            source_file_name: "main.js".to_string(),
            emit_comments: false,
        }
    }

    #[tokio::test]
    async fn test_named_import_becomes_require() {
        let transformer = OxcTransformer::new();
        let output = transformer
            .compile("import { a, b } from './util.js';\na();\n", &options())
            .await
            .unwrap();
        assert!(output
            .code
            .contains("var { a, b } = require(\"./util.js\");"));
        assert!(output.code.contains("a();"));
    }

    #[tokio::test]
    async fn test_default_and_namespace_imports() {
        let transformer = OxcTransformer::new();
        let output = transformer
            .compile(
                "import util from './util.js';\nimport * as ns from './ns.js';\nimport x, { y } from './xy.js';\nimport './side-effect.js';\n",
                &options(),
            )
            .await
            .unwrap();
        assert!(output.code.contains("var util = require(\"./util.js\");"));
        assert!(output.code.contains("var ns = require(\"./ns.js\");"));
        assert!(output
            .code
            .contains("var x = require(\"./xy.js\"); var { y } = require(\"./xy.js\");"));
        assert!(output.code.contains("require(\"./side-effect.js\");"));
    }

    #[tokio::test]
    async fn test_exports_are_republished_on_trailer_lines() {
        let transformer = OxcTransformer::new();
        let source = "export const answer = 42;\nexport function greet() {\nreturn 'hi';\n}\n";
        let output = transformer.compile(source, &options()).await.unwrap();

        assert!(output.code.contains("const answer = 42;"));
        assert!(output.code.contains("function greet() {"));
        assert!(output.code.ends_with(
            "module.exports.answer = answer;\nmodule.exports.greet = greet;"
        ));
        // The map covers exactly the original lines; trailers stay unmapped.
        let map = output.map.unwrap();
        assert_eq!(map.mappings.split(';').count(), 4);
    }

    #[tokio::test]
    async fn test_export_list_and_reexport() {
        let transformer = OxcTransformer::new();
        let output = transformer
            .compile(
                "const a = 1;\nexport { a };\nexport { b as c } from './b.js';\n",
                &options(),
            )
            .await
            .unwrap();
        assert!(output.code.contains("module.exports.a = a;"));
        assert!(output
            .code
            .contains("var { b } = require(\"./b.js\"); module.exports.c = b;"));
    }

    #[tokio::test]
    async fn test_export_default() {
        let transformer = OxcTransformer::new();
        let output = transformer
            .compile("export default function main() {\n}\n", &options())
            .await
            .unwrap();
        assert!(output.code.contains("module.exports = function main() {"));
    }

    #[tokio::test]
    async fn test_comments_dropped_but_lines_preserved() {
        let transformer = OxcTransformer::new();
        let source = "// a comment\nconst x = 1;\n";
        let output = transformer.compile(source, &options()).await.unwrap();
        assert_eq!(output.code, "\nconst x = 1;");
    }

    #[tokio::test]
    async fn test_map_is_line_identity() {
        let transformer = OxcTransformer::new();
        let output = transformer
            .compile("const a = 1;\nconst b = 2;\nconst c = 3;\n", &options())
            .await
            .unwrap();
        let map = output.map.unwrap();
        assert_eq!(map.mappings, "AAAA;AACA;AACA");
        assert_eq!(map.sources, vec!["main.js".to_string()]);
        assert_eq!(map.source_root.as_deref(), Some("/project"));
        assert!(map.sources_content.is_some());
    }

    #[tokio::test]
    async fn test_file_addressed_invocation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.js");
        std::fs::write(&path, "export const v = 1;\n").unwrap();

        let transformer = OxcTransformer::new();
        let output = transformer.compile_file(&path, &options()).await.unwrap();
        assert!(output.code.contains("const v = 1;"));
        assert!(output.code.contains("module.exports.v = v;"));
    }

    #[tokio::test]
    async fn test_map_omitted_when_not_requested() {
        let transformer = OxcTransformer::new();
        let mut opts = options();
        opts.source_maps = false;
        let output = transformer.compile("const a = 1;\n", &opts).await.unwrap();
        assert!(output.map.is_none());
    }
}
