use crate::core::interfaces::ImportScanner;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static IMPORT_FROM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*(?:import|export)\s+.*?\s+from\s+['"]([^'"]+)['"]"#).unwrap());
static IMPORT_BARE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*import\s+['"]([^'"]+)['"]"#).unwrap());
static REQUIRE_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"require\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap());

/// Extracts raw import specifiers from script text, in source order, each
/// specifier once. Handles static `import`/re-`export` statements and
/// CommonJS `require` calls; dynamic expressions are out of reach for a
/// static scan.
pub struct RegexImportScanner;

impl RegexImportScanner {
    pub fn new() -> Self {
        Self
    }
}

impl ImportScanner for RegexImportScanner {
    fn scan(&self, source: &str) -> Vec<String> {
        let mut specifiers = Vec::new();
        let mut seen = HashSet::new();
        let mut push = |specifier: &str| {
            if seen.insert(specifier.to_string()) {
                specifiers.push(specifier.to_string());
            }
        };

        for line in source.lines() {
            if let Some(captures) = IMPORT_FROM.captures(line) {
                push(&captures[1]);
            } else if let Some(captures) = IMPORT_BARE.captures(line) {
                push(&captures[1]);
            }
            for captures in REQUIRE_CALL.captures_iter(line) {
                push(&captures[1]);
            }
        }
        specifiers
    }
}

impl Default for RegexImportScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specifiers_in_source_order() {
        let scanner = RegexImportScanner::new();
        let source = "import { a } from './a.js';\nimport './styles.css';\nconst b = require('./b.js');\nexport { c } from './c.js';\n";
        assert_eq!(
            scanner.scan(source),
            vec!["./a.js", "./styles.css", "./b.js", "./c.js"]
        );
    }

    #[test]
    fn test_duplicates_collapse_to_first_occurrence() {
        let scanner = RegexImportScanner::new();
        let source = "import { a } from './a.js';\nimport { b } from './a.js';\n";
        assert_eq!(scanner.scan(source), vec!["./a.js"]);
    }

    #[test]
    fn test_plain_code_yields_nothing() {
        let scanner = RegexImportScanner::new();
        assert!(scanner.scan("const x = 1;\nconsole.log(x);\n").is_empty());
    }
}
