use crate::core::interfaces::StylesheetCompiler;
use crate::core::models::StylesheetOutput;
use crate::utils::{Result, TabaError};
use lightningcss::{
    printer::PrinterOptions,
    stylesheet::{ParserOptions as CssParserOptions, StyleSheet},
};
use once_cell::sync::Lazy;
use regex::Regex;

static CSS_IMPORT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"@import\s+(?:url\s*\()?\s*['"]([^'"]+)['"]"#).unwrap());

pub struct LightningStylesheetCompiler;

impl LightningStylesheetCompiler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl StylesheetCompiler for LightningStylesheetCompiler {
    async fn render(&self, source: &str) -> Result<StylesheetOutput> {
        let css = {
            let stylesheet = StyleSheet::parse(source, CssParserOptions::default())
                .map_err(|e| TabaError::Build(format!("CSS parse error: {}", e)))?;
            stylesheet
                .to_css(PrinterOptions::default())
                .map_err(|e| TabaError::Build(format!("CSS print error: {}", e)))?
                .code
        };

        let imports = CSS_IMPORT_REGEX
            .captures_iter(source)
            .map(|captures| captures[1].to_string())
            .collect();

        Ok(StylesheetOutput {
            css,
            map: None,
            imports,
        })
    }
}

impl Default for LightningStylesheetCompiler {
    fn default() -> Self {
        Self::new()
    }
}
