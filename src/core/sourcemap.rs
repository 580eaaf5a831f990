use crate::core::models::MapMode;
use crate::utils::{Logger, Result, TabaError};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

/// Source map format (v3)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub names: Vec<String>,
    pub mappings: String,
}

impl Default for SourceMap {
    fn default() -> Self {
        Self {
            version: 3,
            file: None,
            source_root: None,
            sources: Vec::new(),
            sources_content: None,
            names: Vec::new(),
            mappings: String::new(),
        }
    }
}

/// Index map: independent embedded maps, each anchored at an offset.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexMap {
    pub version: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub offset: Offset,
    pub map: SourceMap,
}

#[derive(Debug, Clone, Serialize)]
pub struct Offset {
    pub line: usize,
    pub column: usize,
}

/// The composite map produced for one bundle.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CompositeMap {
    Indexed(IndexMap),
    Flat(SourceMap),
}

impl CompositeMap {
    /// Inline source-map reference comment (base64 data URL).
    pub fn to_comment(&self) -> Result<String> {
        let json = serde_json::to_string(self)?;
        let encoded = general_purpose::STANDARD.encode(json.as_bytes());
        Ok(format!(
            "//# sourceMappingURL=data:application/json;charset=utf-8;base64,{}",
            encoded
        ))
    }
}

// --- base64 VLQ -------------------------------------------------------------

const BASE64_CHARS: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

const VLQ_BASE_SHIFT: u32 = 5;
const VLQ_BASE_MASK: u64 = 0x1f;
const VLQ_CONTINUATION_BIT: u64 = 0x20;

fn base64_value(c: u8) -> Option<u64> {
    match c {
        b'A'..=b'Z' => Some((c - b'A') as u64),
        b'a'..=b'z' => Some((c - b'a' + 26) as u64),
        b'0'..=b'9' => Some((c - b'0' + 52) as u64),
        b'+' => Some(62),
        b'/' => Some(63),
        _ => None,
    }
}

pub(crate) fn encode_vlq(value: i64, out: &mut String) {
    // Sign lives in the least significant bit.
    let mut vlq: u64 = if value < 0 {
        (((-value) as u64) << 1) | 1
    } else {
        (value as u64) << 1
    };
    loop {
        let mut digit = vlq & VLQ_BASE_MASK;
        vlq >>= VLQ_BASE_SHIFT;
        if vlq > 0 {
            digit |= VLQ_CONTINUATION_BIT;
        }
        out.push(BASE64_CHARS[digit as usize] as char);
        if vlq == 0 {
            break;
        }
    }
}

/// Decode one comma-free mapping segment into its signed fields.
pub(crate) fn decode_segment(segment: &str) -> Result<Vec<i64>> {
    let mut fields = Vec::with_capacity(5);
    let mut value: u64 = 0;
    let mut shift: u32 = 0;
    let mut in_field = false;
    for byte in segment.bytes() {
        let digit = base64_value(byte).ok_or_else(|| {
            TabaError::SourceMap(format!("invalid VLQ character '{}'", byte as char))
        })?;
        value |= (digit & VLQ_BASE_MASK) << shift;
        in_field = true;
        if digit & VLQ_CONTINUATION_BIT != 0 {
            shift += VLQ_BASE_SHIFT;
        } else {
            let negative = value & 1 == 1;
            let magnitude = (value >> 1) as i64;
            fields.push(if negative { -magnitude } else { magnitude });
            value = 0;
            shift = 0;
            in_field = false;
        }
    }
    if in_field {
        return Err(TabaError::SourceMap(
            "truncated VLQ segment".to_string(),
        ));
    }
    if !matches!(fields.len(), 1 | 4 | 5) {
        return Err(TabaError::SourceMap(format!(
            "mapping segment has {} fields, expected 1, 4 or 5",
            fields.len()
        )));
    }
    Ok(fields)
}

pub(crate) fn encode_segment(fields: &[i64], out: &mut String) {
    for field in fields {
        encode_vlq(*field, out);
    }
}

pub(crate) fn count_newlines(text: &str) -> usize {
    text.matches('\n').count()
}

// --- concatenation strategies ----------------------------------------------

/// Accumulates per-file emitted code and optional maps into one composite
/// map. Both strategies keep the mapping data line-aligned with the bundle
/// body: the number of `;` separators emitted always equals the number of
/// newline characters the bundle has consumed.
pub enum SourceMapConcatenator {
    Fast(FastConcatenator),
    Compat(CompatConcatenator),
}

impl SourceMapConcatenator {
    pub fn new(mode: MapMode, file: String) -> Self {
        match mode {
            MapMode::Fast => Self::Fast(FastConcatenator::new(file)),
            MapMode::Compat => Self::Compat(CompatConcatenator::new(file)),
        }
    }

    pub fn skip_lines(&mut self, lines: usize) {
        match self {
            Self::Fast(c) => c.skip_lines(lines),
            Self::Compat(c) => c.skip_lines(lines),
        }
    }

    pub fn add_source(&mut self, text: &str, map: Option<SourceMap>) -> Result<()> {
        match self {
            Self::Fast(c) => {
                c.add_source(text, map);
                Ok(())
            }
            Self::Compat(c) => c.add_source(text, map),
        }
    }

    pub fn into_map(self) -> CompositeMap {
        match self {
            Self::Fast(c) => CompositeMap::Indexed(c.into_map()),
            Self::Compat(c) => CompositeMap::Flat(c.into_map()),
        }
    }
}

/// Section-based concatenation: embedded maps are recorded verbatim at the
/// current cursor, O(1) per source beyond line counting.
pub struct FastConcatenator {
    file: String,
    sections: Vec<Section>,
    line: usize,
    column: usize,
}

impl FastConcatenator {
    fn new(file: String) -> Self {
        Self {
            file,
            sections: Vec::new(),
            line: 0,
            column: 0,
        }
    }

    pub fn skip_lines(&mut self, lines: usize) {
        self.line += lines;
        if lines > 0 {
            self.column = 0;
        }
    }

    pub fn add_source(&mut self, text: &str, map: Option<SourceMap>) {
        if let Some(map) = map {
            self.sections.push(Section {
                offset: Offset {
                    line: self.line,
                    column: self.column,
                },
                map,
            });
        }
        self.skip_lines(count_newlines(text));
    }

    pub fn into_map(self) -> IndexMap {
        IndexMap {
            version: 3,
            file: Some(self.file),
            sections: self.sections,
        }
    }
}

/// Fully-merged concatenation: one flat map whose mapping deltas are rebased
/// into the concatenated `sources`/`names` coordinate space.
pub struct CompatConcatenator {
    file: String,
    sources: Vec<String>,
    sources_content: Vec<Option<String>>,
    names: Vec<String>,
    mappings: String,
    /// Whether the current (unterminated) output line already carries
    /// segments, so a further segment on it needs a comma.
    open_line_mapped: bool,
    // The registers a consuming decoder would hold after reading everything
    // emitted so far.
    source_cursor: i64,
    line_cursor: i64,
    column_cursor: i64,
    name_cursor: i64,
}

impl CompatConcatenator {
    fn new(file: String) -> Self {
        Self {
            file,
            sources: Vec::new(),
            sources_content: Vec::new(),
            names: Vec::new(),
            mappings: String::new(),
            open_line_mapped: false,
            source_cursor: 0,
            line_cursor: 0,
            column_cursor: 0,
            name_cursor: 0,
        }
    }

    pub fn skip_lines(&mut self, lines: usize) {
        for _ in 0..lines {
            self.mappings.push(';');
        }
        if lines > 0 {
            self.open_line_mapped = false;
        }
    }

    pub fn add_source(&mut self, text: &str, map: Option<SourceMap>) -> Result<()> {
        let newline_count = count_newlines(text);
        let map = match map {
            Some(map) => map,
            None => {
                // An unmapped source contributes no coordinates, only lines.
                self.skip_lines(newline_count);
                return Ok(());
            }
        };

        // A trailing newline means the final "line" of the text is empty and
        // cannot carry mapped content.
        let line_capacity = if text.ends_with('\n') {
            newline_count
        } else {
            newline_count + 1
        };

        let mut groups: Vec<&str> = if map.mappings.is_empty() {
            Vec::new()
        } else {
            map.mappings.split(';').collect()
        };
        if groups.len() > line_capacity {
            Logger::warn(&format!(
                "source map for {} claims {} mapped lines but the text has {}; truncating",
                map.sources.first().map(String::as_str).unwrap_or("<unknown>"),
                groups.len(),
                line_capacity
            ));
            groups.truncate(line_capacity);
        }

        let source_base = self.sources.len() as i64;
        let name_base = self.names.len() as i64;
        let mut rebase_pending = true;

        for (index, group) in groups.iter().enumerate() {
            if index > 0 {
                self.mappings.push(';');
                self.open_line_mapped = false;
            }
            if group.is_empty() {
                continue;
            }
            let mut encoded_group = String::new();
            for (seg_index, segment) in group.split(',').enumerate() {
                let mut fields = decode_segment(segment)?;
                if fields.len() >= 4 {
                    if rebase_pending {
                        // The embedded map's first positioned segment is
                        // relative to zeroed registers; shift it so the
                        // composite decoder lands on the same absolute
                        // coordinates, offset into the concatenated arrays.
                        rebase_pending = false;
                        fields[1] += source_base - self.source_cursor;
                        fields[2] -= self.line_cursor;
                        fields[3] -= self.column_cursor;
                        if fields.len() == 5 {
                            fields[4] += name_base - self.name_cursor;
                        }
                    }
                    // Later segments are relative to their predecessors and
                    // pass through verbatim; the cursors always mirror the
                    // consuming decoder's registers.
                    self.source_cursor += fields[1];
                    self.line_cursor += fields[2];
                    self.column_cursor += fields[3];
                    if fields.len() == 5 {
                        self.name_cursor += fields[4];
                    }
                }
                if seg_index > 0 {
                    encoded_group.push(',');
                }
                encode_segment(&fields, &mut encoded_group);
            }
            if !encoded_group.is_empty() {
                if self.open_line_mapped {
                    self.mappings.push(',');
                }
                self.mappings.push_str(&encoded_group);
                self.open_line_mapped = true;
            }
        }

        // Any shortfall between mapped lines and actual lines is trailing
        // unmapped text.
        let emitted_separators = groups.len().saturating_sub(1);
        self.skip_lines(newline_count - emitted_separators);

        let root = map
            .source_root
            .as_deref()
            .filter(|r| !r.is_empty())
            .map(|r| r.trim_end_matches('/').to_string());
        for (index, source) in map.sources.iter().enumerate() {
            self.sources.push(match &root {
                Some(root) => format!("{}/{}", root, source),
                None => source.clone(),
            });
            self.sources_content.push(
                map.sources_content
                    .as_ref()
                    .and_then(|contents| contents.get(index))
                    .cloned()
                    .flatten(),
            );
        }
        self.names.extend(map.names.iter().cloned());

        debug_assert_eq!(self.sources.len(), self.sources_content.len());
        Ok(())
    }

    pub fn into_map(self) -> SourceMap {
        SourceMap {
            version: 3,
            file: Some(self.file),
            source_root: None,
            sources: self.sources,
            sources_content: Some(self.sources_content),
            names: self.names,
            mappings: self.mappings,
        }
    }
}
