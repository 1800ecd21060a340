//! Source Map v3 output for printed CSS.
//!
//! The printer records one [`Mapping`] per original token it writes. Lines and
//! columns are 0-based, columns in UTF-16 code units.

use serde::Serialize;

/// Generated position -> original position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub generated_line: u32,
    pub generated_column: u32,
    pub original_line: u32,
    pub original_column: u32,
}

/// A single-source map.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceMap {
    pub file: Option<String>,
    pub source: String,
    pub source_content: Option<String>,
    mappings: Vec<Mapping>,
}

/// Wire shape of a v3 map.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RawSourceMap<'a> {
    version: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<&'a str>,
    sources: [&'a str; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    sources_content: Option<[&'a str; 1]>,
    names: [&'a str; 0],
    mappings: String,
}

impl SourceMap {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    /// Set the generated file name (builder).
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Embed the original text as `sourcesContent` (builder).
    pub fn with_source_content(mut self, content: impl Into<String>) -> Self {
        self.source_content = Some(content.into());
        self
    }

    /// Append a mapping. Mappings must arrive in generated order.
    pub fn push(&mut self, mapping: Mapping) {
        self.mappings.push(mapping);
    }

    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    /// The `mappings` field: `;`-separated lines of `,`-separated VLQ segments.
    pub fn encoded_mappings(&self) -> String {
        let mut out = String::new();
        let mut line = 0;
        let mut prev_generated_column = 0i64;
        let mut prev_original_line = 0i64;
        let mut prev_original_column = 0i64;
        let mut first_in_line = true;

        for mapping in &self.mappings {
            while line < mapping.generated_line {
                out.push(';');
                line += 1;
                prev_generated_column = 0;
                first_in_line = true;
            }
            if !first_in_line {
                out.push(',');
            }
            first_in_line = false;

            let generated_column = i64::from(mapping.generated_column);
            let original_line = i64::from(mapping.original_line);
            let original_column = i64::from(mapping.original_column);

            encode_vlq(&mut out, generated_column - prev_generated_column);
            // Single source: the source index delta is always zero.
            encode_vlq(&mut out, 0);
            encode_vlq(&mut out, original_line - prev_original_line);
            encode_vlq(&mut out, original_column - prev_original_column);

            prev_generated_column = generated_column;
            prev_original_line = original_line;
            prev_original_column = original_column;
        }

        out
    }

    /// Serialize as a Source Map v3 JSON document.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&RawSourceMap {
            version: 3,
            file: self.file.as_deref(),
            sources: [self.source.as_str()],
            sources_content: self.source_content.as_deref().map(|c| [c]),
            names: [],
            mappings: self.encoded_mappings(),
        })
    }
}

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Append `value` as a Base64 VLQ.
fn encode_vlq(out: &mut String, value: i64) {
    let mut vlq = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };
    loop {
        let mut digit = (vlq & 0b1_1111) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b10_0000;
        }
        out.push(BASE64[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}
