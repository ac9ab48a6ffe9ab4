//! Minimal INI reading and writing for credential files.
//!
//! Files look like:
//!
//! ```text
//! [api]
//! app_id = 1234
//! app_secret = s3cret
//! ```
//!
//! Values spanning several lines are written with tab-indented continuation
//! lines and read back joined by `\n`. Full-line comments start with `#` or `;`.

use indexmap::IndexMap;
use thiserror::Error;

/// Key-value entries of one section, in file order.
pub type Entries = IndexMap<String, String>;

/// All sections of a file, in file order.
pub type Sections = IndexMap<String, Entries>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {reason}")]
pub struct IniError {
    pub line: usize,
    pub reason: String,
}

impl IniError {
    fn new(line: usize, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }
}

/// Parse INI text into its sections.
pub fn parse(contents: &str) -> Result<Sections, IniError> {
    let mut sections = Sections::new();
    let mut current: Option<String> = None;
    let mut last_key: Option<String> = None;

    for (idx, raw) in contents.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end_matches('\r');
        let trimmed = line.trim();

        // The writer indents continuation lines with exactly one tab; strip
        // only that tab so the rest of the line is kept verbatim. This runs
        // before the comment check so `#` or `;` inside a value survives.
        if let Some(rest) = line.strip_prefix('\t') {
            if last_key.is_some() {
                append_continuation(&mut sections, &current, &last_key, rest);
                continue;
            }
        }

        if trimmed.is_empty() {
            last_key = None;
            continue;
        }

        // Hand-edited files may indent with spaces
        if line.starts_with([' ', '\t']) {
            if last_key.is_none() {
                return Err(IniError::new(line_no, "continuation line without a value"));
            }
            append_continuation(&mut sections, &current, &last_key, trimmed);
            continue;
        }

        if trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix('[') {
            let name = rest
                .strip_suffix(']')
                .ok_or_else(|| IniError::new(line_no, "unterminated section header"))?
                .trim();
            if name.is_empty() {
                return Err(IniError::new(line_no, "empty section name"));
            }
            if sections.contains_key(name) {
                return Err(IniError::new(line_no, format!("duplicate section [{}]", name)));
            }
            sections.insert(name.to_string(), Entries::new());
            current = Some(name.to_string());
            last_key = None;
            continue;
        }

        let Some(section) = current.as_ref() else {
            return Err(IniError::new(line_no, "entry before any section header"));
        };
        let split = trimmed
            .find(['=', ':'])
            .ok_or_else(|| IniError::new(line_no, "expected `key = value`"))?;
        let key = trimmed[..split].trim();
        let value = trimmed[split + 1..].trim();
        if key.is_empty() {
            return Err(IniError::new(line_no, "empty key"));
        }

        let entries = sections.entry(section.clone()).or_default();
        if entries.contains_key(key) {
            return Err(IniError::new(
                line_no,
                format!("duplicate key `{}` in [{}]", key, section),
            ));
        }
        entries.insert(key.to_string(), value.to_string());
        last_key = Some(key.to_string());
    }

    Ok(sections)
}

fn append_continuation(
    sections: &mut Sections,
    section: &Option<String>,
    key: &Option<String>,
    text: &str,
) {
    if let (Some(section), Some(key)) = (section, key) {
        if let Some(value) = sections.get_mut(section).and_then(|e| e.get_mut(key)) {
            value.push('\n');
            value.push_str(text);
        }
    }
}

/// Whether `key` can be written and read back unchanged.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.trim() == key
        && !key.starts_with(['[', '#', ';'])
        && !key.contains(['=', ':', '\n', '\r'])
}

/// Whether `value` can be written and read back unchanged.
///
/// The first line shares a line with its key and is trimmed on read, and
/// line endings are normalised, so surrounding whitespace and `\r` are lost.
pub fn is_valid_value(value: &str) -> bool {
    let first_line = value.split('\n').next().unwrap_or_default();
    value.trim() == value && first_line.trim_end() == first_line && !value.contains('\r')
}

/// Render one section as INI text.
pub fn write_section(name: &str, entries: &Entries) -> String {
    let mut out = format!("[{}]\n", name);
    for (key, value) in entries {
        out.push_str(key);
        out.push_str(" = ");
        out.push_str(&value.replace('\n', "\n\t"));
        out.push('\n');
    }
    out.push('\n');
    out
}
