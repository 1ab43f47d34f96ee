//! Intent manifest parsing.
//!
//! The manifest lives at `.orchestration/active_intents.yaml` and uses a narrow
//! YAML-like subset. This is not a general YAML parser and must not grow into
//! one. The accepted grammar is:
//!
//! ```text
//! active_intents:
//!   - id: INT-001
//!     name: "Build the widget"
//!     status: IN_PROGRESS
//!     owned_scope:
//!       - src/widget/**
//!     constraints:
//!       - No new dependencies
//!     notes: |
//!       free text that spans
//!       several lines
//! ```
//!
//! - Everything before the first line starting with `active_intents:` is ignored.
//!   Without that line the manifest parses to no intents.
//! - Each `- ` at the indentation of the first entry starts a new entry block.
//! - `key: value` lines are scalars. One pair of surrounding quotes is removed.
//! - `key:` with nothing after it starts a list; following `- value` lines are
//!   its items.
//! - `key: |` starts a block scalar; following lines indented deeper than the
//!   key are joined with `\n`.
//! - `#` lines are comments outside block scalars.
//! - Keys other than the modeled ones are kept in [`IntentRecord::extra`].

use std::collections::BTreeMap;
use std::path::Path;

/// Top-level key that introduces the intent list.
pub const MANIFEST_ROOT_KEY: &str = "active_intents:";

/// How to treat entries that have no `id` field.
///
/// The selection validator drops them; write-scope enforcement keeps them.
/// Both call sites are preserved as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdlessEntries {
    /// Discard entries without an `id`.
    Drop,
    /// Keep entries without an `id` (they can never match a lookup).
    Keep,
}

/// A raw manifest value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestValue {
    Scalar(String),
    List(Vec<String>),
}

impl ManifestValue {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            ManifestValue::Scalar(s) => Some(s),
            ManifestValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            ManifestValue::List(items) => Some(items),
            ManifestValue::Scalar(_) => None,
        }
    }
}

/// One declared intent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntentRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
    /// Glob patterns this intent may mutate. Empty means nothing is owned.
    pub owned_scope: Vec<String>,
    pub constraints: Vec<String>,
    pub acceptance_criteria: Vec<String>,
    /// Unmodeled keys, kept verbatim.
    pub extra: BTreeMap<String, ManifestValue>,
}

impl IntentRecord {
    fn from_fields(fields: Vec<(String, ManifestValue)>) -> Self {
        let mut record = IntentRecord::default();
        for (key, value) in fields {
            match key.as_str() {
                "id" => record.id = scalar(value),
                "name" => record.name = scalar(value),
                "status" => record.status = scalar(value),
                // A scalar where a list is expected yields an empty list.
                "owned_scope" => record.owned_scope = list(value),
                "constraints" => record.constraints = list(value),
                "acceptance_criteria" => record.acceptance_criteria = list(value),
                _ => {
                    record.extra.insert(key, value);
                }
            }
        }
        record
    }

    /// The intent id, if present and non-empty.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }
}

fn scalar(value: ManifestValue) -> Option<String> {
    match value {
        ManifestValue::Scalar(s) => Some(s),
        ManifestValue::List(_) => None,
    }
}

fn list(value: ManifestValue) -> Vec<String> {
    match value {
        ManifestValue::List(items) => items,
        ManifestValue::Scalar(_) => Vec::new(),
    }
}

/// Find the first record whose id equals `id` exactly.
pub fn find_intent<'a>(records: &'a [IntentRecord], id: &str) -> Option<&'a IntentRecord> {
    records.iter().find(|r| r.id.as_deref() == Some(id))
}

/// Parse manifest text into intent records, in file order.
pub fn parse_manifest(text: &str, idless: IdlessEntries) -> Vec<IntentRecord> {
    let lines: Vec<&str> = text.lines().collect();
    let Some(start) = lines
        .iter()
        .position(|l| l.trim_start().starts_with(MANIFEST_ROOT_KEY))
    else {
        return Vec::new();
    };

    split_entries(&lines[start + 1..])
        .into_iter()
        .map(|block| IntentRecord::from_fields(parse_block(&block)))
        .filter(|record| idless == IdlessEntries::Keep || record.id().is_some())
        .collect()
}

/// Read and parse a manifest file.
pub async fn load_manifest(
    path: impl AsRef<Path>,
    idless: IdlessEntries,
) -> std::io::Result<Vec<IntentRecord>> {
    let text = tokio::fs::read_to_string(path).await?;
    Ok(parse_manifest(&text, idless))
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn is_item(trimmed: &str) -> bool {
    trimmed == "-" || trimmed.starts_with("- ") || trimmed.starts_with("-\t")
}

/// A single entry, as (indent, content) lines with the leading `- ` removed.
type Block = Vec<(usize, String)>;

fn split_entries(lines: &[&str]) -> Vec<Block> {
    let mut entry_indent: Option<usize> = None;
    let mut blocks: Vec<Block> = Vec::new();

    for line in lines {
        let trimmed = line.trim_start();
        let indent = indent_of(line);

        if entry_indent.is_none() && is_item(trimmed) {
            entry_indent = Some(indent);
        }
        let Some(entry) = entry_indent else {
            continue;
        };

        if indent == entry && is_item(trimmed) {
            // Content after the marker keeps its true column so nested keys line up.
            let rest = &trimmed[1..];
            let content = rest.trim_start();
            let column = indent + 1 + (rest.len() - content.len());
            blocks.push(vec![(column, content.to_string())]);
        } else if indent <= entry && !trimmed.is_empty() && !trimmed.starts_with('#') {
            // Dedent back out of the list ends the manifest section.
            break;
        } else if let Some(block) = blocks.last_mut() {
            block.push((indent, line.trim().to_string()));
        }
    }
    blocks
}

enum Pending {
    None,
    List { key: String, items: Vec<String> },
    Block { key: String, indent: usize, lines: Vec<String> },
}

fn parse_block(block: &Block) -> Vec<(String, ManifestValue)> {
    let mut fields: Vec<(String, ManifestValue)> = Vec::new();
    let mut pending = Pending::None;

    let flush = |pending: Pending, fields: &mut Vec<(String, ManifestValue)>| match pending {
        Pending::None => {}
        Pending::List { key, items } => fields.push((key, ManifestValue::List(items))),
        Pending::Block { key, lines, .. } => {
            let joined = lines.join("\n");
            fields.push((key, ManifestValue::Scalar(joined.trim_end_matches('\n').to_string())));
        }
    };

    for (indent, content) in block {
        if let Pending::Block {
            indent: key_indent,
            lines,
            ..
        } = &mut pending
        {
            if content.is_empty() {
                lines.push(String::new());
                continue;
            }
            if *indent > *key_indent {
                lines.push(content.clone());
                continue;
            }
        }

        if content.is_empty() || content.starts_with('#') {
            continue;
        }

        if is_item(content) {
            if let Pending::List { items, .. } = &mut pending {
                items.push(unquote(content[1..].trim()));
            }
            continue;
        }

        if let Some((key, value)) = split_key(content) {
            flush(std::mem::replace(&mut pending, Pending::None), &mut fields);
            pending = match value {
                "" => Pending::List {
                    key: key.to_string(),
                    items: Vec::new(),
                },
                "|" => Pending::Block {
                    key: key.to_string(),
                    indent: *indent,
                    lines: Vec::new(),
                },
                _ => {
                    fields.push((key.to_string(), ManifestValue::Scalar(unquote(value))));
                    Pending::None
                }
            };
        }
    }
    flush(pending, &mut fields);
    fields
}

/// Split `key: value` where key is `[A-Za-z0-9_]+`.
fn split_key(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some((key, value.trim()))
}

fn unquote(value: &str) -> String {
    let value = value.trim();
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}
