//! Parsed `.desktop` entries and the parser that produces them.
//!
//! Only the `[Desktop Entry]` group is read. Localized keys (`Name[de]`) and
//! any other groups (`[Desktop Action ...]`) are skipped, and the last
//! occurrence of a key wins.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Group header holding the keys we care about.
pub const DESKTOP_ENTRY_GROUP: &str = "Desktop Entry";

/// Key naming the context (qube) an entry belongs to.
pub const CONTEXT_NAME_KEY: &str = "X-Qubes-VmName";

/// Key whose presence marks an entry as able to run in a disposable context.
pub const NON_DISPOSABLE_EXEC_KEY: &str = "X-Qubes-NonDispvmExec";

/// Key overriding the logical name of an entry.
pub const APP_NAME_KEY: &str = "X-Qubes-AppName";

/// Errors produced while reading an entry file.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// No `[Desktop Entry]` header anywhere in the file.
    #[error("Missing [Desktop Entry] group")]
    MissingGroup,

    /// A line that is neither a header, a comment nor `key=value`.
    #[error("Malformed line {line}: {content:?}")]
    MalformedLine {
        /// 1-based line number.
        line: usize,
        /// The offending line as written.
        content: String,
    },
}

/// Structured fields of a single entry file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedEntry {
    /// `Name`
    pub name: Option<String>,
    /// `Icon`
    pub icon: Option<String>,
    /// `Exec`
    pub exec: Option<String>,
    /// `Hidden`
    pub hidden: bool,
    /// `OnlyShowIn`
    pub only_show_in: Vec<String>,
    /// `NotShowIn`
    pub not_show_in: Vec<String>,
    /// `Categories`
    pub categories: Vec<String>,
    /// Name of the owning context, if the entry is bound to one.
    pub context_name: Option<String>,
    /// Command used when not launching in a disposable context.
    pub non_disposable_exec: Option<String>,
    /// Explicit logical name.
    pub app_name: Option<String>,
}

impl ParsedEntry {
    /// Parse entry text.
    pub fn parse_str(text: &str) -> Result<Self, ParseError> {
        let keys = read_entry_group(text)?;

        let string = |key: &str| keys.get(key).map(|raw| unescape(raw));
        let list = |key: &str| keys.get(key).map(|raw| split_list(raw)).unwrap_or_default();

        let hidden = keys.get("Hidden").is_some_and(|raw| parse_bool("Hidden", raw));

        Ok(Self {
            name: string("Name"),
            icon: string("Icon").filter(|icon| !icon.is_empty()),
            exec: string("Exec"),
            hidden,
            only_show_in: list("OnlyShowIn"),
            not_show_in: list("NotShowIn"),
            categories: list("Categories"),
            context_name: string(CONTEXT_NAME_KEY).filter(|name| !name.is_empty()),
            non_disposable_exec: string(NON_DISPOSABLE_EXEC_KEY),
            app_name: string(APP_NAME_KEY).filter(|name| !name.is_empty()),
        })
    }

    /// Whether the entry may be launched in a freshly started disposable context.
    pub fn is_disposable(&self) -> bool {
        self.non_disposable_exec
            .as_deref()
            .is_some_and(|exec| !exec.is_empty())
    }
}

/// Capability turning a path into a [`ParsedEntry`].
pub trait EntryParser {
    /// Read and parse the entry at `path`.
    fn parse(&self, path: &Path) -> Result<ParsedEntry, ParseError>;
}

/// Default parser for freedesktop `.desktop` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopEntryParser;

impl EntryParser for DesktopEntryParser {
    fn parse(&self, path: &Path) -> Result<ParsedEntry, ParseError> {
        let text = fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        ParsedEntry::parse_str(&text)
    }
}

fn read_entry_group(text: &str) -> Result<HashMap<String, String>, ParseError> {
    let mut keys = HashMap::new();
    let mut group: Option<&str> = None;
    let mut seen_entry_group = false;

    for (index, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            group = Some(header);
            seen_entry_group |= header == DESKTOP_ENTRY_GROUP;
            continue;
        }

        let malformed = || ParseError::MalformedLine {
            line: index + 1,
            content: raw_line.to_string(),
        };

        let (key, value) = line.split_once('=').ok_or_else(malformed)?;
        let key = key.trim();
        if key.is_empty() {
            return Err(malformed());
        }

        match group {
            None => return Err(malformed()),
            Some(DESKTOP_ENTRY_GROUP) => {
                // Localized variants are not used for display here.
                if key.contains('[') {
                    continue;
                }
                keys.insert(key.to_string(), value.trim().to_string());
            }
            Some(_) => {}
        }
    }

    if seen_entry_group {
        Ok(keys)
    } else {
        Err(ParseError::MissingGroup)
    }
}

/// Lenient boolean: unknown values read as `false`.
fn parse_bool(key: &str, raw: &str) -> bool {
    match raw {
        "true" | "True" | "1" => true,
        "false" | "False" | "0" => false,
        other => {
            tracing::debug!("Treating {}={:?} as false", key, other);
            false
        }
    }
}

/// Decode `\s`, `\n`, `\t`, `\r` and `\\`. Unknown escapes are kept verbatim.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('s') => out.push(' '),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Split a `;`-separated list, honouring `\;` and dropping empty items.
fn split_list(raw: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&';') => {
                chars.next();
                current.push(';');
            }
            '\\' => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ';' => items.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    items.push(current);

    items
        .into_iter()
        .map(|item| unescape(&item))
        .filter(|item| !item.is_empty())
        .collect()
}
