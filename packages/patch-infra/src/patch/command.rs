//! Ordered schema-patch statements.

use std::fmt;
use std::path::Path;

use crate::error::PatchError;

/// A single schema statement and its 1-based position in the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub ordinal: usize,
    pub statement: String,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.ordinal, preview(&self.statement))
    }
}

/// First line of a statement, shortened for progress output.
pub(crate) fn preview(statement: &str) -> String {
    const MAX: usize = 80;
    let line = statement
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with("--"))
        .unwrap_or("");
    if line.chars().count() > MAX {
        let cut: String = line.chars().take(MAX).collect();
        format!("{cut}...")
    } else {
        line.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandList {
    commands: Vec<Command>,
}

impl CommandList {
    /// Build a list from statement literals, numbering them in order.
    pub fn from_statements<I, S>(statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let commands = statements
            .into_iter()
            .enumerate()
            .map(|(idx, s)| Command {
                ordinal: idx + 1,
                statement: s.into(),
            })
            .collect();
        Self { commands }
    }

    /// Split a SQL script into statements on top-level `;`.
    ///
    /// Semicolons inside quoted strings, quoted identifiers, comments and
    /// dollar-quoted bodies do not split. Fragments holding only whitespace
    /// or comments are dropped.
    pub fn parse(sql: &str) -> Self {
        Self::from_statements(split_statements(sql))
    }

    pub fn from_file(path: &Path) -> Result<Self, PatchError> {
        let sql = std::fs::read_to_string(path).map_err(|e| {
            PatchError::config(format!("failed to read patch file {}: {e}", path.display()))
        })?;
        Ok(Self::parse(&sql))
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }
}

impl<'a> IntoIterator for &'a CommandList {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

fn split_statements(sql: &str) -> Vec<String> {
    let bytes = sql.as_bytes();
    let len = bytes.len();
    let mut statements = Vec::new();
    let mut start = 0;
    let mut has_code = false;
    let mut i = 0;

    let mut push = |from: usize, to: usize, has_code: bool| {
        let text = sql[from..to].trim();
        if has_code && !text.is_empty() {
            statements.push(text.to_string());
        }
    };

    while i < len {
        match bytes[i] {
            b'\'' | b'"' => {
                let quote = bytes[i];
                let backslash_escapes = quote == b'\'' && is_escape_string_prefix(bytes, i);
                has_code = true;
                i += 1;
                while i < len && bytes[i] != quote {
                    if backslash_escapes && bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                while i < len && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let mut depth = 1;
                i += 2;
                while i < len && depth > 0 {
                    if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'*') {
                        depth += 1;
                        i += 2;
                    } else if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
                        depth -= 1;
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
            }
            b'$' => {
                has_code = true;
                match dollar_tag(&bytes[i..]) {
                    Some(tag_len) => {
                        let tag = &sql[i..i + tag_len];
                        let body_start = i + tag_len;
                        i = match sql[body_start..].find(tag) {
                            Some(offset) => body_start + offset + tag_len,
                            None => len,
                        };
                    }
                    None => i += 1,
                }
            }
            b';' => {
                push(start, i, has_code);
                has_code = false;
                i += 1;
                start = i;
            }
            b if b.is_ascii_whitespace() => i += 1,
            _ => {
                has_code = true;
                i += 1;
            }
        }
    }
    push(start, len, has_code);

    statements
}

/// True when the quote at `quote_at` opens a Postgres `E'...'` string, where
/// a backslash escapes the next character.
fn is_escape_string_prefix(bytes: &[u8], quote_at: usize) -> bool {
    if quote_at == 0 || !matches!(bytes[quote_at - 1], b'E' | b'e') {
        return false;
    }
    match quote_at.checked_sub(2).map(|j| bytes[j]) {
        Some(b) => !(b.is_ascii_alphanumeric() || b == b'_'),
        None => true,
    }
}

/// Length of a `$tag$` / `$$` opener at the start of `bytes`, if any.
fn dollar_tag(bytes: &[u8]) -> Option<usize> {
    let mut j = 1;
    if bytes.get(j) == Some(&b'$') {
        return Some(2);
    }
    match bytes.get(j) {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => j += 1,
        _ => return None,
    }
    while let Some(b) = bytes.get(j) {
        if *b == b'$' {
            return Some(j + 1);
        }
        if !(b.is_ascii_alphanumeric() || *b == b'_') {
            return None;
        }
        j += 1;
    }
    None
}
