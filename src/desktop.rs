use crate::error::ParseError;
use crate::model::{ActionEntry, Entry, EntryKind};
use std::io::{self, BufRead, BufReader, Read};

/// Line limit used by the scanner unless configured otherwise.
pub const DEFAULT_LINE_LIMIT: usize = 32 * 1024;

const ENTRY_HEADER: &[u8] = b"[desktop entry]";

const KEY_TYPE: &[u8] = b"type=";
const KEY_NAME: &[u8] = b"name=";
const KEY_GENERIC_NAME: &[u8] = b"genericname=";
const KEY_ACTIONS: &[u8] = b"actions=";
const KEY_COMMENT: &[u8] = b"comment=";
const KEY_ICON: &[u8] = b"icon=";
const KEY_PATH: &[u8] = b"path=";
const KEY_EXEC: &[u8] = b"exec=";
const KEY_URL: &[u8] = b"url=";

const FLAG_TERMINAL: &[u8] = b"terminal=true";
const FLAG_NO_DISPLAY: &[u8] = b"nodisplay=true";
const FLAG_HIDDEN: &[u8] = b"hidden=true";

// Applied in order. Backslashes first so the shorter forms can't split a run.
const EXEC_ESCAPES: [(&str, &str); 8] = [
    ("%%", "%"),
    (r"\\\\\\\\", r"\\\\"),
    (r"\\\\\", r"\\\"),
    (r"\\\\ ", r"\\ "),
    (r"\\\\`", r"\\`"),
    (r"\\\\$", r"\\$"),
    (r"\\\\(", r"\\("),
    (r"\\\\)", r"\\)"),
];

/// What a section header after `[Desktop Entry]` means.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SectionMode {
    /// Every further header opens an action; `Exec` is kept raw.
    #[default]
    Actions,
    /// The next header ends the entry; `Exec` is unescaped while parsing.
    MainOnly,
}

/// Reusable line storage. `limit` caps a line including its terminator.
#[derive(Debug)]
pub struct LineBuffer {
    buf: Vec<u8>,
    limit: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LINE_LIMIT)
    }
}

impl LineBuffer {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            buf: Vec::with_capacity(limit.min(DEFAULT_LINE_LIMIT)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    fn next_line<R: BufRead>(&mut self, reader: &mut R) -> io::Result<Option<&[u8]>> {
        self.buf.clear();
        let read = (&mut *reader)
            .take(self.limit as u64)
            .read_until(b'\n', &mut self.buf)?;
        if read == 0 {
            return Ok(None);
        }
        if read == self.limit
            && self.buf.last() != Some(&b'\n')
            && !reader.fill_buf()?.is_empty()
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line exceeds {} bytes", self.limit),
            ));
        }
        Ok(Some(&self.buf))
    }
}

/// Parses one desktop entry.
///
/// Returns `Ok(None)` when the entry is marked `NoDisplay=true` or
/// `Hidden=true`; parsing stops at that line. Keys are matched
/// case-insensitively and the first occurrence of each wins.
pub fn parse<R: Read>(
    content: R,
    buf: &mut LineBuffer,
    mode: SectionMode,
) -> Result<Option<Entry>, ParseError> {
    let mut reader = BufReader::new(content);
    let mut entry = Entry::default();
    let mut found_header = false;
    let mut found_type = false;
    let mut in_action = false;

    while let Some(raw) = buf.next_line(&mut reader)? {
        let line = raw.trim_ascii();
        if line.is_empty() || line[0] == b'#' {
            continue;
        }

        if line[0] == b'[' {
            if !found_header {
                if !line.eq_ignore_ascii_case(ENTRY_HEADER) {
                    return Err(ParseError::header_not_found());
                }
                found_header = true;
                continue;
            }
            match mode {
                SectionMode::MainOnly => break,
                SectionMode::Actions => {
                    entry.actions.push(ActionEntry::default());
                    in_action = true;
                }
            }
            continue;
        }

        if let Some(value) = value_of(line, KEY_TYPE) {
            if !found_type {
                found_type = true;
                let value = String::from_utf8_lossy(value).to_lowercase();
                entry.kind = EntryKind::from_type_value(&value).unwrap_or_default();
            }
        } else if let Some(value) = value_of(line, KEY_NAME) {
            match current_action(&mut entry, in_action) {
                Some(action) => set_once(&mut action.name, value),
                None => set_once(&mut entry.name, value),
            }
        } else if let Some(value) = value_of(line, KEY_GENERIC_NAME) {
            set_once(&mut entry.generic_name, value);
        } else if let Some(value) = value_of(line, KEY_ACTIONS) {
            if mode == SectionMode::Actions && entry.action_names.is_empty() {
                entry.action_names = split_actions(value);
            }
        } else if let Some(value) = value_of(line, KEY_COMMENT) {
            set_once(&mut entry.comment, value);
        } else if let Some(value) = value_of(line, KEY_ICON) {
            match current_action(&mut entry, in_action) {
                Some(action) => set_once(&mut action.icon, value),
                None => set_once(&mut entry.icon, value),
            }
        } else if let Some(value) = value_of(line, KEY_PATH) {
            set_once(&mut entry.path, value);
        } else if let Some(value) = value_of(line, KEY_EXEC) {
            if let Some(action) = current_action(&mut entry, in_action) {
                set_once(&mut action.exec, value);
            } else if entry.exec.is_empty() {
                let exec = String::from_utf8_lossy(value);
                entry.exec = match mode {
                    SectionMode::Actions => exec.into_owned(),
                    SectionMode::MainOnly => unquote_exec(&exec),
                };
            }
        } else if let Some(value) = value_of(line, KEY_URL) {
            set_once(&mut entry.url, value);
        } else if line.eq_ignore_ascii_case(FLAG_TERMINAL) {
            entry.terminal = true;
        } else if line.eq_ignore_ascii_case(FLAG_NO_DISPLAY)
            || line.eq_ignore_ascii_case(FLAG_HIDDEN)
        {
            return Ok(None);
        }
    }

    if !found_header {
        return Err(ParseError::header_not_found());
    }
    Ok(Some(entry))
}

/// Undoes the `Exec` quoting rules: `%%` and doubled backslash escapes.
pub fn unquote_exec(exec: &str) -> String {
    EXEC_ESCAPES
        .iter()
        .fold(exec.to_string(), |ex, (from, to)| ex.replace(from, to))
}

// Value after `key`, only when the line carries at least one value byte.
fn value_of<'a>(line: &'a [u8], key: &[u8]) -> Option<&'a [u8]> {
    if line.len() > key.len() && line[..key.len()].eq_ignore_ascii_case(key) {
        Some(&line[key.len()..])
    } else {
        None
    }
}

fn current_action(entry: &mut Entry, in_action: bool) -> Option<&mut ActionEntry> {
    if in_action { entry.actions.last_mut() } else { None }
}

fn set_once(field: &mut String, value: &[u8]) {
    if field.is_empty() {
        *field = String::from_utf8_lossy(value).into_owned();
    }
}

fn split_actions(value: &[u8]) -> Vec<String> {
    let mut names: Vec<String> = String::from_utf8_lossy(value)
        .split(';')
        .map(str::to_string)
        .collect();
    if names.last().is_some_and(|n| n.is_empty()) {
        names.pop();
    }
    names
}
