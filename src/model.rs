use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum EntryKind {
    #[default]
    Unspecified, // Type missing or not recognized
    Application, // Execute command
    Link,        // Open browser
    Directory,   // Open file manager
}

impl EntryKind {
    /// Maps a lower-cased `Type=` value to its kind.
    pub fn from_type_value(value: &str) -> Option<Self> {
        match value {
            "application" => Some(EntryKind::Application),
            "link" => Some(EntryKind::Link),
            "directory" => Some(EntryKind::Directory),
            _ => None,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryKind::Unspecified => "Unspecified",
            EntryKind::Application => "Application",
            EntryKind::Link => "Link",
            EntryKind::Directory => "Directory",
        };
        f.pad(s)
    }
}

/// A parsed desktop entry. Empty strings mean the key was absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub kind: EntryKind,
    pub name: String,              // Display name
    pub generic_name: String,      // e.g. "Web Browser"
    pub comment: String,           // Tooltip text
    pub icon: String,              // Icon file path or themed icon name
    pub path: String,              // Working directory
    pub exec: String,              // Command line, may hold %f/%F/%u/%U
    pub url: String,               // Target of a Link entry
    pub terminal: bool,            // Run inside a terminal emulator
    pub action_names: Vec<String>, // Ids declared by `Actions=`
    pub actions: Vec<ActionEntry>, // Action sections actually present
}

/// One `[Desktop Action ...]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActionEntry {
    pub name: String,
    pub icon: String,
    pub exec: String,
}

impl Entry {
    /// Fills the field codes in `exec` with user arguments.
    pub fn expand_exec(&self, args: &str) -> String {
        expand_exec(&self.exec, args)
    }
}

impl ActionEntry {
    pub fn expand_exec(&self, args: &str) -> String {
        expand_exec(&self.exec, args)
    }
}

/// Replaces `%F`, `%f`, `%U` and `%u` with `args`, leaving everything else alone.
pub fn expand_exec(exec: &str, args: &str) -> String {
    let mut out = String::with_capacity(exec.len() + args.len());
    let mut rest = exec;
    // Single pass, so codes inside `args` are never expanded.
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let code = &rest[pos + 1..];
        match code.chars().next() {
            Some('F' | 'f' | 'U' | 'u') => {
                out.push_str(args);
                rest = &code[1..];
            }
            _ => {
                out.push('%');
                rest = code;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_exec_replaces_every_field_code() {
        let entry = Entry {
            exec: "app %F --single %f --urls %U --url %u".to_string(),
            ..Default::default()
        };
        assert_eq!(
            entry.expand_exec("a.txt"),
            "app a.txt --single a.txt --urls a.txt --url a.txt"
        );
    }

    #[test]
    fn expand_exec_leaves_other_codes_alone() {
        let entry = Entry {
            exec: "app %i %c %k 100%".to_string(),
            ..Default::default()
        };
        assert_eq!(entry.expand_exec("x"), "app %i %c %k 100%");
    }

    #[test]
    fn expand_exec_with_empty_args_drops_codes() {
        let action = ActionEntry {
            exec: "firefox --private-window %u".to_string(),
            ..Default::default()
        };
        assert_eq!(action.expand_exec(""), "firefox --private-window ");
    }

    #[test]
    fn expand_exec_inserts_args_verbatim() {
        assert_eq!(expand_exec("open %u", "http://x/%u%F"), "open http://x/%u%F");
    }

    #[test]
    fn kind_from_type_value() {
        assert_eq!(EntryKind::from_type_value("application"), Some(EntryKind::Application));
        assert_eq!(EntryKind::from_type_value("link"), Some(EntryKind::Link));
        assert_eq!(EntryKind::from_type_value("directory"), Some(EntryKind::Directory));
        assert_eq!(EntryKind::from_type_value("service"), None);
        assert_eq!(EntryKind::default().to_string(), "Unspecified");
    }
}
