//! Output file naming.

use std::collections::HashSet;
use std::sync::OnceLock;

use crate::types::ExportFormat;

fn non_word() -> Option<&'static regex_lite::Regex> {
    static NON_WORD: OnceLock<Option<regex_lite::Regex>> = OnceLock::new();
    NON_WORD.get_or_init(|| regex_lite::Regex::new(r"\W").ok()).as_ref()
}

/// Remove every non-word character (anything but ASCII letters, digits and `_`).
pub fn escape_file_part(part: &str) -> String {
    match non_word() {
        Some(re) => re.replace_all(part, "").into_owned(),
        None => part
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect(),
    }
}

/// File prefix for one session: `{caseId}_{sessionId}`, sanitized.
pub fn session_prefix(case_id: &str, session_id: &str) -> String {
    format!("{}_{}", escape_file_part(case_id), escape_file_part(session_id))
}

/// File prefix for a unioned protocol network.
pub fn protocol_prefix(protocol_name: &str) -> String {
    escape_file_part(protocol_name)
}

/// `{prefix}[_{format}][_{partition}]{extension}`; the format segment is
/// omitted when the extension already names it.
pub fn make_filename(prefix: &str, partition: Option<&str>, format: ExportFormat) -> String {
    let extension = format.extension();
    let mut name = prefix.to_string();
    if extension != format!(".{}", format.as_str()) {
        if !name.is_empty() {
            name.push('_');
        }
        name.push_str(format.as_str());
    }
    if let Some(partition) = partition {
        name.push('_');
        name.push_str(&escape_file_part(partition));
    }
    name.push_str(extension);
    name
}

/// Hands out file names, suffixing repeats so no two tasks share a path.
#[derive(Debug, Default)]
pub struct UniqueNames {
    taken: HashSet<String>,
}

impl UniqueNames {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `name`, or `{stem}_{n}{ext}` for the first free `n >= 2`.
    pub fn reserve(&mut self, name: String) -> String {
        if self.taken.insert(name.clone()) {
            return name;
        }
        let (stem, ext) = match name.rfind('.') {
            Some(dot) => name.split_at(dot),
            None => (name.as_str(), ""),
        };
        let mut n = 2;
        loop {
            let candidate = format!("{stem}_{n}{ext}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
