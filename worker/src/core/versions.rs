//! Per-file version tokens
//!
//! Every batch carries the version token of the context address it was loaded
//! from. Comparing it with the last token seen for a file tells whether the
//! file changed since it was last imported in this context.

use std::collections::HashMap;

/// Last two tokens seen for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionEntry {
    pub previous: Option<String>,
    pub current: String,
}

/// Bookkeeping of file versions for the life of the context
#[derive(Debug, Default, Clone)]
pub struct VersionRegistry {
    entries: HashMap<String, VersionEntry>,
}

impl VersionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `token` for `file`, returns whether the stored value changed
    pub fn observe(&mut self, file: &str, token: &str) -> bool {
        match self.entries.get_mut(file) {
            Some(entry) if entry.current == token => false,
            Some(entry) => {
                let previous = std::mem::replace(&mut entry.current, token.to_string());
                entry.previous = Some(previous);
                true
            }
            None => {
                self.entries.insert(
                    file.to_string(),
                    VersionEntry {
                        previous: None,
                        current: token.to_string(),
                    },
                );
                true
            }
        }
    }

    pub fn get(&self, file: &str) -> Option<&VersionEntry> {
        self.entries.get(file)
    }

    /// A file is stale once it has been seen under two different tokens
    pub fn is_stale(&self, file: &str) -> bool {
        self.entries
            .get(file)
            .is_some_and(|entry| entry.previous.as_deref().is_some_and(|prev| prev != entry.current))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
