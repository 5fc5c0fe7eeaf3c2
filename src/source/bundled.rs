//! Scripts compiled into the binary.

use std::borrow::Cow;
use std::collections::BTreeMap;

/// Read-only store of scripts bundled with the application.
///
/// Keys are script names without extension. Contents are trusted at build
/// time and are fed to the interpreter over stdin, so they need no
/// interpreter directive.
#[derive(Debug, Clone, Default)]
pub struct BundledScripts {
    scripts: BTreeMap<String, Cow<'static, [u8]>>,
}

impl BundledScripts {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding the scripts shipped in the `scripts/` directory.
    pub fn builtin() -> Self {
        let mut store = Self::new();
        store.insert_static("system-info", include_bytes!("../../scripts/system-info.sh"));
        store.insert_static("check-disk", include_bytes!("../../scripts/check-disk.sh"));
        store
    }

    fn insert_static(&mut self, key: &str, content: &'static [u8]) {
        self.scripts.insert(key.to_string(), Cow::Borrowed(content));
    }

    /// Add or replace a script.
    pub fn insert(&mut self, key: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.scripts.insert(key.into(), Cow::Owned(content.into()));
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_script(mut self, key: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(key, content);
        self
    }

    /// Get the bytes of a script.
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.scripts.get(key).map(|c| c.as_ref())
    }

    /// Check whether a script exists.
    pub fn contains(&self, key: &str) -> bool {
        self.scripts.contains_key(key)
    }

    /// Sorted script names.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.scripts.keys().map(String::as_str)
    }

    /// Number of scripts in the store.
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}
