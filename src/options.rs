/// Parser and renderer configuration
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    /// GFM pipe tables
    pub tables: bool,
    /// GFM `~text~` / `~~text~~`
    pub strikethrough: bool,
    /// Neuter a fixed set of raw HTML tags when rendering
    pub tagfilter: bool,
    /// Emit `<br />`, `<hr />` and `<img ... />` instead of the HTML4 forms
    pub xhtml: bool,
    /// Deepest container nesting (block quotes plus lists) the parser opens
    pub max_nesting: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            tables: true,
            strikethrough: true,
            tagfilter: false,
            xhtml: true,
            max_nesting: 100,
        }
    }
}

impl Options {
    /// Plain CommonMark: every extension off.
    pub fn commonmark() -> Self {
        Options {
            tables: false,
            strikethrough: false,
            tagfilter: false,
            ..Options::default()
        }
    }

    /// Every GFM extension this crate implements, tagfilter included.
    pub fn gfm() -> Self {
        Options {
            tagfilter: true,
            ..Options::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::Config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}
