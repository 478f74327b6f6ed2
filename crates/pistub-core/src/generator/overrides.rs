//! Reader for `.override` files.
//!
//! An override file is a sequence of blocks separated by lines starting with
//! `%%`. The first line of each block is a command (`override fn kwargs`,
//! `override-attr Type.attr`, `ignore ...`, `include file`, `headers`, ...);
//! the remaining lines are the block body, usually C source.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::defs::read_source;
use crate::errors::PistubResult;

static BLOCK_SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^%%[^\n]*\n?").unwrap());

/// How the wrapper of an overridden function receives its arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallStyle {
    KwArgs,
    NoArgs,
    Positional,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverrideEntry {
    pub style: CallStyle,
    pub code: String,
}

/// Everything read from one override file and the files it includes.
#[derive(Clone, Debug, Default)]
pub struct OverrideFile {
    /// Native function id → override, in file order.
    pub overrides: IndexMap<String, OverrideEntry>,
    /// `Type.attr` → C source of attribute getters.
    pub attrs: IndexMap<String, String>,
    /// `Type.tp_slot` → C source of type slots.
    pub slots: IndexMap<String, String>,
    pub ignores: Vec<String>,
}

impl OverrideFile {
    pub fn read(path: &Path) -> PistubResult<Self> {
        let mut file = OverrideFile::default();
        let mut seen = HashSet::new();
        file.read_into(path, &mut seen)?;
        Ok(file)
    }

    /// Parse override text that has no includes to resolve.
    pub fn parse_str(text: &str) -> Self {
        let mut file = OverrideFile::default();
        for block in split_blocks(text) {
            file.add_block(block, None);
        }
        file
    }

    fn read_into(&mut self, path: &Path, seen: &mut HashSet<PathBuf>) -> PistubResult<()> {
        let key = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if !seen.insert(key) {
            debug!(path = %path.display(), "Override file already read");
            return Ok(());
        }
        info!("Parsing override file {}", path.display());
        let text = read_source(path)?;
        for block in split_blocks(&text) {
            if let Some(include) = self.add_block(block, Some(path)) {
                for target in include {
                    self.read_into(&target, seen)?;
                }
            }
        }
        Ok(())
    }

    /// Record one block. Returns the files an `include` block names.
    fn add_block(&mut self, block: &str, path: Option<&Path>) -> Option<Vec<PathBuf>> {
        let block = block.trim();
        if block.is_empty() {
            return None;
        }
        let (line, rest) = match block.find('\n') {
            Some(pos) => (&block[..pos], &block[pos + 1..]),
            None => (block, ""),
        };
        let words: Vec<&str> = line.split_whitespace().collect();
        let command = *words.first()?;

        match command {
            "override" => {
                let Some(func) = words.get(1) else {
                    warn!("override block without a function name");
                    return None;
                };
                let flags = &words[2..];
                let style = if flags.contains(&"kwargs") {
                    CallStyle::KwArgs
                } else if flags.contains(&"noargs") {
                    CallStyle::NoArgs
                } else {
                    CallStyle::Positional
                };
                self.overrides.insert(
                    func.to_string(),
                    OverrideEntry {
                        style,
                        code: rest.to_string(),
                    },
                );
            }
            "override-attr" => {
                if let Some(attr) = words.get(1) {
                    self.attrs.insert(attr.to_string(), rest.to_string());
                }
            }
            "override-slot" => {
                if let Some(slot) = words.get(1) {
                    self.slots.insert(slot.to_string(), rest.to_string());
                }
            }
            c if c == "ignore" || c.starts_with("ignore-") => {
                self.ignores.extend(
                    words[1..]
                        .iter()
                        .copied()
                        .chain(rest.split_whitespace())
                        .map(str::to_string),
                );
            }
            "include" => {
                let Some(path) = path else {
                    warn!("include in override text without a file location");
                    return None;
                };
                let dir = path.parent().unwrap_or_else(|| Path::new(""));
                let targets = words[1..]
                    .iter()
                    .copied()
                    .chain(rest.split_whitespace())
                    .map(|f| dir.join(f))
                    .collect();
                return Some(targets);
            }
            other => debug!("Ignoring override block `{other}`"),
        }
        None
    }

    pub fn get(&self, func: &str) -> Option<&OverrideEntry> {
        self.overrides.get(func)
    }
}

fn split_blocks(text: &str) -> impl Iterator<Item = &str> {
    BLOCK_SEPARATOR_RE.split(text)
}

/// `foo.defs` → `foo.override`.
pub fn override_path_for(defs_path: &Path) -> PathBuf {
    defs_path.with_extension("override")
}
