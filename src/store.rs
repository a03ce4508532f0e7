//! Named layouts saved per tag.
//!
//! Layouts live as plain files, one per name:
//! `<base>/<tag>/<name>.layout`, each holding the dump text.  Only the text
//! is stored; it is parsed again whenever it is used.

use crate::tree::{Tree, TreeError};
use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const EXTENSION: &str = "layout";

/// A saved layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedLayout {
    pub name: String,
    pub sexp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid layout name {0:?}")]
    InvalidName(String),
    #[error("no layout {name:?} on tag {tag:?}")]
    NotFound { tag: String, name: String },
    #[error("layout {name:?} does not parse: {source}")]
    Invalid {
        name: String,
        #[source]
        source: TreeError,
    },
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Names end up as path components, so they must be plain.
fn check_name(name: &str) -> Result<(), StoreError> {
    let bad = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0']);
    if bad {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// File-backed layout store.
#[derive(Debug, Clone)]
pub struct LayoutStore {
    base: PathBuf,
}

impl LayoutStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn tag_dir(&self, tag: &str) -> Result<PathBuf, StoreError> {
        check_name(tag)?;
        Ok(self.base.join(tag))
    }

    fn layout_path(&self, tag: &str, name: &str) -> Result<PathBuf, StoreError> {
        check_name(name)?;
        Ok(self.tag_dir(tag)?.join(format!("{}.{}", name, EXTENSION)))
    }

    /// All layouts saved for `tag`, sorted by name.
    pub fn list(&self, tag: &str) -> Result<Vec<SavedLayout>, StoreError> {
        let dir = self.tag_dir(tag)?;
        let entries = match fs::read_dir(&dir) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(&dir)(e)),
        };

        let mut layouts = Vec::new();
        for entry in entries {
            let path = entry.map_err(io_err(&dir))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let sexp = fs::read_to_string(&path).map_err(io_err(&path))?;
            layouts.push(SavedLayout {
                name: name.to_string(),
                sexp: sexp.trim().to_string(),
            });
        }
        layouts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(layouts)
    }

    pub fn get(&self, tag: &str, name: &str) -> Result<SavedLayout, StoreError> {
        let path = self.layout_path(tag, name)?;
        match fs::read_to_string(&path) {
            Ok(sexp) => Ok(SavedLayout {
                name: name.to_string(),
                sexp: sexp.trim().to_string(),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound {
                tag: tag.to_string(),
                name: name.to_string(),
            }),
            Err(e) => Err(io_err(&path)(e)),
        }
    }

    /// Save `layout` under `tag`, replacing any layout with the same name.
    /// The text must parse.
    pub fn save(&self, tag: &str, layout: &SavedLayout) -> Result<(), StoreError> {
        Tree::parse(&layout.sexp).map_err(|source| StoreError::Invalid {
            name: layout.name.clone(),
            source,
        })?;
        let path = self.layout_path(tag, &layout.name)?;
        let dir = self.tag_dir(tag)?;
        fs::create_dir_all(&dir).map_err(io_err(&dir))?;
        fs::write(&path, format!("{}\n", layout.sexp.trim())).map_err(io_err(&path))?;
        debug!("saved {}", path.display());
        Ok(())
    }

    /// Remove one layout.  Removing a missing layout is an error.
    pub fn remove(&self, tag: &str, name: &str) -> Result<(), StoreError> {
        let path = self.layout_path(tag, name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound {
                tag: tag.to_string(),
                name: name.to_string(),
            }),
            Err(e) => Err(io_err(&path)(e)),
        }
    }

    /// Drop every layout of `tag`.
    pub fn purge(&self, tag: &str) -> Result<(), StoreError> {
        let dir = self.tag_dir(tag)?;
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(&dir)(e)),
        }
    }
}
