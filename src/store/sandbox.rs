//! # Owner Sandbox
//!
//! Path confinement and quota accounting for one owner's storage directory.
//! Resolution is purely lexical: the requested name is joined onto the root
//! and normalized component by component, and any attempt to climb out of
//! the root (leading `/`, too many `..`) fails with `PathEscape` before any
//! file is opened.
//!
//! Space and file-count usage are recomputed by walking the directory on
//! demand rather than tracked incrementally, so they are always consistent
//! with on-disk reality at the cost of O(files) per check. Only files with
//! the recognized extension are counted.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::config::PAGE_FILE_EXTENSION;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an owner-relative file name to an absolute path inside the
    /// sandbox. Fails with [`Error::PathEscape`] if the normalized path
    /// would leave the root.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let mut kept: Vec<&std::ffi::OsStr> = Vec::new();
        for component in Path::new(name).components() {
            match component {
                Component::Normal(part) => kept.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    if kept.pop().is_none() {
                        return Err(Error::PathEscape {
                            name: name.to_string(),
                        });
                    }
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(Error::PathEscape {
                        name: name.to_string(),
                    });
                }
            }
        }
        if kept.is_empty() {
            return Err(Error::PathEscape {
                name: name.to_string(),
            });
        }

        let mut path = self.root.clone();
        path.extend(kept);
        Ok(path)
    }

    /// Total size in bytes of recognized data files under the root.
    pub fn space_used(&self) -> u64 {
        walk(&self.root, &mut |_, len| len).unwrap_or(0)
    }

    /// Number of recognized data files under the root.
    pub fn file_count(&self) -> u32 {
        walk(&self.root, &mut |_, _| 1u64).unwrap_or(0) as u32
    }

    /// Recognized data files under the root as `(relative name, size)`,
    /// in no particular order.
    pub fn list_files(&self) -> Vec<(String, u64)> {
        let mut files = Vec::new();
        collect(&self.root, String::new(), &mut files);
        files
    }

    /// Delete a recognized data file by owner-relative name. Returns whether
    /// a file existed to delete.
    pub fn delete_file(&self, name: &str) -> Result<bool> {
        let path = self.resolve(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(Error::Io(err)),
        }
    }
}

fn is_data_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(PAGE_FILE_EXTENSION)
}

/// Sum `measure` over recognized files below `dir`. Unreadable entries are
/// skipped: quota checks reflect what can be observed, not what might exist.
fn walk(dir: &Path, measure: &mut dyn FnMut(&Path, u64) -> u64) -> Option<u64> {
    let entries = fs::read_dir(dir).ok()?;
    let mut total = 0u64;
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(meta) = entry.metadata() else { continue };
        if meta.is_dir() {
            total += walk(&path, measure).unwrap_or(0);
        } else if is_data_file(&path) {
            total += measure(&path, meta.len());
        }
    }
    Some(total)
}

fn collect(dir: &Path, prefix: String, out: &mut Vec<(String, u64)>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(meta) = entry.metadata() else { continue };
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let name = if prefix.is_empty() {
            file_name.to_string()
        } else {
            format!("{prefix}/{file_name}")
        };
        if meta.is_dir() {
            collect(&path, name, out);
        } else if is_data_file(&path) {
            out.push((name, meta.len()));
        }
    }
}
