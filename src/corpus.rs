//! Per-entity document folders.
//!
//! The document root holds one folder per entity, named by its id:
//!
//! ```text
//! unstructured/
//!   S1/
//!     notes.txt
//!     thesis.pdf
//!   S2/
//!     cv.docx
//! ```
//!
//! Listings are direct files only, sorted by filename. Nothing is cached;
//! every call reads the directory again.

use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::models::DocumentRef;

/// A document lookup that found nothing.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("entity folder not found: {0}")]
    EntityNotFound(String),
    #[error("document not found: {entity_id}/{filename}")]
    DocumentNotFound { entity_id: String, filename: String },
}

#[derive(Debug, Clone)]
pub struct Corpus {
    root: PathBuf,
}

impl Corpus {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Folder names directly under the root, sorted. Empty if the root is absent.
    pub fn entity_folders(&self) -> Vec<String> {
        if !self.exists() {
            return Vec::new();
        }
        direct_children(&self.root)
            .filter(|entry| entry.file_type().is_dir())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .collect()
    }

    /// Files in the entity's folder, sorted by filename.
    ///
    /// An absent folder (or one that is not a directory) lists nothing.
    pub fn list_documents(&self, entity_id: &str) -> Vec<DocumentRef> {
        self.list_folder(entity_id.trim())
    }

    /// Files in the folder named exactly `entity_id`.
    pub(crate) fn list_folder(&self, entity_id: &str) -> Vec<DocumentRef> {
        let Some(folder) = self.entity_folder(entity_id) else {
            return Vec::new();
        };
        if !folder.is_dir() {
            return Vec::new();
        }

        direct_children(&folder)
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let filename = entry.file_name().to_str()?.to_string();
                Some(DocumentRef {
                    entity_id: entity_id.to_string(),
                    filename,
                    path: entry.into_path(),
                })
            })
            .collect()
    }

    /// Path of an existing document, for handing the raw file to a client.
    ///
    /// `filename` must be a single plain path component; anything that would
    /// leave the entity folder counts as not found.
    pub fn resolve_document_path(
        &self,
        entity_id: &str,
        filename: &str,
    ) -> Result<PathBuf, LookupError> {
        let folder = self
            .entity_folder(entity_id)
            .filter(|f| f.is_dir())
            .ok_or_else(|| LookupError::EntityNotFound(entity_id.to_string()))?;

        let not_found = || LookupError::DocumentNotFound {
            entity_id: entity_id.to_string(),
            filename: filename.to_string(),
        };

        if !is_single_component(filename) {
            return Err(not_found());
        }
        let path = folder.join(filename);
        if path.is_file() {
            Ok(path)
        } else {
            Err(not_found())
        }
    }

    fn entity_folder(&self, entity_id: &str) -> Option<PathBuf> {
        is_single_component(entity_id).then(|| self.root.join(entity_id))
    }
}

fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn direct_children(dir: &Path) -> impl Iterator<Item = walkdir::DirEntry> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable corpus entry");
                None
            }
        })
}
