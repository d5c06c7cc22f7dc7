//! Access to the document store the export reads from.
//!
//! The real store (database, access control) lives outside this crate;
//! the export only needs attachment lookup and URL construction.
//! [`MemoryStore`] serves a [`WikiTree`] loaded from JSON.

use crate::error::{Error, Result};
use crate::model::{Attachment, EntityReference, WikiTree};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

/// Read access to wiki documents and attachments.
pub trait DocumentStore {
    /// Find a stored attachment and return its canonical reference.
    ///
    /// The canonical reference carries the stored file name, which may
    /// differ from the requested one (e.g. a name given without its
    /// extension). `None` when no such attachment exists.
    fn find_attachment(&self, reference: &EntityReference) -> Option<EntityReference>;

    /// Open the content of an attachment found by [`find_attachment`].
    ///
    /// [`find_attachment`]: DocumentStore::find_attachment
    fn open_attachment(&self, reference: &EntityReference) -> Result<Box<dyn Read + '_>>;

    /// Base URL of the server hosting a wiki.
    fn server_url(&self, wiki: &str) -> Option<String>;

    /// External URL viewing a document.
    fn view_url(&self, document: &EntityReference) -> Result<String> {
        let server = self.server_url(document.wiki_name()).ok_or_else(|| {
            Error::InvalidReference(format!("no server URL for wiki '{}'", document.wiki_name()))
        })?;
        let mut url = format!("{}/bin/view", server.trim_end_matches('/'));
        for space in document.spaces() {
            url.push('/');
            url.push_str(&urlencoding::encode(space));
        }
        url.push('/');
        url.push_str(&urlencoding::encode(document.name()));
        Ok(url)
    }
}

/// In-memory store over a [`WikiTree`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    attachments: HashMap<EntityReference, Vec<Attachment>>,
    server_urls: HashMap<String, String>,
    base_dir: Option<PathBuf>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store serving the attachments of a tree.
    pub fn from_tree(tree: &WikiTree) -> Self {
        let mut store = Self::new();
        store.base_dir = tree.base_dir.clone();
        if let Some(ref url) = tree.server_url {
            store.server_urls.insert(tree.name.clone(), url.clone());
        }
        for (reference, doc) in tree.documents() {
            for attachment in &doc.attachments {
                store.add_attachment(&reference, attachment.clone());
            }
        }
        store
    }

    /// Register a server URL for a wiki.
    pub fn with_server_url(mut self, wiki: impl Into<String>, url: impl Into<String>) -> Self {
        self.server_urls.insert(wiki.into(), url.into());
        self
    }

    /// Attach a file to a document.
    pub fn add_attachment(&mut self, document: &EntityReference, attachment: Attachment) {
        self.attachments
            .entry(document.document_reference())
            .or_default()
            .push(attachment);
    }

    /// Number of attachments held.
    pub fn attachment_count(&self) -> usize {
        self.attachments.values().map(Vec::len).sum()
    }

    fn lookup(&self, reference: &EntityReference) -> Option<&Attachment> {
        let candidates = self.attachments.get(&reference.document_reference())?;
        let name = reference.name();

        if let Some(exact) = candidates.iter().find(|a| a.name == name) {
            return Some(exact);
        }

        // Tolerate a name given without its extension, if unambiguous
        let mut by_stem = candidates
            .iter()
            .filter(|a| Path::new(&a.name).file_stem().and_then(|s| s.to_str()) == Some(name));
        match (by_stem.next(), by_stem.next()) {
            (Some(found), None) => Some(found),
            _ => None,
        }
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        match self.base_dir {
            Some(ref base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl DocumentStore for MemoryStore {
    fn find_attachment(&self, reference: &EntityReference) -> Option<EntityReference> {
        self.lookup(reference)
            .map(|attachment| reference.with_name(attachment.name.clone()))
    }

    fn open_attachment(&self, reference: &EntityReference) -> Result<Box<dyn Read + '_>> {
        let attachment = self
            .lookup(reference)
            .ok_or_else(|| Error::InvalidReference(reference.to_string()))?;

        if let Some(ref data) = attachment.data {
            return Ok(Box::new(Cursor::new(data.as_slice())));
        }
        if let Some(ref content) = attachment.content {
            return Ok(Box::new(Cursor::new(content.as_bytes())));
        }
        if let Some(ref path) = attachment.path {
            return Ok(Box::new(File::open(self.resolve_path(path))?));
        }
        Err(Error::Other(format!("Attachment {} has no content", reference)))
    }

    fn server_url(&self, wiki: &str) -> Option<String> {
        self.server_urls.get(wiki).cloned()
    }
}
