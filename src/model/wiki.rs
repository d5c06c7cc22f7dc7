//! Wiki-level input types: the page tree an export walks.

use super::{ContentBlock, EntityReference};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// A wiki and its space hierarchy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WikiTree {
    /// Wiki name
    pub name: String,

    /// Server URL used for absolute links (e.g. `https://wiki.example.com`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,

    /// Top-level spaces
    #[serde(default)]
    pub spaces: Vec<Space>,

    /// Directory against which relative attachment paths resolve
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl WikiTree {
    /// Create an empty wiki.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the server URL.
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    /// Add a top-level space.
    pub fn add_space(&mut self, space: Space) {
        self.spaces.push(space);
    }

    /// Load a tree from a JSON file; attachment paths resolve against
    /// the file's directory.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut tree = Self::from_reader(BufReader::new(file))?;
        tree.base_dir = path.parent().map(Path::to_path_buf);
        Ok(tree)
    }

    /// Load a tree from JSON.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Load a tree from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// All documents with their references, in traversal order.
    pub fn documents(&self) -> Vec<(EntityReference, &WikiDocument)> {
        fn walk<'a>(
            wiki: &str,
            path: &mut Vec<String>,
            space: &'a Space,
            out: &mut Vec<(EntityReference, &'a WikiDocument)>,
        ) {
            path.push(space.name.clone());
            for doc in &space.documents {
                out.push((EntityReference::document(wiki, &path[..], &doc.name), doc));
            }
            for child in &space.spaces {
                walk(wiki, path, child, out);
            }
            path.pop();
        }

        let mut out = Vec::new();
        let mut path = Vec::new();
        for space in &self.spaces {
            walk(&self.name, &mut path, space, &mut out);
        }
        out
    }

    /// Find a document by reference.
    pub fn document(&self, reference: &EntityReference) -> Option<&WikiDocument> {
        self.documents()
            .into_iter()
            .find(|(r, _)| r == reference)
            .map(|(_, d)| d)
    }

    /// Total number of documents.
    pub fn document_count(&self) -> usize {
        self.spaces.iter().map(Space::document_count).sum()
    }
}

/// A space: documents plus nested spaces.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Space {
    /// Space name
    pub name: String,

    /// Documents directly in this space
    #[serde(default)]
    pub documents: Vec<WikiDocument>,

    /// Nested spaces
    #[serde(default)]
    pub spaces: Vec<Space>,
}

impl Space {
    /// Create an empty space.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a document.
    pub fn add_document(&mut self, document: WikiDocument) {
        self.documents.push(document);
    }

    /// Add a nested space.
    pub fn add_space(&mut self, space: Space) {
        self.spaces.push(space);
    }

    /// Number of documents in this space and below.
    pub fn document_count(&self) -> usize {
        self.documents.len() + self.spaces.iter().map(Space::document_count).sum::<usize>()
    }
}

/// A wiki document (page).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WikiDocument {
    /// Document name
    pub name: String,

    /// Display title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Content blocks
    #[serde(default)]
    pub content: Vec<ContentBlock>,

    /// Attachments
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl WikiDocument {
    /// Create an empty document.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Append a content block.
    pub fn add_block(&mut self, block: ContentBlock) {
        self.content.push(block);
    }

    /// Add an attachment.
    pub fn add_attachment(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    /// Plain text of the whole document.
    pub fn plain_text(&self) -> String {
        self.content
            .iter()
            .map(|block| block.plain_text())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// An attachment: inline bytes or a file on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attachment {
    /// File name as stored in the wiki
    pub name: String,

    /// File holding the content (relative to the tree's base directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Inline content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Inline binary content (programmatic use)
    #[serde(skip)]
    pub data: Option<Vec<u8>>,
}

impl Attachment {
    /// An attachment with inline bytes.
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data: Some(data),
            ..Default::default()
        }
    }

    /// An attachment backed by a file.
    pub fn from_path(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: Some(path.into()),
            ..Default::default()
        }
    }
}
