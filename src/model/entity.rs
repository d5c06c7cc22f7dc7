//! Entity references addressing wiki documents and attachments.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a segment in an entity chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    /// Wiki (top of the chain)
    Wiki,
    /// Space, possibly nested
    Space,
    /// Document (page)
    Document,
    /// Attachment of a document
    Attachment,
}

/// One named, typed segment of an entity chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntitySegment {
    /// Segment type
    #[serde(rename = "type")]
    pub entity_type: EntityType,

    /// Segment name
    pub name: String,
}

impl EntitySegment {
    fn new(entity_type: EntityType, name: impl Into<String>) -> Self {
        Self {
            entity_type,
            name: name.into(),
        }
    }
}

/// An immutable chain `wiki → space(s) → document [→ attachment]`.
///
/// Equality is structural over the whole chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityReference {
    segments: Vec<EntitySegment>,
}

impl EntityReference {
    /// Create a wiki reference.
    pub fn wiki(name: impl Into<String>) -> Self {
        Self {
            segments: vec![EntitySegment::new(EntityType::Wiki, name)],
        }
    }

    /// Create a space reference (nested spaces in order, outermost first).
    pub fn space<S: AsRef<str>>(wiki: impl Into<String>, spaces: &[S]) -> Self {
        let mut reference = Self::wiki(wiki);
        for space in spaces {
            reference
                .segments
                .push(EntitySegment::new(EntityType::Space, space.as_ref()));
        }
        reference
    }

    /// Create a document reference.
    pub fn document<S: AsRef<str>>(
        wiki: impl Into<String>,
        spaces: &[S],
        name: impl Into<String>,
    ) -> Self {
        Self::space(wiki, spaces).child(EntityType::Document, name)
    }

    /// Create a reference to an attachment of this document.
    pub fn attachment(&self, name: impl Into<String>) -> Self {
        self.document_reference().child(EntityType::Attachment, name)
    }

    /// Append a segment.
    pub fn child(&self, entity_type: EntityType, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(EntitySegment::new(entity_type, name));
        Self { segments }
    }

    /// Same chain with the leaf renamed.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        if let Some(last) = segments.last_mut() {
            last.name = name.into();
        }
        Self { segments }
    }

    /// All segments, wiki first.
    pub fn segments(&self) -> &[EntitySegment] {
        &self.segments
    }

    /// Type of the leaf segment.
    pub fn entity_type(&self) -> EntityType {
        self.segments
            .last()
            .map(|s| s.entity_type)
            .unwrap_or(EntityType::Wiki)
    }

    /// Name of the leaf segment.
    pub fn name(&self) -> &str {
        self.segments.last().map(|s| s.name.as_str()).unwrap_or("")
    }

    /// Wiki name.
    pub fn wiki_name(&self) -> &str {
        self.segments.first().map(|s| s.name.as_str()).unwrap_or("")
    }

    /// Space names, outermost first.
    pub fn spaces(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter(|s| s.entity_type == EntityType::Space)
            .map(|s| s.name.as_str())
            .collect()
    }

    /// The chain without its leaf.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() <= 1 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// The document this reference belongs to (itself for documents).
    pub fn document_reference(&self) -> Self {
        let end = self
            .segments
            .iter()
            .position(|s| s.entity_type == EntityType::Document)
            .map(|i| i + 1)
            .unwrap_or(self.segments.len());
        Self {
            segments: self.segments[..end].to_vec(),
        }
    }

    /// Resolve a document reference string relative to `base`.
    ///
    /// Syntax: `[wiki:][Space.]*Page`, with `\` escaping `.`, `:` and `@`.
    /// An empty string resolves to the base document itself, and a bare
    /// page name stays in the base document's spaces.
    pub fn resolve_document(reference: &str, base: &EntityReference) -> Result<Self> {
        let base = base.document_reference();
        if reference.trim().is_empty() {
            return Ok(base);
        }

        let (wiki, local) = match split_unescaped_once(reference, ':') {
            Some((wiki, local)) if !wiki.is_empty() => (unescape(wiki), local),
            _ => (base.wiki_name().to_string(), reference),
        };

        let mut parts: Vec<String> = split_unescaped(local, '.')
            .into_iter()
            .map(unescape)
            .collect();
        let page = parts
            .pop()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| Error::InvalidReference(reference.to_string()))?;

        if parts.iter().any(|p| p.is_empty()) {
            return Err(Error::InvalidReference(reference.to_string()));
        }

        let spaces: Vec<String> = if parts.is_empty() {
            base.spaces().into_iter().map(String::from).collect()
        } else {
            parts
        };

        Ok(Self::document(wiki, &spaces, page))
    }

    /// Resolve an attachment reference string relative to `base`.
    ///
    /// Syntax: `[document@]filename`; without a document part the
    /// attachment belongs to the base document.
    pub fn resolve_attachment(reference: &str, base: &EntityReference) -> Result<Self> {
        let (document, name) = match split_unescaped_last(reference, '@') {
            Some((document, name)) => (EntityReference::resolve_document(document, base)?, name),
            None => (base.document_reference(), reference),
        };

        let name = unescape(name);
        if name.is_empty() {
            return Err(Error::InvalidReference(reference.to_string()));
        }
        Ok(document.attachment(name))
    }
}

impl fmt::Display for EntityReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            let name = escape(&segment.name);
            match segment.entity_type {
                EntityType::Wiki => write!(f, "{}:", name)?,
                EntityType::Space | EntityType::Document => {
                    if !first {
                        f.write_str(".")?;
                    }
                    f.write_str(&name)?;
                    first = false;
                }
                EntityType::Attachment => write!(f, "@{}", name)?,
            }
        }
        Ok(())
    }
}

fn escape(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if matches!(c, '.' | ':' | '@' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Byte offsets of unescaped occurrences of `sep`.
fn unescaped_positions(s: &str, sep: char) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == sep {
            positions.push(i);
        }
    }
    positions
}

fn split_unescaped(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for pos in unescaped_positions(s, sep) {
        parts.push(&s[start..pos]);
        start = pos + sep.len_utf8();
    }
    parts.push(&s[start..]);
    parts
}

fn split_unescaped_once(s: &str, sep: char) -> Option<(&str, &str)> {
    let pos = *unescaped_positions(s, sep).first()?;
    Some((&s[..pos], &s[pos + sep.len_utf8()..]))
}

fn split_unescaped_last(s: &str, sep: char) -> Option<(&str, &str)> {
    let pos = *unescaped_positions(s, sep).last()?;
    Some((&s[..pos], &s[pos + sep.len_utf8()..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> EntityReference {
        EntityReference::document("xwiki", &["Main", "Sub"], "WebHome")
    }

    #[test]
    fn test_structural_equality() {
        let a = EntityReference::document("wiki", &["space"], "page");
        let b = EntityReference::document("wiki", &["space"], "page");
        let c = EntityReference::document("wiki", &["other"], "page");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_resolve_document_relative() {
        let r = EntityReference::resolve_document("Other", &base()).unwrap();
        assert_eq!(r, EntityReference::document("xwiki", &["Main", "Sub"], "Other"));

        let r = EntityReference::resolve_document("Blog.Post", &base()).unwrap();
        assert_eq!(r, EntityReference::document("xwiki", &["Blog"], "Post"));

        let r = EntityReference::resolve_document("dev:A.B", &base()).unwrap();
        assert_eq!(r, EntityReference::document("dev", &["A"], "B"));
    }

    #[test]
    fn test_resolve_document_empty_is_base() {
        let r = EntityReference::resolve_document("", &base()).unwrap();
        assert_eq!(r, base());
    }

    #[test]
    fn test_resolve_document_escaped_dot() {
        let r = EntityReference::resolve_document("Space.Release 1\\.2", &base()).unwrap();
        assert_eq!(r.name(), "Release 1.2");
        assert_eq!(r.spaces(), vec!["Space"]);
    }

    #[test]
    fn test_resolve_document_invalid() {
        assert!(EntityReference::resolve_document("Space.", &base()).is_err());
        assert!(EntityReference::resolve_document("A..B", &base()).is_err());
    }

    #[test]
    fn test_resolve_attachment() {
        let r = EntityReference::resolve_attachment("image.png", &base()).unwrap();
        assert_eq!(r, base().attachment("image.png"));
        assert_eq!(r.entity_type(), EntityType::Attachment);

        let r = EntityReference::resolve_attachment("Space.Page@b.txt", &base()).unwrap();
        assert_eq!(r.name(), "b.txt");
        assert_eq!(
            r.document_reference(),
            EntityReference::document("xwiki", &["Space"], "Page")
        );
    }

    #[test]
    fn test_display_roundtrip() {
        let r = base().attachment("file.txt");
        assert_eq!(r.to_string(), "xwiki:Main.Sub.WebHome@file.txt");
        let back = EntityReference::resolve_attachment(
            "xwiki:Main.Sub.WebHome@file.txt",
            &EntityReference::document("other", &["X"], "Y"),
        )
        .unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_parent_and_document_reference() {
        let attachment = base().attachment("a.png");
        assert_eq!(attachment.parent(), Some(base()));
        assert_eq!(attachment.document_reference(), base());
        assert!(EntityReference::wiki("w").parent().is_none());
    }
}
