//! Resource references carried by link and image blocks.

use super::Parameters;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Parameter holding the anchor fragment of a reference.
pub const ANCHOR: &str = "anchor";

/// Parameter holding the query string of a reference.
pub const QUERY_STRING: &str = "queryString";

/// What a block points to.
///
/// References are never mutated once built: conversion produces a new
/// value through [`ResourceReference::converted`], which copies the
/// original parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceReference {
    /// Raw reference string
    pub reference: String,

    /// Reference type
    #[serde(rename = "type")]
    pub resource_type: ResourceType,

    /// Query string, anchor and other parameters
    #[serde(default, skip_serializing_if = "Parameters::is_empty")]
    pub parameters: Parameters,
}

impl ResourceReference {
    /// Create a new reference without parameters.
    pub fn new(resource_type: ResourceType, reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            resource_type,
            parameters: Parameters::new(),
        }
    }

    /// Create an attachment reference.
    pub fn attachment(reference: impl Into<String>) -> Self {
        Self::new(ResourceType::Attachment, reference)
    }

    /// Create an inter-document reference.
    pub fn document(reference: impl Into<String>) -> Self {
        Self::new(ResourceType::Document, reference)
    }

    /// Create an external URL reference.
    pub fn url(reference: impl Into<String>) -> Self {
        Self::new(ResourceType::Url, reference)
    }

    /// Create a package-relative path reference.
    pub fn path(reference: impl Into<String>) -> Self {
        Self::new(ResourceType::Path, reference)
    }

    /// Builder-style parameter.
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key, value);
        self
    }

    /// Set the anchor fragment.
    pub fn with_anchor(self, anchor: impl Into<String>) -> Self {
        self.with_parameter(ANCHOR, anchor)
    }

    /// Anchor fragment, if any.
    pub fn anchor(&self) -> Option<&str> {
        self.parameters.get(ANCHOR).filter(|a| !a.is_empty())
    }

    /// Query string, if any.
    pub fn query_string(&self) -> Option<&str> {
        self.parameters.get(QUERY_STRING).filter(|q| !q.is_empty())
    }

    /// A new reference of another type keeping this one's parameters.
    pub fn converted(&self, resource_type: ResourceType, reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            resource_type,
            parameters: self.parameters.clone(),
        }
    }

    /// Whether this is a reference to the document being rendered.
    pub fn is_self_reference(&self) -> bool {
        self.resource_type == ResourceType::Document && self.reference.is_empty()
    }
}

impl fmt::Display for ResourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.reference)
    }
}

impl FromStr for ResourceReference {
    type Err = String;

    /// Parse the `type:reference` form, e.g. `attach:image.png`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, rest) = s
            .split_once(':')
            .ok_or_else(|| format!("Missing reference type in '{}'", s))?;
        let resource_type: ResourceType = prefix.parse()?;
        // Bare URLs keep their scheme
        let reference = match resource_type {
            ResourceType::Url if prefix != "url" => s.to_string(),
            _ => rest.to_string(),
        };
        Ok(Self::new(resource_type, reference))
    }
}

/// Type of a resource reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// Attachment of a wiki document
    #[serde(alias = "attach")]
    Attachment,
    /// Another wiki document
    #[serde(alias = "doc")]
    Document,
    /// External URL
    Url,
    /// Mail address
    Mailto,
    /// Opaque data URI
    Data,
    /// Filesystem path (or package-relative path after conversion)
    Path,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceType::Attachment => write!(f, "attach"),
            ResourceType::Document => write!(f, "doc"),
            ResourceType::Url => write!(f, "url"),
            ResourceType::Mailto => write!(f, "mailto"),
            ResourceType::Data => write!(f, "data"),
            ResourceType::Path => write!(f, "path"),
        }
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "attach" | "attachment" => Ok(ResourceType::Attachment),
            "doc" | "document" => Ok(ResourceType::Document),
            "url" | "http" | "https" => Ok(ResourceType::Url),
            "mailto" => Ok(ResourceType::Mailto),
            "data" => Ok(ResourceType::Data),
            "path" => Ok(ResourceType::Path),
            other => Err(format!("Unknown reference type: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converted_copies_parameters() {
        let original = ResourceReference::attachment("image.png")
            .with_parameter(QUERY_STRING, "width=100")
            .with_anchor("top");
        let converted = original.converted(ResourceType::Path, "files/attachments/x.png");

        assert_eq!(converted.resource_type, ResourceType::Path);
        assert_eq!(converted.query_string(), Some("width=100"));
        assert_eq!(converted.anchor(), Some("top"));
        assert_eq!(original.reference, "image.png");
    }

    #[test]
    fn test_parse() {
        let r: ResourceReference = "attach:Space.Page@file.txt".parse().unwrap();
        assert_eq!(r.resource_type, ResourceType::Attachment);
        assert_eq!(r.reference, "Space.Page@file.txt");

        let r: ResourceReference = "https://example.com/a.png".parse().unwrap();
        assert_eq!(r.resource_type, ResourceType::Url);
        assert_eq!(r.reference, "https://example.com/a.png");

        assert!("nope".parse::<ResourceReference>().is_err());
    }

    #[test]
    fn test_self_reference() {
        assert!(ResourceReference::document("").is_self_reference());
        assert!(!ResourceReference::document("Main.WebHome").is_self_reference());
    }
}
