//! Rewriting resource references into package-relative ones.
//!
//! Conversion is best-effort: whatever goes wrong, the caller gets a
//! usable reference back (the original one when nothing better exists).

use super::options::ExportOptions;
use super::package::PackageSink;
use super::path::{attachment_path, download_path};
use crate::error::{Error, Result};
use crate::fetch::UrlFetcher;
use crate::model::{EntityReference, ResourceReference, ResourceType};
use crate::store::DocumentStore;
use url::Url;

/// Outcome of converting one reference.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionOutcome {
    /// A rewritten reference
    Converted(ResourceReference),
    /// The reference needs no conversion and is used as is
    Unchanged,
    /// Conversion failed; the original reference is used
    Degraded(String),
}

impl ConversionOutcome {
    /// The reference to render, falling back to `original`.
    pub fn into_reference(self, original: &ResourceReference) -> ResourceReference {
        match self {
            ConversionOutcome::Converted(reference) => reference,
            ConversionOutcome::Unchanged | ConversionOutcome::Degraded(_) => original.clone(),
        }
    }

    /// Whether conversion failed.
    pub fn is_degraded(&self) -> bool {
        matches!(self, ConversionOutcome::Degraded(_))
    }
}

/// Counters kept by a [`ResourceConverter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionCounts {
    /// Attachments written into the package
    pub attachments: u32,
    /// Remote resources downloaded into the package
    pub downloads: u32,
    /// References that fell back to the original
    pub degraded: u32,
}

/// Resolves references against the store and stores their bytes in the
/// package, once per derived path.
pub struct ResourceConverter<'a> {
    store: &'a dyn DocumentStore,
    fetcher: &'a dyn UrlFetcher,
    options: &'a ExportOptions,
    current: Option<EntityReference>,
    counts: ConversionCounts,
}

impl<'a> ResourceConverter<'a> {
    /// Create a new converter.
    pub fn new(
        store: &'a dyn DocumentStore,
        fetcher: &'a dyn UrlFetcher,
        options: &'a ExportOptions,
    ) -> Self {
        Self {
            store,
            fetcher,
            options,
            current: None,
            counts: ConversionCounts::default(),
        }
    }

    /// Set the document being rendered.
    pub fn set_current_document(&mut self, document: Option<EntityReference>) {
        self.current = document.map(|d| d.document_reference());
    }

    /// The document being rendered.
    pub fn current_document(&self) -> Option<&EntityReference> {
        self.current.as_ref()
    }

    /// Counters so far.
    pub fn counts(&self) -> ConversionCounts {
        self.counts
    }

    /// Convert a reference, returning the one to render.
    ///
    /// `base` overrides the current document for relative resolution;
    /// `force_download` localizes external URLs.
    pub fn convert(
        &mut self,
        sink: &mut dyn PackageSink,
        reference: &ResourceReference,
        base: Option<&EntityReference>,
        force_download: bool,
    ) -> ResourceReference {
        self.try_convert(sink, reference, base, force_download)
            .into_reference(reference)
    }

    /// Convert a reference, reporting what happened.
    pub fn try_convert(
        &mut self,
        sink: &mut dyn PackageSink,
        reference: &ResourceReference,
        base: Option<&EntityReference>,
        force_download: bool,
    ) -> ConversionOutcome {
        let outcome = match self.dispatch(sink, reference, base, force_download) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("Failed to convert reference [{}]: {}", reference, e);
                ConversionOutcome::Degraded(e.to_string())
            }
        };
        if outcome.is_degraded() {
            self.counts.degraded += 1;
        }
        outcome
    }

    fn dispatch(
        &mut self,
        sink: &mut dyn PackageSink,
        reference: &ResourceReference,
        base: Option<&EntityReference>,
        force_download: bool,
    ) -> Result<ConversionOutcome> {
        match reference.resource_type {
            ResourceType::Attachment => self.convert_attachment(sink, reference, base),
            ResourceType::Url if force_download => self.download(sink, reference),
            ResourceType::Document => self.convert_document(reference, base),
            ResourceType::Path if reference.reference.starts_with('/') => {
                self.convert_server_path(reference, base)
            }
            ResourceType::Data => {
                log::debug!("No conversion defined for data reference");
                Ok(ConversionOutcome::Unchanged)
            }
            ResourceType::Url | ResourceType::Path | ResourceType::Mailto => {
                Ok(ConversionOutcome::Unchanged)
            }
        }
    }

    fn base<'b>(&'b self, base: Option<&'b EntityReference>) -> Result<&'b EntityReference> {
        base.or(self.current.as_ref())
            .ok_or_else(|| Error::Other("No document to resolve against".to_string()))
    }

    fn convert_attachment(
        &mut self,
        sink: &mut dyn PackageSink,
        reference: &ResourceReference,
        base: Option<&EntityReference>,
    ) -> Result<ConversionOutcome> {
        let requested =
            EntityReference::resolve_attachment(&reference.reference, self.base(base)?)?;

        // Use the stored name; the requested one may lack its extension
        let canonical = match self.store.find_attachment(&requested) {
            Some(canonical) => canonical,
            None => {
                log::warn!("Attachment {} not found, keeping reference", requested);
                return Ok(ConversionOutcome::Degraded(format!(
                    "Attachment {} not found",
                    requested
                )));
            }
        };

        let path = attachment_path(&canonical);
        if !sink.contains(&path) {
            let store = self.store;
            let mut content = store.open_attachment(&canonical)?;
            if sink.store(&path, &mut content)? {
                self.counts.attachments += 1;
            }
        }
        Ok(ConversionOutcome::Converted(
            reference.converted(ResourceType::Path, path),
        ))
    }

    fn download(
        &mut self,
        sink: &mut dyn PackageSink,
        reference: &ResourceReference,
    ) -> Result<ConversionOutcome> {
        let url = Url::parse(&reference.reference)?;
        let path = download_path(&url);
        if !sink.contains(&path) {
            let mut content = self.fetcher.open(&url)?;
            if sink.store(&path, &mut content)? {
                self.counts.downloads += 1;
            }
        }
        Ok(ConversionOutcome::Converted(
            reference.converted(ResourceType::Path, path),
        ))
    }

    fn convert_document(
        &mut self,
        reference: &ResourceReference,
        base: Option<&EntityReference>,
    ) -> Result<ConversionOutcome> {
        let target = EntityReference::resolve_document(&reference.reference, self.base(base)?)?;

        if self.current.as_ref() == Some(&target) {
            return Ok(ConversionOutcome::Converted(
                reference.converted(ResourceType::Document, ""),
            ));
        }

        if self.options.in_scope(&target) {
            log::debug!(
                "{} is part of the export; inlining is not implemented, linking externally",
                target
            );
        }

        let mut url = self.store.view_url(&target)?;
        if let Some(query) = reference.query_string() {
            url.push('?');
            url.push_str(query);
        }
        Ok(ConversionOutcome::Converted(
            reference.converted(ResourceType::Url, url),
        ))
    }

    fn convert_server_path(
        &mut self,
        reference: &ResourceReference,
        base: Option<&EntityReference>,
    ) -> Result<ConversionOutcome> {
        let wiki = self.base(base)?.wiki_name().to_string();
        let server = self
            .store
            .server_url(&wiki)
            .ok_or_else(|| Error::Other(format!("No server URL for wiki '{}'", wiki)))?;
        let url = Url::parse(&server)?.join(&reference.reference)?;
        Ok(ConversionOutcome::Converted(
            reference.converted(ResourceType::Url, url.to_string()),
        ))
    }
}
