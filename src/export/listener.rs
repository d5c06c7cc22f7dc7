//! The listener turning an event stream into a package.

use super::builder::TreeBuilder;
use super::events::{ContentEvent, ExportEvent};
use super::options::ExportOptions;
use super::package::ExportPackage;
use super::path::document_path;
use super::resource::ResourceConverter;
use super::stats::ExportStats;
use crate::error::{Error, Result};
use crate::fetch::UrlFetcher;
use crate::model::{BlockKind, ContentBlock, EntityReference, Parameters, ResourceReference};
use crate::render::TemplateProcessor;
use crate::store::DocumentStore;
use std::io::{Seek, Write};

/// Metadata parameter naming the document included content comes from.
pub const SOURCE_PARAMETER: &str = "source";

/// Listener state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    InWiki,
    /// Nesting depth of open spaces
    InSpace(usize),
    /// Space depth to return to
    InDocument(usize),
}

impl State {
    fn describe(self) -> String {
        match self {
            State::Idle => "idle".to_string(),
            State::InWiki => "in a wiki".to_string(),
            State::InSpace(depth) => format!("in a space (depth {})", depth),
            State::InDocument(_) => "in a document".to_string(),
        }
    }

    fn after_space(depth: usize) -> Self {
        if depth == 0 {
            State::InWiki
        } else {
            State::InSpace(depth)
        }
    }
}

/// What an open content block means to the listener.
#[derive(Debug)]
enum Scope {
    /// A link and its converted target
    Link(ResourceReference),
    /// Content resolved against another document
    Base(EntityReference),
    Plain,
}

/// The document being accumulated.
struct OpenDocument {
    reference: EntityReference,
    builder: TreeBuilder,
    scopes: Vec<Scope>,
}

impl OpenDocument {
    /// Innermost base override.
    fn base(&self) -> Option<&EntityReference> {
        self.scopes.iter().rev().find_map(|scope| match scope {
            Scope::Base(base) => Some(base),
            _ => None,
        })
    }

    /// Innermost open link target.
    fn link(&self) -> Option<&ResourceReference> {
        self.scopes.iter().rev().find_map(|scope| match scope {
            Scope::Link(reference) => Some(reference),
            _ => None,
        })
    }
}

/// Drives one export: converts references as events arrive, renders each
/// finished document and writes it into the package.
///
/// States: `Idle → InWiki → InSpace(*) → InDocument`, and back. Events
/// arriving in the wrong state are rejected with
/// [`Error::UnexpectedEvent`].
pub struct ConverterListener<'a, W: Write + Seek> {
    package: ExportPackage<W>,
    converter: ResourceConverter<'a>,
    processor: &'a TemplateProcessor,
    options: &'a ExportOptions,
    state: State,
    document: Option<OpenDocument>,
    stats: ExportStats,
}

impl<'a, W: Write + Seek> ConverterListener<'a, W> {
    /// Create a new listener writing a package to `writer`.
    pub fn new(
        writer: W,
        store: &'a dyn DocumentStore,
        fetcher: &'a dyn UrlFetcher,
        processor: &'a TemplateProcessor,
        options: &'a ExportOptions,
    ) -> Self {
        Self {
            package: ExportPackage::new(writer, options.clone()),
            converter: ResourceConverter::new(store, fetcher, options),
            processor,
            options,
            state: State::Idle,
            document: None,
            stats: ExportStats::new(),
        }
    }

    /// The package under construction.
    pub fn package(&self) -> &ExportPackage<W> {
        &self.package
    }

    /// Statistics so far.
    pub fn stats(&self) -> ExportStats {
        let mut stats = self.stats.clone();
        stats.set_conversions(self.converter.counts());
        stats
    }

    /// Handle one event.
    pub fn on_event(&mut self, event: ExportEvent) -> Result<()> {
        let name = event.name();
        match (self.state, event) {
            (State::Idle, ExportEvent::BeginWiki { name }) => {
                log::debug!("Begin wiki {}", name);
                self.state = State::InWiki;
            }
            (State::InWiki, ExportEvent::EndWiki) => self.state = State::Idle,

            (State::InWiki, ExportEvent::BeginSpace { name }) => {
                log::debug!("Begin space {}", name);
                self.stats.add_space();
                self.state = State::InSpace(1);
            }
            (State::InSpace(depth), ExportEvent::BeginSpace { name }) => {
                log::debug!("Begin space {}", name);
                self.stats.add_space();
                self.state = State::InSpace(depth + 1);
            }
            (State::InSpace(depth), ExportEvent::EndSpace) => {
                self.state = State::after_space(depth - 1);
            }

            (State::InWiki, ExportEvent::BeginDocument { reference, .. }) => {
                self.begin_document(reference, 0)
            }
            (State::InSpace(depth), ExportEvent::BeginDocument { reference, .. }) => {
                self.begin_document(reference, depth)
            }
            (State::InDocument(_), ExportEvent::Content(event)) => self.on_content(event)?,
            (State::InDocument(depth), ExportEvent::EndDocument) => {
                self.end_document()?;
                self.state = State::after_space(depth);
            }

            (state, _) => {
                return Err(Error::UnexpectedEvent {
                    event: name,
                    state: state.describe(),
                })
            }
        }
        Ok(())
    }

    /// Write the master file and finish the package.
    ///
    /// Fails unless every opened wiki was closed.
    pub fn finish(self) -> Result<(W, ExportStats)> {
        if self.state != State::Idle {
            return Err(Error::UnexpectedEvent {
                event: "Finish",
                state: self.state.describe(),
            });
        }
        let stats = self.stats();
        let writer = self.package.close()?;
        Ok((writer, stats))
    }

    fn begin_document(&mut self, reference: EntityReference, depth: usize) {
        log::debug!("Begin document {}", reference);
        self.converter.set_current_document(Some(reference.clone()));
        self.document = Some(OpenDocument {
            reference,
            builder: TreeBuilder::new(),
            scopes: Vec::new(),
        });
        self.state = State::InDocument(depth);
    }

    fn on_content(&mut self, event: ContentEvent) -> Result<()> {
        let document = self
            .document
            .as_mut()
            .ok_or_else(|| Error::Other("No open document".to_string()))?;

        match event {
            ContentEvent::Begin { kind, parameters } => {
                let scope = match kind {
                    BlockKind::Metadata => metadata_scope(&parameters, document),
                    _ => Scope::Plain,
                };
                let base = document.base().cloned();
                let (kind, converted) =
                    convert_kind(&mut self.converter, &mut self.package, kind, base.as_ref());
                let scope = match converted {
                    Some(reference) => Scope::Link(reference),
                    None => scope,
                };
                document.scopes.push(scope);
                document.builder.begin(kind, parameters);
            }
            ContentEvent::End => {
                document.builder.end()?;
                if let Some(Scope::Link(reference)) = document.scopes.pop() {
                    log::trace!("End link {}", reference);
                }
            }
            ContentEvent::Leaf(block) => {
                let base = document.base().cloned();
                let ContentBlock {
                    kind,
                    parameters,
                    children,
                } = block;
                let (kind, _) =
                    convert_kind(&mut self.converter, &mut self.package, kind, base.as_ref());
                document.builder.leaf(ContentBlock {
                    kind,
                    parameters,
                    children,
                });
            }
        }
        Ok(())
    }

    fn end_document(&mut self) -> Result<()> {
        let document = self
            .document
            .take()
            .ok_or_else(|| Error::Other("No open document".to_string()))?;
        if let Some(link) = document.link() {
            log::warn!("Link to {} left open in {}", link, document.reference);
        }

        let blocks = document.builder.finish();
        let rendered = self
            .processor
            .render(&blocks, Some(&document.reference), self.options);

        let path = document_path(&document.reference);
        self.package.add_document(&path, &rendered.latex)?;
        self.converter.set_current_document(None);

        self.stats.add_document();
        self.stats.count_latex(&rendered.latex);
        self.stats.failed_block_count += rendered.failed_blocks;
        log::info!("Exported {} as {}.tex", document.reference, path);
        Ok(())
    }
}

/// Rewrite the reference of a link or image block.
///
/// Images are downloaded; links are not. Returns the converted link
/// target so it stays known while the link is open.
fn convert_kind<W: Write + Seek>(
    converter: &mut ResourceConverter<'_>,
    package: &mut ExportPackage<W>,
    kind: BlockKind,
    base: Option<&EntityReference>,
) -> (BlockKind, Option<ResourceReference>) {
    match kind {
        BlockKind::Link {
            reference,
            freestanding,
        } => {
            let reference = converter.convert(package, &reference, base, false);
            (
                BlockKind::Link {
                    reference: reference.clone(),
                    freestanding,
                },
                Some(reference),
            )
        }
        BlockKind::Image {
            reference,
            freestanding,
        } => {
            let reference = converter.convert(package, &reference, base, true);
            (
                BlockKind::Image {
                    reference,
                    freestanding,
                },
                None,
            )
        }
        other => (other, None),
    }
}

/// Scope of a metadata block: a `source` parameter switches the base
/// reference for the content inside.
fn metadata_scope(parameters: &Parameters, document: &OpenDocument) -> Scope {
    let Some(source) = parameters.get(SOURCE_PARAMETER) else {
        return Scope::Plain;
    };
    let base = document.base().unwrap_or(&document.reference);
    match EntityReference::resolve_document(source, base) {
        Ok(reference) => Scope::Base(reference),
        Err(e) => {
            log::warn!("Ignoring metadata source '{}': {}", source, e);
            Scope::Plain
        }
    }
}
