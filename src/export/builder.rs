//! Rebuilding a block forest from content events.

use super::events::ContentEvent;
use crate::error::{Error, Result};
use crate::model::{BlockKind, ContentBlock, Parameters};

/// Accumulates content events into an in-memory block tree.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    open: Vec<ContentBlock>,
    roots: Vec<ContentBlock>,
}

impl TreeBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event.
    pub fn push(&mut self, event: ContentEvent) -> Result<()> {
        match event {
            ContentEvent::Begin { kind, parameters } => {
                self.begin(kind, parameters);
                Ok(())
            }
            ContentEvent::End => self.end(),
            ContentEvent::Leaf(block) => {
                self.leaf(block);
                Ok(())
            }
        }
    }

    /// Open a block.
    pub fn begin(&mut self, kind: BlockKind, parameters: Parameters) {
        let mut block = ContentBlock::new(kind);
        block.parameters = parameters;
        self.open.push(block);
    }

    /// Close the innermost open block.
    pub fn end(&mut self) -> Result<()> {
        let block = self.open.pop().ok_or(Error::UnexpectedEvent {
            event: "End",
            state: "no block is open".to_string(),
        })?;
        self.attach(block);
        Ok(())
    }

    /// Add a complete block.
    pub fn leaf(&mut self, block: ContentBlock) {
        self.attach(block);
    }

    /// Kind of the innermost open block.
    pub fn current(&self) -> Option<&BlockKind> {
        self.open.last().map(|b| &b.kind)
    }

    /// Number of open blocks.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Close any open blocks and return the forest.
    pub fn finish(mut self) -> Vec<ContentBlock> {
        if !self.open.is_empty() {
            log::warn!("{} blocks left open at end of document", self.open.len());
            while let Some(block) = self.open.pop() {
                self.attach(block);
            }
        }
        self.roots
    }

    fn attach(&mut self, block: ContentBlock) {
        match self.open.last_mut() {
            Some(parent) => parent.children.push(block),
            None => self.roots.push(block),
        }
    }
}
