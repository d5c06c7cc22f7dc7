//! Statistics collected during an export.

use super::resource::ConversionCounts;
use serde::{Deserialize, Serialize};

/// Statistics of one export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportStats {
    /// Documents rendered into the package
    pub document_count: u32,

    /// Spaces visited
    pub space_count: u32,

    /// Attachments stored
    pub attachment_count: u32,

    /// Remote resources downloaded
    pub download_count: u32,

    /// References left unconverted after a failure
    pub degraded_reference_count: u32,

    /// Blocks whose template failed
    pub failed_block_count: u32,

    /// Words in the rendered documents (whitespace-separated tokens)
    pub word_count: u32,

    /// Bytes of LaTeX written
    pub latex_bytes: u64,
}

impl ExportStats {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment document count.
    pub fn add_document(&mut self) {
        self.document_count += 1;
    }

    /// Increment space count.
    pub fn add_space(&mut self) {
        self.space_count += 1;
    }

    /// Account for one rendered document's text.
    pub fn count_latex(&mut self, latex: &str) {
        self.word_count += latex.split_whitespace().count() as u32;
        self.latex_bytes += latex.len() as u64;
    }

    /// Take over resource conversion counters.
    pub fn set_conversions(&mut self, counts: ConversionCounts) {
        self.attachment_count = counts.attachments;
        self.download_count = counts.downloads;
        self.degraded_reference_count = counts.degraded;
    }

    /// Whether anything was degraded or dropped.
    pub fn has_warnings(&self) -> bool {
        self.degraded_reference_count > 0 || self.failed_block_count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_latex() {
        let mut stats = ExportStats::new();
        stats.count_latex("\\section{Intro}\n\nHello world\n");
        assert_eq!(stats.word_count, 3);
        assert_eq!(stats.latex_bytes, 29);
    }

    #[test]
    fn test_warnings() {
        let mut stats = ExportStats::new();
        stats.add_document();
        assert!(!stats.has_warnings());

        stats.set_conversions(ConversionCounts {
            attachments: 2,
            downloads: 0,
            degraded: 1,
        });
        assert_eq!(stats.attachment_count, 2);
        assert!(stats.has_warnings());
    }
}
