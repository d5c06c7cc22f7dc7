//! Export options and document selection.

use crate::error::{Error, Result};
use crate::model::EntityReference;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Presentation and scope options of one export.
///
/// Immutable once the export starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Document title
    pub title: Option<String>,

    /// Subtitle, printed under the title
    pub subtitle: Option<String>,

    /// Author
    pub author: Option<String>,

    /// Date on the cover page (`\today` when unset)
    pub date: Option<NaiveDate>,

    /// Emit `\maketitle`
    pub cover_page: bool,

    /// Emit `\tableofcontents`
    pub table_of_contents: bool,

    /// Emit `\listoffigures`
    pub list_of_figures: bool,

    /// Emit `\listoftables`
    pub list_of_tables: bool,

    /// LaTeX document class
    pub document_class: String,

    /// Documents that are part of this export
    pub scope: DocumentSelection,
}

impl ExportOptions {
    /// Create new export options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the subtitle.
    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    /// Set the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the cover page date.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Enable or disable the cover page.
    pub fn with_cover_page(mut self, enabled: bool) -> Self {
        self.cover_page = enabled;
        self
    }

    /// Enable or disable the table of contents.
    pub fn with_table_of_contents(mut self, enabled: bool) -> Self {
        self.table_of_contents = enabled;
        self
    }

    /// Enable or disable the list of figures.
    pub fn with_list_of_figures(mut self, enabled: bool) -> Self {
        self.list_of_figures = enabled;
        self
    }

    /// Enable or disable the list of tables.
    pub fn with_list_of_tables(mut self, enabled: bool) -> Self {
        self.list_of_tables = enabled;
        self
    }

    /// Set the document class.
    pub fn with_document_class(mut self, class: impl Into<String>) -> Self {
        self.document_class = class.into();
        self
    }

    /// Set the documents in scope.
    pub fn with_scope(mut self, scope: DocumentSelection) -> Self {
        self.scope = scope;
        self
    }

    /// Whether a document is part of this export.
    pub fn in_scope(&self, document: &EntityReference) -> bool {
        self.scope.includes(document)
    }

    /// Load options from a JSON file.
    pub fn from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            title: None,
            subtitle: None,
            author: None,
            date: None,
            cover_page: false,
            table_of_contents: false,
            list_of_figures: false,
            list_of_tables: false,
            document_class: "article".to_string(),
            scope: DocumentSelection::All,
        }
    }
}

/// Which documents of a wiki an export covers.
///
/// Patterns are document references (`Space.Page`, `wiki:Space.Page`) or
/// space prefixes ending in `.*` (`Space.*` selects everything below
/// `Space`). Patterns without a wiki part match in any wiki.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentSelection {
    /// Every document
    #[default]
    All,
    /// Documents matching any of the patterns
    Only(Vec<String>),
}

impl DocumentSelection {
    /// Check if a document should be included.
    pub fn includes(&self, document: &EntityReference) -> bool {
        match self {
            DocumentSelection::All => true,
            DocumentSelection::Only(patterns) => patterns
                .iter()
                .any(|p| pattern_matches(p, document).unwrap_or(false)),
        }
    }

    /// Parse a selection string (e.g. "all", "Main.WebHome,Blog.*").
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s == "all" {
            return Ok(DocumentSelection::All);
        }

        let probe = EntityReference::wiki("probe");
        let mut patterns = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            // Validate now so bad patterns fail early
            pattern_reference(part, &probe)?;
            patterns.push(part.to_string());
        }

        if patterns.is_empty() {
            return Err(Error::InvalidReference(s.to_string()));
        }
        Ok(DocumentSelection::Only(patterns))
    }
}

/// Resolve a pattern; the flag tells whether it is a space prefix.
fn pattern_reference(pattern: &str, base: &EntityReference) -> Result<(EntityReference, bool)> {
    match pattern.strip_suffix(".*") {
        // Resolve a placeholder page to reuse the document syntax
        Some(prefix) => Ok((
            EntityReference::resolve_document(&format!("{}.X", prefix), base)?,
            true,
        )),
        None => Ok((EntityReference::resolve_document(pattern, base)?, false)),
    }
}

fn pattern_matches(pattern: &str, document: &EntityReference) -> Result<bool> {
    let base = EntityReference::wiki(document.wiki_name());
    let (target, is_prefix) = pattern_reference(pattern, &base)?;
    if target.wiki_name() != document.wiki_name() {
        return Ok(false);
    }
    if is_prefix {
        Ok(document.spaces().starts_with(&target.spaces()))
    } else {
        Ok(target == document.document_reference())
    }
}
