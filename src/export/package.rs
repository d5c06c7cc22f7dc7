//! The zip package under construction.

use super::options::ExportOptions;
use super::path::INDEX_FILE;
use crate::error::Result;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::io::{self, Read, Seek, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Destination of binary assets found while converting references.
pub trait PackageSink {
    /// Whether an entry exists at `path`.
    fn contains(&self, path: &str) -> bool;

    /// Store bytes at `path` unless something is already there.
    ///
    /// Returns `false` when the path was already taken.
    fn store(&mut self, path: &str, content: &mut dyn Read) -> Result<bool>;
}

/// One export's archive.
///
/// Every path is written at most once; the first writer wins. Rendered
/// documents are recorded as includes of the master file, which
/// [`close`](ExportPackage::close) writes.
pub struct ExportPackage<W: Write + Seek> {
    zip: ZipWriter<W>,
    stored: HashSet<String>,
    includes: Vec<String>,
    options: ExportOptions,
}

impl<W: Write + Seek> ExportPackage<W> {
    /// Create a new package writing to `writer`.
    pub fn new(writer: W, options: ExportOptions) -> Self {
        Self {
            zip: ZipWriter::new(writer),
            stored: HashSet::new(),
            includes: Vec::new(),
            options,
        }
    }

    /// Export options the master file is generated from.
    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Included document paths, in insertion order.
    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    /// Number of entries written so far.
    pub fn entry_count(&self) -> usize {
        self.stored.len()
    }

    /// Write a rendered document as `<path>.tex` and include it.
    pub fn add_document(&mut self, path: &str, latex: &str) -> Result<()> {
        let entry = format!("{}.tex", path);
        if self.stored.contains(&entry) {
            log::warn!("Document {} already written, keeping the first", entry);
            return Ok(());
        }
        self.write_entry(&entry, |w| w.write_all(latex.as_bytes()))?;
        self.includes.push(path.to_string());
        Ok(())
    }

    /// Write the master file, finish the archive and return the writer.
    pub fn close(mut self) -> Result<W> {
        let master = self.master_file();
        self.write_entry(INDEX_FILE, |w| w.write_all(master.as_bytes()))?;
        Ok(self.zip.finish()?)
    }

    /// Text of the master file.
    pub fn master_file(&self) -> String {
        let options = &self.options;
        let mut out = String::new();

        let _ = writeln!(out, "\\documentclass{{{}}}", options.document_class);
        out.push_str("\\usepackage[utf8]{inputenc}\n");
        out.push_str("\\usepackage{graphicx}\n");
        out.push_str("\\usepackage{hyperref}\n");
        out.push_str("\\usepackage[normalem]{ulem}\n");

        // \maketitle refuses to run without a \title
        if options.title.is_some() || options.cover_page {
            let mut full = options
                .title
                .as_deref()
                .map(crate::render::escape)
                .unwrap_or_default();
            if let Some(ref subtitle) = options.subtitle {
                let _ = write!(full, "\\\\\\large {}", crate::render::escape(subtitle));
            }
            let _ = writeln!(out, "\\title{{{}}}", full);
        }
        if let Some(ref author) = options.author {
            let _ = writeln!(out, "\\author{{{}}}", crate::render::escape(author));
        }
        match options.date {
            Some(date) => {
                let _ = writeln!(out, "\\date{{{}}}", date.format("%B %-d, %Y"));
            }
            None if options.cover_page => out.push_str("\\date{\\today}\n"),
            None => {}
        }

        out.push('\n');
        out.push_str("\\begin{document}\n");
        if options.cover_page {
            out.push_str("\\maketitle\n");
        }
        if options.table_of_contents {
            out.push_str("\\tableofcontents\n");
        }
        if options.list_of_figures {
            out.push_str("\\listoffigures\n");
        }
        if options.list_of_tables {
            out.push_str("\\listoftables\n");
        }
        for include in &self.includes {
            let _ = writeln!(out, "\\include{{{}}}", include);
        }
        out.push_str("\\end{document}\n");
        out
    }

    /// Write one entry; a failing body aborts the entry so the archive
    /// stays readable.
    fn write_entry<F>(&mut self, path: &str, body: F) -> Result<()>
    where
        F: FnOnce(&mut ZipWriter<W>) -> io::Result<()>,
    {
        self.zip.start_file(path, SimpleFileOptions::default())?;
        if let Err(e) = body(&mut self.zip) {
            if let Err(abort) = self.zip.abort_file() {
                log::warn!("Failed to abort entry {}: {}", path, abort);
            }
            return Err(e.into());
        }
        self.stored.insert(path.to_string());
        Ok(())
    }
}

impl<W: Write + Seek> PackageSink for ExportPackage<W> {
    fn contains(&self, path: &str) -> bool {
        self.stored.contains(path)
    }

    fn store(&mut self, path: &str, content: &mut dyn Read) -> Result<bool> {
        if self.stored.contains(path) {
            return Ok(false);
        }
        self.write_entry(path, |w| io::copy(content, w).map(|_| ()))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read_entry(bytes: Vec<u8>, name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut entry = archive.by_name(name).unwrap();
        let mut text = String::new();
        entry.read_to_string(&mut text).unwrap();
        text
    }

    #[test]
    fn test_store_once() {
        let mut package = ExportPackage::new(Cursor::new(Vec::new()), ExportOptions::default());
        assert!(package.store("files/a.txt", &mut "first".as_bytes()).unwrap());
        assert!(!package.store("files/a.txt", &mut "second".as_bytes()).unwrap());
        assert!(package.contains("files/a.txt"));

        let bytes = package.close().unwrap().into_inner();
        assert_eq!(read_entry(bytes, "files/a.txt"), "first");
    }

    #[test]
    fn test_master_file_minimal() {
        let mut package = ExportPackage::new(Cursor::new(Vec::new()), ExportOptions::default());
        package.add_document("w/A1", "A").unwrap();
        package.add_document("w/B2", "B").unwrap();

        let bytes = package.close().unwrap().into_inner();
        let index = read_entry(bytes.clone(), "index.tex");
        assert!(index.starts_with("\\documentclass{article}\n\\usepackage[utf8]{inputenc}\n"));
        assert!(index.contains("\n\\begin{document}\n\\include{w/A1}\n\\include{w/B2}\n\\end{document}\n"));
        assert!(!index.contains("\\maketitle"));
        assert_eq!(read_entry(bytes, "w/A1.tex"), "A");
    }

    #[test]
    fn test_master_file_front_matter() {
        let options = ExportOptions::new()
            .with_title("Manual")
            .with_author("Docs Team")
            .with_cover_page(true)
            .with_table_of_contents(true)
            .with_list_of_tables(true)
            .with_document_class("report");
        let package = ExportPackage::new(Cursor::new(Vec::new()), options);
        let master = package.master_file();

        assert!(master.starts_with("\\documentclass{report}"));
        assert!(master.contains("\\title{Manual}"));
        assert!(master.contains("\\author{Docs Team}"));
        assert!(master.contains("\\date{\\today}"));
        assert!(master.contains("\\maketitle\n\\tableofcontents\n\\listoftables\n"));
        assert!(!master.contains("\\listoffigures"));
    }

    #[test]
    fn test_cover_page_without_title() {
        let options = ExportOptions::new().with_cover_page(true);
        let package = ExportPackage::new(Cursor::new(Vec::new()), options);
        let master = package.master_file();

        assert!(master.contains("\\title{}\n"));
        let title = master.find("\\title{}").unwrap();
        assert!(title < master.find("\\maketitle").unwrap());

        // No cover page, no title
        let package = ExportPackage::new(Cursor::new(Vec::new()), ExportOptions::default());
        assert!(!package.master_file().contains("\\title"));
    }

    #[test]
    fn test_failed_entry_is_not_recorded() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "broken pipe"))
            }
        }

        let mut package = ExportPackage::new(Cursor::new(Vec::new()), ExportOptions::default());
        assert!(package.store("files/bad.bin", &mut Broken).is_err());
        assert!(!package.contains("files/bad.bin"));
        assert!(package.store("files/ok.bin", &mut "ok".as_bytes()).unwrap());

        let bytes = package.close().unwrap().into_inner();
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert!(archive.file_names().any(|n| n == "files/ok.bin"));
        assert!(!archive.file_names().any(|n| n == "files/bad.bin"));
    }
}
