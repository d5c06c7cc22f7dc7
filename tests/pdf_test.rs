//! Integration tests for PDF compilation backends.
//!
//! The process backend is exercised with shell stand-ins for the LaTeX
//! compiler. Tests that need a real toolchain or container runtime are
//! ignored by default.

use std::io::Cursor;
use std::path::Path;

use wikitex::pdf::{unpack_package, DockerConverter, ProcessConverter, OUTPUT_FILE};
use wikitex::{ContentBlock, Exporter, PdfConverter, Space, WikiDocument, WikiTree};

fn sample_package(dir: &Path) {
    let mut tree = WikiTree::new("xwiki");
    let mut space = Space::new("Main");
    let mut doc = WikiDocument::new("WebHome");
    doc.add_block(ContentBlock::header(1, "Hello"));
    doc.add_block(ContentBlock::paragraph("A trivial document."));
    space.add_document(doc);
    tree.add_space(space);

    let (cursor, _) = Exporter::new()
        .offline()
        .export(&tree, Cursor::new(Vec::new()))
        .unwrap();
    let archive = dir.join("export.zip");
    std::fs::write(&archive, cursor.into_inner()).unwrap();
    unpack_package(&archive, &dir.join("package")).unwrap();
}

#[cfg(unix)]
#[test]
fn test_process_backend_happy_path() {
    let dir = tempfile::tempdir().unwrap();
    sample_package(dir.path());
    let package = dir.path().join("package");

    // Stand-in compiler: checks for the master file, then writes a PDF
    let converter = ProcessConverter::new(vec![
        "test -f index.tex && echo 'Output written on index.pdf'".to_string(),
        "printf '%%PDF-1.5\\n' > index.pdf".to_string(),
    ]);
    assert!(converter.is_ready());

    let result = converter.convert(&package).unwrap();
    assert_eq!(result.pdf, Some(package.join(OUTPUT_FILE)));
    assert!(result.logs.contains("Output written on index.pdf"));
    assert!(result.diagnostics().is_empty());
}

#[cfg(unix)]
#[test]
fn test_process_backend_failure_path() {
    let dir = tempfile::tempdir().unwrap();
    sample_package(dir.path());
    let package = dir.path().join("package");
    std::fs::write(package.join("index.tex"), "\\begin{document}\\foo").unwrap();

    // Stand-in compiler reporting the way pdflatex does
    let converter = ProcessConverter::new(vec![
        "grep -q documentclass index.tex || { printf '%s\\n' '! LaTeX Error: Missing \\begin{document}.'; exit 1; }"
            .to_string(),
        "touch index.pdf".to_string(),
    ]);

    let result = converter.convert(&package).unwrap();
    assert!(result.pdf.is_none());
    assert!(!package.join(OUTPUT_FILE).exists());
    assert_eq!(
        result.diagnostics(),
        vec!["! LaTeX Error: Missing \\begin{document}."]
    );
}

#[cfg(unix)]
#[test]
fn test_to_pdf_unpacks_and_compiles() {
    let dir = tempfile::tempdir().unwrap();
    sample_package(dir.path());

    let config = wikitex::PdfBackendConfig::new()
        .with_backend(wikitex::PdfBackend::Process)
        .with_commands(["cp index.tex index.pdf"]);
    let build = dir.path().join("build");
    let result = wikitex::to_pdf(dir.path().join("export.zip"), &build, &config).unwrap();

    assert!(result.is_success());
    assert!(build.join("index.tex").is_file());
}

#[test]
#[ignore = "needs pdflatex on PATH"]
fn test_process_backend_real_latex() {
    let dir = tempfile::tempdir().unwrap();
    sample_package(dir.path());
    let package = dir.path().join("package");

    let converter = ProcessConverter::new(vec![
        "pdflatex -interaction=nonstopmode -halt-on-error index.tex".to_string(),
    ]);
    let result = converter.convert(&package).unwrap();
    assert!(result.is_success(), "{}", result.logs);
}

#[test]
#[ignore = "needs a docker daemon and network access"]
fn test_docker_backend_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    sample_package(dir.path());
    let package = dir.path().join("package");

    let converter = DockerConverter::new(wikitex::pdf::DEFAULT_IMAGE);
    assert!(converter.is_ready());
    let result = converter.convert(&package).unwrap();
    assert!(result.is_success(), "{}", result.logs);

    std::fs::write(package.join("index.tex"), "\\documentclass{article}\\begin{document}\\foo")
        .unwrap();
    std::fs::remove_file(package.join(OUTPUT_FILE)).unwrap();
    let failed = converter.convert(&package).unwrap();
    assert!(failed.pdf.is_none());
    assert!(failed
        .diagnostics()
        .iter()
        .any(|line| line.contains("Undefined control sequence")));
}
