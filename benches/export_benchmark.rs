//! Benchmarks for wikitex export performance.
//!
//! Run with: cargo bench
//!
//! These benchmarks use synthetic wiki trees built in memory.

use std::io::Cursor;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use wikitex::export::path;
use wikitex::render::to_latex;
use wikitex::{
    Attachment, BlockKind, ContentBlock, EntityReference, ExportOptions, Exporter,
    ResourceReference, Space, WikiDocument, WikiTree,
};

/// Creates a document with headings, paragraphs, a table and an image.
fn create_document(name: &str, sections: usize) -> WikiDocument {
    let mut doc = WikiDocument::new(name).with_title(name);
    doc.add_attachment(Attachment::from_bytes("diagram.png", vec![0u8; 4096]));

    for i in 0..sections {
        doc.add_block(ContentBlock::header(1, &format!("Section {}", i + 1)));
        doc.add_block(ContentBlock::paragraph(
            "Benchmark content for wikitex export with 50% escapes & specials_here.",
        ));

        let rows = (0..4)
            .map(|r| {
                let cells = (0..3)
                    .map(|c| {
                        ContentBlock::with_children(
                            BlockKind::TableCell,
                            ContentBlock::text(&format!("r{}c{}", r, c)),
                        )
                    })
                    .collect();
                ContentBlock::with_children(BlockKind::TableRow, cells)
            })
            .collect();
        doc.add_block(ContentBlock::with_children(BlockKind::Table, rows));

        doc.add_block(ContentBlock::new(BlockKind::Image {
            reference: ResourceReference::attachment("diagram.png"),
            freestanding: false,
        }));
    }
    doc
}

/// Creates a tree with the given number of documents in one space.
fn create_tree(documents: usize) -> WikiTree {
    let mut tree = WikiTree::new("xwiki");
    let mut space = Space::new("Bench");
    for i in 0..documents {
        space.add_document(create_document(&format!("Page{}", i), 10));
    }
    tree.add_space(space);
    tree
}

/// Benchmark path serialization.
fn bench_path_serialization(c: &mut Criterion) {
    let attachment = EntityReference::document("xwiki", &["Main", "Sub Space"], "Page")
        .attachment("ünïcode file.png");

    c.bench_function("serialize_attachment_path", |b| {
        b.iter(|| path::attachment_path(black_box(&attachment)));
    });
}

/// Benchmark rendering a single document.
fn bench_rendering(c: &mut Criterion) {
    let doc = create_document("Render", 20);
    let options = ExportOptions::default();

    c.bench_function("render_20_sections", |b| {
        b.iter(|| to_latex(black_box(&doc.content), &options));
    });
}

/// Benchmark full exports at various sizes.
fn bench_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("export");

    for documents in [1, 10, 50].iter() {
        let tree = create_tree(*documents);
        let exporter = Exporter::new().offline();

        group.bench_function(format!("{}_documents", documents), |b| {
            b.iter(|| {
                exporter
                    .export(black_box(&tree), Cursor::new(Vec::new()))
                    .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_path_serialization,
    bench_rendering,
    bench_export,
);
criterion_main!(benches);
