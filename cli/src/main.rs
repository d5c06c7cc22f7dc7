//! wikitex CLI - wiki to LaTeX export tool

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use wikitex::export::DocumentWalker;
use wikitex::{
    DocumentSelection, ExportOptions, ExportStats, Exporter, PdfBackend, PdfBackendConfig,
    WikiTree,
};

#[derive(Parser)]
#[command(name = "wikitex")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Export wiki page trees to LaTeX packages and PDF", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a wiki tree (JSON) to a LaTeX package (zip)
    Export {
        /// Wiki tree JSON file
        #[arg(value_name = "TREE")]
        input: PathBuf,

        /// Output archive (defaults to <TREE stem>.zip)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Export options JSON file; flags below override it
        #[arg(long, value_name = "FILE")]
        options: Option<PathBuf>,

        /// Documents to export (e.g. "Main.WebHome,Blog.*")
        #[arg(long, default_value = "all")]
        scope: String,

        /// Document title
        #[arg(long)]
        title: Option<String>,

        /// Subtitle printed under the title
        #[arg(long)]
        subtitle: Option<String>,

        /// Author
        #[arg(long)]
        author: Option<String>,

        /// Date printed on the cover page (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        /// Emit a cover page
        #[arg(long)]
        cover_page: bool,

        /// Emit a table of contents
        #[arg(long)]
        toc: bool,

        /// Emit a list of figures
        #[arg(long)]
        list_of_figures: bool,

        /// Emit a list of tables
        #[arg(long)]
        list_of_tables: bool,

        /// LaTeX document class
        #[arg(long, value_name = "CLASS")]
        document_class: Option<String>,

        /// Do not download remote images
        #[arg(long)]
        offline: bool,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compile a LaTeX package (zip or directory) to PDF
    Pdf {
        /// Package archive or unpacked directory
        #[arg(value_name = "PACKAGE")]
        input: PathBuf,

        /// Where to copy the PDF (defaults to <PACKAGE stem>.pdf)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Directory to unpack an archive into
        #[arg(long, value_name = "DIR")]
        work_dir: Option<PathBuf>,

        #[command(flatten)]
        backend: BackendArgs,

        /// Save the compiler logs to this file
        #[arg(long, value_name = "FILE")]
        log_file: Option<PathBuf>,
    },

    /// Check whether a PDF backend is usable
    Check {
        #[command(flatten)]
        backend: BackendArgs,
    },

    /// Show a summary of a wiki tree
    Info {
        /// Wiki tree JSON file
        #[arg(value_name = "TREE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

#[derive(clap::Args)]
struct BackendArgs {
    /// Backend configuration JSON file; flags below override it
    #[arg(long, value_name = "FILE")]
    backend_config: Option<PathBuf>,

    /// PDF backend
    #[arg(long, value_enum)]
    backend: Option<BackendKind>,

    /// Compiler image of the docker backend
    #[arg(long, env = "WIKITEX_IMAGE")]
    image: Option<String>,

    /// Command line of the process backend (repeatable)
    #[arg(long = "command", value_name = "CMD")]
    commands: Vec<String>,

    /// Timeout of the process backend in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    /// Throwaway docker container
    Docker,
    /// Local processes
    Process,
}

impl From<BackendKind> for PdfBackend {
    fn from(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Docker => PdfBackend::Docker,
            BackendKind::Process => PdfBackend::Process,
        }
    }
}

impl BackendArgs {
    fn config(&self) -> Result<PdfBackendConfig, Box<dyn std::error::Error>> {
        let mut config = match self.backend_config {
            Some(ref path) => serde_json::from_reader(File::open(path)?)?,
            None => PdfBackendConfig::default(),
        };
        if let Some(kind) = self.backend {
            config = config.with_backend(kind.into());
        }
        if let Some(ref image) = self.image {
            config = config.with_image(image.clone());
        }
        if !self.commands.is_empty() {
            config = config.with_commands(self.commands.iter().cloned());
        }
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("Invalid date '{}': {}", s, e))
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Export {
            input,
            output,
            options,
            scope,
            title,
            subtitle,
            author,
            date,
            cover_page,
            toc,
            list_of_figures,
            list_of_tables,
            document_class,
            offline,
            json,
        } => build_options(options.as_deref(), &scope).and_then(|mut opts| {
            if let Some(title) = title {
                opts = opts.with_title(title);
            }
            if let Some(subtitle) = subtitle {
                opts = opts.with_subtitle(subtitle);
            }
            if let Some(author) = author {
                opts = opts.with_author(author);
            }
            if let Some(date) = date {
                opts = opts.with_date(date);
            }
            if let Some(class) = document_class {
                opts = opts.with_document_class(class);
            }
            opts.cover_page |= cover_page;
            opts.table_of_contents |= toc;
            opts.list_of_figures |= list_of_figures;
            opts.list_of_tables |= list_of_tables;
            cmd_export(&input, output.as_deref(), opts, offline, json)
        }),
        Commands::Pdf {
            input,
            output,
            work_dir,
            backend,
            log_file,
        } => cmd_pdf(
            &input,
            output.as_deref(),
            work_dir.as_deref(),
            &backend,
            log_file.as_deref(),
        ),
        Commands::Check { backend } => cmd_check(&backend),
        Commands::Info { input } => cmd_info(&input),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn build_options(
    path: Option<&Path>,
    scope: &str,
) -> Result<ExportOptions, Box<dyn std::error::Error>> {
    let options = match path {
        Some(path) => ExportOptions::from_path(path)?,
        None => ExportOptions::default(),
    };
    // An options file scope only yields to an explicit --scope
    if scope == "all" {
        return Ok(options);
    }
    Ok(options.with_scope(DocumentSelection::parse(scope)?))
}

fn cmd_export(
    input: &Path,
    output: Option<&Path>,
    options: ExportOptions,
    offline: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input.with_extension("zip"));

    let tree = WikiTree::from_path(input)?;
    let total = DocumentWalker::new(&tree, &options.scope).document_count();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut exporter = Exporter::new().with_options(options);
    if offline {
        exporter = exporter.offline();
    }

    let file = File::create(&output)?;
    let (writer, stats) =
        exporter.export_with_progress(&tree, BufWriter::new(file), |document| {
            pb.set_message(document.to_string());
            pb.inc(1);
        })?;
    writer.into_inner().map_err(|e| e.into_error())?;
    pb.finish_with_message("Done!");

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_stats(&output, &stats);
    }
    Ok(())
}

fn print_stats(output: &Path, stats: &ExportStats) {
    println!("\n{} {}", "Saved to".green(), output.display());
    println!("  {} {} documents", "├─".dimmed(), stats.document_count);
    println!("  {} {} attachments", "├─".dimmed(), stats.attachment_count);
    println!("  {} {} downloads", "├─".dimmed(), stats.download_count);
    println!("  {} {} words", "└─".dimmed(), stats.word_count);

    if stats.degraded_reference_count > 0 {
        println!(
            "{} {} references could not be converted",
            "Warning:".yellow().bold(),
            stats.degraded_reference_count
        );
    }
    if stats.failed_block_count > 0 {
        println!(
            "{} {} blocks failed to render",
            "Warning:".yellow().bold(),
            stats.failed_block_count
        );
    }
}

fn cmd_pdf(
    input: &Path,
    output: Option<&Path>,
    work_dir: Option<&Path>,
    backend: &BackendArgs,
    log_file: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = if input.is_dir() {
        input.to_path_buf()
    } else {
        let dir = work_dir.map(Path::to_path_buf).unwrap_or_else(|| {
            let stem = input.file_stem().unwrap_or_default().to_string_lossy();
            PathBuf::from(format!("{}_build", stem))
        });
        wikitex::pdf::unpack_package(input, &dir)?;
        dir
    };

    let converter = backend.config()?.build();
    if !converter.is_ready() {
        return Err(format!("The {} backend is not available", converter.name()).into());
    }

    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message(format!("Compiling with {}...", converter.name()));
    let result = converter.convert(&dir)?;
    spinner.finish_and_clear();

    if let Some(path) = log_file {
        fs::write(path, &result.logs)?;
    }

    let Some(ref pdf) = result.pdf else {
        eprintln!("{}", "Compilation failed".red().bold());
        for line in result.diagnostics() {
            eprintln!("  {}", line.yellow());
        }
        std::process::exit(2);
    };

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input.with_extension("pdf"));
    if output != *pdf {
        fs::copy(pdf, &output)?;
    }
    println!("{} {}", "Saved to".green(), output.display());
    Ok(())
}

fn cmd_check(backend: &BackendArgs) -> Result<(), Box<dyn std::error::Error>> {
    let converter = backend.config()?.build();
    if converter.is_ready() {
        println!("{} {} backend is ready", "OK".green().bold(), converter.name());
        Ok(())
    } else {
        Err(format!("The {} backend is not available", converter.name()).into())
    }
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let tree = WikiTree::from_path(input)?;

    println!("{}", "Wiki Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Wiki".bold(), tree.name);
    if let Some(ref url) = tree.server_url {
        println!("{}: {}", "Server".bold(), url);
    }
    println!("{}: {}", "Spaces".bold(), tree.spaces.len());
    println!("{}: {}", "Documents".bold(), tree.document_count());

    println!();
    println!("{}", "Documents".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let mut words = 0;
    let mut attachments = 0;
    for (reference, document) in tree.documents() {
        let title = document.title.as_deref().unwrap_or(&document.name);
        println!("  {} {}", reference.to_string().bold(), title.dimmed());
        words += document.plain_text().split_whitespace().count();
        attachments += document.attachments.len();
    }

    println!();
    println!("{}: {}", "Words".bold(), words);
    println!("{}: {}", "Attachments".bold(), attachments);
    Ok(())
}

fn cmd_version() {
    println!("{} {}", "wikitex".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Wiki to LaTeX export tool");
    println!();
    println!("Repository: {}", "https://github.com/iyulab/wikitex".dimmed());
    println!("License: MIT");
}
