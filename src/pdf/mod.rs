//! PDF compilation of an unpacked LaTeX package.
//!
//! Two interchangeable backends run an external compiler over a package
//! directory: [`DockerConverter`] inside a throwaway container and
//! [`ProcessConverter`] as local subprocesses. Both report success only
//! when `index.pdf` exists in the directory afterwards. A compilation
//! that produced no PDF is a normal [`ConversionResult`], not an error.
//!
//! # Example
//!
//! ```no_run
//! use wikitex::pdf::{unpack_package, PdfBackendConfig};
//! use std::path::Path;
//!
//! fn main() -> wikitex::Result<()> {
//!     let dir = Path::new("build/package");
//!     unpack_package(Path::new("export.zip"), dir)?;
//!
//!     let converter = PdfBackendConfig::default().build();
//!     let result = converter.convert(dir)?;
//!     match result.pdf {
//!         Some(pdf) => println!("Wrote {}", pdf.display()),
//!         None => eprintln!("{}", result.diagnostics().join("\n")),
//!     }
//!     Ok(())
//! }
//! ```

mod docker;
mod process;

pub use docker::DockerConverter;
pub use process::ProcessConverter;

use crate::error::{Error, Result};
use crate::export::path::INDEX_FILE;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

/// Name of the PDF the compiler must produce next to `index.tex`.
pub const OUTPUT_FILE: &str = "index.pdf";

/// Default compiler image for the container backend.
pub const DEFAULT_IMAGE: &str = "texlive/texlive:latest";

/// Default compiler command line.
pub const DEFAULT_COMMAND: &str = "latexmk -pdf -interaction=nonstopmode -halt-on-error index.tex";

/// Wall-clock bound of the process backend.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Compiles a package directory to PDF.
pub trait PdfConverter: Send + Sync {
    /// Run the compiler over `dir`, which must contain `index.tex`.
    ///
    /// Errors are reserved for failures to run the compiler at all.
    fn convert(&self, dir: &Path) -> Result<ConversionResult>;

    /// Whether the backend can run right now.
    fn is_ready(&self) -> bool;

    /// Short name for messages.
    fn name(&self) -> &'static str;
}

/// Outcome of one compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionResult {
    /// The produced PDF, absent when compilation failed
    pub pdf: Option<PathBuf>,

    /// Combined compiler output
    pub logs: String,
}

impl ConversionResult {
    /// Check `dir` for the output file and wrap the captured logs.
    pub fn from_output(dir: &Path, logs: String) -> Self {
        let candidate = dir.join(OUTPUT_FILE);
        let pdf = candidate.is_file().then_some(candidate);
        if pdf.is_none() {
            log::warn!("No {} produced in {}", OUTPUT_FILE, dir.display());
        }
        Self { pdf, logs }
    }

    /// Whether a PDF was produced.
    pub fn is_success(&self) -> bool {
        self.pdf.is_some()
    }

    /// LaTeX error lines (those starting with `! `) found in the logs.
    pub fn diagnostics(&self) -> Vec<&str> {
        static DIAGNOSTIC: OnceLock<Option<Regex>> = OnceLock::new();
        let Some(re) = DIAGNOSTIC.get_or_init(|| Regex::new(r"(?m)^! .+$").ok()) else {
            return Vec::new();
        };
        re.find_iter(&self.logs)
            .map(|m| m.as_str().trim_end())
            .collect()
    }
}

/// Which backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PdfBackend {
    /// Throwaway container with a LaTeX distribution
    #[default]
    Docker,
    /// Local subprocesses
    Process,
}

impl std::str::FromStr for PdfBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "docker" | "container" => Ok(PdfBackend::Docker),
            "process" | "local" => Ok(PdfBackend::Process),
            other => Err(Error::Other(format!("Unknown PDF backend: {}", other))),
        }
    }
}

/// Backend selection and its settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfBackendConfig {
    /// Selected backend
    pub backend: PdfBackend,

    /// Compiler image of the container backend
    pub image: String,

    /// Command run inside the container
    pub container_command: String,

    /// Command lines run in order by the process backend
    pub commands: Vec<String>,

    /// Wall-clock bound of the process backend, in seconds
    pub timeout_secs: u64,
}

impl Default for PdfBackendConfig {
    fn default() -> Self {
        Self {
            backend: PdfBackend::default(),
            image: DEFAULT_IMAGE.to_string(),
            container_command: DEFAULT_COMMAND.to_string(),
            commands: vec![DEFAULT_COMMAND.to_string()],
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl PdfBackendConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a backend.
    pub fn with_backend(mut self, backend: PdfBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Set the container image.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Replace the process command lines.
    pub fn with_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands = commands.into_iter().map(Into::into).collect();
        self
    }

    /// Set the process timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    /// Instantiate the selected backend.
    pub fn build(&self) -> Box<dyn PdfConverter> {
        match self.backend {
            PdfBackend::Docker => Box::new(
                DockerConverter::new(&self.image).with_command(&self.container_command),
            ),
            PdfBackend::Process => Box::new(
                ProcessConverter::new(self.commands.clone())
                    .with_timeout(Duration::from_secs(self.timeout_secs)),
            ),
        }
    }
}

/// Extract a package archive into `dir`, creating it if needed.
pub fn unpack_package(archive: &Path, dir: &Path) -> Result<()> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)?;
    if zip.by_name(INDEX_FILE).is_err() {
        return Err(Error::Other(format!(
            "{} has no {}",
            archive.display(),
            INDEX_FILE
        )));
    }
    std::fs::create_dir_all(dir)?;
    zip.extract(dir)?;
    log::debug!("Unpacked {} entries into {}", zip.len(), dir.display());
    Ok(())
}
