//! Container backend driving the `docker` command line.
//!
//! Files are copied into the container and back instead of bind-mounted
//! so the produced files are owned by the caller, not by root. The
//! runtime socket is mounted into the container so the same setup works
//! when the caller itself runs in a container. The wait for the compiler
//! to exit is not bounded.

use super::{ConversionResult, PdfConverter, DEFAULT_COMMAND};
use crate::error::{Error, Result};
use std::path::Path;
use std::process::{Command, Output, Stdio};

/// Data directory inside the container.
pub const DATA_DIR: &str = "/data";

const SOCKET_BIND: &str = "/var/run/docker.sock:/var/run/docker.sock";

/// Runs the compiler in a throwaway container.
#[derive(Debug, Clone)]
pub struct DockerConverter {
    image: String,
    command: Vec<String>,
    program: String,
}

impl DockerConverter {
    /// Create a new converter for `image` with the default command.
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            command: split_command(DEFAULT_COMMAND),
            program: "docker".to_string(),
        }
    }

    /// Set the command run inside the container (split on whitespace).
    pub fn with_command(mut self, command: &str) -> Self {
        self.command = split_command(command);
        self
    }

    /// Use another runtime binary with a docker-compatible CLI.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// The compiler image.
    pub fn image(&self) -> &str {
        &self.image
    }

    fn output(&self, args: &[&str]) -> Result<Output> {
        Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| Error::Spawn {
                command: format!("{} {}", self.program, args.join(" ")),
                source,
            })
    }

    /// Run a runtime command, returning its trimmed stdout.
    fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args)?;
        if !output.status.success() {
            return Err(Error::Container(format!(
                "{} {} failed: {}",
                self.program,
                args.first().copied().unwrap_or_default(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn ensure_image(&self) -> Result<()> {
        let present = self
            .output(&["image", "inspect", &self.image])?
            .status
            .success();
        if !present {
            log::info!("Pulling image {}", self.image);
            self.run(&["pull", &self.image])?;
        }
        Ok(())
    }

    fn create(&self) -> Result<Container<'_>> {
        let mut args = vec!["create", "-v", SOCKET_BIND, "-w", DATA_DIR, self.image.as_str()];
        args.extend(self.command.iter().map(String::as_str));
        let id = self.run(&args)?;
        log::debug!("Created container {}", id);
        Ok(Container {
            converter: self,
            id,
        })
    }
}

impl PdfConverter for DockerConverter {
    fn convert(&self, dir: &Path) -> Result<ConversionResult> {
        self.ensure_image()?;
        let container = self.create()?;

        let source = format!("{}/.", dir.display());
        let data = format!("{}:{}", container.id, DATA_DIR);
        self.run(&["cp", &source, &data])?;
        self.run(&["start", &container.id])?;
        let exit_code = self.run(&["wait", &container.id])?;
        log::info!("Container {} exited with {}", container.id, exit_code);

        // Logs need the container to still exist.
        let output = self.output(&["logs", &container.id])?;
        let mut logs = String::from_utf8_lossy(&output.stdout).into_owned();
        logs.push_str(&String::from_utf8_lossy(&output.stderr));

        let data_contents = format!("{}:{}/.", container.id, DATA_DIR);
        self.run(&["cp", &data_contents, &dir.display().to_string()])?;
        drop(container);

        Ok(ConversionResult::from_output(dir, logs))
    }

    fn is_ready(&self) -> bool {
        match self.output(&["info"]) {
            Ok(output) => output.status.success(),
            Err(e) => {
                log::debug!("Container runtime unavailable: {}", e);
                false
            }
        }
    }

    fn name(&self) -> &'static str {
        "docker"
    }
}

/// A created container, removed on drop.
struct Container<'a> {
    converter: &'a DockerConverter,
    id: String,
}

impl Drop for Container<'_> {
    fn drop(&mut self) {
        match self.converter.run(&["rm", "--force", &self.id]) {
            Ok(_) => log::debug!("Removed container {}", self.id),
            Err(e) => log::warn!("Failed to remove container {}: {}", self.id, e),
        }
    }
}

fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_runtime_is_not_ready() {
        let converter = DockerConverter::new("texlive").with_program("/nonexistent/docker");
        assert!(!converter.is_ready());

        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            converter.convert(dir.path()),
            Err(Error::Spawn { .. })
        ));
    }

    #[test]
    fn test_command_split() {
        let converter = DockerConverter::new("img").with_command("  pdflatex   index.tex ");
        assert_eq!(converter.command, vec!["pdflatex", "index.tex"]);
        assert_eq!(converter.image(), "img");
    }

    #[cfg(unix)]
    #[test]
    fn test_runtime_failure_is_container_error() {
        // `false` accepts any arguments and always fails
        let converter = DockerConverter::new("img").with_program("false");
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            converter.convert(dir.path()),
            Err(Error::Container(_))
        ));
    }

    /// A docker stand-in recording its arguments in `calls.log` next to it.
    #[cfg(unix)]
    fn fake_runtime(dir: &Path, fail_start: bool) -> String {
        use std::os::unix::fs::PermissionsExt;

        let start = if fail_start {
            "echo 'cannot start container' >&2; exit 1"
        } else {
            "exit 0"
        };
        let script = format!(
            r#"#!/bin/sh
echo "$*" >> "$(dirname "$0")/calls.log"
case "$1" in
  create) echo fake123 ;;
  start) {start} ;;
  wait) echo 0 ;;
  logs) echo 'Output written on index.pdf'; echo 'Overfull hbox' >&2 ;;
  cp) case "$2" in fake123:*) touch "$3/index.pdf" ;; esac ;;
esac
"#
        );
        let program = dir.join("docker");
        std::fs::write(&program, script).unwrap();
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();
        program.display().to_string()
    }

    #[cfg(unix)]
    fn calls(dir: &Path) -> Vec<String> {
        std::fs::read_to_string(dir.join("calls.log"))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[cfg(unix)]
    #[test]
    fn test_container_lifecycle() {
        let runtime = tempfile::tempdir().unwrap();
        let package = tempfile::tempdir().unwrap();
        let converter =
            DockerConverter::new("img").with_program(fake_runtime(runtime.path(), false));

        let result = converter.convert(package.path()).unwrap();
        assert_eq!(result.pdf, Some(package.path().join("index.pdf")));
        assert!(result.logs.contains("Output written on index.pdf"));
        assert!(result.logs.contains("Overfull"));

        let calls = calls(runtime.path());
        let verbs: Vec<&str> = calls
            .iter()
            .map(|c| c.split_whitespace().next().unwrap_or_default())
            .collect();
        assert_eq!(
            verbs,
            vec!["image", "create", "cp", "start", "wait", "logs", "cp", "rm"]
        );
        assert_eq!(calls[0], "image inspect img");
        assert!(calls[1].starts_with(&format!("create -v {} -w /data img ", SOCKET_BIND)));
        assert_eq!(
            calls[2],
            format!("cp {}/. fake123:/data", package.path().display())
        );
        assert_eq!(
            calls[6],
            format!("cp fake123:/data/. {}", package.path().display())
        );
        assert_eq!(calls[7], "rm --force fake123");
    }

    #[cfg(unix)]
    #[test]
    fn test_container_removed_when_start_fails() {
        let runtime = tempfile::tempdir().unwrap();
        let package = tempfile::tempdir().unwrap();
        let converter =
            DockerConverter::new("img").with_program(fake_runtime(runtime.path(), true));

        let err = converter.convert(package.path()).unwrap_err();
        assert!(matches!(err, Error::Container(ref msg) if msg.contains("cannot start")));

        let calls = calls(runtime.path());
        assert_eq!(calls.last().map(String::as_str), Some("rm --force fake123"));
        assert!(!calls.iter().any(|c| c.starts_with("wait")));
        assert!(!package.path().join("index.pdf").exists());
    }

    #[test]
    #[ignore = "needs a container runtime and network access"]
    fn test_real_runtime_ping() {
        assert!(DockerConverter::new(super::super::DEFAULT_IMAGE).is_ready());
    }
}
