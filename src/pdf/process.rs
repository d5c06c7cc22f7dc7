//! Local subprocess backend.

use super::{ConversionResult, PdfConverter, DEFAULT_COMMAND, DEFAULT_TIMEOUT};
use crate::error::{Error, Result};
use crossbeam_channel::{after, select, tick, unbounded};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runs command lines through the shell in the package directory.
#[derive(Debug, Clone)]
pub struct ProcessConverter {
    commands: Vec<String>,
    timeout: Duration,
    shell: String,
}

impl ProcessConverter {
    /// Create a new converter running `commands` in order.
    pub fn new(commands: Vec<String>) -> Self {
        Self {
            commands,
            timeout: DEFAULT_TIMEOUT,
            shell: "sh".to_string(),
        }
    }

    /// Set the wall-clock bound for each command.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use another shell (invoked as `<shell> -c <command>`).
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// The configured command lines.
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Run one command, appending its output to `logs`.
    ///
    /// Returns `None` when the command was killed after the timeout.
    fn run(&self, command: &str, dir: &Path, logs: &mut String) -> Result<Option<ExitStatus>> {
        log::info!("Running '{}' in {}", command, dir.display());
        let mut child = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| Error::Spawn {
                command: command.to_string(),
                source,
            })?;

        let (sender, receiver) = unbounded();
        let streams: [Option<Box<dyn Read + Send>>; 2] = [
            child.stdout.take().map(|s| Box::new(s) as Box<dyn Read + Send>),
            child.stderr.take().map(|s| Box::new(s) as Box<dyn Read + Send>),
        ];
        for stream in streams.into_iter().flatten() {
            let sender = sender.clone();
            // Detached: a reader ends when its pipe closes
            thread::spawn(move || {
                for line in BufReader::new(stream).lines() {
                    let Ok(line) = line else { break };
                    if sender.send(line).is_err() {
                        break;
                    }
                }
            });
        }
        drop(sender);

        let deadline = Instant::now() + self.timeout;
        let ticker = tick(POLL_INTERVAL);
        let status = loop {
            select! {
                recv(receiver) -> line => match line {
                    Ok(line) => push_line(logs, line),
                    // Both pipes closed, only the exit is left to wait for
                    Err(_) => break loop {
                        let _ = ticker.recv();
                        if let Some(status) = self.poll(&mut child, command, deadline)? {
                            break status;
                        }
                    },
                },
                recv(ticker) -> _ => {
                    if let Some(status) = self.poll(&mut child, command, deadline)? {
                        break status;
                    }
                }
            }
        };

        // Background grandchildren may hold the pipes past the exit
        let rest = after(deadline.saturating_duration_since(Instant::now()));
        loop {
            select! {
                recv(receiver) -> line => match line {
                    Ok(line) => push_line(logs, line),
                    Err(_) => break,
                },
                recv(rest) -> _ => {
                    if status.is_some() {
                        log::warn!(
                            "Output of '{}' still open after {:?}, leaving it",
                            command,
                            self.timeout
                        );
                    }
                    break;
                }
            }
        }
        for line in receiver.try_iter() {
            push_line(logs, line);
        }
        Ok(status)
    }

    /// Check for exit, killing the child once `deadline` has passed.
    ///
    /// `Some(None)` means the child was killed.
    fn poll(
        &self,
        child: &mut Child,
        command: &str,
        deadline: Instant,
    ) -> Result<Option<Option<ExitStatus>>> {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(Some(status)));
        }
        if Instant::now() < deadline {
            return Ok(None);
        }
        log::warn!("'{}' exceeded {:?}, killing it", command, self.timeout);
        if let Err(e) = child.kill() {
            log::warn!("Failed to kill '{}': {}", command, e);
        }
        let _ = child.wait();
        Ok(Some(None))
    }
}

fn push_line(logs: &mut String, line: String) {
    log::debug!("{}", line);
    logs.push_str(&line);
    logs.push('\n');
}

impl Default for ProcessConverter {
    fn default() -> Self {
        Self::new(vec![DEFAULT_COMMAND.to_string()])
    }
}

impl PdfConverter for ProcessConverter {
    fn convert(&self, dir: &Path) -> Result<ConversionResult> {
        let mut logs = String::new();
        for command in &self.commands {
            match self.run(command, dir, &mut logs)? {
                Some(status) if status.success() => {}
                Some(status) => {
                    log::warn!("'{}' failed with {}", command, status);
                    break;
                }
                None => {
                    logs.push_str(&format!("Timed out after {:?}\n", self.timeout));
                    break;
                }
            }
        }
        Ok(ConversionResult::from_output(dir, logs))
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "process"
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_runs_commands_in_package_dir() {
        let dir = tempfile::tempdir().unwrap();
        let converter = ProcessConverter::new(vec![
            "echo compiling".to_string(),
            "printf '%%PDF' > index.pdf".to_string(),
        ]);
        let result = converter.convert(dir.path()).unwrap();
        assert!(result.is_success());
        assert!(result.logs.contains("compiling"));
    }

    #[test]
    fn test_stops_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let converter = ProcessConverter::new(vec![
            "echo '! Broken.' >&2; exit 1".to_string(),
            "touch index.pdf".to_string(),
        ]);
        let result = converter.convert(dir.path()).unwrap();
        assert!(!result.is_success());
        assert_eq!(result.diagnostics(), vec!["! Broken."]);
        assert!(!dir.path().join("index.pdf").exists());
    }

    #[test]
    fn test_timeout_kills_command() {
        let dir = tempfile::tempdir().unwrap();
        let converter = ProcessConverter::new(vec!["exec sleep 30".to_string()])
            .with_timeout(Duration::from_millis(300));
        let started = Instant::now();
        let result = converter.convert(dir.path()).unwrap();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(!result.is_success());
        assert!(result.logs.contains("Timed out"));
    }

    #[test]
    fn test_background_child_does_not_outlive_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let converter = ProcessConverter::new(vec!["sleep 6 & echo started".to_string()])
            .with_timeout(Duration::from_secs(1));
        let started = Instant::now();
        let result = converter.convert(dir.path()).unwrap();
        assert!(started.elapsed() < Duration::from_secs(4));
        assert!(result.logs.contains("started"));
        assert!(!result.logs.contains("Timed out"));
    }

    #[test]
    fn test_spawn_failure_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let converter =
            ProcessConverter::new(vec!["true".to_string()]).with_shell("/nonexistent/shell");
        assert!(matches!(
            converter.convert(dir.path()),
            Err(Error::Spawn { .. })
        ));
    }
}
