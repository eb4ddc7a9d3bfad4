use std::{
    io::Read,
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    thread::JoinHandle,
    time::{Duration, Instant},
};

use crate::config::ColmapOptions;

/// Lines of stderr kept in a [`EngineError::NonZeroExit`].
const STDERR_TAIL_LINES: usize = 40;

/// Interval between two checks of a running process.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// An error type for the reconstruction engine.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// The process could not be started
    #[error("Failed to start {program}: {source}")]
    Spawn {
        /// Executable
        program: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// The process exited with a failure status
    #[error("{step} failed with exit code {code:?}:\n{stderr}")]
    NonZeroExit {
        /// Engine step
        step: String,
        /// Exit code, absent when killed by a signal
        code: Option<i32>,
        /// Tail of the captured stderr
        stderr: String,
    },

    /// The process did not finish in time and was killed
    #[error("{step} did not finish within {secs} s")]
    Timeout {
        /// Engine step
        step: String,
        /// Timeout in seconds
        secs: u64,
    },

    /// The engine succeeded but its output is missing
    #[error("Expected reconstruction output not found: {0}")]
    MissingOutput(PathBuf),

    /// Error waiting on the process or reading its output
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

/// Captured result of a finished process.
#[derive(Debug)]
pub struct ProcessOutput {
    /// Exit status.
    pub status: ExitStatus,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
}

fn drain<R: Read + Send + 'static>(stream: Option<R>) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut stream) = stream {
            // a read error only truncates the captured text
            let _ = stream.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join(handle: JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

fn wait_with_timeout(
    child: &mut Child,
    step: &str,
    timeout: Option<Duration>,
) -> Result<ExitStatus, EngineError> {
    let Some(timeout) = timeout else {
        return Ok(child.wait()?);
    };

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if start.elapsed() >= timeout {
            log::error!("{step} timed out after {:?}, killing it", timeout);
            child.kill()?;
            child.wait()?;
            return Err(EngineError::Timeout {
                step: step.to_string(),
                secs: timeout.as_secs(),
            });
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Run a command to completion and capture its output.
///
/// Both streams are drained on helper threads while the process runs, so a
/// chatty child cannot block on a full pipe.
///
/// # Arguments
///
/// * `command` - The command to run; its stdio is replaced by pipes.
/// * `step` - Name used in errors and logs.
/// * `timeout` - Kill the process after this duration.
pub fn run_process(
    command: &mut Command,
    step: &str,
    timeout: Option<Duration>,
) -> Result<ProcessOutput, EngineError> {
    let program = command.get_program().to_string_lossy().into_owned();

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| EngineError::Spawn { program, source })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = wait_with_timeout(&mut child, step, timeout);

    // the pipes close once the child is gone, so the readers finish
    let output = ProcessOutput {
        status: status?,
        stdout: join(stdout),
        stderr: join(stderr),
    };

    Ok(output)
}

fn tail(text: &str, max_lines: usize) -> String {
    let lines = text.lines().collect::<Vec<_>>();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}

/// The external structure-from-motion engine.
///
/// Each call blocks until the step finished.
pub trait ReconstructionEngine {
    /// Detect features in all images and store them in the database.
    fn extract_features(&self, database: &Path, images: &Path) -> Result<(), EngineError>;

    /// Match the features of every image pair.
    fn match_features(&self, database: &Path) -> Result<(), EngineError>;

    /// Run incremental mapping, writing numbered models into `output`.
    fn map(&self, database: &Path, images: &Path, output: &Path) -> Result<(), EngineError>;
}

/// [`ReconstructionEngine`] backed by the `colmap` executable.
#[derive(Debug, Clone)]
pub struct ColmapCli {
    options: ColmapOptions,
}

impl ColmapCli {
    /// Create a new engine with the given options.
    pub fn new(options: ColmapOptions) -> Self {
        Self { options }
    }

    /// The options of the engine.
    pub fn options(&self) -> &ColmapOptions {
        &self.options
    }

    fn run(&self, step: &str, args: Vec<String>) -> Result<(), EngineError> {
        log::info!("running {} {}", self.options.binary, step);
        log::debug!("arguments: {}", args.join(" "));

        let mut command = Command::new(&self.options.binary);
        command.args(&args).envs(self.options.env());

        let start = Instant::now();
        let timeout = self.options.timeout_secs.map(Duration::from_secs);
        let output = run_process(&mut command, step, timeout)?;

        for line in output.stdout.lines() {
            log::trace!("[{step}] {line}");
        }

        if !output.status.success() {
            return Err(EngineError::NonZeroExit {
                step: step.to_string(),
                code: output.status.code(),
                stderr: tail(&output.stderr, STDERR_TAIL_LINES),
            });
        }

        log::info!("{step} finished in {:.1?}", start.elapsed());
        Ok(())
    }
}

impl ReconstructionEngine for ColmapCli {
    fn extract_features(&self, database: &Path, images: &Path) -> Result<(), EngineError> {
        self.run(
            "feature_extractor",
            self.options.feature_extractor_args(database, images),
        )
    }

    fn match_features(&self, database: &Path) -> Result<(), EngineError> {
        self.run("exhaustive_matcher", self.options.matcher_args(database))
    }

    fn map(&self, database: &Path, images: &Path, output: &Path) -> Result<(), EngineError> {
        self.run(
            "mapper",
            self.options.mapper_args(database, images, output),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail() {
        assert_eq!(tail("a\nb\nc", 2), "b\nc");
        assert_eq!(tail("a", 5), "a");
        assert_eq!(tail("", 5), "");
    }

    #[test]
    fn test_missing_binary() {
        let engine = ColmapCli::new(ColmapOptions {
            binary: "/nonexistent/colmap-binary".to_string(),
            ..Default::default()
        });
        let result = engine.match_features(Path::new("database.db"));
        assert!(matches!(result, Err(EngineError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_capture_output() -> Result<(), EngineError> {
        let mut command = Command::new("sh");
        command.args(["-c", "echo out; echo err >&2"]);
        let output = run_process(&mut command, "echo", None)?;
        assert!(output.status.success());
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit() {
        let engine = ColmapCli::new(ColmapOptions {
            binary: "false".to_string(),
            ..Default::default()
        });
        let result = engine.match_features(Path::new("database.db"));
        assert!(matches!(
            result,
            Err(EngineError::NonZeroExit { code: Some(1), .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout() {
        let mut command = Command::new("sleep");
        command.arg("5");
        let result = run_process(&mut command, "sleep", Some(Duration::from_millis(100)));
        assert!(matches!(result, Err(EngineError::Timeout { .. })));
    }
}
