use log::{debug, warn};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

/// A fully resolved invocation: an executable path and discrete arguments.
/// Nothing here is ever handed to a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub current_dir: Option<PathBuf>,
    /// Argument positions masked when the command is logged or displayed.
    sensitive: Vec<usize>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            sensitive: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Append an argument that must not show up in logs.
    pub fn secret_arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.sensitive.push(self.args.len());
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for (idx, arg) in self.args.iter().enumerate() {
            if self.sensitive.contains(&idx) {
                write!(f, " ***")?;
            } else {
                write!(f, " {}", arg.to_string_lossy())?;
            }
        }
        Ok(())
    }
}

/// What came back from one subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawExecutionOutcome {
    /// stdout and stderr interleaved in arrival order.
    pub combined_output: String,
    /// Kept for diagnostics; classification is textual.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub duration: Duration,
}

/// How long buffered output is drained after the child has exited.
const OUTPUT_GRACE: Duration = Duration::from_millis(500);

/// Runs one external command with argument-vector semantics.
#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    timeout: Option<Duration>,
}

impl CommandRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Spawn `spec`, capture combined output, and wait for it to exit or for
    /// the timeout to expire. Spawn failures are returned as-is so callers
    /// can tell a missing or incompatible binary from a tool that ran.
    ///
    /// The child is killed if this future is dropped.
    pub async fn run(&self, spec: &CommandSpec) -> std::io::Result<RawExecutionOutcome> {
        debug!("Executing: {}", spec);
        let started = Instant::now();

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .env("LC_ALL", "C")
            .env("LANG", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.current_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn()?;

        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
        if let Some(stdout) = child.stdout.take() {
            spawn_line_reader(stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_line_reader(stderr, tx);
        } else {
            drop(tx);
        }

        let deadline = self
            .timeout
            .map(|limit| tokio::time::Instant::now() + limit);
        let expired = async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(expired);

        let mut combined = Vec::new();
        let mut timed_out = false;
        let mut streams_open = true;

        // Reap the child as soon as it exits; a background grandchild may
        // keep the pipes open long after.
        let status = loop {
            tokio::select! {
                chunk = rx.recv(), if streams_open => match chunk {
                    Some(chunk) => combined.extend_from_slice(&chunk),
                    None => streams_open = false,
                },
                status = child.wait() => break status?,
                _ = &mut expired => {
                    timed_out = true;
                    kill_quietly(&mut child, spec);
                    break child.wait().await?;
                }
            }
        };

        let grace = tokio::time::Instant::now() + OUTPUT_GRACE;
        while streams_open {
            match tokio::time::timeout_at(grace, rx.recv()).await {
                Ok(Some(chunk)) => combined.extend_from_slice(&chunk),
                Ok(None) => streams_open = false,
                Err(_) => {
                    debug!(
                        "{} exited with its output still held open, not waiting further",
                        spec.program.display()
                    );
                    break;
                }
            }
        }

        let outcome = RawExecutionOutcome {
            combined_output: String::from_utf8_lossy(&combined).into_owned(),
            exit_code: status.code(),
            timed_out,
            duration: started.elapsed(),
        };
        debug!(
            "{} finished: exit={:?} timed_out={} bytes={}",
            spec.program.display(),
            outcome.exit_code,
            outcome.timed_out,
            outcome.combined_output.len()
        );
        Ok(outcome)
    }
}

fn spawn_line_reader<R>(stream: R, tx: mpsc::UnboundedSender<Vec<u8>>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        loop {
            // Byte lines: tool output is not guaranteed to be UTF-8.
            let mut line = Vec::new();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
}

fn kill_quietly(child: &mut tokio::process::Child, spec: &CommandSpec) {
    warn!("{} timed out, terminating", spec.program.display());
    if let Err(e) = child.start_kill() {
        debug!("Kill of {} failed: {}", spec.program.display(), e);
    }
}

/// Whether a spawn error means the executable's format or loader is wrong for
/// this host rather than that the file is absent.
pub fn is_exec_format_error(err: &std::io::Error) -> bool {
    #[cfg(unix)]
    {
        // ENOEXEC
        if err.raw_os_error() == Some(8) {
            return true;
        }
    }
    err.to_string().contains("Exec format error")
}

/// Short executable name for messages.
pub fn program_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_redacts_secret_arguments() {
        let spec = CommandSpec::new("/usr/bin/steghide")
            .args(["extract", "-sf", "/tmp/a.jpg", "-p"])
            .secret_arg("hunter2")
            .arg("-f");
        let shown = spec.to_string();
        assert_eq!(shown, "/usr/bin/steghide extract -sf /tmp/a.jpg -p *** -f");
        assert!(!shown.contains("hunter2"));
        assert_eq!(spec.args[4], OsString::from("hunter2"));
    }

    #[test]
    fn program_name_uses_file_name() {
        assert_eq!(program_name(Path::new("/opt/tools/bin/xxd")), "xxd");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_stdout_and_stderr_together() {
        let spec = CommandSpec::new("/bin/sh")
            .arg("-c")
            .arg("echo out; echo err 1>&2; exit 3");
        let outcome = CommandRunner::new(None).run(&spec).await.unwrap();
        assert!(outcome.combined_output.contains("out"));
        assert!(outcome.combined_output.contains("err"));
        assert_eq!(outcome.exit_code, Some(3));
        assert!(!outcome.timed_out);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_kills_slow_children() {
        let spec = CommandSpec::new("/bin/sh").arg("-c").arg("echo started; sleep 30");
        let outcome = CommandRunner::new(Some(Duration::from_millis(300)))
            .run(&spec)
            .await
            .unwrap();
        assert!(outcome.timed_out);
        assert!(outcome.duration < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn background_grandchild_holding_stdout_does_not_block() {
        let spec = CommandSpec::new("/bin/sh")
            .arg("-c")
            .arg("sleep 30 & echo done");
        let outcome = tokio::time::timeout(Duration::from_secs(10), CommandRunner::new(None).run(&spec))
            .await
            .expect("runner waited for the grandchild")
            .unwrap();
        assert!(outcome.combined_output.contains("done"));
        assert_eq!(outcome.exit_code, Some(0));
        assert!(!outcome.timed_out);
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let spec = CommandSpec::new("/nonexistent/definitely-not-here");
        let err = CommandRunner::default().run(&spec).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
