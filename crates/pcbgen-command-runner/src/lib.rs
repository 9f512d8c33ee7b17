//! Process runner used for KiCad's Python interpreter and the autorouter.
//!
//! stdout and stderr are merged into a single pipe so tool logs keep their
//! interleaving. A run can be bounded by a timeout, after which the child and
//! everything it started are killed and the output collected so far is
//! returned with `timed_out` set.

use std::{
    fs::File,
    io::{self, Read, Write},
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// How long to keep reading output after a timed out process was killed
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Merged stdout/stderr of a finished process
#[derive(Clone, Debug, Default)]
pub struct CommandOutput {
    /// Output bytes as written by the process, ANSI escapes included
    pub raw_output: Vec<u8>,
    /// Output with ANSI escapes removed
    pub plain_output: Vec<u8>,
    pub success: bool,
    /// Exit code, `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    /// Set when the process was killed after exceeding its timeout
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn raw_as_string(&self) -> String {
        String::from_utf8_lossy(&self.raw_output).to_string()
    }

    pub fn plain_as_string(&self) -> String {
        String::from_utf8_lossy(&self.plain_output).to_string()
    }

    /// Last `lines` lines of the plain output, for error messages
    pub fn tail(&self, lines: usize) -> String {
        let text = self.plain_as_string();
        let all: Vec<&str> = text.lines().collect();
        all[all.len().saturating_sub(lines)..].join("\n")
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut file =
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        file.write_all(&self.plain_output)?;
        Ok(())
    }
}

/// Options for running a command
#[derive(Debug)]
pub struct CommandRunnerOptions {
    /// Capture stdout and stderr; otherwise they are inherited (or sent to `log_file`)
    pub capture_output: bool,
    /// File receiving a copy of the plain output
    pub log_file: Option<File>,
    pub env_vars: Vec<(String, String)>,
    pub current_dir: Option<PathBuf>,
    /// Text piped into stdin
    pub stdin_input: Option<String>,
    /// Kill the process once it has run this long
    pub timeout: Option<Duration>,
}

impl Default for CommandRunnerOptions {
    fn default() -> Self {
        Self {
            capture_output: true,
            log_file: None,
            env_vars: Vec::new(),
            current_dir: None,
            stdin_input: None,
            timeout: None,
        }
    }
}

/// Run `program` with `args` and wait for it to finish or time out.
///
/// Returns an error only when the process cannot be started or its output
/// cannot be collected; a non-zero exit or a timeout is reported through the
/// returned [`CommandOutput`].
pub fn run_command<S, I, T>(
    program: S,
    args: I,
    options: CommandRunnerOptions,
) -> Result<CommandOutput>
where
    S: AsRef<str>,
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let program = program.as_ref();
    let mut command = Command::new(program);
    command.args(args.into_iter().map(|s| s.as_ref().to_owned()));

    for (key, value) in &options.env_vars {
        command.env(key, value);
    }
    if let Some(dir) = &options.current_dir {
        command.current_dir(dir);
    }
    if options.stdin_input.is_some() {
        command.stdin(Stdio::piped());
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Own process group so a timeout also reaches launched grandchildren
        if options.timeout.is_some() {
            command.process_group(0);
        }
    }

    log::debug!("Running {program} (timeout: {:?})", options.timeout);
    let mut output = CommandOutput::default();

    if options.capture_output {
        let (mut reader, writer) = os_pipe::pipe().context("Failed to create pipe")?;
        command.stdout(Stdio::from(
            writer.try_clone().context("Failed to clone pipe writer")?,
        ));
        command.stderr(Stdio::from(writer));

        let mut child = command
            .spawn()
            .with_context(|| format!("Failed to spawn {program}"))?;
        // The parent's copies of the pipe writer live in `command`; the reader
        // only sees EOF once they are gone.
        drop(command);

        feed_stdin(&mut child, options.stdin_input.as_deref())?;

        let (sender, chunks) = mpsc::channel();
        thread::spawn(move || {
            let mut buffer = [0u8; 8192];
            loop {
                match reader.read(&mut buffer) {
                    Ok(0) => break,
                    Ok(n) => {
                        if sender.send(Ok(buffer[..n].to_vec())).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        let _ = sender.send(Err(e));
                        break;
                    }
                }
            }
        });

        let (status, timed_out) = wait_with_timeout(&mut child, options.timeout)?;
        output.timed_out = timed_out;
        output.success = status.success() && !timed_out;
        output.exit_code = status.code();

        let drain_deadline = timed_out.then(|| Instant::now() + DRAIN_GRACE);
        output.raw_output = collect_output(&chunks, drain_deadline)?;
        output.plain_output = strip_ansi_escapes::strip(&output.raw_output);

        if let Some(mut log_file) = options.log_file {
            log_file
                .write_all(&output.plain_output)
                .context("Failed to write to log file")?;
        }
    } else {
        let (out, err) = match &options.log_file {
            Some(log_file) => (
                Stdio::from(log_file.try_clone().context("Failed to clone log file")?),
                Stdio::from(log_file.try_clone().context("Failed to clone log file")?),
            ),
            None => (Stdio::inherit(), Stdio::inherit()),
        };

        let mut child = command
            .stdout(out)
            .stderr(err)
            .spawn()
            .with_context(|| format!("Failed to spawn {program}"))?;

        feed_stdin(&mut child, options.stdin_input.as_deref())?;

        let (status, timed_out) = wait_with_timeout(&mut child, options.timeout)?;
        output.timed_out = timed_out;
        output.success = status.success() && !timed_out;
        output.exit_code = status.code();
    }

    if output.timed_out {
        log::warn!("{program} exceeded its timeout and was killed");
    } else {
        log::debug!("{program} exited with {:?}", output.exit_code);
    }
    Ok(output)
}

fn feed_stdin(child: &mut Child, input: Option<&str>) -> Result<()> {
    if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
        stdin
            .write_all(input.as_bytes())
            .context("Failed to write to stdin")?;
    }
    Ok(())
}

/// Gather output chunks until the writer side closes. With a deadline, stop
/// waiting once it passes even if some process still holds the pipe open.
fn collect_output(
    chunks: &Receiver<io::Result<Vec<u8>>>,
    deadline: Option<Instant>,
) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    loop {
        let chunk = match deadline {
            None => match chunks.recv() {
                Ok(chunk) => chunk,
                Err(_) => break,
            },
            Some(deadline) => {
                match chunks.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                    Ok(chunk) => chunk,
                    Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {
                        log::warn!("Output pipe still open after kill, dropping the rest");
                        break;
                    }
                }
            }
        };
        output.extend(chunk.context("Failed to read command output")?);
    }
    Ok(output)
}

/// Kill `child` and, on unix, the process group it leads.
fn kill_tree(child: &mut Child) -> Result<()> {
    #[cfg(unix)]
    {
        let group = child.id() as libc::pid_t;
        // SAFETY: kill(2) only takes plain integers
        if unsafe { libc::kill(-group, libc::SIGKILL) } == 0 {
            return Ok(());
        }
        log::debug!(
            "Killing process group {group} failed: {}",
            io::Error::last_os_error()
        );
    }
    child.kill().context("Failed to kill timed out command")
}

/// Wait for `child`, killing it once `timeout` has elapsed. The flag is true
/// when the child was killed.
fn wait_with_timeout(child: &mut Child, timeout: Option<Duration>) -> Result<(ExitStatus, bool)> {
    let Some(timeout) = timeout else {
        let status = child.wait().context("Failed to wait for command")?;
        return Ok((status, false));
    };

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().context("Failed to poll command")? {
            return Ok((status, false));
        }
        if Instant::now() >= deadline {
            kill_tree(child)?;
            let status = child.wait().context("Failed to reap killed command")?;
            return Ok((status, true));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Builder for a single command run
pub struct CommandRunner {
    program: String,
    args: Vec<String>,
    options: CommandRunnerOptions,
}

impl CommandRunner {
    pub fn new<S: AsRef<str>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            args: Vec::new(),
            options: CommandRunnerOptions::default(),
        }
    }

    pub fn arg<S: AsRef<str>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|s| s.as_ref().to_owned()));
        self
    }

    pub fn capture_output(mut self, capture: bool) -> Self {
        self.options.capture_output = capture;
        self
    }

    pub fn log_file(mut self, file: File) -> Self {
        self.options.log_file = Some(file);
        self
    }

    pub fn env<K, V>(mut self, key: K, value: V) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.options
            .env_vars
            .push((key.as_ref().to_owned(), value.as_ref().to_owned()));
        self
    }

    pub fn current_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.options.current_dir = Some(dir.into());
        self
    }

    pub fn stdin_input<S: AsRef<str>>(mut self, input: S) -> Self {
        self.options.stdin_input = Some(input.as_ref().to_owned());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// The program name, for log and error messages
    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn run(self) -> Result<CommandOutput> {
        run_command(self.program, self.args, self.options)
    }
}
