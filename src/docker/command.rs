//! External command execution.
//!
//! Every runtime query and lifecycle command is described as a
//! [`RuntimeCommand`] (an argument vector) and handed to an [`Executor`].
//! Executors never fail: a process that cannot be started is reported as a
//! [`CommandOutcome`] carrying [`SPAWN_FAILURE_EXIT_CODE`] and no output.
//!
//! Calls block until the child exits. There is no timeout, so a hung runtime
//! blocks the calling thread until the runtime returns.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tracing::{debug, warn};

/// Exit code reported when the process could not be started.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = -1;

/// Captured output and exit code of one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Standard output, followed by standard error when diagnostics are captured.
    pub output: String,
    /// Process exit code, or [`SPAWN_FAILURE_EXIT_CODE`].
    pub exit_code: i32,
}

impl CommandOutcome {
    /// Creates an outcome from raw parts.
    #[must_use]
    pub fn new(output: impl Into<String>, exit_code: i32) -> Self {
        Self {
            output: output.into(),
            exit_code,
        }
    }

    /// Outcome used when the process could not be started.
    #[must_use]
    pub fn spawn_failed() -> Self {
        Self::new(String::new(), SPAWN_FAILURE_EXIT_CODE)
    }

    /// Returns true only for exit code 0.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    fn from_output(output: Output, capture_diagnostics: bool) -> Self {
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        if capture_diagnostics {
            text.push_str(&String::from_utf8_lossy(&output.stderr));
        }

        // Killed by a signal: no exit code to report.
        let exit_code = output.status.code().unwrap_or(SPAWN_FAILURE_EXIT_CODE);

        Self::new(text, exit_code)
    }
}

/// A runtime invocation in argument-vector form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeCommand {
    program: PathBuf,
    args: Vec<String>,
    capture_diagnostics: bool,
}

impl RuntimeCommand {
    /// Creates a command for the given executable.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            capture_diagnostics: false,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Keeps the diagnostic stream in the captured output instead of discarding it.
    #[must_use]
    pub fn capture_diagnostics(mut self) -> Self {
        self.capture_diagnostics = true;
        self
    }

    /// Returns the executable path.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Returns the arguments (without the program).
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Returns true if standard error is kept in the output.
    #[must_use]
    pub fn captures_diagnostics(&self) -> bool {
        self.capture_diagnostics
    }

    /// Renders the command as a shell command line.
    ///
    /// Arguments outside the plain-word alphabet are quoted. When diagnostics
    /// are not captured, `2>/dev/null` is appended.
    #[must_use]
    pub fn command_line(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 2);
        parts.push(quote_word(&self.program.to_string_lossy()));
        parts.extend(self.args.iter().map(|arg| quote_word(arg)));

        if !self.capture_diagnostics {
            parts.push(DISCARD_DIAGNOSTICS.to_string());
        }

        parts.join(" ")
    }
}

#[cfg(not(windows))]
const DISCARD_DIAGNOSTICS: &str = "2>/dev/null";

#[cfg(windows)]
const DISCARD_DIAGNOSTICS: &str = "2>NUL";

/// Returns true for characters that never need quoting on a shell line.
fn is_plain_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':' | '/' | '=' | ',' | '@' | '+')
}

/// Quotes a word for the platform shell if it contains anything special.
fn quote_word(word: &str) -> String {
    if !word.is_empty() && word.chars().all(is_plain_word_char) {
        return word.to_string();
    }

    if cfg!(windows) {
        format!("\"{}\"", word.replace('"', "\\\""))
    } else {
        format!("'{}'", word.replace('\'', "'\\''"))
    }
}

/// Runs runtime commands.
///
/// Implementations must not panic and must report spawn failures through
/// [`CommandOutcome::spawn_failed`].
pub trait Executor: Send + Sync {
    /// Runs the command to completion.
    fn execute(&self, command: &RuntimeCommand) -> CommandOutcome;
}

/// Spawns the runtime directly, without a shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl Executor for ProcessExecutor {
    fn execute(&self, command: &RuntimeCommand) -> CommandOutcome {
        let mut cmd = Command::new(command.program());
        cmd.args(command.arguments());

        run_to_completion(cmd, command.captures_diagnostics(), &command.command_line())
    }
}

/// Runs the rendered command line through the platform shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellExecutor;

impl Executor for ShellExecutor {
    fn execute(&self, command: &RuntimeCommand) -> CommandOutcome {
        execute_shell(&command.command_line())
    }
}

/// Runs a shell-interpreted command line and captures its combined output.
///
/// Standard output comes first, followed by anything written to standard
/// error that the command line did not redirect away.
#[must_use]
pub fn execute_shell(command_line: &str) -> CommandOutcome {
    let cmd = if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", command_line]);
        c
    } else {
        let mut c = Command::new("sh");
        c.args(["-c", command_line]);
        c
    };

    run_to_completion(cmd, true, command_line)
}

fn run_to_completion(mut cmd: Command, capture_diagnostics: bool, shown: &str) -> CommandOutcome {
    cmd.stdin(Stdio::null()).stdout(Stdio::piped());
    if capture_diagnostics {
        cmd.stderr(Stdio::piped());
    } else {
        cmd.stderr(Stdio::null());
    }

    match cmd.output() {
        Ok(output) => {
            let outcome = CommandOutcome::from_output(output, capture_diagnostics);
            debug!(
                "`{}` exited with {} ({} bytes of output)",
                shown,
                outcome.exit_code,
                outcome.output.len()
            );
            outcome
        }
        Err(e) => {
            warn!("Failed to start `{}`: {}", shown, e);
            CommandOutcome::spawn_failed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_success_requires_zero() {
        assert!(CommandOutcome::new("ok", 0).is_success());
        assert!(!CommandOutcome::new("", 1).is_success());
        assert!(!CommandOutcome::spawn_failed().is_success());
        assert_eq!(CommandOutcome::spawn_failed().exit_code, SPAWN_FAILURE_EXIT_CODE);
        assert!(CommandOutcome::spawn_failed().output.is_empty());
    }

    #[test]
    fn test_command_line_discards_diagnostics_by_default() {
        let cmd = RuntimeCommand::new("/usr/bin/docker").args(["ps", "--filter", "status=running"]);
        assert_eq!(cmd.arguments(), ["ps", "--filter", "status=running"]);

        let line = cmd.command_line();
        assert!(line.starts_with("/usr/bin/docker ps --filter status=running"));
        assert!(line.ends_with(DISCARD_DIAGNOSTICS));
    }

    #[test]
    fn test_command_line_keeps_diagnostics_when_captured() {
        let line = RuntimeCommand::new("docker")
            .arg("info")
            .capture_diagnostics()
            .command_line();
        assert_eq!(line, "docker info");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_line_quotes_templates() {
        let line = RuntimeCommand::new("docker")
            .args(["ps", "--format", "{{.ID}}|{{.Names}}", "it's"])
            .capture_diagnostics()
            .command_line();
        assert_eq!(line, "docker ps --format '{{.ID}}|{{.Names}}' 'it'\\''s'");
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_shell_captures_output_and_exit_code() {
        let outcome = execute_shell("echo hello");
        assert_eq!(outcome, CommandOutcome::new("hello\n", 0));
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_shell_reports_nonzero_exit() {
        let outcome = execute_shell("echo partial; exit 3");
        assert_eq!(outcome.exit_code, 3);
        assert!(!outcome.is_success());
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_shell_combines_streams() {
        let outcome = execute_shell("echo out; echo err 1>&2");
        assert!(outcome.output.contains("out"));
        assert!(outcome.output.contains("err"));
    }

    #[cfg(unix)]
    #[test]
    fn test_process_executor_runs_without_shell() {
        let cmd = RuntimeCommand::new("sh").args(["-c", "printf 'a|b'; echo noise 1>&2"]);
        let outcome = ProcessExecutor.execute(&cmd);
        assert_eq!(outcome, CommandOutcome::new("a|b", 0));
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_executor_honours_redirection() {
        let cmd = RuntimeCommand::new("sh").args(["-c", "echo visible; echo hidden 1>&2"]);
        let outcome = ShellExecutor.execute(&cmd);
        assert_eq!(outcome, CommandOutcome::new("visible\n", 0));
    }

    #[test]
    fn test_process_executor_spawn_failure() {
        let cmd = RuntimeCommand::new("/nonexistent/dockdash-test-binary").arg("ps");
        let outcome = ProcessExecutor.execute(&cmd);
        assert_eq!(outcome, CommandOutcome::spawn_failed());
    }
}
