//! Running bcp as a child process.

use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

use crate::bcp::args::{Arg, json_quote, table_arg};
use crate::config::BcpOptions;
use crate::error::{Error, Result};

pub const REDACTED_PASSWORD: &str = "*****";

static ROWS_COPIED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+) rows copied\.").expect("valid rows copied pattern"));

/// Direction of a bcp invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Copy table rows out to a data file
    Out(PathBuf),
    /// Copy a data file into the table
    In(PathBuf),
    /// Write a format file describing the table
    Format,
}

/// A fully assembled bcp invocation.
#[derive(Clone, Debug)]
pub struct ToolCommand {
    pub program: PathBuf,
    /// Qualified table name
    pub table: Arg,
    pub mode: Mode,
    pub format_file: PathBuf,
    pub args: Vec<Arg>,
}

enum Part<'a> {
    Word(&'static str),
    Path(&'a Path),
    Arg(&'a Arg),
}

impl ToolCommand {
    pub fn new(
        program: &Path,
        options: &BcpOptions,
        table: &str,
        mode: Mode,
        format_file: &Path,
        args: Vec<Arg>,
    ) -> Self {
        Self {
            program: program.to_path_buf(),
            table: table_arg(options, table),
            mode,
            format_file: format_file.to_path_buf(),
            args,
        }
    }

    /// Everything after the program, in the order bcp expects:
    /// `<table> {out|in|format nul} [dest] -f <format> <args...>`.
    fn parts(&self) -> Vec<Part<'_>> {
        let mut parts = vec![Part::Arg(&self.table)];
        match &self.mode {
            Mode::Out(path) => parts.extend([Part::Word("out"), Part::Path(path)]),
            Mode::In(path) => parts.extend([Part::Word("in"), Part::Path(path)]),
            Mode::Format => parts.extend([Part::Word("format"), Part::Word("nul")]),
        }
        parts.extend([Part::Word("-f"), Part::Path(&self.format_file)]);
        parts.extend(self.args.iter().map(Part::Arg));
        parts
    }

    /// Command-line tokens, program first, with paths and string values quoted.
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = vec![quote_path(&self.program)];
        tokens.extend(self.parts().into_iter().map(|part| match part {
            Part::Word(word) => word.to_string(),
            Part::Path(path) => quote_path(path),
            Part::Arg(arg) => arg.token(),
        }));
        tokens
    }

    /// The arguments handed to the process, one entry per bcp argument.
    pub fn argv(&self) -> Vec<OsString> {
        self.parts()
            .into_iter()
            .map(|part| match part {
                Part::Word(word) => OsString::from(word),
                Part::Path(path) => path.as_os_str().to_os_string(),
                Part::Arg(arg) => OsString::from(arg.value()),
            })
            .collect()
    }

    /// The option tokens alone, as they appear on the command line.
    pub fn arg_tokens(&self) -> Vec<String> {
        self.args.iter().map(Arg::token).collect()
    }

    /// The rendered command line.
    pub fn command_line(&self) -> String {
        self.tokens().join(" ")
    }

    /// The command line with the `-P` value masked, for logs.
    pub fn redacted_line(&self) -> String {
        let mut tokens = self.tokens();
        if let Some(index) = tokens.iter().position(|token| token == "-P")
            && let Some(password) = tokens.get_mut(index + 1)
        {
            *password = REDACTED_PASSWORD.to_string();
        }
        tokens.join(" ")
    }
}

/// Captured output of a finished bcp run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Row count from the `N rows copied.` summary line.
    pub fn rows_copied(&self) -> Option<u64> {
        parse_rows_copied(&self.stdout)
    }
}

/// Executes bcp commands. Swapped out in tests.
pub trait ToolRunner {
    fn run(
        &self,
        command: &ToolCommand,
        timeout_ms: Option<u64>,
    ) -> impl Future<Output = Result<ToolOutput>> + Send;
}

/// Runs bcp as a child process, arguments passed directly.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    async fn run(&self, command: &ToolCommand, timeout_ms: Option<u64>) -> Result<ToolOutput> {
        log::debug!("Running {}", command.redacted_line());

        let timeout_ms = timeout_ms.filter(|ms| *ms != 0);
        let mut child = Command::new(&command.program)
            .args(command.argv())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Both pipes drain while the child runs
        let stdout = read_pipe(child.stdout.take());
        let stderr = read_pipe(child.stderr.take());
        let (status, stdout, stderr) =
            tokio::join!(wait_or_kill(&mut child, timeout_ms), stdout, stderr);

        let stdout = String::from_utf8_lossy(&stdout?).into_owned();
        let stderr = String::from_utf8_lossy(&stderr?).into_owned();

        let Some(status) = status? else {
            return Err(Error::Timeout { ms: timeout_ms.unwrap_or_default(), stdout, stderr });
        };
        if !status.success() {
            return Err(Error::ToolFailed { status: status.to_string(), stdout, stderr });
        }

        Ok(ToolOutput { stdout, stderr })
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/// Wait for the child. `None` means it ran past the timeout and was killed.
async fn wait_or_kill(
    child: &mut Child,
    timeout_ms: Option<u64>,
) -> std::io::Result<Option<ExitStatus>> {
    let Some(ms) = timeout_ms else {
        return child.wait().await.map(Some);
    };
    match tokio::time::timeout(Duration::from_millis(ms), child.wait()).await {
        Ok(status) => status.map(Some),
        Err(_) => {
            child.kill().await?;
            Ok(None)
        }
    }
}

/// Find the `N rows copied.` summary in bcp's stdout.
pub fn parse_rows_copied(stdout: &str) -> Option<u64> {
    ROWS_COPIED_RE.captures(stdout).and_then(|capture| capture[1].parse().ok())
}

fn quote_path(path: &Path) -> String {
    json_quote(&path.to_string_lossy())
}
