// Console I/O for the setup prompts: visible and no-echo line reads,
// colored status output, and terminal restoration on interrupt.

use crate::constants::return_code;
use crate::tracing::Tracing;

use parking_lot::Mutex;
use runner_sdk::{StringUtil, TraceWriter};
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Console color codes for terminal output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleColor {
    Red,
    Green,
    Yellow,
}

impl ConsoleColor {
    fn ansi_code(&self) -> &'static str {
        match self {
            ConsoleColor::Red => "\x1b[31m",
            ConsoleColor::Green => "\x1b[32m",
            ConsoleColor::Yellow => "\x1b[33m",
        }
    }

    fn reset() -> &'static str {
        "\x1b[0m"
    }
}

enum Input {
    Stdin,
    Reader(Mutex<Box<dyn BufRead + Send>>),
}

enum Output {
    Stdout,
    Buffer(Arc<Mutex<Vec<u8>>>),
}

/// Terminal abstraction for prompts and status lines.
///
/// `Terminal::new()` talks to the process stdin/stdout. `with_io` swaps in
/// an arbitrary reader and an in-memory output buffer; secret reads from a
/// custom reader never touch terminal modes.
pub struct Terminal {
    /// Whether to suppress output.
    pub silent: bool,
    trace: Option<Tracing>,
    input: Input,
    output: Output,
}

impl Terminal {
    /// Create a `Terminal` bound to stdin/stdout.
    pub fn new() -> Self {
        Self {
            silent: false,
            trace: None,
            input: Input::Stdin,
            output: Output::Stdout,
        }
    }

    /// Create a `Terminal` that reads from `reader` and writes into `buffer`.
    pub fn with_io(reader: impl BufRead + Send + 'static, buffer: Arc<Mutex<Vec<u8>>>) -> Self {
        Self {
            silent: false,
            trace: None,
            input: Input::Reader(Mutex::new(Box::new(reader))),
            output: Output::Buffer(buffer),
        }
    }

    /// Attach a trace source.
    pub fn with_trace(mut self, trace: Tracing) -> Self {
        self.trace = Some(trace);
        self
    }

    fn read_raw_line(&self) -> io::Result<String> {
        let mut input = String::new();
        match &self.input {
            Input::Stdin => io::stdin().lock().read_line(&mut input)?,
            Input::Reader(reader) => reader.lock().read_line(&mut input)?,
        };
        Ok(StringUtil::trim_line_ending(&input).to_string())
    }

    /// Read a line, echoed normally.
    pub fn read_line(&self) -> io::Result<String> {
        if let Some(ref trace) = self.trace {
            trace.info("READ LINE");
        }

        let value = self.read_raw_line()?;

        if let Some(ref trace) = self.trace {
            trace.info(&format!("Read value: '{}'", value));
        }

        Ok(value)
    }

    /// Read a line without echoing it.
    ///
    /// On a Unix TTY, echo is disabled for the duration of the read and
    /// restored by `EchoGuard` on every exit path. When stdin is not a TTY
    /// (piped input) the line is read as-is and a warning is traced: there is
    /// nothing to suppress, but also no guarantee the value stays off screen.
    pub fn read_secret(&self) -> io::Result<String> {
        if let Some(ref trace) = self.trace {
            trace.info("READ SECRET");
        }

        let value = match self.input {
            Input::Stdin => self.read_stdin_secret()?,
            Input::Reader(_) => self.read_raw_line()?,
        };

        if let Some(ref trace) = self.trace {
            trace.info(&format!("Read secret of {} characters", value.chars().count()));
        }

        Ok(value)
    }

    #[cfg(unix)]
    fn read_stdin_secret(&self) -> io::Result<String> {
        match EchoGuard::acquire_stdin() {
            Ok(guard) => {
                let value = self.read_raw_line();
                drop(guard);
                // The operator's Enter was not echoed.
                self.write_empty_line();
                value
            }
            Err(e) => {
                if let Some(ref trace) = self.trace {
                    trace.warning(&format!(
                        "stdin is not a terminal ({}); reading secret without echo suppression",
                        e
                    ));
                }
                self.read_raw_line()
            }
        }
    }

    #[cfg(not(unix))]
    fn read_stdin_secret(&self) -> io::Result<String> {
        if let Some(ref trace) = self.trace {
            trace.warning("echo suppression is not supported on this platform");
        }
        self.read_raw_line()
    }

    fn emit(&self, text: &str, to_stderr: bool) {
        if self.silent {
            return;
        }
        match &self.output {
            Output::Stdout if to_stderr => {
                let _ = io::stderr().write_all(text.as_bytes());
            }
            Output::Stdout => {
                let mut out = io::stdout();
                let _ = out.write_all(text.as_bytes());
                let _ = out.flush();
            }
            Output::Buffer(buffer) => buffer.lock().extend_from_slice(text.as_bytes()),
        }
    }

    fn colored(&self, text: &str, color: Option<ConsoleColor>) -> String {
        match (color, &self.output) {
            (Some(color), Output::Stdout) => {
                format!("{}{}{}", color.ansi_code(), text, ConsoleColor::reset())
            }
            _ => text.to_string(),
        }
    }

    /// Write a string (no newline).
    pub fn write(&self, message: &str, color: Option<ConsoleColor>) {
        self.emit(&self.colored(message, color), false);
    }

    /// Write a line.
    pub fn write_line(&self, line: &str, color: Option<ConsoleColor>) {
        self.emit(&format!("{}\n", self.colored(line, color)), false);
    }

    /// Write an empty line.
    pub fn write_empty_line(&self) {
        self.write_line("", None);
    }

    /// Write an error line to stderr.
    pub fn write_error(&self, line: &str) {
        if let Some(ref trace) = self.trace {
            trace.error(line);
        }
        self.emit(&format!("{}\n", self.colored(line, Some(ConsoleColor::Red))), true);
    }

    /// Write a warning line to stderr.
    pub fn write_warning(&self, line: &str) {
        self.emit(&format!("{}\n", self.colored(line, Some(ConsoleColor::Yellow))), true);
    }

    /// Write a success message with a checkmark prefix.
    pub fn write_success_message(&self, message: &str) {
        self.write("√ ", Some(ConsoleColor::Green));
        self.write_line(message, None);
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Echo suppression
// ---------------------------------------------------------------------------

#[cfg(unix)]
struct SavedTerminal {
    fd: std::os::fd::OwnedFd,
    termios: nix::sys::termios::Termios,
}

#[cfg(unix)]
static SAVED_TERMINAL: once_cell::sync::Lazy<Mutex<Option<SavedTerminal>>> =
    once_cell::sync::Lazy::new(|| Mutex::new(None));

/// Scoped no-echo mode on a terminal.
///
/// `acquire` saves the current terminal attributes and clears `ECHO`;
/// dropping the guard puts the saved attributes back. While the guard is
/// alive the saved attributes are also published for
/// `install_interrupt_handler`, which restores them if the operator presses
/// Ctrl+C mid-read.
#[cfg(unix)]
pub struct EchoGuard {
    fd: std::os::fd::OwnedFd,
    original: nix::sys::termios::Termios,
}

#[cfg(unix)]
impl EchoGuard {
    /// Disable echo on `fd`. Fails with `ENOTTY` when `fd` is not a terminal.
    pub fn acquire<Fd: std::os::fd::AsFd>(fd: Fd) -> nix::Result<Self> {
        use nix::errno::Errno;
        use nix::sys::termios::{self, LocalFlags, SetArg};

        let original = termios::tcgetattr(&fd)?;
        let owned = || fd.as_fd().try_clone_to_owned().map_err(|_| Errno::last());
        let guard_fd = owned()?;
        let saved_fd = owned()?;

        let mut noecho = original.clone();
        noecho.local_flags.remove(LocalFlags::ECHO);

        *SAVED_TERMINAL.lock() = Some(SavedTerminal {
            fd: saved_fd,
            termios: original.clone(),
        });
        if let Err(e) = termios::tcsetattr(&guard_fd, SetArg::TCSANOW, &noecho) {
            SAVED_TERMINAL.lock().take();
            return Err(e);
        }

        Ok(Self {
            fd: guard_fd,
            original,
        })
    }

    /// Disable echo on the process stdin.
    pub fn acquire_stdin() -> nix::Result<Self> {
        Self::acquire(io::stdin())
    }
}

#[cfg(unix)]
impl Drop for EchoGuard {
    fn drop(&mut self) {
        use nix::sys::termios::{self, SetArg};

        let _ = termios::tcsetattr(&self.fd, SetArg::TCSANOW, &self.original);
        SAVED_TERMINAL.lock().take();
    }
}

/// Put back terminal attributes saved by a live `EchoGuard`, if any.
pub fn restore_saved_terminal() {
    #[cfg(unix)]
    {
        use nix::sys::termios::{self, SetArg};

        if let Some(saved) = SAVED_TERMINAL.lock().take() {
            let _ = termios::tcsetattr(&saved.fd, SetArg::TCSANOW, &saved.termios);
        }
    }
}

/// Install the Ctrl+C handler: restore the terminal and exit with 130.
pub fn install_interrupt_handler(trace: &Tracing) {
    let result = ctrlc::set_handler(|| {
        restore_saved_terminal();
        eprintln!();
        std::process::exit(return_code::INTERRUPTED);
    });

    if let Err(e) = result {
        trace.warning(&format!("Failed to install interrupt handler: {}", e));
    }
}
