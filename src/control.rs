//! Interactive operator control loop.
//!
//! The loop prompts on its output, reads one line at a time from its input,
//! and stays [`ControlState::Running`] until the operator types `quit` or the
//! input stream ends.

use std::io::{self, BufRead, Write};

/// Marker printed before each read.
pub const PROMPT: &str = "$ ";

/// Response to any non-empty line other than `quit`.
pub const INVALID_COMMAND: &str = "Invalid command";

/// Lifecycle state of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    Running,
    Stopped,
}

/// One line of operator input, with its line terminator removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Exactly `quit`
    Quit,
    /// A blank line
    Empty,
    /// Anything else
    Unknown(String),
}

impl Command {
    /// Classify a line. Matching is exact and case-sensitive: `" quit"` and
    /// `"QUIT"` are unknown commands.
    pub fn parse(line: &str) -> Self {
        match line {
            "quit" => Command::Quit,
            "" => Command::Empty,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// What a single step of the loop did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Nothing was printed; the line was blank
    Silent,
    /// `Invalid command` was printed
    Rejected,
    /// The loop has stopped
    Stop,
}

/// Foreground read-evaluate loop over an operator channel.
///
/// Generic over the reader and writer so tests can drive it with in-memory
/// buffers; the binary uses locked stdin and stdout.
pub struct ControlLoop<R, W> {
    input: R,
    output: W,
    line: Vec<u8>,
    state: ControlState,
}

impl<R: BufRead, W: Write> ControlLoop<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            line: Vec::new(),
            state: ControlState::Running,
        }
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    /// Block until the loop reaches [`ControlState::Stopped`].
    pub fn run(&mut self) -> ControlState {
        while self.state == ControlState::Running {
            self.step();
        }
        self.state
    }

    /// Prompt, read one line and act on it.
    ///
    /// End of input and I/O errors stop the loop the same way `quit` does.
    pub fn step(&mut self) -> Reply {
        if self.state == ControlState::Stopped {
            return Reply::Stop;
        }

        if let Err(e) = self.prompt() {
            tracing::warn!(error = %e, "Operator output closed, stopping");
            return self.stop();
        }

        match self.read_line() {
            Ok(Some(line)) => self.apply(Command::parse(&line)),
            Ok(None) => {
                tracing::info!("Operator input closed, stopping");
                self.stop()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read operator input, stopping");
                self.stop()
            }
        }
    }

    /// Read one line as raw bytes, without its `\n` or `\r\n` terminator.
    ///
    /// Bytes that are not UTF-8 are replaced rather than rejected, so such a
    /// line is an unknown command instead of a read failure. `None` means end
    /// of input.
    fn read_line(&mut self) -> io::Result<Option<String>> {
        self.line.clear();
        if self.input.read_until(b'\n', &mut self.line)? == 0 {
            return Ok(None);
        }
        if self.line.last() == Some(&b'\n') {
            self.line.pop();
            if self.line.last() == Some(&b'\r') {
                self.line.pop();
            }
        }
        Ok(Some(String::from_utf8_lossy(&self.line).into_owned()))
    }

    /// Act on an already-read command.
    pub fn apply(&mut self, command: Command) -> Reply {
        match command {
            Command::Quit => {
                tracing::info!("Quit requested by operator");
                self.stop()
            }
            Command::Empty => Reply::Silent,
            Command::Unknown(text) => {
                tracing::debug!(command = %text, "Unknown operator command");
                if let Err(e) = writeln!(self.output, "{}", INVALID_COMMAND) {
                    tracing::warn!(error = %e, "Operator output closed, stopping");
                    return self.stop();
                }
                Reply::Rejected
            }
        }
    }

    /// Consume the loop, returning its output sink.
    pub fn into_output(self) -> W {
        self.output
    }

    fn prompt(&mut self) -> io::Result<()> {
        write!(self.output, "{}", PROMPT)?;
        self.output.flush()
    }

    fn stop(&mut self) -> Reply {
        self.state = ControlState::Stopped;
        Reply::Stop
    }
}
