//! Output sinks for everything migratron prints as its report.
//!
//! Logging goes through `log`; the console is the operator-facing text. A sink accepts
//! ordered writes with an optional color hint and must be finished once the command is
//! done, which is what lets a pager wait for its reader.

use colored::{Color, Colorize};
use std::io::{self, Write};
use std::process::{Child, ChildStdin, Command, Stdio};

pub trait Console {
    fn write(&mut self, text: &str, color: Option<Color>);

    fn line(&mut self, text: &str, color: Option<Color>) {
        self.write(text, color);
        self.write("\n", None);
    }

    fn say(&mut self, text: &str) {
        self.line(text, None);
    }

    fn blank(&mut self) {
        self.write("\n", None);
    }

    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn paint(text: &str, color: Option<Color>) -> String {
    match color {
        Some(color) if !text.trim().is_empty() => text.color(color).to_string(),
        _ => text.to_string(),
    }
}

#[derive(Debug, Default)]
pub struct StdoutConsole;

impl Console for StdoutConsole {
    fn write(&mut self, text: &str, color: Option<Color>) {
        // A closed stdout (e.g. `| head`) must not turn into a panic.
        let _ = io::stdout().lock().write_all(paint(text, color).as_bytes());
    }

    fn finish(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}

/// Streams output into `less`, falling back to stdout if the pager goes away.
pub struct PagerConsole {
    child: Child,
    stdin: Option<ChildStdin>,
}

impl PagerConsole {
    pub const ARGS: [&'static str; 5] = ["-F", "-R", "-S", "-X", "-K"];

    pub fn spawn(program: &str) -> io::Result<Self> {
        let mut child = Command::new(program)
            .args(Self::ARGS)
            .stdin(Stdio::piped())
            .spawn()?;
        let stdin = child.stdin.take();
        Ok(Self { child, stdin })
    }
}

impl Console for PagerConsole {
    fn write(&mut self, text: &str, color: Option<Color>) {
        if let Some(stdin) = self.stdin.as_mut() {
            if stdin.write_all(paint(text, color).as_bytes()).is_err() {
                // The reader quit the pager; drop the rest.
                self.stdin = None;
            }
        }
    }

    fn finish(&mut self) -> io::Result<()> {
        drop(self.stdin.take());
        self.child.wait().map(|_| ())
    }
}

/// Keeps everything written in memory. Colors are dropped.
#[derive(Debug, Default)]
pub struct CaptureConsole {
    buffer: String,
    finished: bool,
}

impl CaptureConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self) -> &str {
        &self.buffer
    }

    pub fn lines(&self) -> Vec<&str> {
        self.buffer.lines().collect()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Console for CaptureConsole {
    fn write(&mut self, text: &str, _color: Option<Color>) {
        self.buffer.push_str(text);
    }

    fn finish(&mut self) -> io::Result<()> {
        self.finished = true;
        Ok(())
    }
}
