// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The VM's I/O boundary: `print`/`println`/`debug` write through it,
//! `input` reads a line through it. Abstracted behind a trait so tests can
//! swap in an in-memory buffer instead of the process's real stdio
//! (`original_source/running/native_proc.hpp` talks to `std::cout`/`std::cin`
//! directly; we keep the same two operations but make the channel
//! swappable).

use std::io::{self, BufRead, Write};

/// Output and input for the builtins that perform it.
pub trait VmIo {
    /// Write `s` with no added newline (`print`'s contract).
    fn write(&mut self, s: &str);

    /// Read one line, without its trailing newline (`input`'s contract).
    /// Returns an empty string at end of input, matching
    /// `std::getline`'s behaviour on a closed stream.
    fn read_line(&mut self) -> io::Result<String>;
}

/// The process's real stdio.
pub struct StdIo {
    stdout: io::Stdout,
    stdin: io::BufReader<io::Stdin>,
}

impl StdIo {
    /// Bind to the process's stdout/stdin.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
            stdin: io::BufReader::new(io::stdin()),
        }
    }
}

impl Default for StdIo {
    fn default() -> Self {
        Self::new()
    }
}

impl VmIo for StdIo {
    fn write(&mut self, s: &str) {
        let _ = self.stdout.write_all(s.as_bytes());
        let _ = self.stdout.flush();
    }

    fn read_line(&mut self) -> io::Result<String> {
        let mut line = String::new();
        self.stdin.read_line(&mut line)?;
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(line)
    }
}

/// An in-memory sink/source, for tests that assert on program output or
/// feed a canned `input()` stream.
#[derive(Debug, Default)]
pub struct BufferIo {
    /// Everything written through `print`/`println`/`debug` so far.
    pub output: String,
    lines: std::collections::VecDeque<String>,
}

impl BufferIo {
    /// An empty output buffer with no queued input.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a line of input, delivered to successive `input()` calls in
    /// the order queued.
    pub fn feed_line(&mut self, line: impl Into<String>) {
        self.lines.push_back(line.into());
    }
}

impl VmIo for BufferIo {
    fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn read_line(&mut self) -> io::Result<String> {
        Ok(self.lines.pop_front().unwrap_or_default())
    }
}
