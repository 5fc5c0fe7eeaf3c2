//! Plain-text rendering of captured script output.

use vte::{Params, Parser, Perform};

/// Output sanitizer using VTE parser.
pub struct OutputSanitizer;

impl OutputSanitizer {
    /// Strip ANSI escape codes from raw bytes.
    ///
    /// Colour, cursor and title sequences are dropped. A carriage return
    /// rewinds to the start of the current line, so progress bars redrawn
    /// in place collapse to their final state.
    pub fn strip_ansi(input: &[u8]) -> String {
        let mut text = PlainText::default();
        let mut parser = Parser::new();

        parser.advance(&mut text, input);

        text.into_string()
    }

    /// Strip ANSI codes from a string.
    pub fn strip_ansi_str(input: &str) -> String {
        Self::strip_ansi(input.as_bytes())
    }
}

/// VTE performer that keeps printable text, newlines and tabs.
#[derive(Default)]
struct PlainText {
    output: String,
    line_start: usize,
    // A `\r` only rewinds once something is printed after it, so `\r\n`
    // keeps the line.
    pending_rewind: bool,
}

impl PlainText {
    fn push(&mut self, c: char) {
        if self.pending_rewind {
            self.output.truncate(self.line_start);
            self.pending_rewind = false;
        }
        self.output.push(c);
    }

    fn into_string(self) -> String {
        self.output
    }
}

impl Perform for PlainText {
    fn print(&mut self, c: char) {
        self.push(c);
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            b'\n' => {
                self.pending_rewind = false;
                self.output.push('\n');
                self.line_start = self.output.len();
            }
            b'\r' => self.pending_rewind = true,
            b'\t' => self.push('\t'),
            _ => {}
        }
    }

    fn hook(&mut self, _params: &Params, _intermediates: &[u8], _ignore: bool, _action: char) {}

    fn put(&mut self, _byte: u8) {}

    fn unhook(&mut self) {}

    fn osc_dispatch(&mut self, _params: &[&[u8]], _bell_terminated: bool) {}

    fn csi_dispatch(
        &mut self,
        _params: &Params,
        _intermediates: &[u8],
        _ignore: bool,
        _action: char,
    ) {
    }

    fn esc_dispatch(&mut self, _intermediates: &[u8], _ignore: bool, _byte: u8) {}
}
