//! Output post-processing.
//!
//! Installer scripts often colour their output. The sanitizer strips ANSI
//! escape sequences so results can be stored or compared as plain text.
//!
//! # Example
//!
//! ```
//! use script_runner::output::OutputSanitizer;
//!
//! let raw = b"\x1b[31mRed text\x1b[0m";
//! let clean = OutputSanitizer::strip_ansi(raw);
//! assert_eq!(clean, "Red text");
//! ```

mod sanitizer;

pub use sanitizer::OutputSanitizer;
