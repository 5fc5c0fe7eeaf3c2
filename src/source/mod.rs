//! Script sources.
//!
//! Scripts come from one of two places:
//! - a read-only store bundled into the binary ([`BundledScripts`]),
//!   run in piped mode and never written to disk
//! - a scripts directory on disk ([`ScriptsDir`]), run in file mode
//!
//! # Example
//!
//! ```
//! use script_runner::source::BundledScripts;
//!
//! let bundled = BundledScripts::builtin();
//! assert!(bundled.get("system-info").is_some());
//! ```

mod bundled;
mod dir;

pub use bundled::BundledScripts;
pub use dir::ScriptsDir;
