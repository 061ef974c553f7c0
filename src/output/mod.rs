//! Result outputs: the JSON Output Document and the console report.

mod console;
mod json;

pub use console::{ConsoleReport, ConsoleTable};
pub use json::{render_document, write_document, INDENT};
