//! CLI logic for the Erlay layout tool.
//!
//! This module contains the core CLI logic: load a schema document and a
//! configuration, lay the schema out, and write a plain-text report.

pub mod document;
pub mod error;
pub mod report;

mod args;
mod config;

pub use args::Args;
pub use error::CliError;

use std::{fs, io::Write};

use log::info;

use erlay::LayoutBuilder;

use document::SchemaDocument;

/// Run the Erlay CLI application
///
/// This function lays out the schema document named by `args.input` and
/// writes the report to `args.output`, or to stdout when no output path is
/// given.
///
/// # Errors
///
/// Returns `CliError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Schema document errors
/// - Layout errors
pub fn run(args: &Args) -> Result<(), CliError> {
    info!(
        input_path = args.input,
        output_path:? = args.output;
        "Processing schema"
    );

    let app_config = config::load_config(args.config.as_ref())?;

    let document = SchemaDocument::load(&args.input)?;
    info!(
        entities = document.entities().len(),
        relationships = document.relationships().len();
        "Schema loaded"
    );

    let layout = LayoutBuilder::new(app_config)
        .layout(document.entities(), document.relationships())?;
    let text = report::render(&layout);

    match &args.output {
        Some(path) => {
            fs::write(path, text).map_err(|err| CliError::io(path, err))?;
            info!(output_file = path; "Report written");
        }
        None => {
            std::io::stdout()
                .lock()
                .write_all(text.as_bytes())
                .map_err(|err| CliError::io("<stdout>", err))?;
        }
    }

    Ok(())
}
