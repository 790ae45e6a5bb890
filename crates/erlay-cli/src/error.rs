//! Error type of the Erlay CLI.
//!
//! [`CliError`] wraps library, I/O and TOML errors and implements
//! [`miette::Diagnostic`] so `main` can render them with a graphical report
//! handler. TOML errors keep the offending document so the report can point
//! at the broken line.

use std::{io, ops::Range, path::PathBuf};

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use erlay::ErlayError;

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("I/O error on {path}: {source}")]
    #[diagnostic(code(erlay::io), help("check that the path exists and is readable"))]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid schema document: {message}")]
    #[diagnostic(
        code(erlay::schema),
        help("a schema document holds [[entities]] and [[relationships]] tables")
    )]
    Schema {
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: Option<SourceSpan>,
    },

    #[error("Invalid configuration file: {message}")]
    #[diagnostic(
        code(erlay::config),
        help("configuration files hold optional [layout] and [spacing] tables")
    )]
    Config {
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: Option<SourceSpan>,
    },

    #[error("Missing configuration file: {0}")]
    #[diagnostic(code(erlay::config::missing))]
    MissingConfig(PathBuf),

    #[error("Layout failed: {0}")]
    #[diagnostic(code(erlay::layout))]
    Layout(#[from] ErlayError),
}

impl CliError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn schema(name: &str, src: String, err: &toml::de::Error) -> Self {
        Self::Schema {
            message: err.message().to_string(),
            span: err.span().map(to_span),
            src: NamedSource::new(name, src),
        }
    }

    pub(crate) fn config(name: &str, src: String, err: &toml::de::Error) -> Self {
        Self::Config {
            message: err.message().to_string(),
            span: err.span().map(to_span),
            src: NamedSource::new(name, src),
        }
    }
}

fn to_span(range: Range<usize>) -> SourceSpan {
    range.into()
}
