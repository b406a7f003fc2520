use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("missing argument: {0}")]
    MissingArgument(String),

    #[error("needless argument: {flag}={value}")]
    NeedlessArgument { flag: String, value: String },

    #[error("invalid argument: {flag} {value} ({reason})")]
    InvalidArgument {
        flag: String,
        value: String,
        reason: String,
    },

    #[error("no such file to load -- {0}")]
    Require(String),

    #[error("options file '{path}' does not exist")]
    OptionsFileMissing { path: PathBuf },

    #[error("Failed to read options file '{path}'")]
    ReadOptionsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read example file '{path}'")]
    ReadExampleFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse options file '{path}': {message}")]
    ParseOptionsFile { path: PathBuf, message: String },

    #[error("Failed to write options file '{path}'")]
    WriteOptionsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Remote dispatch failed: {0}")]
    Remote(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Broad classes of failure, used to decide how an error is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Bad command line. Reported together with the usage text.
    Usage,
    /// Options file that was asked for but could not be used.
    ConfigFile,
    /// Remote endpoint unreachable or failing. Never fatal.
    Remote,
    /// Anything else the operating system threw at us.
    Io,
}

impl Error {
    pub fn category(&self) -> Category {
        match self {
            Error::InvalidOption(_)
            | Error::MissingArgument(_)
            | Error::NeedlessArgument { .. }
            | Error::InvalidArgument { .. }
            | Error::Require(_) => Category::Usage,
            Error::OptionsFileMissing { .. }
            | Error::ReadOptionsFile { .. }
            | Error::ParseOptionsFile { .. }
            | Error::WriteOptionsFile { .. } => Category::ConfigFile,
            Error::Remote(_) | Error::Json(_) => Category::Remote,
            Error::ReadExampleFile { .. } | Error::Io(_) => Category::Io,
        }
    }

    pub(crate) fn invalid_argument(
        flag: &str,
        value: &str,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidArgument {
            flag: flag.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            Error::InvalidOption("--bogus".into()).category(),
            Category::Usage
        );
        assert_eq!(
            Error::OptionsFileMissing {
                path: PathBuf::from("x.opts")
            }
            .category(),
            Category::ConfigFile
        );
        assert_eq!(Error::Remote("down".into()).category(), Category::Remote);
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            Error::InvalidOption("--bogus".into()).to_string(),
            "invalid option: --bogus"
        );
        assert_eq!(
            Error::invalid_argument("--line", "abc", "not an integer").to_string(),
            "invalid argument: --line abc (not an integer)"
        );
    }
}
