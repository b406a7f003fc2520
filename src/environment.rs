use crate::options_file::DEFAULT_OPTIONS_FILE;
use std::path::{Path, PathBuf};

/// Program names that run tests when invoked with no arguments at all.
const SPEC_COMMANDS: &[&str] = &["spec", "specr"];

/// Facts about the invoking process that influence resolution.
#[derive(Debug, Clone)]
pub struct Environment {
    /// argv[0] as given.
    pub program: String,
    pub version: String,
    /// Options file loaded when the command line carries no flags.
    pub default_options_file: Option<PathBuf>,
}

impl Environment {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            default_options_file: Some(PathBuf::from(DEFAULT_OPTIONS_FILE)),
        }
    }

    pub fn from_process() -> Self {
        let program = std::env::args().next().unwrap_or_else(|| "specr".to_string());
        Self::new(program)
    }

    pub fn without_default_options_file(mut self) -> Self {
        self.default_options_file = None;
        self
    }

    /// Basename of the program without any extension.
    pub fn program_name(&self) -> &str {
        Path::new(&self.program)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.program)
    }

    pub fn is_spec_command(&self) -> bool {
        SPEC_COMMANDS.contains(&self.program_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_command_detection() {
        assert!(Environment::new("/usr/local/bin/spec").is_spec_command());
        assert!(Environment::new("specr").is_spec_command());
        assert!(Environment::new("target/debug/specr.exe").is_spec_command());
        assert!(!Environment::new("specr-server").is_spec_command());
        assert!(!Environment::new("rake").is_spec_command());
    }

    #[test]
    fn test_default_options_file() {
        let env = Environment::new("specr");
        assert_eq!(
            env.default_options_file.as_deref(),
            Some(Path::new("spec/spec.opts"))
        );
        assert!(env.without_default_options_file().default_options_file.is_none());
    }
}
