//! The resolved run configuration and the value types it is built from.

use crate::error::{Error, Result};
use crate::extensions::{ExtensionKind, Extensions};
use crate::fs::FileSystem;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub const DEFAULT_PATTERN: &str = "**/*_spec.rb";

static HECKLE_TARGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+(?:::\w+)*)(?:#(\w+[?!=]?))?$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffFormat {
    Unified,
    Context,
    Custom(String),
}

impl DiffFormat {
    /// `None` (flag given without a value) selects the unified differ.
    pub fn parse(flag: &str, value: Option<&str>, extensions: &Extensions) -> Result<Self> {
        match value {
            None | Some("unified") | Some("u") => Ok(DiffFormat::Unified),
            Some("context") | Some("c") => Ok(DiffFormat::Context),
            Some(name) if extensions.contains(ExtensionKind::Differ, name) => {
                Ok(DiffFormat::Custom(name.to_string()))
            }
            Some(name) => Err(unknown_extension(flag, name, ExtensionKind::Differ)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExampleFilter {
    /// Run examples whose name matches.
    Name(String),
    /// Names read from a file, one per line.
    File { path: String, names: Vec<String> },
}

impl ExampleFilter {
    /// An existing file is read as a list of names; an empty file clears
    /// the filter. Anything else is taken as an example name.
    pub fn resolve(value: &str, fs: &dyn FileSystem) -> Result<Option<Self>> {
        let path = Path::new(value);
        if !fs.exists(path) {
            return Ok(Some(ExampleFilter::Name(value.to_string())));
        }

        let content = fs
            .read_to_string(path)
            .map_err(|source| Error::ReadExampleFile {
                path: path.to_path_buf(),
                source,
            })?;
        let names: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        if names.is_empty() {
            Ok(None)
        } else {
            Ok(Some(ExampleFilter::File {
                path: value.to_string(),
                names,
            }))
        }
    }

    pub fn names(&self) -> Vec<&str> {
        match self {
            ExampleFilter::Name(name) => vec![name.as_str()],
            ExampleFilter::File { names, .. } => names.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinFormat {
    Silent,
    Progress,
    Profile,
    Specdoc,
    Nested,
    Html,
    FailingExamples,
    FailingExampleGroups,
}

impl BuiltinFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        let format = match name {
            "silent" | "l" => BuiltinFormat::Silent,
            "progress" | "p" => BuiltinFormat::Progress,
            "profile" | "o" => BuiltinFormat::Profile,
            "specdoc" | "s" => BuiltinFormat::Specdoc,
            "nested" | "n" => BuiltinFormat::Nested,
            "html" | "h" => BuiltinFormat::Html,
            "failing_examples" | "e" => BuiltinFormat::FailingExamples,
            "failing_example_groups" | "g" => BuiltinFormat::FailingExampleGroups,
            _ => return None,
        };
        Some(format)
    }

    pub fn name(self) -> &'static str {
        match self {
            BuiltinFormat::Silent => "silent",
            BuiltinFormat::Progress => "progress",
            BuiltinFormat::Profile => "profile",
            BuiltinFormat::Specdoc => "specdoc",
            BuiltinFormat::Nested => "nested",
            BuiltinFormat::Html => "html",
            BuiltinFormat::FailingExamples => "failing_examples",
            BuiltinFormat::FailingExampleGroups => "failing_example_groups",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Formatter {
    Builtin(BuiltinFormat),
    Custom(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Stdout,
    File(PathBuf),
}

/// One `--format FORMAT[:WHERE]` occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatSpec {
    pub formatter: Formatter,
    pub destination: Destination,
}

impl FormatSpec {
    pub fn parse(flag: &str, value: &str, extensions: &Extensions) -> Result<Self> {
        let (name, destination) = match value.split_once(':') {
            Some((name, "")) => (name, Destination::Stdout),
            Some((name, target)) => (name, Destination::File(PathBuf::from(target))),
            None => (value, Destination::Stdout),
        };

        let formatter = if let Some(builtin) = BuiltinFormat::from_name(name) {
            Formatter::Builtin(builtin)
        } else if extensions.contains(ExtensionKind::Formatter, name) {
            Formatter::Custom(name.to_string())
        } else {
            return Err(unknown_extension(flag, name, ExtensionKind::Formatter));
        };

        Ok(Self {
            formatter,
            destination,
        })
    }

    pub fn name(&self) -> &str {
        match &self.formatter {
            Formatter::Builtin(builtin) => builtin.name(),
            Formatter::Custom(name) => name,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BacktraceMode {
    #[default]
    Quiet,
    Full,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadOrder {
    #[default]
    Alphabetical,
    ModificationTime,
}

impl LoadOrder {
    pub fn parse(flag: &str, value: &str) -> Result<Self> {
        match value {
            "mtime" => Ok(LoadOrder::ModificationTime),
            other => Err(Error::invalid_argument(
                flag,
                other,
                "the only supported strategy is 'mtime'",
            )),
        }
    }
}

/// What `--heckle` should mutate: a module or class, optionally one method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeckleTarget {
    pub path: String,
    pub method: Option<String>,
}

impl HeckleTarget {
    pub fn parse(flag: &str, value: &str) -> Result<Self> {
        let captures = HECKLE_TARGET.captures(value).ok_or_else(|| {
            Error::invalid_argument(flag, value, "expected Some::Module or Some::Class#method")
        })?;
        Ok(Self {
            path: captures[1].to_string(),
            method: captures.get(2).map(|m| m.as_str().to_string()),
        })
    }
}

/// `--runner NAME[:ARG]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunnerChoice {
    pub name: String,
    pub argument: Option<String>,
}

impl RunnerChoice {
    pub fn parse(flag: &str, value: &str, extensions: &Extensions) -> Result<Self> {
        let (name, argument) = match value.split_once(':') {
            Some((name, argument)) => (name, Some(argument.to_string())),
            None => (value, None),
        };
        if !extensions.contains(ExtensionKind::Runner, name) {
            return Err(unknown_extension(flag, name, ExtensionKind::Runner));
        }
        Ok(Self {
            name: name.to_string(),
            argument,
        })
    }
}

/// A positional argument: file, directory or glob, optionally pinned to a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub path: String,
    pub line: Option<u32>,
}

impl Target {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line: None,
        }
    }

    /// The line filter for this target: its own line, else the global one.
    pub fn effective_line(&self, global: Option<u32>) -> Option<u32> {
        self.line.or(global)
    }
}

/// Fully resolved configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOptions {
    pub filename_pattern: String,
    pub diff: Option<DiffFormat>,
    pub colour: bool,
    pub example: Option<ExampleFilter>,
    pub line_number: Option<u32>,
    pub formats: Vec<FormatSpec>,
    pub requires: Vec<String>,
    pub backtrace: BacktraceMode,
    pub load_order: LoadOrder,
    pub reverse: bool,
    pub timeout: Option<f64>,
    pub heckle: Option<HeckleTarget>,
    pub dry_run: bool,
    pub examples_should_not_be_run: bool,
    pub runner: Option<RunnerChoice>,
    pub debug: bool,
    pub autospec: bool,
    pub argv: Vec<String>,
    pub targets: Vec<Target>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            filename_pattern: DEFAULT_PATTERN.to_string(),
            diff: None,
            colour: false,
            example: None,
            line_number: None,
            formats: Vec::new(),
            requires: Vec::new(),
            backtrace: BacktraceMode::default(),
            load_order: LoadOrder::default(),
            reverse: false,
            timeout: None,
            heckle: None,
            dry_run: false,
            examples_should_not_be_run: false,
            runner: None,
            debug: false,
            autospec: false,
            argv: Vec::new(),
            targets: Vec::new(),
        }
    }
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the run as handled elsewhere. The caller must not execute.
    pub fn suppress_execution(&mut self) {
        self.examples_should_not_be_run = true;
    }

    pub fn should_run(&self) -> bool {
        !self.examples_should_not_be_run
    }

    pub fn filename_patterns(&self) -> Vec<&str> {
        self.filename_pattern
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect()
    }

    pub fn format_names(&self) -> Vec<&str> {
        self.formats.iter().map(FormatSpec::name).collect()
    }

    pub fn target_paths(&self) -> Vec<&str> {
        self.targets.iter().map(|t| t.path.as_str()).collect()
    }

    pub fn uses_mutation_runner(&self) -> bool {
        self.heckle.is_some()
    }
}

fn unknown_extension(flag: &str, name: &str, kind: ExtensionKind) -> Error {
    Error::invalid_argument(
        flag,
        name,
        format!("unknown {} '{}', load it with --require first", kind.describe(), name),
    )
}
