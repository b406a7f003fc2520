//! Static catalog of every flag the resolver understands.
//!
//! The registry is pure data: spellings, argument arity and help text. The
//! behaviour attached to each [`Flag`] lives in the parser.

use std::fmt::Write as _;

const SUMMARY_INDENT: &str = "    ";
const SUMMARY_WIDTH: usize = 32;

/// Canonical key of a flag. Every variant has exactly one [`FlagSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    Pattern,
    Diff,
    Colour,
    Example,
    Specification,
    Line,
    Format,
    Require,
    Backtrace,
    LoadBy,
    Reverse,
    Timeout,
    Heckle,
    DryRun,
    OptionsFile,
    GenerateOptions,
    Runner,
    Debug,
    Drb,
    Version,
    Autospec,
    Help,
}

/// What a flag expects after its spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    None,
    /// Taken when attached, or when the next token is not flag-like.
    OptionalString,
    String,
    Int,
    Float,
}

#[derive(Debug)]
pub struct FlagSpec {
    pub key: Flag,
    pub spellings: &'static [&'static str],
    pub arg: ArgKind,
    /// Placeholder shown in help text, e.g. `PATTERN`.
    pub value_name: &'static str,
    pub help: &'static [&'static str],
    pub hidden: bool,
}

impl FlagSpec {
    pub fn takes_value(&self) -> bool {
        self.arg != ArgKind::None
    }

    /// The first spelling, used when naming the flag in messages.
    pub fn name(&self) -> &'static str {
        self.spellings.first().copied().unwrap_or_default()
    }

    fn summary(&self) -> String {
        let mut summary = self.spellings.join(", ");
        match self.arg {
            ArgKind::None => {}
            ArgKind::OptionalString => {
                let _ = write!(summary, " [{}]", self.value_name);
            }
            ArgKind::String | ArgKind::Int | ArgKind::Float => {
                let _ = write!(summary, " {}", self.value_name);
            }
        }
        summary
    }
}

macro_rules! flag {
    ($key:ident, [$($spelling:literal),+], $arg:ident, $value:literal, [$($help:literal),* $(,)?]) => {
        FlagSpec {
            key: Flag::$key,
            spellings: &[$($spelling),+],
            arg: ArgKind::$arg,
            value_name: $value,
            help: &[$($help),*],
            hidden: false,
        }
    };
}

/// All flags in help display order. `--help` is listed last.
pub static REGISTRY: &[FlagSpec] = &[
    flag!(Pattern, ["-p", "--pattern"], OptionalString, "PATTERN", [
        "Limit files loaded to those matching this pattern. Defaults to '**/*_spec.rb'",
        "Separate multiple patterns with commas.",
        "Applies only to directories named on the command line (files",
        "named explicitly on the command line will be loaded regardless).",
    ]),
    flag!(Diff, ["-D", "--diff"], OptionalString, "FORMAT", [
        "Show diff of objects that are expected to be equal when they are not",
        "Builtin formats: unified|u|context|c",
        "You can also specify a custom differ",
        "(in which case you should also specify --require)",
    ]),
    flag!(Colour, ["-c", "--colour", "--color"], None, "", [
        "Show coloured (red/green) output",
    ]),
    flag!(Example, ["-e", "--example"], String, "NAME|FILE_NAME", [
        "Execute example(s) with matching name(s). If the argument is",
        "the path to an existing file (typically generated by a previous",
        "run using --format failing_examples:file.txt), then the examples",
        "on each line of that file will be executed. If the file is empty,",
        "all examples will be run (as if --example was not specified).",
        " ",
        "If the argument is not an existing file, then it is treated as",
        "an example name directly.",
    ]),
    flag!(Specification, ["-s", "--specification"], String, "NAME", [
        "DEPRECATED - use -e instead",
    ]),
    flag!(Line, ["-l", "--line"], Int, "LINE_NUMBER", [
        "Execute example group or example at given line.",
        "(does not work for dynamically generated examples)",
    ]),
    flag!(Format, ["-f", "--format"], String, "FORMAT[:WHERE]", [
        "Specifies what format to use for output. Specify WHERE to tell",
        "the formatter where to write the output. All built-in formats",
        "expect WHERE to be a file name, and will write to stdout if it's",
        "not specified. The --format option may be specified several times",
        "if you want several outputs",
        " ",
        "Builtin formats:",
        "silent|l                 : No output",
        "progress|p               : Text-based progress bar",
        "profile|o                : Text-based progress bar with profiling of 10 slowest examples",
        "specdoc|s                : Code example doc strings",
        "nested|n                 : Code example doc strings with nested groups indented",
        "html|h                   : A nice HTML report",
        "failing_examples|e       : Write all failing examples - input for --example",
        "failing_example_groups|g : Write all failing example groups - input for --example",
        " ",
        "FORMAT can also be the name of a custom formatter",
        "(in which case you should also specify --require to load it)",
    ]),
    flag!(Require, ["-r", "--require"], String, "FILE", [
        "Require FILE before running specs",
        "Useful for loading custom formatters or other extensions.",
        "If this option is used it must come before the others",
    ]),
    flag!(Backtrace, ["-b", "--backtrace"], None, "", [
        "Output full backtrace",
    ]),
    flag!(LoadBy, ["-L", "--loadby"], String, "STRATEGY", [
        "Specify the strategy by which spec files should be loaded.",
        "STRATEGY can currently only be 'mtime' (File modification time)",
        "By default, spec files are loaded in alphabetical order if --loadby",
        "is not specified.",
    ]),
    flag!(Reverse, ["-R", "--reverse"], None, "", [
        "Run examples in reverse order",
    ]),
    flag!(Timeout, ["-t", "--timeout"], Float, "FLOAT", [
        "Interrupt and fail each example that doesn't complete in the",
        "specified time",
    ]),
    flag!(Heckle, ["-H", "--heckle"], String, "CODE", [
        "If all examples pass, this will mutate the classes and methods",
        "identified by CODE little by little and run all the examples again",
        "for each mutation. The intent is that for each mutation, at least",
        "one example *should* fail. CODE should be either Some::Module,",
        "Some::Class or Some::Fabulous#method",
    ]),
    flag!(DryRun, ["-d", "--dry-run"], None, "", [
        "Invokes formatters without executing the examples.",
    ]),
    flag!(OptionsFile, ["-O", "--options"], String, "PATH", [
        "Read options from a file",
    ]),
    flag!(GenerateOptions, ["-G", "--generate-options"], String, "PATH", [
        "Generate an options file for --options",
    ]),
    flag!(Runner, ["-U", "--runner"], String, "RUNNER", [
        "Use a custom Runner.",
    ]),
    flag!(Debug, ["-u", "--debugger"], None, "", [
        "Enable debugging.",
    ]),
    flag!(Drb, ["-X", "--drb"], None, "", [
        "Run examples on a remote endpoint (for example against specr-server)",
    ]),
    flag!(Version, ["-v", "--version"], None, "", [
        "Show version",
    ]),
    FlagSpec {
        key: Flag::Autospec,
        spellings: &["--autospec"],
        arg: ArgKind::None,
        value_name: "",
        help: &[],
        hidden: true,
    },
    flag!(Help, ["-h", "--help"], None, "", [
        "You're looking at it",
    ]),
];

/// Finds the flag owning `spelling` exactly as typed (no `=value` suffix).
pub fn lookup(spelling: &str) -> Option<&'static FlagSpec> {
    REGISTRY
        .iter()
        .find(|spec| spec.spellings.contains(&spelling))
}

pub fn spellings_of(key: Flag) -> &'static [&'static str] {
    REGISTRY
        .iter()
        .find(|spec| spec.key == key)
        .map(|spec| spec.spellings)
        .unwrap_or(&[])
}

pub fn banner(program: &str) -> String {
    format!("Usage: {} (FILE(:LINE)?|DIRECTORY|GLOB)+ [options]", program)
}

/// Full usage text: banner followed by one summary block per visible flag.
pub fn render_help(program: &str) -> String {
    let mut out = banner(program);
    out.push_str("\n\n");

    for spec in REGISTRY.iter().filter(|spec| !spec.hidden) {
        let summary = spec.summary();
        let mut lines = spec.help.iter();

        if summary.len() > SUMMARY_WIDTH {
            let _ = writeln!(out, "{}{}", SUMMARY_INDENT, summary);
        } else {
            let first = lines.next().copied().unwrap_or_default();
            let _ = writeln!(
                out,
                "{}{:<width$} {}",
                SUMMARY_INDENT,
                summary,
                first,
                width = SUMMARY_WIDTH
            );
        }

        for line in lines {
            let _ = writeln!(
                out,
                "{}{:<width$} {}",
                SUMMARY_INDENT,
                "",
                line,
                width = SUMMARY_WIDTH
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_keys_are_unique() {
        let mut seen = HashSet::new();
        for spec in REGISTRY {
            assert!(seen.insert(spec.key), "duplicate key {:?}", spec.key);
        }
    }

    #[test]
    fn test_spellings_are_unique() {
        let mut seen = HashSet::new();
        for spec in REGISTRY {
            for spelling in spec.spellings {
                assert!(seen.insert(*spelling), "duplicate spelling {}", spelling);
            }
        }
    }

    #[test]
    fn test_lookup_colour_alias() {
        assert_eq!(lookup("--color").map(|s| s.key), Some(Flag::Colour));
        assert_eq!(lookup("-c").map(|s| s.key), Some(Flag::Colour));
        assert!(lookup("--bogus").is_none());
    }

    #[test]
    fn test_help_is_last_and_autospec_hidden() {
        assert_eq!(REGISTRY.last().map(|s| s.key), Some(Flag::Help));
        let help = render_help("specr");
        assert!(help.starts_with("Usage: specr"));
        assert!(help.contains("-f, --format FORMAT[:WHERE]"));
        assert!(help.contains("-p, --pattern [PATTERN]"));
        assert!(!help.contains("--autospec"));
    }

    #[test]
    fn test_spellings_of() {
        assert_eq!(spellings_of(Flag::OptionsFile), &["-O", "--options"]);
        assert_eq!(spellings_of(Flag::Drb), &["-X", "--drb"]);
    }
}
