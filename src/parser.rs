//! Applies an argument stream to a [`RunOptions`], flag by flag.
//!
//! Flags take effect in command-line order. That matters for `--require`,
//! which must load its modules before a later `--format` or `--runner` can
//! name what they provide.

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::extensions::{Extensions, ModuleLoader};
use crate::fs::FileSystem;
use crate::numeric;
use crate::options::{
    BacktraceMode, DiffFormat, ExampleFilter, FormatSpec, HeckleTarget, LoadOrder, RunOptions,
    RunnerChoice, Target, DEFAULT_PATTERN,
};
use crate::output::Sink;
use crate::registry::{self, ArgKind, Flag, FlagSpec};
use regex::Regex;
use std::io::Write;
use std::sync::LazyLock;

static LINE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.+):(\d+)$").unwrap());

/// Whether the caller should carry on after parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Help or version was written to the console.
    Exit(i32),
}

pub struct Parser<'a> {
    env: &'a Environment,
    fs: &'a dyn FileSystem,
    loader: &'a mut dyn ModuleLoader,
    extensions: &'a mut Extensions,
    out: &'a mut Sink,
}

impl<'a> Parser<'a> {
    pub fn new(
        env: &'a Environment,
        fs: &'a dyn FileSystem,
        loader: &'a mut dyn ModuleLoader,
        extensions: &'a mut Extensions,
        out: &'a mut Sink,
    ) -> Self {
        Self {
            env,
            fs,
            loader,
            extensions,
            out,
        }
    }

    /// Parses `argv` into `options`, calling `on_file` for every positional
    /// target as it is seen.
    pub fn parse(
        &mut self,
        argv: &[String],
        options: &mut RunOptions,
        on_file: &mut dyn FnMut(&Target),
    ) -> Result<Flow> {
        let mut index = 0;
        let mut only_positional = false;

        while index < argv.len() {
            let token = argv[index].as_str();
            index += 1;

            if only_positional || token == "-" || !token.starts_with('-') {
                self.positional(token, options, on_file)?;
                continue;
            }
            if token == "--" {
                only_positional = true;
                continue;
            }

            let flow = if token.starts_with("--") {
                self.long_flag(token, argv, &mut index, options)?
            } else {
                self.short_flags(token, argv, &mut index, options)?
            };
            if let Flow::Exit(code) = flow {
                return Ok(Flow::Exit(code));
            }
        }

        Ok(Flow::Continue)
    }

    fn long_flag(
        &mut self,
        token: &str,
        argv: &[String],
        index: &mut usize,
        options: &mut RunOptions,
    ) -> Result<Flow> {
        let (name, attached) = match token.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (token, None),
        };
        let spec = registry::lookup(name).ok_or_else(|| Error::InvalidOption(name.to_string()))?;

        if spec.arg == ArgKind::None {
            if let Some(value) = attached {
                return Err(Error::NeedlessArgument {
                    flag: name.to_string(),
                    value: value.to_string(),
                });
            }
        }

        let value = take_value(spec, name, attached, argv, index)?;
        self.apply(spec, name, value, options)
    }

    /// `-c`, `-fprogress`, `-f progress` and clusters such as `-cR`.
    fn short_flags(
        &mut self,
        token: &str,
        argv: &[String],
        index: &mut usize,
        options: &mut RunOptions,
    ) -> Result<Flow> {
        let mut rest = &token[1..];

        while let Some(c) = rest.chars().next() {
            rest = &rest[c.len_utf8()..];
            let name = format!("-{}", c);
            let spec = registry::lookup(&name).ok_or_else(|| Error::InvalidOption(name.clone()))?;

            let flow = if spec.takes_value() {
                let attached = (!rest.is_empty()).then_some(rest);
                rest = "";
                let value = take_value(spec, &name, attached, argv, index)?;
                self.apply(spec, &name, value, options)?
            } else {
                self.apply(spec, &name, None, options)?
            };

            if let Flow::Exit(code) = flow {
                return Ok(Flow::Exit(code));
            }
        }

        Ok(Flow::Continue)
    }

    fn positional(
        &mut self,
        token: &str,
        options: &mut RunOptions,
        on_file: &mut dyn FnMut(&Target),
    ) -> Result<()> {
        let target = match LINE_SUFFIX.captures(token) {
            Some(caps) => {
                // Digits only, so the parse can fail only on overflow.
                let line = caps[2].parse::<i64>().unwrap_or(i64::MAX);
                Target {
                    path: caps[1].to_string(),
                    line: Some(line_number("FILE:LINE", token, line)?),
                }
            }
            None => Target::new(token),
        };

        on_file(&target);
        options.targets.push(target);
        Ok(())
    }

    fn apply(
        &mut self,
        spec: &FlagSpec,
        name: &str,
        value: Option<String>,
        options: &mut RunOptions,
    ) -> Result<Flow> {
        tracing::trace!(flag = name, value = ?value, "applying flag");

        match spec.key {
            Flag::Pattern => {
                options.filename_pattern = value.unwrap_or_else(|| DEFAULT_PATTERN.to_string());
            }
            Flag::Diff => {
                options.diff = Some(DiffFormat::parse(name, value.as_deref(), self.extensions)?);
            }
            Flag::Colour => options.colour = true,
            Flag::Example | Flag::Specification => {
                let value = required(name, value)?;
                options.example = ExampleFilter::resolve(&value, self.fs)?;
            }
            Flag::Line => {
                let value = required(name, value)?;
                let line = numeric::parse_int(&value)
                    .ok_or_else(|| Error::invalid_argument(name, &value, "not an integer"))?;
                options.line_number = Some(line_number(name, &value, line)?);
            }
            Flag::Format => {
                let value = required(name, value)?;
                options
                    .formats
                    .push(FormatSpec::parse(name, &value, self.extensions)?);
            }
            Flag::Require => {
                let value = required(name, value)?;
                for module in value.split(',').map(str::trim).filter(|m| !m.is_empty()) {
                    self.loader.require(module, self.fs, self.extensions)?;
                    options.requires.push(module.to_string());
                }
            }
            Flag::Backtrace => options.backtrace = BacktraceMode::Full,
            Flag::LoadBy => {
                let value = required(name, value)?;
                options.load_order = LoadOrder::parse(name, &value)?;
            }
            Flag::Reverse => options.reverse = true,
            Flag::Timeout => {
                let value = required(name, value)?;
                let timeout = numeric::parse_float(&value)
                    .ok_or_else(|| Error::invalid_argument(name, &value, "not a number"))?;
                if timeout < 0.0 {
                    return Err(Error::invalid_argument(name, &value, "must not be negative"));
                }
                options.timeout = Some(timeout);
            }
            Flag::Heckle => {
                let value = required(name, value)?;
                options.heckle = Some(HeckleTarget::parse(name, &value)?);
            }
            Flag::DryRun => options.dry_run = true,
            Flag::OptionsFile | Flag::GenerateOptions | Flag::Drb => {
                // Consumed before parsing; anything left here is inert.
            }
            Flag::Runner => {
                let value = required(name, value)?;
                options.runner = Some(RunnerChoice::parse(name, &value, self.extensions)?);
            }
            Flag::Debug => options.debug = true,
            Flag::Autospec => options.autospec = true,
            Flag::Version => {
                writeln!(self.out, "{} {}", self.env.program_name(), self.env.version)?;
                return Ok(self.exit_if_console());
            }
            Flag::Help => {
                write!(self.out, "{}", registry::render_help(self.env.program_name()))?;
                return Ok(self.exit_if_console());
            }
        }

        Ok(Flow::Continue)
    }

    fn exit_if_console(&mut self) -> Flow {
        let _ = self.out.flush();
        if self.out.is_console() {
            Flow::Exit(0)
        } else {
            Flow::Continue
        }
    }
}

fn take_value(
    spec: &FlagSpec,
    name: &str,
    attached: Option<&str>,
    argv: &[String],
    index: &mut usize,
) -> Result<Option<String>> {
    if let Some(value) = attached {
        return Ok(Some(value.to_string()));
    }

    match spec.arg {
        ArgKind::None => Ok(None),
        ArgKind::OptionalString => match argv.get(*index) {
            Some(next) if !next.starts_with('-') => {
                *index += 1;
                Ok(Some(next.clone()))
            }
            _ => Ok(None),
        },
        ArgKind::String | ArgKind::Int | ArgKind::Float => match argv.get(*index) {
            Some(next) => {
                *index += 1;
                Ok(Some(next.clone()))
            }
            None => Err(Error::MissingArgument(name.to_string())),
        },
    }
}

fn line_number(name: &str, value: &str, line: i64) -> Result<u32> {
    if line <= 0 {
        return Err(Error::invalid_argument(name, value, "must be positive"));
    }
    u32::try_from(line).map_err(|_| Error::invalid_argument(name, value, "out of range"))
}

fn required(name: &str, value: Option<String>) -> Result<String> {
    value.ok_or_else(|| Error::MissingArgument(name.to_string()))
}
