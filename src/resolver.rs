//! Turns raw process arguments into a [`RunOptions`].
//!
//! Resolution runs in a fixed order: options files are spliced in first,
//! then `--generate-options` may write the stream out and stop, then the
//! remote flag may hand the run to another process and stop, and finally
//! whatever is left is parsed locally.

use crate::environment::Environment;
use crate::error::{Category, Error, Result};
use crate::extensions::{Extensions, ModuleLoader, ModuleRegistry};
use crate::fs::FileSystem;
use crate::options::{RunOptions, Target};
use crate::options_file::{self, FileAction};
use crate::output::Streams;
use crate::parser::{Flow, Parser};
use crate::registry;
use crate::remote::{self, Dispatch, NoRemote, RemoteRunner};
use std::error::Error as _;
use std::io::Write;

#[derive(Debug)]
pub enum Resolution {
    /// Parsing finished. Check [`RunOptions::should_run`] before executing.
    Options(RunOptions),
    /// Stop with this exit code: help or version on the console, or a
    /// fatal error already reported on the error stream.
    Exit { code: i32 },
}

impl Resolution {
    pub fn options(&self) -> Option<&RunOptions> {
        match self {
            Resolution::Options(options) => Some(options),
            Resolution::Exit { .. } => None,
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Resolution::Options(_) => None,
            Resolution::Exit { code } => Some(*code),
        }
    }
}

pub struct Resolver {
    env: Environment,
    streams: Streams,
    fs: Box<dyn FileSystem>,
    loader: Box<dyn ModuleLoader>,
    remote: Box<dyn RemoteRunner>,
    extensions: Extensions,
}

impl Resolver {
    pub fn new(env: Environment, streams: Streams, fs: Box<dyn FileSystem>) -> Self {
        Self {
            env,
            streams,
            fs,
            loader: Box::new(ModuleRegistry::new()),
            remote: Box::new(NoRemote),
            extensions: Extensions::new(),
        }
    }

    pub fn with_module_loader(mut self, loader: Box<dyn ModuleLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_remote(mut self, remote: Box<dyn RemoteRunner>) -> Self {
        self.remote = remote;
        self
    }

    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn streams(&self) -> &Streams {
        &self.streams
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Resolves `argv`, reporting any fatal error on the error stream and
    /// turning it into a non-zero [`Resolution::Exit`].
    pub fn resolve(&mut self, argv: Vec<String>, on_file: &mut dyn FnMut(&Target)) -> Resolution {
        match self.try_resolve(argv, on_file) {
            Ok(resolution) => resolution,
            Err(err) => {
                tracing::debug!(error = %err, "resolution failed");
                let usage = (err.category() == Category::Usage)
                    .then(|| registry::render_help(self.env.program_name()));
                self.streams.print_error(&describe(&err), usage.as_deref());
                Resolution::Exit { code: 1 }
            }
        }
    }

    pub fn try_resolve(
        &mut self,
        argv: Vec<String>,
        on_file: &mut dyn FnMut(&Target),
    ) -> Result<Resolution> {
        let mut argv = argv;
        if argv.is_empty() && self.env.is_spec_command() {
            argv.push("--help".to_string());
        }

        options_file::resolve(
            &mut argv,
            FileAction::Load,
            self.fs.as_ref(),
            self.env.default_options_file.as_deref(),
        )?;

        let mut options = RunOptions::new();

        if let Some(path) =
            options_file::resolve(&mut argv, FileAction::Generate, self.fs.as_ref(), None)?
        {
            let out = &mut self.streams.out;
            writeln!(out)?;
            writeln!(
                out,
                "Options written to {}. You can now use these options with:",
                path.display()
            )?;
            writeln!(out, "{} --options {}", self.env.program_name(), path.display())?;
            options.argv = argv;
            options.suppress_execution();
            return Ok(Resolution::Options(options));
        }

        match remote::maybe_dispatch(&mut argv, self.remote.as_ref()) {
            Dispatch::NotApplicable => {}
            Dispatch::Succeeded(response) => {
                write!(self.streams.out, "{}", response.output)?;
                options.argv = argv;
                options.suppress_execution();
                return Ok(Resolution::Options(options));
            }
            Dispatch::Failed(err) => {
                tracing::warn!(error = %err, "remote dispatch failed, falling back to local run");
                self.streams.print_warning("Running specs locally:");
            }
        }

        options.argv = argv.clone();
        let flow = Parser::new(
            &self.env,
            self.fs.as_ref(),
            self.loader.as_mut(),
            &mut self.extensions,
            &mut self.streams.out,
        )
        .parse(&argv, &mut options, on_file)?;

        match flow {
            Flow::Exit(code) => Ok(Resolution::Exit { code }),
            Flow::Continue => Ok(Resolution::Options(options)),
        }
    }

    pub fn into_streams(self) -> Streams {
        self.streams
    }
}

/// The error message followed by its chain of causes.
fn describe(err: &Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.ends_with(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}
