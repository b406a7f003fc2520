pub mod cli;
pub mod environment;
pub mod error;
pub mod extensions;
pub mod fs;
pub mod numeric;
pub mod options;
pub mod options_file;
pub mod output;
pub mod parser;
pub mod registry;
pub mod remote;
pub mod resolver;
pub mod server;

pub use environment::Environment;
pub use error::{Category, Error, Result};
pub use extensions::{ExtensionKind, Extensions, ModuleLoader, ModuleRegistry};
pub use fs::{FileSystem, OsFileSystem};
pub use options::{RunOptions, Target};
pub use output::{Sink, Streams};
pub use remote::{NoRemote, RemoteRunner, TcpRemoteRunner};
pub use resolver::{Resolution, Resolver};

/// Installs the stderr log subscriber, filtered by `SPECR_LOG`.
pub fn init_logging(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_env("SPECR_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
