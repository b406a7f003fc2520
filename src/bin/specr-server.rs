use clap::Parser;
use specr::cli::ServerCli;
use specr::server::{self, RunHandler};
use specr::{Environment, ModuleRegistry, OsFileSystem, Resolver, RunOptions, Sink, Streams};
use std::io::Write;
use std::net::TcpListener;
use std::time::Duration;

/// Reports each resolved run as JSON, for the engine on this host to pick up.
struct JsonReport;

impl RunHandler for JsonReport {
    fn run(&mut self, options: &RunOptions, out: &mut Sink) -> bool {
        match serde_json::to_string_pretty(options) {
            Ok(json) => writeln!(out, "{}", json).is_ok(),
            Err(e) => {
                tracing::error!(error = %e, "cannot serialize run options");
                false
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    let cli = ServerCli::parse();
    specr::init_logging(if cli.verbose { "debug" } else { "info" });

    let listener = TcpListener::bind(&cli.bind)?;
    tracing::info!(addr = %listener.local_addr()?, "listening for remote runs");

    let root = OsFileSystem::current_dir()?.root().to_path_buf();
    let mut make_resolver = |streams: Streams| {
        Resolver::new(
            Environment::new("specr-server"),
            streams,
            Box::new(OsFileSystem::new(root.clone())),
        )
        .with_module_loader(Box::new(ModuleRegistry::new()))
    };

    let limit = cli.once.then_some(1);
    server::serve(
        &listener,
        &mut make_resolver,
        &mut JsonReport,
        Duration::from_secs(cli.timeout),
        limit,
    )?;
    Ok(())
}
