use specr::{
    Environment, ModuleRegistry, OsFileSystem, Resolution, Resolver, Streams, TcpRemoteRunner,
};
use std::io::Write;

fn main() -> anyhow::Result<()> {
    // Reset SIGPIPE handler to default (terminate) so piping to head/tail works correctly
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    specr::init_logging("warn");

    let use_color = atty::is(atty::Stream::Stdout);
    let fs = OsFileSystem::current_dir()?;
    let mut resolver = Resolver::new(
        Environment::from_process(),
        Streams::console(use_color),
        Box::new(fs),
    )
    .with_module_loader(Box::new(ModuleRegistry::new()))
    .with_remote(Box::new(TcpRemoteRunner::from_env()));

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let resolution = resolver.resolve(argv, &mut |target| {
        tracing::debug!(path = %target.path, line = ?target.line, "target");
    });

    match resolution {
        Resolution::Exit { code } => std::process::exit(code),
        Resolution::Options(options) if options.should_run() => {
            let stdout = std::io::stdout();
            let mut stdout = stdout.lock();
            serde_json::to_writer_pretty(&mut stdout, &options)?;
            writeln!(stdout)?;
        }
        Resolution::Options(_) => {}
    }

    Ok(())
}
