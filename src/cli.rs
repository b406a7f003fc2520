use crate::remote::DEFAULT_REMOTE_ADDR;
use clap::Parser;

/// Command line of `specr-server`, the endpoint behind `--drb`.
#[derive(Parser, Debug)]
#[command(
    name = "specr-server",
    about = "Accepts forwarded spec runs over TCP",
    version
)]
pub struct ServerCli {
    /// Address to listen on
    #[arg(short, long, default_value = DEFAULT_REMOTE_ADDR)]
    pub bind: String,

    /// Seconds to wait for a client's request before dropping it
    #[arg(short, long, default_value_t = 10)]
    pub timeout: u64,

    /// Handle a single connection, then exit
    #[arg(long)]
    pub once: bool,

    /// Log each request
    #[arg(short, long)]
    pub verbose: bool,
}
