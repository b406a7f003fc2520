//! Forwarding a run to an out-of-process endpoint.
//!
//! The wire format is one JSON object per line in each direction: a
//! [`RemoteRequest`] from the client, a [`RemoteResponse`] back.

use crate::error::{Error, Result};
use crate::numeric;
use crate::registry::{self, Flag};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

pub const DEFAULT_REMOTE_ADDR: &str = "127.0.0.1:8989";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRequest {
    pub argv: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteResponse {
    pub success: bool,
    /// Everything the endpoint wrote while resolving and running.
    #[serde(default)]
    pub output: String,
}

/// Something that can run an argument list elsewhere.
pub trait RemoteRunner {
    fn run(&self, argv: &[String]) -> Result<RemoteResponse>;
}

/// Used when no endpoint is configured. Always fails, so the run stays local.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRemote;

impl RemoteRunner for NoRemote {
    fn run(&self, _argv: &[String]) -> Result<RemoteResponse> {
        Err(Error::Remote("no remote endpoint configured".to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct TcpRemoteRunner {
    addr: String,
    connect_timeout: Duration,
    io_timeout: Duration,
}

impl TcpRemoteRunner {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    /// Reads `SPECR_REMOTE_ADDR` and `SPECR_REMOTE_TIMEOUT` (seconds).
    pub fn from_env() -> Self {
        let addr =
            std::env::var("SPECR_REMOTE_ADDR").unwrap_or_else(|_| DEFAULT_REMOTE_ADDR.to_string());
        let mut runner = Self::new(addr);

        if let Ok(raw) = std::env::var("SPECR_REMOTE_TIMEOUT") {
            match numeric::parse_float(&raw).filter(|secs| *secs > 0.0) {
                Some(secs) => runner.io_timeout = Duration::from_secs_f64(secs),
                None => tracing::warn!(value = %raw, "ignoring invalid SPECR_REMOTE_TIMEOUT"),
            }
        }
        runner
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    fn connect(&self) -> Result<TcpStream> {
        let addrs = self
            .addr
            .to_socket_addrs()
            .map_err(|e| Error::Remote(format!("cannot resolve {}: {}", self.addr, e)))?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_error = Some(e),
            }
        }

        Err(Error::Remote(match last_error {
            Some(e) => format!("cannot connect to {}: {}", self.addr, e),
            None => format!("no addresses for {}", self.addr),
        }))
    }
}

impl RemoteRunner for TcpRemoteRunner {
    fn run(&self, argv: &[String]) -> Result<RemoteResponse> {
        let stream = self.connect()?;
        stream.set_read_timeout(Some(self.io_timeout))?;
        stream.set_write_timeout(Some(self.io_timeout))?;

        let request = RemoteRequest {
            argv: argv.to_vec(),
        };
        let mut writer = &stream;
        serde_json::to_writer(&mut writer, &request)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        let mut line = String::new();
        BufReader::new(&stream).read_line(&mut line)?;
        if line.trim().is_empty() {
            return Err(Error::Remote(format!("{} closed the connection", self.addr)));
        }
        Ok(serde_json::from_str(&line)?)
    }
}

#[derive(Debug)]
pub enum Dispatch {
    /// The remote flag was absent.
    NotApplicable,
    Succeeded(RemoteResponse),
    /// The endpoint failed or could not be reached; run locally instead.
    Failed(Error),
}

/// Removes every remote flag before `--`, including one clustered with other
/// switches (`-cX`). Returns whether any was present.
pub fn take_remote_flag(argv: &mut Vec<String>) -> bool {
    let spellings = registry::spellings_of(Flag::Drb);
    let mut found = false;
    let mut i = 0;

    while i < argv.len() {
        let token = argv[i].as_str();
        if token == "--" {
            break;
        }

        if spellings.contains(&token) {
            argv.remove(i);
            found = true;
            continue;
        }

        if let Some(kept) = strip_from_cluster(token, spellings) {
            found = true;
            if kept.is_empty() {
                argv.remove(i);
                continue;
            }
            argv[i] = format!("-{}", kept);
        }
        i += 1;
    }

    found
}

/// The cluster's letters without the remote switch, if the switch was in it.
fn strip_from_cluster(token: &str, spellings: &[&str]) -> Option<String> {
    let cluster = token.strip_prefix('-').filter(|c| !c.starts_with('-'))?;
    let mut kept = String::new();
    let mut found = false;

    for (offset, c) in cluster.char_indices() {
        let flag = format!("-{}", c);
        if spellings.contains(&flag.as_str()) {
            found = true;
            continue;
        }
        match registry::lookup(&flag) {
            Some(spec) if !spec.takes_value() => kept.push(c),
            _ => {
                kept.push_str(&cluster[offset..]);
                break;
            }
        }
    }

    found.then_some(kept)
}

/// Strips the remote flag from `argv` and, if it was present, forwards what
/// remains to `remote`.
pub fn maybe_dispatch(argv: &mut Vec<String>, remote: &dyn RemoteRunner) -> Dispatch {
    if !take_remote_flag(argv) {
        return Dispatch::NotApplicable;
    }

    tracing::debug!(argv = ?argv, "dispatching run to remote endpoint");
    match remote.run(argv.as_slice()) {
        Ok(response) if response.success => Dispatch::Succeeded(response),
        Ok(_) => Dispatch::Failed(Error::Remote("remote run reported failure".to_string())),
        Err(e) => Dispatch::Failed(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::net::TcpListener;

    struct Recording {
        seen: RefCell<Vec<Vec<String>>>,
        success: bool,
    }

    impl RemoteRunner for Recording {
        fn run(&self, argv: &[String]) -> Result<RemoteResponse> {
            self.seen.borrow_mut().push(argv.to_vec());
            Ok(RemoteResponse {
                success: self.success,
                output: String::new(),
            })
        }
    }

    fn argv(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_take_remote_flag_removes_all_spellings() {
        let mut args = argv(&["-X", "spec/a_spec.rb", "--drb", "-c"]);
        assert!(take_remote_flag(&mut args));
        assert_eq!(args, argv(&["spec/a_spec.rb", "-c"]));

        let mut args = argv(&["spec/a_spec.rb"]);
        assert!(!take_remote_flag(&mut args));
    }

    #[test]
    fn test_take_remote_flag_from_cluster() {
        let mut args = argv(&["-cX", "-RXb", "spec/a_spec.rb"]);
        assert!(take_remote_flag(&mut args));
        assert_eq!(args, argv(&["-c", "-Rb", "spec/a_spec.rb"]));

        // After a value-taking flag the rest is its value.
        let mut args = argv(&["-fX"]);
        assert!(!take_remote_flag(&mut args));
        assert_eq!(args, argv(&["-fX"]));
    }

    #[test]
    fn test_take_remote_flag_respects_double_dash() {
        let mut args = argv(&["--", "-X"]);
        assert!(!take_remote_flag(&mut args));
        assert_eq!(args, argv(&["--", "-X"]));
    }

    #[test]
    fn test_dispatch_forwards_remaining_argv() {
        let remote = Recording {
            seen: RefCell::new(Vec::new()),
            success: true,
        };
        let mut args = argv(&["--drb", "-c", "spec/a_spec.rb"]);

        let dispatch = maybe_dispatch(&mut args, &remote);

        assert!(matches!(dispatch, Dispatch::Succeeded(_)));
        assert_eq!(remote.seen.borrow().as_slice(), &[argv(&["-c", "spec/a_spec.rb"])]);
    }

    #[test]
    fn test_dispatch_reports_remote_failure() {
        let remote = Recording {
            seen: RefCell::new(Vec::new()),
            success: false,
        };
        let mut args = argv(&["-X"]);
        assert!(matches!(maybe_dispatch(&mut args, &remote), Dispatch::Failed(_)));
    }

    #[test]
    fn test_dispatch_not_applicable_without_flag() {
        let mut args = argv(&["-c"]);
        assert!(matches!(
            maybe_dispatch(&mut args, &NoRemote),
            Dispatch::NotApplicable
        ));
    }

    #[test]
    fn test_unreachable_endpoint_is_an_error() {
        // Bind then drop to get a port nobody listens on.
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let runner = TcpRemoteRunner::new(format!("127.0.0.1:{}", port))
            .with_connect_timeout(Duration::from_millis(500));

        let err = runner.run(&argv(&["-c"])).unwrap_err();
        assert!(matches!(err, Error::Remote(_)));
    }
}
