//! The endpoint side of remote dispatch.
//!
//! Each connection carries one forwarded argument list. It is resolved with a
//! fresh [`Resolver`] writing to captured streams, handed to a [`RunHandler`]
//! if it should run, and answered with the outcome and captured output.

use crate::error::{Error, Result};
use crate::options::RunOptions;
use crate::output::{Sink, Streams};
use crate::remote::{RemoteRequest, RemoteResponse};
use crate::resolver::{Resolution, Resolver};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;

/// How long a client may take to send its request or accept the reply.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Upper bound on one request line.
pub const MAX_REQUEST_BYTES: u64 = 1024 * 1024;

/// Runs a resolved configuration on the endpoint.
pub trait RunHandler {
    /// Returns whether the run passed. Output goes to `out`.
    fn run(&mut self, options: &RunOptions, out: &mut Sink) -> bool;
}

/// Serves connections until `limit` have been handled, or forever. A client
/// that stays silent longer than `request_timeout` is dropped.
pub fn serve(
    listener: &TcpListener,
    make_resolver: &mut dyn FnMut(Streams) -> Resolver,
    handler: &mut dyn RunHandler,
    request_timeout: Duration,
    limit: Option<usize>,
) -> Result<()> {
    let mut handled = 0;
    for stream in listener.incoming() {
        let stream = stream?;
        let peer = stream.peer_addr().ok();
        stream.set_read_timeout(Some(request_timeout))?;
        stream.set_write_timeout(Some(request_timeout))?;
        if let Err(e) = handle_connection(stream, make_resolver, handler) {
            tracing::warn!(peer = ?peer, error = %e, "remote request failed");
        }

        handled += 1;
        if limit.is_some_and(|limit| handled >= limit) {
            break;
        }
    }
    Ok(())
}

pub fn handle_connection(
    stream: TcpStream,
    make_resolver: &mut dyn FnMut(Streams) -> Resolver,
    handler: &mut dyn RunHandler,
) -> Result<()> {
    let mut line = String::new();
    BufReader::new((&stream).take(MAX_REQUEST_BYTES)).read_line(&mut line)?;
    if !line.ends_with('\n') && line.len() as u64 >= MAX_REQUEST_BYTES {
        return Err(Error::Remote(format!(
            "request exceeds {} bytes",
            MAX_REQUEST_BYTES
        )));
    }
    let request: RemoteRequest = serde_json::from_str(&line)?;
    tracing::debug!(argv = ?request.argv, "received remote run");

    let response = run_request(request, make_resolver, handler);

    let mut writer = &stream;
    serde_json::to_writer(&mut writer, &response)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Resolves and runs one request, never touching the real console.
pub fn run_request(
    request: RemoteRequest,
    make_resolver: &mut dyn FnMut(Streams) -> Resolver,
    handler: &mut dyn RunHandler,
) -> RemoteResponse {
    let mut resolver = make_resolver(Streams::captured());
    let resolution = resolver.resolve(request.argv, &mut |target| {
        tracing::debug!(path = %target.path, line = ?target.line, "remote target");
    });
    let mut streams = resolver.into_streams();

    let success = match resolution {
        Resolution::Exit { code } => code == 0,
        Resolution::Options(options) if options.should_run() => {
            handler.run(&options, &mut streams.out)
        }
        Resolution::Options(_) => true,
    };

    let mut output = streams.out.contents();
    output.push_str(&streams.err.contents());
    RemoteResponse { success, output }
}
