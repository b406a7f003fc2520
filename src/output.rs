use std::io::{self, Write};
use termcolor::{Buffer, Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Destination for resolver output. Help and version only terminate the
/// process when writing to a `Console` sink.
pub enum Sink {
    Console(StandardStream),
    Captured(Buffer),
}

impl Sink {
    pub fn stdout(color: bool) -> Self {
        Sink::Console(StandardStream::stdout(color_choice(color)))
    }

    pub fn stderr(color: bool) -> Self {
        Sink::Console(StandardStream::stderr(color_choice(color)))
    }

    pub fn captured() -> Self {
        Sink::Captured(Buffer::no_color())
    }

    pub fn is_console(&self) -> bool {
        matches!(self, Sink::Console(_))
    }

    /// Everything written so far. Always empty for console sinks.
    pub fn contents(&self) -> String {
        match self {
            Sink::Console(_) => String::new(),
            Sink::Captured(buffer) => String::from_utf8_lossy(buffer.as_slice()).into_owned(),
        }
    }

    fn inner(&mut self) -> &mut dyn WriteColor {
        match self {
            Sink::Console(stream) => stream,
            Sink::Captured(buffer) => buffer,
        }
    }
}

fn color_choice(color: bool) -> ColorChoice {
    if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner().flush()
    }
}

impl WriteColor for Sink {
    fn supports_color(&self) -> bool {
        match self {
            Sink::Console(stream) => stream.supports_color(),
            Sink::Captured(buffer) => buffer.supports_color(),
        }
    }

    fn set_color(&mut self, spec: &ColorSpec) -> io::Result<()> {
        self.inner().set_color(spec)
    }

    fn reset(&mut self) -> io::Result<()> {
        self.inner().reset()
    }
}

/// The output and error streams a resolution writes to.
pub struct Streams {
    pub out: Sink,
    pub err: Sink,
}

impl Streams {
    pub fn console(color: bool) -> Self {
        Self {
            out: Sink::stdout(color),
            err: Sink::stderr(color),
        }
    }

    pub fn captured() -> Self {
        Self {
            out: Sink::captured(),
            err: Sink::captured(),
        }
    }

    /// Writes `error: <message>` to the error stream, optionally followed by
    /// the usage text.
    pub fn print_error(&mut self, message: &str, usage: Option<&str>) {
        let _ = self
            .err
            .set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
        let _ = write!(self.err, "error:");
        let _ = self.err.reset();
        let _ = writeln!(self.err, " {}", message);
        if let Some(usage) = usage {
            let _ = writeln!(self.err);
            let _ = write!(self.err, "{}", usage);
        }
        let _ = self.err.flush();
    }

    pub fn print_warning(&mut self, message: &str) {
        let _ = self.err.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
        let _ = writeln!(self.err, "{}", message);
        let _ = self.err.reset();
        let _ = self.err.flush();
    }
}
