use anyhow::{anyhow, Context, Result};
use chrono::Local;
use lazy_static::lazy_static;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::collections::HashMap;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

pub const LOGGER_NAME: &str = "neuralnilm";
pub const DEFAULT_TEMPLATE: &str = "{timestamp} {message}";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

lazy_static! {
    static ref GLOBAL_REGISTRY: Registry = Registry::new();
}

/// Renders a log record into a single line from a template.
///
/// Recognised placeholders are `{timestamp}`, `{message}`, `{level}` and
/// `{target}`. Anything else in braces is copied through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Formatter {
    template: String,
}

impl Default for Formatter {
    fn default() -> Self {
        Formatter::new(DEFAULT_TEMPLATE)
    }
}

impl Formatter {
    pub fn new(template: &str) -> Self {
        Formatter {
            template: template.to_string(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn format(&self, level: Level, target: &str, message: &str) -> String {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        self.render(&timestamp, level, target, message)
    }

    // single pass, so braces inside the message are never expanded
    fn render(&self, timestamp: &str, level: Level, target: &str, message: &str) -> String {
        let mut line = String::with_capacity(self.template.len() + timestamp.len() + message.len());
        let mut rest = self.template.as_str();
        while let Some(start) = rest.find('{') {
            line.push_str(&rest[..start]);
            let tail = &rest[start..];
            match tail.find('}') {
                Some(end) => {
                    match &tail[1..end] {
                        "timestamp" => line.push_str(timestamp),
                        "message" => line.push_str(message),
                        "level" => line.push_str(level.as_str()),
                        "target" => line.push_str(target),
                        _ => line.push_str(&tail[..=end]),
                    }
                    rest = &tail[end + 1..];
                }
                None => {
                    line.push_str(tail);
                    rest = "";
                }
            }
        }
        line.push_str(rest);
        line
    }
}

/// The data-free discriminant of a [`Sink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    File,
    Stdout,
    Writer,
}

/// An output destination for formatted log lines.
pub enum Sink {
    File { path: PathBuf, file: File },
    Stdout,
    Writer(Box<dyn Write + Send>),
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sink::File { path, .. } => f.debug_struct("File").field("path", path).finish(),
            Sink::Stdout => f.write_str("Stdout"),
            Sink::Writer(_) => f.write_str("Writer"),
        }
    }
}

impl Sink {
    /// Open `path` for appending, creating it if needed.
    pub fn file(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Could not open log file '{}'", path.display()))?;
        Ok(Sink::File {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn kind(&self) -> SinkKind {
        match self {
            Sink::File { .. } => SinkKind::File,
            Sink::Stdout => SinkKind::Stdout,
            Sink::Writer(_) => SinkKind::Writer,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Sink::File { path, .. } => Some(path),
            _ => None,
        }
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        match self {
            Sink::File { file, .. } => write_line_to(file, line),
            Sink::Stdout => write_line_to(&mut io::stdout().lock(), line),
            Sink::Writer(writer) => write_line_to(writer, line),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::File { file, .. } => file.flush(),
            Sink::Stdout => io::stdout().flush(),
            Sink::Writer(writer) => writer.flush(),
        }
    }
}

fn write_line_to<W: Write + ?Sized>(writer: &mut W, line: &str) -> io::Result<()> {
    let mut buf = String::with_capacity(line.len() + 1);
    buf.push_str(line);
    buf.push('\n');
    writer.write_all(buf.as_bytes())?;
    writer.flush()
}

struct LoggerState {
    sinks: Vec<Sink>,
    level: LevelFilter,
    formatter: Formatter,
}

/// A named logger: a list of sinks, a severity threshold and a formatter.
///
/// A new logger has no sinks and a `Warn` threshold. All state sits behind
/// one lock, so configuration and emission never interleave.
pub struct Logger {
    name: String,
    state: Mutex<LoggerState>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &state.level)
            .field("sinks", &state.sinks)
            .finish()
    }
}

impl Logger {
    pub fn new(name: &str) -> Self {
        Logger {
            name: name.to_string(),
            state: Mutex::new(LoggerState {
                sinks: Vec::new(),
                level: LevelFilter::Warn,
                formatter: Formatter::default(),
            }),
        }
    }

    // a panic while writing must not disable logging for everyone else
    fn state(&self) -> MutexGuard<'_, LoggerState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> LevelFilter {
        self.state().level
    }

    pub fn set_level(&self, level: LevelFilter) {
        self.state().level = level;
    }

    pub fn set_formatter(&self, formatter: Formatter) {
        self.state().formatter = formatter;
    }

    pub fn sink_count(&self) -> usize {
        self.state().sinks.len()
    }

    pub fn has_sinks(&self) -> bool {
        !self.state().sinks.is_empty()
    }

    pub fn sink_kinds(&self) -> Vec<SinkKind> {
        self.state().sinks.iter().map(Sink::kind).collect()
    }

    pub fn sink_paths(&self) -> Vec<PathBuf> {
        self.state()
            .sinks
            .iter()
            .filter_map(|sink| sink.path().map(Path::to_path_buf))
            .collect()
    }

    pub fn add_sink(&self, sink: Sink) {
        self.state().sinks.push(sink);
    }

    /// Attach a file sink (when `output_filename` is given and non-empty)
    /// and a stdout sink, unless this logger already has sinks; then set
    /// the threshold to `Debug`.
    ///
    /// The first successful call decides the sinks: later calls with a
    /// different path leave them alone. The file is opened before anything
    /// is attached, so a failed open leaves the logger unchanged.
    pub fn configure(&self, output_filename: Option<&Path>) -> Result<()> {
        let mut state = self.state();
        if state.sinks.is_empty() {
            state.formatter = Formatter::default();
            let output_filename = output_filename.filter(|path| !path.as_os_str().is_empty());
            if let Some(path) = output_filename {
                let sink = Sink::file(path)?;
                state.sinks.push(sink);
            }
            state.sinks.push(Sink::Stdout);
        }
        state.level = LevelFilter::Debug;
        Ok(())
    }

    /// Format one record and write the same line to every sink.
    pub fn emit(&self, level: Level, target: &str, message: &str) {
        let mut state = self.state();
        if level > state.level {
            return;
        }
        let line = state.formatter.format(level, target, message);
        for sink in state.sinks.iter_mut() {
            if let Err(err) = sink.write_line(&line) {
                let _ = writeln!(
                    io::stderr(),
                    "Logging error in '{}' ({:?} sink): {}",
                    self.name,
                    sink.kind(),
                    err
                );
            }
        }
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.emit(record.level(), record.target(), &record.args().to_string());
    }

    fn flush(&self) {
        let mut state = self.state();
        for sink in state.sinks.iter_mut() {
            let _ = sink.flush();
        }
    }
}

/// Owns named loggers, creating each one on first lookup.
#[derive(Default)]
pub struct Registry {
    loggers: Mutex<HashMap<String, Arc<Logger>>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static Registry {
        &GLOBAL_REGISTRY
    }

    pub fn get_logger(&self, name: &str) -> Arc<Logger> {
        let mut loggers = self
            .loggers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let logger = loggers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Logger::new(name)));
        Arc::clone(logger)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.loggers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(name)
    }

    /// Configure the `neuralnilm` logger of this registry.
    pub fn configure_logger(&self, output_filename: Option<&Path>) -> Result<Arc<Logger>> {
        self.configure_named(LOGGER_NAME, output_filename)
    }

    pub fn configure_named(
        &self,
        name: &str,
        output_filename: Option<&Path>,
    ) -> Result<Arc<Logger>> {
        let logger = self.get_logger(name);
        logger.configure(output_filename)?;
        Ok(logger)
    }
}

/// Configure the process-wide `neuralnilm` logger.
pub fn configure_logger(output_filename: Option<&Path>) -> Result<Arc<Logger>> {
    Registry::global().configure_logger(output_filename)
}

/// Whether a `log` target belongs to the logger called `name`: the name
/// itself or anything below it (`name::module`, `name.child`).
pub fn in_hierarchy(name: &str, target: &str) -> bool {
    match target.strip_prefix(name) {
        Some(rest) => rest.is_empty() || rest.starts_with("::") || rest.starts_with('.'),
        None => false,
    }
}

struct Facade(Arc<Logger>);

impl Log for Facade {
    fn enabled(&self, metadata: &Metadata) -> bool {
        in_hierarchy(self.0.name(), metadata.target()) && self.0.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if in_hierarchy(self.0.name(), record.target()) {
            self.0.log(record)
        }
    }

    fn flush(&self) {
        self.0.flush()
    }
}

/// Route the `log` crate macros to `logger`. Only records whose target is
/// in the logger's hierarchy are delivered, so code outside the project
/// logs with `target: "neuralnilm"`. Only one backend can be installed per
/// process.
pub fn install(logger: Arc<Logger>) -> Result<()> {
    log::set_boxed_logger(Box::new(Facade(logger)))
        .map_err(|err| anyhow!("Could not install logger: {}", err))?;
    // the logger's own threshold does the filtering
    log::set_max_level(LevelFilter::Trace);
    Ok(())
}
