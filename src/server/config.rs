//! Server configuration.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::Parser;
use log::warn;
use serde::Deserialize;

use crate::server::error::Error;
use crate::server::response::Framing;

/// The directory files are served from.
///
/// Kept as the literal string it was configured with so that joining a
/// resource path inserts exactly one separator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct RootDir(String);

impl RootDir {
    /// Create a root directory value.
    pub fn new(dir: impl Into<String>) -> Self {
        Self(dir.into())
    }

    /// Get the directory as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join a relative path onto the root.
    ///
    /// A `/` is inserted only when the root is non-empty and does not
    /// already end with one.
    pub fn join(&self, relative: &str) -> String {
        let mut joined = String::with_capacity(self.0.len() + 1 + relative.len());
        joined.push_str(&self.0);
        if !self.0.is_empty() && !self.0.ends_with('/') {
            joined.push('/');
        }
        joined.push_str(relative);
        joined
    }
}

impl Default for RootDir {
    fn default() -> Self {
        Self(".".to_string())
    }
}

impl fmt::Display for RootDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The address to bind to.
    pub addr: SocketAddr,
    /// The directory files are served from.
    pub root: RootDir,
    /// The maximum number of connection workers running at once.
    pub max_workers: usize,
    /// The maximum number of open connections, parked or in a worker.
    /// Connections accepted beyond it are closed straight away.
    pub max_connections: usize,
    /// The size of each read from a connection.
    pub read_buffer_size: usize,
    /// Requests are processed once this many bytes have been buffered.
    pub max_request_size: usize,
    /// How long an armed connection may stay silent before it is processed
    /// with whatever it sent. `None` waits forever.
    pub idle_timeout: Option<Duration>,
    /// How long shutdown waits for in-flight workers.
    pub shutdown_timeout: Duration,
    /// Reply framing.
    pub framing: Framing,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            root: RootDir::default(),
            max_workers: 1024,
            max_connections: 1024,
            read_buffer_size: 8192,
            max_request_size: 64 * 1024,
            idle_timeout: Some(Duration::from_secs(5)),
            shutdown_timeout: Duration::from_secs(30),
            framing: Framing::default(),
        }
    }
}

/// On-disk configuration. Every field is optional and overrides the default.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    host: Option<Ipv4Addr>,
    port: Option<u16>,
    root: Option<RootDir>,
    max_workers: Option<usize>,
    max_connections: Option<usize>,
    read_buffer_size: Option<usize>,
    max_request_size: Option<usize>,
    /// Milliseconds; `0` disables the idle timeout.
    idle_timeout_ms: Option<u64>,
    shutdown_timeout_ms: Option<u64>,
    framing: Option<Framing>,
}

impl ServerConfig {
    /// Parse a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let file: FileConfig = serde_json::from_str(json)?;
        let mut config = Self::default();
        config.apply(file);
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// Build a configuration from command-line arguments (program name excluded).
    ///
    /// Recognized flags are `-h <ipv4>`, `-p <port>`, `-d <root>` and
    /// `-c <config.json>`. Flags given on the command line win over the
    /// config file regardless of order. Unknown arguments are ignored.
    pub fn from_args<I, S>(args: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cli = CliArgs::parse_lenient(args.into_iter().map(Into::<String>::into).collect())?;

        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply(cli.into_overrides());
        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, file: FileConfig) {
        if let Some(host) = file.host {
            self.addr.set_ip(IpAddr::V4(host));
        }
        if let Some(port) = file.port {
            self.addr.set_port(port);
        }
        if let Some(root) = file.root {
            self.root = root;
        }
        if let Some(max_workers) = file.max_workers {
            self.max_workers = max_workers;
        }
        if let Some(max_connections) = file.max_connections {
            self.max_connections = max_connections;
        }
        if let Some(read_buffer_size) = file.read_buffer_size {
            self.read_buffer_size = read_buffer_size;
        }
        if let Some(max_request_size) = file.max_request_size {
            self.max_request_size = max_request_size;
        }
        if let Some(ms) = file.idle_timeout_ms {
            self.idle_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(ms) = file.shutdown_timeout_ms {
            self.shutdown_timeout = Duration::from_millis(ms);
        }
        if let Some(framing) = file.framing {
            self.framing = framing;
        }
    }

    fn validate(&self) -> Result<(), Error> {
        if self.max_workers == 0 {
            return Err(Error::Config("max_workers must be at least 1".to_string()));
        }
        if self.max_connections == 0 {
            return Err(Error::Config("max_connections must be at least 1".to_string()));
        }
        if self.read_buffer_size == 0 {
            return Err(Error::Config("read_buffer_size must be at least 1".to_string()));
        }
        if self.max_request_size == 0 {
            return Err(Error::Config("max_request_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Command-line flags. `-h` is the bind address, so clap's help flag is off.
#[derive(Debug, Parser)]
#[command(name = "microstatic", no_binary_name = true, disable_help_flag = true, args_override_self = true)]
struct CliArgs {
    /// IPv4 address to bind to
    #[arg(short = 'h', value_name = "ADDR")]
    host: Option<Ipv4Addr>,

    /// Port to listen on
    #[arg(short = 'p', value_name = "PORT")]
    port: Option<u16>,

    /// Directory files are served from
    #[arg(short = 'd', value_name = "DIR")]
    root: Option<String>,

    /// JSON configuration file
    #[arg(short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,
}

impl CliArgs {
    /// Parse `args`, dropping every argument clap does not recognize.
    ///
    /// A recognized flag with a missing or unparsable value is still an error.
    fn parse_lenient(mut args: Vec<String>) -> Result<Self, Error> {
        loop {
            let err = match Self::try_parse_from(&args) {
                Ok(cli) => return Ok(cli),
                Err(err) => err,
            };

            let unknown = match (err.kind(), err.get(ContextKind::InvalidArg)) {
                (ErrorKind::UnknownArgument, Some(ContextValue::String(arg))) => {
                    args.iter().position(|candidate| is_same_argument(candidate, arg))
                }
                _ => None,
            };
            let Some(index) = unknown else {
                return Err(Error::Config(cli_error_message(&err)));
            };
            warn!("Ignoring unrecognized argument: {}", args.remove(index));
        }
    }

    fn into_overrides(self) -> FileConfig {
        FileConfig {
            host: self.host,
            port: self.port,
            root: self.root.map(RootDir::new),
            ..FileConfig::default()
        }
    }
}

/// `--name=value` is reported by clap as `--name`.
fn is_same_argument(candidate: &str, reported: &str) -> bool {
    candidate == reported
        || candidate
            .strip_prefix(reported)
            .is_some_and(|rest| rest.starts_with('='))
}

/// First line of a clap error, without its `error: ` prefix.
fn cli_error_message(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let line = rendered.lines().next().unwrap_or_default();
    line.strip_prefix("error: ").unwrap_or(line).to_string()
}
