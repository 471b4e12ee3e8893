pub mod config;
pub mod logging_system;
pub mod shutdown;

pub use config::{Config, ConfigError, LogFormat, LogLevel};
pub use logging_system::{LoggingError, LoggingSystem, setup_logging_safe};
pub use shutdown::cancel_on_signal;

use crate::buffer::MetricsSnapshot;
use crate::connector::LogConnector;
use crate::domain::LensMessage;
use anyhow::Context;
use clap::Parser;
use std::io::{self, BufRead};
use std::process;
use std::thread;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What a finished run did with its input.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub lines_read: u64,
    /// Entries still queued when the connector closed.
    pub abandoned: usize,
    pub metrics: MetricsSnapshot,
}

/// Reads newline-delimited events, wraps each in a [`LensMessage`] and hands
/// it to the connector (or prints it in debug mode).
pub struct App {
    config: Config,
    connector: LogConnector,
}

impl App {
    pub fn from_args<I, T>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Config::load(args)?;
        Self::from_config(config)
    }

    /// Must be called from within a tokio runtime.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let connector = LogConnector::connect(config.connector_config(), config.sink_config())
            .context("Failed to start log connector")?;

        info!("Starting loglens-connector v{}", crate::VERSION);
        info!(
            "Configuration: endpoint={}, category={}, index={}, batch_size={}, queue_limit={}, debug={}",
            config.endpoint,
            config.category,
            config.index,
            config.max_batch_size,
            config.max_queue_size,
            config.debug
        );

        Ok(Self { config, connector })
    }

    pub fn connector(&self) -> &LogConnector {
        &self.connector
    }

    /// Ships stdin until EOF or a shutdown signal.
    pub async fn run(self) -> anyhow::Result<RunSummary> {
        let shutdown = CancellationToken::new();
        let listener = tokio::spawn(cancel_on_signal(shutdown.clone()));

        let lines = spawn_line_reader(io::BufReader::new(io::stdin()));
        let result = self.run_with_input(lines, shutdown.clone()).await;

        shutdown.cancel();
        if let Err(e) = listener.await {
            debug!("Signal listener ended abnormally: {}", e);
        }
        result
    }

    /// Consumes lines from `lines` until the sender side is done, a read
    /// fails, or `shutdown` fires.
    pub async fn run_with_input(
        self,
        mut lines: mpsc::Receiver<io::Result<String>>,
        shutdown: CancellationToken,
    ) -> anyhow::Result<RunSummary> {
        let mut lines_read = 0_u64;

        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    info!("Shutdown requested; stopping input");
                    break;
                }
                line = lines.recv() => match line {
                    Some(Ok(line)) => {
                        lines_read += 1;
                        self.forward(&line);
                    }
                    Some(Err(e)) => {
                        error!("Failed to read input: {}", e);
                        break;
                    }
                    None => {
                        debug!("Input closed");
                        break;
                    }
                },
            }
        }

        self.finish(lines_read).await
    }

    fn forward(&self, line: &str) {
        if line.trim().is_empty() {
            return;
        }

        let envelope = LensMessage::from_line(self.config.index.as_str(), line);
        let json = match envelope.to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!("Dropping event that failed to serialize: {}", e);
                return;
            }
        };

        if self.config.debug {
            self.connector.print_message(&json);
        } else {
            self.connector.send(json);
        }
    }

    /// One last delivery pass, then close. Whatever is still queued is reported.
    async fn finish(self, lines_read: u64) -> anyhow::Result<RunSummary> {
        match self.connector.flush().await {
            Ok(outcome) if outcome.is_failed() => {
                warn!(?outcome, "Final delivery run failed");
            }
            Ok(outcome) => debug!(?outcome, "Final delivery run finished"),
            Err(e) => warn!("Final flush skipped: {}", e),
        }

        let abandoned = self
            .connector
            .close()
            .await
            .context("Failed to close log connector")?;
        let metrics = self.connector.metrics();

        info!(
            lines_read,
            delivered = metrics.delivered_entries,
            abandoned,
            "loglens-connector stopped"
        );

        Ok(RunSummary {
            lines_read,
            abandoned,
            metrics,
        })
    }
}

/// Reads `input` line by line on a dedicated OS thread.
///
/// A read that blocks forever (an idle stdin) only parks this thread, so the
/// runtime can still shut down once the receiver is dropped. The thread exits
/// at EOF, after the first read error, or on the next line once the receiver
/// is gone.
pub fn spawn_line_reader<R>(input: R) -> mpsc::Receiver<io::Result<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(256);

    let spawned = thread::Builder::new()
        .name("loglens-input".to_string())
        .spawn(move || {
            for line in input.lines() {
                let failed = line.is_err();
                if tx.blocking_send(line).is_err() || failed {
                    break;
                }
            }
        });

    if let Err(e) = spawned {
        error!("Failed to spawn input reader thread: {}", e);
    }
    rx
}

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    // --help and --version print and exit before anything else is set up
    if let Err(e) = Config::try_parse_from(&args)
        && !e.use_stderr()
    {
        e.exit();
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            process::exit(2);
        }
    };

    if let Err(e) = setup_logging_safe(config.log_level, config.log_format) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let app = match App::from_config(config) {
        Ok(app) => app,
        Err(e) => {
            error!("Startup error: {:#}", e);
            process::exit(1);
        }
    };

    let summary = app.run().await?;
    if summary.abandoned > 0 {
        process::exit(1);
    }
    Ok(())
}
