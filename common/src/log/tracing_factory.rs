use std::io;
use std::sync::Once;

use tracing::Level;
use tracing_appender::rolling;
use tracing_subscriber::fmt::writer::MakeWriterExt;

static INIT: Once = Once::new();

#[derive(Debug, Clone)]
pub struct TracingFactory {
    options: TracingFactoryOptions,
}

#[derive(Debug, Clone)]
pub struct TracingFactoryOptions {
    debug: bool,
    output_type: OutputType,
    level: Option<Level>,
    log_dir: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputType {
    Stdout,
    File,
}

impl TracingFactory {
    /// Initializes the process-wide tracing subscriber exactly once. Later
    /// calls are no-ops, so callers (gateway open, monitor start, test
    /// setup) never need to coordinate who calls it first.
    pub fn init_log(debug: bool) -> Self {
        Self::init_log_with_options(TracingFactoryOptions::new_with_debug(debug))
    }

    pub fn init_log_with_options(opts: TracingFactoryOptions) -> Self {
        INIT.call_once(|| {
            let level = opts.level.unwrap_or(Level::INFO);
            let format = tracing_subscriber::fmt::format()
                .with_file(true)
                .with_line_number(false)
                .with_target(false)
                .with_thread_ids(true)
                .with_thread_names(true)
                .compact();

            match opts.output_type {
                OutputType::Stdout => {
                    let _ = tracing_subscriber::fmt()
                        .with_max_level(level)
                        .event_format(format)
                        .try_init();
                }
                OutputType::File => {
                    let dir = opts.log_dir.clone().unwrap_or_else(|| "/tmp/gateway/logs".into());
                    let file_appender = rolling::daily(&dir, "gateway.log");
                    let writer = file_appender.and(io::stdout);
                    let _ = tracing_subscriber::fmt()
                        .with_max_level(level)
                        .event_format(format)
                        .with_writer(writer)
                        .try_init();
                }
            }
        });

        TracingFactory { options: opts }
    }

    pub fn get_log_dir(&self) -> Option<&str> {
        self.options.log_dir.as_deref()
    }
}

impl Default for TracingFactoryOptions {
    fn default() -> Self {
        TracingFactoryOptions::new_with_debug(false)
    }
}

impl TracingFactoryOptions {
    pub fn new_with_debug(debug: bool) -> Self {
        TracingFactoryOptions::new(debug, OutputType::Stdout, None)
    }

    pub fn new(debug: bool, output_type: OutputType, log_dir: Option<String>) -> Self {
        let level = if debug { Level::DEBUG } else { Level::INFO };
        TracingFactoryOptions {
            debug,
            output_type,
            level: Some(level),
            log_dir,
        }
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }
}
