use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use jsopt_core::{CompileOptions, compile, compile_tree};
use jsopt_trace::{ClockSource, OutputFormat, TraceConfig, TraceLogger, global};
use tracing_subscriber::EnvFilter;

/// コマンドライン引数を定義するための構造体
#[derive(Parser, Debug)]
#[command(version, about = "Compile .jsp sources to JavaScript", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "PATH",
        help = "Source file or directory of .jsp files (reads stdin when omitted)"
    )]
    input: Option<PathBuf>,

    #[arg(
        short,
        long,
        value_name = "PATH",
        help = "Output file, or output directory for a directory input (stdout when omitted)"
    )]
    output: Option<PathBuf>,

    #[arg(long, help = "Skip constant folding")]
    no_optimize: bool,

    #[arg(long, value_name = "PATH", help = "Write a trace of the compilation to PATH")]
    trace_log: Option<PathBuf>,

    #[arg(long, value_name = "FORMAT", help = "Trace format: html, raw")]
    trace_format: Option<OutputFormat>,

    #[arg(
        long,
        value_name = "CLOCK",
        help = "Trace clock: wall, process-cpu, thread-cpu"
    )]
    trace_clock: Option<ClockSource>,

    #[arg(long, help = "Record collector pauses as trace sub-events")]
    trace_pauses: bool,

    #[arg(long, help = "Record the tracer's own overhead as sub-events")]
    trace_overhead: bool,

    #[arg(long, help = "Drop high-volume trace events such as individual folds")]
    trace_quiet: bool,
}

impl Cli {
    /// Environment settings with command-line flags layered on top.
    fn trace_config(&self) -> TraceConfig {
        let mut config = TraceConfig::from_env();
        if let Some(path) = &self.trace_log {
            config.output = Some(path.clone());
        }
        if let Some(format) = self.trace_format {
            config.format = format;
        }
        if let Some(clock) = self.trace_clock {
            config.clock = clock;
        }
        config.record_pauses |= self.trace_pauses;
        config.record_overhead |= self.trace_overhead;
        config.quiet_high_volume |= self.trace_quiet;
        config
    }

    fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            optimize: !self.no_optimize,
            name: self.input.as_ref().map(|path| path.display().to_string()),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let logger = match global::install(TraceLogger::open_or_disabled(cli.trace_config())) {
        Ok(logger) => logger,
        Err(_) => global::get(),
    };
    let result = execute(&cli, logger);
    logger.flush();
    global::shutdown();
    result
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn execute(cli: &Cli, logger: &TraceLogger) -> Result<()> {
    let options = cli.compile_options();

    if let Some(input) = cli.input.as_deref().filter(|path| path.is_dir()) {
        let Some(output_root) = &cli.output else {
            bail!("--output must name a directory when --input is a directory");
        };
        let files = compile_tree(input, &options, logger)?;
        for file in &files {
            let destination = output_root.join(&file.output);
            write_output(&destination, file.artifact.javascript.as_bytes())?;
            tracing::info!(
                source = %file.source.display(),
                folds = file.artifact.folds,
                "compiled"
            );
        }
        return Ok(());
    }

    let source = match &cli.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read input file {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let artifact = compile(&source, &options, logger)?;
    match &cli.output {
        Some(path) => write_output(path, artifact.javascript.as_bytes())?,
        None => io::stdout()
            .write_all(artifact.javascript.as_bytes())
            .context("failed to write to stdout")?,
    }
    Ok(())
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    fs::write(path, bytes)
        .with_context(|| format!("failed to write output file {}", path.display()))?;
    Ok(())
}
