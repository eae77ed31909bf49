use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueHint};
use tracing::info;
use zk_trace::cli::CliTracerConfig;
use zk_trace::fs::{read_events, write_tables};
use zk_tracer::{Tracer, TracerConfig};

/// Lowers a JSON stream of EVM execution events into trace files.
#[derive(Parser)]
#[command(version = zk_trace::version(), propagate_version = true)]
struct Cli {
    /// The event stream. Read from stdin if not provided.
    #[arg(short, long, env = "ZK_TRACE_INPUT", value_hint = ValueHint::FilePath)]
    input: Option<PathBuf>,
    /// The directory to which the trace files are written.
    #[arg(
        short,
        long,
        env = "ZK_TRACE_OUTPUT_DIR",
        value_hint = ValueHint::DirPath,
        default_value = "traces"
    )]
    output_dir: PathBuf,

    #[clap(flatten)]
    tracer_config: CliTracerConfig,
}

fn main() -> Result<()> {
    zk_trace::tracing::init();
    let args = Cli::parse();

    let events = read_events(args.input.as_deref())?;
    info!("Read {} events", events.len());

    let mut tracer = Tracer::new(TracerConfig::from(args.tracer_config));
    tracer.handle_events(&events)?;
    let rejected = tracer.context().aborted_events();
    let tables = tracer.finalize()?;
    write_tables(&args.output_dir, &tables)?;

    if rejected > 0 {
        info!("Done, {rejected} events were rejected by the tracer");
    } else {
        info!("Done");
    }
    Ok(())
}
