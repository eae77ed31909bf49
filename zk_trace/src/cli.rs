use clap::Args;
use zk_tracer::TracerConfig;

const HELP_HEADING: &str = "Tracer options";

/// The options of the tracer.
#[derive(Args, Clone, PartialEq, Eq, Debug)]
pub struct CliTracerConfig {
    /// Skip checking the gas charged by the host against the projected cost of
    /// each opcode.
    #[arg(
        long,
        env = "ZK_TRACE_SKIP_GAS_CHECK",
        help_heading = HELP_HEADING,
        default_value_t = false
    )]
    skip_gas_check: bool,
    /// Number of padding rows appended to every table.
    #[arg(long, env = "ZK_TRACE_PADDING_ROWS", help_heading = HELP_HEADING, default_value_t = 2)]
    padding_rows: usize,
    /// Maximum depth of the call stack.
    #[arg(
        long,
        env = "ZK_TRACE_MAX_CALL_STACK_DEPTH",
        help_heading = HELP_HEADING,
        default_value_t = 1024
    )]
    max_call_stack_depth: usize,
}

impl From<CliTracerConfig> for TracerConfig {
    fn from(cli: CliTracerConfig) -> Self {
        Self {
            check_gas: !cli.skip_gas_check,
            padding_rows: cli.padding_rows,
            max_call_stack_depth: cli.max_call_stack_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Cli {
        #[clap(flatten)]
        tracer: CliTracerConfig,
    }

    #[test]
    fn defaults_match_the_library() {
        let cli = Cli::parse_from(["zk_trace"]);
        assert_eq!(TracerConfig::from(cli.tracer), TracerConfig::default());

        let cli = Cli::parse_from(["zk_trace", "--skip-gas-check", "--padding-rows", "0"]);
        let config = TracerConfig::from(cli.tracer);
        assert!(!config.check_gas);
        assert_eq!(config.padding_rows, 0);
    }
}
