use tracing_subscriber::{prelude::*, util::SubscriberInitExt, EnvFilter};

/// Installs the subscriber of the binary. Records of the `log` facade, which
/// the tracer library logs through, are forwarded to it.
///
/// Logs go to stderr, so that traces can be piped.
pub fn init() {
    tracing_subscriber::Registry::default()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(std::io::stderr)
                .with_filter(EnvFilter::from_default_env()),
        )
        .init();
}
