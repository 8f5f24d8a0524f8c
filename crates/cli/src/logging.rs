use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Installs the stderr subscriber.
///
/// Library events use `wallet.*` targets; `RUST_LOG` overrides the
/// verbosity-derived filter.
pub fn init_logging(verbosity: u8) {
	// 0 = errors only, 1 (-v) = session lifecycle, 2+ (-vv) = everything
	let filter = match verbosity {
		0 => "error",
		1 => "info,axum=warn,tower=warn,hyper=warn",
		_ => "debug",
	};

	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}
