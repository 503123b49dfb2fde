use rutil::{cli, config};

fn init_tracing() {
    use tracing_subscriber::{
        filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt as _, Registry,
    };

    // stdout carries pipe and query output, so logs go to stderr.
    Registry::default()
        .with(
            fmt::Layer::new()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .with_file(false)
                .with_line_number(false)
                .with_target(true)
                .with_timer(fmt::time::ChronoLocal::rfc_3339()),
        )
        .with(
            EnvFilter::try_from_env(config::env::LOG_DIRECTIVE)
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

fn main() {
    init_tracing();

    let command = cli::parse();

    let result = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()
        .map_err(rutil::Error::from)
        .and_then(|rt| rt.block_on(command.run()));

    if let Err(err) = result {
        let code = if err.is_config() { 2 } else { 1 };
        tracing::error!("{err}");
        std::process::exit(code);
    }
}
