use std::process;

use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing::{debug, instrument};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use ttyf::cli::args::{Cli, Commands};
use ttyf::cli::commands::execute_command;
use ttyf::cli::{banner, output, CliResult};
use ttyf::config::Settings;
use ttyf::domain::expand_env_vars;
use ttyf::infrastructure::di::ServiceContainer;

fn main() {
    let cli = Cli::parse();

    setup_logging(cli.debug);

    if let Err(e) = run(&cli) {
        output::error(&e);
        process::exit(e.exit_code());
    }
}

#[instrument(skip(cli))]
fn run(cli: &Cli) -> CliResult<()> {
    let mut settings = Settings::load()?;
    if let Some(dir) = &cli.storage_dir {
        settings.storage_dir = expand_env_vars(&dir.to_string_lossy()).into();
    }
    debug!("storage directory: {}", settings.storage_dir.display());

    let completion = matches!(cli.command, Some(Commands::Completion { .. }));
    if settings.banner && !cli.no_banner && !completion {
        banner::print();
    }

    let container = ServiceContainer::new(settings)?;
    execute_command(cli, &container)
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        3 => LevelFilter::TRACE,
        _ => {
            eprintln!("Don't be crazy, max is -d -d -d");
            LevelFilter::TRACE
        }
    };

    // reqwest/hyper are chatty at trace
    let noisy_modules = ["hyper", "reqwest", "rustls"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .with_span_events(FmtSpan::ENTER)
        .with_span_events(FmtSpan::CLOSE);

    let filtered_layer = fmt_layer.with_filter(filter).with_filter(module_filter);

    tracing_subscriber::registry().with(filtered_layer).init();

    match filter {
        LevelFilter::INFO => tracing::info!("Debug mode: info"),
        LevelFilter::DEBUG => tracing::debug!("Debug mode: debug"),
        LevelFilter::TRACE => tracing::debug!("Debug mode: trace"),
        _ => {}
    }
}
