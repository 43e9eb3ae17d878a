use clap::Parser;
use tracing_subscriber::EnvFilter;

mod actions;
mod cli;
mod prompt;

use cli::Args;

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn,kc=info,kubeconf=info",
        1 => "info,kc=debug,kubeconf=debug",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    actions::run(args).await
}
