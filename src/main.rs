use anyhow::Context;
use clap::Parser;
use food_delivery::{
    configure_tracing, construct_app_state,
    infra::{Cli, get_config_settings},
    start_server, sweep_pending_orders,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = get_config_settings().context("Could not read application configuration.")?;

    // _worker_guard is pulled back into the scope of main() to ensure all tracing events get
    // written to the log file when the program terminates, which is done when _worker_guard is
    // dropped.
    let _worker_guard = configure_tracing(&settings);

    let app_state = construct_app_state(settings).await?;

    if cli.sweep_pending_orders {
        sweep_pending_orders(&app_state).await?;
    }

    start_server(app_state).await
}
