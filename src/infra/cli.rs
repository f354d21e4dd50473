use clap::Parser;

/// Food delivery cart, promo and checkout server.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Reconcile orders left waiting for payment in local storage before starting the server.
    #[arg(long)]
    pub sweep_pending_orders: bool,
}
