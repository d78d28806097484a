//! `drag up` command implementation

use clap::Args;

/// Arguments for the `up` command
#[derive(Args)]
pub struct UpArgs {
    /// Services to start (default: all)
    #[arg(value_name = "SERVICES")]
    pub services: Vec<String>,
}

/// Execute the `up` command
///
/// Not implemented yet: announces itself and idles until interrupted.
pub async fn execute(_args: UpArgs) -> anyhow::Result<()> {
    println!("drag up is not implemented yet, press Ctrl-C to exit");
    tokio::signal::ctrl_c().await?;
    Ok(())
}
