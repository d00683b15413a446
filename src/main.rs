//! Command line tool that polls an MPPT solar charge controller over
//! Bluetooth Low Energy and prints the decoded measurements.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use flexi_logger::Logger;
use log::{info, warn};
use mpptread::{read_registers, Config, MpptClient, ReadError, SessionConfig};

#[derive(Parser)]
#[command(
    name = "mpptread",
    about = "Read measurements from an MPPT solar charge controller over Bluetooth Low Energy",
    version
)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Keep polling with this many seconds between reads instead of
    /// reading once
    #[arg(short, long)]
    interval: Option<u64>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _logger = Logger::try_with_env_or_str(&cli.log_level)
        .context("cannot init logging")?
        .start()
        .context("cannot start logging")?;

    let config = Config::load(&cli.config)?;
    let session = config.session()?;

    info!("connecting to {}", config.device_name);
    let mut client = MpptClient::connect(&config).await?;

    let outcome = run(&mut client, &session, &config, cli.interval).await;
    client.disconnect().await?;
    outcome
}

async fn run(
    client: &mut MpptClient,
    session: &SessionConfig,
    config: &Config,
    interval: Option<u64>,
) -> anyhow::Result<()> {
    loop {
        let mut link = client.open_link().await?;
        match read_registers(&mut link, session, &config.registers).await {
            Ok(measurements) => {
                for measurement in &measurements {
                    println!(
                        "{} -> {} {}",
                        measurement.description, measurement.value, measurement.unit
                    );
                }
            }
            // In polling mode a flaky read is logged and the next cycle
            // starts a fresh session.
            Err(err @ ReadError::NotificationTimeout { .. }) if interval.is_some() => {
                warn!("{err}")
            }
            Err(err) => return Err(err.into()),
        }
        drop(link);

        match interval {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => return Ok(()),
        }
    }
}
