use std::time::Duration;

use mpptread::{read_registers, Config, MpptClient, RegisterRequest};

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    let registers = vec![
        RegisterRequest::new("12357", "Battery remaining capacity", 1.0, "%"),
        RegisterRequest::new("12358", "Battery voltage", 100.0, "V"),
        RegisterRequest::new("12359", "Battery current", 100.0, "A"),
        RegisterRequest::new("12360", "Battery power", 100.0, "W"),
        RegisterRequest::new("12361", "Battery power", 100.0, "W").skipped(),
        RegisterRequest::new("12362", "Load voltage", 100.0, "V"),
        RegisterRequest::new("12363", "Load current", 100.0, "A"),
        RegisterRequest::new("12364", "Load power", 100.0, "W"),
        RegisterRequest::new("12365", "Load power", 100.0, "W").skipped(),
        RegisterRequest::new("12366", "Solar voltage", 100.0, "V"),
        RegisterRequest::new("12367", "Solar current", 100.0, "A"),
    ];
    let config = Config::new("MT5075", "3045", registers);
    let session = config.session()?;

    let mut client = MpptClient::connect(&config).await?;
    loop {
        let mut link = client.open_link().await?;
        let measurements = read_registers(&mut link, &session, &config.registers).await?;
        for measurement in measurements {
            println!(
                "{} -> {} {}",
                measurement.description, measurement.value, measurement.unit
            );
        }
        drop(link);
        tokio::time::sleep(Duration::from_secs(5)).await;
    }
}
