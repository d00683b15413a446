//! Read live measurements from MPPT solar charge controllers over Bluetooth Low Energy
//!
//! Tested with a Lumiax MT-series charge controller sold around the year 2023.
//!
//! The controller has a BLE interface exposing a proprietary serial service
//! as a write/notify characteristic pair. On top of that it speaks a
//! Modbus-RTU register protocol: a framed read command is written to the
//! command characteristic and the response arrives as a sequence of
//! notification fragments which must be reassembled and CRC-checked before
//! decoding.
//!
//! Which registers the response contains is described by an operator
//! supplied catalogue (address, description, scale, unit, skip), so the
//! same reader works for any contiguous register block. The live-data block
//! at 0x3045 carries:
//!
//! - Battery remaining capacity (%)
//! - Battery voltage (V), current (A) and power (W)
//! - Load voltage (V), current (A) and power (W)
//! - Solar voltage (V) and current (A)
//!
//! # Example
//!
//! ```no_run
//! # #[tokio::main]
//! # pub async fn main() {
//!     let registers = vec![
//!         mpptread::RegisterRequest::new("12358", "Battery voltage", 100.0, "V"),
//!         mpptread::RegisterRequest::new("12359", "Battery current", 100.0, "A"),
//!     ];
//!     let config = mpptread::Config::new("MT5075", "3046", registers);
//!     let session = config.session().unwrap();
//!     let mut client = mpptread::MpptClient::connect(&config).await.unwrap();
//!     let mut link = client.open_link().await.unwrap();
//!     let measurements = mpptread::read_registers(&mut link, &session, &config.registers)
//!         .await
//!         .unwrap();
//!     for measurement in measurements {
//!         println!("{} -> {} {}", measurement.description, measurement.value, measurement.unit);
//!     }
//! # }
//! ```

mod config;
mod error;
mod mppt_client;
pub mod protocol;
mod registers;
mod session;

pub use config::Config;
pub use error::ReadError;
pub use mppt_client::{GattLink, MpptClient};
pub use registers::{Measurement, RegisterRequest};
pub use session::{read_registers, SessionConfig, Transport};
