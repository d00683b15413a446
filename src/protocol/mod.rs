//! The Modbus side of the controller's BLE bridge: request framing, CRC16,
//! notification-fragment reassembly and register decoding.

mod crc;
mod decode;
mod reassembly;
mod request;

pub use crc::{crc16, crc16_matches};
pub use decode::decode_measurements;
pub use reassembly::{Reassembly, ResponseAccumulator};
pub use request::{build_read_request, DEVICE_ID, READ_INPUT_REGISTERS};
