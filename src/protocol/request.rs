use super::crc::crc16;

/// Modbus device id of the charge controller. The BLE bridge always
/// presents the controller as device 1.
pub const DEVICE_ID: u8 = 0x01;

/// Function code for reading a contiguous block of input registers.
pub const READ_INPUT_REGISTERS: u8 = 0x04;

/// Build the framed read command that is written to the command
/// characteristic: device id, function code, big-endian start address,
/// big-endian register count and the little-endian CRC trailer.
pub fn build_read_request(device_id: u8, function_code: u8, address: u16, count: u16) -> [u8; 8] {
    let mut frame = [0u8; 8];
    frame[0] = device_id;
    frame[1] = function_code;
    frame[2..4].copy_from_slice(&address.to_be_bytes());
    frame[4..6].copy_from_slice(&count.to_be_bytes());
    let crc = crc16(&frame[..6]);
    frame[6..8].copy_from_slice(&crc);
    frame
}

#[test]
fn test_build_live_data_request() {
    let frame = build_read_request(DEVICE_ID, READ_INPUT_REGISTERS, 0x3045, 11);
    assert_eq!(hex::encode(frame), "01043045000baf18");
}

#[test]
fn test_build_rated_data_request() {
    let frame = build_read_request(DEVICE_ID, READ_INPUT_REGISTERS, 0x304e, 5);
    assert_eq!(hex::encode(frame), "0104304e00055f1e");
}

#[test]
fn test_crc_covers_whole_header() {
    let frame = build_read_request(DEVICE_ID, READ_INPUT_REGISTERS, 0x0000, 0x000b);
    assert_eq!(frame[6..], [0xb1, 0xcd]);
}
