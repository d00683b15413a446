use crc16::{State, MODBUS};

/// Compute the CRC check value for the given bytes, in wire order
/// (little-endian). Every frame in both directions carries this as its
/// last two bytes.
pub fn crc16(data: &[u8]) -> [u8; 2] {
    State::<MODBUS>::calculate(data).to_le_bytes()
}

/// Whether the last two bytes of `frame` are the CRC of everything before
/// them.
pub fn crc16_matches(frame: &[u8]) -> bool {
    frame.len() > 2 && frame[frame.len() - 2..] == crc16(&frame[..frame.len() - 2])
}

#[test]
fn test_known_vector() {
    // Read command header for an 11 register block starting at 0x0000.
    let msg = [0x01, 0x04, 0x00, 0x00, 0x00, 0x0b];
    assert_eq!(State::<MODBUS>::calculate(&msg), 0xcdb1);
    assert_eq!(crc16(&msg), [0xb1, 0xcd]);
}

#[test]
fn test_matches_complete_frame() {
    let frame = hex::decode("010406000a0063ffec48f1").unwrap();
    assert!(crc16_matches(&frame));

    let mut corrupted = frame.clone();
    *corrupted.last_mut().unwrap() ^= 0x01;
    assert!(!crc16_matches(&corrupted));

    assert!(!crc16_matches(&frame[..2]));
    assert!(!crc16_matches(&[]));
}

#[test]
fn test_deterministic_and_bit_sensitive() {
    let msg = hex::decode("01043045000b").unwrap();
    let baseline = crc16(&msg);
    assert_eq!(crc16(&msg), baseline);

    for byte in 0..msg.len() {
        for bit in 0..8 {
            let mut flipped = msg.clone();
            flipped[byte] ^= 1 << bit;
            assert_ne!(
                crc16(&flipped),
                baseline,
                "single bit flip at byte {byte} bit {bit} collided"
            );
        }
    }
}
