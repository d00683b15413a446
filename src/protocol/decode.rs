use crate::error::ReadError;
use crate::registers::{Measurement, RegisterRequest};

/// Decode a complete response frame against the register catalogue it was
/// requested with.
///
/// The payload sits between the three header bytes (device id, function
/// code, byte count) and the two CRC bytes, holding one signed 16-bit
/// big-endian value per catalogue entry, in catalogue order. Entries marked
/// `skip` consume their slot without producing a measurement; every other
/// value is divided by its entry's scale.
pub fn decode_measurements(
    frame: &[u8],
    requests: &[RegisterRequest],
) -> Result<Vec<Measurement>, ReadError> {
    let expected = requests.len() * 2;
    let actual = frame.len().saturating_sub(5);
    if frame.len() < 5 || actual != expected {
        return Err(ReadError::DecodeLengthMismatch { expected, actual });
    }

    let payload = &frame[3..frame.len() - 2];
    let measurements = payload
        .chunks(2)
        .zip(requests)
        .filter(|(_, request)| !request.skip)
        .map(|(chunk, request)| {
            let raw = i16::from_be_bytes([chunk[0], chunk[1]]);
            Measurement {
                description: request.description.clone(),
                value: f64::from(raw) / request.scale,
                unit: request.unit.clone(),
            }
        })
        .collect();

    Ok(measurements)
}

#[cfg(test)]
fn catalogue(entries: &[(&str, f64, bool)]) -> Vec<RegisterRequest> {
    entries
        .iter()
        .map(|&(description, scale, skip)| {
            let request = RegisterRequest::new("12357", description, scale, "V");
            if skip {
                request.skipped()
            } else {
                request
            }
        })
        .collect()
}

#[test]
fn test_skipped_entries_consume_their_slot() {
    // Raw register values 10, 99, -20.
    let frame = hex::decode("010406000a0063ffec48f1").unwrap();
    let requests = catalogue(&[("A", 1.0, false), ("B", 1.0, true), ("C", 2.0, false)]);

    let measurements = decode_measurements(&frame, &requests).unwrap();

    assert_eq!(measurements.len(), 2);
    assert_eq!(measurements[0].description, "A");
    assert_eq!(measurements[0].value, 10.0);
    assert_eq!(measurements[1].description, "C");
    assert_eq!(measurements[1].value, -10.0);
}

#[test]
fn test_sign_extension() {
    let frame = hex::decode("010406ffff80007fff2938").unwrap();
    let requests = catalogue(&[("min", 1.0, false), ("mid", 1.0, false), ("max", 1.0, false)]);

    let measurements = decode_measurements(&frame, &requests).unwrap();

    assert_eq!(measurements[0].value, -1.0);
    assert_eq!(measurements[1].value, -32768.0);
    assert_eq!(measurements[2].value, 32767.0);
}

#[test]
fn test_scaling() {
    // One register holding 1234.
    let frame = hex::decode("01040204d23bad").unwrap();
    let requests = catalogue(&[("Battery voltage", 100.0, false)]);

    let measurements = decode_measurements(&frame, &requests).unwrap();

    assert_eq!(measurements[0].value, 12.34);
    assert_eq!(measurements[0].unit, "V");
}

#[test]
fn test_length_mismatch_is_an_error() {
    // Two registers on the wire, three in the catalogue.
    let frame = hex::decode("010404000100022b85").unwrap();
    let requests = catalogue(&[("A", 1.0, false), ("B", 1.0, false), ("C", 1.0, false)]);

    let err = decode_measurements(&frame, &requests).unwrap_err();
    assert!(matches!(
        err,
        ReadError::DecodeLengthMismatch {
            expected: 6,
            actual: 4
        }
    ));
}

#[test]
fn test_zero_registers() {
    let frame = hex::decode("01040022c0").unwrap();
    let measurements = decode_measurements(&frame, &[]).unwrap();
    assert!(measurements.is_empty());
}

#[test]
fn test_truncated_frame_is_an_error() {
    let err = decode_measurements(&[0x01, 0x04], &[]).unwrap_err();
    assert!(matches!(err, ReadError::DecodeLengthMismatch { .. }));
}
