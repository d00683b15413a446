use super::crc::crc16_matches;

/// Progress of response reassembly after a fragment has been consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reassembly {
    /// More data is needed, or what has arrived so far does not contain a
    /// CRC-valid frame yet.
    Incomplete,
    /// A complete, CRC-valid response frame.
    Complete(Vec<u8>),
}

/// Accumulates notification fragments into one Modbus response frame.
///
/// A response carrying `register_count` registers is `5 + 2 * register_count`
/// bytes long: device id, function code, byte count, two bytes per register
/// and the two CRC bytes. Fragments arrive split at arbitrary byte
/// boundaries, and the link occasionally duplicates fragments or injects
/// diagnostic chatter before the real payload settles. A frame is therefore
/// only accepted once length and CRC agree; a buffer that reaches the
/// expected length with a bad CRC keeps waiting for more data, and a buffer
/// that has grown past it is scanned for a valid window of the expected
/// length at every offset.
pub struct ResponseAccumulator {
    buffer: Vec<u8>,
    register_count: usize,
    frame: Option<Vec<u8>>,
}

impl ResponseAccumulator {
    pub fn new(register_count: usize) -> Self {
        Self {
            buffer: Vec::new(),
            register_count,
            frame: None,
        }
    }

    /// The full frame length implied by the register count.
    pub fn expected_len(&self) -> usize {
        5 + 2 * self.register_count
    }

    /// Number of bytes collected so far.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Consume one notification fragment.
    ///
    /// Empty fragments are a no-op. Once a complete frame has been
    /// recognized, further fragments are ignored and the frame is returned
    /// again.
    pub fn push(&mut self, fragment: &[u8]) -> Reassembly {
        if let Some(frame) = &self.frame {
            return Reassembly::Complete(frame.clone());
        }
        if fragment.is_empty() {
            return Reassembly::Incomplete;
        }

        self.buffer.extend_from_slice(fragment);

        let expected = self.expected_len();
        if self.buffer.len() < expected {
            return Reassembly::Incomplete;
        }
        for window in self.buffer.windows(expected) {
            if crc16_matches(window) {
                let frame = window.to_vec();
                self.frame = Some(frame.clone());
                return Reassembly::Complete(frame);
            }
        }
        Reassembly::Incomplete
    }
}

#[test]
fn test_single_fragment_completes() {
    let frame = hex::decode("010406000a0063ffec48f1").unwrap();
    let mut accumulator = ResponseAccumulator::new(3);
    assert_eq!(accumulator.push(&frame), Reassembly::Complete(frame));
}

#[test]
fn test_one_byte_fragments_complete_on_final_byte() {
    let frame = hex::decode("010406000a0063ffec48f1").unwrap();
    let mut accumulator = ResponseAccumulator::new(3);
    for &byte in &frame[..frame.len() - 1] {
        assert_eq!(accumulator.push(&[byte]), Reassembly::Incomplete);
    }
    assert_eq!(
        accumulator.push(&[*frame.last().unwrap()]),
        Reassembly::Complete(frame)
    );
}

#[test]
fn test_every_split_point_yields_the_same_frame() {
    let frame = hex::decode("010406000a0063ffec48f1").unwrap();
    for split in 1..frame.len() {
        let mut accumulator = ResponseAccumulator::new(3);
        assert_eq!(accumulator.push(&frame[..split]), Reassembly::Incomplete);
        assert_eq!(
            accumulator.push(&frame[split..]),
            Reassembly::Complete(frame.clone())
        );
    }
}

#[test]
fn test_empty_fragment_is_a_no_op() {
    let mut accumulator = ResponseAccumulator::new(3);
    assert_eq!(accumulator.push(&[]), Reassembly::Incomplete);
    assert_eq!(accumulator.buffered(), 0);
}

#[test]
fn test_zero_register_response() {
    let frame = hex::decode("01040022c0").unwrap();
    let mut accumulator = ResponseAccumulator::new(0);
    assert_eq!(accumulator.expected_len(), 5);
    assert_eq!(accumulator.push(&frame), Reassembly::Complete(frame));
}

#[test]
fn test_crc_mismatch_at_expected_length_keeps_waiting() {
    // Same length as a valid 3 register response but with a corrupted CRC.
    let corrupted = hex::decode("010406000a0063ffec480e").unwrap();
    let frame = hex::decode("010406000a0063ffec48f1").unwrap();

    let mut accumulator = ResponseAccumulator::new(3);
    assert_eq!(accumulator.push(&corrupted), Reassembly::Incomplete);
    // The device resends; the valid frame is found inside the larger buffer.
    assert_eq!(accumulator.push(&frame), Reassembly::Complete(frame));
}

#[test]
fn test_duplicated_leading_fragment_is_skipped() {
    let frame = hex::decode("010406000a0063ffec48f1").unwrap();
    let mut accumulator = ResponseAccumulator::new(3);
    assert_eq!(accumulator.push(&frame[..4]), Reassembly::Incomplete);
    assert_eq!(accumulator.push(&frame), Reassembly::Complete(frame));
}

#[test]
fn test_fragments_after_completion_are_ignored() {
    let frame = hex::decode("010406000a0063ffec48f1").unwrap();
    let mut accumulator = ResponseAccumulator::new(3);
    assert_eq!(accumulator.push(&frame), Reassembly::Complete(frame.clone()));
    assert_eq!(
        accumulator.push(&[0xde, 0xad]),
        Reassembly::Complete(frame)
    );
    assert_eq!(accumulator.buffered(), 11);
}
