use std::time::Duration;

use log::{debug, info};
use tokio::time::Instant;

use crate::error::ReadError;
use crate::protocol::{
    build_read_request, decode_measurements, Reassembly, ResponseAccumulator, DEVICE_ID,
    READ_INPUT_REGISTERS,
};
use crate::registers::{Measurement, RegisterRequest};

/// The byte-level contract with the BLE link: write one command frame, then
/// poll for notification fragments.
///
/// `Ok(None)` from [`Transport::next_fragment`] means nothing arrived
/// within the wait window; connection-level failures (write rejected, link
/// dropped, notification stream ended) are errors.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn write(&mut self, frame: &[u8]) -> anyhow::Result<()>;
    async fn next_fragment(&mut self, wait: Duration) -> anyhow::Result<Option<Vec<u8>>>;
}

/// Parameters of one read session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub device_id: u8,
    pub function_code: u8,
    /// First register of the block to read.
    pub target_address: u16,
    /// How long to wait for each notification fragment.
    pub wait_timeout: Duration,
    /// Deadline for the whole session.
    pub overall_timeout: Duration,
}

impl SessionConfig {
    pub fn new(target_address: u16) -> Self {
        Self {
            device_id: DEVICE_ID,
            function_code: READ_INPUT_REGISTERS,
            target_address,
            wait_timeout: Duration::from_secs(5),
            overall_timeout: Duration::from_secs(30),
        }
    }
}

/// Run one full read cycle: write the register-read command, reassemble the
/// notification stream into a response frame and decode it against
/// `requests`.
///
/// Whatever the outcome, no reassembly state survives this call; starting a
/// new session is simply calling it again.
pub async fn read_registers<T: Transport>(
    transport: &mut T,
    session: &SessionConfig,
    requests: &[RegisterRequest],
) -> Result<Vec<Measurement>, ReadError> {
    let count = u16::try_from(requests.len()).expect("register catalogue fits in one block read");
    let request = build_read_request(
        session.device_id,
        session.function_code,
        session.target_address,
        count,
    );
    debug!("TX: {}", hex::encode(request));
    transport
        .write(&request)
        .await
        .map_err(ReadError::Connection)?;

    let mut accumulator = ResponseAccumulator::new(requests.len());
    let deadline = Instant::now() + session.overall_timeout;
    loop {
        let now = Instant::now();
        if now >= deadline {
            return Err(ReadError::NotificationTimeout {
                waited: session.overall_timeout,
                buffered: accumulator.buffered(),
            });
        }

        let wait = session.wait_timeout.min(deadline - now);
        match transport
            .next_fragment(wait)
            .await
            .map_err(ReadError::Connection)?
        {
            None => {
                return Err(ReadError::NotificationTimeout {
                    waited: wait,
                    buffered: accumulator.buffered(),
                })
            }
            Some(fragment) => {
                debug!("RX: {}", hex::encode(&fragment));
                if let Reassembly::Complete(frame) = accumulator.push(&fragment) {
                    info!("response complete: {}", hex::encode(&frame));
                    return decode_measurements(&frame, requests);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::collections::VecDeque;

    struct ScriptedTransport {
        fragments: VecDeque<Vec<u8>>,
        writes: Vec<Vec<u8>>,
        fail_write: bool,
    }

    impl ScriptedTransport {
        fn new(fragments: &[&str]) -> Self {
            Self {
                fragments: fragments.iter().map(|f| hex::decode(f).unwrap()).collect(),
                writes: Vec::new(),
                fail_write: false,
            }
        }
    }

    impl Transport for ScriptedTransport {
        async fn write(&mut self, frame: &[u8]) -> anyhow::Result<()> {
            if self.fail_write {
                bail!("link lost");
            }
            self.writes.push(frame.to_vec());
            Ok(())
        }

        async fn next_fragment(&mut self, _wait: Duration) -> anyhow::Result<Option<Vec<u8>>> {
            Ok(self.fragments.pop_front())
        }
    }

    /// A link that never settles: it keeps emitting junk fragments.
    struct NoisyTransport;

    impl Transport for NoisyTransport {
        async fn write(&mut self, _frame: &[u8]) -> anyhow::Result<()> {
            Ok(())
        }

        async fn next_fragment(&mut self, _wait: Duration) -> anyhow::Result<Option<Vec<u8>>> {
            tokio::time::sleep(Duration::from_millis(1)).await;
            Ok(Some(vec![0x00]))
        }
    }

    fn mppt_catalogue() -> Vec<RegisterRequest> {
        vec![
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
        ]
    }

    // An 11 register response: 85, 1320, 250, 3301, 3301, 1310, 150, 1965,
    // 1965, 1850, 210.
    const RESPONSE: &str = "0104160055052800fa0ce50ce5051e009607ad07ad073a00d27de8";

    #[tokio::test]
    async fn test_reads_and_decodes_a_full_block() {
        let mut transport =
            ScriptedTransport::new(&[&RESPONSE[..16], &RESPONSE[16..40], &RESPONSE[40..]]);
        let session = SessionConfig::new(0x3045);
        let requests = mppt_catalogue();

        let measurements = read_registers(&mut transport, &session, &requests)
            .await
            .unwrap();

        assert_eq!(
            transport.writes,
            vec![hex::decode("01043045000baf18").unwrap()]
        );

        // Two of the eleven catalogue entries are skipped.
        assert_eq!(measurements.len(), 9);
        assert_eq!(
            measurements[0],
            Measurement {
                description: "Battery remaining capacity".into(),
                value: 85.0,
                unit: "%".into(),
            }
        );
        assert_eq!(measurements[1].value, 13.2);
        assert_eq!(measurements[2].value, 2.5);
        assert_eq!(measurements[3].value, 33.01);
        assert_eq!(measurements[4].description, "Load voltage");
        assert_eq!(measurements[4].value, 13.1);
        assert_eq!(measurements[7].description, "Solar voltage");
        assert_eq!(measurements[8].value, 2.1);
    }

    #[tokio::test]
    async fn test_timeout_leaves_no_state_behind() {
        let mut transport = ScriptedTransport::new(&[]);
        let session = SessionConfig::new(0x3045);
        let requests = mppt_catalogue();

        let err = read_registers(&mut transport, &session, &requests)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReadError::NotificationTimeout { buffered: 0, .. }
        ));

        // A fresh session on the same transport starts from an empty buffer
        // and succeeds on its own.
        transport.fragments.push_back(hex::decode(RESPONSE).unwrap());
        let measurements = read_registers(&mut transport, &session, &requests)
            .await
            .unwrap();
        assert_eq!(measurements.len(), 9);
    }

    #[tokio::test]
    async fn test_partial_response_then_silence_is_a_timeout() {
        let mut transport = ScriptedTransport::new(&[&RESPONSE[..10]]);
        let session = SessionConfig::new(0x3045);

        let err = read_registers(&mut transport, &session, &mppt_catalogue())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReadError::NotificationTimeout { buffered: 5, .. }
        ));
    }

    #[tokio::test]
    async fn test_write_failure_is_a_connection_error() {
        let mut transport = ScriptedTransport::new(&[]);
        transport.fail_write = true;
        let session = SessionConfig::new(0x3045);

        let err = read_registers(&mut transport, &session, &mppt_catalogue())
            .await
            .unwrap_err();
        assert!(matches!(err, ReadError::Connection(_)));
    }

    #[tokio::test]
    async fn test_corrupted_frame_is_recovered_by_a_resend() {
        // Exact expected length, bad CRC, then the real frame.
        let corrupted = "010406000a0063ffec480e";
        let frame = "010406000a0063ffec48f1";
        let mut transport = ScriptedTransport::new(&[corrupted, frame]);
        let session = SessionConfig::new(0x3045);
        let requests = vec![
            RegisterRequest::new("12357", "A", 1.0, ""),
            RegisterRequest::new("12358", "B", 1.0, "").skipped(),
            RegisterRequest::new("12359", "C", 2.0, ""),
        ];

        let measurements = read_registers(&mut transport, &session, &requests)
            .await
            .unwrap();

        assert_eq!(measurements.len(), 2);
        assert_eq!(measurements[0].value, 10.0);
        assert_eq!(measurements[1].value, -10.0);
    }

    #[tokio::test]
    async fn test_overall_deadline_bounds_a_noisy_stream() {
        let mut session = SessionConfig::new(0x3045);
        session.overall_timeout = Duration::from_millis(50);

        let err = read_registers(&mut NoisyTransport, &session, &mppt_catalogue())
            .await
            .unwrap_err();
        assert!(matches!(err, ReadError::NotificationTimeout { .. }));
    }
}
