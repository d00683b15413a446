use std::pin::Pin;
use std::time::Duration;

use anyhow::anyhow;
use bluest::Adapter;
use bluest::AdvertisingDevice;
use bluest::Characteristic;
use bluest::Device;
use bluest::Uuid;
use futures_util::Stream;
use futures_util::StreamExt;
use log::{debug, warn};
use tokio::time::timeout;

use crate::config::Config;
use crate::session::Transport;

/// BLE glue around the charge controller's proprietary serial service:
/// device discovery, connection management and the write/notify
/// characteristic pair that carries the register protocol.
pub struct MpptClient {
    adapter: Adapter,
    device: Device,
    write: Characteristic,
    notify: Characteristic,
}

impl MpptClient {
    const DISCOVERY_TIMEOUT_S: u64 = 30;

    /// Create a new `MpptClient`, which includes attempting to discover the
    /// device named in `config`.
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let adapter = bluest::Adapter::default()
            .await
            .ok_or(anyhow!("Default adapter not found"))?;
        adapter.wait_available().await?;

        let service_uuid = config.service_uuid()?;
        let device = timeout(
            Duration::from_secs(Self::DISCOVERY_TIMEOUT_S),
            Self::discover_device(&config.device_name, service_uuid, &adapter),
        )
        .await
        .map_err(|_| anyhow!("Device not found"))??;

        adapter.connect_device(&device.device).await?;

        let service = device
            .device
            .discover_services_with_uuid(service_uuid)
            .await?
            .first()
            .ok_or(anyhow!(
                "The specified device does not expose the expected serial service."
            ))?
            .clone();
        let write = service
            .discover_characteristics_with_uuid(config.write_characteristic()?)
            .await?
            .first()
            .ok_or(anyhow!(
                "The specified device does not expose the command characteristic."
            ))?
            .clone();
        let notify = service
            .discover_characteristics_with_uuid(config.notify_characteristic()?)
            .await?
            .first()
            .ok_or(anyhow!(
                "The specified device does not expose the notification characteristic."
            ))?
            .clone();

        Ok(Self {
            adapter: adapter.clone(),
            device: device.device,
            write,
            notify,
        })
    }

    /// Disconnect from the charge controller
    pub async fn disconnect(self) -> anyhow::Result<()> {
        self.adapter.disconnect_device(&self.device).await?;
        Ok(())
    }

    /// Subscribe to notifications and hand out the link for one read
    /// session.
    ///
    /// The subscription is scoped to the returned value, so every session
    /// starts with a clean notification stream, and the exclusive borrow
    /// keeps a second read from overlapping the first on the same
    /// connection.
    pub async fn open_link(&mut self) -> anyhow::Result<GattLink<'_>> {
        self.try_connect().await?;
        let notifications = self.notify.notify().await?;
        Ok(GattLink {
            write: &self.write,
            notifications: Box::pin(notifications),
        })
    }

    async fn discover_device(
        name: &str,
        service_uuid: Uuid,
        adapter: &Adapter,
    ) -> anyhow::Result<AdvertisingDevice> {
        let required_services = [service_uuid];
        let mut adapter_events = adapter.scan(&required_services).await?;
        while let Some(device) = timeout(
            Duration::from_secs(Self::DISCOVERY_TIMEOUT_S),
            adapter_events.next(),
        )
        .await
        .map_err(|_| anyhow!("Device not found"))?
        {
            let device_name = device.device.name_async().await?;
            debug!("advertisement from {device_name}");
            if device_name == name {
                return Ok(device);
            }
        }

        Err(anyhow!("Device not found"))
    }

    async fn try_connect(&self) -> anyhow::Result<()> {
        if !self.device.is_connected().await {
            let mut retries = 2;
            loop {
                match self.adapter.connect_device(&self.device).await {
                    Ok(()) => return Ok(()),
                    Err(err) if retries > 0 => {
                        warn!("failed to connect: {err}");
                        retries -= 1;
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        }

        Ok(())
    }
}

/// One session's view of the link: the command characteristic plus a live
/// notification subscription.
pub struct GattLink<'a> {
    write: &'a Characteristic,
    notifications: Pin<Box<dyn Stream<Item = Result<Vec<u8>, bluest::Error>> + Send + 'a>>,
}

impl Transport for GattLink<'_> {
    async fn write(&mut self, frame: &[u8]) -> anyhow::Result<()> {
        self.write.write(frame).await?;
        Ok(())
    }

    async fn next_fragment(&mut self, wait: Duration) -> anyhow::Result<Option<Vec<u8>>> {
        match timeout(wait, self.notifications.next()).await {
            // No fragment within the wait window.
            Err(_) => Ok(None),
            Ok(None) => Err(anyhow!("end of notification stream")),
            Ok(Some(Ok(data))) => Ok(Some(data)),
            Ok(Some(Err(err))) => Err(err.into()),
        }
    }
}
