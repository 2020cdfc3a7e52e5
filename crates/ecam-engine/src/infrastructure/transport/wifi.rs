//! Cloud relay channel for WiFi machines.
//!
//! WiFi machines are not reached directly.  A request frame is base64-encoded
//! and set as a property on the machine's cloud device record; the machine
//! answers by updating a response property, which the host receives as a
//! push notification and hands to [`decode_property`].
//!
//! The relay call is fire-and-forget from the engine's point of view: a
//! failed upload is logged and the response timeout takes care of retrying.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use ecam_core::protocol::{HexBytes, LinkKind};
use thiserror::Error;
use tracing::{error, trace};

use crate::application::engine::ByteChannel;

/// Device property that carries requests.
pub const REQUEST_PROPERTY: &str = "data_request";

/// Request property used by striker models.
pub const STRIKER_REQUEST_PROPERTY: &str = "data_request_striker";

/// Errors from the cloud relay.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay rejected property {property}: {reason}")]
    Rejected { property: String, reason: String },
    #[error("relay unreachable: {0}")]
    Unreachable(String),
    #[error("property value is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// The cloud service that stores device properties.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CloudRelay: Send + Sync {
    async fn set_property(
        &self,
        device: String,
        property: String,
        value: String,
    ) -> Result<(), RelayError>;
}

/// [`ByteChannel`] that posts requests through a [`CloudRelay`].
pub struct WifiChannel<R> {
    relay: R,
    device: String,
    striker: bool,
}

impl<R: CloudRelay> WifiChannel<R> {
    /// `device` is the relay's serial number for the machine.
    pub fn new(relay: R, device: impl Into<String>, striker: bool) -> Self {
        Self {
            relay,
            device: device.into(),
            striker,
        }
    }

    fn property(&self) -> &'static str {
        if self.striker {
            STRIKER_REQUEST_PROPERTY
        } else {
            REQUEST_PROPERTY
        }
    }
}

#[async_trait]
impl<R: CloudRelay> ByteChannel for WifiChannel<R> {
    async fn write(&self, bytes: &[u8]) -> bool {
        let property = self.property();
        trace!(device = %self.device, property, bytes = %HexBytes(bytes), "relay write");
        let value = STANDARD.encode(bytes);
        if let Err(e) = self
            .relay
            .set_property(self.device.clone(), property.to_owned(), value)
            .await
        {
            error!(device = %self.device, "relay write failed: {e}");
        }
        true
    }

    fn max_packet_size(&self) -> usize {
        usize::MAX
    }

    fn link(&self) -> LinkKind {
        LinkKind::Wifi
    }
}

/// Decodes a response property value pushed by the relay.
pub fn decode_property(value: &str) -> Result<Vec<u8>, RelayError> {
    Ok(STANDARD.decode(value.trim())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    const MONITOR: [u8; 5] = [0x0D, 0x05, 0x75, 0x0F, 0xDA];

    #[tokio::test]
    async fn test_write_posts_base64_request_property() {
        // Arrange
        let mut relay = MockCloudRelay::new();
        relay
            .expect_set_property()
            .with(
                eq("DSN-1".to_string()),
                eq(REQUEST_PROPERTY.to_string()),
                eq("DQV1D9o=".to_string()),
            )
            .times(1)
            .returning(|_, _, _| Ok(()));
        let channel = WifiChannel::new(relay, "DSN-1", false);

        // Act
        let ok = channel.write(&MONITOR).await;

        // Assert
        assert!(ok);
    }

    #[tokio::test]
    async fn test_striker_uses_dedicated_property() {
        let mut relay = MockCloudRelay::new();
        relay
            .expect_set_property()
            .withf(|_, property, _| property == STRIKER_REQUEST_PROPERTY)
            .times(1)
            .returning(|_, _, _| Ok(()));
        let channel = WifiChannel::new(relay, "DSN-2", true);

        assert!(channel.write(&MONITOR).await);
    }

    #[tokio::test]
    async fn test_relay_failure_still_reports_success() {
        // Arrange
        let mut relay = MockCloudRelay::new();
        relay.expect_set_property().returning(|_, _, _| {
            Err(RelayError::Unreachable("timeout".into()))
        });
        let channel = WifiChannel::new(relay, "DSN-3", false);

        // Act
        let ok = channel.write(&MONITOR).await;

        // Assert
        assert!(ok);
        assert_eq!(channel.link(), LinkKind::Wifi);
    }

    #[test]
    fn test_decode_property_round_trips_encoded_frame() {
        let decoded = decode_property("DQV1D9o=\n").expect("valid base64");
        assert_eq!(decoded, MONITOR);
    }

    #[test]
    fn test_decode_property_rejects_garbage() {
        let result = decode_property("not base64!");
        assert!(matches!(result, Err(RelayError::Decode(_))));
    }
}
