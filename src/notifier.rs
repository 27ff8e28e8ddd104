//! One-way notification sink for successfully ingested alerts.

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tracing::info;

/// Notification describing a successfully ingested alert
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationEvent {
    /// Store label from the alert
    pub store: String,
    /// Human-readable local date-time of the alert
    pub date: String,
    /// Computed resolution string ("WxH")
    pub resolution: String,
}

/// Emits notification events for ingested alerts.
///
/// Fire-and-forget: the sink has no way to fail the request that produced
/// the event.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &NotificationEvent);
}

/// Notifier that emits structured log events
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &NotificationEvent) {
        info!(
            store = %event.store,
            date = %event.date,
            resolution = %event.resolution,
            "Alert notification"
        );
    }
}

/// Format an epoch timestamp as a local human-readable date-time string
pub fn format_timestamp(epoch_secs: f64) -> String {
    let secs = epoch_secs.trunc() as i64;
    let nanos = (epoch_secs.fract() * 1_000_000_000.0) as u32;

    DateTime::<Utc>::from_timestamp(secs, nanos)
        .map(|dt| {
            dt.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| epoch_secs.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp_shape() {
        let formatted = format_timestamp(1748871320.6882);
        // "YYYY-MM-DD HH:MM:SS", independent of the local timezone
        assert_eq!(formatted.len(), 19);
        assert_eq!(&formatted[4..5], "-");
        assert_eq!(&formatted[10..11], " ");
        assert_eq!(&formatted[13..14], ":");
    }

    #[test]
    fn test_format_timestamp_drops_fractional_seconds() {
        let whole = format_timestamp(1748871320.0);
        let fractional = format_timestamp(1748871320.6882);
        assert_eq!(whole, fractional);
    }

    #[test]
    fn test_log_notifier_is_infallible() {
        let event = NotificationEvent {
            store: "test-store".to_string(),
            date: format_timestamp(1748871320.6882),
            resolution: "1920x1080".to_string(),
        };
        tokio_test::block_on(LogNotifier.notify(&event));
    }
}
