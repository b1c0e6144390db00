//! Geolocation feed: readings arrive in the background, consumers read the
//! latest one at the instant they need it.

use chrono::Utc;
use futures::{Stream, StreamExt};
use nietdoen_core::{GeoPoint, GeoReading};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Read side of the feed. `None` while the first fix is pending.
#[derive(Debug, Clone)]
pub struct GeoFeed {
    rx: watch::Receiver<Option<GeoReading>>,
}

impl GeoFeed {
    pub fn current(&self) -> Option<GeoReading> {
        *self.rx.borrow()
    }

    pub fn is_pending(&self) -> bool {
        self.rx.borrow().is_none()
    }
}

/// Handle to a running geolocation source.
///
/// Stopping (or dropping) the handle ends the background task; the last
/// reading stays visible through existing feeds.
pub struct GeoSubscription {
    rx: watch::Receiver<Option<GeoReading>>,
    task: Option<JoinHandle<()>>,
}

impl GeoSubscription {
    /// A feed that never resolves.
    pub fn pending() -> Self {
        let (_, rx) = watch::channel(None);
        Self { rx, task: None }
    }

    /// A feed fixed at one point, stamped now.
    pub fn fixed(point: GeoPoint) -> Self {
        let (_, rx) = watch::channel(Some(GeoReading {
            point,
            timestamp: Utc::now(),
        }));
        info!(latitude = point.latitude, longitude = point.longitude, "using fixed location");
        Self { rx, task: None }
    }

    /// Forward readings from `source` until it ends or the subscription stops.
    pub fn spawn<S>(source: S) -> Self
    where
        S: Stream<Item = GeoReading> + Send + 'static,
    {
        let (tx, rx) = watch::channel(None);
        let task = tokio::spawn(async move {
            let mut source = Box::pin(source);
            while let Some(reading) = source.next().await {
                debug!(
                    latitude = reading.point.latitude,
                    longitude = reading.point.longitude,
                    "location reading"
                );
                tx.send_replace(Some(reading));
            }
        });
        Self {
            rx,
            task: Some(task),
        }
    }

    pub fn feed(&self) -> GeoFeed {
        GeoFeed {
            rx: self.rx.clone(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("location updates stopped");
        }
    }
}

impl Drop for GeoSubscription {
    fn drop(&mut self) {
        self.stop();
    }
}
