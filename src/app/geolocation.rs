//! Best-effort position lookup for newly added tasks.
//!
//! A lookup is a single attempt bounded by a timeout. Any failure is logged
//! and turns into "no location"; it never reaches the user.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{error, info};
use serde::Deserialize;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::app::models::Location;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeolocationError {
    #[error("permission to read the position was denied")]
    PermissionDenied,

    #[error("geolocation is not supported")]
    Unsupported,

    #[error("position lookup timed out")]
    Timeout,

    #[error("position unavailable: {0}")]
    Unavailable(String),
}

/// Source of the current position.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn current_position(&self) -> Result<Location, GeolocationError>;
}

// Always fails, for setups without any position source
pub struct DisabledGeolocator;

#[async_trait]
impl Geolocator for DisabledGeolocator {
    async fn current_position(&self) -> Result<Location, GeolocationError> {
        Err(GeolocationError::Unsupported)
    }
}

// Reports a position taken from configuration
pub struct FixedGeolocator {
    pub location: Location,
}

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn current_position(&self) -> Result<Location, GeolocationError> {
        Ok(self.location)
    }
}

/// Looks the position up from the public IP address with one HTTP request.
///
/// The endpoint must answer with an ip-api.com style body:
/// `{"status":"success","lat":..,"lon":..}` or `{"status":"fail","message":".."}`.
pub struct IpGeolocator {
    client: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    status: String,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

impl IpGeolocator {
    pub fn new(url: impl Into<String>) -> IpGeolocator {
        IpGeolocator {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Geolocator for IpGeolocator {
    async fn current_position(&self) -> Result<Location, GeolocationError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|err| GeolocationError::Unavailable(err.to_string()))?;

        if response.status() == reqwest::StatusCode::FORBIDDEN {
            return Err(GeolocationError::PermissionDenied);
        }

        let body: IpLookupResponse = response
            .error_for_status()
            .map_err(|err| GeolocationError::Unavailable(err.to_string()))?
            .json()
            .await
            .map_err(|err| GeolocationError::Unavailable(err.to_string()))?;

        parse_lookup(body)
    }
}

fn parse_lookup(body: IpLookupResponse) -> Result<Location, GeolocationError> {
    if body.status != "success" {
        return Err(GeolocationError::Unavailable(
            body.message.unwrap_or(body.status),
        ));
    }
    match (body.lat, body.lon) {
        (Some(latitude), Some(longitude)) => Ok(Location {
            latitude,
            longitude,
        }),
        _ => Err(GeolocationError::Unavailable(
            "response has no coordinates".to_string(),
        )),
    }
}

/// Runs one lookup, giving up after `timeout`.
pub async fn locate_once(locator: &dyn Geolocator, timeout: Duration) -> Option<Location> {
    let result = match tokio::time::timeout(timeout, locator.current_position()).await {
        Ok(result) => result,
        Err(_) => Err(GeolocationError::Timeout),
    };

    match result {
        Ok(location) => {
            info!("event=geolocation module=geolocation status=ok");
            Some(location)
        }
        Err(err) => {
            error!("event=geolocation module=geolocation status=error error={err}");
            None
        }
    }
}

struct PendingAdd {
    name: String,
    receiver: oneshot::Receiver<Option<Location>>,
}

/// Task additions waiting for their position lookup.
///
/// `request` returns at once; the lookup runs on the tokio runtime and
/// `drain_ready` hands back the finished ones in request order.
pub struct PendingAdds {
    locator: Arc<dyn Geolocator>,
    timeout: Duration,
    runtime: Handle,
    pending: Vec<PendingAdd>,
}

impl PendingAdds {
    pub fn new(locator: Arc<dyn Geolocator>, timeout: Duration, runtime: Handle) -> PendingAdds {
        PendingAdds {
            locator,
            timeout,
            runtime,
            pending: Vec::new(),
        }
    }

    pub fn request(&mut self, name: impl Into<String>) {
        let (sender, receiver) = oneshot::channel();
        let locator = Arc::clone(&self.locator);
        let timeout = self.timeout;

        self.runtime.spawn(async move {
            let location = locate_once(locator.as_ref(), timeout).await;
            // The receiver is gone only when the app is shutting down
            let _ = sender.send(location);
        });

        self.pending.push(PendingAdd {
            name: name.into(),
            receiver,
        });
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Removes and returns every addition whose lookup has finished.
    ///
    /// Finished entries are only taken from the front, so a slow lookup
    /// holds back later ones and tasks appear in the order they were added.
    pub fn drain_ready(&mut self) -> Vec<(String, Option<Location>)> {
        let mut ready = Vec::new();
        while let Some(first) = self.pending.first_mut() {
            let location = match first.receiver.try_recv() {
                Ok(location) => location,
                Err(oneshot::error::TryRecvError::Empty) => break,
                Err(oneshot::error::TryRecvError::Closed) => {
                    error!("event=geolocation module=geolocation status=error error=lookup_dropped");
                    None
                }
            };
            let finished = self.pending.remove(0);
            ready.push((finished.name, location));
        }
        ready
    }

    /// Removes and returns every addition, finished or not.
    ///
    /// Lookups still running are abandoned and their additions come back
    /// without a location, so nothing the user entered is lost on exit.
    pub fn drain_all(&mut self) -> Vec<(String, Option<Location>)> {
        self.pending
            .drain(..)
            .map(|mut entry| {
                let location = match entry.receiver.try_recv() {
                    Ok(location) => location,
                    Err(_) => {
                        info!(
                            "event=geolocation module=geolocation status=abandoned reason=shutdown"
                        );
                        None
                    }
                };
                (entry.name, location)
            })
            .collect()
    }
}
