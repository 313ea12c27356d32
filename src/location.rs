//! Device location, used to pin a supplier's coordinates.

use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::errors::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Permission state reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Authorization {
    NotDetermined,
    Granted,
    Denied,
    /// Location services are switched off device-wide.
    ServicesDisabled,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationError {
    #[error("location permission denied")]
    Denied,
    #[error("location services are disabled")]
    ServicesDisabled,
    #[error("location permission was not granted")]
    NotDetermined,
    #[error("failed to get location: {0}")]
    Failed(String),
}

impl From<LocationError> for ServiceError {
    fn from(err: LocationError) -> Self {
        ServiceError::ExternalServiceError(err.to_string())
    }
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    fn authorization(&self) -> Authorization;

    /// Prompts for permission and returns the resulting state.
    async fn request_authorization(&self) -> Authorization;

    async fn current_location(&self) -> Result<Coordinates, LocationError>;
}

/// Asks for permission when still undecided, then reads the location.
pub async fn locate(provider: &dyn LocationProvider) -> Result<Coordinates, LocationError> {
    let mut status = provider.authorization();
    if status == Authorization::NotDetermined {
        status = provider.request_authorization().await;
        debug!(%status, "Location authorization requested");
    }
    match status {
        Authorization::Granted => provider.current_location().await,
        Authorization::Denied => Err(LocationError::Denied),
        Authorization::ServicesDisabled => Err(LocationError::ServicesDisabled),
        Authorization::NotDetermined => Err(LocationError::NotDetermined),
    }
}

/// Provider with a preset position and permission answer.
pub struct FixedLocationProvider {
    coordinates: Option<Coordinates>,
    status: Mutex<Authorization>,
    answer: Authorization,
}

impl FixedLocationProvider {
    /// Already authorized, always at `coordinates`.
    pub fn granted(coordinates: Coordinates) -> Self {
        Self::new(Some(coordinates), Authorization::Granted, Authorization::Granted)
    }

    /// Starts undecided; a request moves to `answer`.
    pub fn new(coordinates: Option<Coordinates>, status: Authorization, answer: Authorization) -> Self {
        Self {
            coordinates,
            status: Mutex::new(status),
            answer,
        }
    }

    fn status(&self) -> std::sync::MutexGuard<'_, Authorization> {
        self.status
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl LocationProvider for FixedLocationProvider {
    fn authorization(&self) -> Authorization {
        *self.status()
    }

    async fn request_authorization(&self) -> Authorization {
        let mut status = self.status();
        if *status == Authorization::NotDetermined {
            *status = self.answer;
        }
        *status
    }

    async fn current_location(&self) -> Result<Coordinates, LocationError> {
        if *self.status() != Authorization::Granted {
            return Err(LocationError::Denied);
        }
        self.coordinates
            .ok_or_else(|| LocationError::Failed("no position fix".into()))
    }
}
