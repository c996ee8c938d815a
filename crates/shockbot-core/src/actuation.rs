use std::ops::RangeInclusive;
use std::sync::Arc;

use async_trait::async_trait;
use shockbot_store::{CompleteCredentials, RemoteCredentials};
use tracing::{info, warn};

use crate::error::CommandError;

pub const INTENSITY_RANGE: RangeInclusive<i64> = 1..=100;
pub const DURATION_RANGE: RangeInclusive<i64> = 1..=15;

/// A shock that passed range validation. There is no other way to build one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuationRequest {
    intensity: u8,
    duration_seconds: u8,
}

impl ActuationRequest {
    pub fn new(intensity: i64, duration_seconds: i64) -> Result<Self, CommandError> {
        check_range("intensity", intensity, &INTENSITY_RANGE)?;
        check_range("duration", duration_seconds, &DURATION_RANGE)?;
        Ok(Self {
            intensity: intensity as u8,
            duration_seconds: duration_seconds as u8,
        })
    }

    pub fn intensity(&self) -> u8 {
        self.intensity
    }

    pub fn duration_seconds(&self) -> u8 {
        self.duration_seconds
    }

    fn revalidate(&self) -> Result<(), CommandError> {
        check_range("intensity", i64::from(self.intensity), &INTENSITY_RANGE)?;
        check_range("duration", i64::from(self.duration_seconds), &DURATION_RANGE)
    }
}

fn check_range(
    field: &'static str,
    value: i64,
    range: &RangeInclusive<i64>,
) -> Result<(), CommandError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(CommandError::OutOfRange {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

/// The vendor call that physically fires the device.
#[async_trait]
pub trait DeviceApi: Send + Sync {
    async fn shock(
        &self,
        credentials: CompleteCredentials<'_>,
        request: &ActuationRequest,
    ) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct ActuationGateway {
    device: Arc<dyn DeviceApi>,
    setup_hint: String,
}

impl ActuationGateway {
    pub fn new(device: Arc<dyn DeviceApi>, setup_hint: impl Into<String>) -> Self {
        Self {
            device,
            setup_hint: setup_hint.into(),
        }
    }

    /// Fires once. Failures are reported, never retried: a second call is a second shock.
    pub async fn actuate(
        &self,
        request: &ActuationRequest,
        credentials: &RemoteCredentials,
    ) -> Result<(), CommandError> {
        let complete = credentials
            .complete()
            .ok_or_else(|| CommandError::NotConfigured {
                missing: credentials.missing_fields(),
                hint: self.setup_hint.clone(),
            })?;
        request.revalidate()?;

        match self.device.shock(complete, request).await {
            Ok(()) => {
                info!(
                    intensity = request.intensity(),
                    duration_seconds = request.duration_seconds(),
                    "shock sent"
                );
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "shock failed");
                Err(CommandError::ActuationFailed(format!("{err:#}")))
            }
        }
    }
}
