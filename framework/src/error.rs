use anyhow::Error as AnyError;
use connex_common::validator::ValidationError;
use thiserror::Error;

use crate::driver::DriverError;

#[derive(Debug, Error)]
pub enum FrameworkError {
    // Caller argument rejected before anything reached the driver
    #[error(transparent)]
    BadParameter(#[from] ValidationError),
    // Signing request failed on the driver side
    #[error("rejected: {}", _0)]
    Rejected(String),
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error("failed to decode output: {:#}", _0)]
    Decode(AnyError),
    #[error("driver returned no output for the clause")]
    EmptyOutput,
    #[error("head tracker is closed")]
    TrackerClosed,
}

impl FrameworkError {
    pub fn is_bad_parameter(&self) -> bool {
        matches!(self, Self::BadParameter(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}
