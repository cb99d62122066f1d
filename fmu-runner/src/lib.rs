#![doc = include_str!("../README.md")]
#![deny(clippy::all)]

pub mod config;
pub mod cosim_federate;
pub mod options;
pub mod runner;

pub use cosim_federate::CoSimFederate;
pub use options::Options;
pub use runner::{ErrorCode, FmiRunner};

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("Invalid time value: {0}")]
    InvalidTime(String),

    #[error("Error parsing config file: {0}")]
    ConfigFormat(String),

    #[error(transparent)]
    Fmu(#[from] fmu::Error),

    #[error(transparent)]
    Status(#[from] fmu::Fmi2Error),

    #[error(transparent)]
    Bus(#[from] fmu_bus::BusError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
