#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![deny(clippy::all)]

mod broker;
mod core;
mod federate;
mod info;
mod time;

pub use broker::BrokerApp;
pub use core::CoreApp;
pub use federate::{
    IterationRequest, IterationResult, Publication, Subscription, ValueFederate,
};
pub use info::FederateInfo;
pub use time::{Time, TimeProperty};

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("No core registered under the name {0}")]
    CoreNotFound(String),

    #[error("No broker reachable at {0}")]
    BrokerNotFound(String),

    #[error("The bus has been terminated")]
    Terminated,

    #[error("Invalid time value: {0}")]
    InvalidTime(String),

    #[error("Error loading federate info: {0}")]
    InfoFormat(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
