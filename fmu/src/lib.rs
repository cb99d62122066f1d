#![doc = include_str!("../README.md")]
#![deny(clippy::all)]

// Re-export the schema crate
pub use fmu_schema as schema;
pub use fmu_sys as sys;

pub mod catalog;
pub mod functions;
pub mod instance;
pub mod library;
pub mod manager;
mod status;

pub use catalog::VariableCatalog;
pub use instance::{CoSimInstance, FmuMode, FmuObject, ModelExchangeInstance};
pub use library::FmuLibrary;
pub use manager::LibraryManager;
pub use status::{Fmi2Error, Fmi2Res, Fmi2Status};

/// Which of the two FMI 2.0 interfaces an operation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FmuKind {
    ModelExchange,
    CoSimulation,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("fmi2Instantiate returned a null component")]
    Instantiation,

    #[error("Unknown variable: {name}")]
    UnknownVariable { name: String },

    #[error("Model type {0} not supported by this FMU")]
    UnsupportedFmuType(String),

    #[error("Unsupported platform {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("FMU archive structure is not as expected: {0}")]
    ArchiveStructure(String),

    #[error("Shared library not found: {0}")]
    SharedLibraryNotFound(std::path::PathBuf),

    #[error("Required ABI symbol {0} is missing from the shared library")]
    MissingSymbol(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Schema(#[from] fmu_schema::Error),

    #[error(transparent)]
    LibLoading(#[from] libloading::Error),

    #[error(transparent)]
    Status(#[from] Fmi2Error),
}
