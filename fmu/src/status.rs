//! Mapping of the FMI status enum onto the Rust error model.

use fmu_sys::fmi2 as binding;

/// Non-error results of an ABI call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fmi2Res {
    /// All well
    OK,
    /// Things are not quite right, but the computation can continue. The FMU is expected to have
    /// shown a prepared message through the logger callback.
    Warning,
    /// Returned only from the co-simulation interface when the slave executes `fmi2DoStep`
    /// asynchronously. The master polls the do-step status to determine completion.
    Pending,
}

/// Error statuses of an ABI call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Fmi2Error {
    /// The request was declined, typically a type or mode mismatch. For co-simulation it is also
    /// returned when the slave cannot provide the requested status information.
    #[error("return fmi2Discard")]
    Discard,
    /// The FMU encountered an error; the simulation cannot be continued with this instance unless
    /// a previously stored FMU state is restored.
    #[error("return fmi2Error")]
    Error,
    /// The model computations are irreparably corrupted for all instances of this FMU.
    #[error("return fmi2Fatal")]
    Fatal,
    /// Warning promoted to an error by the instance's exception-on-warning policy.
    #[error("return fmi2Warning")]
    Warning,
}

/// Thin wrapper over the raw status code returned by every ABI entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fmi2Status(pub binding::fmi2Status);

impl Fmi2Status {
    /// Convert to [`Result<Fmi2Res, Fmi2Error>`]. Warnings are kept on the `Ok` side here; the
    /// instance applies its exception-on-warning / exception-on-discard policies on top.
    #[inline]
    pub fn ok(self) -> Result<Fmi2Res, Fmi2Error> {
        self.into()
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.0 == binding::fmi2Status_fmi2Error || self.0 == binding::fmi2Status_fmi2Fatal
    }
}

impl From<binding::fmi2Status> for Fmi2Status {
    fn from(status: binding::fmi2Status) -> Self {
        Self(status)
    }
}

impl From<Fmi2Status> for Result<Fmi2Res, Fmi2Error> {
    fn from(Fmi2Status(status): Fmi2Status) -> Self {
        match status {
            binding::fmi2Status_fmi2OK => Ok(Fmi2Res::OK),
            binding::fmi2Status_fmi2Warning => Ok(Fmi2Res::Warning),
            binding::fmi2Status_fmi2Pending => Ok(Fmi2Res::Pending),
            binding::fmi2Status_fmi2Discard => Err(Fmi2Error::Discard),
            binding::fmi2Status_fmi2Error => Err(Fmi2Error::Error),
            binding::fmi2Status_fmi2Fatal => Err(Fmi2Error::Fatal),
            _ => Err(Fmi2Error::Fatal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            Fmi2Status(binding::fmi2Status_fmi2OK).ok(),
            Ok(Fmi2Res::OK)
        );
        assert_eq!(
            Fmi2Status(binding::fmi2Status_fmi2Warning).ok(),
            Ok(Fmi2Res::Warning)
        );
        assert_eq!(
            Fmi2Status(binding::fmi2Status_fmi2Pending).ok(),
            Ok(Fmi2Res::Pending)
        );
        assert_eq!(
            Fmi2Status(binding::fmi2Status_fmi2Discard).ok(),
            Err(Fmi2Error::Discard)
        );
        assert!(Fmi2Status(binding::fmi2Status_fmi2Fatal).is_error());
        assert!(!Fmi2Status(binding::fmi2Status_fmi2Warning).is_error());
    }
}
