//! Symbol-bound function tables over the FMU's exported C ABI.
//!
//! Every entry point is resolved by name from the loaded shared library into a precisely typed
//! function pointer. Construction fails if a required symbol is missing; only `fmi2FreeInstance`
//! is tolerated as absent. Each table holds a strong reference to the library so the pointers can
//! never outlive the code they point into.

use std::sync::Arc;

use fmu_sys::fmi2 as binding;
use libloading::Library;

use crate::Error;

fn symbol<T: Copy>(lib: &Library, name: &'static str) -> Result<T, Error> {
    let bytes = name.as_bytes();
    unsafe { lib.get::<T>(bytes) }
        .map(|sym| *sym)
        .map_err(|_| Error::MissingSymbol(name.to_owned()))
}

fn optional_symbol<T: Copy>(lib: &Library, name: &'static str) -> Option<T> {
    unsafe { lib.get::<T>(name.as_bytes()) }.ok().map(|sym| *sym)
}

/// Entry points that do not take a component handle.
#[derive(Clone)]
pub struct BaseFunctions {
    pub get_types_platform: binding::fmi2GetTypesPlatformTYPE,
    pub get_version: binding::fmi2GetVersionTYPE,
    pub instantiate: binding::fmi2InstantiateTYPE,
    #[allow(dead_code)]
    lib: Arc<Library>,
}

impl BaseFunctions {
    pub fn new(lib: Arc<Library>) -> Result<Self, Error> {
        Ok(Self {
            get_types_platform: symbol(&lib, "fmi2GetTypesPlatform")?,
            get_version: symbol(&lib, "fmi2GetVersion")?,
            instantiate: symbol(&lib, "fmi2Instantiate")?,
            lib,
        })
    }
}

impl std::fmt::Debug for BaseFunctions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseFunctions").finish_non_exhaustive()
    }
}

/// Entry points common to both interface kinds.
pub struct CommonFunctions {
    pub set_debug_logging: binding::fmi2SetDebugLoggingTYPE,

    /// Absent in a few FMUs in the wild; the instance destructor skips the call then.
    pub free_instance: Option<binding::fmi2FreeInstanceTYPE>,

    pub setup_experiment: binding::fmi2SetupExperimentTYPE,
    pub enter_initialization_mode: binding::fmi2EnterInitializationModeTYPE,
    pub exit_initialization_mode: binding::fmi2ExitInitializationModeTYPE,
    pub terminate: binding::fmi2TerminateTYPE,
    pub reset: binding::fmi2ResetTYPE,

    pub get_real: binding::fmi2GetRealTYPE,
    pub get_integer: binding::fmi2GetIntegerTYPE,
    pub get_boolean: binding::fmi2GetBooleanTYPE,
    pub get_string: binding::fmi2GetStringTYPE,

    pub set_real: binding::fmi2SetRealTYPE,
    pub set_integer: binding::fmi2SetIntegerTYPE,
    pub set_boolean: binding::fmi2SetBooleanTYPE,
    pub set_string: binding::fmi2SetStringTYPE,

    pub get_fmu_state: binding::fmi2GetFMUstateTYPE,
    pub set_fmu_state: binding::fmi2SetFMUstateTYPE,
    pub free_fmu_state: binding::fmi2FreeFMUstateTYPE,
    pub serialized_fmu_state_size: binding::fmi2SerializedFMUstateSizeTYPE,
    pub serialize_fmu_state: binding::fmi2SerializeFMUstateTYPE,
    pub deserialize_fmu_state: binding::fmi2DeSerializeFMUstateTYPE,

    pub get_directional_derivative: binding::fmi2GetDirectionalDerivativeTYPE,

    #[allow(dead_code)]
    lib: Arc<Library>,
}

impl CommonFunctions {
    pub fn new(lib: Arc<Library>) -> Result<Self, Error> {
        Ok(Self {
            set_debug_logging: symbol(&lib, "fmi2SetDebugLogging")?,
            free_instance: optional_symbol(&lib, "fmi2FreeInstance"),
            setup_experiment: symbol(&lib, "fmi2SetupExperiment")?,
            enter_initialization_mode: symbol(&lib, "fmi2EnterInitializationMode")?,
            exit_initialization_mode: symbol(&lib, "fmi2ExitInitializationMode")?,
            terminate: symbol(&lib, "fmi2Terminate")?,
            reset: symbol(&lib, "fmi2Reset")?,
            get_real: symbol(&lib, "fmi2GetReal")?,
            get_integer: symbol(&lib, "fmi2GetInteger")?,
            get_boolean: symbol(&lib, "fmi2GetBoolean")?,
            get_string: symbol(&lib, "fmi2GetString")?,
            set_real: symbol(&lib, "fmi2SetReal")?,
            set_integer: symbol(&lib, "fmi2SetInteger")?,
            set_boolean: symbol(&lib, "fmi2SetBoolean")?,
            set_string: symbol(&lib, "fmi2SetString")?,
            get_fmu_state: symbol(&lib, "fmi2GetFMUstate")?,
            set_fmu_state: symbol(&lib, "fmi2SetFMUstate")?,
            free_fmu_state: symbol(&lib, "fmi2FreeFMUstate")?,
            serialized_fmu_state_size: symbol(&lib, "fmi2SerializedFMUstateSize")?,
            serialize_fmu_state: symbol(&lib, "fmi2SerializeFMUstate")?,
            deserialize_fmu_state: symbol(&lib, "fmi2DeSerializeFMUstate")?,
            get_directional_derivative: symbol(&lib, "fmi2GetDirectionalDerivative")?,
            lib,
        })
    }
}

impl std::fmt::Debug for CommonFunctions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommonFunctions").finish_non_exhaustive()
    }
}

/// Entry points specific to model exchange.
pub struct ModelExchangeFunctions {
    pub enter_event_mode: binding::fmi2EnterEventModeTYPE,
    pub new_discrete_states: binding::fmi2NewDiscreteStatesTYPE,
    pub enter_continuous_time_mode: binding::fmi2EnterContinuousTimeModeTYPE,
    pub completed_integrator_step: binding::fmi2CompletedIntegratorStepTYPE,

    pub set_time: binding::fmi2SetTimeTYPE,
    pub set_continuous_states: binding::fmi2SetContinuousStatesTYPE,

    pub get_derivatives: binding::fmi2GetDerivativesTYPE,
    pub get_event_indicators: binding::fmi2GetEventIndicatorsTYPE,
    pub get_continuous_states: binding::fmi2GetContinuousStatesTYPE,
    pub get_nominals_of_continuous_states: binding::fmi2GetNominalsOfContinuousStatesTYPE,

    #[allow(dead_code)]
    lib: Arc<Library>,
}

impl ModelExchangeFunctions {
    pub fn new(lib: Arc<Library>) -> Result<Self, Error> {
        Ok(Self {
            enter_event_mode: symbol(&lib, "fmi2EnterEventMode")?,
            new_discrete_states: symbol(&lib, "fmi2NewDiscreteStates")?,
            enter_continuous_time_mode: symbol(&lib, "fmi2EnterContinuousTimeMode")?,
            completed_integrator_step: symbol(&lib, "fmi2CompletedIntegratorStep")?,
            set_time: symbol(&lib, "fmi2SetTime")?,
            set_continuous_states: symbol(&lib, "fmi2SetContinuousStates")?,
            get_derivatives: symbol(&lib, "fmi2GetDerivatives")?,
            get_event_indicators: symbol(&lib, "fmi2GetEventIndicators")?,
            get_continuous_states: symbol(&lib, "fmi2GetContinuousStates")?,
            get_nominals_of_continuous_states: symbol(&lib, "fmi2GetNominalsOfContinuousStates")?,
            lib,
        })
    }
}

impl std::fmt::Debug for ModelExchangeFunctions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelExchangeFunctions").finish_non_exhaustive()
    }
}

/// Entry points specific to co-simulation.
pub struct CoSimFunctions {
    pub set_real_input_derivatives: binding::fmi2SetRealInputDerivativesTYPE,
    pub get_real_output_derivatives: binding::fmi2GetRealOutputDerivativesTYPE,

    pub do_step: binding::fmi2DoStepTYPE,
    pub cancel_step: binding::fmi2CancelStepTYPE,

    pub get_status: binding::fmi2GetStatusTYPE,
    pub get_real_status: binding::fmi2GetRealStatusTYPE,
    pub get_integer_status: binding::fmi2GetIntegerStatusTYPE,
    pub get_boolean_status: binding::fmi2GetBooleanStatusTYPE,
    pub get_string_status: binding::fmi2GetStringStatusTYPE,

    #[allow(dead_code)]
    lib: Arc<Library>,
}

impl CoSimFunctions {
    pub fn new(lib: Arc<Library>) -> Result<Self, Error> {
        Ok(Self {
            set_real_input_derivatives: symbol(&lib, "fmi2SetRealInputDerivatives")?,
            get_real_output_derivatives: symbol(&lib, "fmi2GetRealOutputDerivatives")?,
            do_step: symbol(&lib, "fmi2DoStep")?,
            cancel_step: symbol(&lib, "fmi2CancelStep")?,
            get_status: symbol(&lib, "fmi2GetStatus")?,
            get_real_status: symbol(&lib, "fmi2GetRealStatus")?,
            get_integer_status: symbol(&lib, "fmi2GetIntegerStatus")?,
            get_boolean_status: symbol(&lib, "fmi2GetBooleanStatus")?,
            get_string_status: symbol(&lib, "fmi2GetStringStatus")?,
            lib,
        })
    }
}

impl std::fmt::Debug for CoSimFunctions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoSimFunctions").finish_non_exhaustive()
    }
}
