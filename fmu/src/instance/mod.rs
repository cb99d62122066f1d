//! Per-instance FMU handles and the FMI mode state machine.
//!
//! [`FmuObject`] is the single place where ABI status codes are translated into Rust errors and
//! where the FMI state discipline is enforced. [`CoSimInstance`] and [`ModelExchangeInstance`]
//! layer the kind-specific operations and mode overrides on top.

use std::ffi::{CStr, CString};
use std::sync::Arc;

use fmu_sys::fmi2 as binding;

use crate::catalog::{VarType, VariableCatalog, VariableInfo, VariableSet};
use crate::functions::CommonFunctions;
use crate::status::{Fmi2Error, Fmi2Res, Fmi2Status};
use crate::FmuKind;

mod co_simulation;
mod model_exchange;

pub use co_simulation::CoSimInstance;
pub use model_exchange::{EventInfo, ModelExchangeInstance};

/// FMI lifecycle state.
///
/// `Step` is a synonym for event mode that makes more sense for co-simulation; co-simulation
/// instances conceptually have only this one running mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FmuMode {
    Instantiated,
    Initialization,
    ContinuousTime,
    Event,
    Step,
    Terminated,
    Error,
}

/// One entry of an ordered transition plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlanStep {
    /// Populate empty active input/output sets with the declared defaults
    PopulateDefaultIo,
    EnterInitialization,
    ExitInitialization,
    Terminate,
    EnterEventMode,
    EnterContinuousTimeMode,
}

/// Compute the ordered ABI calls needed to move from `current` to `requested`.
///
/// Pure so the full transition table is testable without an FMU. Co-simulation requests for
/// continuous-time or event mode are coerced to step mode here.
pub(crate) fn transition_plan(
    current: FmuMode,
    requested: FmuMode,
    kind: FmuKind,
    has_states: bool,
) -> Result<(FmuMode, Vec<PlanStep>), Fmi2Error> {
    use FmuMode::*;
    use PlanStep::*;

    let requested = match (kind, requested) {
        (FmuKind::CoSimulation, ContinuousTime) | (FmuKind::CoSimulation, Event) => Step,
        (_, other) => other,
    };

    if requested == Error {
        return Err(Fmi2Error::Error);
    }

    if requested == Terminated {
        return match current {
            // terminated from error is a no-op
            Error => Ok((Error, vec![])),
            Terminated => Ok((Terminated, vec![])),
            Instantiated => Ok((
                Terminated,
                vec![EnterInitialization, ExitInitialization, Terminate],
            )),
            Initialization => Ok((Terminated, vec![ExitInitialization, Terminate])),
            ContinuousTime | Event | Step => Ok((Terminated, vec![Terminate])),
        };
    }

    if kind == FmuKind::ModelExchange {
        // Mixed-mode shortcuts for model exchange; the continuous-time entry is guarded by the
        // state count because stateless FMUs never leave event mode.
        match (current, requested) {
            (Instantiated, ContinuousTime) => {
                let mut steps = vec![PopulateDefaultIo, EnterInitialization, ExitInitialization];
                if has_states {
                    steps.push(EnterContinuousTimeMode);
                }
                return Ok((ContinuousTime, steps));
            }
            (Initialization, ContinuousTime) => {
                let mut steps = vec![ExitInitialization];
                if has_states {
                    steps.push(EnterContinuousTimeMode);
                }
                return Ok((ContinuousTime, steps));
            }
            (ContinuousTime, Event) => return Ok((Event, vec![EnterEventMode])),
            (Event, Event) => return Ok((Event, vec![EnterEventMode])),
            (Event, ContinuousTime) => {
                let steps = if has_states {
                    vec![EnterContinuousTimeMode]
                } else {
                    vec![]
                };
                return Ok((ContinuousTime, steps));
            }
            _ => {}
        }
    }

    if current == requested {
        return Ok((current, vec![]));
    }

    match (current, requested) {
        (Instantiated, Initialization) => Ok((
            Initialization,
            vec![PopulateDefaultIo, EnterInitialization],
        )),
        (Instantiated, Event) | (Instantiated, Step) => Ok((
            requested,
            vec![PopulateDefaultIo, EnterInitialization, ExitInitialization],
        )),
        (Initialization, Event) | (Initialization, Step) => {
            Ok((requested, vec![ExitInitialization]))
        }
        _ => Err(Fmi2Error::Error),
    }
}

/// Handle to a saved FMU state snapshot, owned by the instance.
pub struct FmuState(usize);

/// Common per-instance state shared by both interface kinds.
pub struct FmuObject {
    name: String,
    component: binding::fmi2Component,
    catalog: Arc<VariableCatalog>,
    common: Arc<CommonFunctions>,
    mode: FmuMode,
    active_inputs: VariableSet,
    active_input_indices: Vec<usize>,
    active_outputs: VariableSet,
    active_output_indices: Vec<usize>,
    saved_states: Vec<binding::fmi2FMUstate>,
    /// Keeps the callback struct handed to fmi2Instantiate alive for the instance lifetime
    #[allow(dead_code)]
    callbacks: Box<binding::fmi2CallbackFunctions>,
    exception_on_discard: bool,
    exception_on_warning: bool,
}

// The component handle is only ever driven from the worker that owns the instance; nothing is
// shared across threads.
unsafe impl Send for FmuObject {}

impl Drop for FmuObject {
    fn drop(&mut self) {
        log::trace!("Freeing component {:?}", self.component);
        unsafe {
            for state in &mut self.saved_states {
                (self.common.free_fmu_state)(self.component, state);
            }
            if let Some(free_instance) = self.common.free_instance {
                free_instance(self.component);
            }
        }
    }
}

impl std::fmt::Debug for FmuObject {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "FmuObject {} {{model {}, {:?}, {:?}}}",
            self.name,
            self.catalog.model_name(),
            self.component,
            self.mode,
        )
    }
}

impl FmuObject {
    pub(crate) fn new(
        name: String,
        component: binding::fmi2Component,
        catalog: Arc<VariableCatalog>,
        common: Arc<CommonFunctions>,
        callbacks: Box<binding::fmi2CallbackFunctions>,
    ) -> Self {
        Self {
            name,
            component,
            catalog,
            common,
            mode: FmuMode::Instantiated,
            active_inputs: VariableSet::new(VarType::Real),
            active_input_indices: Vec::new(),
            active_outputs: VariableSet::new(VarType::Real),
            active_output_indices: Vec::new(),
            saved_states: Vec::new(),
            callbacks,
            exception_on_discard: true,
            exception_on_warning: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn catalog(&self) -> &Arc<VariableCatalog> {
        &self.catalog
    }

    pub fn current_mode(&self) -> FmuMode {
        self.mode
    }

    pub(crate) fn component(&self) -> binding::fmi2Component {
        self.component
    }

    /// The single choke point translating ABI status codes into the error taxonomy.
    ///
    /// `Pending` never raises; it is recorded by the co-simulation step bookkeeping instead.
    /// Discards and warnings raise according to the per-instance policy flags.
    pub(crate) fn handle_status(&self, status: binding::fmi2Status) -> Result<Fmi2Res, Fmi2Error> {
        match Fmi2Status(status).ok() {
            Ok(Fmi2Res::Warning) if self.exception_on_warning => Err(Fmi2Error::Warning),
            Ok(res) => Ok(res),
            Err(Fmi2Error::Discard) if !self.exception_on_discard => Ok(Fmi2Res::OK),
            Err(err) => Err(err),
        }
    }

    /// Execute a transition plan computed by [`transition_plan`], delegating kind-specific calls
    /// to `kind_call`. The current mode is only committed once every call succeeded.
    pub(crate) fn run_plan(
        &mut self,
        target: FmuMode,
        steps: &[PlanStep],
        mut kind_call: impl FnMut(PlanStep, binding::fmi2Component) -> Option<binding::fmi2Status>,
    ) -> Result<(), Fmi2Error> {
        for step in steps {
            match step {
                PlanStep::PopulateDefaultIo => {
                    if self.active_inputs.is_empty() {
                        self.set_default_inputs();
                    }
                    if self.active_outputs.is_empty() {
                        self.set_default_outputs();
                    }
                }
                PlanStep::EnterInitialization => {
                    let ret = unsafe { (self.common.enter_initialization_mode)(self.component) };
                    self.handle_status(ret)?;
                    self.mode = FmuMode::Initialization;
                }
                PlanStep::ExitInitialization => {
                    let ret = unsafe { (self.common.exit_initialization_mode)(self.component) };
                    self.handle_status(ret)?;
                }
                PlanStep::Terminate => {
                    let ret = unsafe { (self.common.terminate)(self.component) };
                    self.handle_status(ret)?;
                }
                PlanStep::EnterEventMode | PlanStep::EnterContinuousTimeMode => {
                    if let Some(ret) = kind_call(*step, self.component) {
                        self.handle_status(ret)?;
                    } else {
                        return Err(Fmi2Error::Error);
                    }
                }
            }
        }
        self.mode = target;
        Ok(())
    }

    pub(crate) fn set_error_mode(&mut self) {
        self.mode = FmuMode::Error;
    }

    pub fn setup_experiment(
        &mut self,
        tolerance: Option<f64>,
        start_time: f64,
        stop_time: Option<f64>,
    ) -> Result<(), Fmi2Error> {
        let ret = unsafe {
            (self.common.setup_experiment)(
                self.component,
                tolerance.is_some() as binding::fmi2Boolean,
                tolerance.unwrap_or(0.0),
                start_time,
                stop_time.is_some() as binding::fmi2Boolean,
                stop_time.unwrap_or(0.0),
            )
        };
        self.handle_status(ret).map(|_| ())
    }

    /// Reset the FMU to the state it had directly after instantiation.
    pub fn reset(&mut self) -> Result<(), Fmi2Error> {
        self.mode = FmuMode::Instantiated;
        let ret = unsafe { (self.common.reset)(self.component) };
        self.handle_status(ret).map(|_| ())
    }

    pub fn set_debug_logging(
        &mut self,
        logging_on: bool,
        categories: &[&str],
    ) -> Result<(), Fmi2Error> {
        let category_cstr = categories
            .iter()
            .map(|c| CString::new(*c).expect("Error building CString"))
            .collect::<Vec<_>>();
        let category_ptrs: Vec<_> = category_cstr.iter().map(|c| c.as_ptr()).collect();
        let ret = unsafe {
            (self.common.set_debug_logging)(
                self.component,
                logging_on as binding::fmi2Boolean,
                category_ptrs.len(),
                category_ptrs.as_ptr(),
            )
        };
        self.handle_status(ret).map(|_| ())
    }

    // ------------------------------------------------------------------
    // Typed get/set
    // ------------------------------------------------------------------

    fn lookup(&self, name: &str) -> Option<VariableInfo> {
        self.catalog.variable_by_name(name).cloned()
    }

    /// Get a numeric variable (real/integer/boolean/enumeration), converted to `f64`.
    /// A string-typed or unknown variable is a discard.
    pub fn get_numeric(&self, name: &str) -> Result<f64, Fmi2Error> {
        let Some(var) = self.lookup(name) else {
            self.handle_status(binding::fmi2Status_fmi2Discard)?;
            return Ok(0.0);
        };
        self.get_numeric_var(&var)
    }

    pub fn get_numeric_var(&self, var: &VariableInfo) -> Result<f64, Fmi2Error> {
        let vr = var.value_ref;
        match var.var_type {
            VarType::Real => {
                let mut value: binding::fmi2Real = 0.0;
                let ret =
                    unsafe { (self.common.get_real)(self.component, &vr, 1, &mut value) };
                self.handle_status(ret)?;
                Ok(value)
            }
            VarType::Integer | VarType::Enumeration => {
                let mut value: binding::fmi2Integer = 0;
                let ret =
                    unsafe { (self.common.get_integer)(self.component, &vr, 1, &mut value) };
                self.handle_status(ret)?;
                Ok(value as f64)
            }
            VarType::Boolean => {
                let mut value: binding::fmi2Boolean = 0;
                let ret =
                    unsafe { (self.common.get_boolean)(self.component, &vr, 1, &mut value) };
                self.handle_status(ret)?;
                Ok((value != 0) as u8 as f64)
            }
            VarType::String => {
                self.handle_status(binding::fmi2Status_fmi2Discard)?;
                Ok(0.0)
            }
        }
    }

    /// Set a numeric variable, converting through the variable's concrete ABI type.
    pub fn set_numeric(&mut self, name: &str, value: f64) -> Result<(), Fmi2Error> {
        let Some(var) = self.lookup(name) else {
            return self.handle_status(binding::fmi2Status_fmi2Discard).map(|_| ());
        };
        self.set_numeric_var(&var, value)
    }

    pub fn set_numeric_var(&mut self, var: &VariableInfo, value: f64) -> Result<(), Fmi2Error> {
        let vr = var.value_ref;
        let ret = match var.var_type {
            VarType::Real => {
                let value: binding::fmi2Real = value;
                unsafe { (self.common.set_real)(self.component, &vr, 1, &value) }
            }
            VarType::Integer | VarType::Enumeration => {
                let value: binding::fmi2Integer = value as binding::fmi2Integer;
                unsafe { (self.common.set_integer)(self.component, &vr, 1, &value) }
            }
            VarType::Boolean => {
                let value: binding::fmi2Boolean = (value != 0.0) as binding::fmi2Boolean;
                unsafe { (self.common.set_boolean)(self.component, &vr, 1, &value) }
            }
            VarType::String => binding::fmi2Status_fmi2Discard,
        };
        self.handle_status(ret).map(|_| ())
    }

    /// Get a string variable; a non-string target is a discard.
    pub fn get_string_value(&self, name: &str) -> Result<String, Fmi2Error> {
        let Some(var) = self.lookup(name) else {
            self.handle_status(binding::fmi2Status_fmi2Discard)?;
            return Ok(String::new());
        };
        if var.var_type != VarType::String {
            self.handle_status(binding::fmi2Status_fmi2Discard)?;
            return Ok(String::new());
        }
        let vr = var.value_ref;
        let mut ptr: binding::fmi2String = std::ptr::null();
        let ret = unsafe { (self.common.get_string)(self.component, &vr, 1, &mut ptr) };
        self.handle_status(ret)?;
        if ptr.is_null() {
            return Ok(String::new());
        }
        // Copy the returned C string; the FMU owns the original buffer.
        Ok(unsafe { CStr::from_ptr(ptr) }
            .to_string_lossy()
            .into_owned())
    }

    /// Set a string variable; a non-string target is a discard.
    pub fn set_string_value(&mut self, name: &str, value: &str) -> Result<(), Fmi2Error> {
        let Some(var) = self.lookup(name) else {
            return self.handle_status(binding::fmi2Status_fmi2Discard).map(|_| ());
        };
        if var.var_type != VarType::String {
            return self.handle_status(binding::fmi2Status_fmi2Discard).map(|_| ());
        }
        let vr = var.value_ref;
        let cstring = CString::new(value).map_err(|_| Fmi2Error::Error)?;
        let ptr = cstring.as_ptr();
        let ret = unsafe { (self.common.set_string)(self.component, &vr, 1, &ptr) };
        self.handle_status(ret).map(|_| ())
    }

    /// Apply a textual value to a variable, parsing it according to the variable's declared type.
    /// Used for `--set key=value` and config-file parameters. Unparseable values and unknown
    /// variables are discards.
    pub fn set_from_str(&mut self, name: &str, raw: &str) -> Result<(), Fmi2Error> {
        let Some(var) = self.lookup(name) else {
            return self.handle_status(binding::fmi2Status_fmi2Discard).map(|_| ());
        };
        match var.var_type {
            VarType::String => self.set_string_value(name, raw),
            VarType::Boolean => {
                let value = match raw {
                    "true" | "True" | "1" => 1.0,
                    "false" | "False" | "0" => 0.0,
                    _ => {
                        return self
                            .handle_status(binding::fmi2Status_fmi2Discard)
                            .map(|_| ())
                    }
                };
                self.set_numeric_var(&var, value)
            }
            _ => match raw.trim().parse::<f64>() {
                Ok(value) => self.set_numeric_var(&var, value),
                Err(_) => self.handle_status(binding::fmi2Status_fmi2Discard).map(|_| ()),
            },
        }
    }

    // ------------------------------------------------------------------
    // Bulk transfers against a variable set
    // ------------------------------------------------------------------

    pub fn get_reals(&self, set: &VariableSet, values: &mut [f64]) -> Result<(), Fmi2Error> {
        assert_eq!(set.len(), values.len());
        let ret = unsafe {
            (self.common.get_real)(
                self.component,
                set.value_refs().as_ptr(),
                set.len(),
                values.as_mut_ptr(),
            )
        };
        self.handle_status(ret).map(|_| ())
    }

    pub fn set_reals(&mut self, set: &VariableSet, values: &[f64]) -> Result<(), Fmi2Error> {
        assert_eq!(set.len(), values.len());
        let ret = unsafe {
            (self.common.set_real)(
                self.component,
                set.value_refs().as_ptr(),
                set.len(),
                values.as_ptr(),
            )
        };
        self.handle_status(ret).map(|_| ())
    }

    pub fn get_integers(
        &self,
        set: &VariableSet,
        values: &mut [binding::fmi2Integer],
    ) -> Result<(), Fmi2Error> {
        assert_eq!(set.len(), values.len());
        let ret = unsafe {
            (self.common.get_integer)(
                self.component,
                set.value_refs().as_ptr(),
                set.len(),
                values.as_mut_ptr(),
            )
        };
        self.handle_status(ret).map(|_| ())
    }

    pub fn set_integers(
        &mut self,
        set: &VariableSet,
        values: &[binding::fmi2Integer],
    ) -> Result<(), Fmi2Error> {
        assert_eq!(set.len(), values.len());
        let ret = unsafe {
            (self.common.set_integer)(
                self.component,
                set.value_refs().as_ptr(),
                set.len(),
                values.as_ptr(),
            )
        };
        self.handle_status(ret).map(|_| ())
    }

    // ------------------------------------------------------------------
    // Active input/output sets
    // ------------------------------------------------------------------

    /// Write the active-input buffer into the FMU. No-op for an empty active set.
    pub fn set_inputs(&mut self, inputs: &[f64]) -> Result<(), Fmi2Error> {
        if self.active_inputs.is_empty() {
            return Ok(());
        }
        assert_eq!(self.active_inputs.len(), inputs.len());
        let ret = unsafe {
            (self.common.set_real)(
                self.component,
                self.active_inputs.value_refs().as_ptr(),
                self.active_inputs.len(),
                inputs.as_ptr(),
            )
        };
        self.handle_status(ret).map(|_| ())
    }

    /// Read the FMU's current values for the active inputs.
    pub fn get_current_inputs(&self, inputs: &mut [f64]) -> Result<(), Fmi2Error> {
        if self.active_inputs.is_empty() {
            return Ok(());
        }
        assert_eq!(self.active_inputs.len(), inputs.len());
        let ret = unsafe {
            (self.common.get_real)(
                self.component,
                self.active_inputs.value_refs().as_ptr(),
                self.active_inputs.len(),
                inputs.as_mut_ptr(),
            )
        };
        self.handle_status(ret).map(|_| ())
    }

    /// Read the active-output buffer from the FMU. No-op for an empty active set.
    pub fn get_outputs(&self, outputs: &mut [f64]) -> Result<(), Fmi2Error> {
        if self.active_outputs.is_empty() {
            return Ok(());
        }
        assert_eq!(self.active_outputs.len(), outputs.len());
        let ret = unsafe {
            (self.common.get_real)(
                self.component,
                self.active_outputs.value_refs().as_ptr(),
                self.active_outputs.len(),
                outputs.as_mut_ptr(),
            )
        };
        self.handle_status(ret).map(|_| ())
    }

    pub fn input_size(&self) -> usize {
        self.active_inputs.len()
    }

    pub fn output_size(&self) -> usize {
        self.active_outputs.len()
    }

    pub(crate) fn active_inputs(&self) -> &VariableSet {
        &self.active_inputs
    }

    pub(crate) fn active_outputs(&self) -> &VariableSet {
        &self.active_outputs
    }

    fn is_real_output(var: &VariableInfo) -> bool {
        // `local` is admitted on the output side to expose internal observables
        var.var_type == VarType::Real
            && matches!(
                var.causality,
                fmu_schema::Causality::Output | fmu_schema::Causality::Local
            )
    }

    fn is_real_input(var: &VariableInfo) -> bool {
        var.var_type == VarType::Real && var.causality == fmu_schema::Causality::Input
    }

    /// Replace the active outputs with the named variables. The single literal `"all"` selects
    /// every declared output. Names that are not real-typed outputs are dropped with a warning.
    pub fn set_output_variables(&mut self, names: &[impl AsRef<str>]) {
        if names.len() == 1 && names[0].as_ref() == "all" {
            self.set_default_outputs();
            return;
        }
        self.active_outputs.clear();
        self.active_output_indices.clear();
        for name in names {
            if !self.add_output_variable(name.as_ref()) {
                log::warn!(
                    "{}: output variable {} is not a real-valued output, skipped",
                    self.name,
                    name.as_ref()
                );
            }
        }
    }

    pub fn set_output_variables_by_index(&mut self, indices: &[usize]) {
        self.active_outputs.clear();
        self.active_output_indices.clear();
        for index in indices {
            if !self.add_output_variable_by_index(*index) {
                log::warn!(
                    "{}: variable index {} is not a real-valued output, skipped",
                    self.name,
                    index
                );
            }
        }
    }

    /// Replace the active inputs with the named variables. The single literal `"all"` selects
    /// every declared input. Names that are not real-typed inputs are dropped with a warning.
    pub fn set_input_variables(&mut self, names: &[impl AsRef<str>]) {
        if names.len() == 1 && names[0].as_ref() == "all" {
            self.set_default_inputs();
            return;
        }
        self.active_inputs.clear();
        self.active_input_indices.clear();
        for name in names {
            if !self.add_input_variable(name.as_ref()) {
                log::warn!(
                    "{}: input variable {} is not a real-valued input, skipped",
                    self.name,
                    name.as_ref()
                );
            }
        }
    }

    pub fn set_input_variables_by_index(&mut self, indices: &[usize]) {
        self.active_inputs.clear();
        self.active_input_indices.clear();
        for index in indices {
            if !self.add_input_variable_by_index(*index) {
                log::warn!(
                    "{}: variable index {} is not a real-valued input, skipped",
                    self.name,
                    index
                );
            }
        }
    }

    pub fn add_output_variable(&mut self, name: &str) -> bool {
        match self.catalog.variable_by_name(name) {
            Some(var) if Self::is_real_output(var) => {
                self.active_outputs.push(var.value_ref);
                self.active_output_indices.push(var.index);
                true
            }
            _ => false,
        }
    }

    pub fn add_output_variable_by_index(&mut self, index: usize) -> bool {
        match self.catalog.variable_by_index(index) {
            Some(var) if Self::is_real_output(var) => {
                self.active_outputs.push(var.value_ref);
                self.active_output_indices.push(var.index);
                true
            }
            _ => false,
        }
    }

    pub fn add_input_variable(&mut self, name: &str) -> bool {
        match self.catalog.variable_by_name(name) {
            Some(var) if Self::is_real_input(var) => {
                self.active_inputs.push(var.value_ref);
                self.active_input_indices.push(var.index);
                true
            }
            _ => false,
        }
    }

    pub fn add_input_variable_by_index(&mut self, index: usize) -> bool {
        match self.catalog.variable_by_index(index) {
            Some(var) if Self::is_real_input(var) => {
                self.active_inputs.push(var.value_ref);
                self.active_input_indices.push(var.index);
                true
            }
            _ => false,
        }
    }

    /// Set the active inputs to all declared inputs.
    pub fn set_default_inputs(&mut self) {
        self.active_inputs.clear();
        self.active_input_indices.clear();
        let indices: Vec<usize> = self.catalog.variable_indices("input").to_vec();
        for index in indices {
            self.add_input_variable_by_index(index);
        }
    }

    /// Set the active outputs to all declared outputs.
    pub fn set_default_outputs(&mut self) {
        self.active_outputs.clear();
        self.active_output_indices.clear();
        let indices: Vec<usize> = self.catalog.variable_indices("output").to_vec();
        for index in indices {
            self.add_output_variable_by_index(index);
        }
    }

    /// Names of the active outputs, or of all declared outputs if none are configured yet.
    pub fn output_names(&self) -> Vec<String> {
        if self.active_output_indices.is_empty() {
            self.catalog.variable_names("output")
        } else {
            self.active_output_indices
                .iter()
                .map(|index| self.catalog.variables()[*index].name.clone())
                .collect()
        }
    }

    /// Names of the active inputs, or of all declared inputs if none are configured yet.
    pub fn input_names(&self) -> Vec<String> {
        if self.active_input_indices.is_empty() {
            self.catalog.variable_names("input")
        } else {
            self.active_input_indices
                .iter()
                .map(|index| self.catalog.variables()[*index].name.clone())
                .collect()
        }
    }

    /// Whether `name` is a settable parameter or input of (by default) numeric type.
    pub fn is_parameter(&self, name: &str) -> bool {
        match self.catalog.variable_by_name(name) {
            Some(var) => {
                matches!(
                    var.causality,
                    fmu_schema::Causality::Parameter | fmu_schema::Causality::Input
                ) && var.var_type != VarType::String
            }
            None => false,
        }
    }

    /// Toggle a named instance flag. Unrecognized names are tried as boolean FMU variables.
    /// Returns true if anything accepted the flag.
    pub fn set_flag(&mut self, name: &str, value: bool) -> bool {
        match name {
            "exception_on_discard" | "exceptionOnDiscard" => {
                self.exception_on_discard = value;
                true
            }
            "exception_on_warning" | "exceptionOnWarning" => {
                self.exception_on_warning = value;
                true
            }
            _ => match self.catalog.variable_by_name(name).cloned() {
                Some(var) if var.var_type == VarType::Boolean => self
                    .set_numeric_var(&var, if value { 1.0 } else { 0.0 })
                    .is_ok(),
                _ => false,
            },
        }
    }

    pub fn exception_on_discard(&self) -> bool {
        self.exception_on_discard
    }

    pub fn exception_on_warning(&self) -> bool {
        self.exception_on_warning
    }

    // ------------------------------------------------------------------
    // State snapshot / serialization
    // ------------------------------------------------------------------

    pub fn get_fmu_state(&mut self) -> Result<FmuState, Fmi2Error> {
        let mut state = std::ptr::null_mut();
        let ret = unsafe { (self.common.get_fmu_state)(self.component, &mut state) };
        self.handle_status(ret)?;
        if state.is_null() {
            log::error!("{}: FMU returned a null state", self.name);
            return Err(Fmi2Error::Fatal);
        }
        self.saved_states.push(state);
        Ok(FmuState(self.saved_states.len() - 1))
    }

    pub fn set_fmu_state(&mut self, state: &FmuState) -> Result<(), Fmi2Error> {
        let state = self.saved_states[state.0];
        let ret = unsafe { (self.common.set_fmu_state)(self.component, state) };
        self.handle_status(ret).map(|_| ())
    }

    pub fn serialize_fmu_state(&mut self, state: &FmuState) -> Result<Vec<u8>, Fmi2Error> {
        let state = self.saved_states[state.0];
        let mut size = 0usize;
        let ret = unsafe {
            (self.common.serialized_fmu_state_size)(self.component, state, &mut size)
        };
        self.handle_status(ret)?;

        let mut buffer: Vec<u8> = vec![0; size];
        let ret = unsafe {
            (self.common.serialize_fmu_state)(self.component, state, buffer.as_mut_ptr() as _, size)
        };
        self.handle_status(ret)?;
        Ok(buffer)
    }

    pub fn deserialize_fmu_state(&mut self, buffer: &[u8]) -> Result<FmuState, Fmi2Error> {
        let mut state = std::ptr::null_mut();
        let ret = unsafe {
            (self.common.deserialize_fmu_state)(
                self.component,
                buffer.as_ptr() as _,
                buffer.len(),
                &mut state,
            )
        };
        self.handle_status(ret)?;
        if state.is_null() {
            log::error!("{}: FMU returned a null state", self.name);
            return Err(Fmi2Error::Fatal);
        }
        self.saved_states.push(state);
        Ok(FmuState(self.saved_states.len() - 1))
    }

    pub fn get_directional_derivative(
        &self,
        unknown_refs: &[binding::fmi2ValueReference],
        known_refs: &[binding::fmi2ValueReference],
        dv_known: &[f64],
        dv_unknown: &mut [f64],
    ) -> Result<(), Fmi2Error> {
        assert_eq!(unknown_refs.len(), dv_unknown.len());
        assert_eq!(known_refs.len(), dv_known.len());
        let ret = unsafe {
            (self.common.get_directional_derivative)(
                self.component,
                unknown_refs.as_ptr(),
                unknown_refs.len(),
                known_refs.as_ptr(),
                known_refs.len(),
                dv_known.as_ptr(),
                dv_unknown.as_mut_ptr(),
            )
        };
        self.handle_status(ret).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::PlanStep::*;
    use super::*;

    #[test]
    fn test_cs_mode_coercion() {
        // Continuous-time and event requests collapse to step mode for co-simulation
        for requested in [FmuMode::ContinuousTime, FmuMode::Event] {
            let (target, steps) = transition_plan(
                FmuMode::Instantiated,
                requested,
                FmuKind::CoSimulation,
                false,
            )
            .unwrap();
            assert_eq!(target, FmuMode::Step);
            assert_eq!(
                steps,
                vec![PopulateDefaultIo, EnterInitialization, ExitInitialization]
            );
        }
    }

    #[test]
    fn test_common_transitions() {
        let (target, steps) = transition_plan(
            FmuMode::Instantiated,
            FmuMode::Initialization,
            FmuKind::CoSimulation,
            false,
        )
        .unwrap();
        assert_eq!(target, FmuMode::Initialization);
        assert_eq!(steps, vec![PopulateDefaultIo, EnterInitialization]);

        let (target, steps) = transition_plan(
            FmuMode::Initialization,
            FmuMode::Step,
            FmuKind::CoSimulation,
            false,
        )
        .unwrap();
        assert_eq!(target, FmuMode::Step);
        assert_eq!(steps, vec![ExitInitialization]);
    }

    #[test]
    fn test_same_mode_is_noop() {
        for mode in [
            FmuMode::Instantiated,
            FmuMode::Initialization,
            FmuMode::Step,
            FmuMode::Terminated,
        ] {
            let (target, steps) =
                transition_plan(mode, mode, FmuKind::CoSimulation, false).unwrap();
            assert_eq!(target, mode);
            assert!(steps.is_empty());
        }
    }

    #[test]
    fn test_terminate_paths() {
        let (target, steps) = transition_plan(
            FmuMode::Instantiated,
            FmuMode::Terminated,
            FmuKind::CoSimulation,
            false,
        )
        .unwrap();
        assert_eq!(target, FmuMode::Terminated);
        assert_eq!(
            steps,
            vec![EnterInitialization, ExitInitialization, Terminate]
        );

        let (target, steps) = transition_plan(
            FmuMode::Step,
            FmuMode::Terminated,
            FmuKind::CoSimulation,
            false,
        )
        .unwrap();
        assert_eq!(target, FmuMode::Terminated);
        assert_eq!(steps, vec![Terminate]);

        // terminated from error is a no-op
        let (target, steps) = transition_plan(
            FmuMode::Error,
            FmuMode::Terminated,
            FmuKind::CoSimulation,
            false,
        )
        .unwrap();
        assert_eq!(target, FmuMode::Error);
        assert!(steps.is_empty());
    }

    #[test]
    fn test_error_always_raises() {
        assert_eq!(
            transition_plan(FmuMode::Step, FmuMode::Error, FmuKind::CoSimulation, false),
            Err(Fmi2Error::Error)
        );
    }

    #[test]
    fn test_me_continuous_time_entry() {
        // With states: go through event mode, then enter continuous time
        let (target, steps) = transition_plan(
            FmuMode::Instantiated,
            FmuMode::ContinuousTime,
            FmuKind::ModelExchange,
            true,
        )
        .unwrap();
        assert_eq!(target, FmuMode::ContinuousTime);
        assert_eq!(
            steps,
            vec![
                PopulateDefaultIo,
                EnterInitialization,
                ExitInitialization,
                EnterContinuousTimeMode
            ]
        );

        // Stateless FMUs succeed without the ABI call
        let (target, steps) = transition_plan(
            FmuMode::Event,
            FmuMode::ContinuousTime,
            FmuKind::ModelExchange,
            false,
        )
        .unwrap();
        assert_eq!(target, FmuMode::ContinuousTime);
        assert!(steps.is_empty());
    }

    #[test]
    fn test_me_event_transitions() {
        let (_, steps) = transition_plan(
            FmuMode::ContinuousTime,
            FmuMode::Event,
            FmuKind::ModelExchange,
            true,
        )
        .unwrap();
        assert_eq!(steps, vec![EnterEventMode]);

        // event → event re-enters event mode rather than being a no-op
        let (_, steps) =
            transition_plan(FmuMode::Event, FmuMode::Event, FmuKind::ModelExchange, true).unwrap();
        assert_eq!(steps, vec![EnterEventMode]);
    }

    #[test]
    fn test_illegal_transitions() {
        // continuous-time from a CS instance start state has been coerced to step, but a request
        // from step backwards into initialization is illegal
        assert!(transition_plan(
            FmuMode::Step,
            FmuMode::Initialization,
            FmuKind::CoSimulation,
            false
        )
        .is_err());
        assert!(transition_plan(
            FmuMode::Terminated,
            FmuMode::Step,
            FmuKind::CoSimulation,
            false
        )
        .is_err());
    }
}
