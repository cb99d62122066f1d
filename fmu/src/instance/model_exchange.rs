//! Model-exchange instance: event handling and continuous-state access.
//!
//! The solver/integration loop itself is not part of this crate; these operations are the raw
//! material an external integrator drives.

use std::sync::Arc;

use fmu_sys::fmi2 as binding;

use crate::catalog::CountKind;
use crate::functions::ModelExchangeFunctions;
use crate::status::Fmi2Error;
use crate::FmuKind;

use super::{transition_plan, FmuMode, FmuObject, PlanStep};

/// Result of an event update, mirrored from the ABI's event-info struct.
#[derive(Debug, Default, Clone, Copy)]
pub struct EventInfo {
    pub new_discrete_states_needed: bool,
    pub terminate_simulation: bool,
    pub nominals_of_continuous_states_changed: bool,
    pub values_of_continuous_states_changed: bool,
    pub next_event_time: Option<f64>,
}

/// A single model-exchange FMU instance.
pub struct ModelExchangeInstance {
    obj: FmuObject,
    me: Arc<ModelExchangeFunctions>,
    num_states: usize,
    num_indicators: usize,
}

impl ModelExchangeInstance {
    pub(crate) fn new(obj: FmuObject, me: Arc<ModelExchangeFunctions>) -> Self {
        let num_states = obj.catalog().count(CountKind::States);
        let num_indicators = obj.catalog().count(CountKind::Events);
        Self {
            obj,
            me,
            num_states,
            num_indicators,
        }
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    pub fn num_indicators(&self) -> usize {
        self.num_indicators
    }

    /// Request a mode transition, with the model-exchange shortcuts: entering continuous time
    /// routes through event mode, and the `EnterContinuousTimeMode` call is skipped for
    /// stateless FMUs.
    pub fn set_mode(&mut self, mode: FmuMode) -> Result<(), Fmi2Error> {
        let plan = transition_plan(
            self.obj.current_mode(),
            mode,
            FmuKind::ModelExchange,
            self.num_states > 0,
        );
        match plan {
            Ok((target, steps)) => {
                let me = Arc::clone(&self.me);
                self.obj.run_plan(target, &steps, |step, component| match step {
                    PlanStep::EnterEventMode => {
                        Some(unsafe { (me.enter_event_mode)(component) })
                    }
                    PlanStep::EnterContinuousTimeMode => {
                        Some(unsafe { (me.enter_continuous_time_mode)(component) })
                    }
                    _ => None,
                })
            }
            Err(err) => {
                if mode == FmuMode::Error {
                    self.obj.set_error_mode();
                }
                Err(err)
            }
        }
    }

    /// Update discrete states at the current super-dense time instant.
    pub fn new_discrete_states(&mut self) -> Result<EventInfo, Fmi2Error> {
        let mut raw = binding::fmi2EventInfo::default();
        let ret = unsafe { (self.me.new_discrete_states)(self.obj.component(), &mut raw) };
        self.obj.handle_status(ret)?;
        Ok(EventInfo {
            new_discrete_states_needed: raw.newDiscreteStatesNeeded != 0,
            terminate_simulation: raw.terminateSimulation != 0,
            nominals_of_continuous_states_changed: raw.nominalsOfContinuousStatesChanged != 0,
            values_of_continuous_states_changed: raw.valuesOfContinuousStatesChanged != 0,
            next_event_time: (raw.nextEventTimeDefined != 0).then_some(raw.nextEventTime),
        })
    }

    /// Signal a completed integrator step.
    ///
    /// Returns `(enter_event_mode, terminate_simulation)`.
    pub fn completed_integrator_step(
        &mut self,
        no_set_fmu_state_prior_to_current_point: bool,
    ) -> Result<(bool, bool), Fmi2Error> {
        let mut enter_event_mode: binding::fmi2Boolean = 0;
        let mut terminate_simulation: binding::fmi2Boolean = 0;
        let ret = unsafe {
            (self.me.completed_integrator_step)(
                self.obj.component(),
                no_set_fmu_state_prior_to_current_point as binding::fmi2Boolean,
                &mut enter_event_mode,
                &mut terminate_simulation,
            )
        };
        self.obj.handle_status(ret)?;
        Ok((enter_event_mode != 0, terminate_simulation != 0))
    }

    /// Set the independent variable. Skipped for stateless FMUs, which carry no time variable.
    pub fn set_time(&mut self, time: f64) -> Result<(), Fmi2Error> {
        if self.num_states == 0 {
            return Ok(());
        }
        let ret = unsafe { (self.me.set_time)(self.obj.component(), time) };
        self.obj.handle_status(ret).map(|_| ())
    }

    pub fn set_states(&mut self, states: &[f64]) -> Result<(), Fmi2Error> {
        assert_eq!(states.len(), self.num_states);
        let ret = unsafe {
            (self.me.set_continuous_states)(self.obj.component(), states.as_ptr(), self.num_states)
        };
        self.obj.handle_status(ret).map(|_| ())
    }

    pub fn get_states(&self, states: &mut [f64]) -> Result<(), Fmi2Error> {
        assert_eq!(states.len(), self.num_states);
        let ret = unsafe {
            (self.me.get_continuous_states)(
                self.obj.component(),
                states.as_mut_ptr(),
                self.num_states,
            )
        };
        self.obj.handle_status(ret).map(|_| ())
    }

    pub fn get_derivatives(&self, derivatives: &mut [f64]) -> Result<(), Fmi2Error> {
        assert_eq!(derivatives.len(), self.num_states);
        let ret = unsafe {
            (self.me.get_derivatives)(
                self.obj.component(),
                derivatives.as_mut_ptr(),
                self.num_states,
            )
        };
        self.obj.handle_status(ret).map(|_| ())
    }

    pub fn get_event_indicators(&self, indicators: &mut [f64]) -> Result<(), Fmi2Error> {
        assert_eq!(indicators.len(), self.num_indicators);
        let ret = unsafe {
            (self.me.get_event_indicators)(
                self.obj.component(),
                indicators.as_mut_ptr(),
                self.num_indicators,
            )
        };
        self.obj.handle_status(ret).map(|_| ())
    }

    pub fn get_nominals_of_continuous_states(
        &self,
        nominals: &mut [f64],
    ) -> Result<(), Fmi2Error> {
        assert_eq!(nominals.len(), self.num_states);
        let ret = unsafe {
            (self.me.get_nominals_of_continuous_states)(
                self.obj.component(),
                nominals.as_mut_ptr(),
                self.num_states,
            )
        };
        self.obj.handle_status(ret).map(|_| ())
    }

    /// Names of the continuous-state variables.
    pub fn state_names(&self) -> Vec<String> {
        self.obj.catalog().variable_names("state")
    }
}

impl std::ops::Deref for ModelExchangeInstance {
    type Target = FmuObject;

    fn deref(&self) -> &Self::Target {
        &self.obj
    }
}

impl std::ops::DerefMut for ModelExchangeInstance {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.obj
    }
}

impl std::fmt::Debug for ModelExchangeInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "ModelExchangeInstance {{{:?}, states: {}, indicators: {}}}",
            self.obj, self.num_states, self.num_indicators
        )
    }
}
