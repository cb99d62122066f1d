//! Co-simulation instance: step loop operations and the step-pending bookkeeping.

use std::ffi::CStr;
use std::sync::{Arc, OnceLock};

use fmu_sys::fmi2 as binding;

use crate::functions::CoSimFunctions;
use crate::status::{Fmi2Error, Fmi2Res, Fmi2Status};
use crate::FmuKind;

use super::{transition_plan, FmuMode, FmuObject};

const MAX_DERIV_ORDER: usize = 10;
const MAX_IO: usize = 1000;

/// The input/output-derivative calls need an order array whose entries are all the same, so one
/// fixed block per order is built once for the whole process and shared read-only.
fn deriv_order_block(order: usize) -> &'static [binding::fmi2Integer] {
    static BLOCKS: OnceLock<Vec<[binding::fmi2Integer; MAX_IO]>> = OnceLock::new();
    let blocks = BLOCKS.get_or_init(|| {
        (0..=MAX_DERIV_ORDER)
            .map(|order| [order as binding::fmi2Integer; MAX_IO])
            .collect()
    });
    &blocks[order.min(MAX_DERIV_ORDER)]
}

/// A single co-simulation FMU instance.
pub struct CoSimInstance {
    obj: FmuObject,
    cs: Arc<CoSimFunctions>,
    step_pending: bool,
}

impl CoSimInstance {
    pub(crate) fn new(obj: FmuObject, cs: Arc<CoSimFunctions>) -> Self {
        Self {
            obj,
            cs,
            step_pending: false,
        }
    }

    /// Request a mode transition. Continuous-time and event requests are coerced to step mode;
    /// co-simulation instances have only the one running mode.
    pub fn set_mode(&mut self, mode: FmuMode) -> Result<(), Fmi2Error> {
        let plan = transition_plan(
            self.obj.current_mode(),
            mode,
            FmuKind::CoSimulation,
            false,
        );
        match plan {
            Ok((target, steps)) => self.obj.run_plan(target, &steps, |_, _| None),
            Err(err) => {
                if mode == FmuMode::Error {
                    self.obj.set_error_mode();
                }
                Err(err)
            }
        }
    }

    /// Push `order`-tagged input derivatives for the active input set.
    pub fn set_input_derivatives(&mut self, order: usize, didt: &[f64]) -> Result<(), Fmi2Error> {
        let inputs = self.obj.active_inputs();
        assert_eq!(inputs.len(), didt.len());
        let ret = unsafe {
            (self.cs.set_real_input_derivatives)(
                self.obj.component(),
                inputs.value_refs().as_ptr(),
                inputs.len(),
                deriv_order_block(order).as_ptr(),
                didt.as_ptr(),
            )
        };
        self.obj.handle_status(ret).map(|_| ())
    }

    /// Pull `order`-tagged output derivatives for the active output set.
    pub fn get_output_derivatives(&self, order: usize, dodt: &mut [f64]) -> Result<(), Fmi2Error> {
        let outputs = self.obj.active_outputs();
        assert_eq!(outputs.len(), dodt.len());
        let ret = unsafe {
            (self.cs.get_real_output_derivatives)(
                self.obj.component(),
                outputs.value_refs().as_ptr(),
                outputs.len(),
                deriv_order_block(order).as_ptr(),
                dodt.as_mut_ptr(),
            )
        };
        self.obj.handle_status(ret).map(|_| ())
    }

    /// Advance one communication step. A `Pending` return records the asynchronous step on the
    /// instance instead of raising.
    pub fn do_step(
        &mut self,
        current_communication_point: f64,
        communication_step_size: f64,
        no_set_fmu_state_prior_to_current_point: bool,
    ) -> Result<(), Fmi2Error> {
        let ret = unsafe {
            (self.cs.do_step)(
                self.obj.component(),
                current_communication_point,
                communication_step_size,
                no_set_fmu_state_prior_to_current_point as binding::fmi2Boolean,
            )
        };
        if ret == binding::fmi2Status_fmi2Pending {
            self.step_pending = true;
            return Ok(());
        }
        self.obj.handle_status(ret)?;
        self.step_pending = false;
        Ok(())
    }

    /// Cancel a pending asynchronous step.
    pub fn cancel_step(&mut self) -> Result<(), Fmi2Error> {
        let ret = unsafe { (self.cs.cancel_step)(self.obj.component()) };
        self.obj.handle_status(ret).map(|_| ())
    }

    /// End time of the last successfully completed communication step.
    pub fn last_step_time(&self) -> Result<f64, Fmi2Error> {
        let mut last_time = 0.0;
        let ret = unsafe {
            (self.cs.get_real_status)(
                self.obj.component(),
                binding::fmi2StatusKind_fmi2LastSuccessfulTime,
                &mut last_time,
            )
        };
        self.obj.handle_status(ret)?;
        Ok(last_time)
    }

    /// Whether the most recent do-step is still pending; refreshes the flag from the FMU.
    pub fn is_pending(&mut self) -> Result<bool, Fmi2Error> {
        if !self.step_pending {
            return Ok(false);
        }
        let mut status = binding::fmi2Status_fmi2OK;
        let ret = unsafe {
            (self.cs.get_status)(
                self.obj.component(),
                binding::fmi2StatusKind_fmi2DoStepStatus,
                &mut status,
            )
        };
        self.obj.handle_status(ret)?;
        if Fmi2Status(status).ok() == Ok(Fmi2Res::Pending) {
            return Ok(true);
        }
        self.step_pending = false;
        Ok(false)
    }

    /// Status string of a pending asynchronous step; empty when no step is pending.
    pub fn status(&self) -> Result<String, Fmi2Error> {
        if !self.step_pending {
            return Ok(String::new());
        }
        let mut ptr: binding::fmi2String = std::ptr::null();
        let ret = unsafe {
            (self.cs.get_string_status)(
                self.obj.component(),
                binding::fmi2StatusKind_fmi2PendingStatus,
                &mut ptr,
            )
        };
        self.obj.handle_status(ret)?;
        if ptr.is_null() {
            return Ok(String::new());
        }
        Ok(unsafe { CStr::from_ptr(ptr) }
            .to_string_lossy()
            .into_owned())
    }

    /// Whether the slave wants to terminate the simulation.
    pub fn terminated_by_slave(&self) -> Result<bool, Fmi2Error> {
        let mut value: binding::fmi2Boolean = 0;
        let ret = unsafe {
            (self.cs.get_boolean_status)(
                self.obj.component(),
                binding::fmi2StatusKind_fmi2Terminated,
                &mut value,
            )
        };
        self.obj.handle_status(ret)?;
        Ok(value != 0)
    }

    pub fn step_pending(&self) -> bool {
        self.step_pending
    }
}

impl std::ops::Deref for CoSimInstance {
    type Target = FmuObject;

    fn deref(&self) -> &Self::Target {
        &self.obj
    }
}

impl std::ops::DerefMut for CoSimInstance {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.obj
    }
}

impl std::fmt::Debug for CoSimInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "CoSimInstance {{{:?}, pending: {}}}", self.obj, self.step_pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deriv_order_block() {
        for order in 0..=MAX_DERIV_ORDER {
            let block = deriv_order_block(order);
            assert_eq!(block.len(), MAX_IO);
            assert!(block.iter().all(|v| *v == order as binding::fmi2Integer));
        }
        // out-of-range orders clamp to the last block
        assert_eq!(deriv_order_block(99)[0], MAX_DERIV_ORDER as binding::fmi2Integer);
    }
}
