//! Bridges one co-simulation FMU instance to bus publications and subscriptions and drives the
//! communication-step loop.

use std::io::Write;
use std::path::PathBuf;

use fmu::{CoSimInstance, FmuMode};
use fmu_bus::{
    FederateInfo, IterationRequest, IterationResult, Publication, Subscription, Time,
    TimeProperty, ValueFederate,
};

use crate::RunnerError;

const FALLBACK_STEP: f64 = 0.2;
const FALLBACK_STOP: f64 = 30.0;

/// One FMU instance exposed as a value federate: declared inputs become subscriptions, declared
/// outputs become double-valued publications, and the step loop shuttles values between the two
/// at every communication point.
pub struct CoSimFederate {
    fed: ValueFederate,
    cs: CoSimInstance,
    input_list: Vec<String>,
    output_list: Vec<String>,
    pubs: Vec<Publication>,
    inputs: Vec<Subscription>,
    step_time: Time,
    time_bias: Time,
    capture_file: Option<PathBuf>,
    capture: bool,
    configured: bool,
}

impl CoSimFederate {
    /// Wrap an already created co-simulation instance. An empty `name` falls back to the
    /// instance's own name.
    pub fn new(
        name: &str,
        mut cs: CoSimInstance,
        fed_info: &FederateInfo,
    ) -> Result<Self, RunnerError> {
        let name = if name.is_empty() { cs.name().to_owned() } else { name.to_owned() };
        let fed = ValueFederate::new(&name, fed_info)?;
        // Start from the real-valued declared I/O; the bus only carries doubles
        cs.set_default_inputs();
        cs.set_default_outputs();
        let input_list = cs.input_names();
        let output_list = cs.output_names();
        Ok(Self {
            fed,
            cs,
            input_list,
            output_list,
            pubs: Vec::new(),
            inputs: Vec::new(),
            step_time: Time::ZERO,
            time_bias: Time::ZERO,
            capture_file: None,
            capture: false,
            configured: false,
        })
    }

    pub fn name(&self) -> &str {
        self.fed.name()
    }

    /// Replace the set of subscribed input names.
    pub fn set_inputs(&mut self, input_names: Vec<String>) {
        self.input_list = input_names;
    }

    /// Replace the set of published output names.
    pub fn set_outputs(&mut self, output_names: Vec<String>) {
        self.output_list = output_names;
    }

    pub fn add_input(&mut self, input_name: &str) {
        self.input_list.push(input_name.to_owned());
    }

    pub fn add_output(&mut self, output_name: &str) {
        self.output_list.push(output_name.to_owned());
    }

    /// Enable or disable CSV output capture.
    pub fn set_output_capture(&mut self, capture: bool, file: Option<PathBuf>) {
        if file.is_some() {
            self.capture_file = file;
        }
        self.capture = capture;
    }

    /// Apply a textual parameter value through the instance's typed set.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), fmu::Fmi2Error> {
        self.cs.set_from_str(name, value)
    }

    /// Whether the underlying FMU declares `name` as a settable parameter or input.
    pub fn knows_parameter(&self, name: &str) -> bool {
        self.cs.catalog().variable_by_name(name).is_some()
    }

    pub fn set_flag(&mut self, flag: &str, value: bool) -> bool {
        self.cs.set_flag(flag, value)
    }

    /// Register bus endpoints and settle the effective step size: the caller's argument wins,
    /// then the FMU's default-experiment step, then the bus period property, then 0.2 s. The
    /// effective step is written back to the bus as the period property.
    pub fn configure(&mut self, step: Time, start_time: Time) {
        self.time_bias = start_time;

        if !self.configured {
            // Keep the instance's active sets aligned with the registered endpoints; names that
            // are not real-valued or have the wrong causality drop out here with a warning, so
            // the endpoint lists are refreshed from what actually survived.
            self.cs.set_input_variables(&self.input_list);
            self.cs.set_output_variables(&self.output_list);
            if self.cs.input_size() > 0 {
                self.input_list = self.cs.input_names();
            }
            if self.cs.output_size() > 0 {
                self.output_list = self.cs.output_names();
            }

            let input_list = std::mem::take(&mut self.input_list);
            for input in &input_list {
                self.inputs.push(self.fed.register_subscription(input));
            }
            self.input_list = input_list;

            let output_list = std::mem::take(&mut self.output_list);
            for output in &output_list {
                self.pubs.push(self.fed.register_publication(output));
            }
            self.output_list = output_list;
            self.configured = true;
        }

        let mut step = step;
        if step <= Time::ZERO {
            step = Time::from_secs_f64(self.cs.catalog().default_experiment().step_size);
        }
        if step <= Time::ZERO {
            let bus_step = self.fed.get_time_property(TimeProperty::Period);
            step = if bus_step > Time::EPSILON {
                bus_step
            } else {
                Time::from_secs_f64(FALLBACK_STEP)
            };
        }
        self.fed.set_time_property(TimeProperty::Period, step);
        self.step_time = step;
    }

    pub fn step_time(&self) -> Time {
        self.step_time
    }

    /// Whether bus endpoints have been registered already.
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Run the co-simulation until `stop`: the caller's stop wins, then the FMU's
    /// default-experiment stop, then 30 s.
    pub fn run(&mut self, stop: Time) -> Result<(), RunnerError> {
        let mut stop = stop;
        if stop <= Time::ZERO {
            stop = Time::from_secs_f64(self.cs.catalog().default_experiment().stop_time);
        }
        if stop <= Time::ZERO {
            stop = Time::from_secs_f64(FALLBACK_STOP);
        }

        let mut capture = match (self.capture, &self.capture_file) {
            (true, Some(path)) => Some(std::io::BufWriter::new(std::fs::File::create(path)?)),
            _ => None,
        };

        self.fed.enter_initializing_mode()?;
        self.cs.setup_experiment(
            None,
            self.time_bias.as_secs_f64(),
            Some((self.time_bias + stop).as_secs_f64()),
        )?;
        self.cs.set_mode(FmuMode::Initialization)?;

        if let Some(file) = capture.as_mut() {
            write!(file, "time")?;
            for publication in &self.pubs {
                write!(file, ",{}", publication.name())?;
            }
            writeln!(file)?;
        }

        // Publish the FMU's current outputs and seed the subscription defaults with its current
        // inputs before the executing barrier.
        let mut outputs = vec![0.0; self.pubs.len()];
        let mut inputs = vec![0.0; self.inputs.len()];
        if !self.pubs.is_empty() {
            self.cs.get_outputs(&mut outputs)?;
            for (publication, value) in self.pubs.iter().zip(&outputs) {
                self.fed.publish(publication, *value);
            }
        }
        if !self.inputs.is_empty() {
            self.cs.get_current_inputs(&mut inputs)?;
            for (index, value) in inputs.iter().enumerate() {
                let sub = self.inputs[index];
                self.fed.set_default(&sub, *value);
            }
        }

        let result = self
            .fed
            .enter_executing_mode(IterationRequest::IterateIfNeeded)?;
        if result == IterationResult::Iterating {
            if !self.inputs.is_empty() {
                for (index, sub) in self.inputs.iter().enumerate() {
                    inputs[index] = self.fed.get_value(sub);
                }
                self.cs.set_inputs(&inputs)?;
            }
            self.fed.enter_executing_mode(IterationRequest::NoIterations)?;
        }
        self.cs.set_mode(FmuMode::Step)?;

        let mut current_time = Time::ZERO;
        while current_time + self.time_bias <= stop {
            self.cs.do_step(
                (current_time + self.time_bias).as_secs_f64(),
                self.step_time.as_secs_f64(),
                true,
            )?;
            current_time = self.fed.request_next_step();
            if !outputs.is_empty() {
                self.cs.get_outputs(&mut outputs)?;
                for (publication, value) in self.pubs.iter().zip(&outputs) {
                    self.fed.publish(publication, *value);
                }
            }
            if !inputs.is_empty() {
                for (index, sub) in self.inputs.iter().enumerate() {
                    inputs[index] = self.fed.get_value(sub);
                }
                self.cs.set_inputs(&inputs)?;
            }
            if let Some(file) = capture.as_mut() {
                write!(file, "{}", current_time.as_secs_f64())?;
                for value in &outputs {
                    write!(file, ",{}", value)?;
                }
                writeln!(file)?;
            }
        }
        self.fed.finalize();
        Ok(())
    }
}

impl std::fmt::Debug for CoSimFederate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoSimFederate")
            .field("name", &self.fed.name())
            .field("inputs", &self.input_list)
            .field("outputs", &self.output_list)
            .field("step", &self.step_time)
            .finish()
    }
}
