//! Value federates: publications, subscriptions and time grants.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{find_core, CoreInner, Phase};
use crate::info::FederateInfo;
use crate::time::{Time, TimeProperty};
use crate::BusError;

/// Iteration request when entering executing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IterationRequest {
    #[default]
    NoIterations,
    IterateIfNeeded,
    ForceIteration,
}

/// Outcome of entering executing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationResult {
    NextStep,
    Iterating,
    Halted,
}

/// Handle to a registered publication.
#[derive(Debug, Clone)]
pub struct Publication {
    /// Federate-qualified key, e.g. `fed.output`
    qualified: String,
    /// Plain key as registered
    plain: Option<String>,
    name: String,
}

impl Publication {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Handle to a registered subscription (an input targeting a publication by name).
#[derive(Debug, Clone, Copy)]
pub struct Subscription(usize);

#[derive(Debug, Clone)]
struct SubState {
    /// Federate-qualified input name, the target of data links
    qualified: String,
    /// Publication name this input subscribes to
    target: String,
    default_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FedState {
    Created,
    Initializing,
    Executing,
    Finalized,
}

/// A federate publishing and subscribing double-valued channels, advancing in lock step with the
/// other federates on its core.
pub struct ValueFederate {
    name: String,
    separator: char,
    core: Arc<CoreInner>,
    subs: Vec<SubState>,
    state: FedState,
    granted: Time,
    properties: HashMap<TimeProperty, Time>,
}

impl ValueFederate {
    /// Create a federate attached to the core named in `info`.
    pub fn new(name: &str, info: &FederateInfo) -> Result<Self, BusError> {
        let core_name = info.core_name.clone();
        let core = find_core(&core_name).ok_or(BusError::CoreNotFound(core_name))?;
        {
            let mut shared = core.lock();
            if shared.terminated {
                return Err(BusError::Terminated);
            }
            shared.registered += 1;
        }
        let mut properties = HashMap::new();
        if let Some(period) = info.period {
            properties.insert(TimeProperty::Period, period);
        }
        if let Some(stop) = info.stop_time {
            properties.insert(TimeProperty::StopTime, stop);
        }
        Ok(Self {
            name: name.to_owned(),
            separator: info.separator,
            core,
            subs: Vec::new(),
            state: FedState::Created,
            granted: Time::ZERO,
            properties,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_time_property(&mut self, property: TimeProperty, value: Time) {
        self.properties.insert(property, value);
    }

    pub fn get_time_property(&self, property: TimeProperty) -> Time {
        self.properties
            .get(&property)
            .copied()
            .unwrap_or(Time::ZERO)
    }

    fn qualified(&self, local: &str) -> String {
        format!("{}{}{}", self.name, self.separator, local)
    }

    /// Register a publication under the federate-qualified name; the plain local name is kept as
    /// an alias so same-named subscriptions match without explicit wiring.
    pub fn register_publication(&mut self, name: &str) -> Publication {
        Publication {
            qualified: self.qualified(name),
            plain: Some(name.to_owned()),
            name: name.to_owned(),
        }
    }

    /// Register a publication under exactly the given name, with no federate qualification.
    pub fn register_global_publication(&mut self, name: &str) -> Publication {
        Publication {
            qualified: name.to_owned(),
            plain: None,
            name: name.to_owned(),
        }
    }

    /// Register a subscription targeting the publication named `target`.
    pub fn register_subscription(&mut self, target: &str) -> Subscription {
        self.subs.push(SubState {
            qualified: self.qualified(target),
            target: target.to_owned(),
            default_value: 0.0,
        });
        Subscription(self.subs.len() - 1)
    }

    /// Value delivered when no publication has reached the subscription yet.
    pub fn set_default(&mut self, sub: &Subscription, value: f64) {
        self.subs[sub.0].default_value = value;
    }

    pub fn publish(&self, publication: &Publication, value: f64) {
        let mut shared = self.core.lock();
        shared
            .publications
            .insert(publication.qualified.clone(), value);
        if let Some(plain) = &publication.plain {
            shared.publications.insert(plain.clone(), value);
        }
    }

    /// Current value of a subscription: a data link targeting this input wins, then a publication
    /// matching the subscription target, then the default.
    pub fn get_value(&self, sub: &Subscription) -> f64 {
        let sub = &self.subs[sub.0];
        let shared = self.core.lock();
        for (from, to) in &shared.links {
            if *to == sub.qualified || *to == sub.target {
                if let Some(value) = shared.publications.get(from) {
                    return *value;
                }
            }
        }
        if let Some(value) = shared.publications.get(&sub.target) {
            return *value;
        }
        sub.default_value
    }

    /// Enter the federation-wide initializing barrier.
    pub fn enter_initializing_mode(&mut self) -> Result<(), BusError> {
        if self.state != FedState::Created {
            return Ok(());
        }
        self.core.barrier_wait(Phase::Initializing)?;
        self.state = FedState::Initializing;
        Ok(())
    }

    /// Enter the executing barrier. The in-process bus never requests an initialization
    /// iteration, so this always grants [`IterationResult::NextStep`].
    pub fn enter_executing_mode(
        &mut self,
        _iterate: IterationRequest,
    ) -> Result<IterationResult, BusError> {
        if self.state == FedState::Executing {
            return Ok(IterationResult::NextStep);
        }
        {
            let mut shared = self.core.lock();
            if shared.terminated {
                return Err(BusError::Terminated);
            }
            shared.executing += 1;
        }
        self.core.barrier_wait(Phase::Executing)?;
        self.state = FedState::Executing;
        Ok(IterationResult::NextStep)
    }

    /// Request the next time grant: blocks until every executing federate has requested, then
    /// advances this federate by its period. Returns [`Time::MAX`] once the bus terminated so
    /// step loops drain.
    pub fn request_next_step(&mut self) -> Time {
        let period = {
            let period = self.get_time_property(TimeProperty::Period);
            if period.is_zero() {
                Time::EPSILON
            } else {
                period
            }
        };
        match self.core.barrier_wait(Phase::Step) {
            Ok(()) => {
                self.granted += period;
                self.granted
            }
            Err(_) => Time::MAX,
        }
    }

    pub fn granted_time(&self) -> Time {
        self.granted
    }

    /// Leave the federation; wakes any federates blocked on this one.
    pub fn finalize(&mut self) {
        if self.state == FedState::Finalized {
            return;
        }
        let was_executing = self.state == FedState::Executing;
        self.state = FedState::Finalized;
        self.core.federate_finalized(was_executing);
    }
}

impl Drop for ValueFederate {
    fn drop(&mut self) {
        self.finalize();
    }
}

impl std::fmt::Debug for ValueFederate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueFederate")
            .field("name", &self.name)
            .field("granted", &self.granted)
            .field("subs", &self.subs.len())
            .finish()
    }
}
