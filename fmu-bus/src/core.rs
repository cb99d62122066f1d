//! The core: value table, data links and the lock-step time barriers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock};
use std::time::Duration;

use crate::{broker, BusError};

/// Synchronization phases a federate passes through. Each phase is a generation-counted barrier
/// across the federates participating in that phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Initializing = 0,
    Executing = 1,
    Step = 2,
}

#[derive(Default)]
pub(crate) struct CoreShared {
    pub connected: bool,
    pub terminated: bool,
    /// Address of the broker this core attached to, if any
    broker: Option<String>,
    /// Last published value per publication key
    pub publications: HashMap<String, f64>,
    /// Data links: publication key → target input name
    pub links: Vec<(String, String)>,
    /// Federates created on this core
    pub registered: usize,
    pub finalized: usize,
    /// Federates that have entered executing mode and not finalized
    pub executing: usize,
    arrived: [usize; 3],
    generation: [u64; 3],
}

impl CoreShared {
    fn participants(&self, phase: Phase) -> usize {
        match phase {
            Phase::Initializing | Phase::Executing => self.registered - self.finalized,
            Phase::Step => self.executing,
        }
    }
}

pub(crate) struct CoreInner {
    name: String,
    shared: Mutex<CoreShared>,
    cond: Condvar,
}

impl CoreInner {
    fn new(name: String) -> Self {
        Self {
            name,
            shared: Mutex::new(CoreShared::default()),
            cond: Condvar::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lock(&self) -> MutexGuard<'_, CoreShared> {
        self.shared.lock().expect("core state poisoned")
    }

    pub fn notify_all(&self) {
        self.cond.notify_all();
    }

    /// Barrier across the phase's participants. The last arriver advances the generation and
    /// wakes everyone; termination wakes waiters with an error.
    pub fn barrier_wait(&self, phase: Phase) -> Result<(), BusError> {
        let index = phase as usize;
        let mut shared = self.lock();
        if shared.terminated {
            return Err(BusError::Terminated);
        }
        shared.arrived[index] += 1;
        if shared.arrived[index] >= shared.participants(phase) {
            shared.arrived[index] = 0;
            shared.generation[index] = shared.generation[index].wrapping_add(1);
            self.cond.notify_all();
            return Ok(());
        }
        let generation = shared.generation[index];
        while shared.generation[index] == generation && !shared.terminated {
            shared = self.cond.wait(shared).expect("core state poisoned");
        }
        if shared.generation[index] == generation && shared.terminated {
            return Err(BusError::Terminated);
        }
        Ok(())
    }

    /// Release any barrier that became complete because a participant dropped out.
    pub(crate) fn release_completed_barriers(shared: &mut CoreShared) {
        for phase in [Phase::Initializing, Phase::Executing, Phase::Step] {
            let index = phase as usize;
            if shared.arrived[index] > 0 && shared.arrived[index] >= shared.participants(phase) {
                shared.arrived[index] = 0;
                shared.generation[index] = shared.generation[index].wrapping_add(1);
            }
        }
    }

    pub fn force_terminate(&self) {
        let broker_addr = {
            let mut shared = self.lock();
            shared.terminated = true;
            shared.connected = false;
            shared.broker.take()
        };
        self.notify_all();
        if let Some(addr) = broker_addr {
            broker::detach_core(&addr, &self.name);
        }
    }

    /// Called when a federate finalizes; flips to disconnected once the last one is gone.
    pub fn federate_finalized(&self, was_executing: bool) {
        let broker_addr = {
            let mut shared = self.lock();
            shared.finalized += 1;
            if was_executing {
                shared.executing = shared.executing.saturating_sub(1);
            }
            Self::release_completed_barriers(&mut shared);
            if shared.registered > 0 && shared.finalized >= shared.registered {
                shared.connected = false;
                shared.broker.take()
            } else {
                None
            }
        };
        self.notify_all();
        if let Some(addr) = broker_addr {
            broker::detach_core(&addr, &self.name);
        }
    }
}

fn registry() -> &'static Mutex<HashMap<String, Arc<CoreInner>>> {
    static CORES: OnceLock<Mutex<HashMap<String, Arc<CoreInner>>>> = OnceLock::new();
    CORES.get_or_init(Default::default)
}

pub(crate) fn find_core(name: &str) -> Option<Arc<CoreInner>> {
    registry()
        .lock()
        .expect("core registry poisoned")
        .get(name)
        .cloned()
}

/// Handle on a core. Clones share the same underlying core.
#[derive(Clone)]
pub struct CoreApp {
    inner: Arc<CoreInner>,
}

impl CoreApp {
    /// Create a core of the given type. The init string is scanned for `--name` and `--broker`
    /// options; anything else is accepted and ignored by the in-process transport.
    pub fn new(core_type: &str, init_string: &str) -> Result<Self, BusError> {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);

        let mut name = None;
        let mut broker_addr = None;
        let mut tokens = init_string.split_whitespace().peekable();
        while let Some(token) = tokens.next() {
            let (key, inline) = match token.split_once('=') {
                Some((key, value)) => (key, Some(value.to_owned())),
                None => (token, None),
            };
            match key {
                "--name" | "-n" => {
                    name = inline.or_else(|| tokens.next().map(str::to_owned));
                }
                "--broker" | "-b" => {
                    broker_addr = inline.or_else(|| tokens.next().map(str::to_owned));
                }
                _ => {}
            }
        }
        let name = name.unwrap_or_else(|| {
            format!("fmucore-{}", COUNTER.fetch_add(1, Ordering::Relaxed))
        });

        log::debug!("creating {core_type} core {name}");
        let inner = Arc::new(CoreInner::new(name.clone()));
        {
            let mut shared = inner.lock();
            shared.broker = broker_addr;
        }
        registry()
            .lock()
            .expect("core registry poisoned")
            .insert(name, Arc::clone(&inner));
        Ok(Self { inner })
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().connected
    }

    /// Attach to the broker (when one was named) and open for federates.
    pub fn connect(&self) -> bool {
        let broker_addr = {
            let mut shared = self.inner.lock();
            if shared.terminated {
                return false;
            }
            shared.connected = true;
            shared.broker.clone()
        };
        if let Some(addr) = broker_addr {
            if !broker::attach_core(&addr, self.inner.name()) {
                self.inner.lock().connected = false;
                return false;
            }
        }
        true
    }

    pub fn identifier(&self) -> String {
        self.inner.name().to_owned()
    }

    /// Wire a publication to a named input across the federation.
    pub fn data_link(&self, source: &str, target: &str) {
        log::debug!("data link {source} -> {target}");
        let mut shared = self.inner.lock();
        shared
            .links
            .push((source.to_owned(), target.to_owned()));
    }

    /// Route a log message through the core's sink.
    pub fn log_message(&self, level: log::Level, message: &str) {
        log::log!(target: "bus", level, "[{}] {}", self.inner.name(), message);
    }

    pub fn force_terminate(&self) {
        self.inner.force_terminate();
    }

    /// Block until the core disconnects (all federates finalized or terminated), up to an
    /// optional deadline. Returns whether it disconnected.
    pub fn wait_for_disconnect(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| std::time::Instant::now() + t);
        let mut shared = self.inner.lock();
        loop {
            if !shared.connected || shared.terminated {
                return true;
            }
            match deadline {
                Some(deadline) => {
                    let now = std::time::Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    let (guard, _) = self
                        .inner
                        .cond
                        .wait_timeout(shared, deadline - now)
                        .expect("core state poisoned");
                    shared = guard;
                }
                None => {
                    shared = self.inner.cond.wait(shared).expect("core state poisoned");
                }
            }
        }
    }

    pub(crate) fn inner(&self) -> &Arc<CoreInner> {
        &self.inner
    }
}

impl std::fmt::Debug for CoreApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreApp")
            .field("name", &self.inner.name())
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_registry_and_links() {
        let core = CoreApp::new("inproc", "--name linkcore").unwrap();
        assert!(core.connect());
        assert!(core.is_connected());
        assert_eq!(core.identifier(), "linkcore");
        assert!(find_core("linkcore").is_some());

        core.data_link("a", "b");
        assert_eq!(core.inner().lock().links, vec![("a".into(), "b".into())]);

        core.force_terminate();
        assert!(!core.is_connected());
        assert!(core.wait_for_disconnect(Some(Duration::from_millis(10))));
    }

    #[test]
    fn test_init_string_parsing() {
        let core = CoreApp::new("inproc", "--name=eqcore --broker=inproc://nowhere").unwrap();
        assert_eq!(core.identifier(), "eqcore");
        // the named broker does not exist, so connect fails
        assert!(!core.connect());
    }
}
