//! The broker: tracks attached cores and mediates federation-wide termination.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, OnceLock};
use std::time::Duration;

use crate::{core, BusError};

const ADDRESS_SCHEME: &str = "inproc://";

struct BrokerShared {
    connected: bool,
    terminated: bool,
    cores: HashSet<String>,
}

struct BrokerInner {
    name: String,
    shared: Mutex<BrokerShared>,
    cond: Condvar,
}

fn registry() -> &'static Mutex<HashMap<String, Arc<BrokerInner>>> {
    static BROKERS: OnceLock<Mutex<HashMap<String, Arc<BrokerInner>>>> = OnceLock::new();
    BROKERS.get_or_init(Default::default)
}

fn find_broker(address: &str) -> Option<Arc<BrokerInner>> {
    let name = address.strip_prefix(ADDRESS_SCHEME).unwrap_or(address);
    registry()
        .lock()
        .expect("broker registry poisoned")
        .get(name)
        .cloned()
}

/// Record a core at the broker behind `address`. Fails when there is no such broker or it has
/// terminated.
pub(crate) fn attach_core(address: &str, core_name: &str) -> bool {
    match find_broker(address) {
        Some(broker) => {
            let mut shared = broker.shared.lock().expect("broker state poisoned");
            if shared.terminated {
                return false;
            }
            shared.cores.insert(core_name.to_owned());
            true
        }
        None => false,
    }
}

/// Remove a core from the broker behind `address`, waking disconnect waiters.
pub(crate) fn detach_core(address: &str, core_name: &str) {
    if let Some(broker) = find_broker(address) {
        let mut shared = broker.shared.lock().expect("broker state poisoned");
        shared.cores.remove(core_name);
        drop(shared);
        broker.cond.notify_all();
    }
}

/// Handle on a broker. Clones share the same underlying broker.
#[derive(Clone)]
pub struct BrokerApp {
    inner: Arc<BrokerInner>,
}

impl BrokerApp {
    /// Start a broker of the given type. The init string is scanned for a `--name` option.
    pub fn new(core_type: &str, init_args: &str) -> Result<Self, BusError> {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);

        let mut name = None;
        let mut tokens = init_args.split_whitespace().peekable();
        while let Some(token) = tokens.next() {
            let (key, inline) = match token.split_once('=') {
                Some((key, value)) => (key, Some(value.to_owned())),
                None => (token, None),
            };
            if key == "--name" || key == "-n" {
                name = inline.or_else(|| tokens.next().map(str::to_owned));
            }
        }
        let name = name.unwrap_or_else(|| {
            format!("fmubroker-{}", COUNTER.fetch_add(1, Ordering::Relaxed))
        });

        log::debug!("starting {core_type} broker {name} with args \"{init_args}\"");
        let inner = Arc::new(BrokerInner {
            name: name.clone(),
            shared: Mutex::new(BrokerShared {
                connected: false,
                terminated: false,
                cores: HashSet::new(),
            }),
            cond: Condvar::new(),
        });
        registry()
            .lock()
            .expect("broker registry poisoned")
            .insert(name, Arc::clone(&inner));
        Ok(Self { inner })
    }

    pub fn is_connected(&self) -> bool {
        let shared = self.inner.shared.lock().expect("broker state poisoned");
        shared.connected && !shared.terminated
    }

    pub fn connect(&self) -> bool {
        let mut shared = self.inner.shared.lock().expect("broker state poisoned");
        if shared.terminated {
            return false;
        }
        shared.connected = true;
        true
    }

    /// Address cores use to attach to this broker.
    pub fn address(&self) -> String {
        format!("{ADDRESS_SCHEME}{}", self.inner.name)
    }

    /// Send a command string to a broker-side object. The in-process broker only logs it.
    pub fn send_command(&self, target: &str, command: &str) {
        log::info!(target: "bus", "[{}] command to {target}: {command}", self.inner.name);
    }

    /// Block until every attached core has disconnected, up to an optional deadline. Returns
    /// whether the broker is fully disconnected.
    pub fn wait_for_disconnect(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| std::time::Instant::now() + t);
        let mut shared = self.inner.shared.lock().expect("broker state poisoned");
        loop {
            if shared.terminated || shared.cores.is_empty() {
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
                        .expect("broker state poisoned");
                    shared = guard;
                }
                None => {
                    shared = self
                        .inner
                        .cond
                        .wait(shared)
                        .expect("broker state poisoned");
                }
            }
        }
    }

    /// Terminate the broker and every core attached to it.
    pub fn force_terminate(&self) {
        let cores: Vec<String> = {
            let mut shared = self.inner.shared.lock().expect("broker state poisoned");
            shared.terminated = true;
            shared.connected = false;
            shared.cores.drain().collect()
        };
        self.inner.cond.notify_all();
        for core_name in cores {
            if let Some(core) = core::find_core(&core_name) {
                core.force_terminate();
            }
        }
    }
}

impl std::fmt::Debug for BrokerApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerApp")
            .field("name", &self.inner.name)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broker_lifecycle() {
        let broker = BrokerApp::new("inproc", "--name lifecycle-broker").unwrap();
        assert!(!broker.is_connected());
        assert!(broker.connect());
        assert!(broker.is_connected());
        assert_eq!(broker.address(), "inproc://lifecycle-broker");

        // no cores attached yet, so the broker counts as disconnected
        assert!(broker.wait_for_disconnect(Some(Duration::from_millis(1))));

        assert!(attach_core(&broker.address(), "some-core"));
        assert!(!broker.wait_for_disconnect(Some(Duration::from_millis(1))));
        detach_core(&broker.address(), "some-core");
        assert!(broker.wait_for_disconnect(Some(Duration::from_millis(10))));

        broker.force_terminate();
        assert!(!broker.is_connected());
        assert!(!broker.connect());
    }
}
