//! Process-wide cache of loaded FMU libraries.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use crate::instance::{CoSimInstance, ModelExchangeInstance};
use crate::library::FmuLibrary;
use crate::Error;

#[derive(Default)]
struct ManagerState {
    /// Canonical path → loaded library
    libraries: HashMap<PathBuf, Arc<Mutex<FmuLibrary>>>,
    /// Shortcut name → canonical path
    shortcuts: HashMap<String, PathBuf>,
}

/// Singleton keying loaded FMU libraries by resolved path, with an auxiliary shortcut-name map.
/// All operations go through a single mutex; the manager never evicts.
pub struct LibraryManager {
    state: Mutex<ManagerState>,
}

impl LibraryManager {
    /// The process-wide manager instance.
    pub fn instance() -> &'static LibraryManager {
        static INSTANCE: OnceLock<LibraryManager> = OnceLock::new();
        INSTANCE.get_or_init(|| LibraryManager {
            state: Mutex::new(ManagerState::default()),
        })
    }

    fn resolve(state: &ManagerState, key: &str) -> PathBuf {
        match state.shortcuts.get(key) {
            Some(path) => path.clone(),
            None => PathBuf::from(key),
        }
    }

    /// Return the cached library for `lib_file`, loading it on first use. `lib_file` may be a
    /// path or a previously registered shortcut name.
    pub fn get_library(&self, lib_file: &str) -> Result<Arc<Mutex<FmuLibrary>>, Error> {
        let mut state = self.state.lock().expect("library manager poisoned");
        let path = Self::resolve(&state, lib_file);
        let canonical = path.canonicalize().unwrap_or(path);
        if let Some(library) = state.libraries.get(&canonical) {
            return Ok(Arc::clone(library));
        }
        let library = Arc::new(Mutex::new(FmuLibrary::load(&canonical, None)?));
        state.libraries.insert(canonical, Arc::clone(&library));
        Ok(library)
    }

    /// Register a shortcut name for an FMU location.
    pub fn add_shortcut(&self, name: &str, fmu_location: impl AsRef<Path>) {
        let mut state = self.state.lock().expect("library manager poisoned");
        state
            .shortcuts
            .insert(name.to_owned(), fmu_location.as_ref().to_path_buf());
    }

    /// Create a co-simulation instance from the library identified by `identifier`.
    pub fn create_co_simulation_object(
        &self,
        identifier: &str,
        object_name: &str,
    ) -> Result<CoSimInstance, Error> {
        let library = self.get_library(identifier)?;
        let mut library = library.lock().expect("library poisoned");
        library.create_co_simulation(object_name)
    }

    /// Create a model-exchange instance from the library identified by `identifier`.
    pub fn create_model_exchange_object(
        &self,
        identifier: &str,
        object_name: &str,
    ) -> Result<ModelExchangeInstance, Error> {
        let library = self.get_library(identifier)?;
        let mut library = library.lock().expect("library poisoned");
        library.create_model_exchange(object_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortcut_resolution_and_caching() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("modelDescription.xml"),
            r##"<fmiModelDescription fmiVersion="2.0" modelName="cached" guid="{c}">
  <CoSimulation modelIdentifier="cached"/>
  <ModelVariables/>
  <ModelStructure/>
</fmiModelDescription>"##,
        )
        .unwrap();

        let manager = LibraryManager::instance();
        manager.add_shortcut("cached-model", dir.path());

        let first = manager.get_library("cached-model").unwrap();
        let second = manager.get_library("cached-model").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.lock().unwrap().name(), "cached");

        // the same library is found under its direct path as well
        let by_path = manager
            .get_library(dir.path().to_str().unwrap())
            .unwrap();
        assert!(Arc::ptr_eq(&first, &by_path));
    }

    #[test]
    fn test_unknown_library_fails() {
        let manager = LibraryManager::instance();
        assert!(manager.get_library("/definitely/not/here.fmu").is_err());
    }
}
