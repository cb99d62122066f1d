//! FMU library: archive extraction, model-description parsing, shared-library loading and
//! instance creation.

use std::ffi::CString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fmu_sys::fmi2 as binding;
use libloading::Library;

use crate::catalog::{Capability, CountKind, VariableCatalog};
use crate::functions::{BaseFunctions, CommonFunctions, CoSimFunctions, ModelExchangeFunctions};
use crate::instance::{CoSimInstance, FmuObject, ModelExchangeInstance};
use crate::{Error, FmuKind};

const MODEL_DESCRIPTION: &str = "modelDescription.xml";

/// A loaded FMU: the extraction directory, the parsed catalog and (once needed) the bound
/// shared library. Shared by all instances created from it.
pub struct FmuLibrary {
    /// Path to the FMU archive; empty for pre-extracted directory inputs
    fmu_path: PathBuf,
    /// The extraction directory
    extract_dir: PathBuf,
    /// Absolute path of the resources directory handed to instances as a file URI
    resource_dir: PathBuf,
    catalog: Arc<VariableCatalog>,
    lib: Option<Arc<Library>>,
    base: Option<BaseFunctions>,
    common: Option<Arc<CommonFunctions>>,
    me: Option<Arc<ModelExchangeFunctions>>,
    cs: Option<Arc<CoSimFunctions>>,
    me_count: usize,
    cs_count: usize,
    /// Remove the extraction directory on drop
    delete_directory: bool,
    /// Set once this library actually extracted the archive (as opposed to reusing a directory)
    extracted: bool,
}

impl FmuLibrary {
    /// Load an FMU from `fmu_path`.
    ///
    /// If the path is a directory it is treated as a pre-extracted FMU. Otherwise the archive is
    /// extracted to `extract_path` when given; without one it is extracted alongside the archive
    /// using the archive stem as directory name, falling back to the system temp directory when
    /// the parent is not writable and the derived path does not exist yet.
    pub fn load(fmu_path: impl AsRef<Path>, extract_path: Option<&Path>) -> Result<Self, Error> {
        let fmu_path = fmu_path.as_ref();
        let (fmu_path, extract_dir) = if fmu_path.is_dir() {
            (PathBuf::new(), fmu_path.to_path_buf())
        } else {
            let extract_dir = match extract_path {
                Some(extract) => extract.to_path_buf(),
                None => Self::derive_extract_dir(fmu_path),
            };
            (fmu_path.to_path_buf(), extract_dir)
        };

        let mut library = Self {
            fmu_path,
            extract_dir,
            resource_dir: PathBuf::new(),
            catalog: Arc::new(VariableCatalog::default()),
            lib: None,
            base: None,
            common: None,
            me: None,
            cs: None,
            me_count: 0,
            cs_count: 0,
            delete_directory: false,
            extracted: false,
        };
        library.load_information()?;
        Ok(library)
    }

    fn derive_extract_dir(fmu_path: &Path) -> PathBuf {
        let stem = fmu_path.file_stem().unwrap_or_default();
        let parent = fmu_path.parent().unwrap_or_else(|| Path::new("."));
        let derived = parent.join(stem);
        let parent_writable = std::fs::metadata(parent)
            .map(|meta| !meta.permissions().readonly())
            .unwrap_or(false);
        if !parent_writable && !derived.exists() {
            return std::env::temp_dir().join(stem);
        }
        derived
    }

    fn load_information(&mut self) -> Result<(), Error> {
        if !self.extract_dir.exists() {
            std::fs::create_dir_all(&self.extract_dir)?;
        }
        let xml_path = self.extract_dir.join(MODEL_DESCRIPTION);
        if !xml_path.exists() {
            if self.fmu_path.as_os_str().is_empty() {
                return Err(Error::ArchiveStructure(format!(
                    "{} missing from {}",
                    MODEL_DESCRIPTION,
                    self.extract_dir.display()
                )));
            }
            self.extract()?;
        }
        if !xml_path.exists() {
            return Err(Error::ArchiveStructure(format!(
                "{} missing from {}",
                MODEL_DESCRIPTION,
                self.extract_dir.display()
            )));
        }
        self.catalog = Arc::new(VariableCatalog::load_file(&xml_path)?);

        let resources = self.extract_dir.join("resources");
        self.resource_dir = if resources.is_relative() {
            std::env::current_dir()?.join(resources)
        } else {
            resources
        };
        Ok(())
    }

    fn extract(&mut self) -> Result<(), Error> {
        log::debug!(
            "Extracting {} into {}",
            self.fmu_path.display(),
            self.extract_dir.display()
        );
        let file = std::fs::File::open(&self.fmu_path)?;
        let mut archive = match zip::ZipArchive::new(file) {
            Ok(archive) => archive,
            Err(err) => {
                // Don't leave a half-created directory behind for a bad archive
                let _ = std::fs::remove_dir_all(&self.extract_dir);
                return Err(err.into());
            }
        };
        if let Err(err) = archive.extract(&self.extract_dir) {
            let _ = std::fs::remove_dir_all(&self.extract_dir);
            return Err(err.into());
        }
        self.extracted = true;
        Ok(())
    }

    pub fn catalog(&self) -> &Arc<VariableCatalog> {
        &self.catalog
    }

    /// Model name from the catalog header.
    pub fn name(&self) -> &str {
        self.catalog.model_name()
    }

    pub fn extract_dir(&self) -> &Path {
        &self.extract_dir
    }

    pub fn check_flag(&self, flag: Capability) -> bool {
        self.catalog.check_flag(flag)
    }

    /// Catalog counts, with the created-instance counters answered by the library itself.
    pub fn count(&self, kind: CountKind) -> usize {
        match kind {
            CountKind::MeObject => self.me_count,
            CountKind::CsObject => self.cs_count,
            other => self.catalog.count(other),
        }
    }

    /// Remove the FMU extraction directory on drop.
    pub fn delete_fmu_directory(&mut self, delete: bool) {
        self.delete_directory = delete;
    }

    pub fn is_so_loaded(&self, kind: Option<FmuKind>) -> bool {
        match kind {
            Some(FmuKind::ModelExchange) => self.me.is_some(),
            Some(FmuKind::CoSimulation) => self.cs.is_some(),
            None => self.me.is_some() || self.cs.is_some(),
        }
    }

    /// Pick the shared-object path for the host platform: `binaries/<platform-arch>/<identifier>`
    /// with the platform's library extension; a `<identifier>d` debug variant is accepted as a
    /// fallback.
    fn find_shared_library_path(&self, kind: FmuKind) -> Result<PathBuf, Error> {
        let capability = match kind {
            FmuKind::ModelExchange => Capability::ModelExchangeCapable,
            FmuKind::CoSimulation => Capability::CoSimulationCapable,
        };
        if !self.check_flag(capability) {
            return Err(Error::UnsupportedFmuType(format!("{kind:?}")));
        }
        let identifier = self.catalog.model_identifier(kind);

        let platform_folder = match (std::env::consts::OS, std::mem::size_of::<usize>() * 8) {
            ("windows", 64) => "win64",
            ("windows", 32) => "win32",
            ("linux", 64) => "linux64",
            ("linux", 32) => "linux32",
            ("macos", 64) => "darwin64",
            ("macos", 32) => "darwin32",
            _ => {
                return Err(Error::UnsupportedPlatform {
                    os: std::env::consts::OS.to_string(),
                    arch: std::env::consts::ARCH.to_string(),
                });
            }
        };
        let binaries = self.extract_dir.join("binaries").join(platform_folder);
        let suffix = std::env::consts::DLL_SUFFIX;

        let so_path = binaries.join(format!("{identifier}{suffix}"));
        if so_path.exists() {
            return Ok(so_path);
        }
        let debug_path = binaries.join(format!("{identifier}d{suffix}"));
        if debug_path.exists() {
            return Ok(debug_path);
        }
        Err(Error::SharedLibraryNotFound(so_path))
    }

    /// Load the shared library and bind the base, common and kind-specific function tables.
    pub fn load_shared_library(&mut self, kind: FmuKind) -> Result<(), Error> {
        if self.is_so_loaded(Some(kind)) {
            return Ok(());
        }
        let lib = match &self.lib {
            Some(lib) => Arc::clone(lib),
            None => {
                let so_path = self.find_shared_library_path(kind)?;
                log::trace!("Loading shared library {}", so_path.display());
                let lib = Arc::new(unsafe { Library::new(&so_path) }?);
                self.lib = Some(Arc::clone(&lib));
                lib
            }
        };
        if self.base.is_none() {
            self.base = Some(BaseFunctions::new(Arc::clone(&lib))?);
        }
        if self.common.is_none() {
            self.common = Some(Arc::new(CommonFunctions::new(Arc::clone(&lib))?));
        }
        match kind {
            FmuKind::ModelExchange => {
                self.me = Some(Arc::new(ModelExchangeFunctions::new(lib)?));
            }
            FmuKind::CoSimulation => {
                self.cs = Some(Arc::new(CoSimFunctions::new(lib)?));
            }
        }
        Ok(())
    }

    /// TypesPlatform string of the loaded library; empty if not loaded.
    pub fn types_platform(&self) -> String {
        match &self.base {
            Some(base) => unsafe { std::ffi::CStr::from_ptr((base.get_types_platform)()) }
                .to_string_lossy()
                .into_owned(),
            None => String::new(),
        }
    }

    /// FMI version string of the loaded library; empty if not loaded.
    pub fn version(&self) -> String {
        match &self.base {
            Some(base) => unsafe { std::ffi::CStr::from_ptr((base.get_version)()) }
                .to_string_lossy()
                .into_owned(),
            None => String::new(),
        }
    }

    fn make_callbacks() -> Box<binding::fmi2CallbackFunctions> {
        Box::new(binding::fmi2CallbackFunctions {
            logger: Some(fmu_sys::logger::fmi2_callback_logger as _),
            allocateMemory: Some(libc::calloc),
            freeMemory: Some(libc::free),
            stepFinished: None,
            componentEnvironment: std::ptr::null_mut(),
        })
    }

    fn instantiate(
        &mut self,
        name: &str,
        fmu_type: binding::fmi2Type,
    ) -> Result<FmuObject, Error> {
        let common = Arc::clone(self.common.as_ref().expect("shared library loaded"));
        let base = self.base.as_ref().expect("shared library loaded");

        let callbacks = Self::make_callbacks();
        let instance_name = CString::new(name).expect("Error building CString");
        let guid = CString::new(self.catalog.guid()).expect("Error building CString");
        let resource_url = url::Url::from_file_path(&self.resource_dir)
            .map(|url| url.as_str().to_owned())
            .unwrap_or_else(|_| format!("file:///{}", self.resource_dir.display()));
        let resource_url = CString::new(resource_url).expect("Error building CString");

        let component = unsafe {
            (base.instantiate)(
                instance_name.as_ptr(),
                fmu_type,
                guid.as_ptr(),
                resource_url.as_ptr(),
                &*callbacks,
                binding::fmi2False,
                binding::fmi2False,
            )
        };
        if component.is_null() {
            return Err(Error::Instantiation);
        }
        log::trace!("Instantiated component {component:?} for {name}");

        Ok(FmuObject::new(
            name.to_owned(),
            component,
            Arc::clone(&self.catalog),
            common,
            callbacks,
        ))
    }

    /// Create a co-simulation instance, loading the shared library on first use.
    pub fn create_co_simulation(&mut self, name: &str) -> Result<CoSimInstance, Error> {
        self.load_shared_library(FmuKind::CoSimulation)?;
        let obj = self.instantiate(name, binding::fmi2Type_fmi2CoSimulation)?;
        let cs = Arc::clone(self.cs.as_ref().expect("co-simulation table bound"));
        self.cs_count += 1;
        Ok(CoSimInstance::new(obj, cs))
    }

    /// Create a model-exchange instance, loading the shared library on first use.
    pub fn create_model_exchange(&mut self, name: &str) -> Result<ModelExchangeInstance, Error> {
        self.load_shared_library(FmuKind::ModelExchange)?;
        let obj = self.instantiate(name, binding::fmi2Type_fmi2ModelExchange)?;
        let me = Arc::clone(self.me.as_ref().expect("model-exchange table bound"));
        self.me_count += 1;
        Ok(ModelExchangeInstance::new(obj, me))
    }
}

impl Drop for FmuLibrary {
    fn drop(&mut self) {
        if self.delete_directory && self.extracted {
            if let Err(err) = std::fs::remove_dir_all(&self.extract_dir) {
                log::warn!(
                    "unable to remove directory {}: {err}",
                    self.extract_dir.display()
                );
            }
        }
    }
}

impl std::fmt::Debug for FmuLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("FmuLibrary")
            .field("fmu_path", &self.fmu_path)
            .field("extract_dir", &self.extract_dir)
            .field("model", &self.name())
            .field("so_loaded", &self.is_so_loaded(None))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL_XML: &str = r##"<fmiModelDescription fmiVersion="2.0" modelName="mini" guid="{1}">
  <CoSimulation modelIdentifier="mini"/>
  <ModelVariables>
    <ScalarVariable name="x" valueReference="1" causality="output"><Real start="0"/></ScalarVariable>
  </ModelVariables>
  <ModelStructure/>
</fmiModelDescription>"##;

    #[test]
    fn test_load_pre_extracted_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MODEL_DESCRIPTION), MINIMAL_XML).unwrap();

        let library = FmuLibrary::load(dir.path(), None).unwrap();
        assert_eq!(library.name(), "mini");
        assert!(library.check_flag(Capability::CoSimulationCapable));
        assert!(!library.is_so_loaded(None));
        assert_eq!(library.count(CountKind::Outputs), 1);
        assert_eq!(library.count(CountKind::CsObject), 0);
    }

    #[test]
    fn test_load_zip_archive() {
        let dir = tempfile::tempdir().unwrap();
        let fmu_path = dir.path().join("mini.fmu");
        let file = std::fs::File::create(&fmu_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file(MODEL_DESCRIPTION, zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(MINIMAL_XML.as_bytes()).unwrap();
        writer.finish().unwrap();

        let library = FmuLibrary::load(&fmu_path, None).unwrap();
        // extracted alongside the archive using its stem as directory name
        assert_eq!(library.extract_dir(), dir.path().join("mini"));
        assert_eq!(library.name(), "mini");
    }

    #[test]
    fn test_explicit_extract_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let fmu_path = dir.path().join("mini.fmu");
        let file = std::fs::File::create(&fmu_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file(MODEL_DESCRIPTION, zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(MINIMAL_XML.as_bytes()).unwrap();
        writer.finish().unwrap();

        let extract = dir.path().join("elsewhere");
        let library = FmuLibrary::load(&fmu_path, Some(&extract)).unwrap();
        assert_eq!(library.extract_dir(), extract);
        assert!(extract.join(MODEL_DESCRIPTION).exists());
    }

    #[test]
    fn test_invalid_archive_leaves_no_directory() {
        let dir = tempfile::tempdir().unwrap();
        let fmu_path = dir.path().join("dummy.fmu");
        std::fs::write(&fmu_path, b"this is not a zip archive").unwrap();

        assert!(FmuLibrary::load(&fmu_path, None).is_err());
        assert!(!dir.path().join("dummy").exists());
    }

    #[test]
    fn test_missing_shared_library() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MODEL_DESCRIPTION), MINIMAL_XML).unwrap();

        let mut library = FmuLibrary::load(dir.path(), None).unwrap();
        // catalog loads fine, but there is no binaries directory to bind
        match library.load_shared_library(FmuKind::CoSimulation) {
            Err(Error::SharedLibraryNotFound(path)) => {
                assert!(path.to_string_lossy().contains("binaries"));
            }
            other => panic!("expected SharedLibraryNotFound, got {other:?}"),
        }
        // and model exchange is not declared at all
        assert!(matches!(
            library.load_shared_library(FmuKind::ModelExchange),
            Err(Error::UnsupportedFmuType(_))
        ));
    }
}
