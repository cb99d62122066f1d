//! Orchestration: argument handling, broker/core startup, driver creation, run and shutdown.

use std::path::{Path, PathBuf};
use std::time::Duration;

use fmu::catalog::Capability;
use fmu::{Fmi2Error, FmuLibrary, LibraryManager};
use fmu_bus::{BrokerApp, CoreApp, FederateInfo, Time, TimeProperty};

use crate::config::ConfigFile;
use crate::cosim_federate::CoSimFederate;
use crate::options::Options;
use crate::RunnerError;

/// Exit codes of the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    Ok = 0,
    /// Input files omitted or not found
    MissingFile = 30,
    /// Input path could not be resolved
    InvalidFile = 31,
    /// FMU archive or model description rejected
    InvalidFmu = 32,
    /// Instantiate returned null or the library was rejected
    FmuError = 33,
    /// Config file parse or load failure
    FileProcessingError = 34,
    BrokerConnectFailure = 35,
    CoreConnectFailure = 36,
    /// A `--set` assignment was discarded by the FMU
    DiscardedParameterError = 37,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum State {
    Created,
    Loaded,
    Initialized,
    Running,
    Closed,
    Error,
}

const DEFAULT_STEP: f64 = 0.001;
const DEFAULT_STOP: f64 = 30.0;
const DISCONNECT_DEADLINE: Duration = Duration::from_millis(500);
const ERROR_DISCONNECT_DEADLINE: Duration = Duration::from_millis(150);

/// Loads the inputs, starts (or attaches to) the bus, owns one driver per FMU and walks them
/// through initialize/run/close with unified error termination.
pub struct FmiRunner {
    options: Options,
    fed_info: FederateInfo,
    step_time: Option<Time>,
    stop_time: Option<Time>,
    broker: Option<BrokerApp>,
    core: Option<CoreApp>,
    cosim_feds: Vec<CoSimFederate>,
    state: State,
    return_code: i32,
}

impl FmiRunner {
    pub fn new(options: Options) -> Self {
        let mut fed_info = FederateInfo {
            default_name: "fmu${#}".to_owned(),
            ..Default::default()
        };
        fed_info.core_type = options.coretype.clone();
        fed_info.autobroker = options.autobroker;
        if let Some(broker) = &options.broker {
            fed_info.broker = Some(broker.clone());
        }
        if let Some(init) = &options.broker_init {
            fed_info.broker_init_string = init.clone();
        }
        if let Some(name) = &options.name {
            fed_info.default_name = name.clone();
        }
        Self {
            options,
            fed_info,
            step_time: None,
            stop_time: None,
            broker: None,
            core: None,
            cosim_feds: Vec::new(),
            state: State::Created,
            return_code: ErrorCode::Ok as i32,
        }
    }

    /// Parse a command line into a runner.
    pub fn parse<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        use clap::Parser;
        Ok(Self::new(Options::try_parse_from(args)?))
    }

    fn log_error(&self, message: &str) {
        if let Some(core) = &self.core {
            core.log_message(log::Level::Error, message);
        } else if let Some(broker) = &self.broker {
            broker.send_command("broker", &format!("log {message}"));
        } else {
            log::error!("{message}");
        }
    }

    fn log_warning(&self, message: &str) {
        if let Some(core) = &self.core {
            core.log_message(log::Level::Warn, message);
        } else {
            log::warn!("{message}");
        }
    }

    /// Resolve an input path directly or through the `--fmupath` search paths.
    fn get_file_path(&self, file: &Path) -> Option<PathBuf> {
        if file.exists() {
            return Some(file.to_path_buf());
        }
        for search_path in &self.options.fmu_paths {
            let candidate = search_path.join(file);
            if candidate.exists() {
                return Some(candidate);
            }
        }
        None
    }

    fn parse_time_option(value: &Option<String>) -> Result<Option<Time>, RunnerError> {
        match value {
            Some(text) => text
                .parse::<Time>()
                .map(Some)
                .map_err(|_| RunnerError::InvalidTime(text.clone())),
            None => Ok(None),
        }
    }

    /// Settle a time property: an explicit value is written to the federate info, otherwise the
    /// federate info's existing value (or `default`) is adopted.
    fn settle_time_property(
        fed_info: &mut FederateInfo,
        property: TimeProperty,
        explicit: Option<Time>,
        default: f64,
    ) -> Time {
        match explicit {
            Some(value) if value > Time::ZERO => {
                fed_info.set_time_property(property, value);
                value
            }
            _ => {
                let value = fed_info.check_time_property(property, Time::from_secs_f64(default));
                fed_info.set_time_property(property, value);
                value
            }
        }
    }

    pub fn load(&mut self) -> i32 {
        if self.state >= State::Loaded {
            return if self.state == State::Error {
                self.return_code
            } else {
                ErrorCode::Ok as i32
            };
        }
        if self.options.inputs.is_empty() {
            self.log_error("no input files specified");
            return self.error_terminate(ErrorCode::MissingFile);
        }
        let first_input = self.options.inputs[0].clone();
        let Some(input_file) = self.get_file_path(&first_input) else {
            self.log_error(&format!("unable to resolve input {}", first_input.display()));
            return self.error_terminate(ErrorCode::InvalidFile);
        };

        let extension = input_file
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        // A config input may also carry federate options
        if extension == "json" {
            if let Err(err) = self.fed_info.load_from_json_file(&input_file) {
                self.log_error(&format!("error loading federate info from file: {err}"));
                return self.error_terminate(ErrorCode::FileProcessingError);
            }
        } else if extension == "toml" {
            if let Err(err) = self.fed_info.load_from_toml_file(&input_file) {
                self.log_error(&format!("error loading federate info from file: {err}"));
                return self.error_terminate(ErrorCode::FileProcessingError);
            }
        }

        if self.fed_info.autobroker {
            let mut args = self.options.broker_args.clone().unwrap_or_default();
            if !self.fed_info.broker_init_string.is_empty() {
                if !args.is_empty() {
                    args.push(' ');
                }
                args.push_str(&self.fed_info.broker_init_string);
                self.fed_info.broker_init_string.clear();
            }
            let broker = match BrokerApp::new(&self.fed_info.core_type, &args) {
                Ok(broker) => broker,
                Err(err) => {
                    self.log_error(&format!("error generating broker: {err}"));
                    return self.error_terminate(ErrorCode::BrokerConnectFailure);
                }
            };
            if !broker.is_connected() && !broker.connect() {
                self.log_error("broker failed to connect");
                return self.error_terminate(ErrorCode::BrokerConnectFailure);
            }
            log::info!("started autobroker with args \"{args}\"");
            self.fed_info.broker = Some(broker.address());
            self.broker = Some(broker);
            self.fed_info.autobroker = false;
        }

        let mut core_init = String::new();
        if let Some(broker) = &self.fed_info.broker {
            core_init = format!("--broker {broker}");
        }
        let core = match CoreApp::new(&self.fed_info.core_type, &core_init) {
            Ok(core) => core,
            Err(err) => {
                self.log_error(&format!("error creating core: {err}"));
                return self.error_terminate(ErrorCode::CoreConnectFailure);
            }
        };
        if !core.is_connected() && !core.connect() {
            self.log_error("core failed to connect");
            return self.error_terminate(ErrorCode::CoreConnectFailure);
        }
        self.fed_info.core_name = core.identifier();
        self.core = Some(core);

        let step = match Self::parse_time_option(&self.options.step) {
            Ok(step) => step,
            Err(err) => {
                self.log_error(&err.to_string());
                return self.error_terminate(ErrorCode::InvalidFile);
            }
        };
        let stop = match Self::parse_time_option(&self.options.stop) {
            Ok(stop) => stop,
            Err(err) => {
                self.log_error(&err.to_string());
                return self.error_terminate(ErrorCode::InvalidFile);
            }
        };

        let code = if extension == "fmu" {
            self.step_time = Some(Self::settle_time_property(
                &mut self.fed_info,
                TimeProperty::Period,
                step,
                DEFAULT_STEP,
            ));
            self.stop_time = Some(Self::settle_time_property(
                &mut self.fed_info,
                TimeProperty::StopTime,
                stop,
                DEFAULT_STOP,
            ));
            self.load_fmu_input(&input_file)
        } else {
            self.step_time = step;
            self.stop_time = stop;
            self.load_config_input(&input_file, &extension)
        };
        if code != ErrorCode::Ok as i32 {
            return code;
        }

        // CLI connections come in from,to pairs
        let connections = self.options.connections.clone();
        if let Some(core) = &self.core {
            for pair in connections.chunks_exact(2) {
                core.data_link(&pair[0], &pair[1]);
            }
        }

        self.state = State::Loaded;

        let flags = self.options.flags.clone();
        for flag in &flags {
            if flag.is_empty() {
                continue;
            }
            let (name, value) = match flag.strip_prefix('-') {
                Some(name) => (name, false),
                None => (flag.strip_prefix('+').unwrap_or(flag), true),
            };
            let mut used = false;
            for fed in &mut self.cosim_feds {
                used |= fed.set_flag(name, value);
            }
            if !used {
                self.log_warning(&format!("flag {flag} was not recognized"));
            }
        }
        ErrorCode::Ok as i32
    }

    /// Load a single `.fmu` input and wrap it as a co-simulation driver.
    fn load_fmu_input(&mut self, input_file: &Path) -> i32 {
        let mut library =
            match FmuLibrary::load(input_file, self.options.extract_path.as_deref()) {
                Ok(library) => library,
                Err(err) => {
                    self.log_error(&format!("error loading fmu: {err}"));
                    return self.error_terminate(ErrorCode::InvalidFmu);
                }
            };

        let use_cosim = !self.options.modelexchange || self.options.cosim;
        if use_cosim && library.check_flag(Capability::CoSimulationCapable) {
            let instance = match library.create_co_simulation("obj1") {
                Ok(instance) => instance,
                Err(err) => {
                    self.log_error(&format!("unable to create cosim object: {err}"));
                    return self.error_terminate(ErrorCode::FmuError);
                }
            };
            let name = self.federate_name(instance.name());
            let mut fed = match CoSimFederate::new(&name, instance, &self.fed_info) {
                Ok(fed) => fed,
                Err(err) => {
                    self.log_error(&format!("error creating federate: {err}"));
                    return self.error_terminate(ErrorCode::FmuError);
                }
            };
            if !self.options.input_variables.is_empty() {
                fed.set_inputs(self.options.input_variables.clone());
            }
            if !self.options.output_variables.is_empty() {
                fed.set_outputs(self.options.output_variables.clone());
            }
            if let Some(capture) = &self.options.capture_file {
                fed.set_output_capture(true, Some(capture.clone()));
            }
            self.cosim_feds.push(fed);
            ErrorCode::Ok as i32
        } else {
            // The continuous-time solver for model exchange lives outside this runner
            self.log_error(
                "unable to create a co-simulation federate for the FMU \
                 (model-exchange execution is not supported)",
            );
            self.error_terminate(ErrorCode::FmuError)
        }
    }

    /// Load a JSON/TOML federation description: each `fmus` entry becomes a driver, each
    /// `connections` entry a bus data link.
    fn load_config_input(&mut self, input_file: &Path, extension: &str) -> i32 {
        let text = match std::fs::read_to_string(input_file) {
            Ok(text) => text,
            Err(err) => {
                self.log_error(&format!("error reading {}: {err}", input_file.display()));
                return self.error_terminate(ErrorCode::FileProcessingError);
            }
        };
        let config = match extension {
            "json" => ConfigFile::from_json(&text),
            "toml" => ConfigFile::from_toml(&text),
            other => {
                self.log_error(&format!("unrecognized input extension .{other}"));
                return self.error_terminate(ErrorCode::InvalidFile);
            }
        };
        let config = match config {
            Ok(config) => config,
            Err(err) => {
                self.log_error(&format!("error loading system: {err}"));
                return self.error_terminate(ErrorCode::FileProcessingError);
            }
        };

        if self.stop_time.is_none() {
            if let Some(stop) = &config.stop {
                match stop.to_time() {
                    Ok(stop) => self.stop_time = Some(stop),
                    Err(err) => {
                        self.log_error(&err.to_string());
                        return self.error_terminate(ErrorCode::FileProcessingError);
                    }
                }
            }
        }
        if self.step_time.is_none() {
            if let Some(step) = &config.step {
                match step.to_time() {
                    Ok(step) => self.step_time = Some(step),
                    Err(err) => {
                        self.log_error(&err.to_string());
                        return self.error_terminate(ErrorCode::FileProcessingError);
                    }
                }
            }
        }
        let step_time = Self::settle_time_property(
            &mut self.fed_info,
            TimeProperty::Period,
            self.step_time,
            DEFAULT_STEP,
        );
        self.step_time = Some(step_time);
        self.stop_time = Some(Self::settle_time_property(
            &mut self.fed_info,
            TimeProperty::StopTime,
            self.stop_time,
            DEFAULT_STOP,
        ));

        let extract_path = self
            .options
            .extract_path
            .clone()
            .or(config.extractpath.clone());

        for entry in &config.fmus {
            let Some(fmu_path) = self.get_file_path(Path::new(&entry.fmu)) else {
                self.log_error(&format!("unable to locate file {}", entry.fmu));
                return self.error_terminate(ErrorCode::MissingFile);
            };
            // Repeated references to the same FMU reuse a single load through the manager; an
            // explicit extract path bypasses the cache since it changes the on-disk layout.
            let library = match extract_path.as_deref() {
                Some(extract) => FmuLibrary::load(&fmu_path, Some(extract))
                    .map(|library| std::sync::Arc::new(std::sync::Mutex::new(library))),
                None => LibraryManager::instance().get_library(&fmu_path.to_string_lossy()),
            };
            let library = match library {
                Ok(library) => library,
                Err(err) => {
                    self.log_error(&format!("error loading fmu {}: {err}", entry.fmu));
                    return self.error_terminate(ErrorCode::InvalidFmu);
                }
            };
            let instance = {
                let mut library = library.lock().expect("library poisoned");
                if !library.check_flag(Capability::CoSimulationCapable) {
                    drop(library);
                    self.log_error(&format!(
                        "{} does not declare co-simulation support",
                        entry.fmu
                    ));
                    return self.error_terminate(ErrorCode::FmuError);
                }
                library.create_co_simulation(&entry.name)
            };
            let instance = match instance {
                Ok(instance) => instance,
                Err(err) => {
                    self.log_error(&format!("unable to create cosim object: {err}"));
                    return self.error_terminate(ErrorCode::FmuError);
                }
            };

            let mut fed_info = self.fed_info.clone();
            if let Some(config_file) = &entry.config {
                let loaded = match config_file.extension().and_then(|e| e.to_str()) {
                    Some("toml") => fed_info.load_from_toml_file(config_file),
                    _ => fed_info.load_from_json_file(config_file),
                };
                if let Err(err) = loaded {
                    self.log_error(&format!("error loading federate config: {err}"));
                    return self.error_terminate(ErrorCode::FileProcessingError);
                }
            }

            let name = self.federate_name(&entry.name);
            let mut fed = match CoSimFederate::new(&name, instance, &fed_info) {
                Ok(fed) => fed,
                Err(err) => {
                    self.log_error(&format!("error creating federate: {err}"));
                    return self.error_terminate(ErrorCode::FmuError);
                }
            };

            for parameter in &entry.parameters {
                for (field, value) in parameter.assignments() {
                    if let Err(err) = fed.set(&field, &value) {
                        self.log_error(&format!(
                            "error applying parameter {field}={value}: {err}"
                        ));
                        return self.error_terminate(match err {
                            Fmi2Error::Discard => ErrorCode::DiscardedParameterError,
                            _ => ErrorCode::FmuError,
                        });
                    }
                }
            }

            let local_step = match &entry.steptime {
                Some(steptime) => match steptime.to_time() {
                    Ok(step) => step,
                    Err(err) => {
                        self.log_error(&err.to_string());
                        return self.error_terminate(ErrorCode::FileProcessingError);
                    }
                },
                None => step_time,
            };
            let local_start = match &entry.starttime {
                Some(starttime) => match starttime.to_time() {
                    Ok(start) => start,
                    Err(err) => {
                        self.log_error(&err.to_string());
                        return self.error_terminate(ErrorCode::FileProcessingError);
                    }
                },
                None => Time::ZERO,
            };
            fed.configure(local_step, local_start);
            self.cosim_feds.push(fed);
        }

        if let Some(core) = &self.core {
            for connection in &config.connections {
                for (from, to) in connection.pairs() {
                    core.data_link(&from, &to);
                }
            }
        }
        ErrorCode::Ok as i32
    }

    fn federate_name(&mut self, fallback: &str) -> String {
        static COUNTER: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(0);
        let pattern = &self.fed_info.default_name;
        if pattern.is_empty() {
            return fallback.to_owned();
        }
        if pattern.contains("${#}") {
            let index = COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            pattern.replace("${#}", &index.to_string())
        } else if self.cosim_feds.is_empty() {
            pattern.clone()
        } else {
            fallback.to_owned()
        }
    }

    pub fn initialize(&mut self) -> i32 {
        if self.state < State::Loaded {
            let code = self.load();
            if code != 0 {
                return code;
            }
        }
        if self.state >= State::Initialized {
            return ErrorCode::Ok as i32;
        }

        let step_time = self.step_time.unwrap_or(Time::ZERO);
        let set_parameters = self.options.set_parameters.clone();
        let mut param_used = vec![false; set_parameters.len()];
        let mut failure = None;
        'drivers: for fed in &mut self.cosim_feds {
            // Config-file drivers were configured at load time with their local step
            if !fed.is_configured() {
                fed.configure(step_time, Time::ZERO);
            }
            for (index, parameter) in set_parameters.iter().enumerate() {
                let Some((key, value)) = parameter.split_once('=') else {
                    continue;
                };
                match fed.set(key, value) {
                    // A swallowed discard (policy off) does not count as an application
                    Ok(()) => param_used[index] |= fed.knows_parameter(key),
                    Err(Fmi2Error::Discard) => {
                        failure = Some((
                            format!("parameter ({parameter}) was discarded"),
                            ErrorCode::DiscardedParameterError,
                        ));
                        break 'drivers;
                    }
                    Err(err) => {
                        failure = Some((
                            format!("error applying parameter ({parameter}): {err}"),
                            ErrorCode::FmuError,
                        ));
                        break 'drivers;
                    }
                }
            }
        }
        if let Some((message, code)) = failure {
            self.log_error(&message);
            return self.error_terminate(code);
        }
        for (index, used) in param_used.iter().enumerate() {
            if !used {
                self.log_warning(&format!("parameter ({}) is unused", set_parameters[index]));
            }
        }
        self.state = State::Initialized;
        ErrorCode::Ok as i32
    }

    pub fn run(&mut self, stop: Option<Time>) -> i32 {
        if self.state == State::Error {
            return self.return_code;
        }
        if self.state < State::Initialized {
            let code = self.initialize();
            if code != 0 {
                return code;
            }
        }
        let stop = stop.or(self.stop_time).unwrap_or(Time::ZERO);
        if let Some(step) = self.step_time {
            if stop < step {
                self.log_warning(&format!(
                    "stoptime ({stop}) < steptime ({step}), please check values"
                ));
            }
        }

        // One worker per driver; ordering across drivers is the bus's business
        let feds = std::mem::take(&mut self.cosim_feds);
        let mut workers = Vec::with_capacity(feds.len());
        for mut fed in feds {
            workers.push(std::thread::spawn(move || {
                let result = fed.run(stop);
                (fed, result)
            }));
        }
        let mut failed = false;
        for worker in workers {
            match worker.join() {
                Ok((fed, result)) => {
                    if let Err(err) = result {
                        log::error!("federate {} failed: {err}", fed.name());
                        failed = true;
                    }
                    self.cosim_feds.push(fed);
                }
                Err(_) => {
                    log::error!("a federate worker panicked");
                    failed = true;
                }
            }
        }
        if let Some(core) = &self.core {
            core.force_terminate();
        }
        if failed {
            return self.error_terminate(ErrorCode::FmuError);
        }
        self.state = State::Running;
        ErrorCode::Ok as i32
    }

    /// Run on a worker thread; the runner comes back with the exit code.
    pub fn run_async(mut self, stop: Option<Time>) -> std::thread::JoinHandle<(Self, i32)> {
        std::thread::spawn(move || {
            let code = self.run(stop);
            (self, code)
        })
    }

    pub fn close(&mut self) -> i32 {
        // Drivers first: dropping them frees instances before their libraries
        self.cosim_feds.clear();
        if let Some(broker) = self.broker.take() {
            if !broker.wait_for_disconnect(Some(DISCONNECT_DEADLINE)) {
                broker.force_terminate();
            }
        }
        if let Some(core) = self.core.take() {
            if !core.wait_for_disconnect(Some(DISCONNECT_DEADLINE)) {
                core.force_terminate();
            }
        }
        if self.state != State::Error {
            self.state = State::Closed;
            ErrorCode::Ok as i32
        } else {
            self.return_code
        }
    }

    fn error_terminate(&mut self, code: ErrorCode) -> i32 {
        self.log_error(&format!("error terminate with code {}", code as i32));
        if let Some(broker) = self.broker.take() {
            broker.force_terminate();
            if let Some(core) = self.core.take() {
                if !core.wait_for_disconnect(Some(ERROR_DISCONNECT_DEADLINE)) {
                    core.force_terminate();
                }
            }
        } else if let Some(core) = self.core.take() {
            core.force_terminate();
        }
        self.state = State::Error;
        self.return_code = code as i32;
        self.return_code
    }
}
