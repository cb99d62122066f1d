use std::path::PathBuf;

/// Run FMUs as federates on a co-simulation bus
#[derive(Debug, Default, clap::Parser)]
#[command(name = "fmu-runner", version, about)]
pub struct Options {
    /// Input files: `.fmu` archives or JSON/TOML configuration files
    pub inputs: Vec<PathBuf>,

    /// The step size to use, as seconds or a time string (10ms, 0.1s)
    #[arg(long)]
    pub step: Option<String>,

    /// The time to stop the simulation, as seconds or a time string
    #[arg(long)]
    pub stop: Option<String>,

    /// The type of integrator to use for model-exchange FMUs
    #[arg(long, default_value = "cvode")]
    pub integrator: String,

    /// Arguments to pass to the integrator
    #[arg(long = "integrator-args")]
    pub integrator_args: Option<String>,

    /// Arguments to pass to an automatically generated broker
    #[arg(long = "brokerargs")]
    pub broker_args: Option<String>,

    /// Initial values for FMU parameters or variables, as a semicolon separated list p1=34;p2=19.5
    #[arg(long = "set", value_delimiter = ';')]
    pub set_parameters: Vec<String>,

    /// Connections this federation should make, as from,to pairs
    #[arg(long = "connections", value_delimiter = ',')]
    pub connections: Vec<String>,

    /// Additional search paths for FMUs or configuration files
    #[arg(short = 'L', long = "fmupath")]
    pub fmu_paths: Vec<PathBuf>,

    /// The directory in which to extract FMU archives
    #[arg(long = "extractpath")]
    pub extract_path: Option<PathBuf>,

    /// Run the FMU as a co-simulation FMU if possible
    #[arg(long)]
    pub cosim: bool,

    /// Run the FMU as a model-exchange FMU if possible
    #[arg(long)]
    pub modelexchange: bool,

    /// Comma separated flags passed to the FMU instances; a `-` prefix clears a flag
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub flags: Vec<String>,

    /// Restrict the published outputs of the FMU by name
    #[arg(long = "output_variables", value_delimiter = ',')]
    pub output_variables: Vec<String>,

    /// Restrict the subscribed inputs of the FMU by name
    #[arg(long = "input_variables", value_delimiter = ',')]
    pub input_variables: Vec<String>,

    /// Capture published outputs into a CSV file
    #[arg(long = "capture")]
    pub capture_file: Option<PathBuf>,

    /// Name of the federate
    #[arg(long)]
    pub name: Option<String>,

    /// Type of core to create
    #[arg(long, default_value = "inproc")]
    pub coretype: String,

    /// Address of an existing broker to connect to
    #[arg(long)]
    pub broker: Option<String>,

    /// Start a broker automatically
    #[arg(long)]
    pub autobroker: bool,

    /// Initialization string for the automatically started broker
    #[arg(long = "brokerinit")]
    pub broker_init: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_basic_invocation() {
        let options = Options::try_parse_from([
            "fmu-runner",
            "--autobroker",
            "--stop",
            "1s",
            "--step",
            "0.1s",
            "bouncingBall.fmu",
        ])
        .unwrap();
        assert!(options.autobroker);
        assert_eq!(options.stop.as_deref(), Some("1s"));
        assert_eq!(options.step.as_deref(), Some("0.1s"));
        assert_eq!(options.inputs, vec![PathBuf::from("bouncingBall.fmu")]);
        assert!(options.cosim || !options.modelexchange);
    }

    #[test]
    fn test_set_and_connections() {
        let options = Options::try_parse_from([
            "fmu-runner",
            "--set",
            "h=4;v=0",
            "--connections",
            "pub0,fthru.Float64_continuous_input",
            "--connections",
            "pub1,fthru.Float64_discrete_input",
            "Feedthrough.fmu",
        ])
        .unwrap();
        assert_eq!(options.set_parameters, vec!["h=4", "v=0"]);
        assert_eq!(
            options.connections,
            vec![
                "pub0",
                "fthru.Float64_continuous_input",
                "pub1",
                "fthru.Float64_discrete_input"
            ]
        );
    }

    #[test]
    fn test_flags_with_clear_prefix() {
        let options = Options::try_parse_from([
            "fmu-runner",
            "--flags",
            "exception_on_warning,-exception_on_discard",
            "a.fmu",
        ])
        .unwrap();
        assert_eq!(
            options.flags,
            vec!["exception_on_warning", "-exception_on_discard"]
        );
    }
}
