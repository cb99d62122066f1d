//! Federation configuration files (JSON or TOML).

use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::PathBuf;

use fmu_bus::Time;
use serde::Deserialize;

use crate::RunnerError;

/// Top-level structure of a federation config file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub stop: Option<TimeSpec>,
    pub step: Option<TimeSpec>,
    pub extractpath: Option<PathBuf>,
    pub fmus: Vec<FmuEntry>,
    pub connections: Vec<Connection>,
}

/// One FMU of the federation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FmuEntry {
    /// Path to the FMU archive, resolved against the search paths
    pub fmu: String,
    /// Federate name for this FMU
    pub name: String,
    /// Optional per-federate config file
    pub config: Option<PathBuf>,
    pub steptime: Option<TimeSpec>,
    pub starttime: Option<TimeSpec>,
    pub parameters: Vec<ParameterEntry>,
}

/// A parameter assignment, either spelled as `{"field": name, "value": v}` or as a plain
/// `{name: value}` map.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ParameterEntry {
    Field { field: String, value: Scalar },
    Map(BTreeMap<String, Scalar>),
}

impl ParameterEntry {
    /// Flatten into (name, value-string) assignments.
    pub fn assignments(&self) -> Vec<(String, String)> {
        match self {
            ParameterEntry::Field { field, value } => vec![(field.clone(), value.to_string())],
            ParameterEntry::Map(map) => map
                .iter()
                .map(|(name, value)| (name.clone(), value.to_string()))
                .collect(),
        }
    }
}

/// A cross-FMU connection, either `{"<from>": "<to>"}` or a `[from, to]` pair.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Connection {
    Pair(Vec<String>),
    Map(BTreeMap<String, String>),
}

impl Connection {
    /// The (from, to) endpoint pairs this entry describes.
    pub fn pairs(&self) -> Vec<(String, String)> {
        match self {
            Connection::Pair(items) => items
                .chunks_exact(2)
                .map(|pair| (pair[0].clone(), pair[1].clone()))
                .collect(),
            Connection::Map(map) => map
                .iter()
                .map(|(from, to)| (from.clone(), to.clone()))
                .collect(),
        }
    }
}

/// A scalar parameter value as it appears in a config file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Bool(value) => write!(f, "{}", value),
            Scalar::Number(value) => write!(f, "{}", value),
            Scalar::Text(value) => write!(f, "{}", value),
        }
    }
}

/// A time: either seconds as a number or a string with a unit suffix.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TimeSpec {
    Seconds(f64),
    Text(String),
}

impl TimeSpec {
    pub fn to_time(&self) -> Result<Time, RunnerError> {
        match self {
            TimeSpec::Seconds(secs) => Ok(Time::from_secs_f64(*secs)),
            TimeSpec::Text(text) => text
                .parse()
                .map_err(|_| RunnerError::InvalidTime(text.clone())),
        }
    }
}

impl ConfigFile {
    pub fn from_json(text: &str) -> Result<Self, RunnerError> {
        serde_json::from_str(text).map_err(|e| RunnerError::ConfigFormat(e.to_string()))
    }

    pub fn from_toml(text: &str) -> Result<Self, RunnerError> {
        toml::from_str(text).map_err(|e| RunnerError::ConfigFormat(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_config() {
        let config = ConfigFile::from_json(
            r#"{
              "stop": "2s",
              "step": 0.1,
              "fmus": [
                { "fmu": "bouncingBall.fmu", "name": "bbfed",
                  "parameters": [ { "field": "h", "value": 5 }, { "v": 2 } ] }
              ],
              "connections": [ { "bbfed.h": "other.height" } ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.stop.as_ref().unwrap().to_time().unwrap(), Time::from_secs_f64(2.0));
        assert_eq!(config.step.as_ref().unwrap().to_time().unwrap(), Time::from_secs_f64(0.1));
        assert_eq!(config.fmus.len(), 1);
        let entry = &config.fmus[0];
        assert_eq!(entry.fmu, "bouncingBall.fmu");
        assert_eq!(entry.name, "bbfed");
        let assignments: Vec<_> = entry
            .parameters
            .iter()
            .flat_map(|p| p.assignments())
            .collect();
        assert_eq!(
            assignments,
            vec![("h".to_owned(), "5".to_owned()), ("v".to_owned(), "2".to_owned())]
        );
        assert_eq!(
            config.connections[0].pairs(),
            vec![("bbfed.h".to_owned(), "other.height".to_owned())]
        );
    }

    #[test]
    fn test_toml_config() {
        let config = ConfigFile::from_toml(
            r#"
stop = "30s"

[[fmus]]
fmu = "Feedthrough.fmu"
name = "fthru"
steptime = "100ms"

[[fmus.parameters]]
field = "Float64_fixed_parameter"
value = 1.5

[[connections]]
"pub0" = "fthru.Float64_continuous_input"
"#,
        )
        .unwrap();
        assert_eq!(config.fmus.len(), 1);
        assert_eq!(
            config.fmus[0].steptime.as_ref().unwrap().to_time().unwrap(),
            Time::from_secs_f64(0.1)
        );
        assert_eq!(
            config.connections[0].pairs(),
            vec![(
                "pub0".to_owned(),
                "fthru.Float64_continuous_input".to_owned()
            )]
        );
    }

    #[test]
    fn test_bad_config_is_an_error() {
        assert!(ConfigFile::from_json("{ not json").is_err());
        assert!(ConfigFile::from_toml("= bad").is_err());
    }
}
