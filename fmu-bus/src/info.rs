//! Federate configuration, loadable from JSON or TOML.

use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::time::{Time, TimeProperty};
use crate::BusError;

/// Configuration a [`crate::ValueFederate`] is created from.
#[derive(Debug, Clone)]
pub struct FederateInfo {
    /// Default federate name pattern; a literal `${#}` is replaced with an instance counter by
    /// the caller
    pub default_name: String,
    pub core_type: String,
    /// Name of the core the federate attaches to
    pub core_name: String,
    /// Broker address for the core
    pub broker: Option<String>,
    pub autobroker: bool,
    pub broker_init_string: String,
    pub period: Option<Time>,
    pub stop_time: Option<Time>,
    /// Separator between federate and interface names
    pub separator: char,
}

impl Default for FederateInfo {
    fn default() -> Self {
        Self {
            default_name: String::new(),
            core_type: "inproc".to_owned(),
            core_name: String::new(),
            broker: None,
            autobroker: false,
            broker_init_string: String::new(),
            period: None,
            stop_time: None,
            separator: '.',
        }
    }
}

/// On-disk spelling, with the common alternate key spellings accepted.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FederateInfoFile {
    #[serde(alias = "defname")]
    name: Option<String>,
    #[serde(alias = "coretype", alias = "coreType")]
    core_type: Option<String>,
    #[serde(alias = "corename", alias = "coreName")]
    core_name: Option<String>,
    broker: Option<String>,
    autobroker: Option<bool>,
    #[serde(alias = "brokerinit", alias = "brokerInitString")]
    broker_init_string: Option<String>,
    period: Option<TimeValue>,
    #[serde(alias = "stoptime", alias = "stopTime")]
    stop_time: Option<TimeValue>,
    separator: Option<char>,
}

/// A time in a config file: either a number of seconds or a string with a unit suffix.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TimeValue {
    Seconds(f64),
    Text(String),
}

impl TryFrom<TimeValue> for Time {
    type Error = BusError;

    fn try_from(value: TimeValue) -> Result<Self, Self::Error> {
        match value {
            TimeValue::Seconds(secs) => Ok(Time::from_secs_f64(secs)),
            TimeValue::Text(text) => Time::from_str(&text),
        }
    }
}

impl FederateInfo {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, BusError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, BusError> {
        let file: FederateInfoFile =
            serde_json::from_str(text).map_err(|e| BusError::InfoFormat(e.to_string()))?;
        Self::default().merged(file)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, BusError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, BusError> {
        let file: FederateInfoFile =
            toml::from_str(text).map_err(|e| BusError::InfoFormat(e.to_string()))?;
        Self::default().merged(file)
    }

    /// Merge file values over this info, keeping existing values where the file is silent.
    pub fn load_from_json_file(&mut self, path: impl AsRef<Path>) -> Result<(), BusError> {
        let text = std::fs::read_to_string(path)?;
        let file: FederateInfoFile =
            serde_json::from_str(&text).map_err(|e| BusError::InfoFormat(e.to_string()))?;
        *self = self.clone().merged(file)?;
        Ok(())
    }

    pub fn load_from_toml_file(&mut self, path: impl AsRef<Path>) -> Result<(), BusError> {
        let text = std::fs::read_to_string(path)?;
        let file: FederateInfoFile =
            toml::from_str(&text).map_err(|e| BusError::InfoFormat(e.to_string()))?;
        *self = self.clone().merged(file)?;
        Ok(())
    }

    fn merged(mut self, file: FederateInfoFile) -> Result<Self, BusError> {
        if let Some(name) = file.name {
            self.default_name = name;
        }
        if let Some(core_type) = file.core_type {
            self.core_type = core_type;
        }
        if let Some(core_name) = file.core_name {
            self.core_name = core_name;
        }
        if file.broker.is_some() {
            self.broker = file.broker;
        }
        if let Some(autobroker) = file.autobroker {
            self.autobroker = autobroker;
        }
        if let Some(init) = file.broker_init_string {
            self.broker_init_string = init;
        }
        if let Some(period) = file.period {
            self.period = Some(period.try_into()?);
        }
        if let Some(stop) = file.stop_time {
            self.stop_time = Some(stop.try_into()?);
        }
        if let Some(separator) = file.separator {
            self.separator = separator;
        }
        Ok(self)
    }

    /// Read a time property, substituting `default` when unset.
    pub fn check_time_property(&self, property: TimeProperty, default: Time) -> Time {
        match property {
            TimeProperty::Period => self.period.unwrap_or(default),
            TimeProperty::StopTime => self.stop_time.unwrap_or(default),
        }
    }

    pub fn set_time_property(&mut self, property: TimeProperty, value: Time) {
        match property {
            TimeProperty::Period => self.period = Some(value),
            TimeProperty::StopTime => self.stop_time = Some(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json() {
        let info = FederateInfo::from_json(
            r#"{"name": "fed1", "coretype": "inproc", "autobroker": true,
                "period": "10ms", "stoptime": 2.5, "brokerinit": "--name b1"}"#,
        )
        .unwrap();
        assert_eq!(info.default_name, "fed1");
        assert!(info.autobroker);
        assert_eq!(info.period, Some(Time::from_secs_f64(0.01)));
        assert_eq!(info.stop_time, Some(Time::from_secs_f64(2.5)));
        assert_eq!(info.broker_init_string, "--name b1");
        assert_eq!(info.separator, '.');
    }

    #[test]
    fn test_from_toml() {
        let info = FederateInfo::from_toml(
            r#"
name = "fed2"
core_type = "inproc"
period = 0.25
"#,
        )
        .unwrap();
        assert_eq!(info.default_name, "fed2");
        assert_eq!(info.period, Some(Time::from_secs_f64(0.25)));
        assert!(!info.autobroker);
    }

    #[test]
    fn test_check_time_property() {
        let mut info = FederateInfo::default();
        let fallback = Time::from_secs_f64(0.001);
        assert_eq!(info.check_time_property(TimeProperty::Period, fallback), fallback);
        info.set_time_property(TimeProperty::Period, Time::from_secs_f64(0.5));
        assert_eq!(
            info.check_time_property(TimeProperty::Period, fallback),
            Time::from_secs_f64(0.5)
        );
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(FederateInfo::from_json("{not json").is_err());
    }
}
