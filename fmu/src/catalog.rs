//! Queryable variable catalog derived from the model description.
//!
//! The raw XML structure lives in [`fmu_schema`]; this module flattens it into the lookup tables
//! every other component works against: the variable list in declaration order, name and
//! case-folded name indices, per-category index vectors, the three sparse dependency matrices and
//! the capability bit set.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use fmu_schema::{
    Causality, Fmi2ModelDescription, Initial, ScalarVariableElement, Variability,
};

use crate::Error;

/// Primitive type tag of a declared variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VarType {
    #[default]
    Real,
    Integer,
    Boolean,
    String,
    Enumeration,
}

/// Start value literal, typed per the variable element.
#[derive(Debug, Clone, PartialEq)]
pub enum StartValue {
    Real(f64),
    Integer(i32),
    Boolean(bool),
    String(String),
}

/// Everything the catalog knows about one declared variable.
#[derive(Debug, Clone, Default)]
pub struct VariableInfo {
    /// Position in the variable list (declaration order)
    pub index: usize,
    pub name: String,
    /// Opaque handle the ABI uses to address the variable. Not assumed unique across the
    /// catalog, but unique per primitive type.
    pub value_ref: u32,
    pub var_type: VarType,
    pub causality: Causality,
    pub variability: Variability,
    pub description: Option<String>,
    pub declared_type: Option<String>,
    pub unit: Option<String>,
    pub initial: Option<Initial>,
    pub start: Option<StartValue>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// For derivatives: index of the state variable this one differentiates (0-based)
    pub derivative_of: Option<usize>,
    pub reinit: bool,
}

/// Kind tag carried by a dependency matrix entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    Dependent,
    Constant,
    Fixed,
    Tunable,
    Discrete,
    Independent,
    Unknown,
}

impl From<fmu_schema::DependenciesKind> for DependencyKind {
    fn from(kind: fmu_schema::DependenciesKind) -> Self {
        match kind {
            fmu_schema::DependenciesKind::Dependent => DependencyKind::Dependent,
            fmu_schema::DependenciesKind::Constant => DependencyKind::Constant,
            fmu_schema::DependenciesKind::Fixed => DependencyKind::Fixed,
            fmu_schema::DependenciesKind::Tunable => DependencyKind::Tunable,
            fmu_schema::DependenciesKind::Discrete => DependencyKind::Discrete,
        }
    }
}

/// Sparse row-ordered dependency matrix, row-indexed by variable index (0-based).
#[derive(Debug, Default)]
pub struct DependencyMatrix {
    rows: Vec<Vec<(usize, DependencyKind)>>,
}

impl DependencyMatrix {
    fn with_rows(num_rows: usize) -> Self {
        Self {
            rows: vec![Vec::new(); num_rows],
        }
    }

    fn assign(&mut self, row: usize, col: usize, kind: DependencyKind) {
        if row < self.rows.len() {
            self.rows[row].push((col, kind));
        }
    }

    /// Dependency entries of the given row; empty for out-of-range rows.
    pub fn row(&self, index: usize) -> &[(usize, DependencyKind)] {
        self.rows.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of stored entries
    pub fn len(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Declared FMU capabilities, §2.2.7/§4.3.1 of the standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Capability {
    ModelExchangeCapable = 0,
    CoSimulationCapable,
    CanGetAndSetFmuState,
    ProvidesDirectionalDerivative,
    CanSerializeFmuState,
    NeedsExecutionTool,
    CompletedIntegratorStepNotNeeded,
    CanHandleVariableCommunicationStepSize,
    CanInterpolateInputs,
    CanRunAsynchronously,
    CanBeInstantiatedOnlyOncePerProcess,
    CanNotUseMemoryManagementFunctions,
}

/// Bit set over [`Capability`].
#[derive(Debug, Default, Clone, Copy)]
pub struct CapabilityFlags(u32);

impl CapabilityFlags {
    pub fn set(&mut self, flag: Capability, value: bool) {
        if value {
            self.0 |= 1 << flag as u32;
        } else {
            self.0 &= !(1 << flag as u32);
        }
    }

    pub fn check(&self, flag: Capability) -> bool {
        self.0 & (1 << flag as u32) != 0
    }
}

/// Default experiment values with the conventional fallbacks applied.
#[derive(Debug, Clone, Copy)]
pub struct DefaultExperiment {
    pub start_time: f64,
    pub stop_time: f64,
    pub step_size: f64,
    pub tolerance: f64,
}

impl Default for DefaultExperiment {
    fn default() -> Self {
        Self {
            start_time: 0.0,
            stop_time: 0.0,
            step_size: 0.0,
            tolerance: 1e-8,
        }
    }
}

/// Unit with its SI base decomposition and display units.
#[derive(Debug, Clone, Default)]
pub struct UnitInfo {
    pub name: String,
    pub factor: f64,
    pub offset: f64,
    /// (SI base unit name, exponent)
    pub base_units: Vec<(String, i32)>,
    pub display_units: Vec<DisplayUnitInfo>,
}

#[derive(Debug, Clone, Default)]
pub struct DisplayUnitInfo {
    pub name: String,
    pub factor: f64,
    pub offset: f64,
}

/// Ordered sequence of value references of a single primitive type.
///
/// The ABI's bulk getters and setters expect contiguous reference buffers, so this is kept as a
/// plain vector rather than a set.
#[derive(Debug, Clone, Default)]
pub struct VariableSet {
    var_type: VarType,
    vrefs: Vec<u32>,
}

impl VariableSet {
    pub fn new(var_type: VarType) -> Self {
        Self {
            var_type,
            vrefs: Vec::new(),
        }
    }

    pub fn push(&mut self, vr: u32) {
        self.vrefs.push(vr);
    }

    pub fn clear(&mut self) {
        self.vrefs.clear();
    }

    pub fn reserve(&mut self, additional: usize) {
        self.vrefs.reserve(additional);
    }

    pub fn len(&self) -> usize {
        self.vrefs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vrefs.is_empty()
    }

    pub fn value_refs(&self) -> &[u32] {
        &self.vrefs
    }

    pub fn var_type(&self) -> VarType {
        self.var_type
    }
}

/// Count categories understood by [`VariableCatalog::count`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountKind {
    Any,
    Inputs,
    Outputs,
    Parameters,
    Locals,
    States,
    Derivatives,
    InitialUnknowns,
    Units,
    Events,
    NonZero,
    MeObject,
    CsObject,
}

/// Parsed, queryable representation of everything declared in the FMU XML.
#[derive(Debug, Default)]
pub struct VariableCatalog {
    /// Header attributes, stored under both their exact and lower-cased names
    header: HashMap<String, String>,
    fmi_version: f64,
    /// Maximum output derivative order for co-simulation FMUs
    max_order: u32,
    capabilities: CapabilityFlags,
    variables: Vec<VariableInfo>,
    units: Vec<UnitInfo>,
    default_experiment: DefaultExperiment,
    /// name → index; the case-folded alias loses to the exact-case key on conflict
    lookup: HashMap<String, usize>,
    output_dep: DependencyMatrix,
    deriv_dep: DependencyMatrix,
    unknown_dep: DependencyMatrix,
    inputs: Vec<usize>,
    outputs: Vec<usize>,
    parameters: Vec<usize>,
    locals: Vec<usize>,
    states: Vec<usize>,
    derivatives: Vec<usize>,
    initial_unknowns: Vec<usize>,
    event_indicators: usize,
}

impl VariableCatalog {
    /// Parse the model description XML at `path`.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let xml = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&xml)
    }

    /// Build the catalog from a model description document.
    pub fn parse(xml: &str) -> Result<Self, Error> {
        let md = Fmi2ModelDescription::from_str(xml)?;
        Ok(Self::from_model_description(&md))
    }

    pub fn from_model_description(md: &Fmi2ModelDescription) -> Self {
        let mut catalog = Self::default();
        catalog.load_header(md);
        catalog.load_units(md);
        catalog.load_variables(md);
        catalog.load_structure(md);
        catalog
    }

    fn insert_header(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        let folded = key.to_lowercase();
        if folded != key {
            self.header.entry(folded).or_insert_with(|| value.clone());
        }
        self.header.insert(key.to_owned(), value);
    }

    fn load_header(&mut self, md: &Fmi2ModelDescription) {
        self.insert_header("fmiVersion", &md.fmi_version);
        self.insert_header("modelName", &md.model_name);
        self.insert_header("guid", &md.guid);
        if let Some(v) = &md.description {
            self.insert_header("description", v);
        }
        if let Some(v) = &md.author {
            self.insert_header("author", v);
        }
        if let Some(v) = &md.version {
            self.insert_header("version", v);
        }
        if let Some(v) = &md.copyright {
            self.insert_header("copyright", v);
        }
        if let Some(v) = &md.license {
            self.insert_header("license", v);
        }
        if let Some(v) = &md.generation_tool {
            self.insert_header("generationTool", v);
        }
        if let Some(v) = &md.generation_date_and_time {
            self.insert_header("generationDateAndTime", v);
        }
        self.fmi_version = md.fmi_version.parse().unwrap_or(2.0);
        self.event_indicators = md.num_event_indicators();

        if let Some(me) = &md.model_exchange {
            self.capabilities.set(Capability::ModelExchangeCapable, true);
            self.insert_header("MEIdentifier", &me.model_identifier);
            let caps = &mut self.capabilities;
            set_flag(caps, Capability::NeedsExecutionTool, me.needs_execution_tool);
            set_flag(
                caps,
                Capability::CompletedIntegratorStepNotNeeded,
                me.completed_integrator_step_not_needed,
            );
            set_flag(
                caps,
                Capability::CanBeInstantiatedOnlyOncePerProcess,
                me.can_be_instantiated_only_once_per_process,
            );
            set_flag(
                caps,
                Capability::CanNotUseMemoryManagementFunctions,
                me.can_not_use_memory_management_functions,
            );
            set_flag(caps, Capability::CanGetAndSetFmuState, me.can_get_and_set_fmu_state);
            set_flag(caps, Capability::CanSerializeFmuState, me.can_serialize_fmu_state);
            set_flag(
                caps,
                Capability::ProvidesDirectionalDerivative,
                me.provides_directional_derivative,
            );
        }
        if let Some(cs) = &md.co_simulation {
            self.capabilities.set(Capability::CoSimulationCapable, true);
            self.insert_header("CoSimIdentifier", &cs.model_identifier);
            self.max_order = cs.max_output_derivative_order.unwrap_or(0);
            let caps = &mut self.capabilities;
            set_flag(caps, Capability::NeedsExecutionTool, cs.needs_execution_tool);
            set_flag(
                caps,
                Capability::CanHandleVariableCommunicationStepSize,
                cs.can_handle_variable_communication_step_size,
            );
            set_flag(caps, Capability::CanInterpolateInputs, cs.can_interpolate_inputs);
            set_flag(caps, Capability::CanRunAsynchronously, cs.can_run_asynchronously);
            set_flag(
                caps,
                Capability::CanBeInstantiatedOnlyOncePerProcess,
                cs.can_be_instantiated_only_once_per_process,
            );
            set_flag(
                caps,
                Capability::CanNotUseMemoryManagementFunctions,
                cs.can_not_use_memory_management_functions,
            );
            set_flag(caps, Capability::CanGetAndSetFmuState, cs.can_get_and_set_fmu_state);
            set_flag(caps, Capability::CanSerializeFmuState, cs.can_serialize_fmu_state);
            set_flag(
                caps,
                Capability::ProvidesDirectionalDerivative,
                cs.provides_directional_derivative,
            );
        }

        if let Some(de) = &md.default_experiment {
            let defaults = DefaultExperiment::default();
            self.default_experiment = DefaultExperiment {
                start_time: de.start_time.unwrap_or(defaults.start_time),
                stop_time: de.stop_time.unwrap_or(defaults.stop_time),
                step_size: de.step_size.unwrap_or(defaults.step_size),
                tolerance: de.tolerance.unwrap_or(defaults.tolerance),
            };
        }
    }

    fn load_units(&mut self, md: &Fmi2ModelDescription) {
        let Some(defs) = &md.unit_definitions else {
            return;
        };
        self.units.reserve(defs.units.len());
        for unit in &defs.units {
            let mut info = UnitInfo {
                name: unit.name.clone(),
                factor: 1.0,
                offset: 0.0,
                ..Default::default()
            };
            if let Some(base) = &unit.base_unit {
                info.factor = base.factor.unwrap_or(1.0);
                info.offset = base.offset.unwrap_or(0.0);
                for (name, exponent) in [
                    ("kg", base.kg),
                    ("m", base.m),
                    ("s", base.s),
                    ("A", base.a),
                    ("K", base.k),
                    ("mol", base.mol),
                    ("cd", base.cd),
                    ("rad", base.rad),
                ] {
                    if let Some(exponent) = exponent {
                        info.base_units.push((name.to_owned(), exponent));
                    }
                }
            }
            for display in &unit.display_units {
                info.display_units.push(DisplayUnitInfo {
                    name: display.name.clone(),
                    factor: display.factor.unwrap_or(1.0),
                    offset: display.offset.unwrap_or(0.0),
                });
            }
            self.units.push(info);
        }
    }

    fn load_variables(&mut self, md: &Fmi2ModelDescription) {
        self.variables.reserve(md.num_variables());
        for (index, sv) in md.model_variables().enumerate() {
            let mut info = VariableInfo {
                index,
                name: sv.name.clone(),
                value_ref: sv.value_reference,
                causality: sv.causality,
                description: sv.description.clone(),
                initial: sv.initial,
                ..Default::default()
            };
            match &sv.elem {
                ScalarVariableElement::Real(real) => {
                    info.var_type = VarType::Real;
                    info.declared_type = real.declared_type.clone();
                    info.unit = real.unit.clone();
                    info.start = real.start.map(StartValue::Real);
                    info.min = real.min;
                    info.max = real.max;
                    info.derivative_of = real.derivative.map(|d| d as usize - 1);
                    info.reinit = real.reinit.unwrap_or(false);
                    info.variability = sv.variability.unwrap_or(Variability::Continuous);
                }
                ScalarVariableElement::Integer(int) => {
                    info.var_type = VarType::Integer;
                    info.declared_type = int.declared_type.clone();
                    info.start = int.start.map(StartValue::Integer);
                    info.min = int.min.map(f64::from);
                    info.max = int.max.map(f64::from);
                    info.variability = sv.variability.unwrap_or(Variability::Discrete);
                }
                ScalarVariableElement::Boolean(b) => {
                    info.var_type = VarType::Boolean;
                    info.declared_type = b.declared_type.clone();
                    info.start = b.start.map(StartValue::Boolean);
                    info.variability = sv.variability.unwrap_or(Variability::Discrete);
                }
                ScalarVariableElement::String(s) => {
                    info.var_type = VarType::String;
                    info.declared_type = s.declared_type.clone();
                    info.start = s.start.clone().map(StartValue::String);
                    info.variability = sv.variability.unwrap_or(Variability::Discrete);
                }
                ScalarVariableElement::Enumeration(e) => {
                    info.var_type = VarType::Enumeration;
                    info.declared_type = e.declared_type.clone();
                    info.start = e.start.map(StartValue::Integer);
                    info.min = e.min.map(f64::from);
                    info.max = e.max.map(f64::from);
                    info.variability = sv.variability.unwrap_or(Variability::Discrete);
                }
            }

            // The exact-case name always wins; the folded alias is a secondary detection
            // mechanism for purely lower-case spellings and may be shadowed.
            self.lookup.insert(info.name.clone(), index);
            self.lookup.entry(info.name.to_lowercase()).or_insert(index);

            match info.causality {
                Causality::Parameter | Causality::CalculatedParameter => {
                    self.parameters.push(index)
                }
                Causality::Input => self.inputs.push(index),
                Causality::Output => self.outputs.push(index),
                Causality::Local => self.locals.push(index),
                _ => {}
            }
            self.variables.push(info);
        }
    }

    fn load_structure(&mut self, md: &Fmi2ModelDescription) {
        let num_vars = self.variables.len();
        self.output_dep = DependencyMatrix::with_rows(num_vars);
        self.deriv_dep = DependencyMatrix::with_rows(num_vars);
        self.unknown_dep = DependencyMatrix::with_rows(num_vars);

        // The XML dependency rows are 1-indexed per the standard; storage is 0-indexed.
        let mut load = |unknowns: &[fmu_schema::VariableDependency],
                        store: &mut Vec<usize>,
                        matrix: &mut DependencyMatrix| {
            for unknown in unknowns {
                if unknown.index == 0 || unknown.index as usize > num_vars {
                    continue;
                }
                let row = unknown.index as usize - 1;
                store.push(row);
                for (pos, dep) in unknown.dependencies.iter().enumerate() {
                    if *dep == 0 {
                        continue;
                    }
                    let kind = unknown
                        .dependencies_kind
                        .get(pos)
                        .map(|k| DependencyKind::from(*k))
                        .unwrap_or(DependencyKind::Dependent);
                    matrix.assign(row, *dep as usize - 1, kind);
                }
            }
        };

        let mut outputs_rows = Vec::new();
        load(
            &md.model_structure.outputs.unknowns,
            &mut outputs_rows,
            &mut self.output_dep,
        );
        load(
            &md.model_structure.derivatives.unknowns,
            &mut self.derivatives,
            &mut self.deriv_dep,
        );
        load(
            &md.model_structure.initial_unknowns.unknowns,
            &mut self.initial_unknowns,
            &mut self.unknown_dep,
        );

        // Derivative rows back-reference the states they differentiate.
        for der in &self.derivatives {
            if let Some(state) = self.variables[*der].derivative_of {
                self.states.push(state);
            }
        }
    }

    pub fn check_flag(&self, flag: Capability) -> bool {
        self.capabilities.check(flag)
    }

    pub fn fmi_version(&self) -> f64 {
        self.fmi_version
    }

    pub fn max_derivative_order(&self) -> u32 {
        self.max_order
    }

    pub fn default_experiment(&self) -> &DefaultExperiment {
        &self.default_experiment
    }

    /// Header attribute lookup; unknown fields return an empty string.
    pub fn get_string(&self, field: &str) -> &str {
        self.header.get(field).map(String::as_str).unwrap_or("")
    }

    /// Real-valued header lookup (version, start, stop, step, tolerance).
    pub fn get_real(&self, field: &str) -> Option<f64> {
        match field.to_lowercase().as_str() {
            "version" => Some(self.fmi_version),
            "start" | "starttime" => Some(self.default_experiment.start_time),
            "stop" | "stoptime" => Some(self.default_experiment.stop_time),
            "step" | "stepsize" => Some(self.default_experiment.step_size),
            "tolerance" => Some(self.default_experiment.tolerance),
            _ => None,
        }
    }

    pub fn model_name(&self) -> &str {
        self.get_string("modelName")
    }

    pub fn guid(&self) -> &str {
        self.get_string("guid")
    }

    /// Model identifier for the requested interface kind
    pub fn model_identifier(&self, kind: crate::FmuKind) -> &str {
        match kind {
            crate::FmuKind::ModelExchange => self.get_string("MEIdentifier"),
            crate::FmuKind::CoSimulation => self.get_string("CoSimIdentifier"),
        }
    }

    pub fn variables(&self) -> &[VariableInfo] {
        &self.variables
    }

    pub fn units(&self) -> &[UnitInfo] {
        &self.units
    }

    /// Look up a variable by name: exact case first, then case-folded. A miss returns `None`,
    /// never panics.
    pub fn variable_by_name(&self, name: &str) -> Option<&VariableInfo> {
        let index = match self.lookup.get(name) {
            Some(index) => Some(index),
            None => self.lookup.get(&name.to_lowercase()),
        }?;
        self.variables.get(*index)
    }

    /// Bounds-checked index lookup.
    pub fn variable_by_index(&self, index: usize) -> Option<&VariableInfo> {
        self.variables.get(index)
    }

    pub fn count(&self, kind: CountKind) -> usize {
        match kind {
            CountKind::Any => self.variables.len(),
            CountKind::Inputs => self.inputs.len(),
            CountKind::Outputs => self.outputs.len(),
            CountKind::Parameters => self.parameters.len(),
            CountKind::Locals => self.locals.len(),
            CountKind::States => self.states.len(),
            CountKind::Derivatives => self.derivatives.len(),
            CountKind::InitialUnknowns => self.initial_unknowns.len(),
            CountKind::Units => self.units.len(),
            CountKind::Events => self.event_indicators,
            CountKind::NonZero => self.deriv_dep.len(),
            CountKind::MeObject => self.check_flag(Capability::ModelExchangeCapable) as usize,
            CountKind::CsObject => self.check_flag(Capability::CoSimulationCapable) as usize,
        }
    }

    /// Names of the variables in a category, ordered by declaration index. Accepts a causality
    /// name ("input", "output", "parameter", "local", "independent"), "state" or "any".
    pub fn variable_names(&self, category: &str) -> Vec<String> {
        if category == "state" {
            return self
                .states
                .iter()
                .map(|index| self.variables[*index].name.clone())
                .collect();
        }
        let causality = match category {
            "any" => None,
            other => match other.parse::<Causality>() {
                Ok(c) => Some(c),
                Err(_) => return Vec::new(),
            },
        };
        self.variables
            .iter()
            .filter(|var| causality.map_or(true, |c| var.causality == c))
            .map(|var| var.name.clone())
            .collect()
    }

    /// Index vector of a category, ordered by declaration index.
    pub fn variable_indices(&self, category: &str) -> &[usize] {
        match category {
            "state" => &self.states,
            "deriv" => &self.derivatives,
            "parameter" => &self.parameters,
            "input" | "inputs" => &self.inputs,
            "output" | "outputs" => &self.outputs,
            "local" => &self.locals,
            "unknown" => &self.initial_unknowns,
            _ => &[],
        }
    }

    /// Collect value references for the listed names; names with value reference 0 and unknown
    /// names are silently dropped.
    pub fn reference_set(&self, names: &[impl AsRef<str>]) -> VariableSet {
        let mut set = VariableSet::default();
        for name in names {
            if let Some(var) = self.variable_by_name(name.as_ref()) {
                if var.value_ref > 0 {
                    set.push(var.value_ref);
                }
            }
        }
        set
    }

    /// Value references of the declared outputs.
    pub fn output_reference(&self) -> VariableSet {
        let mut set = VariableSet::default();
        set.reserve(self.outputs.len());
        for index in &self.outputs {
            set.push(self.variables[*index].value_ref);
        }
        set
    }

    /// Value references of the declared inputs.
    pub fn input_reference(&self) -> VariableSet {
        let mut set = VariableSet::default();
        set.reserve(self.inputs.len());
        for index in &self.inputs {
            set.push(self.variables[*index].value_ref);
        }
        set
    }

    pub fn output_dependencies(&self, variable_index: usize) -> &[(usize, DependencyKind)] {
        self.output_dep.row(variable_index)
    }

    pub fn derivative_dependencies(&self, variable_index: usize) -> &[(usize, DependencyKind)] {
        self.deriv_dep.row(variable_index)
    }

    pub fn initial_unknown_dependencies(
        &self,
        variable_index: usize,
    ) -> &[(usize, DependencyKind)] {
        self.unknown_dep.row(variable_index)
    }
}

fn set_flag(caps: &mut CapabilityFlags, flag: Capability, value: Option<bool>) {
    if let Some(value) = value {
        caps.set(flag, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEEDTHROUGH: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<fmiModelDescription fmiVersion="2.0" modelName="Feedthrough" guid="{feed1234}">
  <CoSimulation modelIdentifier="Feedthrough" canHandleVariableCommunicationStepSize="true"/>
  <DefaultExperiment startTime="0" stopTime="2" stepSize="0.1"/>
  <UnitDefinitions>
    <Unit name="m/s2"><BaseUnit m="1" s="-2" factor="1"/></Unit>
  </UnitDefinitions>
  <ModelVariables>
    <ScalarVariable name="Float64_continuous_input" valueReference="1" causality="input">
      <Real start="0"/>
    </ScalarVariable>
    <ScalarVariable name="Float64_continuous_output" valueReference="2" causality="output">
      <Real/>
    </ScalarVariable>
    <ScalarVariable name="Int32_input" valueReference="3" causality="input">
      <Integer start="0"/>
    </ScalarVariable>
    <ScalarVariable name="String_parameter" valueReference="4" causality="parameter" variability="fixed">
      <String start="Set me!"/>
    </ScalarVariable>
    <ScalarVariable name="Internal" valueReference="5" causality="local">
      <Real/>
    </ScalarVariable>
  </ModelVariables>
  <ModelStructure>
    <Outputs><Unknown index="2" dependencies="1" dependenciesKind="dependent"/></Outputs>
  </ModelStructure>
</fmiModelDescription>"##;

    fn catalog() -> VariableCatalog {
        VariableCatalog::parse(FEEDTHROUGH).unwrap()
    }

    #[test]
    fn test_name_and_index_lookup_agree() {
        let cat = catalog();
        for (index, var) in cat.variables().iter().enumerate() {
            let by_name = cat.variable_by_name(&var.name).unwrap();
            assert_eq!(by_name.index, index);
            assert_eq!(
                cat.variable_by_index(index).unwrap().value_ref,
                by_name.value_ref
            );
        }
        assert!(cat.variable_by_name("no_such_variable").is_none());
        assert!(cat.variable_by_index(99).is_none());
    }

    #[test]
    fn test_case_folded_alias() {
        let cat = catalog();
        let exact = cat.variable_by_name("Float64_continuous_input").unwrap();
        let folded = cat.variable_by_name("float64_continuous_input").unwrap();
        assert_eq!(exact.index, folded.index);
    }

    #[test]
    fn test_counts_and_categories() {
        let cat = catalog();
        assert_eq!(cat.count(CountKind::Any), 5);
        assert_eq!(cat.count(CountKind::Inputs), 2);
        assert_eq!(cat.count(CountKind::Outputs), 1);
        assert_eq!(cat.count(CountKind::Parameters), 1);
        assert_eq!(cat.count(CountKind::Locals), 1);
        assert_eq!(cat.count(CountKind::Units), 1);
        assert_eq!(cat.count(CountKind::CsObject), 1);
        assert_eq!(cat.count(CountKind::MeObject), 0);
        assert_eq!(cat.variable_indices("input"), &[0, 2]);
        assert_eq!(cat.variable_indices("output"), &[1]);
        assert_eq!(
            cat.variable_names("input"),
            vec!["Float64_continuous_input", "Int32_input"]
        );
        assert_eq!(cat.variable_names("any").len(), 5);
    }

    #[test]
    fn test_variability_defaults() {
        let cat = catalog();
        assert_eq!(
            cat.variable_by_name("Float64_continuous_input")
                .unwrap()
                .variability,
            Variability::Continuous
        );
        assert_eq!(
            cat.variable_by_name("Int32_input").unwrap().variability,
            Variability::Discrete
        );
    }

    #[test]
    fn test_reference_sets() {
        let cat = catalog();
        let outputs = cat.output_reference();
        assert_eq!(outputs.value_refs(), &[2]);
        let inputs = cat.input_reference();
        assert_eq!(inputs.value_refs(), &[1, 3]);

        // vr 0 and unknown names are dropped silently
        let set = cat.reference_set(&["Float64_continuous_input", "missing", "Internal"]);
        assert_eq!(set.value_refs(), &[1, 5]);
    }

    #[test]
    fn test_dependency_indexing() {
        let cat = catalog();
        // XML row 2 (the output) is stored 0-indexed
        let deps = cat.output_dependencies(1);
        assert_eq!(deps, &[(0, DependencyKind::Dependent)]);
        assert!(cat.output_dependencies(0).is_empty());
        assert!(cat.output_dependencies(999).is_empty());
    }

    #[test]
    fn test_header_and_experiment() {
        let cat = catalog();
        assert_eq!(cat.guid(), "{feed1234}");
        assert_eq!(cat.get_string("cosimidentifier"), "Feedthrough");
        assert_eq!(
            cat.model_identifier(crate::FmuKind::CoSimulation),
            "Feedthrough"
        );
        assert_eq!(cat.get_real("stepsize"), Some(0.1));
        assert_eq!(cat.default_experiment().stop_time, 2.0);
        assert_eq!(cat.default_experiment().tolerance, 1e-8);
        assert!(cat.check_flag(Capability::CanHandleVariableCommunicationStepSize));
        assert!(!cat.check_flag(Capability::CanGetAndSetFmuState));
    }

    #[test]
    fn test_states_from_derivative_backlinks() {
        let xml = r##"<fmiModelDescription fmiVersion="2.0" modelName="ball" guid="g">
  <ModelExchange modelIdentifier="ball"/>
  <ModelVariables>
    <ScalarVariable name="h" valueReference="1" causality="output"><Real start="1"/></ScalarVariable>
    <ScalarVariable name="der(h)" valueReference="2" causality="local"><Real derivative="1"/></ScalarVariable>
  </ModelVariables>
  <ModelStructure>
    <Derivatives><Unknown index="2"/></Derivatives>
  </ModelStructure>
</fmiModelDescription>"##;
        let cat = VariableCatalog::parse(xml).unwrap();
        assert_eq!(cat.count(CountKind::Derivatives), 1);
        assert_eq!(cat.count(CountKind::States), 1);
        assert_eq!(cat.variable_indices("state"), &[0]);
        assert_eq!(cat.variable_names("state"), vec!["h"]);
    }
}
