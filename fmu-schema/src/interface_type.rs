#[derive(Default, Debug, hard_xml::XmlRead, hard_xml::XmlWrite)]
#[xml(tag = "File", strict(unknown_attribute, unknown_element))]
pub struct File {
    /// Name of the file including the path relative to the sources directory, using the forward
    /// slash as separator (for example: name = "myFMU.c"; name = "modelExchange/solve.c")
    #[xml(attr = "name")]
    pub name: String,
}

#[derive(Default, Debug, hard_xml::XmlRead, hard_xml::XmlWrite)]
#[xml(tag = "SourceFiles", strict(unknown_attribute, unknown_element))]
pub struct SourceFiles {
    #[xml(child = "File")]
    pub files: Vec<File>,
}

/// The FMU includes a model or the communication to a tool that provides a model. The environment
/// provides the simulation engine for the model.
#[derive(Default, Debug, hard_xml::XmlRead, hard_xml::XmlWrite)]
#[xml(tag = "ModelExchange")]
pub struct ModelExchange {
    /// Short class name according to C-syntax
    #[xml(attr = "modelIdentifier")]
    pub model_identifier: String,

    /// If true, a tool is needed to execute the model and the FMU just contains the communication
    /// to this tool.
    #[xml(attr = "needsExecutionTool")]
    pub needs_execution_tool: Option<bool>,

    #[xml(attr = "completedIntegratorStepNotNeeded")]
    pub completed_integrator_step_not_needed: Option<bool>,

    #[xml(attr = "canBeInstantiatedOnlyOncePerProcess")]
    pub can_be_instantiated_only_once_per_process: Option<bool>,

    #[xml(attr = "canNotUseMemoryManagementFunctions")]
    pub can_not_use_memory_management_functions: Option<bool>,

    #[xml(attr = "canGetAndSetFMUstate")]
    pub can_get_and_set_fmu_state: Option<bool>,

    #[xml(attr = "canSerializeFMUstate")]
    pub can_serialize_fmu_state: Option<bool>,

    /// If true, the directional derivative of the equations can be computed with
    /// fmi2GetDirectionalDerivative
    #[xml(attr = "providesDirectionalDerivative")]
    pub provides_directional_derivative: Option<bool>,

    #[xml(child = "SourceFiles")]
    pub source_files: Option<SourceFiles>,
}

/// The FMU advances itself in communication steps; the host calls fmi2DoStep.
#[derive(Default, Debug, hard_xml::XmlRead, hard_xml::XmlWrite)]
#[xml(tag = "CoSimulation")]
pub struct CoSimulation {
    /// Short class name according to C-syntax
    #[xml(attr = "modelIdentifier")]
    pub model_identifier: String,

    #[xml(attr = "needsExecutionTool")]
    pub needs_execution_tool: Option<bool>,

    #[xml(attr = "canHandleVariableCommunicationStepSize")]
    pub can_handle_variable_communication_step_size: Option<bool>,

    #[xml(attr = "canInterpolateInputs")]
    pub can_interpolate_inputs: Option<bool>,

    #[xml(attr = "maxOutputDerivativeOrder")]
    pub max_output_derivative_order: Option<u32>,

    /// Note: the FMI 2.0 XSD misspells this attribute; FMUs in the wild follow the XSD.
    #[xml(attr = "canRunAsynchronuously")]
    pub can_run_asynchronously: Option<bool>,

    #[xml(attr = "canBeInstantiatedOnlyOncePerProcess")]
    pub can_be_instantiated_only_once_per_process: Option<bool>,

    #[xml(attr = "canNotUseMemoryManagementFunctions")]
    pub can_not_use_memory_management_functions: Option<bool>,

    #[xml(attr = "canGetAndSetFMUstate")]
    pub can_get_and_set_fmu_state: Option<bool>,

    #[xml(attr = "canSerializeFMUstate")]
    pub can_serialize_fmu_state: Option<bool>,

    /// Directional derivatives at communication points
    #[xml(attr = "providesDirectionalDerivative")]
    pub provides_directional_derivative: Option<bool>,

    #[xml(child = "SourceFiles")]
    pub source_files: Option<SourceFiles>,
}

#[cfg(test)]
mod tests {
    use hard_xml::XmlRead;

    use super::*;

    #[test]
    fn test_model_exchange() {
        let s = r##"<ModelExchange modelIdentifier="MyLibrary_SpringMassDamper"/>"##;
        let me = ModelExchange::from_str(s).unwrap();
        assert!(me.model_identifier == "MyLibrary_SpringMassDamper");
    }

    #[test]
    fn test_co_simulation() {
        let s = r##"<CoSimulation modelIdentifier="BouncingBall"
            canHandleVariableCommunicationStepSize="true"
            canGetAndSetFMUstate="true" canSerializeFMUstate="true"/>"##;
        let cs = CoSimulation::from_str(s).unwrap();
        assert_eq!(cs.model_identifier, "BouncingBall");
        assert_eq!(cs.can_handle_variable_communication_step_size, Some(true));
        assert_eq!(cs.max_output_derivative_order, None);
    }
}
