//! Parse a complete co-simulation model description.

use std::str::FromStr;

use fmu_schema::{Causality, Fmi2ModelDescription, ScalarVariableElement, Variability};

const BOUNCING_BALL: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<fmiModelDescription
  fmiVersion="2.0"
  modelName="BouncingBall"
  guid="{8c4e810f-3da3-4a00-8276-176fa3c9f003}"
  description="This model calculates the trajectory, over time, of a ball dropped from a height of 1 m."
  generationTool="Reference FMUs"
  numberOfEventIndicators="1">
  <ModelExchange modelIdentifier="BouncingBall" canGetAndSetFMUstate="true" canSerializeFMUstate="true"/>
  <CoSimulation modelIdentifier="BouncingBall" canHandleVariableCommunicationStepSize="true"
    canGetAndSetFMUstate="true" canSerializeFMUstate="true"/>
  <LogCategories>
    <Category name="logEvents" description="Log events"/>
    <Category name="logStatusError" description="Log error messages"/>
  </LogCategories>
  <DefaultExperiment startTime="0" stopTime="3" stepSize="1e-2"/>
  <ModelVariables>
    <ScalarVariable name="time" valueReference="0" causality="independent" variability="continuous" description="Simulation time">
      <Real/>
    </ScalarVariable>
    <ScalarVariable name="h" valueReference="1" causality="output" variability="continuous" initial="exact" description="Position of the ball">
      <Real start="1" reinit="true"/>
    </ScalarVariable>
    <ScalarVariable name="der(h)" valueReference="2" causality="local" variability="continuous" initial="calculated" description="Derivative of h">
      <Real derivative="2"/>
    </ScalarVariable>
    <ScalarVariable name="v" valueReference="3" causality="output" variability="continuous" initial="exact" description="Velocity of the ball">
      <Real start="0" reinit="true"/>
    </ScalarVariable>
    <ScalarVariable name="der(v)" valueReference="4" causality="local" variability="continuous" initial="calculated" description="Derivative of v">
      <Real derivative="4"/>
    </ScalarVariable>
    <ScalarVariable name="g" valueReference="5" causality="parameter" variability="fixed" initial="exact" description="Gravity acting on the ball">
      <Real start="-9.81"/>
    </ScalarVariable>
    <ScalarVariable name="e" valueReference="6" causality="parameter" variability="tunable" initial="exact" description="Coefficient of restitution">
      <Real start="0.7" min="0.5" max="1"/>
    </ScalarVariable>
  </ModelVariables>
  <ModelStructure>
    <Outputs>
      <Unknown index="2"/>
      <Unknown index="4"/>
    </Outputs>
    <Derivatives>
      <Unknown index="3"/>
      <Unknown index="5"/>
    </Derivatives>
    <InitialUnknowns>
      <Unknown index="3"/>
      <Unknown index="5"/>
    </InitialUnknowns>
  </ModelStructure>
</fmiModelDescription>"##;

#[test]
fn test_bouncing_ball_model_description() {
    let md = Fmi2ModelDescription::from_str(BOUNCING_BALL).unwrap();

    assert_eq!(md.fmi_version, "2.0");
    assert_eq!(md.model_name, "BouncingBall");
    assert!(md.model_exchange.is_some());
    let cs = md.co_simulation.as_ref().unwrap();
    assert_eq!(cs.model_identifier, "BouncingBall");
    assert_eq!(cs.can_handle_variable_communication_step_size, Some(true));

    let de = md.default_experiment.as_ref().unwrap();
    assert_eq!(de.start_time, Some(0.0));
    assert_eq!(de.stop_time, Some(3.0));
    assert_eq!(de.step_size, Some(1e-2));
    assert_eq!(de.tolerance, None);

    assert_eq!(md.num_variables(), 7);
    assert_eq!(md.num_states(), 2);
    assert_eq!(md.num_event_indicators(), 1);

    let log_categories = md.log_categories.as_ref().unwrap();
    assert_eq!(log_categories.categories.len(), 2);
    assert_eq!(log_categories.categories[0].name, "logEvents");

    let h = md.model_variable_by_name("h").unwrap();
    assert_eq!(h.value_reference, 1);
    assert_eq!(h.causality, Causality::Output);
    assert_eq!(h.variability, Some(Variability::Continuous));
    let ScalarVariableElement::Real(real) = &h.elem else {
        panic!("h should be Real");
    };
    assert_eq!(real.start, Some(1.0));
    assert_eq!(real.reinit, Some(true));

    let e = md.model_variable_by_name("e").unwrap();
    let ScalarVariableElement::Real(real) = &e.elem else {
        panic!("e should be Real");
    };
    assert_eq!(real.min, Some(0.5));
    assert_eq!(real.max, Some(1.0));

    let time = md.model_variable_by_name("time").unwrap();
    assert_eq!(time.causality, Causality::Independent);
}
