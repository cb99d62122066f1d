/// Defaults a [`SimpleType`] provides for the Real variables that reference it.
#[derive(Default, Debug, PartialEq, hard_xml::XmlRead, hard_xml::XmlWrite)]
#[xml(tag = "Real")]
pub struct RealType {
    #[xml(attr = "quantity")]
    pub quantity: Option<String>,

    #[xml(attr = "unit")]
    pub unit: Option<String>,

    /// Default display unit; the conversion from "unit" must be defined in
    /// UnitDefinitions / Unit / DisplayUnit.
    #[xml(attr = "displayUnit")]
    pub display_unit: Option<String>,

    /// If true, the offset of the display unit must be ignored.
    #[xml(attr = "relativeQuantity")]
    pub relative_quantity: Option<bool>,

    #[xml(attr = "min")]
    pub min: Option<f64>,

    /// max >= min required
    #[xml(attr = "max")]
    pub max: Option<f64>,

    /// nominal >= min and <= max required
    #[xml(attr = "nominal")]
    pub nominal: Option<f64>,

    /// True for quantities without a meaningful bound, e.g. a crank angle.
    #[xml(attr = "unbounded")]
    pub unbounded: Option<bool>,
}

/// Defaults a [`SimpleType`] provides for the Integer variables that reference it.
#[derive(Default, Debug, PartialEq, hard_xml::XmlRead, hard_xml::XmlWrite)]
#[xml(tag = "Integer")]
pub struct IntegerType {
    #[xml(attr = "quantity")]
    pub quantity: Option<String>,

    #[xml(attr = "min")]
    pub min: Option<i32>,

    /// max >= min required
    #[xml(attr = "max")]
    pub max: Option<i32>,
}

#[derive(Debug, PartialEq, hard_xml::XmlRead, hard_xml::XmlWrite)]
pub enum SimpleTypeElement {
    #[xml(tag = "Real")]
    Real(RealType),
    #[xml(tag = "Integer")]
    Integer(IntegerType),
    #[xml(tag = "Boolean")]
    Boolean,
    #[xml(tag = "String")]
    String,
    #[xml(tag = "Enumeration")]
    Enumeration,
}

impl Default for SimpleTypeElement {
    fn default() -> Self {
        Self::Real(RealType::default())
    }
}

#[derive(Default, Debug, PartialEq, hard_xml::XmlRead, hard_xml::XmlWrite)]
#[xml(tag = "SimpleType")]
/// Type attributes of a scalar variable
pub struct SimpleType {
    /// Name of SimpleType element. "name" must be unique with respect to all other elements of the
    /// TypeDefinitions list and different from all ScalarVariable names.
    #[xml(attr = "name")]
    pub name: String,

    #[xml(attr = "description")]
    pub description: Option<String>,

    #[xml(
        child = "Real",
        child = "Integer",
        child = "Boolean",
        child = "String",
        child = "Enumeration"
    )]
    pub elem: SimpleTypeElement,
}

#[cfg(test)]
mod tests {
    use hard_xml::XmlRead;

    use super::*;

    #[test]
    fn test_simple_type() {
        let xml = r#"
        <SimpleType name="Acceleration">
            <Real quantity="Acceleration" unit="m/s2"/>
        </SimpleType>"#;

        let simple_type = SimpleType::from_str(xml).unwrap();
        assert_eq!(simple_type.name, "Acceleration");
        assert_eq!(simple_type.description, None);
        assert_eq!(
            simple_type.elem,
            SimpleTypeElement::Real(RealType {
                quantity: Some("Acceleration".to_owned()),
                unit: Some("m/s2".to_owned()),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_integer_type_bounds() {
        let xml = r#"
        <SimpleType name="Counter" description="A bounded counter">
            <Integer min="0" max="255"/>
        </SimpleType>"#;

        let simple_type = SimpleType::from_str(xml).unwrap();
        assert_eq!(simple_type.description.as_deref(), Some("A bounded counter"));
        assert_eq!(
            simple_type.elem,
            SimpleTypeElement::Integer(IntegerType {
                quantity: None,
                min: Some(0),
                max: Some(255),
            })
        );
    }
}
