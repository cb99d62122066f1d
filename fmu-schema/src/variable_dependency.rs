use std::{fmt::Display, str::FromStr};

use crate::utils::AttrList;

/// Dependency of a scalar Unknown from Knowns in Continuous-Time and Event Mode (ModelExchange),
/// and at Communication Points (CoSimulation): Unknown=f(Known_1, Known_2, ...).
#[derive(Default, PartialEq, Debug)]
pub struct VariableDependency {
    /// ScalarVariable index of the Unknown (1-based, per the standard)
    pub index: u32,

    /// If not present, the Unknown depends on all Knowns. If present as an empty list, the
    /// Unknown depends on none of the Knowns. Otherwise the Unknown depends on the Knowns with
    /// the given ScalarVariable indices (1-based).
    pub dependencies: Vec<u32>,

    /// If present, must have the same number of entries as [`Self::dependencies`].
    pub dependencies_kind: Vec<DependenciesKind>,
}

// Hand-rolled XmlRead/XmlWrite because the dependency attributes are space-separated lists.
impl<'__input> ::hard_xml::XmlRead<'__input> for VariableDependency {
    fn from_reader(reader: &mut ::hard_xml::XmlReader<'__input>) -> ::hard_xml::XmlResult<Self> {
        use ::hard_xml::xmlparser::{ElementEnd, Token};
        use ::hard_xml::XmlError;

        let mut index = None;
        let mut dependencies = Vec::new();
        let mut dependencies_kind = Vec::new();

        let tag = reader
            .find_element_start(None)?
            .expect("Expected start element");
        let _ = reader.next().unwrap()?;

        while let Some((key, value)) = reader.find_attribute()? {
            match key {
                "index" => {
                    index = Some(
                        <u32 as FromStr>::from_str(&value)
                            .map_err(|e| XmlError::FromStr(e.into()))?,
                    );
                }
                "dependencies" => {
                    dependencies = <AttrList<u32> as FromStr>::from_str(&value)
                        .map_err(|e| XmlError::FromStr(e.into()))?
                        .0;
                }
                "dependenciesKind" => {
                    dependencies_kind = <AttrList<DependenciesKind> as FromStr>::from_str(&value)
                        .map_err(|e| XmlError::FromStr(e.into()))?
                        .0;
                }
                key => {
                    return Err(XmlError::UnknownField {
                        name: "VariableDependency".to_owned(),
                        field: key.to_owned(),
                    });
                }
            }
        }

        let index = index.ok_or(XmlError::MissingField {
            name: "VariableDependency".to_owned(),
            field: "index".to_owned(),
        })?;

        if let Token::ElementEnd {
            end: ElementEnd::Empty,
            ..
        } = reader.next().unwrap()?
        {
            return Ok(VariableDependency {
                index,
                dependencies,
                dependencies_kind,
            });
        }

        if let Some(tag) = reader.find_element_start(Some(tag))? {
            return Err(XmlError::UnknownField {
                name: "VariableDependency".to_owned(),
                field: tag.to_owned(),
            });
        }

        Ok(VariableDependency {
            index,
            dependencies,
            dependencies_kind,
        })
    }
}

impl ::hard_xml::XmlWrite for VariableDependency {
    fn to_writer<W: std::io::Write>(
        &self,
        writer: &mut ::hard_xml::XmlWriter<W>,
    ) -> ::hard_xml::XmlResult<()> {
        writer.write_element_start("Unknown")?;
        writer.write_attribute("index", &format!("{}", self.index))?;

        if !self.dependencies.is_empty() {
            writer.write_attribute(
                "dependencies",
                &format!("{}", AttrList(self.dependencies.clone())),
            )?;
        }

        if !self.dependencies_kind.is_empty() {
            writer.write_attribute(
                "dependenciesKind",
                &format!("{}", AttrList(self.dependencies_kind.clone())),
            )?;
        }

        writer.write_element_end_empty()?;
        Ok(())
    }
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub enum DependenciesKind {
    #[default]
    Dependent,
    Constant,
    Fixed,
    Tunable,
    Discrete,
}

impl FromStr for DependenciesKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dependent" => Ok(DependenciesKind::Dependent),
            "constant" => Ok(DependenciesKind::Constant),
            "fixed" => Ok(DependenciesKind::Fixed),
            "tunable" => Ok(DependenciesKind::Tunable),
            "discrete" => Ok(DependenciesKind::Discrete),
            _ => Err(format!("Invalid DependenciesKind: {}", s)),
        }
    }
}

impl Display for DependenciesKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DependenciesKind::Dependent => "dependent",
            DependenciesKind::Constant => "constant",
            DependenciesKind::Fixed => "fixed",
            DependenciesKind::Tunable => "tunable",
            DependenciesKind::Discrete => "discrete",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use hard_xml::XmlRead;

    use super::*;

    #[test]
    fn test_dependencies() {
        let unk = VariableDependency::from_str(
            r#"<Unknown index="3" dependencies="1 2" dependenciesKind="dependent fixed"/>"#,
        )
        .unwrap();
        assert_eq!(unk.index, 3);
        assert_eq!(unk.dependencies, vec![1, 2]);
        assert_eq!(
            unk.dependencies_kind,
            vec![DependenciesKind::Dependent, DependenciesKind::Fixed]
        );
    }

    #[test]
    fn test_no_dependencies() {
        let unk = VariableDependency::from_str(r#"<Unknown index="4"/>"#).unwrap();
        assert_eq!(unk.index, 4);
        assert!(unk.dependencies.is_empty());
        assert!(unk.dependencies_kind.is_empty());
    }
}
