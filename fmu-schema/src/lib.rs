#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![deny(clippy::all)]

use thiserror::Error;

mod interface_type;
mod model_description;
mod scalar_variable;
mod r#type;
mod unit;
mod utils;
mod variable_dependency;

pub use interface_type::*;
pub use model_description::*;
pub use r#type::*;
pub use scalar_variable::*;
pub use unit::*;
pub use variable_dependency::*;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Variable {0} not found")]
    VariableNotFound(String),

    #[error("Error parsing XML: {0}")]
    XmlParse(String),
}
