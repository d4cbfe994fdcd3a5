mod rules;
mod validator;

pub use rules::{DatasetType, PropertyRule, Schema, ValueType};
pub use validator::{SchemaReport, SchemaValidator};
