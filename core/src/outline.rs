//! Serializable outline of a derived command-line surface.
//!
//! Useful for introspection tooling and snapshot tests:
//!
//! ```
//! use cfgspec_core::*;
//!
//! struct Opts {
//!     verbose: bool,
//! }
//!
//! impl ConfigGroup for Opts {
//!     fn declare(fields: &mut Fields<Self>) {
//!         fields.arg("verbose", Arg::<bool>::new("Chatty output").names(["-v", "--verbose"]));
//!     }
//!
//!     fn construct(values: &mut FieldValues) -> Result<Self, DefinitionError> {
//!         Ok(Self { verbose: values.take("verbose")? })
//!     }
//! }
//!
//! let outline = Specification::build::<Opts>().unwrap().outline();
//! let json = outline.to_json().unwrap();
//! assert!(json.contains("\"BooleanFlag\""));
//! assert!(json.contains("\"--verbose\""));
//! ```

use serde::Serialize;

use crate::descriptor::{OptionDescriptor, Polarity, Shape};
use crate::spec::{GroupPolicy, Specification};
use crate::value::Value;

/// Outline of a specification level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecOutline {
    pub schema: String,
    pub policy: GroupPolicy,
    pub members: Vec<MemberOutline>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupOutline>,
}

/// Outline of one option descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberOutline {
    pub name: String,
    pub shape: Shape,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub option_names: Vec<String>,
    pub help: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metavar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polarity: Option<Polarity>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub transformed: bool,
}

/// Outline of a nested group and the field it fills.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupOutline {
    pub field: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub reduced: bool,
    pub spec: SpecOutline,
}

impl SpecOutline {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// YAML rendering.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

impl From<&OptionDescriptor> for MemberOutline {
    fn from(descriptor: &OptionDescriptor) -> Self {
        Self {
            name: descriptor.name().to_string(),
            shape: descriptor.shape(),
            kind: descriptor.scalar_kind().map(|kind| kind.to_string()),
            option_names: descriptor.option_names().to_vec(),
            help: descriptor.help().to_string(),
            metavar: descriptor.metavar().map(str::to_string),
            choices: descriptor.choices().map(<[Value]>::to_vec),
            default: descriptor.default().cloned(),
            required: descriptor.is_required(),
            polarity: descriptor.polarity(),
            transformed: descriptor.is_transformed(),
        }
    }
}

impl Specification {
    /// Describes this specification as plain serializable data.
    pub fn outline(&self) -> SpecOutline {
        SpecOutline {
            schema: self.schema_name().to_string(),
            policy: self.policy(),
            members: self.members().iter().map(MemberOutline::from).collect(),
            groups: self
                .subspecs()
                .iter()
                .map(|sub| GroupOutline {
                    field: sub.name().to_string(),
                    reduced: sub.is_reduced(),
                    spec: sub.spec().outline(),
                })
                .collect(),
        }
    }
}
