//! Derive a command-line surface from typed configuration groups.
//!
//! A configuration group is a plain Rust type implementing [`ConfigGroup`].
//! Its declared fields drive the command line:
//!
//! - [`Arg`] customizes one leaf field (help, option names, positional,
//!   choices, default, transform).
//! - [`classify`] turns the field's raw type into an [`OptionDescriptor`]
//!   with one of six [`Shape`]s.
//! - [`Specification::build`] walks the group, nested groups included, and
//!   rejects anything the command line cannot express with a
//!   [`DefinitionError`].
//! - [`ParserAdapter`] registers the specification on a tokenizer;
//!   [`ClapAdapter`] is the bundled one.
//! - [`reconstruct`] turns the tokenized [`Namespace`] back into a validated
//!   instance.
//!
//! [`parse`] and [`parse_with_submodes`] (or a configured [`CfgParser`]) run
//! the whole pipeline.
//!
//! # Example
//!
//! ```
//! use cfgspec_core::*;
//!
//! struct Verbosity {
//!     debug: bool,
//!     quiet: bool,
//! }
//!
//! impl ConfigGroup for Verbosity {
//!     fn declare(fields: &mut Fields<Self>) {
//!         fields
//!             .arg("debug", Arg::<bool>::new("Show debug output"))
//!             .arg("quiet", Arg::<bool>::new("Show no output"));
//!     }
//!
//!     fn construct(values: &mut FieldValues) -> Result<Self, DefinitionError> {
//!         Ok(Self {
//!             debug: values.take("debug")?,
//!             quiet: values.take("quiet")?,
//!         })
//!     }
//!
//!     fn group_policy() -> GroupPolicy {
//!         GroupPolicy::MutuallyExclusive
//!     }
//! }
//!
//! struct Config {
//!     count: u32,
//!     verbosity: Verbosity,
//! }
//!
//! impl ConfigGroup for Config {
//!     fn declare(fields: &mut Fields<Self>) {
//!         fields
//!             .arg("count", Arg::new("Number of runs").names(["-c", "--count"]).default(1_u32))
//!             .group::<Verbosity>("verbosity");
//!     }
//!
//!     fn construct(values: &mut FieldValues) -> Result<Self, DefinitionError> {
//!         Ok(Self {
//!             count: values.take("count")?,
//!             verbosity: values.take("verbosity")?,
//!         })
//!     }
//!
//!     fn validators() -> Vec<Validator<Self>> {
//!         vec![at_least_one_run as Validator<Self>]
//!     }
//! }
//!
//! fn at_least_one_run(config: &Config) -> Result<(), InvalidConfig> {
//!     if config.count == 0 {
//!         return Err(InvalidConfig::new("count must be at least 1"));
//!     }
//!     Ok(())
//! }
//!
//! let config: Config = parse(["-c", "3", "--debug"], Some("runner")).unwrap();
//! assert_eq!(config.count, 3);
//! assert!(config.verbosity.debug && !config.verbosity.quiet);
//!
//! assert!(parse::<Config, _, _>(["--debug", "--quiet"], Some("runner")).is_err());
//! assert!(matches!(
//!     parse::<Config, _, _>(["-c", "0"], Some("runner")),
//!     Err(Error::Validation { .. })
//! ));
//! ```

mod adapter;
mod descriptor;
mod error;
mod namespace;
mod outline;
mod parse;
mod reconstruct;
mod spec;
pub mod transforms;
mod validate;
mod value;

pub use adapter::{ClapAdapter, ParserAdapter, register_specification};
pub use descriptor::{Arg, OptionDescriptor, Polarity, Shape, classify, default_option_name};
pub use error::{
    DEFINITION_EXIT_CODE, DefinitionError, Error, InvalidConfig, ReconstructError, Result,
    TokenizeError, ValueError,
};
pub use namespace::Namespace;
pub use outline::{GroupOutline, MemberOutline, SpecOutline};
pub use parse::{CfgParser, Submodes, parse, parse_with_submodes};
pub use reconstruct::reconstruct;
pub use spec::{ConfigGroup, FieldValues, Fields, GroupPolicy, Specification, Subspec, Validator};
pub use transforms::TransformError;
pub use validate::{
    RESERVED_OPTION_NAMES, validate_option_name, validate_specification, validate_submodes,
};
pub use value::{ArgType, ScalarKind, TypeInfo, Value};
