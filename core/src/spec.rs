//! Schemas and the specifications derived from them.
//!
//! A schema is any type implementing [`ConfigGroup`]. Building a
//! [`Specification`] walks the schema's declared fields in order, runs the
//! type classifier on each leaf and recurses into nested groups. The result
//! is pure data: it can be registered on a parser any number of times and
//! shared between threads.
//!
//! # Example
//!
//! ```
//! use cfgspec_core::*;
//!
//! struct Greeting {
//!     name: String,
//!     num: i64,
//! }
//!
//! impl ConfigGroup for Greeting {
//!     fn declare(fields: &mut Fields<Self>) {
//!         fields
//!             .arg("name", Arg::<String>::new("Who to greet"))
//!             .arg("num", Arg::new("How many times").default(0_i64));
//!     }
//!
//!     fn construct(values: &mut FieldValues) -> Result<Self, DefinitionError> {
//!         Ok(Self {
//!             name: values.take("name")?,
//!             num: values.take("num")?,
//!         })
//!     }
//! }
//!
//! let spec = Specification::build::<Greeting>().unwrap();
//! assert_eq!(spec.members().len(), 2);
//! assert_eq!(spec.members()[1].default(), Some(&Value::Int(0)));
//! ```

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::descriptor::{Arg, OptionDescriptor, classify};
use crate::error::{DefinitionError, InvalidConfig, ReconstructError};
use crate::validate::validate_specification;
use crate::value::ArgType;

/// How a nested group's options are registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum GroupPolicy {
    /// Options are independent.
    #[default]
    Plain,
    /// At most one option of the group may be given.
    MutuallyExclusive,
}

/// A post-construction check. Returns [`InvalidConfig`] to reject the
/// instance.
pub type Validator<S> = fn(&S) -> Result<(), InvalidConfig>;

/// A configuration schema.
///
/// `declare` registers the fields in order; `construct` assembles the
/// instance from the reconstructed values, taking each declared field by
/// name. Validators run after construction, children before parents.
pub trait ConfigGroup: Sized + Send + 'static {
    /// Declares the fields of this schema, in order.
    fn declare(fields: &mut Fields<Self>);

    /// Builds the instance from reconstructed field values.
    fn construct(values: &mut FieldValues) -> Result<Self, DefinitionError>;

    /// Grouping policy used when this schema is nested in another.
    fn group_policy() -> GroupPolicy {
        GroupPolicy::Plain
    }

    /// Validators run, in order, on every constructed instance.
    fn validators() -> Vec<Validator<Self>> {
        Vec::new()
    }

    /// One-line description, shown for submodes.
    fn about() -> Option<&'static str> {
        None
    }
}

pub(crate) type Constructor = fn(&mut FieldValues) -> Result<Box<dyn Any + Send>, ReconstructError>;

pub(crate) type Reducer =
    Arc<dyn Fn(Box<dyn Any + Send>) -> Result<Box<dyn Any + Send>, ReconstructError> + Send + Sync>;

/// Declaration builder passed to [`ConfigGroup::declare`].
///
/// Classification happens as fields are declared; the first failure is kept
/// and reported by [`Specification::build`].
pub struct Fields<S> {
    members: Vec<OptionDescriptor>,
    subspecs: Vec<Subspec>,
    error: Option<DefinitionError>,
    _schema: PhantomData<fn() -> S>,
}

impl<S: ConfigGroup> Fields<S> {
    fn new() -> Self {
        Self {
            members: Vec::new(),
            subspecs: Vec::new(),
            error: None,
            _schema: PhantomData,
        }
    }

    fn record<T>(&mut self, result: Result<T, DefinitionError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.error.get_or_insert(err);
                None
            }
        }
    }

    /// Declares a leaf field.
    pub fn arg<T, R>(&mut self, name: &str, arg: Arg<T, R>) -> &mut Self
    where
        T: Send + 'static,
        R: ArgType,
    {
        if let Some(descriptor) = self.record(classify(name, arg)) {
            self.members.push(descriptor);
        }
        self
    }

    /// Declares a nested group stored as-is in the field `name`.
    pub fn group<G: ConfigGroup>(&mut self, name: &str) -> &mut Self {
        if let Some(spec) = self.record(Specification::build_nested::<G>()) {
            self.subspecs.push(Subspec {
                name: name.to_string(),
                spec,
                reducer: None,
            });
        }
        self
    }

    /// Declares a nested group whose instance is collapsed by `reducer` into
    /// the value stored in the field `name`.
    ///
    /// The group's options still appear on the command line.
    pub fn group_transform<G, U, F>(&mut self, name: &str, reducer: F) -> &mut Self
    where
        G: ConfigGroup,
        U: Send + 'static,
        F: Fn(G) -> U + Send + Sync + 'static,
    {
        let field = name.to_string();
        let reducer: Reducer = Arc::new(move |nested| {
            let group = nested.downcast::<G>().map_err(|_| DefinitionError::FieldTypeMismatch {
                schema: type_name::<S>().to_string(),
                field: field.clone(),
                expected: type_name::<G>(),
            })?;
            Ok(Box::new(reducer(*group)) as Box<dyn Any + Send>)
        });
        if let Some(spec) = self.record(Specification::build_nested::<G>()) {
            self.subspecs.push(Subspec {
                name: name.to_string(),
                spec,
                reducer: Some(reducer),
            });
        }
        self
    }
}

/// A nested specification together with the field it fills.
#[derive(Clone)]
pub struct Subspec {
    name: String,
    spec: Specification,
    pub(crate) reducer: Option<Reducer>,
}

impl Subspec {
    /// Name of the field in the parent schema.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Specification of the nested group.
    pub fn spec(&self) -> &Specification {
        &self.spec
    }

    /// Grouping policy of the nested group.
    pub fn policy(&self) -> GroupPolicy {
        self.spec.policy
    }

    /// Returns `true` if the nested instance is collapsed by a class
    /// transform.
    pub fn is_reduced(&self) -> bool {
        self.reducer.is_some()
    }
}

impl fmt::Debug for Subspec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subspec")
            .field("name", &self.name)
            .field("spec", &self.spec)
            .field("reduced", &self.reducer.is_some())
            .finish()
    }
}

impl PartialEq for Subspec {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.spec == other.spec
            && self.reducer.is_some() == other.reducer.is_some()
    }
}

/// The derived command-line description of a schema.
///
/// `members` and `subspecs` keep declaration order, which fixes the order
/// of help output and of reconstruction.
#[derive(Clone)]
pub struct Specification {
    schema_name: &'static str,
    schema_type: TypeId,
    members: Vec<OptionDescriptor>,
    subspecs: Vec<Subspec>,
    policy: GroupPolicy,
    pub(crate) constructor: Constructor,
}

impl Specification {
    /// Builds and validates the specification of a root schema.
    ///
    /// # Errors
    ///
    /// Returns the first [`DefinitionError`] found: classification failures,
    /// name collisions anywhere in the tree, invalid mutually exclusive
    /// groups or positional ordering problems. [`validate_specification`]
    /// lists every problem of a built tree.
    ///
    /// [`validate_specification`]: crate::validate_specification
    pub fn build<S: ConfigGroup>() -> Result<Self, DefinitionError> {
        let spec = Self::build_nested::<S>()?;
        if let Some(err) = validate_specification(&spec).into_iter().next() {
            return Err(err);
        }
        debug!(
            schema = spec.schema_name,
            members = spec.members.len(),
            subspecs = spec.subspecs.len(),
            "Built specification"
        );
        Ok(spec)
    }

    /// Classifies the fields of `S` and its nested groups without the
    /// whole-tree checks, which run once on the root.
    pub(crate) fn build_nested<S: ConfigGroup>() -> Result<Self, DefinitionError> {
        let mut fields = Fields::<S>::new();
        S::declare(&mut fields);
        if let Some(err) = fields.error {
            return Err(err);
        }
        Ok(Self {
            schema_name: type_name::<S>(),
            schema_type: TypeId::of::<S>(),
            members: fields.members,
            subspecs: fields.subspecs,
            policy: S::group_policy(),
            constructor: construct_validated::<S>,
        })
    }

    /// Type name of the schema this was derived from.
    pub fn schema_name(&self) -> &'static str {
        self.schema_name
    }

    /// Returns `true` if this specification was derived from `S`.
    pub fn is_schema<S: ConfigGroup>(&self) -> bool {
        self.schema_type == TypeId::of::<S>()
    }

    /// Option descriptors declared directly on this level.
    pub fn members(&self) -> &[OptionDescriptor] {
        &self.members
    }

    /// Nested groups, in declaration order.
    pub fn subspecs(&self) -> &[Subspec] {
        &self.subspecs
    }

    /// Grouping policy declared by the schema.
    pub fn policy(&self) -> GroupPolicy {
        self.policy
    }

    /// Every option descriptor in the tree, depth-first in registration
    /// order (members before subspecs).
    pub fn all_members(&self) -> Vec<&OptionDescriptor> {
        let mut out: Vec<&OptionDescriptor> = self.members.iter().collect();
        for sub in &self.subspecs {
            out.extend(sub.spec.all_members());
        }
        out
    }
}

impl fmt::Debug for Specification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Specification")
            .field("schema", &self.schema_name)
            .field("policy", &self.policy)
            .field("members", &self.members)
            .field("subspecs", &self.subspecs)
            .finish()
    }
}

impl PartialEq for Specification {
    fn eq(&self, other: &Self) -> bool {
        self.schema_type == other.schema_type
            && self.policy == other.policy
            && self.members == other.members
            && self.subspecs == other.subspecs
    }
}

fn construct_validated<S: ConfigGroup>(
    values: &mut FieldValues,
) -> Result<Box<dyn Any + Send>, ReconstructError> {
    let instance = S::construct(values)?;
    values.warn_untaken();
    for validator in S::validators() {
        validator(&instance)?;
    }
    Ok(Box::new(instance))
}

/// Reconstructed field values handed to [`ConfigGroup::construct`].
pub struct FieldValues {
    schema: &'static str,
    values: HashMap<String, Box<dyn Any + Send>>,
}

impl FieldValues {
    pub(crate) fn new(schema: &'static str) -> Self {
        Self {
            schema,
            values: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, name: &str, value: Box<dyn Any + Send>) {
        self.values.insert(name.to_string(), value);
    }

    /// Takes the value of a declared field.
    ///
    /// # Errors
    ///
    /// [`DefinitionError::UndeclaredField`] if no such field was declared (or
    /// it was already taken), [`DefinitionError::FieldTypeMismatch`] if it was
    /// declared with a different type.
    pub fn take<T: 'static>(&mut self, name: &str) -> Result<T, DefinitionError> {
        let value = self
            .values
            .remove(name)
            .ok_or_else(|| DefinitionError::UndeclaredField {
                schema: self.schema.to_string(),
                field: name.to_string(),
            })?;
        value
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| DefinitionError::FieldTypeMismatch {
                schema: self.schema.to_string(),
                field: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    fn warn_untaken(&self) {
        for field in self.values.keys() {
            warn!(schema = self.schema, field = %field, "Reconstructed value was not used by construct");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Shape;

    struct Inner {
        level: u8,
    }

    impl ConfigGroup for Inner {
        fn declare(fields: &mut Fields<Self>) {
            fields.arg("level", Arg::new("Level").default(1_u8));
        }

        fn construct(values: &mut FieldValues) -> Result<Self, DefinitionError> {
            Ok(Self {
                level: values.take("level")?,
            })
        }
    }

    struct Outer {
        name: String,
        inner: Inner,
        level: u8,
    }

    impl ConfigGroup for Outer {
        fn declare(fields: &mut Fields<Self>) {
            fields
                .arg("name", Arg::<String>::new("Name"))
                .group::<Inner>("inner")
                .group_transform::<Inner, _, _>("level", |inner: Inner| inner.level);
        }

        fn construct(values: &mut FieldValues) -> Result<Self, DefinitionError> {
            Ok(Self {
                name: values.take("name")?,
                inner: values.take("inner")?,
                level: values.take("level")?,
            })
        }
    }

    #[test]
    fn test_build_records_members_and_subspecs_in_order() {
        let spec = Specification::build_nested::<Outer>().unwrap();
        assert!(spec.is_schema::<Outer>());
        assert_eq!(spec.members().len(), 1);
        assert_eq!(spec.members()[0].shape(), Shape::Scalar);
        let names: Vec<&str> = spec.subspecs().iter().map(Subspec::name).collect();
        assert_eq!(names, ["inner", "level"]);
        assert!(!spec.subspecs()[0].is_reduced());
        assert!(spec.subspecs()[1].is_reduced());
        assert_eq!(spec.all_members().len(), 3);
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = Specification::build_nested::<Outer>().unwrap();
        let b = Specification::build_nested::<Outer>().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_first_declaration_error_wins() {
        struct Broken;

        impl ConfigGroup for Broken {
            fn declare(fields: &mut Fields<Self>) {
                fields
                    .arg("flag", Arg::<bool>::new("Flag").positional())
                    .arg("empty", Arg::<String>::new(""));
            }

            fn construct(_: &mut FieldValues) -> Result<Self, DefinitionError> {
                Ok(Broken)
            }
        }

        let err = Specification::build::<Broken>().unwrap_err();
        assert_eq!(err, DefinitionError::PositionalBoolean("flag".into()));
    }

    #[test]
    fn test_field_values_take() {
        let mut values = FieldValues::new("Test");
        values.insert("n", Box::new(5_u8));
        assert!(matches!(
            values.take::<String>("n"),
            Err(DefinitionError::FieldTypeMismatch { .. })
        ));

        let mut values = FieldValues::new("Test");
        values.insert("n", Box::new(5_u8));
        assert_eq!(values.take::<u8>("n"), Ok(5));
        assert!(matches!(
            values.take::<u8>("n"),
            Err(DefinitionError::UndeclaredField { .. })
        ));
    }
}
