//! Rebuilding typed instances from a tokenized namespace.
//!
//! Reconstruction is depth-first: leaf members are converted through their
//! transforms, nested groups are reconstructed (and validated) before the
//! group that contains them, class transforms collapse the nested instance
//! and finally the schema's `construct` and validators run.

use std::any::{Any, type_name};

use tracing::debug;

use crate::error::{DefinitionError, ReconstructError};
use crate::namespace::Namespace;
use crate::spec::{ConfigGroup, FieldValues, Specification};

/// Reconstructs and validates an instance of `S` from `namespace`.
///
/// # Errors
///
/// - [`ReconstructError::Invalid`] if a validator rejects an instance.
/// - [`ReconstructError::Transform`] if a fallible transform rejects a value.
/// - [`ReconstructError::Definition`] if `spec` was not derived from `S`, or
///   `declare` and `construct` disagree.
///
/// # Examples
///
/// ```
/// use cfgspec_core::*;
///
/// struct Count {
///     num: u32,
/// }
///
/// impl ConfigGroup for Count {
///     fn declare(fields: &mut Fields<Self>) {
///         fields.arg("num", Arg::new("How many").default(1_u32));
///     }
///
///     fn construct(values: &mut FieldValues) -> Result<Self, DefinitionError> {
///         Ok(Self { num: values.take("num")? })
///     }
/// }
///
/// let spec = Specification::build::<Count>().unwrap();
/// let mut ns = Namespace::new();
/// ns.insert("num", Value::UInt(5));
/// assert_eq!(reconstruct::<Count>(&spec, &ns).unwrap().num, 5);
/// ```
pub fn reconstruct<S: ConfigGroup>(
    spec: &Specification,
    namespace: &Namespace,
) -> Result<S, ReconstructError> {
    let mismatch = || DefinitionError::FieldTypeMismatch {
        schema: spec.schema_name().to_string(),
        field: "<root>".to_string(),
        expected: type_name::<S>(),
    };
    if !spec.is_schema::<S>() {
        return Err(mismatch().into());
    }
    let instance = reconstruct_any(spec, namespace)?
        .downcast::<S>()
        .map_err(|_| mismatch())?;
    Ok(*instance)
}

/// Type-erased reconstruction, used where the schema type is only known to
/// the specification (submodes).
pub(crate) fn reconstruct_any(
    spec: &Specification,
    namespace: &Namespace,
) -> Result<Box<dyn Any + Send>, ReconstructError> {
    let mut values = FieldValues::new(spec.schema_name());

    for member in spec.members() {
        let raw = namespace
            .get(member.name())
            .cloned()
            .ok_or_else(|| DefinitionError::MissingNamespaceValue(member.name().to_string()))?;
        values.insert(member.name(), (member.convert)(raw)?);
    }

    for sub in spec.subspecs() {
        let nested = reconstruct_any(sub.spec(), namespace)?;
        let value = match &sub.reducer {
            Some(reduce) => reduce(nested)?,
            None => nested,
        };
        values.insert(sub.name(), value);
    }

    let instance = (spec.constructor)(&mut values)?;
    debug!(schema = spec.schema_name(), "Reconstructed instance");
    Ok(instance)
}
