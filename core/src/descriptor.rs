//! Field customization and the option descriptors derived from it.
//!
//! A schema declares each leaf field with an [`Arg`] value. At build time the
//! type classifier ([`classify`]) turns the `Arg` plus the field's raw
//! [`TypeInfo`] into an immutable [`OptionDescriptor`] that records the
//! argument [`Shape`], option spellings, default and conversion function.
//!
//! Classification rules, in priority order:
//!
//! 1. With a transform, the raw (input) type is classified, never the field
//!    type.
//! 2. `bool` becomes a [`Shape::BooleanFlag`]; a default of `true` negates
//!    the flag.
//! 3. `Option<U>` becomes [`Shape::OptionalScalar`] and is never required.
//! 4. `Vec<U>` becomes [`Shape::List`] or [`Shape::PositionalList`].
//! 5. Any other scalar becomes [`Shape::Scalar`] or
//!    [`Shape::PositionalScalar`].

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{DefinitionError, ReconstructError};
use crate::value::{ArgType, ScalarKind, TypeInfo, Value};

/// Argument shape chosen by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Shape {
    /// `--name VALUE`
    Scalar,
    /// `[--name VALUE]`, unset when omitted.
    OptionalScalar,
    /// `--name` with no value.
    BooleanFlag,
    /// `--name VALUE...`
    List,
    /// `VALUE`
    PositionalScalar,
    /// `VALUE...`
    PositionalList,
}

impl Shape {
    /// Returns `true` for positional shapes.
    pub fn is_positional(self) -> bool {
        matches!(self, Shape::PositionalScalar | Shape::PositionalList)
    }

    /// Returns `true` for shapes that accept one or more tokens.
    pub fn is_list(self) -> bool {
        matches!(self, Shape::List | Shape::PositionalList)
    }
}

/// Effect of passing a boolean flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Polarity {
    /// Flag present sets the field to `true` (default `false`).
    Affirming,
    /// Flag present sets the field to `false` (default `true`).
    Negating,
}

type TransformFn<R, T> = Arc<dyn Fn(R) -> Result<T, String> + Send + Sync>;

/// Conversion from a raw namespace value to the boxed field value.
pub(crate) type Convert =
    Arc<dyn Fn(Value) -> Result<Box<dyn Any + Send>, ReconstructError> + Send + Sync>;

enum Transform<R, T> {
    Identity(fn(R) -> T),
    Custom(TransformFn<R, T>),
}

/// Customization of a single leaf field.
///
/// `T` is the field's type and `R` the raw type read from the command line;
/// they are the same unless a transform is attached. Choices and defaults are
/// always expressed in terms of `R`.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use cfgspec_core::Arg;
///
/// // --name NAME (required)
/// let name = Arg::<String>::new("Name to greet");
///
/// // -n/--num N, defaults to 0
/// let num = Arg::new("Repeat count").names(["-n", "--num"]).default(0_u32);
///
/// // positional file list, read as paths and turned into display strings
/// let inputs = Arg::<Vec<PathBuf>>::new("Input files")
///     .positional()
///     .transform(|paths| paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>());
/// # let _ = (name, num, inputs);
/// ```
pub struct Arg<T, R = T> {
    help: String,
    option_names: Option<Vec<String>>,
    positional: bool,
    required: Option<bool>,
    metavar: Option<String>,
    choices: Option<Vec<Value>>,
    default: Option<R>,
    default_factory: Option<Box<dyn FnOnce() -> R + Send>>,
    transform: Transform<R, T>,
    _field: PhantomData<fn() -> T>,
}

impl<T: ArgType> Arg<T, T> {
    /// Starts a field customization with the given help text.
    pub fn new(help: impl Into<String>) -> Self {
        Self {
            help: help.into(),
            option_names: None,
            positional: false,
            required: None,
            metavar: None,
            choices: None,
            default: None,
            default_factory: None,
            transform: Transform::Identity(std::convert::identity),
            _field: PhantomData,
        }
    }

    /// Maps the raw value into the field's richer type after parsing.
    pub fn transform<U, F>(self, f: F) -> Arg<U, T>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        self.with_transform(Arc::new(move |raw| Ok::<U, String>(f(raw))))
    }

    /// Like [`transform`](Self::transform) for conversions that can fail.
    ///
    /// The error's message is reported to the user the same way a validator
    /// failure is.
    pub fn try_transform<U, E, F>(self, f: F) -> Arg<U, T>
    where
        U: Send + 'static,
        E: fmt::Display,
        F: Fn(T) -> Result<U, E> + Send + Sync + 'static,
    {
        self.with_transform(Arc::new(move |raw| f(raw).map_err(|e| e.to_string())))
    }

    fn with_transform<U>(self, transform: TransformFn<T, U>) -> Arg<U, T> {
        Arg {
            help: self.help,
            option_names: self.option_names,
            positional: self.positional,
            required: self.required,
            metavar: self.metavar,
            choices: self.choices,
            default: self.default,
            default_factory: self.default_factory,
            transform: Transform::Custom(transform),
            _field: PhantomData,
        }
    }
}

impl<T, R: ArgType> Arg<T, R> {
    /// Sets the option spellings, e.g. `["-v", "--verbose"]`.
    ///
    /// Without this the option is spelled `--field-name`.
    pub fn names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.option_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Makes the field positional.
    pub fn positional(mut self) -> Self {
        self.positional = true;
        self
    }

    /// States required-ness explicitly. Normally derived from the default.
    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    /// Name shown for the value in usage and help text.
    pub fn metavar(mut self, metavar: impl Into<String>) -> Self {
        self.metavar = Some(metavar.into());
        self
    }

    /// Restricts the raw value (each element, for lists) to these choices.
    ///
    /// Choices have the raw scalar type, so a mismatch does not compile:
    ///
    /// ```compile_fail
    /// use cfgspec_core::Arg;
    ///
    /// let format = Arg::<String>::new("Format").choices([1_i64, 2]);
    /// ```
    pub fn choices<I>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = R::Element>,
    {
        self.choices = Some(choices.into_iter().map(ArgType::into_value).collect());
        self
    }

    /// Raw value used when the option is not given.
    pub fn default(mut self, default: R) -> Self {
        self.default = Some(default);
        self.default_factory = None;
        self
    }

    /// Produces the raw default when the specification is built.
    pub fn default_factory<F>(mut self, factory: F) -> Self
    where
        F: FnOnce() -> R + Send + 'static,
    {
        self.default_factory = Some(Box::new(factory));
        self.default = None;
        self
    }
}

/// Immutable description of one field's command-line argument.
#[derive(Clone)]
pub struct OptionDescriptor {
    name: String,
    shape: Shape,
    kind: Option<ScalarKind>,
    polarity: Option<Polarity>,
    option_names: Vec<String>,
    help: String,
    metavar: Option<String>,
    choices: Option<Vec<Value>>,
    default: Option<Value>,
    required: bool,
    transformed: bool,
    pub(crate) convert: Convert,
}

impl OptionDescriptor {
    /// Field identifier, also the namespace key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Argument shape chosen by the classifier.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Kind of each token's value; `None` for boolean flags.
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        self.kind
    }

    /// Flag polarity; `None` unless the shape is [`Shape::BooleanFlag`].
    pub fn polarity(&self) -> Option<Polarity> {
        self.polarity
    }

    /// Option spellings; empty for positionals.
    pub fn option_names(&self) -> &[String] {
        &self.option_names
    }

    /// Help text shown next to the option.
    pub fn help(&self) -> &str {
        &self.help
    }

    /// Display name of the value, if one was set.
    pub fn metavar(&self) -> Option<&str> {
        self.metavar.as_deref()
    }

    /// Permitted raw values; `None` when unrestricted.
    pub fn choices(&self) -> Option<&[Value]> {
        self.choices.as_deref()
    }

    /// Raw, pre-transform default.
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Returns `true` if the option must appear on the command line.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Returns `true` if a transform was attached to the field.
    pub fn is_transformed(&self) -> bool {
        self.transformed
    }
}

impl fmt::Debug for OptionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionDescriptor")
            .field("name", &self.name)
            .field("shape", &self.shape)
            .field("kind", &self.kind)
            .field("polarity", &self.polarity)
            .field("option_names", &self.option_names)
            .field("help", &self.help)
            .field("metavar", &self.metavar)
            .field("choices", &self.choices)
            .field("default", &self.default)
            .field("required", &self.required)
            .field("transformed", &self.transformed)
            .finish_non_exhaustive()
    }
}

// Structural equality: the conversion closure is derived from the other
// fields and is not compared.
impl PartialEq for OptionDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.shape == other.shape
            && self.kind == other.kind
            && self.polarity == other.polarity
            && self.option_names == other.option_names
            && self.help == other.help
            && self.metavar == other.metavar
            && self.choices == other.choices
            && self.default == other.default
            && self.required == other.required
            && self.transformed == other.transformed
    }
}

/// Default option spelling for a field: `--` plus the name with underscores
/// replaced by hyphens.
///
/// # Examples
///
/// ```
/// assert_eq!(cfgspec_core::default_option_name("dry_run"), "--dry-run");
/// ```
pub fn default_option_name(field: &str) -> String {
    format!("--{}", field.replace('_', "-"))
}

/// Runs the type classifier on one field.
///
/// # Errors
///
/// Returns a [`DefinitionError`] for any combination the command line cannot
/// express; see the module documentation for the rules.
pub fn classify<T, R>(name: &str, arg: Arg<T, R>) -> Result<OptionDescriptor, DefinitionError>
where
    T: Send + 'static,
    R: ArgType,
{
    let Arg {
        help,
        option_names,
        positional,
        required,
        metavar,
        choices,
        default,
        default_factory,
        transform,
        _field,
    } = arg;

    if help.trim().is_empty() {
        return Err(DefinitionError::MissingHelp(name.to_string()));
    }

    let info = R::type_info();
    let transformed = matches!(transform, Transform::Custom(_));
    let default = match (default, default_factory) {
        (Some(value), _) => Some(value.into_value()),
        (None, Some(factory)) => Some(factory().into_value()),
        (None, None) => None,
    };

    if positional {
        if option_names.is_some() {
            return Err(DefinitionError::PositionalWithOptionNames(name.to_string()));
        }
        if required.is_some() {
            return Err(DefinitionError::PositionalWithRequired(name.to_string()));
        }
    }

    let unsupported = || DefinitionError::UnsupportedType {
        name: name.to_string(),
        ty: info.to_string(),
    };

    let (shape, kind, polarity, default, required) = match &info {
        TypeInfo::Bool => {
            if positional {
                return Err(DefinitionError::PositionalBoolean(name.to_string()));
            }
            if required == Some(true) {
                return Err(DefinitionError::RequiredWithDefault(name.to_string()));
            }
            if choices.is_some() {
                return Err(DefinitionError::ChoicesOnFlag(name.to_string()));
            }
            let polarity = match default {
                Some(Value::Bool(true)) => Polarity::Negating,
                _ => Polarity::Affirming,
            };
            let default = Value::Bool(polarity == Polarity::Negating);
            (Shape::BooleanFlag, None, Some(polarity), Some(default), false)
        }
        TypeInfo::Optional(inner) => {
            let TypeInfo::Scalar(kind) = **inner else {
                return Err(unsupported());
            };
            if positional {
                return Err(DefinitionError::PositionalOptional(name.to_string()));
            }
            if required == Some(true) {
                return Err(DefinitionError::RequiredWithDefault(name.to_string()));
            }
            if default.as_ref().is_some_and(|d| *d != Value::Unset) {
                return Err(DefinitionError::RedundantDefault(name.to_string()));
            }
            (Shape::OptionalScalar, Some(kind), None, None, false)
        }
        TypeInfo::List(inner) => {
            let TypeInfo::Scalar(kind) = **inner else {
                return Err(unsupported());
            };
            let shape = if positional {
                Shape::PositionalList
            } else {
                Shape::List
            };
            let required = resolve_required(name, required, default.is_some())?;
            (shape, Some(kind), None, default, required)
        }
        TypeInfo::Scalar(kind) => {
            let shape = if positional {
                Shape::PositionalScalar
            } else {
                Shape::Scalar
            };
            let required = resolve_required(name, required, default.is_some())?;
            (shape, Some(*kind), None, default, required)
        }
    };

    let choices = match (choices, kind) {
        (Some(choices), Some(_)) => Some(check_choices(name, choices, default.as_ref())?),
        _ => None,
    };

    let option_names = match option_names {
        _ if positional => Vec::new(),
        Some(names) if names.is_empty() => {
            return Err(DefinitionError::EmptyOptionNames(name.to_string()));
        }
        Some(names) => names,
        None => vec![default_option_name(name)],
    };

    Ok(OptionDescriptor {
        name: name.to_string(),
        shape,
        kind,
        polarity,
        option_names,
        help,
        metavar,
        choices,
        default,
        required,
        transformed,
        convert: converter::<T, R>(name, transform),
    })
}

fn resolve_required(
    name: &str,
    explicit: Option<bool>,
    has_default: bool,
) -> Result<bool, DefinitionError> {
    match (explicit, has_default) {
        (Some(true), true) => Err(DefinitionError::RequiredWithDefault(name.to_string())),
        (Some(false), false) => Err(DefinitionError::MissingDefault(name.to_string())),
        (_, has_default) => Ok(!has_default),
    }
}

fn check_choices(
    name: &str,
    values: Vec<Value>,
    default: Option<&Value>,
) -> Result<Vec<Value>, DefinitionError> {
    let defaults: Vec<&Value> = match default {
        Some(Value::List(items)) => items.iter().collect(),
        Some(value) => vec![value],
        None => Vec::new(),
    };
    if let Some(bad) = defaults.into_iter().find(|d| !values.contains(*d)) {
        return Err(DefinitionError::DefaultNotInChoices {
            name: name.to_string(),
            default: bad.to_string(),
        });
    }

    Ok(values)
}

fn converter<T, R>(name: &str, transform: Transform<R, T>) -> Convert
where
    T: Send + 'static,
    R: ArgType,
{
    let field = name.to_string();
    Arc::new(move |value| {
        let raw = R::from_value(value).map_err(|source| DefinitionError::ValueMismatch {
            field: field.clone(),
            source,
        })?;
        let converted = match &transform {
            Transform::Identity(identity) => identity(raw),
            Transform::Custom(f) => f(raw).map_err(|message| ReconstructError::Transform {
                field: field.clone(),
                message,
            })?,
        };
        Ok(Box::new(converted) as Box<dyn Any + Send>)
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_required_scalar() {
        let d = classify("name", Arg::<String>::new("The name")).unwrap();
        assert_eq!(d.shape(), Shape::Scalar);
        assert!(d.is_required());
        assert_eq!(d.option_names(), ["--name"]);
        assert_eq!(d.default(), None);
        assert_eq!(d.scalar_kind(), Some(ScalarKind::Str));
    }

    #[test]
    fn test_scalar_with_default_is_not_required() {
        let d = classify("num", Arg::new("A number").default(0_i32)).unwrap();
        assert!(!d.is_required());
        assert_eq!(d.default(), Some(&Value::Int(0)));
    }

    #[test]
    fn test_underscores_become_hyphens() {
        let d = classify("dry_run", Arg::<bool>::new("Do nothing")).unwrap();
        assert_eq!(d.option_names(), ["--dry-run"]);
    }

    #[test]
    fn test_bool_polarity() {
        let plain = classify("debug", Arg::<bool>::new("Debug")).unwrap();
        assert_eq!(plain.shape(), Shape::BooleanFlag);
        assert_eq!(plain.polarity(), Some(Polarity::Affirming));
        assert_eq!(plain.default(), Some(&Value::Bool(false)));
        assert!(!plain.is_required());

        let negated = classify("color", Arg::new("Colorize").default(true)).unwrap();
        assert_eq!(negated.polarity(), Some(Polarity::Negating));
        assert_eq!(negated.default(), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_bool_cannot_be_positional() {
        let err = classify("debug", Arg::<bool>::new("Debug").positional()).unwrap_err();
        assert_eq!(err, DefinitionError::PositionalBoolean("debug".into()));
    }

    #[test]
    fn test_optional_shape_and_restrictions() {
        let d = classify("out", Arg::<Option<PathBuf>>::new("Output")).unwrap();
        assert_eq!(d.shape(), Shape::OptionalScalar);
        assert!(!d.is_required());
        assert_eq!(d.scalar_kind(), Some(ScalarKind::Path));

        let err = classify("out", Arg::<Option<String>>::new("Output").positional()).unwrap_err();
        assert_eq!(err, DefinitionError::PositionalOptional("out".into()));

        let err = classify(
            "out",
            Arg::<Option<String>>::new("Output").default(Some("x".into())),
        )
        .unwrap_err();
        assert_eq!(err, DefinitionError::RedundantDefault("out".into()));

        // An explicit `None` is the implicit default and is accepted.
        assert!(classify("out", Arg::<Option<String>>::new("Output").default(None)).is_ok());
    }

    #[test]
    fn test_list_shapes_and_default_factory() {
        let required = classify("files", Arg::<Vec<String>>::new("Files")).unwrap();
        assert_eq!(required.shape(), Shape::List);
        assert!(required.is_required());

        let optional = classify(
            "files",
            Arg::<Vec<String>>::new("Files").default_factory(Vec::new),
        )
        .unwrap();
        assert!(!optional.is_required());
        assert_eq!(optional.default(), Some(&Value::List(Vec::new())));

        let positional = classify("files", Arg::<Vec<String>>::new("Files").positional()).unwrap();
        assert_eq!(positional.shape(), Shape::PositionalList);
        assert!(positional.option_names().is_empty());
    }

    #[test]
    fn test_nested_collections_are_unsupported() {
        let err = classify("x", Arg::<Vec<Vec<String>>>::new("Nested")).unwrap_err();
        assert_eq!(
            err,
            DefinitionError::UnsupportedType {
                name: "x".into(),
                ty: "Vec<Vec<string>>".into()
            }
        );
        assert!(classify("x", Arg::<Option<Vec<u8>>>::new("Nested")).is_err());
        assert!(classify("x", Arg::<Vec<Option<u8>>>::new("Nested")).is_err());
        assert!(classify("x", Arg::<Vec<bool>>::new("Nested")).is_err());
        assert!(classify("x", Arg::<Option<bool>>::new("Nested")).is_err());
    }

    #[test]
    fn test_positional_restrictions() {
        let err = classify(
            "file",
            Arg::<String>::new("File").positional().names(["--file"]),
        )
        .unwrap_err();
        assert_eq!(err, DefinitionError::PositionalWithOptionNames("file".into()));

        let err = classify("file", Arg::<String>::new("File").positional().required(true)).unwrap_err();
        assert_eq!(err, DefinitionError::PositionalWithRequired("file".into()));
    }

    #[test]
    fn test_explicit_required_conflicts() {
        let err = classify("n", Arg::new("N").default(1_u8).required(true)).unwrap_err();
        assert_eq!(err, DefinitionError::RequiredWithDefault("n".into()));

        let err = classify("n", Arg::<u8>::new("N").required(false)).unwrap_err();
        assert_eq!(err, DefinitionError::MissingDefault("n".into()));

        assert!(classify("n", Arg::<u8>::new("N").required(true)).unwrap().is_required());
    }

    #[test]
    fn test_empty_help_rejected() {
        let err = classify("n", Arg::<u8>::new("  ")).unwrap_err();
        assert_eq!(err, DefinitionError::MissingHelp("n".into()));
    }

    #[test]
    fn test_choices_are_checked_against_raw_type() {
        let d = classify(
            "format",
            Arg::<String>::new("Format").choices(["json", "yaml"].map(String::from)),
        )
        .unwrap();
        assert_eq!(
            d.choices(),
            Some(&[Value::Str("json".into()), Value::Str("yaml".into())][..])
        );

        let d = classify("level", Arg::<i64>::new("Level").choices([1, 2]).default(1)).unwrap();
        assert_eq!(d.choices(), Some(&[Value::Int(1), Value::Int(2)][..]));

        let d = classify(
            "tags",
            Arg::<Vec<u8>>::new("Tags").choices([3, 4]).default_factory(Vec::new),
        )
        .unwrap();
        assert_eq!(d.choices(), Some(&[Value::UInt(3), Value::UInt(4)][..]));

        let err = classify(
            "format",
            Arg::<String>::new("Format")
                .choices(["json".to_string()])
                .default("toml".to_string()),
        )
        .unwrap_err();
        assert_eq!(
            err,
            DefinitionError::DefaultNotInChoices {
                name: "format".into(),
                default: "toml".into()
            }
        );
    }

    #[test]
    fn test_transform_classifies_raw_type() {
        let d = classify(
            "level",
            Arg::<String>::new("Level")
                .choices(["low".to_string(), "high".to_string()])
                .default("low".to_string())
                .transform(|s| s.len()),
        )
        .unwrap();
        assert_eq!(d.shape(), Shape::Scalar);
        assert_eq!(d.scalar_kind(), Some(ScalarKind::Str));
        assert!(d.is_transformed());
        assert_eq!(d.default(), Some(&Value::Str("low".into())));

        let converted = (d.convert)(Value::Str("high".into())).unwrap();
        assert_eq!(*converted.downcast::<usize>().unwrap(), 4);
    }

    #[test]
    fn test_try_transform_failure_is_reported_per_field() {
        let d = classify(
            "port",
            Arg::<String>::new("Port").try_transform(|s| s.parse::<u16>()),
        )
        .unwrap();
        let Err(err) = (d.convert)(Value::Str("http".into())) else {
            panic!("expected transform failure");
        };
        assert!(matches!(err, ReconstructError::Transform { ref field, .. } if field == "port"));
    }

    #[test]
    fn test_convert_rejects_mismatched_value() {
        let d = classify("n", Arg::<u8>::new("N")).unwrap();
        let Err(err) = (d.convert)(Value::Str("x".into())) else {
            panic!("expected mismatch");
        };
        assert!(matches!(
            err,
            ReconstructError::Definition(DefinitionError::ValueMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_option_names_rejected() {
        let err = classify("n", Arg::<u8>::new("N").names(Vec::<String>::new())).unwrap_err();
        assert_eq!(err, DefinitionError::EmptyOptionNames("n".into()));
    }
}
