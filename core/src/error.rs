//! Error types for specification building, reconstruction and parsing.
//!
//! Three families of failure exist:
//!
//! - [`DefinitionError`]: the schema itself is malformed. Raised as soon as
//!   a [`Specification`](crate::Specification) is built, never deferred to
//!   the first unlucky command line.
//! - user input errors: the tokenizer rejected `argv`, or no submode was
//!   selected. Carried as [`Error::Usage`].
//! - validation errors: a [`Validator`](crate::Validator) or a fallible
//!   transform rejected the values. Carried as [`Error::Validation`] and
//!   rendered exactly like a usage error.

use thiserror::Error;

use crate::value::Value;

/// Exit status used for schema definition errors (sysexits `EX_SOFTWARE`).
pub const DEFINITION_EXIT_CODE: i32 = 70;

/// A malformed schema definition.
///
/// Each variant names the offending field (or group/submode) so the message
/// points at the declaration to fix.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DefinitionError {
    /// Field name is not an identifier.
    #[error("invalid field name: {0:?}")]
    InvalidFieldName(String),
    /// Help text is empty.
    #[error("field {0} must have non-empty help text")]
    MissingHelp(String),
    /// The raw type cannot be represented on the command line.
    #[error("field {name} has unsupported type {ty}")]
    UnsupportedType { name: String, ty: String },
    /// A boolean field was marked positional.
    #[error("boolean field {0} cannot be positional")]
    PositionalBoolean(String),
    /// An optional field was marked positional.
    #[error("optional field {0} cannot be positional")]
    PositionalOptional(String),
    /// A positional field declared option names.
    #[error("positional field {0} cannot declare option names")]
    PositionalWithOptionNames(String),
    /// A positional field declared `required` explicitly.
    #[error("positional field {0} cannot declare required explicitly")]
    PositionalWithRequired(String),
    /// An optional field declared a default other than `None`.
    #[error("optional field {0} cannot declare a default, it already defaults to unset")]
    RedundantDefault(String),
    /// `required(true)` was combined with a default, or used on a field that
    /// is never required (booleans, optionals).
    #[error("field {0} cannot be required and have a default")]
    RequiredWithDefault(String),
    /// `required(false)` on a field that has no default to fall back to.
    #[error("field {0} is not required but has no default")]
    MissingDefault(String),
    /// Choices were declared on a boolean flag.
    #[error("boolean field {0} cannot declare choices")]
    ChoicesOnFlag(String),
    /// The default is not one of the declared choices.
    #[error("default {default} for field {name} is not one of its choices")]
    DefaultNotInChoices { name: String, default: String },
    /// `names([])` was given explicitly.
    #[error("field {0} declares an empty list of option names")]
    EmptyOptionNames(String),
    /// Option name is neither `-x` nor `--long-form`.
    #[error("invalid option name {option:?} for field {name}")]
    InvalidOptionName { name: String, option: String },
    /// A field name or option name is used twice in the flat namespace.
    #[error("duplicate name in specification: {0}")]
    DuplicateName(String),
    /// The option name is reserved by the tokenizer (`-h`, `--help`).
    #[error("option name {0} is reserved")]
    ReservedOptionName(String),
    /// Positionals in an order the tokenizer cannot disambiguate.
    #[error("positional field {name} {reason}")]
    PositionalOrder { name: String, reason: String },
    /// A mutually exclusive group contains a member it cannot express.
    #[error("mutually exclusive group {group} cannot contain {reason} field {member}")]
    ExclusiveGroupMember {
        group: String,
        member: String,
        reason: &'static str,
    },
    /// A mutually exclusive group contains a nested group.
    #[error("mutually exclusive group {group} cannot contain nested group {nested}")]
    ExclusiveGroupNested { group: String, nested: String },
    /// `parse_with_submodes` was given no submodes.
    #[error("no submodes were registered")]
    NoSubmodes,
    /// Two submodes share a name, or the name is not a valid command word.
    #[error("invalid or duplicate submode name: {0:?}")]
    InvalidSubmodeName(String),
    /// `construct` asked for a field that was never declared, or asked twice.
    #[error("{schema} has no reconstructed value for field {field}")]
    UndeclaredField { schema: String, field: String },
    /// `construct` asked for a field with a different type than declared.
    #[error("{schema} field {field} is not a {expected}")]
    FieldTypeMismatch {
        schema: String,
        field: String,
        expected: &'static str,
    },
    /// The namespace value does not match the declared raw type.
    #[error("field {field}: {source}")]
    ValueMismatch { field: String, source: ValueError },
    /// The tokenizer could not hand back the value of a registered field.
    #[error("tokenizer returned no readable value for field {field}: {reason}")]
    UnreadableValue { field: String, reason: String },
    /// The namespace has no entry for a registered field.
    #[error("namespace has no value for field {0}")]
    MissingNamespaceValue(String),
}

/// A raw value did not have the shape the target type expects.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("expected {expected}, found {} value {found}", .found.type_name())]
pub struct ValueError {
    /// Name of the Rust type being produced.
    pub expected: &'static str,
    /// The value that was received.
    pub found: Value,
}

/// Error a [`Validator`](crate::Validator) returns to reject a configuration.
///
/// # Examples
///
/// ```
/// use cfgspec_core::InvalidConfig;
///
/// let err = InvalidConfig::new("natural numbers must be >= 0");
/// assert_eq!(err.to_string(), "natural numbers must be >= 0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct InvalidConfig {
    message: String,
}

impl InvalidConfig {
    /// Creates an error carrying a human-readable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The message shown to the user.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failure while turning a [`Namespace`](crate::Namespace) back into
/// instances.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconstructError {
    /// `declare` and `construct` disagree, or the namespace is inconsistent.
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    /// A fallible transform rejected the raw value.
    #[error("invalid value for {field}: {message}")]
    Transform { field: String, message: String },
    /// A validator rejected the instance.
    #[error(transparent)]
    Invalid(#[from] InvalidConfig),
}

/// Failure of [`ParserAdapter::tokenize`](crate::ParserAdapter::tokenize).
///
/// `E` is the adapter's user-facing error type.
#[derive(Debug, Error)]
pub enum TokenizeError<E> {
    /// `argv` was rejected, or help or version output was requested.
    #[error("{0}")]
    Usage(E),
    /// The tokenizer's output does not match the registered descriptors.
    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

/// Error returned by [`parse`](crate::parse) and
/// [`parse_with_submodes`](crate::parse_with_submodes).
#[derive(Debug, Error)]
pub enum Error {
    /// The schema is malformed. This is a programming error.
    #[error("invalid schema definition: {0}")]
    Definition(#[from] DefinitionError),
    /// The command line was rejected (or help/version was requested).
    #[error("{0}")]
    Usage(clap::Error),
    /// The command line parsed but the configuration failed validation.
    #[error("{message}")]
    Validation {
        /// The validator's message.
        message: String,
        /// The same message formatted with the parser's usage string.
        usage: clap::Error,
    },
}

impl From<TokenizeError<clap::Error>> for Error {
    fn from(err: TokenizeError<clap::Error>) -> Self {
        match err {
            TokenizeError::Usage(err) => Error::Usage(err),
            TokenizeError::Definition(err) => Error::Definition(err),
        }
    }
}

impl Error {
    /// Exit status for this error: non-zero for every rejection, zero only
    /// when the tokenizer stopped to display help or version information.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Definition(_) => DEFINITION_EXIT_CODE,
            Error::Usage(err) => err.exit_code(),
            Error::Validation { usage, .. } => usage.exit_code(),
        }
    }

    /// Returns `true` for user-correctable errors (usage and validation).
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Error::Definition(_))
    }

    /// Prints the error (with usage, where available) to stderr, or help
    /// text to stdout.
    pub fn print(&self) -> std::io::Result<()> {
        match self {
            Error::Definition(err) => {
                eprintln!("error: invalid schema definition: {err}");
                Ok(())
            }
            Error::Usage(err) => err.print(),
            Error::Validation { usage, .. } => usage.print(),
        }
    }

    /// Prints the error and terminates the process with [`exit_code`](Self::exit_code).
    pub fn exit(&self) -> ! {
        match self {
            Error::Usage(err) => err.exit(),
            Error::Validation { usage, .. } => usage.exit(),
            Error::Definition(_) => {
                let _ = self.print();
                std::process::exit(DEFINITION_EXIT_CODE)
            }
        }
    }
}

/// Convenience alias for results with [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;
