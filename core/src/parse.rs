//! Entry points: build, register, tokenize, reconstruct.

use std::any::Any;
use std::fmt;
use std::path::Path;

use tracing::debug;

use crate::adapter::{ClapAdapter, ParserAdapter, register_specification};
use crate::error::{DefinitionError, Error, ReconstructError, Result};
use crate::reconstruct::{reconstruct, reconstruct_any};
use crate::spec::{ConfigGroup, Specification};
use crate::validate::validate_submodes;

const VERSION_OPTION_NAMES: [&str; 2] = ["-V", "--version"];

/// Parser-level settings shared by every parse.
///
/// # Examples
///
/// ```
/// use cfgspec_core::*;
///
/// #[derive(Debug)]
/// struct Opts {
///     name: String,
///     num: i64,
/// }
///
/// impl ConfigGroup for Opts {
///     fn declare(fields: &mut Fields<Self>) {
///         fields
///             .arg("name", Arg::<String>::new("Who to greet"))
///             .arg("num", Arg::new("How many times").default(0_i64));
///     }
///
///     fn construct(values: &mut FieldValues) -> Result<Self, DefinitionError> {
///         Ok(Self {
///             name: values.take("name")?,
///             num: values.take("num")?,
///         })
///     }
/// }
///
/// let parser = CfgParser::new().program_name("greet").version("1.0.0");
/// let opts: Opts = parser.parse(["--name", "Olli", "--num", "42"]).unwrap();
/// assert_eq!((opts.name.as_str(), opts.num), ("Olli", 42));
///
/// let err = parser.parse::<Opts, _, _>(Vec::<String>::new()).unwrap_err();
/// assert!(err.is_user_error());
/// assert_ne!(err.exit_code(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CfgParser {
    program_name: Option<String>,
    about: Option<String>,
    version: Option<String>,
}

impl CfgParser {
    /// Creates a parser with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Name shown in usage; defaults to the file name of the running binary.
    pub fn program_name(mut self, name: impl Into<String>) -> Self {
        self.program_name = Some(name.into());
        self
    }

    /// Description shown at the top of the help text.
    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    /// Version string; enables `-V`/`--version`, which are then reserved.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Parses `argv` (without the program name) into an `S`.
    ///
    /// # Errors
    ///
    /// - [`Error::Definition`] if the schema is malformed.
    /// - [`Error::Usage`] if `argv` is rejected or help was requested.
    /// - [`Error::Validation`] if a validator or fallible transform rejects
    ///   the values.
    pub fn parse<S, I, T>(&self, argv: I) -> Result<S>
    where
        S: ConfigGroup,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let spec = Specification::build::<S>()?;
        self.check_reserved([&spec])?;

        let mut adapter = self.adapter();
        register_specification(&spec, &mut adapter);

        let argv = collect_argv(argv);
        let namespace = adapter.tokenize(&argv)?;
        reconstruct::<S>(&spec, &namespace).map_err(|err| reject(&mut adapter, err))
    }

    /// Parses `argv` into an `S` plus the selected submode, mapped into the
    /// common submode type `M`.
    ///
    /// The top-level instance is validated before the submode instance.
    ///
    /// # Errors
    ///
    /// As for [`parse`](Self::parse); additionally [`Error::Definition`] for
    /// an empty or inconsistent submode table and [`Error::Usage`] when no
    /// submode is selected.
    pub fn parse_with_submodes<S, M, I, T>(
        &self,
        argv: I,
        submodes: &Submodes<M>,
    ) -> Result<(S, M)>
    where
        S: ConfigGroup,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let spec = Specification::build::<S>()?;
        let built = submodes
            .entries
            .iter()
            .map(|entry| (entry.build)().map(|sub| (entry, sub)))
            .collect::<std::result::Result<Vec<_>, DefinitionError>>()?;

        let table = built.iter().map(|(entry, sub)| (entry.name.as_str(), sub));
        if let Some(err) = validate_submodes(&spec, table).into_iter().next() {
            return Err(err.into());
        }
        self.check_reserved(std::iter::once(&spec).chain(built.iter().map(|(_, sub)| sub)))?;

        let mut adapter = self.adapter();
        register_specification(&spec, &mut adapter);
        for (entry, sub) in &built {
            adapter.begin_submode(&entry.name, entry.about);
            register_specification(sub, &mut adapter);
            adapter.end_submode();
        }

        let argv = collect_argv(argv);
        let namespace = adapter.tokenize(&argv)?;

        let selected = namespace
            .submode()
            .and_then(|name| built.iter().find(|(entry, _)| entry.name == name));
        let Some((entry, sub)) = selected else {
            return Err(Error::Usage(adapter.fail("No submode selected")));
        };

        let common = reconstruct::<S>(&spec, &namespace).map_err(|err| reject(&mut adapter, err))?;
        let mode = reconstruct_any(sub, &namespace)
            .and_then(|instance| (entry.into_mode)(instance))
            .map_err(|err| reject(&mut adapter, err))?;
        debug!(submode = %entry.name, "Selected submode");
        Ok((common, mode))
    }

    fn adapter(&self) -> ClapAdapter {
        let name = self
            .program_name
            .clone()
            .unwrap_or_else(default_program_name);
        let mut adapter = ClapAdapter::new(name);
        if let Some(about) = &self.about {
            adapter = adapter.with_about(about.clone());
        }
        if let Some(version) = &self.version {
            adapter = adapter.with_version(version.clone());
        }
        adapter
    }

    fn check_reserved<'a>(
        &self,
        specs: impl IntoIterator<Item = &'a Specification>,
    ) -> std::result::Result<(), DefinitionError> {
        if self.version.is_none() {
            return Ok(());
        }
        for spec in specs {
            for member in spec.all_members() {
                if let Some(option) = member
                    .option_names()
                    .iter()
                    .find(|name| VERSION_OPTION_NAMES.contains(&name.as_str()))
                {
                    return Err(DefinitionError::ReservedOptionName(option.clone()));
                }
            }
        }
        Ok(())
    }
}

/// Parses `argv` into an `S` with default parser settings.
///
/// See [`CfgParser::parse`].
pub fn parse<S, I, T>(argv: I, program_name: Option<&str>) -> Result<S>
where
    S: ConfigGroup,
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    parser_named(program_name).parse(argv)
}

/// Parses `argv` into an `S` and a submode with default parser settings.
///
/// See [`CfgParser::parse_with_submodes`].
pub fn parse_with_submodes<S, M, I, T>(
    argv: I,
    submodes: &Submodes<M>,
    program_name: Option<&str>,
) -> Result<(S, M)>
where
    S: ConfigGroup,
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    parser_named(program_name).parse_with_submodes(argv, submodes)
}

fn parser_named(program_name: Option<&str>) -> CfgParser {
    match program_name {
        Some(name) => CfgParser::new().program_name(name),
        None => CfgParser::new(),
    }
}

type IntoMode<M> =
    Box<dyn Fn(Box<dyn Any + Send>) -> std::result::Result<M, ReconstructError> + Send + Sync>;

struct SubmodeEntry<M> {
    name: String,
    about: Option<&'static str>,
    build: fn() -> std::result::Result<Specification, DefinitionError>,
    into_mode: IntoMode<M>,
}

/// The submodes of one command line, each mapped into a common type `M`.
///
/// # Examples
///
/// ```
/// use cfgspec_core::*;
///
/// struct Top;
///
/// impl ConfigGroup for Top {
///     fn declare(_: &mut Fields<Self>) {}
///
///     fn construct(_: &mut FieldValues) -> Result<Self, DefinitionError> {
///         Ok(Top)
///     }
/// }
///
/// struct Clean {
///     all: bool,
/// }
///
/// impl ConfigGroup for Clean {
///     fn declare(fields: &mut Fields<Self>) {
///         fields.arg("all", Arg::<bool>::new("Remove everything"));
///     }
///
///     fn construct(values: &mut FieldValues) -> Result<Self, DefinitionError> {
///         Ok(Self { all: values.take("all")? })
///     }
///
///     fn about() -> Option<&'static str> {
///         Some("Remove build outputs")
///     }
/// }
///
/// enum Mode {
///     Clean(Clean),
/// }
///
/// let submodes = Submodes::new().add("clean", Mode::Clean);
/// let (_, mode) = CfgParser::new()
///     .parse_with_submodes::<Top, _, _, _>(["clean", "--all"], &submodes)
///     .unwrap();
/// let Mode::Clean(clean) = mode;
/// assert!(clean.all);
/// ```
pub struct Submodes<M> {
    entries: Vec<SubmodeEntry<M>>,
}

impl<M: 'static> Submodes<M> {
    /// Creates an empty submode table.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds the submode `name` with schema `S`; `into_mode` wraps the
    /// reconstructed instance in the common type.
    pub fn add<S, F>(mut self, name: impl Into<String>, into_mode: F) -> Self
    where
        S: ConfigGroup,
        F: Fn(S) -> M + Send + Sync + 'static,
    {
        let name = name.into();
        let field = name.clone();
        self.entries.push(SubmodeEntry {
            name,
            about: S::about(),
            build: Specification::build::<S>,
            into_mode: Box::new(move |instance| {
                let instance = instance.downcast::<S>().map_err(|_| {
                    DefinitionError::FieldTypeMismatch {
                        schema: std::any::type_name::<S>().to_string(),
                        field: field.clone(),
                        expected: std::any::type_name::<S>(),
                    }
                })?;
                Ok(into_mode(*instance))
            }),
        });
        self
    }

    /// Registered submode names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    /// Number of registered submodes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no submode was registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<M: 'static> Default for Submodes<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for Submodes<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|entry| &entry.name))
            .finish()
    }
}

fn collect_argv<I, T>(argv: I) -> Vec<String>
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    argv.into_iter().map(Into::into).collect()
}

fn reject(adapter: &mut ClapAdapter, err: ReconstructError) -> Error {
    match err {
        ReconstructError::Definition(err) => Error::Definition(err),
        err => {
            let message = err.to_string();
            debug!(%message, "Configuration rejected");
            Error::Validation {
                usage: adapter.fail(&message),
                message,
            }
        }
    }
}

fn default_program_name() -> String {
    std::env::args_os()
        .next()
        .and_then(|arg0| {
            Path::new(&arg0)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}
