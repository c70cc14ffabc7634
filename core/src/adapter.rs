//! Registration of specifications onto a tokenizer.
//!
//! [`ParserAdapter`] is the seam between the derivation engine and the
//! library that actually consumes `argv`. [`register_specification`] walks a
//! specification and drives an adapter; [`ClapAdapter`] is the bundled
//! implementation on top of `clap`'s builder API.

use std::ffi::OsStr;
use std::path::PathBuf;

use clap::builder::{PossibleValue, TypedValueParser};
use clap::error::ErrorKind;
use clap::parser::MatchesError;
use clap::{ArgAction, ArgGroup, ArgMatches, Command};
use tracing::debug;

use crate::descriptor::{OptionDescriptor, Polarity, Shape};
use crate::error::{DefinitionError, TokenizeError};
use crate::namespace::Namespace;
use crate::spec::{GroupPolicy, Specification};
use crate::value::{ScalarKind, Value};

/// A tokenizer the engine can register options on.
///
/// Calls arrive in registration order: members first, then each subspec
/// bracketed by [`begin_group`](Self::begin_group) and
/// [`end_group`](Self::end_group). Submodes are bracketed the same way with
/// [`begin_submode`](Self::begin_submode).
pub trait ParserAdapter {
    /// User-facing error carrying a usage string.
    type Error;

    /// Registers one option descriptor in the current scope.
    fn register(&mut self, descriptor: &OptionDescriptor);

    /// Opens a group; `name` is the dotted path of the group's field, or the
    /// schema name when a registered root is itself mutually exclusive.
    fn begin_group(&mut self, name: &str, policy: GroupPolicy);

    /// Closes the innermost open group.
    fn end_group(&mut self);

    /// Opens a submode scope; registrations go to the submode until
    /// [`end_submode`](Self::end_submode).
    fn begin_submode(&mut self, name: &str, about: Option<&str>);

    /// Closes the submode scope and attaches it to the root.
    fn end_submode(&mut self);

    /// Tokenizes `argv` (without the program name).
    ///
    /// The namespace holds one entry per registered descriptor of the root
    /// and of the selected submode.
    fn tokenize(&mut self, argv: &[String]) -> Result<Namespace, TokenizeError<Self::Error>>;

    /// Formats `message` as a user-facing error with the usage string.
    fn fail(&mut self, message: &str) -> Self::Error;
}

/// Registers every option descriptor and group of `spec` on `adapter`.
///
/// A mutually exclusive `spec` is registered as one group spanning its
/// members, whether it is nested, a root or a submode.
pub fn register_specification<A>(spec: &Specification, adapter: &mut A)
where
    A: ParserAdapter + ?Sized,
{
    if spec.policy() == GroupPolicy::MutuallyExclusive {
        adapter.begin_group(spec.schema_name(), spec.policy());
        register_level(spec, adapter, "");
        adapter.end_group();
    } else {
        register_level(spec, adapter, "");
    }
    debug!(
        schema = spec.schema_name(),
        options = spec.all_members().len(),
        "Registered specification"
    );
}

fn register_level<A>(spec: &Specification, adapter: &mut A, prefix: &str)
where
    A: ParserAdapter + ?Sized,
{
    for member in spec.members() {
        adapter.register(member);
    }
    for sub in spec.subspecs() {
        let path = if prefix.is_empty() {
            sub.name().to_string()
        } else {
            format!("{prefix}.{}", sub.name())
        };
        adapter.begin_group(&path, sub.policy());
        register_level(sub.spec(), adapter, &path);
        adapter.end_group();
    }
}

/// Descriptors registered on one clap command.
struct Scope {
    command: Command,
    descriptors: Vec<OptionDescriptor>,
}

impl Scope {
    fn new(command: Command) -> Self {
        Self {
            command,
            descriptors: Vec::new(),
        }
    }

    fn edit(&mut self, f: impl FnOnce(Command) -> Command) {
        let command = std::mem::replace(&mut self.command, Command::new(""));
        self.command = f(command);
    }
}

struct OpenGroup {
    id: String,
    policy: GroupPolicy,
    members: Vec<String>,
}

/// [`ParserAdapter`] backed by a `clap` [`Command`].
///
/// - Boolean flags use `SetTrue`/`SetFalse` by polarity.
/// - Scalars and lists parse through a typed value parser that enforces
///   choices and advertises them as possible values.
/// - Mutually exclusive groups become an [`ArgGroup`] with `multiple(false)`.
/// - Submodes become subcommands.
///
/// A repeated option overrides earlier occurrences.
///
/// # Examples
///
/// ```
/// use cfgspec_core::*;
///
/// let descriptor = classify("num", Arg::new("A number").default(0_i64)).unwrap();
/// let mut adapter = ClapAdapter::new("demo");
/// adapter.register(&descriptor);
///
/// let ns = adapter.tokenize(&["--num".to_string(), "7".to_string()]).unwrap();
/// assert_eq!(ns.get("num"), Some(&Value::Int(7)));
///
/// let ns = adapter.tokenize(&[]).unwrap();
/// assert_eq!(ns.get("num"), Some(&Value::Int(0)));
/// ```
pub struct ClapAdapter {
    root: Scope,
    submodes: Vec<(String, Vec<OptionDescriptor>)>,
    current_submode: Option<(String, Scope)>,
    groups: Vec<OpenGroup>,
    selected: Option<String>,
}

impl ClapAdapter {
    /// Creates an adapter for a program called `program_name`.
    pub fn new(program_name: impl Into<String>) -> Self {
        let command = Command::new(program_name.into())
            .args_override_self(true)
            .disable_help_subcommand(true);
        Self {
            root: Scope::new(command),
            submodes: Vec::new(),
            current_submode: None,
            groups: Vec::new(),
            selected: None,
        }
    }

    /// Sets the description shown at the top of the help text.
    pub fn with_about(mut self, about: impl Into<String>) -> Self {
        let about = about.into();
        self.root.edit(|command| command.about(about));
        self
    }

    /// Sets the version string and enables `-V`/`--version`.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        let version = version.into();
        self.root.edit(|command| command.version(version));
        self
    }

    /// Renders the help text of the registered command.
    pub fn render_help(&mut self) -> String {
        self.root.command.render_help().to_string()
    }

    fn scope(&mut self) -> &mut Scope {
        match &mut self.current_submode {
            Some((_, scope)) => scope,
            None => &mut self.root,
        }
    }
}

impl ParserAdapter for ClapAdapter {
    type Error = clap::Error;

    fn register(&mut self, descriptor: &OptionDescriptor) {
        let arg = clap_arg(descriptor);
        if let Some(group) = self.groups.last_mut() {
            group.members.push(descriptor.name().to_string());
        }
        let scope = self.scope();
        scope.edit(|command| command.arg(arg));
        scope.descriptors.push(descriptor.clone());
    }

    fn begin_group(&mut self, name: &str, policy: GroupPolicy) {
        self.groups.push(OpenGroup {
            id: format!("group:{name}"),
            policy,
            members: Vec::new(),
        });
    }

    fn end_group(&mut self) {
        let Some(group) = self.groups.pop() else {
            return;
        };
        if group.policy == GroupPolicy::MutuallyExclusive && !group.members.is_empty() {
            let arg_group = ArgGroup::new(group.id).args(group.members).multiple(false);
            self.scope().edit(|command| command.group(arg_group));
        }
    }

    fn begin_submode(&mut self, name: &str, about: Option<&str>) {
        let mut command = Command::new(name.to_string()).args_override_self(true);
        if let Some(about) = about {
            command = command.about(about.to_string());
        }
        self.current_submode = Some((name.to_string(), Scope::new(command)));
    }

    fn end_submode(&mut self) {
        let Some((name, scope)) = self.current_submode.take() else {
            return;
        };
        self.root.edit(|command| command.subcommand(scope.command));
        self.submodes.push((name, scope.descriptors));
    }

    fn tokenize(&mut self, argv: &[String]) -> Result<Namespace, TokenizeError<clap::Error>> {
        let program = self.root.command.get_name().to_string();
        let matches = self
            .root
            .command
            .try_get_matches_from_mut(std::iter::once(program).chain(argv.iter().cloned()))
            .map_err(TokenizeError::Usage)?;

        let mut namespace = Namespace::new();
        for descriptor in &self.root.descriptors {
            namespace.insert(descriptor.name(), extract(&matches, descriptor)?);
        }

        self.selected = None;
        if let Some((name, sub_matches)) = matches.subcommand() {
            if let Some((_, descriptors)) = self.submodes.iter().find(|(n, _)| n == name) {
                for descriptor in descriptors {
                    namespace.insert(descriptor.name(), extract(sub_matches, descriptor)?);
                }
            }
            namespace.set_submode(name);
            self.selected = Some(name.to_string());
        }

        debug!(
            entries = namespace.len(),
            submode = ?namespace.submode(),
            "Tokenized arguments"
        );
        Ok(namespace)
    }

    fn fail(&mut self, message: &str) -> clap::Error {
        let command = match &self.selected {
            Some(name) => self.root.command.find_subcommand_mut(name),
            None => None,
        };
        match command {
            Some(command) => command.error(ErrorKind::ValueValidation, message),
            None => self.root.command.error(ErrorKind::ValueValidation, message),
        }
    }
}

fn clap_arg(descriptor: &OptionDescriptor) -> clap::Arg {
    let mut arg = clap::Arg::new(descriptor.name().to_string()).help(descriptor.help().to_string());

    if !descriptor.shape().is_positional() {
        arg = with_option_names(arg, descriptor.option_names());
    }
    if let Some(metavar) = descriptor.metavar() {
        arg = arg.value_name(metavar.to_string());
    }

    let parser = |kind: ScalarKind| ScalarParser {
        kind,
        choices: descriptor.choices().map(<[Value]>::to_vec),
    };

    arg = match (descriptor.shape(), descriptor.scalar_kind()) {
        (Shape::BooleanFlag, _) => match descriptor.polarity() {
            Some(Polarity::Negating) => arg.action(ArgAction::SetFalse),
            _ => arg.action(ArgAction::SetTrue),
        },
        (shape, Some(kind)) if shape.is_list() => arg
            .action(ArgAction::Set)
            .num_args(1..)
            .required(descriptor.is_required())
            .value_parser(parser(kind)),
        (_, Some(kind)) => arg
            .action(ArgAction::Set)
            .required(descriptor.is_required())
            .value_parser(parser(kind)),
        (_, None) => arg,
    };
    match descriptor.scalar_kind() {
        Some(ScalarKind::Signed(_) | ScalarKind::Float) => arg.allow_negative_numbers(true),
        _ => arg,
    }
}

fn with_option_names(mut arg: clap::Arg, names: &[String]) -> clap::Arg {
    let mut has_long = false;
    let mut has_short = false;
    for name in names {
        if let Some(long) = name.strip_prefix("--") {
            arg = if has_long {
                arg.visible_alias(long.to_string())
            } else {
                arg.long(long.to_string())
            };
            has_long = true;
        } else if let Some(short) = name.strip_prefix('-').and_then(|s| s.chars().next()) {
            arg = if has_short {
                arg.visible_short_alias(short)
            } else {
                arg.short(short)
            };
            has_short = true;
        }
    }
    arg
}

fn extract(matches: &ArgMatches, descriptor: &OptionDescriptor) -> Result<Value, DefinitionError> {
    let id = descriptor.name();
    let unreadable = |err: MatchesError| DefinitionError::UnreadableValue {
        field: id.to_string(),
        reason: err.to_string(),
    };
    let given = match descriptor.shape() {
        Shape::BooleanFlag => matches
            .try_get_one::<bool>(id)
            .map_err(unreadable)?
            .map(|b| Value::Bool(*b)),
        shape if shape.is_list() => matches
            .try_get_many::<Value>(id)
            .map_err(unreadable)?
            .map(|values| Value::List(values.cloned().collect())),
        _ => matches.try_get_one::<Value>(id).map_err(unreadable)?.cloned(),
    };
    Ok(given
        .or_else(|| descriptor.default().cloned())
        .unwrap_or(Value::Unset))
}

/// Value parser producing a [`Value`] of one scalar kind.
#[derive(Clone)]
struct ScalarParser {
    kind: ScalarKind,
    choices: Option<Vec<Value>>,
}

impl TypedValueParser for ScalarParser {
    type Value = Value;

    fn parse_ref(
        &self,
        cmd: &Command,
        arg: Option<&clap::Arg>,
        value: &OsStr,
    ) -> Result<Value, clap::Error> {
        let target = arg.map_or_else(|| "...".to_string(), ToString::to_string);

        let parsed = match self.kind {
            ScalarKind::Path => Value::Path(PathBuf::from(value)),
            kind => {
                let text = value
                    .to_str()
                    .ok_or_else(|| clap::Error::new(ErrorKind::InvalidUtf8).with_cmd(cmd))?;
                kind.parse(text).map_err(|reason| {
                    clap::Error::raw(
                        ErrorKind::ValueValidation,
                        format!("invalid value '{text}' for '{target}': {reason}\n"),
                    )
                    .with_cmd(cmd)
                })?
            }
        };

        if let Some(choices) = &self.choices {
            if !choices.contains(&parsed) {
                let possible: Vec<String> = choices.iter().map(ToString::to_string).collect();
                return Err(clap::Error::raw(
                    ErrorKind::InvalidValue,
                    format!(
                        "invalid value '{parsed}' for '{target}'\n  [possible values: {}]\n",
                        possible.join(", ")
                    ),
                )
                .with_cmd(cmd));
            }
        }

        Ok(parsed)
    }

    fn possible_values(&self) -> Option<Box<dyn Iterator<Item = PossibleValue> + '_>> {
        let choices = self.choices.as_ref()?;
        Some(Box::new(
            choices.iter().map(|choice| PossibleValue::new(choice.to_string())),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Arg, classify};

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn usage_error(result: Result<Namespace, TokenizeError<clap::Error>>) -> clap::Error {
        match result {
            Err(TokenizeError::Usage(err)) => err,
            other => panic!("expected a usage error, got {other:?}"),
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl ParserAdapter for Recorder {
        type Error = String;

        fn register(&mut self, descriptor: &OptionDescriptor) {
            self.events.push(format!("arg {}", descriptor.name()));
        }

        fn begin_group(&mut self, name: &str, policy: GroupPolicy) {
            self.events.push(format!("begin {name} {policy:?}"));
        }

        fn end_group(&mut self) {
            self.events.push("end".to_string());
        }

        fn begin_submode(&mut self, name: &str, _: Option<&str>) {
            self.events.push(format!("submode {name}"));
        }

        fn end_submode(&mut self) {
            self.events.push("end submode".to_string());
        }

        fn tokenize(&mut self, _: &[String]) -> Result<Namespace, TokenizeError<String>> {
            Ok(Namespace::new())
        }

        fn fail(&mut self, message: &str) -> String {
            message.to_string()
        }
    }

    #[test]
    fn test_register_specification_order() {
        use crate::error::DefinitionError;
        use crate::spec::{ConfigGroup, FieldValues, Fields};

        struct Verbosity;
        impl ConfigGroup for Verbosity {
            fn declare(fields: &mut Fields<Self>) {
                fields
                    .arg("debug", Arg::<bool>::new("Debug"))
                    .arg("quiet", Arg::<bool>::new("Quiet"));
            }
            fn construct(_: &mut FieldValues) -> Result<Self, DefinitionError> {
                Ok(Verbosity)
            }
            fn group_policy() -> GroupPolicy {
                GroupPolicy::MutuallyExclusive
            }
        }

        struct Logging;
        impl ConfigGroup for Logging {
            fn declare(fields: &mut Fields<Self>) {
                fields.group::<Verbosity>("verbosity");
            }
            fn construct(_: &mut FieldValues) -> Result<Self, DefinitionError> {
                Ok(Logging)
            }
        }

        struct Root;
        impl ConfigGroup for Root {
            fn declare(fields: &mut Fields<Self>) {
                fields
                    .group::<Logging>("logging")
                    .arg("name", Arg::<String>::new("Name"));
            }
            fn construct(_: &mut FieldValues) -> Result<Self, DefinitionError> {
                Ok(Root)
            }
        }

        let spec = Specification::build::<Root>().unwrap();
        let mut recorder = Recorder::default();
        register_specification(&spec, &mut recorder);
        assert_eq!(
            recorder.events,
            [
                "arg name",
                "begin logging Plain",
                "begin logging.verbosity MutuallyExclusive",
                "arg debug",
                "arg quiet",
                "end",
                "end",
            ]
        );
    }

    #[test]
    fn test_exclusive_root_is_one_group() {
        use crate::spec::{ConfigGroup, FieldValues, Fields};

        struct Speed;
        impl ConfigGroup for Speed {
            fn declare(fields: &mut Fields<Self>) {
                fields
                    .arg("fast", Arg::<bool>::new("Fast"))
                    .arg("slow", Arg::<bool>::new("Slow"));
            }
            fn construct(_: &mut FieldValues) -> Result<Self, DefinitionError> {
                Ok(Speed)
            }
            fn group_policy() -> GroupPolicy {
                GroupPolicy::MutuallyExclusive
            }
        }

        let spec = Specification::build::<Speed>().unwrap();
        let mut recorder = Recorder::default();
        register_specification(&spec, &mut recorder);
        assert_eq!(
            recorder.events,
            [
                format!("begin {} MutuallyExclusive", spec.schema_name()),
                "arg fast".to_string(),
                "arg slow".to_string(),
                "end".to_string(),
            ]
        );

        let mut adapter = ClapAdapter::new("prog");
        register_specification(&spec, &mut adapter);
        let err = usage_error(adapter.tokenize(&argv(&["--fast", "--slow"])));
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
        let ns = adapter.tokenize(&argv(&["--slow"])).unwrap();
        assert_eq!(ns.get("fast"), Some(&Value::Bool(false)));
        assert_eq!(ns.get("slow"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_extract_reports_unreadable_value() {
        let matches = Command::new("prog")
            .arg(
                clap::Arg::new("num")
                    .long("num")
                    .value_parser(clap::value_parser!(i64)),
            )
            .try_get_matches_from(["prog", "--num", "3"])
            .unwrap();
        let descriptor = classify("num", Arg::<i64>::new("Number")).unwrap();

        let err = extract(&matches, &descriptor).unwrap_err();
        assert!(matches!(err, DefinitionError::UnreadableValue { ref field, .. } if field == "num"));
    }

    #[test]
    fn test_scalar_type_and_range_errors_are_usage_errors() {
        let mut adapter = ClapAdapter::new("prog");
        adapter.register(&classify("port", Arg::<u16>::new("Port")).unwrap());

        let err = usage_error(adapter.tokenize(&argv(&["--port", "http"])));
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        let err = usage_error(adapter.tokenize(&argv(&["--port", "70000"])));
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        let err = usage_error(adapter.tokenize(&[]));
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_choices_enforced_and_listed_in_help() {
        let mut adapter = ClapAdapter::new("prog");
        let format = Arg::<String>::new("Output format")
            .choices(["json".to_string(), "yaml".to_string()])
            .default("json".to_string());
        adapter.register(&classify("format", format).unwrap());

        let err = usage_error(adapter.tokenize(&argv(&["--format", "toml"])));
        assert_eq!(err.kind(), ErrorKind::InvalidValue);

        let ns = adapter.tokenize(&argv(&["--format", "yaml"])).unwrap();
        assert_eq!(ns.get("format"), Some(&Value::Str("yaml".into())));

        assert!(adapter.render_help().contains("possible values: json, yaml"));
    }

    #[test]
    fn test_negating_flag() {
        let mut adapter = ClapAdapter::new("prog");
        let color = Arg::new("Colorize output").names(["--no-color"]).default(true);
        adapter.register(&classify("color", color).unwrap());

        let ns = adapter.tokenize(&[]).unwrap();
        assert_eq!(ns.get("color"), Some(&Value::Bool(true)));
        let ns = adapter.tokenize(&argv(&["--no-color"])).unwrap();
        assert_eq!(ns.get("color"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_lists_and_positionals() {
        let mut adapter = ClapAdapter::new("prog");
        adapter.register(&classify("target", Arg::<String>::new("Target").positional()).unwrap());
        adapter.register(
            &classify(
                "files",
                Arg::<Vec<PathBuf>>::new("Files")
                    .positional()
                    .default_factory(Vec::new),
            )
            .unwrap(),
        );
        adapter.register(
            &classify(
                "tags",
                Arg::<Vec<String>>::new("Tags").default_factory(Vec::new),
            )
            .unwrap(),
        );

        let ns = adapter
            .tokenize(&argv(&["host", "a.txt", "b.txt", "--tags", "x", "y"]))
            .unwrap();
        assert_eq!(ns.get("target"), Some(&Value::Str("host".into())));
        assert_eq!(
            ns.get("files"),
            Some(&Value::List(vec![
                Value::Path("a.txt".into()),
                Value::Path("b.txt".into())
            ]))
        );
        assert_eq!(
            ns.get("tags"),
            Some(&Value::List(vec![Value::Str("x".into()), Value::Str("y".into())]))
        );

        let ns = adapter.tokenize(&argv(&["host"])).unwrap();
        assert_eq!(ns.get("files"), Some(&Value::List(Vec::new())));
        assert_eq!(ns.get("tags"), Some(&Value::List(Vec::new())));
    }

    #[test]
    fn test_repeated_option_last_wins() {
        let mut adapter = ClapAdapter::new("prog");
        adapter.register(&classify("level", Arg::new("Level").names(["-l", "--level"]).default(1_u8)).unwrap());

        let ns = adapter.tokenize(&argv(&["-l", "2", "--level", "3"])).unwrap();
        assert_eq!(ns.get("level"), Some(&Value::UInt(3)));
    }

    #[test]
    fn test_negative_numbers_are_values() {
        let mut adapter = ClapAdapter::new("prog");
        adapter.register(&classify("offset", Arg::<i32>::new("Offset")).unwrap());
        adapter.register(&classify("scale", Arg::new("Scale").default(1.0_f64)).unwrap());

        let ns = adapter.tokenize(&argv(&["--offset", "-5", "--scale", "-0.5"])).unwrap();
        assert_eq!(ns.get("offset"), Some(&Value::Int(-5)));
        assert_eq!(ns.get("scale"), Some(&Value::Float(-0.5)));
    }

    #[test]
    fn test_unset_optional_scalar() {
        let mut adapter = ClapAdapter::new("prog");
        adapter.register(&classify("out", Arg::<Option<PathBuf>>::new("Output")).unwrap());

        let ns = adapter.tokenize(&[]).unwrap();
        assert_eq!(ns.get("out"), Some(&Value::Unset));
    }

    #[test]
    fn test_fail_formats_usage() {
        let mut adapter = ClapAdapter::new("prog");
        adapter.register(&classify("num", Arg::new("Number").default(0_i32)).unwrap());
        let err = adapter.fail("num must be positive");
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        let rendered = err.to_string();
        assert!(rendered.contains("num must be positive"));
        assert!(rendered.contains("Usage:"));
    }
}
