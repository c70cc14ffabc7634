//! Mutually exclusive log level flags.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p cfgspec-demos --example mutually_exclusive -- --debug
//! cargo run -p cfgspec-demos --example mutually_exclusive -- --debug --quiet   # rejected
//! ```

use cfgspec_core::{
    ConfigGroup, DefinitionError, FieldValues, Fields, GroupPolicy, Arg, parse,
};
use tracing::Level;

/// Selects how chatty the program is.
struct LogLevel {
    debug: bool,
    quiet: bool,
}

impl LogLevel {
    fn level(&self) -> Level {
        if self.debug {
            Level::DEBUG
        } else if self.quiet {
            Level::ERROR
        } else {
            Level::INFO
        }
    }
}

impl ConfigGroup for LogLevel {
    fn declare(fields: &mut Fields<Self>) {
        fields
            .arg("debug", Arg::<bool>::new("Enable debug logging"))
            .arg("quiet", Arg::<bool>::new("Only output errors"));
    }

    fn construct(values: &mut FieldValues) -> Result<Self, DefinitionError> {
        Ok(Self {
            debug: values.take("debug")?,
            quiet: values.take("quiet")?,
        })
    }

    fn group_policy() -> GroupPolicy {
        GroupPolicy::MutuallyExclusive
    }
}

struct Config {
    loglevel: LogLevel,
}

impl ConfigGroup for Config {
    fn declare(fields: &mut Fields<Self>) {
        fields.group::<LogLevel>("loglevel");
    }

    fn construct(values: &mut FieldValues) -> Result<Self, DefinitionError> {
        Ok(Self {
            loglevel: values.take("loglevel")?,
        })
    }
}

fn main() {
    let config: Config = match parse(std::env::args().skip(1), Some("mutually_exclusive")) {
        Ok(config) => config,
        Err(err) => err.exit(),
    };

    tracing_subscriber::fmt()
        .with_max_level(config.loglevel.level())
        .with_target(false)
        .init();

    tracing::debug!("Debug logging enabled");
    tracing::info!("Info logging enabled");
    tracing::error!("Error logging enabled");
}
