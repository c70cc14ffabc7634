//! Post-parse validation.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p cfgspec-demos --example validation -- --natural 3
//! cargo run -p cfgspec-demos --example validation -- --natural -3   # rejected
//! ```

use cfgspec_core::{
    Arg, CfgParser, ConfigGroup, DefinitionError, FieldValues, Fields, InvalidConfig, Validator,
};
use tracing_subscriber::EnvFilter;

struct Config {
    natural: i64,
}

impl ConfigGroup for Config {
    fn declare(fields: &mut Fields<Self>) {
        fields.arg("natural", Arg::<i64>::new("A natural number"));
    }

    fn construct(values: &mut FieldValues) -> Result<Self, DefinitionError> {
        Ok(Self {
            natural: values.take("natural")?,
        })
    }

    fn validators() -> Vec<Validator<Self>> {
        vec![natural_number as Validator<Self>]
    }
}

fn natural_number(config: &Config) -> Result<(), InvalidConfig> {
    if config.natural < 0 {
        return Err(InvalidConfig::new("natural numbers must be >= 0"));
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let parser = CfgParser::new()
        .program_name("validation")
        .about("Checks that a number is natural")
        .version(env!("CARGO_PKG_VERSION"));
    let config: Config = parser
        .parse(std::env::args().skip(1))
        .unwrap_or_else(|err| err.exit());

    println!("validated natural number: {}", config.natural);
}
