//! A `git`-style command line with submodes sharing global options.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p cfgspec-demos --example submodes -- -v fetch origin --depth 10
//! cargo run -p cfgspec-demos --example submodes -- gc --aggressive
//! RUST_LOG=cfgspec_core=debug cargo run -p cfgspec-demos --example submodes -- gc
//! ```

use cfgspec_core::{
    Arg, ConfigGroup, DefinitionError, FieldValues, Fields, Submodes, parse_with_submodes,
};
use tracing_subscriber::EnvFilter;

struct Global {
    verbose: bool,
}

impl ConfigGroup for Global {
    fn declare(fields: &mut Fields<Self>) {
        fields.arg("verbose", Arg::<bool>::new("Print progress").names(["-v", "--verbose"]));
    }

    fn construct(values: &mut FieldValues) -> Result<Self, DefinitionError> {
        Ok(Self {
            verbose: values.take("verbose")?,
        })
    }
}

struct Fetch {
    remote: String,
    depth: Option<u32>,
}

impl ConfigGroup for Fetch {
    fn declare(fields: &mut Fields<Self>) {
        fields
            .arg("remote", Arg::<String>::new("Remote to fetch from").positional())
            .arg("depth", Arg::<Option<u32>>::new("Limit history to this many commits"));
    }

    fn construct(values: &mut FieldValues) -> Result<Self, DefinitionError> {
        Ok(Self {
            remote: values.take("remote")?,
            depth: values.take("depth")?,
        })
    }

    fn about() -> Option<&'static str> {
        Some("Download objects from a remote")
    }
}

struct Gc {
    aggressive: bool,
}

impl ConfigGroup for Gc {
    fn declare(fields: &mut Fields<Self>) {
        fields.arg("aggressive", Arg::<bool>::new("Spend more time optimizing"));
    }

    fn construct(values: &mut FieldValues) -> Result<Self, DefinitionError> {
        Ok(Self {
            aggressive: values.take("aggressive")?,
        })
    }

    fn about() -> Option<&'static str> {
        Some("Clean up unreachable objects")
    }
}

enum Mode {
    Fetch(Fetch),
    Gc(Gc),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let submodes = Submodes::new().add("fetch", Mode::Fetch).add("gc", Mode::Gc);
    let (global, mode): (Global, Mode) =
        match parse_with_submodes(std::env::args().skip(1), &submodes, Some("submodes")) {
            Ok(parsed) => parsed,
            Err(err) => err.exit(),
        };

    match mode {
        Mode::Fetch(fetch) => {
            if global.verbose {
                println!("fetching from {}", fetch.remote);
            }
            match fetch.depth {
                Some(depth) => println!("fetch {} (depth {depth})", fetch.remote),
                None => println!("fetch {} (full history)", fetch.remote),
            }
        }
        Mode::Gc(gc) => {
            if global.verbose {
                println!("collecting garbage");
            }
            println!("gc aggressive={}", gc.aggressive);
        }
    }
}
