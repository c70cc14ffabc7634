//! Loading files named on the command line through transforms, and
//! collapsing a group into a single value with a class transform.
//!
//! # Usage
//!
//! ```bash
//! echo '{"name": "nightly", "retries": 3}' > /tmp/job.json
//! cargo run -p cfgspec-demos --example transforms -- /tmp/job.json --host ci.example.org
//! cargo run -p cfgspec-demos --example transforms -- /tmp/job.json --outline
//! ```

use std::path::PathBuf;

use cfgspec_core::{
    Arg, ConfigGroup, DefinitionError, FieldValues, Fields, Specification, parse, transforms,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct JobFile {
    name: String,
    retries: u32,
}

struct Endpoint {
    host: String,
    port: u16,
}

impl ConfigGroup for Endpoint {
    fn declare(fields: &mut Fields<Self>) {
        fields
            .arg("host", Arg::new("Server host").default("localhost".to_string()))
            .arg("port", Arg::new("Server port").names(["-p", "--port"]).default(8080_u16));
    }

    fn construct(values: &mut FieldValues) -> Result<Self, DefinitionError> {
        Ok(Self {
            host: values.take("host")?,
            port: values.take("port")?,
        })
    }
}

struct Config {
    job: JobFile,
    server: String,
    outline: bool,
}

impl ConfigGroup for Config {
    fn declare(fields: &mut Fields<Self>) {
        fields
            .arg(
                "job",
                Arg::<PathBuf>::new("JSON job description")
                    .positional()
                    .metavar("JOB_FILE")
                    .try_transform(transforms::json_file::<JobFile>),
            )
            .group_transform::<Endpoint, _, _>("server", |endpoint: Endpoint| {
                format!("{}:{}", endpoint.host, endpoint.port)
            })
            .arg("outline", Arg::<bool>::new("Print the derived command line as YAML"));
    }

    fn construct(values: &mut FieldValues) -> Result<Self, DefinitionError> {
        Ok(Self {
            job: values.take("job")?,
            server: values.take("server")?,
            outline: values.take("outline")?,
        })
    }
}

fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let config: Config = match parse(std::env::args().skip(1), Some("transforms")) {
        Ok(config) => config,
        Err(err) => err.exit(),
    };

    if config.outline {
        let rendered = Specification::build::<Config>().map(|spec| spec.outline().to_yaml());
        match rendered {
            Ok(Ok(yaml)) => print!("{yaml}"),
            Ok(Err(err)) => tracing::error!(error = %err, "Failed to render outline"),
            Err(err) => tracing::error!(error = %err, "Invalid schema"),
        }
        return;
    }

    println!(
        "job {} ({} retries) on {}",
        config.job.name, config.job.retries, config.server
    );
}
