//! Command-line run: configuration, pipeline, report and exit status.

use std::io::Write;

use crate::cli::{Cli, OutputFormat, VerbosityLevel};
use crate::config::{Config, ConfigManager};
use crate::engine::SchemaEngine;
use crate::error::RunError;
use crate::error_reporter::ErrorReporter;
use crate::libxml2::LibXml2Engine;
use crate::output::{Output, exit_code};
use crate::pipeline::{RunPhase, ValidationPipeline};

/// Run the command line with the libxml2 engine and return the exit status
pub fn execute<O: Write, E: Write>(cli: &Cli, stdout: &mut O, stderr: &mut E) -> i32 {
    execute_with(cli, LibXml2Engine::new(), stdout, stderr)
}

/// Run the command line with `engine` and return the exit status
pub fn execute_with<S, O, E>(cli: &Cli, engine: S, stdout: &mut O, stderr: &mut E) -> i32
where
    S: SchemaEngine,
    O: Write,
    E: Write,
{
    let (xml, xsd) = match cli.required_paths() {
        Ok(paths) => paths,
        Err(err) => return abort(&fallback_config(cli), &err, stdout, stderr),
    };

    let config = match ConfigManager::load_config(cli) {
        Ok(config) => config,
        Err(err) => {
            let fallback = fallback_config(cli);
            return abort(&fallback, &RunError::from(err), stdout, stderr);
        }
    };
    tracing::debug!(?config, "effective configuration");

    let pipeline = ValidationPipeline::new(engine, config.schema.clone());
    let result = pipeline.run(xml, xsd);

    match &result {
        Ok(report) => {
            let output = Output::from_config(&config);
            let rendered = output.format_report(report);
            if let Err(err) = stdout.write_all(rendered.as_bytes()) {
                tracing::error!(error = %err, "failed to write report");
                return 1;
            }
            report.phase.advance(RunPhase::Reported {
                valid: report.outcome.is_success(),
            });
            exit_code(&result)
        }
        Err(err) => abort(&config, err, stdout, stderr),
    }
}

/// Settings for reporting an error raised without a loaded configuration
fn fallback_config(cli: &Cli) -> Config {
    let mut config = Config::default();
    if let Some(format) = cli.format {
        config.output.format = format;
    }
    if let Some(lang) = cli.lang {
        config.output.locale = lang;
    }
    match cli.verbosity() {
        VerbosityLevel::Quiet => config.output.quiet = true,
        VerbosityLevel::Normal => {}
        VerbosityLevel::Verbose => config.output.verbose = true,
        VerbosityLevel::Debug => {
            config.output.verbose = true;
            config.output.debug = true;
        }
    }
    config
}

fn abort<O: Write, E: Write>(config: &Config, error: &RunError, stdout: &mut O, stderr: &mut E) -> i32 {
    let verbosity = config.verbosity();
    let reporter = ErrorReporter::with_options(
        verbosity,
        config.output.locale,
        verbosity == VerbosityLevel::Debug,
    );

    let written = match config.output.format {
        OutputFormat::Json => {
            let output = Output::from_config(config);
            stdout.write_all(output.format_json_abort(error, &reporter.message(error)).as_bytes())
        }
        OutputFormat::Human => reporter.report(error, stderr),
    };
    if let Err(err) = written {
        tracing::error!(error = %err, "failed to write error report");
    }
    1
}
