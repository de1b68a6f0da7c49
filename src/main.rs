use std::io;
use std::process::ExitCode;

use anyhow::anyhow;
use clap::error::ErrorKind;
use tracing_subscriber::EnvFilter;

use validate_xml_xsd::cli::{Cli, VerbosityLevel};
use validate_xml_xsd::{app, messages};

fn init_tracing(verbosity: VerbosityLevel) -> anyhow::Result<()> {
    // RUST_LOG wins over the verbosity flags
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("failed to install log subscriber: {err}"))
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse_normalized(std::env::args_os()) {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => {
                    eprintln!("{}", messages::EN.usage);
                    ExitCode::from(1)
                }
            };
        }
    };

    if let Err(err) = init_tracing(cli.verbosity()) {
        eprintln!("{err:#}");
    }
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "validate-xml-xsd starting");

    let code = app::execute(&cli, &mut io::stdout().lock(), &mut io::stderr().lock());
    ExitCode::from(code as u8)
}
