use clap::Parser;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;

use crate::config::IncludeResolution;
use crate::error::{Result, RunError};
use crate::messages::Locale;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show errors
    Quiet,
    /// Show standard information
    #[default]
    Normal,
    /// Show violation locations and error suggestions
    Verbose,
    /// Show all available debugging information
    Debug,
}

impl VerbosityLevel {
    /// Default log filter directive for this verbosity
    pub fn log_directive(&self) -> &'static str {
        match self {
            VerbosityLevel::Quiet => "error",
            VerbosityLevel::Normal => "warn",
            VerbosityLevel::Verbose => "info",
            VerbosityLevel::Debug => "debug",
        }
    }
}

/// Report format
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

/// Validate an XML document against an XSD schema
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "validate-xml-xsd")]
#[command(about = "Validate an XML document against an XSD schema, including schemas it references")]
#[command(version)]
pub struct Cli {
    /// Path to the XML document (also accepted as -xml)
    #[arg(long = "xml", value_name = "PATH")]
    pub xml: Option<String>,

    /// Path to the XSD schema (also accepted as -xsd)
    #[arg(long = "xsd", value_name = "PATH")]
    pub xsd: Option<String>,

    /// Increase verbosity (-v locations and suggestions, -vv debug details)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Enable quiet mode (no success line)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Quiet mode",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// Configuration file (TOML or JSON)
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<String>,

    /// Report format
    #[arg(long = "format", value_enum)]
    pub format: Option<OutputFormat>,

    /// Message language
    #[arg(long = "lang", value_enum)]
    pub lang: Option<Locale>,

    /// How relative include/import locations in the schema are resolved
    #[arg(long = "include-resolution", value_enum)]
    pub include_resolution: Option<IncludeResolution>,

    /// Leave circular schema references to the engine instead of rejecting them
    #[arg(long = "allow-circular-includes")]
    pub allow_circular_includes: bool,

    /// Disable coloured output
    #[arg(long = "no-color")]
    pub no_color: bool,
}

/// Rewrite the single-dash long options `-xml`/`-xsd` to `--xml`/`--xsd`.
///
/// Arguments after a literal `--` are left alone.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut options_ended = false;
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            if options_ended {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                options_ended = true;
                return arg;
            }
            for flag in ["-xml", "-xsd"] {
                if text == flag || text.strip_prefix(flag).is_some_and(|rest| rest.starts_with('=')) {
                    return OsString::from(format!("-{}", text));
                }
            }
            arg
        })
        .collect()
}

impl Cli {
    /// Parse normalized process arguments
    pub fn try_parse_normalized<I, T>(args: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(normalize_args(args))
    }

    /// Both input paths, or the list of missing flags
    pub fn required_paths(&self) -> Result<(&str, &str)> {
        let xml = self.xml.as_deref().filter(|s| !s.is_empty());
        let xsd = self.xsd.as_deref().filter(|s| !s.is_empty());

        match (xml, xsd) {
            (Some(xml), Some(xsd)) => Ok((xml, xsd)),
            _ => {
                let mut missing = Vec::new();
                if xml.is_none() {
                    missing.push("-xml");
                }
                if xsd.is_none() {
                    missing.push("-xsd");
                }
                Err(RunError::RequiredArgumentMissing { missing })
            }
        }
    }

    /// Verbosity requested on the command line alone
    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else {
            match self.verbose {
                0 => VerbosityLevel::Normal,
                1 => VerbosityLevel::Verbose,
                _ => VerbosityLevel::Debug,
            }
        }
    }
}
