//! # validate-xml-xsd Library
//!
//! Validates one XML document against one XSD schema through libxml2 and
//! reports every violation, numbered in the order the engine found them.
//!
//! Relative `include`/`import` locations inside the schema resolve against
//! the schema's own directory, either by compiling inside a scoped working
//! directory change (the default) or by handing libxml2 an explicit base URI.

pub mod app;
pub mod cli;
pub mod config;
pub mod document_loader;
pub mod engine;
pub mod error;
pub mod error_reporter;
pub mod include_graph;
pub mod libxml2;
pub mod messages;
pub mod output;
pub mod paths;
pub mod pipeline;
pub mod schema_loader;
pub mod validator;
pub mod working_context;

pub use cli::{Cli, OutputFormat, VerbosityLevel};
pub use config::{CircularIncludePolicy, Config, ConfigError, ConfigManager, IncludeResolution};
pub use document_loader::DocumentLoader;
pub use engine::{EngineReport, SchemaEngine, Severity, Violation};
pub use error::{EngineError, ErrorKind, RunError};
pub use error_reporter::ErrorReporter;
pub use include_graph::{IncludeGraphError, IncludeGraphScanner};
pub use libxml2::{LibXml2Document, LibXml2Engine, LibXml2Schema};
pub use messages::Locale;
pub use output::Output;
pub use pipeline::{RunPhase, RunReport, ValidationPipeline};
pub use schema_loader::SchemaLoader;
pub use validator::{ValidationOutcome, Validator};
pub use working_context::{AmbientDirectory, ProcessDirectory, WorkingContext};
