//! LibXML2 FFI binding for the schema engine.
//!
//! There is no mature pure Rust XSD validator, so schema compilation,
//! document parsing and validation go straight to libxml2. This module is
//! the only place with `unsafe` code; everything above it sees the
//! [`SchemaEngine`] trait and owned handles that free their libxml2
//! structures on drop.
//!
//! ## Thread Safety
//!
//! - **Schema parsing** is NOT thread-safe in libxml2 and is serialized
//!   behind [`SCHEMA_PARSE_LOCK`].
//! - **Document parsing and validation** only touch per-call contexts.
//! - Diagnostics are captured through structured error callbacks; the
//!   global handler is installed only for the duration of one call and is
//!   per-thread state in libxml2.

use std::ffi::{CStr, CString};
use std::path::Path;
use std::ptr::{self, NonNull};
use std::sync::{Mutex, Once};

use libc::{c_char, c_int, c_void};

use crate::engine::{EngineReport, SchemaEngine, Severity, Violation};
use crate::error::{EngineError, EngineResult};

/// Global initialization flag for libxml2
///
/// libxml2's initialization functions are NOT thread-safe, so they run
/// exactly once behind `std::sync::Once`.
static LIBXML2_INIT: Once = Once::new();

/// Serializes `xmlSchemaParse`, which shares parser state across threads
static SCHEMA_PARSE_LOCK: Mutex<()> = Mutex::new(());

/// Options used by libxml2 itself when loading schema documents
const SCHEMA_DOC_PARSE_OPTIONS: c_int = 1 << 1; // XML_PARSE_NOENT

// Opaque libxml2 structures
#[repr(C)]
pub struct XmlSchema {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaParserCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaValidCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlDoc {
    _private: [u8; 0],
}

#[repr(C)]
pub struct xmlError {
    pub domain: c_int,
    pub code: c_int,
    pub message: *const c_char,
    pub level: c_int,
    pub file: *const c_char,
    pub line: c_int,
    pub str1: *const c_char,
    pub str2: *const c_char,
    pub str3: *const c_char,
    pub int1: c_int,
    pub int2: c_int,
    pub ctxt: *mut c_void,
    pub node: *mut c_void,
}

pub type XmlStructuredErrorFunc =
    Option<unsafe extern "C" fn(user_data: *mut c_void, error: *mut xmlError)>;

// External libxml2 FFI declarations
#[cfg_attr(target_os = "windows", link(name = "libxml2"))]
#[cfg_attr(not(target_os = "windows"), link(name = "xml2"))]
unsafe extern "C" {
    pub fn xmlInitParser();

    // Document parsing
    pub fn xmlReadMemory(
        buffer: *const c_char,
        size: c_int,
        url: *const c_char,
        encoding: *const c_char,
        options: c_int,
    ) -> *mut XmlDoc;
    pub fn xmlFreeDoc(doc: *mut XmlDoc);
    pub fn xmlSetStructuredErrorFunc(ctx: *mut c_void, handler: XmlStructuredErrorFunc);

    // Schema parsing
    pub fn xmlSchemaNewMemParserCtxt(
        buffer: *const c_char,
        size: c_int,
    ) -> *mut XmlSchemaParserCtxt;
    pub fn xmlSchemaNewDocParserCtxt(doc: *mut XmlDoc) -> *mut XmlSchemaParserCtxt;
    pub fn xmlSchemaSetParserStructuredErrors(
        ctxt: *mut XmlSchemaParserCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    pub fn xmlSchemaParse(ctxt: *mut XmlSchemaParserCtxt) -> *mut XmlSchema;
    pub fn xmlSchemaFreeParserCtxt(ctxt: *mut XmlSchemaParserCtxt);
    pub fn xmlSchemaFree(schema: *mut XmlSchema);

    // Schema validation
    pub fn xmlSchemaNewValidCtxt(schema: *mut XmlSchema) -> *mut XmlSchemaValidCtxt;
    pub fn xmlSchemaFreeValidCtxt(ctxt: *mut XmlSchemaValidCtxt);
    pub fn xmlSchemaSetValidStructuredErrors(
        ctxt: *mut XmlSchemaValidCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    pub fn xmlSchemaValidateDoc(ctxt: *mut XmlSchemaValidCtxt, doc: *mut XmlDoc) -> c_int;
}

/// Diagnostics collected by [`structured_error_callback`]
#[derive(Debug, Default)]
struct DiagnosticSink {
    entries: Vec<(Severity, Violation)>,
}

impl DiagnosticSink {
    fn as_user_data(&mut self) -> *mut c_void {
        self as *mut DiagnosticSink as *mut c_void
    }

    fn messages(&self) -> Vec<String> {
        self.entries.iter().map(|(_, v)| v.message.clone()).collect()
    }

    fn into_report(self) -> EngineReport {
        let mut report = EngineReport::default();
        for (severity, violation) in self.entries {
            if severity >= Severity::Error {
                report.violations.push(violation);
            } else {
                report.warnings.push(violation);
            }
        }
        report
    }
}

/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn c_str_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    let c_str = unsafe { CStr::from_ptr(ptr) };
    Some(c_str.to_string_lossy().trim().to_string())
}

fn positive(value: c_int) -> Option<u32> {
    u32::try_from(value).ok().filter(|v| *v > 0)
}

/// Callback for libxml2 to report diagnostics (structured)
unsafe extern "C" fn structured_error_callback(user_data: *mut c_void, error: *mut xmlError) {
    if user_data.is_null() || error.is_null() {
        return;
    }
    let sink = unsafe { &mut *(user_data as *mut DiagnosticSink) };
    let error = unsafe { &*error };

    let Some(message) = (unsafe { c_str_to_string(error.message) }) else {
        return;
    };
    let severity = match error.level {
        1 => Severity::Warning,
        3 => Severity::Fatal,
        _ => Severity::Error,
    };

    sink.entries.push((
        severity,
        Violation {
            message,
            line: positive(error.line),
            column: positive(error.int2),
            file: unsafe { c_str_to_string(error.file) },
        },
    ));
}

/// Routes libxml2's thread-global structured errors into a sink until dropped
struct GlobalErrorCapture;

impl GlobalErrorCapture {
    /// # Safety
    ///
    /// `sink` must outlive the returned guard.
    unsafe fn install(sink: *mut c_void) -> Self {
        unsafe { xmlSetStructuredErrorFunc(sink, Some(structured_error_callback)) };
        GlobalErrorCapture
    }
}

impl Drop for GlobalErrorCapture {
    fn drop(&mut self) {
        unsafe { xmlSetStructuredErrorFunc(ptr::null_mut(), None) };
    }
}

/// Compiled schema owned by one run.
///
/// When compiled against an explicit base URI the schema keeps the parsed
/// schema document alive: it is freed after the schema, never before.
#[derive(Debug)]
pub struct LibXml2Schema {
    schema: NonNull<XmlSchema>,
    source_doc: Option<NonNull<XmlDoc>>,
}

impl LibXml2Schema {
    pub(crate) fn as_ptr(&self) -> *mut XmlSchema {
        self.schema.as_ptr()
    }
}

impl Drop for LibXml2Schema {
    fn drop(&mut self) {
        unsafe {
            xmlSchemaFree(self.schema.as_ptr());
            if let Some(doc) = self.source_doc.take() {
                xmlFreeDoc(doc.as_ptr());
            }
        }
    }
}

/// Parsed document owned by one run
#[derive(Debug)]
pub struct LibXml2Document {
    doc: NonNull<XmlDoc>,
}

impl LibXml2Document {
    pub(crate) fn as_ptr(&self) -> *mut XmlDoc {
        self.doc.as_ptr()
    }
}

impl Drop for LibXml2Document {
    fn drop(&mut self) {
        unsafe { xmlFreeDoc(self.doc.as_ptr()) };
    }
}

/// Validation result from libxml2
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Validation succeeded (return code 0)
    Valid,
    /// Validation failed with errors (positive libxml2 error code)
    Invalid { code: i32, errors: Vec<Violation> },
    /// Internal error occurred (return code < 0)
    InternalError { code: i32 },
}

impl ValidationResult {
    /// Create ValidationResult from libxml2 return code and captured errors
    pub fn from_code(code: c_int, errors: Vec<Violation>) -> Self {
        match code {
            0 => ValidationResult::Valid,
            n if n > 0 => ValidationResult::Invalid { code: n, errors },
            n => ValidationResult::InternalError { code: n },
        }
    }
}

fn buffer_len(bytes: &[u8]) -> EngineResult<c_int> {
    c_int::try_from(bytes.len()).map_err(|_| EngineError::InputTooLarge { size: bytes.len() })
}

fn path_to_c_string(path: &Path) -> EngineResult<CString> {
    path.to_str()
        .and_then(|s| CString::new(s).ok())
        .ok_or_else(|| EngineError::InvalidPath {
            path: path.to_path_buf(),
        })
}

/// libxml2-backed [`SchemaEngine`]
pub struct LibXml2Engine {
    _private: (),
}

impl LibXml2Engine {
    /// Create a new engine, initializing libxml2 on first use.
    ///
    /// Safe to call any number of times from any thread.
    pub fn new() -> Self {
        LIBXML2_INIT.call_once(|| unsafe {
            xmlInitParser();
        });

        LibXml2Engine { _private: () }
    }

    /// Run `xmlSchemaParse` on a freshly created parser context.
    ///
    /// Takes ownership of `parser_ctxt` and frees it.
    unsafe fn parse_with_context(
        &self,
        parser_ctxt: *mut XmlSchemaParserCtxt,
        sink: &mut DiagnosticSink,
    ) -> *mut XmlSchema {
        let user_data = sink.as_user_data();
        unsafe {
            xmlSchemaSetParserStructuredErrors(
                parser_ctxt,
                Some(structured_error_callback),
                user_data,
            );

            // Included documents are read by an internal parser that reports
            // through the global handler
            let capture = GlobalErrorCapture::install(user_data);
            let schema_ptr = xmlSchemaParse(parser_ctxt);
            drop(capture);

            xmlSchemaFreeParserCtxt(parser_ctxt);
            schema_ptr
        }
    }

    fn compile_from_memory(&self, bytes: &[u8]) -> EngineResult<LibXml2Schema> {
        let len = buffer_len(bytes)?;
        let mut sink = DiagnosticSink::default();

        let schema_ptr = unsafe {
            let parser_ctxt = xmlSchemaNewMemParserCtxt(bytes.as_ptr() as *const c_char, len);
            if parser_ctxt.is_null() {
                return Err(EngineError::MemoryAllocation);
            }
            self.parse_with_context(parser_ctxt, &mut sink)
        };

        match NonNull::new(schema_ptr) {
            Some(schema) => Ok(LibXml2Schema {
                schema,
                source_doc: None,
            }),
            None => Err(EngineError::SchemaParseFailed {
                diagnostics: sink.messages(),
            }),
        }
    }

    fn compile_with_base(&self, bytes: &[u8], base: &Path) -> EngineResult<LibXml2Schema> {
        let len = buffer_len(bytes)?;
        let url = path_to_c_string(base)?;
        let mut sink = DiagnosticSink::default();

        let doc = unsafe {
            let capture = GlobalErrorCapture::install(sink.as_user_data());
            let doc = xmlReadMemory(
                bytes.as_ptr() as *const c_char,
                len,
                url.as_ptr(),
                ptr::null(),
                SCHEMA_DOC_PARSE_OPTIONS,
            );
            drop(capture);
            doc
        };
        let doc = NonNull::new(doc).ok_or_else(|| EngineError::SchemaParseFailed {
            diagnostics: sink.messages(),
        })?;

        let schema_ptr = unsafe {
            let parser_ctxt = xmlSchemaNewDocParserCtxt(doc.as_ptr());
            if parser_ctxt.is_null() {
                xmlFreeDoc(doc.as_ptr());
                return Err(EngineError::MemoryAllocation);
            }
            self.parse_with_context(parser_ctxt, &mut sink)
        };

        match NonNull::new(schema_ptr) {
            Some(schema) => Ok(LibXml2Schema {
                schema,
                source_doc: Some(doc),
            }),
            None => {
                unsafe { xmlFreeDoc(doc.as_ptr()) };
                Err(EngineError::SchemaParseFailed {
                    diagnostics: sink.messages(),
                })
            }
        }
    }
}

impl Default for LibXml2Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaEngine for LibXml2Engine {
    type Schema = LibXml2Schema;
    type Document = LibXml2Document;

    fn compile_schema(&self, bytes: &[u8], base: Option<&Path>) -> EngineResult<LibXml2Schema> {
        let _guard = SCHEMA_PARSE_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match base {
            Some(base) => self.compile_with_base(bytes, base),
            None => self.compile_from_memory(bytes),
        }
    }

    fn parse_document(&self, bytes: &[u8], name: Option<&Path>) -> EngineResult<LibXml2Document> {
        let len = buffer_len(bytes)?;
        let url = name.map(path_to_c_string).transpose()?;
        let url_ptr = url.as_ref().map_or(ptr::null(), |u| u.as_ptr());
        let mut sink = DiagnosticSink::default();

        let doc = unsafe {
            let capture = GlobalErrorCapture::install(sink.as_user_data());
            let doc = xmlReadMemory(
                bytes.as_ptr() as *const c_char,
                len,
                url_ptr,
                ptr::null(),
                0,
            );
            drop(capture);
            doc
        };

        NonNull::new(doc)
            .map(|doc| LibXml2Document { doc })
            .ok_or_else(|| EngineError::DocumentParseFailed {
                diagnostics: sink.messages(),
            })
    }

    fn validate(
        &self,
        schema: &LibXml2Schema,
        document: &LibXml2Document,
    ) -> EngineResult<EngineReport> {
        let mut sink = DiagnosticSink::default();

        let result_code = unsafe {
            let valid_ctxt = xmlSchemaNewValidCtxt(schema.as_ptr());
            if valid_ctxt.is_null() {
                return Err(EngineError::ValidationContextCreationFailed);
            }

            xmlSchemaSetValidStructuredErrors(
                valid_ctxt,
                Some(structured_error_callback),
                sink.as_user_data(),
            );

            let code = xmlSchemaValidateDoc(valid_ctxt, document.as_ptr());

            // Always free the validation context
            xmlSchemaFreeValidCtxt(valid_ctxt);
            code
        };

        let report = sink.into_report();
        match ValidationResult::from_code(result_code, report.violations) {
            ValidationResult::Valid => Ok(EngineReport {
                violations: Vec::new(),
                warnings: report.warnings,
            }),
            ValidationResult::Invalid { code, errors } => {
                if errors.is_empty() {
                    return Err(EngineError::MissingDiagnostics { code });
                }
                Ok(EngineReport {
                    violations: errors,
                    warnings: report.warnings,
                })
            }
            ValidationResult::InternalError { code } => Err(EngineError::InternalError { code }),
        }
    }
}
