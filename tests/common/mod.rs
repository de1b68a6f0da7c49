#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// Serializes tests that depend on the process working directory
static CWD_LOCK: Mutex<()> = Mutex::new(());

pub fn cwd_lock() -> MutexGuard<'static, ()> {
    CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

/// Test fixture paths
pub struct TestFixtures {
    pub fixtures_dir: PathBuf,
}

impl TestFixtures {
    pub fn new() -> Self {
        let fixtures_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures");

        Self { fixtures_dir }
    }

    pub fn schemas_dir(&self) -> PathBuf {
        self.fixtures_dir.join("schemas")
    }

    pub fn xml_valid_dir(&self) -> PathBuf {
        self.fixtures_dir.join("xml").join("valid")
    }

    pub fn xml_invalid_dir(&self) -> PathBuf {
        self.fixtures_dir.join("xml").join("invalid")
    }

    pub fn xml_malformed_dir(&self) -> PathBuf {
        self.fixtures_dir.join("xml").join("malformed")
    }

    pub fn person_schema(&self) -> PathBuf {
        self.schemas_dir().join("person.xsd")
    }

    pub fn person_valid(&self) -> PathBuf {
        self.xml_valid_dir().join("person.xml")
    }

    pub fn person_invalid(&self) -> PathBuf {
        self.xml_invalid_dir().join("person_two_errors.xml")
    }

    pub fn malformed_xml(&self) -> PathBuf {
        self.xml_malformed_dir().join("unclosed.xml")
    }

    /// Directory holding a schema and the schema it includes
    pub fn include_dir(&self) -> PathBuf {
        self.schemas_dir().join("include").join("a").join("b")
    }

    /// Schema with `<xs:include schemaLocation="common.xsd"/>`
    pub fn including_schema(&self) -> PathBuf {
        self.include_dir().join("schema.xsd")
    }

    /// Schema whose include target does not exist
    pub fn missing_include_schema(&self) -> PathBuf {
        self.include_dir().join("missing_include.xsd")
    }

    pub fn order_valid(&self) -> PathBuf {
        self.xml_valid_dir().join("order.xml")
    }

    pub fn order_invalid(&self) -> PathBuf {
        self.xml_invalid_dir().join("order_bad_values.xml")
    }

    /// `a.xsd -> b.xsd -> a.xsd`
    pub fn cyclic_schema(&self) -> PathBuf {
        self.schemas_dir().join("cycle").join("a.xsd")
    }

    /// `urn:a` schema importing `urn:b`, which imports `urn:a` back
    pub fn mutually_importing_schema(&self) -> PathBuf {
        self.schemas_dir().join("import").join("a.xsd")
    }

    pub fn coded_order_valid(&self) -> PathBuf {
        self.xml_valid_dir().join("coded_order.xml")
    }
}

impl Default for TestFixtures {
    fn default() -> Self {
        Self::new()
    }
}

pub fn path_arg(path: &std::path::Path) -> String {
    path.to_str().expect("fixture paths are UTF-8").to_string()
}
