//! Static scan of a schema's local include graph.
//!
//! libxml2 silently skips documents it has already loaded, so a cycle such
//! as `a.xsd -> b.xsd -> a.xsd` compiles or fails depending on which
//! component definitions happen to be visible. The scan rejects such graphs
//! up front with the full cycle path.
//!
//! Only `include`, `redefine` and `override` can form a cycle. Those pull
//! components into the referring schema's own namespace. Schemas in
//! different namespaces may `import` each other freely; import edges only
//! count toward the depth limit.
//!
//! Only local references are followed. Remote locations (`http://`, ...)
//! are left to the engine, as are references to files that cannot be read.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::paths::containing_directory;

static REFERENCE_REGEX: OnceLock<Regex> = OnceLock::new();
static COMMENT_REGEX: OnceLock<Regex> = OnceLock::new();

/// Element name and `schemaLocation` of include, import, redefine and override elements
fn get_reference_regex() -> &'static Regex {
    REFERENCE_REGEX.get_or_init(|| {
        Regex::new(
            r#"<(?:[A-Za-z_][\w.-]*:)?(include|import|redefine|override)\b[^>]*?\bschemaLocation\s*=\s*(?:"([^"]*)"|'([^']*)')"#,
        )
        .expect("Failed to compile schema reference regex")
    })
}

fn get_comment_regex() -> &'static Regex {
    COMMENT_REGEX.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").expect("Failed to compile comment regex"))
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IncludeGraphError {
    #[error("circular schema reference: {}", format_cycle(.cycle))]
    Cycle { cycle: Vec<PathBuf> },

    #[error("schema references nested deeper than {limit} levels at {path}")]
    TooDeep { limit: usize, path: PathBuf },
}

fn format_cycle(cycle: &[PathBuf]) -> String {
    cycle
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// How a schema pulls in another schema document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// `include`, `redefine` or `override`: same target namespace
    Composition,
    /// `import`: another namespace
    Import,
}

/// One `schemaLocation` found in schema text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaReference {
    pub kind: ReferenceKind,
    pub location: String,
}

/// Non-empty `schemaLocation` references in schema text, in order
pub fn extract_references(content: &str) -> Vec<SchemaReference> {
    let without_comments = get_comment_regex().replace_all(content, "");
    get_reference_regex()
        .captures_iter(&without_comments)
        .filter_map(|caps| {
            let kind = match &caps[1] {
                "import" => ReferenceKind::Import,
                _ => ReferenceKind::Composition,
            };
            let location = caps.get(2).or_else(|| caps.get(3))?.as_str().trim();
            (!location.is_empty()).then(|| SchemaReference {
                kind,
                location: location.to_string(),
            })
        })
        .collect()
}

/// Map a `schemaLocation` to a local path, or `None` for remote locations
fn local_reference(location: &str, referrer: &Path) -> Option<PathBuf> {
    let location = match location.strip_prefix("file://") {
        Some(rest) => rest,
        None if location.contains("://") => return None,
        None => location,
    };
    let path = Path::new(location);
    if path.is_absolute() {
        Some(path.to_path_buf())
    } else {
        Some(containing_directory(referrer).join(path))
    }
}

fn identity(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Walks the local reference graph rooted at one schema
pub struct IncludeGraphScanner {
    max_depth: usize,
}

impl IncludeGraphScanner {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Scan the graph rooted at `root`, whose text is `content`.
    ///
    /// Returns every local schema file reached, root first.
    pub fn scan(&self, root: &Path, content: &str) -> Result<Vec<PathBuf>, IncludeGraphError> {
        let mut walk = Walk {
            max_depth: self.max_depth,
            stack: Vec::new(),
            on_stack: HashSet::new(),
            done: HashSet::new(),
            reached: Vec::new(),
        };
        walk.visit(
            root,
            identity(root),
            Some(content.to_string()),
            ReferenceKind::Composition,
            0,
        )?;
        tracing::debug!(root = %root.display(), files = walk.reached.len(), "scanned schema references");
        Ok(walk.reached)
    }
}

struct Walk {
    max_depth: usize,
    /// Files being scanned, each with the kind of edge that reached it
    stack: Vec<(PathBuf, ReferenceKind)>,
    on_stack: HashSet<PathBuf>,
    done: HashSet<PathBuf>,
    reached: Vec<PathBuf>,
}

impl Walk {
    fn visit(
        &mut self,
        path: &Path,
        id: PathBuf,
        content: Option<String>,
        kind: ReferenceKind,
        depth: usize,
    ) -> Result<(), IncludeGraphError> {
        if self.on_stack.contains(&id) {
            let start = self.stack.iter().position(|(p, _)| *p == id).unwrap_or(0);
            let composition_only = kind == ReferenceKind::Composition
                && self.stack[start + 1..]
                    .iter()
                    .all(|(_, entered)| *entered == ReferenceKind::Composition);
            if !composition_only {
                // a loop through an import is legal XSD
                return Ok(());
            }
            let mut cycle: Vec<PathBuf> =
                self.stack[start..].iter().map(|(p, _)| p.clone()).collect();
            cycle.push(id);
            return Err(IncludeGraphError::Cycle { cycle });
        }
        if self.done.contains(&id) {
            return Ok(());
        }
        if depth > self.max_depth {
            return Err(IncludeGraphError::TooDeep {
                limit: self.max_depth,
                path: path.to_path_buf(),
            });
        }

        let content = match content {
            Some(content) => content,
            None => match fs::read(path) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(err) => {
                    tracing::debug!(path = %path.display(), error = %err, "unreadable schema reference left to the engine");
                    self.done.insert(id);
                    return Ok(());
                }
            },
        };

        self.stack.push((id.clone(), kind));
        self.on_stack.insert(id.clone());
        self.reached.push(path.to_path_buf());

        for reference in extract_references(&content) {
            if let Some(child) = local_reference(&reference.location, path) {
                let child_id = identity(&child);
                self.visit(&child, child_id, None, reference.kind, depth + 1)?;
            }
        }

        self.stack.pop();
        self.on_stack.remove(&id);
        self.done.insert(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn schema_including(locations: &[&str]) -> String {
        let mut content = String::from(
            r#"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
"#,
        );
        for location in locations {
            content.push_str(&format!("    <xs:include schemaLocation=\"{}\"/>\n", location));
        }
        content.push_str("</xs:schema>\n");
        content
    }

    fn schema_importing(namespace: &str, imports: &[(&str, &str)]) -> String {
        let mut content = format!(
            r#"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="{}">
"#,
            namespace
        );
        for (imported, location) in imports {
            content.push_str(&format!(
                "    <xs:import namespace=\"{}\" schemaLocation=\"{}\"/>\n",
                imported, location
            ));
        }
        content.push_str("</xs:schema>\n");
        content
    }

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_extract_references() {
        let content = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <!-- <xs:include schemaLocation="commented.xsd"/> -->
  <xs:include schemaLocation="common.xsd"/>
  <xs:import namespace="urn:x"
             schemaLocation='types/x.xsd'/>
  <redefine schemaLocation="base.xsd"></redefine>
  <xsd:override schemaLocation="over.xsd"/>
  <xs:import namespace="urn:no-location"/>
  <xs:element name="include" type="xs:string"/>
</xs:schema>"#;

        let references = extract_references(content);
        let locations: Vec<_> = references.iter().map(|r| r.location.as_str()).collect();
        assert_eq!(locations, vec!["common.xsd", "types/x.xsd", "base.xsd", "over.xsd"]);
        let kinds: Vec<_> = references.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ReferenceKind::Composition,
                ReferenceKind::Import,
                ReferenceKind::Composition,
                ReferenceKind::Composition,
            ]
        );
    }

    #[test]
    fn test_remote_locations_are_skipped() {
        assert_eq!(
            local_reference("http://example.com/a.xsd", Path::new("/s/main.xsd")),
            None
        );
        assert_eq!(
            local_reference("file:///abs/a.xsd", Path::new("/s/main.xsd")),
            Some(PathBuf::from("/abs/a.xsd"))
        );
        assert_eq!(
            local_reference("sub/a.xsd", Path::new("/s/main.xsd")),
            Some(PathBuf::from("/s/sub/a.xsd"))
        );
    }

    #[test]
    fn test_acyclic_graph_lists_files() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        write(dir, "common.xsd", &schema_including(&[]));
        let main = write(dir, "main.xsd", &schema_including(&["common.xsd"]));

        let scanner = IncludeGraphScanner::new(16);
        let reached = scanner
            .scan(&main, &fs::read_to_string(&main).unwrap())
            .unwrap();

        assert_eq!(reached, vec![main.clone(), dir.join("common.xsd")]);
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        write(dir, "d.xsd", &schema_including(&[]));
        write(dir, "b.xsd", &schema_including(&["d.xsd"]));
        write(dir, "c.xsd", &schema_including(&["d.xsd"]));
        let a = write(dir, "a.xsd", &schema_including(&["b.xsd", "c.xsd"]));

        let reached = IncludeGraphScanner::new(16)
            .scan(&a, &fs::read_to_string(&a).unwrap())
            .unwrap();
        assert_eq!(reached.len(), 4);
    }

    #[test]
    fn test_two_file_cycle_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        write(dir, "b.xsd", &schema_including(&["a.xsd"]));
        let a = write(dir, "a.xsd", &schema_including(&["b.xsd"]));

        let err = IncludeGraphScanner::new(16)
            .scan(&a, &fs::read_to_string(&a).unwrap())
            .unwrap_err();

        match &err {
            IncludeGraphError::Cycle { cycle } => {
                assert_eq!(cycle.len(), 3);
                assert!(cycle[0].ends_with("a.xsd"));
                assert!(cycle[1].ends_with("b.xsd"));
                assert!(cycle[2].ends_with("a.xsd"));
            }
            other => panic!("Expected cycle, got {:?}", other),
        }
        assert!(err.to_string().contains(" -> "));
    }

    #[test]
    fn test_self_include_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let a = write(temp_dir.path(), "a.xsd", &schema_including(&["a.xsd"]));

        let err = IncludeGraphScanner::new(16)
            .scan(&a, &fs::read_to_string(&a).unwrap())
            .unwrap_err();
        assert!(matches!(err, IncludeGraphError::Cycle { ref cycle } if cycle.len() == 2));
    }

    #[test]
    fn test_mutual_import_is_not_a_cycle() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        write(dir, "b.xsd", &schema_importing("urn:b", &[("urn:a", "a.xsd")]));
        let a = write(dir, "a.xsd", &schema_importing("urn:a", &[("urn:b", "b.xsd")]));

        let reached = IncludeGraphScanner::new(16)
            .scan(&a, &fs::read_to_string(&a).unwrap())
            .unwrap();
        assert_eq!(reached, vec![a, dir.join("b.xsd")]);
    }

    #[test]
    fn test_include_loop_through_import_is_not_a_cycle() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        // a includes b, b imports c, c includes a
        write(dir, "c.xsd", &schema_including(&["a.xsd"]));
        write(dir, "b.xsd", &schema_importing("urn:b", &[("urn:c", "c.xsd")]));
        let a = write(dir, "a.xsd", &schema_including(&["b.xsd"]));

        let reached = IncludeGraphScanner::new(16)
            .scan(&a, &fs::read_to_string(&a).unwrap())
            .unwrap();
        assert_eq!(reached.len(), 3);
    }

    #[test]
    fn test_include_cycle_below_import_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        write(dir, "c.xsd", &schema_including(&["b.xsd"]));
        write(dir, "b.xsd", &schema_including(&["c.xsd"]));
        let a = write(dir, "a.xsd", &schema_importing("urn:a", &[("", "b.xsd")]));

        let err = IncludeGraphScanner::new(16)
            .scan(&a, &fs::read_to_string(&a).unwrap())
            .unwrap_err();
        match err {
            IncludeGraphError::Cycle { cycle } => {
                assert!(cycle[0].ends_with("b.xsd"));
                assert_eq!(cycle.len(), 3);
            }
            other => panic!("Expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_imports_count_toward_depth() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        write(dir, "s2.xsd", &schema_importing("urn:s2", &[]));
        write(dir, "s1.xsd", &schema_importing("urn:s1", &[("urn:s2", "s2.xsd")]));
        let root = write(dir, "s0.xsd", &schema_importing("urn:s0", &[("urn:s1", "s1.xsd")]));
        let content = fs::read_to_string(&root).unwrap();

        assert!(matches!(
            IncludeGraphScanner::new(1).scan(&root, &content),
            Err(IncludeGraphError::TooDeep { limit: 1, .. })
        ));
    }

    #[test]
    fn test_missing_reference_is_left_to_engine() {
        let temp_dir = TempDir::new().unwrap();
        let a = write(temp_dir.path(), "a.xsd", &schema_including(&["missing.xsd"]));

        let reached = IncludeGraphScanner::new(16)
            .scan(&a, &fs::read_to_string(&a).unwrap())
            .unwrap();
        assert_eq!(reached, vec![a]);
    }

    #[test]
    fn test_depth_limit() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        write(dir, "s3.xsd", &schema_including(&[]));
        write(dir, "s2.xsd", &schema_including(&["s3.xsd"]));
        write(dir, "s1.xsd", &schema_including(&["s2.xsd"]));
        let root = write(dir, "s0.xsd", &schema_including(&["s1.xsd"]));
        let content = fs::read_to_string(&root).unwrap();

        assert!(IncludeGraphScanner::new(3).scan(&root, &content).is_ok());
        assert!(matches!(
            IncludeGraphScanner::new(2).scan(&root, &content),
            Err(IncludeGraphError::TooDeep { limit: 2, .. })
        ));
    }
}
