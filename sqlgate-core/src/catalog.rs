//! Immutable query catalog: code → parameterized SQL template.
//!
//! Loaded once at startup from a TOML file; lookups are pure reads.
//! Verb and placeholder count are precomputed per template so the
//! executor's policy and parameter checks never rescan SQL text.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::CatalogError;
use crate::policy::{self, StatementPolicy};

/// One catalogued statement. Immutable after load.
#[derive(Debug)]
pub struct QueryTemplate {
    pub code: String,
    pub sql: String,
    /// Leading statement keyword, lowercased
    pub verb: String,
    /// Number of `?` placeholders the template binds
    pub placeholders: usize,
    /// Whether execution yields a row set (vs. an affected count)
    pub returns_rows: bool,
}

/// On-disk catalog shape: `[queries]` table of code → SQL.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    queries: HashMap<String, String>,
}

/// Read-only mapping from query code to template.
#[derive(Debug, Default)]
pub struct QueryCatalog {
    templates: HashMap<String, Arc<QueryTemplate>>,
}

impl QueryCatalog {
    /// Load the catalog from a TOML file.
    ///
    /// Fails hard on unreadable files, invalid TOML, or empty SQL bodies.
    /// Templates whose verb the policy denies still load, with a warning;
    /// the executor's standing policy check blocks them at request time.
    pub fn load(path: &Path, policy: &StatementPolicy) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content, policy)
    }

    pub fn from_toml_str(content: &str, policy: &StatementPolicy) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(content)?;

        let mut templates = HashMap::with_capacity(file.queries.len());
        for (code, sql) in file.queries {
            let verb = policy::leading_verb(&sql)
                .ok_or_else(|| CatalogError::EmptyTemplate { code: code.clone() })?;
            if policy.is_denied(&verb) {
                tracing::warn!(
                    code = %code,
                    verb = %verb,
                    "catalog template uses a denied verb; requests for it will be rejected"
                );
            }
            let template = QueryTemplate {
                placeholders: policy::count_placeholders(&sql),
                returns_rows: policy::produces_rows(&verb),
                code: code.clone(),
                sql,
                verb,
            };
            templates.insert(code, Arc::new(template));
        }

        Ok(Self { templates })
    }

    /// Pure read; `None` means the code is unknown to this deployment.
    pub fn resolve(&self, code: &str) -> Option<Arc<QueryTemplate>> {
        self.templates.get(code).cloned()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[queries]
get_user_by_id = "SELECT id, name, email FROM users WHERE id = ?"
touch_user = "UPDATE users SET seen_at = NOW() WHERE id = ?"
purge_users = "DELETE FROM users WHERE id = ?"
"#;

    #[test]
    fn loads_and_resolves() {
        let catalog = QueryCatalog::from_toml_str(SAMPLE, &StatementPolicy::default()).unwrap();
        assert_eq!(catalog.len(), 3);

        let t = catalog.resolve("get_user_by_id").unwrap();
        assert_eq!(t.verb, "select");
        assert_eq!(t.placeholders, 1);
        assert!(t.returns_rows);

        let t = catalog.resolve("touch_user").unwrap();
        assert_eq!(t.verb, "update");
        assert!(!t.returns_rows);
    }

    #[test]
    fn unknown_code_resolves_to_none() {
        let catalog = QueryCatalog::from_toml_str(SAMPLE, &StatementPolicy::default()).unwrap();
        assert!(catalog.resolve("drop_everything").is_none());
    }

    #[test]
    fn denied_verb_still_loads() {
        // Blocked at request time by the executor, not at load time
        let catalog = QueryCatalog::from_toml_str(SAMPLE, &StatementPolicy::default()).unwrap();
        let t = catalog.resolve("purge_users").unwrap();
        assert_eq!(t.verb, "delete");
    }

    #[test]
    fn empty_sql_is_rejected() {
        let bad = "[queries]\nnoop = \"   \"\n";
        let err = QueryCatalog::from_toml_str(bad, &StatementPolicy::default()).unwrap_err();
        assert!(matches!(err, CatalogError::EmptyTemplate { .. }));
    }

    #[test]
    fn invalid_toml_is_rejected() {
        let err =
            QueryCatalog::from_toml_str("queries = 42", &StatementPolicy::default()).unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let catalog = QueryCatalog::load(file.path(), &StatementPolicy::default()).unwrap();
        assert!(catalog.resolve("get_user_by_id").is_some());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = QueryCatalog::load(
            Path::new("/nonexistent/queries.toml"),
            &StatementPolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }
}
