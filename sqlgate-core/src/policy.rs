//! Statement classification and the deny-verb policy.
//!
//! Templates are trusted configuration, not parsed SQL: classification
//! works on the leading keyword after stripping whitespace and comments,
//! so a commented template cannot smuggle a denied verb past the check.

use crate::error::ExecuteError;

/// Verbs whose statements produce row sets rather than an affected count.
const ROW_PRODUCING_VERBS: &[&str] = &["select", "show", "describe", "desc", "explain", "with"];

/// Deny-verb policy applied to every resolved template before execution.
#[derive(Debug, Clone)]
pub struct StatementPolicy {
    denied_verbs: Vec<String>,
}

impl Default for StatementPolicy {
    fn default() -> Self {
        Self::new(vec!["delete".to_string()])
    }
}

impl StatementPolicy {
    /// Build a policy from configured verbs. Deletion is always denied;
    /// configuration can extend the denylist, never shrink it.
    pub fn new(denied_verbs: Vec<String>) -> Self {
        let mut denied: Vec<String> = denied_verbs
            .into_iter()
            .map(|v| v.to_ascii_lowercase())
            .collect();
        if !denied.iter().any(|v| v == "delete") {
            denied.push("delete".to_string());
        }
        Self {
            denied_verbs: denied,
        }
    }

    /// Reject statements whose leading verb is denylisted.
    ///
    /// Runs before any lock or connection is touched; a denied template
    /// never reaches the database regardless of how it got catalogued.
    pub fn check(&self, verb: &str) -> Result<(), ExecuteError> {
        if self.is_denied(verb) {
            return Err(ExecuteError::ForbiddenStatement {
                verb: verb.to_string(),
            });
        }
        Ok(())
    }

    pub fn is_denied(&self, verb: &str) -> bool {
        self.denied_verbs.iter().any(|d| d == verb)
    }
}

/// Extract the statement's leading keyword, lowercased.
///
/// Skips whitespace, `-- line` comments, and `/* block */` comments
/// before taking the first run of alphabetic characters. Returns `None`
/// for templates with no keyword at all.
pub fn leading_verb(sql: &str) -> Option<String> {
    let rest = skip_leading_trivia(sql);
    let verb: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    if verb.is_empty() {
        None
    } else {
        Some(verb.to_ascii_lowercase())
    }
}

/// Whether a statement with this verb returns rows (vs. an affected count).
pub fn produces_rows(verb: &str) -> bool {
    ROW_PRODUCING_VERBS.contains(&verb)
}

/// Count `?` placeholders, ignoring those inside quoted strings,
/// quoted identifiers, and comments.
pub fn count_placeholders(sql: &str) -> usize {
    let mut count = 0;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '?' => count += 1,
            '\'' | '"' | '`' => skip_quoted(&mut chars, c),
            '-' if chars.peek() == Some(&'-') => {
                chars.next();
                skip_line_comment(&mut chars);
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                skip_block_comment(&mut chars);
            }
            _ => {}
        }
    }

    count
}

fn skip_leading_trivia(sql: &str) -> &str {
    let mut rest = sql;
    loop {
        rest = rest.trim_start();
        if let Some(after) = rest.strip_prefix("--") {
            rest = after.split_once('\n').map(|(_, r)| r).unwrap_or("");
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = after.split_once("*/").map(|(_, r)| r).unwrap_or("");
        } else {
            return rest;
        }
    }
}

fn skip_quoted(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, quote: char) {
    while let Some(c) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c == quote {
            // Doubled quote is an escaped quote, not a terminator
            if chars.peek() == Some(&quote) {
                chars.next();
            } else {
                return;
            }
        }
    }
}

fn skip_line_comment(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    for c in chars.by_ref() {
        if c == '\n' {
            return;
        }
    }
}

fn skip_block_comment(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'/') {
            chars.next();
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verb_of_plain_select() {
        assert_eq!(leading_verb("SELECT * FROM users"), Some("select".into()));
    }

    #[test]
    fn verb_skips_comments_and_whitespace() {
        assert_eq!(
            leading_verb("  -- cleanup\n  /* old */ DELETE FROM users"),
            Some("delete".into())
        );
        assert_eq!(leading_verb("/* hidden */delete from t"), Some("delete".into()));
    }

    #[test]
    fn verb_of_empty_template() {
        assert_eq!(leading_verb("   "), None);
        assert_eq!(leading_verb("-- only a comment"), None);
    }

    #[test]
    fn default_policy_blocks_delete() {
        let policy = StatementPolicy::default();
        assert!(policy.check("delete").is_err());
        assert!(policy.check("select").is_ok());
        assert!(policy.check("update").is_ok());
    }

    #[test]
    fn extended_denylist() {
        let policy = StatementPolicy::new(vec!["delete".into(), "DROP".into()]);
        assert!(policy.is_denied("drop"));
        assert!(policy.is_denied("delete"));
        assert!(!policy.is_denied("insert"));
    }

    #[test]
    fn delete_cannot_be_configured_away() {
        // A denylist that omits "delete" extends the block, never lifts it
        let policy = StatementPolicy::new(vec!["drop".into()]);
        assert!(policy.is_denied("drop"));
        assert!(policy.is_denied("delete"));
        assert!(policy.check("delete").is_err());

        let policy = StatementPolicy::new(vec![]);
        assert!(policy.is_denied("delete"));
    }

    #[test]
    fn row_classification() {
        assert!(produces_rows("select"));
        assert!(produces_rows("show"));
        assert!(produces_rows("with"));
        assert!(!produces_rows("insert"));
        assert!(!produces_rows("update"));
    }

    #[test]
    fn placeholder_counting() {
        assert_eq!(count_placeholders("SELECT * FROM t WHERE id = ?"), 1);
        assert_eq!(
            count_placeholders("UPDATE t SET a = ?, b = ? WHERE id = ?"),
            3
        );
        assert_eq!(count_placeholders("SELECT 1"), 0);
    }

    #[test]
    fn placeholders_inside_literals_ignored() {
        assert_eq!(
            count_placeholders("SELECT '?' FROM t WHERE name = ? -- really?\n"),
            1
        );
        assert_eq!(count_placeholders("SELECT `odd?col` FROM t /* ? */"), 0);
        assert_eq!(count_placeholders("SELECT 'it''s ?' , ?"), 1);
    }
}
