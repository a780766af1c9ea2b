//! Building blocks shared by the per-kind statement builders.

use crate::sdk::identifier::{AccountObjectIdentifier, DatabaseObjectIdentifier, ObjectIdentifier};

/// Renders a request into one SQL statement. No trailing semicolon.
pub trait ToSql {
    fn to_sql(&self) -> String;
}

pub fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Dollar-quoted literal for specifications, manifests and other long text.
pub fn dollar_quote(s: &str) -> String {
    format!("$${s}$$")
}

pub fn bool_sql(b: bool) -> &'static str {
    if b { "TRUE" } else { "FALSE" }
}

/// Ordered `KEY = value` options. Options render in push order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    props: Vec<String>,
}

impl Options {
    pub fn new() -> Self {
        Options::default()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    pub fn raw(&mut self, key: &str, value: Option<impl AsRef<str>>) -> &mut Self {
        if let Some(value) = value {
            self.props.push(format!("{key} = {}", value.as_ref()));
        }
        self
    }

    pub fn text(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        self.raw(key, value.map(quote_string))
    }

    pub fn dollar(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        self.raw(key, value.map(dollar_quote))
    }

    pub fn int(&mut self, key: &str, value: Option<i64>) -> &mut Self {
        self.raw(key, value.map(|v| v.to_string()))
    }

    pub fn bool(&mut self, key: &str, value: Option<bool>) -> &mut Self {
        self.raw(key, value.map(bool_sql))
    }

    pub fn ident(&mut self, key: &str, value: Option<&impl ObjectIdentifier>) -> &mut Self {
        self.raw(key, value.map(|v| v.fully_qualified_name()))
    }

    /// A bare keyword, emitted only when `on`.
    pub fn keyword(&mut self, keyword: &str, on: bool) -> &mut Self {
        if on {
            self.props.push(keyword.to_string());
        }
        self
    }

    /// ` K1 = v1 K2 = v2`, the form CREATE uses. Empty when there are no options.
    pub fn to_create_clause(&self) -> String {
        if self.props.is_empty() {
            String::new()
        } else {
            format!(" {}", self.props.join(" "))
        }
    }

    /// `K1 = v1, K2 = v2`, the form ALTER ... SET uses.
    pub fn to_set_list(&self) -> String {
        self.props.join(", ")
    }
}

/// Names of attributes to UNSET, in push order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnsetList {
    keys: Vec<&'static str>,
}

impl UnsetList {
    pub fn new() -> Self {
        UnsetList::default()
    }

    pub fn push(&mut self, key: &'static str, on: bool) -> &mut Self {
        if on {
            self.keys.push(key);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn to_list(&self) -> String {
        self.keys.join(", ")
    }
}

/// Filter of a SHOW statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Like {
    pub pattern: String,
}

impl Like {
    pub fn new(pattern: impl Into<String>) -> Self {
        Like { pattern: pattern.into() }
    }
}

impl ToSql for Like {
    fn to_sql(&self) -> String {
        format!("LIKE {}", quote_string(&self.pattern))
    }
}

/// Scope of a SHOW statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum In {
    Account,
    Database(AccountObjectIdentifier),
    Schema(DatabaseObjectIdentifier),
    ComputePool(AccountObjectIdentifier),
}

impl ToSql for In {
    fn to_sql(&self) -> String {
        match self {
            In::Account => "IN ACCOUNT".to_string(),
            In::Database(id) => format!("IN DATABASE {}", id.fully_qualified_name()),
            In::Schema(id) => format!("IN SCHEMA {}", id.fully_qualified_name()),
            In::ComputePool(id) => format!("IN COMPUTE POOL {}", id.fully_qualified_name()),
        }
    }
}

/// `SHOW <object> [LIKE ...] [IN ...] [LIMIT n]`.
pub fn show_statement(object: &str, like: Option<&Like>, scope: Option<&In>, limit: Option<u64>) -> String {
    let mut sql = format!("SHOW {object}");
    if let Some(like) = like {
        sql.push(' ');
        sql.push_str(&like.to_sql());
    }
    if let Some(scope) = scope {
        sql.push(' ');
        sql.push_str(&scope.to_sql());
    }
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    sql
}

/// `DROP <object> [IF EXISTS] <name>`.
pub fn drop_statement(object: &str, name: &impl ObjectIdentifier, if_exists: bool) -> String {
    let if_exists = if if_exists { " IF EXISTS" } else { "" };
    format!("DROP {object}{if_exists} {}", name.fully_qualified_name())
}

/// `CREATE [OR REPLACE] <object> [IF NOT EXISTS] <name>`; the caller appends the body.
pub fn create_prefix(object: &str, name: &impl ObjectIdentifier, or_replace: bool, if_not_exists: bool) -> String {
    let or_replace = if or_replace { " OR REPLACE" } else { "" };
    let if_not_exists = if if_not_exists { " IF NOT EXISTS" } else { "" };
    format!("CREATE{or_replace} {object}{if_not_exists} {}", name.fully_qualified_name())
}

/// `ALTER <object> [IF EXISTS] <name>`; the caller appends the action.
pub fn alter_prefix(object: &str, name: &impl ObjectIdentifier, if_exists: bool) -> String {
    let if_exists = if if_exists { " IF EXISTS" } else { "" };
    format!("ALTER {object}{if_exists} {}", name.fully_qualified_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::identifier::SchemaObjectIdentifier;

    #[test]
    fn test_literals() {
        assert_eq!(quote_string("it's"), "'it''s'");
        assert_eq!(dollar_quote("spec:\n  a: 1"), "$$spec:\n  a: 1$$");
        assert_eq!(bool_sql(true), "TRUE");
    }

    #[test]
    fn test_options_keep_push_order() {
        let mut options = Options::new();
        options
            .int("MAX_NODES", Some(3))
            .text("COMMENT", Some("changed"))
            .bool("AUTO_RESUME", None);
        assert_eq!(options.to_set_list(), "MAX_NODES = 3, COMMENT = 'changed'");
        assert_eq!(options.to_create_clause(), " MAX_NODES = 3 COMMENT = 'changed'");
        assert!(Options::new().to_create_clause().is_empty());
    }

    #[test]
    fn test_unset_list() {
        let mut unset = UnsetList::new();
        unset.push("AUTO_SUSPEND_SECS", true).push("COMMENT", false);
        assert_eq!(unset.to_list(), "AUTO_SUSPEND_SECS");
        assert!(UnsetList::new().is_empty());
    }

    #[test]
    fn test_statement_prefixes() {
        let id = SchemaObjectIdentifier::new("DB", "S", "my_repo");
        assert_eq!(
            show_statement(
                "IMAGE REPOSITORIES",
                Some(&Like::new("my_repo")),
                Some(&In::Schema(id.schema_id())),
                None
            ),
            "SHOW IMAGE REPOSITORIES LIKE 'my_repo' IN SCHEMA DB.S"
        );
        assert_eq!(drop_statement("IMAGE REPOSITORY", &id, true), "DROP IMAGE REPOSITORY IF EXISTS DB.S.\"my_repo\"");
        assert_eq!(
            create_prefix("IMAGE REPOSITORY", &id, false, true),
            "CREATE IMAGE REPOSITORY IF NOT EXISTS DB.S.\"my_repo\""
        );
        assert_eq!(alter_prefix("IMAGE REPOSITORY", &id, false), "ALTER IMAGE REPOSITORY DB.S.\"my_repo\"");
    }
}
