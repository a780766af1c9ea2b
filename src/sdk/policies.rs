//! Pieces shared by masking and row access policies: typed signatures and the common SHOW/DESCRIBE rows.

use serde::Serialize;
use serde_json::Value;

use crate::{
    error::ParseError,
    sdk::{
        client::FromRecord,
        datatypes::{DataType, split_top_level},
        identifier::{SchemaObjectIdentifier, quote_part},
        record::{RecordError, RecordRef},
    },
};

/// One `name type` pair of a policy signature as given in config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyArgument {
    pub name: String,
    pub data_type: DataType,
}

impl PolicyArgument {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        PolicyArgument {
            name: name.into(),
            data_type,
        }
    }
}

/// `(A VARCHAR(16777216), "b" NUMBER(38,0))`
pub fn arguments_sql(arguments: &[PolicyArgument]) -> String {
    let arguments: Vec<String> = arguments
        .iter()
        .map(|a| format!("{} {}", quote_part(&a.name), a.data_type.to_sql()))
        .collect();
    format!("({})", arguments.join(", "))
}

/// One argument as DESCRIBE reports it. The type stays text: Snowflake's
/// rendering is what later plans compare against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureArgument {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

/// Splits the `signature` column of DESCRIBE, e.g. `(A VARCHAR, "b c" NUMBER(10,2))`.
pub fn parse_signature(signature: &str) -> Result<Vec<SignatureArgument>, ParseError> {
    let trimmed = signature.trim();
    let inner = trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| ParseError::data_type(signature, "signature must be enclosed in parentheses"))?;

    split_top_level(inner)
        .map_err(|reason| ParseError::data_type(signature, reason))?
        .into_iter()
        .map(|argument| split_argument(argument).ok_or_else(|| ParseError::data_type(argument, "expected `name type`")))
        .collect()
}

fn split_argument(argument: &str) -> Option<SignatureArgument> {
    let argument = argument.trim();
    let (name, rest) = if let Some(quoted) = argument.strip_prefix('"') {
        let mut name = String::new();
        let mut chars = quoted.char_indices().peekable();
        let mut end = None;
        while let Some((idx, c)) = chars.next() {
            if c == '"' {
                if chars.peek().map(|(_, n)| *n) == Some('"') {
                    chars.next();
                    name.push('"');
                } else {
                    end = Some(idx + 1);
                    break;
                }
            } else {
                name.push(c);
            }
        }
        (name, &quoted[end?..])
    } else {
        let idx = argument.find(char::is_whitespace)?;
        (argument[..idx].to_string(), &argument[idx..])
    };

    let data_type = rest.trim();
    if name.is_empty() || data_type.is_empty() {
        return None;
    }
    Some(SignatureArgument {
        name,
        data_type: data_type.to_string(),
    })
}

/// One row of `SHOW MASKING POLICIES` or `SHOW ROW ACCESS POLICIES`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Policy {
    pub created_on: String,
    pub name: String,
    pub database_name: String,
    pub schema_name: String,
    pub kind: String,
    pub owner: String,
    pub comment: String,
    pub owner_role_type: String,
    /// JSON object text, e.g. `{"EXEMPT_OTHER_POLICIES": "TRUE"}`.
    pub options: String,
}

impl Policy {
    pub fn id(&self) -> SchemaObjectIdentifier {
        SchemaObjectIdentifier::new(self.database_name.clone(), self.schema_name.clone(), self.name.clone())
    }

    pub fn exempt_other_policies(&self) -> bool {
        serde_json::from_str::<Value>(&self.options)
            .ok()
            .and_then(|options| {
                options.get("EXEMPT_OTHER_POLICIES").map(|v| match v {
                    Value::Bool(b) => *b,
                    Value::String(s) => s.eq_ignore_ascii_case("true"),
                    _ => false,
                })
            })
            .unwrap_or(false)
    }
}

impl FromRecord for Policy {
    fn from_record(r: &RecordRef<'_>) -> Result<Self, RecordError> {
        Ok(Policy {
            created_on: r.get_string("created_on").unwrap_or_default(),
            name: r.require_string("name")?,
            database_name: r.require_string("database_name")?,
            schema_name: r.require_string("schema_name")?,
            kind: r.get_string("kind").unwrap_or_default(),
            owner: r.get_string("owner").unwrap_or_default(),
            comment: r.get_string("comment").unwrap_or_default(),
            owner_role_type: r.get_string("owner_role_type").unwrap_or_default(),
            options: r.get_string("options").unwrap_or_default(),
        })
    }
}

/// `DESCRIBE MASKING POLICY` / `DESCRIBE ROW ACCESS POLICY`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PolicyDetails {
    pub name: String,
    pub signature: String,
    pub return_type: String,
    pub body: String,
}

impl PolicyDetails {
    pub fn arguments(&self) -> Result<Vec<SignatureArgument>, ParseError> {
        parse_signature(&self.signature)
    }
}

impl FromRecord for PolicyDetails {
    fn from_record(r: &RecordRef<'_>) -> Result<Self, RecordError> {
        Ok(PolicyDetails {
            name: r.require_string("name")?,
            signature: r.get_string("signature").unwrap_or_default(),
            return_type: r.get_string("return_type").unwrap_or_default(),
            body: r.get_string("body").unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::sdk::datatypes::parse_data_type;

    #[test]
    fn test_arguments_sql() {
        let arguments = vec![
            PolicyArgument::new("A", parse_data_type("VARCHAR").unwrap()),
            PolicyArgument::new("b", parse_data_type("NUMBER(10, 2)").unwrap()),
        ];
        assert_eq!(arguments_sql(&arguments), "(A VARCHAR(16777216), \"b\" NUMBER(10,2))");
    }

    #[test]
    fn test_parse_signature() {
        assert_eq!(
            parse_signature("(A VARCHAR, \"b \"\"c\"\"\" NUMBER(10,2))").unwrap(),
            vec![
                SignatureArgument {
                    name: "A".into(),
                    data_type: "VARCHAR".into(),
                },
                SignatureArgument {
                    name: "b \"c\"".into(),
                    data_type: "NUMBER(10,2)".into(),
                },
            ]
        );
        assert_eq!(parse_signature("()").unwrap(), vec![]);
        assert!(parse_signature("A VARCHAR").is_err());
        assert!(parse_signature("(A)").is_err());
    }

    #[test]
    fn test_exempt_option() {
        let mut policy = Policy {
            options: r#"{"EXEMPT_OTHER_POLICIES": "TRUE"}"#.into(),
            ..Default::default()
        };
        assert!(policy.exempt_other_policies());
        policy.options = String::new();
        assert!(!policy.exempt_other_policies());
    }
}
