use std::fmt;

use crate::{
    error::ParseError,
    sdk::datatypes::{DataType, parse_data_type, split_top_level},
};

/// Separator for resource ids made of several identifiers, e.g. `user|token`.
pub const COMPOSITE_ID_SEPARATOR: char = '|';

pub trait ObjectIdentifier {
    fn name(&self) -> &str;
    fn fully_qualified_name(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Account,
    Database,
    Schema,
    SchemaWithArguments,
}

impl IdentifierKind {
    fn part_count(self) -> usize {
        match self {
            IdentifierKind::Account => 1,
            IdentifierKind::Database => 2,
            IdentifierKind::Schema | IdentifierKind::SchemaWithArguments => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountObjectIdentifier {
    name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatabaseObjectIdentifier {
    database: String,
    name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaObjectIdentifier {
    database: String,
    schema: String,
    name: String,
}

/// A schema object addressed together with its argument types (overloaded routines).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaObjectIdentifierWithArguments {
    id: SchemaObjectIdentifier,
    arguments: Vec<DataType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Account(AccountObjectIdentifier),
    Database(DatabaseObjectIdentifier),
    Schema(SchemaObjectIdentifier),
    SchemaWithArguments(SchemaObjectIdentifierWithArguments),
}

impl AccountObjectIdentifier {
    pub fn new(name: impl Into<String>) -> Self {
        AccountObjectIdentifier { name: name.into() }
    }

    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let [name] = parse_parts::<1>(text)?;
        Ok(AccountObjectIdentifier { name })
    }
}

impl DatabaseObjectIdentifier {
    pub fn new(database: impl Into<String>, name: impl Into<String>) -> Self {
        DatabaseObjectIdentifier {
            database: database.into(),
            name: name.into(),
        }
    }

    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let [database, name] = parse_parts::<2>(text)?;
        Ok(DatabaseObjectIdentifier { database, name })
    }

    pub fn database_name(&self) -> &str {
        &self.database
    }

    pub fn database_id(&self) -> AccountObjectIdentifier {
        AccountObjectIdentifier::new(self.database.clone())
    }
}

impl SchemaObjectIdentifier {
    pub fn new(database: impl Into<String>, schema: impl Into<String>, name: impl Into<String>) -> Self {
        SchemaObjectIdentifier {
            database: database.into(),
            schema: schema.into(),
            name: name.into(),
        }
    }

    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let [database, schema, name] = parse_parts::<3>(text)?;
        Ok(SchemaObjectIdentifier { database, schema, name })
    }

    pub fn database_name(&self) -> &str {
        &self.database
    }

    pub fn schema_name(&self) -> &str {
        &self.schema
    }

    pub fn schema_id(&self) -> DatabaseObjectIdentifier {
        DatabaseObjectIdentifier::new(self.database.clone(), self.schema.clone())
    }

    /// Same database and schema, different name. Used by renames.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        SchemaObjectIdentifier::new(self.database.clone(), self.schema.clone(), name)
    }
}

impl SchemaObjectIdentifierWithArguments {
    pub fn new(id: SchemaObjectIdentifier, arguments: Vec<DataType>) -> Self {
        SchemaObjectIdentifierWithArguments { id, arguments }
    }

    pub fn parse(text: &str) -> Result<Self, ParseError> {
        match parse_identifier(IdentifierKind::SchemaWithArguments, text)? {
            Identifier::SchemaWithArguments(id) => Ok(id),
            _ => Err(ParseError::identifier(text, "expected an identifier with arguments")),
        }
    }

    pub fn schema_object_id(&self) -> &SchemaObjectIdentifier {
        &self.id
    }

    pub fn arguments(&self) -> &[DataType] {
        &self.arguments
    }
}

impl ObjectIdentifier for AccountObjectIdentifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn fully_qualified_name(&self) -> String {
        quote_part(&self.name)
    }
}

impl ObjectIdentifier for DatabaseObjectIdentifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn fully_qualified_name(&self) -> String {
        format!("{}.{}", quote_part(&self.database), quote_part(&self.name))
    }
}

impl ObjectIdentifier for SchemaObjectIdentifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn fully_qualified_name(&self) -> String {
        format!(
            "{}.{}.{}",
            quote_part(&self.database),
            quote_part(&self.schema),
            quote_part(&self.name)
        )
    }
}

impl ObjectIdentifier for SchemaObjectIdentifierWithArguments {
    fn name(&self) -> &str {
        &self.id.name
    }

    fn fully_qualified_name(&self) -> String {
        let arguments: Vec<String> = self.arguments.iter().map(DataType::to_sql_without_unknowns).collect();
        format!("{}({})", self.id.fully_qualified_name(), arguments.join(", "))
    }
}

impl ObjectIdentifier for Identifier {
    fn name(&self) -> &str {
        match self {
            Identifier::Account(id) => id.name(),
            Identifier::Database(id) => id.name(),
            Identifier::Schema(id) => id.name(),
            Identifier::SchemaWithArguments(id) => id.name(),
        }
    }

    fn fully_qualified_name(&self) -> String {
        match self {
            Identifier::Account(id) => id.fully_qualified_name(),
            Identifier::Database(id) => id.fully_qualified_name(),
            Identifier::Schema(id) => id.fully_qualified_name(),
            Identifier::SchemaWithArguments(id) => id.fully_qualified_name(),
        }
    }
}

macro_rules! display_as_fully_qualified_name {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.fully_qualified_name())
            }
        })*
    };
}

display_as_fully_qualified_name!(
    AccountObjectIdentifier,
    DatabaseObjectIdentifier,
    SchemaObjectIdentifier,
    SchemaObjectIdentifierWithArguments,
    Identifier
);

pub fn parse_identifier(kind: IdentifierKind, text: &str) -> Result<Identifier, ParseError> {
    let with_arguments = kind == IdentifierKind::SchemaWithArguments;
    let (parts, arguments) = split_parts(text, with_arguments)?;
    if parts.len() != kind.part_count() {
        return Err(ParseError::identifier(
            text,
            format!("expected {} part(s), got {}", kind.part_count(), parts.len()),
        ));
    }

    let mut parts = parts.into_iter();
    let mut next = || parts.next().unwrap_or_default();
    Ok(match kind {
        IdentifierKind::Account => Identifier::Account(AccountObjectIdentifier::new(next())),
        IdentifierKind::Database => Identifier::Database(DatabaseObjectIdentifier::new(next(), next())),
        IdentifierKind::Schema => Identifier::Schema(SchemaObjectIdentifier::new(next(), next(), next())),
        IdentifierKind::SchemaWithArguments => {
            let id = SchemaObjectIdentifier::new(next(), next(), next());
            let Some(arguments) = arguments else {
                return Err(ParseError::identifier(text, "missing argument list"));
            };
            Identifier::SchemaWithArguments(SchemaObjectIdentifierWithArguments::new(
                id,
                parse_argument_list(text, arguments)?,
            ))
        }
    })
}

fn parse_parts<const N: usize>(text: &str) -> Result<[String; N], ParseError> {
    let (parts, _) = split_parts(text, false)?;
    let count = parts.len();
    parts
        .try_into()
        .map_err(|_| ParseError::identifier(text, format!("expected {N} part(s), got {count}")))
}

/// Splits on unquoted dots. Quoted parts keep their case and may contain dots
/// and doubled quotes. With `with_arguments`, an unquoted `(` ends the name and
/// the remainder is returned untouched.
fn split_parts(text: &str, with_arguments: bool) -> Result<(Vec<String>, Option<&str>), ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseError::identifier(text, "identifier is empty"));
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut closed = false;
    let mut in_quotes = false;
    let mut arguments = None;

    let mut chars = trimmed.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek().map(|(_, n)| *n) == Some('"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                    closed = true;
                }
            } else {
                current.push(c);
            }
            continue;
        }

        match c {
            '"' if current.is_empty() && !quoted => {
                in_quotes = true;
                quoted = true;
            }
            '"' => return Err(ParseError::identifier(text, "unexpected quote inside identifier part")),
            '.' => {
                if current.is_empty() {
                    return Err(ParseError::identifier(text, "identifier part is empty"));
                }
                parts.push(std::mem::take(&mut current));
                quoted = false;
                closed = false;
            }
            '(' if with_arguments => {
                arguments = Some(&trimmed[idx..]);
                break;
            }
            _ if closed => {
                return Err(ParseError::identifier(text, "unexpected characters after quoted part"));
            }
            _ => current.push(c),
        }
    }

    if in_quotes {
        return Err(ParseError::identifier(text, "unterminated quoted part"));
    }
    if current.is_empty() {
        return Err(ParseError::identifier(text, "identifier part is empty"));
    }
    parts.push(current);

    Ok((parts, arguments))
}

fn parse_argument_list(text: &str, arguments: &str) -> Result<Vec<DataType>, ParseError> {
    let inner = arguments
        .trim()
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| ParseError::identifier(text, "malformed argument list"))?;
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    split_top_level(inner)
        .map_err(|reason| ParseError::identifier(text, reason))?
        .into_iter()
        .map(parse_data_type)
        .collect()
}

fn needs_quoting(part: &str) -> bool {
    let mut chars = part.chars();
    let Some(first) = chars.next() else {
        return true;
    };
    !(first.is_ascii_uppercase() || first == '_')
        || !chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Quotes one identifier part unless it is a plain upper-case name.
pub fn quote_part(part: &str) -> String {
    if needs_quoting(part) {
        format!("\"{}\"", part.replace('"', "\"\""))
    } else {
        part.to_string()
    }
}

pub fn composite_id(parts: &[&str]) -> Result<String, ParseError> {
    let joined = parts.join("|");
    if let Some(part) = parts.iter().find(|p| p.is_empty() || p.contains(COMPOSITE_ID_SEPARATOR)) {
        return Err(ParseError::resource_id(
            joined,
            format!("part `{part}` is empty or contains `{COMPOSITE_ID_SEPARATOR}`"),
        ));
    }
    Ok(joined)
}

pub fn parse_composite_id(text: &str, expected: usize) -> Result<Vec<String>, ParseError> {
    let parts: Vec<String> = text.split(COMPOSITE_ID_SEPARATOR).map(str::to_string).collect();
    if parts.len() != expected {
        return Err(ParseError::resource_id(
            text,
            format!("expected {expected} parts separated by `{COMPOSITE_ID_SEPARATOR}`, got {}", parts.len()),
        ));
    }
    if parts.iter().any(String::is_empty) {
        return Err(ParseError::resource_id(text, "empty part"));
    }
    Ok(parts)
}
