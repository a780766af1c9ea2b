use std::collections::HashMap;

use lazy_static::lazy_static;

use super::{
    BinaryType, DEFAULT_BINARY_SIZE, DEFAULT_CHAR_LENGTH, DEFAULT_NUMBER_PRECISION, DEFAULT_NUMBER_SCALE,
    DEFAULT_TIME_PRECISION, DEFAULT_TIMESTAMP_PRECISION, DEFAULT_VARCHAR_LENGTH, DataType, NumberType, PrecisionType,
    SimpleType, TableColumn, TableType, TextType, TypeParameter, VectorElement, VectorType,
};
use crate::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Number,
    Integer,
    Text,
    FixedText,
    Binary,
    Boolean,
    Float,
    Date,
    Time,
    Timestamp,
    TimestampLtz,
    TimestampNtz,
    TimestampTz,
    Variant,
    Object,
    Array,
    Geography,
    Geometry,
    Vector,
    Table,
}

lazy_static! {
    static ref SYNONYMS: HashMap<&'static str, Family> = {
        use Family::*;
        [
            ("NUMBER", Number),
            ("DECIMAL", Number),
            ("DEC", Number),
            ("NUMERIC", Number),
            ("INT", Integer),
            ("INTEGER", Integer),
            ("BIGINT", Integer),
            ("SMALLINT", Integer),
            ("TINYINT", Integer),
            ("BYTEINT", Integer),
            ("VARCHAR", Text),
            ("CHAR VARYING", Text),
            ("NCHAR VARYING", Text),
            ("NVARCHAR", Text),
            ("NVARCHAR2", Text),
            ("STRING", Text),
            ("TEXT", Text),
            ("CHAR", FixedText),
            ("CHARACTER", FixedText),
            ("NCHAR", FixedText),
            ("BINARY", Binary),
            ("VARBINARY", Binary),
            ("BOOLEAN", Boolean),
            ("FLOAT", Float),
            ("FLOAT4", Float),
            ("FLOAT8", Float),
            ("DOUBLE", Float),
            ("DOUBLE PRECISION", Float),
            ("REAL", Float),
            ("DATE", Date),
            ("TIME", Time),
            ("TIMESTAMP", Timestamp),
            ("TIMESTAMP_LTZ", TimestampLtz),
            ("TIMESTAMPLTZ", TimestampLtz),
            ("TIMESTAMP WITH LOCAL TIME ZONE", TimestampLtz),
            ("TIMESTAMP_NTZ", TimestampNtz),
            ("TIMESTAMPNTZ", TimestampNtz),
            ("TIMESTAMP WITHOUT TIME ZONE", TimestampNtz),
            ("DATETIME", TimestampNtz),
            ("TIMESTAMP_TZ", TimestampTz),
            ("TIMESTAMPTZ", TimestampTz),
            ("TIMESTAMP WITH TIME ZONE", TimestampTz),
            ("VARIANT", Variant),
            ("OBJECT", Object),
            ("ARRAY", Array),
            ("GEOGRAPHY", Geography),
            ("GEOMETRY", Geometry),
            ("VECTOR", Vector),
            ("TABLE", Table),
        ]
        .into_iter()
        .collect()
    };
}

pub(crate) fn is_integer_synonym(keyword: &str) -> bool {
    SYNONYMS.get(keyword) == Some(&Family::Integer)
}

pub fn parse_data_type(text: &str) -> Result<DataType, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseError::data_type(text, "data type is empty"));
    }

    let (keyword, arguments) = match trimmed.find('(') {
        Some(idx) => (&trimmed[..idx], Some(&trimmed[idx..])),
        None => (trimmed, None),
    };
    let keyword = keyword.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
    let Some(family) = SYNONYMS.get(keyword.as_str()).copied() else {
        return Err(ParseError::data_type(text, format!("unknown data type `{keyword}`")));
    };

    let arguments = match arguments {
        Some(list) => {
            let inner = list
                .strip_prefix('(')
                .and_then(|s| s.strip_suffix(')'))
                .ok_or_else(|| ParseError::data_type(text, "malformed argument list"))?;
            split_top_level(inner).map_err(|reason| ParseError::data_type(text, reason))?
        }
        None => Vec::new(),
    };

    let simple = |keyword: String| -> Result<SimpleType, ParseError> {
        if !arguments.is_empty() {
            return Err(ParseError::data_type(text, format!("{keyword} takes no arguments")));
        }
        Ok(SimpleType { underlying: keyword })
    };

    Ok(match family {
        Family::Number => {
            let (precision, scale) = match arguments.as_slice() {
                [] => (
                    TypeParameter::defaulted(DEFAULT_NUMBER_PRECISION),
                    TypeParameter::defaulted(DEFAULT_NUMBER_SCALE),
                ),
                [p] => (
                    TypeParameter::given(integer(text, p)?),
                    TypeParameter::defaulted(DEFAULT_NUMBER_SCALE),
                ),
                [p, s] => (TypeParameter::given(integer(text, p)?), TypeParameter::given(integer(text, s)?)),
                _ => return Err(ParseError::data_type(text, "NUMBER takes at most precision and scale")),
            };
            if !(1..=38).contains(&precision.value()) {
                return Err(ParseError::data_type(text, "precision must be between 1 and 38"));
            }
            if scale.value() < 0 {
                return Err(ParseError::data_type(text, "scale must not be negative"));
            }
            if scale.value() > precision.value() {
                return Err(ParseError::data_type(text, "scale must not exceed precision"));
            }
            DataType::Number(NumberType {
                underlying: keyword,
                precision,
                scale,
            })
        }
        Family::Integer => {
            if !arguments.is_empty() {
                return Err(ParseError::data_type(text, format!("{keyword} takes no arguments")));
            }
            DataType::Number(NumberType {
                underlying: keyword,
                precision: TypeParameter::given(DEFAULT_NUMBER_PRECISION),
                scale: TypeParameter::given(DEFAULT_NUMBER_SCALE),
            })
        }
        Family::Text | Family::FixedText => {
            let default = if family == Family::FixedText {
                DEFAULT_CHAR_LENGTH
            } else {
                DEFAULT_VARCHAR_LENGTH
            };
            let length = single_parameter(text, &keyword, &arguments, default)?;
            if length.value() < 1 {
                return Err(ParseError::data_type(text, "length must be positive"));
            }
            DataType::Text(TextType {
                underlying: keyword,
                length,
            })
        }
        Family::Binary => {
            let size = single_parameter(text, &keyword, &arguments, DEFAULT_BINARY_SIZE)?;
            if size.value() < 1 {
                return Err(ParseError::data_type(text, "size must be positive"));
            }
            DataType::Binary(BinaryType { underlying: keyword, size })
        }
        Family::Time | Family::Timestamp | Family::TimestampLtz | Family::TimestampNtz | Family::TimestampTz => {
            let default = if family == Family::Time {
                DEFAULT_TIME_PRECISION
            } else {
                DEFAULT_TIMESTAMP_PRECISION
            };
            let precision = single_parameter(text, &keyword, &arguments, default)?;
            if !(0..=9).contains(&precision.value()) {
                return Err(ParseError::data_type(text, "precision must be between 0 and 9"));
            }
            let t = PrecisionType {
                underlying: keyword,
                precision,
            };
            match family {
                Family::Time => DataType::Time(t),
                Family::Timestamp => DataType::Timestamp(t),
                Family::TimestampLtz => DataType::TimestampLtz(t),
                Family::TimestampNtz => DataType::TimestampNtz(t),
                _ => DataType::TimestampTz(t),
            }
        }
        Family::Boolean => DataType::Boolean(simple(keyword)?),
        Family::Float => DataType::Float(simple(keyword)?),
        Family::Date => DataType::Date(simple(keyword)?),
        Family::Variant => DataType::Variant(simple(keyword)?),
        Family::Object => DataType::Object(simple(keyword)?),
        Family::Array => DataType::Array(simple(keyword)?),
        Family::Geography => DataType::Geography(simple(keyword)?),
        Family::Geometry => DataType::Geometry(simple(keyword)?),
        Family::Vector => {
            let [element, dimension] = arguments.as_slice() else {
                return Err(ParseError::data_type(text, "VECTOR requires an element type and a dimension"));
            };
            let element = match element.to_uppercase().as_str() {
                "INT" => VectorElement::Int,
                "FLOAT" => VectorElement::Float,
                other => {
                    return Err(ParseError::data_type(
                        text,
                        format!("unsupported VECTOR element type `{other}`"),
                    ));
                }
            };
            let dimension = integer(text, dimension)?;
            if dimension < 1 {
                return Err(ParseError::data_type(text, "VECTOR dimension must be positive"));
            }
            DataType::Vector(VectorType { element, dimension })
        }
        Family::Table => {
            let columns = arguments
                .iter()
                .map(|column| parse_table_column(text, column))
                .collect::<Result<Vec<_>, _>>()?;
            DataType::Table(TableType { columns })
        }
    })
}

fn single_parameter(text: &str, keyword: &str, arguments: &[&str], default: i64) -> Result<TypeParameter, ParseError> {
    match arguments {
        [] => Ok(TypeParameter::defaulted(default)),
        [value] => Ok(TypeParameter::given(integer(text, value)?)),
        _ => Err(ParseError::data_type(text, format!("{keyword} takes a single argument"))),
    }
}

fn integer(text: &str, value: &str) -> Result<i64, ParseError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| ParseError::data_type(text, format!("`{}` is not an integer", value.trim())))
}

/// `name type`, where `name` is either a bare word (upper-cased) or a quoted
/// identifier kept as written.
fn parse_table_column(text: &str, column: &str) -> Result<TableColumn, ParseError> {
    let column = column.trim();
    let (name, rest) = if let Some(quoted) = column.strip_prefix('"') {
        let mut name = String::new();
        let mut chars = quoted.char_indices().peekable();
        let mut end = None;
        while let Some((idx, c)) = chars.next() {
            if c != '"' {
                name.push(c);
            } else if chars.peek().map(|(_, n)| *n) == Some('"') {
                chars.next();
                name.push('"');
            } else {
                end = Some(idx + 1);
                break;
            }
        }
        let Some(end) = end else {
            return Err(ParseError::data_type(text, "unterminated quoted column name"));
        };
        (name, &quoted[end..])
    } else {
        match column.split_once(char::is_whitespace) {
            Some((name, rest)) => (name.to_uppercase(), rest),
            None => (column.to_uppercase(), ""),
        }
    };

    if name.is_empty() {
        return Err(ParseError::data_type(text, "TABLE column name is empty"));
    }
    if rest.trim().is_empty() {
        return Err(ParseError::data_type(text, format!("TABLE column `{name}` has no type")));
    }
    Ok(TableColumn {
        name,
        data_type: parse_data_type(rest)?,
    })
}

/// Splits on commas that are outside parentheses and quotes. Elements are trimmed.
pub fn split_top_level(s: &str) -> Result<Vec<&str>, String> {
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (idx, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth = depth.checked_sub(1).ok_or_else(|| format!("unbalanced `)` in `{s}`"))?;
            }
            (None, ',') if depth == 0 => {
                parts.push(s[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }

    if quote.is_some() {
        return Err(format!("unterminated quote in `{s}`"));
    }
    if depth != 0 {
        return Err(format!("unbalanced `(` in `{s}`"));
    }
    parts.push(s[start..].trim());

    if parts.iter().any(|p| p.is_empty()) {
        return Err(format!("empty element in `{s}`"));
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_synonym_wins() {
        let t = parse_data_type("timestamp   without TIME zone").unwrap();
        assert!(matches!(t, DataType::TimestampNtz(_)));
        assert_eq!(t.underlying(), "TIMESTAMP WITHOUT TIME ZONE");
        assert!(matches!(parse_data_type("TIMESTAMP").unwrap(), DataType::Timestamp(_)));
        assert!(matches!(parse_data_type("char varying (10)").unwrap(), DataType::Text(_)));
    }

    #[test]
    fn test_explicitness_is_tracked() {
        let DataType::Number(n) = parse_data_type("NUMBER(20)").unwrap() else {
            panic!("expected NUMBER");
        };
        assert_eq!((n.precision(), n.scale()), (20, 0));
        assert!(n.precision.is_explicit());
        assert!(!n.scale.is_explicit());
    }

    #[test]
    fn test_integer_synonyms_reject_arguments() {
        assert!(parse_data_type("INT(10)").is_err());
        let t = parse_data_type("bigint").unwrap();
        assert!(t.is_fully_known());
        assert_eq!(t.to_sql_without_unknowns(), "BIGINT");
    }

    #[test]
    fn test_number_scale_bounds() {
        for text in ["NUMBER(10,-1)", "DECIMAL(5, 6)", "NUMERIC(38,39)"] {
            assert!(
                matches!(parse_data_type(text), Err(ParseError::InvalidDataType { .. })),
                "{text} should not parse"
            );
        }
        for text in ["NUMBER(10,0)", "NUMBER(10,10)", "NUMBER(38, 37)"] {
            assert!(parse_data_type(text).is_ok(), "{text} should parse");
        }
    }

    #[test]
    fn test_rejects_malformed_types() {
        for text in [
            "",
            "NUMBR",
            "NUMBER(",
            "NUMBER(a)",
            "NUMBER(39)",
            "NUMBER(5,6)",
            "NUMBER(1,2,3)",
            "VARCHAR(0)",
            "BOOLEAN(1)",
            "TIME(10)",
            "VECTOR(INT)",
            "VECTOR(STRING, 3)",
            "TABLE(a)",
            "TABLE(\"a NUMBER)",
        ] {
            assert!(
                matches!(parse_data_type(text), Err(ParseError::InvalidDataType { .. })),
                "{text} should not parse"
            );
        }
    }

    #[test]
    fn test_table_columns() {
        let DataType::Table(t) = parse_data_type("TABLE(id NUMBER(10, 2), \"Na\"\"me\" VARCHAR, nested TABLE(x INT))").unwrap() else {
            panic!("expected TABLE");
        };
        let names: Vec<&str> = t.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["ID", "Na\"me", "NESTED"]);
        assert!(matches!(t.columns()[2].data_type, DataType::Table(_)));
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(split_top_level("a, b(1, 2), 'x,y'").unwrap(), vec!["a", "b(1, 2)", "'x,y'"]);
        assert_eq!(split_top_level("  ").unwrap(), Vec::<&str>::new());
        assert!(split_top_level("a, (b").is_err());
        assert!(split_top_level("a, b)").is_err());
        assert!(split_top_level("a,,b").is_err());
        assert!(split_top_level("\"a, b").is_err());
    }
}
