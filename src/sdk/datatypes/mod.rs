//! SQL data types as Snowflake reports and accepts them.
//!
//! Snowflake always reports types fully qualified (`NUMBER(38,0)`), while
//! configurations usually spell them short (`NUMBER`). Every type remembers
//! which of its parameters were written out and which were defaulted, so the
//! two spellings can be told apart from a real change.

mod parse;

use std::fmt;

pub use parse::{parse_data_type, split_top_level};

use parse::is_integer_synonym;

use crate::sdk::identifier::quote_part;

pub const DEFAULT_NUMBER_PRECISION: i64 = 38;
pub const DEFAULT_NUMBER_SCALE: i64 = 0;
pub const DEFAULT_VARCHAR_LENGTH: i64 = 16_777_216;
pub const DEFAULT_CHAR_LENGTH: i64 = 1;
pub const DEFAULT_BINARY_SIZE: i64 = 8_388_608;
pub const DEFAULT_TIME_PRECISION: i64 = 9;
pub const DEFAULT_TIMESTAMP_PRECISION: i64 = 9;

/// One dimensional parameter (precision, scale, length, size).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeParameter {
    value: i64,
    explicit: bool,
}

impl TypeParameter {
    pub fn given(value: i64) -> Self {
        TypeParameter { value, explicit: true }
    }

    pub fn defaulted(value: i64) -> Self {
        TypeParameter { value, explicit: false }
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    fn definitely_different(&self, other: &TypeParameter) -> bool {
        self.explicit && other.explicit && self.value != other.value
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NumberType {
    pub(crate) underlying: String,
    pub(crate) precision: TypeParameter,
    pub(crate) scale: TypeParameter,
}

impl NumberType {
    pub fn precision(&self) -> i64 {
        self.precision.value
    }

    pub fn scale(&self) -> i64 {
        self.scale.value
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextType {
    pub(crate) underlying: String,
    pub(crate) length: TypeParameter,
}

impl TextType {
    pub fn length(&self) -> i64 {
        self.length.value
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BinaryType {
    pub(crate) underlying: String,
    pub(crate) size: TypeParameter,
}

impl BinaryType {
    pub fn size(&self) -> i64 {
        self.size.value
    }
}

/// TIME and the TIMESTAMP family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrecisionType {
    pub(crate) underlying: String,
    pub(crate) precision: TypeParameter,
}

impl PrecisionType {
    pub fn precision(&self) -> i64 {
        self.precision.value
    }
}

/// Types without parameters. Only the spelling is kept.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimpleType {
    pub(crate) underlying: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VectorElement {
    Int,
    Float,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VectorType {
    pub(crate) element: VectorElement,
    pub(crate) dimension: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableColumn {
    pub name: String,
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableType {
    pub(crate) columns: Vec<TableColumn>,
}

impl TableType {
    pub fn columns(&self) -> &[TableColumn] {
        &self.columns
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    Number(NumberType),
    Text(TextType),
    Binary(BinaryType),
    Boolean(SimpleType),
    Float(SimpleType),
    Date(SimpleType),
    Time(PrecisionType),
    Timestamp(PrecisionType),
    TimestampLtz(PrecisionType),
    TimestampNtz(PrecisionType),
    TimestampTz(PrecisionType),
    Variant(SimpleType),
    Object(SimpleType),
    Array(SimpleType),
    Geography(SimpleType),
    Geometry(SimpleType),
    Vector(VectorType),
    Table(TableType),
}

impl DataType {
    /// The keyword Snowflake uses when it reports this type.
    pub fn legacy_keyword(&self) -> &'static str {
        match self {
            DataType::Number(_) => "NUMBER",
            DataType::Text(_) => "VARCHAR",
            DataType::Binary(_) => "BINARY",
            DataType::Boolean(_) => "BOOLEAN",
            DataType::Float(_) => "FLOAT",
            DataType::Date(_) => "DATE",
            DataType::Time(_) => "TIME",
            DataType::Timestamp(_) => "TIMESTAMP",
            DataType::TimestampLtz(_) => "TIMESTAMP_LTZ",
            DataType::TimestampNtz(_) => "TIMESTAMP_NTZ",
            DataType::TimestampTz(_) => "TIMESTAMP_TZ",
            DataType::Variant(_) => "VARIANT",
            DataType::Object(_) => "OBJECT",
            DataType::Array(_) => "ARRAY",
            DataType::Geography(_) => "GEOGRAPHY",
            DataType::Geometry(_) => "GEOMETRY",
            DataType::Vector(_) => "VECTOR",
            DataType::Table(_) => "TABLE",
        }
    }

    /// The keyword as it was written.
    pub fn underlying(&self) -> &str {
        match self {
            DataType::Number(t) => &t.underlying,
            DataType::Text(t) => &t.underlying,
            DataType::Binary(t) => &t.underlying,
            DataType::Time(t)
            | DataType::Timestamp(t)
            | DataType::TimestampLtz(t)
            | DataType::TimestampNtz(t)
            | DataType::TimestampTz(t) => &t.underlying,
            DataType::Boolean(t)
            | DataType::Float(t)
            | DataType::Date(t)
            | DataType::Variant(t)
            | DataType::Object(t)
            | DataType::Array(t)
            | DataType::Geography(t)
            | DataType::Geometry(t) => &t.underlying,
            DataType::Vector(_) => "VECTOR",
            DataType::Table(_) => "TABLE",
        }
    }

    /// Canonical form: legacy keyword and every parameter, defaults included.
    pub fn to_sql(&self) -> String {
        match self {
            DataType::Number(t) => format!("NUMBER({},{})", t.precision.value, t.scale.value),
            DataType::Text(t) => format!("VARCHAR({})", t.length.value),
            DataType::Binary(t) => format!("BINARY({})", t.size.value),
            DataType::Time(t)
            | DataType::Timestamp(t)
            | DataType::TimestampLtz(t)
            | DataType::TimestampNtz(t)
            | DataType::TimestampTz(t) => format!("{}({})", self.legacy_keyword(), t.precision.value),
            DataType::Vector(t) => vector_sql(t),
            DataType::Table(t) => table_sql(t, DataType::to_sql),
            _ => self.legacy_keyword().to_string(),
        }
    }

    /// The type as written: original synonym, explicit parameters only.
    pub fn to_sql_without_unknowns(&self) -> String {
        match self {
            DataType::Number(t) if is_integer_synonym(&t.underlying) => t.underlying.clone(),
            DataType::Number(t) => match (t.precision.explicit, t.scale.explicit) {
                (true, true) => format!("{}({},{})", t.underlying, t.precision.value, t.scale.value),
                (true, false) => format!("{}({})", t.underlying, t.precision.value),
                _ => t.underlying.clone(),
            },
            DataType::Text(t) => with_optional_parameter(&t.underlying, &t.length),
            DataType::Binary(t) => with_optional_parameter(&t.underlying, &t.size),
            DataType::Time(t)
            | DataType::Timestamp(t)
            | DataType::TimestampLtz(t)
            | DataType::TimestampNtz(t)
            | DataType::TimestampTz(t) => with_optional_parameter(&t.underlying, &t.precision),
            DataType::Vector(t) => vector_sql(t),
            DataType::Table(t) => table_sql(t, DataType::to_sql_without_unknowns),
            _ => self.underlying().to_string(),
        }
    }

    /// True when every parameter of the type (and of every TABLE column) was written out.
    pub fn is_fully_known(&self) -> bool {
        match self {
            DataType::Number(t) => t.precision.explicit && t.scale.explicit,
            DataType::Text(t) => t.length.explicit,
            DataType::Binary(t) => t.size.explicit,
            DataType::Time(t)
            | DataType::Timestamp(t)
            | DataType::TimestampLtz(t)
            | DataType::TimestampNtz(t)
            | DataType::TimestampTz(t) => t.precision.explicit,
            DataType::Table(t) => t.columns.iter().all(|c| c.data_type.is_fully_known()),
            _ => true,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql_without_unknowns())
    }
}

fn with_optional_parameter(keyword: &str, parameter: &TypeParameter) -> String {
    if parameter.explicit {
        format!("{keyword}({})", parameter.value)
    } else {
        keyword.to_string()
    }
}

fn vector_sql(t: &VectorType) -> String {
    let element = match t.element {
        VectorElement::Int => "INT",
        VectorElement::Float => "FLOAT",
    };
    format!("VECTOR({element}, {})", t.dimension)
}

fn table_sql(t: &TableType, column_sql: fn(&DataType) -> String) -> String {
    let columns: Vec<String> = t
        .columns
        .iter()
        .map(|c| format!("{} {}", quote_part(&c.name), column_sql(&c.data_type)))
        .collect();
    format!("TABLE({})", columns.join(", "))
}

fn same_variant(a: &DataType, b: &DataType) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

/// Structural equality of the effective types: synonyms and the explicit/defaulted
/// distinction are ignored, parameter values (defaults filled in) are not.
pub fn are_the_same(a: &DataType, b: &DataType) -> bool {
    if !same_variant(a, b) {
        return false;
    }
    match (a, b) {
        (DataType::Number(x), DataType::Number(y)) => {
            x.precision.value == y.precision.value && x.scale.value == y.scale.value
        }
        (DataType::Text(x), DataType::Text(y)) => x.length.value == y.length.value,
        (DataType::Binary(x), DataType::Binary(y)) => x.size.value == y.size.value,
        (DataType::Time(x), DataType::Time(y))
        | (DataType::Timestamp(x), DataType::Timestamp(y))
        | (DataType::TimestampLtz(x), DataType::TimestampLtz(y))
        | (DataType::TimestampNtz(x), DataType::TimestampNtz(y))
        | (DataType::TimestampTz(x), DataType::TimestampTz(y)) => x.precision.value == y.precision.value,
        (DataType::Vector(x), DataType::Vector(y)) => x == y,
        (DataType::Table(x), DataType::Table(y)) => {
            x.columns.len() == y.columns.len()
                && x
                    .columns
                    .iter()
                    .zip(&y.columns)
                    .all(|(c, d)| c.name == d.name && are_the_same(&c.data_type, &d.data_type))
        }
        _ => true,
    }
}

/// True only when no choice of defaults could make the two types equal: the
/// variants differ, or some parameter is explicit on both sides with different
/// values.
pub fn are_definitely_different(a: &DataType, b: &DataType) -> bool {
    if !same_variant(a, b) {
        return true;
    }
    match (a, b) {
        (DataType::Number(x), DataType::Number(y)) => {
            x.precision.definitely_different(&y.precision) || x.scale.definitely_different(&y.scale)
        }
        (DataType::Text(x), DataType::Text(y)) => x.length.definitely_different(&y.length),
        (DataType::Binary(x), DataType::Binary(y)) => x.size.definitely_different(&y.size),
        (DataType::Time(x), DataType::Time(y))
        | (DataType::Timestamp(x), DataType::Timestamp(y))
        | (DataType::TimestampLtz(x), DataType::TimestampLtz(y))
        | (DataType::TimestampNtz(x), DataType::TimestampNtz(y))
        | (DataType::TimestampTz(x), DataType::TimestampTz(y)) => x.precision.definitely_different(&y.precision),
        (DataType::Vector(x), DataType::Vector(y)) => x != y,
        (DataType::Table(x), DataType::Table(y)) => {
            x.columns.len() != y.columns.len()
                || x
                    .columns
                    .iter()
                    .zip(&y.columns)
                    .any(|(c, d)| c.name != d.name || are_definitely_different(&c.data_type, &d.data_type))
        }
        _ => false,
    }
}

/// Whether `candidate` should be treated as a change against `reference`.
///
/// A fully known reference is compared exactly (defaults filled in). A
/// reference with defaulted parameters may have lost them on the way back from
/// Snowflake, so only a definite difference counts.
pub fn is_a_change(reference: &DataType, candidate: &DataType) -> bool {
    if reference.is_fully_known() {
        !are_the_same(reference, candidate)
    } else {
        are_definitely_different(reference, candidate)
    }
}
