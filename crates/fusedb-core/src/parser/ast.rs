//! Typed query AST produced by the parser.

use std::collections::HashMap;

use crate::types::ColumnType;

/// The kind of SQL statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Select,
    Insert,
    Update,
    Delete,
    Create,
    Drop,
}

/// Comparison operator between two condition operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
}

/// One operand of a WHERE condition: a column reference or a quoted
/// literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Field(String),
    Literal(String),
}

impl Operand {
    /// The field name, if this operand is a column reference.
    pub fn field(&self) -> Option<&str> {
        match self {
            Operand::Field(name) => Some(name),
            Operand::Literal(_) => None,
        }
    }
}

/// A single boolean condition in a WHERE clause. Conditions are joined by
/// AND.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub lhs: Operand,
    pub op: Operator,
    pub rhs: Operand,
}

/// A column declaration inside CREATE TABLE.
///
/// `size` holds the raw token from `CHAR '(' N ')'`; the backend parses
/// and range-checks it when building the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDecl {
    pub name: String,
    pub ty: ColumnType,
    pub size: Option<String>,
    pub constraints: Vec<ConstraintDecl>,
}

/// A constraint keyword attached to a column declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintDecl {
    PrimaryKey,
    NotNull,
    Unique,
}

/// A parsed statement.
///
/// `fields` carries SELECTed column names (or `*`) for SELECT and the
/// field list for INSERT. `updates` keeps SET assignments in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub kind: QueryKind,
    pub table: String,
    pub fields: Vec<String>,
    pub aliases: HashMap<String, String>,
    pub inserts: Vec<Vec<String>>,
    pub updates: Vec<(String, String)>,
    pub conditions: Vec<Condition>,
    pub columns: Vec<ColumnDecl>,
}

impl Query {
    pub(crate) fn new(kind: QueryKind) -> Self {
        Self {
            kind,
            table: String::new(),
            fields: Vec::new(),
            aliases: HashMap::new(),
            inserts: Vec::new(),
            updates: Vec::new(),
            conditions: Vec::new(),
            columns: Vec::new(),
        }
    }
}
