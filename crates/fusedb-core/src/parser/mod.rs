//! Hand-written SQL parser.
//!
//! A single stepwise state machine over a trimmed statement string. Tokens
//! are recognized by longest-prefix match against an ordered reserved-word
//! list (multi-word tokens precede their single-word prefixes), then
//! `'…'` quoted strings (with `\'` escapes), then identifier runs of
//! `[A-Za-z0-9_*]`. Reserved-word comparison is case-insensitive.
//!
//! The machine parses the full dialect — SELECT, INSERT, UPDATE, DELETE,
//! CREATE TABLE, DROP TABLE, WHERE — and post-parse validation enforces
//! the structural rules; which statements actually execute is the
//! backend's concern.

pub mod ast;

pub use ast::{ColumnDecl, Condition, ConstraintDecl, Operand, Operator, Query, QueryKind};

use std::collections::HashMap;

use crate::error::ParseError;
use crate::types::ColumnType;

/// Reserved words in longest-prefix match order: multi-word tokens come
/// before the single words they start with.
const RESERVED_WORDS: &[&str] = &[
    "(", ")", ">=", "<=", "!=", ",", "=", ">", "<", "SELECT", "INSERT INTO", "VALUES", "UPDATE",
    "DELETE FROM", "WHERE", "FROM", "SET", "AS", "CREATE TABLE", "DROP TABLE", "PRIMARY KEY",
    "NOT NULL", "UNIQUE", "INT", "FLOAT", "BOOL", "CHAR",
];

fn is_reserved(s: &str) -> bool {
    RESERVED_WORDS
        .iter()
        .any(|rw| rw.eq_ignore_ascii_case(s))
}

/// A usable identifier: not reserved, and carrying at least one letter or
/// underscore.
fn is_identifier(s: &str) -> bool {
    !s.is_empty() && !is_reserved(s) && s.chars().any(|c| c.is_ascii_alphabetic() || c == '_')
}

fn is_identifier_or_asterisk(s: &str) -> bool {
    s == "*" || is_identifier(s)
}

/// Grammar position of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Type,
    SelectField,
    SelectFrom,
    SelectComma,
    SelectFromTable,
    InsertTable,
    InsertFieldsOpeningParens,
    InsertFields,
    InsertFieldsCommaOrClosingParens,
    InsertValuesOpeningParens,
    InsertValuesWord,
    InsertValues,
    InsertValuesCommaOrClosingParens,
    InsertValuesCommaBeforeOpeningParens,
    UpdateTable,
    UpdateSet,
    UpdateField,
    UpdateEquals,
    UpdateValue,
    UpdateComma,
    DeleteFromTable,
    Where,
    WhereField,
    WhereOperator,
    WhereValue,
    WhereAnd,
    CreateTable,
    CreateFieldsOpeningParens,
    CreateFields,
    CreateColumnType,
    CreateColumnSize,
    CreateConstraints,
    CreateCommaOrClosingParens,
    DropTable,
}

struct Parser<'a> {
    i: usize,
    sql: &'a str,
    step: Step,
    kind: Option<QueryKind>,
    table: String,
    fields: Vec<String>,
    aliases: HashMap<String, String>,
    inserts: Vec<Vec<String>>,
    updates: Vec<(String, String)>,
    conditions: Vec<Condition>,
    columns: Vec<ColumnDecl>,
    pending_column: String,
    pending_update_field: String,
    where_lhs: String,
    where_op: Option<Operator>,
}

/// Parse a single SQL statement into a [`Query`].
pub fn parse(sql: &str) -> Result<Query, ParseError> {
    let trimmed = sql.trim();
    let parser = Parser::new(trimmed);
    match parser.run() {
        Ok(query) => Ok(query),
        Err(e) => {
            tracing::debug!(statement = trimmed, error = %e, "rejected statement");
            Err(e)
        }
    }
}

impl<'a> Parser<'a> {
    fn new(sql: &'a str) -> Self {
        Self {
            i: 0,
            sql,
            step: Step::Type,
            kind: None,
            table: String::new(),
            fields: Vec::new(),
            aliases: HashMap::new(),
            inserts: Vec::new(),
            updates: Vec::new(),
            conditions: Vec::new(),
            columns: Vec::new(),
            pending_column: String::new(),
            pending_update_field: String::new(),
            where_lhs: String::new(),
            where_op: None,
        }
    }

    fn err(&self, msg: impl Into<String>) -> ParseError {
        ParseError::Syntax {
            pos: self.i,
            msg: msg.into(),
        }
    }

    fn run(mut self) -> Result<Query, ParseError> {
        self.drive()?;
        self.validate()?;
        Ok(Query {
            kind: self.kind.unwrap(),
            table: self.table,
            fields: self.fields,
            aliases: self.aliases,
            inserts: self.inserts,
            updates: self.updates,
            conditions: self.conditions,
            columns: self.columns,
        })
    }

    fn drive(&mut self) -> Result<(), ParseError> {
        while self.i < self.sql.len() {
            // Anything the tokenizer cannot shape into a token would spin
            // the machine forever; reject it here.
            if self.peek_with_len().1 == 0 {
                return Err(self.err("unrecognized token"));
            }
            match self.step {
                Step::Type => {
                    let tok = self.peek();
                    let kind = match tok.as_str() {
                        "SELECT" => (QueryKind::Select, Step::SelectField),
                        "INSERT INTO" => (QueryKind::Insert, Step::InsertTable),
                        "UPDATE" => (QueryKind::Update, Step::UpdateTable),
                        "DELETE FROM" => (QueryKind::Delete, Step::DeleteFromTable),
                        "CREATE TABLE" => (QueryKind::Create, Step::CreateTable),
                        "DROP TABLE" => (QueryKind::Drop, Step::DropTable),
                        _ => return Err(self.err("invalid query type")),
                    };
                    self.kind = Some(kind.0);
                    self.pop();
                    self.step = kind.1;
                }

                Step::SelectField => {
                    let tok = self.peek();
                    if !is_identifier_or_asterisk(&tok) {
                        return Err(self.err("at SELECT: expected field to SELECT"));
                    }
                    self.fields.push(tok.clone());
                    self.pop();
                    let mut next = self.peek();
                    if next == "AS" {
                        self.pop();
                        let alias = self.peek();
                        if !is_identifier(&alias) {
                            return Err(
                                self.err(format!("at SELECT: expected alias for '{tok} AS'"))
                            );
                        }
                        self.aliases.insert(tok, alias);
                        self.pop();
                        next = self.peek();
                    }
                    if next == "FROM" {
                        self.step = Step::SelectFrom;
                        continue;
                    }
                    self.step = Step::SelectComma;
                }
                Step::SelectComma => {
                    if self.peek() != "," {
                        return Err(self.err("at SELECT: expected comma or FROM"));
                    }
                    self.pop();
                    self.step = Step::SelectField;
                }
                Step::SelectFrom => {
                    if self.peek() != "FROM" {
                        return Err(self.err("at SELECT: expected FROM"));
                    }
                    self.pop();
                    self.step = Step::SelectFromTable;
                }
                Step::SelectFromTable => {
                    let name = self.peek();
                    if name.is_empty() {
                        return Err(self.err("at SELECT: expected quoted table name"));
                    }
                    self.table = name;
                    self.pop();
                    self.step = Step::Where;
                }

                Step::DeleteFromTable => {
                    let name = self.peek();
                    if name.is_empty() {
                        return Err(self.err("at DELETE FROM: expected quoted table name"));
                    }
                    self.table = name;
                    self.pop();
                    self.step = Step::Where;
                }

                Step::UpdateTable => {
                    let name = self.peek();
                    if name.is_empty() {
                        return Err(self.err("at UPDATE: expected quoted table name"));
                    }
                    self.table = name;
                    self.pop();
                    self.step = Step::UpdateSet;
                }
                Step::UpdateSet => {
                    if self.peek() != "SET" {
                        return Err(self.err("at UPDATE: expected 'SET'"));
                    }
                    self.pop();
                    self.step = Step::UpdateField;
                }
                Step::UpdateField => {
                    let tok = self.peek();
                    if !is_identifier(&tok) {
                        return Err(self.err("at UPDATE: expected at least one field to update"));
                    }
                    self.pending_update_field = tok;
                    self.pop();
                    self.step = Step::UpdateEquals;
                }
                Step::UpdateEquals => {
                    if self.peek() != "=" {
                        return Err(self.err("at UPDATE: expected '='"));
                    }
                    self.pop();
                    self.step = Step::UpdateValue;
                }
                Step::UpdateValue => {
                    let (value, len) = self.peek_quoted_with_len();
                    if len == 0 {
                        return Err(self.err("at UPDATE: expected quoted value"));
                    }
                    let field = std::mem::take(&mut self.pending_update_field);
                    self.updates.push((field, value));
                    self.pop();
                    if self.peek() == "WHERE" {
                        self.step = Step::Where;
                        continue;
                    }
                    self.step = Step::UpdateComma;
                }
                Step::UpdateComma => {
                    if self.peek() != "," {
                        return Err(self.err("at UPDATE: expected ','"));
                    }
                    self.pop();
                    self.step = Step::UpdateField;
                }

                Step::Where => {
                    if self.peek() != "WHERE" {
                        return Err(self.err("expected WHERE"));
                    }
                    self.pop();
                    self.step = Step::WhereField;
                }
                Step::WhereField => {
                    let tok = self.peek();
                    if !is_identifier(&tok) {
                        return Err(self.err("at WHERE: expected field"));
                    }
                    self.where_lhs = tok;
                    self.pop();
                    self.step = Step::WhereOperator;
                }
                Step::WhereOperator => {
                    let op = match self.peek().as_str() {
                        "=" => Operator::Eq,
                        "!=" => Operator::Ne,
                        ">" => Operator::Gt,
                        ">=" => Operator::Gte,
                        "<" => Operator::Lt,
                        "<=" => Operator::Lte,
                        _ => return Err(self.err("at WHERE: unknown operator")),
                    };
                    self.where_op = Some(op);
                    self.pop();
                    self.step = Step::WhereValue;
                }
                Step::WhereValue => {
                    let tok = self.peek();
                    let rhs = if is_identifier(&tok) {
                        Operand::Field(tok)
                    } else {
                        let (value, len) = self.peek_quoted_with_len();
                        if len == 0 {
                            return Err(self.err("at WHERE: expected quoted value"));
                        }
                        Operand::Literal(value)
                    };
                    self.conditions.push(Condition {
                        lhs: Operand::Field(std::mem::take(&mut self.where_lhs)),
                        op: self.where_op.take().unwrap(),
                        rhs,
                    });
                    self.pop();
                    self.step = Step::WhereAnd;
                }
                Step::WhereAnd => {
                    let tok = self.peek();
                    if !tok.eq_ignore_ascii_case("AND") {
                        return Err(self.err("expected AND"));
                    }
                    self.pop();
                    self.step = Step::WhereField;
                }

                Step::InsertTable => {
                    let name = self.peek();
                    if name.is_empty() {
                        return Err(self.err("at INSERT INTO: expected quoted table name"));
                    }
                    self.table = name;
                    self.pop();
                    self.step = Step::InsertFieldsOpeningParens;
                }
                Step::InsertFieldsOpeningParens => {
                    if self.peek() != "(" {
                        return Err(self.err("at INSERT INTO: expected opening parens"));
                    }
                    self.pop();
                    self.step = Step::InsertFields;
                }
                Step::InsertFields => {
                    let tok = self.peek();
                    if !is_identifier(&tok) {
                        return Err(self.err("at INSERT INTO: expected at least one field"));
                    }
                    self.fields.push(tok);
                    self.pop();
                    self.step = Step::InsertFieldsCommaOrClosingParens;
                }
                Step::InsertFieldsCommaOrClosingParens => {
                    let tok = self.peek();
                    if tok != "," && tok != ")" {
                        return Err(self.err("at INSERT INTO: expected comma or closing parens"));
                    }
                    self.pop();
                    if tok == "," {
                        self.step = Step::InsertFields;
                        continue;
                    }
                    self.step = Step::InsertValuesWord;
                }
                Step::InsertValuesWord => {
                    if self.peek() != "VALUES" {
                        return Err(self.err("at INSERT INTO: expected 'VALUES'"));
                    }
                    self.pop();
                    self.step = Step::InsertValuesOpeningParens;
                }
                Step::InsertValuesOpeningParens => {
                    if self.peek() != "(" {
                        return Err(self.err("at INSERT INTO: expected opening parens"));
                    }
                    self.inserts.push(Vec::new());
                    self.pop();
                    self.step = Step::InsertValues;
                }
                Step::InsertValues => {
                    let (value, len) = self.peek_quoted_with_len();
                    if len == 0 {
                        return Err(self.err("at INSERT INTO: expected quoted value"));
                    }
                    self.inserts.last_mut().unwrap().push(value);
                    self.pop();
                    self.step = Step::InsertValuesCommaOrClosingParens;
                }
                Step::InsertValuesCommaOrClosingParens => {
                    let tok = self.peek();
                    if tok != "," && tok != ")" {
                        return Err(self.err("at INSERT INTO: expected comma or closing parens"));
                    }
                    self.pop();
                    if tok == "," {
                        self.step = Step::InsertValues;
                        continue;
                    }
                    let row = self.inserts.last().unwrap();
                    if row.len() < self.fields.len() {
                        return Err(self.err("at INSERT INTO: value count doesn't match field count"));
                    }
                    self.step = Step::InsertValuesCommaBeforeOpeningParens;
                }
                Step::InsertValuesCommaBeforeOpeningParens => {
                    if self.peek() != "," {
                        return Err(self.err("at INSERT INTO: expected comma"));
                    }
                    self.pop();
                    self.step = Step::InsertValuesOpeningParens;
                }

                Step::CreateTable => {
                    let name = self.peek();
                    if name.is_empty() {
                        return Err(self.err("at CREATE TABLE: expected quoted table name"));
                    }
                    self.table = name;
                    self.pop();
                    self.step = Step::CreateFieldsOpeningParens;
                }
                Step::CreateFieldsOpeningParens => {
                    if self.peek() != "(" {
                        return Err(self.err("at CREATE TABLE: expected opening parens"));
                    }
                    self.pop();
                    self.step = Step::CreateFields;
                }
                Step::CreateFields => {
                    let tok = self.peek();
                    if !is_identifier(&tok) {
                        return Err(self.err("at CREATE TABLE: expected field to CREATE"));
                    }
                    self.pending_column = tok;
                    self.pop();
                    self.step = Step::CreateColumnType;
                }
                Step::CreateColumnType => {
                    let tok = self.peek();
                    let Some(ty) = ColumnType::from_keyword(&tok) else {
                        return Err(self.err("at CREATE TABLE: expected valid data type for column"));
                    };
                    self.columns.push(ColumnDecl {
                        name: std::mem::take(&mut self.pending_column),
                        ty,
                        size: None,
                        constraints: Vec::new(),
                    });
                    self.pop();
                    self.step = Step::CreateColumnSize;
                }
                Step::CreateColumnSize => {
                    let tok = self.peek();
                    if tok == "," || tok == ")" {
                        self.step = Step::CreateCommaOrClosingParens;
                        continue;
                    }
                    if tok != "(" {
                        self.step = Step::CreateConstraints;
                        continue;
                    }
                    self.pop();
                    let size = self.peek();
                    self.columns.last_mut().unwrap().size = Some(size);
                    self.pop();
                    if self.peek() != ")" {
                        return Err(self.err("at CREATE TABLE: expected closing parens for size"));
                    }
                    self.pop();
                    self.step = Step::CreateConstraints;
                }
                Step::CreateConstraints => {
                    let tok = self.peek();
                    if tok == "," || tok == ")" {
                        self.step = Step::CreateCommaOrClosingParens;
                        continue;
                    }
                    let constraint = match tok.as_str() {
                        "PRIMARY KEY" => ConstraintDecl::PrimaryKey,
                        "NOT NULL" => ConstraintDecl::NotNull,
                        "UNIQUE" => ConstraintDecl::Unique,
                        _ => return Err(self.err("at CREATE TABLE: expected comma or parens")),
                    };
                    self.pop();
                    self.columns.last_mut().unwrap().constraints.push(constraint);
                }
                Step::CreateCommaOrClosingParens => {
                    let tok = self.peek();
                    self.pop();
                    if tok == "," {
                        self.step = Step::CreateFields;
                    }
                }

                Step::DropTable => {
                    let name = self.peek();
                    if name.is_empty() {
                        return Err(self.err("at DROP TABLE: expected quoted table name"));
                    }
                    self.table = name;
                    self.pop();
                }
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ParseError> {
        if self.conditions.is_empty() && self.step == Step::WhereField {
            return Err(self.err("at WHERE: empty WHERE clause"));
        }
        if matches!(self.step, Step::WhereOperator | Step::WhereValue) {
            return Err(self.err("at WHERE: incomplete condition"));
        }
        let Some(kind) = self.kind else {
            return Err(self.err("query type cannot be empty"));
        };
        if self.table.is_empty() {
            return Err(self.err("table name cannot be empty"));
        }
        if self.conditions.is_empty() && matches!(kind, QueryKind::Update | QueryKind::Delete) {
            return Err(self.err("at WHERE: WHERE clause is mandatory for UPDATE & DELETE"));
        }
        for cond in &self.conditions {
            if cond.lhs.field().is_some_and(str::is_empty) {
                return Err(self.err("at WHERE: condition with empty left side operand"));
            }
            if cond.rhs.field().is_some_and(str::is_empty) {
                return Err(self.err("at WHERE: condition with empty right side operand"));
            }
        }
        if kind == QueryKind::Insert {
            if self.inserts.is_empty() {
                return Err(self.err("at INSERT INTO: need at least one row to insert"));
            }
            for row in &self.inserts {
                if row.len() != self.fields.len() {
                    return Err(self.err("at INSERT INTO: value count doesn't match field count"));
                }
            }
        }
        if kind == QueryKind::Create {
            if self.columns.is_empty() {
                return Err(self.err("at CREATE TABLE: can't have empty table"));
            }
            for col in &self.columns {
                if col.ty == ColumnType::Char && col.size.is_none() {
                    return Err(self.err(format!(
                        "at CREATE TABLE: CHAR column '{}' requires a size",
                        col.name
                    )));
                }
            }
        }
        Ok(())
    }

    fn peek(&self) -> String {
        self.peek_with_len().0
    }

    /// Longest-prefix reserved word, else quoted string, else identifier
    /// run. Reserved words come back uppercased.
    fn peek_with_len(&self) -> (String, usize) {
        if self.i >= self.sql.len() {
            return (String::new(), 0);
        }
        let bytes = self.sql.as_bytes();
        for rw in RESERVED_WORDS {
            let end = (self.i + rw.len()).min(bytes.len());
            if bytes[self.i..end].eq_ignore_ascii_case(rw.as_bytes()) {
                return ((*rw).to_string(), rw.len());
            }
        }
        if bytes[self.i] == b'\'' {
            return self.peek_quoted_with_len();
        }
        self.peek_identifier_with_len()
    }

    /// A `'…'` quoted string starting at the cursor. The returned length
    /// includes both quotes; an unterminated string yields length 0.
    fn peek_quoted_with_len(&self) -> (String, usize) {
        let bytes = self.sql.as_bytes();
        if self.i >= bytes.len() || bytes[self.i] != b'\'' {
            return (String::new(), 0);
        }
        let mut j = self.i + 1;
        while j < bytes.len() {
            if bytes[j] == b'\'' && bytes[j - 1] != b'\\' {
                let inner = &self.sql[self.i + 1..j];
                return (inner.to_string(), inner.len() + 2);
            }
            j += 1;
        }
        (String::new(), 0)
    }

    fn peek_identifier_with_len(&self) -> (String, usize) {
        let bytes = self.sql.as_bytes();
        let mut j = self.i;
        while j < bytes.len()
            && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_' || bytes[j] == b'*')
        {
            j += 1;
        }
        (self.sql[self.i..j].to_string(), j - self.i)
    }

    /// Consume the peeked token and any whitespace after it.
    fn pop(&mut self) -> String {
        let (tok, len) = self.peek_with_len();
        self.i += len;
        let bytes = self.sql.as_bytes();
        while self.i < bytes.len() && bytes[self.i].is_ascii_whitespace() {
            self.i += 1;
        }
        tok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_table() {
        let q = parse("CREATE TABLE 'T' (id INT PRIMARY KEY, n CHAR(10), b BOOL, f FLOAT)")
            .unwrap();
        assert_eq!(q.kind, QueryKind::Create);
        assert_eq!(q.table, "T");
        assert_eq!(q.columns.len(), 4);

        assert_eq!(q.columns[0].name, "id");
        assert_eq!(q.columns[0].ty, ColumnType::Int);
        assert_eq!(q.columns[0].constraints, vec![ConstraintDecl::PrimaryKey]);

        assert_eq!(q.columns[1].name, "n");
        assert_eq!(q.columns[1].ty, ColumnType::Char);
        assert_eq!(q.columns[1].size.as_deref(), Some("10"));

        assert_eq!(q.columns[2].ty, ColumnType::Bool);
        assert_eq!(q.columns[3].ty, ColumnType::Float);
    }

    #[test]
    fn test_create_multiple_constraints() {
        let q = parse("CREATE TABLE 't' (a CHAR(5) NOT NULL UNIQUE, b INT PRIMARY KEY)").unwrap();
        assert_eq!(
            q.columns[0].constraints,
            vec![ConstraintDecl::NotNull, ConstraintDecl::Unique]
        );
        assert_eq!(q.columns[1].constraints, vec![ConstraintDecl::PrimaryKey]);
    }

    #[test]
    fn test_insert_single_row() {
        let q = parse("INSERT INTO 'T' (id,n,b,f) VALUES ('1','abc','true','1.25')").unwrap();
        assert_eq!(q.kind, QueryKind::Insert);
        assert_eq!(q.table, "T");
        assert_eq!(q.fields, vec!["id", "n", "b", "f"]);
        assert_eq!(q.inserts, vec![vec!["1", "abc", "true", "1.25"]]);
    }

    #[test]
    fn test_insert_multiple_rows() {
        let q = parse("INSERT INTO 'U' (v) VALUES ('10'),('20')").unwrap();
        assert_eq!(q.inserts, vec![vec!["10"], vec!["20"]]);
    }

    #[test]
    fn test_select_star() {
        let q = parse("SELECT * FROM 'T'").unwrap();
        assert_eq!(q.kind, QueryKind::Select);
        assert_eq!(q.fields, vec!["*"]);
        assert_eq!(q.table, "T");
        assert!(q.conditions.is_empty());
    }

    #[test]
    fn test_select_fields_aliases_where() {
        let q = parse("SELECT a AS x, b FROM 't1' WHERE a = '5' AND b != 'y'").unwrap();
        assert_eq!(q.fields, vec!["a", "b"]);
        assert_eq!(q.aliases.get("a").map(String::as_str), Some("x"));
        assert_eq!(q.conditions.len(), 2);
        assert_eq!(
            q.conditions[0],
            Condition {
                lhs: Operand::Field("a".to_string()),
                op: Operator::Eq,
                rhs: Operand::Literal("5".to_string()),
            }
        );
        assert_eq!(q.conditions[1].op, Operator::Ne);
    }

    #[test]
    fn test_where_field_operand() {
        let q = parse("SELECT * FROM 't' WHERE a >= b").unwrap();
        assert_eq!(q.conditions[0].rhs, Operand::Field("b".to_string()));
        assert_eq!(q.conditions[0].op, Operator::Gte);
    }

    #[test]
    fn test_update() {
        let q = parse("UPDATE 't' SET a = '1', b = '2' WHERE c = '3'").unwrap();
        assert_eq!(q.kind, QueryKind::Update);
        assert_eq!(
            q.updates,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string())
            ]
        );
    }

    #[test]
    fn test_delete() {
        let q = parse("DELETE FROM 't' WHERE a = '1'").unwrap();
        assert_eq!(q.kind, QueryKind::Delete);
        assert_eq!(q.conditions.len(), 1);
    }

    #[test]
    fn test_drop() {
        let q = parse("DROP TABLE 't'").unwrap();
        assert_eq!(q.kind, QueryKind::Drop);
        assert_eq!(q.table, "t");
    }

    #[test]
    fn test_keywords_case_insensitive() {
        let q = parse("select * from 'T' where a = '1'").unwrap();
        assert_eq!(q.kind, QueryKind::Select);
        let q = parse("create table 't' (a int primary key)").unwrap();
        assert_eq!(q.columns[0].constraints, vec![ConstraintDecl::PrimaryKey]);
    }

    #[test]
    fn test_escaped_quote_in_literal() {
        let q = parse(r"INSERT INTO 't' (a) VALUES ('it\'s')").unwrap();
        assert_eq!(q.inserts[0][0], r"it\'s");
    }

    #[test]
    fn test_rejects_empty_statement() {
        assert!(parse("").is_err());
        assert!(parse("   ").is_err());
    }

    #[test]
    fn test_rejects_unknown_statement() {
        assert!(parse("EXPLAIN 't'").is_err());
    }

    #[test]
    fn test_rejects_where_without_conditions() {
        assert!(parse("SELECT * FROM 't' WHERE").is_err());
    }

    #[test]
    fn test_rejects_incomplete_condition() {
        assert!(parse("SELECT * FROM 't' WHERE a").is_err());
        assert!(parse("SELECT * FROM 't' WHERE a =").is_err());
    }

    #[test]
    fn test_rejects_update_delete_without_where() {
        assert!(parse("UPDATE 't' SET a = '1'").is_err());
        assert!(parse("DELETE FROM 't'").is_err());
    }

    #[test]
    fn test_rejects_insert_arity_mismatch() {
        assert!(parse("INSERT INTO 't' (a,b) VALUES ('1')").is_err());
        assert!(parse("INSERT INTO 't' (a) VALUES ('1','2')").is_err());
    }

    #[test]
    fn test_rejects_insert_without_values() {
        assert!(parse("INSERT INTO 't' (a) VALUES").is_err());
    }

    #[test]
    fn test_rejects_create_without_columns() {
        assert!(parse("CREATE TABLE 't'").is_err());
        assert!(parse("CREATE TABLE 't' ()").is_err());
    }

    #[test]
    fn test_rejects_char_without_size() {
        assert!(parse("CREATE TABLE 't' (a CHAR PRIMARY KEY)").is_err());
    }

    #[test]
    fn test_rejects_unknown_column_type() {
        assert!(parse("CREATE TABLE 't' (a TEXT)").is_err());
    }

    #[test]
    fn test_rejects_unterminated_string() {
        assert!(parse("SELECT * FROM 'T").is_err());
    }

    #[test]
    fn test_rejects_empty_table_name() {
        assert!(parse("SELECT * FROM '' WHERE a = '1'").is_err());
    }

    #[test]
    fn test_error_carries_position() {
        match parse("SELECT * FROM 't' BOGUS '1'") {
            Err(ParseError::Syntax { pos, .. }) => assert!(pos >= 18),
            other => panic!("expected syntax error, got {other:?}"),
        }
    }
}
