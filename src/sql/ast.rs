//! Statement types produced by the parser.

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Load(LoadStatement),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Key,
    Value,
    All,
    Count,
}

/// The column a condition constrains. Tables have exactly two columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attr {
    Key,
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i32),
    Str(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub attr: Attr,
    pub op: CompareOp,
    pub value: Literal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub projection: Projection,
    pub table: String,
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadStatement {
    pub table: String,
    pub file: String,
    pub with_index: bool,
}
