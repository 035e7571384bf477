use super::symbols::VarId;

#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub body: Vec<Stmt>,
}

/// A variable reference resolved by the parser. `name` is kept for
/// diagnostics only; everything downstream keys on `id`.
#[derive(Clone, Debug, PartialEq)]
pub struct VarRef {
    pub id: VarId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Number(f64),
    Var(VarRef),
}

/// An interpolated print literal, already escaped for a printf format string.
#[derive(Clone, Debug, PartialEq)]
pub struct Template {
    pub format: String,
    pub args: Vec<VarId>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum OutputArg {
    Value(Value),
    Text(Template),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Ge,
    Le,
    Gt,
    Lt,
    Eq,
    Ne,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Cond {
    Compare {
        op: CompareOp,
        lhs: Value,
        rhs: Value,
    },
    And(Box<Cond>, Box<Cond>),
    Or(Box<Cond>, Box<Cond>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Declare {
        target: VarRef,
        value: Value,
    },
    Assign {
        target: VarRef,
        value: Value,
    },
    Compound {
        op: ArithOp,
        target: VarRef,
        value: Value,
    },
    Input(VarRef),
    Output(OutputArg),
    If(IfStmt),
    Loop {
        cond: Cond,
        body: Vec<Stmt>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct IfStmt {
    pub cond: Cond,
    pub body: Vec<Stmt>,
    pub else_branch: Option<ElseBranch>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ElseBranch {
    ElseIf(Box<IfStmt>),
    Else(Vec<Stmt>),
}
