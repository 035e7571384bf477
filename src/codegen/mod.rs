use std::io::Write;

use crate::frontend::ast::{
    ArithOp, CompareOp, Cond, ElseBranch, IfStmt, OutputArg, Program, Stmt, Template, Value,
};
use crate::frontend::diagnostic::Diagnostic;
use crate::frontend::symbols::VarId;
use crate::frontend::template::count_placeholders;

pub struct CModule {
    pub text: String,
}

pub fn emit_c(program: &Program) -> Result<CModule, Diagnostic> {
    let mut codegen = Codegen::new();
    codegen.emit_program(program)?;
    Ok(CModule {
        text: codegen.output,
    })
}

pub fn generate(program: &Program, sink: &mut impl Write) -> Result<(), Diagnostic> {
    let module = emit_c(program)?;
    sink.write_all(module.text.as_bytes())
        .and_then(|()| sink.flush())
        .map_err(|err| Diagnostic::system(format!("failed to write generated C: {err}")))
}

pub fn var_name(id: VarId) -> String {
    format!("jpc_var_{id}")
}

struct Codegen {
    output: String,
    depth: usize,
}

impl Codegen {
    fn new() -> Self {
        Self {
            output: String::new(),
            depth: 0,
        }
    }

    fn emit_program(&mut self, program: &Program) -> Result<(), Diagnostic> {
        self.output.push_str("#include <stdio.h>\n\n");
        self.output.push_str("int main(void) {\n");
        self.depth = 1;
        self.emit_block(&program.body)?;
        self.line("return 0;");
        self.depth = 0;
        self.output.push_str("}\n");
        Ok(())
    }

    fn emit_block(&mut self, body: &[Stmt]) -> Result<(), Diagnostic> {
        for stmt in body {
            self.emit_stmt(stmt)?;
        }
        Ok(())
    }

    fn emit_stmt(&mut self, stmt: &Stmt) -> Result<(), Diagnostic> {
        match stmt {
            Stmt::Declare { target, value } => {
                let text = format!("double {} = {};", var_name(target.id), value_expr(value));
                self.line(&text);
            }
            Stmt::Assign { target, value } => {
                let text = format!("{} = {};", var_name(target.id), value_expr(value));
                self.line(&text);
            }
            Stmt::Compound { op, target, value } => {
                let text = format!(
                    "{} {} {};",
                    var_name(target.id),
                    compound_op(*op),
                    value_expr(value)
                );
                self.line(&text);
            }
            Stmt::Input(target) => {
                let text = format!("scanf(\"%lf\", &{});", var_name(target.id));
                self.line(&text);
            }
            Stmt::Output(OutputArg::Value(value)) => {
                let text = format!("printf(\"%g\\n\", {});", value_expr(value));
                self.line(&text);
            }
            Stmt::Output(OutputArg::Text(template)) => {
                let text = printf_call(template)?;
                self.line(&text);
            }
            Stmt::If(stmt) => {
                let head = format!("if ({}) {{", cond_expr(&stmt.cond));
                self.line(&head);
                self.emit_if_tail(stmt)?;
            }
            Stmt::Loop { cond, body } => {
                let head = format!("while ({}) {{", cond_expr(cond));
                self.line(&head);
                self.emit_nested(body)?;
                self.line("}");
            }
        }
        Ok(())
    }

    /// Body of an `if` whose head line is already written, plus its else chain.
    fn emit_if_tail(&mut self, stmt: &IfStmt) -> Result<(), Diagnostic> {
        self.emit_nested(&stmt.body)?;
        match &stmt.else_branch {
            None => self.line("}"),
            Some(ElseBranch::ElseIf(next)) => {
                let head = format!("}} else if ({}) {{", cond_expr(&next.cond));
                self.line(&head);
                self.emit_if_tail(next)?;
            }
            Some(ElseBranch::Else(body)) => {
                self.line("} else {");
                self.emit_nested(body)?;
                self.line("}");
            }
        }
        Ok(())
    }

    fn emit_nested(&mut self, body: &[Stmt]) -> Result<(), Diagnostic> {
        self.depth += 1;
        let result = self.emit_block(body);
        self.depth -= 1;
        result
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.output.push('\t');
        }
        self.output.push_str(text);
        self.output.push('\n');
    }
}

fn printf_call(template: &Template) -> Result<String, Diagnostic> {
    let placeholders = count_placeholders(&template.format);
    if placeholders != template.args.len() {
        return Err(Diagnostic::codegen(format!(
            "print template has {} placeholder(s) but {} argument(s)",
            placeholders,
            template.args.len()
        )));
    }
    let mut call = format!("printf(\"{}\"", template.format);
    for id in &template.args {
        call.push_str(", ");
        call.push_str(&var_name(*id));
    }
    call.push_str(");");
    Ok(call)
}

fn value_expr(value: &Value) -> String {
    match value {
        Value::Number(n) => format!("{n:.6}"),
        Value::Var(var) => var_name(var.id),
    }
}

fn cond_expr(cond: &Cond) -> String {
    match cond {
        Cond::Compare { op, lhs, rhs } => {
            format!("({} {} {})", value_expr(lhs), compare_op(*op), value_expr(rhs))
        }
        Cond::And(lhs, rhs) => format!("({} && {})", cond_expr(lhs), cond_expr(rhs)),
        Cond::Or(lhs, rhs) => format!("({} || {})", cond_expr(lhs), cond_expr(rhs)),
    }
}

fn compound_op(op: ArithOp) -> &'static str {
    match op {
        ArithOp::Add => "+=",
        ArithOp::Sub => "-=",
        ArithOp::Mul => "*=",
        ArithOp::Div => "/=",
    }
}

fn compare_op(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Ge => ">=",
        CompareOp::Le => "<=",
        CompareOp::Gt => ">",
        CompareOp::Lt => "<",
        CompareOp::Eq => "==",
        CompareOp::Ne => "!=",
    }
}
