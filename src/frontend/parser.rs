// Recursive descent with one token of lookahead. Names are resolved while
// parsing; particles, operation keywords, comparators and `。` must be glued
// to the word before them, `かつ`/`または` need a space or line break on both sides.

use std::io::Read;

use tracing::debug;

use super::ast::*;
use super::diagnostic::Diagnostic;
use super::lexer::{Lexer, Token, TokenKind};
use super::suggest::did_you_mean;
use super::symbols::SymbolTable;
use super::template::build_template;

pub struct Parser<R: Read> {
    lexer: Lexer<R>,
    current: Token,
    symbols: SymbolTable,
}

pub fn parse_program<R: Read>(reader: R) -> Result<Program, Diagnostic> {
    Parser::new(reader)?.parse_program()
}

impl<R: Read> Parser<R> {
    pub fn new(reader: R) -> Result<Self, Diagnostic> {
        let mut lexer = Lexer::new(reader);
        let current = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            symbols: SymbolTable::new(),
        })
    }

    pub fn parse_program(&mut self) -> Result<Program, Diagnostic> {
        self.expect(TokenKind::Main, "at start of program")?;
        let body = self.parse_block()?;
        if !self.at(TokenKind::Eof) {
            return Err(self.unexpected("expected end of file after the program block"));
        }
        Ok(Program { body })
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, Diagnostic> {
        self.expect(TokenKind::LBrace, "to open a block")?;
        self.symbols.enter_scope();
        let mut body = Vec::new();
        while !self.at(TokenKind::RBrace) {
            if self.at(TokenKind::Eof) {
                return Err(self.unexpected("missing `｝` to close the block"));
            }
            body.push(self.parse_stmt()?);
        }
        let depth = self.symbols.depth();
        let dropped = self.symbols.exit_scope();
        debug!(depth, ?dropped, "leave scope");
        self.bump()?;
        Ok(body)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, Diagnostic> {
        match self.current.kind {
            TokenKind::Loop => {
                self.bump()?;
                let cond = self.parse_paren_cond()?;
                let body = self.parse_block()?;
                Ok(Stmt::Loop { cond, body })
            }
            TokenKind::If => Ok(Stmt::If(self.parse_if()?)),
            _ => {
                let stmt = self.parse_simple()?;
                self.expect_glued(TokenKind::Period, "to end the statement")?;
                Ok(stmt)
            }
        }
    }

    fn parse_if(&mut self) -> Result<IfStmt, Diagnostic> {
        self.bump()?;
        let cond = self.parse_paren_cond()?;
        let body = self.parse_block()?;
        let else_branch = match self.current.kind {
            TokenKind::ElseIf => Some(ElseBranch::ElseIf(Box::new(self.parse_if()?))),
            TokenKind::Else => {
                self.bump()?;
                Some(ElseBranch::Else(self.parse_block()?))
            }
            _ => None,
        };
        Ok(IfStmt {
            cond,
            body,
            else_branch,
        })
    }

    fn parse_simple(&mut self) -> Result<Stmt, Diagnostic> {
        match self.current.kind {
            TokenKind::Number => {
                let tok = self.bump()?;
                let value = number_value(&tok)?;
                self.expect_glued(TokenKind::Output, "in output statement")?;
                Ok(Stmt::Output(OutputArg::Value(Value::Number(value))))
            }
            TokenKind::PrintLit => {
                let tok = self.bump()?;
                let symbols = &self.symbols;
                let template = build_template(&tok.text, |name| {
                    symbols
                        .lookup(name)
                        .ok_or_else(|| undefined_variable(symbols, name, tok.line, " in print literal"))
                })?;
                self.expect_glued(TokenKind::Output, "in output statement")?;
                Ok(Stmt::Output(OutputArg::Text(template)))
            }
            TokenKind::Variable => self.parse_var_stmt(),
            _ => Err(self.unexpected("expected a statement")),
        }
    }

    fn parse_var_stmt(&mut self) -> Result<Stmt, Diagnostic> {
        let target = self.bump()?;
        match self.current.kind {
            TokenKind::Wo => {
                self.bump_glued()?;
                let value = self.parse_value()?;
                match self.current.kind {
                    TokenKind::Declare => {
                        self.bump_glued()?;
                        let target = self.declare(&target)?;
                        Ok(Stmt::Declare { target, value })
                    }
                    TokenKind::Div => {
                        self.bump_glued()?;
                        let target = self.resolve(&target)?;
                        Ok(Stmt::Compound {
                            op: ArithOp::Div,
                            target,
                            value,
                        })
                    }
                    _ => Err(self.unexpected("expected `で宣言する` or `でわる`")),
                }
            }
            TokenKind::Ni => {
                self.bump_glued()?;
                if self.at(TokenKind::Input) {
                    self.bump_glued()?;
                    return Ok(Stmt::Input(self.resolve(&target)?));
                }
                let value = self.parse_value()?;
                let op = match self.current.kind {
                    TokenKind::Assign => None,
                    TokenKind::Add => Some(ArithOp::Add),
                    TokenKind::Mul => Some(ArithOp::Mul),
                    _ => return Err(self.unexpected("expected `を代入する`, `をたす` or `をかける`")),
                };
                self.bump_glued()?;
                let target = self.resolve(&target)?;
                Ok(match op {
                    None => Stmt::Assign { target, value },
                    Some(op) => Stmt::Compound { op, target, value },
                })
            }
            TokenKind::Kara => {
                self.bump_glued()?;
                let value = self.parse_value()?;
                self.expect_glued(TokenKind::Sub, "in subtraction")?;
                let target = self.resolve(&target)?;
                Ok(Stmt::Compound {
                    op: ArithOp::Sub,
                    target,
                    value,
                })
            }
            _ => Err(self.unexpected("expected `を`, `に` or `から` after the variable")),
        }
    }

    fn parse_value(&mut self) -> Result<Value, Diagnostic> {
        match self.current.kind {
            TokenKind::Number => {
                let tok = self.bump()?;
                Ok(Value::Number(number_value(&tok)?))
            }
            TokenKind::Variable => {
                let tok = self.bump()?;
                Ok(Value::Var(self.resolve(&tok)?))
            }
            _ => Err(self.unexpected("expected a numeric literal or a variable")),
        }
    }

    fn parse_paren_cond(&mut self) -> Result<Cond, Diagnostic> {
        self.expect(TokenKind::LParen, "before condition")?;
        let cond = self.parse_cond()?;
        self.expect(TokenKind::RParen, "after condition")?;
        Ok(cond)
    }

    fn parse_cond(&mut self) -> Result<Cond, Diagnostic> {
        let mut node = self.parse_term()?;
        while self.at(TokenKind::Or) {
            self.bump_logical()?;
            let rhs = self.parse_term()?;
            node = Cond::Or(Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    fn parse_term(&mut self) -> Result<Cond, Diagnostic> {
        let mut node = self.parse_factor()?;
        while self.at(TokenKind::And) {
            self.bump_logical()?;
            let rhs = self.parse_factor()?;
            node = Cond::And(Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    fn parse_factor(&mut self) -> Result<Cond, Diagnostic> {
        if self.at(TokenKind::LParen) {
            return self.parse_paren_cond();
        }
        let lhs = self.parse_value()?;
        self.expect_glued(TokenKind::Ga, "in comparison")?;
        let rhs = self.parse_value()?;
        let op = match self.current.kind {
            TokenKind::Ge => CompareOp::Ge,
            TokenKind::Le => CompareOp::Le,
            TokenKind::Gt => CompareOp::Gt,
            TokenKind::Lt => CompareOp::Lt,
            TokenKind::Eq => CompareOp::Eq,
            TokenKind::Ne => CompareOp::Ne,
            _ => return Err(self.unexpected("expected a comparison such as `と一緒か`")),
        };
        self.bump_glued()?;
        Ok(Cond::Compare { op, lhs, rhs })
    }

    fn declare(&mut self, tok: &Token) -> Result<VarRef, Diagnostic> {
        let id = self.symbols.declare(&tok.text).map_err(|_| {
            Diagnostic::semantic(
                tok.line,
                format!(
                    "duplicate declaration of {}; the name is already visible here",
                    tok.display_text()
                ),
            )
        })?;
        debug!(name = %tok.text, id, "declare");
        Ok(VarRef {
            id,
            name: tok.text.clone(),
        })
    }

    fn resolve(&self, tok: &Token) -> Result<VarRef, Diagnostic> {
        match self.symbols.lookup(&tok.text) {
            Some(id) => Ok(VarRef {
                id,
                name: tok.text.clone(),
            }),
            None => Err(undefined_variable(&self.symbols, &tok.text, tok.line, "")),
        }
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn bump(&mut self) -> Result<Token, Diagnostic> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn bump_glued(&mut self) -> Result<Token, Diagnostic> {
        if !self.current.is_glued() {
            return Err(Diagnostic::syntax(
                self.current.line,
                format!(
                    "`{}` must directly follow the preceding word; found a space or line break before it",
                    self.current.display_text()
                ),
            ));
        }
        self.bump()
    }

    fn bump_logical(&mut self) -> Result<Token, Diagnostic> {
        if self.current.is_glued() {
            return Err(Diagnostic::syntax(
                self.current.line,
                format!(
                    "`{}` needs a space or line break before it",
                    self.current.display_text()
                ),
            ));
        }
        let tok = self.bump()?;
        if self.current.is_glued() {
            return Err(Diagnostic::syntax(
                tok.line,
                format!(
                    "`{}` needs a space or line break after it, found `{}`",
                    tok.display_text(),
                    self.current.display_text()
                ),
            ));
        }
        Ok(tok)
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> Result<Token, Diagnostic> {
        if !self.at(kind) {
            return Err(self.unexpected(&format!("expected `{}` {}", kind.describe(), context)));
        }
        self.bump()
    }

    fn expect_glued(&mut self, kind: TokenKind, context: &str) -> Result<Token, Diagnostic> {
        if !self.at(kind) {
            return Err(self.unexpected(&format!("expected `{}` {}", kind.describe(), context)));
        }
        self.bump_glued()
    }

    fn unexpected(&self, message: &str) -> Diagnostic {
        Diagnostic::syntax(
            self.current.line,
            format!("{}, found `{}`", message, self.current.display_text()),
        )
    }
}

fn number_value(tok: &Token) -> Result<f64, Diagnostic> {
    let value = tok
        .text
        .parse::<f64>()
        .map_err(|_| Diagnostic::lexical(tok.line, format!("invalid numeric literal `{}`", tok.text)))?;
    if !value.is_finite() {
        return Err(Diagnostic::lexical(
            tok.line,
            format!("numeric literal out of range `{}`", tok.display_text()),
        ));
    }
    Ok(value)
}

fn undefined_variable(symbols: &SymbolTable, name: &str, line: usize, place: &str) -> Diagnostic {
    let mut message = format!("undefined variable ”{name}”{place}");
    if let Some(hint) = did_you_mean(name, symbols.visible_names()) {
        message.push_str("; ");
        message.push_str(&hint);
    }
    Diagnostic::semantic(line, message)
}
