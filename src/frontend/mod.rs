// Purpose: Frontend module hub that wires lexer, parser, scoping and diagnostics together.
// Inputs/Outputs: Exposes the token stream and the resolved AST consumed by codegen and the driver.
// Invariants: Every variable in a parsed Program already carries the id of its declaration.
// Gotchas: The parser pulls tokens lazily, so lexical errors surface in source order alongside syntax errors.

pub mod ast;
pub mod diagnostic;
pub mod lexer;
pub mod parser;
pub mod suggest;
pub mod symbols;
pub mod template;
