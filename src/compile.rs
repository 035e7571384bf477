use std::fmt::Write as _;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::Context as _;
use tracing::{debug, info_span};

use crate::codegen::{emit_c, generate};
use crate::frontend::ast::Program;
use crate::frontend::diagnostic::{Diagnostic, format_diagnostic};
use crate::frontend::lexer::{Lexer, Token};
use crate::frontend::parser::parse_program;

/// A diagnostic already rendered against its source text. Carried through
/// `anyhow` so the driver can print it verbatim.
#[derive(Debug, thiserror::Error)]
#[error("{rendered}")]
pub struct SourceError {
    pub diagnostic: Diagnostic,
    rendered: String,
}

impl SourceError {
    pub fn new(diagnostic: Diagnostic, source: &str) -> Self {
        let rendered = format_diagnostic(&diagnostic, source);
        Self {
            diagnostic,
            rendered,
        }
    }
}

pub fn parse_source<R: Read>(reader: R) -> Result<Program, Diagnostic> {
    let _span = info_span!("pipeline.parse").entered();
    let program = parse_program(reader)?;
    debug!(statements = program.body.len(), "parsed program");
    Ok(program)
}

pub fn compile_source<R: Read>(reader: R) -> Result<String, Diagnostic> {
    let program = parse_source(reader)?;
    let _span = info_span!("pipeline.codegen").entered();
    let module = emit_c(&program)?;
    debug!(bytes = module.text.len(), "generated C");
    Ok(module.text)
}

pub fn tokenize_source<R: Read>(reader: R) -> Result<Vec<Token>, Diagnostic> {
    let _span = info_span!("pipeline.lex").entered();
    Lexer::new(reader).tokenize()
}

pub fn compile_file(path: &Path) -> anyhow::Result<String> {
    let bytes = read_source(path)?;
    compile_source(bytes.as_slice()).map_err(|diag| with_source(diag, &bytes))
}

/// Compile the file at `path` and stream the C text into `sink`.
pub fn emit_file(path: &Path, sink: &mut impl Write) -> anyhow::Result<()> {
    let bytes = read_source(path)?;
    let program = parse_source(bytes.as_slice()).map_err(|diag| with_source(diag, &bytes))?;
    let _span = info_span!("pipeline.codegen").entered();
    generate(&program, sink).map_err(|diag| with_source(diag, &bytes))
}

pub fn tokenize_file(path: &Path) -> anyhow::Result<Vec<Token>> {
    let bytes = read_source(path)?;
    tokenize_source(bytes.as_slice()).map_err(|diag| with_source(diag, &bytes))
}

// Read whole so diagnostics can quote the offending line. The lexer still
// sees the raw bytes and reports bad UTF-8 itself.
fn read_source(path: &Path) -> anyhow::Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn with_source(diag: Diagnostic, bytes: &[u8]) -> anyhow::Error {
    SourceError::new(diag, &String::from_utf8_lossy(bytes)).into()
}

pub fn dump_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    for tok in tokens {
        let flags = match (tok.space_before, tok.newline_before) {
            (_, true) => " [nl]",
            (true, false) => " [sp]",
            (false, false) => "",
        };
        let _ = writeln!(
            out,
            "{:>4}  {:<16} {}{}",
            tok.line,
            format!("{:?}", tok.kind),
            tok.display_text(),
            flags
        );
    }
    out
}
