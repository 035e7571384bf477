// Purpose: Define crate-level module surface for the jpc compiler.
// Inputs/Outputs: Exposes frontend, codegen, pipeline and CLI modules to the binary and tests.
// Invariants: The pipeline is strictly lexer -> parser -> codegen with no shared global state.
// Gotchas: Keep module wiring consistent with src/main.rs, which only forwards to cli::run_cli.

pub mod cli;
pub mod codegen;
pub mod compile;
pub mod frontend;
