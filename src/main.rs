// Purpose: Provide the binary entry for the jpc compiler.
// Inputs/Outputs: Reads process args and returns process exit code from the CLI dispatcher.
// Invariants: Main must not bypass centralized CLI argument/diagnostic handling.
// Gotchas: Exit code is 1 for any diagnostic or tool failure, 0 otherwise.

fn main() {
    let code = jpc::cli::run_cli(std::env::args().skip(1));
    std::process::exit(code);
}
