use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context as _, bail};
use clap::Parser as _;
use tracing::{info, info_span, warn};
use tracing_subscriber::EnvFilter;

use crate::compile::{SourceError, compile_file, dump_tokens, emit_file, tokenize_file};

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("JPC_GIT_COMMIT"), ")");

/// Compile a jpc program to C and build it with the system C compiler.
#[derive(Debug, clap::Parser)]
#[command(name = "jpc", version = VERSION)]
pub struct Args {
    /// Source file
    pub input: PathBuf,

    /// Path of the executable to build
    #[arg(short, long, value_name = "PATH", default_value = "a.out")]
    pub output: PathBuf,

    /// Write the generated C here and keep it
    #[arg(short = 'k', long = "keep-c", value_name = "PATH")]
    pub keep_c: Option<PathBuf>,

    /// Print the generated C to stdout instead of compiling it
    #[arg(long, conflicts_with = "tokens")]
    pub emit_c: bool,

    /// Print the token stream and exit
    #[arg(long)]
    pub tokens: bool,

    /// Run the executable after a successful build
    #[arg(short, long, conflicts_with_all = ["emit_c", "tokens"])]
    pub run: bool,

    /// More logging (-v info, -vv debug). JPC_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

pub fn run_cli<I>(args: I) -> i32
where
    I: IntoIterator<Item = String>,
{
    let args = match Args::try_parse_from(std::iter::once("jpc".to_string()).chain(args)) {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() { 1 } else { 0 };
        }
    };
    init_logging(args.verbose);
    match run(&args) {
        Ok(()) => 0,
        Err(err) => {
            report(&err);
            1
        }
    }
}

pub fn run(args: &Args) -> anyhow::Result<()> {
    if args.tokens {
        let tokens = tokenize_file(&args.input)?;
        let mut stdout = io::stdout().lock();
        stdout
            .write_all(dump_tokens(&tokens).as_bytes())
            .and_then(|()| stdout.flush())
            .context("failed to write token dump")?;
        return Ok(());
    }
    if args.emit_c {
        return emit_file(&args.input, &mut io::stdout().lock());
    }
    let c_text = compile_file(&args.input)?;
    build(args, &c_text, &resolve_cc())?;
    if args.run {
        run_executable(&args.output)?;
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env("JPC_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<SourceError>() {
        Some(source_err) => eprintln!("{source_err}"),
        None => eprintln!("error: {err:#}"),
    }
}

/// Write the C file, hand it to `cc`, and remove it again unless `-k` asked
/// to keep it.
fn build(args: &Args, c_text: &str, cc: &str) -> anyhow::Result<()> {
    let c_path = match &args.keep_c {
        Some(path) => path.clone(),
        None => temp_c_path(&args.input),
    };
    fs::write(&c_path, c_text)
        .with_context(|| format!("failed to write {}", c_path.display()))?;
    let result = compile_c(cc, &c_path, &args.output);
    if args.keep_c.is_some() {
        info!(path = %c_path.display(), "kept generated C");
    } else if let Err(err) = fs::remove_file(&c_path) {
        warn!(path = %c_path.display(), %err, "failed to remove temporary C file");
    }
    result
}

fn temp_c_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "program".to_string());
    std::env::temp_dir().join(format!("jpc-{}-{}.c", stem, std::process::id()))
}

fn compile_c(cc: &str, c_path: &Path, output: &Path) -> anyhow::Result<()> {
    let _span = info_span!("driver.cc", cc).entered();
    let args = vec![
        c_path.display().to_string(),
        "-o".to_string(),
        output.display().to_string(),
    ];
    info!(command = %format!("{} {}", cc, args.join(" ")), "invoking C compiler");
    run_cmd(cc, &args)
}

fn run_executable(path: &Path) -> anyhow::Result<()> {
    // A bare `a.out` would otherwise be looked up on PATH.
    let exe = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    run_cmd(exe.to_string_lossy().as_ref(), &[])
}

fn resolve_cc() -> String {
    if let Ok(cc) = std::env::var("JPC_CC") {
        if !cc.trim().is_empty() {
            return cc;
        }
    }
    if command_exists("gcc") {
        return "gcc".to_string();
    }
    "clang".to_string()
}

fn command_exists(cmd: &str) -> bool {
    Command::new(cmd).arg("--version").output().is_ok()
}

fn run_cmd(cmd: &str, args: &[String]) -> anyhow::Result<()> {
    let status = Command::new(cmd)
        .args(args)
        .status()
        .with_context(|| format!("failed to run {cmd}"))?;
    if !status.success() {
        bail!("command failed ({}): {} {}", status, cmd, args.join(" "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "jpc-{}-{}-{}",
            prefix,
            std::process::id(),
            nanos
        ));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn parse(argv: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("jpc").chain(argv.iter().copied()))
    }

    #[test]
    fn defaults_and_flags() {
        let args = parse(&["hello.jpc"]).expect("parse");
        assert_eq!(args.input, PathBuf::from("hello.jpc"));
        assert_eq!(args.output, PathBuf::from("a.out"));
        assert!(args.keep_c.is_none());
        assert!(!args.emit_c && !args.tokens && !args.run);
        assert_eq!(args.verbose, 0);

        let args = parse(&["-o", "prog", "-k", "prog.c", "-r", "-vv", "hello.jpc"]).expect("parse");
        assert_eq!(args.output, PathBuf::from("prog"));
        assert_eq!(args.keep_c, Some(PathBuf::from("prog.c")));
        assert!(args.run);
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn usage_errors_exit_with_one() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["a.jpc", "--emit-c", "--tokens"]).is_err());
        assert_eq!(run_cli(Vec::<String>::new()), 1);
        assert_eq!(run_cli(vec!["--version".to_string()]), 0);
    }

    #[test]
    fn temp_c_path_uses_stem_and_pid() {
        let path = temp_c_path(Path::new("dir/合計.jpc"));
        let name = path.file_name().expect("file name").to_string_lossy().into_owned();
        assert_eq!(name, format!("jpc-合計-{}.c", std::process::id()));
        assert!(path.starts_with(std::env::temp_dir()));
    }

    #[test]
    fn failing_source_exits_with_one() {
        let dir = temp_dir("cli-bad");
        let input = dir.join("bad.jpc");
        fs::write(&input, "メイン｛\n”A” を「1」で宣言する。\n｝\n").expect("write source");
        let code = run_cli(vec![input.display().to_string(), "--emit-c".to_string()]);
        assert_eq!(code, 1);
        let _ = fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn kept_c_file_survives_and_temp_file_is_removed() {
        let dir = temp_dir("cli-keep");
        let kept = dir.join("kept.c");
        let args = parse(&[
            "kept-c.jpc",
            "-k",
            kept.to_str().expect("utf8 path"),
            "-o",
            dir.join("out").to_str().expect("utf8 path"),
        ])
        .expect("parse");
        build(&args, "int main(void) { return 0; }\n", "true").expect("build with true");
        assert_eq!(
            fs::read_to_string(&kept).expect("kept C file"),
            "int main(void) { return 0; }\n"
        );

        let args = parse(&["dropped-c.jpc", "-o", dir.join("out").to_str().expect("utf8 path")])
            .expect("parse");
        let err = build(&args, "int main(void) { return 0; }\n", "false").expect_err("false fails");
        assert!(format!("{err:#}").contains("command failed"), "{err:#}");
        assert!(!temp_c_path(&args.input).exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_compiler_is_an_error() {
        let err = run_cmd("jpc-no-such-compiler", &[]).expect_err("missing binary");
        assert!(format!("{err:#}").contains("failed to run jpc-no-such-compiler"));
    }
}
