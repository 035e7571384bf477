use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-env-changed=JPC_GIT_COMMIT");

    if let Ok(v) = env::var("JPC_GIT_COMMIT") {
        let v = v.trim();
        if !v.is_empty() {
            println!("cargo:rustc-env=JPC_GIT_COMMIT={v}");
            return;
        }
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    // Always set, so the CLI can embed it with env!.
    let commit_tag = match git_commit() {
        Some(mut commit) => {
            if git_dirty().unwrap_or(false) {
                commit.push_str("-dirty");
            }
            commit
        }
        None => "unknown".to_string(),
    };
    println!("cargo:rustc-env=JPC_GIT_COMMIT={commit_tag}");
}

fn git_commit() -> Option<String> {
    let out = Command::new("git")
        .args(["rev-parse", "--short=12", "HEAD"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let s = String::from_utf8_lossy(&out.stdout).trim().to_string();
    if s.is_empty() { None } else { Some(s) }
}

fn git_dirty() -> Option<bool> {
    let status = Command::new("git")
        .args(["status", "--porcelain", "--untracked-files=no"])
        .output()
        .ok()?;
    if !status.status.success() {
        return None;
    }
    Some(!status.stdout.is_empty())
}
