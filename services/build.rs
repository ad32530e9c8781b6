use std::process::Command;

const UNKNOWN: &str = "unknown";

/// Runs `git` with `args` and returns its trimmed stdout, if any.
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_owned())
}

fn main() {
    let build_info = [
        ("BUILD_DATE", Some(chrono::Utc::now().to_rfc3339())),
        ("BUILD_COMMIT", git(&["rev-parse", "--short", "HEAD"])),
        ("BUILD_BRANCH", git(&["rev-parse", "--abbrev-ref", "HEAD"])),
    ];

    for (key, value) in build_info {
        let value = value.unwrap_or_else(|| UNKNOWN.to_owned());
        println!("cargo:rustc-env={key}={value}");
    }

    // A new commit or branch switch changes the banner and the health header
    println!("cargo:rerun-if-changed=../.git/HEAD");
    println!("cargo:rerun-if-changed=../.git/refs/heads");
    println!("cargo:rerun-if-changed=build.rs");
}
