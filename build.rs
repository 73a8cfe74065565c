use std::process::Command;

/// Short commit hash from git, or `GIT_SHA` when building outside a checkout
fn git_sha() -> Option<String> {
    let from_git = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string());

    from_git
        .or_else(|| std::env::var("GIT_SHA").ok())
        .filter(|s| !s.is_empty())
}

fn main() {
    let base = env!("CARGO_PKG_VERSION");

    // Bench builds get a +sha suffix so field logs can be traced to a commit
    let bench = std::env::var("CELLGAUGE_BENCH_BUILD")
        .is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));

    let version = match git_sha() {
        Some(sha) if bench => format!("{}-bench+{}", base, sha),
        _ if bench => format!("{}-bench", base),
        _ => base.to_string(),
    };

    println!("cargo:rustc-env=APP_VERSION={}", version);
    println!("cargo:rerun-if-env-changed=CELLGAUGE_BENCH_BUILD");
    println!("cargo:rerun-if-env-changed=GIT_SHA");
    println!("cargo:rerun-if-changed=.git/HEAD");
}
