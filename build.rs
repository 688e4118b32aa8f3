// SPDX-License-Identifier: MPL-2.0

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");
    println!("cargo::rerun-if-env-changed=EDGE_CAMERA_VERSION");

    // Packaged builds have no .git directory and pass the version in
    let version = std::env::var("EDGE_CAMERA_VERSION")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(describe_head)
        .unwrap_or_else(env_version);

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// `git describe` output without the leading `v`, e.g. `0.1.0-3-gabc1234-dirty`
fn describe_head() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty", "--match", "v*"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let described = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if described.is_empty() {
        return None;
    }

    // A bare commit hash (no tags yet) gets the crate version in front of it
    if !described.starts_with('v') {
        return Some(format!("{}-{}", env_version(), described));
    }

    Some(described.trim_start_matches('v').to_string())
}

fn env_version() -> String {
    std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string())
}
