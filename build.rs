//! Build script for chload.
//!
//! Stamps the git hash into the version string and renders shell
//! completions and a man page from the CLI definition.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate_to, Shell};

// GIT_HASH is only known to the crate being built, not to this script.
const VERSION: &str = env!("CARGO_PKG_VERSION");

include!("src/cli/definition.rs");

fn git_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    let dirty = Command::new("git")
        .args(["diff", "--quiet", "HEAD"])
        .status()
        .map(|s| !s.success())
        .unwrap_or(false);
    Some(format!("{}{}", hash.trim(), if dirty { "-dirty" } else { "" }))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!(
        "cargo:rustc-env=GIT_HASH={}",
        git_hash().unwrap_or_else(|| "unknown".to_string())
    );
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=src/cli/definition.rs");

    let out_dir = match env::var_os("OUT_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => return Ok(()),
    };

    let completions_dir = out_dir.join("completions");
    fs::create_dir_all(&completions_dir)?;
    let mut cmd = Cli::command();
    for shell in Shell::value_variants() {
        generate_to(*shell, &mut cmd, "chload", &completions_dir)?;
    }

    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir)?;
    let mut buffer: Vec<u8> = Vec::new();
    clap_mangen::Man::new(Cli::command()).render(&mut buffer)?;
    fs::write(man_dir.join("chload.1"), buffer)?;

    Ok(())
}
