use anyhow::Result;
use chrono::TimeZone;
use std::env;
use std::fs;
use std::process::Command;
use vergen_gitcl::{Emitter, GitclBuilder};

fn main() -> Result<()> {
    // Generate git information
    let gitcl = GitclBuilder::default()
        .describe(true, true, Some("[0-9]*"))
        .build()?;

    let gitcl_res = Emitter::default()
        .idempotent()
        .fail_on_error()
        .add_instructions(&gitcl)
        .and_then(|emitter| emitter.emit());

    if let Err(e) = gitcl_res {
        eprintln!("error occurred while generating instructions: {e:?}");
        Emitter::default().idempotent().fail_on_error().emit()?;
    }

    // Add build timestamp
    let now = match env::var("SOURCE_DATE_EPOCH") {
        Ok(val) => chrono::Utc
            .timestamp_opt(val.parse::<i64>()?, 0)
            .single()
            .ok_or_else(|| anyhow::anyhow!("SOURCE_DATE_EPOCH out of range: {val}"))?,
        Err(_) => chrono::Utc::now(),
    };

    println!(
        "cargo:rustc-env=BUILD_TIMESTAMP={}",
        now.format("%Y-%m-%d %H:%M:%S UTC")
    );

    // Get aac library version using cargo metadata
    let aac_version = get_aac_version_from_metadata().unwrap_or_else(|_| {
        read_aac_version_fallback().unwrap_or_else(|_| "unknown".to_string())
    });
    println!("cargo:rustc-env=AAC_VERSION={aac_version}");

    // Tell cargo to rerun this build script if the aac Cargo.toml changes
    println!("cargo:rerun-if-changed=aac/Cargo.toml");

    Ok(())
}

/// Reads the `aac` member's version from `cargo metadata`.
fn get_aac_version_from_metadata() -> Result<String> {
    let output = Command::new(env::var("CARGO").unwrap_or_else(|_| "cargo".to_string()))
        .args(["metadata", "--format-version", "1", "--no-deps"])
        .output()?;

    if !output.status.success() {
        anyhow::bail!("cargo metadata failed");
    }

    let metadata: serde_json::Value = serde_json::from_slice(&output.stdout)?;

    metadata["packages"]
        .as_array()
        .into_iter()
        .flatten()
        .find(|package| package["name"] == "aac")
        .and_then(|package| package["version"].as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("aac package not found in metadata"))
}

/// Fallback: the first `version` key of aac/Cargo.toml
fn read_aac_version_fallback() -> Result<String> {
    let toml_content = fs::read_to_string("aac/Cargo.toml")?;

    toml_content
        .lines()
        .filter_map(|line| line.trim().strip_prefix("version"))
        .filter_map(|rest| rest.trim().strip_prefix('='))
        .map(|value| value.trim().trim_matches('"').to_string())
        .next()
        .ok_or_else(|| anyhow::anyhow!("Could not find version in aac/Cargo.toml"))
}
