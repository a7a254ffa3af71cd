//! Integration tests for the wallcache binary
//!
//! Exercises argument handling and the commands that need no network.

use std::process::Command;

use tempfile::TempDir;

/// Helper to run the CLI with given args and capture output
fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_wallcache"))
        .args(args)
        .output()
        .expect("Failed to execute wallcache")
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = run_cli(&["--help"]);
    assert!(
        output.status.success(),
        "Expected --help to exit successfully"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("wallcache"), "Help should mention wallcache");
    assert!(stdout.contains("fetch"), "Help should list the fetch command");
    assert!(stdout.contains("clear"), "Help should list the clear command");
}

#[test]
fn test_missing_subcommand_fails() {
    let output = run_cli(&[]);
    assert!(!output.status.success());
}

#[test]
fn test_usage_of_fresh_cache_dir_is_zero() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("cache");

    let output = run_cli(&["usage", "--cache-dir", dir.to_str().unwrap()]);

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "0");
}

#[test]
fn test_clear_recreates_cache_dir() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("cache");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("leftover"), b"12345").unwrap();

    let output = run_cli(&["clear", "--cache-dir", dir.to_str().unwrap()]);

    assert!(output.status.success());
    assert!(dir.exists(), "Cache directory should be recreated");
    assert!(!dir.join("leftover").exists(), "Old entries should be gone");
}

#[test]
fn test_invalid_url_prints_error_and_fails() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("cache");

    let output = run_cli(&["fetch", "not-a-url", "--cache-dir", dir.to_str().unwrap()]);

    assert!(!output.status.success(), "Expected invalid URL to fail");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Invalid image URL"),
        "Should report the invalid URL: {}",
        stdout
    );
}

#[test]
fn test_zero_memory_limit_prints_error_and_exits() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("cache");

    let output = run_cli(&[
        "usage",
        "--memory-limit-mb",
        "0",
        "--cache-dir",
        dir.to_str().unwrap(),
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Invalid memory limit"),
        "Should print error message about the memory limit: {}",
        stderr
    );
}

#[test]
fn test_missing_catalog_prints_error() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("cache");

    let output = run_cli(&[
        "catalog",
        "/nonexistent/catalog.json",
        "--cache-dir",
        dir.to_str().unwrap(),
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to read catalog"), "stderr: {}", stderr);
}

#[cfg(test)]
mod unit_tests {
    //! Unit tests for CLI parsing that don't require running the binary

    use clap::Parser;
    use std::path::PathBuf;
    use wallcache::cli::{Cli, Command};

    #[test]
    fn test_cli_fetch_collects_urls() {
        let cli = Cli::parse_from(["wallcache", "fetch", "https://a.example/1.jpg"]);
        assert_eq!(
            cli.command,
            Command::Fetch {
                urls: vec!["https://a.example/1.jpg".to_string()]
            }
        );
    }

    #[test]
    fn test_cli_cache_dir_before_subcommand() {
        let cli = Cli::parse_from(["wallcache", "--cache-dir", "/tmp/w", "usage"]);
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/w")));
        assert_eq!(cli.command, Command::Usage);
    }

    #[test]
    fn test_cli_memory_limit_non_numeric_is_rejected() {
        let result = Cli::try_parse_from(["wallcache", "--memory-limit-mb", "lots", "usage"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cache_config_carries_flags() {
        let cli = Cli::parse_from(["wallcache", "--memory-limit-mb", "16", "clear"]);
        let config = cli.cache_config().unwrap();
        assert_eq!(config.memory_capacity, 16 * 1024 * 1024);
        assert!(config.cache_dir.is_none());
    }
}
