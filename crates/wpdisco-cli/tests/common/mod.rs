#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use tempfile::TempDir;

#[allow(dead_code)]
pub const CMD_TIMEOUT: Duration = Duration::from_secs(30);

fn config_dir() -> &'static Path {
    static CONFIG_DIR: OnceLock<TempDir> = OnceLock::new();
    CONFIG_DIR
        .get_or_init(|| tempfile::tempdir().expect("failed to create config dir for tests"))
        .path()
}

/// Create a configured `wpdisco` command suitable for integration tests.
///
/// Points `WPDISCO_CONFIG` at a file that does not exist so the defaults apply
/// regardless of the developer's own configuration.
#[allow(dead_code)]
pub fn wpdisco_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("wpdisco"));
    cmd.timeout(CMD_TIMEOUT);
    cmd.env("WPDISCO_CONFIG", config_dir().join("config.toml"));
    cmd.env_remove("WPDISCO_OUTPUT_FORMAT");
    cmd.env("NO_COLOR", "1");
    cmd
}

/// Write a config file whose Jetpack API points at `api_base`.
#[allow(dead_code)]
pub fn write_config(dir: &Path, jetpack_api_base: &str) -> std::path::PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(
        &path,
        format!(
            "[http]\ntimeout_secs = 10\nuser_agent = \"wpdisco-tests\"\n\n[jetpack]\nenabled = true\napi_base = \"{jetpack_api_base}\"\n"
        ),
    )
    .unwrap();
    path
}
