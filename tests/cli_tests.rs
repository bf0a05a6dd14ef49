use std::process::Command;
use tempfile::TempDir;

fn filesync() -> Command {
    Command::new(env!("CARGO_BIN_EXE_filesync"))
}

#[test]
fn test_missing_destination_is_fatal() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = filesync()
        .args(["--ssh-address", "localhost"])
        .current_dir(temp_dir.path())
        .output()
        .expect("Failed to run filesync");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Missing destination folder argument"));
    assert!(stderr.contains("-h"));
}

#[test]
fn test_missing_ssh_address_is_a_usage_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = filesync()
        .arg("/srv/app")
        .current_dir(temp_dir.path())
        .output()
        .expect("Failed to run filesync");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--ssh-address"));
}

#[test]
fn test_bad_config_file_is_fatal() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = filesync()
        .args(["--ssh-address", "localhost", "--config", "missing.toml", "/srv/app"])
        .current_dir(temp_dir.path())
        .output()
        .expect("Failed to run filesync");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("missing.toml"));
}
