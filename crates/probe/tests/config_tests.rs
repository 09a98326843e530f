//! Configuration file tests
//!
//! Run with: `cargo test -p probe --test config_tests`

use probe::config::ProbeConfig;
use probe::driver::ByteRange;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_load_full_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("probe.toml");
    fs::write(
        &path,
        r#"
[device]
vendor_id = "0x1b1c"
product_id = "6958"

[transfer]
scan_timeout_ms = 20
repl_timeout_ms = 250
reset_settle_ms = 500

[scan]
base = "07 02"
first_position = 2
first_range = "00-ff"
second_range = "00-03"

[logging]
log_level = "debug"
"#,
    )
    .unwrap();

    let config = ProbeConfig::load(Some(path)).unwrap();

    assert_eq!(config.vendor_id().unwrap(), Some(0x1b1c));
    assert_eq!(config.product_id().unwrap(), Some(6958));
    assert_eq!(config.transfer.scan_timeout(), Duration::from_millis(20));
    assert_eq!(config.transfer.reset_settle(), Duration::from_millis(500));
    assert_eq!(config.logging.log_level, "debug");

    let plan = config.scan_plan().unwrap();
    assert_eq!(plan.second, ByteRange::new(0, 3).unwrap());
    assert_eq!(plan.candidate_count(), 1024);
    assert_eq!(&plan.base.as_bytes()[..2], &[0x07, 0x02]);
}

#[test]
fn test_save_then_load_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("probe.toml");

    ProbeConfig::default().save(&path).unwrap();
    let loaded = ProbeConfig::load(Some(path)).unwrap();

    assert_eq!(loaded, ProbeConfig::default());
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    assert!(ProbeConfig::load(Some(dir.path().join("absent.toml"))).is_err());
}

#[test]
fn test_invalid_values_are_rejected() {
    let dir = TempDir::new().unwrap();
    let cases = [
        "[logging]\nlog_level = \"chatty\"\n",
        "[device]\nvendor_id = \"0\"\n",
        "[scan]\nfirst_position = 70\n",
        "[scan]\nbase = \"0e 0g\"\n",
        "[transfer]\nscan_timeout_ms = 0\n",
    ];

    for (i, content) in cases.iter().enumerate() {
        let path = dir.path().join(format!("bad{}.toml", i));
        fs::write(&path, content).unwrap();
        assert!(
            ProbeConfig::load(Some(path)).is_err(),
            "accepted: {}",
            content
        );
    }
}
