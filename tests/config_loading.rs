//! Integration tests for loading config files and running with them

use asa_walkthrough::config::{load_config_from, load_config_or_default, ConfigError};
use asa_walkthrough::localnet::LocalNet;
use asa_walkthrough::walkthrough::Walkthrough;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_missing_file_is_read_error() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let result = load_config_from(temp_dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::Read { .. })));
    Ok(())
}

#[test]
fn test_absent_default_file_falls_back_to_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let config = load_config_or_default(temp_dir.path().join("config.toml"))?;
    assert_eq!(config.scenario.asset_total, 100);
    Ok(())
}

#[test]
fn test_unreadable_default_file_is_read_error() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("config.toml");
    let mut bytes = b"[scenario]\nasset_total = 500\n".to_vec();
    bytes.extend_from_slice(&[0xff, 0xfe]);
    fs::write(&path, bytes)?;

    assert!(matches!(load_config_or_default(&path), Err(ConfigError::Read { .. })));
    Ok(())
}

#[test]
fn test_malformed_file_is_parse_error() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, "[scenario\nasset_total = ")?;

    assert!(matches!(load_config_from(&path), Err(ConfigError::Parse(_))));
    Ok(())
}

#[test]
fn test_invalid_values_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, "[scenario]\nasset_total = 5\ntransfer_amount = 6\n")?;

    assert!(matches!(load_config_from(&path), Err(ConfigError::Invalid(_))));
    Ok(())
}

#[tokio::test]
async fn test_walkthrough_with_custom_scenario() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[ledger]
min_fee = 2000
asset_reserve = 50000

[scenario]
asset_total = 1000
asset_decimals = 2
unit_name = "WLK"
asset_name = "Walkthrough Token"
transfer_amount = 25
"#,
    )?;

    let config = load_config_from(&path)?;
    let net = LocalNet::new(&config);
    let report = Walkthrough::new(&net, &net, &config).run().await?;

    assert_eq!(report.alice_holding_after_transfer, 975);
    assert_eq!(report.bob_holding_after_transfer, 25);
    assert_eq!(report.alice_holding_after_buy_back, 1000);
    assert_eq!(report.bob_min_balance_before_close - report.bob_min_balance_after_close, 50_000);

    Ok(())
}
