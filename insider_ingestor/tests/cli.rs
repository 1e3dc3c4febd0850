#![cfg(feature = "cli")]

use std::path::Path;
use std::process::{Command, Output};
use std::str;

use insider_ingestor::cache::csv_format::from_csv_bytes;
use insider_ingestor::models::scalar::Scalar;
use tempfile::TempDir;

const INSIDERS: &str = "\
Ticker,Date,Name,Shares
AAA,2021-01-04T00:00:00,Doe,100
BBB,2021-01-05,Roe,50
,2021-01-05,Anon,10
";

const PRICES: &str = "\
Ticker,Date,Close,Adjusted Close
AAA,2021-01-04,10.5,10.25
BBB,2021-01-04,20,19.5
";

fn ingestor(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_insider-ingestor"))
        .current_dir(dir)
        .env_remove("QQ_API_KEY")
        .env_remove("AV_API_KEY")
        .arg("--config")
        .arg(dir.join("absent.toml"))
        .args(args)
        .output()
        .expect("failed to start insider-ingestor")
}

#[test]
fn merge_writes_the_enriched_csv() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    std::fs::write(dir.path().join("insiders.csv"), INSIDERS)?;
    std::fs::write(dir.path().join("prices.csv"), PRICES)?;

    let output = ingestor(
        dir.path(),
        &[
            "merge",
            "--insiders",
            "insiders.csv",
            "--prices",
            "prices.csv",
            "--out",
            "out/merged.csv",
        ],
    );
    let stderr = str::from_utf8(&output.stderr)?;
    assert!(output.status.success(), "merge failed: {stderr}");
    assert!(str::from_utf8(&output.stdout)?.contains("merged.csv"));
    assert!(stderr.contains("SUMMARY: 3 rows"));

    let path = dir.path().join("out/merged.csv");
    let merged = from_csv_bytes(&std::fs::read(&path)?, &path)?;
    assert_eq!(
        merged.columns(),
        ["Ticker", "Date", "Name", "Shares", "Close", "Adjusted Close"]
    );
    assert_eq!(merged.len(), 3);
    assert_eq!(merged.value(0, "Close"), Some(&Scalar::Number(10.5)));
    assert_eq!(merged.value(0, "Adjusted Close"), Some(&Scalar::Number(10.25)));
    assert_eq!(merged.value(1, "Close"), Some(&Scalar::Missing));
    assert_eq!(merged.value(2, "Name"), Some(&Scalar::Text("Anon".into())));
    assert_eq!(merged.value(2, "Close"), Some(&Scalar::Missing));
    Ok(())
}

#[test]
fn merge_rejects_duplicate_price_rows() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    std::fs::write(dir.path().join("insiders.csv"), INSIDERS)?;
    std::fs::write(
        dir.path().join("prices.csv"),
        format!("{PRICES}AAA,2021-01-04,11,10.75\n"),
    )?;

    let output = ingestor(
        dir.path(),
        &["merge", "--insiders", "insiders.csv", "--prices", "prices.csv"],
    );
    assert!(!output.status.success());
    assert!(str::from_utf8(&output.stderr)?.contains("more than one row"));
    assert!(!dir.path().join("data").exists());
    Ok(())
}

#[test]
fn prices_requires_symbols() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let output = ingestor(dir.path(), &["prices"]);
    assert!(!output.status.success());
    assert!(str::from_utf8(&output.stderr)?.contains("--symbols"));
    Ok(())
}

#[test]
fn insiders_without_credentials_fails_before_fetching() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let output = ingestor(dir.path(), &["insiders"]);
    assert!(!output.status.success());
    assert!(str::from_utf8(&output.stderr)?.contains("Missing credential for provider 'qq'"));
    assert!(!dir.path().join("data").exists());
    Ok(())
}
