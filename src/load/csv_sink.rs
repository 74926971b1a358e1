use crate::error::Result;
use crate::types::{Dataset, EnrichedBankRecord, COLUMNS};
use std::fs;
use std::path::Path;
use tracing::info;

/// Writes the dataset with a header row, replacing any existing file.
pub fn load_to_csv(records: &[EnrichedBankRecord], path: &Path) -> Result<()> {
    info!("Starting CSV file export to {}", path.display());
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    // The header is written up front so an empty dataset still gets one.
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    info!(
        "Data successfully exported to {} ({} rows)",
        path.display(),
        records.len()
    );
    Ok(())
}

/// Reads back a file written by [`load_to_csv`].
pub fn read_csv(path: &Path) -> Result<Dataset> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, usd: Option<f64>) -> EnrichedBankRecord {
        EnrichedBankRecord {
            name: name.to_string(),
            mc_usd_billion: usd,
            mc_gbp_billion: usd.map(|v| v * 0.8),
            mc_eur_billion: usd.map(|v| v * 0.93),
            mc_inr_billion: usd.map(|v| v * 82.95),
        }
    }

    #[test]
    fn writes_header_and_reads_back_same_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("Largest_banks_data.csv");
        let records = vec![
            record("JPMorgan Chase", Some(432.92)),
            record("Bank, with comma", Some(100.0)),
            record("No value", None),
        ];

        load_to_csv(&records, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text.lines().next().unwrap(),
            "Name,MC_USD_Billion,MC_GBP_Billion,MC_EUR_Billion,MC_INR_Billion"
        );
        assert_eq!(read_csv(&path).unwrap(), records);
    }

    #[test]
    fn empty_dataset_still_gets_a_header_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Largest_banks_data.csv");

        load_to_csv(&[], &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().collect::<Vec<_>>(), vec![COLUMNS.join(",")]);
        assert!(read_csv(&path).unwrap().is_empty());
    }

    #[test]
    fn overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("banks.csv");
        fs::write(&path, "stale contents\nmore\nand more\n").unwrap();

        load_to_csv(&[record("Only", Some(1.0))], &path).unwrap();

        let rows = read_csv(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Only");
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        // the target is a directory, not a file
        assert!(load_to_csv(&[record("A", Some(1.0))], dir.path()).is_err());
    }
}
