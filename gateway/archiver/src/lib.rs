// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The archiver activity (§4.F): periodically extracts aged fatigue rows to
//! a compressed CSV file and purges them under a write-then-delete
//! transaction. Grounded directly in `archive.py`'s `archive_and_purge`.
//!
//! Order is load-bearing (§4.F): the archive file must be closed and
//! flushed before the delete transaction opens. A crash between the two
//! leaves duplicate, recoverable data — never silent loss.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use gateway_core::model::FatigueRecord;
use gateway_core::{Error, Result};
use gateway_store::Store;
use log::info;

/// Default archive-age threshold in days (§6 "Configuration").
pub const DEFAULT_ARCHIVE_DAYS: i64 = 365;

/// Runs one archive-and-purge pass with the given cutoff age in days.
/// Returns the number of rows archived (and purged), `0` if nothing was
/// old enough.
pub fn archive_and_purge(
    store: &mut Store,
    archive_dir: &Path,
    archive_days: i64,
    now: DateTime<Utc>,
) -> Result<usize> {
    let cutoff = now - ChronoDuration::days(archive_days);
    let cutoff_str = cutoff.to_rfc3339();

    let rows = store.select_fatigue_records_before(&cutoff_str)?;
    if rows.is_empty() {
        info!("no records older than {archive_days}d, nothing to archive");
        return Ok(0);
    }
    info!("found {} record(s) to archive", rows.len());

    fs::create_dir_all(archive_dir).map_err(|e| Error::StoreTransient {
        op: "archiver/create_archive_dir",
        cause: e.into(),
    })?;

    let filename = format!("fatigue_log_archive_{}.csv.gz", now.format("%Y%m%d_%H%M%S"));
    let filepath: PathBuf = archive_dir.join(&filename);
    write_archive_file(&filepath, &rows)?;
    info!("wrote archive file {}", filepath.display());

    let purged = store.delete_fatigue_records_before(&cutoff_str)?;
    info!("purged {purged} record(s) from the live store");
    Ok(purged)
}

fn write_archive_file(path: &Path, rows: &[FatigueRecord]) -> Result<()> {
    let file = fs::File::create(path).map_err(|e| Error::StoreTransient {
        op: "archiver/create_archive_file",
        cause: e.into(),
    })?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut writer = csv::Writer::from_writer(encoder);

    writer
        .write_record([
            "log_id",
            "timestamp",
            "node_id",
            "bin_1_cycles",
            "bin_2_cycles",
            "bin_3_cycles",
            "sent_to_cloud",
        ])
        .map_err(|e| Error::StoreTransient {
            op: "archiver/write_header",
            cause: e.into(),
        })?;

    for row in rows {
        writer
            .write_record([
                row.log_id.to_string(),
                row.timestamp.clone(),
                row.node_id.to_string(),
                row.bin_1_cycles.to_string(),
                row.bin_2_cycles.to_string(),
                row.bin_3_cycles.to_string(),
                u8::from(row.sent_upstream).to_string(),
            ])
            .map_err(|e| Error::StoreTransient {
                op: "archiver/write_row",
                cause: e.into(),
            })?;
    }

    let encoder = writer.into_inner().map_err(|e| Error::StoreTransient {
        op: "archiver/flush_csv",
        cause: e.into_error().into(),
    })?;
    let mut file = encoder.finish().map_err(|e| Error::StoreTransient {
        op: "archiver/finish_gzip",
        cause: e.into(),
    })?;
    file.flush().map_err(|e| Error::StoreTransient {
        op: "archiver/flush_file",
        cause: e.into(),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn days_ago(now: DateTime<Utc>, days: i64) -> String {
        (now - ChronoDuration::days(days)).to_rfc3339()
    }

    #[test]
    fn archives_and_purges_only_rows_older_than_cutoff() {
        let now = Utc.with_ymd_and_hms(2026, 7, 31, 12, 0, 0).unwrap();
        let mut store = Store::open_in_memory().unwrap();
        store.insert_fatigue_record(1, 1, 2, 3).unwrap();
        store
            .backdate_fatigue_timestamp(1, &days_ago(now, 400))
            .unwrap();
        store.insert_fatigue_record(1, 4, 5, 6).unwrap();
        store
            .backdate_fatigue_timestamp(2, &days_ago(now, 100))
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let purged = archive_and_purge(&mut store, dir.path(), DEFAULT_ARCHIVE_DAYS, now).unwrap();
        assert_eq!(purged, 1);

        let remaining = store
            .select_fatigue_records_before(&now.to_rfc3339())
            .unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].log_id, 2);

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let archive_path = entries[0].as_ref().unwrap().path();
        assert!(archive_path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("fatigue_log_archive_"));

        let file = fs::File::open(&archive_path).unwrap();
        let mut decoder = GzDecoder::new(file);
        let mut contents = String::new();
        decoder.read_to_string(&mut contents).unwrap();
        assert!(contents.contains("log_id"));
        assert!(contents.lines().count() == 2); // header + one archived row
    }

    #[test]
    fn no_aged_rows_means_no_file_and_no_purge() {
        let now = Utc.with_ymd_and_hms(2026, 7, 31, 12, 0, 0).unwrap();
        let mut store = Store::open_in_memory().unwrap();
        store.insert_fatigue_record(1, 1, 2, 3).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let purged = archive_and_purge(&mut store, dir.path(), DEFAULT_ARCHIVE_DAYS, now).unwrap();
        assert_eq!(purged, 0);
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}
