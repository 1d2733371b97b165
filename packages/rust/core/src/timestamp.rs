//! "Last updated" stamps.

use chrono::{DateTime, Utc};
use tracing::debug;

use whguide_sheet::OutputSink;
use whguide_shared::{CellValue, Result};

/// Source of the current time, swappable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Format as `YYYY-MM-DDTHH:MM:SS:mmmZ`.
///
/// Milliseconds follow a colon, not a dot; the workbook's formulas parse
/// this exact layout.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S:%3fZ").to_string()
}

/// Write the formatted time into every range in `ranges`. Returns the string
/// that was written.
pub async fn record_timestamp<S: OutputSink>(
    sink: &S,
    ranges: &[String],
    at: DateTime<Utc>,
) -> Result<String> {
    let stamp = format_timestamp(at);
    for range in ranges {
        sink.set_value(range, CellValue::Text(stamp.clone())).await?;
    }
    debug!(%stamp, cells = ranges.len(), "recorded timestamp");
    Ok(stamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use whguide_sheet::MemorySheet;
    use whguide_shared::TimestampSettings;

    fn fixed() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 12, 2, 5, 6, 7).unwrap() + chrono::Duration::milliseconds(8)
    }

    #[test]
    fn formats_with_colon_before_millis() {
        assert_eq!(format_timestamp(fixed()), "2022-12-02T05:06:07:008Z");
    }

    #[test]
    fn pads_every_field() {
        let at = Utc.with_ymd_and_hms(987, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(format_timestamp(at), "0987-01-01T00:00:00:000Z");
    }

    #[tokio::test]
    async fn writes_all_configured_cells() {
        let sheet = MemorySheet::new();
        let ranges = TimestampSettings::default().ranges;

        let stamp = record_timestamp(&sheet, &ranges, FixedClock(fixed()).now()).await.unwrap();
        assert_eq!(stamp, "2022-12-02T05:06:07:008Z");

        assert_eq!(sheet.write_log().len(), 8);
        for range in &ranges {
            let grid = sheet.read_range(range).await.unwrap();
            assert_eq!(grid, vec![vec![CellValue::from("2022-12-02T05:06:07:008Z")]]);
        }
    }
}
