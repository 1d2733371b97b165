//! Dogma sheets: one `[itemId, name]` + `[attributeId, value]` block per item,
//! laid out side by side two columns apart.

use tracing::{info, instrument, warn};

use whguide_esi::EsiClient;
use whguide_sheet::OutputSink;
use whguide_shared::{DogmaSheetConfig, GuideError, Result};

use crate::pipeline::ProgressReporter;

/// Outcome of refreshing one dogma sheet.
#[derive(Debug)]
pub struct DogmaSheetReport {
    pub range: String,
    /// Items whose block was written.
    pub written: usize,
    /// Items skipped, with the reason. Their columns are left empty.
    pub failed: Vec<(i64, GuideError)>,
}

/// Column where the block for the `index`-th item starts.
pub fn block_column(index: usize) -> usize {
    2 * index
}

/// Clear the sheet's range, then fetch every item and write its block at
/// column `2 × index`.
///
/// A fetch or parse failure for one item is logged and skipped. Sink errors
/// are returned.
#[instrument(skip_all, fields(range = %sheet.range, items = sheet.ids.len()))]
pub async fn update_dogma_sheet<S: OutputSink>(
    esi: &EsiClient,
    sink: &S,
    sheet: &DogmaSheetConfig,
    progress: &dyn ProgressReporter,
) -> Result<DogmaSheetReport> {
    let total = sheet.ids.len();
    let mut report = DogmaSheetReport {
        range: sheet.range.clone(),
        written: 0,
        failed: Vec::new(),
    };

    sink.clear_range(&sheet.range).await?;

    for (index, &type_id) in sheet.ids.iter().enumerate() {
        match esi.lookup_dogma(Some(type_id)).await {
            Ok(block) => {
                sink.write_block(&sheet.range, 0, block_column(index), &block)
                    .await?;
                report.written += 1;
            }
            Err(error) => {
                warn!(type_id, %error, "dogma lookup failed");
                report.failed.push((type_id, error));
            }
        }
        progress.item_done(&sheet.range, index + 1, total);
    }

    info!(
        written = report.written,
        failed = report.failed.len(),
        "dogma sheet updated"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SilentProgress;
    use serde_json::json;
    use whguide_sheet::MemorySheet;
    use whguide_shared::{CellValue, EsiSettings};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_type(server: &MockServer, id: i64, name: &str, attrs: &[(u32, f64)]) {
        let attributes: Vec<_> = attrs
            .iter()
            .map(|(a, v)| json!({"attributeid": a, "value": v}))
            .collect();
        Mock::given(method("GET"))
            .and(path(format!("/universe/types/{id}/")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"name": name, "dogmaattributes": attributes})),
            )
            .mount(server)
            .await;
    }

    fn client(server: &MockServer) -> EsiClient {
        EsiClient::new(&EsiSettings {
            base_url: server.uri(),
            ..EsiSettings::default()
        })
        .unwrap()
    }

    #[test]
    fn blocks_are_two_columns_apart() {
        assert_eq!(block_column(0), 0);
        assert_eq!(block_column(1), 2);
        assert_eq!(block_column(34), 68);
    }

    #[tokio::test]
    async fn three_attributes_give_four_rows_at_offset() {
        let server = MockServer::start().await;
        mount_type(&server, 30426, "Gamma Missile", &[(114, 40.0)]).await;
        mount_type(&server, 30428, "Kinetic Missile", &[(117, 40.0), (37, 3000.0), (20, 0.5)]).await;

        let sheet = MemorySheet::new();
        let config = DogmaSheetConfig {
            range: "rawMissileData".into(),
            ids: vec![30426, 30428],
        };
        let report = update_dogma_sheet(&client(&server), &sheet, &config, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(report.written, 2);

        let grid = sheet.read_range("rawMissileData").await.unwrap();
        assert_eq!(grid.len(), 4);
        assert_eq!(grid[0][2], CellValue::Int(30428));
        assert_eq!(grid[0][3], CellValue::from("Kinetic Missile"));
        assert_eq!(grid[1][2..4], [CellValue::Int(117), CellValue::Float(40.0)]);
        assert_eq!(grid[3][2..4], [CellValue::Int(20), CellValue::Float(0.5)]);
        // The first item's shorter block leaves the rest of its columns blank.
        assert_eq!(grid[2][0], CellValue::Empty);
    }

    #[tokio::test]
    async fn failing_item_is_skipped() {
        let server = MockServer::start().await;
        mount_type(&server, 30188, "Sleepless Guardian", &[(9, 12000.0)]).await;
        mount_type(&server, 30190, "Sleepless Keeper", &[(9, 8000.0)]).await;
        Mock::given(method("GET"))
            .and(path("/universe/types/30189/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let sheet = MemorySheet::new();
        let config = DogmaSheetConfig {
            range: "rawSleeperData".into(),
            ids: vec![30188, 30189, 30190],
        };
        let report = update_dogma_sheet(&client(&server), &sheet, &config, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(report.written, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, 30189);

        let grid = sheet.read_range("rawSleeperData").await.unwrap();
        assert_eq!(grid[0][0], CellValue::Int(30188));
        assert_eq!(grid[0][2], CellValue::Empty);
        assert_eq!(grid[0][3], CellValue::Empty);
        assert_eq!(grid[0][4], CellValue::Int(30190));
    }

    #[tokio::test]
    async fn invalid_id_is_skipped_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let sheet = MemorySheet::new();
        let config = DogmaSheetConfig {
            range: "rawSleeperData".into(),
            ids: vec![0],
        };
        let report = update_dogma_sheet(&client(&server), &sheet, &config, &SilentProgress)
            .await
            .unwrap();
        assert!(matches!(report.failed[0].1, GuideError::InvalidArgument { .. }));
        assert!(sheet.read_range("rawSleeperData").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn shorter_rerun_leaves_no_stale_cells() {
        let before = MockServer::start().await;
        mount_type(&before, 30426, "Gamma Missile", &[(1, 1.0), (2, 2.0), (3, 3.0)]).await;
        mount_type(&before, 30428, "Kinetic Missile", &[(1, 1.0), (2, 2.0), (3, 3.0)]).await;

        let sheet = MemorySheet::new();
        let config = DogmaSheetConfig {
            range: "rawMissileData".into(),
            ids: vec![30426, 30428],
        };
        update_dogma_sheet(&client(&before), &sheet, &config, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(sheet.read_range("rawMissileData").await.unwrap().len(), 4);

        let after = MockServer::start().await;
        mount_type(&after, 30426, "Gamma Missile", &[(1, 1.5)]).await;
        let config = DogmaSheetConfig {
            range: "rawMissileData".into(),
            ids: vec![30426],
        };
        update_dogma_sheet(&client(&after), &sheet, &config, &SilentProgress)
            .await
            .unwrap();

        let grid = sheet.read_range("rawMissileData").await.unwrap();
        assert_eq!(
            grid,
            vec![
                vec![CellValue::Int(30426), CellValue::from("Gamma Missile")],
                vec![CellValue::Int(1), CellValue::Float(1.5)],
            ]
        );
    }
}
