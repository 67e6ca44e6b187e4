use serde::Serialize;

use super::download::Field;

/// Change notification emitted by the download registry.
///
/// Row indices refer to the ordered view as it stands immediately after the
/// change the event describes has been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DownloadEvent {
    /// Rows `first..=last` were inserted.
    #[serde(rename = "rows_inserted")]
    Inserted { first: usize, last: usize },
    /// The listed fields of the record at `row` changed.
    DataChanged { row: usize, fields: Vec<Field> },
    /// Rows `first..=last` (indices before removal) were removed.
    #[serde(rename = "rows_removed")]
    Removed { first: usize, last: usize },
    /// Every cached row must be discarded.
    #[serde(rename = "model_reset")]
    Reset,
}
