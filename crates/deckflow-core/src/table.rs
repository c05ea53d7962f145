//! Creating a table on the slide canvas and attaching bulk cell data to it.

use crate::error::DeckflowCoreError;
use crate::waiter::{CreationOutcome, PollOptions, await_creation};
use log::{debug, warn};
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Length of generated cell identifiers.
const CELL_ID_LEN: usize = 10;

/// Element categories on a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Text,
    Image,
    Shape,
    Line,
    Chart,
    Table,
}

/// Slide editing surface that creates elements without returning a handle.
pub trait SlideCanvas: Send + Sync {
    /// Request a `rows x cols` table on the current slide.
    ///
    /// The table may appear later; no identifier is returned.
    fn create_table(&self, rows: usize, cols: usize);

    /// Ids of the current slide's elements of `kind`, in creation order.
    fn element_ids(&self, kind: ElementKind) -> Vec<String>;

    /// Merge `props` into the element with `id`.
    fn update_element(&self, id: &str, props: Map<String, Value>) -> Result<(), DeckflowCoreError>;
}

/// Undo history notified after each successful attach.
pub trait HistorySink: Send + Sync {
    fn add_snapshot(&self);
}

/// Theme values applied to generated cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeStyle {
    pub font_name: String,
    pub font_color: String,
}

/// Per-cell text style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCellStyle {
    pub fontname: String,
    pub color: String,
}

/// One table cell as stored on the element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCell {
    pub id: String,
    pub colspan: u32,
    pub rowspan: u32,
    pub text: String,
    pub style: TableCellStyle,
}

/// Result of [`TableCreationFlow::create_table_from_data`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableAttach {
    /// No rows or no columns were supplied; nothing was created.
    Empty,
    /// The data was attached to the element with this id.
    Attached { element_id: String },
    /// The table did not appear within the wait budget; nothing was attached.
    TimedOut,
    /// The count rose but no table was found when attaching.
    Missing,
}

/// Creates a table through the canvas and fills it once it appears.
///
/// The canvas returns no handle for the new table, so the flow assumes the
/// last table in creation order is the one it requested. That only holds
/// while creations are serialized: another creator adding a table during the
/// wait makes the choice ambiguous. Canvases that can return an id from
/// `create_table` would remove this gap.
#[derive(Clone)]
pub struct TableCreationFlow {
    canvas: Arc<dyn SlideCanvas>,
    history: Arc<dyn HistorySink>,
    options: PollOptions,
}

impl TableCreationFlow {
    pub fn new(
        canvas: Arc<dyn SlideCanvas>,
        history: Arc<dyn HistorySink>,
        options: PollOptions,
    ) -> Self {
        Self {
            canvas,
            history,
            options,
        }
    }

    /// Create a table sized to `data` and attach the cells to it.
    ///
    /// The first row decides the column count; short rows are padded with
    /// empty cells and extra values are dropped.
    pub async fn create_table_from_data(
        &self,
        data: &[Vec<String>],
        theme: &ThemeStyle,
    ) -> Result<TableAttach, DeckflowCoreError> {
        let rows = data.len();
        let cols = data.first().map_or(0, Vec::len);
        if rows == 0 || cols == 0 {
            return Ok(TableAttach::Empty);
        }
        let cells = build_cells(data, cols, theme);

        let before_count = self.canvas.element_ids(ElementKind::Table).len();
        self.canvas.create_table(rows, cols);
        debug!("requested table (rows={rows}, cols={cols}, before_count={before_count})");

        let canvas = &self.canvas;
        let outcome = await_creation(
            before_count,
            || canvas.element_ids(ElementKind::Table).len(),
            self.options,
        )
        .await;
        if outcome == CreationOutcome::TimedOut {
            warn!("table did not appear in time; skipping data attach");
            return Ok(TableAttach::TimedOut);
        }

        let Some(element_id) = self.canvas.element_ids(ElementKind::Table).pop() else {
            warn!("table count rose but no table element was found");
            return Ok(TableAttach::Missing);
        };
        let data = serde_json::to_value(&cells)
            .map_err(|err| DeckflowCoreError::Canvas(format!("failed to encode cells: {err}")))?;
        let mut props = Map::new();
        props.insert("data".to_string(), data);
        self.canvas.update_element(&element_id, props)?;
        self.history.add_snapshot();
        debug!("attached table data (element_id={element_id})");
        Ok(TableAttach::Attached { element_id })
    }
}

/// Build the cell grid for `data` with `cols` columns.
pub fn build_cells(data: &[Vec<String>], cols: usize, theme: &ThemeStyle) -> Vec<Vec<TableCell>> {
    let style = TableCellStyle {
        fontname: theme.font_name.clone(),
        color: theme.font_color.clone(),
    };
    data.iter()
        .map(|row| {
            (0..cols)
                .map(|col| TableCell {
                    id: cell_id(),
                    colspan: 1,
                    rowspan: 1,
                    text: row.get(col).cloned().unwrap_or_default(),
                    style: style.clone(),
                })
                .collect()
        })
        .collect()
}

fn cell_id() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(CELL_ID_LEN)
        .map(char::from)
        .collect()
}
