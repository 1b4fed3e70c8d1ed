use serde::{Deserialize, Serialize};

use super::intent::ChartKind;

/// How the renderer should draw a configuration.
///
/// Mirrors [`ChartKind`] plus `Doughnut`, which is only used for the
/// "no data" placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderKind {
    Line,
    Bar,
    Pie,
    Area,
    Scatter,
    Doughnut,
}

impl From<ChartKind> for RenderKind {
    fn from(kind: ChartKind) -> Self {
        match kind {
            ChartKind::Line => RenderKind::Line,
            ChartKind::Bar => RenderKind::Bar,
            ChartKind::Pie => RenderKind::Pie,
            ChartKind::Area => RenderKind::Area,
            ChartKind::Scatter => RenderKind::Scatter,
        }
    }
}

/// A named numeric series, aligned by index with the chart labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub name: String,
    pub values: Vec<f64>,
}

/// Renderer-agnostic chart description.
///
/// The core computes every number; the frontend only maps this onto its
/// charting library. For scatter charts the labels are the x positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfiguration {
    pub kind: RenderKind,
    pub title: String,
    pub labels: Vec<String>,
    pub series: Vec<ChartSeries>,
}

impl ChartConfiguration {
    /// The explicit "nothing to plot" configuration.
    pub fn placeholder() -> Self {
        Self {
            kind: RenderKind::Doughnut,
            title: "No Data Available".to_string(),
            labels: vec!["No Data".to_string()],
            series: vec![ChartSeries {
                name: "No Data".to_string(),
                values: vec![1.0],
            }],
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.kind == RenderKind::Doughnut
    }
}
