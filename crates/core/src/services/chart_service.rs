use crate::models::chain::Chain;
use crate::models::chart::{ChartConfiguration, ChartSeries, RenderKind};
pub use crate::models::envelope::parse_amount;
use crate::models::envelope::{Payload, ResponseEnvelope, TokenBalance};
use crate::models::intent::ChartKind;

/// Maximum number of bars in a token bar chart.
pub const MAX_BAR_ENTRIES: usize = 10;

/// Builds a chart configuration from fetched data.
///
/// Pure and deterministic. First matching rule wins:
///
/// | requested | payload          | result                          |
/// |-----------|------------------|---------------------------------|
/// | none      | tokens, non-empty| pie                             |
/// | none      | balance          | line                            |
/// | line/area | balance          | one "Current Balance" point     |
/// | bar       | tokens           | top 10 by balance, descending   |
/// | pie       | tokens           | every token with balance > 0    |
/// | scatter   | tokens           | (index, balance) for balance > 0|
/// | otherwise |                  | "no data" placeholder           |
///
/// Unparsable balances count as zero.
pub fn select_chart(envelope: &ResponseEnvelope, kind: Option<ChartKind>) -> ChartConfiguration {
    match (kind, envelope.payload()) {
        (None, Payload::Tokens(tokens)) if !tokens.is_empty() => pie_chart(tokens),
        (None, Payload::Balance(balance)) => {
            balance_chart(RenderKind::Line, envelope.chain(), balance)
        }
        (Some(ChartKind::Line), Payload::Balance(balance)) => {
            balance_chart(RenderKind::Line, envelope.chain(), balance)
        }
        (Some(ChartKind::Area), Payload::Balance(balance)) => {
            balance_chart(RenderKind::Area, envelope.chain(), balance)
        }
        (Some(ChartKind::Bar), Payload::Tokens(tokens)) => bar_chart(tokens),
        (Some(ChartKind::Pie), Payload::Tokens(tokens)) => pie_chart(tokens),
        (Some(ChartKind::Scatter), Payload::Tokens(tokens)) => scatter_chart(tokens),
        _ => ChartConfiguration::placeholder(),
    }
}

fn balance_chart(kind: RenderKind, chain: Chain, balance: &str) -> ChartConfiguration {
    let title = match kind {
        RenderKind::Area => "Cumulative Data",
        _ => "Data Over Time",
    };
    ChartConfiguration {
        kind,
        title: title.to_string(),
        labels: vec!["Current Balance".to_string()],
        series: vec![ChartSeries {
            name: format!("{chain} Balance"),
            values: vec![parse_amount(balance)],
        }],
    }
}

/// `(label, balance)` for every token holding a positive balance, in
/// upstream order.
fn positive_holdings(tokens: &[TokenBalance]) -> Vec<(String, f64)> {
    tokens
        .iter()
        .map(|t| (t.label(), t.balance_value()))
        .filter(|(_, value)| *value > 0.0)
        .collect()
}

fn bar_chart(tokens: &[TokenBalance]) -> ChartConfiguration {
    let mut holdings = positive_holdings(tokens);
    // Stable sort: equal balances keep their upstream order.
    holdings.sort_by(|a, b| b.1.total_cmp(&a.1));
    holdings.truncate(MAX_BAR_ENTRIES);

    let (labels, values) = holdings.into_iter().unzip();
    ChartConfiguration {
        kind: RenderKind::Bar,
        title: "Data Comparison".to_string(),
        labels,
        series: vec![ChartSeries {
            name: "Token Balances".to_string(),
            values,
        }],
    }
}

fn pie_chart(tokens: &[TokenBalance]) -> ChartConfiguration {
    let (labels, values) = positive_holdings(tokens).into_iter().unzip();
    ChartConfiguration {
        kind: RenderKind::Pie,
        title: "Token Distribution".to_string(),
        labels,
        series: vec![ChartSeries {
            name: "Token Balances".to_string(),
            values,
        }],
    }
}

fn scatter_chart(tokens: &[TokenBalance]) -> ChartConfiguration {
    let values: Vec<f64> = positive_holdings(tokens)
        .into_iter()
        .map(|(_, value)| value)
        .collect();
    ChartConfiguration {
        kind: RenderKind::Scatter,
        title: "Data Distribution".to_string(),
        labels: (0..values.len()).map(|x| x.to_string()).collect(),
        series: vec![ChartSeries {
            name: "Data Points".to_string(),
            values,
        }],
    }
}
