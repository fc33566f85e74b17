use gapup_core::domain::row::{format_number, Row};
use gapup_core::domain::DISCLAIMER;
use gapup_core::ingest::placeholder::UNIVERSE;

pub const DASHBOARD_TITLE: &str = "Nasdaq Gap-Up Prediction Dashboard";

pub fn render_dashboard(rows: &[Row], tickers: &[String]) -> String {
    let selection = escape(&tickers.join(","));
    let query = format!("?tickers={}", query_value(&tickers.join(",")));

    let mut table = String::new();
    for row in rows {
        table.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&row.symbol),
            format_number(row.probability),
            format_number(row.rsi),
            format_number(row.macd),
        ));
    }
    if rows.is_empty() {
        table.push_str("<tr><td colspan=\"4\">No tickers selected.</td></tr>");
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; margin: 2rem; }}
.notice {{ background: #fff8e1; border-left: 4px solid #f9a825; padding: .75rem 1rem; }}
table {{ border-collapse: collapse; }}
th, td {{ border: 1px solid #ccc; padding: .35rem .75rem; text-align: right; }}
th:first-child, td:first-child {{ text-align: left; }}
img {{ max-width: 100%; }}
</style>
</head>
<body>
<p class="notice">{notice}</p>
<h1>{title}</h1>
<form method="get" action="/">
<label>Tickers ({universe}): <input name="tickers" value="{selection}"></label>
<button type="submit">Update</button>
</form>
<h2>Heatmap of Gap-Up Probabilities</h2>
<img src="/charts/heatmap.png{query}" alt="Heatmap">
<h2>Candlestick Chart</h2>
<img src="/charts/candlestick.png" alt="Candlestick Chart">
<h2>Prediction Table</h2>
<table>
<thead><tr><th>Symbol</th><th>Gap-Up Probability</th><th>RSI</th><th>MACD</th></tr></thead>
<tbody>{table}</tbody>
</table>
<h2>Download Reports</h2>
<p><a href="/reports/gapup_report.csv{query}">Download CSV</a> · <a href="/reports/gapup_report.pdf{query}">Download PDF</a></p>
</body>
</html>
"#,
        title = DASHBOARD_TITLE,
        notice = escape(DISCLAIMER),
        universe = UNIVERSE.join(", "),
        selection = selection,
        query = escape(&query),
        table = table,
    )
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// Tickers are normalized to A-Z/0-9 in practice; anything else is percent-encoded.
fn query_value(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b',' | b'-' | b'.' | b'_') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_shows_disclaimer_table_and_links() {
        let rows = vec![Row::new("AAPL", 75.0, 65.0, 1.2)];
        let html = render_dashboard(&rows, &["AAPL".to_string()]);
        assert!(html.contains(DISCLAIMER));
        assert!(html.contains("<td>AAPL</td><td>75</td><td>65</td><td>1.2</td>"));
        assert!(html.contains("/reports/gapup_report.pdf?tickers=AAPL"));
        assert!(html.contains("/charts/heatmap.png?tickers=AAPL"));
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("<b>\"x\" & 'y'</b>"), "&lt;b&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/b&gt;");
        assert_eq!(query_value("A B&C"), "A%20B%26C");
    }
}
