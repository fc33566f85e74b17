use crate::domain::row::{format_number, Row};
use crate::report::error::ReportError;

pub const CSV_FILENAME: &str = "gapup_report.csv";
pub const CSV_MIME: &str = "text/csv";
pub const CSV_HEADER: [&str; 4] = ["Symbol", "Gap-Up Probability", "RSI", "MACD"];

pub fn to_csv(rows: &[Row]) -> Result<Vec<u8>, ReportError> {
    let mut writer = ::csv::WriterBuilder::new()
        .terminator(::csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record(CSV_HEADER)
        .map_err(|e| ReportError::encode("csv", e))?;
    for row in rows {
        writer
            .write_record([
                row.symbol.clone(),
                format_number(row.probability),
                format_number(row.rsi),
                format_number(row.macd),
            ])
            .map_err(|e| ReportError::encode("csv", e))?;
    }

    writer
        .into_inner()
        .map_err(|e| ReportError::encode("csv", e.error()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Row> {
        vec![
            Row::new("AAPL", 75.0, 65.0, 1.2),
            Row::new("MSFT", 62.0, 48.0, -0.5),
            Row::new("GOOG", 85.0, 72.0, 2.1),
        ]
    }

    #[test]
    fn writes_header_and_rows_in_order() {
        let out = String::from_utf8(to_csv(&sample()).unwrap()).unwrap();
        assert_eq!(
            out,
            "Symbol,Gap-Up Probability,RSI,MACD\n\
             AAPL,75,65,1.2\n\
             MSFT,62,48,-0.5\n\
             GOOG,85,72,2.1\n"
        );
    }

    #[test]
    fn line_count_is_rows_plus_header() {
        let rows = sample();
        let out = String::from_utf8(to_csv(&rows).unwrap()).unwrap();
        assert_eq!(out.lines().count(), rows.len() + 1);
    }

    #[test]
    fn empty_rows_yield_header_only() {
        let out = String::from_utf8(to_csv(&[]).unwrap()).unwrap();
        assert_eq!(out, "Symbol,Gap-Up Probability,RSI,MACD\n");
    }

    #[test]
    fn parsing_output_reproduces_values() {
        let rows = vec![
            Row::new("AAPL", 75.0, 65.0, 1.2),
            Row::new("BRK,B", 33.333333333333336, 0.1, -1e-7),
        ];
        let bytes = to_csv(&rows).unwrap();

        let mut reader = ::csv::Reader::from_reader(bytes.as_slice());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), CSV_HEADER.to_vec());

        let parsed: Vec<Row> = reader
            .records()
            .map(|r| {
                let r = r.unwrap();
                Row::new(
                    &r[0],
                    r[1].parse().unwrap(),
                    r[2].parse().unwrap(),
                    r[3].parse().unwrap(),
                )
            })
            .collect();
        assert_eq!(parsed, rows);
    }
}
