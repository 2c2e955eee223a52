use chrono::{Datelike, Days, NaiveDate, Weekday};
use statarb_core::types::PricePair;
use std::collections::HashSet;
use std::io::Read;

use super::file::resolve_path;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Wide price table: one date column, one column per ticker.
///
/// Rows are sorted by date and every weekday between the first and last date
/// is present, forward-filled from the previous row. Weekend rows in the
/// source are dropped.
#[derive(Debug, Clone)]
pub struct PriceFrame {
    pub source: String,
    pub dates: Vec<NaiveDate>,
    pub tickers: Vec<String>,
    columns: Vec<Vec<Option<f64>>>,
}

impl PriceFrame {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn column(&self, ticker: &str) -> Option<&[Option<f64>]> {
        self.tickers
            .iter()
            .position(|t| t.eq_ignore_ascii_case(ticker))
            .map(|i| self.columns[i].as_slice())
    }

    /// Tickers in file order.
    pub fn list_tickers(&self) -> &[String] {
        &self.tickers
    }
}

/// Load a price CSV from disk.
pub fn load_prices(path: &str) -> Result<PriceFrame, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let file = std::fs::File::open(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    parse_prices(file, &canonical.display().to_string())
}

/// Parse a price CSV with a `date` column (`YYYY-MM-DD`) and numeric ticker columns.
pub fn parse_prices<R: Read>(reader: R, source: &str) -> Result<PriceFrame, Box<dyn std::error::Error>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| format!("Failed to read header of '{}': {}", source, e))?
        .clone();

    let date_idx = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("date"))
        .ok_or_else(|| format!("'{}' has no date column", source))?;
    let ticker_idx: Vec<usize> = (0..headers.len()).filter(|i| *i != date_idx).collect();
    let tickers: Vec<String> = ticker_idx.iter().map(|i| headers[*i].to_string()).collect();
    if tickers.is_empty() {
        return Err(format!("'{}' has no ticker columns", source).into());
    }

    let mut rows: Vec<(NaiveDate, Vec<Option<f64>>)> = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        // header is line 1
        let line = line + 2;
        let record = record.map_err(|e| format!("{}: line {}: {}", source, line, e))?;
        let raw_date = record.get(date_idx).unwrap_or_default();
        let date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT)
            .map_err(|_| format!("{}: line {}: invalid date '{}'", source, line, raw_date))?;

        let mut values = Vec::with_capacity(ticker_idx.len());
        for (col, &i) in ticker_idx.iter().enumerate() {
            let cell = record.get(i).unwrap_or_default();
            if cell.is_empty() {
                values.push(None);
                continue;
            }
            let v: f64 = cell.parse().map_err(|_| {
                format!(
                    "{}: line {}: invalid price '{}' for {}",
                    source, line, cell, tickers[col]
                )
            })?;
            values.push(v.is_finite().then_some(v));
        }
        rows.push((date, values));
    }

    rows.sort_by_key(|(d, _)| *d);
    let mut seen = HashSet::with_capacity(rows.len());
    for (d, _) in &rows {
        if !seen.insert(*d) {
            return Err(format!("{}: duplicate date {}", source, d).into());
        }
    }

    let total = rows.len();
    rows.retain(|(d, _)| !is_weekend(*d));
    let (dates, columns) = fill_business_days(&rows, tickers.len());
    tracing::debug!(
        source,
        rows = total,
        weekend_dropped = total - rows.len(),
        filled = dates.len(),
        "price table loaded"
    );
    Ok(PriceFrame {
        source: source.to_string(),
        dates,
        tickers,
        columns,
    })
}

fn is_weekend(day: NaiveDate) -> bool {
    matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Insert missing weekdays and forward-fill every column. Cells before a
/// ticker's first observation stay empty. `rows` must hold weekdays only.
fn fill_business_days(
    rows: &[(NaiveDate, Vec<Option<f64>>)],
    width: usize,
) -> (Vec<NaiveDate>, Vec<Vec<Option<f64>>>) {
    let mut dates = Vec::new();
    let mut columns = vec![Vec::new(); width];
    let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
        return (dates, columns);
    };

    let mut carry: Vec<Option<f64>> = vec![None; width];
    let mut next = 0;
    let mut day = first.0;
    while day <= last.0 {
        if rows[next].0 == day {
            for (c, value) in rows[next].1.iter().enumerate() {
                carry[c] = value.or(carry[c]);
            }
            next += 1;
        } else if is_weekend(day) {
            match day.checked_add_days(Days::new(1)) {
                Some(d) => day = d,
                None => break,
            }
            continue;
        }
        dates.push(day);
        for (c, col) in columns.iter_mut().enumerate() {
            col.push(carry[c]);
        }
        match day.checked_add_days(Days::new(1)) {
            Some(d) => day = d,
            None => break,
        }
    }
    (dates, columns)
}

/// Aligned pair for `x` (independent) and `y` (dependent): the dates where
/// both prices are present and positive.
pub fn align_pair(frame: &PriceFrame, x: &str, y: &str) -> Result<PricePair, Box<dyn std::error::Error>> {
    let col_x = lookup(frame, x)?;
    let col_y = lookup(frame, y)?;

    let mut dates = Vec::new();
    let mut price_x = Vec::new();
    let mut price_y = Vec::new();
    for (t, (px, py)) in col_x.iter().zip(col_y).enumerate() {
        if let (Some(px), Some(py)) = (px, py) {
            if *px > 0.0 && *py > 0.0 {
                dates.push(frame.dates[t]);
                price_x.push(*px);
                price_y.push(*py);
            }
        }
    }
    if dates.is_empty() {
        return Err(format!("No overlapping price data for {} and {} in {}", x, y, frame.source).into());
    }
    Ok(PricePair::new(dates, price_x, price_y)?)
}

fn lookup<'a>(frame: &'a PriceFrame, ticker: &str) -> Result<&'a [Option<f64>], Box<dyn std::error::Error>> {
    frame.column(ticker).ok_or_else(|| {
        format!(
            "Ticker '{}' not found in {}; available: {}",
            ticker,
            frame.source,
            frame.tickers.join(", ")
        )
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn frame(csv: &str) -> PriceFrame {
        parse_prices(csv.as_bytes(), "test.csv").unwrap()
    }

    #[test]
    fn test_sorts_rows_and_lists_tickers_in_file_order() {
        let f = frame("date,MSFT,AAPL\n2024-01-03,11,21\n2024-01-02,10,20\n");
        assert_eq!(f.list_tickers(), &["MSFT".to_string(), "AAPL".to_string()]);
        assert_eq!(f.dates, vec![d("2024-01-02"), d("2024-01-03")]);
        assert_eq!(f.column("msft").unwrap(), &[Some(10.0), Some(11.0)]);
    }

    #[test]
    fn test_fills_missing_weekdays_only() {
        // Fri 5th, Tue 9th: Mon 8th is inserted, the weekend is not.
        let f = frame("date,A,B\n2024-01-05,1.0,2.0\n2024-01-09,1.5,\n");
        assert_eq!(f.dates, vec![d("2024-01-05"), d("2024-01-08"), d("2024-01-09")]);
        assert_eq!(f.column("A").unwrap(), &[Some(1.0), Some(1.0), Some(1.5)]);
        assert_eq!(f.column("B").unwrap(), &[Some(2.0), Some(2.0), Some(2.0)]);
    }

    #[test]
    fn test_weekend_rows_dropped() {
        // Sat 6th and Sun 7th are in the file but not in the business-day grid.
        let f = frame("date,A\n2024-01-05,1.0\n2024-01-06,9.0\n2024-01-07,9.5\n2024-01-08,1.2\n");
        assert_eq!(f.dates, vec![d("2024-01-05"), d("2024-01-08")]);
        assert_eq!(f.column("A").unwrap(), &[Some(1.0), Some(1.2)]);

        // a weekend value is not carried into Monday
        let f = frame("date,A\n2024-01-05,1.0\n2024-01-06,9.0\n2024-01-09,1.3\n");
        assert_eq!(f.dates, vec![d("2024-01-05"), d("2024-01-08"), d("2024-01-09")]);
        assert_eq!(f.column("A").unwrap(), &[Some(1.0), Some(1.0), Some(1.3)]);
    }

    #[test]
    fn test_leading_gap_not_filled() {
        let f = frame("date,A,B\n2024-01-02,1.0,\n2024-01-03,1.1,5.0\n2024-01-04,1.2,5.1\n");
        assert_eq!(f.column("B").unwrap(), &[None, Some(5.0), Some(5.1)]);
        let pair = align_pair(&f, "A", "B").unwrap();
        assert_eq!(pair.dates, vec![d("2024-01-03"), d("2024-01-04")]);
        assert_eq!(pair.price_x, vec![1.1, 1.2]);
        assert_eq!(pair.price_y, vec![5.0, 5.1]);
    }

    #[test]
    fn test_non_positive_prices_dropped() {
        let f = frame("date,A,B\n2024-01-02,1.0,0\n2024-01-03,1.1,5.0\n");
        let pair = align_pair(&f, "A", "B").unwrap();
        assert_eq!(pair.len(), 1);
    }

    #[test]
    fn test_duplicate_dates_rejected() {
        let err = parse_prices("date,A\n2024-01-02,1\n2024-01-02,2\n".as_bytes(), "dup.csv").unwrap_err();
        assert!(err.to_string().contains("duplicate date 2024-01-02"));
    }

    #[test]
    fn test_bad_cells_name_line_and_ticker() {
        let err = parse_prices("date,A\n2024-01-02,abc\n".as_bytes(), "bad.csv").unwrap_err();
        assert!(err.to_string().contains("line 2"));
        assert!(err.to_string().contains("for A"));
        let err = parse_prices("date,A\n01/02/2024,1\n".as_bytes(), "bad.csv").unwrap_err();
        assert!(err.to_string().contains("invalid date"));
    }

    #[test]
    fn test_unknown_ticker_lists_available() {
        let f = frame("date,A,B\n2024-01-02,1,2\n");
        let err = align_pair(&f, "A", "ZZZ").unwrap_err();
        assert!(err.to_string().contains("Ticker 'ZZZ' not found"));
        assert!(err.to_string().contains("available: A, B"));
    }

    #[test]
    fn test_no_overlap() {
        let f = frame("date,A,B\n2024-01-02,1,\n");
        assert!(align_pair(&f, "A", "B").is_err());
    }

    #[test]
    fn test_load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Date,GLD,GDX").unwrap();
        writeln!(file, "2024-03-01,190.5,28.1").unwrap();
        writeln!(file, "2024-03-04,191.0,28.4").unwrap();
        let f = load_prices(file.path().to_str().unwrap()).unwrap();
        assert_eq!(f.len(), 2);
        let pair = align_pair(&f, "GDX", "GLD").unwrap();
        assert_eq!(pair.price_x, vec![28.1, 28.4]);
        assert_eq!(pair.price_y, vec![190.5, 191.0]);
    }

    #[test]
    fn test_missing_date_column() {
        let err = parse_prices("when,A\n2024-01-02,1\n".as_bytes(), "x.csv").unwrap_err();
        assert!(err.to_string().contains("no date column"));
    }
}
