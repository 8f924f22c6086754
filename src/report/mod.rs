use std::io::{self, Write};

use rust_decimal::{Decimal, RoundingStrategy};

use crate::{
    calculation::currency_stats::{AggregationStore, CurrencyStat, DatedValue},
    util::datetime,
};

/// Renders one report line for a currency.
///
/// Returns `None` for an entry that has never been observed, which cannot
/// happen for entries created by [`AggregationStore::update`].
pub fn render_line(stat: &CurrencyStat) -> Option<String> {
    let max = stat.max?;
    let min = stat.min?;
    let mean = stat.mean()?;

    let unit = match stat.nominal {
        1 => String::new(),
        n => format!(", per {}", n),
    };

    Some(format!(
        "Currency: {} ({}{}), max: {}, min: {}, mean: {}, days: {}",
        stat.name,
        stat.code,
        unit,
        dated(&max),
        dated(&min),
        two_places(mean),
        stat.count
    ))
}

/// 依幣別代碼排序，讓每次輸出的順序一致
pub fn render(store: &AggregationStore) -> Vec<String> {
    let mut stats: Vec<&CurrencyStat> = store.values().collect();
    stats.sort_by(|a, b| a.code.cmp(&b.code));
    stats.into_iter().filter_map(render_line).collect()
}

/// 將報表逐行寫到指定的輸出
pub fn write_to<W: Write>(store: &AggregationStore, out: &mut W) -> io::Result<()> {
    for line in render(store) {
        writeln!(out, "{}", line)?;
    }

    out.flush()
}

fn dated(v: &DatedValue) -> String {
    format!(
        "{} ({})",
        two_places(v.value),
        datetime::format_request_date(v.date)
    )
}

fn two_places(d: Decimal) -> String {
    format!(
        "{:.2}",
        d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use crate::crawler::cbr::daily::RateRecord;

    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn test_render_two_days() {
        let mut store = AggregationStore::new();
        store.update(day(15), &[RateRecord::new("USD", "US Dollar", dec!(90.00))]);
        store.update(day(16), &[RateRecord::new("USD", "US Dollar", dec!(95.00))]);

        assert_eq!(
            render(&store),
            vec![
                "Currency: US Dollar (USD), max: 95.00 (16/10/2026), min: 90.00 (15/10/2026), mean: 92.50, days: 2"
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_render_nominal_and_rounding() {
        let mut yen = RateRecord::new("JPY", "Japanese Yen", dec!(60.1250));
        yen.nominal = 100;
        let mut store = AggregationStore::new();
        store.update(day(16), &[yen]);

        assert_eq!(
            render(&store),
            vec![
                "Currency: Japanese Yen (JPY, per 100), max: 60.13 (16/10/2026), min: 60.13 (16/10/2026), mean: 60.13, days: 1"
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_write_to_sorted_by_code() {
        let mut store = AggregationStore::new();
        store.update(
            day(16),
            &[
                RateRecord::new("USD", "US Dollar", dec!(90)),
                RateRecord::new("AUD", "Australian Dollar", dec!(58)),
                RateRecord::new("EUR", "Euro", dec!(99)),
            ],
        );

        let mut out = Vec::new();
        write_to(&store, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let codes: Vec<&str> = text
            .lines()
            .map(|l| l.split(['(', ')']).nth(1).unwrap())
            .collect();

        assert_eq!(codes, vec!["AUD", "EUR", "USD"]);
    }

    #[test]
    fn test_empty_store_renders_nothing() {
        let mut out = Vec::new();
        write_to(&AggregationStore::new(), &mut out).unwrap();
        assert!(out.is_empty());
    }
}
