use chrono::NaiveDate;
use hashbrown::HashMap;
use rust_decimal::Decimal;

use crate::crawler::cbr::daily::RateRecord;

/// 匯率與觀測日期
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatedValue {
    pub value: Decimal,
    pub date: NaiveDate,
}

/// 單一幣別在統計區間內的累計數據
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyStat {
    pub code: String,
    pub name: String,
    /// 最近一次觀測到的報價單位
    pub nominal: i32,
    /// 尚未有任何觀測時為 None
    pub max: Option<DatedValue>,
    pub min: Option<DatedValue>,
    pub total_value: Decimal,
    /// 出現的天數
    pub count: u32,
}

impl CurrencyStat {
    fn new(record: &RateRecord) -> Self {
        CurrencyStat {
            code: record.char_code.clone(),
            name: record.name.clone(),
            nominal: record.nominal,
            max: None,
            min: None,
            total_value: Decimal::ZERO,
            count: 0,
        }
    }

    /// 數值相同時保留較早處理的日期
    fn observe(&mut self, value: Decimal, date: NaiveDate) {
        let observed = DatedValue { value, date };

        if self.max.map_or(true, |max| value > max.value) {
            self.max = Some(observed);
        }

        if self.min.map_or(true, |min| value < min.value) {
            self.min = Some(observed);
        }

        self.total_value += value;
        self.count += 1;
    }

    /// 算術平均 total_value / count，尚未有觀測時為 None
    pub fn mean(&self) -> Option<Decimal> {
        self.total_value.checked_div(Decimal::from(self.count))
    }
}

/// 幣別代碼 => 累計數據
#[derive(Debug, Default, Clone)]
pub struct AggregationStore {
    entries: HashMap<String, CurrencyStat>,
}

impl AggregationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one day's records into the running statistics.
    ///
    /// Every record either updates the entry for its code or creates one, so a
    /// code's `count` is the number of days on which it appeared.
    pub fn update(&mut self, date: NaiveDate, records: &[RateRecord]) {
        for record in records {
            let stat = self
                .entries
                .entry(record.char_code.clone())
                .or_insert_with(|| CurrencyStat::new(record));

            stat.nominal = record.nominal;
            stat.observe(record.value, date);
        }
    }

    pub fn get(&self, code: &str) -> Option<&CurrencyStat> {
        self.entries.get(code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &CurrencyStat> {
        self.entries.values()
    }
}
