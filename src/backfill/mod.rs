/// 央行每日匯率區間彙整
pub mod exchange_rate;
