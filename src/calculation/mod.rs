/// 統計各幣別匯率的最高、最低與平均
pub mod currency_stats;
