use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::crawler::cbr::daily::RateRecord;

/// 俄羅斯聯邦中央銀行
pub mod cbr;

/// 單日匯率抓取失敗的原因
#[derive(Debug, Error)]
pub enum FetchError {
    /// 連線、逾時或非 2xx 回應
    #[error("transport failure: {0}")]
    Transport(String),
    /// XML 格式錯誤或無法辨識的字元編碼
    #[error("decode failure: {0}")]
    Decode(String),
    /// 數值欄位格式錯誤
    #[error("parse failure: {0}")]
    Parse(String),
}

/// 可依日期取得當日全部匯率的來源
#[async_trait]
pub trait DailyRateSource: Send + Sync {
    async fn fetch_day(&self, date: NaiveDate) -> Result<Vec<RateRecord>, FetchError>;
}
