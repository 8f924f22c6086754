//! # 俄羅斯央行匯率採集模組
//!
//! 每日官方匯率以 XML 發布，文件宣告的編碼可能是 windows-1251。
//!
//! - 來源域名：`www.cbr.ru`
//! - 抓取技術：HTTP GET `XML_daily_eng.asp?date_req=DD/MM/YYYY`

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    config::SETTINGS,
    crawler::{cbr::daily::RateRecord, DailyRateSource, FetchError},
};

/// 每日匯率
pub mod daily;

/// 俄羅斯央行採集器
pub struct Cbr {
    base_url: String,
    user_agent: String,
}

impl Cbr {
    pub fn new(base_url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Cbr {
            base_url: base_url.into(),
            user_agent: user_agent.into(),
        }
    }

    pub fn from_settings() -> Self {
        Self::new(
            SETTINGS.source.base_url.as_str(),
            SETTINGS.source.user_agent.as_str(),
        )
    }
}

#[async_trait]
impl DailyRateSource for Cbr {
    async fn fetch_day(&self, date: NaiveDate) -> Result<Vec<RateRecord>, FetchError> {
        daily::visit(&self.base_url, &self.user_agent, date).await
    }
}
