use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// 單日抓取失敗時的處理方式
#[derive(Serialize, Deserialize, Display, EnumString, PartialEq, Eq, Debug, Copy, Clone, Default)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum OnDayError {
    /// 停止後續日期的抓取，以目前已彙整的資料產出報表
    #[default]
    Abort,
    /// 略過該日，繼續抓取下一個日期
    Continue,
}

impl OnDayError {
    pub fn should_abort(&self) -> bool {
        matches!(self, OnDayError::Abort)
    }
}
