use std::{env, path::Path, path::PathBuf, str::FromStr, time::Duration};

use config::{Config as config_config, File as config_file};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::{declare::OnDayError, logging};

const CONFIG_PATH: &str = "app.json";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct App {
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub run: Run,
}

const CBR_BASE_URL: &str = "CBR_BASE_URL";
const CBR_USER_AGENT: &str = "CBR_USER_AGENT";
const CBR_TIMEOUT_SECS: &str = "CBR_TIMEOUT_SECS";

/// 匯率資料來源
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Source {
    pub base_url: String,
    /// 對方網站會擋掉預設的 client 識別字串
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for Source {
    fn default() -> Self {
        Source {
            base_url: "http://www.cbr.ru/scripts/XML_daily_eng.asp".to_string(),
            user_agent:
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:89.0) Gecko/20100101 Firefox/89.0"
                    .to_string(),
            timeout_secs: 15,
        }
    }
}

const RUN_WINDOW_DAYS: &str = "RUN_WINDOW_DAYS";
const RUN_ON_DAY_ERROR: &str = "RUN_ON_DAY_ERROR";
const RUN_DEADLINE_SECS: &str = "RUN_DEADLINE_SECS";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Run {
    /// 往回抓取的天數(含今天)
    pub window_days: u32,
    pub on_day_error: OnDayError,
    /// 整體執行時間上限，0 表示不限制
    pub deadline_secs: u64,
}

impl Default for Run {
    fn default() -> Self {
        Run {
            window_days: 90,
            on_day_error: OnDayError::Abort,
            deadline_secs: 0,
        }
    }
}

impl Run {
    pub fn deadline(&self) -> Option<Duration> {
        match self.deadline_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

pub static SETTINGS: Lazy<App> = Lazy::new(|| {
    App::get().unwrap_or_else(|why| {
        logging::error_console(format!(
            "I can't read the config context because {:?}",
            why
        ));
        App::default().override_with_env()
    })
});

impl App {
    fn get() -> Result<Self, config::ConfigError> {
        let config_path = config_path();
        if config_path.exists() {
            return Ok(Self::load(&config_path)?.override_with_env());
        }

        Ok(App::default().override_with_env())
    }

    /// 讀取指定路徑的設定檔
    pub(crate) fn load(path: &Path) -> Result<Self, config::ConfigError> {
        config_config::builder()
            .add_source(config_file::from(path.to_path_buf()))
            .build()?
            .try_deserialize()
    }

    /// 將來至於 env 的設定值覆蓋掉 json 上的設定值
    fn override_with_env(mut self) -> Self {
        if let Ok(base_url) = env::var(CBR_BASE_URL) {
            self.source.base_url = base_url;
        }

        if let Ok(user_agent) = env::var(CBR_USER_AGENT) {
            self.source.user_agent = user_agent;
        }

        if let Some(secs) = parse_env::<u64>(CBR_TIMEOUT_SECS) {
            self.source.timeout_secs = secs;
        }

        if let Some(days) = parse_env::<u32>(RUN_WINDOW_DAYS) {
            self.run.window_days = days;
        }

        if let Some(policy) = parse_env::<OnDayError>(RUN_ON_DAY_ERROR) {
            self.run.on_day_error = policy;
        }

        if let Some(secs) = parse_env::<u64>(RUN_DEADLINE_SECS) {
            self.run.deadline_secs = secs;
        }

        self
    }
}

/// 讀取環境變數並轉型，格式錯誤時保留原設定
fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match T::from_str(raw.trim()) {
        Ok(v) => Some(v),
        Err(_) => {
            logging::warn_file_async(format!("Ignore {}={} because it is not valid", key, raw));
            None
        }
    }
}

/// 回傳設定檔的路徑
fn config_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}
