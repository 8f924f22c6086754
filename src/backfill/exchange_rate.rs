use std::{fmt, time::Duration};

use chrono::{Local, NaiveDate};
use scopeguard::defer;

use crate::{
    calculation::currency_stats::AggregationStore,
    config::SETTINGS,
    crawler::{cbr::Cbr, DailyRateSource, FetchError},
    declare::OnDayError,
    logging,
    util::datetime,
};

/// 單日失敗紀錄
#[derive(Debug)]
pub struct DayFailure {
    pub date: NaiveDate,
    pub error: FetchError,
}

/// 一次彙整的執行結果
#[derive(Debug, Default)]
pub struct Summary {
    /// 區間內的日期數
    pub requested: usize,
    /// 成功併入統計的日期數
    pub aggregated: usize,
    pub failures: Vec<DayFailure>,
    /// 因單日失敗而提前結束
    pub aborted: bool,
    /// 超過整體執行時間上限
    pub timed_out: bool,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "aggregated {} of {} days, {} failed",
            self.aggregated,
            self.requested,
            self.failures.len()
        )?;

        if self.aborted {
            write!(f, ", aborted after first failure")?;
        }

        if self.timed_out {
            write!(f, ", deadline exceeded")?;
        }

        Ok(())
    }
}

/// 依序抓取每一天並累計到同一份統計，失敗時依 policy 決定是否繼續
pub struct Collector {
    policy: OnDayError,
    store: AggregationStore,
    summary: Summary,
}

impl Collector {
    pub fn new(policy: OnDayError) -> Self {
        Collector {
            policy,
            store: AggregationStore::new(),
            summary: Summary::default(),
        }
    }

    /// Fetches every date in order and folds each day into the store.
    ///
    /// A failed day contributes nothing. With [`OnDayError::Abort`] the loop stops
    /// at the first failure and the store keeps whatever was gathered before it.
    pub async fn run<S>(&mut self, source: &S, dates: &[NaiveDate])
    where
        S: DailyRateSource + ?Sized,
    {
        self.summary.requested += dates.len();

        for &date in dates {
            let day = datetime::format_request_date(date);

            match source.fetch_day(date).await {
                Ok(records) => {
                    self.store.update(date, &records);
                    self.summary.aggregated += 1;
                    logging::debug_file_async(format!("{} 匯入 {} 筆匯率", day, records.len()));
                }
                Err(why) => {
                    let msg = format!("Failed to fetch rates of {} because {}", day, why);
                    logging::error_console(msg.clone());
                    logging::error_file_async(msg);
                    self.summary.failures.push(DayFailure { date, error: why });

                    if self.policy.should_abort() {
                        self.summary.aborted = true;
                        break;
                    }
                }
            }
        }
    }

    /// 與 [`Collector::run`] 相同，但超過 deadline 就停止剩餘日期，已彙整的資料保留
    pub async fn run_with_deadline<S>(
        &mut self,
        source: &S,
        dates: &[NaiveDate],
        deadline: Option<Duration>,
    ) where
        S: DailyRateSource + ?Sized,
    {
        let Some(deadline) = deadline else {
            return self.run(source, dates).await;
        };

        if tokio::time::timeout(deadline, self.run(source, dates))
            .await
            .is_err()
        {
            self.summary.timed_out = true;
            let msg = format!("Stop fetching because the deadline {:?} was exceeded", deadline);
            logging::error_console(msg.clone());
            logging::error_file_async(msg);
        }
    }

    pub fn into_parts(self) -> (AggregationStore, Summary) {
        (self.store, self.summary)
    }
}

/// 抓取最近 N 天的央行匯率並彙整各幣別統計
pub async fn execute() -> (AggregationStore, Summary) {
    logging::info_file_async("彙整央行匯率開始".to_string());
    defer! {
        logging::info_file_async("彙整央行匯率結束".to_string());
    }

    let run = &SETTINGS.run;
    let source = Cbr::from_settings();
    let dates = datetime::reference_window(Local::now().date_naive(), run.window_days);
    let mut collector = Collector::new(run.on_day_error);

    collector
        .run_with_deadline(&source, &dates, run.deadline())
        .await;

    let (store, summary) = collector.into_parts();
    logging::info_file_async(format!("{}, {} currencies", summary, store.len()));

    (store, summary)
}
