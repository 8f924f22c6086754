use chrono::{Days, NaiveDate};

/// 央行查詢參數 date_req 使用的日期格式 DD/MM/YYYY
pub const REQUEST_DATE_FORMAT: &str = "%d/%m/%Y";

/// Returns the trailing window of calendar dates ending at `today`, newest first.
///
/// The sequence is `today, today - 1, …, today - (days - 1)` without gaps.
///
/// # Examples
///
/// ```ignore
/// use chrono::NaiveDate;
///
/// let today = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
/// let window = reference_window(today, 3);
/// assert_eq!(format_request_date(window[2]), "29/02/2024");
/// ```
pub fn reference_window(today: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (0..u64::from(days))
        .map_while(|offset| today.checked_sub_days(Days::new(offset)))
        .collect()
}

/// Renders a date the way the rate service expects it in the query string.
pub fn format_request_date(date: NaiveDate) -> String {
    date.format(REQUEST_DATE_FORMAT).to_string()
}
