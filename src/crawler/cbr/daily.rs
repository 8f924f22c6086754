use chrono::NaiveDate;
use concat_string::concat_string;
use reqwest::header::{self, HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{
    crawler::FetchError,
    util::{self, text},
};

/// ValCurs 央行當日匯率表
#[derive(Deserialize, Debug)]
struct ValCurs {
    #[serde(rename = "Valute", default)]
    valutes: Vec<Valute>,
}

/// 單一幣別的原始欄位，數值仍是當地格式(逗號小數點)
#[derive(Deserialize, Debug)]
struct Valute {
    #[serde(rename = "NumCode")]
    num_code: String,
    #[serde(rename = "CharCode")]
    char_code: String,
    #[serde(rename = "Nominal")]
    nominal: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Value")]
    value: String,
}

/// 單日單一幣別的匯率
#[derive(Debug, Clone, PartialEq)]
pub struct RateRecord {
    /// ISO 4217 數字代碼
    pub num_code: i32,
    /// 幣別代碼，例如 USD
    pub char_code: String,
    /// 報價單位，value 為每 nominal 單位的價格
    pub nominal: i32,
    pub name: String,
    pub value: Decimal,
}

#[cfg(test)]
impl RateRecord {
    pub fn new(char_code: &str, name: &str, value: Decimal) -> Self {
        RateRecord {
            num_code: 0,
            char_code: char_code.to_string(),
            nominal: 1,
            name: name.to_string(),
            value,
        }
    }
}

impl Valute {
    fn into_record(self) -> Result<RateRecord, FetchError> {
        let parse_err =
            |why: anyhow::Error| FetchError::Parse(format!("{}: {}", self.char_code, why));

        Ok(RateRecord {
            num_code: text::parse_i32(&self.num_code).map_err(parse_err)?,
            nominal: text::parse_i32(&self.nominal).map_err(parse_err)?,
            value: text::parse_locale_decimal(&self.value).map_err(parse_err)?,
            char_code: self.char_code.trim().to_string(),
            name: self.name.trim().to_string(),
        })
    }
}

/// 組出查詢指定日期匯率的網址
pub fn request_url(base_url: &str, date: NaiveDate) -> String {
    let separator = if base_url.contains('?') { "&" } else { "?" };
    concat_string!(
        base_url,
        separator,
        "date_req=",
        util::datetime::format_request_date(date)
    )
}

/// 抓取指定日期的央行匯率
pub async fn visit(
    base_url: &str,
    user_agent: &str,
    date: NaiveDate,
) -> Result<Vec<RateRecord>, FetchError> {
    let url = request_url(base_url, date);
    let mut headers = HeaderMap::new();
    headers.insert(
        header::USER_AGENT,
        HeaderValue::from_str(user_agent)
            .map_err(|why| FetchError::Transport(format!("Invalid User-Agent: {:?}", why)))?,
    );

    let body = util::http::get_bytes(&url, Some(headers))
        .await
        .map_err(|why| FetchError::Transport(format!("{:#}", why)))?;

    parse(&body)
}

/// 將回應內容解析成匯率清單，任何一筆失敗就捨棄整份文件
pub fn parse(body: &[u8]) -> Result<Vec<RateRecord>, FetchError> {
    let document = text::decode_declared(body).map_err(|why| FetchError::Decode(why.to_string()))?;
    let document = text::strip_xml_declaration(&document);
    let val_curs: ValCurs = serde_xml_rs::from_str(&document)
        .map_err(|why| FetchError::Decode(format!("Malformed XML: {:?}", why)))?;

    val_curs
        .valutes
        .into_iter()
        .map(Valute::into_record)
        .collect()
}

#[cfg(test)]
mod tests {
    use encoding_rs::WINDOWS_1251;
    use rust_decimal_macros::dec;
    use wiremock::{
        matchers::{header as header_is, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    const ENGLISH_FEED: &str = r#"<?xml version="1.0" encoding="windows-1251"?>
<ValCurs Date="16.10.2026" name="Foreign Currency Market">
    <Valute ID="R01235">
        <NumCode>840</NumCode>
        <CharCode>USD</CharCode>
        <Nominal>1</Nominal>
        <Name>US Dollar</Name>
        <Value>90,5000</Value>
        <VunitRate>90,5</VunitRate>
    </Valute>
    <Valute ID="R01820">
        <NumCode>392</NumCode>
        <CharCode>JPY</CharCode>
        <Nominal>100</Nominal>
        <Name>Japanese Yen</Name>
        <Value>60,1234</Value>
        <VunitRate>0,601234</VunitRate>
    </Valute>
</ValCurs>"#;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[test]
    fn test_request_url() {
        assert_eq!(
            request_url("http://www.cbr.ru/scripts/XML_daily_eng.asp", date()),
            "http://www.cbr.ru/scripts/XML_daily_eng.asp?date_req=16/10/2026"
        );
        assert_eq!(
            request_url("http://host/rates?lang=en", date()),
            "http://host/rates?lang=en&date_req=16/10/2026"
        );
    }

    #[test]
    fn test_parse_english_feed() {
        let records = parse(ENGLISH_FEED.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            RateRecord {
                num_code: 840,
                char_code: "USD".to_string(),
                nominal: 1,
                name: "US Dollar".to_string(),
                value: dec!(90.5000),
            }
        );
        assert_eq!(records[1].nominal, 100);
        assert_eq!(records[1].value, dec!(60.1234));
    }

    #[test]
    fn test_parse_windows_1251_names() {
        let feed = ENGLISH_FEED.replace("US Dollar", "Доллар США");
        let (bytes, _, _) = WINDOWS_1251.encode(&feed);

        let records = parse(&bytes).unwrap();
        assert_eq!(records[0].name, "Доллар США");
    }

    #[test]
    fn test_parse_empty_document() {
        let feed = r#"<?xml version="1.0" encoding="windows-1251"?><ValCurs Date="16.10.2026" name="Foreign Currency Market"></ValCurs>"#;
        assert!(parse(feed.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_parse_failures_are_classified() {
        let malformed = parse(b"<ValCurs><Valute><CharCode>USD</CharCode>");
        assert!(matches!(malformed, Err(FetchError::Decode(_))));

        let bad_value = ENGLISH_FEED.replace("60,1234", "sixty");
        assert!(matches!(
            parse(bad_value.as_bytes()),
            Err(FetchError::Parse(_))
        ));

        let bad_encoding = ENGLISH_FEED.replace("windows-1251", "no-such-charset");
        assert!(matches!(
            parse(bad_encoding.as_bytes()),
            Err(FetchError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_visit_sends_date_and_user_agent() {
        let server = MockServer::start().await;
        let (body, _, _) = WINDOWS_1251.encode(ENGLISH_FEED);
        Mock::given(method("GET"))
            .and(path("/scripts/XML_daily_eng.asp"))
            .and(query_param("date_req", "16/10/2026"))
            .and(header_is("user-agent", "Mozilla/5.0 Firefox/89.0"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/xml; charset=windows-1251")
                    .set_body_bytes(body.into_owned()),
            )
            .expect(1)
            .mount(&server)
            .await;

        let base_url = format!("{}/scripts/XML_daily_eng.asp", server.uri());
        let records = visit(&base_url, "Mozilla/5.0 Firefox/89.0", date())
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].char_code, "USD");
    }

    #[tokio::test]
    async fn test_visit_server_error_is_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let base_url = format!("{}/scripts/XML_daily_eng.asp", server.uri());
        let result = visit(&base_url, "Mozilla/5.0", date()).await;
        let msg = match result {
            Err(FetchError::Transport(msg)) => msg,
            other => panic!("expected a transport failure, got {:?}", other),
        };

        // 每一天的失敗只佔一行
        assert!(msg.contains("500"), "{}", msg);
        assert!(!msg.contains('\n'), "{}", msg);
    }

    #[tokio::test]
    #[ignore]
    async fn test_visit_live() {
        let records = visit(
            "http://www.cbr.ru/scripts/XML_daily_eng.asp",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:89.0) Gecko/20100101 Firefox/89.0",
            chrono::Local::now().date_naive(),
        )
        .await;

        dbg!(&records);
    }
}
