use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use once_cell::sync::{Lazy, OnceCell};
use reqwest::{header, Client, Method, Response};

use crate::{config::SETTINGS, logging::Logger};

/// A singleton instance of the reqwest client.
static CLIENT: OnceCell<Client> = OnceCell::new();

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("http"));

/// Returns the reqwest client singleton instance or creates one if it doesn't exist.
///
/// The TLS backend is rustls without a bundled provider, so the ring provider is
/// installed before the first client is built.
fn get_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        // 已安裝過 provider 時會回傳 Err，忽略即可
        let _ = rustls::crypto::ring::default_provider().install_default();

        Client::builder()
            // ===== 壓縮 =====
            .brotli(true)
            .gzip(true)
            // ===== 超時設置 =====
            .connect_timeout(Duration::from_secs(8))
            .timeout(Duration::from_secs(SETTINGS.source.timeout_secs))
            .tcp_nodelay(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(SETTINGS.source.user_agent.as_str())
            .build()
            .map_err(|e| anyhow!("Failed to create reqwest client: {:?}", e))
    })
}

/// Performs an HTTP GET request and returns the raw response body.
///
/// The body is returned undecoded so the caller can honour whatever character
/// encoding the document itself declares.
///
/// # Arguments
///
/// * `url`: The URL to send the GET request to.
/// * `headers`: An optional set of headers to include with the request.
///
/// # Returns
///
/// * `Result<Vec<u8>>`: The response bytes, or an error if the request fails,
///   the server answers with a non-2xx status, or the body cannot be read.
pub async fn get_bytes(url: &str, headers: Option<header::HeaderMap>) -> Result<Vec<u8>> {
    let response = send(Method::GET, url, headers).await?;
    let response = response
        .error_for_status()
        .map_err(|why| anyhow!("Unexpected status from {}: {:?}", url, why.status()))?;

    response
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|why| anyhow!("Error reading response body: {:?}", why))
}

/// Sends a single HTTP request. Failures are returned to the caller, never retried.
async fn send(method: Method, url: &str, headers: Option<header::HeaderMap>) -> Result<Response> {
    let visit_log = format!("{method}:{url}");
    let client = get_client()?;
    let mut rb = client.request(method, url);

    if let Some(h) = headers {
        rb = rb.headers(h);
    }

    let start = Instant::now();
    let res = rb.send().await;
    let elapsed = start.elapsed().as_millis();

    match res {
        Ok(response) => {
            LOGGER.info(format!(
                "{} {} {} ms",
                visit_log,
                response.status(),
                elapsed
            ));
            Ok(response)
        }
        Err(why) => {
            LOGGER.error(format!("{} failed because {:?}. {} ms", visit_log, why, elapsed));
            Err(anyhow!("Failed to send request to {}: {:?}", url, why))
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        matchers::{header as header_is, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    #[tokio::test]
    async fn test_get_bytes_returns_raw_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/raw"))
            .and(header_is("user-agent", "probe/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xC4u8, 0xEE, 0xEB]))
            .mount(&server)
            .await;

        let mut headers = header::HeaderMap::new();
        headers.insert(header::USER_AGENT, header::HeaderValue::from_static("probe/1.0"));

        let body = get_bytes(&format!("{}/raw", server.uri()), Some(headers))
            .await
            .unwrap();
        assert_eq!(body, vec![0xC4u8, 0xEE, 0xEB]);
    }

    #[tokio::test]
    async fn test_get_bytes_rejects_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let result = get_bytes(&format!("{}/missing", server.uri()), None).await;
        assert!(result.is_err());
    }
}
