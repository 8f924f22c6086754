use std::{borrow::Cow, str::FromStr};

use anyhow::{anyhow, Result};
use encoding_rs::{Encoding, UTF_8};
use once_cell::sync::Lazy;
use regex::{bytes, Regex};
use rust_decimal::Decimal;

/// `<?xml version="1.0" encoding="windows-1251"?>` 中宣告的編碼
static DECLARED_ENCODING: Lazy<bytes::Regex> = Lazy::new(|| {
    bytes::Regex::new(r#"^\s*<\?xml[^>]*?encoding\s*=\s*["']([A-Za-z0-9._:\-]+)["']"#)
        .expect("invalid encoding declaration pattern")
});

static XML_DECLARATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*<\?xml[^>]*\?>").expect("invalid xml declaration pattern"));

/// Decodes a text document into UTF-8, honouring the character encoding it carries.
///
/// The encoding is taken from a byte order mark when present, otherwise from the
/// `encoding="…"` label of the XML prolog, otherwise UTF-8 is assumed.
///
/// # Arguments
///
/// * `data`: The raw document bytes as received from the server.
///
/// # Returns
///
/// * `Result<String>`: The document as UTF-8, or an error if the declared label is
///   unknown or the bytes are malformed for the selected encoding.
pub fn decode_declared(data: &[u8]) -> Result<String> {
    let (encoding, body) = match Encoding::for_bom(data) {
        Some((encoding, bom_len)) => (encoding, &data[bom_len..]),
        None => (declared_encoding(data)?.unwrap_or(UTF_8), data),
    };

    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(Cow::into_owned)
        .ok_or_else(|| anyhow!("Document is not valid {}", encoding.name()))
}

/// Returns the encoding named in the XML prolog, `None` when nothing is declared.
pub fn declared_encoding(data: &[u8]) -> Result<Option<&'static Encoding>> {
    let label = match DECLARED_ENCODING
        .captures(data)
        .and_then(|caps| caps.get(1))
    {
        None => return Ok(None),
        Some(m) => m.as_bytes(),
    };

    Encoding::for_label(label).map(Some).ok_or_else(|| {
        anyhow!(
            "Unrecognised character encoding '{}'",
            String::from_utf8_lossy(label)
        )
    })
}

/// 移除 XML 宣告，內容已轉成 UTF-8 後原本的 encoding 宣告不再正確
pub fn strip_xml_declaration(text: &str) -> Cow<'_, str> {
    XML_DECLARATION.replace(text, "")
}

/// Parses a decimal written with a comma as the decimal separator.
///
/// A single comma is replaced by a period before parsing, so `"65,4321"` becomes
/// `65.4321`; a value without a comma is parsed unchanged.
///
/// # Example
///
/// ```ignore
/// let rate = parse_locale_decimal("65,4321").unwrap();
/// assert_eq!(rate.to_string(), "65.4321");
/// ```
pub fn parse_locale_decimal(s: &str) -> Result<Decimal> {
    let cleaned = s.trim().replacen(',', ".", 1);
    Decimal::from_str(&cleaned)
        .map_err(|why| anyhow!("Failed to parse '{}' as Decimal because {:?}", s, why))
}

/// Parses an `i32` value, ignoring surrounding whitespace.
pub fn parse_i32(s: &str) -> Result<i32> {
    let cleaned = s.trim();
    i32::from_str(cleaned)
        .map_err(|why| anyhow!("Failed to parse '{}' as i32 because: {:?}", cleaned, why))
}
