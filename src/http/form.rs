//! Form body parsing module
//!
//! `application/x-www-form-urlencoded` decoding for the page save flow,
//! per the WHATWG URL standard: `+` is a space, `%xx` is a percent-escaped
//! byte, pairs are `&`-separated `name=value` entries.

use std::collections::HashMap;

use thiserror::Error;

/// Errors from decoding a form body
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormParseError {
    /// `%` not followed by two hex digits
    #[error("malformed percent escape in form data")]
    InvalidPercentEscape,

    /// Decoded bytes are not valid UTF-8
    #[error("form field is not valid UTF-8")]
    InvalidUtf8,
}

/// Parse an urlencoded form body into a field map
///
/// Later duplicates of a field name overwrite earlier ones. A pair without
/// `=` is treated as a field with an empty value, matching browser
/// behavior for bare names.
pub fn parse_form(body: &[u8]) -> Result<HashMap<String, String>, FormParseError> {
    let mut fields = HashMap::new();

    for pair in body.split(|&b| b == b'&') {
        if pair.is_empty() {
            continue;
        }
        let (name, value) = match pair.iter().position(|&b| b == b'=') {
            Some(i) => (&pair[..i], &pair[i + 1..]),
            None => (pair, &pair[pair.len()..]),
        };
        fields.insert(decode_component(name)?, decode_component(value)?);
    }

    Ok(fields)
}

/// Decode a single urlencoded component
fn decode_component(raw: &[u8]) -> Result<String, FormParseError> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        match raw[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' => {
                let hi = hex_value(*raw.get(i + 1).ok_or(FormParseError::InvalidPercentEscape)?)?;
                let lo = hex_value(*raw.get(i + 2).ok_or(FormParseError::InvalidPercentEscape)?)?;
                out.push(hi << 4 | lo);
                i += 3;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8(out).map_err(|_| FormParseError::InvalidUtf8)
}

fn hex_value(b: u8) -> Result<u8, FormParseError> {
    match b {
        b'0'..=b'9' => Ok(b - b'0'),
        b'a'..=b'f' => Ok(b - b'a' + 10),
        b'A'..=b'F' => Ok(b - b'A' + 10),
        _ => Err(FormParseError::InvalidPercentEscape),
    }
}
