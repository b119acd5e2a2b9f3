//! Parameter parsing for `Content-Disposition` header values.

use percent_encoding::percent_decode_str;

use crate::naming::basename;

/// Split a header value into its `key=value` parameters, in order.
///
/// Keys are lowercased. Values may be bare tokens or quoted strings with backslash escapes.
/// Segments without `=` (such as the disposition type) are skipped.
pub fn parse_parameters(value: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut rest = value;

    loop {
        rest = rest.trim_start_matches(|c: char| c == ';' || c.is_whitespace());
        if rest.is_empty() {
            break;
        }

        let key_end = rest.find(|c: char| c == '=' || c == ';').unwrap_or(rest.len());
        let key = rest[..key_end].trim().to_ascii_lowercase();
        rest = &rest[key_end..];

        let Some(after_eq) = rest.strip_prefix('=') else {
            continue;
        };
        let after_eq = after_eq.trim_start();

        let (param_value, remaining) = match after_eq.strip_prefix('"') {
            Some(quoted) => parse_quoted(quoted),
            None => {
                let end = after_eq.find(';').unwrap_or(after_eq.len());
                (after_eq[..end].trim().to_string(), &after_eq[end..])
            }
        };
        rest = remaining;

        if !key.is_empty() {
            params.push((key, param_value));
        }
    }

    params
}

// Reads up to the closing quote; an unterminated string runs to the end of input.
fn parse_quoted(input: &str) -> (String, &str) {
    let mut value = String::new();
    let mut chars = input.char_indices();

    while let Some((idx, c)) = chars.next() {
        match c {
            '\\' => {
                if let Some((_, escaped)) = chars.next() {
                    value.push(escaped);
                }
            }
            '"' => return (value, &input[idx + 1..]),
            _ => value.push(c),
        }
    }

    (value, "")
}

/// RFC 5987 `charset'language'percent-encoded` form.
fn decode_extended(value: &str) -> Option<String> {
    let mut parts = value.splitn(3, '\'');
    let (charset, encoded) = match (parts.next(), parts.next(), parts.next()) {
        (Some(charset), Some(_language), Some(encoded)) => (charset, encoded),
        _ => ("utf-8", value),
    };

    let bytes: Vec<u8> = percent_decode_str(encoded).collect();
    if charset.eq_ignore_ascii_case("iso-8859-1") {
        Some(bytes.into_iter().map(char::from).collect())
    } else {
        String::from_utf8(bytes).ok()
    }
}

/// Upload filename carried by a header value, without directory components or control
/// characters. `filename*` takes precedence over `filename`.
pub fn filename_from_header(value: &str) -> Option<String> {
    let params = parse_parameters(value);

    let extended = params
        .iter()
        .find(|(key, _)| key == "filename*")
        .and_then(|(_, value)| decode_extended(value));
    let plain = || {
        params
            .iter()
            .find(|(key, _)| key == "filename")
            .map(|(_, value)| value.clone())
    };

    let filename: String = extended
        .or_else(plain)?
        .chars()
        .filter(|c| !c.is_control())
        .collect();
    let filename = basename(&filename);
    if filename.is_empty() {
        None
    } else {
        Some(filename.to_string())
    }
}
