//! Built-in redaction rules
//!
//! Every masked span becomes `[REDACTED:<KIND>]`, or `[REDACTED]` when the rule
//! keeps a key and masks only its value. Markers never match any built-in
//! pattern, which is what keeps each rule idempotent.

use std::sync::Arc;

use crate::error::{RedactError, Result};
use crate::redactor::{PatternRedactor, Redact, Rule, WhitespaceNormalizer};
use crate::safe_regex::SafeRegex;

pub const MASK: &str = "[REDACTED]";

/// Built-in rule names in the recommended order:
/// normalize, then PII and secrets, then identifiers and noise.
pub const BUILTIN_NAMES: &[&str] = &[
    "whitespace",
    "email",
    "phone",
    "password",
    "api_key",
    "cloud_keys",
    "authorization",
    "cookie",
    "jwt",
    "hex_token",
    "guid",
    "hex_id",
    "ip_address",
    "iso_timestamp",
    "unix_timestamp",
];

fn builtin(pattern: &str) -> SafeRegex {
    SafeRegex::new(pattern).expect("built-in redaction pattern must compile")
}

fn marker(kind: &str) -> String {
    format!("[REDACTED:{kind}]")
}

fn has_hex_letter(s: &str) -> bool {
    s.bytes().any(|b| matches!(b, b'a'..=b'f' | b'A'..=b'F'))
}

/// At least seven digits, and not the date part of a timestamp.
fn is_phone_like(s: &str) -> bool {
    let digits = s.bytes().filter(u8::is_ascii_digit).count();
    digits >= 7 && !starts_with_iso_date(s)
}

fn starts_with_iso_date(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 10
        && b[..4].iter().all(u8::is_ascii_digit)
        && b[4] == b'-'
        && b[5..7].iter().all(u8::is_ascii_digit)
        && b[7] == b'-'
        && b[8..10].iter().all(u8::is_ascii_digit)
}

pub fn whitespace() -> WhitespaceNormalizer {
    WhitespaceNormalizer
}

pub fn email() -> PatternRedactor {
    PatternRedactor::new(
        "email",
        vec![Rule::new(
            builtin(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}"),
            marker("EMAIL"),
        )],
    )
}

/// Phone numbers with separators or a leading `+`; short codes such as
/// `Ext 1234` stay visible.
pub fn phone() -> PatternRedactor {
    PatternRedactor::new(
        "phone",
        vec![Rule::new(
            builtin(
                r"(?:\+\d{1,3}[ -]?)?(?:\(\d{2,4}\)[ -]?)?\b\d{2,4}(?:[ -]\d{2,5}){1,4}\b|\+\d{7,15}\b",
            ),
            marker("PHONE"),
        )
        .guarded(is_phone_like)],
    )
}

/// `password=` / `pwd=` values, quoted or bare, as found in connection strings
/// and SQL literals. Only the value is masked.
pub fn password() -> PatternRedactor {
    PatternRedactor::new(
        "password",
        vec![
            Rule::new(
                builtin(r#"(?i)\b(?:password|pwd)\s*=\s*"((?:[^"]|"")*)""#),
                MASK,
            )
            .on_group(1),
            Rule::new(builtin(r"(?i)\b(?:password|pwd)\s*=\s*'((?:[^']|'')*)'"), MASK).on_group(1),
            Rule::new(builtin(r#"(?i)\b(?:password|pwd)\s*=\s*([^;\s'"]+)"#), MASK).on_group(1),
        ],
    )
}

/// API keys in headers (`X-Api-Key: ...`), query params and key/value pairs.
pub fn api_key() -> PatternRedactor {
    PatternRedactor::new(
        "api_key",
        vec![
            Rule::new(
                builtin(
                    r#"(?i)\b(?:x-api-key|api[_-]?key|access[_-]?token|client[_-]?secret)['"]?\s*[:=]\s*['"]?([^\s&;,'"]+)"#,
                ),
                MASK,
            )
            .on_group(1),
        ],
    )
}

/// AWS access key ids and secret keys, Azure storage account keys and SAS
/// signatures.
pub fn cloud_keys() -> PatternRedactor {
    PatternRedactor::new(
        "cloud_keys",
        vec![
            Rule::new(
                builtin(r"\b(?:AKIA|ASIA|AGPA|AIDA|AROA)[0-9A-Z]{16}\b"),
                marker("AWS_KEY"),
            ),
            Rule::new(
                builtin(
                    r#"(?i)\b(?:aws_secret_access_key|aws_secret_key|secret_access_key)['"]?\s*[:=]\s*['"]?([A-Za-z0-9/+=]{40,})"#,
                ),
                MASK,
            )
            .on_group(1),
            Rule::new(
                builtin(r"(?i)\b(?:AccountKey|SharedAccessKey)\s*=\s*([A-Za-z0-9+/=]{20,})"),
                MASK,
            )
            .on_group(1),
            Rule::new(builtin(r"(?i)\bsig=([A-Za-z0-9%+/=]{20,})"), MASK).on_group(1),
        ],
    )
}

/// Credentials following `Bearer` / `Basic`.
pub fn authorization() -> PatternRedactor {
    PatternRedactor::new(
        "authorization",
        vec![
            Rule::new(
                builtin(r"(?i)\b(?:bearer|basic)\s+([A-Za-z0-9._~+/-]{8,}=*)"),
                MASK,
            )
            .on_group(1),
        ],
    )
}

/// The whole value of a `Cookie` header, but only the primary value of
/// `Set-Cookie` so attributes such as `Path` stay readable.
pub fn cookie() -> PatternRedactor {
    PatternRedactor::new(
        "cookie",
        vec![
            Rule::new(
                builtin(r"(?i)\bset-cookie\s*:\s*[^=;\s]+=([^;\r\n]+)"),
                MASK,
            )
            .on_group(1),
            Rule::new(builtin(r"(?i)(?:^|[^\w-])cookie\s*:\s*([^\r\n]+)"), MASK).on_group(1),
        ],
    )
}

/// Three dot-separated base64url segments, ten or more characters each.
pub fn jwt() -> PatternRedactor {
    PatternRedactor::new(
        "jwt",
        vec![Rule::new(
            builtin(r"\b[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}"),
            marker("JWT"),
        )],
    )
}

pub fn hex_token() -> PatternRedactor {
    PatternRedactor::new(
        "hex_token",
        vec![Rule::new(builtin(r"\b[0-9a-fA-F]{32,}\b"), marker("HEX"))],
    )
}

/// Dashed GUIDs. Purely numeric ones are left alone.
pub fn guid() -> PatternRedactor {
    PatternRedactor::new(
        "guid",
        vec![Rule::new(
            builtin(
                r"\b[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\b",
            ),
            marker("GUID"),
        )
        .guarded(has_hex_letter)],
    )
}

/// Undashed 32-hex ids and 16-31 char hex ids, each needing a hex letter.
pub fn hex_id() -> PatternRedactor {
    PatternRedactor::new(
        "hex_id",
        vec![
            Rule::new(builtin(r"\b[0-9a-fA-F]{32}\b"), marker("HEX_ID")).guarded(has_hex_letter),
            Rule::new(builtin(r"\b[0-9a-fA-F]{16,31}\b"), marker("HEX_ID"))
                .guarded(has_hex_letter),
        ],
    )
}

pub fn ip_address() -> PatternRedactor {
    const OCTET: &str = r"(?:25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])";
    const H16: &str = r"[0-9a-fA-F]{1,4}";

    PatternRedactor::new(
        "ip_address",
        vec![
            Rule::new(
                builtin(&format!(r"\b(?:{OCTET}\.){{3}}{OCTET}\b")),
                marker("IP"),
            ),
            // full form
            Rule::new(builtin(&format!(r"\b(?:{H16}:){{7}}{H16}\b")), marker("IP")),
            // compressed, with groups on both sides of `::`
            Rule::new(
                builtin(&format!(r"\b(?:{H16}:){{1,7}}(?::{H16}){{1,7}}\b")),
                marker("IP"),
            ),
            // compressed with a leading `::`, e.g. ::1
            Rule::new(
                builtin(&format!(r"(?:^|[^\w:])(::(?:{H16}:){{0,6}}{H16})\b")),
                marker("IP"),
            )
            .on_group(1),
        ],
    )
}

pub fn iso_timestamp() -> PatternRedactor {
    PatternRedactor::new(
        "iso_timestamp",
        vec![Rule::new(
            builtin(
                r"\b\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}(?::\d{2}(?:[.,]\d{1,9})?)?(?:Z|[+-]\d{2}(?::?\d{2})?)?",
            ),
            marker("TIMESTAMP"),
        )],
    )
}

/// 10-11 digit Unix-seconds values. Millisecond timestamps (13 digits) and
/// other long integers never match because the digit run must be bounded.
pub fn unix_timestamp() -> PatternRedactor {
    PatternRedactor::new(
        "unix_timestamp",
        vec![Rule::new(builtin(r"\b\d{10,11}\b"), marker("UNIX_TS"))],
    )
}

/// Ad hoc rule replacing every match of `pattern` with `replacement`.
///
/// Idempotence is up to the caller: the replacement must not match `pattern`.
pub fn regex_replace(
    name: impl Into<String>,
    pattern: &str,
    replacement: impl Into<String>,
) -> Result<PatternRedactor> {
    let regex = SafeRegex::new(pattern)?;
    Ok(PatternRedactor::new(name, vec![Rule::new(regex, replacement)]))
}

/// Look up a built-in rule by name.
pub fn by_name(name: &str) -> Result<Arc<dyn Redact>> {
    let redactor: Arc<dyn Redact> = match name {
        "whitespace" => Arc::new(whitespace()),
        "email" => Arc::new(email()),
        "phone" => Arc::new(phone()),
        "password" => Arc::new(password()),
        "api_key" => Arc::new(api_key()),
        "cloud_keys" => Arc::new(cloud_keys()),
        "authorization" => Arc::new(authorization()),
        "cookie" => Arc::new(cookie()),
        "jwt" => Arc::new(jwt()),
        "hex_token" => Arc::new(hex_token()),
        "guid" => Arc::new(guid()),
        "hex_id" => Arc::new(hex_id()),
        "ip_address" => Arc::new(ip_address()),
        "iso_timestamp" => Arc::new(iso_timestamp()),
        "unix_timestamp" => Arc::new(unix_timestamp()),
        other => return Err(RedactError::UnknownRedactor(other.to_string())),
    };
    Ok(redactor)
}
