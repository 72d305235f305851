use crate::data_converter::dialect::TargetDialect;
use crate::types::{RecordEncoding, ValueHint};
use chrono::NaiveDateTime;

/// Layout of a normalized timestamp, fractional seconds optional
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Converts raw dump literals into target-dialect literals
#[derive(Debug, Clone)]
pub struct ValueConverter {
    dialect: TargetDialect,
}

impl ValueConverter {
    pub fn new(dialect: TargetDialect) -> Self {
        Self { dialect }
    }

    /// Convert one raw field.
    ///
    /// Checks run in a fixed order: null sentinel, boolean tokens, timestamp
    /// normalization, then generic string quoting.
    pub fn convert(&self, raw: &str, encoding: RecordEncoding, hint: ValueHint) -> String {
        let tokens = encoding.tokens();
        if tokens.is_null(raw) {
            return self.dialect.null_keyword.clone();
        }
        if let Some(value) = tokens.boolean(raw) {
            return self.dialect.boolean_literal(value).to_string();
        }

        match encoding {
            RecordEncoding::Block => self.convert_text(raw, hint),
            RecordEncoding::Statement => {
                if raw.is_empty() {
                    return self.dialect.null_keyword.clone();
                }
                match decode_string_literal(raw) {
                    Some(text) => self.convert_text(&text, hint),
                    // Numbers and expressions are already valid in the target
                    None => raw.to_string(),
                }
            }
        }
    }

    /// Convert a whole projected row
    pub fn convert_row(
        &self,
        fields: &[&str],
        hints: &[ValueHint],
        encoding: RecordEncoding,
    ) -> Vec<String> {
        fields
            .iter()
            .zip(hints)
            .map(|(raw, hint)| self.convert(raw, encoding, *hint))
            .collect()
    }

    fn convert_text(&self, text: &str, hint: ValueHint) -> String {
        match normalize_timestamp(text, hint) {
            Some(normalized) => self.dialect.quote_literal(&normalized),
            None => self.dialect.quote_literal(text),
        }
    }
}

impl Default for ValueConverter {
    fn default() -> Self {
        Self::new(TargetDialect::mariadb())
    }
}

/// Normalize a timestamp-shaped value to `YYYY-MM-DD HH:MM:SS[.ffffff]`.
///
/// A trailing `+HH`, `+HHMM` or `+HH:MM` zone offset is stripped and a `T`
/// separator becomes a space. Without an offset the value is only rewritten
/// when the column is hinted as a timestamp. Returns `None` when the value is
/// left as it is.
pub fn normalize_timestamp(value: &str, hint: ValueHint) -> Option<String> {
    // Scientific notation such as 1e+10 carries a '+' that is not a zone
    if value.contains(['e', 'E']) {
        return None;
    }

    let body_end = scan_datetime(value.as_bytes())?;
    let (body, zone) = value.split_at(body_end);
    let has_offset = match zone {
        "" => false,
        zone if is_zone_offset(zone) => true,
        _ => return None,
    };
    if !has_offset && hint != ValueHint::Timestamp {
        return None;
    }

    let normalized = format!("{} {}", &body[..10], &body[11..]);
    NaiveDateTime::parse_from_str(&normalized, TIMESTAMP_FORMAT).ok()?;
    Some(normalized)
}

/// Match `YYYY-MM-DD[ T]HH:MM:SS[.f+]` at the start of `bytes`, returning the
/// end offset of the match
fn scan_datetime(bytes: &[u8]) -> Option<usize> {
    const SHAPE: &[u8] = b"dddd-dd-dd?dd:dd:dd";
    if bytes.len() < SHAPE.len() {
        return None;
    }
    for (expected, &actual) in SHAPE.iter().zip(bytes) {
        let ok = match expected {
            b'd' => actual.is_ascii_digit(),
            b'?' => actual == b' ' || actual == b'T',
            other => actual == *other,
        };
        if !ok {
            return None;
        }
    }

    let mut end = SHAPE.len();
    if bytes.get(end) == Some(&b'.') {
        let digits = bytes[end + 1..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits == 0 {
            return None;
        }
        end += 1 + digits;
    }
    Some(end)
}

fn is_zone_offset(zone: &str) -> bool {
    let bytes = zone.as_bytes();
    let digits = |range: std::ops::Range<usize>| bytes[range].iter().all(u8::is_ascii_digit);
    match bytes.len() {
        3 => bytes[0] == b'+' && digits(1..3),
        5 => bytes[0] == b'+' && digits(1..5),
        6 => bytes[0] == b'+' && digits(1..3) && bytes[3] == b':' && digits(4..6),
        _ => false,
    }
}

/// Decode a single-quoted SQL literal (`'...'` or `E'...'`, optionally with a
/// trailing `::type` cast) into its text. Returns `None` for anything else.
pub fn decode_string_literal(raw: &str) -> Option<String> {
    let (escaped, body) = if let Some(rest) = raw.strip_prefix(['E', 'e']) {
        (true, rest.strip_prefix('\'')?)
    } else {
        (false, raw.strip_prefix('\'')?)
    };

    let mut text = String::with_capacity(body.len());
    let mut chars = body.char_indices();
    while let Some((index, c)) = chars.next() {
        match c {
            '\\' if escaped => {
                let (_, next) = chars.next()?;
                text.push(match next {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    'b' => '\u{8}',
                    'f' => '\u{c}',
                    other => other,
                });
            }
            '\'' => {
                let rest = &body[index + 1..];
                if rest.starts_with('\'') {
                    text.push('\'');
                    // second quote of the doubled pair
                    chars.next();
                    continue;
                }
                let rest = rest.trim_start();
                return if rest.is_empty() || rest.starts_with("::") {
                    Some(text)
                } else {
                    None
                };
            }
            other => text.push(other),
        }
    }
    None
}
