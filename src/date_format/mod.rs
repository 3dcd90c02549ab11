//! Compiles `||`-delimited store date formats into a multi-layout parser/formatter.
//!
//! ```text
//! "strict_date_optional_time||epoch_millis"
//!   → layouts ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d"], epoch = millis
//! ```
pub mod builtin;
pub mod pattern;

use std::fmt::Write as _;

use chrono::format::{Parsed, ParseErrorKind};
use chrono::{DateTime, Datelike, FixedOffset, Offset, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::{DateParseError, DateValueError, SchemaError, ValueShapeError};

pub use pattern::Layout;

/// Years a date can take. Layouts print the year as four digits with no sign.
pub const YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EpochUnit {
    Millis,
    Seconds,
}

/// A compiled format. Immutable once built.
#[derive(Debug, Clone)]
pub struct DateFormat {
    source: String,
    layouts: Vec<Layout>,
    epoch: Option<EpochUnit>,
    /// Index into `layouts`; meaningless when `layouts` is empty.
    marshal: usize,
    prefer_epoch: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// COMPILE
// ————————————————————————————————————————————————————————————————————————————

/// Resolve a named builtin, or take the token as a literal pattern.
fn resolve_token(token: &str) -> &str {
    builtin::lookup(token).unwrap_or(token)
}

pub fn compile(format: &str, preferred: Option<&str>, prefer_epoch: bool) -> Result<DateFormat, SchemaError> {
    let mut epoch = None;
    let mut patterns: Vec<&str> = Vec::new();

    for token in format.split("||").map(str::trim).filter(|t| !t.is_empty()) {
        let unit = match token {
            builtin::EPOCH_MILLIS => Some(EpochUnit::Millis),
            builtin::EPOCH_SECOND => Some(EpochUnit::Seconds),
            _ => None,
        };
        if let Some(unit) = unit {
            if epoch.is_some() {
                return Err(SchemaError::DuplicateEpochMarker { format: format.to_string() });
            }
            epoch = Some(unit);
            continue;
        }
        let pattern = resolve_token(token);
        if patterns.contains(&pattern) {
            return Err(SchemaError::DuplicateDateLayout { format: format.to_string(), layout: pattern.to_string() });
        }
        patterns.push(pattern);
    }

    if patterns.is_empty() && epoch.is_none() {
        return Err(SchemaError::EmptyDateFormat { format: format.to_string() });
    }

    // expansions of different patterns may overlap; the first one wins
    let mut layouts: Vec<Layout> = Vec::new();
    for pattern in &patterns {
        for layout in pattern::expand(pattern)? {
            if !layouts.contains(&layout) {
                layouts.push(layout);
            }
        }
    }

    let mut out = DateFormat { source: format.to_string(), layouts, epoch, marshal: 0, prefer_epoch: false };

    match preferred.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p @ (builtin::EPOCH_MILLIS | builtin::EPOCH_SECOND)) => {
            if out.epoch.is_none() {
                return Err(SchemaError::PreferredFormatNotCompiled {
                    preferred: p.to_string(),
                    compiled: out.layouts().map(str::to_string).collect(),
                });
            }
            out.prefer_epoch = true;
        }
        Some(p) => {
            let wanted = pattern::expand(resolve_token(p))?;
            let first = wanted[0].canonical();
            out.marshal = out.layouts.iter().position(|l| l.canonical() == first).ok_or_else(|| {
                SchemaError::PreferredFormatNotCompiled {
                    preferred: p.to_string(),
                    compiled: out.layouts().map(str::to_string).collect(),
                }
            })?;
        }
        None => {}
    }

    if prefer_epoch {
        if out.epoch.is_some() {
            out.prefer_epoch = true;
        } else {
            tracing::warn!(format, "epoch marshalling preferred but the format has no epoch marker; using string layout");
        }
    }
    if out.layouts.is_empty() {
        out.prefer_epoch = true;
    }

    tracing::debug!(
        format,
        layouts = out.layouts.len(),
        epoch = ?out.epoch,
        marshal = ?out.marshal_layout(),
        prefer_epoch = out.prefer_epoch,
        "compiled date format"
    );
    Ok(out)
}

// ————————————————————————————————————————————————————————————————————————————
// RUNTIME
// ————————————————————————————————————————————————————————————————————————————

impl DateFormat {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Canonical renderings, in parse order.
    pub fn layouts(&self) -> impl Iterator<Item = &str> {
        self.layouts.iter().map(Layout::canonical)
    }

    pub fn epoch(&self) -> Option<EpochUnit> {
        self.epoch
    }

    /// `None` when values marshal as epoch numbers.
    pub fn marshal_layout(&self) -> Option<&str> {
        if self.prefer_epoch {
            return None;
        }
        self.layouts.get(self.marshal).map(Layout::canonical)
    }

    pub fn prefers_epoch(&self) -> bool {
        self.prefer_epoch
    }

    /// First layout that accepts `input` wins.
    pub fn parse_str(&self, input: &str) -> Result<DateTime<FixedOffset>, DateParseError> {
        let mut attempts = Vec::with_capacity(self.layouts.len());
        for layout in &self.layouts {
            match parse_with(layout, input) {
                Ok(dt) => return Ok(dt),
                Err(err) => attempts.push((layout.canonical().to_string(), err)),
            }
        }
        Err(DateParseError { input: input.to_string(), attempts })
    }

    pub fn from_epoch(&self, value: i64) -> Result<DateTime<FixedOffset>, DateValueError> {
        let dt = match self.epoch.unwrap_or(EpochUnit::Millis) {
            EpochUnit::Millis => DateTime::<Utc>::from_timestamp_millis(value),
            EpochUnit::Seconds => DateTime::<Utc>::from_timestamp(value, 0),
        };
        dt.filter(|d| YEARS.contains(&d.year()))
            .map(|d| d.fixed_offset())
            .ok_or(DateValueError::OutOfRange(value))
    }

    pub fn to_epoch(&self, dt: &DateTime<FixedOffset>) -> i64 {
        match self.epoch.unwrap_or(EpochUnit::Millis) {
            EpochUnit::Millis => dt.timestamp_millis(),
            EpochUnit::Seconds => dt.timestamp(),
        }
    }

    /// Render with the marshal layout, ignoring the epoch preference.
    pub fn format(&self, dt: &DateTime<FixedOffset>) -> Result<String, DateValueError> {
        let Some(layout) = self.layouts.get(self.marshal) else {
            return Ok(self.to_epoch(dt).to_string());
        };
        if !YEARS.contains(&dt.year()) {
            return Err(DateValueError::YearOutOfRange(dt.year()));
        }
        let mut out = String::new();
        write!(out, "{}", dt.format_with_items(layout.items().iter()))?;
        Ok(out)
    }

    /// JSON number under epoch preference, JSON string otherwise.
    pub fn marshal(&self, dt: &DateTime<FixedOffset>) -> Result<Value, DateValueError> {
        if self.prefer_epoch {
            return Ok(Value::from(self.to_epoch(dt)));
        }
        self.format(dt).map(Value::String)
    }

    /// Decode raw JSON text: a quoted string goes through the layouts, a bare
    /// integer through the epoch unit.
    pub fn unmarshal(&self, raw: &str) -> Result<DateTime<FixedOffset>, DateValueError> {
        let trimmed = raw.trim();
        if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
            return Ok(self.parse_str(&trimmed[1..trimmed.len() - 1])?);
        }
        match trimmed.parse::<i64>() {
            Ok(n) if self.epoch.is_some() => self.from_epoch(n),
            _ => Err(self.shape_error(trimmed).into()),
        }
    }

    pub fn unmarshal_value(&self, value: &Value) -> Result<DateTime<FixedOffset>, DateValueError> {
        self.unmarshal(&value.to_string())
    }

    fn shape_error(&self, raw: &str) -> ValueShapeError {
        let mut accepted = vec!["date string"];
        if self.epoch.is_some() {
            accepted.push("integer epoch");
        }
        ValueShapeError::new(raw, &accepted, format!("date `{}`", self.source))
    }
}

fn parse_with(layout: &Layout, input: &str) -> Result<DateTime<FixedOffset>, String> {
    let mut parsed = Parsed::new();
    chrono::format::parse(&mut parsed, input, layout.items().iter()).map_err(|e| e.to_string())?;
    resolve(parsed)
}

/// Missing date parts default to 1970-01-01, missing time to midnight, missing offset to UTC.
fn resolve(mut parsed: Parsed) -> Result<DateTime<FixedOffset>, String> {
    let not_enough = |e: &chrono::format::ParseError| e.kind() == ParseErrorKind::NotEnough;

    // setters refuse to overwrite a parsed value, so these only fill gaps
    let date = match parsed.to_naive_date() {
        Err(e) if not_enough(&e) => {
            let _ = parsed.set_month(1);
            let _ = parsed.set_day(1);
            match parsed.to_naive_date() {
                Err(e) if not_enough(&e) => {
                    let _ = parsed.set_year(1970);
                    parsed.to_naive_date()
                }
                other => other,
            }
        }
        other => other,
    }
    .map_err(|e| e.to_string())?;

    let time = match parsed.to_naive_time() {
        Err(e) if not_enough(&e) => {
            let _ = parsed.set_hour(0);
            let _ = parsed.set_minute(0);
            parsed.to_naive_time()
        }
        other => other,
    }
    .map_err(|e| e.to_string())?;

    let offset = match parsed.to_fixed_offset() {
        Err(e) if not_enough(&e) => Ok(Utc.fix()),
        other => other,
    }
    .map_err(|e| e.to_string())?;

    date.and_time(time)
        .and_local_timezone(offset)
        .single()
        .ok_or_else(|| "local time does not exist at this offset".to_string())
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeDelta, TimeZone};

    fn layouts(f: &DateFormat) -> Vec<&str> {
        f.layouts().collect()
    }

    #[test]
    fn default_format() {
        let f = compile(builtin::DEFAULT_FORMAT, None, false).unwrap();
        assert_eq!(layouts(&f), vec!["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d"]);
        assert_eq!(f.epoch(), Some(EpochUnit::Millis));
        assert_eq!(f.marshal_layout(), Some("%Y-%m-%dT%H:%M:%S%.f%:z"));
    }

    #[test]
    fn duplicate_tokens_and_epochs_are_schema_errors() {
        assert!(matches!(
            compile("strict_date||yyyy-MM-dd", None, false),
            Err(SchemaError::DuplicateDateLayout { .. })
        ));
        assert!(matches!(
            compile("epoch_millis||epoch_second", None, false),
            Err(SchemaError::DuplicateEpochMarker { .. })
        ));
        assert!(matches!(compile("||", None, false), Err(SchemaError::EmptyDateFormat { .. })));
    }

    #[test]
    fn overlapping_expansions_are_merged() {
        let f = compile("strict_date_optional_time||strict_date", None, false).unwrap();
        assert_eq!(f.layouts().count(), 2);
    }

    #[test]
    fn preferred_format_must_be_compiled() {
        let f = compile("yyyy-MM-dd||yyyy/MM/dd", Some("yyyy/MM/dd"), false).unwrap();
        assert_eq!(f.marshal_layout(), Some("%Y/%m/%d"));

        let f = compile(builtin::DEFAULT_FORMAT, Some("strict_date"), false).unwrap();
        assert_eq!(f.marshal_layout(), Some("%Y-%m-%d"));

        let err = compile("yyyy-MM-dd", Some("yyyy/MM/dd"), false).unwrap_err();
        assert!(matches!(err, SchemaError::PreferredFormatNotCompiled { .. }));
    }

    #[test]
    fn first_matching_layout_wins_and_gaps_default() {
        let f = compile(builtin::DEFAULT_FORMAT, None, false).unwrap();
        let d = f.parse_str("2022-10-20").unwrap();
        assert_eq!(d, Utc.with_ymd_and_hms(2022, 10, 20, 0, 0, 0).unwrap().fixed_offset());

        let d = f.parse_str("2022-10-20T16:22:46.123+09:00").unwrap();
        assert_eq!(d.offset().local_minus_utc(), 9 * 3600);
        assert_eq!(d.timestamp_millis(), 1666250566123);

        let f = compile("HH:mm", None, false).unwrap();
        let d = f.parse_str("07:30").unwrap();
        assert_eq!(d.date_naive(), NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());
    }

    #[test]
    fn total_failure_lists_every_layout() {
        let f = compile(builtin::DEFAULT_FORMAT, None, false).unwrap();
        let err = f.parse_str("yesterday").unwrap_err();
        assert_eq!(err.attempts.len(), 2);
        assert_eq!(err.attempts[1].0, "%Y-%m-%d");
    }

    #[test]
    fn unmarshal_shapes() {
        let f = compile(builtin::DEFAULT_FORMAT, None, false).unwrap();
        assert_eq!(f.unmarshal(" 1666282966123 ").unwrap().timestamp_millis(), 1666282966123);
        assert!(f.unmarshal("\"2022-10-20\"").is_ok());
        assert!(matches!(f.unmarshal("1.5"), Err(DateValueError::Shape(_))));
        assert!(matches!(f.unmarshal("\"nope\""), Err(DateValueError::Parse(_))));

        let no_epoch = compile("strict_date", None, false).unwrap();
        let Err(DateValueError::Shape(err)) = no_epoch.unmarshal("12") else { panic!("shape error") };
        assert_eq!(err.raw, "12");
        assert_eq!(err.accepted, vec!["date string"]);

        let secs = compile("epoch_second", None, false).unwrap();
        assert_eq!(secs.unmarshal("60").unwrap().timestamp(), 60);
        assert!(secs.prefers_epoch());
    }

    #[test]
    fn epoch_preference_needs_a_marker() {
        let f = compile(builtin::DEFAULT_FORMAT, None, true).unwrap();
        assert!(f.prefers_epoch());
        let dt = f.from_epoch(1666282966123).unwrap();
        assert_eq!(f.marshal(&dt).unwrap(), Value::from(1666282966123i64));

        let f = compile("strict_date", None, true).unwrap();
        assert!(!f.prefers_epoch());
    }

    #[test]
    fn marshal_unmarshal_is_stable_over_a_sweep() {
        let formats = [
            compile(builtin::DEFAULT_FORMAT, None, false).unwrap(),
            compile("yyyy-MM-dd'T'HH:mm:ss.SSSZ||epoch_millis", None, false).unwrap(),
            compile("basic_date_time", None, false).unwrap(),
            compile("strict_date_optional_time_nanos", None, false).unwrap(),
            compile(builtin::DEFAULT_FORMAT, None, true).unwrap(),
            compile("date_optional_time", None, false).unwrap(),
        ];
        let millis = [
            MIN_MILLIS,
            MIN_MILLIS + 1,
            0i64,
            1,
            -1,
            999,
            86_399_999,
            218_964_089_023,
            1_666_282_966_123,
            4_102_444_800_000,
            MAX_MILLIS - 999,
            MAX_MILLIS,
        ];
        let nanos = [0i64, 1, 999, 123_000_000, 218_964_089, 999_999_999];

        for f in &formats {
            for ms in millis {
                for ns in nanos {
                    let dt = DateTime::from_timestamp_millis(ms).unwrap().fixed_offset() + TimeDelta::nanoseconds(ns);
                    if dt.year() > *YEARS.end() {
                        continue;
                    }
                    let first = f.marshal(&dt).unwrap();
                    let back = f.unmarshal_value(&first).unwrap_or_else(|e| panic!("{} {first}: {e}", f.source()));
                    let second = f.marshal(&back).unwrap();
                    assert_eq!(first, second, "{} at {ms}ms+{ns}ns", f.source());
                }
            }
        }
    }

    /// 0000-01-01T00:00:00Z and 9999-12-31T23:59:59.999Z.
    const MIN_MILLIS: i64 = -62_167_219_200_000;
    const MAX_MILLIS: i64 = 253_402_300_799_999;

    #[test]
    fn years_outside_four_digits_are_rejected() {
        let f = compile("basic_date_time||epoch_millis", None, false).unwrap();
        let past_end = DateTime::from_timestamp_millis(MAX_MILLIS + 1).unwrap().fixed_offset();
        assert_eq!(f.marshal(&past_end), Err(DateValueError::YearOutOfRange(10000)));
        let before_start = DateTime::from_timestamp_millis(MIN_MILLIS - 1).unwrap().fixed_offset();
        assert_eq!(f.format(&before_start), Err(DateValueError::YearOutOfRange(-1)));

        assert_eq!(f.unmarshal("253402300800000"), Err(DateValueError::OutOfRange(253_402_300_800_000)));
        assert_eq!(f.unmarshal("-62167219200001"), Err(DateValueError::OutOfRange(-62_167_219_200_001)));
        let edge = f.unmarshal(&MAX_MILLIS.to_string()).unwrap();
        assert_eq!(f.marshal(&edge).unwrap(), Value::from("99991231T235959.999Z"));

        let epoch_only = compile("epoch_millis", None, false).unwrap();
        assert_eq!(epoch_only.marshal(&past_end).unwrap(), Value::from(MAX_MILLIS + 1));
    }
}
