//! Date leaves bound to a compiled [`DateFormat`].
//!
//! ```ignore
//! es_typegen::date_layout!(pub BirthdayLayout, "yyyy-MM-dd||epoch_millis", None, false);
//! pub type Birthday = es_typegen::estype::Date<BirthdayLayout>;
//! ```
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::date_format::DateFormat;

/// Supplies the compiled format of a date type. Implemented by marker types.
pub trait DateLayout {
    fn format() -> &'static DateFormat;
}

/// Declare a [`DateLayout`] marker whose format is compiled on first use.
///
/// Arguments: visibility and name, format string, preferred format, epoch preference.
#[macro_export]
macro_rules! date_layout {
    ($vis:vis $name:ident, $format:expr, $preferred:expr, $prefer_epoch:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis struct $name;

        impl $crate::estype::DateLayout for $name {
            fn format() -> &'static $crate::date_format::DateFormat {
                static FORMAT: $crate::once_cell::sync::Lazy<$crate::date_format::DateFormat> =
                    $crate::once_cell::sync::Lazy::new(|| {
                        $crate::date_format::compile($format, $preferred, $prefer_epoch)
                            .expect(concat!("invalid date format for ", stringify!($name)))
                    });
                &FORMAT
            }
        }
    };
}

date_layout!(pub StrictDateOptionalTimeEpochMillisLayout, "strict_date_optional_time||epoch_millis", None, false);
date_layout!(pub StrictDateOptionalTimeNanosEpochMillisLayout, "strict_date_optional_time_nanos||epoch_millis", None, false);
date_layout!(pub EpochMillisLayout, "epoch_millis", None, true);
date_layout!(pub EpochSecondLayout, "epoch_second", None, true);

/// Leaf type of a `date` field without a `format`.
pub type StrictDateOptionalTimeEpochMillis = Date<StrictDateOptionalTimeEpochMillisLayout>;
/// Leaf type of a `date_nanos` field without a `format`.
pub type StrictDateOptionalTimeNanosEpochMillis = Date<StrictDateOptionalTimeNanosEpochMillisLayout>;
pub type EpochMillis = Date<EpochMillisLayout>;
pub type EpochSecond = Date<EpochSecondLayout>;

pub struct Date<L> {
    inner: DateTime<FixedOffset>,
    layout: PhantomData<fn() -> L>,
}

impl<L> Date<L> {
    pub fn new(inner: DateTime<FixedOffset>) -> Self {
        Date { inner, layout: PhantomData }
    }

    pub fn get(&self) -> DateTime<FixedOffset> {
        self.inner
    }
}

impl<L> From<DateTime<FixedOffset>> for Date<L> {
    fn from(inner: DateTime<FixedOffset>) -> Self {
        Date::new(inner)
    }
}

impl<L> From<Date<L>> for DateTime<FixedOffset> {
    fn from(d: Date<L>) -> Self {
        d.inner
    }
}

/// The Unix epoch, UTC.
impl<L> Default for Date<L> {
    fn default() -> Self {
        Date::new(DateTime::<Utc>::default().fixed_offset())
    }
}

impl<L> Clone for Date<L> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<L> Copy for Date<L> {}

impl<L> PartialEq for Date<L> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<L> Eq for Date<L> {}

impl<L> PartialOrd for Date<L> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<L> Ord for Date<L> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}

impl<L> Hash for Date<L> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl<L> fmt::Debug for Date<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Date").field(&self.inner).finish()
    }
}

impl<L: DateLayout> fmt::Display for Date<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let format = L::format();
        if format.prefers_epoch() {
            return write!(f, "{}", format.to_epoch(&self.inner));
        }
        f.write_str(&format.format(&self.inner).map_err(|_| fmt::Error)?)
    }
}

impl<L: DateLayout> Serialize for Date<L> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        L::format()
            .marshal(&self.inner)
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de, L: DateLayout> Deserialize<'de> for Date<L> {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(d)?;
        L::format().unmarshal_value(&raw).map(Date::new).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    crate::date_layout!(SlashLayout, "yyyy/MM/dd||strict_date", Some("strict_date"), false);

    #[test]
    fn builtin_default_round_trip() {
        let d: StrictDateOptionalTimeEpochMillis = serde_json::from_value(json!(1666282966123i64)).unwrap();
        assert_eq!(serde_json::to_value(d).unwrap(), json!("2022-10-20T16:22:46.123Z"));
        let back: StrictDateOptionalTimeEpochMillis = serde_json::from_value(json!("2022-10-20T16:22:46.123Z")).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn epoch_types_encode_numbers() {
        let d: EpochSecond = serde_json::from_value(json!(60)).unwrap();
        assert_eq!(serde_json::to_value(d).unwrap(), json!(60));
        assert_eq!(d.to_string(), "60");
        assert!(serde_json::from_value::<EpochMillis>(json!("2022-10-20")).is_err());
    }

    #[test]
    fn custom_layout_marshals_preferred() {
        let d: Date<SlashLayout> = serde_json::from_value(json!("2022/10/20")).unwrap();
        assert_eq!(serde_json::to_value(d).unwrap(), json!("2022-10-20"));
        assert!(serde_json::from_value::<Date<SlashLayout>>(json!(0)).is_err());
    }

    #[test]
    fn default_is_unix_epoch() {
        assert_eq!(StrictDateOptionalTimeEpochMillis::default().get().timestamp(), 0);
    }
}
