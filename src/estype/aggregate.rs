//! Pre-aggregated metric leaves.
use std::fmt;

use serde::{Deserialize, Serialize};

/// One sub-field of an `aggregate_metric_double` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Min,
    Max,
    Sum,
    ValueCount,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Metric::Min, Metric::Max, Metric::Sum, Metric::ValueCount];

    pub fn parse(name: &str) -> Option<Metric> {
        match name {
            "min" => Some(Metric::Min),
            "max" => Some(Metric::Max),
            "sum" => Some(Metric::Sum),
            "value_count" => Some(Metric::ValueCount),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Min => "min",
            Metric::Max => "max",
            Metric::Sum => "sum",
            Metric::ValueCount => "value_count",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All four metrics; the ones a mapping does not declare stay `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetricDouble {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partial_metrics_round_trip() {
        let raw = json!({ "min": 1.0, "value_count": 3 });
        let agg: AggregateMetricDouble = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(agg.max, None);
        assert_eq!(serde_json::to_value(agg).unwrap(), raw);
    }

    #[test]
    fn metric_names() {
        for m in Metric::ALL {
            assert_eq!(Metric::parse(m.as_str()), Some(m));
        }
        assert_eq!(Metric::parse("avg"), None);
    }
}
