use std::fmt;

/// The network-wide result of one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkValue {
    /// Every agent that resolved a value resolved this one.
    Agreed(i64),
    /// Agents disagree; `max` is the largest resolved value.
    Split { max: i64 },
    /// Empty roster, or no agent resolved a value.
    NoData,
}

impl NetworkValue {
    /// Folds per-agent results. Agents without a value are left out.
    pub fn from_resolved<I>(resolved: I) -> Self
    where
        I: IntoIterator<Item = Option<i64>>,
    {
        let mut values = resolved.into_iter().flatten();
        let Some(first) = values.next() else {
            return NetworkValue::NoData;
        };

        let (agreed, max) = values.fold((true, first), |(agreed, max), v| {
            (agreed && v == first, max.max(v))
        });
        if agreed {
            NetworkValue::Agreed(first)
        } else {
            NetworkValue::Split { max }
        }
    }

    /// The value to report, if there is one.
    pub fn value(&self) -> Option<i64> {
        match self {
            NetworkValue::Agreed(v) => Some(*v),
            NetworkValue::Split { max } => Some(*max),
            NetworkValue::NoData => None,
        }
    }

    pub fn is_agreed(&self) -> bool {
        matches!(self, NetworkValue::Agreed(_))
    }
}

impl fmt::Display for NetworkValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkValue::Agreed(v) => write!(f, "{v}"),
            NetworkValue::Split { max } => write!(f, "{max} (agents disagree)"),
            NetworkValue::NoData => f.write_str("no data"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unanimous_values_agree() {
        let v = NetworkValue::from_resolved([Some(10), None, Some(10)]);
        assert_eq!(v, NetworkValue::Agreed(10));
        assert_eq!(v.value(), Some(10));
    }

    #[test]
    fn test_disagreement_reports_max() {
        let v = NetworkValue::from_resolved([Some(10), Some(99), Some(10)]);
        assert_eq!(v, NetworkValue::Split { max: 99 });
        assert!(!v.is_agreed());
    }

    #[test]
    fn test_nothing_resolved_is_no_data() {
        assert_eq!(NetworkValue::from_resolved([None, None]), NetworkValue::NoData);
        assert_eq!(NetworkValue::from_resolved(Vec::new()), NetworkValue::NoData);
        assert_eq!(NetworkValue::NoData.to_string(), "no data");
    }
}
