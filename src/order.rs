//! Chronological ordering of materialized records.

use chrono::NaiveDateTime;

use crate::error::ParseError;
use crate::record::Record;

/// Records paired with their parsed timestamps, ready to be sorted.
///
/// Every timestamp is parsed up front, so a single unparseable value fails
/// construction instead of surfacing halfway through a sort.
#[derive(Debug, Clone)]
pub struct ByTimestamp {
    keyed: Vec<(NaiveDateTime, Record)>,
}

impl ByTimestamp {
    /// Parse column `index` of every record with `layout`.
    pub fn new(records: Vec<Record>, index: usize, layout: &str) -> Result<Self, ParseError> {
        let keyed = records
            .into_iter()
            .map(|record| Ok((record.parse_time(index, layout)?, record)))
            .collect::<Result<Vec<_>, ParseError>>()?;
        Ok(Self { keyed })
    }

    pub fn len(&self) -> usize {
        self.keyed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyed.is_empty()
    }

    /// Stable ascending sort: records with equal timestamps keep their
    /// relative order.
    pub fn sort(&mut self) {
        self.keyed.sort_by(|a, b| a.0.cmp(&b.0));
    }

    pub fn into_records(self) -> Vec<Record> {
        self.keyed.into_iter().map(|(_, record)| record).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::TIME_LAYOUT;

    fn rec(id: &str, ts: &str) -> Record {
        Record::from([id, ts])
    }

    #[test]
    fn test_sorts_chronologically() {
        let mut bt = ByTimestamp::new(
            vec![
                rec("a", "2020-01-01T00:00:05"),
                rec("b", "2019-12-31T23:59:59"),
                rec("c", "2020-01-01T00:00:01"),
            ],
            1,
            TIME_LAYOUT,
        )
        .unwrap();
        bt.sort();
        let ids: Vec<_> = bt
            .into_records()
            .iter()
            .map(|r| r.value(0).unwrap().to_string())
            .collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }

    #[test]
    fn test_sort_is_stable() {
        let mut bt = ByTimestamp::new(
            vec![
                rec("first", "2020-01-01T00:00:05"),
                rec("early", "2020-01-01T00:00:00"),
                rec("second", "2020-01-01T00:00:05"),
                rec("third", "2020-01-01T00:00:05"),
            ],
            1,
            TIME_LAYOUT,
        )
        .unwrap();
        assert_eq!(bt.len(), 4);
        bt.sort();
        let ids: Vec<_> = bt
            .into_records()
            .iter()
            .map(|r| r.value(0).unwrap().to_string())
            .collect();
        assert_eq!(ids, ["early", "first", "second", "third"]);
    }

    #[test]
    fn test_bad_timestamp_fails_construction() {
        let result = ByTimestamp::new(
            vec![rec("a", "2020-01-01T00:00:05"), rec("b", "yesterday")],
            1,
            TIME_LAYOUT,
        );
        assert!(matches!(result, Err(ParseError::Time { index: 1, .. })));
    }

    #[test]
    fn test_empty() {
        let bt = ByTimestamp::new(Vec::new(), 0, TIME_LAYOUT).unwrap();
        assert!(bt.is_empty());
    }
}
