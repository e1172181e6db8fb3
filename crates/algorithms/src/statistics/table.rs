//! Result table for zonal statistics
//!
//! One row per (band, zone) pair. Rows are keyed by a dense integer index:
//! with `n` zones, the zone at position `k` of band `b` (1-based) lives at
//! `n * (b - 1) + k`. Rows are sorted by that index, so all zones of band 1
//! come first, in zone order, then band 2, and so on.

use std::collections::BTreeMap;
use std::fmt;

use gridstat_core::{Error, Result};
use serde::Serialize;
use serde::ser::{SerializeMap, SerializeSeq, Serializer};

use super::statistic::Statistic;

/// Row index arithmetic for a fixed number of zones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowKey {
    zone_count: usize,
}

impl RowKey {
    pub fn new(zone_count: usize) -> Self {
        Self { zone_count }
    }

    /// Index of the zone at `offset` in 1-based band `band`
    pub fn index(&self, band: usize, offset: usize) -> usize {
        self.zone_count * (band - 1) + offset
    }

    /// Inverse of [`RowKey::index`]: `(band, offset)`, `None` without zones
    pub fn decode(&self, index: usize) -> Option<(usize, usize)> {
        (self.zone_count > 0).then(|| (index / self.zone_count + 1, index % self.zone_count))
    }
}

/// Statistics of every zone for one band
#[derive(Debug, Clone, PartialEq)]
pub struct BandTable {
    /// 1-based band number
    pub band: usize,
    /// One column per statistic, one value per zone in zone order
    pub columns: Vec<Vec<f64>>,
}

/// Zonal statistics for every (band, zone) pair
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    statistics: Vec<Statistic>,
    index: Vec<usize>,
    bands: Vec<usize>,
    zones: Vec<i64>,
    columns: Vec<Vec<f64>>,
}

impl ResultTable {
    /// Concatenate per-band tables into one table sorted by row index.
    ///
    /// Fails with [`Error::DuplicateRowIndex`] if two parts claim the same
    /// row, which happens when a band is supplied twice.
    pub fn assemble(statistics: &[Statistic], zone_ids: &[i64], parts: Vec<BandTable>) -> Result<Self> {
        let key = RowKey::new(zone_ids.len());
        let mut rows: BTreeMap<usize, (usize, usize)> = BTreeMap::new();

        for (p, part) in parts.iter().enumerate() {
            if part.band == 0 {
                return Err(Error::Algorithm("band numbers start at 1".into()));
            }
            if part.columns.len() != statistics.len()
                || part.columns.iter().any(|c| c.len() != zone_ids.len())
            {
                return Err(Error::Algorithm(format!(
                    "band {} table does not match {} statistic(s) x {} zone(s)",
                    part.band,
                    statistics.len(),
                    zone_ids.len()
                )));
            }
            for offset in 0..zone_ids.len() {
                let index = key.index(part.band, offset);
                if rows.insert(index, (p, offset)).is_some() {
                    return Err(Error::DuplicateRowIndex { index });
                }
            }
        }

        let mut table = ResultTable {
            statistics: statistics.to_vec(),
            index: Vec::with_capacity(rows.len()),
            bands: Vec::with_capacity(rows.len()),
            zones: Vec::with_capacity(rows.len()),
            columns: vec![Vec::with_capacity(rows.len()); statistics.len()],
        };
        for (index, (p, offset)) in rows {
            let part = &parts[p];
            table.index.push(index);
            table.bands.push(part.band);
            table.zones.push(zone_ids[offset]);
            for (s, column) in part.columns.iter().enumerate() {
                table.columns[s].push(column[offset]);
            }
        }
        Ok(table)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Statistic columns, in request order
    pub fn statistics(&self) -> &[Statistic] {
        &self.statistics
    }

    pub fn index(&self) -> &[usize] {
        &self.index
    }

    /// 1-based band number of every row
    pub fn bands(&self) -> &[usize] {
        &self.bands
    }

    /// Zone id of every row
    pub fn zones(&self) -> &[i64] {
        &self.zones
    }

    /// Values of one statistic column
    pub fn column(&self, stat: Statistic) -> Option<&[f64]> {
        let s = self.statistics.iter().position(|&x| x == stat)?;
        Some(&self.columns[s])
    }

    /// Value of `stat` for `zone` in 1-based band `band`
    pub fn get(&self, band: usize, zone: i64, stat: Statistic) -> Option<f64> {
        let column = self.column(stat)?;
        let row = (0..self.len()).find(|&r| self.bands[r] == band && self.zones[r] == zone)?;
        Some(column[row])
    }

    /// Column headers, `index`, `band` and `zone` first
    pub fn headers(&self) -> Vec<&'static str> {
        let mut headers = vec!["index", "band", "zone"];
        headers.extend(self.statistics.iter().map(|s| s.name()));
        headers
    }
}

struct Record<'a> {
    table: &'a ResultTable,
    row: usize,
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let t = self.table;
        let mut map = serializer.serialize_map(Some(3 + t.statistics.len()))?;
        map.serialize_entry("index", &t.index[self.row])?;
        map.serialize_entry("band", &t.bands[self.row])?;
        map.serialize_entry("zone", &t.zones[self.row])?;
        for (s, stat) in t.statistics.iter().enumerate() {
            map.serialize_entry(stat.name(), &t.columns[s][self.row])?;
        }
        map.end()
    }
}

/// Serialized as a list of row records
impl Serialize for ResultTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for row in 0..self.len() {
            seq.serialize_element(&Record { table: self, row })?;
        }
        seq.end()
    }
}

impl fmt::Display for ResultTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for h in self.headers() {
            write!(f, "{h:>12}")?;
        }
        writeln!(f)?;
        for row in 0..self.len() {
            write!(f, "{:>12}{:>12}{:>12}", self.index[row], self.bands[row], self.zones[row])?;
            for column in &self.columns {
                write!(f, "{:>12.4}", column[row])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_key() {
        let key = RowKey::new(3);
        assert_eq!(key.index(1, 0), 0);
        assert_eq!(key.index(2, 1), 4);
        assert_eq!(key.decode(4), Some((2, 1)));
        assert_eq!(key.decode(key.index(5, 2)), Some((5, 2)));
    }

    #[test]
    fn test_row_key_without_zones() {
        assert_eq!(RowKey::new(0).decode(0), None);
        assert_eq!(RowKey::new(0).decode(3), None);
    }

    fn part(band: usize, values: &[f64]) -> BandTable {
        BandTable {
            band,
            columns: vec![values.to_vec()],
        }
    }

    #[test]
    fn test_assemble_orders_by_band_then_zone() {
        let stats = [Statistic::Mean];
        let table = ResultTable::assemble(
            &stats,
            &[10, 20],
            vec![part(2, &[3.0, 4.0]), part(1, &[1.0, 2.0])],
        )
        .unwrap();
        assert_eq!(table.index(), &[0, 1, 2, 3]);
        assert_eq!(table.bands(), &[1, 1, 2, 2]);
        assert_eq!(table.zones(), &[10, 20, 10, 20]);
        assert_eq!(table.column(Statistic::Mean).unwrap(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(table.get(2, 10, Statistic::Mean), Some(3.0));
        assert_eq!(table.get(2, 10, Statistic::Sum), None);
    }

    #[test]
    fn test_assemble_rejects_duplicate_band() {
        let err = ResultTable::assemble(
            &[Statistic::Count],
            &[1],
            vec![part(1, &[1.0]), part(1, &[1.0])],
        )
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateRowIndex { index: 0 }));
    }

    #[test]
    fn test_assemble_rejects_ragged_columns() {
        let err = ResultTable::assemble(&[Statistic::Count], &[1, 2], vec![part(1, &[1.0])]);
        assert!(err.is_err());
    }

    #[test]
    fn test_serialize_records() {
        let table = ResultTable::assemble(
            &[Statistic::Mode, Statistic::Count],
            &[7],
            vec![BandTable {
                band: 1,
                columns: vec![vec![f64::NAN], vec![0.0]],
            }],
        )
        .unwrap();
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"[{"index":0,"band":1,"zone":7,"mode":null,"count":0.0}]"#);
    }

    #[test]
    fn test_display_has_headers() {
        let table = ResultTable::assemble(&[Statistic::Sum], &[1], vec![part(1, &[2.5])]).unwrap();
        let text = table.to_string();
        assert!(text.contains("zone"));
        assert!(text.contains("sum"));
        assert!(text.contains("2.5000"));
    }
}
