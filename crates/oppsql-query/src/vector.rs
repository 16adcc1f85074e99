use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::str::FromStr;

use rusqlite::{params_from_iter, Connection};
use serde::Serialize;
use tracing::debug;

use crate::error::{QueryError, Result};

/// A run attribute (`runattr.attrName`) to group or filter samples by.
///
/// With no values every run is kept and the attribute value is reported on
/// each sample. With values only runs whose attribute is one of them are
/// kept. A single value pins the attribute, so it is not reported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttrFilter {
    pub name: String,
    pub values: Vec<String>,
}

impl AttrFilter {
    /// Group by `name` without filtering.
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }

    /// Keep runs whose `name` attribute is one of `values`.
    pub fn one_of<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether samples carry this attribute's value.
    pub fn is_reported(&self) -> bool {
        self.values.len() != 1
    }
}

/// Parses `NAME` or `NAME=V1,V2,...`.
impl FromStr for AttrFilter {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || QueryError::InvalidFilter(s.to_string());
        let (name, values) = match s.split_once('=') {
            None => (s, Vec::new()),
            Some((name, list)) => {
                let values: Vec<String> = list.split(',').map(str::to_string).collect();
                if values.iter().any(String::is_empty) {
                    return Err(invalid());
                }
                (name, values)
            }
        };
        if name.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            name: name.to_string(),
            values,
        })
    }
}

/// One recorded value of an output vector.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VectorSample {
    pub db_id: i64,
    pub run_name: String,
    pub module_name: String,
    pub vector_name: String,
    pub event_number: i64,
    /// Simulation time in seconds: `simtimeRaw * 10^simtimeExp`.
    pub simtime: f64,
    pub value: f64,
    /// Values of the reported grouping attributes of the sample's run.
    pub attrs: BTreeMap<String, String>,
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Builds the sample query and its positional arguments, in order.
fn samples_query<S: AsRef<str>>(vectors: &[S], by: &[AttrFilter]) -> (String, Vec<String>) {
    let mut sql = String::from(
        "SELECT v.\"dbId\", r.\"runName\", v.\"moduleName\", v.\"vectorName\", \
         d.\"eventNumber\", d.\"simtimeRaw\", r.\"simtimeExp\", d.\"value\"",
    );
    for (i, filter) in by.iter().enumerate() {
        if filter.is_reported() {
            let _ = write!(sql, ", a{i}.\"attrValue\"");
        }
    }
    sql.push_str(
        " FROM \"vectordata\" AS d \
         JOIN \"vector\" AS v ON v.\"dbId\" = d.\"dbId\" AND v.\"vectorId\" = d.\"vectorId\" \
         JOIN \"run\" AS r ON r.\"dbId\" = v.\"dbId\" AND r.\"runId\" = v.\"runId\"",
    );

    let mut args = Vec::new();
    for (i, filter) in by.iter().enumerate() {
        let _ = write!(
            sql,
            " JOIN \"runattr\" AS a{i} ON a{i}.\"dbId\" = r.\"dbId\" \
             AND a{i}.\"runId\" = r.\"runId\" AND a{i}.\"attrName\" = ?"
        );
        args.push(filter.name.clone());
        if !filter.values.is_empty() {
            let _ = write!(
                sql,
                " AND a{i}.\"attrValue\" IN ({})",
                placeholders(filter.values.len())
            );
            args.extend(filter.values.iter().cloned());
        }
    }

    let _ = write!(
        sql,
        " WHERE v.\"vectorName\" IN ({}) ORDER BY v.\"dbId\", v.\"vectorId\", d.\"eventNumber\"",
        placeholders(vectors.len())
    );
    args.extend(vectors.iter().map(|v| v.as_ref().to_string()));
    (sql, args)
}

/// All samples of the vectors named in `vectors`, across runs and modules,
/// restricted and annotated by the run attributes in `by`.
pub fn vector_samples<S: AsRef<str>>(
    conn: &Connection,
    vectors: &[S],
    by: &[AttrFilter],
) -> Result<Vec<VectorSample>> {
    if vectors.is_empty() {
        return Ok(Vec::new());
    }
    let reported: Vec<&str> = by
        .iter()
        .filter(|f| f.is_reported())
        .map(|f| f.name.as_str())
        .collect();

    let (sql, args) = samples_query(vectors, by);
    let mut stmt = conn.prepare(&sql)?;
    let samples = stmt
        .query_map(params_from_iter(args.iter()), |row| {
            let raw: i64 = row.get(5)?;
            let exp: i32 = row.get(6)?;
            let mut attrs = BTreeMap::new();
            for (k, name) in reported.iter().enumerate() {
                attrs.insert(name.to_string(), row.get(8 + k)?);
            }
            Ok(VectorSample {
                db_id: row.get(0)?,
                run_name: row.get(1)?,
                module_name: row.get(2)?,
                vector_name: row.get(3)?,
                event_number: row.get(4)?,
                simtime: simtime(raw, exp),
                value: row.get(7)?,
                attrs,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    debug!(vectors = vectors.len(), filters = by.len(), samples = samples.len(), "loaded vectors");
    Ok(samples)
}

/// Splits samples by their grouping attribute values.
pub fn group_by_attrs(
    samples: Vec<VectorSample>,
) -> BTreeMap<BTreeMap<String, String>, Vec<VectorSample>> {
    let mut groups: BTreeMap<_, Vec<_>> = BTreeMap::new();
    for sample in samples {
        groups.entry(sample.attrs.clone()).or_default().push(sample);
    }
    groups
}

fn simtime(raw: i64, exp: i32) -> f64 {
    // Dividing keeps results like 1500 * 10^-3 exact.
    if exp >= 0 {
        raw as f64 * 10f64.powi(exp)
    } else {
        raw as f64 / 10f64.powi(-exp)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use oppsql_merge::{MergeConfig, Merger, SourceFile};

    use super::*;

    const SCHEMA: &str = "
        CREATE TABLE run (runId INTEGER PRIMARY KEY, runName TEXT NOT NULL, simtimeExp INTEGER NOT NULL);
        CREATE TABLE runattr (runId INTEGER NOT NULL, attrName TEXT NOT NULL, attrValue TEXT NOT NULL);
        CREATE TABLE vector (vectorId INTEGER PRIMARY KEY, runId INTEGER NOT NULL, moduleName TEXT NOT NULL, vectorName TEXT NOT NULL);
        CREATE TABLE vectordata (vectorId INTEGER NOT NULL, eventNumber INTEGER NOT NULL, simtimeRaw INTEGER NOT NULL, value REAL NOT NULL);";

    fn vec_file(dir: &Path, file: &str, config: &str, repetition: u32, vector_rows: &str) -> SourceFile {
        let path = dir.join(file);
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute_batch(&format!(
            "INSERT INTO run VALUES (1, '{config}-{repetition}', -3);
             INSERT INTO runattr VALUES (1, 'configname', '{config}'), (1, 'repetition', '{repetition}');"
        ))
        .unwrap();
        conn.execute_batch(vector_rows).unwrap();
        SourceFile::from_path(path).unwrap()
    }

    /// Three runs: General #0 and #1, Fast #0.
    fn merged() -> (tempfile::TempDir, Merger) {
        let dir = tempfile::tempdir().unwrap();
        let a = vec_file(
            dir.path(),
            "A.vec",
            "General",
            0,
            "INSERT INTO vector VALUES (1, 1, 'net.host', 'rtt'), (2, 1, 'net.host', 'jitter');
             INSERT INTO vectordata VALUES (1, 5, 1000, 0.25), (1, 9, 2500, 0.5), (2, 5, 1000, 7.0);",
        );
        let b = vec_file(
            dir.path(),
            "B.vec",
            "General",
            1,
            "INSERT INTO vector VALUES (1, 1, 'net.router', 'rtt');
             INSERT INTO vectordata VALUES (1, 3, 500, 1.0);",
        );
        let c = vec_file(
            dir.path(),
            "C.vec",
            "Fast",
            0,
            "INSERT INTO vector VALUES (1, 1, 'net.host', 'rtt');
             INSERT INTO vectordata VALUES (1, 4, 100, 0.1);",
        );
        let mut merger = Merger::new(Connection::open_in_memory().unwrap(), MergeConfig::default()).unwrap();
        merger.merge_all(&[a, b, c]).unwrap();
        (dir, merger)
    }

    #[test]
    fn simtime_scaling() {
        assert_eq!(simtime(1500, -3), 1.5);
        assert_eq!(simtime(2, 0), 2.0);
    }

    #[test]
    fn samples_from_merged_database() {
        let (_dir, merger) = merged();
        let samples = vector_samples(merger.connection(), &["rtt"], &[]).unwrap();
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0].db_id, 1);
        assert_eq!(samples[0].run_name, "General-0");
        assert_eq!(samples[0].vector_name, "rtt");
        assert_eq!(samples[0].simtime, 1.0);
        assert_eq!(samples[1].event_number, 9);
        assert_eq!(samples[1].simtime, 2.5);
        assert_eq!(samples[2].db_id, 2);
        assert_eq!(samples[2].module_name, "net.router");
        assert_eq!(samples[2].value, 1.0);
        assert!(samples.iter().all(|s| s.attrs.is_empty()));
    }

    #[test]
    fn several_vectors() {
        let (_dir, merger) = merged();
        let samples = vector_samples(merger.connection(), &["rtt", "jitter"], &[]).unwrap();
        assert_eq!(samples.len(), 5);
        let jitter: Vec<f64> = samples
            .iter()
            .filter(|s| s.vector_name == "jitter")
            .map(|s| s.value)
            .collect();
        assert_eq!(jitter, vec![7.0]);
    }

    #[test]
    fn group_by_attribute() {
        let (_dir, merger) = merged();
        let samples =
            vector_samples(merger.connection(), &["rtt"], &[AttrFilter::group("configname")]).unwrap();
        assert_eq!(samples.len(), 4);

        let groups = group_by_attrs(samples);
        let sizes: Vec<(String, usize)> = groups
            .iter()
            .map(|(key, group)| (key["configname"].clone(), group.len()))
            .collect();
        assert_eq!(sizes, vec![("Fast".to_string(), 1), ("General".to_string(), 3)]);
    }

    #[test]
    fn single_value_filter_is_not_reported() {
        let (_dir, merger) = merged();
        let samples = vector_samples(
            merger.connection(),
            &["rtt"],
            &[AttrFilter::one_of("configname", ["General"]), AttrFilter::group("repetition")],
        )
        .unwrap();
        assert_eq!(samples.len(), 3);
        for s in &samples {
            assert!(!s.attrs.contains_key("configname"));
        }
        let reps: Vec<&str> = samples.iter().map(|s| s.attrs["repetition"].as_str()).collect();
        assert_eq!(reps, vec!["0", "0", "1"]);
    }

    #[test]
    fn value_list_filter() {
        let (_dir, merger) = merged();
        let samples = vector_samples(
            merger.connection(),
            &["rtt"],
            &[AttrFilter::one_of("repetition", ["0", "7"])],
        )
        .unwrap();
        let runs: Vec<&str> = samples.iter().map(|s| s.run_name.as_str()).collect();
        assert_eq!(runs, vec!["General-0", "General-0", "Fast-0"]);
        assert!(samples.iter().all(|s| s.attrs["repetition"] == "0"));
    }

    #[test]
    fn unknown_attribute_matches_nothing() {
        let (_dir, merger) = merged();
        let samples =
            vector_samples(merger.connection(), &["rtt"], &[AttrFilter::group("seedset")]).unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn no_vector_names() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(vector_samples::<&str>(&conn, &[], &[]).unwrap().is_empty());
    }

    #[test]
    fn parse_filters() {
        assert_eq!("configname".parse::<AttrFilter>().unwrap(), AttrFilter::group("configname"));
        assert_eq!(
            "repetition=0,1".parse::<AttrFilter>().unwrap(),
            AttrFilter::one_of("repetition", ["0", "1"])
        );
        assert!(matches!("=x".parse::<AttrFilter>(), Err(QueryError::InvalidFilter(_))));
        assert!(matches!("a=".parse::<AttrFilter>(), Err(QueryError::InvalidFilter(_))));
        assert!(matches!("a=x,,y".parse::<AttrFilter>(), Err(QueryError::InvalidFilter(_))));
    }
}
