//! JSON and CSV output of one collection run.
//!
//! Both files hold the same records in the same order. The CSV header is the
//! record type's canonical column list followed by any other key met in the
//! records, in first-seen order, so a zero-record run still gets a header.
use crate::error::CollectError;
use harvest_common::Record;
use serde_json::{Map, Value};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub json: PathBuf,
    pub csv: PathBuf,
}

impl OutputPaths {
    pub fn new(dir: &Path, stem: &str) -> Self {
        Self {
            json: dir.join(format!("{stem}.json")),
            csv: dir.join(format!("{stem}.csv")),
        }
    }
}

/// Write `<dir>/<stem>.json` and `<dir>/<stem>.csv`, replacing old files.
pub fn write_records<R: Record>(
    dir: &Path,
    stem: &str,
    records: &[R],
) -> Result<OutputPaths, CollectError> {
    fs::create_dir_all(dir).map_err(|e| CollectError::io(dir, e))?;
    let paths = OutputPaths::new(dir, stem);

    let rows: Vec<Map<String, Value>> = records
        .iter()
        .map(|r| match serde_json::to_value(r)? {
            Value::Object(map) => Ok(map),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                Ok(map)
            }
        })
        .collect::<Result<_, serde_json::Error>>()?;

    write_json(&paths.json, &rows)?;
    let header = header_for(R::FIELDS, &rows);
    write_csv(&paths.csv, &header, &rows)?;

    tracing::info!(
        target: "writer",
        records = rows.len(),
        json = %paths.json.display(),
        csv = %paths.csv.display(),
        "output.written"
    );
    Ok(paths)
}

/// Pretty-printed JSON document at `path`, creating parent directories.
pub fn write_json_file<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), CollectError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CollectError::io(parent, e))?;
    }
    write_json(path, value)
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), CollectError> {
    let file = File::create(path).map_err(|e| CollectError::io(path, e))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, value)?;
    out.write_all(b"\n").map_err(|e| CollectError::io(path, e))?;
    out.flush().map_err(|e| CollectError::io(path, e))
}

fn header_for(fields: &[&str], rows: &[Map<String, Value>]) -> Vec<String> {
    let mut header: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
    for row in rows {
        for key in row.keys() {
            if !header.iter().any(|h| h == key) {
                header.push(key.clone());
            }
        }
    }
    header
}

fn write_csv(path: &Path, header: &[String], rows: &[Map<String, Value>]) -> Result<(), CollectError> {
    let csv_err = |source| CollectError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer.write_record(header).map_err(csv_err)?;
    for row in rows {
        writer
            .write_record(header.iter().map(|key| cell(row.get(key))))
            .map_err(csv_err)?;
    }
    writer.flush().map_err(|e| CollectError::io(path, e))
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use harvest_common::{RedditPost, TelegramMessage};

    fn post(id: &str) -> RedditPost {
        RedditPost {
            post_id: id.into(),
            subreddit: "worldnews".into(),
            author: "someone".into(),
            date: Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap(),
            title: "Title, with comma".into(),
            text: "line one\nline two".into(),
            score: 10,
            num_comments: 2,
            upvote_ratio: 0.75,
            keyword: "Israel".into(),
            url: String::new(),
            permalink: format!("https://reddit.com/r/worldnews/comments/{id}/"),
            is_self: true,
        }
    }

    #[test]
    fn json_and_csv_hold_the_same_records() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![post("a1"), post("b2"), post("c3")];
        let paths = write_records(dir.path(), "reddit_test", &records).unwrap();

        let json: Vec<Value> =
            serde_json::from_str(&fs::read_to_string(&paths.json).unwrap()).unwrap();
        let json_ids: Vec<&str> = json.iter().map(|v| v["post_id"].as_str().unwrap()).collect();

        let mut reader = csv::Reader::from_path(&paths.csv).unwrap();
        let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(header, RedditPost::FIELDS);
        let csv_ids: Vec<String> = reader
            .records()
            .map(|r| r.unwrap().get(0).unwrap().to_string())
            .collect();

        assert_eq!(json_ids, ["a1", "b2", "c3"]);
        assert_eq!(csv_ids, json_ids);
    }

    #[test]
    fn empty_run_writes_empty_array_and_header() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_records::<RedditPost>(&dir.path().join("nested"), "empty", &[]).unwrap();

        assert_eq!(fs::read_to_string(&paths.json).unwrap().trim(), "[]");
        let csv = fs::read_to_string(&paths.csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], RedditPost::FIELDS.join(","));
    }

    #[test]
    fn nulls_become_empty_cells_and_files_are_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let msg = |id| TelegramMessage {
            channel: "GazaNow".into(),
            message_id: id,
            date: Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap(),
            text: "ok".into(),
            views: None,
            forwards: Some(3),
            replies: 0,
            link: format!("https://t.me/GazaNow/{id}"),
            has_media: false,
        };
        write_records(dir.path(), "tg", &[msg(1), msg(2)]).unwrap();
        let paths = write_records(dir.path(), "tg", &[msg(3)]).unwrap();

        let mut reader = csv::Reader::from_path(&paths.csv).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][1], "3");
        assert_eq!(&rows[0][4], "");
        assert_eq!(&rows[0][5], "3");
        assert_eq!(&rows[0][8], "false");
    }

    #[test]
    fn extra_keys_extend_the_header_and_nested_values_stay_json() {
        let rows = vec![{
            let mut m = Map::new();
            m.insert("post_id".into(), Value::from("x"));
            m.insert("tags".into(), serde_json::json!(["a", "b"]));
            m
        }];
        let header = header_for(&["post_id", "title"], &rows);
        assert_eq!(header, ["post_id", "title", "tags"]);
        assert_eq!(cell(rows[0].get("tags")), r#"["a","b"]"#);
        assert_eq!(cell(rows[0].get("title")), "");
    }
}
