use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use polars::prelude::*;
use rayon::prelude::*;
use tracing::{debug, info, trace};

use crate::domain::ViewerError;
use crate::record::{Record, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    CSV,
    PARQUET,
    ARROW,
    JSON,
    NDJSON,
}

#[derive(Debug)]
pub struct FileInfo {
    pub path: PathBuf,
    pub file_size: u64,
    pub file_type: FileType,
}

/// A loaded export, ready to be handed to a list.
#[derive(Debug)]
pub struct Dataset {
    pub name: String,
    pub records: Vec<Option<Record>>,
    /// Dotted paths of every leaf column, in schema order.
    pub paths: Vec<String>,
}

pub fn load(path: PathBuf) -> Result<Dataset, ViewerError> {
    let file_info = get_file_info(path)?;
    debug!(
        "Loading {:?} ({} bytes) as {:?}",
        file_info.path, file_info.file_size, file_info.file_type
    );
    let start_time = Instant::now();

    let df = match file_info.file_type {
        FileType::CSV => load_csv(&file_info.path)?.collect()?,
        FileType::PARQUET => load_parquet(&file_info.path)?.collect()?,
        FileType::ARROW => load_arrow(&file_info.path)?.collect()?,
        FileType::JSON => load_json(&file_info.path, JsonFormat::Json)?,
        FileType::NDJSON => load_json(&file_info.path, JsonFormat::JsonLines)?,
    };

    let name = file_info
        .path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("???")
        .to_string();
    let dataset = from_dataframe(name, &df)?;

    info!(
        "Loading {} records took {}ms ...",
        dataset.records.len(),
        start_time.elapsed().as_millis()
    );
    Ok(dataset)
}

/// Converts every column into per row values. Each column is converted in its own
/// rayon task, rows are assembled afterwards.
pub fn from_dataframe(name: String, df: &DataFrame) -> Result<Dataset, ViewerError> {
    let columns: Result<Vec<(String, Vec<Value>)>, PolarsError> = df
        .get_columns()
        .par_iter()
        .map(|column| {
            let series = column.as_materialized_series();
            Ok((series.name().to_string(), column_values(series)?))
        })
        .collect();
    let columns = columns?;

    let mut paths = Vec::new();
    for column in df.get_columns() {
        collect_paths(column.name().as_str(), column.dtype(), &mut paths);
    }

    let records = (0..df.height())
        .map(|ridx| {
            let mut record = Record::new();
            for (name, values) in columns.iter() {
                record.insert(name.clone(), values[ridx].clone());
            }
            if record.is_empty() { None } else { Some(record) }
        })
        .collect::<Vec<_>>();

    trace!(
        "Built {} records with paths {:?}",
        records.len(),
        paths
    );
    Ok(Dataset {
        name,
        records,
        paths,
    })
}

fn column_values(series: &Series) -> Result<Vec<Value>, PolarsError> {
    match series.dtype() {
        DataType::Struct(_) => {
            let fields = series.struct_()?.fields_as_series();
            let children = fields
                .iter()
                .map(|field| Ok((field.name().to_string(), column_values(field)?)))
                .collect::<Result<Vec<(String, Vec<Value>)>, PolarsError>>()?;
            let nulls = series.is_null();
            Ok((&nulls)
                .into_iter()
                .enumerate()
                .map(|(ridx, is_null)| {
                    if is_null.unwrap_or(false) {
                        Value::Null
                    } else {
                        Value::Map(
                            children
                                .iter()
                                .map(|(name, values)| (name.clone(), values[ridx].clone()))
                                .collect(),
                        )
                    }
                })
                .collect())
        }
        DataType::List(_) => (0..series.len())
            .map(|ridx| {
                Ok(match series.get(ridx)? {
                    AnyValue::Null => Value::Null,
                    value => Value::Text(value.to_string()),
                })
            })
            .collect(),
        _ => {
            let col = series.cast(&DataType::String)?;
            let strings = col.str()?;
            Ok(strings
                .into_iter()
                .map(|value| match value {
                    Some(s) => Value::Text(s.replace("\r\n", " ↵ ").replace('\n', " ↵ ")),
                    None => Value::Null,
                })
                .collect())
        }
    }
}

fn collect_paths(prefix: &str, dtype: &DataType, out: &mut Vec<String>) {
    match dtype {
        DataType::Struct(fields) => {
            for field in fields.iter() {
                collect_paths(&format!("{prefix}.{}", field.name()), field.dtype(), out);
            }
        }
        _ => out.push(prefix.to_string()),
    }
}

pub fn detect_file_type(path: &Path) -> Result<FileType, ViewerError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        Some("JSON") => Ok(FileType::JSON),
        Some("NDJSON") | Some("JSONL") => Ok(FileType::NDJSON),
        _ => Err(ViewerError::UnknownFileType),
    }
}

fn get_file_info(path: PathBuf) -> Result<FileInfo, ViewerError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ViewerError::FileNotFound,
        ErrorKind::PermissionDenied => ViewerError::PermissionDenied,
        _ => ViewerError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(ViewerError::LoadingFailed("Not a file!".into()));
    }

    let file_size = metadata.len();
    let file_type = detect_file_type(&path)?;

    Ok(FileInfo {
        path,
        file_size,
        file_type,
    })
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}

fn load_json(path: &Path, format: JsonFormat) -> Result<DataFrame, ViewerError> {
    let file = File::open(path)?;
    Ok(JsonReader::new(file).with_json_format(format).finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::KeyPath;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    #[test]
    fn detects_file_types() {
        assert_eq!(detect_file_type(Path::new("a.csv")).ok(), Some(FileType::CSV));
        assert_eq!(detect_file_type(Path::new("a.PQ")).ok(), Some(FileType::PARQUET));
        assert_eq!(detect_file_type(Path::new("a.jsonl")).ok(), Some(FileType::NDJSON));
        assert!(matches!(
            detect_file_type(Path::new("a.xlsx")),
            Err(ViewerError::UnknownFileType)
        ));
    }

    #[test]
    fn missing_file_is_reported() {
        assert!(matches!(
            load(fixture("does_not_exist.csv")),
            Err(ViewerError::FileNotFound)
        ));
        assert!(matches!(
            load(fixture("")),
            Err(ViewerError::LoadingFailed(_))
        ));
    }

    #[test]
    fn loads_csv_rows_as_records() {
        let dataset = load(fixture("bots.csv")).expect("fixture loads");
        assert_eq!(dataset.name, "bots.csv");
        assert_eq!(dataset.paths, vec!["name", "race", "elo", "author"]);
        assert_eq!(dataset.records.len(), 12);
        let first = dataset.records[0].as_ref().expect("first row present");
        assert_eq!(KeyPath::parse("name").text(first).as_deref(), Some("Aeolus"));
    }

    #[test]
    fn nested_json_becomes_nested_records() {
        let dataset = load(fixture("bots.ndjson")).expect("fixture loads");
        assert!(dataset.paths.contains(&"user.username".to_string()));
        assert_eq!(dataset.records.len(), 4);

        let username = KeyPath::parse("user.username");
        let first = dataset.records[0].as_ref().expect("first row present");
        assert_eq!(username.text(first).as_deref(), Some("alice"));

        // {"name": "Orphan", "user": {"username": null}}
        let orphan = dataset.records[2].as_ref().expect("third row present");
        assert_eq!(username.text(orphan), None);

        // A row without any values is an absent record
        assert!(dataset.records[3].is_none());
    }

    #[test]
    fn from_dataframe_marks_all_null_rows_absent() {
        let df = df!(
            "name" => [Some("a"), None],
            "elo" => [Some(1500i64), None],
        )
        .expect("frame");
        let dataset = from_dataframe("mem".into(), &df).expect("converts");
        assert!(dataset.records[0].is_some());
        assert!(dataset.records[1].is_none());
        assert_eq!(
            KeyPath::parse("elo").text(dataset.records[0].as_ref().unwrap()).as_deref(),
            Some("1500")
        );
    }
}
