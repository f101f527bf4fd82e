use std::path::PathBuf;

use clap::Parser;
use tracing::debug;

use crate::domain::ViewerError;
use crate::field::{Field, Filter};
use crate::list::{DEFAULT_RESULTS_PER_PAGE, FilterableList};
use crate::loader::Dataset;
use crate::record::Record;

#[derive(Parser, Debug, Clone)]
#[command(name = "arenaview", version, about = "Browse AI Arena ladder exports in the terminal")]
pub struct Args {
    /// Export to open (csv, parquet, arrow/ipc, json, ndjson)
    pub path: String,

    /// Columns to show, as comma separated dotted paths (default: every column)
    #[arg(long, value_delimiter = ',')]
    pub fields: Vec<String>,

    /// Header label for a column, `path=Label`
    #[arg(long = "label", value_name = "PATH=LABEL")]
    pub labels: Vec<String>,

    /// Hide a column on terminals narrower than N, `path=N`
    #[arg(long = "min-width", value_name = "PATH=N")]
    pub min_widths: Vec<String>,

    /// Search filter, `name` or `name=path,path` to limit the searched columns
    #[arg(long = "search", value_name = "NAME[=PATHS]")]
    pub searches: Vec<String>,

    /// Dropdown filter over the distinct values of a column
    #[arg(long = "dropdown", value_name = "PATH")]
    pub dropdowns: Vec<String>,

    /// Rows per page
    #[arg(long, default_value_t = DEFAULT_RESULTS_PER_PAGE)]
    pub per_page: usize,

    /// Log file, the terminal itself is used by the UI
    #[arg(long, default_value = "arenaview.log")]
    pub log_file: String,

    /// Log filter when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).into_owned())
    }

    pub fn log_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.log_file).into_owned())
    }

    pub fn build_list(&self, dataset: Dataset) -> Result<FilterableList<Record>, ViewerError> {
        if self.per_page == 0 {
            return Err(ViewerError::InvalidArgument("--per-page must be positive".into()));
        }
        let labels = parse_pairs(&self.labels)?;
        let min_widths = parse_pairs(&self.min_widths)?
            .into_iter()
            .map(|(path, width)| {
                width
                    .parse::<u16>()
                    .map(|w| (path, w))
                    .map_err(|_| ViewerError::InvalidArgument(format!("--min-width {width}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let paths = if self.fields.is_empty() {
            dataset.paths.clone()
        } else {
            self.fields.clone()
        };

        let fields = paths
            .iter()
            .map(|path| {
                let mut field = Field::path(path);
                if let Some((_, label)) = labels.iter().find(|(p, _)| p == path) {
                    field = field.with_label(label);
                }
                if let Some((_, width)) = min_widths.iter().find(|(p, _)| p == path) {
                    field = field.with_min_width(*width);
                }
                field
            })
            .collect::<Vec<_>>();

        let mut filters = Vec::new();
        if self.searches.is_empty() {
            filters.push(Filter::search("search"));
        }
        for search in self.searches.iter() {
            let filter = match search.split_once('=') {
                Some((name, scope)) => {
                    let scope = scope.split(',').map(str::trim).collect::<Vec<_>>();
                    Filter::search_in(name.trim(), &scope)
                }
                None => Filter::search(search.trim()),
            };
            filters.push(filter);
        }
        for path in self.dropdowns.iter() {
            let mut field = Field::path(path);
            if let Some((_, label)) = labels.iter().find(|(p, _)| p == path) {
                field = field.with_label(label);
            }
            filters.push(Filter::dropdown(field));
        }

        debug!(
            "Building list over {} records with {} fields and {} filters",
            dataset.records.len(),
            fields.len(),
            filters.len()
        );
        Ok(FilterableList::new(dataset.records, fields, filters).with_results_per_page(self.per_page))
    }
}

fn parse_pairs(raw: &[String]) -> Result<Vec<(String, String)>, ViewerError> {
    raw.iter()
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.trim().to_string())),
            _ => Err(ViewerError::InvalidArgument(pair.clone())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Value;

    fn dataset() -> Dataset {
        let records = ["Zeta", "alpha", "Beta"]
            .iter()
            .map(|n| {
                Some(
                    Record::new()
                        .with("name", Value::text(*n))
                        .with("race", Value::text("Zerg")),
                )
            })
            .collect();
        Dataset {
            name: "mem".into(),
            records,
            paths: vec!["name".into(), "race".into()],
        }
    }

    #[test]
    fn defaults_to_all_paths_and_one_search() {
        let args = Args::parse_from(["arenaview", "bots.csv"]);
        let list = args.build_list(dataset()).expect("builds");
        assert_eq!(list.fields().len(), 2);
        assert_eq!(list.filters().len(), 1);
        assert_eq!(list.filters()[0].key(), "search");
        assert_eq!(list.results_per_page(), 10);
    }

    #[test]
    fn fields_labels_and_filters_from_flags() {
        let args = Args::parse_from([
            "arenaview",
            "bots.csv",
            "--fields",
            "race,name",
            "--label",
            "name=Bot",
            "--min-width",
            "race=100",
            "--search",
            "q=name",
            "--dropdown",
            "race",
            "--per-page",
            "2",
        ]);
        let list = args.build_list(dataset()).expect("builds");
        assert_eq!(list.fields()[0].key(), "race");
        assert_eq!(list.fields()[0].min_width(), Some(100));
        assert_eq!(list.fields()[1].label(), "Bot");
        assert_eq!(list.filters().len(), 2);
        assert!(list.filters()[1].is_dropdown());
        assert_eq!(list.dropdown_options("race"), ["Zerg"]);
        assert_eq!(list.total_pages(), 2);
    }

    #[test]
    fn malformed_pairs_are_rejected() {
        let args = Args::parse_from(["arenaview", "bots.csv", "--label", "nolabel"]);
        assert!(matches!(
            args.build_list(dataset()),
            Err(ViewerError::InvalidArgument(_))
        ));
        let args = Args::parse_from(["arenaview", "bots.csv", "--min-width", "name=wide"]);
        assert!(matches!(
            args.build_list(dataset()),
            Err(ViewerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn absolute_paths_are_kept() {
        let args = Args::parse_from(["arenaview", "/tmp/bots.csv"]);
        assert_eq!(args.data_path(), PathBuf::from("/tmp/bots.csv"));
    }
}
