use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use qgrid_adapters::import::load_csv_result;
use qgrid_core::grid::{ColumnDefinition, Row};
use qgrid_core::preferences::{config_dir, FilePreferencesStore};
use qgrid_tui::TuiApp;
use serde_json::json;
use simplelog::{Config, LevelFilter, WriteLogger};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseOutcome {
    Config,
    HelpRequested,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct LaunchConfig {
    csv: Option<PathBuf>,
    primary_keys: Vec<String>,
    export_dir: Option<PathBuf>,
}

fn parse_args_from(
    args: impl IntoIterator<Item = String>,
    config: &mut LaunchConfig,
) -> io::Result<ParseOutcome> {
    let mut args = args.into_iter();

    while let Some(flag) = args.next() {
        match flag.as_str() {
            "-h" | "--help" => return Ok(ParseOutcome::HelpRequested),
            "--csv" => config.csv = Some(PathBuf::from(next_value(&mut args, "--csv")?)),
            "--primary-key" => config
                .primary_keys
                .push(next_value(&mut args, "--primary-key")?),
            "--export-dir" => {
                config.export_dir = Some(PathBuf::from(next_value(&mut args, "--export-dir")?));
            }
            _ => {
                return Err(io_other(format!("unknown argument `{flag}`")));
            }
        }
    }

    Ok(ParseOutcome::Config)
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> io::Result<String> {
    args.next()
        .ok_or_else(|| io_other(format!("missing value for `{flag}`")))
}

fn io_other(message: String) -> io::Error {
    io::Error::other(message)
}

fn print_help() {
    println!(
        "qgrid result grid viewer\n\n\
Usage:\n  qgrid-app [OPTIONS]\n\n\
Options:\n  --csv <path>          Load a CSV result set (first record names the columns)\n  \
--primary-key <name>  Primary key column; repeat for composite keys (default: id for the demo data)\n  \
--export-dir <dir>    Directory for selection exports (default: current directory)\n  \
-h, --help            Show this help\n\n\
Environment:\n  QGRID_CONFIG_DIR      Overrides the directory holding preferences.toml and qgrid.log\n  \
QGRID_LOG             Log level: off, error, warn, info, debug or trace (default: info)"
    );
}

fn log_level(raw: Option<&str>) -> LevelFilter {
    raw.and_then(|value| value.trim().parse().ok())
        .unwrap_or(LevelFilter::Info)
}

fn open_log_file(dir: &Path) -> io::Result<File> {
    fs::create_dir_all(dir)?;
    File::create(dir.join("qgrid.log"))
}

/// Logs into `qgrid.log` beside the preferences file. The terminal belongs
/// to the viewer, so nothing is logged to it.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let log_file = open_log_file(&config_dir()?)?;
    let level = log_level(std::env::var("QGRID_LOG").ok().as_deref());
    WriteLogger::init(level, Config::default(), log_file)?;
    Ok(())
}

fn demo_row(id: i64, animal: &str, size: i64, endangered: bool) -> Row {
    let mut row = Row::new();
    row.insert("id".to_string(), json!(id));
    row.insert("animal".to_string(), json!(animal));
    row.insert("size".to_string(), json!(size));
    row.insert("endangered".to_string(), json!(endangered));
    row
}

fn demo_result() -> (Vec<ColumnDefinition>, Vec<Row>) {
    let columns = vec![
        ColumnDefinition::data("id", 0).with_type("integer"),
        ColumnDefinition::data("animal", 1).with_type("text"),
        ColumnDefinition::data("size", 2).with_type("integer"),
        ColumnDefinition::data("endangered", 3).with_type("boolean"),
    ];
    let rows = vec![
        demo_row(1, "leopard", 12, false),
        demo_row(2, "lion", 13, false),
        demo_row(3, "cougar", 9, false),
        demo_row(4, "tiger", 10, true),
        demo_row(5, "lynx", 4, false),
        demo_row(6, "snow leopard", 11, true),
        demo_row(7, "ocelot", 3, false),
        demo_row(8, "jaguar", 12, true),
    ];
    (columns, rows)
}

fn build_app(config: LaunchConfig) -> Result<TuiApp, Box<dyn std::error::Error>> {
    let preferences = FilePreferencesStore::load_default()?;
    log::info!("preferences at {}", preferences.path().display());

    let (columns, rows, primary_keys) = match &config.csv {
        Some(path) => {
            let imported = load_csv_result(path, &preferences.preferences().csv)?;
            (imported.columns, imported.rows, config.primary_keys)
        }
        None => {
            let (columns, rows) = demo_result();
            let primary_keys = if config.primary_keys.is_empty() {
                vec!["id".to_string()]
            } else {
                config.primary_keys
            };
            (columns, rows, primary_keys)
        }
    };

    let app = TuiApp::new(columns, rows, primary_keys, preferences);
    Ok(match config.export_dir {
        Some(dir) => app.with_export_dir(dir),
        None => app,
    })
}

fn run_app(
    run_tui: impl FnOnce() -> Result<(), qgrid_tui::TuiError>,
) -> Result<(), Box<dyn std::error::Error>> {
    run_tui()?;
    log::info!("viewer exited");
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = LaunchConfig::default();
    if parse_args_from(std::env::args().skip(1), &mut config)? == ParseOutcome::HelpRequested {
        print_help();
        return Ok(());
    }

    if let Err(error) = init_logging() {
        eprintln!("qgrid: logging disabled: {error}");
    }
    let app = build_app(config)?;
    run_app(|| qgrid_tui::run(app))
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::PathBuf;

    use simplelog::LevelFilter;
    use tempfile::TempDir;

    use super::{
        demo_result, log_level, open_log_file, parse_args_from, run_app, LaunchConfig,
        ParseOutcome,
    };

    #[test]
    fn run_app_returns_ok_when_tui_runner_succeeds() {
        let result = run_app(|| Ok(()));
        assert!(result.is_ok());
    }

    #[test]
    fn run_app_propagates_tui_errors() {
        let result = run_app(|| Err(qgrid_tui::TuiError::Io(io::Error::other("boom"))));
        assert!(result.is_err());
    }

    #[test]
    fn parse_args_from_collects_primary_keys() {
        let mut config = LaunchConfig::default();
        let outcome = parse_args_from(
            vec![
                "--csv".to_string(),
                "result.csv".to_string(),
                "--primary-key".to_string(),
                "a".to_string(),
                "--primary-key".to_string(),
                "b".to_string(),
            ],
            &mut config,
        )
        .expect("args should parse");

        assert_eq!(outcome, ParseOutcome::Config);
        assert_eq!(config.csv, Some(PathBuf::from("result.csv")));
        assert_eq!(config.primary_keys, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(config.export_dir, None);
    }

    #[test]
    fn parse_args_from_rejects_unknown_and_incomplete_flags() {
        let mut config = LaunchConfig::default();
        assert!(parse_args_from(vec!["--bogus".to_string()], &mut config).is_err());
        assert!(parse_args_from(vec!["--csv".to_string()], &mut config).is_err());
        assert_eq!(
            parse_args_from(vec!["-h".to_string()], &mut config).expect("help"),
            ParseOutcome::HelpRequested
        );
    }

    #[test]
    fn log_level_defaults_to_info() {
        assert_eq!(log_level(None), LevelFilter::Info);
        assert_eq!(log_level(Some("nonsense")), LevelFilter::Info);
        assert_eq!(log_level(Some("debug")), LevelFilter::Debug);
    }

    #[test]
    fn demo_result_rows_cover_every_column() {
        let (columns, rows) = demo_result();
        for row in &rows {
            for column in &columns {
                assert!(row.contains_key(&column.name));
            }
        }
    }

    #[test]
    fn open_log_file_creates_the_directory_and_reports_failures() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let dir = temp_dir.path().join("nested").join("qgrid");
        open_log_file(&dir).expect("log file should open");
        assert!(dir.join("qgrid.log").exists());

        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").expect("failed to write file");
        assert!(open_log_file(&blocker.join("qgrid")).is_err());
    }
}
