use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process;

use rguid::text::{self, Codec};
use rguid::{
    Guid, GuidDatabase, GuidError, NamedEntry, dump, is_definition, is_guid_text, is_hex_text,
    is_identifier, is_struct_text, parse_format, parse_named, scan_file, to_definition,
    to_guid_text, to_hex_text, to_struct_text,
};
use serde_json::json;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const VERSION: &str = concat!("rguid version ", env!("CARGO_PKG_VERSION"));
const DEFAULT_DATA_FILE: &str = "guid.dat";

#[derive(Error, Debug)]
enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("File '{0}' is not loaded")]
    DataNotLoaded(PathBuf),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Guid(#[from] GuidError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 1,
            Self::DataNotLoaded(_) => 2,
            Self::Guid(_) | Self::Json(_) => 3,
            Self::NotFound(_) => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Identify,
    List,
    Scan,
    Generate(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Options {
    mode: Mode,
    search: bool,
    json: bool,
    args: Vec<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            mode: Mode::Identify,
            search: false,
            json: false,
            args: Vec::new(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Run(Options),
    Help,
    Version,
}

fn print_help() {
    eprintln!(
        "rguid - The GUID analyzer\n\n\
Usage:\n  rguid [--search] [--json] ARG...\n  rguid IID_IDeskBand\n  rguid \"{{EB0FE172-1A3A-11D0-89B3-00A0C90A90AC}}\"\n  rguid \"72 E1 0F EB 3A 1A D0 11 89 B3 00 A0 C9 0A 90 AC\"\n  rguid \"{{ 0xEB0FE172, 0x1A3A, 0x11D0, {{ 0x89, 0xB3, 0x00, 0xA0, 0xC9, 0x0A, 0x90, 0xAC }} }}\"\n  rguid \"DEFINE_GUID(IID_IDeskBand, 0xEB0FE172, 0x1A3A, 0x11D0, 0x89, 0xB3, 0x00, 0xA0, 0xC9, 0x0A, 0x90, 0xAC);\"\n  rguid --list\n  rguid --scan FILE...\n  rguid --generate [NUMBER]\n  rguid --help\n  rguid --version\n\n\
You can specify multiple GUIDs.\n\
Environment:\n  GUID_DATA   database file (default: {DEFAULT_DATA_FILE} next to the executable)\n  LOG_LEVEL   log filter (default: warn)\n"
    );
}

fn init_tracing() {
    let level = env::var("LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level.to_lowercase()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(unix)]
fn decode_arg(arg: &OsString, codec: &dyn Codec) -> String {
    use std::os::unix::ffi::OsStrExt;
    codec.decode(arg.as_bytes())
}

#[cfg(not(unix))]
fn decode_arg(arg: &OsString, _codec: &dyn Codec) -> String {
    arg.to_string_lossy().into_owned()
}

/// Whether the accumulated argument text is complete on its own.
fn is_complete_arg(param: &str) -> bool {
    is_guid_text(param)
        || is_struct_text(param)
        || is_definition(param)
        || is_hex_text(param)
        || rguid::from_struct_definition(param).is_some()
        || (is_identifier(param) && param != "DEFINE_GUID")
}

fn parse_args(args: &[String]) -> Result<Command, CliError> {
    if args.is_empty() {
        return Err(CliError::Usage("no arguments given".to_string()));
    }

    let mut opts = Options::default();
    let mut param = String::new();
    let mut i = 0;

    while i < args.len() {
        let arg = args[i].as_str();
        if arg.starts_with('-') {
            match arg {
                "--help" | "-h" => return Ok(Command::Help),
                "--version" => return Ok(Command::Version),
                "--list" => opts.mode = Mode::List,
                "--search" => opts.search = true,
                "--json" => opts.json = true,
                "--scan" => {
                    if !opts.args.is_empty() || !param.is_empty() {
                        return Err(CliError::Usage(
                            "arguments to identify cannot be combined with --scan".to_string(),
                        ));
                    }
                    opts.mode = Mode::Scan;
                }
                "--generate" => {
                    let count = match args.get(i + 1) {
                        Some(next) if !next.starts_with('-') => {
                            i += 1;
                            next.parse::<usize>().map_err(|_| {
                                CliError::Usage(format!("invalid integer for --generate: {next}"))
                            })?
                        }
                        _ => 1,
                    };
                    if count == 0 {
                        return Err(CliError::Usage(
                            "Zero value specified for '--generate'".to_string(),
                        ));
                    }
                    opts.mode = Mode::Generate(count);
                }
                _ => return Err(CliError::Usage(format!("Invalid option: {arg}"))),
            }
            i += 1;
            continue;
        }

        if opts.mode == Mode::Scan {
            opts.args.push(arg.to_string());
            i += 1;
            continue;
        }

        if !param.is_empty() {
            param.push(' ');
        }
        param.push_str(arg);
        if is_complete_arg(&param) {
            opts.args.push(std::mem::take(&mut param));
        }
        i += 1;
    }

    if !param.is_empty() {
        opts.args.push(param);
    }

    if opts.mode == Mode::Scan && opts.args.is_empty() {
        return Err(CliError::Usage("--scan requires at least one file".to_string()));
    }

    Ok(Command::Run(opts))
}

fn default_data_path() -> PathBuf {
    if let Ok(path) = env::var("GUID_DATA") {
        return PathBuf::from(path);
    }
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_DATA_FILE)))
        .filter(|path| path.exists())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE))
}

fn load_database(codec: &dyn Codec) -> Result<GuidDatabase, CliError> {
    let path = default_data_path();
    GuidDatabase::load_with_codec(&path, codec).map_err(|err| {
        debug!(error = %err, "database load failed");
        CliError::DataNotLoaded(path)
    })
}

fn print_json(value: &serde_json::Value) -> Result<(), CliError> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// Print every rendering of `guid`. Without a name, names of matching
/// database entries are listed and the last one is used.
fn report(
    db: Option<&GuidDatabase>,
    guid: &Guid,
    name: Option<&str>,
    json_out: bool,
) -> Result<(), CliError> {
    let known: Vec<&str> = match (name, db) {
        (None, Some(db)) => db
            .search_by_guid(guid)
            .into_iter()
            .filter_map(NamedEntry::name)
            .collect(),
        _ => Vec::new(),
    };
    let name = name.or(known.last().copied());

    if json_out {
        return print_json(&json!({
            "name": name,
            "known_names": known,
            "guid": to_guid_text(guid),
            "definition": to_definition(guid, name),
            "struct": to_struct_text(guid, None),
            "hex": to_hex_text(guid),
        }));
    }

    println!("\n--------------------");
    for known_name in &known {
        println!("Name: {known_name}");
    }
    print!("{}", dump(guid, name));
    Ok(())
}

fn run_arg(db: &GuidDatabase, arg: &str, opts: &Options) -> Result<(), CliError> {
    if let Some((guid, name)) = parse_named(arg) {
        if let Some((format, _)) = parse_format(arg) {
            debug!(format = format.as_str(), "argument parsed");
        }
        return report(Some(db), &guid, name.as_deref(), opts.json);
    }

    if !opts.search
        && let Some(entry) = db.search_by_name(arg)
    {
        return report(None, &entry.guid, entry.name(), opts.json);
    }

    let found = db.search_by_text(arg);
    if found.is_empty() {
        return Err(CliError::NotFound(arg.to_string()));
    }
    if found.len() > 1 && !opts.json {
        println!("Found {} entries.", found.len());
    }
    for entry in found {
        report(None, &entry.guid, entry.name(), opts.json)?;
    }
    Ok(())
}

fn run_list(db: &GuidDatabase, json_out: bool) -> Result<(), CliError> {
    if json_out {
        return print_json(&serde_json::to_value(db.entries())?);
    }
    for entry in db.entries() {
        println!("{}", to_definition(&entry.guid, entry.name()));
    }
    Ok(())
}

fn run_scan(paths: &[String], json_out: bool) -> Result<(), CliError> {
    let mut total = 0usize;
    for path in paths {
        let found = scan_file(Path::new(path))?;
        total += found.len();

        if json_out {
            print_json(&json!({ "file": path, "entries": found }))?;
            continue;
        }
        for entry in &found {
            match entry.name() {
                Some(name) => println!("{path}: {}", to_definition(&entry.guid, Some(name))),
                None => println!("{path}: {}", to_guid_text(&entry.guid)),
            }
        }
    }

    if total == 0 {
        return Err(CliError::NotFound(paths.join(" ")));
    }
    Ok(())
}

fn run(opts: &Options, codec: &dyn Codec) -> Result<(), CliError> {
    match opts.mode {
        Mode::Generate(count) => {
            for _ in 0..count {
                report(None, &Guid::random(), None, opts.json)?;
            }
            Ok(())
        }
        Mode::Scan => run_scan(&opts.args, opts.json),
        Mode::List => run_list(&load_database(codec)?, opts.json),
        Mode::Identify => {
            let db = load_database(codec)?;
            for arg in &opts.args {
                run_arg(&db, arg, opts)?;
            }
            Ok(())
        }
    }
}

fn main() {
    init_tracing();

    let codec = text::codec_from_env();
    debug!(codec = codec.name(), "selected codec");
    let args: Vec<String> = env::args_os()
        .skip(1)
        .map(|arg| decode_arg(&arg, codec.as_ref()))
        .collect();

    let opts = match parse_args(&args) {
        Ok(Command::Run(opts)) => opts,
        Ok(Command::Help) => {
            print_help();
            return;
        }
        Ok(Command::Version) => {
            println!("{VERSION}");
            return;
        }
        Err(err) => {
            if args.is_empty() {
                print_help();
            } else {
                eprintln!("error: {err}");
            }
            process::exit(err.exit_code());
        }
    };

    if let Err(err) = run(&opts, codec.as_ref()) {
        eprintln!("error: {err}");
        process::exit(err.exit_code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn run_opts(items: &[&str]) -> Options {
        match parse_args(&args(items)).unwrap() {
            Command::Run(opts) => opts,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_args_joins_split_tokens() {
        let opts = run_opts(&[
            "{", "0xEB0FE172,", "0x1A3A,", "0x11D0,", "{", "0x89,", "0xB3,", "0x00,", "0xA0,",
            "0xC9,", "0x0A,", "0x90,", "0xAC", "}", "}",
        ]);
        assert_eq!(
            opts.args,
            vec!["{ 0xEB0FE172, 0x1A3A, 0x11D0, { 0x89, 0xB3, 0x00, 0xA0, 0xC9, 0x0A, 0x90, 0xAC } }"]
        );
    }

    #[test]
    fn test_parse_args_identifiers_and_guids() {
        let opts = run_opts(&[
            "IID_IDeskBand",
            "{EB0FE172-1A3A-11D0-89B3-00A0C90A90AC}",
            "DEFINE_GUID",
            "(IID_X,",
            "1,2,3,4,5,6,7,8,9,10,11);",
        ]);
        assert_eq!(
            opts.args,
            vec![
                "IID_IDeskBand",
                "{EB0FE172-1A3A-11D0-89B3-00A0C90A90AC}",
                "DEFINE_GUID (IID_X, 1,2,3,4,5,6,7,8,9,10,11);",
            ]
        );
        assert_eq!(opts.mode, Mode::Identify);
    }

    #[test]
    fn test_parse_args_leftover_becomes_argument() {
        let opts = run_opts(&["--search", "shell", "link?"]);
        assert!(opts.search);
        assert_eq!(opts.args, vec!["shell", "link?"]);

        let opts = run_opts(&["1a3a-11d0", "x"]);
        assert_eq!(opts.args, vec!["1a3a-11d0 x"]);
    }

    #[test]
    fn test_parse_args_modes() {
        assert_eq!(run_opts(&["--list"]).mode, Mode::List);
        assert_eq!(run_opts(&["--generate"]).mode, Mode::Generate(1));
        assert_eq!(run_opts(&["--generate", "3"]).mode, Mode::Generate(3));
        assert_eq!(run_opts(&["--generate", "--json"]).mode, Mode::Generate(1));

        let scan = run_opts(&["--scan", "a.h", "IID_X"]);
        assert_eq!(scan.mode, Mode::Scan);
        assert_eq!(scan.args, vec!["a.h", "IID_X"]);

        assert_eq!(parse_args(&args(&["--help"])).unwrap(), Command::Help);
        assert_eq!(parse_args(&args(&["--version"])).unwrap(), Command::Version);
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(matches!(parse_args(&[]), Err(CliError::Usage(_))));
        assert!(matches!(
            parse_args(&args(&["--bogus"])),
            Err(CliError::Usage(_))
        ));
        assert!(matches!(
            parse_args(&args(&["--generate", "0"])),
            Err(CliError::Usage(_))
        ));
        assert!(matches!(
            parse_args(&args(&["--generate", "many"])),
            Err(CliError::Usage(_))
        ));
        assert!(matches!(
            parse_args(&args(&["--scan"])),
            Err(CliError::Usage(_))
        ));
        assert!(matches!(
            parse_args(&args(&["IID_X", "--scan", "a.h"])),
            Err(CliError::Usage(_))
        ));
        assert!(matches!(
            parse_args(&args(&["1a3a", "--scan", "a.h"])),
            Err(CliError::Usage(_))
        ));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Usage(String::new()).exit_code(), 1);
        assert_eq!(CliError::DataNotLoaded(PathBuf::new()).exit_code(), 2);
        assert_eq!(CliError::NotFound(String::new()).exit_code(), 4);
    }

    fn tmp_path(name: &str) -> PathBuf {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "rguid_cli_{}_{}_{}",
            std::process::id(),
            ts,
            name
        ))
    }

    #[test]
    fn test_run_scan_reports_findings() {
        let path = tmp_path("one.h");
        fs::write(
            &path,
            "DEFINE_GUID(IID_IDeskBand, 0xEB0FE172, 0x1A3A, 0x11D0, 0x89, 0xB3, 0x00, 0xA0, 0xC9, 0x0A, 0x90, 0xAC);\n",
        )
        .unwrap();
        let paths = vec![path.to_string_lossy().into_owned()];
        assert!(run_scan(&paths, false).is_ok());
        assert!(run_scan(&paths, true).is_ok());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_run_scan_without_findings_is_not_found() {
        let path = tmp_path("noise.h");
        fs::write(&path, "int main(void) { return 0; }\n/* {not-a-guid} */\n").unwrap();
        let paths = vec![path.to_string_lossy().into_owned()];
        let err = run_scan(&paths, false).unwrap_err();
        assert!(matches!(err, CliError::NotFound(_)));
        assert_eq!(err.exit_code(), 4);
        let _ = fs::remove_file(&path);

        let err = run_scan(&paths, false).unwrap_err();
        assert!(matches!(err, CliError::Guid(GuidError::Io(_))));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_run_list_and_report() {
        let guid: Guid = "{EB0FE172-1A3A-11D0-89B3-00A0C90A90AC}".parse().unwrap();
        let db = GuidDatabase::new(vec![
            NamedEntry::new("IID_IDeskBand", guid),
            NamedEntry::new("IID_DeskBandAlias", guid),
        ]);
        assert!(run_list(&db, false).is_ok());
        assert!(run_list(&db, true).is_ok());
        assert!(report(Some(&db), &guid, None, false).is_ok());
        assert!(report(Some(&db), &guid, None, true).is_ok());
        assert!(report(None, &Guid::random(), Some("IID_New"), true).is_ok());
    }

    #[test]
    fn test_run_arg_not_found() {
        let db = GuidDatabase::default();
        let opts = Options::default();
        assert!(matches!(
            run_arg(&db, "IID_Nowhere", &opts),
            Err(CliError::NotFound(_))
        ));
        assert!(run_arg(&db, "{000214F9-0000-0000-C000-000000000046}", &opts).is_ok());
    }
}
