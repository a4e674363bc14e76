//! Purpose: `tabwire` CLI entry point.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Commands emit stable stdout formats (JSON lines or an ASCII table).
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
use std::error::Error as StdError;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum, error::ErrorKind as ClapErrorKind};
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

use tabwire::api::{Error, ErrorKind, to_exit_code};

mod command_dispatch;
mod value_json;

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome { exit_code });
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Run `tabwire --help` for usage."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    init_tracing();

    let color_mode = cli.color;
    command_dispatch::dispatch_command(cli.command).map_err(|err| (err, color_mode))
}

fn clap_error_summary(err: &clap::Error) -> String {
    let rendered = err.to_string();
    rendered
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.trim_start_matches("error: ").to_string())
        .unwrap_or_else(|| "invalid arguments".to_string())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "tabwire",
    version,
    about = "Decode record frames, quantize floats, and inspect tabular data",
    after_help = r#"EXAMPLES
  $ echo '[1, "ada", {"$timestamp": "2024-01-01T00:00:00Z"}]' | tabwire encode -o rec.bin
  $ tabwire decode rec.bin
  $ tabwire decode a.bin b.bin --format table --columns 1,0
  $ tabwire quantize 3.14159 --bits 16"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize error output (auto|always|never)"
    )]
    color: ColorMode,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode one or more frame files; each frame is one row.
    Decode {
        #[arg(required = true, help = "Frame files, or - for stdin")]
        inputs: Vec<PathBuf>,
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
        #[arg(long, value_delimiter = ',', help = "Field indices to keep, in output order")]
        columns: Option<Vec<usize>>,
        #[arg(long, allow_hyphen_values = true, help = "Max rows to emit (negative: no cap)")]
        limit: Option<i64>,
        #[arg(long, help = "Reject frames larger than this many bytes (default 8 MiB)")]
        max_record_size: Option<usize>,
        #[arg(long, conflicts_with = "max_record_size", help = "Disable the frame size guard")]
        no_size_limit: bool,
    },
    /// Encode a JSON array into a frame file.
    Encode {
        #[arg(help = "JSON input file, or - for stdin (default)")]
        input: Option<PathBuf>,
        #[arg(long, short, help = "Frame output path")]
        output: PathBuf,
    },
    /// Narrow a value to the given IEEE-754 width and widen it back.
    Quantize {
        #[arg(allow_hyphen_values = true)]
        value: f64,
        #[arg(long, default_value_t = 16, help = "Target precision: 16, 32, or 64")]
        bits: u32,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

fn emit_json_line(value: &Value) -> Result<(), Error> {
    let json = serde_json::to_string(value).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("json encode failed")
            .with_source(err)
    })?;
    println!("{json}");
    Ok(())
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::MalformedFrame => "malformed frame".to_string(),
        ErrorKind::LengthMismatch => "frame length mismatch".to_string(),
        ErrorKind::RecordTooLarge => "record too large".to_string(),
        ErrorKind::Payload => "invalid payload".to_string(),
        ErrorKind::Encode => "encode failed".to_string(),
        ErrorKind::UnsupportedPrecision => "unsupported precision".to_string(),
        ErrorKind::IndexOutOfRange => "index out of range".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(index) = err.index() {
        inner.insert("index".to_string(), json!(index));
    }
    if let Some(offset) = err.offset() {
        inner.insert("offset".to_string(), json!(offset));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));
    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(offset) = err.offset() {
        lines.push(format!(
            "{} {offset}",
            colorize_label("offset:", use_color, AnsiColor::Yellow)
        ));
    }
    for cause in error_causes(err) {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }
    lines.join("\n")
}
