use std::env;
use std::fs;
use std::path::Path;
use std::process;

use beatgrid::{convert, package, render_preview, BeatGridError, ExportConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str =
    "Usage: beatgrid [--config <file.yaml>] [--table | --dump] <input.mid> [output.xml]";

enum Mode {
    Package,
    Table,
    Dump,
}

struct Args {
    mode: Mode,
    config: Option<String>,
    input: Option<String>,
    output: Option<String>,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args {
        mode: Mode::Package,
        config: None,
        input: None,
        output: None,
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--table" => parsed.mode = Mode::Table,
            "--dump" => parsed.mode = Mode::Dump,
            "--config" => {
                let path = iter.next().ok_or("--config needs a file path")?;
                parsed.config = Some(path.clone());
            }
            flag if flag.starts_with("--") => return Err(format!("Unknown flag '{}'", flag)),
            _ if parsed.input.is_none() => parsed.input = Some(arg.clone()),
            _ if parsed.output.is_none() => parsed.output = Some(arg.clone()),
            _ => return Err(format!("Unexpected argument '{}'", arg)),
        }
    }

    Ok(parsed)
}

fn run(args: Args) -> Result<(), BeatGridError> {
    let input = args.input.ok_or(BeatGridError::NoInput)?;

    let config = match &args.config {
        Some(path) => ExportConfig::load(Path::new(path))?,
        None => ExportConfig::default(),
    };

    let bytes = fs::read(&input).map_err(|source| BeatGridError::Io {
        path: input.clone().into(),
        source,
    })?;
    let result = convert(&bytes)?;
    info!(
        input = %input,
        beats = result.beats.len(),
        tempo_changes = result.tempos.len(),
        notes = result.note_count,
        "converted tempo map"
    );

    // Render fully before touching the output file
    let text = match args.mode {
        Mode::Package => package(&result.beats, &config)?,
        Mode::Table => render_preview(&result.beats),
        Mode::Dump => {
            serde_yaml::to_string(&result).map_err(|e| BeatGridError::Serialize(e.to_string()))?
        }
    };

    match args.output {
        Some(path) => {
            fs::write(&path, &text).map_err(|source| BeatGridError::Io {
                path: path.clone().into(),
                source,
            })?;
            eprintln!("Wrote {} beats to {}", result.beats.len(), path);
        }
        None => println!("{}", text.trim_end()),
    }

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();

    let args = match parse_args(&args) {
        Ok(args) if args.input.is_some() => args,
        Ok(_) => {
            eprintln!("{}", USAGE);
            process::exit(1);
        }
        Err(message) => {
            eprintln!("{}", message);
            eprintln!("{}", USAGE);
            process::exit(1);
        }
    };

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
