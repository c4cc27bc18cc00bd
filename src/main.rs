//! ECRE CLI
//!
//! Command-line driver for the regular expression engine: compiles a
//! pattern, runs it against an input string, and prints the captures.

use clap::{Parser, ValueEnum};
use ecre::{compile, DefaultHost, Encoding, Flags, Input, MatchReport};
use serde::Serialize;
use std::process::ExitCode;

/// ECMAScript-compatible regular expression tester.
///
/// Compiles PATTERN with the given flags, executes it against INPUT, and
/// reports the match result with capture spans.
#[derive(Parser, Debug)]
#[command(name = "ecre")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Regular expression pattern
    pattern: String,

    /// Input text to match against
    input: Option<String>,

    /// Flag letters: i, m, s, u, y, v
    #[arg(short, long, default_value = "")]
    flags: String,

    /// Input encoding to execute with
    #[arg(short, long, default_value = "utf8")]
    encoding: CliEncoding,

    /// Start offset, in input units
    #[arg(short, long, default_value = "0")]
    start: usize,

    /// Output format
    #[arg(long, default_value = "human")]
    format: OutputFormat,

    /// Dump the compiled bytecode instead of matching
    #[arg(short, long)]
    dump: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

/// Input encodings accepted on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliEncoding {
    /// Bytes, one code point per byte (input must be Latin-1 expressible)
    Latin1,
    /// Raw 16-bit units
    Ucs2,
    /// UTF-16 code units
    Utf16,
    /// UTF-8 bytes
    Utf8,
}

impl From<CliEncoding> for Encoding {
    fn from(e: CliEncoding) -> Self {
        match e {
            CliEncoding::Latin1 => Encoding::Latin1,
            CliEncoding::Ucs2 => Encoding::Ucs2,
            CliEncoding::Utf16 => Encoding::Utf16,
            CliEncoding::Utf8 => Encoding::Utf8,
        }
    }
}

/// JSON payload for `--format json`.
#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    pattern: &'a str,
    flags: String,
    encoding: Encoding,
    matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'a MatchReport>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging if verbose
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("ecre=debug")
            .init();
    }

    let flags = match Flags::from_letters(&args.flags) {
        Ok(flags) => flags,
        Err(err) => {
            eprintln!("error: bad flags '{}': {err}", args.flags);
            return ExitCode::from(2);
        }
    };

    let re = match compile(args.pattern.as_bytes(), flags) {
        Ok(re) => re,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(2);
        }
    };
    tracing::debug!(
        bytecode_len = re.as_bytes().len(),
        captures = re.capture_count(),
        "pattern compiled"
    );

    if args.dump {
        match re.disassemble() {
            Ok(text) => {
                print!("{text}");
                return ExitCode::SUCCESS;
            }
            Err(err) => {
                eprintln!("error: {err}");
                return ExitCode::from(2);
            }
        }
    }

    let Some(input_text) = args.input.as_deref() else {
        eprintln!("error: INPUT is required unless --dump is given");
        return ExitCode::from(2);
    };

    // Materialise the input in the requested encoding.
    let wide: Vec<u16>;
    let narrow: Vec<u8>;
    let input = match args.encoding {
        CliEncoding::Utf8 => Input::Utf8(input_text.as_bytes()),
        CliEncoding::Ucs2 | CliEncoding::Utf16 => {
            wide = input_text.encode_utf16().collect();
            if matches!(args.encoding, CliEncoding::Ucs2) {
                Input::Ucs2(&wide)
            } else {
                Input::Utf16(&wide)
            }
        }
        CliEncoding::Latin1 => {
            let mut bytes = Vec::with_capacity(input_text.len());
            for ch in input_text.chars() {
                let Ok(byte) = u8::try_from(ch as u32) else {
                    eprintln!("error: input is not Latin-1 expressible: '{ch}'");
                    return ExitCode::from(2);
                };
                bytes.push(byte);
            }
            narrow = bytes;
            Input::Latin1(&narrow)
        }
    };

    if args.start > input.len_units() {
        eprintln!(
            "error: start offset {} beyond input length {}",
            args.start,
            input.len_units()
        );
        return ExitCode::from(2);
    }

    let result = match re.exec(input, args.start, &mut DefaultHost) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(2);
        }
    };

    match args.format {
        OutputFormat::Json => {
            let payload = JsonReport {
                pattern: &args.pattern,
                flags: flags.to_string(),
                encoding: args.encoding.into(),
                matched: result.is_some(),
                report: result.as_ref(),
            };
            match serde_json::to_string_pretty(&payload) {
                Ok(json) => println!("{json}"),
                Err(err) => {
                    eprintln!("error: {err}");
                    return ExitCode::from(2);
                }
            }
        }
        OutputFormat::Human => match &result {
            Some(report) => print_human(report),
            None => println!("no match"),
        },
    }

    if result.is_some() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_human(report: &MatchReport) {
    for (index, capture) in report.captures.iter().enumerate() {
        let name = if index == 0 {
            None
        } else {
            report
                .group_names
                .get(index - 1)
                .and_then(|n| n.as_deref())
        };
        match (capture, name) {
            (Some(span), Some(name)) => {
                println!("{index} <{name}>: [{}, {})", span.start, span.end);
            }
            (Some(span), None) => println!("{index}: [{}, {})", span.start, span.end),
            (None, Some(name)) => println!("{index} <{name}>: unset"),
            (None, None) => println!("{index}: unset"),
        }
    }
}
