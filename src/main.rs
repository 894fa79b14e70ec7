mod debug_report;

use jsonpath_mapper::{ExecutionMode, FieldRule, JsonPathMapper, MapError, MapperBuilder};
use serde_json::{Map, Value};
use std::io::{self, IsTerminal, Read};

/// The CLI maps into a plain JSON object keyed by binding name.
type Record = Map<String, Value>;

fn main() {
    env_logger::init();

    let config = match parse_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let mapper = match build_mapper(&config) {
        Ok(mapper) => mapper,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };

    let run = mapper.map_verbose(&config.input, config.mode);
    if config.report {
        debug_report::print_run(&config.bindings, &run.metrics, config.color);
    }

    let record = match run.result {
        Ok(record) => record,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&Value::Object(record)) {
        Ok(text) => println!("{text}"),
        Err(err) => {
            eprintln!("error: failed to render output: {err}");
            std::process::exit(1);
        }
    }
}

/// One `NAME=PATH` pair from the command line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Binding {
    pub name: String,
    pub path: String,
    pub optional: bool,
}

struct CliConfig {
    input: String,
    bindings: Vec<Binding>,
    mode: ExecutionMode,
    threads: Option<usize>,
    report: bool,
    color: bool,
}

fn build_mapper(config: &CliConfig) -> Result<JsonPathMapper<Record>, MapError> {
    let mut builder = MapperBuilder::<Record>::new().initialize_default();
    for binding in &config.bindings {
        let name = binding.name.clone();
        let rule = FieldRule::<Record, Value, Value>::from_path(binding.path.clone())
            .to_getter_field(move |record: &mut Record, value: Value| {
                record.insert(name.clone(), value);
            });
        builder = builder.map_rule(if binding.optional { rule.optional() } else { rule });
    }
    if let Some(threads) = config.threads {
        builder = builder.threads(threads);
    }
    builder.build()
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliConfig, String> {
    let mut input: Option<String> = None;
    let mut bindings = Vec::new();
    let mut mode = ExecutionMode::Sequential;
    let mut threads = None;
    let mut report = false;
    let mut color = io::stderr().is_terminal();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("jsonpath-mapper {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--report" => report = true,
            "--parallel" => mode = ExecutionMode::Independent,
            "--threads" => {
                let value = args.next().ok_or_else(|| "error: --threads expects a value".to_string())?;
                threads = Some(parse_threads(&value)?);
            }
            "-f" | "--field" | "-o" | "--optional" => {
                let value = args.next().ok_or_else(|| format!("error: {arg} expects NAME=PATH"))?;
                bindings.push(parse_binding(&value, matches!(arg.as_str(), "-o" | "--optional"))?);
            }
            "--input" | "-i" => {
                let value = args.next().ok_or_else(|| "error: --input expects a value".to_string())?;
                set_input(&mut input, value)?;
            }
            "--" => {
                let rest = args.collect::<Vec<_>>().join(" ");
                if !rest.trim().is_empty() {
                    set_input(&mut input, rest)?;
                }
                break;
            }
            _ if arg.starts_with("--field=") => {
                bindings.push(parse_binding(arg.trim_start_matches("--field="), false)?);
            }
            _ if arg.starts_with("--optional=") => {
                bindings.push(parse_binding(arg.trim_start_matches("--optional="), true)?);
            }
            _ if arg.starts_with("--threads=") => {
                threads = Some(parse_threads(arg.trim_start_matches("--threads="))?);
            }
            _ if arg.starts_with("--input=") => {
                set_input(&mut input, arg.trim_start_matches("--input=").to_string())?;
            }
            _ if arg.starts_with('-') => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => {
                let rest = std::iter::once(arg).chain(args).collect::<Vec<_>>().join(" ");
                set_input(&mut input, rest)?;
                break;
            }
        }
    }

    if bindings.is_empty() {
        return Err(format!("error: at least one --field or --optional binding is required\n\n{}", help_text()));
    }
    if threads.is_some() && mode != ExecutionMode::Independent {
        return Err("error: --threads only applies with --parallel".to_string());
    }

    let input = match input {
        Some(value) => value,
        None => read_stdin_input()?,
    };

    if input.trim().is_empty() {
        return Err(format!("error: no input provided\n\n{}", help_text()));
    }

    Ok(CliConfig { input, bindings, mode, threads, report, color })
}

fn set_input(slot: &mut Option<String>, value: String) -> Result<(), String> {
    if slot.is_some() {
        return Err("error: input provided multiple times".to_string());
    }
    *slot = Some(value);
    Ok(())
}

fn parse_binding(value: &str, optional: bool) -> Result<Binding, String> {
    let (name, path) =
        value.split_once('=').ok_or_else(|| format!("error: invalid binding '{value}' (expected NAME=PATH)"))?;
    let (name, path) = (name.trim(), path.trim());
    if name.is_empty() || path.is_empty() {
        return Err(format!("error: invalid binding '{value}' (expected NAME=PATH)"));
    }
    Ok(Binding { name: name.to_string(), path: path.to_string(), optional })
}

fn parse_threads(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("error: invalid --threads '{value}' (expected a positive integer)")),
    }
}

fn read_stdin_input() -> Result<String, String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(|err| format!("error: failed to read stdin: {err}"))?;
    Ok(buffer)
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "jsonpath-mapper {version}

Map fields of a JSON document into a new JSON object using JSONPath rules.

Usage:
  jsonpath-mapper [OPTIONS] -f NAME=PATH... [--] <json...>
  jsonpath-mapper [OPTIONS] -f NAME=PATH... --input <json>
  cat doc.json | jsonpath-mapper [OPTIONS] -f NAME=PATH...

Options:
  -f, --field <NAME=PATH>     Required binding: write the value at PATH as NAME.
  -o, --optional <NAME=PATH>  Optional binding: skipped when PATH is missing.
  -i, --input <json>          Input document. If omitted, reads remaining args
                              or stdin when no args are provided.
  --parallel                  Evaluate rules concurrently (independent mode).
  --threads <n>               Worker threads; requires --parallel. Default: all cores.
  --report                    Print per-rule timings and outcomes to stderr.
  --color                     Force ANSI color in the report.
  --no-color                  Disable ANSI color in the report.
  -h, --help                  Show this help message.
  -V, --version               Print version information.

Environment:
  RUST_LOG=jsonpath_mapper=debug  Log every rule outcome.

Exit codes:
  0  Success.
  1  The document could not be mapped.
  2  Invalid arguments, bindings or missing input.
",
        version = env!("CARGO_PKG_VERSION"),
    )
}
