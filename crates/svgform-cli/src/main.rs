use futures::executor::block_on;
use serde::Serialize;
use std::io::Read;
use std::str::FromStr;
use svgform::overlay::{
    Diagnostics, FormHost, MemoryView, OverlayOptions, ResolvedField, SvgDocument,
    SvgDocumentError,
};
use svgform::{
    ConfigError, Dialect, DocumentSource, FileFetcher, FormConfig, FormSession, LoadError,
    Producer, RuleProblem, ScanResult, load_document, presets, scan, validate_rules,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Config(ConfigError),
    Load(LoadError),
    Rendered(SvgDocumentError),
    Json(serde_json::Error),
    InvalidRules(usize),
    Structural(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Config(err) => write!(f, "{err}"),
            CliError::Load(err) => write!(f, "{err}"),
            CliError::Rendered(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::InvalidRules(n) => write!(f, "{n} rule problem(s) found"),
            CliError::Structural(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<LoadError> for CliError {
    fn from(value: LoadError) -> Self {
        Self::Load(value)
    }
}

impl From<SvgDocumentError> for CliError {
    fn from(value: SvgDocumentError) -> Self {
        Self::Rendered(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Scan,
    Validate,
    Resolve,
}

/// `--dialect` value; `auto` clears any dialect forced by the config or `--producer`.
#[derive(Debug, Clone, Copy)]
struct DialectArg(Option<Dialect>);

impl FromStr for DialectArg {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(Self(None));
        }
        Dialect::parse(s).map(|d| Self(Some(d))).ok_or(())
    }
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    config: Option<String>,
    dialect: Option<DialectArg>,
    producer: Option<Producer>,
    rendered: Option<String>,
    pretty: bool,
    verbose: bool,
}

#[derive(Serialize)]
struct ValidateOut<'a> {
    valid: bool,
    problems: &'a [RuleProblem],
}

#[derive(Serialize)]
struct ResolveOut<'a> {
    fields: &'a [ResolvedField],
    diagnostics: Option<&'a Diagnostics>,
}

fn usage() -> &'static str {
    "svgform-cli\n\
\n\
USAGE:\n\
  svgform-cli [scan] [--config <path>] [--dialect auto|direct|embedded] [--producer drawio|figma|inkscape|illustrator] [--pretty] [--verbose] [<path>|<file-url>|-]\n\
  svgform-cli validate [--config <path>] [--pretty]\n\
  svgform-cli resolve [--config <path>] [--dialect ...] [--producer ...] [--rendered <path>] [--pretty] [--verbose] [<path>|<file-url>|-]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', input is read from stdin.\n\
  - --config accepts JSON, or YAML when the file ends in .yaml/.yml.\n\
  - Without --config the rules are: prefix 'input-' -> input, prefix 'output-' -> output.\n\
  - resolve measures geometry in --rendered (default: the input document itself).\n\
  - Exit codes: 0 ok, 1 error, 2 usage, 3 structural scan failure.\n\
  - RUST_LOG overrides the log filter; --verbose defaults it to debug.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "scan" => args.command = Command::Scan,
            "validate" => args.command = Command::Validate,
            "resolve" => args.command = Command::Resolve,
            "--pretty" => args.pretty = true,
            "--verbose" | "-v" => args.verbose = true,
            "--config" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.config = Some(path.clone());
            }
            "--dialect" => {
                let Some(raw) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.dialect = Some(
                    raw.parse::<DialectArg>()
                        .map_err(|_| CliError::Usage(usage()))?,
                );
            }
            "--producer" => {
                let Some(raw) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.producer = Some(Producer::parse(raw).ok_or(CliError::Usage(usage()))?);
            }
            "--rendered" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.rendered = Some(path.clone());
            }
            "-" => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some("-".to_string());
            }
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,svgform={level},svgform_core={level},svgform_overlay={level},svgform_cli={level}"
        ))
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(raw) if raw.starts_with("file://") => {
            let source = DocumentSource::url(raw)?;
            Ok(block_on(load_document(&source, &FileFetcher))?)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    Ok(())
}

fn load_config(args: &Args) -> Result<FormConfig, CliError> {
    let mut config = match args.config.as_deref() {
        None => FormConfig {
            rules: presets::default_rule_specs(),
            ..FormConfig::default()
        },
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            if path.ends_with(".yaml") || path.ends_with(".yml") {
                FormConfig::from_yaml_str(&text)?
            } else {
                FormConfig::from_json_str(&text)?
            }
        }
    };
    if let Some(producer) = args.producer {
        config.dialect = producer.forced_dialect();
    }
    if let Some(DialectArg(dialect)) = args.dialect {
        config.dialect = dialect;
    }
    Ok(config)
}

fn structural_failure(result: &ScanResult) -> Option<CliError> {
    result
        .errors
        .iter()
        .find(|e| e.is_structural())
        .map(|e| CliError::Structural(e.to_string()))
}

#[derive(Default)]
struct DiagnosticsHost {
    last: Option<Diagnostics>,
}

impl FormHost for DiagnosticsHost {
    fn on_diagnostics(&mut self, diagnostics: &Diagnostics) {
        self.last = Some(diagnostics.clone());
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let config = load_config(&args)?;

    match args.command {
        Command::Validate => {
            let problems = validate_rules(&config.rules);
            write_json(
                &ValidateOut {
                    valid: problems.is_empty(),
                    problems: &problems,
                },
                args.pretty,
            )?;
            if problems.is_empty() {
                Ok(())
            } else {
                Err(CliError::InvalidRules(problems.len()))
            }
        }
        Command::Scan => {
            let text = read_input(args.input.as_deref())?;
            let compiled = config.compile();
            for problem in &compiled.problems {
                tracing::warn!("{problem}");
            }
            let result = scan(&text, &compiled.rules, &config.scan_options());
            write_json(&result, args.pretty)?;
            match structural_failure(&result) {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
        Command::Resolve => {
            let text = read_input(args.input.as_deref())?;
            let rendered_text = match args.rendered.as_deref() {
                Some(path) => read_input(Some(path))?,
                None => text.clone(),
            };

            let mut session = FormSession::new(config, MemoryView::new(), OverlayOptions::default());
            for problem in session.problems() {
                tracing::warn!("{problem}");
            }
            let failure = structural_failure(session.load_text(&text));

            let document = SvgDocument::parse(&rendered_text)?;
            let mut host = DiagnosticsHost::default();
            session.attach(&document, &mut host);
            write_json(
                &ResolveOut {
                    fields: session.fields(),
                    diagnostics: host.last.as_ref(),
                },
                args.pretty,
            )?;
            match failure {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
    }
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };
    init_logging(args.verbose);

    match run(args) {
        Ok(()) => {}
        Err(err @ CliError::Structural(_)) => {
            eprintln!("{err}");
            std::process::exit(3);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
