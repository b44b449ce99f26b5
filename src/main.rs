//! batch-synth CLI entry point.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use batch_synth::backend::{
    Backend, CloneBackend, FetchBackend, FetchOptions, SpeechBackend, SpeechOptions,
};
use batch_synth::cli::{Args, BackendKind, Reference};
use batch_synth::config::Settings;
use batch_synth::pipeline::{
    Outcome, OutputNaming, Pipeline, RunOptions, Session, WorkItem, load_items,
};

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let settings = Settings::load(args.config.as_deref()).context("Failed to load settings")?;
    let items = read_items(&args)?;

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| settings.output_dir.clone());
    let options = RunOptions {
        on_existing: args.on_existing.unwrap_or(settings.on_existing),
        delay: Duration::from_millis(args.delay.unwrap_or(settings.delay_ms)),
    };
    let timeout = Duration::from_secs(settings.timeout_secs);
    let base_url = base_url(&args, &settings);

    warn_ignored_options(&args);

    match args.backend {
        kind @ (BackendKind::Coqui | BackendKind::Bark) => {
            let backend = SpeechBackend::new(
                kind,
                &base_url,
                timeout,
                SpeechOptions {
                    model: args.model.clone(),
                    voice: args.voice.clone(),
                    language: Some(settings.language_or(args.language.as_deref())),
                    speed: args.speed,
                    format: args.format,
                },
            );
            let naming = OutputNaming::new(output_dir, args.format.extension());
            run_batch(kind, backend, &items, naming, options, args.manifest)
        }
        BackendKind::Xtts => {
            let Some(reference) = &args.reference else {
                bail!("The xtts backend needs a voice sample: -r sample.wav[;transcript]");
            };
            let reference =
                Reference::parse(reference).context("Failed to parse reference sample")?;
            let language = settings.language_or(args.language.as_deref());

            let backend =
                CloneBackend::new(&base_url, timeout, reference, language, args.speed, args.format);
            let naming = OutputNaming::new(output_dir, args.format.extension());
            run_batch(BackendKind::Xtts, backend, &items, naming, options, args.manifest)
        }
        BackendKind::Fetch => {
            let backend = FetchBackend::new(
                &base_url,
                timeout,
                FetchOptions {
                    extract: args.extract,
                    selector: args.selector.clone(),
                    wait_ms: args.wait,
                    stealth: args.stealth,
                    api_key: settings.reader_api_key.clone(),
                },
            );
            let naming = OutputNaming::new(output_dir, args.extract.extension());
            run_batch(BackendKind::Fetch, backend, &items, naming, options, args.manifest)
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Items come from the input file, or from a single `-g` payload.
fn read_items(args: &Args) -> Result<Vec<WorkItem>> {
    if let Some(path) = &args.input {
        return load_items(path).context("Failed to read work items");
    }

    match args.generate.as_deref().map(str::trim) {
        Some(payload) if !payload.is_empty() => Ok(vec![WorkItem::single(payload)]),
        Some(_) => bail!("The item given with -g cannot be empty"),
        None => bail!("No input. Use -i <file> for a batch or -g <text|url> for one item."),
    }
}

fn base_url(args: &Args, settings: &Settings) -> String {
    if let Some(url) = &args.url {
        return url.clone();
    }

    match args.backend.port() {
        Some(port) => format!("http://{}:{port}", args.host.as_deref().unwrap_or(&settings.host)),
        None => settings.reader_url.clone(),
    }
}

fn warn_ignored_options(args: &Args) {
    let mut ignored = Vec::new();
    let mut flag = |set: bool, name: &'static str| {
        if set {
            ignored.push(name);
        }
    };

    match args.backend {
        BackendKind::Coqui | BackendKind::Bark => {
            flag(args.reference.is_some(), "--reference");
        }
        BackendKind::Xtts => {
            flag(args.model.is_some(), "--model");
            flag(args.voice.is_some(), "--voice");
        }
        BackendKind::Fetch => {
            flag(args.model.is_some(), "--model");
            flag(args.voice.is_some(), "--voice");
            flag(args.language.is_some(), "--language");
            flag(args.reference.is_some(), "--reference");
            flag(args.host.is_some(), "--host");
        }
    }

    if args.backend.is_speech() {
        flag(args.stealth, "--stealth");
        flag(args.wait > 0, "--wait");
        flag(args.selector.is_some(), "--selector");
    }

    if !ignored.is_empty() {
        warn!(
            backend = args.backend.as_str(),
            "ignoring options: {}",
            ignored.join(", ")
        );
    }
}

fn run_batch<B: Backend>(
    kind: BackendKind,
    backend: B,
    items: &[WorkItem],
    naming: OutputNaming,
    options: RunOptions,
    manifest: bool,
) -> Result<()> {
    let output_dir: PathBuf = naming.dir().to_path_buf();

    println!("Backend: {}", kind.name());
    println!("Items: {}", items.len());

    let mut session = Session::new(backend);
    let pipeline = Pipeline::new(naming, options);

    let report = pipeline
        .run(&mut session, items, |total, item, outcome| match outcome {
            Outcome::Success { path } => {
                println!("[{}/{}] {}", item.index, total, path.display());
            }
            Outcome::Failure { reason } => {
                println!("[{}/{}] FAILED: {}", item.index, total, reason);
            }
        })
        .with_context(|| format!("{} run aborted", kind.name()))?;

    let summary = report.summary;
    println!();
    println!(
        "Done: attempted={} succeeded={} failed={} (output: {})",
        summary.attempted,
        summary.succeeded,
        summary.failed,
        output_dir.display()
    );

    if manifest {
        let path = report
            .write_manifest()
            .context("Failed to write run manifest")?;
        println!("Manifest saved to: {}", path.display());
    }

    Ok(())
}
