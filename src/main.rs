use versiondropper::cli::{Args, Command};
use versiondropper::config::{self, DropperSettings, PathConfig};
use versiondropper::event_bus::DropBus;
use versiondropper::handler::DropHandler;
use versiondropper::node_graph::MemoryGraph;
use versiondropper::query::MemoryQuery;
use versiondropper::utils::sequences::group_sequences;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use std::path::Path;

fn init_logging(args: &Args, path_config: &PathConfig) -> Result<()> {
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(log_path_opt) = &args.log_file {
        let log_path = log_path_opt
            .as_ref()
            .cloned()
            .unwrap_or_else(|| config::data_file(config::LOG_FILE, path_config));

        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!(
            "Logging to file: {} (level: {:?})",
            log_path.display(),
            log_level
        );
    } else {
        // Console logging, respects RUST_LOG if set
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .format_timestamp_millis()
            .init();
    }
    Ok(())
}

fn run_drop(settings: DropperSettings, records: &Path, mime: &str, text: &str) -> Result<bool> {
    let store = MemoryQuery::load(records)?;
    let graph = MemoryGraph::new();

    let bus = DropBus::new();
    let _handler = DropHandler::new(settings, store, graph.clone()).register(&bus);

    let consumed = bus.dispatch(mime, text);
    for event in bus.poll() {
        debug!("Drop event: {:?}", event);
    }

    let nodes = graph.nodes();
    println!("{}", serde_json::to_string_pretty(&nodes)?);
    if !consumed {
        eprintln!("Drop declined: not a tracking-site link");
    }
    Ok(consumed)
}

fn run_scan(dir: &Path, extensions: &[String], frame_spec: Option<&str>) -> Result<()> {
    let exts: Vec<&str> = extensions.iter().map(String::as_str).collect();
    let sequences = group_sequences(dir, Some(exts.as_slice()), frame_spec)?;
    for seq in &sequences {
        match seq.frame_range() {
            Some((first, last)) => println!(
                "{}  {}-{}  ({} frames)",
                seq.template_path.display(),
                first,
                last,
                seq.frame_count()
            ),
            None => println!("{}  ({} frames)", seq.template_path.display(), seq.frame_count()),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let path_config = PathConfig::from_env_and_cli(args.config_dir.clone());
    if let Err(e) = config::ensure_dirs(&path_config) {
        eprintln!("Warning: Failed to create application directories: {}", e);
    }

    init_logging(&args, &path_config)?;
    debug!("Command-line args: {:?}", args);
    info!(
        "Config path: {}",
        config::config_file(config::SETTINGS_FILE, &path_config).display()
    );

    match &args.command {
        Command::Drop {
            text,
            records,
            mime,
        } => {
            let settings = DropperSettings::resolve(args.settings.as_deref(), &path_config)?;
            if !run_drop(settings, records, mime, text)? {
                std::process::exit(1);
            }
        }
        Command::Scan {
            dir,
            extensions,
            frame_spec,
        } => run_scan(dir, extensions, frame_spec.as_deref())?,
    }

    Ok(())
}
