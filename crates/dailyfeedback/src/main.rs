//! `dfb` - CLI for dailyfeedback
//!
//! This binary provides the command-line interface for recording and
//! browsing daily team feedback.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::debug;

use dailyfeedback::cli::output::{format_detail, format_json, format_plain, format_table};
use dailyfeedback::cli::{
    AddCommand, Cli, Command, ConfigCommand, DeleteCommand, EditCommand, ExportCommand,
    ListCommand, OutputFormat, RemoteArgs, ShowCommand, ToggleCommand,
};
use dailyfeedback::record::today;
use dailyfeedback::render::render_preview_html;
use dailyfeedback::{
    codec, init_logging, App, Config, Error, FeedbackFilter, HttpRemoteSource, Storage,
};

type FeedbackApp = App<HttpRemoteSource>;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            debug!("{err:?}");
            eprintln!("error: {}", report(&err));
            ExitCode::FAILURE
        }
    }
}

/// The one line shown for a failed command.
fn report(err: &anyhow::Error) -> String {
    match err.downcast_ref::<Error>() {
        Some(inner) if inner.is_remote_load() => inner.user_message(),
        _ => format!("{err:#}"),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Validation reports a broken file instead of failing to load it
    if let Command::Config(ConfigCommand::Validate { file }) = &cli.command {
        validate_config(file.clone().or_else(|| cli.config.clone()));
        return Ok(());
    }

    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Config(cmd) => handle_config(&config, cmd),
        Command::Status(cmd) => handle_status(&config, cmd.json),
        Command::Add(cmd) => handle_add(&mut open_app(&config)?, cmd),
        Command::Edit(cmd) => handle_edit(&mut open_app(&config)?, cmd),
        Command::Delete(cmd) => handle_delete(&mut open_app(&config)?, &cmd),
        Command::List(cmd) => handle_list(&mut open_app(&config)?, &config, cmd).await,
        Command::Show(cmd) => handle_show(&mut open_app(&config)?, &config, &cmd).await,
        Command::Toggle(cmd) => handle_toggle(&mut open_app(&config)?, &config, &cmd).await,
        Command::Members(cmd) => {
            handle_members(&mut open_app(&config)?, &config, &cmd.remote).await
        }
        Command::Export(cmd) => handle_export(&mut open_app(&config)?, &config, cmd).await,
        Command::Import(cmd) => handle_import(&mut open_app(&config)?, &cmd.file),
    }
}

fn open_app(config: &Config) -> anyhow::Result<FeedbackApp> {
    let storage = Storage::open(config.database_path())?;
    let remote = HttpRemoteSource::new(&config.remote.user_agent)?;
    Ok(App::new(storage, remote))
}

/// Switch to a remote snapshot when `--remote` was given.
async fn select_source(
    app: &mut FeedbackApp,
    config: &Config,
    args: &RemoteArgs,
) -> anyhow::Result<()> {
    if let Some(url) = config.remote_url(args.remote.clone())? {
        let count = app.load_remote(&url).await?;
        eprintln!("Remote snapshot {url} ({count} records, read-only)");
    }
    Ok(())
}

fn read_note(note: Option<String>, note_file: Option<&Path>) -> anyhow::Result<Option<String>> {
    match (note, note_file) {
        (Some(note), _) => Ok(Some(note)),
        (None, Some(path)) => std::fs::read_to_string(path)
            .map(Some)
            .with_context(|| format!("failed to read note from {}", path.display())),
        (None, None) => Ok(None),
    }
}

fn encode_images(paths: &[PathBuf]) -> anyhow::Result<Vec<String>> {
    paths
        .iter()
        .map(|path| {
            codec::image_to_data_uri(path)
                .with_context(|| format!("failed to attach {}", path.display()))
        })
        .collect()
}

fn handle_add(app: &mut FeedbackApp, cmd: AddCommand) -> anyhow::Result<()> {
    let note = read_note(cmd.note, cmd.note_file.as_deref())?.unwrap_or_default();
    let images = encode_images(&cmd.images)?;

    let mut draft = app.new_draft(cmd.date.unwrap_or_else(today));
    draft.member = cmd.member;
    draft.note = note;
    draft.images = images;

    let id = app.save(&draft)?;
    println!("Added feedback #{id}");
    Ok(())
}

fn handle_edit(app: &mut FeedbackApp, cmd: EditCommand) -> anyhow::Result<()> {
    let mut draft = app.begin_edit(cmd.id)?;

    if let Some(date) = cmd.date {
        draft.date = date;
    }
    if let Some(member) = cmd.member {
        draft.member = member;
    }
    if let Some(note) = read_note(cmd.note, cmd.note_file.as_deref())? {
        draft.note = note;
    }

    if cmd.clear_images {
        draft.images.clear();
    } else {
        let mut positions: Vec<usize> = cmd.remove_images.iter().map(|&n| n as usize).collect();
        positions.sort_unstable_by(|a, b| b.cmp(a));
        positions.dedup();
        for position in positions {
            if position > draft.images.len() {
                app.cancel_edit();
                bail!(
                    "image {position} does not exist (feedback #{} has {})",
                    cmd.id,
                    draft.images.len()
                );
            }
            draft.images.remove(position - 1);
        }
    }
    draft.images.extend(encode_images(&cmd.images)?);

    let id = app.save(&draft)?;
    println!("Updated feedback #{id}");
    Ok(())
}

fn handle_delete(app: &mut FeedbackApp, cmd: &DeleteCommand) -> anyhow::Result<()> {
    if !cmd.yes {
        let record = app.get(cmd.id)?;
        print!("{}", format_detail(&record));
        println!();
        println!("This will delete feedback #{}. Use --yes to confirm.", cmd.id);
        return Ok(());
    }

    app.delete(cmd.id)?;
    println!("Deleted feedback #{}", cmd.id);
    Ok(())
}

async fn handle_list(
    app: &mut FeedbackApp,
    config: &Config,
    cmd: ListCommand,
) -> anyhow::Result<()> {
    select_source(app, config, &cmd.remote).await?;

    let date = match cmd.date {
        Some(date) => Some(date),
        None if !cmd.all_dates && config.view.default_to_today => Some(today()),
        None => None,
    };
    let filter = FeedbackFilter {
        date,
        member: cmd.member,
    };
    let records = app.list(&filter)?;

    match cmd.format {
        OutputFormat::Json => println!("{}", format_json(&records)?),
        _ if records.is_empty() => println!("No feedback found."),
        OutputFormat::Plain => print!("{}", format_plain(&records)),
        OutputFormat::Table => print!("{}", format_table(&records)),
    }
    Ok(())
}

async fn handle_show(
    app: &mut FeedbackApp,
    config: &Config,
    cmd: &ShowCommand,
) -> anyhow::Result<()> {
    select_source(app, config, &cmd.remote).await?;
    let record = app.get(cmd.id)?;

    if cmd.html {
        println!(
            "{}",
            render_preview_html(&record, &record.effective_item_dones())
        );
    } else {
        print!("{}", format_detail(&record));
    }
    Ok(())
}

async fn handle_toggle(
    app: &mut FeedbackApp,
    config: &Config,
    cmd: &ToggleCommand,
) -> anyhow::Result<()> {
    select_source(app, config, &cmd.remote).await?;

    let item = cmd.item as usize;
    let done = app.toggle_item(cmd.id, item - 1)?;
    println!(
        "Item {item} of #{}: {}",
        cmd.id,
        if done { "done" } else { "not done" }
    );
    Ok(())
}

async fn handle_members(
    app: &mut FeedbackApp,
    config: &Config,
    remote: &RemoteArgs,
) -> anyhow::Result<()> {
    select_source(app, config, remote).await?;
    for member in app.members()? {
        println!("{member}");
    }
    Ok(())
}

async fn handle_export(
    app: &mut FeedbackApp,
    config: &Config,
    cmd: ExportCommand,
) -> anyhow::Result<()> {
    select_source(app, config, &cmd.remote).await?;

    let filter = FeedbackFilter {
        date: cmd.date,
        member: cmd.member,
    };
    let (name, json) = app.export(&filter)?;

    if cmd.output.as_deref() == Some(Path::new("-")) {
        println!("{json}");
        return Ok(());
    }

    let path = match cmd.output {
        Some(path) => path,
        None => {
            let dir = config.export_dir();
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
            dir.join(name)
        }
    };
    std::fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Exported to {}", path.display());
    Ok(())
}

fn handle_import(app: &mut FeedbackApp, file: &Path) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let count = app.import(&json)?;
    println!("Imported {count} records");
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let storage = Storage::open(config.database_path())?;
    let stats = storage.stats()?;

    if json {
        let status = serde_json::json!({
            "database_path": storage.path(),
            "total_records": stats.total_records,
            "members": stats.members,
            "earliest_date": stats.earliest_date,
            "latest_date": stats.latest_date,
            "remote_overlays": stats.remote_overlays,
            "db_size_bytes": stats.db_size_bytes,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("dfb status");
        println!("----------");
        println!("Database:      {}", storage.path().display());
        println!("Records:       {}", stats.total_records);
        println!("Members:       {}", stats.members);
        if let (Some(earliest), Some(latest)) = (&stats.earliest_date, &stats.latest_date) {
            println!("Dates:         {earliest} .. {latest}");
        }
        println!("Remote flags:  {}", stats.remote_overlays);
        println!("Size:          {} bytes", stats.db_size_bytes);
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Remote]");
                println!(
                    "  Default URL:        {}",
                    config.remote.default_url.as_deref().unwrap_or("(none)")
                );
                println!("  User agent:         {}", config.remote.user_agent);
                println!();
                println!("[View]");
                println!("  Default to today:   {}", config.view.default_to_today);
                println!();
                println!("[Export]");
                println!("  Output dir:         {}", config.export_dir().display());
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            validate_config(file);
        }
    }
    Ok(())
}

fn validate_config(file: Option<PathBuf>) {
    let path = file.unwrap_or_else(Config::default_config_path);
    println!("Validating configuration: {}", path.display());
    match Config::load_from(Some(path)) {
        Ok(_) => println!("Configuration is valid."),
        Err(e) => println!("Configuration error: {e}"),
    }
}
