#![forbid(unsafe_code)]

use std::{
    fs,
    io::Read as _,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::mpsc,
    time::{Duration, Instant},
};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use docsync_core::{
    config::Config,
    preview::PreviewDocument,
    protocol::{SaveReply, SaveRequest},
    session::{ChangeResponse, EditorSession},
    store::{FileStore, StoreError},
    tree::build_tree,
    watch::FileWatcher,
};
use log::{info, warn};

/// Upper bound on how long `watch` sleeps between checks.
const IDLE_WAIT: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "docsync", about = "Edit, save and watch documents safely", version)]
struct Cli {
    /// Config file to use instead of the per-user one.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a plain-text preview of a file. Use `-` to read Markdown from stdin.
    Preview { path: PathBuf },
    /// Print the file tree under a directory as JSON.
    Tree { dir: PathBuf },
    /// Print the persisted content of a file under a root directory.
    Fetch { root: PathBuf, path: String },
    /// Save new content unless the file changed since `--old` was read.
    Save {
        root: PathBuf,
        path: String,
        /// File holding the new content.
        #[arg(long)]
        content: PathBuf,
        /// File holding the content the edit started from. Defaults to what
        /// is persisted now.
        #[arg(long)]
        old: Option<PathBuf>,
    },
    /// Open a file and follow external changes to it until interrupted.
    Watch { root: PathBuf, path: String },
}

fn main() -> anyhow::Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Preview { path } => preview(&path)?,
        Command::Tree { dir } => {
            let tree = build_tree(&dir)
                .with_context(|| format!("failed to list {}", dir.display()))?;
            println!("{}", serde_json::to_string_pretty(&tree)?);
        }
        Command::Fetch { root, path } => {
            let store = open_store(&root)?;
            print!("{}", store.fetch(&path)?);
        }
        Command::Save {
            root,
            path,
            content,
            old,
        } => return save(&root, path, &content, old.as_deref()),
        Command::Watch { root, path } => {
            let config = load_config(cli.config.as_deref())?;
            watch(&config, &root, &path)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    Ok(config)
}

fn open_store(root: &Path) -> anyhow::Result<FileStore> {
    FileStore::new(root).with_context(|| format!("cannot serve {}", root.display()))
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn preview(path: &Path) -> anyhow::Result<()> {
    let document = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read markdown from stdin")?;
        PreviewDocument::new("stdin.md", buf)
    } else {
        PreviewDocument::new(path, read_text(path)?)
    };
    print!("{}", document.plain_text());
    Ok(())
}

fn save(root: &Path, path: String, content: &Path, old: Option<&Path>) -> anyhow::Result<ExitCode> {
    let store = open_store(root)?;
    let content = read_text(content)?;
    let old_content = match old {
        Some(old) => read_text(old)?,
        None => match store.fetch(&path) {
            Ok(persisted) => persisted,
            Err(StoreError::NotFound(_)) => String::new(),
            Err(err) => return Err(err.into()),
        },
    };

    let request = SaveRequest {
        path,
        content,
        old_content,
    };
    match store.save(&request)? {
        SaveReply::Saved => {
            info!("saved {}", request.path);
            Ok(ExitCode::SUCCESS)
        }
        SaveReply::Conflict(conflict) => {
            eprintln!("{}", conflict.message);
            println!("# your changes");
            print!("{}", conflict.user_diff);
            println!("# changes on disk");
            print!("{}", conflict.current_diff);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn watch(config: &Config, root: &Path, path: &str) -> anyhow::Result<()> {
    if !config.watch.enabled {
        bail!("file watching is disabled in the config");
    }

    let mut session = EditorSession::new(open_store(root)?, config.coordinator_settings());
    session.open(path)?;

    let (tx, rx) = mpsc::channel();
    let watcher = FileWatcher::new(root, tx)?;
    info!("watching {} in {}", path, watcher.root().display());

    loop {
        let wait = session
            .next_deadline()
            .map_or(IDLE_WAIT, |at| at.saturating_duration_since(Instant::now()))
            .min(IDLE_WAIT);

        match rx.recv_timeout(wait) {
            Ok(event) => match session.handle_file_change(&event) {
                Ok(ChangeResponse::Ignored) => {}
                Ok(ChangeResponse::Reloaded) => info!("{path} reloaded from disk"),
                Ok(ChangeResponse::NeedsReload) => {
                    warn!("{path} changed on disk while it has unsaved edits");
                }
                Err(err) => warn!("{err}"),
            },
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => bail!("file watcher stopped"),
        }

        if let Some(outcome) = session.tick(Instant::now()) {
            info!("auto-save of {path}: {outcome:?}");
        }
    }
}
