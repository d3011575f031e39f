use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};
use namu_core::{
    BOOKMARKS_EXPORT_FILE_NAME, BookmarkBackend, BookmarksRepository, CloudKeyValueStore,
    DeepLink, HISTORY_EXPORT_FILE_NAME, HistoryRepository, JsonFileKeyValueStore,
    PreferenceChange, PreferenceStore, QuickAction, SharedCloudStore, parse_deep_link,
    parse_table_of_contents, write_export,
};
use serde_json::json;

#[derive(Debug, Parser)]
#[command(name = "namu")]
#[command(about = "Inspect and edit NamuViewer bookmarks, history and settings")]
struct Cli {
    /// App data directory (lists, preferences and config live here)
    #[arg(long, env = "NAMU_DATA_DIR", default_value = ".namu")]
    data_dir: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Bookmarked document titles
    Bookmarks {
        /// Storage to operate on; defaults to whatever the settings select
        #[arg(long, value_enum)]
        backend: Option<BackendArg>,

        #[command(subcommand)]
        op: ListOp,
    },

    /// Recently visited document titles
    History {
        #[command(subcommand)]
        op: ListOp,
    },

    /// Decode a namuviewer:// URL or a quick action identifier
    Deeplink {
        /// URL or quick action identifier
        input: String,
    },

    /// Extract table-of-contents entries from a document's HTML
    Toc {
        /// HTML file; reads stdin when omitted
        file: Option<PathBuf>,
    },

    /// Show or change settings
    Prefs {
        #[command(subcommand)]
        op: PrefsOp,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    Local,
    Cloud,
}

impl From<BackendArg> for BookmarkBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Local => BookmarkBackend::Local,
            BackendArg::Cloud => BookmarkBackend::Cloud,
        }
    }
}

#[derive(Debug, Subcommand)]
enum ListOp {
    /// Print the list, most recent first
    List,
    /// Insert a title at the front
    Add { title: String },
    /// Remove entries by position
    Remove {
        #[arg(required = true)]
        offsets: Vec<u32>,
    },
    /// Remove every entry
    Clear,
    /// Write the list as newline-separated text
    Export {
        /// Output directory; defaults to <data-dir>/cache
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
enum PrefsOp {
    Show,
    /// Keys: adblock, ignore-dark-mode, history, cloud-bookmarks, youtube-app, accent-color
    Set { key: String, value: String },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.cmd {
        Command::Bookmarks { backend, op } => cmd_bookmarks(&cli, *backend, op),
        Command::History { op } => cmd_history(&cli, op),
        Command::Deeplink { input } => cmd_deeplink(input),
        Command::Toc { file } => cmd_toc(file.as_deref()),
        Command::Prefs { op } => cmd_prefs(&cli, op),
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn data_dir(cli: &Cli) -> anyhow::Result<String> {
    std::fs::create_dir_all(&cli.data_dir)
        .with_context(|| format!("create data dir {}", cli.data_dir.display()))?;
    tracing::debug!(data_dir = %cli.data_dir.display(), "using data dir");
    cli.data_dir
        .to_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("data dir is not valid UTF-8: {}", cli.data_dir.display()))
}

fn print(v: serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&v).context("json encode")?);
    Ok(())
}

fn export_dir(data_dir: &str, out_dir: Option<&Path>) -> PathBuf {
    out_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| Path::new(data_dir).join("cache"))
}

/// Parses a `prefs set` pair into the change the app would apply.
fn preference_change(key: &str, value: &str) -> anyhow::Result<PreferenceChange> {
    let flag = || -> anyhow::Result<bool> {
        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "1" | "yes" => Ok(true),
            "false" | "off" | "0" | "no" => Ok(false),
            other => bail!("expected a boolean, got {other:?}"),
        }
    };
    Ok(match key {
        "adblock" => PreferenceChange::AdBlock { enabled: flag()? },
        "ignore-dark-mode" => PreferenceChange::IgnoreDarkMode { enabled: flag()? },
        "history" => PreferenceChange::HistoryEnabled { enabled: flag()? },
        "cloud-bookmarks" => PreferenceChange::UseCloudBookmarks { enabled: flag()? },
        "youtube-app" => PreferenceChange::OpenVideoInApp { enabled: flag()? },
        "accent-color" => PreferenceChange::AccentColor {
            hex: value.to_string(),
        },
        other => bail!("unknown preference key: {other}"),
    })
}

fn deep_link_json(link: &DeepLink) -> serde_json::Value {
    match link {
        DeepLink::OpenUrl { url } => json!({ "kind": link.tag(), "url": url }),
        DeepLink::Search { text } => json!({ "kind": link.tag(), "text": text }),
        DeepLink::OpenBookmarks => json!({ "kind": link.tag() }),
    }
}

// ── Commands ────────────────────────────────────────────────────────────────

fn cmd_bookmarks(cli: &Cli, backend: Option<BackendArg>, op: &ListOp) -> anyhow::Result<()> {
    let data_dir = data_dir(cli)?;
    let prefs = PreferenceStore::load(&data_dir);
    let backend = backend
        .map(BookmarkBackend::from)
        .unwrap_or_else(|| BookmarkBackend::from_preferences(prefs.get()));
    let cloud: Arc<dyn CloudKeyValueStore> = Arc::new(JsonFileKeyValueStore::in_data_dir(&data_dir));
    let cloud: SharedCloudStore = Arc::new(RwLock::new(cloud));
    let repo = BookmarksRepository::in_data_dir(&data_dir, cloud);
    repo.ensure_initialized(backend).context("initialize bookmarks")?;

    match op {
        ListOp::List => {
            let items = repo.load(backend).context("load bookmarks")?;
            print(json!({ "backend": format!("{backend:?}"), "bookmarks": items }))
        }
        ListOp::Add { title } => {
            repo.insert_first(backend, title).context("add bookmark")?;
            print(json!({ "added": title }))
        }
        ListOp::Remove { offsets } => {
            let remaining = repo.remove_at(backend, offsets).context("remove bookmarks")?;
            print(json!({ "bookmarks": remaining }))
        }
        ListOp::Clear => {
            repo.remove_all(backend).context("clear bookmarks")?;
            print(json!({ "cleared": true }))
        }
        ListOp::Export { out_dir } => {
            let text = repo
                .export_text(backend)
                .ok_or_else(|| anyhow!("bookmarks could not be read"))?;
            let dir = export_dir(&data_dir, out_dir.as_deref());
            let path = write_export(&dir, BOOKMARKS_EXPORT_FILE_NAME, &text)
                .context("write bookmarks export")?;
            print(json!({ "path": path.display().to_string() }))
        }
    }
}

fn cmd_history(cli: &Cli, op: &ListOp) -> anyhow::Result<()> {
    let data_dir = data_dir(cli)?;
    let repo = HistoryRepository::in_data_dir(&data_dir);
    repo.ensure_initialized().context("initialize history")?;

    match op {
        ListOp::List => {
            let items = repo.load().context("load history")?;
            print(json!({ "history": items }))
        }
        ListOp::Add { title } => {
            repo.insert_first(title).context("add history entry")?;
            print(json!({ "history": repo.load().context("load history")? }))
        }
        ListOp::Remove { offsets } => {
            let remaining = repo.remove_at(offsets).context("remove history entries")?;
            print(json!({ "history": remaining }))
        }
        ListOp::Clear => {
            repo.remove_all().context("clear history")?;
            print(json!({ "cleared": true }))
        }
        ListOp::Export { out_dir } => {
            let text = repo
                .export_text()
                .ok_or_else(|| anyhow!("history could not be read"))?;
            let dir = export_dir(&data_dir, out_dir.as_deref());
            let path = write_export(&dir, HISTORY_EXPORT_FILE_NAME, &text)
                .context("write history export")?;
            print(json!({ "path": path.display().to_string() }))
        }
    }
}

fn cmd_deeplink(input: &str) -> anyhow::Result<()> {
    if let Some(action) = QuickAction::from_identifier(input.trim()) {
        return print(json!({ "quick_action": format!("{action:?}") }));
    }
    match parse_deep_link(input) {
        Some(link) => print(deep_link_json(&link)),
        None => bail!("not a recognised deep link: {input}"),
    }
}

fn cmd_toc(file: Option<&Path>) -> anyhow::Result<()> {
    let html = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("read stdin")?;
            buf
        }
    };
    let entries = parse_table_of_contents(&html).context("parse table of contents")?;
    let out: Vec<_> = entries
        .iter()
        .map(|e| json!({ "anchor": e.anchor, "title": e.title, "depth": e.depth }))
        .collect();
    print(json!({ "entries": out }))
}

fn cmd_prefs(cli: &Cli, op: &PrefsOp) -> anyhow::Result<()> {
    let data_dir = data_dir(cli)?;
    let mut store = PreferenceStore::load(&data_dir);
    match op {
        PrefsOp::Show => {
            let prefs = serde_json::to_value(store.get()).context("encode preferences")?;
            print(prefs)
        }
        PrefsOp::Set { key, value } => {
            let change = preference_change(key, value)?;
            let tag = change.tag();
            let changed = store.apply(change).context("save preferences")?;
            tracing::info!(change = tag, changed, "preference set");
            print(json!({ "changed": changed }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_boolean_preferences() {
        assert_eq!(
            preference_change("adblock", "on").unwrap(),
            PreferenceChange::AdBlock { enabled: true }
        );
        assert_eq!(
            preference_change("history", "0").unwrap(),
            PreferenceChange::HistoryEnabled { enabled: false }
        );
        assert!(preference_change("youtube-app", "maybe").is_err());
    }

    #[test]
    fn rejects_unknown_preference_key() {
        assert!(preference_change("font-size", "12").is_err());
    }

    #[test]
    fn accent_color_is_passed_through() {
        assert_eq!(
            preference_change("accent-color", "#ff0000").unwrap(),
            PreferenceChange::AccentColor {
                hex: "#ff0000".into()
            }
        );
    }

    #[test]
    fn export_dir_defaults_under_data_dir() {
        assert_eq!(export_dir("/data", None), PathBuf::from("/data/cache"));
        assert_eq!(
            export_dir("/data", Some(Path::new("/out"))),
            PathBuf::from("/out")
        );
    }

    #[test]
    fn deep_link_json_shapes() {
        let link = parse_deep_link("namuviewer://?search=abc").unwrap();
        assert_eq!(deep_link_json(&link), json!({ "kind": "Search", "text": "abc" }));
        let link = parse_deep_link("namuviewer://bookmark").unwrap();
        assert_eq!(deep_link_json(&link), json!({ "kind": "OpenBookmarks" }));
    }

    #[test]
    fn cli_parses_bookmark_backend() {
        let cli = Cli::try_parse_from(["namu", "bookmarks", "--backend", "cloud", "list"]).unwrap();
        match cli.cmd {
            Command::Bookmarks { backend, op } => {
                assert!(matches!(backend, Some(BackendArg::Cloud)));
                assert!(matches!(op, ListOp::List));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
