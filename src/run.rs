use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;

use crate::chat::{
    ChatSurface, LanguageSwitcher, MessageOutcome, SwitchOutcome, Transcript, TranslationDriver,
    initial_language,
};
use crate::cli::{ChatCommand, CliOptions, Command, LogsArgs, OutputFormat};
use crate::client::ApiClient;
use crate::config::Config;
use crate::logging::render::{self, ExpandedEntries};
use crate::logging::{LogSource, LogStore};
use crate::types::{ChatLocation, Lang};
use crate::watcher::LogFileWatcher;

const WATCH_DEBOUNCE: Duration = Duration::from_millis(500);

pub async fn run(options: CliOptions, mut config: Config) -> Result<()> {
    if let Some(base_url) = options.base_url {
        config.server.base_url = base_url;
        config.validate()?;
    }

    match options.command {
        Command::Logs(args) => run_logs(&args, &config).await,
        Command::Chat(command) => run_chat(&command, &config).await,
    }
}

fn log_source(args: &LogsArgs, config: &Config) -> Result<LogSource> {
    match args.file.as_ref().or(config.log.log_file.as_ref()) {
        Some(path) => Ok(LogSource::File(path.clone())),
        None => Ok(LogSource::Api(ApiClient::new(&config.server)?)),
    }
}

/// Render the filtered view of the store in the requested format
pub fn render_logs(store: &LogStore, format: OutputFormat, expanded: &ExpandedEntries) -> String {
    match format {
        OutputFormat::Text => render::render_text(store.filtered(), expanded),
        OutputFormat::Html => render::render_html(store.filtered(), expanded),
        OutputFormat::Json => store.export_jsonl().unwrap_or_else(|| {
            tracing::info!("Nothing to copy: the filtered view is empty");
            String::new()
        }),
    }
}

fn print_view(store: &LogStore, args: &LogsArgs, expanded: &ExpandedEntries) {
    if args.modules {
        for module in store.modules() {
            println!("{module}");
        }
    } else {
        println!("{}", render_logs(store, args.format, expanded));
    }
}

fn print_load_error(format: OutputFormat, error: &impl std::fmt::Display) {
    match format {
        OutputFormat::Html => println!("{}", render::render_error_html(&error.to_string())),
        _ => eprintln!("Ошибка загрузки логов: {error}"),
    }
}

pub async fn run_logs(args: &LogsArgs, config: &Config) -> Result<()> {
    let source = log_source(args, config)?;
    tracing::info!("Loading logs from {}", source.describe());

    let mut store = LogStore::new();
    store.set_filter(args.filter(chrono::Local::now().naive_local()));

    let mut expanded = if args.expand {
        ExpandedEntries::all_expanded()
    } else {
        ExpandedEntries::new()
    };

    match source.load().await {
        Ok(entries) => {
            store.replace_all(entries);
            print_view(&store, args, &expanded);
        }
        Err(e) if args.watch => print_load_error(args.format, &e),
        Err(e) => {
            print_load_error(args.format, &e);
            return Err(e).with_context(|| format!("Failed to load logs from {}", source.describe()));
        }
    }

    if !args.watch {
        return Ok(());
    }

    let path = source
        .file_path()
        .context("--watch needs a log file")?
        .to_path_buf();
    let mut watcher = LogFileWatcher::start(path, WATCH_DEBOUNCE)?;

    loop {
        tokio::select! {
            changed = watcher.changed() => {
                if changed.is_none() {
                    tracing::warn!("File watching stopped");
                    break;
                }
                match source.load().await {
                    Ok(entries) => {
                        store.replace_all(entries);
                        expanded.reset();
                        print_view(&store, args, &expanded);
                    }
                    Err(e) => {
                        tracing::error!("Failed to reload logs: {e}");
                        print_load_error(args.format, &e);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received shutdown signal");
                break;
            }
        }
    }

    Ok(())
}

/// Accept either a full page URL or a path below the backend base URL
pub fn resolve_page_url(page: &str, base_url: &Url) -> Result<Url> {
    match Url::parse(page) {
        Ok(url) => Ok(url),
        Err(_) => base_url
            .join(page.trim_start_matches('/'))
            .with_context(|| format!("Invalid chat page: {page}")),
    }
}

fn print_transcript(transcript: &Transcript) {
    print!("{}", transcript.render_text());
}

pub async fn run_chat(command: &ChatCommand, config: &Config) -> Result<()> {
    let api = ApiClient::new(&config.server)?;
    let base_lang = Lang::new(config.chat.base_lang.as_str());
    let switcher = LanguageSwitcher::new(api.clone(), base_lang.clone(), config.translation.fade());

    let (page, requested) = match command {
        ChatCommand::Show { page, lang } => (page, lang.as_deref().map(Lang::from)),
        ChatCommand::Translate { page, lang } | ChatCommand::Switch { page, lang } => {
            (page, Some(Lang::from(lang.as_str())))
        }
    };

    let page_url = resolve_page_url(page, api.base_url())?;
    let location = ChatLocation::from_path(page_url.path())?;
    let page_lang = initial_language(&page_url, &base_lang);

    match command {
        ChatCommand::Show { .. } => {
            let lang = requested.unwrap_or(page_lang);
            let transcript = switcher
                .load(&location, &lang)
                .await
                .with_context(|| format!("Failed to load chat {location} in {lang}"))?;
            print_transcript(&transcript);
        }
        ChatCommand::Translate { .. } => {
            let lang = requested.unwrap_or(page_lang.clone());
            let mut transcript = switcher
                .load(&location, &page_lang)
                .await
                .with_context(|| format!("Failed to load chat {location}"))?;

            let driver = TranslationDriver::new(api, &config.translation);
            let report = driver.translate_chat(&mut transcript, &lang).await;
            print_transcript(&transcript);

            for (index, outcome) in report.outcomes.iter().enumerate() {
                match outcome {
                    MessageOutcome::Translated => {}
                    MessageOutcome::Failed(reason) => {
                        eprintln!("message #{}: kept original ({reason})", index + 1)
                    }
                    MessageOutcome::RateLimitExhausted { retries } => eprintln!(
                        "message #{}: kept original (rate limited after {retries} retries)",
                        index + 1
                    ),
                }
            }
        }
        ChatCommand::Switch { .. } => {
            let lang = requested.unwrap_or(page_lang.clone());
            let mut transcript = switcher
                .load(&location, &page_lang)
                .await
                .with_context(|| format!("Failed to load chat {location}"))?;

            match switcher.select(&page_url, &lang, &mut transcript).await {
                SwitchOutcome::Reload(url) => {
                    println!("Reload: {url}");
                    let transcript = switcher.load(&location, &lang).await?;
                    print_transcript(&transcript);
                }
                SwitchOutcome::Replaced { .. } => {
                    if let Some(title) = crate::chat::title_for(&lang) {
                        transcript.set_title(title);
                    }
                    print_transcript(&transcript);
                }
                SwitchOutcome::Failed(error) => {
                    print_transcript(&transcript);
                    anyhow::bail!("Failed to switch chat {location} to {lang}: {error}");
                }
            }
        }
    }

    Ok(())
}
