use std::path::Path;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};

use questmap::config::SETTINGS_FILE;
use questmap::protocol::{dispatch, ClientCommand, ServerEvent};
use questmap::{AchievementBook, AppSettings, JsonStore, QuestMap, Storage};

#[tokio::main]
async fn main() {
    let settings = AppSettings::load(Path::new(SETTINGS_FILE)).unwrap_or_else(|e| {
        eprintln!("{}, using defaults", e);
        AppSettings::default()
    });

    // Initialize logging
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    match settings.log_filter.parse::<tracing_subscriber::filter::Directive>() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(e) => eprintln!("Invalid log filter '{}': {}", settings.log_filter, e),
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let book = match &settings.achievements_file {
        Some(path) => match AchievementBook::load_from_file(path) {
            Ok(book) => {
                info!("Loaded {} achievements from {:?}", book.len(), path);
                book
            }
            Err(e) => {
                warn!("{}, falling back to built-in achievements", e);
                AchievementBook::builtin()
            }
        },
        None => AchievementBook::builtin(),
    };

    let mut store = JsonStore::new(&settings.data_dir);
    let config = match store.load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {}", e);
            return;
        }
    };
    let quests = match store.load_quests() {
        Ok(quests) => quests,
        Err(e) => {
            error!("Failed to load quests: {}", e);
            return;
        }
    };

    let shared = QuestMap::new(config, quests, book).into_shared();
    info!("Quest map ready, reading commands from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<ClientCommand>(&line) {
            Ok(command) => {
                let mutating = command.is_mutating();
                let mut map = shared.lock().await;
                let reply = dispatch(&mut *map, command);
                if mutating {
                    if let Err(e) = store.save_config(map.config()) {
                        error!("Failed to save config: {}", e);
                    }
                    if let Err(e) = store.save_quests(map.quests()) {
                        error!("Failed to save quests: {}", e);
                    }
                }
                reply
            }
            Err(e) => {
                warn!("Malformed command: {}", e);
                ServerEvent::Error {
                    message: format!("Malformed command: {}", e),
                }
            }
        };

        let mut out = match serde_json::to_string(&reply) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to encode reply: {}", e);
                continue;
            }
        };
        out.push('\n');
        if let Err(e) = stdout.write_all(out.as_bytes()).await {
            error!("Failed to write stdout: {}", e);
            break;
        }
        let _ = stdout.flush().await;
    }

    info!("Input closed, shutting down");
}
