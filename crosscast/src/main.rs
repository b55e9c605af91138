//! crosscast - Post one message to Telegram, VK and Twitter at once

use anyhow::Context;
use clap::{Parser, ValueEnum};
use libcrosscast::config::PlatformSummary;
use libcrosscast::dispatcher::{Preflight, ALL_PLATFORMS};
use libcrosscast::error::ConfigError;
use libcrosscast::{
    Config, CrosscastError, DispatchReport, DispatchResult, Dispatcher, FileSessionStore,
    MessageId, PlatformId, TestOutcome,
};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "crosscast")]
#[command(version)]
#[command(about = "Post one message to Telegram, VK and Twitter at once")]
#[command(long_about = "\
crosscast - Post one message to Telegram, VK and Twitter at once

DESCRIPTION:
    crosscast sends a message to every selected platform, or to none of them.
    Before anything is sent, each platform's credentials and the message
    itself are checked; a single failing check cancels the whole broadcast.

USAGE:
    crosscast \"Hello, world\"
    echo \"Hello, world\" | crosscast --platform telegram,vk
    crosscast \"Hello\" --dry-run
    crosscast --test
    crosscast --status
    crosscast --delete 42 --platform telegram --chat @mychannel

CONFIGURATION:
    Credentials come from the environment (or a .env file):
      Telegram: TELEGRAM_BOT_TOKEN + TELEGRAM_CHANNEL_ID, or
                TELEGRAM_API_ID + TELEGRAM_API_HASH + TELEGRAM_PHONE + TELEGRAM_CHAT
      VK:       VK_ACCESS_TOKEN + VK_OWNER_ID
      Twitter:  TWITTER_CLIENT_ID + TWITTER_CLIENT_SECRET, or
                TWITTER_API_KEY + TWITTER_API_KEY_SECRET,
                each with TWITTER_ACCESS_TOKEN + TWITTER_ACCESS_TOKEN_SECRET;
                or TWITTER_BEARER_TOKEN (read-only)

EXIT CODES:
    0 - Every platform succeeded
    1 - A platform failed, or a configuration error
    2 - Authentication failure
    3 - Invalid input (empty message, unknown platform)
")]
struct Cli {
    /// Message to post (reads from stdin if not provided)
    message: Option<String>,

    /// Target platform(s), comma-separated: telegram, vk, twitter or all
    #[arg(short, long, value_delimiter = ',', default_value = ALL_PLATFORMS)]
    platform: Vec<String>,

    /// Run the configuration and validation checks without sending
    #[arg(long)]
    dry_run: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Load environment variables from this file instead of ./.env
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Post and delete a test message on every platform
    #[arg(long, conflicts_with_all = ["status", "delete", "dry_run"])]
    test: bool,

    /// Show which credential scheme each platform would use
    #[arg(long, conflicts_with = "delete")]
    status: bool,

    /// Delete a previously posted message (needs exactly one --platform)
    #[arg(long, value_name = "ID")]
    delete: Option<String>,

    /// Chat holding the message to delete (Telegram)
    #[arg(long, value_name = "LOCATOR", requires = "delete")]
    chat: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = load_env(cli.env_file.as_deref()) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }

    libcrosscast::logging::init_default(cli.verbose);

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let code = e
                .downcast_ref::<CrosscastError>()
                .map(CrosscastError::exit_code)
                .unwrap_or(1);
            std::process::exit(code);
        }
    }
}

fn load_env(path: Option<&Path>) -> libcrosscast::Result<()> {
    match path {
        Some(path) => dotenvy::from_path(path).map_err(|e| {
            ConfigError::EnvFile(format!("{}: {}", path.display(), e)).into()
        }),
        None => {
            // A missing ./.env is normal
            dotenvy::dotenv().ok();
            Ok(())
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let platforms = check_platforms(&cli.platform)?;
    let config = Config::from_env()?;

    if cli.status {
        print_status(&config.summary(), cli.format)?;
        return Ok(0);
    }

    let store = Arc::new(FileSessionStore::from_config(&config));

    if let Some(id) = &cli.delete {
        let platform = single_platform(&platforms)?;
        let dispatcher = Dispatcher::from_config(&config, store).await;
        let result = dispatcher
            .delete(platform, &parse_message_id(id), cli.chat.as_deref())
            .await
            .map_err(CrosscastError::from)?;

        let results = vec![result];
        print_results(&results, cli.format)?;
        return Ok(exit_code(&results));
    }

    if cli.test {
        let dispatcher = Dispatcher::from_config(&config, store).await;
        let outcomes = dispatcher.test_all().await;
        print_test_outcomes(&outcomes, cli.format)?;
        return Ok(if outcomes.iter().all(|(_, o)| o.success) { 0 } else { 1 });
    }

    let message = read_message(cli.message)?;
    let dispatcher = Dispatcher::from_config(&config, store).await;

    if cli.dry_run {
        let preflight = dispatcher
            .preflight(&message, &platforms)
            .map_err(CrosscastError::from)?;
        print_preflight(&preflight, &message, cli.format)?;
        return Ok(if preflight.passed() { 0 } else { 1 });
    }

    let results = dispatcher
        .dispatch(&message, &platforms)
        .await
        .map_err(CrosscastError::from)?;

    print_results(&results, cli.format)?;
    Ok(exit_code(&results))
}

/// Reject unknown platform names before they reach the dispatcher
fn check_platforms(requested: &[String]) -> libcrosscast::Result<Vec<String>> {
    let names: Vec<String> = requested
        .iter()
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    if names.is_empty() {
        return Err(CrosscastError::InvalidInput(
            "No platforms given. Use --platform telegram,vk,twitter or all".to_string(),
        ));
    }

    for name in &names {
        if name != ALL_PLATFORMS {
            name.parse::<PlatformId>()
                .map_err(|e| CrosscastError::InvalidInput(e.to_string()))?;
        }
    }

    Ok(names)
}

fn single_platform(names: &[String]) -> libcrosscast::Result<PlatformId> {
    match names {
        [name] if name != ALL_PLATFORMS => name
            .parse::<PlatformId>()
            .map_err(|e| CrosscastError::InvalidInput(e.to_string())),
        _ => Err(CrosscastError::InvalidInput(
            "--delete needs exactly one --platform (telegram, vk or twitter)".to_string(),
        )),
    }
}

fn parse_message_id(raw: &str) -> MessageId {
    match raw.trim().parse::<i64>() {
        Ok(id) => MessageId::Int(id),
        Err(_) => MessageId::Str(raw.trim().to_string()),
    }
}

/// Message from the argument, or from stdin when piped
fn read_message(arg: Option<String>) -> libcrosscast::Result<String> {
    let message = match arg {
        Some(message) => message,
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| CrosscastError::InvalidInput(format!("Failed to read stdin: {}", e)))?;
            buffer.trim_end_matches(['\n', '\r']).to_string()
        }
        None => {
            return Err(CrosscastError::InvalidInput(
                "No message provided. Pass it as an argument or pipe it on stdin".to_string(),
            ))
        }
    };

    if message.trim().is_empty() {
        return Err(CrosscastError::InvalidInput(
            "Message cannot be empty".to_string(),
        ));
    }

    Ok(message)
}

fn exit_code(results: &[DispatchResult]) -> i32 {
    if results.all_succeeded() {
        0
    } else if results.has_authentication_failure() {
        2
    } else {
        1
    }
}

fn print_results(results: &[DispatchResult], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(results).context("Failed to serialize results")?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            for result in results {
                println!("{}", result_line(result));
            }
        }
    }
    Ok(())
}

fn result_line(result: &DispatchResult) -> String {
    if result.success {
        let id = result
            .message_id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "sent".to_string());
        match &result.method {
            Some(method) => format!("✓ {}: {} ({})", result.platform, id, method),
            None => format!("✓ {}: {}", result.platform, id),
        }
    } else {
        format!(
            "✗ {}: {}",
            result.platform,
            result.error.as_deref().unwrap_or("failed")
        )
    }
}

fn print_preflight(preflight: &Preflight, message: &str, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "dry_run": true,
                "passed": preflight.passed(),
                "platforms": preflight.selected,
                "failures": preflight.failures,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            if preflight.passed() {
                let count = message.chars().count();
                for platform in &preflight.selected {
                    println!("✓ {}: would send ({} characters)", platform, count);
                }
            } else {
                for failure in &preflight.failures {
                    println!("{}", result_line(failure));
                }
                println!("Nothing would be sent.");
            }
        }
    }
    Ok(())
}

fn print_test_outcomes(
    outcomes: &[(PlatformId, TestOutcome)],
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let json: Vec<_> = outcomes
                .iter()
                .map(|(platform, outcome)| {
                    serde_json::json!({
                        "platform": platform,
                        "success": outcome.success,
                        "message": outcome.message,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            for (platform, outcome) in outcomes {
                let mark = if outcome.success { "✓" } else { "✗" };
                println!("{} {}: {}", mark, platform, outcome.message);
            }
        }
    }
    Ok(())
}

fn print_status(summary: &[PlatformSummary], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summary)?);
        }
        OutputFormat::Text => {
            for entry in summary {
                match entry.scheme {
                    Some(scheme) => println!("{}: configured ({})", entry.platform, scheme),
                    None => {
                        println!("{}: not configured", entry.platform);
                        for error in &entry.errors {
                            println!("  - {}", error);
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_check_platforms_normalizes() {
        let checked = check_platforms(&names(&[" Twitter", "wall", ""])).unwrap();
        assert_eq!(checked, names(&["twitter", "wall"]));
    }

    #[test]
    fn test_check_platforms_rejects_unknown() {
        let error = check_platforms(&names(&["vk", "myspace"])).unwrap_err();
        assert_eq!(error.exit_code(), 3);
        assert!(error.to_string().contains("myspace"));
    }

    #[test]
    fn test_single_platform() {
        assert_eq!(single_platform(&names(&["tg"])).unwrap(), PlatformId::Telegram);
        assert!(single_platform(&names(&["all"])).is_err());
        assert!(single_platform(&names(&["vk", "twitter"])).is_err());
    }

    #[test]
    fn test_parse_message_id() {
        assert_eq!(parse_message_id("42"), MessageId::Int(42));
        assert_eq!(parse_message_id("abc"), MessageId::Str("abc".to_string()));
    }

    #[test]
    fn test_result_line() {
        let ok = DispatchResult::success(PlatformId::Telegram, Some(MessageId::Int(123)))
            .with_method("bot");
        assert_eq!(result_line(&ok), "✓ telegram: 123 (bot)");

        let failed = DispatchResult::failure(
            PlatformId::Vk,
            libcrosscast::ErrorKind::Transport,
            "timed out",
        );
        assert_eq!(result_line(&failed), "✗ vk: timed out");
    }

    #[test]
    fn test_exit_code_prefers_authentication() {
        let results = vec![
            DispatchResult::failure(PlatformId::Vk, libcrosscast::ErrorKind::Transport, "x"),
            DispatchResult::failure(
                PlatformId::Twitter,
                libcrosscast::ErrorKind::Authentication,
                "401",
            ),
        ];
        assert_eq!(exit_code(&results), 2);
        assert_eq!(exit_code(&[]), 0);
    }
}
