//! The interactive ticket agent.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use ticket_agent::config::AgentArgs;
use ticket_agent::core::TranscriptSource;
use ticket_agent::{SessionBuilder, repl};
use ticket_agent_ollama_model::OllamaProvider;
use tokio::io;

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = AgentArgs::parse();
    debug!("starting with {args:?}");

    let ollama_config = args.ollama_config();
    println!("{}", repl::banner(ollama_config.model()));
    println!("{}", repl::EXAMPLES);

    let provider = OllamaProvider::new(ollama_config)
        .context("failed to create the Ollama client")?;
    let mcp_server = args
        .mcp_server()
        .context("failed to locate the MCP server")?;
    let session = SessionBuilder::with_model_provider(provider)
        .with_mcp_server(mcp_server)
        .with_tool_timeout(args.tool_timeout())
        .with_max_tool_rounds(args.max_tool_rounds())
        .with_max_transcript_messages(args.max_transcript_messages)
        .with_generate_fallback(args.generate_fallback)
        .on_transcript(|transcript, source| {
            if source == TranscriptSource::Tool {
                let first_line = transcript.lines().next().unwrap_or_default();
                println!("{}{}", BAR_CHAR.bright_yellow(), first_line.dimmed());
            }
        })
        .build()
        .await
        .context("failed to start the session")?;

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .context("invalid progress template")?
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    let mut stdin = io::BufReader::new(io::stdin());
    loop {
        print!("\nYou: ");
        std::io::stdout().flush().ok();

        let Some(line) = repl::read_line(&mut stdin).await else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if repl::is_quit(input) {
            println!("\nGoodbye!");
            break;
        }
        let message = repl::expand_shortcut(input);
        let message = message.as_deref().unwrap_or(input);

        let progress_bar = ProgressBar::new_spinner();
        progress_bar.set_style(progress_style.clone());
        progress_bar.set_message("Thinking...");
        progress_bar.enable_steady_tick(Duration::from_millis(100));
        let answer = session.send_message(message).await;
        progress_bar.finish_and_clear();

        match answer {
            Ok(answer) => println!(
                "\n{}{} {}",
                BAR_CHAR.bright_cyan(),
                "Assistant:".bold(),
                answer.bright_white()
            ),
            Err(err) => {
                eprintln!("\n{} {err}", "Error:".bright_red());
                break;
            }
        }
    }

    session.close().await.context("failed to close the session")?;
    Ok(())
}
