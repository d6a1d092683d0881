use anyhow::{Context, Result, bail};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use medai_core::{ChatSessionManager, ChatView, Role, SAMPLE_PROMPTS, Settlement};
use std::io::{self, Write};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info};

use crate::output::{
    print_disclaimer, print_empty_state, print_help, print_turn, typing_message,
};

/// One line typed in the chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    Help,
    Clear,
    ToggleSources,
    /// 1-based index into the sample prompts, if it parsed
    Prompt(Option<usize>),
    /// Text to send. Empty means "send the input buffer"
    Send(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
            return Command::Exit;
        }

        match trimmed.split_once(char::is_whitespace) {
            Some(("/prompt", n)) => Command::Prompt(n.trim().parse().ok()),
            _ => match trimmed {
                "/help" => Command::Help,
                "/clear" => Command::Clear,
                "/sources" => Command::ToggleSources,
                "/prompt" => Command::Prompt(None),
                _ => Command::Send(line.trim_end_matches(['\r', '\n']).to_string()),
            },
        }
    }
}

/// Spinner shown while the assistant is answering
fn typing_indicator() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner} {msg}")
    {
        spinner.set_style(style);
    }
    spinner.set_message(typing_message());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Print every turn from `printed` on. User turns are skipped when `echo_user`
/// is false, since the terminal already shows what was typed.
fn print_new_turns(
    manager: &ChatSessionManager,
    printed: &mut usize,
    expand_sources: bool,
    echo_user: bool,
) {
    if let ChatView::Transcript { turns, .. } = manager.view() {
        for turn in turns.iter().skip(*printed) {
            if turn.role == Role::User && !echo_user {
                continue;
            }
            print_turn(turn, expand_sources);
            println!();
        }
        *printed = turns.len();
    }
}

/// Runs a single query mode, sending one prompt and displaying the answer
pub async fn run_single_query(
    manager: &mut ChatSessionManager,
    prompt: String,
    expand_sources: bool,
) -> Result<()> {
    info!("Running single query");

    if !manager.submit(prompt) {
        bail!("Nothing to send: the prompt is empty");
    }

    let spinner = typing_indicator();
    manager.settle().await;
    spinner.finish_and_clear();

    let mut printed = 0;
    print_new_turns(manager, &mut printed, expand_sources, false);
    print_disclaimer();

    Ok(())
}

/// Sends a typed line, or the loaded prompt when the line is blank.
/// Returns whether the user turn still needs echoing, or `None` when nothing was sent.
fn send_line(manager: &mut ChatSessionManager, text: String) -> Option<bool> {
    if text.trim().is_empty() {
        // A loaded prompt was never typed on screen
        manager.submit_pending().then_some(true)
    } else {
        manager.submit(text).then_some(false)
    }
}

/// Runs an interactive chat session reading lines from `input`.
/// `initial` is sent as the first question.
pub async fn run_interactive_chat<R>(
    manager: &mut ChatSessionManager,
    mut expand_sources: bool,
    initial: Option<String>,
    input: R,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    println!("Starting MedAI chat. Type /help for commands, 'exit' to quit.");
    print_disclaimer();
    println!();

    let mut printed = 0;
    let mut spinner: Option<ProgressBar> = None;

    let submitted = initial.is_some_and(|prompt| manager.submit(prompt));
    if submitted {
        print_new_turns(manager, &mut printed, expand_sources, true);
        spinner = Some(typing_indicator());
    } else {
        print_empty_state(&Default::default());
    }

    let mut lines = input.lines();

    loop {
        if !manager.session().awaiting_response() {
            print!("{}: ", "You".green().bold());
            io::stdout().flush().context("Failed to flush stdout")?;
        }

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    debug!("Input closed");
                    // Piped input: still show the answer to the last question
                    manager.settle().await;
                    if let Some(spinner) = spinner.take() {
                        spinner.finish_and_clear();
                    }
                    print_new_turns(manager, &mut printed, expand_sources, false);
                    break;
                };

                match Command::parse(&line) {
                    Command::Exit => {
                        println!("Exiting chat session.");
                        break;
                    }
                    Command::Help => print_help(),
                    Command::Clear => {
                        manager.reset();
                        if let Some(spinner) = spinner.take() {
                            spinner.finish_and_clear();
                        }
                        printed = 0;
                        println!("{}", "Conversation cleared.".dimmed());
                        print_empty_state(&Default::default());
                    }
                    Command::ToggleSources => {
                        expand_sources = !expand_sources;
                        print_last_sources(manager, expand_sources);
                    }
                    Command::Prompt(index) => select_prompt(manager, index),
                    Command::Send(text) => {
                        if manager.session().awaiting_response() {
                            println!("{}", "Still waiting for the previous answer...".dimmed());
                            continue;
                        }

                        if let Some(echo_user) = send_line(manager, text) {
                            print_new_turns(manager, &mut printed, expand_sources, echo_user);
                            spinner = Some(typing_indicator());
                        }
                    }
                }
            }
            settlement = manager.next_settlement(), if manager.session().awaiting_response() => {
                match settlement {
                    Some(Settlement::Applied) => {
                        if let Some(spinner) = spinner.take() {
                            spinner.finish_and_clear();
                        }
                        print_new_turns(manager, &mut printed, expand_sources, false);
                    }
                    Some(Settlement::Discarded) => debug!("Dropped an answer from before /clear"),
                    None => break,
                }
            }
        }
    }

    if let Some(spinner) = spinner.take() {
        spinner.finish_and_clear();
    }

    Ok(())
}

fn select_prompt(manager: &mut ChatSessionManager, index: Option<usize>) {
    if !manager.session().is_empty() {
        println!(
            "{}",
            "Sample prompts are only offered on an empty chat. Use /clear first.".yellow()
        );
        return;
    }

    let prompt = index
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| SAMPLE_PROMPTS.get(i));

    match prompt {
        Some(prompt) => {
            manager.select_sample_prompt(*prompt);
            println!(
                "{} {}",
                "Loaded:".cyan(),
                manager.session().pending_input()
            );
            println!("{}", "Press Enter to send it, or type your own question.".dimmed());
        }
        None => println!(
            "{}",
            format!("Pick a prompt between 1 and {}.", SAMPLE_PROMPTS.len()).yellow()
        ),
    }
}

fn print_last_sources(manager: &ChatSessionManager, expand_sources: bool) {
    let state = if expand_sources { "expanded" } else { "collapsed" };
    println!("{}", format!("Sources are now {}.", state).dimmed());

    if let ChatView::Transcript { turns, .. } = manager.view() {
        if let Some(turn) = turns.iter().rev().find(|t| t.sources.is_some()) {
            print_turn(turn, expand_sources);
            println!();
        }
    }
}
