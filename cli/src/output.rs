use colored::*;
use medai_core::render::{
    ASSISTANT_NAME, DISCLAIMER, EmptyState, SourceItem, SourcesPanel, TurnView,
};
use medai_core::Role;
use pulldown_cmark::{CodeBlockKind, Event as MdEvent, HeadingLevel, Options, Parser as MdParser, Tag};

/// Print the greeting and the numbered sample prompts
pub fn print_empty_state(state: &EmptyState) {
    println!("{}", format_empty_state(state));
}

/// Print one transcript turn with its sources panel
pub fn print_turn(turn: &TurnView<'_>, expand_sources: bool) {
    println!("{}", format_turn(turn, expand_sources));
}

pub fn print_disclaimer() {
    println!("{}", DISCLAIMER.dimmed());
}

/// Show the interactive commands
pub fn print_help() {
    println!("{}", "Commands:".yellow().bold());
    println!("  {}  Load sample prompt n into the input (empty chat only)", "/prompt <n>".green());
    println!("  {}       Clear the conversation", "/clear".green());
    println!("  {}     Expand or collapse source passages", "/sources".green());
    println!("  {}        Show this help", "/help".green());
    println!("  {}        Leave the chat", "exit".green());
    println!();
    println!("Press Enter on an empty line to send a loaded prompt.");
}

pub fn format_empty_state(state: &EmptyState) -> String {
    let mut output = String::new();
    output.push_str(&format!("{}\n", state.greeting.bold()));
    output.push_str(&format!("{}\n\n", state.introduction));
    output.push_str(&format!("{}\n", "Try one of these (/prompt <n>):".cyan()));
    for (i, prompt) in state.prompts.iter().enumerate() {
        output.push_str(&format!("  {}. {}\n", i + 1, prompt));
    }
    output
}

pub fn format_turn(turn: &TurnView<'_>, expand_sources: bool) -> String {
    let speaker = match turn.role {
        Role::User => turn.speaker.green().bold(),
        Role::Assistant => turn.speaker.blue().bold(),
    };

    let content = match turn.role {
        Role::User => turn.content.to_string(),
        Role::Assistant => render_markdown(turn.content).trim_end().to_string(),
    };

    let mut output = format!("{}: {}", speaker, content);
    if let Some(panel) = &turn.sources {
        output.push('\n');
        output.push_str(&format_sources(panel, expand_sources));
    }
    output
}

/// Collapsed: a single label line. Expanded: every passage with its
/// relevance and metadata badges.
pub fn format_sources(panel: &SourcesPanel<'_>, expanded: bool) -> String {
    if !expanded {
        return format!("  {} {}", "▸".cyan(), panel.label().cyan());
    }

    let mut output = format!("  {} {}\n", "▾".cyan(), panel.label().cyan());
    for item in &panel.items {
        output.push_str(&format_source_item(item));
    }
    output.trim_end().to_string()
}

fn format_source_item(item: &SourceItem<'_>) -> String {
    let mut header = format!("    {}", item.heading().bold());
    if let Some(relevance) = &item.relevance {
        header.push_str(&format!("  {}", format!("Relevance: {}", relevance).dimmed()));
    }

    let mut output = format!("{}\n", header);
    if !item.badges.is_empty() {
        let badges: Vec<String> = item.badges.iter().map(|b| format!("[{}]", b)).collect();
        output.push_str(&format!("    {}\n", badges.join(" ").yellow()));
    }
    output.push_str(&format!("    {}\n\n", item.passage));
    output
}

/// Message shown by the typing indicator
pub fn typing_message() -> String {
    format!("{} is typing...", ASSISTANT_NAME)
}

/// Render markdown for the terminal
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = MdParser::new_ext(markdown, options);

    let mut output = String::new();
    let mut in_code_block = false;
    let mut bold = false;
    let mut italic = false;
    // One entry per open list: the next number for ordered lists
    let mut lists: Vec<Option<u64>> = Vec::new();

    for event in parser {
        match event {
            MdEvent::Start(Tag::Heading(level, ..)) => {
                if !output.is_empty() && !output.ends_with("\n\n") {
                    output.push('\n');
                }
                let marker = match level {
                    HeadingLevel::H1 => "##",
                    HeadingLevel::H2 => "#",
                    _ => "",
                };
                if !marker.is_empty() {
                    output.push_str(&format!("{} ", marker.bright_cyan().bold()));
                }
                bold = true;
            }
            MdEvent::End(Tag::Heading(..)) => {
                bold = false;
                output.push('\n');
            }
            MdEvent::Start(Tag::Paragraph) => {
                if lists.is_empty() && !output.is_empty() && !output.ends_with("\n\n") {
                    output.push('\n');
                }
            }
            MdEvent::End(Tag::Paragraph) => {
                if lists.is_empty() {
                    output.push('\n');
                }
            }
            MdEvent::Start(Tag::CodeBlock(kind)) => {
                in_code_block = true;
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        output.push_str(&format!("{}:\n", (&*lang).cyan()));
                    }
                }
                output.push_str(&"─".repeat(40).dimmed().to_string());
                output.push('\n');
            }
            MdEvent::End(Tag::CodeBlock(_)) => {
                in_code_block = false;
                output.push_str(&"─".repeat(40).dimmed().to_string());
                output.push('\n');
            }
            MdEvent::Start(Tag::List(start)) => {
                if lists.is_empty() && !output.is_empty() && !output.ends_with('\n') {
                    output.push('\n');
                }
                lists.push(start);
            }
            MdEvent::End(Tag::List(_)) => {
                lists.pop();
            }
            MdEvent::Start(Tag::Item) => {
                let indent = "  ".repeat(lists.len().saturating_sub(1));
                let bullet = match lists.last_mut() {
                    Some(Some(n)) => {
                        let bullet = format!("{}.", n);
                        *n += 1;
                        bullet
                    }
                    _ => "•".to_string(),
                };
                output.push_str(&format!("{}{} ", indent, bullet.yellow()));
            }
            MdEvent::End(Tag::Item) => {
                if !output.ends_with('\n') {
                    output.push('\n');
                }
            }
            MdEvent::Start(Tag::Emphasis) => italic = true,
            MdEvent::End(Tag::Emphasis) => italic = false,
            MdEvent::Start(Tag::Strong) => bold = true,
            MdEvent::End(Tag::Strong) => bold = false,
            MdEvent::Code(code) => {
                output.push_str(&format!("`{}`", code).on_bright_black().white().to_string());
            }
            MdEvent::Text(text) => {
                if in_code_block {
                    output.push_str(&text);
                } else {
                    let mut styled = text.to_string().normal();
                    if bold {
                        styled = styled.bold();
                    }
                    if italic {
                        styled = styled.italic();
                    }
                    output.push_str(&styled.to_string());
                }
            }
            MdEvent::SoftBreak => output.push(' '),
            MdEvent::HardBreak => output.push('\n'),
            MdEvent::Rule => {
                output.push_str(&"─".repeat(40).dimmed().to_string());
                output.push('\n');
            }
            _ => {
                // Handle other cases as needed
            }
        }
    }

    output
}
