//! Interactive chat command.

use crate::assistant::Assistant;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use tracing::debug;

/// Run the interactive `Question:` loop until `exit`, `quit` or end of input.
pub async fn run_chat(model: Option<String>, show_steps: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Chat, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'tidings doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let assistant = Assistant::new(settings)?;
    let agent = assistant.agent(assistant.openai_model(model.as_deref())?);
    let mut session = assistant.session();

    println!("\n{}", style("Tidings").bold().cyan());
    println!(
        "{}\n",
        style("Ask about your calendar or email. Type 'exit' to quit, 'clear' to reset the conversation.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("Question:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            println!();
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            session.clear();
            Output::info("Conversation history cleared.");
            continue;
        }

        match assistant.chat_turn(&agent, &mut session, input).await {
            Ok(response) => {
                debug!(
                    "Answered in {} model calls with {} tool calls",
                    response.model_calls,
                    response.steps.len()
                );
                if show_steps {
                    Output::steps(&response.steps);
                }
                Output::limit_warning(&response);
                println!("\n{} {}\n", style("Tidings:").cyan().bold(), response.output);
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}
