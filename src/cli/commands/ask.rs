//! Ask command implementation.

use crate::assistant::Assistant;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Answer one question with no conversation history.
pub async fn run_ask(
    question: &str,
    model: Option<String>,
    show_steps: bool,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Chat, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'tidings doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let assistant = Assistant::new(settings)?;
    let agent = assistant.agent(assistant.openai_model(model.as_deref())?);

    let spinner = Output::spinner("Thinking...");
    let result = agent.run(question, &[]).await;
    spinner.finish_and_clear();

    match result {
        Ok(response) => {
            if show_steps && !response.steps.is_empty() {
                Output::header("Steps");
                Output::steps(&response.steps);
            }
            Output::limit_warning(&response);
            println!("\n{}\n", response.output);
        }
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
