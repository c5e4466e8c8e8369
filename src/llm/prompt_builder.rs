use crate::llm::prompts;
use crate::types::{ChangeSet, Style};

/// The style-specific pieces of a prompt.
struct StyleBlocks {
    instructions: &'static str,
    example: &'static str,
    contract: &'static str,
}

fn blocks_for(style: Style) -> StyleBlocks {
    match style {
        Style::Technical => StyleBlocks {
            instructions: prompts::TECHNICAL_STYLE,
            example: prompts::TECHNICAL_EXAMPLE,
            contract: prompts::WORKLOG_CONTRACT,
        },
        Style::Business => StyleBlocks {
            instructions: prompts::BUSINESS_STYLE,
            example: prompts::BUSINESS_EXAMPLE,
            contract: prompts::WORKLOG_CONTRACT,
        },
        Style::CommitMessage => StyleBlocks {
            instructions: prompts::COMMIT_STYLE,
            example: prompts::COMMIT_EXAMPLE,
            contract: prompts::COMMIT_CONTRACT,
        },
    }
}

/// Build the single instruction string sent to the model.
///
/// Instructions, the worked example and the output contract all come before
/// the change text, which is capped and placed last.
pub fn build_prompt(change: &ChangeSet, style: Style) -> String {
    let blocks = blocks_for(style);

    format!(
        "{role}\n\n\
         {instructions}\n\n\
         Example of a good answer:\n\
         <<<EXAMPLE\n{example}\nEXAMPLE>>>\n\n\
         {contract}\n\n\
         Changes to summarize:\n\
         ```diff\n{diff}\n```",
        role = prompts::ROLE,
        instructions = blocks.instructions,
        example = blocks.example,
        contract = blocks.contract,
        diff = change.capped(),
    )
}
