//! Prompt assembly: pure formatting of passages, questions, and history.

use tome_core::types::{Message, Passage};

/// Behavioral contract seeding every primary dialogue.
pub const SYSTEM_PROMPT: &str = "\
You are a retrieval-grounded assistant.
Your goal is to provide answers to questions based on the context provided.

You can say \"I don't know.\" if you cannot find the answer in the context.
";

/// Render retrieved passages as labeled blocks in rank order (1-indexed).
///
/// Output is deterministic for a given passage sequence; the order is the
/// retrieval rank, never re-sorted here.
pub fn format_context(passages: &[Passage]) -> String {
    let mut formatted = String::new();
    for (index, passage) in passages.iter().enumerate() {
        formatted.push_str(&format!("Document {})\n", index + 1));
        formatted.push_str(&passage.content);
        formatted.push_str("\n\n");
    }
    formatted
}

/// Assemble the grounding prompt: context first, then the instruction to
/// answer only from context, then the question.
///
/// The "I don't know." escape hatch is the correctness boundary against
/// hallucination and must stay in the template.
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "\
THIS IS THE CONTEXT:

{context}

__________

Based on this context, try to answer the following question:
{question}

__________

If the answer cannot be found in the context, just say \"I don't know.\"
"
    )
}

/// Flatten a message history into `role: content` lines in original order.
pub fn format_history(messages: &[Message]) -> String {
    let mut formatted = String::new();
    for message in messages {
        formatted.push_str(&format!("{}: {}\n", message.role, message.content));
    }
    formatted
}

/// Build the instruction for the ephemeral rewrite agent.
///
/// Embeds the raw question and the flattened prior history, and explicitly
/// permits returning the original question verbatim — that fallback is by
/// contract, not an error path.
pub fn build_rewrite_instruction(question: &str, history: &str) -> String {
    format!(
        "\
You are an agent in a larger retrieval-augmented question answering system.
This is the user's question:
{question}
This is the message history:
{history}
Re-word the question such that it is sensible as a standalone question.
This individual question will be used in a similarity search to find the most relevant context.
For example, if the history has this as the last few messages:
user: Who is Barack Obama?
assistant: Barack Obama is the 44th U.S. President, serving from 2009 to 2017, and the first African American to hold the office.

And the new question is \"Who is he married to?\", the re-worded question should be \"Who is Barack Obama married to?\"
Make sure that the re-worded question is a standalone question that can be used separately to make a similarity search in a document store/vector database.

If no changes are needed, or you cannot think of a re-worded question, reply with the original question.
"
    )
}
