// Prompt text shared by both providers. Keeping it here means Claude and
// Gemini answer from the same instructions.

/// Preamble for question answering over stored entries.
pub const KNOWLEDGE_BASE_PREAMBLE: &str = "You are a helpful assistant for a personal knowledge base. \
    Answer the user's question based on the following stored content. \
    If the content doesn't contain relevant information, say so.";

pub const SUMMARIZE_INSTRUCTION: &str = "Summarize the following content concisely:";

/// Preamble plus the stored-content block. Used as the system prompt where
/// the provider supports one.
pub fn answer_system_prompt(context: &str) -> String {
    format!("{KNOWLEDGE_BASE_PREAMBLE}\n\n--- Stored Content ---\n{context}")
}

/// Single-turn variant for providers without a separate system prompt.
pub fn answer_single_prompt(context: &str, question: &str) -> String {
    format!(
        "{}\n\n--- Question ---\n{question}",
        answer_system_prompt(context)
    )
}

pub fn summarize_prompt(text: &str) -> String {
    format!("{SUMMARIZE_INSTRUCTION}\n\n{text}")
}
