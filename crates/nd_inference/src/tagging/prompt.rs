use nd_core::Article;

pub const SYSTEM_INSTRUCTION: &str = "You are an assistant that decides whether a news article matches a user's filter. \
Base your decision ONLY on the provided user filter and article content. \
Do not speculate or use outside knowledge. \
Always justify your decision by quoting specific phrases or facts from the article.";

pub const OUTPUT_INSTRUCTION: &str = "Respond with ONLY a single JSON object with exactly these fields:\n\
{\"match\": true or false, \"confidence\": a number between 0 and 1, \"reason\": a string}\n\
- \"match\" is true only if the article clearly satisfies the filter.\n\
- \"confidence\" is your certainty in that decision.\n\
- \"reason\" briefly justifies the decision, quoting the article.\n\
Do not add any text before or after the JSON object.";

/// Everything a provider needs to judge one article.
///
/// The system instruction is kept apart so chat-style APIs can send it as a
/// system message; completion-style APIs use [`Prompt::full_text`].
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub filter: String,
    pub title: String,
    pub content: String,
}

impl Prompt {
    pub fn for_article(filter: &str, article: &Article) -> Self {
        Self {
            system: SYSTEM_INSTRUCTION.to_string(),
            filter: filter.trim().to_string(),
            title: article.title.clone(),
            content: article.content.clone(),
        }
    }

    pub fn user_message(&self) -> String {
        format!(
            "User Filter: {}\n\nArticle Content:\nTitle: {}\nContent: {}\n\n{}",
            self.filter, self.title, self.content, OUTPUT_INSTRUCTION
        )
    }

    pub fn full_text(&self) -> String {
        format!("{}\n\n{}", self.system, self.user_message())
    }
}
