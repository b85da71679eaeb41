//! Prompt templates for chat, quiz, summary, and explanation generation
//!
//! Templates use `$name` / `${name}` placeholders. Substitution is safe:
//! unknown placeholders are left as written and `$$` renders a literal `$`.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

use crate::types::conversation::format_turns;
use crate::types::{Difficulty, QuestionType, RetrievedPassage, SummaryLength, Turn};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$(?:(\$)|\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
        .expect("Invalid regex")
});

/// A template with `$variable` placeholders
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub text: &'static str,
}

impl PromptTemplate {
    pub const fn new(name: &'static str, text: &'static str) -> Self {
        Self { name, text }
    }

    /// Fill known placeholders, leaving unknown ones intact
    pub fn render(&self, vars: &HashMap<&str, String>) -> String {
        safe_substitute(self.text, vars)
    }
}

/// Substitute `$name` and `${name}` from `vars`
pub fn safe_substitute(template: &str, vars: &HashMap<&str, String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            if caps.get(1).is_some() {
                return "$".to_string();
            }
            let name = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
            match vars.get(name) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

pub const CHAT_SYSTEM: PromptTemplate = PromptTemplate::new(
    "chat_system",
    "You are a patient, knowledgeable study assistant. Answer clearly and accurately. \
$reference_instruction",
);

pub const CHAT: PromptTemplate = PromptTemplate::new(
    "chat",
    "${conversation_history_section}${reference_text_section}\
Question: $query\n\n\
Answer the question in the language it was asked in.",
);

pub const QUIZ_SYSTEM: PromptTemplate = PromptTemplate::new(
    "quiz_system",
    "You are an experienced teacher who writes clear, unambiguous exam questions. \
Every question must have exactly one defensible answer key.",
);

pub const QUIZ: PromptTemplate = PromptTemplate::new(
    "quiz",
    "Write $question_count questions about \"$topic\".\n\n\
${reference_text_section}\
Requirements:\n\
- Question types: $question_types\n\
- Difficulty: $difficulty\n\
- Use only these type codes in the \"question_type\" field: $type_codes\n\
- Choice questions (MC, MCM) list their options; the correct answer gives option ids (A, B, ...)\n\
- MCM answers are a list of option ids\n\
- TF answers are \"true\" or \"false\"\n\
- Include a short explanation and the knowledge points each question tests\n\
$reference_instruction",
);

pub const QUIZ_CONSTRAINTS: PromptTemplate = PromptTemplate::new(
    "quiz_constraints",
    "A learner asked for a quiz with this request:\n\n\"$user_query\"\n\n\
Extract the topic the questions should cover. If the request states how many questions, \
which question types (MC, MCM, TF, FB, SA), or a difficulty (easy, medium, hard), extract \
those too; otherwise leave them null.",
);

pub const SUMMARY_SYSTEM: PromptTemplate = PromptTemplate::new(
    "summary_system",
    "You write faithful, well-structured summaries of study material. \
Use only the provided text and keep to the requested length.$outline_system",
);

pub const SUMMARY: PromptTemplate = PromptTemplate::new(
    "summary",
    "Summarize the document \"$title\".\n\n\
Document text:\n$content\n\n\
$length_instruction \
Cover the main ideas, key terms, and conclusions. \
Do not add citation markers.\n\
$outline_instruction",
);

pub const EXPLANATION_SYSTEM: PromptTemplate = PromptTemplate::new(
    "explanation_system",
    "You are a patient tutor. Explain mistakes without judgement and help the learner \
see the reasoning behind the correct answer. $reference_instruction",
);

pub const EXPLANATION: PromptTemplate = PromptTemplate::new(
    "explanation",
    "${reference_text_section}\
A learner answered a quiz question incorrectly.\n\n\
Question: $question\n\
Learner's answer: $wrong_answer\n\
Correct answer: $correct_answer\n\n\
Explain why the learner's answer is wrong, why the correct answer is right, \
and what to remember next time.",
);

/// Numbered reference block, or empty when there are no passages
pub fn reference_text_section(passages: &[RetrievedPassage]) -> String {
    if passages.is_empty() {
        return String::new();
    }

    let body = passages
        .iter()
        .enumerate()
        .map(|(i, p)| format!("[{}] {}", i + 1, p.chunk.text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("Reference material:\n{}\n\n", body)
}

/// Instruction matching whether reference material is present
pub fn reference_instruction(has_references: bool) -> &'static str {
    if has_references {
        "Base the answer on the numbered reference material. Cite the passages you use \
         with their numbers in square brackets, e.g. [1] or [1, 2]."
    } else {
        "No reference material is available; answer from general knowledge and do not \
         include citation markers."
    }
}

/// Prior conversation block, or empty when there is no history
pub fn conversation_history_section(history: &[Turn]) -> String {
    if history.is_empty() {
        return String::new();
    }
    format!("Conversation so far:\n{}\n\n", format_turns(history))
}

/// Rendered system prompt and user prompt
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    pub system: String,
    pub prompt: String,
}

/// Chat prompt
pub fn render_chat(query: &str, passages: &[RetrievedPassage], history: &[Turn]) -> RenderedPrompt {
    let mut vars = HashMap::new();
    vars.insert(
        "reference_instruction",
        reference_instruction(!passages.is_empty()).to_string(),
    );
    vars.insert("reference_text_section", reference_text_section(passages));
    vars.insert(
        "conversation_history_section",
        conversation_history_section(history),
    );
    vars.insert("query", query.to_string());

    RenderedPrompt {
        system: CHAT_SYSTEM.render(&vars),
        prompt: CHAT.render(&vars),
    }
}

/// Quiz prompt (schema and examples are appended by the caller)
pub fn render_quiz(
    topic: &str,
    passages: &[RetrievedPassage],
    question_count: u32,
    question_types: &[QuestionType],
    difficulty: Difficulty,
) -> RenderedPrompt {
    let mut vars = HashMap::new();
    vars.insert("topic", topic.to_string());
    vars.insert("question_count", question_count.to_string());
    vars.insert(
        "question_types",
        question_types
            .iter()
            .map(|t| format!("{} ({})", t.describe(), t.code()))
            .collect::<Vec<_>>()
            .join(", "),
    );
    vars.insert(
        "type_codes",
        question_types
            .iter()
            .map(|t| t.code())
            .collect::<Vec<_>>()
            .join(", "),
    );
    vars.insert("difficulty", difficulty.as_str().to_string());
    vars.insert("reference_text_section", reference_text_section(passages));
    vars.insert(
        "reference_instruction",
        if passages.is_empty() {
            String::new()
        } else {
            "- Base every question on the reference material\n".to_string()
        },
    );

    RenderedPrompt {
        system: QUIZ_SYSTEM.render(&vars),
        prompt: QUIZ.render(&vars),
    }
}

/// Constraint-extraction prompt for a free-form quiz request
pub fn render_quiz_constraints(user_query: &str) -> String {
    let mut vars = HashMap::new();
    vars.insert("user_query", user_query.to_string());
    QUIZ_CONSTRAINTS.render(&vars)
}

/// Length guide as a share of the source text
pub fn length_instruction(length: SummaryLength) -> &'static str {
    match length {
        SummaryLength::Short => {
            "Write a short summary, about 5-10% of the original, with only the core points."
        }
        SummaryLength::Medium => {
            "Write a medium-length summary, about 10-15% of the original, with the main \
             arguments and key details."
        }
        SummaryLength::Long => {
            "Write a detailed summary, about 15-25% of the original, with the main arguments, \
             key evidence, and important details, while staying concise."
        }
    }
}

/// Summary prompt
pub fn render_summary(
    title: &str,
    content: &str,
    length: SummaryLength,
    include_outline: bool,
) -> RenderedPrompt {
    let mut vars = HashMap::new();
    vars.insert("title", title.to_string());
    vars.insert("content", content.to_string());
    vars.insert("length_instruction", length_instruction(length).to_string());
    if include_outline {
        vars.insert(
            "outline_instruction",
            "First give a structured outline in \"outline\": one entry per main section, \
             naming the section and its key points. Then give the summary."
                .to_string(),
        );
        vars.insert(
            "outline_system",
            " Start from an outline of the document's main sections.".to_string(),
        );
    } else {
        vars.insert("outline_instruction", String::new());
        vars.insert("outline_system", String::new());
    }

    RenderedPrompt {
        system: SUMMARY_SYSTEM.render(&vars),
        prompt: SUMMARY.render(&vars),
    }
}

/// Wrong-answer explanation prompt
pub fn render_explanation(
    question: &str,
    wrong_answer: &str,
    correct_answer: &str,
    passages: &[RetrievedPassage],
) -> RenderedPrompt {
    let mut vars = HashMap::new();
    vars.insert("question", question.to_string());
    vars.insert("wrong_answer", wrong_answer.to_string());
    vars.insert("correct_answer", correct_answer.to_string());
    vars.insert("reference_text_section", reference_text_section(passages));
    vars.insert(
        "reference_instruction",
        reference_instruction(!passages.is_empty()).to_string(),
    );

    RenderedPrompt {
        system: EXPLANATION_SYSTEM.render(&vars),
        prompt: EXPLANATION.render(&vars),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, RetrievalSource};
    use uuid::Uuid;

    #[test]
    fn test_safe_substitute() {
        let mut vars = HashMap::new();
        vars.insert("name", "lists".to_string());

        assert_eq!(
            safe_substitute("About $name and ${name}s, not $other; costs $$5", &vars),
            "About lists and listss, not $other; costs $5"
        );
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let mut vars = HashMap::new();
        vars.insert("query", "what does $HOME mean?".to_string());
        let rendered = CHAT.render(&vars);
        assert!(rendered.contains("what does $HOME mean?"));
    }

    #[test]
    fn test_chat_prompt_without_context() {
        let rendered = render_chat("What is a list?", &[], &[]);
        assert!(rendered.prompt.starts_with("Question: What is a list?"));
        assert!(rendered.system.contains("do not include citation markers"));
    }

    #[test]
    fn test_chat_prompt_with_context_and_history() {
        let passage = RetrievedPassage::new(
            Chunk::new(Uuid::new_v4(), 0, "Lists hold mixed types."),
            RetrievalSource::Lexical,
            1.0,
        );
        let rendered = render_chat(
            "And tuples?",
            &[passage],
            &[Turn::user("What is a list?"), Turn::assistant("A sequence.")],
        );
        assert!(rendered.prompt.contains("Conversation so far:\nUser: What is a list?"));
        assert!(rendered.prompt.contains("[1] Lists hold mixed types."));
        assert!(rendered.system.contains("[1, 2]"));
    }

    #[test]
    fn test_quiz_prompt_lists_types() {
        let rendered = render_quiz(
            "Python lists",
            &[],
            2,
            &[QuestionType::SingleChoice, QuestionType::TrueFalse],
            Difficulty::Easy,
        );
        assert!(rendered.prompt.starts_with("Write 2 questions about \"Python lists\"."));
        assert!(rendered.prompt.contains("single choice (MC), true/false (TF)"));
        assert!(rendered.prompt.contains("Difficulty: easy"));
        assert!(!rendered.prompt.contains('$'));
    }

    #[test]
    fn test_summary_prompt_options() {
        let plain = render_summary(
            "Python Basics",
            "Lists are mutable.",
            SummaryLength::Short,
            false,
        );
        assert!(plain.prompt.contains("about 5-10% of the original"));
        assert!(!plain.prompt.contains("outline"));
        assert!(!plain.system.contains("outline"));
        assert!(!plain.prompt.contains('$'));

        let outlined = render_summary(
            "Python Basics",
            "Lists are mutable.",
            SummaryLength::Long,
            true,
        );
        assert!(outlined.prompt.contains("about 15-25% of the original"));
        assert!(outlined.prompt.contains("structured outline in \"outline\""));
        assert!(outlined.system.contains("outline"));
    }

    #[test]
    fn test_explanation_prompt() {
        let rendered = render_explanation("Is a tuple mutable?", "true", "false", &[]);
        assert!(rendered.prompt.starts_with("A learner answered a quiz question incorrectly."));
        assert!(rendered.prompt.contains("Learner's answer: true\nCorrect answer: false"));
        assert!(rendered.system.contains("do not include citation markers"));
    }
}
