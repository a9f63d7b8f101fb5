/*!
 * The `submit_translation` contract.
 *
 * The model must hand its answer back through a tool call whose arguments are
 * `{"translations": [...]}`. Everything that can go wrong with that answer is
 * a `ContractViolation`: an ordinary value the retry loop turns into feedback
 * for the next attempt, never an `Err`.
 */

use serde::Deserialize;
use serde_json::json;
use std::fmt;

use crate::providers::ToolDefinition;

/// Name of the verification tool offered to the model
pub const SUBMIT_TOOL_NAME: &str = "submit_translation";

/// Tool schema: one required array-of-string parameter
pub fn submit_translation_tool() -> ToolDefinition {
    ToolDefinition {
        name: SUBMIT_TOOL_NAME.to_string(),
        description: "Submit the translated subtitle lines. The array must contain exactly one \
                      translated string per input line, in the same order."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "translations": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Translated lines, one per input line, in input order"
                }
            },
            "required": ["translations"]
        }),
    }
}

#[derive(Deserialize)]
struct SubmitArguments {
    translations: Vec<String>,
}

/// Result of reading a translation array out of model output
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedTranslations {
    Ok(Vec<String>),
    Failed(String),
}

impl ParsedTranslations {
    /// Parse tool-call arguments of the form `{"translations": [...]}`
    pub fn from_arguments(arguments: &str) -> Self {
        match serde_json::from_str::<SubmitArguments>(arguments.trim()) {
            Ok(args) => Self::Ok(args.translations),
            Err(e) => Self::Failed(format!(
                "arguments are not {{\"translations\": [string, ...]}}: {}",
                e
            )),
        }
    }

    /// Parse a reply that ignored the tool and wrote JSON as text
    ///
    /// Accepts a bare array, optionally inside a markdown code fence, or the
    /// tool's argument object.
    pub fn from_free_text(text: &str) -> Self {
        let cleaned = strip_code_fence(text);
        if cleaned.is_empty() {
            return Self::Failed("reply was empty".to_string());
        }

        match serde_json::from_str::<Vec<String>>(cleaned) {
            Ok(lines) => Self::Ok(lines),
            Err(array_err) => match serde_json::from_str::<SubmitArguments>(cleaned) {
                Ok(args) => Self::Ok(args.translations),
                Err(_) => {
                    Self::Failed(format!("reply is not a JSON array of strings: {}", array_err))
                }
            },
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

/// Ways a model answer can break the contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    /// Tool arguments were not the expected JSON object
    MalformedArguments(String),
    /// The array had the wrong number of elements
    CountMismatch { expected: usize, actual: usize },
    /// Free text that could not be used as an answer
    MissingToolCall(String),
    /// A tool other than `submit_translation` was called
    UnknownTool(String),
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::MalformedArguments(detail) => {
                write!(f, "malformed {} arguments: {}", SUBMIT_TOOL_NAME, detail)
            }
            Self::CountMismatch { expected, actual } => {
                write!(f, "expected exactly {} translations but received {}", expected, actual)
            }
            Self::MissingToolCall(detail) => write!(f, "no {} call: {}", SUBMIT_TOOL_NAME, detail),
            Self::UnknownTool(name) => write!(f, "unknown tool '{}'", name),
        }
    }
}

/// Verdict on one submission, fed back to the model when invalid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub reason: String,
}

impl ValidationOutcome {
    pub fn success(count: usize) -> Self {
        Self {
            valid: true,
            reason: format!("accepted {} translations", count),
        }
    }

    pub fn failure(violation: &ContractViolation) -> Self {
        Self {
            valid: false,
            reason: violation.to_string(),
        }
    }

    /// Outcome of a count check that has already run on `count` translations
    pub fn from_check(check: &Result<(), ContractViolation>, count: usize) -> Self {
        match check {
            Ok(()) => Self::success(count),
            Err(violation) => Self::failure(violation),
        }
    }
}

/// Check a submission against the expected line count
pub fn check_count(
    translations: &[String],
    expected_count: usize,
) -> Result<(), ContractViolation> {
    if translations.len() == expected_count {
        Ok(())
    } else {
        Err(ContractViolation::CountMismatch {
            expected: expected_count,
            actual: translations.len(),
        })
    }
}

/// The verification routine behind `submit_translation`
pub fn verify(translations: &[String], expected_count: usize) -> ValidationOutcome {
    ValidationOutcome::from_check(&check_count(translations, expected_count), translations.len())
}
