//! Free-text intent → process-calculus text → task graph.
//!
//! The generative model behind `TextModel` is best-effort and
//! non-deterministic, so nothing it produces is trusted: every response
//! is re-parsed through the calculus grammar before a graph is handed
//! out, and every failure on this path is `WeaveError::Translation` —
//! recoverable at the bridge, never fatal to the engine.

use std::sync::Arc;

use tracing::{debug, warn};

use weave_core::error::{Result, WeaveError};
use weave_core::traits::TextModel;
use weave_core::Script;

const CALCULUS_PROMPT: &str = r#"Translate the user's request into process-calculus notation for a command pipeline.

Notation:
- An event is a command name, optionally with one string payload: search!"rust async"
- Sequential composition uses ';': a ; b runs b after a, feeding it a's output.
- Concurrent composition uses '|||' inside parentheses: (a ||| b) runs both at once.
- Every '(... ||| ...)' group MUST be followed by '; sync' to join its results.
- End the process with '; SKIP'.

Known commands: search, summarize, ask, image_generate, mcp_connect, mcp, save, email, echo, uppercase.

Examples:
- "look up rust news and summarize them"
  search!"rust news" ; summarize ; SKIP
- "check the weather and the headlines at the same time, then email me the digest"
  (search!"weather" ||| search!"headlines") ; sync ; summarize ; email!"me@example.com" ; SKIP

Respond with ONLY the process-calculus text, no explanation.

Request: "#;

/// Bridges natural language to the pipeline engine via a generative
/// model.
pub struct Translator {
    model: Arc<dyn TextModel>,
}

impl Translator {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }

    /// Produce raw process-calculus text for an intent. Not validated;
    /// callers that want a runnable graph use [`translate`](Self::translate).
    pub async fn translate_raw(&self, intent: &str) -> Result<String> {
        let prompt = format!("{}{}", CALCULUS_PROMPT, intent);
        let text = self.model.generate(prompt).await?;
        let cleaned = strip_code_fences(&text);
        debug!(intent = %intent, calculus = %cleaned, "Translated intent");
        Ok(cleaned.to_string())
    }

    /// Translate an intent and validate the result into a task graph.
    pub async fn translate(&self, intent: &str) -> Result<Script> {
        let text = self.translate_raw(intent).await?;
        weave_parser::calculus::parse(&text).map_err(|e| {
            warn!(error = %e, "Generated text failed calculus validation");
            WeaveError::Translation(format!(
                "generated text is not valid process calculus: {}",
                e
            ))
        })
    }
}

/// Models love wrapping answers in markdown fences; strip one outer
/// fence if present.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.split_once('\n') {
        Some((first_line, body)) if !first_line.contains(' ') => body,
        _ => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
