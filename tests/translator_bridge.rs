use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;

use weave_core::error::Result;
use weave_core::traits::{CommandHandler, TextModel};
use weave_core::{ExecutionContext, RunResources, Value, WeaveError};
use weave_engine::{CommandRegistry, Executor};
use weave_translate::Translator;

/// Model that ignores the prompt and returns canned calculus text,
/// wrapped in a markdown fence the way real models tend to answer.
struct CannedModel(&'static str);

impl TextModel for CannedModel {
    fn generate(&self, _prompt: String) -> BoxFuture<'_, Result<String>> {
        let text = format!("```\n{}\n```", self.0);
        Box::pin(async move { Ok(text) })
    }
}

struct Recorder {
    name: String,
    log: Arc<Mutex<Vec<String>>>,
}

impl CommandHandler for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, args: Vec<String>, _ctx: ExecutionContext) -> BoxFuture<'_, Result<Value>> {
        Box::pin(async move {
            self.log.lock().unwrap().push(self.name.clone());
            Ok(Value::text(format!("{}:{}", self.name, args.join(","))))
        })
    }
}

#[tokio::test]
async fn translated_pipeline_matches_the_literal_script() {
    let calculus = r#"(search!"rust async" ||| search!"tokio news") ; sync ; summarize ; SKIP"#;
    let translator = Translator::new(Arc::new(CannedModel(calculus)));

    let translated = translator.translate("research rust async").await.unwrap();
    let literal = weave_parser::parse(
        "parallel {\n  search \"rust async\"\n  search \"tokio news\"\n} -> merge -> summarize",
    )
    .unwrap();

    // Same graph up to node identity.
    assert_eq!(translated.shape(), literal.shape());
}

#[tokio::test]
async fn translated_pipeline_executes_end_to_end() {
    let translator = Translator::new(Arc::new(CannedModel(
        r#"search!"weather" ; summarize ; SKIP"#,
    )));
    let script = translator.translate("summarize the weather").await.unwrap();

    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = CommandRegistry::new();
    for name in ["search", "summarize"] {
        registry.register(Recorder {
            name: name.to_string(),
            log: Arc::clone(&log),
        });
    }
    let executor = Executor::new(Arc::new(registry));

    let ctx = ExecutionContext::new(RunResources::new("."));
    let out = executor.run(&script, ctx).await.unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["search", "summarize"]);
    assert_eq!(out.as_text(), Some("summarize:"));
}

#[tokio::test]
async fn prose_response_is_rejected_before_execution() {
    let translator = Translator::new(Arc::new(CannedModel(
        "Sure! First I would search the web, then summarize.",
    )));
    let err = translator.translate("do a thing").await.unwrap_err();
    assert!(matches!(err, WeaveError::Translation(_)));
}

#[tokio::test]
async fn unsynced_group_is_rejected() {
    // Every parallel group must be joined with `sync` before anything
    // downstream can consume it.
    let translator = Translator::new(Arc::new(CannedModel(
        r#"(a ||| b) ; summarize ; SKIP"#,
    )));
    let err = translator.translate("fan out").await.unwrap_err();
    assert!(matches!(err, WeaveError::Translation(_)));
}
