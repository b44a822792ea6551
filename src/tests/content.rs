use std::sync::Arc;

use pretty_assertions::assert_eq;

use super::{Answer, ScriptedBackend, ScriptedPrompter};
use crate::ai::{AIError, ConversationDriver, ConversationMessage};
use crate::content::{initial_transcript, ContentGenerator, ContentKind, RepoContext};
use crate::prompt::Outcome;
use crate::render::Renderer;
use crate::theme::Theme;

fn new_generator(kind: ContentKind, backend: &Arc<ScriptedBackend>) -> ContentGenerator {
    let context = RepoContext {
        repo: "acme/widgets".into(),
        tree: "src/main.rs".into(),
        diff: "-old\n+new".into(),
    };
    let driver = ConversationDriver::new(backend.clone(), "test-model", initial_transcript(kind, &context));
    ContentGenerator::new(kind, driver)
}

fn renderer() -> Renderer<Vec<u8>> {
    colored::control::set_override(false);
    Renderer::new(Vec::new(), Theme::monochrome())
}

#[tokio::test]
async fn generate_streams_into_the_renderer() {
    let backend = Arc::new(ScriptedBackend::new(vec![vec!["feat/", "parser"]]));
    let mut generator = new_generator(ContentKind::BranchName, &backend);
    let mut renderer = renderer();

    let name = generator.generate(None, &mut renderer).await.unwrap();

    assert_eq!(name, "feat/parser");
    let out = String::from_utf8(renderer.into_inner()).unwrap();
    assert_eq!(
        out,
        "⏳ Generating branch name...\n\nfeat/parser\n\n✔ Generated branch name!\n"
    );
}

#[tokio::test]
async fn review_applies_feedback_until_accepted() {
    let backend = Arc::new(ScriptedBackend::new(vec![
        vec!["fix: bug"],
        vec!["fix(parser): ", "handle empty input"],
    ]));
    let mut generator = new_generator(ContentKind::PullRequest, &backend);
    let mut prompter = ScriptedPrompter::new(vec![
        Answer::Confirm(false),
        Answer::Text("mention the parser"),
        Answer::Confirm(true),
    ]);
    let mut renderer = renderer();

    let outcome = generator.review(&mut prompter, &mut renderer).await.unwrap();

    assert_eq!(
        outcome,
        Outcome::Done("fix(parser): handle empty input".to_string())
    );
    assert_eq!(
        prompter.asked,
        vec!["Does the content look good?", "Feedback:", "Does the content look good?"]
    );

    let second = &backend.requests()[1];
    assert_eq!(second[2], ConversationMessage::system("fix: bug"));
    assert_eq!(second[3], ConversationMessage::user("mention the parser"));

    let out = String::from_utf8(renderer.into_inner()).unwrap();
    assert!(out.contains("🔄 Applying feedback..."));
}

#[tokio::test]
async fn cancelling_a_prompt_declines() {
    let backend = Arc::new(ScriptedBackend::new(vec![vec!["a"], vec!["b"]]));
    let mut generator = new_generator(ContentKind::PullRequest, &backend);

    let mut prompter = ScriptedPrompter::new(vec![Answer::Cancel]);
    let outcome = generator.review(&mut prompter, &mut renderer()).await.unwrap();
    assert_eq!(outcome, Outcome::Declined("content"));

    let backend = Arc::new(ScriptedBackend::new(vec![vec!["a"]]));
    let mut generator = new_generator(ContentKind::PullRequest, &backend);
    let mut prompter = ScriptedPrompter::new(vec![Answer::Confirm(false), Answer::Cancel]);
    let outcome = generator.review(&mut prompter, &mut renderer()).await.unwrap();
    assert_eq!(outcome, Outcome::Declined("feedback"));
}

#[tokio::test]
async fn failed_generation_is_reported() {
    let backend = Arc::new(ScriptedBackend::failing(AIError::RateLimitError("slow down".into())));
    let mut generator = new_generator(ContentKind::VersionBump, &backend);
    let mut renderer = renderer();

    let err = generator.generate(None, &mut renderer).await.unwrap_err();
    assert_eq!(err, AIError::RateLimitError("slow down".into()));

    let out = String::from_utf8(renderer.into_inner()).unwrap();
    assert!(out.ends_with("✖ Estimating change size...\n"));

    let err = generator
        .generate(Some("again".into()), &mut Renderer::new(Vec::new(), Theme::monochrome()))
        .await
        .unwrap_err();
    assert_eq!(err, AIError::RateLimitError("slow down".into()));
}
