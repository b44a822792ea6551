//! What gets generated and how a generation round is shown to the user.

use std::io::Write;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::ai::{AIError, Adapter, ClientPool, ConversationDriver, ConversationMessage, EmitterEvent};
use crate::git::GitRepo;
use crate::prompt::{Outcome, PromptError, Prompter};
use crate::render::Renderer;

const USE_EMOJI: bool = true;

const PULL_REQUEST_PROMPT: &str = "\
You write pull requests. Pull request should include a short conventional commits style title,
followed by a longer description what this PR is trying to solve. This should be plaintext.
Keep verbage succint and to the point. Prefer bulleted lists over lengthy paragraphs.
You should generate tags, up to 5, relevant to this PR to aid in searchability.
Each line should be 80 characters or less. Don't include descriptions for changes due to
generated side effects, eg. lock files. When working with emojis, use them as glyphs to
quickly convey meaning and not as decoration.";

const PULL_REQUEST_FORMAT: &str = "\
The format is below, do not include the format template text in the generated content:

chore(scope): solves a problem with some solution

this is the slightly longer description of the pr

- added a new feature
- fixed a bug
- improved performance

`tag tag tag tag tag`";

const BRANCH_NAME_PROMPT: &str = "\
You name git branches. Reply with a single branch name and nothing else: no quotes,
no explanation, no trailing punctuation. Use a conventional commits type as the prefix
followed by a slash, then a short kebab-case summary of the change, eg. fix/null-diff-crash.
Keep it under 50 characters and use only lowercase letters, digits, hyphens and one slash.";

const VERSION_BUMP_PROMPT: &str = "\
You maintain a project that follows semantic versioning. Given the changes, decide whether
they warrant a major, minor or patch release. Breaking changes to public behaviour are major,
new backwards compatible features are minor, everything else is a patch.
Explain your reasoning in a few short bullet points, then give the verdict as exactly one of
major, minor or patch wrapped in answer tags, eg. <answer>minor</answer>.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    PullRequest,
    BranchName,
    VersionBump,
}

impl ContentKind {
    pub fn system_prompt(&self) -> String {
        match self {
            ContentKind::PullRequest => {
                let emoji = if USE_EMOJI {
                    "Use of emojis in the description is encouraged."
                } else {
                    "Use of emojis should be where appropriate."
                };
                format!("{PULL_REQUEST_PROMPT} {emoji}\n{PULL_REQUEST_FORMAT}")
            }
            ContentKind::BranchName => BRANCH_NAME_PROMPT.to_string(),
            ContentKind::VersionBump => VERSION_BUMP_PROMPT.to_string(),
        }
    }

    /// Shown while the turn streams.
    pub fn status(&self) -> &'static str {
        match self {
            ContentKind::PullRequest => "Generating content...",
            ContentKind::BranchName => "Generating branch name...",
            ContentKind::VersionBump => "Estimating change size...",
        }
    }

    pub fn done(&self) -> &'static str {
        match self {
            ContentKind::PullRequest => "Content generated!",
            ContentKind::BranchName => "Generated branch name!",
            ContentKind::VersionBump => "Change size estimated!",
        }
    }
}

/// What the model is told about the repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoContext {
    pub repo: String,
    pub tree: String,
    pub diff: String,
}

impl RepoContext {
    pub async fn gather(repo: &GitRepo) -> Result<Self> {
        let name = repo.repo_name().await?;
        let tree = repo.file_tree().await?;
        let diff = repo.diff().await?;
        debug!(repo = %name, cached = diff.is_cached, "gathered repository context");

        Ok(Self {
            repo: name,
            tree,
            diff: diff.relevant().to_string(),
        })
    }

    pub fn user_prompt(&self) -> String {
        format!(
            "The repo name is {}, the file tree is {}, and the diff is {}",
            self.repo, self.tree, self.diff
        )
    }
}

pub fn initial_transcript(kind: ContentKind, context: &RepoContext) -> Vec<ConversationMessage> {
    vec![
        ConversationMessage::system(kind.system_prompt()),
        ConversationMessage::user(context.user_prompt()),
    ]
}

/// One kind of content, regenerated on demand with feedback.
#[derive(Debug)]
pub struct ContentGenerator {
    kind: ContentKind,
    driver: ConversationDriver,
}

impl ContentGenerator {
    pub fn new(kind: ContentKind, driver: ConversationDriver) -> Self {
        Self { kind, driver }
    }

    pub fn connect(
        kind: ContentKind,
        adapter: &Adapter,
        clients: &ClientPool,
        context: &RepoContext,
    ) -> Result<Self, AIError> {
        let driver = adapter.connect(clients, initial_transcript(kind, context))?;
        Ok(Self::new(kind, driver))
    }

    pub fn cancel_on(self, parent: &CancellationToken) -> Self {
        Self {
            kind: self.kind,
            driver: self.driver.cancel_on(parent),
        }
    }

    /// Run the next turn, rendering text as it arrives.
    ///
    /// `feedback` must be `None` on the first call and `Some` afterwards.
    pub async fn generate<W: Write>(
        &mut self,
        feedback: Option<String>,
        renderer: &mut Renderer<W>,
    ) -> Result<String, AIError> {
        let result = self.driver.advance(feedback).await?;

        renderer.status(self.kind.status());
        let outcome = result
            .run(|event| match event {
                EmitterEvent::Data(delta) => renderer.delta(delta.text()),
                EmitterEvent::Error(e) => warn!(error = %e, "ignoring a bad payload"),
                EmitterEvent::Done(_) => {}
            })
            .await;

        match &outcome {
            Ok(_) => renderer.succeed(self.kind.done()),
            Err(e) => {
                renderer.fail(self.kind.status());
                debug!(error = %e, kind = ?self.kind, "generation failed");
            }
        }
        outcome
    }

    /// Generate until the user accepts the content, feeding back their
    /// corrections between rounds.
    pub async fn review<W: Write, P: Prompter>(
        &mut self,
        prompter: &mut P,
        renderer: &mut Renderer<W>,
    ) -> Result<Outcome<String>> {
        let mut feedback = None;

        loop {
            let content = self.generate(feedback.take(), renderer).await?;

            match prompter.confirm("Does the content look good?", true) {
                Ok(true) => return Ok(Outcome::Done(content)),
                Ok(false) => {}
                Err(PromptError::Cancelled) => return Ok(Outcome::Declined("content")),
                Err(e) => return Err(e.into()),
            }

            match prompter.text("Feedback:") {
                Ok(text) => feedback = Some(text),
                Err(PromptError::Cancelled) => return Ok(Outcome::Declined("feedback")),
                Err(e) => return Err(e.into()),
            }

            renderer.notice("🔄 Applying feedback...");
        }
    }
}
