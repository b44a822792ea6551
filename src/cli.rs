use anyhow::{bail, Result};
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::ai::{Adapter, ClientPool};
use crate::content::{ContentGenerator, ContentKind, RepoContext};
use crate::git::GitRepo;
use crate::prompt::{Outcome, PromptError, Prompter};
use crate::release::{self, Plan};
use crate::render::Renderer;

/// Write commit messages, pull requests and branch names from your pending changes.
#[derive(Debug, Clone, Parser)]
#[command(name = "commitcraft", version, about)]
pub struct Cli {
    /// Generate a branch name for the pending changes (experimental)
    #[arg(short, long, conflicts_with = "release")]
    pub branch: bool,

    /// Adapter to generate with: openai, claude or claude_fast
    #[arg(short, long, env = "COMMITCRAFT_ADAPTER")]
    pub adapter: Option<String>,

    /// Bump the crate version according to the size of the changes (experimental)
    #[arg(long)]
    pub release: bool,

    /// Only print the version change
    #[arg(short, long, requires = "release")]
    pub dry_run: bool,

    /// Manifest whose version is bumped
    #[arg(long, default_value = "Cargo.toml", requires = "release")]
    pub manifest: PathBuf,
}

/// One run of the assistant against a repository.
pub struct App<P: Prompter, W: Write> {
    repo: GitRepo,
    clients: ClientPool,
    adapter: &'static Adapter,
    prompter: P,
    renderer: Renderer<W>,
    shutdown: CancellationToken,
}

impl<P: Prompter, W: Write> App<P, W> {
    pub fn new(
        repo: GitRepo,
        clients: ClientPool,
        adapter: &'static Adapter,
        prompter: P,
        renderer: Renderer<W>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            repo,
            clients,
            adapter,
            prompter,
            renderer,
            shutdown,
        }
    }

    pub async fn run(&mut self, cli: &Cli) -> Result<Outcome<()>> {
        info!(adapter = self.adapter.name, "starting");

        if cli.branch {
            self.branch().await
        } else if cli.release {
            self.release(&cli.manifest, cli.dry_run).await
        } else {
            self.commit().await
        }
    }

    async fn generator(&self, kind: ContentKind) -> Result<ContentGenerator> {
        let context = RepoContext::gather(&self.repo).await?;
        Ok(ContentGenerator::connect(kind, self.adapter, &self.clients, &context)?
            .cancel_on(&self.shutdown))
    }

    fn confirm(&mut self, step: &'static str, message: &str) -> Result<Outcome<()>> {
        match self.prompter.confirm(message, true) {
            Ok(true) => Ok(Outcome::Done(())),
            Ok(false) | Err(PromptError::Cancelled) => Ok(Outcome::Declined(step)),
            Err(e) => Err(e.into()),
        }
    }

    /// Stage, describe, commit and push the pending changes.
    pub async fn commit(&mut self) -> Result<Outcome<()>> {
        let diff = self.repo.diff().await?;
        if diff.is_empty() {
            bail!("No changes to describe");
        }

        if !diff.is_cached {
            self.renderer.notice("⚠️ You have unstaged changes.");
            let status = self.repo.status().await?;
            self.renderer.plain(&status);

            match self.confirm("staging", "Stage changes with `git add .`?")? {
                Outcome::Done(()) => self.repo.stage_all().await?,
                Outcome::Declined(_) => self.renderer.notice("🆗 Using working changes..."),
            }
        }

        let mut generator = self.generator(ContentKind::PullRequest).await?;
        let message = match generator.review(&mut self.prompter, &mut self.renderer).await? {
            Outcome::Done(message) => message,
            Outcome::Declined(step) => return Ok(Outcome::Declined(step)),
        };

        self.repo.commit(&message).await?;
        self.renderer.succeed("Committed");

        if let Outcome::Declined(step) = self.confirm("push", "Push to origin?")? {
            return Ok(Outcome::Declined(step));
        }
        self.repo.push().await?;
        self.renderer.succeed("Pushed");

        Ok(Outcome::Done(()))
    }

    /// Suggest a branch name and check it out.
    pub async fn branch(&mut self) -> Result<Outcome<()>> {
        self.renderer.notice("‼️ Experimental feature");

        let mut generator = self.generator(ContentKind::BranchName).await?;
        let name = match generator.review(&mut self.prompter, &mut self.renderer).await? {
            Outcome::Done(name) => name.trim().to_string(),
            Outcome::Declined(step) => return Ok(Outcome::Declined(step)),
        };

        let question = format!("Create branch `{name}` with `git checkout -b`?");
        if let Outcome::Declined(step) = self.confirm("branch", &question)? {
            return Ok(Outcome::Declined(step));
        }
        self.repo.create_branch(&name).await?;
        self.renderer.succeed(&format!("Switched to {name}"));

        Ok(Outcome::Done(()))
    }

    /// Estimate the change size, bump the manifest version and publish it.
    pub async fn release(&mut self, manifest: &Path, dry_run: bool) -> Result<Outcome<()>> {
        self.renderer.notice("‼️ Experimental feature");

        let current = release::manifest_version(manifest)?;
        if !release::is_version(&current) {
            bail!("Invalid version {current:?} in {}", manifest.display());
        }
        self.renderer.notice(&format!("Current version: {current}"));

        let mut generator = self.generator(ContentKind::VersionBump).await?;
        let response = generator.generate(None, &mut self.renderer).await?;
        let plan = Plan::from_response(&current, &response)?;

        if dry_run {
            self.renderer
                .notice(&format!("Version change: {} -> {}", plan.current, plan.next));
            return Ok(Outcome::Done(()));
        }

        self.renderer
            .notice(&format!("Writing new version to {}...", manifest.display()));
        release::publish(&self.repo, manifest, &plan, &response).await?;
        self.renderer
            .succeed(&format!("🎉 Version {} released!", plan.next));

        Ok(Outcome::Done(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["commitcraft"]).unwrap();
        assert!(!cli.branch && !cli.release && !cli.dry_run);
        assert_eq!(cli.manifest, PathBuf::from("Cargo.toml"));
    }

    #[test]
    fn dry_run_requires_release() {
        assert!(Cli::try_parse_from(["commitcraft", "--dry-run"]).is_err());
        let cli = Cli::try_parse_from(["commitcraft", "--release", "--dry-run"]).unwrap();
        assert!(cli.release && cli.dry_run);
    }

    #[test]
    fn adapter_flag() {
        let cli = Cli::try_parse_from(["commitcraft", "-a", "claude"]).unwrap();
        assert_eq!(cli.adapter.as_deref(), Some("claude"));
    }
}
