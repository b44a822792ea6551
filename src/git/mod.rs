use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::executor::{self, CommandOutput};

/// Pending changes, staged and unstaged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    pub cached: String,
    pub working: String,
    pub is_cached: bool,
}

impl Diff {
    pub fn new(cached: String, working: String) -> Self {
        let is_cached = !cached.is_empty();
        Self {
            cached,
            working,
            is_cached,
        }
    }

    /// The diff the generated content should describe.
    pub fn relevant(&self) -> &str {
        if self.is_cached {
            &self.cached
        } else {
            &self.working
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cached.is_empty() && self.working.is_empty()
    }
}

pub struct GitRepo {
    repo_path: PathBuf,
    git: PathBuf,
}

impl GitRepo {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let git = which::which("git").context("git is not installed or not on PATH")?;
        let repo_path = path.as_ref().to_path_buf();
        if !repo_path.is_dir() {
            return Err(anyhow::anyhow!("Not a directory: {:?}", repo_path));
        }
        Ok(Self { repo_path, git })
    }

    async fn output(&self, args: &[&str]) -> Result<CommandOutput> {
        executor::run(&self.git, args, &self.repo_path).await
    }

    async fn git(&self, args: &[&str]) -> Result<String> {
        let output = self
            .output(args)
            .await?
            .check(format!("git {}", args.join(" ")))?;
        Ok(output.stdout)
    }

    /// `owner/name` of the `origin` remote, or the folder name when there is none.
    pub async fn repo_name(&self) -> Result<String> {
        let remote = self.output(&["remote", "get-url", "origin"]).await?;
        if remote.success {
            if let Some(name) = parse_remote(&remote.stdout) {
                return Ok(name);
            }
        }

        let folder = self
            .repo_path
            .canonicalize()
            .unwrap_or_else(|_| self.repo_path.clone());
        let name = folder
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(strip_newlines(&name))
    }

    /// Tracked files at `HEAD`, one per line. Empty before the first commit.
    pub async fn file_tree(&self) -> Result<String> {
        let output = self.output(&["ls-tree", "-r", "HEAD", "--name-only"]).await?;
        if !output.success {
            warn!(stderr = %output.stderr.trim(), "could not list HEAD, using an empty tree");
            return Ok(String::new());
        }
        Ok(output.stdout)
    }

    pub async fn diff(&self) -> Result<Diff> {
        let cached = self.git(&["diff", "--cached"]).await?;
        let working = self.git(&["diff"]).await?;
        debug!(cached = cached.len(), working = working.len(), "read diff");
        Ok(Diff::new(cached, working))
    }

    pub async fn status(&self) -> Result<String> {
        self.git(&["status", "--short"]).await
    }

    pub async fn stage_all(&self) -> Result<()> {
        self.git(&["add", "."]).await.map(drop)
    }

    pub async fn stage(&self, path: &Path) -> Result<()> {
        let path = path.to_string_lossy().into_owned();
        self.git(&["add", path.as_str()]).await.map(drop)
    }

    pub async fn commit(&self, message: &str) -> Result<()> {
        self.git(&["commit", "-m", message]).await.map(drop)
    }

    pub async fn push(&self) -> Result<()> {
        self.git(&["push"]).await.map(drop)
    }

    pub async fn create_branch(&self, name: &str) -> Result<()> {
        self.git(&["checkout", "-b", name]).await.map(drop)
    }

    /// Annotated tag `v{version}`.
    pub async fn tag(&self, version: &str) -> Result<()> {
        let tag = format!("v{version}");
        self.git(&["tag", "-a", &tag, "-m", &tag]).await.map(drop)
    }

    pub async fn push_follow_tags(&self) -> Result<()> {
        self.git(&["push", "--follow-tags"]).await.map(drop)
    }
}

/// Extract `owner/name` from an ssh or https remote URL.
pub fn parse_remote(url: &str) -> Option<String> {
    let url = strip_newlines(url);
    let mut parts = url
        .trim()
        .trim_end_matches('/')
        .rsplit(|c| c == '/' || c == ':')
        .filter(|part| !part.is_empty());

    let name = parts.next()?;
    let name = name.strip_suffix(".git").unwrap_or(name);
    let owner = parts.next()?;
    if name.is_empty() {
        return None;
    }
    Some(format!("{owner}/{name}"))
}

fn strip_newlines(s: &str) -> String {
    s.replace(['\r', '\n'], "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn remote_urls() {
        assert_eq!(
            parse_remote("git@github.com:acme/widgets.git\n").as_deref(),
            Some("acme/widgets")
        );
        assert_eq!(
            parse_remote("https://github.com/acme/widgets").as_deref(),
            Some("acme/widgets")
        );
        assert_eq!(
            parse_remote("https://gitlab.com/group/sub/widgets.git/").as_deref(),
            Some("sub/widgets")
        );
        assert_eq!(parse_remote("widgets"), None);
        assert_eq!(parse_remote(""), None);
    }

    #[test]
    fn relevant_diff_prefers_staged() {
        let diff = Diff::new("staged".into(), "working".into());
        assert!(diff.is_cached);
        assert_eq!(diff.relevant(), "staged");

        let diff = Diff::new(String::new(), "working".into());
        assert!(!diff.is_cached);
        assert_eq!(diff.relevant(), "working");
        assert!(!diff.is_empty());
    }

    async fn scratch_repo() -> Option<(TempDir, GitRepo)> {
        which::which("git").ok()?;
        let dir = TempDir::new().ok()?;
        let repo = GitRepo::open(dir.path()).ok()?;
        repo.git(&["init", "-q"]).await.ok()?;
        repo.git(&["config", "user.email", "dev@example.com"]).await.ok()?;
        repo.git(&["config", "user.name", "Dev"]).await.ok()?;
        repo.git(&["config", "commit.gpgsign", "false"]).await.ok()?;
        Some((dir, repo))
    }

    #[tokio::test]
    async fn stage_and_commit_round() {
        let Some((dir, repo)) = scratch_repo().await else {
            return;
        };

        assert_eq!(repo.file_tree().await.unwrap(), "");

        std::fs::write(dir.path().join("a.txt"), "one\n").unwrap();
        repo.stage_all().await.unwrap();
        repo.commit("feat: first").await.unwrap();
        assert_eq!(repo.file_tree().await.unwrap(), "a.txt\n");

        std::fs::write(dir.path().join("a.txt"), "two\n").unwrap();
        let diff = repo.diff().await.unwrap();
        assert!(!diff.is_cached);
        assert!(diff.working.contains("+two"));
        assert!(repo.status().await.unwrap().contains("a.txt"));

        repo.stage_all().await.unwrap();
        let diff = repo.diff().await.unwrap();
        assert!(diff.is_cached);
        assert!(diff.working.is_empty());
    }

    #[tokio::test]
    async fn repo_name_falls_back_to_folder() {
        let Some((dir, repo)) = scratch_repo().await else {
            return;
        };

        let folder = dir
            .path()
            .canonicalize()
            .unwrap()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .to_string();
        assert_eq!(repo.repo_name().await.unwrap(), folder);

        repo.git(&["remote", "add", "origin", "git@github.com:acme/widgets.git"])
            .await
            .unwrap();
        assert_eq!(repo.repo_name().await.unwrap(), "acme/widgets");
    }

    #[tokio::test]
    async fn failing_command_names_itself() {
        let Some((_dir, repo)) = scratch_repo().await else {
            return;
        };

        let err = repo.commit("nothing to commit").await.unwrap_err();
        assert!(err.to_string().contains("git commit -m"), "{err}");
    }
}
