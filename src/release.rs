use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use toml_edit::{value, DocumentMut, Value};
use tracing::info;

use crate::git::GitRepo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bump {
    Major,
    Minor,
    Patch,
}

impl FromStr for Bump {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "major" => Ok(Bump::Major),
            "minor" => Ok(Bump::Minor),
            "patch" => Ok(Bump::Patch),
            other => Err(anyhow!("Invalid sem ver part {other}")),
        }
    }
}

impl fmt::Display for Bump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bump::Major => write!(f, "major"),
            Bump::Minor => write!(f, "minor"),
            Bump::Patch => write!(f, "patch"),
        }
    }
}

/// The text between the first `<answer>` tag pair on a single line.
pub fn extract_answer(response: &str) -> Option<&str> {
    let re = Regex::new(r"<answer>(.*)</answer>").ok()?;
    re.captures(response)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Strict `MAJOR.MINOR.PATCH`, no pre-release or build suffix.
pub fn is_version(version: &str) -> bool {
    Regex::new(r"^\d+\.\d+\.\d+$").is_ok_and(|re| re.is_match(version))
}

pub fn bump_version(version: &str, bump: Bump) -> Result<String> {
    if !is_version(version) {
        bail!("Invalid version {version:?}");
    }

    let parts = version
        .split('.')
        .map(|part| part.parse::<u64>().with_context(|| format!("Invalid version {version:?}")))
        .collect::<Result<Vec<_>>>()?;
    let (major, minor, patch) = (parts[0], parts[1], parts[2]);

    let overflow = || anyhow!("Version {version:?} cannot be bumped any further");
    Ok(match bump {
        Bump::Major => format!("{}.0.0", major.checked_add(1).ok_or_else(overflow)?),
        Bump::Minor => format!("{major}.{}.0", minor.checked_add(1).ok_or_else(overflow)?),
        Bump::Patch => format!("{major}.{minor}.{}", patch.checked_add(1).ok_or_else(overflow)?),
    })
}

pub fn manifest_version(path: &Path) -> Result<String> {
    let doc = read_manifest(path)?;
    doc.get("package")
        .and_then(|package| package.get("version"))
        .and_then(|version| version.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("No [package] version in {}", path.display()))
}

/// Rewrite `[package] version`, keeping the rest of the file as written.
pub fn set_manifest_version(path: &Path, version: &str) -> Result<()> {
    let mut doc = read_manifest(path)?;
    let package = doc
        .get_mut("package")
        .and_then(|package| package.as_table_like_mut())
        .ok_or_else(|| anyhow!("No [package] table in {}", path.display()))?;

    match package.get_mut("version").and_then(|item| item.as_value_mut()) {
        Some(current) => {
            let decor = current.decor().clone();
            *current = Value::from(version);
            *current.decor_mut() = decor;
        }
        None => {
            package.insert("version", value(version));
        }
    }

    std::fs::write(path, doc.to_string())
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn read_manifest(path: &Path) -> Result<DocumentMut> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    content
        .parse::<DocumentMut>()
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Version change decided from a model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub current: String,
    pub next: String,
    pub bump: Bump,
}

impl Plan {
    pub fn from_response(current: &str, response: &str) -> Result<Self> {
        let answer = extract_answer(response)
            .ok_or_else(|| anyhow!("Invalid response, missing answer tag"))?;
        let bump: Bump = answer.parse()?;
        Ok(Self {
            current: current.to_string(),
            next: bump_version(current, bump)?,
            bump,
        })
    }

    pub fn commit_message(&self, response: &str) -> String {
        format!("chore: bump version to {}\n\n{}", self.next, response)
    }
}

/// Write, commit, tag and push the new version.
pub async fn publish(repo: &GitRepo, manifest: &Path, plan: &Plan, response: &str) -> Result<()> {
    info!(from = %plan.current, to = %plan.next, "releasing");

    set_manifest_version(manifest, &plan.next)?;
    repo.stage(manifest).await?;
    repo.commit(&plan.commit_message(response)).await?;
    repo.tag(&plan.next).await?;
    repo.push_follow_tags().await?;

    if let Some(env_file) = std::env::var_os("GITHUB_ENV") {
        export_version(Path::new(&env_file), &plan.next)?;
    }
    Ok(())
}

/// Append `RELEASE_VERSION` to a GitHub Actions environment file.
pub fn export_version(env_file: &Path, version: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(env_file)
        .with_context(|| format!("Failed to open {}", env_file.display()))?;
    writeln!(file, "RELEASE_VERSION={version}")?;
    Ok(())
}
