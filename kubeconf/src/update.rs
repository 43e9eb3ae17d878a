use std::fs;
use std::io::Write as _;
use std::path::Path;

use semver::Version;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{Error, Result};

pub const DEFAULT_RELEASE_REPO: &str = "pro-infra/kc";
const GITHUB_API: &str = "https://api.github.com";
const GITHUB: &str = "https://github.com";
const TAG_PREFIX: &str = "refs/tags/v";

#[derive(Debug, Deserialize)]
pub struct TagRef {
    #[serde(rename = "ref")]
    pub reference: String,
}

/// `refs/tags/v1.2` or `refs/tags/v1.2.3`; a missing patch counts as 0.
pub fn version_from_ref(reference: &str) -> Option<Version> {
    let numbers = reference.strip_prefix(TAG_PREFIX)?;
    let parts = numbers
        .split('.')
        .map(|part| {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            part.parse::<u64>().ok()
        })
        .collect::<Option<Vec<_>>>()?;

    match parts[..] {
        [major, minor] => Some(Version::new(major, minor, 0)),
        [major, minor, patch] => Some(Version::new(major, minor, patch)),
        _ => None,
    }
}

pub fn newest(tags: &[TagRef]) -> Option<Version> {
    tags.iter()
        .filter_map(|tag| {
            let version = version_from_ref(&tag.reference)?;
            debug!(tag = %tag.reference, "found version");
            Some(version)
        })
        .max()
}

/// The newest release when it is ahead of `current`.
pub fn pending_update(current: &Version, tags: &[TagRef]) -> Option<Version> {
    newest(tags).filter(|newest| newest > current)
}

/// Release asset naming uses Go's GOOS/GOARCH spelling.
#[derive(Debug, Clone, PartialEq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn current() -> Self {
        Self::from_rust(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub fn from_rust(os: &str, arch: &str) -> Self {
        let os = match os {
            "macos" => "darwin",
            other => other,
        };
        let arch = match arch {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            "x86" => "386",
            other => other,
        };
        Self {
            os: os.to_string(),
            arch: arch.to_string(),
        }
    }
}

pub struct ReleaseFeed {
    client: reqwest::Client,
    owner: String,
    repo: String,
}

impl ReleaseFeed {
    /// `repository` is `owner/repo`; `agent` identifies us to GitHub,
    /// which rejects requests without a user agent.
    pub fn new(repository: &str, agent: &str) -> Result<Self> {
        let (owner, repo) = repository
            .split_once('/')
            .filter(|(owner, repo)| !owner.is_empty() && !repo.is_empty() && !repo.contains('/'))
            .ok_or_else(|| Error::InvalidRepo(repository.to_string()))?;

        let client = reqwest::Client::builder().user_agent(agent).build()?;
        Ok(Self {
            client,
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    pub fn tags_url(&self) -> String {
        format!("{GITHUB_API}/repos/{}/{}/git/refs/tags", self.owner, self.repo)
    }

    pub fn asset_url(&self, version: &Version, platform: &Platform) -> String {
        format!(
            "{GITHUB}/{}/{}/releases/download/v{version}/kc.{}_{}",
            self.owner, self.repo, platform.os, platform.arch
        )
    }

    pub async fn tags(&self) -> Result<Vec<TagRef>> {
        let url = self.tags_url();
        debug!(%url, "listing release tags");
        let tags: Vec<TagRef> = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(tags)
    }

    /// Downloads `url` next to `target` and swaps it into place.
    pub async fn download(&self, url: &str, target: &Path) -> Result<()> {
        info!(%url, "downloading");
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        replace_executable(target, &body)
    }
}

/// Writes `contents` to a temp file beside `target`, marks it executable
/// and renames it over `target`.
pub fn replace_executable(target: &Path, contents: &[u8]) -> Result<()> {
    let dir = match target.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    make_executable(file.path())?;
    file.persist(target)?;
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Refuses targets the owner can't write.
pub fn check_writable(path: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;

    #[cfg(unix)]
    let protected = {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o200 == 0
    };
    #[cfg(not(unix))]
    let protected = metadata.permissions().readonly();

    if protected {
        return Err(Error::WriteProtected(path.to_path_buf()));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    const TAGS: &str = r#"[
        {"ref": "refs/tags/v0.1.0", "url": "https://api.github.com/repos/pro-infra/kc/git/refs/tags/v0.1.0"},
        {"ref": "refs/tags/v0.10", "url": "https://api.github.com/repos/pro-infra/kc/git/refs/tags/v0.10"},
        {"ref": "refs/tags/v0.9.7", "url": "https://api.github.com/repos/pro-infra/kc/git/refs/tags/v0.9.7"},
        {"ref": "refs/tags/nightly", "url": "https://api.github.com/repos/pro-infra/kc/git/refs/tags/nightly"},
        {"ref": "refs/tags/v1.0.0-rc1", "url": "https://api.github.com/repos/pro-infra/kc/git/refs/tags/v1.0.0-rc1"}
    ]"#;

    fn tags() -> Vec<TagRef> {
        serde_json::from_str(TAGS).expect("tags")
    }

    #[test]
    fn test_version_from_ref() {
        assert_eq!(version_from_ref("refs/tags/v1.2.3"), Some(Version::new(1, 2, 3)));
        assert_eq!(version_from_ref("refs/tags/v1.2"), Some(Version::new(1, 2, 0)));
        assert_eq!(version_from_ref("refs/tags/v1"), None);
        assert_eq!(version_from_ref("refs/tags/v1.2.3.4"), None);
        assert_eq!(version_from_ref("refs/tags/v1.x"), None);
        assert_eq!(version_from_ref("refs/tags/1.2.3"), None);
        assert_eq!(version_from_ref("refs/heads/v1.2.3"), None);
    }

    #[test]
    fn test_newest_ignores_non_release_tags() {
        let tags = tags();
        assert_eq!(newest(&tags), Some(Version::new(0, 10, 0)));
        assert_eq!(newest(&tags[3..]), None);
    }

    #[test]
    fn test_pending_update() {
        let tags = tags();
        assert_eq!(
            pending_update(&Version::new(0, 9, 7), &tags),
            Some(Version::new(0, 10, 0))
        );
        assert_eq!(pending_update(&Version::new(0, 10, 0), &tags), None);
        assert_eq!(pending_update(&Version::new(1, 0, 0), &tags), None);
        assert_eq!(pending_update(&Version::new(0, 1, 0), &tags[3..]), None);
        assert_eq!(pending_update(&Version::new(0, 1, 0), &[]), None);
    }

    #[test]
    fn test_platform_names() {
        assert_eq!(
            Platform::from_rust("macos", "aarch64"),
            Platform {
                os: "darwin".to_string(),
                arch: "arm64".to_string()
            }
        );
        assert_eq!(Platform::from_rust("linux", "x86_64").arch, "amd64");
        assert_eq!(Platform::from_rust("windows", "x86").arch, "386");
    }

    #[test]
    fn test_feed_urls() {
        let feed = ReleaseFeed::new("pro-infra/kc", "kc-test").expect("feed");
        assert_eq!(
            feed.tags_url(),
            "https://api.github.com/repos/pro-infra/kc/git/refs/tags"
        );
        let platform = Platform::from_rust("linux", "x86_64");
        assert_eq!(
            feed.asset_url(&Version::new(0, 3, 1), &platform),
            "https://github.com/pro-infra/kc/releases/download/v0.3.1/kc.linux_amd64"
        );
    }

    #[test]
    fn test_invalid_repo() {
        for repo in ["kc", "/kc", "pro-infra/", "a/b/c"] {
            assert!(matches!(
                ReleaseFeed::new(repo, "kc-test"),
                Err(Error::InvalidRepo(_))
            ));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_check_writable() {
        use std::os::unix::fs::PermissionsExt;

        let file = tempfile::NamedTempFile::new().expect("temp");
        check_writable(file.path()).expect("writable");

        fs::set_permissions(file.path(), fs::Permissions::from_mode(0o555)).expect("chmod");
        assert!(matches!(
            check_writable(file.path()),
            Err(Error::WriteProtected(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_replace_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("kc");
        fs::write(&target, b"old").expect("write");
        fs::set_permissions(&target, fs::Permissions::from_mode(0o644)).expect("chmod");

        replace_executable(&target, b"new release").expect("replace");

        assert_eq!(fs::read(&target).expect("read"), b"new release");
        let mode = fs::metadata(&target).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        let leftovers = fs::read_dir(dir.path()).expect("read dir").count();
        assert_eq!(leftovers, 1);
    }
}
