use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::direct::{self, Extra};
pub use crate::direct::{Cluster, ClusterSpec, Context, ContextSpec, Kind, User, UserSpec};
use crate::{Error, Result};

/// Source name that reads a kubeconfig from standard input.
pub const STDIN: &str = "-";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KubeConfig {
    pub contexts: BTreeMap<String, ContextSpec>,
    pub current_context: String,
    pub clusters: BTreeMap<String, ClusterSpec>,
    pub preferences: Extra,
    pub users: BTreeMap<String, UserSpec>,
    pub other: Extra,
}

impl From<direct::KubeConfig> for KubeConfig {
    fn from(kc: direct::KubeConfig) -> Self {
        Self {
            current_context: kc.current_context,
            preferences: kc.preferences,
            other: kc.other,
            contexts: kc
                .contexts
                .into_iter()
                .map(|ctx| (ctx.name, ctx.context))
                .collect(),
            clusters: kc
                .clusters
                .into_iter()
                .map(|cls| (cls.name, cls.cluster))
                .collect(),
            users: kc
                .users
                .into_iter()
                .map(|usr| (usr.name, usr.user))
                .collect(),
        }
    }
}

impl From<KubeConfig> for direct::KubeConfig {
    fn from(kc: KubeConfig) -> Self {
        direct::KubeConfig {
            kind: Kind::Config,
            api_version: direct::ApiVersion::V1,
            preferences: kc.preferences,
            current_context: kc.current_context,
            other: kc.other,

            clusters: kc
                .clusters
                .into_iter()
                .map(|(name, cluster)| Cluster { name, cluster })
                .collect(),
            contexts: kc
                .contexts
                .into_iter()
                .map(|(name, context)| Context { name, context })
                .collect(),
            users: kc
                .users
                .into_iter()
                .map(|(name, user)| User { name, user })
                .collect(),
        }
    }
}

impl KubeConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading kubeconfig");
        direct::KubeConfig::read_from(path).map(KubeConfig::from)
    }

    /// Loads a file, or standard input when `source` is [`STDIN`].
    pub fn load_source(source: &str) -> Result<Self> {
        if source == STDIN {
            debug!("reading kubeconfig from stdin");
            direct::KubeConfig::read_from_reader(io::stdin().lock()).map(KubeConfig::from)
        } else {
            Self::load(source)
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        debug!(path = %path.display(), "writing kubeconfig");
        direct::KubeConfig::from(self.clone()).write_to(path)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&direct::KubeConfig::from(self.clone()))?)
    }

    /// Replaces file references with inline data; relative paths resolve
    /// against `base`.
    pub fn inline_files(&mut self, base: &Path) -> Result<()> {
        for cluster in self.clusters.values_mut() {
            cluster.inline(base)?;
        }

        for user in self.users.values_mut() {
            user.inline(base)?;
        }

        Ok(())
    }
}

/// Copies `path` to `<path>.bak` and returns the backup location.
pub fn backup(path: &Path) -> Result<PathBuf> {
    let mut name = OsString::from(path.as_os_str());
    name.push(".bak");
    let target = PathBuf::from(name);

    fs::copy(path, &target).map_err(|source| Error::Write {
        path: target.clone(),
        source,
    })?;

    Ok(target)
}
