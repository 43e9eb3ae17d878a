use std::collections::{BTreeMap, HashSet};
use std::fmt;

use tracing::{info, warn};

use crate::clean::{ContextSpec, KubeConfig, UserSpec};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Cluster,
    Context,
    User,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Section::Cluster => "cluster",
            Section::Context => "context",
            Section::User => "user",
        })
    }
}

/// Entries dropped by [`KubeConfig::prune`].
#[derive(Debug, Default, PartialEq)]
pub struct Pruned {
    pub clusters: Vec<String>,
    pub users: Vec<String>,
}

impl Pruned {
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty() && self.users.is_empty()
    }
}

/// What [`KubeConfig::merge`] brought in.
#[derive(Debug, Default, PartialEq)]
pub struct Merged {
    pub added: Vec<(Section, String)>,
    pub replaced: Vec<(Section, String)>,
}

fn merge_section<T>(
    section: Section,
    into: &mut BTreeMap<String, T>,
    from: BTreeMap<String, T>,
    merged: &mut Merged,
) {
    for (name, entry) in from {
        if into.insert(name.clone(), entry).is_some() {
            merged.replaced.push((section, name));
        } else {
            merged.added.push((section, name));
        }
    }
}

impl KubeConfig {
    /// Context names in display order.
    pub fn context_names(&self) -> Vec<&str> {
        self.contexts.keys().map(String::as_str).collect()
    }

    pub fn current(&self) -> Result<&ContextSpec> {
        if self.current_context.is_empty() {
            return Err(Error::NoCurrentContext);
        }
        self.contexts
            .get(&self.current_context)
            .ok_or_else(|| Error::UnknownContext(self.current_context.clone()))
    }

    pub fn current_cluster_name(&self) -> Result<&str> {
        Ok(&self.current()?.cluster)
    }

    pub fn use_context(&mut self, name: &str) -> Result<()> {
        if !self.contexts.contains_key(name) {
            return Err(Error::UnknownContext(name.to_string()));
        }
        self.current_context = name.to_string();
        Ok(())
    }

    /// Removes a context. When it was the current one, the first remaining
    /// context takes over and its name is returned.
    pub fn delete_context(&mut self, name: &str) -> Result<Option<String>> {
        if !self.contexts.contains_key(name) {
            return Err(Error::UnknownContext(name.to_string()));
        }
        if self.contexts.len() <= 1 {
            return Err(Error::LastContext(name.to_string()));
        }

        self.contexts.remove(name);

        if self.contexts.contains_key(&self.current_context) {
            return Ok(None);
        }
        // non-empty: at least two contexts existed before removal
        let fallback = self.contexts.keys().next().cloned().unwrap_or_default();
        warn!(context = %fallback, "current context was deleted - switched");
        self.current_context = fallback.clone();
        Ok(Some(fallback))
    }

    /// Drops clusters and users no context refers to.
    pub fn prune(&mut self) -> Pruned {
        let used_clusters = self
            .contexts
            .values()
            .map(|ctx| ctx.cluster.clone())
            .collect::<HashSet<_>>();
        let used_users = self
            .contexts
            .values()
            .map(|ctx| ctx.user.clone())
            .collect::<HashSet<_>>();

        let mut pruned = Pruned::default();
        self.clusters.retain(|name, _| {
            let keep = used_clusters.contains(name);
            if !keep {
                pruned.clusters.push(name.clone());
            }
            keep
        });
        self.users.retain(|name, _| {
            let keep = used_users.contains(name);
            if !keep {
                pruned.users.push(name.clone());
            }
            keep
        });
        pruned
    }

    /// Copies every entry of `other` in, overwriting same-named ones. The
    /// current context stays unless this config has none.
    pub fn merge(&mut self, other: KubeConfig) -> Merged {
        let mut merged = Merged::default();
        merge_section(Section::Cluster, &mut self.clusters, other.clusters, &mut merged);
        merge_section(Section::User, &mut self.users, other.users, &mut merged);
        merge_section(Section::Context, &mut self.contexts, other.contexts, &mut merged);

        if self.current_context.is_empty() && !other.current_context.is_empty() {
            self.current_context = other.current_context;
        }
        merged
    }

    /// Stores an issued client certificate as `<user>@<cluster>` and adds
    /// the context `<user>@<current context>` for it. Returns the context
    /// name.
    pub fn add_user_context(
        &mut self,
        username: &str,
        certificate_pem: &[u8],
        key_pem: &[u8],
    ) -> Result<String> {
        let cluster = self.current_cluster_name()?.to_string();
        let user_name = format!("{username}@{cluster}");
        let context_name = format!("{username}@{}", self.current_context);

        self.users.insert(
            user_name.clone(),
            UserSpec::with_client_cert(certificate_pem, key_pem),
        );
        self.contexts.insert(
            context_name.clone(),
            ContextSpec {
                cluster,
                user: user_name,
                ..Default::default()
            },
        );
        info!(context = %context_name, "added user context");
        Ok(context_name)
    }
}
