use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::*;
use serde_yaml::Value as YamlValue;

use crate::{Error, Result};

/// Keys we don't model, kept so a rewrite doesn't lose them.
pub type Extra = BTreeMap<String, YamlValue>;

fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// region: Context
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ContextSpec {
    #[serde(default)]
    pub cluster: String,
    #[serde(default)]
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<YamlValue>,
    #[serde(flatten)]
    pub other: Extra,
}
#[derive(Serialize, Deserialize, Debug)]
pub struct Context {
    pub name: String,
    pub context: ContextSpec,
}
// endregion

// region: Cluster
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ClusterSpec {
    #[serde(default)]
    pub server: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_authority_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_authority: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure_skip_tls_verify: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<YamlValue>,
    #[serde(flatten)]
    pub other: Extra,
}

/// Moves the file behind `path` into `data` as base64, the way kubectl
/// stores `*-data` fields. Existing data wins and leaves the path alone.
fn inline_data(base: &Path, path: &mut Option<PathBuf>, data: &mut Option<String>) -> Result<()> {
    if data.is_some() {
        return Ok(());
    }

    match path {
        Some(file) => {
            let file = base.join(file);
            let contents = fs::read(&file).map_err(|source| Error::Read { path: file, source })?;
            *data = Some(BASE64.encode(contents));
        }
        None => return Ok(()),
    }

    *path = None;

    Ok(())
}

impl ClusterSpec {
    pub fn inline(&mut self, base: &Path) -> Result<()> {
        inline_data(
            base,
            &mut self.certificate_authority,
            &mut self.certificate_authority_data,
        )
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Cluster {
    pub name: String,
    pub cluster: ClusterSpec,
}

// endregion

// region: User
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct UserSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_certificate: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_certificate_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_key: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_key_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(flatten)]
    pub other: Extra,
}

impl UserSpec {
    /// Credentials carried inline, as issued certificates are.
    pub fn with_client_cert(certificate_pem: &[u8], key_pem: &[u8]) -> Self {
        Self {
            client_certificate_data: Some(BASE64.encode(certificate_pem)),
            client_key_data: Some(BASE64.encode(key_pem)),
            ..Default::default()
        }
    }

    pub fn inline(&mut self, base: &Path) -> Result<()> {
        inline_data(base, &mut self.client_certificate, &mut self.client_certificate_data)?;
        inline_data(base, &mut self.client_key, &mut self.client_key_data)?;

        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct User {
    pub name: String,
    pub user: UserSpec,
}
// endregion

// region: Common
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq)]
pub enum ApiVersion {
    #[default]
    #[serde(rename = "v1")]
    V1,
}
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq)]
pub enum Kind {
    #[default]
    Config,
}

/// The kubeconfig document as it sits on disk. Field order follows what
/// kubectl writes.
#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case")]
pub struct KubeConfig {
    #[serde(rename = "apiVersion", default)]
    pub api_version: ApiVersion,
    #[serde(default, deserialize_with = "nullable")]
    pub clusters: Vec<Cluster>,
    #[serde(default, deserialize_with = "nullable")]
    pub contexts: Vec<Context>,
    #[serde(default, deserialize_with = "nullable")]
    pub current_context: String,
    #[serde(default)]
    pub kind: Kind,
    #[serde(default, deserialize_with = "nullable")]
    pub preferences: Extra,
    #[serde(default, deserialize_with = "nullable")]
    pub users: Vec<User>,
    #[serde(flatten)]
    pub other: Extra,
}

impl KubeConfig {
    pub fn read_from(path: impl AsRef<Path>) -> Result<KubeConfig> {
        let path = path.as_ref();
        let file = fs::File::open(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::read_from_reader(file)
    }

    /// An empty document is an empty config, as kubectl treats it.
    pub fn read_from_reader(mut reader: impl Read) -> Result<KubeConfig> {
        let mut raw = String::new();
        reader.read_to_string(&mut raw)?;
        if raw.trim().is_empty() {
            return Ok(KubeConfig::default());
        }
        Ok(serde_yaml::from_str(&raw)?)
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = open_for_write(path).map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(serde_yaml::to_writer(file, self)?)
    }
}

#[cfg(unix)]
fn open_for_write(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_for_write(path: &Path) -> io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}
// endregion
