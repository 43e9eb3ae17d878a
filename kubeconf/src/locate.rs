use std::env;
use std::ffi::OsStr;
use std::path::PathBuf;

use crate::{Error, Result};

pub const KUBECONFIG: &str = "KUBECONFIG";

pub fn kube_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or(Error::NoHomeDir)?;
    Ok(home.join(".kube"))
}

/// Picks the kubeconfig to edit. `explicit` is the value of `--kubeconfig`
/// or `$KUBECONFIG`; a path list yields its first entry. Falls back to
/// `~/.kube/config`.
pub fn resolve(explicit: Option<&OsStr>) -> Result<PathBuf> {
    if let Some(path) = explicit.and_then(first_path) {
        return Ok(path);
    }
    Ok(kube_dir()?.join("config"))
}

fn first_path(list: &OsStr) -> Option<PathBuf> {
    env::split_paths(list).find(|p| !p.as_os_str().is_empty())
}
