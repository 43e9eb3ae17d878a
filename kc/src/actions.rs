use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use chrono::{Days, Local};
use console::{style, Style};
use semver::Version;
use similar::{ChangeTag, TextDiff};
use tabular::{row, Table};
use tracing::{debug, info};

use kubeconf::csr::{self, CertRequest, Issuer};
use kubeconf::update::{self, Platform, ReleaseFeed};
use kubeconf::{backup, locate, KubeConfig, Merged, Pruned, STDIN};

use crate::cli::Args;
use crate::prompt;

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub async fn run(args: Args) -> anyhow::Result<()> {
    if args.version {
        let platform = Platform::current();
        println!("{VERSION} {} {}", platform.os, platform.arch);
        return Ok(());
    }
    if args.update || args.dry_update {
        return self_update(&args.release_repo, args.dry_update).await;
    }

    let file = locate::resolve(args.kubeconfig.as_deref()).context("Locating kube config")?;
    debug!(path = %file.display(), "using kube config");

    if args.add_user {
        add_user(&file, args.key_bits, Duration::from_secs(args.timeout)).await
    } else if args.delete {
        delete(&file, args.dry_run)
    } else if let Some(source) = &args.add {
        merge(&file, source, args.inline, args.dry_run)
    } else {
        choose(&file)
    }
}

fn choose(file: &Path) -> anyhow::Result<()> {
    let mut kc = KubeConfig::load(file)?;
    let Some(name) = prompt::choose_context(&kc, "Select Context")? else {
        println!("Exit without change!");
        return Ok(());
    };

    println!("You chose {name:?}");
    kc.use_context(&name)?;
    kc.save(file)?;
    Ok(())
}

fn delete(file: &Path, dry_run: bool) -> anyhow::Result<()> {
    let mut kc = KubeConfig::load(file)?;
    let before = kc.clone();
    let Some(name) = prompt::choose_context(&kc, "Delete Context")? else {
        println!("Exit without change!");
        return Ok(());
    };

    let switched = kc.delete_context(&name)?;
    let pruned = kc.prune();
    print_removal(&name, switched.as_deref(), &pruned);

    if dry_run {
        return print_diff(&before, &kc);
    }
    write_with_backup(&kc, file)
}

fn merge(file: &Path, source: &str, inline: bool, dry_run: bool) -> anyhow::Result<()> {
    let mut kc = KubeConfig::load(file)?;
    let mut other = KubeConfig::load_source(source)
        .with_context(|| format!("Reading kube config to merge from {source}"))?;

    if inline {
        let base = if source == STDIN {
            std::env::current_dir()?
        } else {
            Path::new(source)
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default()
        };
        other.inline_files(&base).context("Inlining certificate files")?;
    }

    let before = kc.clone();
    let merged = kc.merge(other);
    log_merge(&merged);

    if dry_run {
        return print_diff(&before, &kc);
    }
    write_with_backup(&kc, file)
}

async fn add_user(file: &Path, key_bits: u32, timeout: Duration) -> anyhow::Result<()> {
    let mut kc = KubeConfig::load(file)?;
    let Some(admin) = prompt::choose_context(&kc, "Select Admin Context for adding UserCert")? else {
        println!("Exit without change!");
        return Ok(());
    };
    println!("You chose {admin:?}");
    kc.use_context(&admin)?;
    kc.save(file)?;

    let username = prompt::username()?;
    let groups = prompt::groups()?;
    let days = prompt::days()?;
    let cluster = kc.current_cluster_name()?.to_string();
    let expires = Local::now()
        .checked_add_days(Days::new(u64::from(days)))
        .map(|at| at.format("%Y-%m-%d").to_string())
        .unwrap_or_default();

    println!("\n\nAdd User Context for:");
    let mut table = Table::new("{:<} : {:<}");
    table.add_row(row!("Context to add", &admin));
    table.add_row(row!("user context name", format!("{username}@{cluster}")));
    table.add_row(row!("Username", &username));
    table.add_row(row!("Groups", serde_json::to_string(&groups)?));
    table.add_row(row!("Days", days));
    table.add_row(row!("Expires", expires));
    print!("{table}");

    if !prompt::confirm("OK")? {
        println!("Exit without change!");
        return Ok(());
    }

    let request = CertRequest::generate(&username, &groups, key_bits)
        .context("Generating certificate request")?;
    let client = csr::client_for_context(file, &admin)
        .await
        .with_context(|| format!("Connecting with context {admin}"))?;
    let certificate = Issuer::new(client)
        .with_timeout(timeout)
        .issue(&request, days)
        .await
        .context("Issuing client certificate")?;

    // reread: the issuance may take a while and the file is shared
    let mut kc = KubeConfig::load(file)?;
    kc.use_context(&admin)?;
    let context = kc.add_user_context(&username, &certificate, &request.key_pem)?;
    kc.save(file)?;

    println!("Added context {}", style(context).green());
    Ok(())
}

async fn self_update(repository: &str, dry_run: bool) -> anyhow::Result<()> {
    let current = Version::parse(VERSION)?;
    let feed = ReleaseFeed::new(repository, &format!("kc/{VERSION}"))?;

    let tags = feed.tags().await.context("Listing releases")?;
    let Some(newest) = update::pending_update(&current, &tags) else {
        if update::newest(&tags).is_some() {
            info!("Newest version is already installed");
        } else {
            info!("No newer version found");
        }
        return Ok(());
    };
    info!(%current, %newest, "Update needed");

    let executable = std::env::current_exe()?;
    info!(path = %executable.display(), "Update executable");
    update::check_writable(&executable)?;

    let url = feed.asset_url(&newest, &Platform::current());
    if dry_run {
        info!("Would download {url} to {}", executable.display());
    } else {
        feed.download(&url, &executable)
            .await
            .with_context(|| format!("Downloading {url}"))?;
    }
    info!("success");
    Ok(())
}

fn write_with_backup(kc: &KubeConfig, file: &Path) -> anyhow::Result<()> {
    let saved = backup(file)?;
    info!(backup = %saved.display(), "backup written");
    kc.save(file)?;
    Ok(())
}

fn log_merge(merged: &Merged) {
    for (section, name) in &merged.added {
        info!(%section, %name, "added");
    }
    for (section, name) in &merged.replaced {
        info!(%section, %name, "replaced");
    }
    println!(
        "Merged {} new and {} replaced entries",
        merged.added.len(),
        merged.replaced.len()
    );
}

fn print_removal(context: &str, switched: Option<&str>, pruned: &Pruned) {
    let removed = |kind: &str, name: &str| {
        println!("{} {:<8} {}", style('-').red(), kind, style(name).red());
    };

    removed("context", context);
    for cluster in &pruned.clusters {
        removed("cluster", cluster);
    }
    for user in &pruned.users {
        removed("user", user);
    }
    if let Some(current) = switched {
        println!("  current context is now {}", style(current).bold());
    }
}

fn print_diff(before: &KubeConfig, after: &KubeConfig) -> anyhow::Result<()> {
    let old = before.to_yaml()?;
    let new = after.to_yaml()?;
    let diff = TextDiff::from_lines(&old, &new);

    for change in diff.iter_all_changes() {
        let (sign, paint) = match change.tag() {
            ChangeTag::Delete => ("-", Style::new().red()),
            ChangeTag::Insert => ("+", Style::new().green()),
            ChangeTag::Equal => (" ", Style::new()),
        };
        print!("{}{}", paint.apply_to(sign), paint.apply_to(change));
    }
    Ok(())
}
