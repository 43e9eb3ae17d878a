use anyhow::bail;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use kubeconf::csr::{self, MAX_DAYS};
use kubeconf::KubeConfig;

const PAGE_SIZE: usize = 10;

/// Sorted context list with the cursor on the current context. `None` when
/// the user backs out.
pub fn choose_context(kc: &KubeConfig, label: &str) -> anyhow::Result<Option<String>> {
    let names = kc.context_names();
    if names.is_empty() {
        bail!("No contexts found in kube config");
    }
    let current = names
        .iter()
        .position(|name| *name == kc.current_context)
        .unwrap_or(0);

    let choice = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(label)
        .items(&names)
        .default(current)
        .max_length(PAGE_SIZE)
        .interact_opt()?;

    Ok(choice.map(|index| names[index].to_string()))
}

pub fn username() -> anyhow::Result<String> {
    let name: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Username")
        .validate_with(|input: &String| {
            if input.trim().is_empty() {
                Err("a username is required")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    Ok(name.trim().to_string())
}

pub fn groups() -> anyhow::Result<Vec<String>> {
    let input: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Groups (comma separated)")
        .allow_empty(true)
        .interact_text()?;
    Ok(csr::parse_groups(&input))
}

pub fn days() -> anyhow::Result<u32> {
    let days: u32 = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Days until expiration")
        .validate_with(|days: &u32| {
            if (1..=MAX_DAYS).contains(days) {
                Ok(())
            } else {
                Err(format!("must be between 1 and {MAX_DAYS}"))
            }
        })
        .interact_text()?;
    Ok(days)
}

pub fn confirm(prompt: &str) -> anyhow::Result<bool> {
    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .wait_for_newline(true)
        .interact()?)
}
