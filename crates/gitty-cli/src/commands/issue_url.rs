//! Resolve an issue or pull request number to its web URL.

use anyhow::{Context, Result, bail};
use gitty_core::Config;
use gitty_core::config::GeneralConfig;
use gitty_forge::Forge;

use crate::commands::utils::{connect, resolve_target};

/// Print the URL of issue or pull request `number`.
pub fn run(arg: &str, number: u64, config: &Config, settings: &GeneralConfig) -> Result<()> {
    let target = resolve_target(arg, settings)?;
    let (owner, name) = (&target.url.owner, &target.url.name);

    let rt = tokio::runtime::Runtime::new()?;
    let url = rt.block_on(async {
        let provider = connect(&target.url.host, config).await?;
        provider
            .issue_url(owner, name, number)
            .await
            .with_context(|| format!("Failed to look up #{number} in {owner}/{name}"))
    })?;

    match url {
        Some(url) => {
            println!("{url}");
            Ok(())
        }
        None => bail!("#{number} is neither an issue nor a pull request in {owner}/{name}"),
    }
}
