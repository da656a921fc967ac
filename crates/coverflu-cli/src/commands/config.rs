use anyhow::Result;

use coverflu_core::AppConfig;

pub fn run(config: &AppConfig, path_only: bool) -> Result<()> {
    if path_only {
        println!("{}", AppConfig::config_path().display());
        return Ok(());
    }

    print!("{}", config.to_toml()?);
    Ok(())
}
