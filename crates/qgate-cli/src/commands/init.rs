use anyhow::Result;
use qgate_config::{CONFIG_FILE_NAME, Config};

pub fn handle(force: bool) -> Result<()> {
    let current_dir = std::env::current_dir()?;
    let path = current_dir.join(CONFIG_FILE_NAME);

    if path.exists() && !force {
        anyhow::bail!("{CONFIG_FILE_NAME} already exists in current directory (use --force to overwrite)");
    }

    std::fs::write(&path, Config::template())?;

    println!("✓ Created {CONFIG_FILE_NAME}");
    println!("  Run 'qgate check <summary.json>...' to gate a build");
    Ok(())
}
