use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

const EXAMPLE_SCRIPT_NAME: &str = "example.script.json";

const EXAMPLE_SCRIPT: &str = r#"{
  "text": "Hello world",
  "actions": [
    { "action": "track", "enabled": true },
    { "action": "insert", "at": 5, "text": " there" },
    { "action": "delete", "from": 12, "to": 17 },
    { "action": "accept", "scope": "document" }
  ]
}
"#;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Author id stamped on tracked changes
    #[arg(long)]
    pub author_id: Option<String>,

    /// Author display name
    #[arg(long)]
    pub author_name: Option<String>,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing redline...".bright_blue().bold());

    let mut config = Config::default();
    if let Some(id) = args.author_id {
        config.editor.tracking.author_id = id;
    }
    if let Some(name) = args.author_name {
        config.editor.tracking.author_name = name;
    }

    let config_json = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, config_json)?;
    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);

    let example = PathBuf::from(cwd).join(EXAMPLE_SCRIPT_NAME);
    if !example.exists() {
        fs::write(&example, EXAMPLE_SCRIPT)?;
        println!("  {} Created {}", "✓".green(), EXAMPLE_SCRIPT_NAME);
    }

    println!();
    println!("{}", "✅ Ready!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Edit {}", EXAMPLE_SCRIPT_NAME);
    println!("  2. Run: redline replay {}", EXAMPLE_SCRIPT_NAME);

    Ok(())
}
