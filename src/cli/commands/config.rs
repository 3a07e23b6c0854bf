use crate::cli::parser::Commands;
use crate::config::Config;
use crate::errors::AppResult;
use crate::ui::messages::{error, success, warning};
use std::path::Path;
use std::process::Command;

fn platform_editor() -> String {
    std::env::var("EDITOR")
        .or_else(|_| std::env::var("VISUAL"))
        .unwrap_or_else(|_| {
            if cfg!(target_os = "windows") {
                "notepad".to_string()
            } else {
                "nano".to_string()
            }
        })
}

fn edit_with(editor: &str, path: &Path) -> bool {
    matches!(Command::new(editor).arg(path).status(), Ok(s) if s.success())
}

/// Handle the `config` subcommand
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Config {
        print_config,
        edit_config,
        editor,
    } = cmd
    {
        if *print_config {
            println!("📄 Current configuration:\n");
            println!("{}", serde_yaml::to_string(cfg)?);

            // surface bad values now rather than at the first punch
            if let Err(e) = cfg.policy() {
                warning(e);
            }
        }

        if *edit_config {
            let path = Config::config_file();
            let fallback = platform_editor();
            let chosen = editor.clone().unwrap_or_else(|| fallback.clone());

            if edit_with(&chosen, &path) {
                success(format!("Configuration file edited using '{}'", chosen));
            } else if chosen != fallback && edit_with(&fallback, &path) {
                warning(format!("Editor '{}' not available, used '{}'", chosen, fallback));
            } else {
                error(format!("Failed to edit {} with '{}'", path.display(), chosen));
            }
        }
    }

    Ok(())
}
