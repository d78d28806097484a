//! `drag help` command implementation

use crate::cli::Cli;
use clap::{Args, CommandFactory};

/// Arguments for the `help` command
#[derive(Args)]
pub struct HelpArgs {
    /// Command to show help for
    pub command: Option<String>,
}

/// Render the long help for drag, or for one of its commands
pub fn render(command: Option<&str>) -> anyhow::Result<String> {
    let mut cli = Cli::command();
    let Some(name) = command else {
        return Ok(cli.render_long_help().to_string());
    };

    let names: Vec<String> = cli
        .get_subcommands()
        .map(|c| c.get_name().to_string())
        .collect();
    match cli.find_subcommand_mut(name) {
        Some(sub) => Ok(sub.render_long_help().to_string()),
        None => anyhow::bail!("No such command: {}\n\nCommands: {}", name, names.join(", ")),
    }
}

/// Execute the `help` command
pub async fn execute(args: HelpArgs) -> anyhow::Result<()> {
    print!("{}", render(args.command.as_deref())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_level_help_lists_commands() {
        let help = render(None).unwrap();
        assert!(help.contains("Usage:"));
        assert!(help.contains("sync"));
        assert!(help.contains("up"));
    }

    #[test]
    fn test_command_help() {
        let help = render(Some("sync")).unwrap();
        assert!(help.contains("--repo"));
        assert!(help.contains("--disable-parallel"));
    }

    #[test]
    fn test_unknown_command_help() {
        let err = render(Some("exec")).unwrap_err();
        assert!(err.to_string().starts_with("No such command: exec"));
    }
}
