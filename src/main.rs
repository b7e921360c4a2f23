use anyhow::Result;
use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;
use qsoprint::app::{load_config, run_listen, run_replay};
use qsoprint::cli::{Cli, Commands, ConfigAction};
use qsoprint::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let options = cli.run_options();

    match cli.command {
        None | Some(Commands::Listen) => {
            let config = load_config(cli.config.as_deref())?;
            run_listen(config, options).await?;
        }
        Some(Commands::Replay { ref file }) => {
            let config = load_config(cli.config.as_deref())?;
            run_replay(config, options, file)?;
        }
        Some(Commands::Config { action }) => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "qsoprint",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Handle configuration commands.
fn handle_config_command(
    action: ConfigAction,
    custom_path: Option<&std::path::Path>,
) -> Result<()> {
    let config_path = custom_path
        .map(std::path::PathBuf::from)
        .unwrap_or_else(Config::default_path);

    match action {
        ConfigAction::Show => {
            let config = load_config(custom_path)?;
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Path => {
            let state = if config_path.exists() {
                "exists".green().to_string()
            } else {
                "not created".dimmed().to_string()
            };
            println!("{} ({})", config_path.display(), state);
        }
        ConfigAction::Init => match Config::write_default(&config_path) {
            Ok(()) => {
                println!("{}", format!("Wrote {}", config_path.display()).green());
            }
            Err(e) => {
                eprintln!("{}", format!("Error: {}", e).red());
                std::process::exit(1);
            }
        },
    }
    Ok(())
}
