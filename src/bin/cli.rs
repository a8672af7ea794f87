use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use memberd::client::MembershipClient;
use memberd::server_list::ServerListUpdate;
use memberd::trace::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "memberd-cli")]
#[command(about = "Query and update a membership server", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "ADDR",
        help = "Server address",
        default_value = "127.0.0.1:1101"
    )]
    server: SocketAddr,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the server's configuration.
    Config,
    /// Push the server list stored as JSON in FILE.
    PushList { file: PathBuf },
}

fn read_server_list(path: &PathBuf) -> anyhow::Result<ServerListUpdate> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        anyhow::anyhow!("Failed to read '{}': {}", path.display(), e)
    })?;
    Ok(serde_json::from_str(&contents)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (tracer_provider, _logger) = init_tracing("memberd-cli")?;

    let cli = Cli::parse();
    let client = MembershipClient::connect(cli.server).await?;

    match cli.command {
        Command::Config => {
            let config = client.get_server_config().await?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Command::PushList { file } => {
            let update = read_server_list(&file)?;
            client.update_server_list(&update).await?;
            println!(
                "Pushed version {} ({} servers)",
                update.version,
                update.servers.len()
            );
        }
    }

    tracer_provider.shutdown()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_command() {
        let cli = Cli::try_parse_from(["memberd-cli", "config"]).unwrap();
        assert!(matches!(cli.command, Command::Config));
        assert_eq!(cli.server.port(), 1101);
    }

    #[test]
    fn test_parse_push_list_command() {
        let cli = Cli::try_parse_from([
            "memberd-cli",
            "--server",
            "127.0.0.1:9999",
            "push-list",
            "list.json",
        ])
        .unwrap();
        assert_eq!(cli.server.port(), 9999);
        match cli.command {
            Command::PushList { file } => {
                assert_eq!(file, PathBuf::from("list.json"))
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_push_list_requires_file() {
        assert!(Cli::try_parse_from(["memberd-cli", "push-list"]).is_err());
    }

    #[test]
    fn test_read_missing_file() {
        let path = PathBuf::from("/nonexistent/memberd/list.json");
        assert!(read_server_list(&path).is_err());
    }
}
