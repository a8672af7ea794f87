use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::Instrument;

use memberd::config::{ServerConfig, ServiceType};
use memberd::membership::MembershipService;
use memberd::server::serve;
use memberd::server_id::ServerId;
use memberd::server_list::MemServerList;
use memberd::testlog::TestLog;
use memberd::trace::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "memberd-server")]
#[command(about = "Cluster membership server", long_about = None)]
struct Args {
    #[arg(short, long)]
    port: u16,

    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value = "__unnamed__")]
    cluster_name: String,

    #[arg(long, default_value = "tcp:host=127.0.0.1,port=12246")]
    coordinator: String,

    /// Index of this server's id, as assigned by the coordinator.
    #[arg(long, default_value = "0")]
    server_index: u32,

    #[arg(long, default_value = "0")]
    server_generation: u32,

    #[arg(long, value_delimiter = ',', default_value = "membership,ping")]
    services: Vec<String>,

    #[arg(long, default_value = "8388608")]
    segment_size: u32,
}

fn parse_service(name: &str) -> anyhow::Result<ServiceType> {
    match name.trim() {
        "master" => Ok(ServiceType::Master),
        "backup" => Ok(ServiceType::Backup),
        "membership" => Ok(ServiceType::Membership),
        "ping" => Ok(ServiceType::Ping),
        other => Err(anyhow::anyhow!("Unknown service '{}'", other)),
    }
}

impl Args {
    fn server_config(&self) -> anyhow::Result<ServerConfig> {
        let services = self
            .services
            .iter()
            .map(|s| parse_service(s))
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(ServerConfig {
            cluster_name: self.cluster_name.clone(),
            coordinator_locator: self.coordinator.clone(),
            local_locator: format!("tcp:host={},port={}", self.host, self.port),
            services,
            segment_size: self.segment_size,
            ..ServerConfig::default()
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run().await
}

#[tracing::instrument(name = "memberd-server")]
async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let (tracer_provider, logger) = init_tracing("memberd-server")?;
    tracing::debug!(directives = %logger.directives(), "Logging configured");

    let bind_addr: SocketAddr =
        format!("{}:{}", args.host, args.port).parse()?;
    let config = args.server_config()?;
    let server_id = ServerId::new(args.server_index, args.server_generation);

    let service = MembershipService::new(
        server_id,
        Arc::new(MemServerList::new()),
        Arc::new(config),
        Arc::new(TestLog::new()),
    )?;

    tracing::info!(%server_id, "Starting membership service on {}", bind_addr);

    let span = tracing::info_span!("server", port = args.port);
    tokio::spawn(serve(bind_addr, Arc::new(service)).instrument(span))
        .await??;

    tracer_provider.shutdown()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(services: &[&str]) -> Args {
        Args {
            port: 1101,
            host: "10.0.0.7".to_string(),
            cluster_name: "main".to_string(),
            coordinator: "tcp:host=10.0.0.1,port=12246".to_string(),
            server_index: 4,
            server_generation: 0,
            services: services.iter().map(|s| s.to_string()).collect(),
            segment_size: 1024,
        }
    }

    #[test]
    fn test_server_config_from_args() -> anyhow::Result<()> {
        let config = args(&["master", "membership"]).server_config()?;

        assert_eq!(config.cluster_name, "main");
        assert_eq!(config.local_locator, "tcp:host=10.0.0.7,port=1101");
        assert_eq!(
            config.services,
            vec![ServiceType::Master, ServiceType::Membership]
        );
        assert_eq!(config.segment_size, 1024);
        Ok(())
    }

    #[test]
    fn test_unknown_service_rejected() {
        assert!(args(&["coordinator"]).server_config().is_err());
    }
}
