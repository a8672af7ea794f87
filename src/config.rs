use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Master,
    Backup,
    Membership,
    Ping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterConfig {
    pub log_bytes: u64,
    pub hash_table_bytes: u64,
    pub disable_log_cleaner: bool,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            log_bytes: 512 * 1024 * 1024,
            hash_table_bytes: 64 * 1024 * 1024,
            disable_log_cleaner: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupConfig {
    pub in_memory: bool,
    pub num_segment_frames: u32,
    pub file: Option<std::path::PathBuf>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            in_memory: false,
            num_segment_frames: 512,
            file: None,
        }
    }
}

/// Configuration snapshot of this server process.
///
/// Built once at startup and shared read-only; `GetServerConfig` hands a
/// serialized copy to whoever asks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub cluster_name: String,
    pub coordinator_locator: String,
    pub local_locator: String,
    pub services: Vec<ServiceType>,
    pub segment_size: u32,
    pub master: MasterConfig,
    pub backup: BackupConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            cluster_name: "__unnamed__".to_string(),
            coordinator_locator: "tcp:host=127.0.0.1,port=12246".to_string(),
            local_locator: "tcp:host=127.0.0.1,port=12247".to_string(),
            services: vec![ServiceType::Membership, ServiceType::Ping],
            segment_size: 8 * 1024 * 1024,
            master: MasterConfig::default(),
            backup: BackupConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn has_service(&self, service: ServiceType) -> bool {
        self.services.contains(&service)
    }
}
