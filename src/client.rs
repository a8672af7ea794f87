use crate::config::ServerConfig;
use crate::rpc::RpcTransport;
use crate::server_list::ServerListUpdate;
use crate::wire::{
    GetServerConfig, GetServerConfigRequest, UpdateServerList,
    UpdateServerListRequest, decode_response, encode_request,
};
use anyhow::Context as _;
use std::net::SocketAddr;
use std::sync::Arc;

/// Caller side of the membership service.
#[derive(Clone)]
pub struct MembershipClient {
    transport: Arc<dyn RpcTransport>,
}

impl MembershipClient {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }

    pub async fn connect(addr: SocketAddr) -> anyhow::Result<Self> {
        let client = crate::server::connect(addr).await?;
        Ok(Self::new(Arc::new(client)))
    }

    pub async fn get_server_config(&self) -> anyhow::Result<ServerConfig> {
        let request = encode_request(&GetServerConfigRequest::default(), &[]);
        let reply = self.transport.invoke(request).await?;

        let (header, payload) = decode_response::<GetServerConfig>(&reply)?;
        let length = header.server_config_length as usize;
        let payload = payload.get(..length).with_context(|| {
            format!(
                "server config truncated: expected {length} bytes, got {}",
                payload.len()
            )
        })?;
        Ok(serde_json::from_slice(payload)?)
    }

    pub async fn update_server_list(
        &self,
        update: &ServerListUpdate,
    ) -> anyhow::Result<()> {
        let payload = serde_json::to_vec(update)?;
        let header = UpdateServerListRequest::new(u32::try_from(
            payload.len(),
        )?);
        let reply = self
            .transport
            .invoke(encode_request(&header, &payload))
            .await?;

        decode_response::<UpdateServerList>(&reply)?;
        tracing::debug!(version = update.version, "Pushed server list");
        Ok(())
    }
}
