use crate::rpc::{Rpc, ServiceRpc, ServiceRpcClient};
use crate::service::{Service, handle_rpc};
use futures::{future, prelude::*};
use std::net::SocketAddr;
use std::sync::Arc;
use tarpc::{
    client,
    server::{self, Channel},
    tokio_serde::formats::Json,
};

/// Exposes a [`Service`] over tarpc.
#[derive(Clone)]
pub struct RpcServer {
    service: Arc<dyn Service>,
}

impl RpcServer {
    pub fn new(service: Arc<dyn Service>) -> Self {
        Self { service }
    }
}

impl ServiceRpc for RpcServer {
    async fn invoke(
        self,
        _: tarpc::context::Context,
        request: Vec<u8>,
    ) -> Vec<u8> {
        let mut rpc = Rpc::new(request);
        handle_rpc(self.service.as_ref(), &mut rpc);
        rpc.into_reply().to_vec()
    }
}

async fn spawn(fut: impl Future<Output = ()> + Send + 'static) {
    tokio::spawn(fut);
}

/// Accepts connections on `addr` until the listener fails.
pub async fn serve(
    addr: SocketAddr,
    service: Arc<dyn Service>,
) -> anyhow::Result<()> {
    let mut listener =
        tarpc::serde_transport::tcp::listen(&addr, Json::default).await?;
    listener.config_mut().max_frame_length(usize::MAX);
    tracing::info!(
        addr = %listener.local_addr(),
        service = service.name(),
        "Listening"
    );

    let server = RpcServer::new(service);
    listener
        .filter_map(|r| future::ready(r.ok()))
        .map(server::BaseChannel::with_defaults)
        .map(|channel| {
            let server = server.clone();
            channel.execute(server.serve()).for_each(spawn)
        })
        .buffer_unordered(10)
        .for_each(|_| async {})
        .await;

    Ok(())
}

pub async fn connect(addr: SocketAddr) -> anyhow::Result<ServiceRpcClient> {
    let transport =
        tarpc::serde_transport::tcp::connect(addr, Json::default).await?;
    Ok(ServiceRpcClient::new(client::Config::default(), transport).spawn())
}
