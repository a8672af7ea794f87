use crate::error::{Result, ServiceError};
use crate::service::{Service, handle_rpc};
use crate::wire::{Opcode, RequestCommon, WireHeader};
use bytes::{Bytes, BytesMut};
use std::sync::Arc;

/// One request being served: the bytes that arrived and the reply being
/// assembled for them.
#[derive(Debug)]
pub struct Rpc {
    pub request_payload: Bytes,
    pub reply_payload: BytesMut,
}

impl Rpc {
    pub fn new(request: impl Into<Bytes>) -> Self {
        Self {
            request_payload: request.into(),
            reply_payload: BytesMut::new(),
        }
    }

    /// The opcode exactly as it appears on the wire.
    pub fn raw_opcode(&self) -> Result<u16> {
        RequestCommon::decode(&self.request_payload).map(|common| common.opcode)
    }

    /// Unknown opcodes are reported as [`ServiceError::UnimplementedRequest`].
    pub fn opcode(&self) -> Result<Opcode> {
        let raw = self.raw_opcode()?;
        Opcode::try_from(raw)
            .map_err(|opcode| ServiceError::UnimplementedRequest { opcode })
    }

    pub fn into_reply(self) -> Bytes {
        self.reply_payload.freeze()
    }
}

#[tarpc::service]
pub trait ServiceRpc {
    /// Carries one encoded request and returns the encoded reply.
    async fn invoke(request: Vec<u8>) -> Vec<u8>;
}

/// Trait for sending encoded requests to a service.
/// This is dyn-compatible, unlike the tarpc-generated ServiceRpc trait.
#[async_trait::async_trait]
pub trait RpcTransport: Send + Sync {
    async fn invoke(&self, request: Bytes) -> anyhow::Result<Bytes>;
}

#[async_trait::async_trait]
impl RpcTransport for ServiceRpcClient {
    async fn invoke(&self, request: Bytes) -> anyhow::Result<Bytes> {
        let reply = self
            .clone()
            .invoke(tarpc::context::current(), request.to_vec())
            .await?;
        Ok(Bytes::from(reply))
    }
}

/// Delivers requests straight to a service in this process.
#[derive(Clone)]
pub struct LocalTransport {
    service: Arc<dyn Service>,
}

impl LocalTransport {
    pub fn new(service: Arc<dyn Service>) -> Self {
        Self { service }
    }
}

#[async_trait::async_trait]
impl RpcTransport for LocalTransport {
    async fn invoke(&self, request: Bytes) -> anyhow::Result<Bytes> {
        let mut rpc = Rpc::new(request);
        handle_rpc(self.service.as_ref(), &mut rpc);
        Ok(rpc.into_reply())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{UpdateServerListRequest, encode_request};

    #[test]
    fn test_opcode_from_request() -> anyhow::Result<()> {
        let rpc = Rpc::new(encode_request(&UpdateServerListRequest::new(0), &[]));
        assert_eq!(rpc.opcode()?, Opcode::UpdateServerList);
        Ok(())
    }

    #[test]
    fn test_unknown_opcode_is_unimplemented() {
        let rpc = Rpc::new(vec![0xff, 0x00]);
        assert!(matches!(
            rpc.opcode(),
            Err(ServiceError::UnimplementedRequest { opcode: 0xff })
        ));
    }

    #[test]
    fn test_empty_request() {
        let rpc = Rpc::new(Bytes::new());
        assert!(matches!(
            rpc.raw_opcode(),
            Err(ServiceError::MessageTooShort {
                needed: 2,
                available: 0
            })
        ));
    }
}
