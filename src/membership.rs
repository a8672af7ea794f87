//! Membership service: answers configuration queries and receives server
//! list pushes.
//!
//! `GetServerConfig` arguably belongs to a generic server-information
//! service, but it must be answered by every server and this is the one
//! service every server runs.

use crate::codec;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::rpc::Rpc;
use crate::server_id::ServerId;
use crate::server_list::{ServerListUpdate, ServerListView};
use crate::service::{Dispatcher, Service};
use crate::test_log;
use crate::testlog::TestLog;
use crate::wire::{
    GetServerConfig, GetServerConfigRequest, GetServerConfigResponse,
    Opcode, UpdateServerList, UpdateServerListRequest,
    UpdateServerListResponse, WireHeader,
};
use std::sync::Arc;

pub struct MembershipService {
    server_id: ServerId,
    server_list: Arc<dyn ServerListView>,
    server_config: Arc<ServerConfig>,
    test_log: Arc<TestLog>,
    dispatcher: Dispatcher<MembershipService>,
}

impl MembershipService {
    /// There should be exactly one of these per server.
    pub fn new(
        server_id: ServerId,
        server_list: Arc<dyn ServerListView>,
        server_config: Arc<ServerConfig>,
        test_log: Arc<TestLog>,
    ) -> Result<Self> {
        let dispatcher = Dispatcher::builder()
            .bind::<GetServerConfig>(Self::get_server_config)?
            .bind::<UpdateServerList>(Self::update_server_list)?
            .build();

        Ok(Self {
            server_id,
            server_list,
            server_config,
            test_log,
            dispatcher,
        })
    }

    pub fn server_id(&self) -> ServerId {
        self.server_id
    }

    /// Returns this server's configuration as a JSON payload.
    pub fn get_server_config(
        &self,
        _request: &GetServerConfigRequest,
        response: &mut GetServerConfigResponse,
        rpc: &mut Rpc,
    ) -> Result<()> {
        response.server_config_length = codec::serialize_to_response(
            &mut rpc.reply_payload,
            self.server_config.as_ref(),
        )?;
        tracing::debug!(
            server_id = %self.server_id,
            length = response.server_config_length,
            "Served server config"
        );
        Ok(())
    }

    /// Applies a server list pushed by the coordinator.
    ///
    /// The decoded list goes to the server list unchanged; versioning and
    /// full-vs-incremental handling are its business.
    pub fn update_server_list(
        &self,
        request: &UpdateServerListRequest,
        _response: &mut UpdateServerListResponse,
        rpc: &mut Rpc,
    ) -> Result<()> {
        let update: ServerListUpdate = codec::parse_from_request(
            &rpc.request_payload,
            UpdateServerListRequest::SIZE,
            request.server_list_length,
        )?;

        let received = update.version;
        let servers = update.servers.len();
        let version = self.server_list.apply_server_list(update);

        tracing::info!(
            server_id = %self.server_id,
            received,
            servers,
            version,
            "Server list update processed"
        );
        test_log!(
            self.test_log,
            "received version {} with {} servers, now at version {}",
            received,
            servers,
            version
        );
        Ok(())
    }
}

impl Service for MembershipService {
    fn name(&self) -> &'static str {
        "membership"
    }

    fn dispatch(&self, opcode: Opcode, rpc: &mut Rpc) -> Result<()> {
        self.dispatcher.dispatch(self, opcode, rpc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceType;
    use crate::error::ServiceError;
    use crate::server_list::{
        ListKind, MemServerList, ServerEntry, ServerStatus,
    };
    use crate::service::handle_rpc;
    use crate::wire::{
        ResponseCommon, Status, decode_response, encode_request,
    };
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingServerList {
        applied: Mutex<Vec<ServerListUpdate>>,
    }

    impl ServerListView for RecordingServerList {
        fn apply_server_list(&self, update: ServerListUpdate) -> u64 {
            let version = update.version;
            self.applied.lock().unwrap().push(update);
            version
        }
    }

    fn sample_update(version: u64) -> ServerListUpdate {
        ServerListUpdate {
            version,
            kind: ListKind::Full,
            servers: vec![
                ServerEntry {
                    server_id: ServerId::new(1, 0),
                    service_locator: "tcp:host=10.0.0.1,port=1101".to_string(),
                    services: vec![ServiceType::Master],
                    status: ServerStatus::Up,
                    expected_read_mbytes_per_sec: 100,
                    replication_id: 0,
                },
                ServerEntry {
                    server_id: ServerId::new(2, 0),
                    service_locator: "tcp:host=10.0.0.2,port=1101".to_string(),
                    services: vec![ServiceType::Backup],
                    status: ServerStatus::Crashed,
                    expected_read_mbytes_per_sec: 80,
                    replication_id: 1,
                },
            ],
        }
    }

    fn update_request(update: &ServerListUpdate) -> Rpc {
        let payload = serde_json::to_vec(update).unwrap();
        let header = UpdateServerListRequest::new(payload.len() as u32);
        Rpc::new(encode_request(&header, &payload))
    }

    fn service_with(
        server_list: Arc<dyn ServerListView>,
        test_log: Arc<TestLog>,
    ) -> MembershipService {
        let config = ServerConfig {
            cluster_name: "test".to_string(),
            ..ServerConfig::default()
        };
        MembershipService::new(
            ServerId::new(5, 1),
            server_list,
            Arc::new(config),
            test_log,
        )
        .unwrap()
    }

    #[test]
    fn test_get_server_config() -> anyhow::Result<()> {
        let service = service_with(
            Arc::new(MemServerList::new()),
            Arc::new(TestLog::new()),
        );
        let mut rpc =
            Rpc::new(encode_request(&GetServerConfigRequest::default(), &[]));

        handle_rpc(&service, &mut rpc);

        let reply = rpc.into_reply();
        let (header, payload) = decode_response::<GetServerConfig>(&reply)?;
        assert_eq!(header.server_config_length as usize, payload.len());
        let config: ServerConfig = serde_json::from_slice(payload)?;
        assert_eq!(config.cluster_name, "test");
        assert_eq!(config, *service.server_config);
        Ok(())
    }

    #[test]
    fn test_update_server_list_applies_once() -> anyhow::Result<()> {
        let list = Arc::new(RecordingServerList::default());
        let service = service_with(list.clone(), Arc::new(TestLog::new()));
        let update = sample_update(7);
        let mut rpc = update_request(&update);

        service.dispatch(Opcode::UpdateServerList, &mut rpc)?;

        let applied = list.applied.lock().unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0], update);

        let (header, payload) =
            decode_response::<UpdateServerList>(&rpc.reply_payload)?;
        assert_eq!(header.common.status, Status::Ok);
        assert!(payload.is_empty());
        Ok(())
    }

    #[test]
    fn test_update_server_list_reaches_mem_list() -> anyhow::Result<()> {
        let list = Arc::new(MemServerList::new());
        let service = service_with(list.clone(), Arc::new(TestLog::new()));

        let mut rpc = update_request(&sample_update(3));
        service.dispatch(Opcode::UpdateServerList, &mut rpc)?;

        assert_eq!(list.version(), 3);
        assert_eq!(list.len(), 2);
        assert!(list.is_up(ServerId::new(1, 0)));
        assert!(!list.is_up(ServerId::new(2, 0)));
        Ok(())
    }

    #[test]
    fn test_update_server_list_test_log_entry() -> anyhow::Result<()> {
        let test_log = Arc::new(TestLog::new());
        let list = Arc::new(MemServerList::new());
        let service = service_with(list, test_log.clone());
        test_log.enable();

        service.dispatch(
            Opcode::UpdateServerList,
            &mut update_request(&sample_update(4)),
        )?;
        service.dispatch(
            Opcode::UpdateServerList,
            &mut update_request(&sample_update(2)),
        )?;

        assert_eq!(
            test_log.get(),
            "update_server_list: received version 4 with 2 servers, \
             now at version 4 | update_server_list: received version 2 \
             with 2 servers, now at version 4"
        );
        Ok(())
    }

    #[test]
    fn test_truncated_list_is_not_applied() {
        let list = Arc::new(RecordingServerList::default());
        let service = service_with(list.clone(), Arc::new(TestLog::new()));
        let payload = serde_json::to_vec(&sample_update(1)).unwrap();
        let header = UpdateServerListRequest::new(payload.len() as u32);
        let mut rpc = Rpc::new(encode_request(
            &header,
            &payload[..payload.len() / 2],
        ));

        let err = service
            .dispatch(Opcode::UpdateServerList, &mut rpc)
            .unwrap_err();

        assert!(matches!(err, ServiceError::MessageTooShort { .. }));
        assert!(list.applied.lock().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_list_reports_format_error() -> anyhow::Result<()> {
        let list = Arc::new(RecordingServerList::default());
        let service = service_with(list.clone(), Arc::new(TestLog::new()));
        let payload = br#"{"version": "three"}"#;
        let header = UpdateServerListRequest::new(payload.len() as u32);
        let mut rpc = Rpc::new(encode_request(&header, payload));

        handle_rpc(&service, &mut rpc);

        assert!(list.applied.lock().unwrap().is_empty());
        assert_eq!(
            ResponseCommon::decode(&rpc.into_reply())?.status,
            Status::RequestFormatError
        );
        Ok(())
    }

    #[test]
    fn test_unbound_opcodes() {
        let service = service_with(
            Arc::new(MemServerList::new()),
            Arc::new(TestLog::new()),
        );

        for opcode in [Opcode::Ping, Opcode::GetServerId] {
            let mut rpc = Rpc::new(vec![opcode as u8, 0]);
            let err = service.dispatch(opcode, &mut rpc).unwrap_err();
            assert!(matches!(
                err,
                ServiceError::UnimplementedRequest { opcode: raw }
                    if raw == opcode as u16
            ));
        }
    }

    #[test]
    fn test_server_id_fixed_at_construction() {
        let service = service_with(
            Arc::new(MemServerList::new()),
            Arc::new(TestLog::new()),
        );
        assert_eq!(service.server_id(), ServerId::new(5, 1));
        assert_eq!(service.name(), "membership");
    }
}
