pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod logger;
pub mod membership;
pub mod rpc;
pub mod server;
pub mod server_id;
pub mod server_list;
pub mod service;
pub mod testlog;
pub mod trace;
pub mod wire;
