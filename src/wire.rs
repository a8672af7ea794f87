//! Wire format for service requests and responses.
//!
//! Every message starts with a fixed-size header, little-endian, followed
//! by an optional variable-length payload whose length is carried in the
//! header.
//!
//! ```text
//! Request:                           Response:
//! +----------------+---------------+ +-------------------------------+
//! | opcode (u16)   | op fields ... | | status (u32)  | op fields ... |
//! +----------------+---------------+ +-------------------------------+
//! | payload ...                    | | payload ...                   |
//! +--------------------------------+ +-------------------------------+
//! ```

use crate::error::{Result, ServiceError};
use bytes::{BufMut, Bytes, BytesMut};
use nom::{
    IResult,
    combinator::map_res,
    number::complete::{le_u16, le_u32},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Opcode {
    Ping = 1,
    GetServerId = 2,
    GetServerConfig = 3,
    UpdateServerList = 4,
}

impl TryFrom<u16> for Opcode {
    type Error = u16;

    fn try_from(value: u16) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Opcode::Ping),
            2 => Ok(Opcode::GetServerId),
            3 => Ok(Opcode::GetServerConfig),
            4 => Ok(Opcode::UpdateServerList),
            _ => Err(value),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u32)]
pub enum Status {
    #[default]
    Ok = 0,
    UnimplementedRequest = 1,
    MessageTooShort = 2,
    RequestFormatError = 3,
    InternalError = 4,
}

impl TryFrom<u32> for Status {
    type Error = u32;

    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Status::Ok),
            1 => Ok(Status::UnimplementedRequest),
            2 => Ok(Status::MessageTooShort),
            3 => Ok(Status::RequestFormatError),
            4 => Ok(Status::InternalError),
            _ => Err(value),
        }
    }
}

/// A fixed-size message header.
pub trait WireHeader: Sized + std::fmt::Debug {
    const SIZE: usize;

    fn parse(input: &[u8]) -> IResult<&[u8], Self>;

    fn write<B: BufMut>(&self, out: &mut B);

    /// Decodes the header at the start of `input`.
    fn decode(input: &[u8]) -> Result<Self> {
        if input.len() < Self::SIZE {
            return Err(ServiceError::MessageTooShort {
                needed: Self::SIZE,
                available: input.len(),
            });
        }
        Self::parse(input)
            .map(|(_, header)| header)
            .map_err(|e| ServiceError::MalformedPayload(e.to_string()))
    }
}

/// Describes one operation: its opcode and its request/response headers.
pub trait RpcOp {
    const OPCODE: Opcode;
    type Request: WireHeader;
    type Response: WireHeader + Default;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestCommon {
    pub opcode: u16,
}

impl RequestCommon {
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode: opcode as u16,
        }
    }
}

impl WireHeader for RequestCommon {
    const SIZE: usize = 2;

    fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, opcode) = le_u16(input)?;
        Ok((input, Self { opcode }))
    }

    fn write<B: BufMut>(&self, out: &mut B) {
        out.put_u16_le(self.opcode);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseCommon {
    pub status: Status,
}

fn parse_status(input: &[u8]) -> IResult<&[u8], Status> {
    map_res(le_u32, Status::try_from)(input)
}

impl WireHeader for ResponseCommon {
    const SIZE: usize = 4;

    fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, status) = parse_status(input)?;
        Ok((input, Self { status }))
    }

    fn write<B: BufMut>(&self, out: &mut B) {
        out.put_u32_le(self.status as u32);
    }
}

pub struct GetServerConfig;

impl RpcOp for GetServerConfig {
    const OPCODE: Opcode = Opcode::GetServerConfig;
    type Request = GetServerConfigRequest;
    type Response = GetServerConfigResponse;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetServerConfigRequest {
    pub common: RequestCommon,
}

impl Default for GetServerConfigRequest {
    fn default() -> Self {
        Self {
            common: RequestCommon::new(Opcode::GetServerConfig),
        }
    }
}

impl WireHeader for GetServerConfigRequest {
    const SIZE: usize = RequestCommon::SIZE;

    fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, common) = RequestCommon::parse(input)?;
        Ok((input, Self { common }))
    }

    fn write<B: BufMut>(&self, out: &mut B) {
        self.common.write(out);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetServerConfigResponse {
    pub common: ResponseCommon,
    pub server_config_length: u32,
}

impl WireHeader for GetServerConfigResponse {
    const SIZE: usize = ResponseCommon::SIZE + 4;

    fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, common) = ResponseCommon::parse(input)?;
        let (input, server_config_length) = le_u32(input)?;
        Ok((
            input,
            Self {
                common,
                server_config_length,
            },
        ))
    }

    fn write<B: BufMut>(&self, out: &mut B) {
        self.common.write(out);
        out.put_u32_le(self.server_config_length);
    }
}

pub struct UpdateServerList;

impl RpcOp for UpdateServerList {
    const OPCODE: Opcode = Opcode::UpdateServerList;
    type Request = UpdateServerListRequest;
    type Response = UpdateServerListResponse;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateServerListRequest {
    pub common: RequestCommon,
    pub server_list_length: u32,
}

impl UpdateServerListRequest {
    pub fn new(server_list_length: u32) -> Self {
        Self {
            common: RequestCommon::new(Opcode::UpdateServerList),
            server_list_length,
        }
    }
}

impl WireHeader for UpdateServerListRequest {
    const SIZE: usize = RequestCommon::SIZE + 4;

    fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, common) = RequestCommon::parse(input)?;
        let (input, server_list_length) = le_u32(input)?;
        Ok((
            input,
            Self {
                common,
                server_list_length,
            },
        ))
    }

    fn write<B: BufMut>(&self, out: &mut B) {
        self.common.write(out);
        out.put_u32_le(self.server_list_length);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateServerListResponse {
    pub common: ResponseCommon,
}

impl WireHeader for UpdateServerListResponse {
    const SIZE: usize = ResponseCommon::SIZE;

    fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, common) = ResponseCommon::parse(input)?;
        Ok((input, Self { common }))
    }

    fn write<B: BufMut>(&self, out: &mut B) {
        self.common.write(out);
    }
}

/// Builds a request message: header followed by `payload`.
pub fn encode_request<H: WireHeader>(header: &H, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(H::SIZE + payload.len());
    header.write(&mut buf);
    buf.put_slice(payload);
    buf.freeze()
}

/// Splits a reply into its typed header and trailing payload.
///
/// A non-OK status is returned as [`ServiceError::Remote`]; error replies
/// only carry a [`ResponseCommon`], so the status is checked before the
/// full header is decoded.
pub fn decode_response<W: RpcOp>(
    reply: &[u8],
) -> Result<(W::Response, &[u8])> {
    let common = ResponseCommon::decode(reply)?;
    if common.status != Status::Ok {
        return Err(ServiceError::Remote(common.status));
    }
    let header = <W::Response as WireHeader>::decode(reply)?;
    Ok((header, &reply[<W::Response as WireHeader>::SIZE..]))
}
