//! Opcode dispatch for services.
//!
//! A service registers one typed handler per opcode with a
//! [`DispatcherBuilder`] when it is constructed. The resulting
//! [`Dispatcher`] is immutable, so concurrent dispatches never contend on
//! the binding table. Any state a handler mutates is synchronized by the
//! handler's collaborators, not here.

use crate::error::{Result, ServiceError};
use crate::rpc::Rpc;
use crate::wire::{Opcode, ResponseCommon, RpcOp, WireHeader};
use bytes::BufMut;
use std::collections::HashMap;

/// A server-side component that answers the opcodes it has bound.
pub trait Service: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs the handler bound to `opcode`.
    ///
    /// Fails with [`ServiceError::UnimplementedRequest`] when the service
    /// has no handler for `opcode`.
    fn dispatch(&self, opcode: Opcode, rpc: &mut Rpc) -> Result<()>;
}

/// Typed handler for operation `W` on service `S`.
pub type Handler<S, W> = fn(
    &S,
    &<W as RpcOp>::Request,
    &mut <W as RpcOp>::Response,
    &mut Rpc,
) -> Result<()>;

type Binding<S> = Box<dyn Fn(&S, &mut Rpc) -> Result<()> + Send + Sync>;

pub struct Dispatcher<S> {
    bindings: HashMap<Opcode, Binding<S>>,
}

impl<S> Dispatcher<S> {
    pub fn builder() -> DispatcherBuilder<S> {
        DispatcherBuilder {
            bindings: HashMap::new(),
        }
    }

    pub fn dispatch(
        &self,
        service: &S,
        opcode: Opcode,
        rpc: &mut Rpc,
    ) -> Result<()> {
        match self.bindings.get(&opcode) {
            Some(binding) => binding(service, rpc),
            None => Err(ServiceError::UnimplementedRequest {
                opcode: opcode as u16,
            }),
        }
    }

    pub fn is_bound(&self, opcode: Opcode) -> bool {
        self.bindings.contains_key(&opcode)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

pub struct DispatcherBuilder<S> {
    bindings: HashMap<Opcode, Binding<S>>,
}

impl<S: 'static> DispatcherBuilder<S> {
    /// Binds `handler` to `W::OPCODE`. Each opcode may be bound once.
    pub fn bind<W: RpcOp + 'static>(
        mut self,
        handler: Handler<S, W>,
    ) -> Result<Self> {
        if self.bindings.contains_key(&W::OPCODE) {
            return Err(ServiceError::DuplicateBinding(W::OPCODE));
        }
        self.bindings.insert(
            W::OPCODE,
            Box::new(move |service: &S, rpc: &mut Rpc| {
                call_handler::<S, W>(service, rpc, handler)
            }),
        );
        Ok(self)
    }

    pub fn build(self) -> Dispatcher<S> {
        Dispatcher {
            bindings: self.bindings,
        }
    }
}

/// Decodes the request header, runs `handler` and fills in the response
/// header.
///
/// Room for the response header is reserved before the handler runs so
/// that anything the handler appends to the reply lands after it. If the
/// handler fails, the reply is cut back to where it started.
fn call_handler<S, W: RpcOp>(
    service: &S,
    rpc: &mut Rpc,
    handler: Handler<S, W>,
) -> Result<()> {
    let request = <W::Request as WireHeader>::decode(&rpc.request_payload)?;
    let mut response = W::Response::default();

    let header_size = <W::Response as WireHeader>::SIZE;
    let header_at = rpc.reply_payload.len();
    rpc.reply_payload.put_bytes(0, header_size);

    if let Err(e) = handler(service, &request, &mut response, rpc) {
        rpc.reply_payload.truncate(header_at);
        return Err(e);
    }

    let mut slot = &mut rpc.reply_payload[header_at..header_at + header_size];
    response.write(&mut slot);
    Ok(())
}

/// Serves one request on `service`.
///
/// Never fails: when dispatch fails, whatever the handler wrote is
/// discarded and the reply becomes a bare [`ResponseCommon`] carrying the
/// error's status.
pub fn handle_rpc(service: &dyn Service, rpc: &mut Rpc) {
    let result = rpc.opcode().and_then(|opcode| {
        tracing::debug!(service = service.name(), ?opcode, "Dispatching");
        service.dispatch(opcode, rpc)
    });

    if let Err(e) = result {
        tracing::warn!(
            service = service.name(),
            opcode = ?rpc.raw_opcode().ok(),
            error = %e,
            "Request failed"
        );
        rpc.reply_payload.clear();
        ResponseCommon { status: e.status() }.write(&mut rpc.reply_payload);
    }
}
