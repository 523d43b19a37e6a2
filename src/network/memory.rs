use crate::chord::service::Service;
use crate::error::{ChordError, NetworkError};
use crate::network::messages::chord::{
    CheckRequest, CheckResponse, JoinRequest, JoinResponse, LeaveRequest, LeaveResponse,
    NotifyRequest, NotifyResponse, StabilizeRequest, StabilizeResponse, SuccessorRequest,
    SuccessorResponse,
};
use crate::network::transport::ChordTransport;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tonic::Status;

/// In-process transport that dispatches requests straight to registered
/// services, for simulations and tests.
///
/// Services are held weakly: dropping a peer (or calling
/// [`MemoryNetwork::unregister`]) makes its endpoint unreachable, like a crash.
#[derive(Default)]
pub struct MemoryNetwork {
    services: Mutex<HashMap<String, Weak<Service>>>,
}

impl MemoryNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self, service: &Arc<Service>) {
        let endpoint = service.local().endpoint.clone();
        self.services
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(endpoint, Arc::downgrade(service));
    }

    pub fn unregister(&self, endpoint: &str) -> bool {
        self.services
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(endpoint)
            .is_some()
    }

    fn service(&self, endpoint: &str) -> Result<Arc<Service>, NetworkError> {
        self.services
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(endpoint)
            .and_then(Weak::upgrade)
            .ok_or_else(|| NetworkError::PeerUnreachable(endpoint.to_string()))
    }
}

// Same error mapping a request would see across the gRPC transport.
fn remote(error: ChordError) -> NetworkError {
    NetworkError::from(Status::from(error))
}

#[async_trait]
impl ChordTransport for MemoryNetwork {
    async fn join(
        &self,
        endpoint: &str,
        request: JoinRequest,
    ) -> Result<JoinResponse, NetworkError> {
        self.service(endpoint)?.join(request).await.map_err(remote)
    }

    async fn successor(
        &self,
        endpoint: &str,
        request: SuccessorRequest,
    ) -> Result<SuccessorResponse, NetworkError> {
        self.service(endpoint)?.successor(request).await.map_err(remote)
    }

    async fn stabilize(
        &self,
        endpoint: &str,
        request: StabilizeRequest,
    ) -> Result<StabilizeResponse, NetworkError> {
        self.service(endpoint)?.stabilize(request).await.map_err(remote)
    }

    async fn notify(
        &self,
        endpoint: &str,
        request: NotifyRequest,
    ) -> Result<NotifyResponse, NetworkError> {
        self.service(endpoint)?.notify(request).await.map_err(remote)
    }

    async fn check(
        &self,
        endpoint: &str,
        request: CheckRequest,
    ) -> Result<CheckResponse, NetworkError> {
        self.service(endpoint)?.check(request).await.map_err(remote)
    }

    async fn leave(
        &self,
        endpoint: &str,
        request: LeaveRequest,
    ) -> Result<LeaveResponse, NetworkError> {
        self.service(endpoint)?.leave(request).await.map_err(remote)
    }
}
