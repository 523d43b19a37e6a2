use crate::error::NetworkError;
use crate::network::messages::chord::{
    chord_node_client::ChordNodeClient, CheckRequest, CheckResponse, JoinRequest, JoinResponse,
    LeaveRequest, LeaveResponse, NotifyRequest, NotifyResponse, StabilizeRequest,
    StabilizeResponse, SuccessorRequest, SuccessorResponse,
};
use crate::network::transport::ChordTransport;
use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tonic::Response;

#[derive(Clone, Debug)]
pub struct ChordGrpcClient {
    client: ChordNodeClient<Channel>,
}

impl ChordGrpcClient {
    /// Connects to `addr` (`host:port`, optionally with an `http://` scheme).
    pub async fn connect(addr: &str, timeout: Duration) -> Result<Self, NetworkError> {
        let uri = if addr.starts_with("http://") || addr.starts_with("https://") {
            addr.to_string()
        } else {
            format!("http://{}", addr)
        };
        let endpoint = Endpoint::from_shared(uri)
            .map_err(|e| NetworkError::ConnectionFailed(format!("{}: {}", addr, e)))?
            .connect_timeout(timeout)
            .timeout(timeout)
            .tcp_nodelay(true);
        let channel = endpoint
            .connect()
            .await
            .map_err(|e| NetworkError::PeerUnreachable(format!("{}: {}", addr, e)))?;

        Ok(Self {
            client: ChordNodeClient::new(channel),
        })
    }

    pub async fn join(&mut self, request: JoinRequest) -> Result<JoinResponse, NetworkError> {
        Ok(self.client.join(request).await.map(Response::into_inner)?)
    }

    pub async fn successor(
        &mut self,
        request: SuccessorRequest,
    ) -> Result<SuccessorResponse, NetworkError> {
        Ok(self.client.successor(request).await.map(Response::into_inner)?)
    }

    pub async fn stabilize(
        &mut self,
        request: StabilizeRequest,
    ) -> Result<StabilizeResponse, NetworkError> {
        Ok(self.client.stabilize(request).await.map(Response::into_inner)?)
    }

    pub async fn notify(&mut self, request: NotifyRequest) -> Result<NotifyResponse, NetworkError> {
        Ok(self.client.notify(request).await.map(Response::into_inner)?)
    }

    pub async fn check(&mut self, request: CheckRequest) -> Result<CheckResponse, NetworkError> {
        Ok(self.client.check(request).await.map(Response::into_inner)?)
    }

    pub async fn leave(&mut self, request: LeaveRequest) -> Result<LeaveResponse, NetworkError> {
        Ok(self.client.leave(request).await.map(Response::into_inner)?)
    }
}

/// [`ChordTransport`] over gRPC. Channels are cached per endpoint and
/// dropped when the peer stops answering.
pub struct GrpcTransport {
    timeout: Duration,
    clients: Mutex<HashMap<String, ChordGrpcClient>>,
}

impl GrpcTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            clients: Mutex::new(HashMap::new()),
        }
    }

    async fn client(&self, endpoint: &str) -> Result<ChordGrpcClient, NetworkError> {
        let cached = self
            .clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(endpoint)
            .cloned();
        if let Some(client) = cached {
            return Ok(client);
        }

        let client = ChordGrpcClient::connect(endpoint, self.timeout).await?;
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(endpoint.to_string(), client.clone());
        Ok(client)
    }

    fn settle<T>(&self, endpoint: &str, result: Result<T, NetworkError>) -> Result<T, NetworkError> {
        if let Err(NetworkError::PeerUnreachable(_) | NetworkError::Timeout) = &result {
            debug!("Dropping cached channel to {}", endpoint);
            self.clients
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(endpoint);
        }
        result
    }
}

#[async_trait]
impl ChordTransport for GrpcTransport {
    async fn join(
        &self,
        endpoint: &str,
        request: JoinRequest,
    ) -> Result<JoinResponse, NetworkError> {
        let mut client = self.client(endpoint).await?;
        let result = client.join(request).await;
        self.settle(endpoint, result)
    }

    async fn successor(
        &self,
        endpoint: &str,
        request: SuccessorRequest,
    ) -> Result<SuccessorResponse, NetworkError> {
        let mut client = self.client(endpoint).await?;
        let result = client.successor(request).await;
        self.settle(endpoint, result)
    }

    async fn stabilize(
        &self,
        endpoint: &str,
        request: StabilizeRequest,
    ) -> Result<StabilizeResponse, NetworkError> {
        let mut client = self.client(endpoint).await?;
        let result = client.stabilize(request).await;
        self.settle(endpoint, result)
    }

    async fn notify(
        &self,
        endpoint: &str,
        request: NotifyRequest,
    ) -> Result<NotifyResponse, NetworkError> {
        let mut client = self.client(endpoint).await?;
        let result = client.notify(request).await;
        self.settle(endpoint, result)
    }

    async fn check(
        &self,
        endpoint: &str,
        request: CheckRequest,
    ) -> Result<CheckResponse, NetworkError> {
        let mut client = self.client(endpoint).await?;
        let result = client.check(request).await;
        self.settle(endpoint, result)
    }

    async fn leave(
        &self,
        endpoint: &str,
        request: LeaveRequest,
    ) -> Result<LeaveResponse, NetworkError> {
        let mut client = self.client(endpoint).await?;
        let result = client.leave(request).await;
        self.settle(endpoint, result)
    }
}
