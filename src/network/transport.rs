use crate::error::NetworkError;
use crate::network::messages::chord::{
    CheckRequest, CheckResponse, JoinRequest, JoinResponse, LeaveRequest, LeaveResponse,
    NotifyRequest, NotifyResponse, StabilizeRequest, StabilizeResponse, SuccessorRequest,
    SuccessorResponse,
};
use async_trait::async_trait;

/// Carries protocol requests from a local [`Client`](crate::chord::client::Client)
/// to the [`Service`](crate::chord::service::Service) listening at `endpoint`.
#[async_trait]
pub trait ChordTransport: Send + Sync + 'static {
    async fn join(&self, endpoint: &str, request: JoinRequest)
        -> Result<JoinResponse, NetworkError>;

    async fn successor(
        &self,
        endpoint: &str,
        request: SuccessorRequest,
    ) -> Result<SuccessorResponse, NetworkError>;

    async fn stabilize(
        &self,
        endpoint: &str,
        request: StabilizeRequest,
    ) -> Result<StabilizeResponse, NetworkError>;

    async fn notify(
        &self,
        endpoint: &str,
        request: NotifyRequest,
    ) -> Result<NotifyResponse, NetworkError>;

    async fn check(&self, endpoint: &str, request: CheckRequest)
        -> Result<CheckResponse, NetworkError>;

    async fn leave(&self, endpoint: &str, request: LeaveRequest)
        -> Result<LeaveResponse, NetworkError>;
}
