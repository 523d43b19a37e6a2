use crate::chord::service::Service;
use crate::network::messages::chord::{
    chord_node_server::ChordNode as ChordNodeService, CheckRequest, CheckResponse, JoinRequest,
    JoinResponse, LeaveRequest, LeaveResponse, NotifyRequest, NotifyResponse, StabilizeRequest,
    StabilizeResponse, SuccessorRequest, SuccessorResponse,
};
use log::{debug, warn};
use std::sync::Arc;
use tonic::{Request, Response, Status};

/// Exposes a [`Service`] as the `chord.ChordNode` gRPC service.
pub struct ChordGrpcServer {
    service: Arc<Service>,
}

impl ChordGrpcServer {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

fn reply<T>(method: &str, result: Result<T, crate::error::ChordError>) -> Result<Response<T>, Status> {
    result.map(Response::new).map_err(|e| {
        warn!("{} failed: {}", method, e);
        Status::from(e)
    })
}

#[tonic::async_trait]
impl ChordNodeService for ChordGrpcServer {
    async fn join(&self, request: Request<JoinRequest>) -> Result<Response<JoinResponse>, Status> {
        debug!("Received join request from {:?}", request.remote_addr());
        reply("join", self.service.join(request.into_inner()).await)
    }

    async fn successor(
        &self,
        request: Request<SuccessorRequest>,
    ) -> Result<Response<SuccessorResponse>, Status> {
        reply("successor", self.service.successor(request.into_inner()).await)
    }

    async fn stabilize(
        &self,
        request: Request<StabilizeRequest>,
    ) -> Result<Response<StabilizeResponse>, Status> {
        reply("stabilize", self.service.stabilize(request.into_inner()).await)
    }

    async fn notify(
        &self,
        request: Request<NotifyRequest>,
    ) -> Result<Response<NotifyResponse>, Status> {
        reply("notify", self.service.notify(request.into_inner()).await)
    }

    async fn check(
        &self,
        request: Request<CheckRequest>,
    ) -> Result<Response<CheckResponse>, Status> {
        reply("check", self.service.check(request.into_inner()).await)
    }

    async fn leave(
        &self,
        request: Request<LeaveRequest>,
    ) -> Result<Response<LeaveResponse>, Status> {
        reply("leave", self.service.leave(request.into_inner()).await)
    }
}
