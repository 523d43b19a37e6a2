use crate::chord::service::Service;
use crate::error::NetworkError;
use crate::network::grpc::server::ChordGrpcServer;
use crate::network::messages::chord::chord_node_server::ChordNodeServer;
use futures::FutureExt;
use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Serves a [`Service`] on an already bound listener until told to stop.
pub struct GrpcThread {
    service: Arc<Service>,
    listener: TcpListener,
    shutdown_rx: oneshot::Receiver<()>,
}

impl GrpcThread {
    pub fn new(
        service: Arc<Service>,
        listener: TcpListener,
        shutdown_rx: oneshot::Receiver<()>,
    ) -> Self {
        Self {
            service,
            listener,
            shutdown_rx,
        }
    }

    pub async fn run(self) -> Result<(), NetworkError> {
        let addr = self
            .listener
            .local_addr()
            .map_err(|e| NetworkError::Grpc(format!("Failed to read listener address: {}", e)))?;
        info!("Starting gRPC server on {}", addr);

        let server = ChordGrpcServer::new(self.service);
        let incoming = TcpListenerStream::new(self.listener);

        match Server::builder()
            .tcp_nodelay(true)
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .add_service(ChordNodeServer::new(server))
            .serve_with_incoming_shutdown(incoming, self.shutdown_rx.map(|_| ()))
            .await
        {
            Ok(_) => {
                info!("gRPC server on {} shut down gracefully", addr);
                Ok(())
            }
            Err(e) => {
                error!("gRPC server encountered a fatal error: {:?}", e);
                Err(NetworkError::Grpc(format!("Server error: {}", e)))
            }
        }
    }
}

/// A running gRPC server.
pub struct GrpcServerHandle {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<(), NetworkError>>>,
}

impl GrpcServerHandle {
    /// Spawns the server for `service` on `listener`.
    pub fn spawn(service: Arc<Service>, listener: TcpListener) -> Result<Self, NetworkError> {
        let addr = listener
            .local_addr()
            .map_err(|e| NetworkError::Grpc(format!("Failed to read listener address: {}", e)))?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let thread = GrpcThread::new(service, listener, shutdown_rx);
        let task = tokio::spawn(thread.run());
        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stops accepting requests and waits for the server task to finish.
    pub async fn stop(&mut self) -> Result<(), NetworkError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let Some(mut task) = self.task.take() else {
            return Ok(());
        };
        match tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await {
            Ok(joined) => {
                joined.map_err(|e| NetworkError::Grpc(format!("Server task failed: {}", e)))?
            }
            Err(_) => {
                warn!("gRPC server on {} did not drain in time, aborting", self.addr);
                task.abort();
                Ok(())
            }
        }
    }
}
