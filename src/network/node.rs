use crate::chord::client::Client;
use crate::chord::events::{EventBus, RingEvent};
use crate::chord::routing::Router;
use crate::chord::scheduler::Scheduler;
use crate::chord::service::Service;
use crate::chord::types::{Node, NodeId};
use crate::chord::workers::Maintenance;
use crate::config::PeerConfig;
use crate::error::{ChordError, ConfigError, NetworkError, RingError};
use crate::network::grpc::{GrpcServerHandle, GrpcTransport};
use crate::network::transport::ChordTransport;
use log::{error, info, warn};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

/// One ring member: router, protocol client and service, plus the scheduler
/// that keeps the ring healthy.
pub struct ChordPeer {
    config: PeerConfig,
    router: Arc<Router>,
    client: Arc<Client>,
    service: Arc<Service>,
    events: EventBus,
    maintenance: Maintenance,
    scheduler: Scheduler,
    server: Option<GrpcServerHandle>,
}

impl ChordPeer {
    /// Assembles a peer reachable at `endpoint` that talks to others over `transport`.
    pub fn new(
        config: PeerConfig,
        endpoint: String,
        transport: Arc<dyn ChordTransport>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let id = config.node_id.unwrap_or_else(NodeId::random);
        let local = Node::new(id, endpoint);

        let events = EventBus::new();
        let router = Arc::new(Router::new(local));
        let client = Arc::new(Client::new(
            router.clone(),
            transport,
            events.clone(),
            config.max_lookup_hops,
        ));
        let service = Arc::new(Service::new(router.clone(), client.clone(), events.clone()));
        let maintenance = Maintenance::new(
            router.clone(),
            client.clone(),
            service.clone(),
            events.clone(),
            config.join.clone(),
            config.fingers_per_tick,
        );
        let scheduler = Scheduler::new(config.workers);

        Ok(Self {
            config,
            router,
            client,
            service,
            events,
            maintenance,
            scheduler,
            server: None,
        })
    }

    /// Binds the configured address and serves the protocol over gRPC.
    pub async fn bind(config: PeerConfig) -> Result<Self, RingError> {
        let listener = TcpListener::bind((config.host.as_str(), config.port.unwrap_or(0)))
            .await
            .map_err(|e| {
                NetworkError::ConnectionFailed(format!("Failed to bind {}: {}", config.host, e))
            })?;
        let port = listener
            .local_addr()
            .map_err(|e| NetworkError::Grpc(format!("Failed to read bound address: {}", e)))?
            .port();

        let transport = Arc::new(GrpcTransport::new(config.rpc_timeout()));
        let endpoint = config.endpoint(port);
        let mut peer = Self::new(config, endpoint, transport)?;
        peer.server = Some(GrpcServerHandle::spawn(peer.service.clone(), listener)?);
        Ok(peer)
    }

    /// Bootstraps or joins, then starts the periodic maintenance tasks.
    ///
    /// A failed join is not fatal: the stabilize task keeps retrying it while
    /// the node has no successor.
    pub async fn start(&self) -> Result<(), ChordError> {
        match &self.config.join {
            None => self.maintenance.bootstrap(),
            Some(addr) => {
                if let Err(e) = self.maintenance.join(addr).await {
                    error!("Failed to join through {}: {}, retrying on stabilize", addr, e);
                }
            }
        }

        let stabilize = self.maintenance.clone();
        self.scheduler
            .schedule_every("stabilize", self.config.stabilize_interval(), move || {
                let m = stabilize.clone();
                async move { m.stabilize().await }
            });
        let check = self.maintenance.clone();
        self.scheduler
            .schedule_every("check_predecessor", self.config.check_interval(), move || {
                let m = check.clone();
                async move { m.check_predecessor().await }
            });
        let fix = self.maintenance.clone();
        self.scheduler
            .schedule_every("fix_fingers", self.config.fix_fingers_interval(), move || {
                let m = fix.clone();
                async move { m.fix_fingers().await }
            });

        info!("{} is running", self.local());
        Ok(())
    }

    /// Resolves the node owning `id`.
    pub async fn successor(&self, id: NodeId) -> Result<Node, ChordError> {
        self.client.successor(id).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RingEvent> {
        self.events.subscribe()
    }

    pub fn local(&self) -> &Node {
        self.router.local()
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn service(&self) -> &Arc<Service> {
        &self.service
    }

    pub fn maintenance(&self) -> &Maintenance {
        &self.maintenance
    }

    pub fn config(&self) -> &PeerConfig {
        &self.config
    }

    /// Stops maintenance (waiting for running ticks), leaves the ring and
    /// stops the server.
    pub async fn shutdown(&mut self) {
        info!("Shutting down {}", self.local());
        self.scheduler.shutdown().await;

        if let Err(e) = self.client.leave().await {
            warn!("Graceful leave failed: {}", e);
        }

        if let Some(mut server) = self.server.take() {
            if let Err(e) = server.stop().await {
                error!("Failed to stop gRPC server: {}", e);
            }
        }
        info!("{} shut down", self.local());
    }
}
