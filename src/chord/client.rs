use crate::chord::events::{EventBus, RingEvent};
use crate::chord::routing::Router;
use crate::chord::types::{Node, NodeId};
use crate::error::ChordError;
use crate::network::messages::chord::{
    CheckRequest, JoinRequest, JoinResponse, LeaveRequest, NodeInfo, NotifyRequest,
    StabilizeRequest, SuccessorRequest,
};
use crate::network::messages::conversions::{optional_node, required_node};
use crate::network::transport::ChordTransport;
use log::{debug, info, warn};
use std::sync::Arc;

/// Outbound half of the protocol.
///
/// Every call reads the router, talks to one remote node and writes what it
/// learned back into the router. Sequences are not atomic: the router may
/// change between the read and the write, and the next tick corrects it.
pub struct Client {
    router: Arc<Router>,
    transport: Arc<dyn ChordTransport>,
    events: EventBus,
    max_hops: u32,
}

impl Client {
    pub fn new(
        router: Arc<Router>,
        transport: Arc<dyn ChordTransport>,
        events: EventBus,
        max_hops: u32,
    ) -> Self {
        Self {
            router,
            transport,
            events,
            max_hops,
        }
    }

    fn local(&self) -> &Node {
        self.router.local()
    }

    fn local_info(&self) -> Option<NodeInfo> {
        Some(NodeInfo::from(self.local()))
    }

    /// Slot 0 when it names a peer rather than the local node.
    fn peer_successor(&self) -> Option<Node> {
        self.router
            .successor_entry(0)
            .filter(|successor| successor != self.local())
    }

    /// Joins the ring known to `bootstrap` and returns the new successor.
    pub async fn join(&self, bootstrap: &str) -> Result<Node, ChordError> {
        info!("{} joining through {}", self.local(), bootstrap);
        let request = JoinRequest {
            requesting_node: self.local_info(),
            hops: 0,
        };
        let response = self
            .transport
            .join(bootstrap, request)
            .await
            .map_err(|e| ChordError::JoinFailed(format!("{}: {}", bootstrap, e)))?;

        let successor = required_node(response.successor, "successor")?;
        if successor != *self.local() {
            self.router.set_successor(0, successor.clone());
        }
        if let Some(predecessor) = optional_node(response.predecessor)? {
            if predecessor != *self.local() && !self.router.has_predecessor() {
                self.router.set_predecessor(predecessor);
            }
        }
        info!("{} joined with successor {}", self.local(), successor);
        Ok(successor)
    }

    /// Passes a join that does not belong here on to `next`.
    pub(crate) async fn forward_join(
        &self,
        next: &Node,
        mut request: JoinRequest,
    ) -> Result<JoinResponse, ChordError> {
        if request.hops >= self.max_hops {
            return Err(ChordError::HopLimitExceeded {
                id: request
                    .requesting_node
                    .map(|n| n.node_id)
                    .unwrap_or_default(),
                limit: self.max_hops,
            });
        }
        request.hops += 1;
        debug!("Forwarding join to {} (hop {})", next, request.hops);
        Ok(self.transport.join(&next.endpoint, request).await?)
    }

    /// Asks the successor for its predecessor and adopts it when it sits
    /// between us, then notifies the (possibly new) successor.
    ///
    /// An unreachable successor is removed from the router and reported as
    /// [`RingEvent::SuccessorFailed`]; that is not an error.
    pub async fn stabilize(&self) -> Result<(), ChordError> {
        let Some(successor) = self.peer_successor() else {
            return Ok(());
        };

        let request = StabilizeRequest {
            requesting_node: self.local_info(),
        };
        let response = match self.transport.stabilize(&successor.endpoint, request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Successor {} failed during stabilize: {}", successor, e);
                self.router.remove(&successor.id);
                self.events.publish(RingEvent::SuccessorFailed(successor));
                return Ok(());
            }
        };

        if let Some(candidate) = optional_node(response.predecessor)? {
            if candidate.id.between(&self.local().id, &successor.id) {
                debug!("Stabilize: successor {} -> {}", successor, candidate);
                self.router.set_successor(0, candidate);
            }
        }

        self.notify().await
    }

    /// Tells the successor that we may be its predecessor.
    pub async fn notify(&self) -> Result<(), ChordError> {
        let Some(successor) = self.peer_successor() else {
            return Ok(());
        };
        let request = NotifyRequest {
            requesting_node: self.local_info(),
        };
        self.transport.notify(&successor.endpoint, request).await?;
        Ok(())
    }

    /// Pings the predecessor; a silent one is dropped and reported as
    /// [`RingEvent::PredecessorFailed`].
    pub async fn check(&self) -> Result<(), ChordError> {
        if !self.router.has_successor() {
            return Ok(());
        }
        let Some(predecessor) = self.router.predecessor_entry() else {
            return Ok(());
        };

        let request = CheckRequest {
            requesting_node: self.local_info(),
        };
        if let Err(e) = self.transport.check(&predecessor.endpoint, request).await {
            warn!("Predecessor {} failed check: {}", predecessor, e);
            // Only clear the slot if a notify has not replaced it meanwhile.
            if self.router.predecessor_entry().as_ref() == Some(&predecessor) {
                self.router.clear_predecessor();
            }
            self.events.publish(RingEvent::PredecessorFailed(predecessor));
        }
        Ok(())
    }

    /// Resolves the node that owns `id`.
    pub async fn successor(&self, id: NodeId) -> Result<Node, ChordError> {
        self.lookup(id, 0).await
    }

    /// Answers from the local successor when `id` falls in `(self, successor]`,
    /// otherwise asks the closest preceding node, which recurses further.
    pub(crate) async fn lookup(&self, id: NodeId, hops: u32) -> Result<Node, ChordError> {
        let local = self.local();
        let successor = self.router.successor(0);
        if id.between_right_incl(&local.id, &successor.id) {
            return Ok(successor);
        }

        let mut next = self.router.closest_preceding_node(&id);
        if next == *local {
            next = successor;
        }
        if hops >= self.max_hops {
            return Err(ChordError::HopLimitExceeded {
                id: id.to_decimal(),
                limit: self.max_hops,
            });
        }

        debug!("Lookup of {} forwarded to {} (hop {})", id, next, hops + 1);
        let request = SuccessorRequest {
            requesting_node: self.local_info(),
            id: id.to_decimal(),
            hops: hops + 1,
        };
        let response = self
            .transport
            .successor(&next.endpoint, request)
            .await
            .map_err(|e| ChordError::LookupFailed(format!("{} via {}: {}", id, next, e)))?;
        required_node(response.successor, "successor")
    }

    /// Announces a graceful departure to the successor.
    pub async fn leave(&self) -> Result<(), ChordError> {
        let Some(successor) = self.peer_successor() else {
            return Ok(());
        };
        let request = LeaveRequest {
            requesting_node: self.local_info(),
            predecessor: Some(NodeInfo::from(self.router.predecessor())),
        };
        self.transport.leave(&successor.endpoint, request).await?;
        info!("{} left the ring, handing over to {}", self.local(), successor);
        Ok(())
    }
}
