use crate::chord::client::Client;
use crate::chord::events::{EventBus, RingEvent};
use crate::chord::routing::Router;
use crate::chord::types::{Node, NodeId, BITS};
use crate::error::ChordError;
use crate::network::messages::chord::{
    CheckRequest, CheckResponse, JoinRequest, JoinResponse, LeaveRequest, LeaveResponse,
    NodeInfo, NotifyRequest, NotifyResponse, StabilizeRequest, StabilizeResponse,
    SuccessorRequest, SuccessorResponse,
};
use crate::network::messages::conversions::required_node;
use chrono::Utc;
use log::{debug, info};
use std::sync::Arc;

/// Inbound half of the protocol: answers requests from other nodes against
/// the local router, forwarding through the local [`Client`] when the answer
/// lives elsewhere on the ring.
pub struct Service {
    router: Arc<Router>,
    client: Arc<Client>,
    events: EventBus,
}

impl Service {
    pub fn new(router: Arc<Router>, client: Arc<Client>, events: EventBus) -> Self {
        Self {
            router,
            client,
            events,
        }
    }

    pub fn local(&self) -> &Node {
        self.router.local()
    }

    pub async fn join(&self, request: JoinRequest) -> Result<JoinResponse, ChordError> {
        let source = required_node(request.requesting_node.clone(), "requesting_node")?;
        let local = self.local().clone();
        if source.id == local.id {
            return Err(ChordError::InvalidRequest(format!(
                "identifier {} is already taken by {}",
                source.id, local
            )));
        }

        let predecessor = self.router.predecessor_entry();
        let successor = self.router.successor_entry(0).filter(|s| *s != local);

        match (&predecessor, &successor) {
            (None, None) => {
                // First peer of a lone node: the two nodes close the ring at once.
                info!("{} joined lone node {}", source, local);
                self.router.set_successor(0, source.clone());
                self.adopt_predecessor(source);
                return Ok(JoinResponse {
                    successor: Some(NodeInfo::from(&local)),
                    predecessor: Some(NodeInfo::from(&local)),
                });
            }
            (Some(p), Some(s)) if !source.id.between(&p.id, &s.id) => {
                debug!("Join of {} does not belong at {}, forwarding", source, local);
                return self.client.forward_join(s, request).await;
            }
            _ => {}
        }

        let successor_or_self = successor.clone().unwrap_or_else(|| local.clone());
        let predecessor_or_self = predecessor.clone().unwrap_or_else(|| local.clone());

        if source.id.between(&local.id, &successor_or_self.id) {
            info!("{} becomes successor of {}", source, local);
            self.router.set_successor(0, source);
            Ok(JoinResponse {
                successor: Some(NodeInfo::from(&successor_or_self)),
                predecessor: Some(NodeInfo::from(&local)),
            })
        } else if source.id.between(&predecessor_or_self.id, &local.id) {
            info!("{} becomes predecessor of {}", source, local);
            self.adopt_predecessor(source);
            Ok(JoinResponse {
                successor: Some(NodeInfo::from(&local)),
                predecessor: Some(NodeInfo::from(&predecessor_or_self)),
            })
        } else {
            self.client.forward_join(&successor_or_self, request).await
        }
    }

    pub async fn successor(
        &self,
        request: SuccessorRequest,
    ) -> Result<SuccessorResponse, ChordError> {
        let id: NodeId = request.id.parse()?;
        let local = self.local();
        let owner = if id == local.id {
            local.clone()
        } else {
            let successor = self.router.successor(0);
            if id.between_right_incl(&local.id, &successor.id) {
                successor
            } else {
                self.client.lookup(id, request.hops).await?
            }
        };
        Ok(SuccessorResponse {
            successor: Some(NodeInfo::from(owner)),
        })
    }

    pub async fn stabilize(
        &self,
        _request: StabilizeRequest,
    ) -> Result<StabilizeResponse, ChordError> {
        Ok(StabilizeResponse {
            predecessor: self.router.predecessor_entry().map(NodeInfo::from),
        })
    }

    /// Adopts the sender as predecessor when none is known or it is closer
    /// than the current one. A node without a successor also takes the
    /// sender as successor, which re-attaches a node that lost its ring.
    pub async fn notify(&self, request: NotifyRequest) -> Result<NotifyResponse, ChordError> {
        let source = required_node(request.requesting_node, "requesting_node")?;
        let local = self.local();
        if source.id == local.id {
            return Ok(NotifyResponse {});
        }

        let adopt = match self.router.predecessor_entry() {
            None => true,
            Some(predecessor) => source.id.between(&predecessor.id, &local.id),
        };
        if adopt {
            self.adopt_predecessor(source.clone());
        }
        if !self.router.has_successor() {
            info!("{} has no successor, adopting notifier {}", local, source);
            self.router.set_successor(0, source);
        }
        Ok(NotifyResponse {})
    }

    pub async fn check(&self, _request: CheckRequest) -> Result<CheckResponse, ChordError> {
        Ok(CheckResponse {
            node: Some(NodeInfo::from(self.local())),
            timestamp: Utc::now().timestamp_millis(),
        })
    }

    pub async fn leave(&self, request: LeaveRequest) -> Result<LeaveResponse, ChordError> {
        let node = required_node(request.requesting_node, "requesting_node")?;
        let predecessor = required_node(request.predecessor, "predecessor")?;
        info!("{} is leaving, {} takes over its keys", node, predecessor);
        self.events.publish(RingEvent::Left { node, predecessor });
        Ok(LeaveResponse {})
    }

    /// Refreshes finger `index` with the owner of `self + 2^(index-1)`.
    ///
    /// Index 0, and any index while no successor is known, targets `self + 1`.
    pub async fn fix_fingers(&self, index: usize) -> Result<(), ChordError> {
        if index >= BITS {
            return Err(ChordError::InvalidRequest(format!(
                "finger index {} out of range 0..{}",
                index, BITS
            )));
        }
        let local = self.local();
        let offset = if index == 0 || !self.router.has_successor() {
            NodeId::from(1u64)
        } else {
            NodeId::pow2(index - 1)
        };
        let target = local.id + offset;

        let owner = self.client.successor(target).await?;
        if owner == *local {
            self.router.clear_successor(index);
        } else {
            self.router.set_successor(index, owner);
        }
        Ok(())
    }

    fn adopt_predecessor(&self, new: Node) {
        let old = self.router.set_predecessor(new.clone());
        if old.as_ref() != Some(&new) {
            self.events
                .publish(RingEvent::PredecessorChanged { old, new });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::memory::MemoryNetwork;

    struct TestNode {
        router: Arc<Router>,
        service: Arc<Service>,
        events: EventBus,
    }

    fn node(id: u64) -> Node {
        Node::new(id, format!("node-{}", id))
    }

    fn spawn(network: &Arc<MemoryNetwork>, id: u64) -> TestNode {
        let events = EventBus::new();
        let router = Arc::new(Router::new(node(id)));
        let client = Arc::new(Client::new(router.clone(), network.clone(), events.clone(), 16));
        let service = Arc::new(Service::new(router.clone(), client, events.clone()));
        network.register(&service);
        TestNode {
            router,
            service,
            events,
        }
    }

    fn info(id: u64) -> Option<NodeInfo> {
        Some(NodeInfo::from(node(id)))
    }

    #[tokio::test]
    async fn test_first_join_closes_two_node_ring() {
        let network = MemoryNetwork::new();
        let a = spawn(&network, 0);

        let response = a
            .service
            .join(JoinRequest {
                requesting_node: info(5),
                hops: 0,
            })
            .await
            .unwrap();

        assert_eq!(response.successor, info(0));
        assert_eq!(response.predecessor, info(0));
        assert_eq!(a.router.successor(0), node(5));
        assert_eq!(a.router.predecessor(), node(5));
    }

    #[tokio::test]
    async fn test_join_between_self_and_successor_takes_successor_slot() {
        let network = MemoryNetwork::new();
        let a = spawn(&network, 0);
        a.router.set_successor(0, node(100));
        a.router.set_predecessor(node(100));

        let response = a
            .service
            .join(JoinRequest {
                requesting_node: info(50),
                hops: 0,
            })
            .await
            .unwrap();

        assert_eq!(response.successor, info(100));
        assert_eq!(response.predecessor, info(0));
        assert_eq!(a.router.successor(0), node(50));
        assert_eq!(a.router.predecessor(), node(100));
    }

    #[tokio::test]
    async fn test_join_between_predecessor_and_self_takes_predecessor_slot() {
        let network = MemoryNetwork::new();
        let a = spawn(&network, 100);
        a.router.set_successor(0, node(200));
        a.router.set_predecessor(node(10));
        let mut events = a.events.subscribe();

        let response = a
            .service
            .join(JoinRequest {
                requesting_node: info(60),
                hops: 0,
            })
            .await
            .unwrap();

        assert_eq!(response.successor, info(100));
        assert_eq!(response.predecessor, info(10));
        assert_eq!(a.router.predecessor(), node(60));
        assert_eq!(a.router.successor(0), node(200));
        assert_eq!(
            events.try_recv().unwrap(),
            RingEvent::PredecessorChanged {
                old: Some(node(10)),
                new: node(60)
            }
        );
    }

    #[tokio::test]
    async fn test_join_outside_neighbourhood_is_forwarded() {
        let network = MemoryNetwork::new();
        let a = spawn(&network, 0);
        let c = spawn(&network, 50);
        a.router.set_successor(0, node(50));
        a.router.set_predecessor(node(100));
        c.router.set_successor(0, node(100));
        c.router.set_predecessor(node(0));

        let response = a
            .service
            .join(JoinRequest {
                requesting_node: info(75),
                hops: 0,
            })
            .await
            .unwrap();

        assert_eq!(response.successor, info(100));
        assert_eq!(response.predecessor, info(50));
        assert_eq!(c.router.successor(0), node(75));
        assert_eq!(a.router.successor(0), node(50));
    }

    #[tokio::test]
    async fn test_join_with_taken_identifier_is_rejected() {
        let network = MemoryNetwork::new();
        let a = spawn(&network, 7);
        let result = a
            .service
            .join(JoinRequest {
                requesting_node: Some(NodeInfo::from(Node::new(7u64, "other:1"))),
                hops: 0,
            })
            .await;
        assert!(matches!(result, Err(ChordError::InvalidRequest(_))));
        assert!(!a.router.has_successor());
    }

    #[tokio::test]
    async fn test_successor_answers_locally_within_arc() {
        let network = MemoryNetwork::new();
        let a = spawn(&network, 0);
        a.router.set_successor(0, node(5));

        let lookup = |id: u64| SuccessorRequest {
            requesting_node: None,
            id: id.to_string(),
            hops: 0,
        };
        let owner = a.service.successor(lookup(5)).await.unwrap();
        assert_eq!(owner.successor, info(5));
        let owner = a.service.successor(lookup(0)).await.unwrap();
        assert_eq!(owner.successor, info(0));
    }

    #[tokio::test]
    async fn test_successor_rejects_malformed_id() {
        let network = MemoryNetwork::new();
        let a = spawn(&network, 0);
        let result = a
            .service
            .successor(SuccessorRequest {
                requesting_node: None,
                id: "not-a-number".into(),
                hops: 0,
            })
            .await;
        assert!(matches!(result, Err(ChordError::InvalidNodeId(_))));
    }

    #[tokio::test]
    async fn test_stabilize_reports_predecessor() {
        let network = MemoryNetwork::new();
        let a = spawn(&network, 0);
        let empty = a.service.stabilize(StabilizeRequest::default()).await.unwrap();
        assert_eq!(empty.predecessor, None);

        a.router.set_predecessor(node(9));
        let known = a.service.stabilize(StabilizeRequest::default()).await.unwrap();
        assert_eq!(known.predecessor, info(9));
    }

    #[tokio::test]
    async fn test_notify_adopts_closer_predecessor_only() {
        let network = MemoryNetwork::new();
        let a = spawn(&network, 100);
        a.router.set_successor(0, node(200));

        let mut events = a.events.subscribe();

        let notify = |id: u64| NotifyRequest {
            requesting_node: info(id),
        };
        a.service.notify(notify(10)).await.unwrap();
        assert_eq!(a.router.predecessor(), node(10));

        a.service.notify(notify(60)).await.unwrap();
        assert_eq!(a.router.predecessor(), node(60));

        a.service.notify(notify(20)).await.unwrap();
        a.service.notify(notify(60)).await.unwrap();
        assert_eq!(a.router.predecessor(), node(60));
        assert_eq!(a.router.successor(0), node(200));

        assert_eq!(
            events.try_recv().unwrap(),
            RingEvent::PredecessorChanged {
                old: None,
                new: node(10)
            }
        );
        assert_eq!(
            events.try_recv().unwrap(),
            RingEvent::PredecessorChanged {
                old: Some(node(10)),
                new: node(60)
            }
        );
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_notify_without_source_is_rejected() {
        let network = MemoryNetwork::new();
        let a = spawn(&network, 100);
        let result = a.service.notify(NotifyRequest::default()).await;
        assert!(matches!(result, Err(ChordError::InvalidRequest(_))));
        assert!(!a.router.has_predecessor());
    }

    #[tokio::test]
    async fn test_check_echoes_identity() {
        let network = MemoryNetwork::new();
        let a = spawn(&network, 3);
        let response = a.service.check(CheckRequest::default()).await.unwrap();
        assert_eq!(response.node, info(3));
        assert!(response.timestamp > 0);
    }

    #[tokio::test]
    async fn test_leave_publishes_event_without_touching_router() {
        let network = MemoryNetwork::new();
        let a = spawn(&network, 100);
        a.router.set_predecessor(node(50));
        let mut events = a.events.subscribe();

        a.service
            .leave(LeaveRequest {
                requesting_node: info(50),
                predecessor: info(10),
            })
            .await
            .unwrap();

        assert_eq!(
            events.try_recv().unwrap(),
            RingEvent::Left {
                node: node(50),
                predecessor: node(10)
            }
        );
        assert_eq!(a.router.predecessor(), node(50));
    }

    #[tokio::test]
    async fn test_leave_requires_source_and_predecessor() {
        let network = MemoryNetwork::new();
        let a = spawn(&network, 100);
        let mut events = a.events.subscribe();

        let missing_source = a
            .service
            .leave(LeaveRequest {
                requesting_node: None,
                predecessor: info(10),
            })
            .await;
        let missing_predecessor = a
            .service
            .leave(LeaveRequest {
                requesting_node: info(50),
                predecessor: None,
            })
            .await;

        assert!(matches!(missing_source, Err(ChordError::InvalidRequest(_))));
        assert!(matches!(missing_predecessor, Err(ChordError::InvalidRequest(_))));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_fix_fingers_compacts_onto_single_successor() {
        let network = MemoryNetwork::new();
        let a = spawn(&network, 0);
        a.router.set_successor(0, node(5));

        a.service.fix_fingers(2).await.unwrap();

        assert_eq!(a.router.successor_entry(1), Some(node(5)));
        assert_eq!(a.router.successor_entry(2), Some(node(5)));
        assert_eq!(a.router.successor_entry(3), None);
    }

    #[tokio::test]
    async fn test_fix_fingers_rejects_index_past_table() {
        let network = MemoryNetwork::new();
        let a = spawn(&network, 0);
        a.router.set_successor(0, node(5));

        for index in [BITS, BITS + 1] {
            let result = a.service.fix_fingers(index).await;
            assert!(matches!(result, Err(ChordError::InvalidRequest(_))));
        }
        assert_eq!(a.router.successor_entry(BITS - 1), None);
    }

    #[tokio::test]
    async fn test_fix_fingers_on_lone_node_clears_slot() {
        let network = MemoryNetwork::new();
        let a = spawn(&network, 0);
        a.service.fix_fingers(3).await.unwrap();
        assert!(a.router.snapshot().successors.iter().all(Option::is_none));
    }
}
