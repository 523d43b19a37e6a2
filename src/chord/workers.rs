use crate::chord::client::Client;
use crate::chord::events::{EventBus, RingEvent};
use crate::chord::routing::Router;
use crate::chord::service::Service;
use crate::chord::types::BITS;
use crate::error::ChordError;
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// The periodic ring-maintenance steps of one node.
///
/// Cheap to clone; every clone drives the same router. Each step logs its
/// failures and returns, leaving recovery to the next tick.
#[derive(Clone)]
pub struct Maintenance {
    router: Arc<Router>,
    client: Arc<Client>,
    service: Arc<Service>,
    events: EventBus,
    join_addr: Option<String>,
    fingers_per_tick: usize,
    next_finger: Arc<AtomicUsize>,
    announced: Arc<AtomicBool>,
}

impl Maintenance {
    pub fn new(
        router: Arc<Router>,
        client: Arc<Client>,
        service: Arc<Service>,
        events: EventBus,
        join_addr: Option<String>,
        fingers_per_tick: usize,
    ) -> Self {
        Self {
            router,
            client,
            service,
            events,
            join_addr,
            fingers_per_tick,
            next_finger: Arc::new(AtomicUsize::new(0)),
            announced: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Makes this node a ring of one.
    pub fn bootstrap(&self) {
        self.router.reset();
        self.announced.store(false, Ordering::SeqCst);
        info!("{} bootstrapped a new ring", self.router.local());
    }

    /// Joins through `addr` and runs one stabilize round so the node has a
    /// consistent view before it serves traffic.
    pub async fn join(&self, addr: &str) -> Result<(), ChordError> {
        self.client.join(addr).await?;
        self.client.stabilize().await?;
        self.announce_if_ready();
        Ok(())
    }

    /// One stabilize tick. Rejoins through the configured address when every
    /// successor has been lost.
    pub async fn stabilize(&self) {
        if !self.router.has_successor() {
            self.announced.store(false, Ordering::SeqCst);
            if let Some(addr) = &self.join_addr {
                info!("{} has no successor, rejoining through {}", self.router.local(), addr);
                if let Err(e) = self.client.join(addr).await {
                    warn!("Rejoin through {} failed: {}", addr, e);
                    return;
                }
            }
        }

        if let Err(e) = self.client.stabilize().await {
            warn!("Stabilize failed: {}", e);
        }
        self.announce_if_ready();
    }

    pub async fn check_predecessor(&self) {
        if let Err(e) = self.client.check().await {
            warn!("Predecessor check failed: {}", e);
        }
    }

    /// Refreshes the next `fingers_per_tick` fingers, cycling over slots
    /// 1..BITS so the whole table is revisited over successive ticks.
    pub async fn fix_fingers(&self) {
        for _ in 0..self.fingers_per_tick {
            let index = self.next_finger.fetch_add(1, Ordering::Relaxed) % (BITS - 1) + 1;
            debug!("Fixing finger {}", index);
            if let Err(e) = self.service.fix_fingers(index).await {
                error!("Failed to fix finger {}: {}", index, e);
                break;
            }
        }
    }

    fn announce_if_ready(&self) {
        let (Some(successor), Some(predecessor)) = (
            self.router.successor_entry(0),
            self.router.predecessor_entry(),
        ) else {
            return;
        };
        if successor == *self.router.local() || self.announced.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(
            "{} is part of the ring between {} and {}",
            self.router.local(),
            predecessor,
            successor
        );
        self.events
            .publish(RingEvent::Joined { successor, predecessor });
    }
}
