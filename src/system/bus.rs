//! Latest-value store between collectors and the renderer.
//!
//! Each domain has its own [`Slot`], locked independently, so a slow publish in one
//! domain never delays another. Readers get an `Arc` to an immutable snapshot plus a
//! generation counter that changes on every accepted publish.

use std::sync::{Arc, RwLock};

use serde::Serialize;

use super::error::CollectError;
use super::snapshot::{
    CpuSnapshot, Domain, HostSnapshot, MemorySnapshot, NetworkSnapshot, ProcessSnapshot,
    Timestamped,
};

/// Collector state as seen by the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CollectorHealth {
    #[default]
    Starting,
    Healthy,
    /// Recent polls failed; the slot still holds the last good snapshot.
    Degraded {
        consecutive_failures: u32,
        last_error: String,
    },
    Stopped,
}

impl CollectorHealth {
    pub fn is_degraded(&self) -> bool {
        matches!(self, CollectorHealth::Degraded { .. })
    }
}

struct SlotState<T> {
    snapshot: Option<Arc<T>>,
    generation: u64,
    health: CollectorHealth,
}

pub struct Slot<T> {
    state: RwLock<SlotState<T>>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            state: RwLock::new(SlotState {
                snapshot: None,
                generation: 0,
                health: CollectorHealth::Starting,
            }),
        }
    }
}

impl<T: Timestamped> Slot<T> {
    /// Replaces the snapshot and bumps the generation. A snapshot older than the one
    /// already held is rejected and `false` is returned.
    pub fn publish(&self, snapshot: T) -> bool {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if let Some(current) = &state.snapshot
            && snapshot.timestamp() < current.timestamp()
        {
            return false;
        }
        state.snapshot = Some(Arc::new(snapshot));
        state.generation += 1;
        state.health = CollectorHealth::Healthy;
        true
    }
}

impl<T> Slot<T> {
    /// Latest snapshot and its generation; `None` until the first publish.
    pub fn read(&self) -> Option<(Arc<T>, u64)> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state
            .snapshot
            .as_ref()
            .map(|snapshot| (Arc::clone(snapshot), state.generation))
    }

    pub fn generation(&self) -> u64 {
        self.state.read().unwrap_or_else(|e| e.into_inner()).generation
    }

    pub fn health(&self) -> CollectorHealth {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .health
            .clone()
    }

    /// Keeps the current snapshot in place and marks the slot degraded.
    /// Returns the number of consecutive failures so far.
    pub fn record_failure(&self, error: &CollectError) -> u32 {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let failures = match &state.health {
            CollectorHealth::Degraded {
                consecutive_failures,
                ..
            } => consecutive_failures.saturating_add(1),
            _ => 1,
        };
        state.health = CollectorHealth::Degraded {
            consecutive_failures: failures,
            last_error: error.to_string(),
        };
        failures
    }

    pub fn mark_stopped(&self) {
        self.state.write().unwrap_or_else(|e| e.into_inner()).health = CollectorHealth::Stopped;
    }
}

/// A snapshot of any domain, as returned by [`SnapshotBus::read`].
#[derive(Debug, Clone)]
pub enum Snapshot {
    Cpu(Arc<CpuSnapshot>),
    Memory(Arc<MemorySnapshot>),
    Network(Arc<NetworkSnapshot>),
    Processes(Arc<ProcessSnapshot>),
    Host(Arc<HostSnapshot>),
}

/// Snapshot types that own a slot on the bus.
pub trait Publish: Timestamped + Send + Sync + Sized + 'static {
    const DOMAIN: Domain;

    fn slot(bus: &SnapshotBus) -> &Slot<Self>;
}

macro_rules! publish_slot {
    ($ty:ty, $domain:expr, $field:ident) => {
        impl Publish for $ty {
            const DOMAIN: Domain = $domain;

            fn slot(bus: &SnapshotBus) -> &Slot<Self> {
                &bus.$field
            }
        }
    };
}

publish_slot!(CpuSnapshot, Domain::Cpu, cpu);
publish_slot!(MemorySnapshot, Domain::Memory, memory);
publish_slot!(NetworkSnapshot, Domain::Network, network);
publish_slot!(ProcessSnapshot, Domain::Processes, processes);
publish_slot!(HostSnapshot, Domain::Host, host);

#[derive(Default)]
pub struct SnapshotBus {
    cpu: Slot<CpuSnapshot>,
    memory: Slot<MemorySnapshot>,
    network: Slot<NetworkSnapshot>,
    processes: Slot<ProcessSnapshot>,
    host: Slot<HostSnapshot>,
}

impl SnapshotBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish<T: Publish>(&self, snapshot: T) -> bool {
        T::slot(self).publish(snapshot)
    }

    pub fn slot<T: Publish>(&self) -> &Slot<T> {
        T::slot(self)
    }

    pub fn cpu(&self) -> Option<(Arc<CpuSnapshot>, u64)> {
        self.cpu.read()
    }

    pub fn memory(&self) -> Option<(Arc<MemorySnapshot>, u64)> {
        self.memory.read()
    }

    pub fn network(&self) -> Option<(Arc<NetworkSnapshot>, u64)> {
        self.network.read()
    }

    pub fn processes(&self) -> Option<(Arc<ProcessSnapshot>, u64)> {
        self.processes.read()
    }

    pub fn host(&self) -> Option<(Arc<HostSnapshot>, u64)> {
        self.host.read()
    }

    /// Non-blocking read of any domain.
    pub fn read(&self, domain: Domain) -> Option<(Snapshot, u64)> {
        match domain {
            Domain::Cpu => self.cpu().map(|(s, g)| (Snapshot::Cpu(s), g)),
            Domain::Memory => self.memory().map(|(s, g)| (Snapshot::Memory(s), g)),
            Domain::Network => self.network().map(|(s, g)| (Snapshot::Network(s), g)),
            Domain::Processes => self.processes().map(|(s, g)| (Snapshot::Processes(s), g)),
            Domain::Host => self.host().map(|(s, g)| (Snapshot::Host(s), g)),
        }
    }

    pub fn generation(&self, domain: Domain) -> u64 {
        match domain {
            Domain::Cpu => self.cpu.generation(),
            Domain::Memory => self.memory.generation(),
            Domain::Network => self.network.generation(),
            Domain::Processes => self.processes.generation(),
            Domain::Host => self.host.generation(),
        }
    }

    pub fn health(&self, domain: Domain) -> CollectorHealth {
        match domain {
            Domain::Cpu => self.cpu.health(),
            Domain::Memory => self.memory.health(),
            Domain::Network => self.network.health(),
            Domain::Processes => self.processes.health(),
            Domain::Host => self.host.health(),
        }
    }

    pub fn mark_stopped(&self, domain: Domain) {
        match domain {
            Domain::Cpu => self.cpu.mark_stopped(),
            Domain::Memory => self.memory.mark_stopped(),
            Domain::Network => self.network.mark_stopped(),
            Domain::Processes => self.processes.mark_stopped(),
            Domain::Host => self.host.mark_stopped(),
        }
    }
}
