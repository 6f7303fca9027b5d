//! Gameplay event stream.
//!
//! The session publishes what happened during a tick; the host drains the
//! bus once per frame for logging, audio cues or replays.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use glam::Vec2;
use quincena_common::EntityId;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::actor::ActorKind;
use crate::archetype::EnemyType;
use crate::enemy::EnemyState;
use crate::game_state::LevelPayload;

/// Events emitted by a level session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A player-side actor lost health
    ActorDamaged {
        /// Actor entity
        actor: EntityId,
        /// Role
        kind: ActorKind,
        /// Damage taken
        damage: i32,
        /// Health after the hit
        remaining: i32,
    },
    /// A player-side actor reached zero health
    ActorDefeated {
        /// Actor entity
        actor: EntityId,
        /// Role
        kind: ActorKind,
    },
    /// An enemy changed behavior state
    EnemyStateChanged {
        /// Enemy entity
        enemy: EntityId,
        /// Previous state
        from: EnemyState,
        /// New state
        to: EnemyState,
    },
    /// An enemy was killed
    EnemyDefeated {
        /// Enemy entity
        enemy: EntityId,
        /// Species
        enemy_type: EnemyType,
    },
    /// The boss fell and took its skeletons with it
    BossDefeated {
        /// Boss entity
        boss: EntityId,
        /// Skeletons silenced alongside
        silenced: usize,
    },
    /// A cannon fired
    CannonFired {
        /// Cannon entity
        cannon: EntityId,
        /// Ball entity
        ball: EntityId,
    },
    /// A ball exploded
    CannonBallExploded {
        /// Ball entity
        ball: EntityId,
        /// Explosion center
        position: Vec2,
    },
    /// A coin was picked up
    CoinCollected {
        /// Coins collected so far
        collected: u32,
        /// Coins in the level
        total: u32,
    },
    /// All coins collected
    LevelComplete {
        /// Progress carried to the next level
        payload: LevelPayload,
    },
    /// Both heroes are down
    GameOver {
        /// Final progress
        payload: LevelPayload,
    },
}

/// Bounded event bus.
#[derive(Debug)]
pub struct EventBus {
    sender: Sender<GameEvent>,
    receiver: Receiver<GameEvent>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event. A full bus drops the event with a warning.
    pub fn publish(&self, event: GameEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {},
            Err(TrySendError::Full(event)) => {
                warn!("Event bus full ({}), dropping {:?}", self.capacity, event);
            },
            Err(TrySendError::Disconnected(_)) => {},
        }
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<GameEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a new sender handle for publishing events.
    #[must_use]
    pub fn sender(&self) -> Sender<GameEvent> {
        self.sender.clone()
    }
}
