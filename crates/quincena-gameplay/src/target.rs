//! Target selection for enemies and cannons.

use glam::Vec2;
use quincena_common::EntityId;

use crate::actor::Actor;

/// Anything an enemy can lock onto.
pub trait Targetable {
    /// Entity ID of the candidate.
    fn target_id(&self) -> EntityId;

    /// Current world position.
    fn target_position(&self) -> Vec2;

    /// Whether the candidate can still be targeted.
    fn is_targetable(&self) -> bool;
}

impl Targetable for Actor {
    fn target_id(&self) -> EntityId {
        self.id
    }

    fn target_position(&self) -> Vec2 {
        self.position()
    }

    fn is_targetable(&self) -> bool {
        self.is_active()
    }
}

/// A chosen target and its distance from the searcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetLock {
    /// Target entity
    pub id: EntityId,
    /// Target position at selection time
    pub position: Vec2,
    /// Distance from the searcher
    pub distance: f32,
}

/// Picks the nearest active candidate.
///
/// Inactive candidates are skipped. On equal distances the first candidate
/// in iteration order wins, so callers control tie-breaking by ordering.
pub fn find_closest_target<'a, T, I>(origin: Vec2, candidates: I) -> Option<TargetLock>
where
    T: Targetable + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut best: Option<TargetLock> = None;
    for candidate in candidates {
        if !candidate.is_targetable() {
            continue;
        }
        let position = candidate.target_position();
        let distance = origin.distance(position);
        let closer = best.map_or(true, |lock| distance < lock.distance);
        if closer {
            best = Some(TargetLock {
                id: candidate.target_id(),
                position,
                distance,
            });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorKind;
    use quincena_common::SpriteHandle;

    fn actor(raw: u64, kind: ActorKind, x: f32) -> Actor {
        Actor::new(EntityId::from_raw(raw), kind, SpriteHandle::new(raw), Vec2::new(x, 0.0), 100)
    }

    #[test]
    fn test_empty_set() {
        let none: Vec<Actor> = Vec::new();
        assert!(find_closest_target(Vec2::ZERO, &none).is_none());
    }

    #[test]
    fn test_picks_nearest() {
        let actors = vec![
            actor(1, ActorKind::Player, 300.0),
            actor(2, ActorKind::Companion, -120.0),
        ];
        let lock = find_closest_target(Vec2::ZERO, &actors).expect("target");
        assert_eq!(lock.id, EntityId::from_raw(2));
        assert!((lock.distance - 120.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_skips_inactive() {
        let mut near = actor(1, ActorKind::Player, 10.0);
        near.deactivate();
        let actors = vec![near, actor(2, ActorKind::Companion, 500.0)];
        let lock = find_closest_target(Vec2::ZERO, &actors).expect("target");
        assert_eq!(lock.id, EntityId::from_raw(2));
    }

    #[test]
    fn test_all_inactive() {
        let mut a = actor(1, ActorKind::Player, 10.0);
        let mut b = actor(2, ActorKind::Companion, 20.0);
        a.deactivate();
        b.deactivate();
        assert!(find_closest_target(Vec2::ZERO, &[a, b]).is_none());
    }

    #[test]
    fn test_tie_goes_to_first() {
        let actors = vec![
            actor(1, ActorKind::Player, 100.0),
            actor(2, ActorKind::Companion, -100.0),
        ];
        let lock = find_closest_target(Vec2::ZERO, &actors).expect("target");
        assert_eq!(lock.id, EntityId::from_raw(1));
    }
}
