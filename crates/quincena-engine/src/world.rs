//! Minimal arcade physics for the headless host.
//!
//! Bodies integrate velocity with gravity against a flat ground line and the
//! level's horizontal bounds. Overlaps are found with axis-aligned boxes and
//! reported back to the session as contacts.

use glam::Vec2;
use quincena_common::{EntityId, WorldBounds};
use quincena_gameplay::{ActorKind, Body, HelperPhase, LevelSession};

/// Half extents of an actor's box.
const ACTOR_HALF: Vec2 = Vec2::new(14.0, 20.0);
/// Half extents of an enemy's box.
const ENEMY_HALF: Vec2 = Vec2::new(18.0, 18.0);
/// Half extents of a cannon's box.
const CANNON_HALF: Vec2 = Vec2::new(24.0, 16.0);
/// Half extents of a cannonball's box.
const BALL_HALF: Vec2 = Vec2::new(8.0, 8.0);
/// Half extents of a pickup's box.
const PICKUP_HALF: Vec2 = Vec2::new(12.0, 12.0);

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec2,
    /// Maximum corner
    pub max: Vec2,
}

impl Aabb {
    /// Creates an AABB from center and half-extents.
    #[must_use]
    pub fn from_center(center: Vec2, half: Vec2) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Checks if this AABB overlaps with another.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }
}

/// An overlap to report to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contact {
    /// Actor touches an enemy
    ActorEnemy {
        /// Actor
        actor: EntityId,
        /// Enemy
        enemy: EntityId,
    },
    /// Actor touches a cannon body
    ActorCannon {
        /// Actor
        actor: EntityId,
        /// Cannon
        cannon: EntityId,
    },
    /// Actor touches a cannonball
    ActorBall {
        /// Actor
        actor: EntityId,
        /// Ball
        ball: EntityId,
    },
    /// Cannonball reached the ground
    BallGround {
        /// Ball
        ball: EntityId,
    },
    /// Actor walks over a pickup
    Pickup {
        /// Actor
        actor: EntityId,
        /// Pickup
        pickup: EntityId,
    },
}

/// Arcade integrator for one level.
#[derive(Debug, Clone)]
pub struct ArcadeWorld {
    /// Gravity (px/s²)
    pub gravity: f32,
    /// Ground line (px)
    pub ground_y: f32,
    /// Horizontal bounds
    pub bounds: WorldBounds,
}

impl ArcadeWorld {
    /// Creates a world.
    #[must_use]
    pub const fn new(gravity: f32, ground_y: f32, bounds: WorldBounds) -> Self {
        Self {
            gravity,
            ground_y,
            bounds,
        }
    }

    /// Integrates one body.
    pub fn integrate(&self, body: &mut Body, dt: f32) {
        if body.gravity {
            body.velocity.y += self.gravity * dt;
        }
        body.position += body.velocity * dt;

        body.grounded = false;
        if body.position.y >= self.ground_y {
            body.position.y = self.ground_y;
            if body.velocity.y > 0.0 {
                body.velocity.y = 0.0;
            }
            body.grounded = body.gravity;
        } else if !body.gravity && body.position.y < self.bounds.min.y {
            body.position.y = self.bounds.min.y;
            body.velocity.y = body.velocity.y.max(0.0);
        }

        body.blocked_left = body.position.x <= self.bounds.min.x;
        body.blocked_right = body.position.x >= self.bounds.max.x;
        if body.blocked_left || body.blocked_right {
            body.position.x = body.position.x.clamp(self.bounds.min.x, self.bounds.max.x);
            body.velocity.x = 0.0;
        }
    }

    /// Integrates every live body in the session. Balls fly free of the
    /// bounds so the session can retire them once they leave.
    pub fn step(&self, session: &mut LevelSession, dt: f32) {
        // Helper waits off-screen until it enters
        let helper_parked = session.helper_phase() == HelperPhase::Waiting;
        for actor in session.actors_mut().iter_mut().filter(|a| a.is_active()) {
            if actor.kind == ActorKind::Helper && helper_parked {
                continue;
            }
            self.integrate(&mut actor.body, dt);
        }
        for enemy in session.enemies_mut().iter_mut().filter(|e| e.is_active()) {
            self.integrate(&mut enemy.body, dt);
        }
        for ball in session.balls_mut().iter_mut().filter(|b| b.is_active()) {
            ball.velocity.y += self.gravity * dt;
            ball.position += ball.velocity * dt;
        }
    }

    /// Collects overlaps between live bodies.
    #[must_use]
    pub fn contacts(&self, session: &LevelSession) -> Vec<Contact> {
        let mut contacts = Vec::new();

        for ball in session.balls().iter().filter(|b| b.is_active()) {
            if ball.position.y >= self.ground_y {
                contacts.push(Contact::BallGround { ball: ball.id });
            }
        }

        for actor in session.actors().iter().filter(|a| a.is_active()) {
            let hitbox = Aabb::from_center(actor.position(), ACTOR_HALF);

            for enemy in session.enemies().iter().filter(|e| e.is_active()) {
                if hitbox.overlaps(&Aabb::from_center(enemy.position(), ENEMY_HALF)) {
                    contacts.push(Contact::ActorEnemy {
                        actor: actor.id,
                        enemy: enemy.id,
                    });
                }
            }
            for cannon in session.cannons().iter().filter(|c| !c.is_destroyed) {
                if hitbox.overlaps(&Aabb::from_center(cannon.position, CANNON_HALF)) {
                    contacts.push(Contact::ActorCannon {
                        actor: actor.id,
                        cannon: cannon.id,
                    });
                }
            }
            for ball in session.balls().iter().filter(|b| b.is_active()) {
                if hitbox.overlaps(&Aabb::from_center(ball.position, BALL_HALF)) {
                    contacts.push(Contact::ActorBall {
                        actor: actor.id,
                        ball: ball.id,
                    });
                }
            }
            if actor.kind.counts_for_game_over() {
                for pickup in session.pickups().iter().filter(|p| p.active) {
                    if hitbox.overlaps(&Aabb::from_center(pickup.position, PICKUP_HALF)) {
                        contacts.push(Contact::Pickup {
                            actor: actor.id,
                            pickup: pickup.id,
                        });
                    }
                }
            }
        }
        contacts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quincena_gameplay::{ArchetypeTable, LevelId, LevelSpec, MockHost, SessionTuning};

    fn world() -> ArcadeWorld {
        let bounds = WorldBounds::from_size(1000.0, 600.0).expect("bounds");
        ArcadeWorld::new(800.0, 450.0, bounds)
    }

    #[test]
    fn test_body_lands_on_ground() {
        let world = world();
        let mut body = Body::at(Vec2::new(100.0, 300.0));
        for _ in 0..120 {
            world.integrate(&mut body, 1.0 / 60.0);
        }
        assert!(body.grounded);
        assert_eq!(body.position.y, 450.0);
        assert_eq!(body.velocity.y, 0.0);
    }

    #[test]
    fn test_bounds_block_horizontal_motion() {
        let world = world();
        let mut body = Body::at(Vec2::new(5.0, 450.0));
        body.velocity.x = -600.0;
        world.integrate(&mut body, 0.1);
        assert!(body.blocked_left);
        assert!(body.blocked_horizontally());
        assert_eq!(body.position.x, 0.0);
        assert_eq!(body.velocity.x, 0.0);
    }

    #[test]
    fn test_floating_body_ignores_gravity() {
        let world = world();
        let mut body = Body::floating(Vec2::new(300.0, 200.0));
        world.integrate(&mut body, 0.5);
        assert_eq!(body.position, Vec2::new(300.0, 200.0));
        assert!(!body.grounded);
    }

    fn helper_session() -> LevelSession {
        let mut spec = LevelSpec::builtin(LevelId::One);
        spec.enemies.clear();
        spec.helper_start = Vec2::new(300.0, 300.0);
        LevelSession::new(spec, ArchetypeTable::builtin(), SessionTuning::default(), None, 1).expect("session")
    }

    fn helper_y(session: &LevelSession) -> f32 {
        session.actor(ActorKind::Helper).expect("helper").position().y
    }

    #[test]
    fn test_waiting_helper_is_parked() {
        let world = world();
        let mut session = helper_session();
        session.start(0, &mut MockHost::new()).expect("start");
        world.step(&mut session, 0.1);
        assert_eq!(helper_y(&session), 300.0);
    }

    #[test]
    fn test_idle_helper_still_falls() {
        let world = world();
        let mut session = helper_session();
        let mut host = MockHost::new();
        session.start(0, &mut host).expect("start");
        assert!(session.begin_helper_entry(0));
        let delay = session.tuning().helper_entry_delay_ms;
        session.tick(delay, 0.016, &mut host).expect("tick");
        assert_ne!(session.helper_phase(), HelperPhase::Waiting);

        // Standing still in mid-air: gravity applies regardless of velocity
        if let Some(helper) = session.actor_mut(ActorKind::Helper) {
            helper.body.halt();
        }
        world.step(&mut session, 0.1);
        assert!(helper_y(&session) > 300.0);
    }

    #[test]
    fn test_aabb_overlap() {
        let a = Aabb::from_center(Vec2::ZERO, Vec2::splat(10.0));
        let b = Aabb::from_center(Vec2::new(15.0, 0.0), Vec2::splat(10.0));
        let c = Aabb::from_center(Vec2::new(25.0, 0.0), Vec2::splat(5.0));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }
}
