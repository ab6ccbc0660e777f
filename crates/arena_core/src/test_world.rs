//! In-crate world stub for unit tests.

use crate::math::{Fixed, Vec3Fixed};
use crate::world::{
    BodyId, DamageKind, DamageSink, EntityId, Hostile, ProjectileRequest, RayHit, SpatialQuery,
};

/// World that answers every ray cast with the same hit and records every
/// call made against it.
#[derive(Debug, Default)]
pub struct StubWorld {
    pub hostiles: Vec<Hostile>,
    pub ray_hit: Option<RayHit>,
    pub rays: std::cell::RefCell<Vec<(Vec3Fixed, Vec3Fixed)>>,
    pub damage: Vec<(EntityId, Fixed, DamageKind)>,
    pub impulses: Vec<(BodyId, Vec3Fixed, Vec3Fixed)>,
    pub projectiles: Vec<ProjectileRequest>,
    pub burning: Vec<(EntityId, u32)>,
    pub executed: Vec<EntityId>,
    pub chainsawed: Vec<EntityId>,
}

impl StubWorld {
    pub fn ray_count(&self) -> usize {
        self.rays.borrow().len()
    }
}

impl SpatialQuery for StubWorld {
    fn hostiles(&self) -> Vec<Hostile> {
        self.hostiles.clone()
    }

    fn ray_cast(&self, start: Vec3Fixed, end: Vec3Fixed) -> Option<RayHit> {
        self.rays.borrow_mut().push((start, end));
        self.ray_hit
    }

    fn apply_impulse(&mut self, body: BodyId, impulse: Vec3Fixed, point: Vec3Fixed) {
        self.impulses.push((body, impulse, point));
    }

    fn spawn_projectile(&mut self, request: ProjectileRequest) {
        self.projectiles.push(request);
    }
}

impl DamageSink for StubWorld {
    fn apply_damage(&mut self, target: EntityId, amount: Fixed, kind: DamageKind) {
        self.damage.push((target, amount, kind));
    }

    fn apply_burning(&mut self, target: EntityId, duration: u32) {
        self.burning.push((target, duration));
    }

    fn resolve_executed(&mut self, target: EntityId) {
        self.executed.push(target);
        if let Some(h) = self.hostiles.iter_mut().find(|h| h.id == target) {
            h.alive = false;
        }
    }

    fn resolve_chainsaw_kill(&mut self, target: EntityId) {
        self.chainsawed.push(target);
        if let Some(h) = self.hostiles.iter_mut().find(|h| h.id == target) {
            h.alive = false;
        }
    }
}
