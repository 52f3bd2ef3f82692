//! Detection result structures.
//!
//! These structures hold the results of physics queries (raycasts and
//! shape overlaps) used by the environment sensors.

use bevy::prelude::*;

/// Information about a raycast hit.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CollisionData {
    /// Distance from the ray origin to the hit point.
    pub distance: f32,
    /// Normal of the surface at the hit point.
    pub normal: Vec3,
    /// World position of the hit point.
    pub point: Vec3,
    /// Entity that was hit (if any).
    pub entity: Option<Entity>,
}

impl CollisionData {
    /// Create a collision result.
    pub fn new(distance: f32, normal: Vec3, point: Vec3, entity: Option<Entity>) -> Self {
        Self {
            distance,
            normal,
            point,
            entity,
        }
    }

    /// Angle in radians between `up` and the surface normal.
    pub fn angle_from(&self, up: Vec3) -> f32 {
        up.angle_between(self.normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collision_data_hit() {
        let hit = CollisionData::new(5.0, Vec3::Y, Vec3::new(10.0, 0.0, 2.0), None);

        assert_eq!(hit.distance, 5.0);
        assert_eq!(hit.normal, Vec3::Y);
        assert_eq!(hit.point, Vec3::new(10.0, 0.0, 2.0));
    }

    #[test]
    fn collision_data_with_entity() {
        let entity = Entity::from_raw(42);
        let hit = CollisionData::new(3.0, Vec3::X, Vec3::ZERO, Some(entity));

        assert_eq!(hit.entity, Some(entity));
    }

    #[test]
    fn flat_ground_has_zero_angle() {
        let hit = CollisionData::new(0.1, Vec3::Y, Vec3::ZERO, None);
        assert!(hit.angle_from(Vec3::Y).abs() < 1e-5);
    }

    #[test]
    fn tilted_normal_reports_its_angle() {
        let normal = Quat::from_rotation_x(30f32.to_radians()) * Vec3::Y;
        let hit = CollisionData::new(0.1, normal, Vec3::ZERO, None);
        assert!((hit.angle_from(Vec3::Y) - 30f32.to_radians()).abs() < 1e-4);
    }
}
