//! Collision shapes and collider descriptors

use crate::error::{PhysicsError, Result};
use crate::groups::CollisionGroups;
use crate::material::PhysicsMaterial;
use katamari_math::{Transform, Vec3};
use rapier3d::prelude as rapier;
use serde::{Deserialize, Serialize};

/// Opaque collider handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColliderHandle(pub(crate) rapier::ColliderHandle);

/// Shapes a collider can take. Envelopes arrive as `TriMesh` or, for
/// point clouds, `ConvexHull`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ColliderShape {
    Sphere { radius: f32 },
    Box { half_extents: [f32; 3] },
    /// Hull computed by rapier from a point set
    ConvexHull { points: Vec<[f32; 3]> },
    TriMesh {
        vertices: Vec<[f32; 3]>,
        indices: Vec<[u32; 3]>,
    },
}

impl Default for ColliderShape {
    fn default() -> Self {
        Self::Box {
            half_extents: [0.5, 0.5, 0.5],
        }
    }
}

impl ColliderShape {
    pub fn sphere(radius: f32) -> Self {
        Self::Sphere { radius }
    }

    /// Box from half extents
    pub fn cuboid(hx: f32, hy: f32, hz: f32) -> Self {
        Self::Box {
            half_extents: [hx, hy, hz],
        }
    }

    pub fn convex_hull(points: &[Vec3]) -> Self {
        Self::ConvexHull {
            points: points.iter().map(|p| p.to_array()).collect(),
        }
    }

    /// Triangle mesh from a flat index list (three per triangle)
    pub fn trimesh(vertices: &[Vec3], indices: &[u32]) -> Self {
        Self::TriMesh {
            vertices: vertices.iter().map(|v| v.to_array()).collect(),
            indices: indices
                .chunks_exact(3)
                .map(|tri| [tri[0], tri[1], tri[2]])
                .collect(),
        }
    }

    pub(crate) fn to_rapier(&self) -> Result<rapier::SharedShape> {
        let shape = match self {
            Self::Sphere { radius } => rapier::SharedShape::ball(*radius),
            Self::Box { half_extents } => {
                rapier::SharedShape::cuboid(half_extents[0], half_extents[1], half_extents[2])
            }
            Self::ConvexHull { points } => {
                if points.is_empty() {
                    return Err(PhysicsError::ShapeCreationFailed(
                        "convex hull needs at least one point".into(),
                    ));
                }
                hull_or_ball(points)
            }
            Self::TriMesh { vertices, indices } => {
                if vertices.is_empty() || indices.is_empty() {
                    return Err(PhysicsError::ShapeCreationFailed(
                        "triangle mesh needs vertices and indices".into(),
                    ));
                }
                if let Some(bad) = indices.iter().flatten().find(|&&i| i as usize >= vertices.len()) {
                    return Err(PhysicsError::ShapeCreationFailed(format!(
                        "index {} out of range for {} vertices",
                        bad,
                        vertices.len()
                    )));
                }
                let rapier_verts: Vec<_> = vertices
                    .iter()
                    .map(|v| rapier::Point::new(v[0], v[1], v[2]))
                    .collect();
                rapier::SharedShape::trimesh(rapier_verts, indices.clone())
            }
        };
        Ok(shape)
    }
}

/// Points closer together than this count as one
const HULL_EPSILON: f32 = 1e-5;

/// Convex hull of `points`, or a ball around the origin reaching the
/// farthest point when the set has no volume (coincident, collinear or flat)
fn hull_or_ball(points: &[[f32; 3]]) -> rapier::SharedShape {
    let radius = points
        .iter()
        .map(|p| Vec3::from_array(*p).length())
        .fold(0.0f32, f32::max);

    if let Some(hull) = try_hull(points) {
        return hull;
    }

    let radius = if radius.is_finite() { radius.max(0.05) } else { 0.05 };
    log::warn!(
        "Convex hull of {} points failed, using a ball of radius {}",
        points.len(),
        radius
    );
    rapier::SharedShape::ball(radius)
}

fn try_hull(points: &[[f32; 3]]) -> Option<rapier::SharedShape> {
    let pts: Vec<Vec3> = points.iter().map(|p| Vec3::from_array(*p)).collect();
    if !spans_volume(&pts) {
        return None;
    }

    let rapier_points: Vec<_> = pts.iter().map(|p| rapier::Point::new(p.x, p.y, p.z)).collect();
    let (vertices, indices) = rapier3d::parry::transformation::try_convex_hull(&rapier_points).ok()?;
    if indices.is_empty() {
        return None;
    }
    rapier::SharedShape::convex_mesh(vertices, &indices)
}

/// Point maximising `metric`, with the maximum
fn farthest(points: &[Vec3], metric: impl Fn(Vec3) -> f32) -> (Vec3, f32) {
    points.iter().fold((Vec3::ZERO, 0.0), |best, &p| {
        let d = metric(p);
        if d > best.1 {
            (p, d)
        } else {
            best
        }
    })
}

/// False for coincident, collinear and coplanar sets, and for non-finite input
fn spans_volume(points: &[Vec3]) -> bool {
    let Some(&a) = points.first() else {
        return false;
    };
    if !points.iter().all(|p| p.x.is_finite() && p.y.is_finite() && p.z.is_finite()) {
        return false;
    }

    let (b, along) = farthest(points, |p| (p - a).length());
    if along <= HULL_EPSILON {
        return false;
    }

    let axis = (b - a).normalize_or_zero();
    let (c, off_line) = farthest(points, |p| (p - a).cross(axis).length());
    if off_line <= HULL_EPSILON {
        return false;
    }

    let normal = (b - a).cross(c - a).normalize_or_zero();
    let (_, off_plane) = farthest(points, |p| (p - a).dot(normal).abs());
    off_plane > HULL_EPSILON
}

/// Everything needed to create a collider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColliderDesc {
    pub shape: ColliderShape,
    /// Pose relative to the parent body
    pub offset: Transform,
    /// Reports overlaps without a physical response
    pub is_sensor: bool,
    pub material: PhysicsMaterial,
    pub collision_groups: CollisionGroups,
    /// Emit started/stopped events
    pub collision_events: bool,
    /// Disabled colliders are skipped by contacts and queries
    pub enabled: bool,
    /// Opaque tag; the runtime stores scene node bits here
    pub user_data: u128,
}

impl Default for ColliderDesc {
    fn default() -> Self {
        Self {
            shape: ColliderShape::default(),
            offset: Transform::IDENTITY,
            is_sensor: false,
            material: PhysicsMaterial::default(),
            collision_groups: CollisionGroups::ALL,
            collision_events: false,
            enabled: true,
            user_data: 0,
        }
    }
}

impl ColliderDesc {
    pub fn new(shape: ColliderShape) -> Self {
        Self {
            shape,
            ..Default::default()
        }
    }

    pub fn with_material(mut self, material: PhysicsMaterial) -> Self {
        self.material = material;
        self
    }

    pub fn with_collision_groups(mut self, groups: CollisionGroups) -> Self {
        self.collision_groups = groups;
        self
    }

    pub fn with_collision_events(mut self, enabled: bool) -> Self {
        self.collision_events = enabled;
        self
    }

    pub(crate) fn to_rapier_builder(&self) -> Result<rapier::ColliderBuilder> {
        let mut builder = rapier::ColliderBuilder::new(self.shape.to_rapier()?)
            .position(crate::convert::isometry(&self.offset))
            .sensor(self.is_sensor)
            .friction(self.material.friction)
            .restitution(self.material.restitution)
            .density(self.material.density)
            .collision_groups(self.collision_groups.to_rapier())
            .enabled(self.enabled)
            .user_data(self.user_data);

        if self.collision_events {
            builder = builder.active_events(rapier::ActiveEvents::COLLISION_EVENTS);
        }

        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trimesh_from_flat_indices() {
        let verts = [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z];
        let shape = ColliderShape::trimesh(&verts, &[0, 1, 2, 0, 2, 3]);

        match shape {
            ColliderShape::TriMesh { vertices, indices } => {
                assert_eq!(vertices.len(), 4);
                assert_eq!(indices, vec![[0, 1, 2], [0, 2, 3]]);
            }
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn test_trimesh_rejects_out_of_range_index() {
        let shape = ColliderShape::trimesh(&[Vec3::ZERO, Vec3::X, Vec3::Y], &[0, 1, 7]);
        assert!(matches!(
            shape.to_rapier(),
            Err(PhysicsError::ShapeCreationFailed(_))
        ));
    }

    #[test]
    fn test_hull_of_coincident_points_is_a_ball() {
        let shape = ColliderShape::convex_hull(&[Vec3::ZERO; 16]).to_rapier().unwrap();
        let ball = shape.as_ball().unwrap();
        assert!((ball.radius - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_hull_of_flat_points_is_a_ball() {
        let pts = [Vec3::ZERO, Vec3::X * 2.0, Vec3::Y, Vec3::new(1.0, 1.0, 0.0)];
        let shape = ColliderShape::convex_hull(&pts).to_rapier().unwrap();
        let ball = shape.as_ball().unwrap();
        assert!((ball.radius - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_hull_of_tetrahedron() {
        let pts = [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z];
        let shape = ColliderShape::convex_hull(&pts).to_rapier().unwrap();
        assert!(shape.as_convex_polyhedron().is_some());
    }
}
