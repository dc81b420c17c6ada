//! Ray queries

use crate::collider::ColliderHandle;
use crate::convert;
use crate::groups::CollisionGroups;
use katamari_math::Vec3;
use rapier3d::prelude as rapier;

/// One ray intersection
#[derive(Debug, Clone, Copy)]
pub struct RaycastHit {
    pub collider: ColliderHandle,
    /// World space
    pub point: Vec3,
    pub normal: Vec3,
    /// Time of impact; equals distance for unit directions
    pub distance: f32,
    pub user_data: u128,
}

/// Ray query filtering
#[derive(Debug, Clone)]
pub struct RaycastOptions {
    pub max_distance: f32,
    pub exclude_sensors: bool,
    /// Rays starting inside a shape hit it at distance 0 when set;
    /// otherwise they report the boundary crossing on the way out
    pub solid: bool,
    /// Only colliders whose membership intersects this filter are hit
    pub filter: CollisionGroups,
}

impl Default for RaycastOptions {
    fn default() -> Self {
        Self {
            max_distance: f32::MAX,
            exclude_sensors: true,
            solid: true,
            filter: CollisionGroups::ALL,
        }
    }
}

impl RaycastOptions {
    pub fn with_max_distance(mut self, distance: f32) -> Self {
        self.max_distance = distance;
        self
    }

    /// Whether rays starting inside a shape stop at once (`true`) or report
    /// where they leave it (`false`)
    pub fn with_solid(mut self, solid: bool) -> Self {
        self.solid = solid;
        self
    }

    /// Only hit colliders whose membership intersects `mask`
    pub fn with_layer_mask(mut self, mask: u32) -> Self {
        self.filter = CollisionGroups::query(mask);
        self
    }

    fn to_rapier_filter(&self) -> rapier::QueryFilter<'static> {
        let mut filter = rapier::QueryFilter::new().groups(self.filter.to_rapier());

        if self.exclude_sensors {
            filter = filter.exclude_sensors();
        }

        filter
    }
}

/// Borrowed view used to run queries
pub struct PhysicsQuery<'a> {
    pub(crate) query_pipeline: &'a rapier::QueryPipeline,
    pub(crate) colliders: &'a rapier::ColliderSet,
    pub(crate) bodies: &'a rapier::RigidBodySet,
}

impl<'a> PhysicsQuery<'a> {
    /// Nearest hit
    pub fn raycast(&self, origin: Vec3, direction: Vec3, options: &RaycastOptions) -> Option<RaycastHit> {
        let ray = rapier::Ray::new(convert::point(origin), convert::vector(direction));

        self.query_pipeline
            .cast_ray_and_get_normal(
                self.bodies,
                self.colliders,
                &ray,
                options.max_distance,
                options.solid,
                options.to_rapier_filter(),
            )
            .map(|(handle, intersection)| {
                let point = ray.point_at(intersection.time_of_impact);
                RaycastHit {
                    collider: ColliderHandle(handle),
                    point: convert::from_point(&point),
                    normal: convert::from_vector(&intersection.normal),
                    distance: intersection.time_of_impact,
                    user_data: self.colliders.get(handle).map(|c| c.user_data).unwrap_or(0),
                }
            })
    }

    /// Every hit along the ray, nearest first
    pub fn raycast_all(&self, origin: Vec3, direction: Vec3, options: &RaycastOptions) -> Vec<RaycastHit> {
        let ray = rapier::Ray::new(convert::point(origin), convert::vector(direction));

        let mut hits = Vec::new();

        self.query_pipeline.intersections_with_ray(
            self.bodies,
            self.colliders,
            &ray,
            options.max_distance,
            options.solid,
            options.to_rapier_filter(),
            |handle, intersection| {
                let point = ray.point_at(intersection.time_of_impact);

                hits.push(RaycastHit {
                    collider: ColliderHandle(handle),
                    point: convert::from_point(&point),
                    normal: convert::from_vector(&intersection.normal),
                    distance: intersection.time_of_impact,
                    user_data: self.colliders.get(handle).map(|c| c.user_data).unwrap_or(0),
                });

                true
            },
        );

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}
