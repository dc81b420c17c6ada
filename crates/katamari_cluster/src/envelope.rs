//! Adaptive collision envelope
//!
//! The envelope is a star-shaped shell around the cluster origin: one ray per
//! cell of a latitude/longitude grid, one vertex per ray. Vertices are stored
//! in the cluster's local frame so the shell rolls with the body.
//!
//! Regeneration is a blocking operation:
//!
//! 1. snapshot the root's linear velocity
//! 2. enable member and core colliders, disable the stale envelope
//! 3. cast R² rays against the cluster layer
//! 4. triangulate (or fall back to a point cloud), compute normals and bounds
//! 5. install the shape on the root
//! 6. restore every collider toggle and the velocity
//!
//! Step 2 is undone by [`SamplingScope`] even when an error interrupts the
//! sequence, so member colliders are never observed enabled outside of a
//! regeneration call.

use crate::cluster::Cluster;
use crate::config::{ClusterConfig, RayStrategy};
use crate::error::Result;
use crate::host::{ClusterHost, PhysicsHost};
use katamari_math::{consts::TAU, Aabb, Transform, Vec3};
use katamari_scene::NodeHandle;
use std::ops::{Deref, DerefMut};

/// Cross products shorter than this mark a triangle as degenerate
const DEGENERATE_AREA: f32 = 1e-6;

/// Extra ray length beyond the farthest sampled bounds
const REACH_MARGIN: f32 = 1.0;

/// One sampled direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    /// Latitude angle in radians
    pub lat: f32,
    /// Longitude angle in radians
    pub lon: f32,
    /// Unit direction in the cluster's local frame
    pub direction: Vec3,
    /// Hit point in the cluster's local frame
    pub hit: Option<Vec3>,
    /// Distance of the hit from the cluster origin
    pub distance: Option<f32>,
}

/// R×R grid of spherical directions, row-major in latitude
#[derive(Debug, Clone)]
pub struct SampleGrid {
    resolution: usize,
    cells: Vec<GridCell>,
}

impl SampleGrid {
    /// Build the directions for resolution R.
    ///
    /// Both angles step by 2π/R; direction = (cos lat·cos lon, cos lat·sin lon, sin lat).
    pub fn new(resolution: usize) -> Self {
        let step = TAU / resolution.max(1) as f32;
        let mut cells = Vec::with_capacity(resolution * resolution);

        for i in 0..resolution {
            let lat = step * i as f32;
            let (sin_lat, cos_lat) = lat.sin_cos();
            for j in 0..resolution {
                let lon = step * j as f32;
                let (sin_lon, cos_lon) = lon.sin_cos();
                cells.push(GridCell {
                    lat,
                    lon,
                    direction: Vec3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat).normalize_or_zero(),
                    hit: None,
                    distance: None,
                });
            }
        }

        Self { resolution, cells }
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Flat index of cell (i, j)
    pub fn index(&self, i: usize, j: usize) -> usize {
        i * self.resolution + j
    }

    pub fn cell(&self, i: usize, j: usize) -> &GridCell {
        &self.cells[self.index(i, j)]
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    /// Cells whose ray found nothing
    pub fn misses(&self) -> usize {
        self.cells.iter().filter(|c| c.hit.is_none()).count()
    }
}

/// Topology of an installed envelope
#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeShape {
    /// Lat/long triangle mesh, 6·R·(R−1) indices
    TriMesh { indices: Vec<u32> },
    /// Raw vertices; the host derives its own collider (convex hull)
    PointCloud,
}

/// The derived collision shell
#[derive(Debug, Clone)]
pub struct Envelope {
    /// R² vertices in the cluster's local frame; misses are `Vec3::ZERO`
    pub vertices: Vec<Vec3>,
    pub shape: EnvelopeShape,
    /// Per-vertex unit normals
    pub normals: Vec<Vec3>,
    /// Local-space bounding box of the vertices
    pub bounds: Aabb,
    /// Largest vertex distance from the origin
    pub max_radius: f32,
    pub resolution: usize,
    /// Directions that produced no hit
    pub misses: usize,
}

impl Envelope {
    /// Triangle indices, `None` for point clouds
    pub fn indices(&self) -> Option<&[u32]> {
        match &self.shape {
            EnvelopeShape::TriMesh { indices } => Some(indices),
            EnvelopeShape::PointCloud => None,
        }
    }

    pub fn is_point_cloud(&self) -> bool {
        matches!(self.shape, EnvelopeShape::PointCloud)
    }

    pub fn triangle_count(&self) -> usize {
        self.indices().map_or(0, |i| i.len() / 3)
    }
}

/// Summary of one regeneration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeReport {
    pub vertex_count: usize,
    pub index_count: usize,
    pub misses: usize,
    pub max_radius: f32,
    pub point_cloud: bool,
}

impl From<&Envelope> for EnvelopeReport {
    fn from(envelope: &Envelope) -> Self {
        Self {
            vertex_count: envelope.vertices.len(),
            index_count: envelope.indices().map_or(0, <[u32]>::len),
            misses: envelope.misses,
            max_radius: envelope.max_radius,
            point_cloud: envelope.is_point_cloud(),
        }
    }
}

/// Index list for an R×R grid.
///
/// Each cell (i, j) with i < R−1 yields triangles (i,j),(i,j+1),(i+1,j) and
/// (i+1,j+1),(i,j+1),(i+1,j). Longitude wraps modulo R, latitude does not.
pub fn triangulate(resolution: usize) -> Vec<u32> {
    let r = resolution;
    let mut indices = Vec::with_capacity(6 * r * r.saturating_sub(1));

    for i in 0..r.saturating_sub(1) {
        for j in 0..r {
            let next_j = (j + 1) % r;
            let a = (i * r + j) as u32;
            let b = (i * r + next_j) as u32;
            let c = ((i + 1) * r + j) as u32;
            let d = ((i + 1) * r + next_j) as u32;
            indices.extend_from_slice(&[a, b, c, d, b, c]);
        }
    }

    indices
}

fn face_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a)
}

fn is_degenerate(a: Vec3, b: Vec3, c: Vec3) -> bool {
    face_normal(a, b, c).length() <= DEGENERATE_AREA
}

/// True when every triangle of the index list has (near) zero area
pub fn all_degenerate(vertices: &[Vec3], indices: &[u32]) -> bool {
    indices.chunks_exact(3).all(|tri| {
        is_degenerate(
            vertices[tri[0] as usize],
            vertices[tri[1] as usize],
            vertices[tri[2] as usize],
        )
    })
}

/// Area-weighted vertex normals, oriented away from the origin.
///
/// Vertices touching only degenerate faces get their radial direction.
pub fn vertex_normals(vertices: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; vertices.len()];

    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (
            vertices[tri[0] as usize],
            vertices[tri[1] as usize],
            vertices[tri[2] as usize],
        );
        let mut n = face_normal(a, b, c);
        // Star-shaped around the origin: outward means away from it
        if n.dot(a + b + c) < 0.0 {
            n = -n;
        }
        for &i in tri {
            normals[i as usize] += n;
        }
    }

    normals
        .iter()
        .zip(vertices)
        .map(|(n, v)| {
            let n = n.normalize_or_zero();
            if n == Vec3::ZERO {
                v.normalize_or_zero()
            } else {
                n
            }
        })
        .collect()
}

/// Normals for a point cloud: the direction from the origin
pub fn radial_normals(vertices: &[Vec3]) -> Vec<Vec3> {
    vertices.iter().map(|v| v.normalize_or_zero()).collect()
}

/// How far from `origin` sampling rays need to go to see every collider in
/// `sampled`: the farthest corner of their bounds plus a margin, capped at
/// `max_distance`. Zero when nothing has bounds.
///
/// Inward rays starting thousands of units out lose f32 precision in the
/// host's shape tests.
pub fn sampling_reach<H: PhysicsHost + ?Sized>(
    host: &H,
    origin: Vec3,
    sampled: &[NodeHandle],
    max_distance: f32,
) -> f32 {
    let farthest = sampled
        .iter()
        .filter_map(|&node| host.collider_bounds(node))
        .filter(|bounds| !bounds.is_empty())
        .flat_map(|bounds| bounds.corners())
        .map(|corner| corner.distance(origin))
        .fold(None, |far: Option<f32>, d| Some(far.map_or(d, |f| f.max(d))));

    match farthest {
        Some(d) if d.is_finite() => (d + REACH_MARGIN).min(max_distance),
        Some(_) => max_distance,
        None => 0.0,
    }
}

/// Cast one ray per grid cell against the cluster layer.
///
/// `origin` is the cluster root's world transform; grid directions are
/// rotated by it so that vertex (i, j) always sits along the same local axis.
/// Rays are `reach` long (see [`sampling_reach`]); a zero reach leaves
/// every cell empty.
pub fn sample_boundary<H: PhysicsHost + ?Sized>(
    host: &mut H,
    origin: &Transform,
    config: &ClusterConfig,
    reach: f32,
) -> SampleGrid {
    let mut grid = SampleGrid::new(config.grid_resolution);
    let mask = config.cluster_layer.as_mask();

    for cell in grid.cells.iter_mut() {
        let direction = origin.transform_direction(cell.direction);

        let hit = if reach > 0.0 {
            match config.ray_strategy {
                RayStrategy::InwardNearest => {
                    let start = origin.position + direction * reach;
                    host.cast_ray(start, -direction, reach, mask).into_iter().next()
                }
                RayStrategy::OutwardFarthest => host
                    .cast_ray(origin.position, direction, reach, mask)
                    .into_iter()
                    .last(),
            }
        } else {
            None
        };

        if let Some(hit) = hit {
            let local = origin.inverse_transform_point(hit.point);
            cell.hit = Some(local);
            cell.distance = Some(local.length());
        }

        log::debug!(
            "Vert: lat={:.3} lon={:.3} dir={:?} vertex={:?}",
            cell.lat,
            cell.lon,
            cell.direction,
            cell.hit.unwrap_or(Vec3::ZERO)
        );
    }

    grid
}

/// Assemble a sampled grid into an envelope
pub fn build_envelope(grid: &SampleGrid, triangulate_mesh: bool) -> Envelope {
    let vertices: Vec<Vec3> = grid
        .cells()
        .iter()
        .map(|c| c.hit.unwrap_or(Vec3::ZERO))
        .collect();

    let shape = if triangulate_mesh {
        let indices = triangulate(grid.resolution());
        if all_degenerate(&vertices, &indices) {
            log::warn!(
                "All {} envelope triangles are degenerate, falling back to a point cloud",
                indices.len() / 3
            );
            EnvelopeShape::PointCloud
        } else {
            EnvelopeShape::TriMesh { indices }
        }
    } else {
        EnvelopeShape::PointCloud
    };

    let normals = match &shape {
        EnvelopeShape::TriMesh { indices } => vertex_normals(&vertices, indices),
        EnvelopeShape::PointCloud => radial_normals(&vertices),
    };

    let max_radius = vertices.iter().map(|v| v.length()).fold(0.0f32, f32::max);

    Envelope {
        bounds: Aabb::from_points(&vertices),
        normals,
        max_radius,
        resolution: grid.resolution(),
        misses: grid.misses(),
        shape,
        vertices,
    }
}

/// Collider toggles that are undone when the scope ends.
///
/// Derefs to the host so sampling can run through it.
pub struct SamplingScope<'a, H: PhysicsHost + ?Sized> {
    host: &'a mut H,
    restore: Vec<(NodeHandle, bool)>,
}

impl<'a, H: PhysicsHost + ?Sized> SamplingScope<'a, H> {
    pub fn new(host: &'a mut H) -> Self {
        Self {
            host,
            restore: Vec::new(),
        }
    }

    /// Set a collider's state, remembering the previous one
    pub fn set_enabled(&mut self, node: NodeHandle, enabled: bool) -> Result<()> {
        let previous = self.host.collider_enabled(node)?;
        if previous != enabled {
            self.host.set_collider_enabled(node, enabled)?;
            self.restore.push((node, previous));
        }
        Ok(())
    }

    /// Number of toggles waiting to be undone
    pub fn pending(&self) -> usize {
        self.restore.len()
    }

    /// Undo every toggle, reporting the first failure
    pub fn close(mut self) -> Result<()> {
        let mut first_error = None;
        while let Some((node, enabled)) = self.restore.pop() {
            if let Err(e) = self.host.set_collider_enabled(node, enabled) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl<H: PhysicsHost + ?Sized> Deref for SamplingScope<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.host
    }
}

impl<H: PhysicsHost + ?Sized> DerefMut for SamplingScope<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.host
    }
}

impl<H: PhysicsHost + ?Sized> Drop for SamplingScope<'_, H> {
    fn drop(&mut self) {
        while let Some((node, enabled)) = self.restore.pop() {
            if let Err(e) = self.host.set_collider_enabled(node, enabled) {
                log::warn!("Failed to restore collider on {:?}: {}", node, e);
            }
        }
    }
}

/// Rebuilds a cluster's envelope from its current member set
pub struct EnvelopeGenerator;

impl EnvelopeGenerator {
    /// Run one full regeneration and install the result on the cluster root.
    ///
    /// The root's linear velocity is put back even when sampling or
    /// installation fails part way.
    pub fn regenerate<H: ClusterHost + ?Sized>(cluster: &mut Cluster, host: &mut H) -> Result<EnvelopeReport> {
        let root = cluster.root();
        let velocity = host.linear_velocity(root)?;
        let origin = host.world_transform_of(root)?;
        let sampled = cluster.sampled_colliders(&*host)?;

        let installed = Self::sample_and_install(cluster.config(), root, &origin, &sampled, host);
        let restored = host.set_linear_velocity(root, velocity);
        let envelope = installed?;
        restored?;

        let report = EnvelopeReport::from(&envelope);
        log::info!(
            "Regenerated envelope from {} collider(s): {} vertices, {} indices, {} misses, max radius {:.3}{}",
            sampled.len(),
            report.vertex_count,
            report.index_count,
            report.misses,
            report.max_radius,
            if report.point_cloud { " (point cloud)" } else { "" }
        );

        cluster.set_envelope(envelope);
        Ok(report)
    }

    fn sample_and_install<H: ClusterHost + ?Sized>(
        config: &ClusterConfig,
        root: NodeHandle,
        origin: &Transform,
        sampled: &[NodeHandle],
        host: &mut H,
    ) -> Result<Envelope> {
        let reach = sampling_reach(&*host, origin.position, sampled, config.ray_max_distance);

        let mut scope = SamplingScope::new(host);
        for &node in sampled {
            scope.set_enabled(node, true)?;
        }
        if scope.has_collider(root) {
            scope.set_enabled(root, false)?;
        }

        let grid = sample_boundary(&mut *scope, origin, config, reach);
        let envelope = build_envelope(&grid, config.triangulate);

        scope.install_envelope(root, &envelope, config.install_visual_mesh)?;
        scope.close()?;
        Ok(envelope)
    }
}
