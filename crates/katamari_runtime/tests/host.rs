use approx::assert_relative_eq;
use katamari_cluster::prelude::*;
use katamari_math::Vec3;
use katamari_physics::{ColliderShape, PhysicsConfig};
use katamari_runtime::{Driver, GameWorld, PropConfig, RuntimeConfig};
use katamari_scene::{CollisionLayer, NodeDesc, NodeHandle, SceneGraph};

const DT: f32 = 1.0 / 60.0;

fn weightless() -> PhysicsConfig {
    PhysicsConfig::default().with_gravity(0.0, 0.0, 0.0)
}

fn spawn_player(world: &mut GameWorld, core_radius: f32) -> (NodeHandle, NodeHandle) {
    world
        .spawn_player(NodeDesc::new("player").with_layer(CollisionLayer::PLAYER), core_radius, 10.0)
        .unwrap()
}

fn player_with_core(world: &mut GameWorld, config: ClusterConfig, core_radius: f32) -> Cluster {
    let (root, core) = spawn_player(world, core_radius);
    let mut cluster = Cluster::new(root, config).unwrap().with_core(core);
    cluster.on_spawn(world).unwrap();
    cluster
}

fn player(world: &mut GameWorld, config: ClusterConfig) -> Cluster {
    player_with_core(world, config, 1.0)
}

fn ball(world: &mut GameWorld, position: Vec3) -> NodeHandle {
    world
        .spawn_dynamic(
            NodeDesc::new("ball")
                .with_position(position)
                .with_layer(CollisionLayer::PROPS)
                .with_tag("Mergeable"),
            ColliderShape::sphere(0.5),
            1.0,
        )
        .unwrap()
}

#[test]
fn test_spawn_installs_envelope_and_disables_core() {
    let mut world = GameWorld::new(weightless());
    let cluster = player(&mut world, ClusterConfig::default().with_resolution(8));
    let root = cluster.root();
    let core = cluster.core().unwrap();

    assert!(!world.collider_enabled(core).unwrap());
    assert!(world.collider_enabled(root).unwrap());

    let envelope = cluster.envelope().unwrap();
    assert_eq!(envelope.misses, 0);
    for v in &envelope.vertices {
        assert_relative_eq!(v.length(), 1.0, epsilon = 1e-2);
    }

    let mesh = world.visual_mesh(root).unwrap();
    assert_eq!(mesh.vertices.len(), 64);
    assert_eq!(mesh.indices.len(), 6 * 8 * 7);
}

#[test]
fn test_rays_see_envelope_not_core() {
    let mut world = GameWorld::new(weightless());
    let cluster = player(&mut world, ClusterConfig::default());
    let mask = CollisionLayer::PLAYER.as_mask();

    // Slightly off the +x vertex so the ray crosses a triangle interior
    let hits = world.cast_ray(Vec3::new(10.0, 0.1, 0.05), -Vec3::X, 20.0, mask);

    assert!(!hits.is_empty());
    assert!(hits.iter().all(|h| h.node == Some(cluster.root())));
    // The mesh sits on or just inside the sampled sphere
    assert!(hits[0].distance >= 9.0 - 1e-3 && hits[0].distance <= 9.2);

    let others = world.cast_ray(Vec3::new(10.0, 0.0, 0.0), -Vec3::X, 20.0, CollisionLayer::PROPS.as_mask());
    assert!(others.is_empty());
}

#[test]
fn test_default_config_envelope_hugs_core() {
    let mut world = GameWorld::new(weightless());
    let cluster = player(&mut world, ClusterConfig::default());

    let envelope = cluster.envelope().unwrap();
    assert_eq!(envelope.vertices.len(), 144);
    assert_eq!(envelope.misses, 0);
    assert!(!envelope.is_point_cloud());
    for v in &envelope.vertices {
        assert_relative_eq!(v.length(), 1.0, epsilon = 1e-3);
    }
    assert_relative_eq!(cluster.max_radius(), 1.0, epsilon = 1e-3);
}

#[test]
fn test_far_reaching_rays_stay_precise() {
    let mut world = GameWorld::new(weightless());
    let config = ClusterConfig::default()
        .with_resolution(3)
        .with_strategy(RayStrategy::InwardNearest)
        .with_ray_max_distance(10_000.0);
    let cluster = player_with_core(&mut world, config, 5.0);

    let envelope = cluster.envelope().unwrap();
    assert_eq!(envelope.vertices.len(), 9);
    assert_eq!(envelope.misses, 0);
    assert_eq!(envelope.indices().map(<[u32]>::len), Some(36));
    for v in &envelope.vertices {
        assert_relative_eq!(v.length(), 5.0, epsilon = 1e-2);
    }
}

#[test]
fn test_outward_strategy_finds_core_surface() {
    let mut world = GameWorld::new(weightless());
    let config = ClusterConfig::default()
        .with_resolution(6)
        .with_strategy(RayStrategy::OutwardFarthest);
    let cluster = player(&mut world, config);

    let envelope = cluster.envelope().unwrap();
    assert_eq!(envelope.misses, 0);
    assert!(!envelope.is_point_cloud());
    for v in &envelope.vertices {
        assert_relative_eq!(v.length(), 1.0, epsilon = 1e-3);
    }
}

#[test]
fn test_nothing_to_sample_installs_fallback_ball() {
    let mut world = GameWorld::new(weightless());
    let (root, _core) = spawn_player(&mut world, 1.0);
    // Without a registered core the cluster has no geometry to sample
    let mut cluster = Cluster::new(root, ClusterConfig::default().with_resolution(4)).unwrap();

    let report = cluster.on_spawn(&mut world).unwrap();

    assert_eq!(report.vertex_count, 16);
    assert_eq!(report.misses, 16);
    assert!(report.point_cloud);
    assert!(world.collider_enabled(root).unwrap());
    assert!(world.visual_mesh(root).unwrap().indices.is_empty());

    // The root now carries a small ball at its origin
    let hits = world.cast_ray(Vec3::new(10.0, 0.0, 0.0), -Vec3::X, 20.0, CollisionLayer::PLAYER.as_mask());
    let own = hits.iter().find(|h| h.node == Some(root)).unwrap();
    assert_relative_eq!(own.distance, 9.95, epsilon = 1e-3);
}

#[test]
fn test_regeneration_keeps_velocity() {
    let mut world = GameWorld::new(weightless());
    let mut cluster = player(&mut world, ClusterConfig::default().with_resolution(6));
    let root = cluster.root();

    let velocity = Vec3::new(1.5, 0.0, -2.0);
    world.set_linear_velocity(root, velocity).unwrap();
    EnvelopeGenerator::regenerate(&mut cluster, &mut world).unwrap();

    let after = world.linear_velocity(root).unwrap();
    assert_relative_eq!(after.x, velocity.x, epsilon = 1e-5);
    assert_relative_eq!(after.z, velocity.z, epsilon = 1e-5);
}

#[test]
fn test_contact_absorbs_in_stepped_world() {
    let mut world = GameWorld::new(weightless());
    let mut config = ClusterConfig::default().with_resolution(8);
    config.settle_factor = 1.0;
    let mut cluster = player(&mut world, config);
    let root = cluster.root();

    // Overlapping at spawn, so the first step reports the contact
    let prop = ball(&mut world, Vec3::new(1.4, 0.0, 0.0));

    let input = MovementInput {
        dt: DT,
        ..Default::default()
    };
    for _ in 0..30 {
        let contacts = world.step(DT, root).unwrap();
        cluster.on_physics_step(&mut world, &input, &contacts).unwrap();
        if cluster.merge_count() > 0 {
            break;
        }
    }

    assert_eq!(cluster.merge_count(), 1);
    assert!(cluster.is_attached(prop));
    assert!(world.is_kinematic(prop));
    assert!(!world.collider_enabled(prop).unwrap());
    assert_eq!(world.layer_of(prop).unwrap(), CollisionLayer::PLAYER);
    assert_eq!(world.parent_of(prop).unwrap(), cluster.members_node());

    assert_relative_eq!(cluster.mass(), 11.0, epsilon = 1e-4);
    assert_relative_eq!(world.body_mass(root).unwrap(), 11.0, epsilon = 1e-3);
    assert!(cluster.max_radius() > 1.5);

    // The member is carried with the root from now on
    let offset = world.world_transform_of(prop).unwrap().position
        - world.world_transform_of(root).unwrap().position;
    world.set_linear_velocity(root, Vec3::new(3.0, 0.0, 0.0)).unwrap();
    for _ in 0..10 {
        world.step(DT, root).unwrap();
    }
    let later = world.world_transform_of(prop).unwrap().position
        - world.world_transform_of(root).unwrap().position;
    assert_relative_eq!(later.length(), offset.length(), epsilon = 1e-3);
}

#[test]
fn test_driver_absorbs_adjacent_prop() {
    let mut config = RuntimeConfig::default();
    config.steps = 20;
    config.cluster.grid_resolution = 6;
    config.props = vec![
        PropConfig {
            name: "touching".to_string(),
            position: Vec3::new(-1.4, 1.0, 0.0),
            ..Default::default()
        },
        PropConfig {
            name: "untagged".to_string(),
            position: Vec3::new(1.4, 1.0, 0.0),
            mergeable: false,
            ..Default::default()
        },
    ];

    let mut driver = Driver::new(config).unwrap();
    let summary = driver.run().unwrap();

    assert_eq!(summary.steps, 20);
    assert_eq!(summary.merges, 1);
    assert_relative_eq!(summary.mass, 11.0, epsilon = 1e-4);
    assert!(driver.cluster().is_attached(driver.props()[0]));
    assert!(!driver.cluster().is_attached(driver.props()[1]));
}
