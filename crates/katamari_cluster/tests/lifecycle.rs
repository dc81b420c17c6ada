mod common;

use approx::assert_relative_eq;
use common::{MockHost, MockShape};
use katamari_cluster::cluster::MEMBERS_NODE;
use katamari_cluster::prelude::*;
use katamari_math::Vec3;
use katamari_scene::{CollisionLayer, NodeDesc, SceneGraph};

fn spawned() -> (MockHost, Cluster) {
    let mut host = MockHost::new();
    let (root, core) = host.spawn_cluster(Vec3::new(0.0, 5.0, 0.0), 10.0, 5.0);
    let mut cluster = Cluster::new(root, ClusterConfig::default().with_resolution(6))
        .unwrap()
        .with_core(core);
    cluster.on_spawn(&mut host).unwrap();
    (host, cluster)
}

fn add_floor(host: &mut MockHost) {
    let floor = host.spawn(
        NodeDesc::new("floor")
            .with_position(Vec3::new(0.0, -0.5, 0.0))
            .with_layer(CollisionLayer::ENVIRONMENT),
    );
    host.add_collider(floor, MockShape::Cuboid(Vec3::new(50.0, 0.5, 50.0)));
}

#[test]
fn test_spawn_sets_up_cluster() {
    let (host, cluster) = spawned();

    assert!(cluster.is_spawned());
    assert_relative_eq!(cluster.mass(), 10.0);
    assert_eq!(cluster.merge_count(), 0);

    let members = cluster.members_node().unwrap();
    assert_eq!(host.parent_of(members).unwrap(), Some(cluster.root()));
    assert_eq!(host.scene.get(members).unwrap().name, MEMBERS_NODE);

    let core = cluster.core().unwrap();
    assert!(!host.collider(core).enabled);
    assert_eq!(host.layer_of(core).unwrap(), CollisionLayer::PLAYER);
    assert_eq!(host.installs.len(), 1);
    assert_relative_eq!(cluster.max_radius(), 5.0, epsilon = 1e-2);
}

#[test]
fn test_spawn_twice_fails() {
    let (mut host, mut cluster) = spawned();
    assert!(matches!(cluster.on_spawn(&mut host), Err(ClusterError::AlreadySpawned)));
    assert_eq!(host.installs.len(), 1);
}

#[test]
fn test_spawn_without_body_fails() {
    let mut host = MockHost::new();
    let root = host.spawn(NodeDesc::new("ghost"));
    let mut cluster = Cluster::new(root, ClusterConfig::default()).unwrap();

    let result = cluster.on_spawn(&mut host);
    assert!(matches!(result, Err(ClusterError::MissingBody(node)) if node == root));
    assert!(!cluster.is_spawned());
}

#[test]
fn test_invalid_config_rejected() {
    let mut host = MockHost::new();
    let root = host.spawn(NodeDesc::new("player"));

    let result = Cluster::new(root, ClusterConfig::default().with_resolution(1));
    assert!(matches!(result, Err(ClusterError::InvalidConfig(_))));
}

#[test]
fn test_phases_require_spawn() {
    let mut host = MockHost::new();
    let (root, core) = host.spawn_cluster(Vec3::ZERO, 1.0, 1.0);
    let mut cluster = Cluster::new(root, ClusterConfig::default()).unwrap().with_core(core);

    let step = cluster.on_physics_step(&mut host, &MovementInput::default(), &[]);
    assert!(matches!(step, Err(ClusterError::NotSpawned)));

    let late = cluster.on_late_step(&host, LookInput::default());
    assert!(matches!(late, Err(ClusterError::NotSpawned)));
}

#[test]
fn test_step_processes_contacts() {
    let (mut host, mut cluster) = spawned();
    let a = host.spawn_prop("a", Vec3::new(6.0, 5.0, 0.0), 1.0, 1.0);
    let b = host.spawn_prop("b", Vec3::new(-6.0, 5.0, 0.0), 1.0, 1.0);
    let rock = host.spawn(NodeDesc::new("rock"));

    let report = cluster
        .on_physics_step(&mut host, &MovementInput::default(), &[a, rock, b, a])
        .unwrap();

    assert_eq!(report.merges.len(), 4);
    assert_eq!(report.absorbed(), 2);
    assert_eq!(report.merges[1], MergeOutcome::Ignored(IgnoreReason::NotMergeable));
    assert_eq!(report.merges[3], MergeOutcome::AlreadyAttached);
    assert_eq!(cluster.merge_count(), 2);
}

#[test]
fn test_late_step_follows_root() {
    let (host, mut cluster) = spawned();

    let pose = cluster.on_late_step(&host, LookInput::default()).unwrap();

    assert_eq!(pose.target, Vec3::new(0.0, 5.0, 0.0));
    assert_relative_eq!(pose.position.x, 2.0, epsilon = 1e-5);
    assert_relative_eq!(pose.position.y, 12.0, epsilon = 1e-5);
    assert_relative_eq!(pose.position.z, 0.0, epsilon = 1e-5);
    assert_relative_eq!(pose.forward.length(), 1.0, epsilon = 1e-5);
    assert_eq!(cluster.camera().pose(), &pose);
}

#[test]
fn test_rolling_uses_last_camera_pose() {
    let (mut host, mut cluster) = spawned();
    cluster.on_late_step(&host, LookInput::default()).unwrap();

    let input = MovementInput {
        vertical: 1.0,
        dt: 0.1,
        ..Default::default()
    };
    let report = cluster.on_physics_step(&mut host, &input, &[]).unwrap();

    // Camera sits on +x looking back at the target: right is -z, and
    // rolling toward -x spins around +z
    assert_relative_eq!(report.movement.torque.y, 0.0);
    assert_relative_eq!(report.movement.torque.z, 10.0, epsilon = 1e-4);
    assert_eq!(host.body(cluster.root()).torque, report.movement.torque);
}

#[test]
fn test_jump_needs_floor() {
    let (mut host, mut cluster) = spawned();
    let jump = MovementInput {
        jump: true,
        dt: 1.0 / 60.0,
        ..Default::default()
    };

    // Nothing below: the probe only sees the cluster layer, which it skips
    let report = cluster.on_physics_step(&mut host, &jump, &[]).unwrap();
    assert!(!report.movement.jumped);
    assert_eq!(host.body(cluster.root()).force, Vec3::ZERO);

    add_floor(&mut host);
    let report = cluster.on_physics_step(&mut host, &jump, &[]).unwrap();
    assert!(report.movement.jumped);
    assert_relative_eq!(host.body(cluster.root()).force.y, 50.0);
}

#[test]
fn test_jump_out_of_reach() {
    let mut host = MockHost::new();
    let (root, core) = host.spawn_cluster(Vec3::new(0.0, 20.0, 0.0), 10.0, 5.0);
    let mut cluster = Cluster::new(root, ClusterConfig::default().with_resolution(4))
        .unwrap()
        .with_core(core);
    cluster.on_spawn(&mut host).unwrap();
    add_floor(&mut host);

    let jump = MovementInput {
        jump: true,
        ..Default::default()
    };
    let report = cluster.on_physics_step(&mut host, &jump, &[]).unwrap();

    assert!(!report.movement.jumped);
}
