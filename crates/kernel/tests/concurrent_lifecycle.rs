use std::thread;
use std::time::Duration;

use glam::Vec3;
use smp_common::{AnchorId, Transform};
use smp_kernel::{
    Bone, Constraint, FrameEvent, ManualClock, PhysicsWorld, PoseBinding, Shape, ShutdownEvent,
    System, WorldConfig,
};
use smp_solver::{ConstraintDesc, ReferenceSolver, Solver};

fn strand(anchor: AnchorId, links: usize) -> (System, PoseBinding) {
    let mut bones = vec![Bone::kinematic("root", Transform::default())];
    for i in 1..=links {
        bones.push(Bone::dynamic(
            format!("link{i}"),
            0.5,
            Transform::from_position(Vec3::new(0.0, 0.0, -(i as f32))),
        ));
    }
    let binding = PoseBinding::for_bones(&bones);
    let mut system = System::skeletal(anchor, binding.clone())
        .with_shape(Shape::new("strand").with_tag("hair"))
        .with_shape(Shape::new("strand_low").with_disable_tag("hair_lod", 1));
    for pair in bones.windows(2) {
        system = system.with_constraint(Constraint::new(ConstraintDesc {
            body_a: pair[0].body,
            body_b: pair[1].body,
            rest_length: 1.0,
            stiffness: 1.0,
        }));
    }
    for bone in bones {
        system = system.with_bone(bone);
    }
    (system, binding)
}

#[test]
fn lifecycle_and_frames_interleave_safely() {
    let clock = ManualClock::new();
    let world = PhysicsWorld::with_clock(WorldConfig::default(), ReferenceSolver::new(), clock.clone())
        .unwrap()
        .into_handle();
    let shared = AnchorId::new();

    thread::scope(|scope| {
        let frames = {
            let world = world.clone();
            let clock = clock.clone();
            scope.spawn(move || {
                for _ in 0..200 {
                    clock.advance(Duration::from_micros(16_667));
                    world.on_frame_event(&FrameEvent::end());
                    let acc = world.accumulated_interval();
                    assert!(acc >= 0.0 && acc < world.config().fixed_time_step);
                }
            })
        };

        let churn = {
            let world = world.clone();
            scope.spawn(move || {
                for i in 0..50 {
                    let anchor = if i % 2 == 0 { shared } else { AnchorId::new() };
                    let (system, _) = strand(anchor, 3);
                    let id = world.add_system(system).unwrap();
                    if i % 3 == 0 {
                        assert!(world.remove_system(id));
                    }
                    if i % 10 == 9 {
                        world.reset_systems();
                    }
                }
            })
        };

        frames.join().unwrap();
        churn.join().unwrap();
    });

    let before = world.system_count();
    assert!(before > 0);
    let removed = world.remove_systems_by_anchor(shared);
    assert_eq!(world.system_count(), before - removed);

    world.on_shutdown(&ShutdownEvent);
    assert_eq!(world.system_count(), 0);
    world.with_solver(|s| {
        assert_eq!(s.rigid_bodies().count(), 0);
        assert_eq!(s.constraint_count(), 0);
        assert_eq!(s.collision_object_count(), 0);
    });
}

#[test]
fn host_poses_flow_through_to_outputs() {
    let clock = ManualClock::new();
    let world = PhysicsWorld::with_clock(WorldConfig::default(), ReferenceSolver::new(), clock.clone())
        .unwrap();
    let (system, host) = strand(AnchorId::new(), 2);
    world.add_system(system).unwrap();

    world.on_frame_event(&FrameEvent::end());
    let shift = Vec3::new(10.0, 0.0, 0.0);
    for i in 0..3 {
        host.set_pose(i, Transform::from_position(shift - Vec3::Z * i as f32));
    }
    let moved = Transform::from_position(shift);
    for _ in 0..60 {
        clock.advance(Duration::from_micros(16_667));
        world.on_frame_event(&FrameEvent::end());
    }

    let root = host.output(0).unwrap();
    assert!(root.position.abs_diff_eq(moved.position, 1e-3), "{}", root.position);
    let tip = host.output(2).unwrap();
    assert!(tip.position.z < 0.0);
    assert!((tip.position.distance(root.position) - 2.0).abs() < 0.2);
}

#[test]
fn competing_variants_leave_one_active_per_skeleton() {
    let clock = ManualClock::new();
    let world = PhysicsWorld::with_clock(WorldConfig::default(), ReferenceSolver::new(), clock.clone())
        .unwrap();
    let anchor = AnchorId::new();
    let (a, _) = strand(anchor, 1);
    let (b, _) = strand(anchor, 1);
    world.add_system(a);
    world.add_system(b);

    world.on_frame_event(&FrameEvent::end());
    clock.advance(Duration::from_millis(20));
    world.on_frame_event(&FrameEvent::end());

    world.with_systems(|systems| {
        let active_low: usize = systems
            .iter()
            .map(|s| s.meshes.iter().filter(|m| m.disable_tag.is_some() && !m.is_disabled()).count())
            .sum();
        assert_eq!(active_low, 1);
        assert!(!systems[0].meshes[1].is_disabled());
        assert!(systems[1].meshes[1].is_disabled());
    });
}
