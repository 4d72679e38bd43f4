//! Basic demonstration of the danmaku simulation core.
//!
//! Run with: RUST_LOG=debug cargo run --example basic_demo

use danmaku_sim::trajectory::{Aggregator, Bezier, Polar, Stationary};
use danmaku_sim::{Bullet, Collectible, CollectibleKind, OnCollision, PathChange, SimWorld};
use glam::Vec2;
use std::f32::consts::{FRAC_PI_2, TAU};

fn main() {
    env_logger::init();
    println!("=== Danmaku Sim - Demo ===\n");

    let mut sim = SimWorld::new();
    let player = sim.spawn_player(Vec2::new(300.0, 600.0), 3.0, 100.0);

    // Boss swoops in along a curve, then parks.
    let entry = Aggregator::from_points(vec![
        Bezier::new(
            vec![Vec2::ZERO, Vec2::new(150.0, 50.0), Vec2::new(200.0, 150.0)],
            2.0,
        )
        .into(),
        Stationary::new(Vec2::ZERO, 60.0).into(),
    ]);
    let boss = sim.spawn_enemy(Vec2::new(100.0, 0.0), 24.0, 500.0, entry);

    // A ring of enemy bullets from where the boss parks.
    let ring_center = Vec2::new(300.0, 150.0);
    for i in 0..32 {
        let angle = TAU * i as f32 / 32.0;
        sim.spawn_enemy_bullet(
            ring_center,
            4.0,
            Bullet {
                attack_id: 1,
                attack_pattern_id: 1,
                source: Some(boss),
                damage: 10.0,
                on_collision: OnCollision::DestroySelf,
            },
            Polar::linear(150.0, angle, 6.0),
        );
    }

    // One aimed homing shot.
    let homing = sim.homing(
        ring_center,
        FRAC_PI_2,
        player,
        danmaku_sim::TimeFunction::Constant(220.0),
        0.1,
    );
    sim.spawn_enemy_bullet(
        ring_center,
        5.0,
        Bullet {
            attack_id: 2,
            attack_pattern_id: 1,
            source: Some(boss),
            damage: 25.0,
            on_collision: OnCollision::DestroySelf,
        },
        homing,
    );

    // Player's piercing laser segment.
    sim.spawn_player_bullet(
        Vec2::new(300.0, 580.0),
        6.0,
        Bullet {
            damage: 2.0,
            on_collision: OnCollision::Pierce { reset_time: 0.1 },
            ..Default::default()
        },
        Polar::linear(500.0, -FRAC_PI_2, 2.0),
    );

    // A power item that drifts down, then stops.
    let item = sim.spawn_collectible(
        Vec2::new(320.0, 400.0),
        6.0,
        Collectible::new(CollectibleKind::Power, 1, 80.0),
        8.0,
        Polar::linear(60.0, FRAC_PI_2, 8.0),
    );
    sim.queue_path_change(
        item,
        PathChange::new(2.0, Stationary::new(Vec2::ZERO, 6.0).into()),
    );

    println!("Running simulation for 4 seconds at 60 Hz...\n");
    for tick in 0..240 {
        sim.step(1.0 / 60.0);

        for hit in sim.drain_damage_events() {
            println!(
                "  [t={:.2}] {:?} hit {:?} for {:.0} (attack {})",
                sim.current_time(),
                hit.bullet,
                hit.target,
                hit.amount,
                hit.attack_id
            );
        }
        for pickup in sim.drain_pickups() {
            println!(
                "  [t={:.2}] picked up {:?} x{}",
                sim.current_time(),
                pickup.kind,
                pickup.value
            );
        }

        if (tick + 1) % 60 == 0 {
            let snapshot = sim.snapshot();
            println!(
                "--- Tick {} (t={:.1}s): {} entities, player hp={:?}, boss hp={:?} ---",
                snapshot.tick,
                snapshot.time,
                snapshot.entities.len(),
                sim.health(player),
                sim.health(boss),
            );
        }
    }

    println!("\n=== Final State (JSON) ===\n");
    match sim.snapshot().to_json_pretty() {
        Ok(json) => println!("{json}"),
        Err(err) => eprintln!("failed to serialize snapshot: {err}"),
    }
}
