//! Пули охранников
//!
//! Направление фиксируется при выстреле; движение — собственная
//! интеграция velocity (Rapier только для overlap detection). Пуля
//! умирает о стену, зеркало, игрока или по таймеру жизни — её mirror
//! снимает следующий sweep зеркального движка.

use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

use super::BulletSpec;
use crate::components::{MirrorSurface, VisualPrefab, Wall};
use crate::lifecycle::DespawnAfter;
use crate::logger;
use crate::player::{Player, PlayerHit};

/// Маркер пули
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct Bullet;

/// Spawn bundle пули
///
/// Поворот — по направлению полёта (спрайт смотрит вверх, поэтому −90°).
pub fn bullet_bundle(spec: &BulletSpec, position: Vec2, direction: Vec2) -> impl Bundle {
    let angle = direction.y.atan2(direction.x);
    let rotation = Quat::from_rotation_z(angle - std::f32::consts::FRAC_PI_2);

    (
        Bullet,
        Transform::from_translation(position.extend(0.0)).with_rotation(rotation),
        Velocity {
            linvel: direction * spec.speed,
            angvel: 0.0,
        },
        RigidBody::KinematicVelocityBased,
        Collider::ball(spec.radius),
        Sensor,
        ActiveEvents::COLLISION_EVENTS,
        DespawnAfter::new(spec.lifetime),
        VisualPrefab::new(&spec.prefab),
    )
}

/// System: интеграция движения пуль
pub fn move_bullets(
    mut bullets: Query<(&Velocity, &mut Transform), With<Bullet>>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();

    for (velocity, mut transform) in bullets.iter_mut() {
        transform.translation.x += velocity.linvel.x * delta;
        transform.translation.y += velocity.linvel.y * delta;
    }
}

/// System: попадания пуль
///
/// Игрок → PlayerHit + уничтожение пули; стена/зеркало → просто
/// уничтожение. Остальные overlap-ы пулю не трогают.
pub fn process_bullet_hits(
    mut collisions: EventReader<CollisionEvent>,
    bullets: Query<(), With<Bullet>>,
    players: Query<(), With<Player>>,
    walls: Query<(), With<Wall>>,
    mirror_surfaces: Query<(), With<MirrorSurface>>,
    mut hits: EventWriter<PlayerHit>,
    mut commands: Commands,
) {
    for event in collisions.read() {
        let CollisionEvent::Started(first, second, _) = event else {
            continue;
        };

        let (bullet, other) = if bullets.contains(*first) {
            (*first, *second)
        } else if bullets.contains(*second) {
            (*second, *first)
        } else {
            continue;
        };

        if players.contains(other) {
            hits.write(PlayerHit);
            logger::log(&format!("Bullet {:?} hit player", bullet));
        } else if !walls.contains(other) && !mirror_surfaces.contains(other) {
            continue;
        }

        if let Ok(mut entity_commands) = commands.get_entity(bullet) {
            entity_commands.despawn();
        }
    }
}
