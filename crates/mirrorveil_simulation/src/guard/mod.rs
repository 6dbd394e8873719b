//! Охранники: активация по trigger-зоне + стрельба по игроку
//!
//! ECS ответственность:
//! - Fire cooldown (strategic decision: можно ли стрелять)
//! - Spawn пули с направлением на текущую позицию цели
//! - Передача каждой пули зеркальному движку через AddTracked
//!
//! Цель передаётся handle-ом при spawn-е — никакого поиска по сцене.

use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

pub mod bullet;

pub use bullet::{bullet_bundle, Bullet};

use crate::config::{BulletConfig, GuardConfig};
use crate::logger;
use crate::mirror::AddTracked;
use crate::player::Player;
use crate::SimStep;

/// Компонент охранника
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct Guard {
    /// Стреляет только активированный guard (см. TriggerZone)
    pub activated: bool,
    /// Интервал между выстрелами (сек)
    pub fire_rate: f32,
    /// Текущий cooldown-таймер (тикает к нулю)
    pub fire_timer: f32,
    /// Смещение точки выстрела от позиции guard
    pub fire_point_offset: Vec2,
    /// Цель (handle игрока, задаётся при spawn-е)
    pub target: Option<Entity>,
}

impl Guard {
    pub fn can_fire(&self) -> bool {
        self.fire_timer <= 0.0
    }

    pub fn start_cooldown(&mut self) {
        self.fire_timer = self.fire_rate;
    }
}

/// Параметры пуль этого guard-а
#[derive(Component, Debug, Clone)]
pub struct BulletSpec {
    pub speed: f32,
    pub lifetime: f32,
    pub radius: f32,
    pub prefab: String,
}

impl From<&BulletConfig> for BulletSpec {
    fn from(config: &BulletConfig) -> Self {
        Self {
            speed: config.speed,
            lifetime: config.lifetime,
            radius: config.radius,
            prefab: config.prefab.clone(),
        }
    }
}

/// Маркер: sensor-зона, активирующая привязанного guard-а при входе игрока
#[derive(Component, Debug, Clone, Copy)]
pub struct TriggerZone {
    pub guard: Entity,
}

/// Spawn bundle охранника
pub fn guard_bundle(
    config: &GuardConfig,
    bullet: &BulletConfig,
    position: Vec2,
    target: Entity,
    activated: bool,
) -> impl Bundle {
    (
        Guard {
            activated,
            fire_rate: config.fire_rate.max(0.0),
            fire_timer: 0.0,
            fire_point_offset: Vec2::from_array(config.fire_point_offset),
            target: Some(target),
        },
        BulletSpec::from(bullet),
        Transform::from_translation(position.extend(0.0)),
    )
}

/// Spawn bundle trigger-зоны, связанной с guard-ом
pub fn trigger_zone_bundle(position: Vec2, half_extents: Vec2, guard: Entity) -> impl Bundle {
    (
        TriggerZone { guard },
        Transform::from_translation(position.extend(0.0)),
        Collider::cuboid(half_extents.x, half_extents.y),
        Sensor,
        ActiveEvents::COLLISION_EVENTS,
    )
}

/// System: тик fire cooldown-ов
pub fn tick_guard_cooldowns(mut guards: Query<&mut Guard>, time: Res<Time<Fixed>>) {
    let delta = time.delta_secs();

    for mut guard in guards.iter_mut() {
        if guard.fire_timer > 0.0 {
            guard.fire_timer = (guard.fire_timer - delta).max(0.0);
        }
    }
}

/// System: активация guard-ов при входе игрока в trigger-зону
pub fn activate_guards(
    mut collisions: EventReader<CollisionEvent>,
    zones: Query<&TriggerZone>,
    players: Query<(), With<Player>>,
    mut guards: Query<&mut Guard>,
) {
    for event in collisions.read() {
        let CollisionEvent::Started(first, second, _) = event else {
            continue;
        };

        let zone = if let Ok(zone) = zones.get(*first) {
            if !players.contains(*second) {
                continue;
            }
            zone
        } else if let Ok(zone) = zones.get(*second) {
            if !players.contains(*first) {
                continue;
            }
            zone
        } else {
            continue;
        };

        if let Ok(mut guard) = guards.get_mut(zone.guard) {
            if !guard.activated {
                guard.activated = true;
                logger::log_info(&format!("Guard {:?} activated", zone.guard));
            }
        }
    }
}

/// System: стрельба по живой цели
///
/// Пуля летит к текущей позиции цели (направление фиксируется в момент
/// выстрела) и сразу отдаётся зеркальному движку.
pub fn guard_fire(
    mut guards: Query<(Entity, &mut Guard, &BulletSpec, &Transform)>,
    players: Query<(&Transform, &Player)>,
    mut tracked: EventWriter<AddTracked>,
    mut commands: Commands,
) {
    for (guard_entity, mut guard, spec, transform) in guards.iter_mut() {
        if !guard.activated || !guard.can_fire() {
            continue;
        }
        let Some(target) = guard.target else {
            continue;
        };
        let Ok((target_transform, player)) = players.get(target) else {
            continue;
        };
        if !player.alive {
            continue;
        }

        let fire_point = transform.translation.truncate() + guard.fire_point_offset;
        let direction =
            (target_transform.translation.truncate() - fire_point).normalize_or_zero();
        if direction == Vec2::ZERO {
            continue;
        }

        let bullet = commands
            .spawn(bullet_bundle(spec, fire_point, direction))
            .id();

        guard.start_cooldown();
        tracked.write(AddTracked(bullet));

        logger::log(&format!(
            "Guard {:?} fired bullet {:?} towards {:?}",
            guard_entity, bullet, target
        ));
    }
}

/// Plugin охранников и пуль
pub struct GuardPlugin;

impl Plugin for GuardPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            (
                tick_guard_cooldowns,
                activate_guards,
                guard_fire,
                bullet::move_bullets,
                bullet::process_bullet_hits,
            )
                .chain()
                .in_set(SimStep::Combat),
        );
    }
}
