//! Дублирование препятствий тенью
//!
//! Когда транзитное препятствие (Obstacle) пересекает тень с настроенной
//! стороны зеркала, на противоположной стороне появляется static-клон его
//! collider-а: невидимый блокиратор для игрока. Клон живёт, пока длится
//! overlap; после конца overlap удаляется с короткой задержкой (grace) —
//! иначе collision flicker на границе.
//!
//! Инвариант: у тени не более одного активного дубликата. Новый overlap
//! явно вытесняет дубликат, ожидающий удаления, — двойного дублирования
//! не бывает даже внутри grace-окна.

use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

use crate::components::Obstacle;
use crate::config::{DuplicateSourceSide, ObstacleDuplicationConfig};
use crate::lifecycle::DespawnAfter;
use crate::logger;
use crate::mirror::MirrorPlane;
use crate::shadow::Shadow;

/// Маркер: static-клон препятствия на зеркальной стороне
///
/// Собственные overlap-фильтры тени такие клоны игнорируют (маркер
/// Obstacle на клон не ставится).
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct ObstacleDuplicate;

/// Resource: тюнинг дублирования (см. Open Questions в DESIGN.md)
#[derive(Resource, Debug, Clone, Copy)]
pub struct ObstacleDuplicationSettings {
    pub scale_divisor: f32,
    pub despawn_grace: f32,
    pub source_side: DuplicateSourceSide,
}

impl Default for ObstacleDuplicationSettings {
    fn default() -> Self {
        Self::from(&ObstacleDuplicationConfig::default())
    }
}

impl From<&ObstacleDuplicationConfig> for ObstacleDuplicationSettings {
    fn from(config: &ObstacleDuplicationConfig) -> Self {
        Self {
            scale_divisor: if config.scale_divisor.abs() > f32::EPSILON {
                config.scale_divisor
            } else {
                1.0
            },
            despawn_grace: config.despawn_grace.max(0.0),
            source_side: config.source_side,
        }
    }
}

impl ObstacleDuplicationSettings {
    fn side_matches(&self, obstacle_x: f32, mirror_x: f32) -> bool {
        match self.source_side {
            DuplicateSourceSide::LeftOfMirror => obstacle_x < mirror_x,
            DuplicateSourceSide::RightOfMirror => obstacle_x > mirror_x,
            DuplicateSourceSide::BothSides => true,
        }
    }
}

/// Состояние дублирования на экземпляр тени
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct ShadowObstacleState {
    /// Текущий активный дубликат (не более одного)
    pub active: Option<Entity>,
    /// Дубликат, ожидающий отложенного удаления
    pub pending_despawn: Option<Entity>,
}

/// Позиция дубликата: расстояние до зеркала, поделённое на ratio,
/// откладывается на другую сторону
pub fn duplicate_position(mirror_x: f32, obstacle_x: f32, ratio: f32) -> f32 {
    let distance = mirror_x - obstacle_x;
    mirror_x + distance / ratio
}

/// Scale дубликата: делим на divisor, X инвертируем (зеркальный flip)
pub fn duplicate_scale(scale: Vec3, divisor: f32) -> Vec3 {
    Vec3::new(-(scale.x / divisor), scale.y / divisor, scale.z)
}

/// Spawn bundle транзитного препятствия
pub fn obstacle_bundle(position: Vec2, half_extents: Vec2) -> impl Bundle {
    (
        Obstacle,
        Transform::from_translation(position.extend(0.0)),
        RigidBody::Fixed,
        Collider::cuboid(half_extents.x, half_extents.y),
        ActiveEvents::COLLISION_EVENTS,
    )
}

/// System: lazy-очистка ссылок на уже удалённые дубликаты
///
/// Таймер DespawnAfter уничтожает pending-дубликат сам; здесь только
/// снимаем протухшие ссылки (тот же sweep-подход, что в зеркальном реестре).
pub fn clear_finished_duplicates(
    mut states: Query<&mut ShadowObstacleState>,
    alive: Query<(), With<ObstacleDuplicate>>,
) {
    for mut state in states.iter_mut() {
        if let Some(pending) = state.pending_despawn {
            if !alive.contains(pending) {
                state.pending_despawn = None;
            }
        }
        if let Some(active) = state.active {
            if !alive.contains(active) {
                state.active = None;
            }
        }
    }
}

/// System: overlap begin/end тень ↔ препятствие
///
/// Begin: спавним дубликат на отражённой позиции (если сторона подходит и
/// активного дубликата нет), вытесняя pending-дубликат немедленно.
/// End: активный дубликат уходит в pending с grace-таймером.
pub fn mirror_overlapping_obstacles(
    mut collisions: EventReader<CollisionEvent>,
    plane: Option<Res<MirrorPlane>>,
    settings: Res<ObstacleDuplicationSettings>,
    mut shadows: Query<(&Shadow, &mut ShadowObstacleState)>,
    obstacles: Query<(&Transform, &Collider), With<Obstacle>>,
    mut commands: Commands,
    mut warned_missing_plane: Local<bool>,
) {
    let Some(plane) = plane else {
        if !collisions.is_empty() && !*warned_missing_plane {
            logger::log_warning("MirrorPlane not configured, obstacle duplication disabled");
            *warned_missing_plane = true;
        }
        collisions.clear();
        return;
    };

    for event in collisions.read() {
        let (first, second, started) = match event {
            CollisionEvent::Started(a, b, _) => (*a, *b, true),
            CollisionEvent::Stopped(a, b, _) => (*a, *b, false),
        };

        let (shadow_entity, other) = if shadows.contains(first) {
            (first, second)
        } else if shadows.contains(second) {
            (second, first)
        } else {
            continue;
        };

        let Ok((shadow, mut state)) = shadows.get_mut(shadow_entity) else {
            continue;
        };

        if started {
            if !shadow.alive || state.active.is_some() {
                continue;
            }
            let Ok((obstacle_transform, collider)) = obstacles.get(other) else {
                continue;
            };

            let obstacle_x = obstacle_transform.translation.x;
            if !settings.side_matches(obstacle_x, plane.mirror_x) {
                continue;
            }

            // Новый overlap вытесняет дубликат, ещё ждущий grace-таймер
            if let Some(pending) = state.pending_despawn.take() {
                if let Ok(mut entity_commands) = commands.get_entity(pending) {
                    entity_commands.despawn();
                }
            }

            let duplicate_x = duplicate_position(
                plane.mirror_x,
                obstacle_x,
                plane.x_movement_ratio,
            );
            let translation = Vec3::new(duplicate_x, obstacle_transform.translation.y, 0.0);
            // Зеркальный поворот: дополнительные 180° вокруг вертикали
            let rotation =
                obstacle_transform.rotation * Quat::from_rotation_y(std::f32::consts::PI);
            let scale = duplicate_scale(obstacle_transform.scale, settings.scale_divisor);

            let duplicate = commands
                .spawn((
                    ObstacleDuplicate,
                    Transform {
                        translation,
                        rotation,
                        scale,
                    },
                    collider.clone(),
                    RigidBody::Fixed,
                ))
                .id();

            state.active = Some(duplicate);
            logger::log(&format!(
                "Obstacle duplicated at x = {} (static blocker {:?})",
                duplicate_x, duplicate
            ));
        } else {
            // Конец overlap: grace-задержка против collision flicker
            if !obstacles.contains(other) {
                continue;
            }
            if let Some(active) = state.active.take() {
                if let Ok(mut entity_commands) = commands.get_entity(active) {
                    entity_commands.insert(DespawnAfter::new(settings.despawn_grace));
                    state.pending_despawn = Some(active);
                    logger::log("Obstacle overlap ended, duplicate scheduled for removal");
                }
            }
        }
    }
}
