//! Контроллер тени
//!
//! Тень — выделенная, вручную кодированная пара игрока: физичная игровая
//! сущность (kinematic тело, sensor collider), а не чисто визуальный
//! дубликат из реестра. Позицию получает push-ем от игрока (PlayerMoved),
//! собственного отражения не считает.
//!
//! Ответственность:
//! - Движение к отражённой позиции игрока: clamp к своим границам +
//!   вертикальный offset, физично-безопасный перенос тела
//! - Собственный scale от расстояния ИГРОКА до зеркала (сглаживание,
//!   знаки осей сохраняются)
//! - Дублирование пересекаемых препятствий на другую сторону (obstacle.rs)
//! - Смерть от отражённых пуль, отчёт о life/death state

use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

pub mod obstacle;

pub use obstacle::{
    obstacle_bundle, ObstacleDuplicate, ObstacleDuplicationSettings, ShadowObstacleState,
};

use crate::components::VisualPrefab;
use crate::config::{PlayerConfig, ShadowConfig};
use crate::guard::Bullet;
use crate::level::ResetShadow;
use crate::logger;
use crate::mirror::{self, MirrorPlane, MirrorVisual};
use crate::player::PlayerMoved;
use crate::SimStep;

/// Компонент тени
///
/// Инвариант: позиция и scale обновляются только при alive; на смерти
/// velocity обнуляется, позиция замораживается.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct Shadow {
    pub alive: bool,
    /// Отражённая стартовая позиция игрока (для reset)
    pub start_position: Vec3,
    /// Вертикальный offset позиционирования
    pub y_offset: f32,
}

impl Shadow {
    /// Идемпотентная смерть: true только при первом вызове
    pub fn die(&mut self) -> bool {
        if !self.alive {
            return false;
        }
        self.alive = false;
        true
    }

    pub fn reset(&mut self) {
        self.alive = true;
    }
}

/// Границы движения тени: производные от границ игрока, отражённые
/// относительно зеркала (тень ходит на ту же максимальную дистанцию
/// от зеркала, что и игрок)
#[derive(Component, Debug, Clone, Copy)]
pub struct ShadowBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl ShadowBounds {
    pub fn from_player_bounds(
        player_min_x: f32,
        player_max_x: f32,
        player_min_y: f32,
        player_max_y: f32,
        mirror_x: f32,
    ) -> Self {
        let player_max_distance = (player_max_x - mirror_x)
            .abs()
            .max((player_min_x - mirror_x).abs());
        Self {
            min_x: mirror_x - player_max_distance,
            max_x: mirror_x + player_max_distance,
            min_y: player_min_y,
            max_y: player_max_y,
        }
    }
}

/// Независимый scale-профиль тени
///
/// Расстояние берём у ИГРОКА (не у самой тени), нормализуем по его
/// X-диапазону. current сглаживается, никогда не прыгает.
#[derive(Component, Debug, Clone, Copy)]
pub struct ShadowScale {
    pub min_scale: f32,
    /// Потолок scale, захваченный при инициализации
    pub max_scale: f32,
    pub transition_speed: f32,
    pub current: f32,
    /// X-диапазон игрока для нормализации расстояния
    pub player_min_x: f32,
    pub player_max_x: f32,
}

/// Event: тень погибла
#[derive(Event, Debug, Clone, Copy)]
pub struct ShadowDied;

/// Spawn bundle тени
///
/// Стартовая позиция — честное отражение стартовой позиции игрока.
/// Тело kinematic с sensor collider: overlap-события идут, физика
/// тень не таскает.
pub fn shadow_bundle(
    config: &ShadowConfig,
    plane: &MirrorPlane,
    player: &PlayerConfig,
) -> impl Bundle {
    let player_start = Vec3::new(player.spawn[0], player.spawn[1], 0.0);
    let start = mirror::reflect_position(
        player_start,
        plane.mirror_x,
        plane.x_movement_ratio,
        plane.x_inversion_scale,
        0.0,
    );

    let scale = config.scale.sanitized();
    let bounds = ShadowBounds::from_player_bounds(
        player.bounds.min_x,
        player.bounds.max_x,
        player.bounds.min_y,
        player.bounds.max_y,
        plane.mirror_x,
    );

    (
        Shadow {
            alive: true,
            start_position: start,
            y_offset: config.y_offset,
        },
        bounds,
        ShadowScale {
            min_scale: scale.min_scale,
            max_scale: scale.max_scale,
            transition_speed: scale.transition_speed,
            current: scale.max_scale,
            player_min_x: player.bounds.min_x,
            player_max_x: player.bounds.max_x,
        },
        ShadowObstacleState::default(),
        VisualPrefab::new(&config.prefab),
        Transform::from_translation(start).with_scale(Vec3::new(
            scale.max_scale,
            scale.max_scale,
            1.0,
        )),
        RigidBody::KinematicPositionBased,
        Collider::capsule_y(0.25, 0.25),
        Sensor,
        Velocity::zero(),
        LockedAxes::ROTATION_LOCKED,
        ActiveEvents::COLLISION_EVENTS,
    )
}

/// System: reset тени по команде level outcome
pub fn reset_shadow(
    mut resets: EventReader<ResetShadow>,
    mut shadows: Query<(&mut Shadow, &mut Velocity, &mut Transform)>,
) {
    if resets.read().last().is_none() {
        return;
    }

    for (mut shadow, mut velocity, mut transform) in shadows.iter_mut() {
        shadow.reset();
        *velocity = Velocity::zero();
        transform.translation = shadow.start_position;

        logger::log("Shadow reset to start position");
    }
}

/// System: движение тени за игроком
///
/// Потребляет последний PlayerMoved тика. Мёртвая тень не двигается.
/// Перенос тела — записью Transform kinematic-телу: Rapier двигает его
/// с учётом коллизий, не телепортом.
pub fn follow_player(
    mut moved: EventReader<PlayerMoved>,
    plane: Option<Res<MirrorPlane>>,
    mut shadows: Query<(&Shadow, &ShadowBounds, &mut Transform)>,
    mut warned_missing_plane: Local<bool>,
) {
    let Some(pushed) = moved.read().last().copied() else {
        return;
    };
    let Some(plane) = plane else {
        if !*warned_missing_plane {
            logger::log_warning("MirrorPlane not configured, shadow follow disabled");
            *warned_missing_plane = true;
        }
        return;
    };

    for (shadow, bounds, mut transform) in shadows.iter_mut() {
        if !shadow.alive {
            continue;
        }

        let reflected = mirror::reflect_position(
            pushed.position.extend(transform.translation.z),
            plane.mirror_x,
            plane.x_movement_ratio,
            plane.x_inversion_scale,
            0.0,
        );

        transform.translation.x = reflected.x.clamp(bounds.min_x, bounds.max_x);
        transform.translation.y =
            pushed.position.y.clamp(bounds.min_y, bounds.max_y) + shadow.y_offset;

        transform.rotation = plane.rotation_preset();
    }
}

/// System: scale тени от расстояния игрока до зеркала
///
/// Exponential-decay сглаживание к цели со скоростью transition_speed.
/// Знаки осей берём с живого transform — горизонтальные flip-ы, сделанные
/// анимационным слоем, не затираются.
pub fn update_shadow_scale(
    mut moved: EventReader<PlayerMoved>,
    plane: Option<Res<MirrorPlane>>,
    mut shadows: Query<(&Shadow, &mut ShadowScale, &mut Transform)>,
    time: Res<Time<Fixed>>,
) {
    let Some(pushed) = moved.read().last().copied() else {
        return;
    };
    let Some(plane) = plane else {
        return;
    };

    let delta = time.delta_secs();

    for (shadow, mut scale, mut transform) in shadows.iter_mut() {
        if !shadow.alive {
            continue;
        }

        let player_distance = (pushed.position.x - plane.mirror_x).abs();
        let player_max_distance = (scale.player_min_x - plane.mirror_x)
            .abs()
            .max((scale.player_max_x - plane.mirror_x).abs());

        let target = mirror::normalized_scale(
            player_distance,
            player_max_distance,
            scale.min_scale,
            scale.max_scale,
        );

        let alpha = (scale.transition_speed * delta).min(1.0);
        scale.current += (target - scale.current) * alpha;

        let sign_x = if transform.scale.x >= 0.0 { 1.0 } else { -1.0 };
        let sign_y = if transform.scale.y >= 0.0 { 1.0 } else { -1.0 };
        transform.scale = Vec3::new(scale.current * sign_x, scale.current * sign_y, 1.0);
    }
}

/// System: смерть тени от отражённых пуль
///
/// Mirror-сущности поведения не несут — правило «отражённая пуля убивает
/// тень» принадлежит самой тени: overlap тень ↔ mirror, чей оригинал —
/// пуля, означает смерть.
pub fn shadow_bullet_hazard(
    mut collisions: EventReader<CollisionEvent>,
    mut shadows: Query<(Entity, &mut Shadow, &mut Velocity)>,
    mirrors: Query<&MirrorVisual>,
    bullets: Query<(), With<Bullet>>,
    mut died: EventWriter<ShadowDied>,
) {
    for event in collisions.read() {
        let CollisionEvent::Started(first, second, _) = event else {
            continue;
        };

        let (shadow_entity, other) = if shadows.contains(*first) {
            (*first, *second)
        } else if shadows.contains(*second) {
            (*second, *first)
        } else {
            continue;
        };

        let Ok(mirror) = mirrors.get(other) else {
            continue;
        };
        if !bullets.contains(mirror.source) {
            continue;
        }

        let Ok((_, mut shadow, mut velocity)) = shadows.get_mut(shadow_entity) else {
            continue;
        };
        if shadow.die() {
            *velocity = Velocity::zero();
            died.write(ShadowDied);
            logger::log_info("Shadow destroyed by reflected bullet");
        }
    }
}

/// Plugin контроллера тени
pub struct ShadowPlugin;

impl Plugin for ShadowPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<ShadowDied>()
            .init_resource::<ObstacleDuplicationSettings>()
            .add_systems(
                FixedUpdate,
                (
                    reset_shadow,
                    follow_player,
                    update_shadow_scale,
                    shadow_bullet_hazard,
                    obstacle::clear_finished_duplicates,
                    obstacle::mirror_overlapping_obstacles,
                )
                    .chain()
                    .in_set(SimStep::Shadow),
            );
    }
}
