//! Зеркальный движок: синхронизация отражённых пар
//!
//! ECS ответственность:
//! - Реестр пар original → mirror (ReflectedPairs)
//! - Per-tick sweep мёртвых пар + пересчёт farthest-нормализации
//! - Отражённые position/scale/rotation для каждого mirror
//!
//! Engine bridge ответственность:
//! - Отрисовка mirror-сущностей по их VisualPrefab
//!
//! Mirror-сущности — чисто визуальные/позиционные: минимальный bundle
//! без поведенческих компонентов оригинала (движение, AI, урон).

use bevy::prelude::*;

pub mod registry;
pub mod sync;
pub mod transform;

pub use registry::ReflectedPairs;
pub use sync::{reap_dead_pairs, register_tracked, sync_mirror_transforms, AddTracked};
pub use transform::{normalized_scale, reflect_position, reflect_rotation, reflect_scale};

use crate::config::{MirrorConfig, ScaleProfile};
use crate::SimStep;

/// Resource: зеркальная плоскость уровня
///
/// Константа на время жизни уровня. Отсутствие ресурса = зеркалирование
/// выключено (движок молча пропускает тик, warning один раз).
#[derive(Resource, Debug, Clone)]
pub struct MirrorPlane {
    /// X-координата оси отражения
    pub mirror_x: f32,
    /// Сколько проходит отражение на единицу движения оригинала
    pub x_movement_ratio: f32,
    /// Инверсия по X (обычно 1.0)
    pub x_inversion_scale: f32,
    /// Смещение отражённых объектов по Y
    pub reflected_y_offset: f32,
    /// Euler-пресеты поворота отражений (градусы)
    pub rotation_option_1: Vec3,
    pub rotation_option_2: Vec3,
    pub use_rotation_option_1: bool,
    /// Scale-профиль зеркального движка
    pub scale: ScaleProfile,
    /// Знаменатель нормализации при пустом реестре
    pub fallback_max_distance: f32,
}

impl From<&MirrorConfig> for MirrorPlane {
    fn from(config: &MirrorConfig) -> Self {
        Self {
            mirror_x: config.mirror_x,
            x_movement_ratio: config.x_movement_ratio,
            x_inversion_scale: config.x_inversion_scale,
            reflected_y_offset: config.reflected_y_offset,
            rotation_option_1: Vec3::from_array(config.rotation_option_1),
            rotation_option_2: Vec3::from_array(config.rotation_option_2),
            use_rotation_option_1: config.use_rotation_option_1,
            scale: config.scale.sanitized(),
            fallback_max_distance: config.fallback_max_distance,
        }
    }
}

impl MirrorPlane {
    /// Активный поворотный пресет
    pub fn rotation_preset(&self) -> Quat {
        reflect_rotation(
            self.use_rotation_option_1,
            self.rotation_option_1,
            self.rotation_option_2,
        )
    }
}

/// Компонент: чисто визуальное отражение original-сущности
///
/// Поведенческих компонентов не несёт. Collider (если скопирован с
/// оригинала) — пассивный sensor: системы других доменов сами решают,
/// что значит overlap с отражением.
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct MirrorVisual {
    /// Оригинал, чью позицию повторяем
    pub source: Entity,
}

/// Plugin зеркального движка
///
/// Порядок внутри тика:
/// 1. register_tracked — новые AddTracked → spawn mirror-сущностей
/// 2. reap_dead_pairs — sweep пар, у которых умерла любая сторона
/// 3. sync_mirror_transforms — farthest-нормализация + отражение всех пар
pub struct MirrorPlugin;

impl Plugin for MirrorPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ReflectedPairs>()
            .add_event::<AddTracked>()
            .add_systems(
                FixedUpdate,
                (register_tracked, reap_dead_pairs, sync_mirror_transforms)
                    .chain()
                    .in_set(SimStep::Mirror),
            );
    }
}
