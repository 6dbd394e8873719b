//! Конфигурация уровня (externally authored)
//!
//! Host десериализует LevelConfig из своего формата сцены (формат вне
//! scope симуляции) и вызывает install() ДО первого тика. Валидация
//! мягкая: перепутанные min/max исправляем с warning, не падаем.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::level::OutcomeSettings;
use crate::logger;
use crate::mirror::MirrorPlane;
use crate::shadow::ObstacleDuplicationSettings;

/// Профиль масштабирования по расстоянию до зеркала
///
/// Инвариант: min_scale <= max_scale (sanitized чинит перепутанные).
/// Текущий scale всегда сглаживается к цели, никогда не прыгает
/// (кроме инициализации).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleProfile {
    /// Минимальный scale (объект далеко от зеркала)
    pub min_scale: f32,
    /// Максимальный scale (объект у зеркала)
    pub max_scale: f32,
    /// Скорость сглаживания (1/sec)
    pub transition_speed: f32,
}

impl Default for ScaleProfile {
    fn default() -> Self {
        Self {
            min_scale: 0.5,
            max_scale: 1.5,
            transition_speed: 2.0,
        }
    }
}

impl ScaleProfile {
    pub fn sanitized(self) -> Self {
        if self.min_scale > self.max_scale {
            logger::log_warning(&format!(
                "ScaleProfile: min_scale {} > max_scale {}, swapping",
                self.min_scale, self.max_scale
            ));
            return Self {
                min_scale: self.max_scale,
                max_scale: self.min_scale,
                ..self
            };
        }
        self
    }
}

/// Прямоугольник границ движения
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundsConfig {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl Default for BoundsConfig {
    fn default() -> Self {
        Self {
            min_x: 1.0,
            max_x: 10.0,
            min_y: -5.0,
            max_y: 5.0,
        }
    }
}

/// Настройки зеркальной плоскости
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// X-координата оси отражения
    pub mirror_x: f32,
    /// Коэффициент перемещения отражений (0.5 = отражение проходит половину пути)
    pub x_movement_ratio: f32,
    /// Инверсия по X (обычно 1.0, оставлено для не-единичного зеркалирования)
    pub x_inversion_scale: f32,
    /// Смещение отражённых объектов по Y
    pub reflected_y_offset: f32,
    /// Euler-пресет поворота отражений, вариант 1 (градусы)
    pub rotation_option_1: [f32; 3],
    /// Euler-пресет поворота отражений, вариант 2 (градусы)
    pub rotation_option_2: [f32; 3],
    /// Какой пресет активен
    pub use_rotation_option_1: bool,
    /// Scale-профиль зеркального движка
    pub scale: ScaleProfile,
    /// Знаменатель нормализации, когда нет ни одного tracked объекта
    pub fallback_max_distance: f32,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            mirror_x: 0.0,
            x_movement_ratio: 1.0,
            x_inversion_scale: 1.0,
            reflected_y_offset: 0.0,
            rotation_option_1: [30.0, 20.0, 65.0],
            rotation_option_2: [-30.0, -20.0, -65.0],
            use_rotation_option_1: true,
            scale: ScaleProfile::default(),
            fallback_max_distance: 10.0,
        }
    }
}

/// Настройки тени
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    /// Вертикальный offset позиционирования тени
    pub y_offset: f32,
    /// Scale-профиль тени (независим от зеркального движка)
    pub scale: ScaleProfile,
    pub prefab: String,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            y_offset: 0.0,
            scale: ScaleProfile {
                min_scale: 0.2,
                max_scale: 1.0,
                transition_speed: 2.0,
            },
            prefab: "res://actors/shadow.tscn".into(),
        }
    }
}

/// Настройки игрока
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub move_speed: f32,
    pub lives: u32,
    /// Минимальный интервал между потерями жизни (сек)
    pub damage_cooldown: f32,
    /// Длительность damage flash (сек)
    pub flash_duration: f32,
    /// Цвет flash (RGB, для render bridge)
    pub flash_color: [f32; 3],
    pub bounds: BoundsConfig,
    /// Стартовая точка (PlayerStartPoint уровня)
    pub spawn: [f32; 2],
    pub prefab: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            move_speed: 5.0,
            lives: 3,
            damage_cooldown: 1.0,
            flash_duration: 0.3,
            flash_color: [1.0, 0.0, 0.0],
            bounds: BoundsConfig::default(),
            spawn: [4.0, 0.0],
            prefab: "res://actors/player.tscn".into(),
        }
    }
}

/// Настройки охранников
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Интервал между выстрелами (сек)
    pub fire_rate: f32,
    /// Смещение точки выстрела от позиции guard
    pub fire_point_offset: [f32; 2],
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            fire_rate: 1.0,
            fire_point_offset: [0.0, 0.5],
        }
    }
}

/// Настройки пуль
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BulletConfig {
    pub speed: f32,
    /// Время жизни пули (сек)
    pub lifetime: f32,
    pub radius: f32,
    pub prefab: String,
}

impl Default for BulletConfig {
    fn default() -> Self {
        Self {
            speed: 10.0,
            lifetime: 10.0,
            radius: 0.1,
            prefab: "res://hazards/bullet.tscn".into(),
        }
    }
}

/// Сторона зеркала, с которой препятствия дублируются
///
/// Асимметрия (только слева) — тюнинг уровня, не политика движка.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicateSourceSide {
    LeftOfMirror,
    RightOfMirror,
    BothSides,
}

/// Настройки дублирования препятствий тенью
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleDuplicationConfig {
    /// Делитель scale дубликата (тюнинг уровня, см. DESIGN.md)
    pub scale_divisor: f32,
    /// Задержка удаления после конца overlap (против collision flicker)
    pub despawn_grace: f32,
    pub source_side: DuplicateSourceSide,
}

impl Default for ObstacleDuplicationConfig {
    fn default() -> Self {
        Self {
            scale_divisor: 0.7,
            despawn_grace: 0.2,
            source_side: DuplicateSourceSide::LeftOfMirror,
        }
    }
}

/// Настройки исхода уровня (restart-тайминги)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct OutcomeConfig {
    /// Задержка рестарта после game over / level complete (сек)
    pub restart_delay: f32,
    /// Задержка рестарта после смерти игрока (пауза «осознания»)
    pub player_death_restart_delay: f32,
}

impl Default for OutcomeConfig {
    fn default() -> Self {
        Self {
            restart_delay: 2.0,
            player_death_restart_delay: 3.0,
        }
    }
}

/// Полная конфигурация уровня
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub mirror: MirrorConfig,
    pub shadow: ShadowConfig,
    pub player: PlayerConfig,
    pub guard: GuardConfig,
    pub bullet: BulletConfig,
    pub obstacle_duplication: ObstacleDuplicationConfig,
    pub outcome: OutcomeConfig,
}

impl LevelConfig {
    /// Чинит невалидные поля (min/max, нулевой ratio, отрицательные тайминги)
    pub fn sanitized(mut self) -> Self {
        self.mirror.scale = self.mirror.scale.sanitized();
        self.shadow.scale = self.shadow.scale.sanitized();
        if self.mirror.x_movement_ratio.abs() <= f32::EPSILON {
            logger::log_warning("MirrorConfig: x_movement_ratio is zero, falling back to 1.0");
            self.mirror.x_movement_ratio = 1.0;
        }
        self.bullet.lifetime = self.bullet.lifetime.max(0.0);
        self.obstacle_duplication.despawn_grace = self.obstacle_duplication.despawn_grace.max(0.0);
        self.outcome.restart_delay = self.outcome.restart_delay.max(0.0);
        self.outcome.player_death_restart_delay = self.outcome.player_death_restart_delay.max(0.0);
        self
    }

    /// Вставляет конфигурационные ресурсы в App (вызывается host-ом до старта)
    pub fn install(&self, app: &mut App) {
        let config = self.clone().sanitized();
        app.insert_resource(MirrorPlane::from(&config.mirror))
            .insert_resource(ObstacleDuplicationSettings::from(&config.obstacle_duplication))
            .insert_resource(OutcomeSettings::from(&config.outcome));
    }
}
