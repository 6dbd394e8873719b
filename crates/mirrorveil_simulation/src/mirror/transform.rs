//! Чистая геометрия отражения
//!
//! Никакого состояния: все функции — pure, считают отражённые
//! position/scale/rotation относительно вертикальной зеркальной оси.

use bevy::prelude::*;

/// Отражает позицию относительно зеркальной оси x = mirror_x
///
/// reflected_x = mirror_x - (pos.x - mirror_x) * inversion_scale * ratio
/// Y смещается на y_offset вниз, Z не трогаем.
///
/// При ratio = 1, inversion_scale = 1, y_offset = 0 — инволюция
/// (двойное отражение возвращает исходный X).
pub fn reflect_position(
    position: Vec3,
    mirror_x: f32,
    ratio: f32,
    inversion_scale: f32,
    y_offset: f32,
) -> Vec3 {
    let distance_from_mirror = position.x - mirror_x;
    Vec3::new(
        mirror_x - distance_from_mirror * inversion_scale * ratio,
        position.y - y_offset,
        position.z,
    )
}

/// Отражает scale: X принудительно отрицательный (горизонтальный flip),
/// знаки Y/Z сохраняются, амплитуды не меняются
pub fn reflect_scale(scale: Vec3) -> Vec3 {
    Vec3::new(-scale.x.abs(), scale.y, scale.z)
}

/// Scale по нормализованному расстоянию до зеркала
///
/// t = clamp01(distance / max_distance); lerp(max_scale, min_scale, t):
/// близко к зеркалу — крупнее, далеко — мельче.
///
/// max_distance ~ 0 трактуем как «объект дальше некуда» (t = 1) — защита
/// от деления на ноль; caller подставляет fallback-знаменатель, когда
/// tracked-список пуст.
pub fn normalized_scale(distance: f32, max_distance: f32, min_scale: f32, max_scale: f32) -> f32 {
    let t = if max_distance > f32::EPSILON {
        (distance / max_distance).clamp(0.0, 1.0)
    } else {
        1.0
    };
    max_scale + (min_scale - max_scale) * t
}

/// Поворот отражения: один из двух фиксированных Euler-пресетов (градусы)
///
/// Не физика — стилистический «shimmer» зеркального мира.
pub fn reflect_rotation(use_option_1: bool, option_1_deg: Vec3, option_2_deg: Vec3) -> Quat {
    let euler = if use_option_1 {
        option_1_deg
    } else {
        option_2_deg
    };
    Quat::from_euler(
        EulerRot::XYZ,
        euler.x.to_radians(),
        euler.y.to_radians(),
        euler.z.to_radians(),
    )
}
