//! Cross-cutting компоненты симуляции
//!
//! Маркеры уровня (Wall, MirrorSurface, Obstacle) + движение.
//! Вся геометрия 2D, но Transform остаётся Vec3 (z не трогаем).

use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

/// Путь к prefab визуального представления (engine bridge спавнит по нему node)
///
/// Симуляция визуалом не владеет — только ссылкой. Mirror-копии получают
/// тот же prefab, чтобы bridge отрисовал одинаковый спрайт.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct VisualPrefab {
    pub path: String,
}

impl VisualPrefab {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Маркер: стена уровня (пули об неё уничтожаются)
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct Wall;

/// Маркер: поверхность зеркала (пули сквозь неё не летят)
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct MirrorSurface;

/// Маркер: транзитное препятствие — при overlap с тенью дублируется
/// на другую сторону зеркала
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct Obstacle;

/// Входные данные для движения (WASD)
///
/// Для headless тестов — mock input через этот компонент.
/// Для игры — заполняется engine bridge из реального input.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct MovementInput {
    /// Направление движения (нормализуется при применении)
    pub direction: Vec2,
}

/// Скорость движения (units/sec)
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct MovementSpeed {
    pub speed: f32,
}

impl Default for MovementSpeed {
    fn default() -> Self {
        Self { speed: 5.0 }
    }
}

/// Прямоугольные границы движения (min/max по осям)
#[derive(Component, Debug, Clone, Copy)]
pub struct MovementBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl MovementBounds {
    pub fn new(min_x: f32, max_x: f32, min_y: f32, max_y: f32) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// Границы с гарантией min <= max (перепутанные значения меняем местами)
    pub fn sanitized(self) -> Self {
        let (min_x, max_x) = ordered(self.min_x, self.max_x);
        let (min_y, max_y) = ordered(self.min_y, self.max_y);
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    pub fn clamp(&self, position: Vec2) -> Vec2 {
        Vec2::new(
            position.x.clamp(self.min_x, self.max_x),
            position.y.clamp(self.min_y, self.max_y),
        )
    }
}

fn ordered(a: f32, b: f32) -> (f32, f32) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Spawn bundle для стены (static, генерирует события для пуль)
pub fn wall_bundle(position: Vec2, half_extents: Vec2) -> impl Bundle {
    (
        Wall,
        Transform::from_translation(position.extend(0.0)),
        RigidBody::Fixed,
        Collider::cuboid(half_extents.x, half_extents.y),
        ActiveEvents::COLLISION_EVENTS,
    )
}

/// Spawn bundle для поверхности зеркала (вертикальная полоса на mirror_x)
pub fn mirror_surface_bundle(mirror_x: f32, half_height: f32) -> impl Bundle {
    (
        MirrorSurface,
        Transform::from_translation(Vec3::new(mirror_x, 0.0, 0.0)),
        RigidBody::Fixed,
        Collider::cuboid(0.05, half_height),
        Sensor,
        ActiveEvents::COLLISION_EVENTS,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_clamp() {
        let bounds = MovementBounds::new(-10.0, 10.0, -5.0, 5.0);

        let inside = bounds.clamp(Vec2::new(3.0, -2.0));
        assert_eq!(inside, Vec2::new(3.0, -2.0));

        let outside = bounds.clamp(Vec2::new(20.0, -8.0));
        assert_eq!(outside, Vec2::new(10.0, -5.0));
    }

    #[test]
    fn test_bounds_sanitized_swaps_inverted() {
        let bounds = MovementBounds::new(10.0, -10.0, 5.0, -5.0).sanitized();
        assert_eq!(bounds.min_x, -10.0);
        assert_eq!(bounds.max_x, 10.0);
        assert_eq!(bounds.min_y, -5.0);
        assert_eq!(bounds.max_y, 5.0);
    }
}
