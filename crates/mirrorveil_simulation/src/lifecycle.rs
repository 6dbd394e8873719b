//! Отложенный despawn через покомпонентный таймер
//!
//! Замена engine-корутин: таймер — обычный компонент, обрабатывается
//! один раз за fixed tick. Отмена = снять компонент (или despawn раньше
//! срока) — явная операция, без скрытого состояния.

use bevy::prelude::*;

/// Компонент: despawn entity через `remaining` секунд
///
/// Countdown, не абсолютное время: тикается delta_secs каждый FixedUpdate.
#[derive(Component, Debug, Clone, Copy)]
pub struct DespawnAfter {
    pub remaining: f32,
}

impl DespawnAfter {
    pub fn new(seconds: f32) -> Self {
        Self {
            remaining: seconds.max(0.0),
        }
    }
}

/// System: тикает таймеры и деспавнит просроченные entities
pub fn despawn_after_timeout(
    mut commands: Commands,
    mut query: Query<(Entity, &mut DespawnAfter)>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();

    for (entity, mut timer) in query.iter_mut() {
        timer.remaining -= delta;
        if timer.remaining <= 0.0 {
            if let Ok(mut entity_commands) = commands.get_entity(entity) {
                entity_commands.despawn();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_countdown() {
        let mut timer = DespawnAfter::new(0.2);
        let delta = 1.0 / 60.0;

        // 12 тиков по 1/60 ≈ 0.2 сек
        for _ in 0..11 {
            timer.remaining -= delta;
        }
        assert!(timer.remaining > 0.0);

        timer.remaining -= delta;
        assert!(timer.remaining <= 0.0);
    }

    #[test]
    fn test_negative_seconds_clamped() {
        let timer = DespawnAfter::new(-1.0);
        assert_eq!(timer.remaining, 0.0);
    }
}
