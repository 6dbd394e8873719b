//! Исход уровня: exit-зоны, game over, рестарт
//!
//! Получает fire-and-forget уведомления от игрока и тени (PlayerDied,
//! ShadowDied), владеет политикой рестарта. Все задержки — явные таймеры
//! на ресурсе, обрабатываемые раз в тик; перенос/отмена рестарта —
//! явная операция на очереди, не скрытая корутина.

use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

use crate::config::OutcomeConfig;
use crate::guard::Bullet;
use crate::logger;
use crate::player::{Player, PlayerDied};
use crate::shadow::{ObstacleDuplicate, Shadow, ShadowDied};
use crate::SimStep;

/// Resource: тайминги исхода уровня
#[derive(Resource, Debug, Clone, Copy)]
pub struct OutcomeSettings {
    /// Задержка рестарта после game over / level complete
    pub restart_delay: f32,
    /// Задержка рестарта после смерти игрока (пауза «осознания»)
    pub player_death_restart_delay: f32,
}

impl Default for OutcomeSettings {
    fn default() -> Self {
        Self::from(&OutcomeConfig::default())
    }
}

impl From<&OutcomeConfig> for OutcomeSettings {
    fn from(config: &OutcomeConfig) -> Self {
        Self {
            restart_delay: config.restart_delay.max(0.0),
            player_death_restart_delay: config.player_death_restart_delay.max(0.0),
        }
    }
}

/// Resource: состояние раунда
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct GameState {
    pub game_over: bool,
    pub level_complete: bool,
}

impl GameState {
    /// Исход уже зафиксирован — новые события игнорируются
    pub fn settled(&self) -> bool {
        self.game_over || self.level_complete
    }

    pub fn clear(&mut self) {
        self.game_over = false;
        self.level_complete = false;
    }
}

/// Resource: отложенный рестарт уровня
///
/// Повторный schedule замещает предыдущий (последний исход решает).
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct PendingRestart {
    remaining: Option<f32>,
}

impl PendingRestart {
    pub fn schedule(&mut self, delay: f32) {
        self.remaining = Some(delay.max(0.0));
    }

    pub fn cancel(&mut self) {
        self.remaining = None;
    }

    pub fn is_scheduled(&self) -> bool {
        self.remaining.is_some()
    }

    /// Тикает таймер; true ровно один раз — когда задержка истекла
    pub fn tick(&mut self, delta: f32) -> bool {
        match self.remaining.as_mut() {
            Some(remaining) => {
                *remaining -= delta;
                if *remaining <= 0.0 {
                    self.remaining = None;
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    }
}

/// Компонент exit-зоны
///
/// Трекает, кто сейчас внутри (вход и выход), и решает победу.
#[derive(Component, Debug, Clone, Copy)]
pub struct ExitZone {
    /// Для победы внутри должны быть оба (иначе достаточно любого)
    pub require_both: bool,
    pub player_in: bool,
    pub shadow_in: bool,
}

impl ExitZone {
    pub fn new(require_both: bool) -> Self {
        Self {
            require_both,
            player_in: false,
            shadow_in: false,
        }
    }

    pub fn satisfied(&self) -> bool {
        if self.require_both {
            self.player_in && self.shadow_in
        } else {
            self.player_in || self.shadow_in
        }
    }
}

/// Event: уровень пройден
#[derive(Event, Debug, Clone, Copy)]
pub struct LevelComplete;

/// Event: вернуть игрока в исходное состояние
#[derive(Event, Debug, Clone, Copy)]
pub struct ResetPlayer;

/// Event: вернуть тень в исходное состояние
#[derive(Event, Debug, Clone, Copy)]
pub struct ResetShadow;

/// Spawn bundle exit-зоны
pub fn exit_zone_bundle(position: Vec2, half_extents: Vec2, require_both: bool) -> impl Bundle {
    (
        ExitZone::new(require_both),
        Transform::from_translation(position.extend(0.0)),
        Collider::cuboid(half_extents.x, half_extents.y),
        Sensor,
        ActiveEvents::COLLISION_EVENTS,
    )
}

/// System: учёт входов/выходов в exit-зонах + проверка победы
///
/// Победа требует, чтобы оба были живы: мёртвая тень в зоне не считается.
pub fn track_exit_zones(
    mut collisions: EventReader<CollisionEvent>,
    mut zones: Query<&mut ExitZone>,
    players: Query<&Player>,
    shadows: Query<&Shadow>,
    state: Res<GameState>,
    mut completed: EventWriter<LevelComplete>,
) {
    let mut should_check = false;

    for event in collisions.read() {
        let (first, second, entered) = match event {
            CollisionEvent::Started(a, b, _) => (*a, *b, true),
            CollisionEvent::Stopped(a, b, _) => (*a, *b, false),
        };

        let (zone_entity, other) = if zones.contains(first) {
            (first, second)
        } else if zones.contains(second) {
            (second, first)
        } else {
            continue;
        };

        let Ok(mut zone) = zones.get_mut(zone_entity) else {
            continue;
        };

        if players.contains(other) {
            zone.player_in = entered;
            should_check = true;
            logger::log(if entered {
                "Player reached the exit"
            } else {
                "Player left the exit"
            });
        } else if shadows.contains(other) {
            zone.shadow_in = entered;
            should_check = true;
            logger::log(if entered {
                "Shadow reached the exit"
            } else {
                "Shadow left the exit"
            });
        }
    }

    if !should_check || state.settled() {
        return;
    }

    let both_alive = players.iter().any(|p| p.alive) && shadows.iter().any(|s| s.alive);

    for zone in zones.iter() {
        if zone.satisfied() {
            if both_alive {
                completed.write(LevelComplete);
                logger::log_info("Level complete! Both characters are safe");
            } else {
                logger::log("Exit reached, but one of the characters is dead");
            }
            break;
        }
    }
}

/// System: фиксация исхода + планирование рестарта
pub fn handle_outcomes(
    mut player_died: EventReader<PlayerDied>,
    mut shadow_died: EventReader<ShadowDied>,
    mut completed: EventReader<LevelComplete>,
    settings: Res<OutcomeSettings>,
    mut state: ResMut<GameState>,
    mut pending: ResMut<PendingRestart>,
) {
    if player_died.read().last().is_some() && !state.settled() {
        state.game_over = true;
        pending.schedule(settings.player_death_restart_delay);
        logger::log_info(&format!(
            "Game over: player died, restart in {} sec",
            settings.player_death_restart_delay
        ));
    }

    if shadow_died.read().last().is_some() && !state.settled() {
        state.game_over = true;
        pending.schedule(settings.restart_delay);
        logger::log_info(&format!(
            "Game over: shadow destroyed, restart in {} sec",
            settings.restart_delay
        ));
    }

    if completed.read().last().is_some() && !state.settled() {
        state.level_complete = true;
        pending.schedule(settings.restart_delay);
    }
}

/// System: исполнение отложенного рестарта
///
/// Чистим динамику раунда (пули, дубликаты препятствий — их mirrors
/// снимет следующий sweep зеркального движка), возвращаем игрока и тень
/// на старт, сбрасываем состояние раунда.
pub fn process_restart(
    time: Res<Time<Fixed>>,
    mut pending: ResMut<PendingRestart>,
    mut state: ResMut<GameState>,
    bullets: Query<Entity, With<Bullet>>,
    duplicates: Query<Entity, With<ObstacleDuplicate>>,
    mut zones: Query<&mut ExitZone>,
    mut reset_player: EventWriter<ResetPlayer>,
    mut reset_shadow: EventWriter<ResetShadow>,
    mut commands: Commands,
) {
    if !pending.tick(time.delta_secs()) {
        return;
    }

    for bullet in bullets.iter() {
        if let Ok(mut entity_commands) = commands.get_entity(bullet) {
            entity_commands.despawn();
        }
    }
    for duplicate in duplicates.iter() {
        if let Ok(mut entity_commands) = commands.get_entity(duplicate) {
            entity_commands.despawn();
        }
    }
    for mut zone in zones.iter_mut() {
        zone.player_in = false;
        zone.shadow_in = false;
    }

    reset_player.write(ResetPlayer);
    reset_shadow.write(ResetShadow);
    state.clear();

    logger::log_info("Level restarted");
}

/// Plugin исхода уровня
pub struct LevelPlugin;

impl Plugin for LevelPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GameState>()
            .init_resource::<PendingRestart>()
            .init_resource::<OutcomeSettings>()
            .add_event::<LevelComplete>()
            .add_event::<ResetPlayer>()
            .add_event::<ResetShadow>()
            .add_systems(
                FixedUpdate,
                (track_exit_zones, handle_outcomes, process_restart)
                    .chain()
                    .in_set(SimStep::Outcome),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_restart_fires_once() {
        let mut pending = PendingRestart::default();
        pending.schedule(0.1);

        assert!(!pending.tick(0.05));
        assert!(pending.tick(0.06));

        // После срабатывания таймер пуст
        assert!(!pending.tick(1.0));
        assert!(!pending.is_scheduled());
    }

    #[test]
    fn test_pending_restart_reschedule_replaces() {
        let mut pending = PendingRestart::default();
        pending.schedule(5.0);
        pending.schedule(0.1);

        assert!(pending.tick(0.2));
    }

    #[test]
    fn test_pending_restart_cancel() {
        let mut pending = PendingRestart::default();
        pending.schedule(0.1);
        pending.cancel();

        assert!(!pending.tick(1.0));
    }

    #[test]
    fn test_exit_zone_requires_both() {
        let mut zone = ExitZone::new(true);
        assert!(!zone.satisfied());

        zone.player_in = true;
        assert!(!zone.satisfied());

        zone.shadow_in = true;
        assert!(zone.satisfied());

        // Выход из зоны снимает готовность
        zone.player_in = false;
        assert!(!zone.satisfied());
    }

    #[test]
    fn test_exit_zone_either_mode() {
        let mut zone = ExitZone::new(false);
        zone.shadow_in = true;
        assert!(zone.satisfied());
    }
}
