//! Контроллер игрока
//!
//! ECS ответственность:
//! - Движение: input → velocity → интеграция → clamp к границам
//! - Push позиции тени КАЖДЫЙ тик (PlayerMoved) — без сглаживания и
//!   истории, тень отражает текущую clamped-позицию
//! - Жизни + damage cooldown + flash, идемпотентные die/reset
//!
//! Engine bridge ответственность:
//! - Заполнение MovementInput из реального ввода
//! - Отрисовка flash по интенсивности DamageFlash

use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

use crate::components::{MovementBounds, MovementInput, MovementSpeed, VisualPrefab};
use crate::config::PlayerConfig;
use crate::level::ResetPlayer;
use crate::logger;
use crate::SimStep;

/// Компонент игрока
///
/// Инварианты: lives == 0 ⇔ !alive; позиция обновляется только при alive.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct Player {
    pub alive: bool,
    pub lives: u32,
    pub max_lives: u32,
    /// Стартовая позиция (для reset)
    pub start_position: Vec3,
}

impl Player {
    pub fn new(lives: u32, start_position: Vec3) -> Self {
        Self {
            alive: true,
            lives,
            max_lives: lives,
            start_position,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Идемпотентно: повторный вызов у мёртвого — no-op.
    /// Возвращает true, если игрок умер именно сейчас.
    pub fn die(&mut self) -> bool {
        if !self.alive {
            return false;
        }
        self.alive = false;
        true
    }

    pub fn reset(&mut self) {
        self.alive = true;
        self.lives = self.max_lives;
    }
}

/// Окно между потерями жизни
///
/// Countdown-таймер: пока не дотикал до нуля, reduce_life — no-op.
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct DamageCooldown {
    pub cooldown: f32,
    pub timer: f32,
}

impl DamageCooldown {
    pub fn new(cooldown: f32) -> Self {
        Self {
            cooldown: cooldown.max(0.0),
            timer: 0.0,
        }
    }

    pub fn ready(&self) -> bool {
        self.timer <= 0.0
    }

    pub fn restart(&mut self) {
        self.timer = self.cooldown;
    }

    pub fn tick(&mut self, delta: f32) {
        if self.timer > 0.0 {
            self.timer = (self.timer - delta).max(0.0);
        }
    }
}

/// Транзитный damage flash
///
/// Симуляция хранит только затухающую интенсивность; цвет и отрисовка —
/// дело render bridge.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct DamageFlash {
    pub duration: f32,
    pub timer: f32,
}

impl DamageFlash {
    pub fn new(duration: f32) -> Self {
        Self {
            duration: duration.max(0.0),
            timer: 0.0,
        }
    }

    pub fn start(&mut self) {
        self.timer = self.duration;
    }

    pub fn stop(&mut self) {
        self.timer = 0.0;
    }

    /// 1.0 в момент удара → 0.0 по истечении duration
    pub fn intensity(&self) -> f32 {
        if self.duration <= f32::EPSILON {
            return 0.0;
        }
        (self.timer / self.duration).clamp(0.0, 1.0)
    }

    pub fn tick(&mut self, delta: f32) {
        if self.timer > 0.0 {
            self.timer = (self.timer - delta).max(0.0);
        }
    }
}

/// Event: clamped-позиция игрока этого тика (push-интерфейс тени)
#[derive(Event, Debug, Clone, Copy)]
pub struct PlayerMoved {
    pub position: Vec2,
}

/// Event: попадание по игроку (пишет система пуль)
#[derive(Event, Debug, Clone, Copy)]
pub struct PlayerHit;

/// Event: жизнь реально потеряна (для UI/звука bridge-а)
#[derive(Event, Debug, Clone, Copy)]
pub struct PlayerDamaged {
    pub remaining_lives: u32,
}

/// Event: игрок умер (level outcome решает, что дальше)
#[derive(Event, Debug, Clone, Copy)]
pub struct PlayerDied;

/// Spawn bundle игрока
///
/// Kinematic тело: velocity интегрируем сами, Rapier — для overlap
/// detection (пули, exit-зоны, trigger line охранников).
pub fn player_bundle(config: &PlayerConfig) -> impl Bundle {
    let start = Vec3::new(config.spawn[0], config.spawn[1], 0.0);
    let bounds = MovementBounds::new(
        config.bounds.min_x,
        config.bounds.max_x,
        config.bounds.min_y,
        config.bounds.max_y,
    )
    .sanitized();

    (
        Player::new(config.lives.max(1), start),
        MovementInput::default(),
        MovementSpeed {
            speed: config.move_speed,
        },
        bounds,
        DamageCooldown::new(config.damage_cooldown),
        DamageFlash::new(config.flash_duration),
        VisualPrefab::new(&config.prefab),
        Transform::from_translation(start),
        RigidBody::KinematicPositionBased,
        Collider::capsule_y(0.25, 0.25),
        Velocity::zero(),
        LockedAxes::ROTATION_LOCKED,
        ActiveEvents::COLLISION_EVENTS,
    )
}

/// System: reset игрока по команде level outcome
pub fn reset_player(
    mut resets: EventReader<ResetPlayer>,
    mut players: Query<(
        &mut Player,
        &mut DamageCooldown,
        &mut DamageFlash,
        &mut MovementInput,
        &mut Velocity,
        &mut Transform,
    )>,
) {
    if resets.read().last().is_none() {
        return;
    }

    for (mut player, mut cooldown, mut flash, mut input, mut velocity, mut transform) in
        players.iter_mut()
    {
        player.reset();
        cooldown.timer = 0.0;
        flash.stop();
        input.direction = Vec2::ZERO;
        *velocity = Velocity::zero();
        transform.translation = player.start_position;

        logger::log(&format!("Player reset, lives: {}", player.lives));
    }
}

/// System: тик damage-таймеров (cooldown + flash)
pub fn tick_damage_state(
    mut query: Query<(&mut DamageCooldown, &mut DamageFlash)>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();
    for (mut cooldown, mut flash) in query.iter_mut() {
        cooldown.tick(delta);
        flash.tick(delta);
    }
}

/// System: обработка попаданий → потеря жизни
///
/// Cooldown-гейт: в пределах окна попадания игнорируются. На нуле жизней —
/// идемпотентная смерть с обнулением velocity и событием для level outcome.
pub fn apply_player_damage(
    mut hits: EventReader<PlayerHit>,
    mut players: Query<(
        &mut Player,
        &mut DamageCooldown,
        &mut DamageFlash,
        &mut Velocity,
    )>,
    mut damaged: EventWriter<PlayerDamaged>,
    mut died: EventWriter<PlayerDied>,
) {
    for _ in hits.read() {
        for (mut player, mut cooldown, mut flash, mut velocity) in players.iter_mut() {
            if !player.alive {
                continue;
            }
            if !cooldown.ready() {
                logger::log("Damage cooldown active, life kept");
                continue;
            }

            player.lives = player.lives.saturating_sub(1);
            cooldown.restart();
            flash.start();
            damaged.write(PlayerDamaged {
                remaining_lives: player.lives,
            });

            logger::log_info(&format!("Player hit! Lives left: {}", player.lives));

            if player.lives == 0 && player.die() {
                *velocity = Velocity::zero();
                died.write(PlayerDied);
                logger::log_info("Player died");
            }
        }
    }
}

/// System: движение + push позиции тени
///
/// Диагональный input нормализуется (скорость по диагонали равна осевой).
/// Push идёт каждый тик, даже если игрок стоит, — тень всегда видит
/// актуальную clamped-позицию.
pub fn player_movement(
    mut players: Query<(
        &Player,
        &MovementInput,
        &MovementSpeed,
        &MovementBounds,
        &mut Velocity,
        &mut Transform,
    )>,
    time: Res<Time<Fixed>>,
    mut moved: EventWriter<PlayerMoved>,
) {
    let delta = time.delta_secs();

    for (player, input, speed, bounds, mut velocity, mut transform) in players.iter_mut() {
        if !player.alive {
            velocity.linvel = Vec2::ZERO;
            continue;
        }

        let direction = input.direction.normalize_or_zero();
        velocity.linvel = direction * speed.speed;

        // Интеграция + clamp (Rapier kinematic: тело следует за Transform)
        let next = transform.translation.truncate() + velocity.linvel * delta;
        let clamped = bounds.clamp(next);
        transform.translation.x = clamped.x;
        transform.translation.y = clamped.y;

        moved.write(PlayerMoved { position: clamped });
    }
}

/// Plugin контроллера игрока
pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<PlayerMoved>()
            .add_event::<PlayerHit>()
            .add_event::<PlayerDamaged>()
            .add_event::<PlayerDied>()
            .add_systems(
                FixedUpdate,
                (
                    reset_player,
                    tick_damage_state,
                    apply_player_damage,
                    player_movement,
                )
                    .chain()
                    .in_set(SimStep::Player),
            );
    }
}
