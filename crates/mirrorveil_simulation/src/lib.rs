//! MIRRORVEIL Simulation Core
//!
//! ECS-симуляция зеркального мира на Bevy 0.16 (strategic layer):
//! - ECS = game state, правила отражения, исход уровня
//! - Engine bridge = рендер, ввод, звук, UI (отдельный crate, вне scope)
//!
//! Порядок тика (FixedUpdate 60Hz):
//! Combat → Player → Shadow → Mirror → Outcome.
//! Позиция игрока финализируется и push-ится тени ДО sweep/reflect-прохода
//! зеркального движка — farthest-нормализация никогда не считается по
//! устаревшей позиции.

use bevy::prelude::*;
use bevy_rapier2d::prelude::CollisionEvent;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod components;
pub mod config;
pub mod guard;
pub mod level;
pub mod lifecycle;
pub mod logger;
pub mod mirror;
pub mod player;
pub mod shadow;

// Re-export базовых типов для удобства
pub use components::{MovementBounds, MovementInput, MovementSpeed, Obstacle, VisualPrefab};
pub use config::{LevelConfig, ScaleProfile};
pub use guard::{Bullet, Guard, GuardPlugin, TriggerZone};
pub use level::{ExitZone, GameState, LevelComplete, LevelPlugin, PendingRestart};
pub use lifecycle::DespawnAfter;
pub use mirror::{AddTracked, MirrorPlane, MirrorPlugin, MirrorVisual, ReflectedPairs};
pub use player::{Player, PlayerDied, PlayerHit, PlayerMoved, PlayerPlugin};
pub use shadow::{Shadow, ShadowDied, ShadowPlugin};

/// Глобальные фазы тика симуляции
///
/// Chained: каждая фаза завершается до старта следующей — один логический
/// поток, никакой параллельной мутации общего состояния внутри тика.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimStep {
    /// Охранники, пули, попадания
    Combat,
    /// Движение игрока + push позиции тени
    Player,
    /// Тень: follow, scale, дубликаты препятствий
    Shadow,
    /// Зеркальный движок: регистрация, sweep, отражение
    Mirror,
    /// Исход уровня, рестарты, отложенные despawn-ы
    Outcome,
}

/// Главный plugin симуляции (объединяет все подсистемы)
pub struct MirrorWorldPlugin;

impl Plugin for MirrorWorldPlugin {
    fn build(&self, app: &mut App) {
        app
            // Fixed timestep 60Hz для simulation tick (легче считать интервалы)
            .insert_resource(Time::<Fixed>::from_hz(60.0))
            .configure_sets(
                FixedUpdate,
                (
                    SimStep::Combat,
                    SimStep::Player,
                    SimStep::Shadow,
                    SimStep::Mirror,
                    SimStep::Outcome,
                )
                    .chain(),
            );

        // Overlap-события: в полной сборке их пишет Rapier plugin, в
        // headless-прогонах — сценарий/мост. add_event идемпотентен.
        app.add_event::<CollisionEvent>();

        app.add_plugins((GuardPlugin, PlayerPlugin, ShadowPlugin, MirrorPlugin, LevelPlugin));

        app.add_systems(
            FixedUpdate,
            lifecycle::despawn_after_timeout.after(SimStep::Outcome),
        );
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    logger::init_logger();
    app.add_plugins(MinimalPlugins)
        .add_plugins(MirrorWorldPlugin)
        .insert_resource(DeterministicRng::new(seed));

    app
}

/// Прогоняет ровно `ticks` fixed-тиков, минуя real-time аккумулятор
///
/// Детерминизм: количество тиков не зависит от wall-clock. Fixed-часы
/// продвигаем сами (runner их не трогает при ручном run_schedule) —
/// системы читают Res<Time<Fixed>> с delta ровно в один timestep.
pub fn run_fixed_ticks(app: &mut App, ticks: usize) {
    for _ in 0..ticks {
        let timestep = app.world().resource::<Time<Fixed>>().timestep();
        app.world_mut()
            .resource_mut::<Time<Fixed>>()
            .advance_by(timestep);
        app.world_mut().run_schedule(FixedUpdate);
    }
}

/// Snapshot мира для сравнения детерминизма
///
/// Сортировка по Entity ID + сериализация через Debug — достаточно для
/// побайтового сравнения прогонов.
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    let mut snapshot = Vec::new();

    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();

    entities.sort_by_key(|(entity, _)| entity.index());

    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}
