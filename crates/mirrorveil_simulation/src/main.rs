//! Headless симуляция MIRRORVEIL
//!
//! Собирает демо-уровень из LevelConfig (препятствия расставляются
//! seeded RNG-ом) и детерминированно прогоняет фиксированное число тиков.

use bevy::prelude::*;
use rand::Rng;

use mirrorveil_simulation::{
    components, config::LevelConfig, create_headless_app, guard, level, mirror::AddTracked,
    mirror::MirrorPlane, player, run_fixed_ticks, shadow, DeterministicRng,
};

fn main() {
    let seed = 42;
    println!("Starting MIRRORVEIL headless simulation (seed: {})", seed);

    let mut app = create_headless_app(seed);

    let config = LevelConfig::default().sanitized();
    config.install(&mut app);

    spawn_demo_level(&mut app, &config);

    // Инициализация schedules, дальше — ручные fixed-тики
    app.update();

    for tick in 0..1000 {
        run_fixed_ticks(&mut app, 1);

        if tick % 100 == 0 {
            let entity_count = app.world().entities().len();
            println!("Tick {}: {} entities", tick, entity_count);
        }
    }

    println!("Simulation complete!");
}

/// Демо-уровень: игрок справа от зеркала, тень слева, guard с trigger-зоной,
/// стены по периметру, exit-зона и несколько случайных препятствий
fn spawn_demo_level(app: &mut App, config: &LevelConfig) {
    let plane = app.world().resource::<MirrorPlane>().clone();
    let world = app.world_mut();

    let player_entity = world.spawn(player::player_bundle(&config.player)).id();
    world.spawn(shadow::shadow_bundle(&config.shadow, &plane, &config.player));

    // Игрок идёт к зеркалу — тень и farthest-нормализация живут
    world
        .get_mut::<components::MovementInput>(player_entity)
        .unwrap()
        .direction = Vec2::new(-1.0, 0.4);

    // Без physics bridge trigger-зона не сработает — guard активен сразу,
    // зона остаётся как авторинг сцены
    let guard_entity = world
        .spawn(guard::guard_bundle(
            &config.guard,
            &config.bullet,
            Vec2::new(8.0, 3.0),
            player_entity,
            true,
        ))
        .id();
    world.spawn(guard::trigger_zone_bundle(
        Vec2::new(3.0, 0.0),
        Vec2::new(0.1, 6.0),
        guard_entity,
    ));

    // Периметр
    world.spawn(components::wall_bundle(Vec2::new(0.0, 6.0), Vec2::new(12.0, 0.5)));
    world.spawn(components::wall_bundle(Vec2::new(0.0, -6.0), Vec2::new(12.0, 0.5)));
    world.spawn(components::wall_bundle(Vec2::new(12.0, 0.0), Vec2::new(0.5, 6.0)));
    world.spawn(components::wall_bundle(Vec2::new(-12.0, 0.0), Vec2::new(0.5, 6.0)));
    world.spawn(components::mirror_surface_bundle(plane.mirror_x, 6.0));

    world.spawn(level::exit_zone_bundle(Vec2::new(9.5, -4.0), Vec2::new(0.5, 1.0), true));

    // Препятствия на теневой стороне, позиции — из seeded RNG
    let mut positions = Vec::new();
    {
        let mut rng = world.resource_mut::<DeterministicRng>();
        for _ in 0..3 {
            let x = rng.rng.gen_range(-8.0..-2.0);
            let y = rng.rng.gen_range(-4.0..4.0);
            positions.push(Vec2::new(x, y));
        }
    }
    let mut hazards = Vec::new();
    for position in positions {
        hazards.push(
            world
                .spawn(shadow::obstacle_bundle(position, Vec2::new(0.4, 0.4)))
                .id(),
        );
    }

    // Hazard-способные объекты сцены — на зеркальный учёт
    hazards.push(guard_entity);
    for hazard in hazards {
        world.send_event(AddTracked(hazard));
    }
}
