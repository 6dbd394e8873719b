//! Интеграционные тесты зеркального мира
//!
//! Полный headless App, тики — детерминированно через run_fixed_ticks
//! (wall-clock не участвует). Overlap-события пишем в мир руками — так же
//! их доставляет physics bridge в полной сборке.

use bevy::prelude::*;
use bevy_rapier2d::rapier::geometry::CollisionEventFlags;
use bevy_rapier2d::prelude::*;

use mirrorveil_simulation::{
    components::{MovementInput, VisualPrefab},
    config::{BoundsConfig, LevelConfig},
    create_headless_app,
    guard::{self, Bullet},
    level::{self, GameState},
    mirror::{AddTracked, MirrorPlane, MirrorVisual, ReflectedPairs},
    player::{self, Player, PlayerHit},
    run_fixed_ticks,
    shadow::{self, Shadow, ShadowObstacleState},
};

/// Конфиг с симметричными границами игрока (для проверки обеих сторон зеркала)
fn test_config() -> LevelConfig {
    let mut config = LevelConfig::default();
    config.player.bounds = BoundsConfig {
        min_x: -10.0,
        max_x: 10.0,
        min_y: -5.0,
        max_y: 5.0,
    };
    config.player.spawn = [4.0, 0.0];
    config.sanitized()
}

/// App + игрок + тень; один app.update() для инициализации schedules,
/// дальше только ручные fixed-тики
fn setup(config: &LevelConfig) -> (App, Entity, Entity) {
    let mut app = create_headless_app(7);
    config.install(&mut app);

    let plane = app.world().resource::<MirrorPlane>().clone();
    let player_entity = app
        .world_mut()
        .spawn(player::player_bundle(&config.player))
        .id();
    let shadow_entity = app
        .world_mut()
        .spawn(shadow::shadow_bundle(&config.shadow, &plane, &config.player))
        .id();

    app.update();

    (app, player_entity, shadow_entity)
}

fn translation(app: &App, entity: Entity) -> Vec3 {
    app.world().get::<Transform>(entity).unwrap().translation
}

#[test]
fn test_shadow_mirrors_player_position() {
    let config = test_config();
    let (mut app, player_entity, shadow_entity) = setup(&config);

    // Игрок на x=4 → цель тени x=-4
    run_fixed_ticks(&mut app, 1);
    let shadow_pos = translation(&app, shadow_entity);
    assert!((shadow_pos.x - (-4.0)).abs() < 1e-4, "x = {}", shadow_pos.x);
    assert!(shadow_pos.y.abs() < 1e-4);

    // Ведём игрока влево до x=-2 → тень уходит на x=2
    app.world_mut()
        .get_mut::<MovementInput>(player_entity)
        .unwrap()
        .direction = Vec2::new(-1.0, 0.0);
    // 6 единиц пути при speed=5: 72 тика
    run_fixed_ticks(&mut app, 72);

    let player_pos = translation(&app, player_entity);
    let shadow_pos = translation(&app, shadow_entity);
    assert!((player_pos.x - (-2.0)).abs() < 1e-2, "player x = {}", player_pos.x);
    assert!((shadow_pos.x - 2.0).abs() < 1e-2, "shadow x = {}", shadow_pos.x);
}

#[test]
fn test_player_clamped_to_bounds_and_push_follows() {
    let config = test_config();
    let (mut app, player_entity, shadow_entity) = setup(&config);

    // Гоним игрока вправо дольше, чем позволяют границы
    app.world_mut()
        .get_mut::<MovementInput>(player_entity)
        .unwrap()
        .direction = Vec2::new(1.0, 0.0);
    run_fixed_ticks(&mut app, 200);

    let player_pos = translation(&app, player_entity);
    assert!((player_pos.x - 10.0).abs() < 1e-3, "player x = {}", player_pos.x);

    // Тень отражает clamped-позицию, не «идеальную»
    let shadow_pos = translation(&app, shadow_entity);
    assert!((shadow_pos.x - (-10.0)).abs() < 1e-3, "shadow x = {}", shadow_pos.x);
}

#[test]
fn test_shadow_scale_shrinks_as_player_leaves_mirror() {
    let config = test_config();
    let (mut app, player_entity, shadow_entity) = setup(&config);

    app.world_mut()
        .get_mut::<MovementInput>(player_entity)
        .unwrap()
        .direction = Vec2::new(1.0, 0.0);
    run_fixed_ticks(&mut app, 300);

    // Игрок на max_x (дальше всего от зеркала) → scale тени у min_scale
    let scale = app.world().get::<Transform>(shadow_entity).unwrap().scale;
    assert!(scale.x > 0.0);
    assert!(scale.x < 0.5, "scale.x = {}", scale.x);
    assert!(scale.x >= config.shadow.scale.min_scale - 1e-3);
}

#[test]
fn test_mirror_pair_created_and_reaped() {
    let config = test_config();
    let (mut app, _, _) = setup(&config);

    let obstacle = app
        .world_mut()
        .spawn((
            Transform::from_translation(Vec3::new(-3.0, 1.0, 0.0)),
            VisualPrefab::new("res://hazards/crate.tscn"),
        ))
        .id();
    app.world_mut().send_event(AddTracked(obstacle));
    run_fixed_ticks(&mut app, 1);

    let mirror = app
        .world()
        .resource::<ReflectedPairs>()
        .mirror_of(obstacle)
        .expect("pair registered");

    // Отражение: x=-3 → x=3, y без offset-а, scale.x принудительно < 0
    let mirror_transform = *app.world().get::<Transform>(mirror).unwrap();
    assert!((mirror_transform.translation.x - 3.0).abs() < 1e-4);
    assert!((mirror_transform.translation.y - 1.0).abs() < 1e-4);
    assert!(mirror_transform.scale.x < 0.0);

    // Mirror — визуальный: prefab скопирован, поведения нет
    assert!(app.world().get::<VisualPrefab>(mirror).is_some());
    assert!(app.world().get::<MirrorVisual>(mirror).is_some());

    // Оригинал уничтожен извне → mirror снят одним sweep-ом
    app.world_mut().despawn(obstacle);
    run_fixed_ticks(&mut app, 1);

    assert!(!app.world().resource::<ReflectedPairs>().contains(obstacle));
    assert!(!app.world().entities().contains(mirror));
}

#[test]
fn test_add_tracked_skips_already_registered() {
    let config = test_config();
    let (mut app, _, _) = setup(&config);

    let obstacle = app
        .world_mut()
        .spawn(Transform::from_translation(Vec3::new(-2.0, 0.0, 0.0)))
        .id();
    app.world_mut().send_event(AddTracked(obstacle));
    app.world_mut().send_event(AddTracked(obstacle));
    run_fixed_ticks(&mut app, 2);

    assert_eq!(app.world().resource::<ReflectedPairs>().len(), 1);
}

#[test]
fn test_damage_cooldown_gates_life_loss() {
    let config = test_config();
    let (mut app, player_entity, _) = setup(&config);

    // Первый удар проходит: 3 → 2
    app.world_mut().send_event(PlayerHit);
    run_fixed_ticks(&mut app, 1);
    assert_eq!(app.world().get::<Player>(player_entity).unwrap().lives, 2);

    // Удар внутри cooldown-окна (1.0 сек) — no-op
    app.world_mut().send_event(PlayerHit);
    run_fixed_ticks(&mut app, 1);
    assert_eq!(app.world().get::<Player>(player_entity).unwrap().lives, 2);

    // После окна — проходит: 2 → 1
    run_fixed_ticks(&mut app, 61);
    app.world_mut().send_event(PlayerHit);
    run_fixed_ticks(&mut app, 1);
    assert_eq!(app.world().get::<Player>(player_entity).unwrap().lives, 1);
}

#[test]
fn test_player_death_restarts_level() {
    let mut config = test_config();
    config.player.lives = 1;
    config.outcome.player_death_restart_delay = 0.1;
    let config = config.sanitized();
    let (mut app, player_entity, shadow_entity) = setup(&config);

    // Уводим игрока с точки старта и оставляем «мусор» раунда
    app.world_mut()
        .get_mut::<Transform>(player_entity)
        .unwrap()
        .translation = Vec3::new(7.0, 2.0, 0.0);
    let stray_bullet = app
        .world_mut()
        .spawn((Bullet, Transform::from_translation(Vec3::new(5.0, 5.0, 0.0))))
        .id();

    app.world_mut().send_event(PlayerHit);
    run_fixed_ticks(&mut app, 1);

    let player = app.world().get::<Player>(player_entity).unwrap();
    assert!(!player.alive);
    assert!(app.world().resource::<GameState>().game_over);

    // Рестарт: 0.1 сек → 6 тиков + тик на доставку reset-событий
    run_fixed_ticks(&mut app, 8);

    let player = app.world().get::<Player>(player_entity).unwrap();
    assert!(player.alive);
    assert_eq!(player.lives, 1);

    let player_pos = translation(&app, player_entity);
    assert!((player_pos.x - 4.0).abs() < 1e-4);
    assert!((player_pos.y - 0.0).abs() < 1e-4);

    // Тень вернулась на отражённый старт, мусор раунда вычищен
    let shadow_pos = translation(&app, shadow_entity);
    assert!((shadow_pos.x - (-4.0)).abs() < 1e-4);
    assert!(!app.world().entities().contains(stray_bullet));
    assert!(!app.world().resource::<GameState>().game_over);
}

#[test]
fn test_obstacle_duplicate_lifecycle() {
    let config = test_config();
    let (mut app, _, shadow_entity) = setup(&config);

    let obstacle = app
        .world_mut()
        .spawn(shadow::obstacle_bundle(Vec2::new(-3.0, 0.0), Vec2::new(0.4, 0.4)))
        .id();

    // Overlap begin → появляется static-дубликат справа от зеркала
    app.world_mut().send_event(CollisionEvent::Started(
        shadow_entity,
        obstacle,
        CollisionEventFlags::SENSOR,
    ));
    run_fixed_ticks(&mut app, 1);

    let state = *app
        .world()
        .get::<ShadowObstacleState>(shadow_entity)
        .unwrap();
    let duplicate = state.active.expect("duplicate spawned");

    // ratio=1: x = 0 + (0 - (-3)) / 1 = 3; scale поделен на 0.7 и X инвертирован
    let dup_transform = *app.world().get::<Transform>(duplicate).unwrap();
    assert!((dup_transform.translation.x - 3.0).abs() < 1e-4);
    assert!((dup_transform.scale.x - (-1.0 / 0.7)).abs() < 1e-3);
    assert!((dup_transform.scale.y - 1.0 / 0.7).abs() < 1e-3);

    // Overlap end → удаление с grace-задержкой 0.2 сек (не мгновенно)
    app.world_mut().send_event(CollisionEvent::Stopped(
        shadow_entity,
        obstacle,
        CollisionEventFlags::SENSOR,
    ));
    run_fixed_ticks(&mut app, 1);
    assert!(app.world().entities().contains(duplicate));

    run_fixed_ticks(&mut app, 14);
    assert!(!app.world().entities().contains(duplicate));

    let state = *app
        .world()
        .get::<ShadowObstacleState>(shadow_entity)
        .unwrap();
    assert!(state.active.is_none());
    assert!(state.pending_despawn.is_none());
}

#[test]
fn test_new_overlap_supersedes_pending_duplicate() {
    let config = test_config();
    let (mut app, _, shadow_entity) = setup(&config);

    let obstacle = app
        .world_mut()
        .spawn(shadow::obstacle_bundle(Vec2::new(-3.0, 0.0), Vec2::new(0.4, 0.4)))
        .id();

    app.world_mut().send_event(CollisionEvent::Started(
        shadow_entity,
        obstacle,
        CollisionEventFlags::SENSOR,
    ));
    run_fixed_ticks(&mut app, 1);
    let first_duplicate = app
        .world()
        .get::<ShadowObstacleState>(shadow_entity)
        .unwrap()
        .active
        .expect("first duplicate");

    app.world_mut().send_event(CollisionEvent::Stopped(
        shadow_entity,
        obstacle,
        CollisionEventFlags::SENSOR,
    ));
    run_fixed_ticks(&mut app, 1);

    // Новый overlap ДО истечения grace: старый дубликат умирает сразу,
    // активный снова ровно один
    app.world_mut().send_event(CollisionEvent::Started(
        shadow_entity,
        obstacle,
        CollisionEventFlags::SENSOR,
    ));
    run_fixed_ticks(&mut app, 1);

    let state = *app
        .world()
        .get::<ShadowObstacleState>(shadow_entity)
        .unwrap();
    let second_duplicate = state.active.expect("second duplicate");
    assert_ne!(first_duplicate, second_duplicate);
    assert!(state.pending_despawn.is_none());
    assert!(!app.world().entities().contains(first_duplicate));
}

#[test]
fn test_guard_fires_tracked_bullet() {
    let config = test_config();
    let (mut app, player_entity, _) = setup(&config);

    let guard_entity = app
        .world_mut()
        .spawn(guard::guard_bundle(
            &config.guard,
            &config.bullet,
            Vec2::new(8.0, 3.0),
            player_entity,
            true,
        ))
        .id();
    run_fixed_ticks(&mut app, 1);

    // Один выстрел (cooldown стартовал), пуля на зеркальном учёте
    let mut bullets = app.world_mut().query_filtered::<Entity, With<Bullet>>();
    let bullets: Vec<Entity> = bullets.iter(app.world()).collect();
    assert_eq!(bullets.len(), 1);

    let pairs = app.world().resource::<ReflectedPairs>();
    let mirror = pairs.mirror_of(bullets[0]).expect("bullet mirrored");
    assert_eq!(pairs.len(), 1);

    // Cooldown: за следующие полсекунды второй пули нет
    run_fixed_ticks(&mut app, 30);
    let mut query = app.world_mut().query_filtered::<Entity, With<Bullet>>();
    assert_eq!(query.iter(app.world()).count(), 1);

    // Пуля летит к игроку (влево-вниз от точки выстрела)
    let bullet_pos = translation(&app, bullets[0]);
    assert!(bullet_pos.x < 8.0);
    assert!(bullet_pos.y < 3.5);

    // Mirror повторяет пулю на другой стороне
    let mirror_pos = translation(&app, mirror);
    assert!((mirror_pos.x - (-bullet_pos.x)).abs() < 1e-3);

    // Попадание: жизнь теряется, пуля умирает, mirror реапится за тик
    app.world_mut().send_event(CollisionEvent::Started(
        bullets[0],
        player_entity,
        CollisionEventFlags::SENSOR,
    ));
    run_fixed_ticks(&mut app, 1);

    assert_eq!(app.world().get::<Player>(player_entity).unwrap().lives, 2);
    assert!(!app.world().entities().contains(bullets[0]));

    run_fixed_ticks(&mut app, 1);
    assert!(app.world().resource::<ReflectedPairs>().is_empty());
    assert!(!app.world().entities().contains(mirror));

    let _ = guard_entity;
}

#[test]
fn test_trigger_zone_activates_guard() {
    let config = test_config();
    let (mut app, player_entity, _) = setup(&config);

    let guard_entity = app
        .world_mut()
        .spawn(guard::guard_bundle(
            &config.guard,
            &config.bullet,
            Vec2::new(8.0, 3.0),
            player_entity,
            false,
        ))
        .id();
    let zone = app
        .world_mut()
        .spawn(guard::trigger_zone_bundle(
            Vec2::new(3.0, 0.0),
            Vec2::new(0.1, 6.0),
            guard_entity,
        ))
        .id();

    // Неактивированный guard молчит
    run_fixed_ticks(&mut app, 5);
    let mut bullets = app.world_mut().query_filtered::<Entity, With<Bullet>>();
    assert_eq!(bullets.iter(app.world()).count(), 0);

    // Игрок пересёк trigger line → guard стреляет
    app.world_mut().send_event(CollisionEvent::Started(
        player_entity,
        zone,
        CollisionEventFlags::SENSOR,
    ));
    run_fixed_ticks(&mut app, 1);

    assert!(app.world().get::<guard::Guard>(guard_entity).unwrap().activated);
    let mut bullets = app.world_mut().query_filtered::<Entity, With<Bullet>>();
    assert_eq!(bullets.iter(app.world()).count(), 1);
}

#[test]
fn test_reflected_bullet_kills_shadow() {
    let config = test_config();
    let (mut app, _, shadow_entity) = setup(&config);

    // Пуля на стороне игрока, её mirror окажется на стороне тени
    let bullet = app
        .world_mut()
        .spawn((Bullet, Transform::from_translation(Vec3::new(4.0, 0.0, 0.0))))
        .id();
    app.world_mut().send_event(AddTracked(bullet));
    run_fixed_ticks(&mut app, 1);

    let mirror = app
        .world()
        .resource::<ReflectedPairs>()
        .mirror_of(bullet)
        .expect("bullet mirrored");

    app.world_mut().send_event(CollisionEvent::Started(
        shadow_entity,
        mirror,
        CollisionEventFlags::SENSOR,
    ));
    run_fixed_ticks(&mut app, 1);

    let shadow = app.world().get::<Shadow>(shadow_entity).unwrap();
    assert!(!shadow.alive);
    assert!(app.world().resource::<GameState>().game_over);

    // Мёртвая тень замерзает: позиция не следует за игроком
    let frozen = translation(&app, shadow_entity);
    run_fixed_ticks(&mut app, 5);
    assert_eq!(translation(&app, shadow_entity), frozen);
}

#[test]
fn test_exit_zone_completes_level_when_both_alive() {
    let config = test_config();
    let (mut app, player_entity, shadow_entity) = setup(&config);

    let zone = app
        .world_mut()
        .spawn(level::exit_zone_bundle(Vec2::new(9.5, -4.0), Vec2::new(0.5, 1.0), true))
        .id();

    // Один игрок в зоне — победы нет
    app.world_mut().send_event(CollisionEvent::Started(
        zone,
        player_entity,
        CollisionEventFlags::SENSOR,
    ));
    run_fixed_ticks(&mut app, 1);
    assert!(!app.world().resource::<GameState>().level_complete);

    // Пришла тень — уровень пройден
    app.world_mut().send_event(CollisionEvent::Started(
        zone,
        shadow_entity,
        CollisionEventFlags::SENSOR,
    ));
    run_fixed_ticks(&mut app, 1);
    assert!(app.world().resource::<GameState>().level_complete);
}

#[test]
fn test_mirroring_disabled_without_plane() {
    // MirrorPlane не сконфигурирован: движок молчит, ничего не падает
    let mut app = create_headless_app(7);
    let config = test_config();

    let player_entity = app
        .world_mut()
        .spawn(player::player_bundle(&config.player))
        .id();

    let obstacle = app
        .world_mut()
        .spawn(Transform::from_translation(Vec3::new(-2.0, 0.0, 0.0)))
        .id();
    app.update();

    app.world_mut().send_event(AddTracked(obstacle));
    run_fixed_ticks(&mut app, 3);

    assert!(app.world().resource::<ReflectedPairs>().is_empty());
    // Игрок живёт обычной жизнью
    assert!(app.world().get::<Player>(player_entity).unwrap().alive);
}
