//! Per-tick системы зеркального движка
//!
//! Реестр пар мутируют только эти системы. Остальные домены добавляют
//! объекты исключительно через событие AddTracked (spawner пуль,
//! инициализация уровня) — прямого доступа к карте пар у них нет.

use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

use super::{transform as mirror_transform, MirrorPlane, MirrorVisual, ReflectedPairs};
use crate::components::VisualPrefab;
use crate::logger;

/// Event: взять original на зеркальный учёт
///
/// Повторная регистрация той же сущности игнорируется.
#[derive(Event, Debug, Clone, Copy)]
pub struct AddTracked(pub Entity);

/// System: регистрация новых отражаемых объектов
///
/// Спавнит mirror как минимальный визуальный bundle: Transform +
/// VisualPrefab оригинала + его collider как пассивный sensor. Никаких
/// поведенческих компонентов — это контракт, а не упущение.
///
/// Transform mirror-а берём у оригинала как есть: sync-проход того же
/// тика сразу перепишет его отражённым.
pub fn register_tracked(
    mut events: EventReader<AddTracked>,
    plane: Option<Res<MirrorPlane>>,
    mut pairs: ResMut<ReflectedPairs>,
    originals: Query<(&Transform, Option<&VisualPrefab>, Option<&Collider>), Without<MirrorVisual>>,
    mut commands: Commands,
    mut warned_missing_plane: Local<bool>,
) {
    if plane.is_none() {
        if !*warned_missing_plane {
            logger::log_warning("MirrorPlane not configured, mirroring disabled");
            *warned_missing_plane = true;
        }
        events.clear();
        return;
    }

    for AddTracked(original) in events.read().copied() {
        if pairs.contains(original) {
            continue;
        }

        // Оригинал уже умер между spawn-ом и регистрацией
        let Ok((transform, prefab, collider)) = originals.get(original) else {
            continue;
        };

        let mut mirror = commands.spawn((MirrorVisual { source: original }, *transform));

        if let Some(prefab) = prefab {
            mirror.insert(prefab.clone());
        }
        if let Some(collider) = collider {
            mirror.insert((collider.clone(), Sensor, ActiveEvents::COLLISION_EVENTS));
        }

        let mirror = mirror.id();
        pairs.insert(original, mirror);

        logger::log(&format!(
            "Mirror pair registered: original {:?} → mirror {:?} ({} tracked)",
            original,
            mirror,
            pairs.len()
        ));
    }
}

/// System: sweep мёртвых пар
///
/// Оригиналы уничтожаются кем угодно (коллизии, таймеры) в любой момент —
/// это не ошибка, а штатный режим. Sweep идемпотентен и безопасен каждый
/// тик; наружу StaleHandle никогда не поднимается.
pub fn reap_dead_pairs(
    mut pairs: ResMut<ReflectedPairs>,
    alive: Query<(), With<Transform>>,
    mut commands: Commands,
) {
    let orphaned_mirrors = pairs.sweep(|original| alive.contains(original), |mirror| alive.contains(mirror));

    for mirror in orphaned_mirrors {
        if let Ok(mut entity_commands) = commands.get_entity(mirror) {
            entity_commands.despawn();
            logger::log(&format!("Reaped orphaned mirror {:?}", mirror));
        }
    }
}

/// System: отражение всех зарегистрированных пар
///
/// Сначала farthest-нормализация: максимум |x - mirror_x| по всем живым
/// оригиналам этого тика (fallback-константа, если реестр пуст —
/// знаменатель никогда не ноль). Затем каждому mirror — отражённые
/// position/scale/rotation.
pub fn sync_mirror_transforms(
    plane: Option<Res<MirrorPlane>>,
    pairs: Res<ReflectedPairs>,
    originals: Query<&Transform, Without<MirrorVisual>>,
    mut mirrors: Query<&mut Transform, With<MirrorVisual>>,
    mut warned_missing_plane: Local<bool>,
) {
    let Some(plane) = plane else {
        if !*warned_missing_plane {
            logger::log_warning("MirrorPlane not configured, mirror sync skipped");
            *warned_missing_plane = true;
        }
        return;
    };

    let mut max_distance = 0.0_f32;
    for (original, _) in pairs.iter() {
        if let Ok(transform) = originals.get(original) {
            max_distance = max_distance.max((transform.translation.x - plane.mirror_x).abs());
        }
    }
    if max_distance <= f32::EPSILON {
        max_distance = plane.fallback_max_distance;
    }

    let rotation = plane.rotation_preset();

    for (original, mirror) in pairs.iter() {
        // Умершие между sweep-ами стороны пропускаем — их снимет следующий sweep
        let Ok(source) = originals.get(original) else {
            continue;
        };
        let Ok(mut target) = mirrors.get_mut(mirror) else {
            continue;
        };

        target.translation = mirror_transform::reflect_position(
            source.translation,
            plane.mirror_x,
            plane.x_movement_ratio,
            plane.x_inversion_scale,
            plane.reflected_y_offset,
        );

        let distance = (source.translation.x - plane.mirror_x).abs();
        let multiplier = mirror_transform::normalized_scale(
            distance,
            max_distance,
            plane.scale.min_scale,
            plane.scale.max_scale,
        );
        // Масштабируем X/Y оригинала, Z не трогаем
        target.scale = mirror_transform::reflect_scale(Vec3::new(
            source.scale.x * multiplier,
            source.scale.y * multiplier,
            source.scale.z,
        ));

        target.rotation = rotation;
    }
}
