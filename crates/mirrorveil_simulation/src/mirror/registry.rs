//! Реестр отражённых пар (original → mirror)
//!
//! Владение: mirror-сущности принадлежат зеркальному движку и живут ровно
//! столько, сколько их оригиналы. Оригиналами владеют внешние системы
//! (spawner пуль, авторинг уровня) — реестр держит только ссылки.
//!
//! Жизненный цикл пары:
//! - Active → Orphaned (оригинал despawn-ут извне) → Reaped (mirror
//!   уничтожен sweep-ом, запись удалена)
//! - Active → MirrorLost (mirror уничтожен кем-то ещё) → Reaped (запись
//!   удалена, оригинал продолжает жить без отражения; автоматической
//!   регенерации нет)

use bevy::prelude::*;
use std::collections::BTreeMap;

/// Resource: отображение original → mirror
///
/// BTreeMap, не HashMap: детерминированный порядок обхода при sweep и
/// синхронизации (важно для воспроизводимости headless-прогонов).
/// Инвариант: не более одного mirror на оригинал.
#[derive(Resource, Debug, Default)]
pub struct ReflectedPairs {
    pairs: BTreeMap<Entity, Entity>,
}

impl ReflectedPairs {
    pub fn contains(&self, original: Entity) -> bool {
        self.pairs.contains_key(&original)
    }

    pub fn mirror_of(&self, original: Entity) -> Option<Entity> {
        self.pairs.get(&original).copied()
    }

    /// Регистрирует пару. Повторная регистрация оригинала игнорируется —
    /// инвариант «один mirror на оригинал» важнее свежей записи.
    pub fn insert(&mut self, original: Entity, mirror: Entity) -> bool {
        if self.pairs.contains_key(&original) {
            return false;
        }
        self.pairs.insert(original, mirror);
        true
    }

    /// Явное снятие пары с учёта. Возвращает mirror, который caller
    /// обязан уничтожить (владение mirror-сущностью — за движком).
    pub fn remove(&mut self, original: Entity) -> Option<Entity> {
        self.pairs.remove(&original)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, Entity)> + '_ {
        self.pairs.iter().map(|(k, v)| (*k, *v))
    }

    pub fn originals(&self) -> impl Iterator<Item = Entity> + '_ {
        self.pairs.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Sweep мёртвых записей. Идемпотентен: повторный вызов без изменения
    /// мира ничего не находит.
    ///
    /// - Оригинал мёртв → запись удаляется, его mirror (если ещё жив)
    ///   возвращается на уничтожение
    /// - Жив только оригинал (mirror потерян) → запись удаляется, mirror
    ///   не регенерируется
    ///
    /// Liveness передаётся предикатами — логика тестируется без мира.
    pub fn sweep(
        &mut self,
        original_alive: impl Fn(Entity) -> bool,
        mirror_alive: impl Fn(Entity) -> bool,
    ) -> Vec<Entity> {
        let mut mirrors_to_despawn = Vec::new();
        let mut dead_keys = Vec::new();

        for (&original, &mirror) in self.pairs.iter() {
            if !original_alive(original) {
                if mirror_alive(mirror) {
                    mirrors_to_despawn.push(mirror);
                }
                dead_keys.push(original);
            } else if !mirror_alive(mirror) {
                dead_keys.push(original);
            }
        }

        for key in dead_keys {
            self.pairs.remove(&key);
        }

        mirrors_to_despawn
    }
}
