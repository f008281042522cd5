/////////////////////////////////////////////////////////////////////////////////////////////
//
// Caches interpolation operators keyed on the exact point clouds and settings they came from.
//
// Created on: 19 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # cache
//!
//! Building `H` costs `O(Ns³)` and is the dominant cost of a coupled
//! iteration, while the geometry often stays fixed across iterations. An
//! [`OperatorCache`] reuses an operator only when both point clouds match the
//! ones it was built from bit for bit and the settings are equal. A moved
//! point always misses, so a stale operator is never returned.

use std::{
    collections::{hash_map::DefaultHasher, VecDeque},
    hash::{Hash, Hasher},
    sync::{Arc, Mutex, MutexGuard},
};

use faer::{Mat, MatRef};

use crate::{
    error::TransferResult,
    interpolation_settings::InterpolationSettings,
    operator::InterpolationOperator,
    progress::{emit, ProgressMsg, ProgressSink},
};

/// Default number of operators kept by [`OperatorCache::new`].
pub const DEFAULT_CACHE_CAPACITY: usize = 8;

/// Fingerprint of two point clouds and a set of settings.
///
/// Equal inputs always give equal keys. Different inputs may collide, so the
/// cache also compares the inputs themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperatorKey(u64);

impl OperatorKey {
    pub fn new(
        source_points: MatRef<'_, f64>,
        target_points: MatRef<'_, f64>,
        settings: &InterpolationSettings,
    ) -> Self {
        let mut state = DefaultHasher::new();
        hash_points(source_points, &mut state);
        hash_points(target_points, &mut state);
        settings.fingerprint(&mut state);
        Self(state.finish())
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

fn hash_points<H: Hasher>(points: MatRef<'_, f64>, state: &mut H) {
    points.shape().hash(state);
    for col in points.col_iter() {
        for value in col.iter() {
            value.to_bits().hash(state);
        }
    }
}

fn same_bits(a: MatRef<'_, f64>, b: MatRef<'_, f64>) -> bool {
    a.shape() == b.shape()
        && a.col_iter()
            .zip(b.col_iter())
            .all(|(x, y)| x.iter().zip(y.iter()).all(|(x, y)| x.to_bits() == y.to_bits()))
}

#[derive(Debug)]
struct CacheEntry {
    key: OperatorKey,
    source_points: Mat<f64>,
    target_points: Mat<f64>,
    settings: InterpolationSettings,
    operator: Arc<InterpolationOperator>,
}

impl CacheEntry {
    fn matches(
        &self,
        key: OperatorKey,
        source_points: MatRef<'_, f64>,
        target_points: MatRef<'_, f64>,
        settings: &InterpolationSettings,
    ) -> bool {
        self.key == key
            && same_bits(self.source_points.as_ref(), source_points)
            && same_bits(self.target_points.as_ref(), target_points)
            && &self.settings == settings
    }
}

/// Thread safe, bounded cache of interpolation operators.
///
/// When full, the oldest operator is evicted first. Failed builds are not cached.
#[derive(Debug)]
pub struct OperatorCache {
    capacity: usize,
    entries: Mutex<VecDeque<CacheEntry>>,
    progress_callback: Option<Arc<dyn ProgressSink>>,
}

impl Default for OperatorCache {
    fn default() -> Self {
        Self::new()
    }
}

impl OperatorCache {
    /// Cache holding up to [`DEFAULT_CACHE_CAPACITY`] operators.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Cache holding up to `capacity` operators (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
            progress_callback: None,
        }
    }

    /// Reports hits, misses and builds to `progress_callback`.
    pub fn progress_callback(mut self, progress_callback: Arc<dyn ProgressSink>) -> Self {
        self.progress_callback = Some(progress_callback);
        self
    }

    /// Returns the operator for these inputs, building and storing it on a miss.
    ///
    /// # Errors
    /// Any error of [`build_interpolation`](crate::build_interpolation).
    pub fn get_or_build(
        &self,
        source_points: MatRef<'_, f64>,
        target_points: MatRef<'_, f64>,
        settings: &InterpolationSettings,
    ) -> TransferResult<Arc<InterpolationOperator>> {
        let key = OperatorKey::new(source_points, target_points, settings);

        if let Some(operator) = self.lookup(key, source_points, target_points, settings) {
            emit(&self.progress_callback, || ProgressMsg::CacheHit { key: key.value() });
            return Ok(operator);
        }

        emit(&self.progress_callback, || ProgressMsg::CacheMiss { key: key.value() });

        let mut builder =
            InterpolationOperator::builder(source_points, target_points, settings.clone());
        if let Some(sink) = &self.progress_callback {
            builder = builder.progress_callback(sink.clone());
        }
        let operator = Arc::new(builder.build()?);

        let mut entries = self.entries();
        // Another thread may have stored the same operator meanwhile.
        if let Some(existing) = entries
            .iter()
            .find(|e| e.matches(key, source_points, target_points, settings))
        {
            return Ok(existing.operator.clone());
        }

        entries.push_back(CacheEntry {
            key,
            source_points: source_points.to_owned(),
            target_points: target_points.to_owned(),
            settings: settings.clone(),
            operator: operator.clone(),
        });
        while entries.len() > self.capacity {
            entries.pop_front();
        }

        Ok(operator)
    }

    fn lookup(
        &self,
        key: OperatorKey,
        source_points: MatRef<'_, f64>,
        target_points: MatRef<'_, f64>,
        settings: &InterpolationSettings,
    ) -> Option<Arc<InterpolationOperator>> {
        self.entries()
            .iter()
            .find(|e| e.matches(key, source_points, target_points, settings))
            .map(|e| e.operator.clone())
    }

    /// Drops every cached operator.
    pub fn invalidate(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn entries(&self) -> MutexGuard<'_, VecDeque<CacheEntry>> {
        // Entries are only ever replaced whole, so a poisoned lock is still consistent.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::tests::RecordingSink;
    use crate::generate_random_points;
    use aerostruct_rbf_utils::KernelType;
    use equator::assert;

    #[test]
    fn identical_inputs_hit_the_cache() {
        let cache = OperatorCache::new();
        let source = generate_random_points(10, 3, Some(600));
        let target = generate_random_points(4, 3, Some(601));
        let settings = InterpolationSettings::default();

        let first = cache.get_or_build(source.as_ref(), target.as_ref(), &settings).unwrap();
        let second = cache.get_or_build(source.as_ref(), target.as_ref(), &settings).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(cache.len() == 1);
    }

    #[test]
    fn moving_a_point_rebuilds_the_operator() {
        let cache = OperatorCache::new();
        let source = generate_random_points(10, 3, Some(610));
        let target = generate_random_points(4, 3, Some(611));
        let settings = InterpolationSettings::default();

        let before = cache.get_or_build(source.as_ref(), target.as_ref(), &settings).unwrap();

        let mut moved = source.clone();
        moved[(3, 1)] += 1e-9;
        let after = cache.get_or_build(moved.as_ref(), target.as_ref(), &settings).unwrap();

        assert!(!Arc::ptr_eq(&before, &after));
        assert!(before.matrix() != after.matrix());
        assert!(cache.len() == 2);

        let mut moved_target = target.clone();
        moved_target[(0, 2)] -= 1e-9;
        let retargeted = cache
            .get_or_build(source.as_ref(), moved_target.as_ref(), &settings)
            .unwrap();
        assert!(!Arc::ptr_eq(&before, &retargeted));
    }

    #[test]
    fn settings_are_part_of_the_key() {
        let cache = OperatorCache::new();
        let source = generate_random_points(8, 3, Some(620));
        let target = generate_random_points(3, 3, Some(621));

        let a = InterpolationSettings::default();
        let b = InterpolationSettings::builder(KernelType::Multiquadric)
            .bias([1.0, 0.5, 1.0])
            .build();
        assert!(
            OperatorKey::new(source.as_ref(), target.as_ref(), &a)
                != OperatorKey::new(source.as_ref(), target.as_ref(), &b)
        );

        let first = cache.get_or_build(source.as_ref(), target.as_ref(), &a).unwrap();
        let second = cache.get_or_build(source.as_ref(), target.as_ref(), &b).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn signed_zero_is_a_different_cloud() {
        let source = faer::mat![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0f64],
        ];
        let mut flipped = source.clone();
        flipped[(0, 0)] = -0.0;
        assert!(!same_bits(source.as_ref(), flipped.as_ref()));
    }

    #[test]
    fn invalidate_and_eviction() {
        let cache = OperatorCache::with_capacity(2);
        let target = generate_random_points(3, 3, Some(630));
        let settings = InterpolationSettings::default();
        let clouds: Vec<_> = (0..3)
            .map(|i| generate_random_points(6, 3, Some(640 + i)))
            .collect();

        let oldest = cache.get_or_build(clouds[0].as_ref(), target.as_ref(), &settings).unwrap();
        cache.get_or_build(clouds[1].as_ref(), target.as_ref(), &settings).unwrap();
        cache.get_or_build(clouds[2].as_ref(), target.as_ref(), &settings).unwrap();
        assert!(cache.len() == 2);

        // The first cloud was evicted.
        let rebuilt = cache.get_or_build(clouds[0].as_ref(), target.as_ref(), &settings).unwrap();
        assert!(!Arc::ptr_eq(&oldest, &rebuilt));

        cache.invalidate();
        assert!(cache.is_empty());
    }

    #[test]
    fn failed_builds_are_not_cached() {
        let cache = OperatorCache::new();
        let coincident = faer::mat![[0.0, 0.0, 0.0], [0.0, 0.0, 0.0f64]];
        let settings = InterpolationSettings::default();

        assert!(cache
            .get_or_build(coincident.as_ref(), coincident.as_ref(), &settings)
            .is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn reports_hits_and_misses() {
        let sink = Arc::new(RecordingSink::default());
        let cache = OperatorCache::new().progress_callback(sink.clone());
        let source = generate_random_points(6, 3, Some(650));
        let settings = InterpolationSettings::default();

        cache.get_or_build(source.as_ref(), source.as_ref(), &settings).unwrap();
        cache.get_or_build(source.as_ref(), source.as_ref(), &settings).unwrap();

        let messages = sink.messages.lock().unwrap();
        let misses = messages.iter().filter(|m| matches!(m, ProgressMsg::CacheMiss { .. })).count();
        let hits = messages.iter().filter(|m| matches!(m, ProgressMsg::CacheHit { .. })).count();
        let builds = messages
            .iter()
            .filter(|m| matches!(m, ProgressMsg::OperatorBuilt { .. }))
            .count();
        assert!(all(misses == 1, hits == 1, builds == 1));
    }

    #[test]
    fn cache_is_shareable_between_threads() {
        let cache = Arc::new(OperatorCache::new());
        let source = Arc::new(generate_random_points(8, 3, Some(660)));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                let source = source.clone();
                std::thread::spawn(move || {
                    let points = Mat::as_ref(&source);
                    cache
                        .get_or_build(points, points, &InterpolationSettings::default())
                        .unwrap()
                })
            })
            .collect();

        let operators: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(cache.len() == 1);
        for op in &operators {
            assert!(op.matrix().shape() == (8, 8));
        }
    }
}
