//! The per-step orchestrator.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use granule_arena::{Arena, WeakRef};
use granule_core::SlotId;
use granule_pool::ThreadPool;
use granule_space::{CollisionGrid, Positioned};
use smallvec::SmallVec;

use crate::config::{ConfigError, WorldConfig};
use crate::metrics::{GridStats, StepMetrics};

/// Broad-phase candidates around one object.
pub type NeighbourIds = SmallVec<[SlotId; 36]>;

/// Objects in an arena, a collision grid over them, and a pool to drive
/// both.
///
/// Each [`step`](Self::step):
///
/// 1. clears the grid and repopulates it from current positions, one
///    stripe of columns per worker, so no two workers ever write the same
///    cell;
/// 2. runs the caller's update over the dense object storage, split into
///    one contiguous range per worker.
///
/// Grid entries are dense indices into the arena as of the last rebuild.
/// Spawning and despawning between rebuilds leaves the grid stale until the
/// next one. [`neighbours_of`](Self::neighbours_of) skips entries past the
/// end of the dense storage, but a despawn that moved another object into a
/// recorded index is only reflected after the next rebuild.
pub struct ParticleWorld<T> {
    arena: Arena<T>,
    grid: CollisionGrid,
    pool: ThreadPool,
    margin: f32,
    last_metrics: StepMetrics,
}

impl<T> ParticleWorld<T>
where
    T: Positioned + Send + Sync,
{
    /// Validate `config` and build the world, starting its workers.
    pub fn new(config: WorldConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let grid = CollisionGrid::from_config(&config.grid())?;
        let pool = ThreadPool::new(&config.pool)?;
        Ok(Self {
            arena: Arena::from_config(&config.arena),
            grid,
            pool,
            margin: config.margin,
            last_metrics: StepMetrics::default(),
        })
    }

    // ── Objects ─────────────────────────────────────────────────

    /// Add an object.
    pub fn spawn(&mut self, value: T) -> SlotId {
        self.arena.allocate(value)
    }

    /// Remove an object. Returns `None` if it was already gone.
    pub fn despawn(&mut self, id: SlotId) -> Option<T> {
        self.arena.erase(id)
    }

    /// The live object named by `id`.
    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.arena.get(id)
    }

    /// The live object named by `id`, mutably.
    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.arena.get_mut(id)
    }

    /// A weak reference to the live object named by `id`.
    pub fn weak_ref(&self, id: SlotId) -> Option<WeakRef<T>> {
        self.arena.weak_ref(id)
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Whether there are no live objects.
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// The object storage.
    pub fn arena(&self) -> &Arena<T> {
        &self.arena
    }

    /// The object storage, mutably.
    pub fn arena_mut(&mut self) -> &mut Arena<T> {
        &mut self.arena
    }

    /// The collision grid as of the last rebuild.
    pub fn grid(&self) -> &CollisionGrid {
        &self.grid
    }

    /// The worker pool.
    pub fn pool(&self) -> &ThreadPool {
        &self.pool
    }

    /// Metrics from the most recent [`step`](Self::step).
    pub fn last_metrics(&self) -> &StepMetrics {
        &self.last_metrics
    }

    // ── Phases ──────────────────────────────────────────────────

    /// Clear the grid and insert every object that lies inside the border
    /// margin, keyed by its dense index.
    ///
    /// Objects are first bucketed by column stripe in one serial pass, so the
    /// whole rebuild reads each object once. Workers then fill their own
    /// stripes from their buckets in dense order, which keeps the result
    /// independent of the thread count.
    pub fn rebuild_grid(&mut self) -> GridStats {
        self.grid.clear();
        let objects = self.arena.as_slice();
        let bounds = Interior::new(self.grid.width(), self.grid.height(), self.margin);

        let threads = self.pool.thread_count().max(1);
        let stripes = match self.grid.column_stripes_mut(threads) {
            Ok(stripes) => stripes,
            Err(err) => {
                tracing::warn!(%err, "grid rebuild skipped");
                return GridStats {
                    skipped: objects.len(),
                    ..GridStats::default()
                };
            }
        };
        let starts: Vec<u32> = stripes.iter().map(|s| s.columns().start).collect();

        let mut buckets: Vec<Vec<(u32, u32, u32)>> = vec![Vec::new(); stripes.len()];
        let mut skipped = 0;
        for (dense, object) in objects.iter().enumerate() {
            let Some((x, y)) = bounds.cell_of(object.position()) else {
                skipped += 1;
                continue;
            };
            let owner = starts.partition_point(|&start| start <= x).saturating_sub(1);
            buckets[owner].push((x, y, dense as u32));
        }

        let inserted = AtomicUsize::new(0);
        let mut work: Vec<_> = stripes.into_iter().zip(buckets).collect();
        self.pool.dispatch_slice_mut(&mut work, |_, chunk| {
            for (stripe, bucket) in chunk {
                let mut landed = 0;
                for &(x, y, dense) in bucket.iter() {
                    if stripe.add_atom(x, y, dense) {
                        landed += 1;
                    }
                }
                inserted.fetch_add(landed, Ordering::Relaxed);
            }
        });
        drop(work);

        let stats = GridStats {
            inserted: inserted.into_inner(),
            dropped: self.grid.overflow_count() as usize,
            skipped,
        };
        tracing::trace!(
            inserted = stats.inserted,
            dropped = stats.dropped,
            skipped = stats.skipped,
            "grid rebuilt"
        );
        stats
    }

    /// Apply `f` to every live object, in parallel over contiguous ranges
    /// of the dense storage.
    pub fn update<F>(&mut self, f: F)
    where
        F: Fn(&mut T) + Sync,
    {
        self.pool
            .dispatch_slice_mut(self.arena.as_mut_slice(), |_, chunk| {
                chunk.iter_mut().for_each(&f);
            });
    }

    /// Live objects sharing the 3x3 block of cells around `id`, excluding
    /// `id` itself, as recorded by the last rebuild.
    ///
    /// Empty if `id` is not live or was outside the interior.
    pub fn neighbours_of(&self, id: SlotId) -> NeighbourIds {
        let mut out = NeighbourIds::new();
        let Some(object) = self.arena.get(id) else {
            return out;
        };
        let bounds = Interior::new(self.grid.width(), self.grid.height(), self.margin);
        let Some((x, y)) = bounds.cell_of(object.position()) else {
            return out;
        };
        for dense in self.grid.neighbours(x, y) {
            if let Some(other) = self.arena.id_at(dense as usize) {
                if other != id {
                    out.push(other);
                }
            }
        }
        out
    }

    /// Rebuild the grid, then run `f` over every object.
    pub fn step<F>(&mut self, f: F) -> StepMetrics
    where
        F: Fn(&mut T) + Sync,
    {
        let start = Instant::now();
        let object_count = self.arena.len();

        let rebuild_start = Instant::now();
        let stats = self.rebuild_grid();
        let grid_rebuild_us = rebuild_start.elapsed().as_micros() as u64;

        let update_start = Instant::now();
        self.update(f);
        let update_us = update_start.elapsed().as_micros() as u64;

        self.last_metrics = StepMetrics {
            total_us: start.elapsed().as_micros() as u64,
            grid_rebuild_us,
            update_us,
            object_count,
            grid_inserted: stats.inserted,
            grid_dropped: stats.dropped,
            grid_skipped: stats.skipped,
        };
        self.last_metrics.clone()
    }
}

impl<T> std::fmt::Debug for ParticleWorld<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticleWorld")
            .field("objects", &self.arena.len())
            .field("grid", &self.grid)
            .field("pool", &self.pool)
            .field("margin", &self.margin)
            .finish()
    }
}

/// The part of the world that goes into the grid.
#[derive(Clone, Copy, Debug)]
struct Interior {
    min: f32,
    max_x: f32,
    max_y: f32,
}

impl Interior {
    fn new(width: u32, height: u32, margin: f32) -> Self {
        Self {
            min: margin,
            max_x: width as f32 - margin,
            max_y: height as f32 - margin,
        }
    }

    /// The cell holding `[x, y]`, or `None` outside the interior.
    fn cell_of(&self, [x, y]: [f32; 2]) -> Option<(u32, u32)> {
        let inside = x >= self.min && x < self.max_x && y >= self.min && y < self.max_y;
        inside.then(|| (x as u32, y as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use granule_pool::PoolConfig;

    fn world(threads: usize) -> ParticleWorld<[f32; 2]> {
        ParticleWorld::new(WorldConfig {
            pool: PoolConfig::with_threads(threads),
            ..WorldConfig::new(8, 8)
        })
        .unwrap()
    }

    #[test]
    fn interior_excludes_margin() {
        let interior = Interior::new(8, 8, 1.0);
        assert_eq!(interior.cell_of([0.5, 4.0]), None);
        assert_eq!(interior.cell_of([1.0, 1.0]), Some((1, 1)));
        assert_eq!(interior.cell_of([6.99, 6.5]), Some((6, 6)));
        assert_eq!(interior.cell_of([7.0, 4.0]), None);
        assert_eq!(interior.cell_of([f32::NAN, 4.0]), None);
    }

    #[test]
    fn rebuild_places_objects_by_dense_index() {
        let mut w = world(2);
        w.spawn([2.5, 3.5]);
        w.spawn([5.1, 5.9]);
        w.spawn([0.2, 0.2]);
        let stats = w.rebuild_grid();
        assert_eq!(
            stats,
            GridStats {
                inserted: 2,
                dropped: 0,
                skipped: 1
            }
        );
        assert_eq!(w.grid().cell(2, 3).unwrap().as_slice(), &[0]);
        assert_eq!(w.grid().cell(5, 5).unwrap().as_slice(), &[1]);
    }

    #[test]
    fn rebuild_reports_overflow() {
        let mut w = world(3);
        for _ in 0..6 {
            w.spawn([3.5, 3.5]);
        }
        let stats = w.rebuild_grid();
        assert_eq!(stats.inserted, 4);
        assert_eq!(stats.dropped, 2);
        // The next rebuild starts from an empty grid.
        let again = w.rebuild_grid();
        assert_eq!(again, stats);
    }

    #[test]
    fn rebuild_is_independent_of_thread_count() {
        let fill = |w: &mut ParticleWorld<[f32; 2]>| {
            for i in 0..90 {
                w.spawn([(i % 9) as f32 * 0.8, (i / 9) as f32 * 0.75]);
            }
            for _ in 0..6 {
                w.spawn([6.5, 1.5]);
            }
        };
        let mut single = world(1);
        fill(&mut single);
        let expected = single.rebuild_grid();
        assert!(expected.inserted > 0 && expected.dropped > 0 && expected.skipped > 0);

        // Covers more workers than grid columns.
        for threads in [2, 3, 5, 8, 11] {
            let mut w = world(threads);
            fill(&mut w);
            assert_eq!(w.rebuild_grid(), expected, "threads = {threads}");
            assert_eq!(w.grid().cells(), single.grid().cells(), "threads = {threads}");
        }
    }

    #[test]
    fn neighbours_skip_self_and_far_objects() {
        let mut w = world(2);
        let a = w.spawn([3.5, 3.5]);
        let b = w.spawn([4.5, 2.5]);
        let far = w.spawn([6.5, 6.5]);
        w.rebuild_grid();
        assert_eq!(w.neighbours_of(a).as_slice(), &[b]);
        assert!(w.neighbours_of(far).is_empty());
    }

    #[test]
    fn neighbours_ignore_despawned_tail() {
        let mut w = world(1);
        let a = w.spawn([3.5, 3.5]);
        let b = w.spawn([3.5, 3.5]);
        w.rebuild_grid();
        w.despawn(b);
        assert!(w.neighbours_of(a).is_empty());
        assert!(w.neighbours_of(b).is_empty());
    }

    #[test]
    fn update_reaches_every_object() {
        let mut w = world(4);
        let ids: Vec<_> = (0..37).map(|i| w.spawn([i as f32, 0.0])).collect();
        w.update(|p| p[1] += 1.0);
        for (i, id) in ids.into_iter().enumerate() {
            assert_eq!(w.get(id), Some(&[i as f32, 1.0]));
        }
    }

    #[test]
    fn step_records_metrics() {
        let mut w = world(2);
        w.spawn([2.5, 2.5]);
        w.spawn([0.1, 0.1]);
        let m = w.step(|_| {});
        assert_eq!(m.object_count, 2);
        assert_eq!(m.grid_inserted, 1);
        assert_eq!(m.grid_skipped, 1);
        assert_eq!(w.last_metrics(), &m);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = ParticleWorld::<[f32; 2]>::new(WorldConfig::new(8, 0)).unwrap_err();
        assert!(matches!(err, ConfigError::Space(_)));
    }
}
