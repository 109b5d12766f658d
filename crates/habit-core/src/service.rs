//! Async habit operations over an injected store.
//!
//! Every read-modify-write of a habit holds that habit's lock from load to
//! save, so a toggle and its streak recompute land as one unit. Work on
//! different habits proceeds independently.

use crate::calendar::{CalendarDay, Clock};
use crate::error::{CoreError, CoreResult, StoreError, StoreResult};
use crate::export::{self, ExportDocument, ImportMode, SkippedRecord};
use crate::habit::{Habit, HabitEdit, HabitId};
use crate::reconcile::{reconcile_habit, ReconcileReport};
use crate::reminder::should_remind;
use crate::schedule::is_active_on;
use crate::stats::{self, HabitSummary, Overview};
use crate::store::HabitStore;
use chrono::NaiveDateTime;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex as HabitLock, OwnedMutexGuard};
use tokio::task::JoinSet;
use uuid::Uuid;

/// Result of an import.
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Ids of the habits written.
    pub imported: Vec<HabitId>,
    /// Stored habits removed by [`ImportMode::Replace`].
    pub removed: usize,
    /// Records that could not be read.
    pub skipped: Vec<SkippedRecord>,
}

/// Habit operations with per-habit serialization.
pub struct HabitService<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    locks: parking_lot::Mutex<HashMap<HabitId, Arc<HabitLock<()>>>>,
}

impl<S: HabitStore + 'static> HabitService<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            locks: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Today according to the service clock.
    pub fn today(&self) -> CalendarDay {
        self.clock.today()
    }

    fn lock_for(&self, id: HabitId) -> Arc<HabitLock<()>> {
        Arc::clone(self.locks.lock().entry(id).or_default())
    }

    /// Create a daily habit starting today.
    pub async fn add(&self, name: &str) -> CoreResult<Habit> {
        self.create(Habit::new(name, self.today())?).await
    }

    /// Store a newly built habit.
    pub async fn create(&self, mut habit: Habit) -> CoreResult<Habit> {
        let lock = self.lock_for(habit.id());
        let _guard = lock.lock().await;

        reconcile_habit(&mut habit, self.today());
        let saved = habit.clone();
        run_blocking(&self.store, move |store| store.save(&saved)).await?;
        tracing::debug!(id = %habit.id(), name = habit.name(), "habit created");
        Ok(habit)
    }

    pub async fn get(&self, id: HabitId) -> CoreResult<Habit> {
        load_existing(&self.store, id).await
    }

    pub async fn list(&self) -> CoreResult<Vec<Habit>> {
        run_blocking(&self.store, |store| store.load_all()).await
    }

    /// Mark or unmark `day` and persist the recomputed habit.
    ///
    /// On a storage failure nothing is committed and the call can be
    /// repeated as is.
    pub async fn set_completion(
        &self,
        id: HabitId,
        day: CalendarDay,
        completed: bool,
    ) -> CoreResult<Habit> {
        self.modify(id, |habit, today| {
            let changed = habit.set_completion(day, completed, today)?;
            tracing::debug!(
                %id,
                %day,
                completed,
                changed,
                streak = habit.current_streak(),
                "completion set"
            );
            Ok(())
        })
        .await
    }

    /// Mark today complete, as a notification action would.
    pub async fn complete_today(&self, id: HabitId) -> CoreResult<Habit> {
        self.set_completion(id, self.today(), true).await
    }

    /// Apply a detail edit.
    pub async fn edit(&self, id: HabitId, edit: HabitEdit) -> CoreResult<Habit> {
        self.modify(id, |habit, _| habit.apply(edit)).await
    }

    async fn modify<F>(&self, id: HabitId, change: F) -> CoreResult<Habit>
    where
        F: FnOnce(&mut Habit, CalendarDay) -> CoreResult<()>,
    {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let original = load_existing(&self.store, id).await?;
        let mut habit = original.clone();
        change(&mut habit, self.today())?;

        if habit != original {
            let saved = habit.clone();
            run_blocking(&self.store, move |store| store.save(&saved)).await?;
        }
        Ok(habit)
    }

    /// Delete a habit and its whole history.
    pub async fn delete(&self, id: HabitId) -> CoreResult<()> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let existed = run_blocking(&self.store, move |store| store.delete(id)).await?;
        self.locks.lock().remove(&id);
        if !existed {
            return Err(CoreError::NotFound(id));
        }
        tracing::debug!(%id, "habit deleted");
        Ok(())
    }

    pub async fn is_completed_on_day(&self, id: HabitId, day: CalendarDay) -> CoreResult<bool> {
        Ok(self.get(id).await?.is_completed_on(day))
    }

    pub async fn completion_rate(&self, id: HabitId, window_days: u32) -> CoreResult<u32> {
        Ok(self.get(id).await?.completion_rate(self.today(), window_days))
    }

    pub async fn summary(&self, id: HabitId, window_days: u32) -> CoreResult<HabitSummary> {
        Ok(stats::summarize(&self.get(id).await?, self.today(), window_days))
    }

    pub async fn overview(&self) -> CoreResult<Overview> {
        Ok(stats::overview(&self.list().await?, self.today()))
    }

    /// Habits due today that are not yet completed and have reminders on.
    pub async fn due_reminders(&self) -> CoreResult<Vec<Habit>> {
        let today = self.today();
        let habits = self.list().await?;
        Ok(habits
            .into_iter()
            .filter(|h| is_active_on(h, today) && should_remind(h, today))
            .collect())
    }

    /// Reconcile every stored habit for today, one task per habit.
    pub async fn reconcile_all(&self) -> CoreResult<ReconcileReport> {
        let today = self.today();
        let habits = self.list().await?;

        let mut tasks = JoinSet::new();
        for habit in habits {
            let id = habit.id();
            let store = Arc::clone(&self.store);
            let lock = self.lock_for(id);
            tasks.spawn(async move {
                let outcome = reconcile_one(store, lock, id, today).await;
                (id, outcome)
            });
        }

        let mut report = ReconcileReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(true))) => report.reconciled += 1,
                Ok((_, Ok(false))) => report.unchanged += 1,
                Ok((id, Err(err))) => {
                    tracing::warn!(%id, %err, "reconciliation failed");
                    report.failed += 1;
                }
                Err(err) => {
                    tracing::warn!(%err, "reconciliation task aborted");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            %today,
            reconciled = report.reconciled,
            unchanged = report.unchanged,
            failed = report.failed,
            "daily reconciliation finished"
        );
        Ok(report)
    }

    /// Export every habit as a JSON document.
    pub async fn export_json(&self, exported_at: NaiveDateTime) -> CoreResult<String> {
        ExportDocument::new(&self.list().await?, exported_at).to_json()
    }

    /// Import habits from an export document.
    ///
    /// Replace mode swaps the whole store in one storage call while holding
    /// the lock of every stored and incoming habit, so a failed import leaves
    /// the previous habits in place.
    pub async fn import_json(&self, json: &str, mode: ImportMode) -> CoreResult<ImportReport> {
        let decoded = export::decode(json, self.today())?;
        let mut report = ImportReport {
            skipped: decoded.skipped,
            ..Default::default()
        };
        let mut habits = decoded.habits;

        // Ids repeated within one file would overwrite each other.
        let mut seen = HashSet::new();
        for habit in &mut habits {
            while !seen.insert(habit.id()) {
                habit.id = Uuid::new_v4();
            }
        }

        match mode {
            ImportMode::Replace => {
                let _guards = self.lock_all_for_replace(&habits).await?;
                let batch = habits.clone();
                report.removed =
                    run_blocking(&self.store, move |store| store.replace_all(&batch)).await?;
                report.imported = habits.iter().map(Habit::id).collect();
            }
            ImportMode::Merge => {
                for mut habit in habits {
                    let lock = self.lock_for(habit.id());
                    let _guard = lock.lock().await;

                    let id = habit.id();
                    if run_blocking(&self.store, move |store| store.load(id)).await?.is_some() {
                        habit.id = Uuid::new_v4();
                    }
                    let saved = habit.clone();
                    run_blocking(&self.store, move |store| store.save(&saved)).await?;
                    report.imported.push(habit.id());
                }
            }
        }

        tracing::info!(
            imported = report.imported.len(),
            removed = report.removed,
            skipped = report.skipped.len(),
            ?mode,
            "import finished"
        );
        Ok(report)
    }

    /// Lock every stored habit and every id in `incoming`, in id order.
    async fn lock_all_for_replace(
        &self,
        incoming: &[Habit],
    ) -> CoreResult<Vec<OwnedMutexGuard<()>>> {
        loop {
            let mut ids: Vec<HabitId> = self
                .list()
                .await?
                .iter()
                .chain(incoming)
                .map(Habit::id)
                .collect();
            ids.sort_unstable();
            ids.dedup();

            let mut guards = Vec::with_capacity(ids.len());
            for id in &ids {
                guards.push(self.lock_for(*id).lock_owned().await);
            }

            // A habit created while locking is not covered; start over.
            let stored = self.list().await?;
            if stored.iter().all(|h| ids.binary_search(&h.id()).is_ok()) {
                return Ok(guards);
            }
        }
    }
}

async fn reconcile_one<S: HabitStore + 'static>(
    store: Arc<S>,
    lock: Arc<HabitLock<()>>,
    id: HabitId,
    today: CalendarDay,
) -> CoreResult<bool> {
    let _guard = lock.lock().await;

    // Reload under the lock; the listing may predate a concurrent toggle.
    let Some(mut habit) = run_blocking(&store, move |s| s.load(id)).await? else {
        return Ok(false);
    };
    if !reconcile_habit(&mut habit, today) {
        return Ok(false);
    }
    run_blocking(&store, move |s| s.save(&habit)).await?;
    Ok(true)
}

async fn load_existing<S: HabitStore + 'static>(store: &Arc<S>, id: HabitId) -> CoreResult<Habit> {
    run_blocking(store, move |s| s.load(id))
        .await?
        .ok_or(CoreError::NotFound(id))
}

/// Run a storage call on the blocking pool.
async fn run_blocking<S, T, F>(store: &Arc<S>, call: F) -> CoreResult<T>
where
    S: HabitStore + 'static,
    T: Send + 'static,
    F: FnOnce(&S) -> StoreResult<T> + Send + 'static,
{
    let store = Arc::clone(store);
    let result = tokio::task::spawn_blocking(move || call(&store))
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?;
    Ok(result?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::FixedClock;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn day(y: i32, m: u32, d: u32) -> CalendarDay {
        CalendarDay::from_ymd(y, m, d).unwrap()
    }

    fn service(today: CalendarDay) -> (HabitService<MemoryStore>, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(today));
        let service = HabitService::new(Arc::new(MemoryStore::new()), clock.clone());
        (service, clock)
    }

    /// Memory store whose writes can be made to fail and whose single-habit
    /// loads can be slowed down.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_saves: AtomicBool,
        slow_loads: AtomicBool,
    }

    impl HabitStore for FlakyStore {
        fn load_all(&self) -> StoreResult<Vec<Habit>> {
            self.inner.load_all()
        }

        fn load(&self, id: HabitId) -> StoreResult<Option<Habit>> {
            if self.slow_loads.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(150));
            }
            self.inner.load(id)
        }

        fn save(&self, habit: &Habit) -> StoreResult<()> {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(StoreError::Task("disk full".into()));
            }
            self.inner.save(habit)
        }

        fn delete(&self, id: HabitId) -> StoreResult<bool> {
            self.inner.delete(id)
        }

        fn delete_all(&self) -> StoreResult<usize> {
            self.inner.delete_all()
        }

        fn replace_all(&self, habits: &[Habit]) -> StoreResult<usize> {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(StoreError::Task("disk full".into()));
            }
            self.inner.replace_all(habits)
        }
    }

    #[tokio::test]
    async fn test_toggle_and_streak_scenario() {
        let day1 = day(2024, 4, 1);
        let (service, clock) = service(day1);
        let habit = service.add("Meditate").await.unwrap();

        for _ in 0..3 {
            service.complete_today(habit.id()).await.unwrap();
            clock.advance(1);
        }
        // Day 4 skipped.
        clock.advance(1);
        let updated = service.complete_today(habit.id()).await.unwrap();

        assert_eq!(updated.current_streak(), 1);
        assert_eq!(updated.longest_streak(), 3);
        assert_eq!(service.get(habit.id()).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_not_found() {
        let (service, _) = service(day(2024, 4, 1));
        let missing = Uuid::new_v4();
        assert!(matches!(service.get(missing).await, Err(CoreError::NotFound(_))));
        assert!(matches!(
            service.set_completion(missing, day(2024, 4, 1), true).await,
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(service.delete(missing).await, Err(CoreError::NotFound(_))));
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_toggle_changes_nothing() {
        let today = day(2024, 4, 10);
        let (service, _) = service(today);
        let habit = service.add("Walk").await.unwrap();

        let err = service.set_completion(habit.id(), today.pred(), true).await.unwrap_err();
        assert!(matches!(err, CoreError::BeforeCreation { .. }));
        assert_eq!(service.get(habit.id()).await.unwrap(), habit);
    }

    #[tokio::test]
    async fn test_storage_failure_then_retry() {
        let today = day(2024, 4, 10);
        let store = Arc::new(FlakyStore::default());
        let service = HabitService::new(store.clone(), Arc::new(FixedClock::new(today)));
        let habit = service.add("Water").await.unwrap();

        store.fail_saves.store(true, Ordering::SeqCst);
        let err = service.complete_today(habit.id()).await.unwrap_err();
        assert!(matches!(err, CoreError::Storage(_)));
        assert_eq!(service.get(habit.id()).await.unwrap(), habit);

        store.fail_saves.store(false, Ordering::SeqCst);
        let first = service.complete_today(habit.id()).await.unwrap();
        let again = service.complete_today(habit.id()).await.unwrap();
        assert_eq!(first, again);
        assert_eq!(again.completed_days().len(), 1);
        assert_eq!(again.current_streak(), 1);
    }

    #[tokio::test]
    async fn test_reconcile_all_is_idempotent() {
        let monday = day(2024, 6, 3);
        let (service, clock) = service(monday);
        let a = service.add("A").await.unwrap();
        let b = service.add("B").await.unwrap();
        service.complete_today(a.id()).await.unwrap();

        let report = service.reconcile_all().await.unwrap();
        assert_eq!(report, ReconcileReport { reconciled: 0, unchanged: 2, failed: 0 });

        clock.advance(1);
        let report = service.reconcile_all().await.unwrap();
        assert_eq!(report.reconciled, 2);
        let a_after = service.get(a.id()).await.unwrap();
        assert!(!a_after.checked_today());
        assert_eq!(a_after.completed_days().len(), 1);
        assert_eq!(service.get(b.id()).await.unwrap().last_reconciled_on(), Some(monday.succ()));

        let snapshot = service.list().await.unwrap();
        let report = service.reconcile_all().await.unwrap();
        assert_eq!(report.unchanged, 2);
        assert_eq!(service.list().await.unwrap(), snapshot);
    }

    #[tokio::test]
    async fn test_reconcile_counts_failures() {
        let today = day(2024, 6, 3);
        let store = Arc::new(FlakyStore::default());
        let clock = Arc::new(FixedClock::new(today));
        let service = HabitService::new(store.clone(), clock.clone());
        service.add("A").await.unwrap();

        clock.advance(1);
        store.fail_saves.store(true, Ordering::SeqCst);
        let report = service.reconcile_all().await.unwrap();
        assert_eq!(report.failed, 1);

        store.fail_saves.store(false, Ordering::SeqCst);
        assert_eq!(service.reconcile_all().await.unwrap().reconciled, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_toggles_on_one_habit() {
        let today = day(2024, 6, 30);
        let (service, _) = service(today);
        let service = Arc::new(service);
        let habit = Habit::new("Concurrent", day(2024, 6, 1)).unwrap();
        let habit = service.create(habit).await.unwrap();

        let mut tasks = JoinSet::new();
        for offset in 0..20 {
            let service = Arc::clone(&service);
            let id = habit.id();
            tasks.spawn(async move {
                service
                    .set_completion(id, today.add_days(-offset), true)
                    .await
            });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
        }

        let stored = service.get(habit.id()).await.unwrap();
        assert_eq!(stored.completed_days().len(), 20);
        assert_eq!(stored.current_streak(), 20);
        assert_eq!(stored.longest_streak(), 20);
    }

    #[tokio::test]
    async fn test_edit_and_delete() {
        let (service, _) = service(day(2024, 4, 1));
        let habit = service.add("Read").await.unwrap();
        let edited = service
            .edit(
                habit.id(),
                HabitEdit {
                    goal: Some("20 pages".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.goal, "20 pages");

        assert!(matches!(
            service
                .edit(
                    habit.id(),
                    HabitEdit {
                        name: Some(" ".into()),
                        ..Default::default()
                    }
                )
                .await,
            Err(CoreError::EmptyName)
        ));

        service.delete(habit.id()).await.unwrap();
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_queries_for_collaborators() {
        // Monday.
        let today = day(2024, 6, 3);
        let (service, clock) = service(today);
        let done = service.add("Done").await.unwrap();
        let pending = service.add("Pending").await.unwrap();
        service.complete_today(done.id()).await.unwrap();

        assert!(service.is_completed_on_day(done.id(), today).await.unwrap());
        assert!(!service.is_completed_on_day(pending.id(), today).await.unwrap());
        assert_eq!(service.completion_rate(done.id(), 1).await.unwrap(), 100);
        assert_eq!(service.summary(done.id(), 7).await.unwrap().active_days, 1);

        let due: Vec<_> = service.due_reminders().await.unwrap().iter().map(Habit::id).collect();
        assert_eq!(due, vec![pending.id()]);

        let overview = service.overview().await.unwrap();
        assert_eq!(overview.total_habits, 2);
        assert_eq!(overview.completed_today, 1);

        clock.advance(1);
        assert_eq!(service.due_reminders().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_export_import_modes() {
        let today = day(2024, 6, 3);
        let (source, _) = service(today);
        let habit = source.add("Stretch").await.unwrap();
        source.complete_today(habit.id()).await.unwrap();
        let json = source
            .export_json(today.date().and_hms_opt(12, 0, 0).unwrap())
            .await
            .unwrap();

        let (target, _) = service(today);
        let report = target.import_json(&json, ImportMode::Merge).await.unwrap();
        assert_eq!(report.imported, vec![habit.id()]);
        assert!(report.skipped.is_empty());

        // Same ids again: merge keeps both, with a fresh id for the copy.
        let report = target.import_json(&json, ImportMode::Merge).await.unwrap();
        assert_ne!(report.imported[0], habit.id());
        assert_eq!(target.list().await.unwrap().len(), 2);

        let report = target.import_json(&json, ImportMode::Replace).await.unwrap();
        assert_eq!(report.removed, 2);
        let all = target.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id(), habit.id());
        assert_eq!(all[0].current_streak(), 1);
    }

    fn names(habits: &[Habit]) -> Vec<String> {
        habits.iter().map(|h| h.name().to_string()).collect()
    }

    const NEW_ONLY: &str = r#"{"habits": [{"name": "New", "createdOn": "2024-06-01"}]}"#;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_replace_import_waits_for_inflight_toggle() {
        let today = day(2024, 6, 3);
        let store = Arc::new(FlakyStore::default());
        let service = Arc::new(HabitService::new(store.clone(), Arc::new(FixedClock::new(today))));
        let old = service.add("Old").await.unwrap();

        store.slow_loads.store(true, Ordering::SeqCst);
        let toggle = {
            let service = Arc::clone(&service);
            let old_id = old.id();
            tokio::spawn(async move { service.complete_today(old_id).await })
        };
        // Let the toggle take its lock and start loading.
        tokio::time::sleep(Duration::from_millis(30)).await;

        let report = service.import_json(NEW_ONLY, ImportMode::Replace).await.unwrap();
        assert_eq!(report.removed, 1);
        match toggle.await.unwrap() {
            Ok(_) | Err(CoreError::NotFound(_)) => {}
            Err(other) => panic!("unexpected toggle error: {other}"),
        }

        store.slow_loads.store(false, Ordering::SeqCst);
        assert_eq!(names(&service.list().await.unwrap()), ["New"]);
        assert!(matches!(service.get(old.id()).await, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_failed_replace_import_keeps_existing_habits() {
        let today = day(2024, 6, 3);
        let store = Arc::new(FlakyStore::default());
        let service = HabitService::new(store.clone(), Arc::new(FixedClock::new(today)));
        service.add("Old").await.unwrap();

        store.fail_saves.store(true, Ordering::SeqCst);
        let err = service.import_json(NEW_ONLY, ImportMode::Replace).await.unwrap_err();
        assert!(matches!(err, CoreError::Storage(_)));
        assert_eq!(names(&service.list().await.unwrap()), ["Old"]);

        store.fail_saves.store(false, Ordering::SeqCst);
        let report = service.import_json(NEW_ONLY, ImportMode::Replace).await.unwrap();
        assert_eq!(report.removed, 1);
        assert_eq!(names(&service.list().await.unwrap()), ["New"]);
    }

    #[tokio::test]
    async fn test_repeated_ids_in_one_file_are_kept_apart() {
        let (service, _) = service(day(2024, 6, 3));
        let id = Uuid::new_v4();
        let json = format!(
            r#"{{"habits": [{{"id": "{id}", "name": "A"}}, {{"id": "{id}", "name": "B"}}]}}"#
        );

        let report = service.import_json(&json, ImportMode::Replace).await.unwrap();
        assert_eq!(report.imported.len(), 2);
        assert_ne!(report.imported[0], report.imported[1]);
        assert_eq!(service.list().await.unwrap().len(), 2);
    }
}
