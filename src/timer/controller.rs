use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use tokio::{sync::watch, sync::Mutex, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::metabolism;
use crate::models::{ActiveFast, FastEntry, History};
use crate::state::{AppAction, AppState};
use crate::store::{read_json, write_json, DocumentRead, FileStore};
use crate::vault::VaultLayout;
use crate::{log_error, log_info, log_warn};

use super::{Clock, FastProgress, FastState};

const ENABLE_LOGS: bool = true;

struct Ticker {
    handle: JoinHandle<()>,
    token: CancellationToken,
}

/// Drives the Idle <-> Running state machine and the 1 s ticker.
///
/// State lives in the shared [`AppState`]; `active-fast.json` is written on
/// every transition so a fast survives restarts. Transitions are serialized
/// and reach memory only after their document is on disk.
#[derive(Clone)]
pub struct FastTimer {
    state: Arc<Mutex<AppState>>,
    store: Arc<dyn FileStore>,
    clock: Arc<dyn Clock>,
    transition: Arc<Mutex<()>>,
    ticker: Arc<StdMutex<Option<Ticker>>>,
    tick_interval: Duration,
    snapshots: Arc<watch::Sender<FastProgress>>,
}

impl FastTimer {
    pub fn new(state: Arc<Mutex<AppState>>, store: Arc<dyn FileStore>, clock: Arc<dyn Clock>) -> Self {
        let initial = FastState::idle().progress(clock.now_ms(), 0.0);
        let (snapshots, _) = watch::channel(initial);
        Self {
            state,
            store,
            clock,
            transition: Arc::new(Mutex::new(())),
            ticker: Arc::new(StdMutex::new(None)),
            tick_interval: Duration::from_secs(1),
            snapshots: Arc::new(snapshots),
        }
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Progress as of right now, recomputed from the start timestamp.
    pub async fn snapshot(&self) -> FastProgress {
        let guard = self.state.lock().await;
        guard.current_fast.progress(self.clock.now_ms(), guard.tmb())
    }

    /// Receives a fresh [`FastProgress`] on every tick while a fast runs.
    pub fn subscribe(&self) -> watch::Receiver<FastProgress> {
        self.snapshots.subscribe()
    }

    /// Idle -> Running. The running record is on disk before memory changes,
    /// so a failed write leaves the timer Idle.
    pub async fn start_fast(&self, target_hours: f64) -> Result<FastState> {
        if !target_hours.is_finite() || target_hours <= 0.0 {
            bail!("target hours must be greater than zero (got {target_hours})");
        }

        let _transition = self.transition.lock().await;
        let start_time = self.clock.now_ms();
        let layout = {
            let state = self.state.lock().await;
            let layout = state.layout().ok_or_else(|| anyhow!("no vault is open"))?;
            if state.current_fast.is_running() {
                bail!("a fast is already running");
            }
            layout
        };

        let running = FastState::running(start_time, target_hours);
        self.persist(&layout, &running.to_document())
            .await
            .context("failed to persist the started fast")?;

        self.state.lock().await.apply(AppAction::StartFast {
            start_time,
            target_hours,
        });
        log_info!(
            "Fast started at {start_time} targeting {target_hours}h in {}",
            layout.root().display()
        );
        self.spawn_ticker();
        self.publish().await;
        Ok(running)
    }

    /// Running -> Idle. Appends the finished fast to `history.json`, resets
    /// `active-fast.json`, and returns the entry. `None` when nothing was
    /// running or no vault/history is loaded.
    ///
    /// If the history write fails the fast keeps running, ticker included.
    pub async fn end_fast(&self) -> Result<Option<FastEntry>> {
        let _transition = self.transition.lock().await;
        let end_time = self.clock.now_ms();

        let (layout, running, tmb) = {
            let state = self.state.lock().await;
            let Some(layout) = state.layout() else {
                return Ok(None);
            };
            if !state.current_fast.is_running() || state.history.is_none() {
                return Ok(None);
            }
            (layout, state.current_fast, state.tmb())
        };

        let Some(start_time) = running.start_time else {
            return Ok(None);
        };
        let duration = running.elapsed_secs(end_time);
        let entry = FastEntry {
            id: format!("fast_{}", Uuid::new_v4()),
            start_time,
            end_time: Some(end_time),
            duration: Some(duration),
            weight_loss: Some(metabolism::weight_loss_kg(duration as f64, tmb)),
        };

        let history = self.append_to_history(&layout, &entry).await?;
        {
            let mut state = self.state.lock().await;
            state.apply(AppAction::SetHistory(history));
            state.apply(AppAction::EndFast);
        }
        self.cancel_ticker();
        self.publish().await;

        self.persist(&layout, &ActiveFast::idle())
            .await
            .context("fast was recorded but active-fast.json could not be reset")?;

        log_info!("Fast {} ended after {duration}s", entry.id);
        Ok(Some(entry))
    }

    /// Rebuilds the in-memory fast from `active-fast.json`. Elapsed time comes
    /// from `now - startTime`, however long the app was closed.
    pub async fn hydrate(&self, doc: &ActiveFast) {
        let _transition = self.transition.lock().await;
        let hydrated = FastState::from_document(doc);
        self.state.lock().await.current_fast = hydrated;

        if let (Some(start), Some(target)) = (hydrated.start_time, hydrated.target_hours) {
            let elapsed = hydrated.elapsed_secs(self.clock.now_ms());
            log_info!("Hydrated running fast: started {start}, target {target}h, {elapsed}s elapsed");
            self.spawn_ticker();
        } else {
            self.cancel_ticker();
            log::debug!("No running fast to hydrate");
        }
        self.publish().await;
    }

    /// Cancels the ticker, e.g. when the hosting view goes away. The fast
    /// itself keeps running on disk.
    pub fn stop_ticker(&self) {
        self.cancel_ticker();
    }

    pub fn ticker_active(&self) -> bool {
        lock_ticker(&self.ticker)
            .as_ref()
            .map_or(false, |ticker| !ticker.handle.is_finished())
    }

    async fn persist(&self, layout: &VaultLayout, doc: &ActiveFast) -> Result<()> {
        let path = layout.active_fast_path();
        let _guard = self.store.lock(&path).await;
        write_json(self.store.as_ref(), &path, doc).await
    }

    /// Read-modify-write of `history.json` under its lock, so journal entries
    /// written since the vault was loaded are kept. A history that exists but
    /// does not parse is left alone and reported.
    async fn append_to_history(&self, layout: &VaultLayout, entry: &FastEntry) -> Result<History> {
        let path = layout.history_path();
        let _guard = self.store.lock(&path).await;

        let mut history = match read_json::<History>(self.store.as_ref(), &path).await {
            DocumentRead::Present(history) => history,
            DocumentRead::Absent => History::default(),
            DocumentRead::Malformed(err) | DocumentRead::Unreadable(err) => {
                log_warn!("Not recording fast over unreadable history: {err:#}");
                return Err(err);
            }
        };

        history.fasts.push(entry.clone());
        history.sort_fasts();
        write_json(self.store.as_ref(), &path, &history)
            .await
            .context("failed to record the finished fast")?;
        Ok(history)
    }

    async fn publish(&self) {
        let snapshot = self.snapshot().await;
        self.snapshots.send_replace(snapshot);
    }

    fn spawn_ticker(&self) {
        self.cancel_ticker();

        let token = CancellationToken::new();
        let state = self.state.clone();
        let clock = self.clock.clone();
        let snapshots = self.snapshots.clone();
        let tick_interval = self.tick_interval;
        let cancelled = token.clone();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let snapshot = {
                    let guard = state.lock().await;
                    if !guard.current_fast.is_running() {
                        break;
                    }
                    guard.current_fast.progress(clock.now_ms(), guard.tmb())
                };
                snapshots.send_replace(snapshot);
            }
            log::debug!("Fast ticker stopped");
        });

        let mut slot = lock_ticker(&self.ticker);
        if let Some(previous) = slot.replace(Ticker { handle, token }) {
            log_error!("Replaced a ticker that was still registered");
            previous.token.cancel();
            previous.handle.abort();
        }
    }

    fn cancel_ticker(&self) {
        if let Some(ticker) = lock_ticker(&self.ticker).take() {
            ticker.token.cancel();
            ticker.handle.abort();
        }
    }
}

fn lock_ticker(ticker: &StdMutex<Option<Ticker>>) -> std::sync::MutexGuard<'_, Option<Ticker>> {
    match ticker.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FsStore;
    use crate::timer::ManualClock;
    use async_trait::async_trait;
    use std::path::Path;
    use tempfile::TempDir;
    use tokio::sync::OwnedMutexGuard;

    const T0: i64 = 1_700_000_000_000;

    /// Real filesystem, except writes to one named file fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: FsStore,
        fail_writes_to: StdMutex<Option<String>>,
    }

    impl FlakyStore {
        fn fail_writes_to(&self, file_name: Option<&str>) {
            *self.fail_writes_to.lock().unwrap() = file_name.map(str::to_string);
        }
    }

    #[async_trait]
    impl FileStore for FlakyStore {
        async fn exists(&self, path: &Path) -> bool {
            self.inner.exists(path).await
        }

        async fn is_dir(&self, path: &Path) -> bool {
            self.inner.is_dir(path).await
        }

        async fn create_dir_all(&self, path: &Path) -> Result<()> {
            self.inner.create_dir_all(path).await
        }

        async fn read_bytes(&self, path: &Path) -> Result<Option<Vec<u8>>> {
            self.inner.read_bytes(path).await
        }

        async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
            let failing = self.fail_writes_to.lock().unwrap().clone();
            if let Some(name) = failing {
                if path.file_name().map_or(false, |file| file == name.as_str()) {
                    bail!("disk full writing {}", path.display());
                }
            }
            self.inner.write_bytes(path, bytes).await
        }

        async fn remove_file(&self, path: &Path) -> Result<()> {
            self.inner.remove_file(path).await
        }

        async fn lock(&self, path: &Path) -> OwnedMutexGuard<()> {
            self.inner.lock(path).await
        }
    }

    async fn timer_in(dir: &TempDir) -> (FastTimer, Arc<ManualClock>, Arc<Mutex<AppState>>) {
        timer_over(dir, Arc::new(FsStore::new())).await
    }

    async fn timer_over(
        dir: &TempDir,
        store: Arc<dyn FileStore>,
    ) -> (FastTimer, Arc<ManualClock>, Arc<Mutex<AppState>>) {
        let layout = VaultLayout::new(dir.path());
        layout.init(store.as_ref()).await.unwrap();

        let mut app = AppState::default();
        app.apply(AppAction::SetVaultPath(dir.path().to_path_buf()));
        app.apply(AppAction::SetHistory(History::default()));
        let state = Arc::new(Mutex::new(app));

        let clock = Arc::new(ManualClock::new(T0));
        let timer = FastTimer::new(state.clone(), store, clock.clone())
            .with_tick_interval(Duration::from_millis(10));
        (timer, clock, state)
    }

    #[tokio::test]
    async fn rejects_bad_targets_and_double_start() {
        let dir = TempDir::new().unwrap();
        let (timer, _clock, _state) = timer_in(&dir).await;

        assert!(timer.start_fast(0.0).await.is_err());
        assert!(timer.start_fast(f64::NAN).await.is_err());

        timer.start_fast(16.0).await.unwrap();
        assert!(timer.start_fast(16.0).await.is_err());
        timer.stop_ticker();
    }

    #[tokio::test]
    async fn start_requires_open_vault() {
        let store: Arc<dyn FileStore> = Arc::new(FsStore::new());
        let timer = FastTimer::new(
            Arc::new(Mutex::new(AppState::default())),
            store,
            Arc::new(ManualClock::new(T0)),
        );
        assert!(timer.start_fast(16.0).await.is_err());
    }

    #[tokio::test]
    async fn end_while_idle_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let (timer, _clock, _state) = timer_in(&dir).await;
        assert_eq!(timer.end_fast().await.unwrap(), None);
        assert!(!VaultLayout::new(dir.path()).active_fast_path().exists());
    }

    #[tokio::test]
    async fn ticker_publishes_and_stops_on_end() {
        let dir = TempDir::new().unwrap();
        let (timer, clock, _state) = timer_in(&dir).await;
        let mut rx = timer.subscribe();

        timer.start_fast(1.0).await.unwrap();
        assert!(timer.ticker_active());

        clock.advance_secs(90);
        let seen = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                rx.changed().await.unwrap();
                if rx.borrow().elapsed_secs == 90 {
                    break;
                }
            }
        })
        .await;
        assert!(seen.is_ok());

        timer.end_fast().await.unwrap().unwrap();
        assert!(!timer.ticker_active());
        assert_eq!(timer.snapshot().await.status, crate::timer::FastStatus::Idle);
    }

    #[tokio::test]
    async fn hydrate_ignores_incomplete_documents() {
        let dir = TempDir::new().unwrap();
        let (timer, _clock, state) = timer_in(&dir).await;

        let doc = ActiveFast {
            is_active: true,
            start_time: Some(T0),
            target_hours: None,
        };
        timer.hydrate(&doc).await;
        assert!(!state.lock().await.current_fast.is_running());
        assert!(!timer.ticker_active());
    }

    fn read_active(dir: &TempDir) -> Option<ActiveFast> {
        let raw = std::fs::read_to_string(VaultLayout::new(dir.path()).active_fast_path()).ok()?;
        serde_json::from_str(&raw).ok()
    }

    fn read_history(dir: &TempDir) -> History {
        let raw = std::fs::read_to_string(VaultLayout::new(dir.path()).history_path()).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[tokio::test]
    async fn failed_start_write_stays_idle() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FlakyStore::default());
        let (timer, _clock, state) = timer_over(&dir, store.clone()).await;

        store.fail_writes_to(Some("active-fast.json"));
        assert!(timer.start_fast(16.0).await.is_err());

        assert!(!state.lock().await.current_fast.is_running());
        assert!(!timer.ticker_active());
        assert_eq!(read_active(&dir), None);
        assert_eq!(timer.subscribe().borrow().status, crate::timer::FastStatus::Idle);
    }

    #[tokio::test]
    async fn failed_history_write_keeps_fast_running() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FlakyStore::default());
        let (timer, clock, state) = timer_over(&dir, store.clone()).await;

        timer.start_fast(16.0).await.unwrap();
        clock.advance_secs(3600);
        store.fail_writes_to(Some("history.json"));
        assert!(timer.end_fast().await.is_err());

        assert!(state.lock().await.current_fast.is_running());
        assert!(timer.ticker_active());
        assert_eq!(read_active(&dir), Some(ActiveFast::running(T0, 16.0)));
        assert!(read_history(&dir).fasts.is_empty());

        store.fail_writes_to(None);
        let entry = timer.end_fast().await.unwrap().unwrap();
        assert_eq!(entry.duration, Some(3600));
        assert!(!timer.ticker_active());
        assert_eq!(read_history(&dir).fasts, vec![entry]);
    }

    #[tokio::test]
    async fn failed_reset_still_records_the_fast() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FlakyStore::default());
        let (timer, clock, state) = timer_over(&dir, store.clone()).await;

        timer.start_fast(16.0).await.unwrap();
        clock.advance_secs(60);
        store.fail_writes_to(Some("active-fast.json"));
        assert!(timer.end_fast().await.is_err());

        let history = read_history(&dir);
        assert_eq!(history.fasts.len(), 1);
        assert_eq!(history.fasts[0].start_time, T0);

        let state = state.lock().await;
        assert!(!state.current_fast.is_running());
        assert_eq!(state.history.as_ref().unwrap().fasts, history.fasts);
        drop(state);
        assert!(!timer.ticker_active());
    }

    #[tokio::test]
    async fn malformed_history_is_not_overwritten_on_end() {
        let dir = TempDir::new().unwrap();
        let (timer, clock, state) = timer_in(&dir).await;
        let history_path = VaultLayout::new(dir.path()).history_path();

        timer.start_fast(16.0).await.unwrap();
        std::fs::write(&history_path, "{ not json").unwrap();
        clock.advance_secs(60);

        assert!(timer.end_fast().await.is_err());
        assert_eq!(std::fs::read_to_string(&history_path).unwrap(), "{ not json");
        assert!(state.lock().await.current_fast.is_running());
        timer.stop_ticker();
    }

    #[tokio::test]
    async fn overlapping_start_and_end_leave_disk_matching_memory() {
        let dir = TempDir::new().unwrap();
        let (timer, _clock, state) = timer_in(&dir).await;
        timer.start_fast(16.0).await.unwrap();

        let (ended, restarted) = tokio::join!(timer.end_fast(), timer.start_fast(8.0));
        ended.unwrap();
        let _ = restarted;

        let expected = state.lock().await.current_fast.to_document();
        assert_eq!(read_active(&dir), Some(expected));
        timer.stop_ticker();
    }
}
