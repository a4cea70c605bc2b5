//! Playback session state machine
//!
//! A [`PlaybackSession`] owns the authoritative playback state and a
//! monotonic generation counter. Every play and stop bumps the counter;
//! workers spawned for a request capture the value at bind time and
//! re-check it before each observable effect, so a superseded request
//! dies silently instead of clobbering its successor's state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::backend::MediaBackend;
use crate::error::{Error, Result};
use crate::monitor::ProgressMonitor;
use crate::state::{is_supported_rate, PlaybackState, DEFAULT_VOLUME, SUPPORTED_RATES};

/// Default bound on how long a play request waits for audible output
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(2);
/// Default poll interval while waiting for playback to start
pub const DEFAULT_LOAD_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Default progress sampling interval
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Timing knobs for the session's worker loops
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a play request waits for the backend to become audible
    pub load_timeout: Duration,
    /// How often the start wait re-probes the backend
    pub load_poll_interval: Duration,
    /// How often the progress monitor samples position
    pub progress_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            load_timeout: DEFAULT_LOAD_TIMEOUT,
            load_poll_interval: DEFAULT_LOAD_POLL_INTERVAL,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// Observer hooks for one play request
///
/// Shared between the start worker and the progress monitor, hence `Arc`.
/// All hooks are optional; a session with no callbacks is silent.
#[derive(Clone, Default)]
pub struct PlaybackCallbacks {
    /// Called with (position, duration) on every successful progress sample
    pub on_progress: Option<Arc<dyn Fn(u64, u64) + Send + Sync>>,
    /// Called once when the media plays through to its natural end
    pub on_complete: Option<Arc<dyn Fn() + Send + Sync>>,
    /// Called when the play request fails before reaching audible playback
    pub on_error: Option<Arc<dyn Fn(String) + Send + Sync>>,
}

impl std::fmt::Debug for PlaybackCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackCallbacks")
            .field("on_progress", &self.on_progress.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Coordinates one audio backend behind a generation-checked state machine
pub struct PlaybackSession {
    backend: Arc<dyn MediaBackend>,
    generation: Arc<AtomicU64>,
    state: Arc<Mutex<PlaybackState>>,
    config: SessionConfig,
}

impl PlaybackSession {
    /// Create a session over `backend` with default timing
    pub fn new(backend: Arc<dyn MediaBackend>) -> Self {
        Self::with_config(backend, SessionConfig::default())
    }

    /// Create a session with explicit timing knobs
    pub fn with_config(backend: Arc<dyn MediaBackend>, config: SessionConfig) -> Self {
        if let Err(err) = backend.set_volume(DEFAULT_VOLUME) {
            warn!("Could not set initial volume: {err}");
        }
        PlaybackSession {
            backend,
            generation: Arc::new(AtomicU64::new(0)),
            state: Arc::new(Mutex::new(PlaybackState::default())),
            config,
        }
    }

    /// Current generation counter
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Snapshot of the current state
    pub fn state(&self) -> PlaybackState {
        self.lock_state().clone()
    }

    /// Whether a play request is loading or playing
    pub fn is_busy(&self) -> bool {
        self.lock_state().is_active()
    }

    /// Start playing `url`, superseding any in-flight request
    ///
    /// Returns immediately; loading and the start wait happen on a worker
    /// task. Outcomes are reported through `callbacks` and the state
    /// snapshot. A later play or stop makes this request a silent no-op.
    pub fn play(&self, url: &str, title: &str, callbacks: PlaybackCallbacks) {
        let generation = self.bump_generation();

        {
            let mut state = self.lock_state();
            state.generation = generation;
            state.is_loading = true;
            state.is_playing = false;
            state.is_paused = false;
            state.position_seconds = 0;
            state.duration_seconds = 0;
            state.current_url = Some(url.to_string());
            state.current_title = Some(title.to_string());
        }

        info!(generation, title, "Starting playback");

        let backend = Arc::clone(&self.backend);
        let generation_counter = Arc::clone(&self.generation);
        let state = Arc::clone(&self.state);
        let config = self.config.clone();
        let url = url.to_string();
        tokio::spawn(async move {
            start_worker(
                backend,
                generation_counter,
                generation,
                state,
                config,
                url,
                callbacks,
            )
            .await;
        });
    }

    /// Toggle between playing and paused
    ///
    /// Returns `true` when the session is audibly playing after the call.
    /// A no-op when nothing is loaded.
    pub fn toggle_pause(&self) -> bool {
        if self.backend.is_playing() {
            // Flag first so the monitor never mistakes the pause for end of media
            self.lock_state().is_paused = true;
            if let Err(err) = self.backend.pause() {
                warn!("Pause failed: {err}");
                self.lock_state().is_paused = false;
                return true;
            }
            debug!("Playback paused");
            false
        } else if self.lock_state().is_paused {
            if let Err(err) = self.backend.play() {
                warn!("Resume failed: {err}");
                return false;
            }
            self.lock_state().is_paused = false;
            debug!("Playback resumed");
            true
        } else {
            false
        }
    }

    /// Stop playback and reset to idle
    ///
    /// Bumps the generation so in-flight workers for earlier requests go
    /// silent.
    pub fn stop(&self) {
        let generation = self.bump_generation();

        if let Err(err) = self.backend.stop() {
            warn!("Backend stop failed: {err}");
        }

        let mut state = self.lock_state();
        state.generation = generation;
        state.is_playing = false;
        state.is_paused = false;
        state.is_loading = false;
        state.position_seconds = 0;
        state.duration_seconds = 0;
        state.current_url = None;
        state.current_title = None;
        info!(generation, "Playback stopped");
    }

    /// Seek to an absolute position, clamped to the known duration
    pub fn seek(&self, position_seconds: u64) -> Result<()> {
        if !self.backend.is_seekable() {
            return Err(Error::NotSeekable);
        }

        let duration = self.lock_state().duration_seconds;
        let target = if duration > 0 {
            position_seconds.min(duration)
        } else {
            position_seconds
        };

        self.backend.seek(target)?;
        // Optimistic update; the monitor converges on the backend's answer
        self.lock_state().position_seconds = target;
        debug!(target, "Seeked");
        Ok(())
    }

    /// Set output volume, clamped to [0.0, 1.0]
    pub fn set_volume(&self, volume: f64) {
        let clamped = volume.clamp(0.0, 1.0);
        if let Err(err) = self.backend.set_volume(clamped) {
            warn!("Volume change failed: {err}");
            return;
        }
        self.lock_state().volume = clamped;
    }

    /// Current output volume
    pub fn volume(&self) -> f64 {
        self.lock_state().volume
    }

    /// Current playback position in seconds
    pub fn position(&self) -> u64 {
        self.lock_state().position_seconds
    }

    /// Duration of the current media in seconds, 0 when unknown
    pub fn duration(&self) -> u64 {
        self.lock_state().duration_seconds
    }

    /// The fixed set of accepted playback rates
    pub fn supported_rates(&self) -> &'static [f64] {
        &SUPPORTED_RATES
    }

    /// Current playback rate multiplier
    pub fn playback_rate(&self) -> f64 {
        self.lock_state().playback_rate
    }

    /// Set the playback rate; only valid while audibly playing
    pub fn set_playback_rate(&self, rate: f64) -> Result<()> {
        if !is_supported_rate(rate) {
            return Err(Error::UnsupportedRate(rate));
        }
        if !self.backend.is_playing() {
            return Err(Error::NotPlaying);
        }

        self.backend.set_rate(rate)?;
        self.lock_state().playback_rate = rate;
        info!(rate, "Playback rate changed");
        Ok(())
    }

    /// Advance to the next supported rate, wrapping at the end
    ///
    /// An unrecognized current rate falls back to the first supported
    /// rate. Returns the rate in effect after the call.
    pub fn cycle_rate(&self) -> f64 {
        let current = self.playback_rate();
        let next = SUPPORTED_RATES
            .iter()
            .position(|r| (r - current).abs() < f64::EPSILON)
            .map(|i| SUPPORTED_RATES[(i + 1) % SUPPORTED_RATES.len()])
            .unwrap_or(SUPPORTED_RATES[0]);

        match self.set_playback_rate(next) {
            Ok(()) => next,
            Err(err) => {
                debug!("Rate cycle skipped: {err}");
                self.playback_rate()
            }
        }
    }

    fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, PlaybackState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Load, start, and hand off to the monitor for one play request
#[allow(clippy::too_many_arguments)]
async fn start_worker(
    backend: Arc<dyn MediaBackend>,
    generation_counter: Arc<AtomicU64>,
    generation: u64,
    state: Arc<Mutex<PlaybackState>>,
    config: SessionConfig,
    url: String,
    callbacks: PlaybackCallbacks,
) {
    let superseded = || generation_counter.load(Ordering::SeqCst) != generation;
    let fail = |message: String| {
        if superseded() {
            debug!(generation, "Superseded play request failed quietly: {message}");
            return;
        }
        warn!(generation, "Play request failed: {message}");
        if let Ok(mut st) = state.lock() {
            if st.generation == generation {
                st.is_loading = false;
                st.is_playing = false;
            }
        }
        if let Some(on_error) = &callbacks.on_error {
            on_error(message);
        }
    };

    if backend.is_playing() {
        if let Err(err) = backend.stop() {
            warn!("Could not stop previous media: {err}");
        }
    }

    if let Err(err) = backend.open(&url) {
        fail(format!("could not open media: {err}"));
        return;
    }
    if superseded() {
        debug!(generation, "Play request superseded after open");
        let _ = backend.stop();
        return;
    }

    if let Err(err) = backend.play() {
        fail(format!("backend refused to play: {err}"));
        return;
    }

    // Bounded wait for audible output
    let started = Instant::now();
    while !backend.is_playing() && started.elapsed() < config.load_timeout {
        tokio::time::sleep(config.load_poll_interval).await;
        if superseded() {
            debug!(generation, "Play request superseded while waiting to start");
            let _ = backend.stop();
            return;
        }
    }

    if superseded() {
        let _ = backend.stop();
        return;
    }

    if !backend.is_playing() {
        fail("playback did not start within the load timeout".to_string());
        return;
    }

    let duration = backend.duration_seconds().unwrap_or(0);
    let rate = {
        let mut st = match state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if st.generation != generation {
            return;
        }
        st.is_loading = false;
        st.is_playing = true;
        st.is_paused = false;
        st.duration_seconds = duration;
        st.playback_rate
    };

    // Rates are per-media on most backends, reapply the session's choice
    if (rate - 1.0).abs() > f64::EPSILON {
        if let Err(err) = backend.set_rate(rate) {
            warn!("Could not reapply playback rate {rate}: {err}");
        }
    }

    info!(generation, duration, "Playback started");

    ProgressMonitor::start(
        backend,
        generation_counter,
        generation,
        state,
        callbacks,
        config.progress_interval,
    );
}
