//! Progress monitoring for an active play request

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::backend::MediaBackend;
use crate::session::PlaybackCallbacks;
use crate::state::PlaybackState;

/// Samples position while a request plays and reports its natural end
///
/// Bound to one generation at start. The loop keeps running while the
/// session is paused, exits silently the moment a newer request exists,
/// and fires `on_complete` exactly once when the media finishes on its
/// own. Samples the backend fails to answer are skipped, not fatal.
pub struct ProgressMonitor;

impl ProgressMonitor {
    pub fn start(
        backend: Arc<dyn MediaBackend>,
        generation_counter: Arc<AtomicU64>,
        generation: u64,
        state: Arc<Mutex<PlaybackState>>,
        callbacks: PlaybackCallbacks,
        interval: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            debug!(generation, "Progress monitor started");

            loop {
                if generation_counter.load(Ordering::SeqCst) != generation {
                    debug!(generation, "Progress monitor superseded");
                    return;
                }

                let paused = lock(&state).is_paused;
                let playing = backend.is_playing();

                if !playing && !paused {
                    break;
                }

                if playing && !paused {
                    match (backend.position_seconds(), backend.duration_seconds()) {
                        (Ok(position), Ok(duration)) => {
                            if generation_counter.load(Ordering::SeqCst) != generation {
                                debug!(generation, "Progress monitor superseded");
                                return;
                            }
                            {
                                let mut st = lock(&state);
                                if st.generation != generation {
                                    return;
                                }
                                st.position_seconds = position;
                                if duration > 0 {
                                    st.duration_seconds = duration;
                                }
                            }
                            if let Some(on_progress) = &callbacks.on_progress {
                                on_progress(position, duration);
                            }
                        }
                        _ => {
                            debug!(generation, "Skipping progress sample after backend error");
                        }
                    }
                }

                tokio::time::sleep(interval).await;
            }

            // Natural end of media
            if generation_counter.load(Ordering::SeqCst) != generation {
                debug!(generation, "Progress monitor superseded at end of media");
                return;
            }

            {
                let mut st = lock(&state);
                if st.generation != generation {
                    return;
                }
                st.is_playing = false;
                st.is_paused = false;
                st.is_loading = false;
            }

            info!(generation, "Playback finished");
            if let Some(on_complete) = &callbacks.on_complete {
                on_complete();
            }
        })
    }
}

fn lock(state: &Mutex<PlaybackState>) -> std::sync::MutexGuard<'_, PlaybackState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
