use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};

use crossbeam::channel::{unbounded, Sender};
use log::{debug, warn};
use parking_lot::{Condvar, Mutex, RwLock};

use crate::error::{Result, VolrenError};

use super::{BakedLookup, TransferFunction};

/// Transfer function together with its bake.
/// Raycasters hold a snapshot for a whole frame.
#[derive(Debug)]
pub struct TfSnapshot {
    pub generation: u64,
    pub function: Arc<TransferFunction>,
    pub lookup: Arc<BakedLookup>,
}

enum BakerMessage {
    Bake,
    ShutDown,
}

#[derive(Default)]
struct BakeState {
    /// Latest generation handed out
    requested: u64,
    /// Latest generation processed, baked or failed
    completed: u64,
    /// At most one waiting job, newer edits replace it
    pending: Option<(u64, TransferFunction)>,
    last_error: Option<String>,
}

struct Shared {
    current: RwLock<Arc<TfSnapshot>>,
    state: Mutex<BakeState>,
    done: Condvar,
}

impl Shared {
    /// Install a finished bake unless a newer one was requested meanwhile
    fn finish(
        &self,
        generation: u64,
        function: TransferFunction,
        result: Result<BakedLookup>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        if state.requested > generation {
            debug!("Bake {generation} superseded by {}", state.requested);
            return result.map(|_| ());
        }
        let outcome = match result {
            Ok(lookup) => {
                *self.current.write() = Arc::new(TfSnapshot {
                    generation,
                    function: Arc::new(function),
                    lookup: Arc::new(lookup),
                });
                state.last_error = None;
                debug!("Installed bake {generation}");
                Ok(())
            }
            Err(e) => {
                warn!("Bake {generation} failed, keeping previous lookup: {e}");
                state.last_error = Some(match &e {
                    VolrenError::BakeFailed(reason) => reason.clone(),
                    other => other.to_string(),
                });
                Err(e)
            }
        };
        state.completed = generation;
        self.done.notify_all();
        outcome
    }
}

/// Owner of the active transfer function and its baked lookup.
///
/// Bakes run either on the caller's thread ([`TransferFunctionEngine::submit`])
/// or on a background baker thread ([`TransferFunctionEngine::submit_async`]).
/// Only one bake is in flight, a newer submission supersedes an older one.
/// The installed snapshot is swapped atomically, readers never see a
/// half baked lookup.
pub struct TransferFunctionEngine {
    shared: Arc<Shared>,
    baker: Option<(Sender<BakerMessage>, JoinHandle<()>)>,
}

impl TransferFunctionEngine {
    pub fn new(function: TransferFunction) -> Result<TransferFunctionEngine> {
        let lookup = function.bake()?;
        let snapshot = TfSnapshot {
            generation: 0,
            function: Arc::new(function),
            lookup: Arc::new(lookup),
        };
        Ok(TransferFunctionEngine {
            shared: Arc::new(Shared {
                current: RwLock::new(Arc::new(snapshot)),
                state: Mutex::new(BakeState::default()),
                done: Condvar::new(),
            }),
            baker: None,
        })
    }

    /// Last complete bake
    pub fn snapshot(&self) -> Arc<TfSnapshot> {
        self.shared.current.read().clone()
    }

    pub fn function(&self) -> Arc<TransferFunction> {
        self.snapshot().function.clone()
    }

    fn next_generation(&self) -> u64 {
        let mut state = self.shared.state.lock();
        state.requested += 1;
        state.requested
    }

    /// Bake on this thread. On failure the previous bake stays installed.
    pub fn submit(&self, function: TransferFunction) -> Result<u64> {
        let generation = self.next_generation();
        {
            // drop a waiting async job, this edit is newer
            let mut state = self.shared.state.lock();
            state.pending = None;
        }
        let result = function.bake();
        self.shared.finish(generation, function, result)?;
        Ok(generation)
    }

    fn start_baker(&mut self) -> &Sender<BakerMessage> {
        let shared = self.shared.clone();
        &self
            .baker
            .get_or_insert_with(|| {
                let (sender, receiver) = unbounded();
                let handle = thread::spawn(move || {
                    debug!("Baker thread started");
                    while let Ok(BakerMessage::Bake) = receiver.recv() {
                        let job = shared.state.lock().pending.take();
                        if let Some((generation, function)) = job {
                            let result = function.bake();
                            // failures are kept for take_error
                            let _ = shared.finish(generation, function, result);
                        }
                    }
                    debug!("Baker thread finished");
                });
                (sender, handle)
            })
            .0
    }

    /// Queue a bake on the background thread, replacing a waiting one
    pub fn submit_async(&mut self, function: TransferFunction) -> u64 {
        let generation = self.next_generation();
        {
            let mut state = self.shared.state.lock();
            if let Some((old, _)) = state.pending.replace((generation, function)) {
                debug!("Bake {old} replaced by {generation} before it started");
            }
        }
        if self.start_baker().send(BakerMessage::Bake).is_err() {
            warn!("Baker thread is gone");
        }
        generation
    }

    /// Wait until the newest submission is processed and return the
    /// snapshot to render with
    pub fn sync(&self) -> Arc<TfSnapshot> {
        let mut state = self.shared.state.lock();
        while state.completed < state.requested {
            if self.baker.is_none() && state.pending.is_some() {
                break;
            }
            self.shared.done.wait(&mut state);
        }
        drop(state);
        self.snapshot()
    }

    /// Non fatal error of the last processed bake, left in place
    pub fn last_error(&self) -> Option<VolrenError> {
        self.shared
            .state
            .lock()
            .last_error
            .clone()
            .map(VolrenError::BakeFailed)
    }

    /// Non fatal error of the last processed bake
    pub fn take_error(&self) -> Option<VolrenError> {
        self.shared
            .state
            .lock()
            .last_error
            .take()
            .map(VolrenError::BakeFailed)
    }
}

impl Drop for TransferFunctionEngine {
    fn drop(&mut self) {
        if let Some((sender, handle)) = self.baker.take() {
            let _ = sender.send(BakerMessage::ShutDown);
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for TransferFunctionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferFunctionEngine")
            .field("generation", &self.snapshot().generation)
            .field("async", &self.baker.is_some())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        color,
        transfer_function::{KeyedIntensity, Polarity, Ramp, Sample},
    };

    fn ramp(center: f32) -> TransferFunction {
        Ramp::new(center, 0.1, Polarity::Rising).into()
    }

    #[test]
    fn sync_submit_installs() {
        let engine = TransferFunctionEngine::new(TransferFunction::default()).unwrap();
        let generation = engine.submit(ramp(0.5)).unwrap();
        let snap = engine.snapshot();
        assert_eq!(snap.generation, generation);
        assert_eq!(*snap.function, ramp(0.5));
        assert_eq!(snap.lookup.classify(Sample::Intensity(0.9)).w, 1.0);
    }

    #[test]
    fn failed_bake_keeps_previous() {
        let engine = TransferFunctionEngine::new(ramp(0.2)).unwrap();
        let res = engine.submit(Ramp::new(0.5, -2.0, Polarity::Rising).into());
        assert!(matches!(res, Err(VolrenError::BakeFailed(_))));
        assert_eq!(*engine.function(), ramp(0.2));
        assert!(engine.last_error().is_some());
        assert!(engine.take_error().is_some());
        assert!(engine.take_error().is_none());
        assert!(engine.last_error().is_none());
    }

    #[test]
    fn held_snapshot_survives_swap() {
        let engine = TransferFunctionEngine::new(ramp(0.2)).unwrap();
        let old = engine.snapshot();
        engine
            .submit(KeyedIntensity::constant_alpha(0.5).into())
            .unwrap();
        assert_eq!(*old.function, ramp(0.2));
        assert_ne!(engine.snapshot().generation, old.generation);
    }

    #[test]
    fn async_newest_wins() {
        let mut engine = TransferFunctionEngine::new(TransferFunction::default()).unwrap();
        let mut last = 0;
        for k in 1..20 {
            last = engine.submit_async(ramp(k as f32 / 20.0));
        }
        let snap = engine.sync();
        assert_eq!(snap.generation, last);
        assert_eq!(*snap.function, ramp(19.0 / 20.0));
    }

    #[test]
    fn async_failure_reported() {
        let mut engine = TransferFunctionEngine::new(ramp(0.3)).unwrap();
        engine.submit_async(Ramp::new(0.5, f32::NAN, Polarity::Rising).into());
        let snap = engine.sync();
        assert_eq!(*snap.function, ramp(0.3));
        assert!(matches!(engine.take_error(), Some(VolrenError::BakeFailed(_))));
        assert_eq!(
            snap.lookup.classify(Sample::Intensity(0.0)),
            color::new(1.0, 1.0, 1.0, 0.0)
        );
    }
}
