use std::sync::{mpsc, Arc};
use std::time::Duration;

use chrono::Utc;
use qrbatch_core::{Effect, Msg, PreviewInfo};
use qrbatch_engine::{Engine, EngineConfig, EngineEvent, EngineHandle, StateStore};
use qrbatch_logging::{qr_info, qr_warn};

/// Executes effects: slow work goes to the engine worker, store writes run inline.
pub struct EffectRunner {
    engine: EngineHandle,
    store: Arc<StateStore>,
    msg_tx: mpsc::Sender<Msg>,
}

impl EffectRunner {
    pub fn new(config: EngineConfig, store: Arc<StateStore>, msg_tx: mpsc::Sender<Msg>) -> Self {
        let engine = EngineHandle::new(Engine::new(config, store.clone()));
        Self {
            engine,
            store,
            msg_tx,
        }
    }

    /// Messages describing what is already persisted; sent once at start-up.
    pub fn restore(&self) {
        let _ = self.msg_tx.send(Msg::ThemeRestored(self.store.theme()));
        let _ = self
            .msg_tx
            .send(Msg::HistoryLoaded(self.store.history().into_entries()));
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::RenderPreview { options, format } => {
                    self.engine.render_preview(options, format);
                }
                Effect::SaveSingle { options, format } => {
                    self.engine.save_single(options, format);
                }
                Effect::CopyImage { options } => self.engine.copy_image(options),
                Effect::RunBatch { request } => {
                    let run_id = self.engine.run_batch(request);
                    qr_info!("RunBatch queued as run {}", run_id);
                }
                Effect::CancelBatch => self.engine.cancel(),
                Effect::AppendHistory { drafts } => {
                    match self.store.append_history(&drafts, Utc::now()) {
                        Ok(log) => self.send(Msg::HistoryLoaded(log.into_entries())),
                        Err(err) => self.store_failed(err),
                    }
                }
                Effect::ClearHistory => {
                    if let Err(err) = self.store.clear_history() {
                        self.store_failed(err);
                    }
                }
                Effect::PersistTheme(theme) => {
                    if let Err(err) = self.store.set_theme(theme) {
                        self.store_failed(err);
                    }
                }
            }
        }
    }

    /// Waits up to `timeout` for the next engine event, translated into a message.
    pub fn next_engine_msg(&self, timeout: Duration) -> Option<Msg> {
        self.engine.recv_timeout(timeout).map(map_event)
    }

    fn send(&self, msg: Msg) {
        let _ = self.msg_tx.send(msg);
    }

    fn store_failed(&self, err: qrbatch_engine::StoreError) {
        qr_warn!("State store write failed: {}", err);
        self.send(Msg::StoreFailed(err.to_string()));
    }
}

fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::PhaseChanged { phase, .. } => Msg::BatchPhaseChanged(phase),
        EngineEvent::ItemCompleted { item, .. } => Msg::BatchProgressed(item.progress),
        EngineEvent::BatchFinished { run_id, result } => {
            if let Err(failure) = &result {
                qr_warn!("Batch {} failed ({}): {}", run_id, failure.kind, failure.message);
            }
            Msg::BatchFinished { result }
        }
        EngineEvent::PreviewRendered { options, result } => Msg::PreviewRendered {
            result: result.map(|image| PreviewInfo {
                options,
                format: image.format,
                byte_len: image.bytes.len(),
            }),
        },
        EngineEvent::SingleSaved { options, result } => Msg::SingleSaved {
            options,
            result: result.map(|saved| saved.path.display().to_string()),
        },
        EngineEvent::ImageCopied { result } => {
            if let Err(err) = &result {
                qr_warn!("Clipboard copy failed: {}", err);
            }
            Msg::ImageCopied { result }
        }
    }
}

#[cfg(test)]
mod tests {
    use qrbatch_core::{BatchPhase, BatchProgress, QrOptions};
    use qrbatch_engine::{ItemCompleted, SavedImage};

    use super::*;

    #[test]
    fn item_events_become_progress() {
        let msg = map_event(EngineEvent::ItemCompleted {
            run_id: 1,
            item: ItemCompleted {
                index: 0,
                filename: "qrcode_1_a.png".into(),
                progress: BatchProgress::new(1, 3),
            },
        });
        assert_eq!(msg, Msg::BatchProgressed(BatchProgress::new(1, 3)));

        let msg = map_event(EngineEvent::PhaseChanged {
            run_id: 1,
            phase: BatchPhase::Archiving,
        });
        assert_eq!(msg, Msg::BatchPhaseChanged(BatchPhase::Archiving));
    }

    #[test]
    fn preview_errors_and_saved_paths_are_forwarded() {
        let msg = map_event(EngineEvent::PreviewRendered {
            options: QrOptions::default(),
            result: Err("bad color".into()),
        });
        assert_eq!(
            msg,
            Msg::PreviewRendered {
                result: Err("bad color".into())
            }
        );

        let msg = map_event(EngineEvent::SingleSaved {
            options: QrOptions::default(),
            result: Ok(SavedImage {
                path: "out/qrcode-1.svg".into(),
                byte_len: 10,
            }),
        });
        assert_eq!(
            msg,
            Msg::SingleSaved {
                options: QrOptions::default(),
                result: Ok("out/qrcode-1.svg".into())
            }
        );
    }
}
