use std::fs;
use std::io::{self, Read, Write};
use std::process::ExitCode;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use anyhow::{bail, Context};
use qrbatch_core::{update, AppState, AppViewModel, Msg, OutputFormat, Severity};
use qrbatch_engine::{EngineConfig, StateStore};
use qrbatch_logging::{qr_debug, qr_info};

use super::effects::EffectRunner;
use super::persistence::FileStore;
use super::render::TerminalRenderer;
use crate::cli::{Cli, Commands, HistoryCommands, ThemeCommands};

const POLL_INTERVAL: Duration = Duration::from_millis(75);
/// Silence from the engine worker longer than this is treated as a hang.
const IDLE_LIMIT: Duration = Duration::from_secs(120);

pub fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let store = Arc::new(StateStore::new(Arc::new(FileStore::open(&cli.data_dir))));
    let config = EngineConfig::new(&cli.out);
    let mut session = Session::new(config, store, io::stdout().lock())?;

    match cli.command {
        Commands::Generate {
            text,
            render,
            fg,
            bg,
            format,
            preview,
            copy,
        } => {
            session.dispatch_all([
                Msg::TextChanged(text),
                Msg::SizeChanged(render.size),
                Msg::ErrorLevelChanged(render.level),
                Msg::ForegroundChanged(fg),
                Msg::BackgroundChanged(bg),
                Msg::FormatChanged(format),
            ])?;
            session.generate(!preview)?;
            if copy {
                session.copy()?;
            }
        }
        Commands::Batch { file, render } => {
            let raw = read_batch_input(file.as_deref())?;
            session.dispatch_all([
                Msg::BatchInputChanged(raw),
                Msg::BatchSizeChanged(render.size),
                Msg::BatchErrorLevelChanged(render.level),
                Msg::BatchSubmitted,
            ])?;
            session.settle()?;
        }
        Commands::History { command } => match command {
            HistoryCommands::List => {
                let view = session.view();
                session.renderer.history(&view.history)?;
            }
            HistoryCommands::Load { id, save, format } => session.load(id, save, format)?,
            HistoryCommands::Clear => {
                session.dispatch(Msg::HistoryClearClicked)?;
                session.settle()?;
                session.renderer.line("History cleared")?;
            }
        },
        Commands::Theme { command } => {
            match command {
                ThemeCommands::Show => {}
                ThemeCommands::Toggle => session.dispatch(Msg::ThemeToggleClicked)?,
                ThemeCommands::Set { theme } => session.dispatch(Msg::ThemeSelected(theme))?,
            }
            session.settle()?;
            let theme = session.view().theme;
            session.renderer.theme(theme)?;
        }
    }

    Ok(session.exit_code())
}

fn read_batch_input(file: Option<&std::path::Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("reading batch input from {}", path.display())),
        None => {
            let mut raw = String::new();
            io::stdin()
                .read_to_string(&mut raw)
                .context("reading batch input from stdin")?;
            Ok(raw)
        }
    }
}

/// Drives the pure state machine: messages in, effects out, engine events back in.
pub struct Session<W: Write> {
    state: AppState,
    runner: EffectRunner,
    msg_rx: mpsc::Receiver<Msg>,
    renderer: TerminalRenderer<W>,
    failed: bool,
}

impl<W: Write> Session<W> {
    pub fn new(config: EngineConfig, store: Arc<StateStore>, out: W) -> anyhow::Result<Self> {
        let (msg_tx, msg_rx) = mpsc::channel();
        let runner = EffectRunner::new(config, store, msg_tx);
        let mut session = Self {
            state: AppState::new(),
            runner,
            msg_rx,
            renderer: TerminalRenderer::new(out),
            failed: false,
        };
        session.runner.restore();
        session.drain_inbox()?;
        Ok(session)
    }

    pub fn view(&self) -> AppViewModel {
        self.state.view()
    }

    pub fn dispatch(&mut self, msg: Msg) -> io::Result<()> {
        qr_debug!("dispatch {:?}", msg);
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let notes = state.drain_notifications();
        let was_dirty = state.consume_dirty();
        self.state = state;

        self.runner.enqueue(effects);
        if was_dirty {
            self.renderer.render(&self.state.view())?;
        }
        if notes.iter().any(|note| note.severity == Severity::Error) {
            self.failed = true;
        }
        self.renderer.notifications(&notes)
    }

    pub fn dispatch_all(&mut self, msgs: impl IntoIterator<Item = Msg>) -> io::Result<()> {
        for msg in msgs {
            self.dispatch(msg)?;
        }
        Ok(())
    }

    /// Processes messages until no preview, save or batch run is in flight.
    pub fn settle(&mut self) -> anyhow::Result<()> {
        let mut idle = Duration::ZERO;
        loop {
            self.drain_inbox()?;
            if self.state.is_settled() {
                return Ok(());
            }
            match self.runner.next_engine_msg(POLL_INTERVAL) {
                Some(msg) => {
                    idle = Duration::ZERO;
                    self.dispatch(msg)?;
                }
                None => {
                    idle += POLL_INTERVAL;
                    if idle >= IDLE_LIMIT {
                        bail!("engine stopped responding");
                    }
                    self.dispatch(Msg::Tick)?;
                }
            }
        }
    }

    /// Renders a preview and, when asked and the preview succeeded, saves it.
    pub fn generate(&mut self, save: bool) -> anyhow::Result<()> {
        self.dispatch(Msg::GenerateClicked)?;
        self.settle()?;
        let view = self.state.view();
        if view.form.preview_bytes.is_none() {
            return Ok(());
        }
        if !save {
            self.renderer.preview(&view)?;
            return Ok(());
        }
        self.dispatch(Msg::SaveClicked)?;
        self.settle()
    }

    /// Copies the current preview to the clipboard; does nothing without one.
    pub fn copy(&mut self) -> anyhow::Result<()> {
        if self.state.view().form.preview_bytes.is_none() {
            return Ok(());
        }
        self.dispatch(Msg::CopyClicked)?;
        self.settle()
    }

    /// Puts a history entry back into the form; only `save` renders and downloads it again.
    pub fn load(&mut self, id: u64, save: bool, format: OutputFormat) -> anyhow::Result<()> {
        if !self.state.view().history.iter().any(|row| row.id == id) {
            bail!("no history entry with id {id}");
        }
        self.dispatch_all([Msg::HistoryEntrySelected { id }, Msg::FormatChanged(format)])?;
        let view = self.state.view();
        self.renderer.form(&view)?;
        if save {
            self.generate(true)?;
        }
        Ok(())
    }

    pub fn had_errors(&self) -> bool {
        self.failed
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.had_errors() {
            ExitCode::FAILURE
        } else {
            qr_info!("Session finished without errors");
            ExitCode::SUCCESS
        }
    }

    fn drain_inbox(&mut self) -> io::Result<()> {
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.dispatch(msg)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use qrbatch_core::{BatchPhase, ErrorLevel, QrOptions, Theme};
    use qrbatch_engine::{DeliveryError, ImageClipboard, MemoryStore};
    use tempfile::TempDir;

    use super::*;

    #[derive(Default)]
    struct FakeClipboard {
        images: Mutex<Vec<(u32, u32, usize)>>,
        unavailable: bool,
    }

    impl ImageClipboard for FakeClipboard {
        fn set_image(&self, width: u32, height: u32, rgba: &[u8]) -> Result<(), DeliveryError> {
            if self.unavailable {
                return Err(DeliveryError::Clipboard("no display".into()));
            }
            self.images.lock().unwrap().push((width, height, rgba.len()));
            Ok(())
        }
    }

    fn session(out_dir: &std::path::Path) -> (Arc<StateStore>, Session<Vec<u8>>) {
        session_with_clipboard(out_dir, Arc::new(FakeClipboard::default()))
    }

    fn session_with_clipboard(
        out_dir: &std::path::Path,
        clipboard: Arc<FakeClipboard>,
    ) -> (Arc<StateStore>, Session<Vec<u8>>) {
        let store = Arc::new(StateStore::new(Arc::new(MemoryStore::new())));
        let config = EngineConfig::new(out_dir).with_clipboard(clipboard);
        let session = Session::new(config, store.clone(), Vec::new()).unwrap();
        (store, session)
    }

    fn output(session: Session<Vec<u8>>) -> String {
        String::from_utf8(session.renderer.into_inner()).unwrap()
    }

    fn files_in(dir: &std::path::Path) -> Vec<String> {
        match fs::read_dir(dir) {
            Ok(entries) => entries
                .map(|entry| entry.unwrap().file_name().into_string().unwrap())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    #[test]
    fn batch_run_saves_archive_and_reports_success() {
        let temp = TempDir::new().unwrap();
        let (store, mut session) = session(temp.path());
        session
            .dispatch_all([
                Msg::BatchInputChanged("a\nb\n\nc".into()),
                Msg::BatchSubmitted,
            ])
            .unwrap();
        session.settle().unwrap();

        assert_eq!(session.view().batch.phase, BatchPhase::Done);
        assert!(!session.had_errors());
        assert_eq!(store.history().len(), 3);
        let files = files_in(temp.path());
        assert_eq!(files.len(), 1);
        assert!(files[0].starts_with("qrcodes_batch_") && files[0].ends_with(".zip"));

        let text = output(session);
        assert!(text.contains("100% (3/3)"));
        assert!(text.contains("[ok] Success: Generated 3 QR codes successfully"));
    }

    #[test]
    fn oversized_batch_is_rejected_without_output() {
        let temp = TempDir::new().unwrap();
        let (store, mut session) = session(temp.path());
        let raw: String = (0..101).map(|i| format!("{i}\n")).collect();
        session
            .dispatch_all([Msg::BatchInputChanged(raw), Msg::BatchSubmitted])
            .unwrap();
        session.settle().unwrap();

        assert_eq!(session.view().batch.phase, BatchPhase::Rejected);
        assert!(session.had_errors());
        assert!(store.history().is_empty());
        assert!(files_in(temp.path()).is_empty());
        assert!(output(session).contains("[error] Error: Maximum 100 QR codes per batch"));
    }

    #[test]
    fn generate_and_save_records_history() {
        let temp = TempDir::new().unwrap();
        let (store, mut session) = session(temp.path());
        session
            .dispatch(Msg::TextChanged("https://example.com".into()))
            .unwrap();
        session.generate(true).unwrap();

        assert!(!session.had_errors());
        let files = files_in(temp.path());
        assert_eq!(files.len(), 1);
        assert!(files[0].starts_with("qrcode-") && files[0].ends_with(".png"));
        let history = store.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history.entries()[0].text, "https://example.com");
        assert_eq!(session.view().history.len(), 1);
    }

    #[test]
    fn empty_text_never_reaches_the_engine() {
        let temp = TempDir::new().unwrap();
        let (_store, mut session) = session(temp.path());
        session.generate(true).unwrap();

        assert!(session.had_errors());
        assert!(files_in(temp.path()).is_empty());
        assert!(output(session).contains("Please enter text or URL"));
    }

    #[test]
    fn copy_places_the_preview_on_the_clipboard() {
        let temp = TempDir::new().unwrap();
        let clipboard = Arc::new(FakeClipboard::default());
        let (store, mut session) = session_with_clipboard(temp.path(), clipboard.clone());
        session
            .dispatch_all([
                Msg::TextChanged("https://example.com".into()),
                Msg::SizeChanged(128),
            ])
            .unwrap();
        session.generate(false).unwrap();
        session.copy().unwrap();

        assert!(!session.had_errors());
        assert_eq!(*clipboard.images.lock().unwrap(), vec![(128, 128, 128 * 128 * 4)]);
        assert!(files_in(temp.path()).is_empty());
        assert!(store.history().is_empty());
        assert!(output(session).contains("[ok] Copied!: QR code copied to clipboard"));
    }

    #[test]
    fn unavailable_clipboard_suggests_downloading() {
        let temp = TempDir::new().unwrap();
        let clipboard = Arc::new(FakeClipboard {
            unavailable: true,
            ..FakeClipboard::default()
        });
        let (_store, mut session) = session_with_clipboard(temp.path(), clipboard);
        session.dispatch(Msg::TextChanged("hello".into())).unwrap();
        session.generate(false).unwrap();
        session.copy().unwrap();

        assert!(session.had_errors());
        assert!(output(session)
            .contains("[error] Copy Failed: Failed to copy QR code. Try downloading instead."));
    }

    #[test]
    fn loading_history_fills_the_form_without_saving() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(StateStore::new(Arc::new(MemoryStore::new())));
        let log = store
            .append_history(
                &[QrOptions::for_batch_item("from history", 384, ErrorLevel::H)],
                chrono::Utc::now(),
            )
            .unwrap();
        let id = log.entries()[0].id;
        let mut session =
            Session::new(EngineConfig::new(temp.path()), store.clone(), Vec::new()).unwrap();

        session.load(id, false, OutputFormat::Png).unwrap();
        let form = session.view().form.options;
        assert_eq!(form.text, "from history");
        assert_eq!(form.size, 384);
        assert_eq!(form.error_level, ErrorLevel::H);
        assert!(files_in(temp.path()).is_empty());
        assert_eq!(store.history().len(), 1);

        session.load(id, true, OutputFormat::Svg).unwrap();
        let files = files_in(temp.path());
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with(".svg"));
        assert_eq!(store.history().len(), 2);

        assert!(session.load(0, false, OutputFormat::Png).is_err());
    }

    #[test]
    fn theme_toggle_is_persisted() {
        let temp = TempDir::new().unwrap();
        let (store, mut session) = session(temp.path());
        assert_eq!(session.view().theme, Theme::Light);
        session.dispatch(Msg::ThemeToggleClicked).unwrap();
        session.settle().unwrap();
        assert_eq!(store.theme(), Theme::Dark);

        let restored =
            Session::new(EngineConfig::new(temp.path()), store, Vec::new()).unwrap();
        assert_eq!(restored.view().theme, Theme::Dark);
    }
}
