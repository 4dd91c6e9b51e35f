use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use mdproxy::engine::progress::{Progress, ProgressCallback};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tracing::warn;

#[derive(Debug)]
pub enum UiEvent {
    Progress(Progress),
}

/// Draws the stage bar and prints report lines above it; fed by the simulation
/// through a channel.
pub struct UiManager {
    mp: Arc<MultiProgress>,
    stage: Option<StageBar>,
    event_receiver: mpsc::Receiver<UiEvent>,
    shutdown_receiver: watch::Receiver<bool>,
    _sentinel_bar: ProgressBar,
}

/// Bar of the stage currently running, with the steps it has completed so far.
struct StageBar {
    name: String,
    bar: ProgressBar,
    steps_done: u64,
}

impl StageBar {
    fn begin(mp: &MultiProgress, name: String) -> Self {
        let bar = mp.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(80));
        bar.set_style(spinner_style());
        bar.set_message(name.clone());
        Self {
            name,
            bar,
            steps_done: 0,
        }
    }

    fn expect_steps(&self, total_steps: u64) {
        self.bar.disable_steady_tick();
        self.bar.set_style(bar_style());
        self.bar.set_length(total_steps);
        self.bar.set_position(0);
    }

    fn advance(&mut self, steps: u64) {
        self.steps_done += steps;
        self.bar.inc(steps);
    }

    fn annotate(&self, text: &str) {
        self.bar.set_message(format!("{} ({})", self.name, text));
    }

    /// Clears the bar and returns the line that replaces it.
    fn close(self) -> String {
        self.bar.finish_and_clear();
        if self.steps_done == 0 {
            format!("✓ {}", self.name)
        } else {
            format!("✓ {} ({} steps)", self.name, self.steps_done)
        }
    }
}

impl UiManager {
    pub fn new() -> (Self, mpsc::Sender<UiEvent>, watch::Sender<bool>) {
        let (event_sender, event_receiver) = mpsc::channel(1024);
        let (shutdown_sender, shutdown_receiver) = watch::channel(false);
        let mp = Arc::new(MultiProgress::new());
        mp.set_draw_target(ProgressDrawTarget::stderr_with_hz(12));
        let _sentinel_bar = mp.add(ProgressBar::hidden());
        let manager = Self {
            mp,
            stage: None,
            event_receiver,
            shutdown_receiver,
            _sentinel_bar,
        };

        (manager, event_sender, shutdown_sender)
    }

    pub async fn run(mut self) {
        loop {
            tokio::select! {
                Some(event) = self.event_receiver.recv() => {
                    self.handle_event(event);
                }
                result = self.shutdown_receiver.changed() => {
                    if result.is_err() || *self.shutdown_receiver.borrow() {
                        break;
                    }
                }
            }
        }
        // Events sent right before shutdown still get drawn.
        while let Ok(event) = self.event_receiver.try_recv() {
            self.handle_event(event);
        }
        if let Some(stage) = self.stage.take() {
            stage.bar.finish_and_clear();
        }
        self._sentinel_bar.finish_and_clear();
    }

    fn handle_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Progress(progress) => self.handle_progress(progress),
        }
    }

    fn handle_progress(&mut self, progress: Progress) {
        match progress {
            Progress::PhaseStart { name } => {
                if let Some(previous) = self.stage.take() {
                    previous.bar.finish_and_clear();
                }
                self.stage = Some(StageBar::begin(&self.mp, name));
            }
            Progress::PhaseFinish => {
                if let Some(stage) = self.stage.take() {
                    let line = stage.close();
                    self.print_line(line);
                }
            }
            Progress::TaskStart { total_steps } => {
                if let Some(stage) = &self.stage {
                    stage.expect_steps(total_steps);
                }
            }
            Progress::TaskIncrement { amount } => {
                if let Some(stage) = &mut self.stage {
                    stage.advance(amount);
                }
            }
            Progress::TaskFinish => {
                if let Some(stage) = &self.stage {
                    stage.bar.finish();
                }
            }
            Progress::StatusUpdate { text } => {
                if let Some(stage) = &self.stage {
                    stage.annotate(&text);
                }
            }
            Progress::Status(line) => self.print_line(line),
            Progress::Message(msg) => self.print_line(format!("  {}", msg)),
        }
    }

    /// Prints above the bars; falls back to stdout when nothing is drawn.
    fn print_line(&self, line: String) {
        if self.mp.is_hidden() {
            println!("{}", line);
        } else if let Err(e) = self.mp.println(&line) {
            warn!("Failed to print to the terminal: {}", e);
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg:<40} [{bar:40.cyan/blue}] {pos}/{len} steps ({eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .with_key(
            "eta",
            |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
            },
        )
        .progress_chars("━╸ ")
}

/// Forwards workflow progress into the UI channel.
#[derive(Clone)]
pub struct CliProgressHandler {
    sender: mpsc::Sender<UiEvent>,
}

impl CliProgressHandler {
    pub fn new(sender: mpsc::Sender<UiEvent>) -> Self {
        Self { sender }
    }

    /// Bar updates are dropped when the channel is full; report lines wait for room.
    /// The callback runs on a blocking thread, so waiting does not stall the runtime.
    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let sender = self.sender.clone();
        Box::new(move |progress: Progress| {
            match sender.try_send(UiEvent::Progress(progress)) {
                Ok(()) => {}
                Err(TrySendError::Full(event @ UiEvent::Progress(Progress::Status(_)))) => {
                    if let Err(e) = sender.blocking_send(event) {
                        warn!("Failed to send a report line to the UI channel: {}", e);
                    }
                }
                Err(e) => warn!("Failed to send progress update to UI channel: {}", e),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn setup_manager() -> (UiManager, mpsc::Sender<UiEvent>) {
        let (manager, sender, _shutdown) = UiManager::new();
        manager.mp.set_draw_target(ProgressDrawTarget::hidden());
        (manager, sender)
    }

    fn send(manager: &mut UiManager, progress: Progress) {
        manager.handle_event(UiEvent::Progress(progress));
    }

    fn start_stage(manager: &mut UiManager, name: &str) {
        send(
            manager,
            Progress::PhaseStart {
                name: name.to_string(),
            },
        );
    }

    fn stage(manager: &UiManager) -> &StageBar {
        manager.stage.as_ref().unwrap()
    }

    #[test]
    fn phase_start_creates_a_spinner_named_after_the_stage() {
        let (mut manager, _) = setup_manager();
        assert!(manager.stage.is_none());

        start_stage(&mut manager, "Heat up");

        assert_eq!(stage(&manager).bar.message(), "Heat up");
        assert_eq!(stage(&manager).name, "Heat up");
    }

    #[test]
    fn next_stage_replaces_the_bar() {
        let (mut manager, _) = setup_manager();
        start_stage(&mut manager, "Heat up");
        start_stage(&mut manager, "Cool down");

        assert_eq!(stage(&manager).bar.message(), "Cool down");
        assert_eq!(stage(&manager).steps_done, 0);
    }

    #[test]
    fn phase_finish_clears_the_bar() {
        let (mut manager, _) = setup_manager();
        start_stage(&mut manager, "Setup");

        send(&mut manager, Progress::PhaseFinish);

        assert!(manager.stage.is_none());
    }

    #[test]
    fn closing_a_stage_summarises_its_steps() {
        let mp = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());

        let setup = StageBar::begin(&mp, "Setup".to_string());
        assert_eq!(setup.close(), "✓ Setup");

        let mut heat = StageBar::begin(&mp, "Heat up".to_string());
        heat.expect_steps(30);
        heat.advance(10);
        heat.advance(10);
        heat.advance(10);
        assert_eq!(heat.close(), "✓ Heat up (30 steps)");
    }

    #[test]
    fn steps_advance_the_bar_by_block() {
        let (mut manager, _) = setup_manager();
        start_stage(&mut manager, "Equilibration");
        send(&mut manager, Progress::TaskStart { total_steps: 400 });

        send(&mut manager, Progress::TaskIncrement { amount: 20 });
        send(&mut manager, Progress::TaskIncrement { amount: 20 });

        let stage = stage(&manager);
        assert_eq!(stage.bar.length(), Some(400));
        assert_eq!(stage.bar.position(), 40);
        assert_eq!(stage.steps_done, 40);
    }

    #[test]
    fn task_finish_completes_the_bar() {
        let (mut manager, _) = setup_manager();
        start_stage(&mut manager, "Equilibration");
        send(&mut manager, Progress::TaskStart { total_steps: 40 });

        send(&mut manager, Progress::TaskFinish);

        assert!(stage(&manager).bar.is_finished());
    }

    #[test]
    fn status_update_decorates_the_stage_name() {
        let (mut manager, _) = setup_manager();
        start_stage(&mut manager, "Cool down");

        send(
            &mut manager,
            Progress::StatusUpdate {
                text: "T = 0.5012".into(),
            },
        );

        assert_eq!(stage(&manager).bar.message(), "Cool down (T = 0.5012)");
    }

    #[test]
    fn report_lines_leave_the_stage_bar_alone() {
        let (mut manager, _) = setup_manager();
        send(&mut manager, Progress::Status("NodeGrid = (1, 1, 2)".into()));
        assert!(manager.stage.is_none());

        start_stage(&mut manager, "Equilibration");
        send(&mut manager, Progress::TaskStart { total_steps: 40 });
        send(&mut manager, Progress::TaskIncrement { amount: 20 });
        send(
            &mut manager,
            Progress::Status("Step     20: tot energy = 1.0".into()),
        );

        let stage = stage(&manager);
        assert_eq!(stage.bar.message(), "Equilibration");
        assert_eq!(stage.bar.position(), 20);
    }

    #[test]
    fn events_without_a_bar_are_ignored() {
        let (mut manager, _) = setup_manager();
        send(&mut manager, Progress::TaskIncrement { amount: 5 });
        send(&mut manager, Progress::PhaseFinish);
        send(&mut manager, Progress::Message("hello".into()));
        assert!(manager.stage.is_none());
    }

    #[tokio::test]
    async fn progress_handler_forwards_events() {
        let (sender, mut receiver) = mpsc::channel(1);
        let handler = CliProgressHandler::new(sender);
        let callback = handler.get_callback();

        callback(Progress::TaskIncrement { amount: 20 });

        match receiver.recv().await.unwrap() {
            UiEvent::Progress(Progress::TaskIncrement { amount }) => assert_eq!(amount, 20),
            UiEvent::Progress(other) => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn report_lines_wait_for_a_full_channel() {
        let (sender, mut receiver) = mpsc::channel(1);
        let callback = CliProgressHandler::new(sender).get_callback();
        callback(Progress::TaskIncrement { amount: 1 });
        // Dropped: the channel is full and bar updates never block.
        callback(Progress::TaskIncrement { amount: 2 });

        let producer = std::thread::spawn(move || {
            callback(Progress::Status("Start: tot energy = 1.0".into()));
        });

        let first = receiver.blocking_recv().unwrap();
        assert!(matches!(
            first,
            UiEvent::Progress(Progress::TaskIncrement { amount: 1 })
        ));
        let second = receiver.blocking_recv().unwrap();
        assert!(matches!(
            second,
            UiEvent::Progress(Progress::Status(ref line)) if line.starts_with("Start:")
        ));
        producer.join().unwrap();
    }

    #[tokio::test]
    async fn manager_stops_on_shutdown_signal() {
        let (manager, sender, shutdown) = UiManager::new();
        manager.mp.set_draw_target(ProgressDrawTarget::hidden());
        let handle = tokio::spawn(manager.run());

        sender
            .send(UiEvent::Progress(Progress::PhaseStart {
                name: "Setup".into(),
            }))
            .await
            .unwrap();
        shutdown.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
