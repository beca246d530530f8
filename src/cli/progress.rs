//! Terminal progress display
//!
//! Consumes [`ProgressEvent`]s from the pipeline on a background task. On
//! a terminal each phase gets an indicatif bar and each media file a byte
//! bar (or a spinner when its size is unknown); elsewhere a line is
//! printed per phase plus a periodic status line.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::app::progress::{Phase, ProgressEvent};

const PHASE_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";
const MEDIA_TEMPLATE: &str = "  {msg:30!} [{bar:30.white/blue}] {bytes}/{total_bytes}";
const MEDIA_SPINNER_TEMPLATE: &str = "  {spinner:.blue} {msg:30!} {bytes}";
const TEXT_REPORT_INTERVAL: Duration = Duration::from_secs(10);

/// Handle on the background display task
#[derive(Debug)]
pub struct ProgressDisplay {
    task: Option<JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ProgressDisplay {
    /// Start consuming events
    ///
    /// Bars are drawn only when `enable_bars` is set and stderr is a
    /// terminal; otherwise plain text lines are written.
    pub fn start(events: mpsc::UnboundedReceiver<ProgressEvent>, enable_bars: bool) -> Self {
        let is_terminal = atty::is(atty::Stream::Stderr);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = if enable_bars && is_terminal {
            tokio::spawn(run(events, shutdown_rx, BarView::new()))
        } else {
            tokio::spawn(run(events, shutdown_rx, TextView::new()))
        };

        debug!(
            "Progress display started ({} mode)",
            if enable_bars && is_terminal { "bar" } else { "text" }
        );
        Self {
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Drain the remaining events and stop the display
    pub async fn finish(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

trait View: Send + 'static {
    fn handle(&mut self, event: ProgressEvent);
    fn close(&mut self);
}

async fn run<V: View>(
    mut events: mpsc::UnboundedReceiver<ProgressEvent>,
    mut shutdown_rx: oneshot::Receiver<()>,
    mut view: V,
) {
    loop {
        tokio::select! {
            biased;
            event = events.recv() => match event {
                Some(event) => view.handle(event),
                None => break,
            },
            _ = &mut shutdown_rx => {
                while let Ok(event) = events.try_recv() {
                    view.handle(event);
                }
                break;
            }
        }
    }
    view.close();
}

fn style(template: &str, fallback: fn() -> ProgressStyle) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| fallback())
}

/// indicatif rendering
struct BarView {
    multi: MultiProgress,
    phase: Option<(Phase, ProgressBar)>,
    media: HashMap<String, ProgressBar>,
}

impl BarView {
    fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            phase: None,
            media: HashMap::new(),
        }
    }

    fn media_bar(&mut self, file: &str, total: Option<u64>) -> &ProgressBar {
        let multi = &self.multi;
        self.media.entry(file.to_string()).or_insert_with(|| {
            let bar = match total {
                Some(total) => {
                    let bar = multi.add(ProgressBar::new(total));
                    bar.set_style(
                        style(MEDIA_TEMPLATE, ProgressStyle::default_bar).progress_chars("=> "),
                    );
                    bar
                }
                None => {
                    let bar = multi.add(ProgressBar::new_spinner());
                    bar.set_style(style(MEDIA_SPINNER_TEMPLATE, ProgressStyle::default_spinner));
                    bar
                }
            };
            bar.set_message(file.to_string());
            bar
        })
    }

    fn clear_media(&mut self, only_unsized: bool) {
        self.media.retain(|_, bar| {
            if only_unsized && bar.length().is_some() {
                return true;
            }
            bar.finish_and_clear();
            false
        });
    }
}

impl View for BarView {
    fn handle(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::PhaseStarted { phase, total } => {
                let bar = self.multi.add(ProgressBar::new(total as u64));
                bar.set_style(
                    style(PHASE_TEMPLATE, ProgressStyle::default_bar).progress_chars("##-"),
                );
                bar.set_message(phase.to_string());
                bar.enable_steady_tick(Duration::from_millis(120));
                self.phase = Some((phase, bar));
            }
            ProgressEvent::PostFetched { completed } => {
                if let Some((_, bar)) = &self.phase {
                    bar.set_position(completed as u64);
                }
            }
            ProgressEvent::MediaProgress {
                file,
                written,
                total,
            } => {
                let finished = total.is_some_and(|total| written >= total);
                let bar = self.media_bar(&file, total);
                bar.set_position(written);
                if finished {
                    if let Some(bar) = self.media.remove(&file) {
                        bar.finish_and_clear();
                    }
                }
            }
            ProgressEvent::PostDownloaded { completed, .. } => {
                if let Some((_, bar)) = &self.phase {
                    bar.set_position(completed as u64);
                }
                self.clear_media(true);
            }
            ProgressEvent::PhaseFinished { phase } => {
                if let Some((_, bar)) = self.phase.take() {
                    if let Some(len) = bar.length() {
                        bar.set_position(len);
                    }
                    bar.finish_with_message(format!("{} done", phase));
                }
                self.clear_media(false);
            }
        }
    }

    fn close(&mut self) {
        self.clear_media(false);
        if let Some((phase, bar)) = self.phase.take() {
            bar.abandon_with_message(format!("{} interrupted", phase));
        }
    }
}

/// Plain text rendering for pipes and log files
struct TextView {
    phase: Option<(Phase, usize)>,
    completed: usize,
    last_report: Instant,
}

impl TextView {
    fn new() -> Self {
        Self {
            phase: None,
            completed: 0,
            last_report: Instant::now(),
        }
    }

    fn report(&mut self, completed: usize) {
        self.completed = completed;
        if self.last_report.elapsed() < TEXT_REPORT_INTERVAL {
            return;
        }
        if let Some((phase, total)) = self.phase {
            eprintln!("{}: {}/{} completed", phase, completed, total);
        }
        self.last_report = Instant::now();
    }
}

impl View for TextView {
    fn handle(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::PhaseStarted { phase, total } => {
                eprintln!("{}: {} to process", phase, total);
                self.phase = Some((phase, total));
                self.completed = 0;
                self.last_report = Instant::now();
            }
            ProgressEvent::PostFetched { completed }
            | ProgressEvent::PostDownloaded { completed, .. } => self.report(completed),
            ProgressEvent::MediaProgress { .. } => {}
            ProgressEvent::PhaseFinished { phase } => {
                eprintln!("{}: finished", phase);
                self.phase = None;
            }
        }
    }

    fn close(&mut self) {
        if let Some((phase, total)) = self.phase.take() {
            eprintln!("{}: stopped after {}/{}", phase, self.completed, total);
        }
    }
}
