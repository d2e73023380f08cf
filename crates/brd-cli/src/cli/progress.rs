//! Terminal progress for `brd pack`, drawn with indicatif on stderr.
//!
//! Each release starts as a "Waiting" line in manifest order. Once its
//! response arrives the line becomes a download bar, followed by a compress
//! bar while the file is copied into the archive.

use brd_core::instrument::{Hooks, ProgressFactory, ReleaseProgress, StreamObserver};
use brd_core::release::Release;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

const BAR_TEMPLATE: &str = "{msg:30} {bytes:>10} / {total_bytes:10} [{bar:40}] {percent:>3}%";
const SPINNER_TEMPLATE: &str = "{msg:30} {bytes:>10}";

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

#[derive(Default)]
pub struct TerminalProgress {
    multi: MultiProgress,
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
        }
    }
}

impl ProgressFactory for TerminalProgress {
    fn pending(&self, release: &Release) -> Box<dyn ReleaseProgress> {
        let waiting = self.multi.add(ProgressBar::new_spinner());
        waiting.set_message(format!("Waiting {}", release.name));
        waiting.tick();
        Box::new(ReleaseBars {
            multi: self.multi.clone(),
            name: release.name.clone(),
            waiting,
            active: Vec::new(),
        })
    }
}

struct ReleaseBars {
    multi: MultiProgress,
    name: String,
    waiting: ProgressBar,
    active: Vec<ProgressBar>,
}

impl ReleaseBars {
    fn bar_after(&self, after: &ProgressBar, len: Option<u64>, msg: String) -> ProgressBar {
        let bar = match len {
            Some(len) => ProgressBar::new(len).with_style(style(BAR_TEMPLATE)),
            None => ProgressBar::no_length().with_style(style(SPINNER_TEMPLATE)),
        };
        let bar = self.multi.insert_after(after, bar);
        bar.set_message(msg);
        bar
    }
}

impl ReleaseProgress for ReleaseBars {
    fn hooks(&mut self, content_length: Option<u64>) -> Hooks {
        let download = self.bar_after(
            &self.waiting,
            content_length,
            format!("Downloading {}", self.name),
        );
        self.waiting.finish_and_clear();
        let compress = self.bar_after(
            &download,
            content_length,
            format!("Compressing {}", self.name),
        );
        self.active = vec![download.clone(), compress.clone()];
        Hooks {
            download: Some(Box::new(BarObserver {
                bar: download,
                done: Done::Clear,
            })),
            compress: Some(Box::new(BarObserver {
                bar: compress,
                done: Done::Message("done!"),
            })),
        }
    }

    fn skipped(&mut self) {
        self.waiting.finish_and_clear();
    }

    fn failed(&mut self) {
        self.waiting.finish_and_clear();
        for bar in self.active.drain(..) {
            bar.abandon_with_message(format!("Failed {}", self.name));
        }
    }
}

enum Done {
    Clear,
    Message(&'static str),
}

struct BarObserver {
    bar: ProgressBar,
    done: Done,
}

impl StreamObserver for BarObserver {
    fn observe(&mut self, chunk: &[u8]) {
        self.bar.inc(chunk.len() as u64);
    }

    fn finish(&mut self) {
        match self.done {
            Done::Clear => self.bar.finish_and_clear(),
            Done::Message(msg) => self.bar.finish_with_message(msg),
        }
    }
}
