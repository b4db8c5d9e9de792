use crate::error::Error;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

/// Run progress: total tickers processed, successes and failures.
///
/// Every bar is hidden when the binary runs with `--trace`, so log lines are not interleaved
/// with redraws.
pub(crate) struct Progress {
    _multi: Option<MultiProgress>,
    total: ProgressBar,
    success: ProgressBar,
    fails: ProgressBar,
}

impl Progress {
    pub(crate) fn new(len: usize, tui: bool) -> Result<Self, Error> {
        if !tui {
            return Ok(Self {
                _multi: None,
                total: ProgressBar::hidden(),
                success: ProgressBar::hidden(),
                fails: ProgressBar::hidden(),
            });
        }

        // overall multi progress bar
        let multi = MultiProgress::new();

        // tickers processed, skipped included
        let total = multi.add(
            ProgressBar::new(len as u64).with_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.magenta} {msg}\n \
                        {prefix:>9.white} |{bar:57.white/grey}| {pos:<2} / {human_len} \
                        ({percent_precise}%) [Time: {elapsed}, ETA: {eta}]",
                    )?
                    .progress_chars("## "),
            ),
        );
        total.set_prefix("total");
        total.enable_steady_tick(Duration::from_millis(100));

        // records loaded
        let success = multi.insert_after(
            &total,
            ProgressBar::new(len as u64).with_style(
                ProgressStyle::default_bar()
                    .template(" {prefix:>9.green} |{bar:57.green}| {pos:<2.green}")?
                    .progress_chars("## "),
            ),
        );
        success.set_prefix("successes");

        // permanent and exhausted transient failures
        let fails = multi.insert_after(
            &success,
            ProgressBar::new(len as u64).with_style(
                ProgressStyle::default_bar()
                    .template(" {prefix:>9.red} |{bar:57.red}| {pos:<2.red}")?
                    .progress_chars("## "),
            ),
        );
        fails.set_prefix("failures");

        Ok(Self {
            _multi: Some(multi),
            total,
            success,
            fails,
        })
    }

    pub(crate) fn working_on(&self, ticker: &str) {
        self.total.set_message(format!("[{ticker}]"));
    }

    pub(crate) fn succeeded(&self) {
        self.success.inc(1);
        self.total.inc(1);
    }

    pub(crate) fn failed(&self) {
        self.fails.inc(1);
        self.total.inc(1);
    }

    pub(crate) fn skipped(&self) {
        self.total.inc(1);
    }

    pub(crate) fn finish(&self) {
        self.total.finish_and_clear();
        self.success.finish_and_clear();
        self.fails.finish_and_clear();
    }
}
