#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal helpers shared by the osm-geojson binaries.
//!
//! [`init_logger`] routes `log` output through `indicatif-log-bridge` so log
//! lines do not tear progress bars, and [`IndicatifProgress`] renders the
//! fetch and build progress as `indicatif` bars.

use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use osm_geojson_overpass::progress::ProgressCallback;

pub use indicatif::MultiProgress;

/// An `indicatif` [`ProgressBar`] driven through [`ProgressCallback`].
pub struct IndicatifProgress {
    bar: ProgressBar,
}

impl IndicatifProgress {
    /// One step per Overpass query, with the current tag as message.
    /// The length is set by the batch via [`ProgressCallback::set_total`].
    #[must_use]
    pub fn fetch_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        Self::add(
            multi,
            message,
            0,
            "{prefix:.bold} {wide_bar:.cyan/dim} {pos}/{len} queries [{elapsed}] {msg}",
        )
    }

    /// One step per build stage, with the stage name as message.
    #[must_use]
    pub fn stages_bar(multi: &MultiProgress, message: &str, stages: u64) -> Arc<dyn ProgressCallback> {
        Self::add(
            multi,
            message,
            stages,
            "{prefix:.bold} {wide_bar:.green/dim} {pos}/{len} stages [{elapsed}] {msg}",
        )
    }

    fn add(multi: &MultiProgress, prefix: &str, len: u64, template: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new(len));
        bar.set_style(
            ProgressStyle::with_template(template)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_prefix(prefix.to_string());

        Arc::new(Self { bar })
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Installs `pretty_env_logger` (filtered by `RUST_LOG`) behind
/// `indicatif-log-bridge`.
///
/// Returns the [`MultiProgress`] every progress bar must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    // A logger may already be installed, e.g. when called twice in tests.
    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_err()
    {
        log::debug!("Logger already initialized");
    }

    log::set_max_level(level);

    multi
}

#[cfg(test)]
mod tests {
    use super::*;
    use indicatif::ProgressDrawTarget;

    #[test]
    fn set_total_resets_position() {
        let multi = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let progress = IndicatifProgress {
            bar: multi.add(ProgressBar::new(0)),
        };

        progress.inc(2);
        progress.set_total(5);
        assert_eq!(progress.bar.length(), Some(5));
        assert_eq!(progress.bar.position(), 0);

        progress.set_message("\"amenity\"=\"school\"".to_string());
        progress.inc(1);
        assert_eq!(progress.bar.position(), 1);
    }
}
