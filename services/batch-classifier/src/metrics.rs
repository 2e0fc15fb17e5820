//! Prometheus metrics
//!
//! A batch run has no scrape endpoint, so the rendered registry is written to
//! a textfile (node_exporter textfile collector format) when the run ends.
//!
//! - `classifier_results_total` (counter): label `label`
//! - `classifier_lookup_requests_total` (counter): label `outcome`
//! - `classifier_lookup_duration_seconds` (histogram)
//! - `classifier_credentials_exhausted_total` (counter, recorded by the pool)
//! - `classifier_credentials_in_rotation` (gauge, recorded by the pool)
//! - `classifier_flushes_total` (counter): label `status`, recorded by the checkpointer

use std::path::Path;

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

const LOOKUP_DURATION: &str = "classifier_lookup_duration_seconds";

/// Bucket boundaries from 5ms up to the longest lookup timeout worth waiting on.
const LOOKUP_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

fn builder() -> PrometheusBuilder {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(LOOKUP_DURATION.to_string()), LOOKUP_BUCKETS)
        .expect("failed to set histogram buckets")
}

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_recorder() -> PrometheusHandle {
    builder()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Record one persisted classification.
pub fn record_result(label: &str) {
    metrics::counter!("classifier_results_total", "label" => label.to_string()).increment(1);
}

/// Record one lookup attempt. `outcome` is `ok`, `quota`, `status` or `transport`.
pub fn record_lookup(outcome: &'static str, duration_secs: f64) {
    metrics::counter!("classifier_lookup_requests_total", "outcome" => outcome).increment(1);
    metrics::histogram!(LOOKUP_DURATION).record(duration_secs);
}

/// Write the rendered registry to `path`, replacing any previous textfile.
pub async fn write_textfile(handle: &PrometheusHandle, path: &Path) -> std::io::Result<()> {
    let tmp = path.with_extension("prom.tmp");
    tokio::fs::write(&tmp, handle.render()).await?;
    tokio::fs::rename(&tmp, path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusRecorder;

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        record_result("short");
        record_lookup("ok", 0.05);
    }

    /// Isolated recorder/handle pair: only one global recorder can exist per
    /// process, and install_recorder() panics on a second call.
    fn isolated_recorder() -> (PrometheusRecorder, PrometheusHandle) {
        let recorder = builder().build_recorder();
        let handle = recorder.handle();
        (recorder, handle)
    }

    #[test]
    fn record_result_counts_by_label() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_result("short");
        record_result("failed");

        let output = handle.render();
        assert!(output.contains("classifier_results_total"));
        assert!(output.contains("label=\"short\""));
        assert!(output.contains("label=\"failed\""));
    }

    #[test]
    fn record_lookup_renders_counter_and_histogram_buckets() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_lookup("quota", 0.003);
        record_lookup("transport", 12.0);

        let output = handle.render();
        assert!(output.contains("outcome=\"quota\""));
        assert!(output.contains("outcome=\"transport\""));
        assert!(
            output.contains("classifier_lookup_duration_seconds_bucket"),
            "duration must render as a histogram"
        );
        assert!(output.contains("le=\"0.005\""));
        assert!(output.contains("le=\"30\""));
        assert!(output.contains("le=\"+Inf\""));
    }

    #[tokio::test]
    async fn textfile_contains_rendered_metrics() {
        let (recorder, handle) = isolated_recorder();
        {
            let _guard = metrics::set_default_local_recorder(&recorder);
            record_result("standard");
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classifier.prom");
        write_textfile(&handle, &path).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(contents.contains("classifier_results_total"));
        assert!(!dir.path().join("classifier.prom.tmp").exists());
    }
}
