//! Prometheus text exposition.
//!
//! Counters and gauges render as `name{labels} value`. Histograms render
//! one `_bucket` line per quantile threshold, where `le` is the
//! nearest-rank quantile of the retained samples, followed by `_sum` and
//! `_count`. In `Legacy` mode every bucket carries the total sample count;
//! `Cumulative` mode counts samples <= `le` and adds a `+Inf` bucket.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::config::HistogramExport;
use crate::metrics::aggregator::{MetricStore, SampleSeries};
use crate::metrics::key::MetricKey;

/// Quantiles used as histogram bucket thresholds.
pub const QUANTILE_THRESHOLDS: [f64; 8] = [0.1, 0.25, 0.5, 0.75, 0.9, 0.95, 0.99, 1.0];

/// Nearest-rank quantile of an ascending slice.
///
/// Index is `ceil(n * q) - 1` clamped into range; an empty slice yields 0.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }

    let last = sorted.len() as i64 - 1;
    let rank = (sorted.len() as f64 * q).ceil() as i64 - 1;
    sorted[rank.clamp(0, last) as usize]
}

/// Format a sample value the way the text format expects.
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

pub(crate) fn render(store: &MetricStore, mode: HistogramExport) -> String {
    let mut out = String::new();

    render_scalars(&mut out, &store.counters, "counter");
    render_scalars(&mut out, &store.gauges, "gauge");

    let mut family: Option<&str> = None;
    for (key, series) in &store.histograms {
        if family != Some(key.name()) {
            let _ = writeln!(out, "# TYPE {} histogram", key.name());
            family = Some(key.name());
        }
        render_histogram(&mut out, key, series, mode);
    }

    out
}

fn render_scalars(out: &mut String, series: &BTreeMap<MetricKey, f64>, kind: &str) {
    let mut family: Option<&str> = None;
    for (key, value) in series {
        if family != Some(key.name()) {
            let _ = writeln!(out, "# TYPE {} {}", key.name(), kind);
            family = Some(key.name());
        }
        let _ = writeln!(out, "{} {}", key, format_value(*value));
    }
}

fn render_histogram(out: &mut String, key: &MetricKey, series: &SampleSeries, mode: HistogramExport) {
    let mut sorted = series.values.clone();
    sorted.sort_by(f64::total_cmp);

    for q in QUANTILE_THRESHOLDS {
        let bound = quantile(&sorted, q);
        let count = match mode {
            HistogramExport::Legacy => series.count,
            HistogramExport::Cumulative => cumulative_count(&sorted, bound, series.count),
        };
        let le = format_value(bound);
        let _ = writeln!(
            out,
            "{}_bucket{} {}",
            key.name(),
            key.label_block(Some(("le", le.as_str()))),
            count
        );
    }
    if mode == HistogramExport::Cumulative {
        let _ = writeln!(
            out,
            "{}_bucket{} {}",
            key.name(),
            key.label_block(Some(("le", "+Inf"))),
            series.count
        );
    }

    let labels = key.label_block(None);
    let _ = writeln!(out, "{}_sum{} {}", key.name(), labels, format_value(series.sum));
    let _ = writeln!(out, "{}_count{} {}", key.name(), labels, series.count);
}

/// Samples <= `le`, scaled from the reservoir up to the full observation count.
fn cumulative_count(sorted: &[f64], le: f64, total: u64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let below = sorted.partition_point(|v| *v <= le);
    if below == sorted.len() {
        return total;
    }
    (below as f64 / sorted.len() as f64 * total as f64).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetricsConfig;
    use crate::metrics::MetricAggregator;

    #[test]
    fn test_quantile_nearest_rank() {
        assert_eq!(quantile(&[], 0.5), 0.0);
        assert_eq!(quantile(&[5.0], 0.5), 5.0);
        assert_eq!(quantile(&[1.0, 2.0, 3.0, 4.0, 5.0], 0.5), 3.0);
        assert_eq!(quantile(&[1.0, 2.0, 3.0, 4.0, 5.0], 0.0), 1.0);
        assert_eq!(quantile(&[1.0, 2.0, 3.0, 4.0, 5.0], 1.0), 5.0);
        assert_eq!(quantile(&[1.0, 2.0, 3.0, 4.0, 5.0], 0.99), 5.0);
    }

    #[test]
    fn test_counter_and_gauge_lines() {
        let agg = MetricAggregator::default();
        agg.increment("http_requests_total", &[("path", "/x"), ("method", "GET")], 1.0);
        agg.increment("http_requests_total", &[("method", "POST"), ("path", "/x")], 2.0);
        agg.set("in_flight", 3.5, &[]);

        let text = agg.export_prometheus();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "# TYPE http_requests_total counter",
                r#"http_requests_total{method="GET",path="/x"} 1"#,
                r#"http_requests_total{method="POST",path="/x"} 2"#,
                "# TYPE in_flight gauge",
                "in_flight 3.5",
            ]
        );
    }

    #[test]
    fn test_legacy_histogram_buckets_report_total_count() {
        let agg = MetricAggregator::default();
        for v in [5.0, 1.0, 4.0, 2.0, 3.0] {
            agg.observe("job_seconds", v, &[]);
        }

        let text = agg.export_prometheus();
        let buckets: Vec<&str> = text.lines().filter(|l| l.contains("_bucket")).collect();
        assert_eq!(buckets.len(), QUANTILE_THRESHOLDS.len());
        assert!(buckets.iter().all(|l| l.ends_with(" 5")));
        assert_eq!(buckets[2], r#"job_seconds_bucket{le="3"} 5"#);
        assert!(text.contains("job_seconds_sum 15\n"));
        assert!(text.contains("job_seconds_count 5\n"));
        assert!(text.starts_with("# TYPE job_seconds histogram\n"));
    }

    #[test]
    fn test_histogram_labels_merge_with_le() {
        let agg = MetricAggregator::default();
        agg.observe("http_request_duration_seconds", 0.25, &[("status", "200"), ("method", "GET")]);

        let text = agg.export_prometheus();
        assert!(text.contains(
            r#"http_request_duration_seconds_bucket{method="GET",status="200",le="0.25"} 1"#
        ));
        assert!(text.contains(r#"http_request_duration_seconds_sum{method="GET",status="200"} 0.25"#));
        assert!(text.contains(r#"http_request_duration_seconds_count{method="GET",status="200"} 1"#));
    }

    #[test]
    fn test_cumulative_histogram_counts() {
        let config = MetricsConfig {
            histogram_export: HistogramExport::Cumulative,
            ..MetricsConfig::default()
        };
        let agg = MetricAggregator::new(&config);
        for v in 1..=10 {
            agg.observe("size", v as f64, &[]);
        }

        let text = agg.export_prometheus();
        assert!(text.contains(r#"size_bucket{le="1"} 1"#));
        assert!(text.contains(r#"size_bucket{le="5"} 5"#));
        assert!(text.contains(r#"size_bucket{le="10"} 10"#));
        assert!(text.contains(r#"size_bucket{le="+Inf"} 10"#));
    }

    #[test]
    fn test_format_special_values() {
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(2.0), "2");
    }
}
