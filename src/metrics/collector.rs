//! Metrics collection using Prometheus
//!
//! Counters for range writes and rejections plus a couple of service-level
//! gauges, all registered on one registry exported by the admin listener.

use anyhow::Result;
use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the range service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Range write metrics
    range_metrics: RangeMetrics,

    started_at: Instant,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Storage status as last probed (1=up, 0=down)
    pub storage_up: IntGauge,
}

/// Range-related metrics
#[derive(Clone)]
pub struct RangeMetrics {
    pub ranges_created_total: IntCounter,
    pub ranges_updated_total: IntCounter,
    pub ranges_deleted_total: IntCounter,

    /// Rejected writes by error kind
    pub rejections_total: IntCounterVec,

    /// Store round-trip time by service operation
    pub operation_duration_seconds: HistogramVec,
}

impl MetricsCollector {
    /// Create a collector on a fresh registry
    pub fn new() -> Result<Self> {
        Self::with_registry(Registry::new())
    }

    /// Create a collector on an existing registry
    pub fn with_registry(registry: Registry) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let range_metrics = RangeMetrics::new(&registry)?;

        Ok(Self {
            registry: Arc::new(registry),
            service_metrics,
            range_metrics,
            started_at: Instant::now(),
        })
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    pub fn ranges(&self) -> &RangeMetrics {
        &self.range_metrics
    }

    pub fn record_range_created(&self) {
        self.range_metrics.ranges_created_total.inc();
    }

    pub fn record_range_updated(&self) {
        self.range_metrics.ranges_updated_total.inc();
    }

    pub fn record_range_deleted(&self) {
        self.range_metrics.ranges_deleted_total.inc();
    }

    /// Record a rejected write, labelled with the error kind
    pub fn record_rejection(&self, kind: &str) {
        self.range_metrics
            .rejections_total
            .with_label_values(&[kind])
            .inc();
    }

    pub fn record_operation(&self, operation: &str, duration: Duration) {
        self.range_metrics
            .operation_duration_seconds
            .with_label_values(&[operation])
            .observe(duration.as_secs_f64());
    }

    /// Update storage status from the latest probe
    pub fn update_storage_status(&self, up: bool) {
        self.service_metrics.storage_up.set(i64::from(up));
    }

    /// Refresh the uptime gauge; called before each scrape
    pub fn refresh_uptime(&self) {
        self.service_metrics
            .uptime_seconds
            .set(self.started_at.elapsed().as_secs() as i64);
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("range_vault_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let storage_up = IntGauge::new(
            "range_vault_storage_up",
            "Storage status as last probed (1=up, 0=down)",
        )?;
        registry.register(Box::new(storage_up.clone()))?;

        Ok(Self {
            uptime_seconds,
            storage_up,
        })
    }
}

impl RangeMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let ranges_created_total =
            IntCounter::new("range_vault_ranges_created_total", "Total ranges created")?;
        registry.register(Box::new(ranges_created_total.clone()))?;

        let ranges_updated_total =
            IntCounter::new("range_vault_ranges_updated_total", "Total ranges updated")?;
        registry.register(Box::new(ranges_updated_total.clone()))?;

        let ranges_deleted_total =
            IntCounter::new("range_vault_ranges_deleted_total", "Total ranges deleted")?;
        registry.register(Box::new(ranges_deleted_total.clone()))?;

        let rejections_total = IntCounterVec::new(
            Opts::new(
                "range_vault_range_rejections_total",
                "Total rejected range writes",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        let operation_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "range_vault_operation_duration_seconds",
                "Range service operation duration",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration_seconds.clone()))?;

        Ok(Self {
            ranges_created_total,
            ranges_updated_total,
            ranges_deleted_total,
            rejections_total,
            operation_duration_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        let _service = collector.service();
        let _ranges = collector.ranges();
    }

    #[test]
    fn test_range_counters() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.record_range_created();
        collector.record_range_created();
        collector.record_range_updated();
        collector.record_range_deleted();

        assert_eq!(collector.ranges().ranges_created_total.get(), 2);
        assert_eq!(collector.ranges().ranges_updated_total.get(), 1);
        assert_eq!(collector.ranges().ranges_deleted_total.get(), 1);
    }

    #[test]
    fn test_rejections_by_reason() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.record_rejection("quota_exceeded");
        collector.record_rejection("quota_exceeded");
        collector.record_rejection("duplicate_name");

        let rejections = &collector.ranges().rejections_total;
        assert_eq!(rejections.with_label_values(&["quota_exceeded"]).get(), 2);
        assert_eq!(rejections.with_label_values(&["duplicate_name"]).get(), 1);
    }

    #[test]
    fn test_storage_status_updates() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.update_storage_status(true);
        assert_eq!(collector.service().storage_up.get(), 1);

        collector.update_storage_status(false);
        assert_eq!(collector.service().storage_up.get(), 0);
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let registry = Registry::new();
        let _first = ServiceMetrics::new(&registry).expect("first registration");
        assert!(ServiceMetrics::new(&registry).is_err());
    }

    #[test]
    fn test_metrics_timer() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");
        let timer = collector.start_timer();

        std::thread::sleep(Duration::from_millis(10));
        let duration = timer.elapsed();

        assert!(duration >= Duration::from_millis(10));

        let final_duration = timer.stop();
        assert!(final_duration >= Duration::from_millis(10));
        collector.record_operation("save_range", final_duration);
    }
}
