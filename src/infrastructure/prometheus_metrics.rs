//! `MetricsEmitter` backed by a prometheus `Registry`.
//!
//! Instruments are registered lazily, one vec per metric name. The label set
//! of a metric is fixed by its first measurement: later attributes with other
//! keys are ignored and missing keys are recorded as empty values. Names and
//! label keys are sanitised to the prometheus charset (`.` becomes `_`).

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use parking_lot::RwLock;
use prometheus::{
    CounterVec, Error as PrometheusError, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry,
};

use crate::domain::metrics::{KeyValue, MetricKind, MetricsEmitter};

/// Histogram buckets for durations recorded in milliseconds.
const MILLISECOND_BUCKETS: &[f64] = &[
    1.0, 2.5, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
];

enum Instrument {
    Counter(CounterVec),
    Gauge(GaugeVec),
    Histogram(HistogramVec),
}

struct Family {
    keys: Vec<&'static str>,
    instrument: Instrument,
}

impl Family {
    fn observe(
        &self,
        kind: MetricKind,
        name: &str,
        value: f64,
        attributes: &[KeyValue],
    ) -> Result<(), PrometheusError> {
        let values: Vec<&str> = self
            .keys
            .iter()
            .map(|key| {
                attributes
                    .iter()
                    .find(|kv| kv.key == *key)
                    .map_or("", |kv| kv.value.as_str())
            })
            .collect();

        match (&self.instrument, kind) {
            (Instrument::Counter(vec), MetricKind::Counter) => {
                if value.is_nan() || value < 0.0 {
                    return Err(PrometheusError::Msg(format!(
                        "counter {name} cannot be increased by {value}"
                    )));
                }
                vec.get_metric_with_label_values(&values)?.inc_by(value);
            }
            (Instrument::Gauge(vec), MetricKind::Gauge) => {
                vec.get_metric_with_label_values(&values)?.set(value);
            }
            (Instrument::Histogram(vec), MetricKind::Histogram) => {
                vec.get_metric_with_label_values(&values)?.observe(value);
            }
            (registered, _) => {
                return Err(PrometheusError::Msg(format!(
                    "{name} is registered as a {}, not a {}",
                    registered.kind_label(),
                    kind_label(kind)
                )));
            }
        }
        Ok(())
    }
}

impl Instrument {
    fn kind_label(&self) -> &'static str {
        match self {
            Instrument::Counter(_) => kind_label(MetricKind::Counter),
            Instrument::Gauge(_) => kind_label(MetricKind::Gauge),
            Instrument::Histogram(_) => kind_label(MetricKind::Histogram),
        }
    }
}

pub struct PrometheusMetrics {
    registry: Registry,
    families: RwLock<HashMap<&'static str, Family>>,
}

impl PrometheusMetrics {
    /// Every exported series carries a constant `service_name` label.
    pub fn new(service_name: &str) -> Result<Self, PrometheusError> {
        let labels = HashMap::from([("service_name".to_string(), service_name.to_string())]);
        Ok(Self {
            registry: Registry::new_custom(None, Some(labels))?,
            families: RwLock::new(HashMap::new()),
        })
    }

    /// The registry scraped by `GET /metrics`.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn record(
        &self,
        kind: MetricKind,
        name: &'static str,
        value: f64,
        attributes: &[KeyValue],
    ) -> Result<(), PrometheusError> {
        if let Some(family) = self.families.read().get(name) {
            return family.observe(kind, name, value, attributes);
        }

        let mut families = self.families.write();
        let family = match families.entry(name) {
            Entry::Occupied(existing) => existing.into_mut(),
            Entry::Vacant(slot) => slot.insert(self.register(kind, name, attributes)?),
        };
        family.observe(kind, name, value, attributes)
    }

    fn register(
        &self,
        kind: MetricKind,
        name: &'static str,
        attributes: &[KeyValue],
    ) -> Result<Family, PrometheusError> {
        let keys: Vec<&'static str> = attributes.iter().map(|kv| kv.key).collect();
        let label_names: Vec<String> = keys.iter().map(|key| sanitize(key)).collect();
        let label_names: Vec<&str> = label_names.iter().map(String::as_str).collect();
        let metric_name = sanitize(name);
        let help = format!("{name} ({})", kind_label(kind));

        let instrument = match kind {
            MetricKind::Counter => {
                let vec = CounterVec::new(Opts::new(metric_name, help), &label_names)?;
                self.registry.register(Box::new(vec.clone()))?;
                Instrument::Counter(vec)
            }
            MetricKind::Gauge => {
                let vec = GaugeVec::new(Opts::new(metric_name, help), &label_names)?;
                self.registry.register(Box::new(vec.clone()))?;
                Instrument::Gauge(vec)
            }
            MetricKind::Histogram => {
                let vec = HistogramVec::new(
                    HistogramOpts::new(metric_name, help).buckets(MILLISECOND_BUCKETS.to_vec()),
                    &label_names,
                )?;
                self.registry.register(Box::new(vec.clone()))?;
                Instrument::Histogram(vec)
            }
        };

        log::debug!("registered {} {name} with labels {keys:?}", kind_label(kind));
        Ok(Family { keys, instrument })
    }
}

impl MetricsEmitter for PrometheusMetrics {
    fn emit(&self, kind: MetricKind, name: &'static str, value: f64, attributes: &[KeyValue]) {
        if let Err(e) = self.record(kind, name, value, attributes) {
            log::warn!("dropping measurement for {name}: {e}");
        }
    }
}

fn kind_label(kind: MetricKind) -> &'static str {
    match kind {
        MetricKind::Counter => "counter",
        MetricKind::Gauge => "gauge",
        MetricKind::Histogram => "histogram",
    }
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
