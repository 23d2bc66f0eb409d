//! Hand-off point for sensor readings leaving the gateway.

use crate::sensor::SensorKind;

/// Receives one scalar per decoded sensor reading. Fire-and-forget: the
/// dispatcher never waits on or inspects the outcome, so implementations
/// that do I/O should queue or spawn.
pub trait TelemetrySink: Send + Sync {
    fn record(&self, kind: SensorKind, value: f64);
}

/// Discards every reading.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn record(&self, _kind: SensorKind, _value: f64) {}
}

impl<F> TelemetrySink for F
where
    F: Fn(SensorKind, f64) + Send + Sync,
{
    fn record(&self, kind: SensorKind, value: f64) {
        self(kind, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn closures_are_sinks() {
        let seen = Mutex::new(Vec::new());
        let sink = |kind: SensorKind, value: f64| seen.lock().unwrap().push((kind, value));
        sink.record(SensorKind::Light, 3.0);
        NullSink.record(SensorKind::Light, 4.0);
        assert_eq!(*seen.lock().unwrap(), vec![(SensorKind::Light, 3.0)]);
    }
}
