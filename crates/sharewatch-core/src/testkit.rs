//! Small capability surfaces used by the unit tests of this crate.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::Mutex;
use sharewatch_types::Operation;

use crate::capability::{Capability, Subject};
use crate::monitor::Monitored;
use crate::observer::{CallObserver, Failure, Invocation};

// === Reading ===

pub trait Reading: Subject {
    fn value(&self) -> i64;
}

pub mod reading_ops {
    use sharewatch_types::Operation;

    pub const VALUE: Operation = Operation::new("Reading", "value", "()");
}

impl Capability for dyn Reading {
    const NAME: &'static str = "Reading";
    const OPERATIONS: &'static [Operation] = &[reading_ops::VALUE];

    fn view(monitored: &Monitored<Self>) -> &Self {
        monitored
    }

    fn into_boxed(monitored: Monitored<Self>) -> Box<Self> {
        Box::new(monitored)
    }

    fn into_shared(monitored: Monitored<Self>) -> Arc<Self> {
        Arc::new(monitored)
    }
}

impl Reading for Monitored<dyn Reading> {
    fn value(&self) -> i64 {
        self.call(reading_ops::VALUE, &(), |reading| reading.value())
    }
}

#[derive(Debug)]
pub struct Fixed(pub i64);

impl Subject for Fixed {}

impl Reading for Fixed {
    fn value(&self) -> i64 {
        self.0
    }
}

// === Gauge ===

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GaugeError {
    #[error("gauge overflow: {value} exceeds {limit}")]
    Overflow { value: i64, limit: i64 },
    #[error("gauge is empty")]
    Empty,
}

pub trait Gauge: Subject {
    fn read(&self) -> i64;
    fn add(&self, delta: i64) -> Result<i64, GaugeError>;
    fn snapshot(&self) -> Box<dyn Reading>;
    fn fork(&self) -> Arc<dyn Gauge>;
    fn latest(&self) -> Option<Box<dyn Reading>>;
    fn try_snapshot(&self) -> Result<Box<dyn Reading>, GaugeError>;
    fn explode(&self) -> i64;
}

pub mod gauge_ops {
    use sharewatch_types::Operation;

    pub const READ: Operation = Operation::new("Gauge", "read", "()");
    pub const ADD: Operation = Operation::new("Gauge", "add", "(i64)");
    pub const SNAPSHOT: Operation = Operation::new("Gauge", "snapshot", "()").returning("Reading");
    pub const FORK: Operation = Operation::new("Gauge", "fork", "()").returning("Gauge");
    pub const LATEST: Operation = Operation::new("Gauge", "latest", "()").returning("Reading");
    pub const TRY_SNAPSHOT: Operation =
        Operation::new("Gauge", "try_snapshot", "()").returning("Reading");
    pub const EXPLODE: Operation = Operation::new("Gauge", "explode", "()");
}

impl Capability for dyn Gauge {
    const NAME: &'static str = "Gauge";
    const OPERATIONS: &'static [Operation] = &[
        gauge_ops::READ,
        gauge_ops::ADD,
        gauge_ops::SNAPSHOT,
        gauge_ops::FORK,
        gauge_ops::LATEST,
        gauge_ops::TRY_SNAPSHOT,
        gauge_ops::EXPLODE,
    ];

    fn view(monitored: &Monitored<Self>) -> &Self {
        monitored
    }

    fn into_boxed(monitored: Monitored<Self>) -> Box<Self> {
        Box::new(monitored)
    }

    fn into_shared(monitored: Monitored<Self>) -> Arc<Self> {
        Arc::new(monitored)
    }
}

impl fmt::Display for dyn Gauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gauge={}", self.read())
    }
}

impl Hash for dyn Gauge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.read().hash(state);
    }
}

impl Gauge for Monitored<dyn Gauge> {
    fn read(&self) -> i64 {
        self.call(gauge_ops::READ, &(), |gauge| gauge.read())
    }

    fn add(&self, delta: i64) -> Result<i64, GaugeError> {
        self.try_call(gauge_ops::ADD, &delta, |gauge| gauge.add(delta))
    }

    fn snapshot(&self) -> Box<dyn Reading> {
        self.call_dependent(gauge_ops::SNAPSHOT, &(), |gauge| gauge.snapshot())
    }

    fn fork(&self) -> Arc<dyn Gauge> {
        self.call_dependent(gauge_ops::FORK, &(), |gauge| gauge.fork())
    }

    fn latest(&self) -> Option<Box<dyn Reading>> {
        self.call_dependent(gauge_ops::LATEST, &(), |gauge| gauge.latest())
    }

    fn try_snapshot(&self) -> Result<Box<dyn Reading>, GaugeError> {
        self.try_call_dependent(gauge_ops::TRY_SNAPSHOT, &(), |gauge| gauge.try_snapshot())
    }

    fn explode(&self) -> i64 {
        self.call(gauge_ops::EXPLODE, &(), |gauge| gauge.explode())
    }
}

/// Plain gauge with an upper bound.
#[derive(Debug)]
pub struct AtomicGauge {
    value: AtomicI64,
    limit: i64,
}

impl AtomicGauge {
    pub fn shared(value: i64, limit: i64) -> Arc<dyn Gauge> {
        Arc::new(Self {
            value: AtomicI64::new(value),
            limit,
        })
    }
}

impl Subject for AtomicGauge {}

impl Gauge for AtomicGauge {
    fn read(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }

    fn add(&self, delta: i64) -> Result<i64, GaugeError> {
        let value = self.read() + delta;
        if value > self.limit {
            return Err(GaugeError::Overflow {
                value,
                limit: self.limit,
            });
        }
        self.value.store(value, Ordering::SeqCst);
        Ok(value)
    }

    fn snapshot(&self) -> Box<dyn Reading> {
        Box::new(Fixed(self.read()))
    }

    fn fork(&self) -> Arc<dyn Gauge> {
        Self::shared(self.read(), self.limit)
    }

    fn latest(&self) -> Option<Box<dyn Reading>> {
        (self.read() != 0).then(|| self.snapshot())
    }

    fn try_snapshot(&self) -> Result<Box<dyn Reading>, GaugeError> {
        if self.read() == 0 {
            Err(GaugeError::Empty)
        } else {
            Ok(self.snapshot())
        }
    }

    fn explode(&self) -> i64 {
        panic!("gauge exploded at {}", self.read())
    }
}

// === Observers ===

/// Observer that records every event as a line of text.
#[derive(Debug, Default)]
pub struct Journal {
    events: Mutex<Vec<String>>,
}

impl Journal {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

impl CallObserver for Journal {
    fn before_invoke(&self, invocation: &Invocation<'_>) {
        self.events
            .lock()
            .push(format!("before {}", invocation.operation()));
    }

    fn after_invoke(&self, invocation: &Invocation<'_>) {
        self.events
            .lock()
            .push(format!("after {}", invocation.operation()));
    }

    fn on_failure(&self, failure: &Failure<'_>, invocation: &Invocation<'_>) {
        self.events
            .lock()
            .push(format!("failure {} {}", invocation.operation(), failure));
    }
}

/// Observer that panics on every event.
#[derive(Debug, Default)]
pub struct Panicking;

impl CallObserver for Panicking {
    fn before_invoke(&self, _invocation: &Invocation<'_>) {
        panic!("observer broke before");
    }

    fn after_invoke(&self, _invocation: &Invocation<'_>) {
        panic!("observer broke after");
    }

    fn on_failure(&self, _failure: &Failure<'_>, _invocation: &Invocation<'_>) {
        panic!("observer broke on failure");
    }
}
