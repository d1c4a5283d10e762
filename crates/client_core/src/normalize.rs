//! Shape-tolerant extraction of result lists from upstream payloads.
//!
//! The upstream returns lists as a bare array, wrapped in a named field, nested
//! one level deeper, or occasionally as a single object. Each [`ListKind`] gets
//! an ordered set of [`ListShape`] adapters; the first adapter that matches
//! wins and is reported back as a [`MatchedShape`].

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::domain::{Appointment, Provider, VisitRecord};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    Providers,
    Appointments,
    VisitRecords,
}

impl ListKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ListKind::Providers => "providers",
            ListKind::Appointments => "appointments",
            ListKind::VisitRecords => "visit_records",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListShape {
    /// The payload itself is the sequence.
    Bare,
    /// `{ <field>: [...] }`
    Wrapped(&'static str),
    /// `{ <outer>: { <inner>: [...] } }`
    Nested {
        outer: &'static str,
        inner: &'static str,
    },
    /// First top-level field holding a non-empty sequence of objects, in
    /// payload order.
    FirstSequenceField,
    /// A lone object carrying one of the identifying fields.
    SingleItem(&'static [&'static str]),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchedShape {
    Bare,
    Wrapped(&'static str),
    Nested {
        outer: &'static str,
        inner: &'static str,
    },
    FirstSequenceField(String),
    SingleItem,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no {kind} sequence found in payload")]
pub struct DataShapeError {
    kind: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub items: Vec<T>,
    pub shape: MatchedShape,
    /// Elements that did not decode as `T`.
    pub skipped: usize,
}

impl<T> Normalized<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl ListShape {
    fn matches(&self, payload: &Value) -> Option<(Vec<Value>, MatchedShape)> {
        match self {
            ListShape::Bare => payload
                .as_array()
                .map(|items| (items.clone(), MatchedShape::Bare)),
            ListShape::Wrapped(field) => payload
                .get(*field)
                .and_then(Value::as_array)
                .map(|items| (items.clone(), MatchedShape::Wrapped(*field))),
            ListShape::Nested { outer, inner } => payload
                .get(*outer)
                .and_then(|value| value.get(*inner))
                .and_then(Value::as_array)
                .map(|items| {
                    (
                        items.clone(),
                        MatchedShape::Nested {
                            outer: *outer,
                            inner: *inner,
                        },
                    )
                }),
            // Only a non-empty sequence of objects counts as an envelope; a lone
            // record's own list fields (slot labels) must fall through to SingleItem.
            ListShape::FirstSequenceField => payload.as_object().and_then(|fields| {
                fields.iter().find_map(|(key, value)| {
                    value
                        .as_array()
                        .filter(|items| !items.is_empty() && items.iter().all(Value::is_object))
                        .map(|items| (items.clone(), MatchedShape::FirstSequenceField(key.clone())))
                })
            }),
            ListShape::SingleItem(keys) => payload
                .as_object()
                .filter(|fields| keys.iter().any(|key| fields.contains_key(*key)))
                .map(|_| (vec![payload.clone()], MatchedShape::SingleItem)),
        }
    }
}

/// Registry of shape adapters, one ordered chain per list kind.
#[derive(Debug, Clone)]
pub struct Normalizer {
    adapters: HashMap<ListKind, Vec<ListShape>>,
}

impl Default for Normalizer {
    fn default() -> Self {
        let mut normalizer = Self {
            adapters: HashMap::new(),
        };
        normalizer.register(
            ListKind::Providers,
            vec![
                ListShape::Bare,
                ListShape::Wrapped("doctors"),
                ListShape::Nested {
                    outer: "data",
                    inner: "doctors",
                },
                ListShape::FirstSequenceField,
                ListShape::SingleItem(&["name", "email", "id"]),
            ],
        );
        normalizer.register(
            ListKind::Appointments,
            vec![
                ListShape::Bare,
                ListShape::Wrapped("appointments"),
                ListShape::Nested {
                    outer: "data",
                    inner: "appointments",
                },
                ListShape::FirstSequenceField,
                ListShape::SingleItem(&["id", "patientName", "appointmentTime"]),
            ],
        );
        normalizer.register(
            ListKind::VisitRecords,
            vec![
                ListShape::Bare,
                ListShape::Wrapped("prescription"),
                ListShape::Wrapped("prescriptions"),
                ListShape::Nested {
                    outer: "data",
                    inner: "prescription",
                },
                ListShape::FirstSequenceField,
                ListShape::SingleItem(&["appointmentId", "medication"]),
            ],
        );
        normalizer
    }
}

impl Normalizer {
    /// Replaces the adapter chain for `kind`.
    pub fn register(&mut self, kind: ListKind, shapes: Vec<ListShape>) {
        self.adapters.insert(kind, shapes);
    }

    pub fn extract(&self, kind: ListKind, payload: &Value) -> (Vec<Value>, MatchedShape) {
        let matched = self
            .adapters
            .get(&kind)
            .into_iter()
            .flatten()
            .find_map(|shape| shape.matches(payload));
        match matched {
            Some(found) => found,
            None => {
                if payload.is_null() {
                    debug!(kind = kind.as_str(), "normalize: empty payload");
                } else {
                    let err = DataShapeError {
                        kind: kind.as_str(),
                    };
                    warn!(error = %err, "normalize: treating payload as empty");
                }
                (Vec::new(), MatchedShape::Empty)
            }
        }
    }

    pub fn normalize<T: DeserializeOwned>(&self, kind: ListKind, payload: &Value) -> Normalized<T> {
        let (raw, shape) = self.extract(kind, payload);
        let mut skipped = 0;
        let items = raw
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<T>(item) {
                Ok(decoded) => Some(decoded),
                Err(err) => {
                    skipped += 1;
                    warn!(kind = kind.as_str(), error = %err, "normalize: skipping undecodable element");
                    None
                }
            })
            .collect();
        Normalized {
            items,
            shape,
            skipped,
        }
    }

    pub fn providers(&self, payload: &Value) -> Normalized<Provider> {
        self.normalize(ListKind::Providers, payload)
    }

    pub fn appointments(&self, payload: &Value) -> Normalized<Appointment> {
        self.normalize(ListKind::Appointments, payload)
    }

    pub fn visit_records(&self, payload: &Value) -> Normalized<VisitRecord> {
        self.normalize(ListKind::VisitRecords, payload)
    }
}

#[cfg(test)]
#[path = "tests/normalize_tests.rs"]
mod tests;
