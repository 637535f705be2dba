pub mod convert;
pub mod directives;

use serde_json::Value;

use crate::error::MapError;
use convert::FromJson;
use directives::{Mappable, directives_for};

/// What to do when a field's JSON value cannot be converted.
///
/// `UnknownEnumVariant` always aborts the call regardless of policy.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    serde::Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MappingPolicy {
    /// Skip the offending field, keep its default and report it.
    #[default]
    Lenient,
    /// Abort the whole call on the first mismatch.
    Strict,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct MapperOptions {
    pub policy: MappingPolicy,
}

/// Result of a top-level mapping call together with the field errors that
/// were tolerated under [`MappingPolicy::Lenient`].
#[derive(Debug, Clone, PartialEq)]
pub struct Mapped<T> {
    pub value: T,
    pub skipped: Vec<MapError>,
}

#[derive(Debug, Clone, Default)]
pub struct Mapper {
    options: MapperOptions,
}

impl Mapper {
    pub fn new(options: MapperOptions) -> Self {
        Self { options }
    }

    pub fn strict() -> Self {
        Self::new(MapperOptions {
            policy: MappingPolicy::Strict,
        })
    }

    pub fn options(&self) -> &MapperOptions {
        &self.options
    }

    /// Populate a `T` from `json`. Null yields `T::default()`.
    pub fn map<T: Mappable>(&self, json: &Value) -> Result<T, MapError> {
        self.map_with_report(json).map(|mapped| mapped.value)
    }

    pub fn map_with_report<T: Mappable>(&self, json: &Value) -> Result<Mapped<T>, MapError> {
        let mut ctx = MappingContext::new(self);
        let value = ctx.map_record::<T>(json)?;
        Ok(Mapped {
            value,
            skipped: ctx.into_skipped(),
        })
    }

    /// Map a top-level array (or `{"data": [...]}` envelope) of records.
    pub fn map_list<T: Mappable>(&self, json: &Value) -> Result<Vec<T>, MapError> {
        if json.is_null() {
            return Ok(Vec::new());
        }
        let mut ctx = MappingContext::new(self);
        ctx.map_sequence(json, |item, ctx| ctx.map_record::<T>(item))
    }

    /// Convert a top-level leaf value. Null yields `F::default()`.
    pub fn convert<F: FromJson + Default>(&self, json: &Value) -> Result<F, MapError> {
        if json.is_null() {
            return Ok(F::default());
        }
        F::from_json(json)
    }
}

/// Null, or one of the placeholders Graph returns in place of an absent
/// object: `[]` and `false`.
pub(crate) fn is_absent_object(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

enum Segment {
    Field(&'static str),
    Index(usize),
}

/// Per-call state: the mapper, the location being mapped, and the field
/// errors skipped so far. Never shared between top-level calls.
pub struct MappingContext<'m> {
    mapper: &'m Mapper,
    path: Vec<Segment>,
    skipped: Vec<MapError>,
}

impl<'m> MappingContext<'m> {
    fn new(mapper: &'m Mapper) -> Self {
        Self {
            mapper,
            path: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn policy(&self) -> MappingPolicy {
        self.mapper.options.policy
    }

    fn into_skipped(self) -> Vec<MapError> {
        self.skipped
    }

    pub fn map_record<R: Mappable>(&mut self, value: &Value) -> Result<R, MapError> {
        let object = match value {
            Value::Object(object) => object,
            absent if is_absent_object(absent) => return Ok(R::default()),
            other => return Err(MapError::mismatch("object", other)),
        };

        let directives = directives_for::<R>();
        let mut record = R::default();

        for binding in directives.fields() {
            if !binding.is_mapped() {
                continue;
            }
            let Some(raw) = binding.lookup(object) else {
                continue;
            };
            if raw.is_null() {
                continue;
            }

            self.path.push(Segment::Field(binding.field()));
            let outcome = binding.apply(&mut record, raw, self);
            self.path.pop();

            if let Err(err) = outcome {
                self.tolerate(err.in_field(binding.field()))?;
            }
        }

        if tracing::enabled!(tracing::Level::TRACE) {
            for key in object.keys().filter(|key| !directives.binds_key(key)) {
                tracing::trace!(
                    type_name = directives.type_name(),
                    key = key.as_str(),
                    "ignoring unbound key"
                );
            }
        }

        directives.run_hooks(&mut record);
        Ok(record)
    }

    /// Map every element in order. A Graph connection envelope is unwrapped
    /// to its `data` array. Fails on the first element that does not map.
    pub(crate) fn map_sequence<E>(
        &mut self,
        value: &Value,
        mut map_item: impl FnMut(&Value, &mut Self) -> Result<E, MapError>,
    ) -> Result<Vec<E>, MapError> {
        let items = match value {
            Value::Array(items) => items,
            Value::Object(object) => match object.get("data") {
                Some(Value::Array(items)) => items,
                _ => return Err(MapError::mismatch("array", value)),
            },
            other => return Err(MapError::mismatch("array", other)),
        };

        let mut mapped = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            self.path.push(Segment::Index(index));
            let outcome = map_item(item, self);
            self.path.pop();
            mapped.push(outcome.map_err(|err| err.at_index(index))?);
        }
        Ok(mapped)
    }

    /// Record a field error under the lenient policy, or hand it back.
    fn tolerate(&mut self, err: MapError) -> Result<(), MapError> {
        let skippable = matches!(err, MapError::TypeMismatch { .. })
            && self.policy() == MappingPolicy::Lenient;
        if !skippable {
            return Err(err);
        }
        let located = self.locate(err);
        tracing::warn!(error = %located, "skipping field that failed to map");
        self.skipped.push(located);
        Ok(())
    }

    fn locate(&self, err: MapError) -> MapError {
        let segments = self.path.iter().rev();
        segments.fold(err, |err, segment| match segment {
            Segment::Field(field) => err.in_field(field),
            Segment::Index(index) => err.at_index(*index),
        })
    }
}
