use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{OnceLock, PoisonError, RwLock};

use serde_json::{Map, Value};

use crate::error::MapError;
use crate::mapping::MappingContext;
use crate::mapping::convert::{FromJson, enum_from_json};

/// A record type the mapper can populate from a JSON object.
///
/// `directives` is the explicit field table for the type. It is called once
/// per process and cached by [`directives_for`].
pub trait Mappable: Default + 'static {
    fn directives() -> TypeDirectives<Self>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    Value,
    Record,
    Sequence,
    Enumeration,
    /// Filled by a post-population hook, never read from JSON.
    Derived,
}

type Apply<T> =
    Box<dyn Fn(&mut T, &Value, &mut MappingContext<'_>) -> Result<(), MapError> + Send + Sync>;

type HookFn<T> = Box<dyn Fn(&mut T) + Send + Sync>;

fn boxed<T, A>(apply: A) -> Apply<T>
where
    A: Fn(&mut T, &Value, &mut MappingContext<'_>) -> Result<(), MapError> + Send + Sync + 'static,
{
    Box::new(apply)
}

/// Binding directive for one field of `T`.
pub struct FieldBinding<T> {
    field: &'static str,
    source_key: &'static str,
    aliases: Vec<&'static str>,
    element_type: Option<&'static str>,
    shape: FieldShape,
    apply: Option<Apply<T>>,
}

impl<T: 'static> FieldBinding<T> {
    fn new(field: &'static str, shape: FieldShape, apply: Option<Apply<T>>) -> Self {
        Self {
            field,
            source_key: field,
            aliases: Vec::new(),
            element_type: None,
            shape,
            apply,
        }
    }

    /// A leaf field converted through [`FromJson`].
    pub fn scalar<F, S>(field: &'static str, set: S) -> Self
    where
        F: FromJson + 'static,
        S: Fn(&mut T, F) + Send + Sync + 'static,
    {
        let apply = boxed(move |target: &mut T, value: &Value, _ctx: &mut MappingContext<'_>| {
            set(target, F::from_json(value)?);
            Ok(())
        });
        Self::new(field, FieldShape::Value, Some(apply))
    }

    /// A nested record, mapped recursively.
    pub fn record<R, S>(field: &'static str, set: S) -> Self
    where
        R: Mappable,
        S: Fn(&mut T, R) + Send + Sync + 'static,
    {
        let apply = boxed(move |target: &mut T, value: &Value, ctx: &mut MappingContext<'_>| {
            set(target, ctx.map_record::<R>(value)?);
            Ok(())
        });
        Self::new(field, FieldShape::Record, Some(apply))
    }

    /// A homogeneous sequence of leaf values.
    pub fn sequence<F, S>(field: &'static str, set: S) -> Self
    where
        F: FromJson + 'static,
        S: Fn(&mut T, Vec<F>) + Send + Sync + 'static,
    {
        let apply = boxed(move |target: &mut T, value: &Value, ctx: &mut MappingContext<'_>| {
            let items = ctx.map_sequence(value, |item, _| F::from_json(item))?;
            set(target, items);
            Ok(())
        });
        Self {
            element_type: Some(std::any::type_name::<F>()),
            ..Self::new(field, FieldShape::Sequence, Some(apply))
        }
    }

    /// A homogeneous sequence of records.
    pub fn records<R, S>(field: &'static str, set: S) -> Self
    where
        R: Mappable,
        S: Fn(&mut T, Vec<R>) + Send + Sync + 'static,
    {
        let apply = boxed(move |target: &mut T, value: &Value, ctx: &mut MappingContext<'_>| {
            let items = ctx.map_sequence(value, |item, ctx| ctx.map_record::<R>(item))?;
            set(target, items);
            Ok(())
        });
        Self {
            element_type: Some(std::any::type_name::<R>()),
            ..Self::new(field, FieldShape::Sequence, Some(apply))
        }
    }

    /// A string field resolved against the variant names of `E`.
    pub fn enumeration<E, S>(field: &'static str, set: S) -> Self
    where
        E: FromStr + strum::VariantNames + 'static,
        S: Fn(&mut T, E) + Send + Sync + 'static,
    {
        let apply = boxed(move |target: &mut T, value: &Value, _ctx: &mut MappingContext<'_>| {
            set(target, enum_from_json::<E>(value)?);
            Ok(())
        });
        Self::new(field, FieldShape::Enumeration, Some(apply))
    }

    /// Declares a field computed by a hook. It is listed for introspection
    /// but never looked up in the JSON object.
    pub fn derived(field: &'static str) -> Self {
        Self::new(field, FieldShape::Derived, None)
    }

    /// Read the value from `key` instead of the field name.
    pub fn from_key(mut self, key: &'static str) -> Self {
        self.source_key = key;
        self
    }

    /// Fallback key, consulted when no earlier key is present.
    pub fn or_key(mut self, key: &'static str) -> Self {
        self.aliases.push(key);
        self
    }

    /// Override the recorded element type of a sequence field.
    pub fn element_type(mut self, name: &'static str) -> Self {
        self.element_type = Some(name);
        self
    }

    fn lift<D: 'static>(self, project: fn(&mut D) -> &mut T) -> FieldBinding<D> {
        let apply = self.apply.map(|apply| {
            boxed(move |target: &mut D, value: &Value, ctx: &mut MappingContext<'_>| {
                apply(project(target), value, ctx)
            })
        });
        FieldBinding {
            field: self.field,
            source_key: self.source_key,
            aliases: self.aliases,
            element_type: self.element_type,
            shape: self.shape,
            apply,
        }
    }
}

impl<T> FieldBinding<T> {
    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn source_key(&self) -> &'static str {
        self.source_key
    }

    pub fn aliases(&self) -> &[&'static str] {
        &self.aliases
    }

    pub fn element_type_name(&self) -> Option<&'static str> {
        self.element_type
    }

    pub fn shape(&self) -> FieldShape {
        self.shape
    }

    pub fn is_mapped(&self) -> bool {
        self.apply.is_some()
    }

    pub(crate) fn matches_key(&self, key: &str) -> bool {
        self.is_mapped() && (self.source_key == key || self.aliases.contains(&key))
    }

    /// Exact, case-sensitive lookup of the source key, then of each alias.
    /// A key holding null does not shadow the keys after it.
    pub(crate) fn lookup<'v>(&self, object: &'v Map<String, Value>) -> Option<&'v Value> {
        std::iter::once(&self.source_key)
            .chain(self.aliases.iter())
            .find_map(|key| object.get(*key).filter(|v| !v.is_null()))
    }

    pub(crate) fn apply(
        &self,
        target: &mut T,
        value: &Value,
        ctx: &mut MappingContext<'_>,
    ) -> Result<(), MapError> {
        match &self.apply {
            Some(apply) => apply(target, value, ctx),
            None => Ok(()),
        }
    }
}

impl<T> std::fmt::Debug for FieldBinding<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldBinding")
            .field("field", &self.field)
            .field("source_key", &self.source_key)
            .field("aliases", &self.aliases)
            .field("element_type", &self.element_type)
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

struct PostHook<T> {
    name: &'static str,
    run: HookFn<T>,
}

/// Ordered field bindings and post-population hooks of one record type.
pub struct TypeDirectives<T> {
    type_name: &'static str,
    fields: Vec<FieldBinding<T>>,
    hooks: Vec<PostHook<T>>,
    inherited_fields: usize,
    inherited_hooks: usize,
}

impl<T: 'static> Default for TypeDirectives<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> TypeDirectives<T> {
    pub fn new() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            fields: Vec::new(),
            hooks: Vec::new(),
            inherited_fields: 0,
            inherited_hooks: 0,
        }
    }

    pub fn bind(mut self, binding: FieldBinding<T>) -> Self {
        self.fields.push(binding);
        self
    }

    /// Register a hook run after every field is populated. Hooks run in
    /// registration order, after all inherited hooks.
    pub fn hook(mut self, name: &'static str, run: fn(&mut T)) -> Self {
        self.hooks.push(PostHook {
            name,
            run: Box::new(run),
        });
        self
    }

    /// Embed the bindings and hooks of a base record reached through
    /// `project`. Inherited entries always precede the type's own, in the
    /// order `inherit` was called.
    pub fn inherit<B: Mappable>(mut self, project: fn(&mut T) -> &mut B) -> Self {
        let base = B::directives();

        let lifted_fields: Vec<_> = base.fields.into_iter().map(|f| f.lift(project)).collect();
        let at = self.inherited_fields;
        self.inherited_fields += lifted_fields.len();
        self.fields.splice(at..at, lifted_fields);

        let lifted_hooks: Vec<_> = base
            .hooks
            .into_iter()
            .map(|hook| {
                let run = hook.run;
                PostHook {
                    name: hook.name,
                    run: Box::new(move |target: &mut T| run(project(target))) as HookFn<T>,
                }
            })
            .collect();
        let at = self.inherited_hooks;
        self.inherited_hooks += lifted_hooks.len();
        self.hooks.splice(at..at, lifted_hooks);

        self
    }
}

impl<T> TypeDirectives<T> {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn fields(&self) -> &[FieldBinding<T>] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldBinding<T>> {
        self.fields.iter().find(|f| f.field == name)
    }

    pub fn hook_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.hooks.iter().map(|h| h.name)
    }

    pub(crate) fn run_hooks(&self, target: &mut T) {
        for hook in &self.hooks {
            (hook.run)(target);
        }
    }

    pub(crate) fn binds_key(&self, key: &str) -> bool {
        self.fields.iter().any(|f| f.matches_key(key))
    }
}

impl<T> std::fmt::Debug for TypeDirectives<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hooks: Vec<_> = self.hooks.iter().map(|h| h.name).collect();
        f.debug_struct("TypeDirectives")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .field("hooks", &hooks)
            .finish()
    }
}

type Registry = RwLock<HashMap<TypeId, &'static (dyn Any + Send + Sync)>>;

static REGISTRY: OnceLock<Registry> = OnceLock::new();

fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::default)
}

/// Cached directives for `T`, built on first use.
///
/// Entries are never removed or replaced. The table is built outside the
/// lock; when two threads race, the first insert wins and the other copy is
/// dropped. Lookups after that take only the read lock.
pub fn directives_for<T: Mappable>() -> &'static TypeDirectives<T> {
    let key = TypeId::of::<T>();
    let cached = registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
        .copied();
    if let Some(directives) = cached.and_then(|entry| entry.downcast_ref::<TypeDirectives<T>>()) {
        return directives;
    }

    let built = T::directives();
    let entry = *registry()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(key)
        .or_insert_with(|| {
            tracing::debug!(
                type_name = built.type_name,
                fields = built.fields.len(),
                hooks = built.hooks.len(),
                "registered binding directives"
            );
            Box::leak(Box::new(built))
        });

    match entry.downcast_ref::<TypeDirectives<T>>() {
        Some(directives) => directives,
        // The slot for `TypeId::of::<T>()` only ever holds `TypeDirectives<T>`.
        None => Box::leak(Box::new(T::directives())),
    }
}

/// Number of record types whose directives have been cached.
pub fn registered_types() -> usize {
    registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .len()
}
