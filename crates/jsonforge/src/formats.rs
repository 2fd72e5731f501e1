//! The type registry that binds [`Value`] trees to native Rust types.
//!
//! A [`Formats`] node maps a type to an [`Extractor`] (value to native) and a
//! [`Serializer`] (native to value). Nodes are immutable once built and may
//! be layered over any number of base nodes; lookup checks the node's own
//! registrations first and then walks the bases depth-first, left to right.
//! Because a node can only refer to nodes that already exist, the graph never
//! contains a cycle.
//!
//! ```rust
//! use jsonforge::{Formats, FormatsBuilder, Value, adapter_fn, extract, to_json};
//!
//! #[derive(Debug, PartialEq)]
//! struct Meters(f64);
//!
//! let mut builder = FormatsBuilder::with_bases([Formats::defaults()]);
//! builder
//!     .register_adapter(adapter_fn(
//!         |ctx, from| Ok(Meters(ctx.extract::<f64>(from)?)),
//!         |_ctx, from: &Meters| Ok(Value::from(from.0)),
//!     ))
//!     .unwrap();
//! let formats = builder.build();
//!
//! assert_eq!(extract::<Meters>(&Value::from(2.5), &formats).unwrap(), Meters(2.5));
//! assert_eq!(to_json(&Meters(1.0), &formats).unwrap(), Value::from(1.0));
//! ```

use std::{
    any::{Any, TypeId, type_name},
    collections::HashMap,
    error::Error as StdError,
    fmt,
    marker::PhantomData,
    sync::{Arc, LazyLock},
};

use arc_swap::ArcSwap;
use thiserror::Error;
use tracing::debug;

use crate::{
    coerce::{coerce_boolean, coerce_decimal, coerce_integer, coerce_string},
    context::{ExtractionContext, SerializationContext},
    value::Value,
};

/// The error type user extractors and serializers return.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Converts a [`Value`] into one specific native type.
pub trait Extractor: Send + Sync {
    /// The type this extractor produces.
    fn type_id(&self) -> TypeId;

    /// Human-readable name of the produced type, used in diagnostics.
    fn type_name(&self) -> &'static str;

    /// Builds the native value. The returned box must hold a value of the
    /// type named by [`type_id`](Extractor::type_id).
    fn extract(&self, ctx: &ExtractionContext<'_>, from: &Value) -> Result<Box<dyn Any>, BoxError>;
}

/// Converts one specific native type into a [`Value`].
pub trait Serializer: Send + Sync {
    fn type_id(&self) -> TypeId;

    fn type_name(&self) -> &'static str;

    /// `from` is guaranteed to be of the type named by
    /// [`type_id`](Serializer::type_id) when called through a [`Formats`].
    fn to_json(&self, ctx: &SerializationContext<'_>, from: &dyn Any) -> Result<Value, BoxError>;
}

/// Both directions for the same type.
pub trait Adapter: Extractor + Serializer {}

impl<A: Extractor + Serializer> Adapter for A {}

struct FnExtractor<T, F> {
    f: F,
    _marker: PhantomData<fn() -> T>,
}

impl<T, F> Extractor for FnExtractor<T, F>
where
    T: 'static,
    F: Fn(&ExtractionContext<'_>, &Value) -> Result<T, BoxError> + Send + Sync,
{
    fn type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn extract(&self, ctx: &ExtractionContext<'_>, from: &Value) -> Result<Box<dyn Any>, BoxError> {
        Ok(Box::new((self.f)(ctx, from)?))
    }
}

struct FnSerializer<T, F> {
    f: F,
    _marker: PhantomData<fn(&T)>,
}

impl<T, F> Serializer for FnSerializer<T, F>
where
    T: 'static,
    F: Fn(&SerializationContext<'_>, &T) -> Result<Value, BoxError> + Send + Sync,
{
    fn type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn to_json(&self, ctx: &SerializationContext<'_>, from: &dyn Any) -> Result<Value, BoxError> {
        match from.downcast_ref::<T>() {
            Some(from) => (self.f)(ctx, from),
            None => Err(format!("serializer for {} called with another type", type_name::<T>()).into()),
        }
    }
}

struct FnAdapter<T, E, S> {
    extractor: FnExtractor<T, E>,
    serializer: FnSerializer<T, S>,
}

impl<T, E, S> Extractor for FnAdapter<T, E, S>
where
    T: 'static,
    E: Fn(&ExtractionContext<'_>, &Value) -> Result<T, BoxError> + Send + Sync,
    S: Send + Sync,
{
    fn type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn extract(&self, ctx: &ExtractionContext<'_>, from: &Value) -> Result<Box<dyn Any>, BoxError> {
        self.extractor.extract(ctx, from)
    }
}

impl<T, E, S> Serializer for FnAdapter<T, E, S>
where
    T: 'static,
    E: Send + Sync,
    S: Fn(&SerializationContext<'_>, &T) -> Result<Value, BoxError> + Send + Sync,
{
    fn type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn to_json(&self, ctx: &SerializationContext<'_>, from: &dyn Any) -> Result<Value, BoxError> {
        self.serializer.to_json(ctx, from)
    }
}

/// Wraps a closure as an [`Extractor`] for `T`.
pub fn extractor_fn<T, F>(f: F) -> impl Extractor
where
    T: 'static,
    F: Fn(&ExtractionContext<'_>, &Value) -> Result<T, BoxError> + Send + Sync,
{
    FnExtractor {
        f,
        _marker: PhantomData,
    }
}

/// Wraps a closure as a [`Serializer`] for `T`.
pub fn serializer_fn<T, F>(f: F) -> impl Serializer
where
    T: 'static,
    F: Fn(&SerializationContext<'_>, &T) -> Result<Value, BoxError> + Send + Sync,
{
    FnSerializer {
        f,
        _marker: PhantomData,
    }
}

/// Pairs an extracting and a serializing closure into an [`Adapter`].
pub fn adapter_fn<T, E, S>(extract: E, to_json: S) -> impl Adapter
where
    T: 'static,
    E: Fn(&ExtractionContext<'_>, &Value) -> Result<T, BoxError> + Send + Sync,
    S: Fn(&SerializationContext<'_>, &T) -> Result<Value, BoxError> + Send + Sync,
{
    FnAdapter {
        extractor: FnExtractor {
            f: extract,
            _marker: PhantomData,
        },
        serializer: FnSerializer {
            f: to_json,
            _marker: PhantomData,
        },
    }
}

/// No extractor is reachable for the requested type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Could not find extractor for type: {type_name}")]
pub struct NoExtractor {
    pub type_name: &'static str,
}

/// No serializer is reachable for the requested type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Could not find serializer for type: {type_name}")]
pub struct NoSerializer {
    pub type_name: &'static str,
}

/// A type was registered twice in the same node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("Already have an extractor for type {type_name}")]
    DuplicateExtractor { type_name: &'static str },
    #[error("Already have a serializer for type {type_name}")]
    DuplicateSerializer { type_name: &'static str },
}

/// Collects registrations for a new [`Formats`] node.
#[derive(Default)]
pub struct FormatsBuilder {
    extractors: HashMap<TypeId, Arc<dyn Extractor>>,
    serializers: HashMap<TypeId, Arc<dyn Serializer>>,
    bases: Vec<Formats>,
}

impl fmt::Debug for FormatsBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatsBuilder")
            .field("extractors", &self.extractors.len())
            .field("serializers", &self.serializers.len())
            .field("bases", &self.bases.len())
            .finish()
    }
}

impl FormatsBuilder {
    /// A builder for a node with no bases.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder for a node searched before `bases`, which are searched in
    /// the given order.
    pub fn with_bases(bases: impl IntoIterator<Item = Formats>) -> Self {
        Self {
            bases: bases.into_iter().collect(),
            ..Self::default()
        }
    }

    /// # Errors
    ///
    /// Fails if this builder already has an extractor for the same type.
    /// Extractors in base nodes do not count; registering here shadows them.
    pub fn register_extractor<E: Extractor + 'static>(
        &mut self,
        extractor: E,
    ) -> Result<&mut Self, RegistrationError> {
        let id = Extractor::type_id(&extractor);
        if self.extractors.contains_key(&id) {
            return Err(RegistrationError::DuplicateExtractor {
                type_name: Extractor::type_name(&extractor),
            });
        }
        self.extractors.insert(id, Arc::new(extractor));
        Ok(self)
    }

    /// # Errors
    ///
    /// Fails if this builder already has a serializer for the same type.
    pub fn register_serializer<S: Serializer + 'static>(
        &mut self,
        serializer: S,
    ) -> Result<&mut Self, RegistrationError> {
        let id = Serializer::type_id(&serializer);
        if self.serializers.contains_key(&id) {
            return Err(RegistrationError::DuplicateSerializer {
                type_name: Serializer::type_name(&serializer),
            });
        }
        self.serializers.insert(id, Arc::new(serializer));
        Ok(self)
    }

    /// Registers both halves of an adapter.
    ///
    /// # Errors
    ///
    /// Fails if either half is already registered. Nothing is registered in
    /// that case.
    pub fn register_adapter<A: Adapter + 'static>(
        &mut self,
        adapter: A,
    ) -> Result<&mut Self, RegistrationError> {
        let extractor_id = Extractor::type_id(&adapter);
        let serializer_id = Serializer::type_id(&adapter);
        if self.extractors.contains_key(&extractor_id) {
            return Err(RegistrationError::DuplicateExtractor {
                type_name: Extractor::type_name(&adapter),
            });
        }
        if self.serializers.contains_key(&serializer_id) {
            return Err(RegistrationError::DuplicateSerializer {
                type_name: Serializer::type_name(&adapter),
            });
        }
        self.put_adapter(adapter);
        Ok(self)
    }

    fn put_adapter<A: Adapter + 'static>(&mut self, adapter: A) {
        let adapter = Arc::new(adapter);
        self.extractors
            .insert(Extractor::type_id(&*adapter), adapter.clone());
        self.serializers
            .insert(Serializer::type_id(&*adapter), adapter);
    }

    fn put_extractor<E: Extractor + 'static>(&mut self, extractor: E) {
        self.extractors
            .insert(Extractor::type_id(&extractor), Arc::new(extractor));
    }

    #[must_use]
    pub fn build(self) -> Formats {
        Formats(Arc::new(Node {
            extractors: self.extractors,
            serializers: self.serializers,
            bases: self.bases,
        }))
    }
}

struct Node {
    extractors: HashMap<TypeId, Arc<dyn Extractor>>,
    serializers: HashMap<TypeId, Arc<dyn Serializer>>,
    bases: Vec<Formats>,
}

/// An immutable, shareable node of the type registry.
///
/// Cloning is cheap; clones share the same node.
#[derive(Clone)]
pub struct Formats(Arc<Node>);

impl fmt::Debug for Formats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut extractors: Vec<_> = self.0.extractors.values().map(|e| e.type_name()).collect();
        extractors.sort_unstable();
        let mut serializers: Vec<_> = self.0.serializers.values().map(|s| s.type_name()).collect();
        serializers.sort_unstable();
        f.debug_struct("Formats")
            .field("extractors", &extractors)
            .field("serializers", &serializers)
            .field("bases", &self.0.bases)
            .finish()
    }
}

impl Default for Formats {
    /// An empty node.
    fn default() -> Self {
        FormatsBuilder::new().build()
    }
}

impl Formats {
    /// An empty node layered over `bases`.
    pub fn compose(bases: impl IntoIterator<Item = Formats>) -> Formats {
        FormatsBuilder::with_bases(bases).build()
    }

    /// Adapters for [`Value`], [`String`], [`bool`], every fixed-width
    /// integer type, [`f32`] and [`f64`].
    ///
    /// Integers narrower than 64 bits fail to extract when out of range;
    /// `u64` reinterprets the stored bits of an `i64`.
    #[must_use]
    pub fn defaults() -> Formats {
        Formats::compose([DEFAULTS.clone()])
    }

    /// Extractors that accept any value [`coerce`](crate::coerce) can
    /// convert, layered over [`defaults`](Formats::defaults).
    #[must_use]
    pub fn coerce() -> Formats {
        Formats::compose([COERCE.clone()])
    }

    /// A snapshot of the process-wide formats.
    ///
    /// Later calls to [`set_global`](Formats::set_global) do not affect a
    /// snapshot already taken.
    #[must_use]
    pub fn global() -> Formats {
        Formats(GLOBAL.load_full())
    }

    /// Replaces the process-wide formats, returning the previous ones.
    ///
    /// Intended for configuration at startup; this is not a per-request
    /// operation.
    pub fn set_global(formats: Formats) -> Formats {
        debug!(?formats, "replacing global formats");
        Formats(GLOBAL.swap(formats.0))
    }

    /// Restores the process-wide formats to [`defaults`](Formats::defaults),
    /// returning the previous ones.
    pub fn reset_global() -> Formats {
        debug!("resetting global formats to defaults");
        Formats(GLOBAL.swap(Formats::defaults().0))
    }

    /// The extractor for the type identified by `id`, if any node in this
    /// graph has one.
    #[must_use]
    pub fn extractor(&self, id: TypeId) -> Option<&dyn Extractor> {
        if let Some(extractor) = self.0.extractors.get(&id) {
            return Some(extractor.as_ref());
        }
        self.0.bases.iter().find_map(|base| base.extractor(id))
    }

    #[must_use]
    pub fn serializer(&self, id: TypeId) -> Option<&dyn Serializer> {
        if let Some(serializer) = self.0.serializers.get(&id) {
            return Some(serializer.as_ref());
        }
        self.0.bases.iter().find_map(|base| base.serializer(id))
    }

    /// # Errors
    ///
    /// [`NoExtractor`] naming `T`.
    pub fn extractor_for<T: 'static>(&self) -> Result<&dyn Extractor, NoExtractor> {
        self.extractor(TypeId::of::<T>()).ok_or(NoExtractor {
            type_name: type_name::<T>(),
        })
    }

    /// # Errors
    ///
    /// [`NoSerializer`] naming `T`.
    pub fn serializer_for<T: 'static>(&self) -> Result<&dyn Serializer, NoSerializer> {
        self.serializer(TypeId::of::<T>()).ok_or(NoSerializer {
            type_name: type_name::<T>(),
        })
    }

    /// Whether both handles refer to the same node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Formats) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

macro_rules! integer_adapters {
    ($builder:expr, $($t:ty),*) => {$(
        $builder.put_adapter(adapter_fn(
            |_ctx, from: &Value| -> Result<$t, BoxError> { Ok(<$t>::try_from(from.as_integer()?)?) },
            |_ctx, from: &$t| Ok(Value::from(*from)),
        ));
    )*};
}

macro_rules! integer_coercers {
    ($builder:expr, $($t:ty),*) => {$(
        $builder.put_extractor(extractor_fn(
            |_ctx, from: &Value| -> Result<$t, BoxError> { Ok(<$t>::try_from(coerce_integer(from)?)?) },
        ));
    )*};
}

#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn build_defaults() -> Formats {
    let mut builder = FormatsBuilder::new();
    builder.put_adapter(adapter_fn(
        |_ctx, from: &Value| Ok(from.clone()),
        |_ctx, from: &Value| Ok(from.clone()),
    ));
    builder.put_adapter(adapter_fn(
        |_ctx, from: &Value| Ok(String::from(from.as_str()?)),
        |_ctx, from: &String| Ok(Value::from(from.as_str())),
    ));
    builder.put_adapter(adapter_fn(
        |_ctx, from: &Value| Ok(from.as_boolean()?),
        |_ctx, from: &bool| Ok(Value::from(*from)),
    ));
    integer_adapters!(builder, i8, u8, i16, u16, i32, u32, i64);
    builder.put_adapter(adapter_fn(
        |_ctx, from: &Value| Ok(from.as_integer()? as u64),
        |_ctx, from: &u64| Ok(Value::from(*from)),
    ));
    builder.put_adapter(adapter_fn(
        |_ctx, from: &Value| Ok(from.as_decimal()?),
        |_ctx, from: &f64| Ok(Value::from(*from)),
    ));
    builder.put_adapter(adapter_fn(
        |_ctx, from: &Value| Ok(from.as_decimal()? as f32),
        |_ctx, from: &f32| Ok(Value::from(*from)),
    ));
    builder.build()
}

#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn build_coerce() -> Formats {
    let mut builder = FormatsBuilder::with_bases([DEFAULTS.clone()]);
    builder.put_extractor(extractor_fn(|_ctx, from: &Value| Ok(coerce_string(from))));
    builder.put_extractor(extractor_fn(|_ctx, from: &Value| Ok(coerce_boolean(from))));
    integer_coercers!(builder, i8, u8, i16, u16, i32, u32, i64);
    builder.put_extractor(extractor_fn(|_ctx, from: &Value| {
        Ok(coerce_integer(from)? as u64)
    }));
    builder.put_extractor(extractor_fn(|_ctx, from: &Value| Ok(coerce_decimal(from)?)));
    builder.put_extractor(extractor_fn(|_ctx, from: &Value| {
        Ok(coerce_decimal(from)? as f32)
    }));
    builder.build()
}

static DEFAULTS: LazyLock<Formats> = LazyLock::new(build_defaults);

static COERCE: LazyLock<Formats> = LazyLock::new(build_coerce);

static GLOBAL: LazyLock<ArcSwap<Node>> = LazyLock::new(|| ArcSwap::new(Formats::defaults().0));
