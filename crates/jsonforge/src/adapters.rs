//! Ready-made adapters for containers, enumerations and plain structs.
//!
//! Container adapters are generic over the element type and look the element
//! up through the context at call time, so `Vec<T>` works for any `T` the
//! same [`Formats`](crate::Formats) graph can handle.
//!
//! ```rust
//! use jsonforge::{Formats, FormatsBuilder, Member, ObjectAdapter, Version, extract};
//! use jsonforge::{SerializationContext, vec_adapter};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Slot {
//!     id: i64,
//!     sizes: Vec<i64>,
//! }
//!
//! let mut builder = FormatsBuilder::with_bases([Formats::defaults()]);
//! builder
//!     .register_adapter(vec_adapter::<i64>())
//!     .unwrap()
//!     .register_adapter(
//!         ObjectAdapter::<Slot>::new()
//!             .member(Member::new("id", |s: &Slot| &s.id, |s: &mut Slot| &mut s.id))
//!             .member(
//!                 Member::new("sizes", |s: &Slot| &s.sizes, |s: &mut Slot| &mut s.sizes)
//!                     .since(Version::new(2, 0)),
//!             ),
//!     )
//!     .unwrap();
//! let formats = builder.build();
//!
//! let slot: Slot = extract(&jsonforge::parse(r#"{"id": 4, "sizes": [1, 2]}"#).unwrap(), &formats).unwrap();
//! assert_eq!(slot.sizes, [1, 2]);
//!
//! let old = SerializationContext::new(formats).with_version(Version::new(1, 0));
//! assert_eq!(old.to_json(&slot).unwrap().to_string(), r#"{"id":4}"#);
//! ```

use std::{
    any::{Any, TypeId, type_name},
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use tracing::trace;

use crate::{
    compare::{compare, compare_icase},
    context::{ExtractionContext, ExtractionError, SerializationContext, Version},
    formats::{Adapter, BoxError, Extractor, Serializer, adapter_fn},
    path::{Path, PathElement},
    value::Value,
};

fn sub_path(element: impl Into<PathElement>) -> Path {
    Path::from(element.into())
}

/// Arrays to and from `Vec<T>`. Element failures report the element's
/// index in their path.
pub fn vec_adapter<T: 'static>() -> impl Adapter {
    adapter_fn(
        |ctx, from: &Value| -> Result<Vec<T>, BoxError> {
            let len = from.as_array()?.len();
            (0..len)
                .map(|i| ctx.extract_sub::<T>(from, &sub_path(i)).map_err(BoxError::from))
                .collect()
        },
        |ctx, from: &Vec<T>| Ok(from.iter().map(|item| ctx.to_json(item)).collect::<Result<Value, _>>()?),
    )
}

/// `null` maps to `None`; anything else is extracted as a `T`.
pub fn option_adapter<T: 'static>() -> impl Adapter {
    adapter_fn(
        |ctx, from: &Value| -> Result<Option<T>, BoxError> {
            if from.is_null() {
                return Ok(None);
            }
            Ok(Some(ctx.extract::<T>(from)?))
        },
        |ctx, from: &Option<T>| match from {
            Some(inner) => Ok(ctx.to_json(inner)?),
            None => Ok(Value::Null),
        },
    )
}

/// Objects to and from `BTreeMap<String, T>`.
pub fn map_adapter<T: 'static>() -> impl Adapter {
    adapter_fn(
        |ctx, from: &Value| -> Result<BTreeMap<String, T>, BoxError> {
            from.iter_object()?
                .map(|(key, _)| -> Result<(String, T), BoxError> {
                    let item = ctx.extract_sub::<T>(from, &sub_path(key.as_str()))?;
                    Ok((key.clone(), item))
                })
                .collect()
        },
        |ctx, from: &BTreeMap<String, T>| {
            let mut out = Value::object();
            for (key, item) in from {
                out.insert(key.as_str(), ctx.to_json(item)?)?;
            }
            Ok(out)
        },
    )
}

/// Maps a closed set of native values to JSON values and back.
///
/// A native value may be listed with several JSON forms: all of them extract
/// to it and the first is written. When two native values share a JSON form
/// the first listed wins on extraction. Native values missing from the table
/// serialize as `null`.
pub struct EnumAdapter<E> {
    name: String,
    mapping: Vec<(E, Value)>,
    icase: bool,
}

impl<E> fmt::Debug for EnumAdapter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumAdapter")
            .field("name", &self.name)
            .field("entries", &self.mapping.len())
            .field("icase", &self.icase)
            .finish()
    }
}

impl<E> EnumAdapter<E> {
    /// `name` appears in extraction failures.
    pub fn new(name: impl Into<String>, mapping: impl IntoIterator<Item = (E, Value)>) -> Self {
        Self {
            name: name.into(),
            mapping: mapping.into_iter().collect(),
            icase: false,
        }
    }

    /// Like [`new`](EnumAdapter::new), but string forms match regardless of
    /// ASCII case when extracting.
    pub fn icase(name: impl Into<String>, mapping: impl IntoIterator<Item = (E, Value)>) -> Self {
        Self {
            icase: true,
            ..Self::new(name, mapping)
        }
    }
}

impl<E> Extractor for EnumAdapter<E>
where
    E: Clone + Send + Sync + 'static,
{
    fn type_id(&self) -> TypeId {
        TypeId::of::<E>()
    }

    fn type_name(&self) -> &'static str {
        type_name::<E>()
    }

    fn extract(&self, _ctx: &ExtractionContext<'_>, from: &Value) -> Result<Box<dyn Any>, BoxError> {
        let cmp = if self.icase { compare_icase } else { compare };
        match self.mapping.iter().find(|(_, json)| cmp(json, from) == Ordering::Equal) {
            Some((native, _)) => Ok(Box::new(native.clone())),
            None => Err(format!("Invalid value for {}: {from}", self.name).into()),
        }
    }
}

impl<E> Serializer for EnumAdapter<E>
where
    E: PartialEq + Send + Sync + 'static,
{
    fn type_id(&self) -> TypeId {
        TypeId::of::<E>()
    }

    fn type_name(&self) -> &'static str {
        type_name::<E>()
    }

    fn to_json(&self, _ctx: &SerializationContext<'_>, from: &dyn Any) -> Result<Value, BoxError> {
        let Some(from) = from.downcast_ref::<E>() else {
            return Err(format!("serializer for {} called with another type", type_name::<E>()).into());
        };
        Ok(self
            .mapping
            .iter()
            .find(|(native, _)| native == from)
            .map_or(Value::Null, |(_, json)| json.clone()))
    }
}

type Getter<T, M> = Box<dyn Fn(&T) -> &M + Send + Sync>;
type GetterMut<T, M> = Box<dyn Fn(&mut T) -> &mut M + Send + Sync>;
type MakeDefault<M> = Box<dyn Fn(&ExtractionContext<'_>, &Value) -> Result<M, BoxError> + Send + Sync>;
type Check<M> = Box<dyn Fn(&M) -> Result<(), BoxError> + Send + Sync>;
type EncodeIf<M> = Box<dyn Fn(&SerializationContext<'_>, &M) -> bool + Send + Sync>;

/// One field of a struct handled by an [`ObjectAdapter`].
///
/// A member whose key is absent leaves the field at its `Default` value
/// unless [`default_value`](Member::default_value) says otherwise.
pub struct Member<T, M> {
    names: Vec<String>,
    get: Getter<T, M>,
    get_mut: GetterMut<T, M>,
    default: Option<MakeDefault<M>>,
    default_on_null: bool,
    checks: Vec<Check<M>>,
    encode_if: Vec<EncodeIf<M>>,
}

impl<T, M> fmt::Debug for Member<T, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("names", &self.names)
            .field("default", &self.default.is_some())
            .field("default_on_null", &self.default_on_null)
            .field("checks", &self.checks.len())
            .field("encode_if", &self.encode_if.len())
            .finish()
    }
}

impl<T: 'static, M: 'static> Member<T, M> {
    /// A member stored under `name`, reached through a pair of accessors.
    pub fn new<G, S>(name: impl Into<String>, get: G, get_mut: S) -> Self
    where
        G: Fn(&T) -> &M + Send + Sync + 'static,
        S: Fn(&mut T) -> &mut M + Send + Sync + 'static,
    {
        Self {
            names: vec![name.into()],
            get: Box::new(get),
            get_mut: Box::new(get_mut),
            default: None,
            default_on_null: false,
            checks: Vec::new(),
            encode_if: Vec::new(),
        }
    }

    /// Another key to read this member from. The first name is the one
    /// written; names are tried in the order given.
    #[must_use]
    pub fn alias(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    /// Value used when no key for this member is present.
    #[must_use]
    pub fn default_value(self, value: M) -> Self
    where
        M: Clone + Send + Sync,
    {
        self.default_with(move |_ctx, _from| Ok(value.clone()))
    }

    /// Computes the missing-key value from the whole enclosing object.
    #[must_use]
    pub fn default_with<F>(mut self, make: F) -> Self
    where
        F: Fn(&ExtractionContext<'_>, &Value) -> Result<M, BoxError> + Send + Sync + 'static,
    {
        self.default = Some(Box::new(make));
        self
    }

    /// Treats an explicit `null` like a missing key. Has no effect without a
    /// default.
    #[must_use]
    pub fn default_on_null(mut self) -> Self {
        self.default_on_null = true;
        self
    }

    /// Validates each extracted value. Checks run in the order added.
    #[must_use]
    pub fn check_input<F>(mut self, check: F) -> Self
    where
        F: Fn(&M) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.checks.push(Box::new(check));
        self
    }

    /// Writes the member only when every predicate added holds.
    #[must_use]
    pub fn encode_if<F>(mut self, check: F) -> Self
    where
        F: Fn(&SerializationContext<'_>, &M) -> bool + Send + Sync + 'static,
    {
        self.encode_if.push(Box::new(check));
        self
    }

    /// Writes the member only for versions at or after `version`, or when
    /// no version is set.
    #[must_use]
    pub fn since(self, version: Version) -> Self {
        self.encode_if(move |ctx, _| ctx.version().is_empty() || ctx.version() >= version)
    }

    /// Writes the member only for versions at or before `version`, or when
    /// no version is set.
    #[must_use]
    pub fn until(self, version: Version) -> Self {
        self.encode_if(move |ctx, _| ctx.version().is_empty() || ctx.version() <= version)
    }
}

trait MemberAdapter<T>: Send + Sync {
    fn extract_into(&self, ctx: &ExtractionContext<'_>, from: &Value, out: &mut T) -> Result<(), ExtractionError>;

    fn write(&self, ctx: &SerializationContext<'_>, from: &T, out: &mut Value) -> Result<(), BoxError>;

    fn reads_key(&self, key: &str) -> bool;
}

impl<T: 'static, M: 'static> MemberAdapter<T> for Member<T, M> {
    fn extract_into(&self, ctx: &ExtractionContext<'_>, from: &Value, out: &mut T) -> Result<(), ExtractionError> {
        let found = self
            .names
            .iter()
            .find_map(|name| from.get(name).ok().flatten().map(|item| (name, item)));
        let use_default = match found {
            None => true,
            Some((_, item)) => self.default_on_null && item.is_null(),
        };

        let (value, at) = match (found, &self.default) {
            (_, Some(make)) if use_default => {
                let value = make(ctx, from).map_err(|err| failure(ctx.path().clone(), err))?;
                (value, ctx.path().clone())
            }
            (Some((name, _)), _) => {
                let at = sub_path(name.as_str());
                (ctx.extract_sub::<M>(from, &at)?, ctx.path().join(&at))
            }
            (None, _) => return Ok(()),
        };
        for check in &self.checks {
            check(&value).map_err(|err| failure(at.clone(), err))?;
        }
        *(self.get_mut)(out) = value;
        Ok(())
    }

    fn write(&self, ctx: &SerializationContext<'_>, from: &T, out: &mut Value) -> Result<(), BoxError> {
        let member = (self.get)(from);
        if self.encode_if.iter().all(|check| check(ctx, member)) {
            out.insert(self.names[0].as_str(), ctx.to_json(member)?)?;
        }
        Ok(())
    }

    fn reads_key(&self, key: &str) -> bool {
        self.names.iter().any(|name| name == key)
    }
}

fn failure(path: Path, err: BoxError) -> ExtractionError {
    match err.downcast::<ExtractionError>() {
        Ok(err) => *err,
        Err(err) => ExtractionError {
            message: err.to_string(),
            source: Some(err),
            ..ExtractionError::new(path, "")
        },
    }
}

type ExtraKeys = Box<
    dyn Fn(&ExtractionContext<'_>, &Value, BTreeSet<String>) -> Result<(), BoxError> + Send + Sync,
>;

/// Builds an adapter for a struct member by member.
///
/// Extraction starts from `T::default()` and lets each member fill its field
/// in declaration order; the input must be an object. Serialization writes an
/// object with one key per member that passes its encode checks.
pub struct ObjectAdapter<T> {
    members: Vec<Box<dyn MemberAdapter<T>>>,
    extra_keys: Option<ExtraKeys>,
}

impl<T> fmt::Debug for ObjectAdapter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectAdapter")
            .field("type", &type_name::<T>())
            .field("members", &self.members.len())
            .field("extra_keys", &self.extra_keys.is_some())
            .finish()
    }
}

impl<T: 'static> Default for ObjectAdapter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> ObjectAdapter<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
            extra_keys: None,
        }
    }

    #[must_use]
    pub fn member<M: 'static>(mut self, member: Member<T, M>) -> Self {
        self.members.push(Box::new(member));
        self
    }

    /// Called before any member is extracted with the keys no member reads,
    /// when there are any. Extra keys are ignored without a handler.
    #[must_use]
    pub fn on_extract_extra_keys<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ExtractionContext<'_>, &Value, BTreeSet<String>) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.extra_keys = Some(Box::new(handler));
        self
    }
}

/// An extra-keys handler that fails the extraction, listing the keys.
///
/// # Errors
///
/// Always.
pub fn reject_extra_keys(
    ctx: &ExtractionContext<'_>,
    _from: &Value,
    extra: BTreeSet<String>,
) -> Result<(), BoxError> {
    let keys: Vec<String> = extra.into_iter().collect();
    let plural = if keys.len() == 1 { "" } else { "s" };
    Err(Box::new(ExtractionError::new(
        ctx.path().clone(),
        format!("Found extra key{plural} in value: {}", keys.join(", ")),
    )))
}

impl<T: Default + 'static> Extractor for ObjectAdapter<T> {
    fn type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn extract(&self, ctx: &ExtractionContext<'_>, from: &Value) -> Result<Box<dyn Any>, BoxError> {
        let object = from.as_object()?;
        if let Some(handler) = &self.extra_keys {
            let extra: BTreeSet<String> = object
                .keys()
                .filter(|key| !self.members.iter().any(|m| m.reads_key(key)))
                .cloned()
                .collect();
            if !extra.is_empty() {
                trace!(?extra, ty = type_name::<T>(), "extra keys in object");
                handler(ctx, from, extra)?;
            }
        }

        let mut out = T::default();
        for member in &self.members {
            member.extract_into(ctx, from, &mut out)?;
        }
        Ok(Box::new(out))
    }
}

impl<T: 'static> Serializer for ObjectAdapter<T> {
    fn type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn to_json(&self, ctx: &SerializationContext<'_>, from: &dyn Any) -> Result<Value, BoxError> {
        let Some(from) = from.downcast_ref::<T>() else {
            return Err(format!("serializer for {} called with another type", type_name::<T>()).into());
        };
        let mut out = Value::object();
        for member in &self.members {
            member.write(ctx, from, &mut out)?;
        }
        Ok(out)
    }
}
