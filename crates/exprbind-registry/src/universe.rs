//! The type universe: memoized type descriptions plus the conversion cache.
//!
//! [`TypeUniverse`] is the shared, read-many store every binder and
//! execution-engine invocation consults. Types enter it either eagerly via
//! [`TypeUniverse::register`] (the builder surface) or lazily through a host
//! [`TypeProvider`] the first time an identity is described. Descriptions
//! are built bottom-up — base types, enum underlyings, interfaces, and array
//! elements are described before their dependents — and each description is
//! constructed at most once.
//!
//! # Thread safety
//!
//! All state sits behind narrow `RwLock` scopes: reads are short-held map
//! lookups; population takes the write lock only for the insert itself,
//! never across recursion into providers. A universe is typically built
//! once, shared behind `Arc`, and read concurrently afterwards.

use std::sync::{Arc, RwLock};

use rustc_hash::FxHashMap;
use tracing::debug;

use exprbind_core::{RegistrationError, TypeHash, Value, primitives};

use crate::conversion_table::ConversionTable;
use crate::desc::{MemberDesc, TypeDesc, TypeKind};

/// Host capability for describing types on demand.
///
/// The universe consults the provider when an unknown identity is described
/// or an unknown name is resolved. Implementations must be pure: the same
/// hash must always produce an equivalent description.
pub trait TypeProvider: Send + Sync {
    /// Produce the description for an identity, if the host knows it.
    fn describe(&self, hash: TypeHash) -> Option<TypeDesc>;

    /// Resolve a type name the universe has not seen yet.
    fn resolve(&self, name: &str) -> Option<TypeHash> {
        let _ = name;
        None
    }
}

/// The universe of known types and members.
pub struct TypeUniverse {
    types: RwLock<FxHashMap<TypeHash, Arc<TypeDesc>>>,
    by_name: RwLock<FxHashMap<String, TypeHash>>,
    conversions: ConversionTable,
    provider: Option<Arc<dyn TypeProvider>>,
}

impl Default for TypeUniverse {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeUniverse {
    /// A universe seeded with the primitive types.
    pub fn new() -> Self {
        let universe = TypeUniverse {
            types: RwLock::new(FxHashMap::default()),
            by_name: RwLock::new(FxHashMap::default()),
            conversions: ConversionTable::new(),
            provider: None,
        };
        universe.seed_primitives();
        universe
    }

    /// A universe that asks `provider` for unknown types.
    pub fn with_provider(provider: Arc<dyn TypeProvider>) -> Self {
        let universe = TypeUniverse {
            types: RwLock::new(FxHashMap::default()),
            by_name: RwLock::new(FxHashMap::default()),
            conversions: ConversionTable::new(),
            provider: Some(provider),
        };
        universe.seed_primitives();
        universe
    }

    fn seed_primitives(&self) {
        for (hash, name) in primitives::all() {
            let kind = match hash {
                primitives::VOID => TypeKind::Void,
                primitives::NULL => TypeKind::Null,
                primitives::BOOL => TypeKind::Bool,
                primitives::STRING => TypeKind::Str,
                primitives::OBJECT => TypeKind::Object,
                primitives::TYPE => TypeKind::TypeLiteral,
                numeric => match exprbind_core::NumericRank::of(numeric) {
                    Some(rank) => TypeKind::Numeric(rank),
                    None => continue,
                },
            };
            let desc = TypeDesc::with_hash(hash, name, kind);
            // Seeding cannot fail: hashes are reserved and distinct.
            let _ = self.insert(desc, true);
        }
    }

    /// The conversion cache populated alongside descriptions.
    pub fn conversions(&self) -> &ConversionTable {
        &self.conversions
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    /// Register an eagerly-built description.
    ///
    /// Fails if the identity is already registered or a base/interface has
    /// not been described yet (descriptions are built bottom-up).
    pub fn register(&self, desc: TypeDesc) -> Result<Arc<TypeDesc>, RegistrationError> {
        self.insert(desc, false)
    }

    fn insert(
        &self,
        desc: TypeDesc,
        allow_existing: bool,
    ) -> Result<Arc<TypeDesc>, RegistrationError> {
        // Validate dependencies before taking any write lock: validation may
        // recurse into the provider, which re-enters this method.
        if let TypeKind::Class { base, interfaces } = &desc.kind {
            if let Some(base) = base {
                self.describe(*base)
                    .map_err(|_| RegistrationError::UnknownBase {
                        name: desc.name.clone(),
                    })?;
            }
            for iface in interfaces {
                self.describe(*iface)
                    .map_err(|_| RegistrationError::UnknownInterface {
                        name: desc.name.clone(),
                    })?;
            }
        }
        if let TypeKind::Array { elem, .. } = &desc.kind {
            let _ = self.describe(*elem);
        }
        if let TypeKind::Nullable { underlying } = &desc.kind {
            let _ = self.describe(*underlying);
        }

        let arc = {
            let mut types = self.types.write().expect("type table lock poisoned");
            if let Some(existing) = types.get(&desc.hash) {
                if allow_existing {
                    return Ok(existing.clone());
                }
                return Err(RegistrationError::DuplicateType {
                    name: desc.name.clone(),
                });
            }
            let arc = Arc::new(desc);
            types.insert(arc.hash, arc.clone());
            arc
        };

        self.by_name
            .write()
            .expect("name index lock poisoned")
            .entry(arc.name.clone())
            .or_insert(arc.hash);

        self.conversions.merge_from_type(&arc);
        self.record_natural_conversions(&arc);

        debug!(name = %arc.name, hash = ?arc.hash, "described type");
        Ok(arc)
    }

    /// Record inheritance/interface compatibility in the conversion cache.
    fn record_natural_conversions(&self, desc: &TypeDesc) {
        for ancestor in self.ancestry(desc) {
            self.conversions.insert_natural(desc.hash, ancestor);
        }
    }

    /// Transitive bases and interfaces of a description, plus `object`.
    fn ancestry(&self, desc: &TypeDesc) -> Vec<TypeHash> {
        let mut out = Vec::new();
        let mut push = |h: TypeHash, out: &mut Vec<TypeHash>| {
            if !out.contains(&h) {
                out.push(h);
            }
        };
        for iface in desc.interfaces() {
            push(*iface, &mut out);
        }
        let mut current = desc.base();
        while let Some(base) = current {
            push(base, &mut out);
            current = match self.try_describe(base) {
                Some(base_desc) => {
                    for iface in base_desc.interfaces() {
                        push(*iface, &mut out);
                    }
                    base_desc.base()
                }
                None => None,
            };
        }
        if !matches!(desc.kind, TypeKind::Void | TypeKind::Null | TypeKind::Object) {
            push(primitives::OBJECT, &mut out);
        }
        out
    }

    // ==========================================================================
    // Description lookup
    // ==========================================================================

    /// Describe an identity, consulting the provider on a miss.
    ///
    /// Returns the same `Arc` for every call with the same identity.
    pub fn describe(&self, hash: TypeHash) -> Result<Arc<TypeDesc>, RegistrationError> {
        if let Some(found) = self
            .types
            .read()
            .expect("type table lock poisoned")
            .get(&hash)
        {
            return Ok(found.clone());
        }
        let provider = self
            .provider
            .as_ref()
            .ok_or(RegistrationError::UnknownType { hash })?
            .clone();
        let desc = provider
            .describe(hash)
            .ok_or(RegistrationError::UnknownType { hash })?;
        // Races with a concurrent describe of the same type resolve to
        // whichever insert won; merging conversions twice is idempotent.
        self.insert(desc, true)
    }

    /// Describe, `None` on unknown.
    pub fn try_describe(&self, hash: TypeHash) -> Option<Arc<TypeDesc>> {
        self.describe(hash).ok()
    }

    /// Human-readable name of an identity, for error messages.
    pub fn name_of(&self, hash: TypeHash) -> String {
        if let Some(desc) = self.try_describe(hash) {
            return desc.name.clone();
        }
        primitives::name(hash)
            .map(str::to_owned)
            .unwrap_or_else(|| format!("{hash:?}"))
    }

    // ==========================================================================
    // Name resolution (the TypeResolver capability)
    // ==========================================================================

    /// Resolve a type name, including `T?` nullable and `T[]`/`T[,]` array
    /// derivations.
    pub fn resolve_name(&self, name: &str) -> Option<TypeHash> {
        let name = name.trim();
        if let Some(base) = name.strip_suffix('?') {
            let underlying = self.resolve_name(base)?;
            return Some(self.nullable_of(underlying));
        }
        if let Some(stripped) = name.strip_suffix(']') {
            let open = stripped.rfind('[')?;
            let commas = stripped[open + 1..].chars().filter(|c| *c == ',').count();
            if !stripped[open + 1..].chars().all(|c| c == ',' || c == ' ') {
                return None;
            }
            let elem = self.resolve_name(&stripped[..open])?;
            return Some(self.array_of(elem, commas as u32 + 1));
        }
        if let Some(found) = self
            .by_name
            .read()
            .expect("name index lock poisoned")
            .get(name)
        {
            return Some(*found);
        }
        let hash = self.provider.as_ref()?.resolve(name)?;
        // Materialize so the name index learns it.
        self.try_describe(hash).map(|d| d.hash)
    }

    // ==========================================================================
    // Derived types
    // ==========================================================================

    /// The nullable wrapper of a type, described on first use.
    pub fn nullable_of(&self, underlying: TypeHash) -> TypeHash {
        let hash = underlying.nullable_of();
        if self.types.read().expect("type table lock poisoned").contains_key(&hash) {
            return hash;
        }
        let name = format!("{}?", self.name_of(underlying));
        let desc = TypeDesc::with_hash(hash, name, TypeKind::Nullable { underlying });
        let _ = self.insert(desc, true);
        hash
    }

    /// The array type over an element, described on first use.
    pub fn array_of(&self, elem: TypeHash, rank: u32) -> TypeHash {
        let hash = elem.array_of(rank);
        if self.types.read().expect("type table lock poisoned").contains_key(&hash) {
            return hash;
        }
        let commas = ",".repeat(rank.saturating_sub(1) as usize);
        let name = format!("{}[{}]", self.name_of(elem), commas);
        let desc = TypeDesc::with_hash(hash, name, TypeKind::Array { elem, rank });
        let _ = self.insert(desc, true);
        hash
    }

    /// The lambda signature type, described on first use.
    pub fn lambda_of(&self, params: &[TypeHash], result: TypeHash) -> TypeHash {
        let hash = TypeHash::lambda_of(params, result);
        if self.types.read().expect("type table lock poisoned").contains_key(&hash) {
            return hash;
        }
        let param_names: Vec<String> = params.iter().map(|p| self.name_of(*p)).collect();
        let name = format!("fn({}) -> {}", param_names.join(", "), self.name_of(result));
        let desc = TypeDesc::with_hash(
            hash,
            name,
            TypeKind::Lambda {
                params: params.to_vec(),
                result,
            },
        );
        let _ = self.insert(desc, true);
        hash
    }

    // ==========================================================================
    // Member lookup (the MemberResolver capability)
    // ==========================================================================

    /// Members under a name, own first, then up the base chain.
    pub fn members(&self, ty: TypeHash, name: &str) -> Vec<MemberDesc> {
        let mut out = Vec::new();
        let mut current = Some(ty);
        while let Some(hash) = current {
            let Some(desc) = self.try_describe(hash) else { break };
            out.extend(desc.members_named(name).iter().cloned());
            current = desc.base();
        }
        out
    }

    /// Indexer members, own first, then up the base chain.
    pub fn indexers(&self, ty: TypeHash) -> Vec<MemberDesc> {
        let mut out = Vec::new();
        let mut current = Some(ty);
        while let Some(hash) = current {
            let Some(desc) = self.try_describe(hash) else { break };
            out.extend(desc.indexers.iter().cloned());
            current = desc.base();
        }
        out
    }

    /// Constructors declared on a type (not inherited).
    pub fn constructors(&self, ty: TypeHash) -> Vec<MemberDesc> {
        self.try_describe(ty)
            .map(|d| d.constructors.clone())
            .unwrap_or_default()
    }

    /// A known member by declaring type + name + arity.
    ///
    /// Used when binding is driven from a pre-resolved member reference
    /// rather than free text.
    pub fn find_member(&self, declaring: TypeHash, name: &str, arity: usize) -> Option<MemberDesc> {
        self.members(declaring, name)
            .into_iter()
            .find(|m| m.arity_accepts(arity))
    }

    // ==========================================================================
    // Relations
    // ==========================================================================

    /// Inheritance/interface assignability (`from` usable as `to`).
    pub fn is_assignable(&self, from: TypeHash, to: TypeHash) -> bool {
        if from == to || to == primitives::OBJECT {
            return true;
        }
        let mut current = Some(from);
        while let Some(hash) = current {
            let Some(desc) = self.try_describe(hash) else { return false };
            if desc.hash == to || desc.interfaces().contains(&to) {
                return true;
            }
            current = desc.base();
        }
        false
    }

    /// Default value of a type (zero, false, or null).
    pub fn default_value(&self, ty: TypeHash) -> Value {
        self.try_describe(ty)
            .map(|d| d.default_value())
            .unwrap_or(Value::Null)
    }
}
