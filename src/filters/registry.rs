use heck::ToSnakeCase;
use std::collections::BTreeMap;
use std::fmt;

/// Base scalar carried by a filter family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScalarKind {
    UInt32,
    UInt64,
    Int32,
    Int64,
    String,
    Bool,
}

impl ScalarKind {
    /// Every kind the standard registry knows, in table order.
    pub const ALL: [ScalarKind; 6] = [
        ScalarKind::UInt32,
        ScalarKind::UInt64,
        ScalarKind::Int32,
        ScalarKind::Int64,
        ScalarKind::String,
        ScalarKind::Bool,
    ];

    /// Name fragment used in filter message names (`UInt32` in `UInt32Filter`).
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::UInt32 => "UInt32",
            ScalarKind::UInt64 => "UInt64",
            ScalarKind::Int32 => "Int32",
            ScalarKind::Int64 => "Int64",
            ScalarKind::String => "String",
            ScalarKind::Bool => "Bool",
        }
    }

    /// Lowercase fragment used in generated function names.
    pub fn slug(self) -> &'static str {
        match self {
            ScalarKind::UInt32 => "uint32",
            ScalarKind::UInt64 => "uint64",
            ScalarKind::Int32 => "int32",
            ScalarKind::Int64 => "int64",
            ScalarKind::String => "string",
            ScalarKind::Bool => "bool",
        }
    }

    /// Rust type the generated code uses for a single value of this kind.
    pub fn rust_type(self) -> &'static str {
        match self {
            ScalarKind::UInt32 => "u32",
            ScalarKind::UInt64 => "u64",
            ScalarKind::Int32 => "i32",
            ScalarKind::Int64 => "i64",
            ScalarKind::String => "String",
            ScalarKind::Bool => "bool",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ScalarKind::UInt32 | ScalarKind::UInt64 | ScalarKind::Int32 | ScalarKind::Int64
        )
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How an operator's argument is supplied to a filter constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    /// One value of the family's scalar kind
    Single,
    /// Comma-separated list of values
    List,
    /// Boolean presence flag (`is_null=true`)
    Flag,
    /// One map key
    Key,
    /// Comma-separated list of map keys
    KeyList,
}

/// Operator suffix appended to a field name in a REST query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    NotIn,
    Contains,
    StartsWith,
    EndsWith,
    Like,
    NotLike,
    IsNull,
    IsNotNull,
    HasKey,
    NotHasKey,
    HasAnyKey,
    HasAllKeys,
}

impl Operator {
    pub const ALL: [Operator; 19] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Lt,
        Operator::Lte,
        Operator::Gt,
        Operator::Gte,
        Operator::In,
        Operator::NotIn,
        Operator::Contains,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::Like,
        Operator::NotLike,
        Operator::IsNull,
        Operator::IsNotNull,
        Operator::HasKey,
        Operator::NotHasKey,
        Operator::HasAnyKey,
        Operator::HasAllKeys,
    ];

    /// Delimited suffix token (`not_in`, `is_not_null`).
    pub fn token(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::Contains => "contains",
            Operator::StartsWith => "starts_with",
            Operator::EndsWith => "ends_with",
            Operator::Like => "like",
            Operator::NotLike => "not_like",
            Operator::IsNull => "is_null",
            Operator::IsNotNull => "is_not_null",
            Operator::HasKey => "has_key",
            Operator::NotHasKey => "not_has_key",
            Operator::HasAnyKey => "has_any_key",
            Operator::HasAllKeys => "has_all_keys",
        }
    }

    pub fn from_token(token: &str) -> Option<Operator> {
        Operator::ALL.into_iter().find(|op| op.token() == token)
    }

    /// Oneof variant name in the prost-generated filter enum.
    pub fn variant_name(self) -> String {
        crate::naming::to_pascal_case(self.token())
    }

    pub fn shape(self) -> ValueShape {
        match self {
            Operator::In | Operator::NotIn => ValueShape::List,
            Operator::IsNull | Operator::IsNotNull => ValueShape::Flag,
            Operator::HasKey | Operator::NotHasKey => ValueShape::Key,
            Operator::HasAnyKey | Operator::HasAllKeys => ValueShape::KeyList,
            _ => ValueShape::Single,
        }
    }

    /// Whether the REST parameter carries a comma-separated list.
    pub fn is_list(self) -> bool {
        matches!(self.shape(), ValueShape::List | ValueShape::KeyList)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

const NUMERIC_OPERATORS: &[Operator] = &[
    Operator::Eq,
    Operator::Ne,
    Operator::Lt,
    Operator::Lte,
    Operator::Gt,
    Operator::Gte,
    Operator::In,
    Operator::NotIn,
];

const STRING_OPERATORS: &[Operator] = &[
    Operator::Eq,
    Operator::Ne,
    Operator::Contains,
    Operator::StartsWith,
    Operator::EndsWith,
    Operator::Like,
    Operator::NotLike,
    Operator::In,
    Operator::NotIn,
];

const BOOL_OPERATORS: &[Operator] = &[Operator::Eq, Operator::Ne];

const MAP_OPERATORS: &[Operator] = &[
    Operator::HasKey,
    Operator::NotHasKey,
    Operator::HasAnyKey,
    Operator::HasAllKeys,
];

const NULL_OPERATORS: &[Operator] = &[Operator::IsNull, Operator::IsNotNull];

/// Operator set for a `(kind, nullable, map)` triple, in constructor argument order.
pub fn operators_for_family(kind: ScalarKind, nullable: bool, map: bool) -> Vec<Operator> {
    let base = if map {
        MAP_OPERATORS
    } else if kind.is_numeric() {
        NUMERIC_OPERATORS
    } else if kind == ScalarKind::String {
        STRING_OPERATORS
    } else {
        BOOL_OPERATORS
    };
    let mut ops = base.to_vec();
    if nullable {
        ops.extend_from_slice(NULL_OPERATORS);
    }
    ops
}

/// One filter message family, e.g. `NullableUInt32Filter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterTypeDescriptor {
    name: String,
    kind: ScalarKind,
    nullable: bool,
    map: bool,
    operators: Vec<Operator>,
}

impl FilterTypeDescriptor {
    pub fn new(kind: ScalarKind, nullable: bool, map: bool) -> Self {
        let name = format!(
            "{}{}{}Filter",
            if nullable { "Nullable" } else { "" },
            if map { "MapString" } else { "" },
            kind.name()
        );
        FilterTypeDescriptor {
            name,
            kind,
            nullable,
            map,
            operators: operators_for_family(kind, nullable, map),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_map(&self) -> bool {
        self.map
    }

    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    pub fn supports(&self, op: Operator) -> bool {
        self.operators.contains(&op)
    }

    /// Name of the generated constructor, e.g. `build_nullable_uint32_filter`.
    pub fn constructor_name(&self) -> String {
        format!(
            "build_{}{}{}_filter",
            if self.nullable { "nullable_" } else { "" },
            if self.map { "map_string_" } else { "" },
            self.kind.slug()
        )
    }

    /// Module prost-build emits for the message's `filter` oneof.
    pub fn oneof_module(&self) -> String {
        self.name.to_snake_case()
    }

    /// Message used for `between` ranges (`UInt32Range`).
    pub fn range_message(&self) -> String {
        format!("{}Range", self.kind.name())
    }

    /// Message used for list operators (`UInt32List`, `MapKeyList` for map keys).
    pub fn list_message(&self) -> String {
        if self.map {
            "MapKeyList".to_string()
        } else {
            format!("{}List", self.kind.name())
        }
    }

    /// Repeated field of [`list_message`](Self::list_message).
    pub fn list_field(&self) -> &'static str {
        if self.map {
            "keys"
        } else {
            "values"
        }
    }
}

/// Immutable table of every known filter family, keyed by message name.
#[derive(Debug, Clone)]
pub struct FilterRegistry {
    types: BTreeMap<String, FilterTypeDescriptor>,
    vocabulary: Vec<Operator>,
}

impl FilterRegistry {
    /// Build the standard table: every scalar kind in plain and nullable form,
    /// plus the string-keyed map family.
    pub fn standard() -> Self {
        let mut descriptors = Vec::new();
        for kind in ScalarKind::ALL {
            descriptors.push(FilterTypeDescriptor::new(kind, false, false));
            descriptors.push(FilterTypeDescriptor::new(kind, true, false));
        }
        descriptors.push(FilterTypeDescriptor::new(ScalarKind::String, false, true));
        Self::from_descriptors(descriptors)
    }

    pub fn from_descriptors(descriptors: impl IntoIterator<Item = FilterTypeDescriptor>) -> Self {
        let types: BTreeMap<String, FilterTypeDescriptor> = descriptors
            .into_iter()
            .map(|d| (d.name().to_string(), d))
            .collect();
        let vocabulary = Operator::ALL
            .into_iter()
            .filter(|op| types.values().any(|d| d.supports(*op)))
            .collect();
        FilterRegistry { types, vocabulary }
    }

    pub fn get(&self, name: &str) -> Option<&FilterTypeDescriptor> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// All descriptors in name order.
    pub fn descriptors(&self) -> impl Iterator<Item = &FilterTypeDescriptor> {
        self.types.values()
    }

    /// Operators used by at least one registered family.
    pub fn vocabulary(&self) -> &[Operator] {
        &self.vocabulary
    }

    /// Resolve a delimited suffix (`not_in`) against the vocabulary.
    pub fn match_operator(&self, token: &str) -> Option<Operator> {
        Operator::from_token(token).filter(|op| self.vocabulary.contains(op))
    }

    pub fn operators_for<'a>(&self, descriptor: &'a FilterTypeDescriptor) -> &'a [Operator] {
        descriptor.operators()
    }

    pub fn builds_range_for(&self, descriptor: &FilterTypeDescriptor) -> bool {
        !descriptor.is_map() && descriptor.kind().is_numeric()
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
