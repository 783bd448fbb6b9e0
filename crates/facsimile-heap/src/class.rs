//! Runtime types
//!
//! A [`Class`] describes how instances of a type are stored. Instance fields
//! are laid out ancestors-first: the fields a class declares start at the
//! offset where its superclass's layout ends. A field that shadows an
//! ancestor's field by name therefore still occupies its own physical slot.

use dashmap::DashMap;
use std::fmt;
use std::ops::BitOr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use crate::object::ObjRef;
use crate::value::Value;

/// Shared handle to a runtime type
pub type ClassRef = Arc<Class>;

/// Constructor hook run by [`ObjRef::construct`]
pub type Constructor = Arc<dyn Fn(&ObjRef) + Send + Sync>;

/// Process-unique identity of a runtime type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u64);

static NEXT_CLASS_ID: AtomicU64 = AtomicU64::new(1);

impl ClassId {
    fn next() -> Self {
        Self(NEXT_CLASS_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Primitive storage kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// `bool`
    Bool,
    /// 8-bit signed integer
    Byte,
    /// Unicode scalar value
    Char,
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// 64-bit float
    Double,
}

impl Primitive {
    /// The zero value a fresh slot of this kind holds
    pub fn zero(self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::Byte => Value::Byte(0),
            Self::Char => Value::Char('\0'),
            Self::Int => Value::Int(0),
            Self::Long => Value::Long(0),
            Self::Double => Value::Double(0.0),
        }
    }

    /// Source-level name of the kind
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "boolean",
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Int => "int",
            Self::Long => "long",
            Self::Double => "double",
        }
    }
}

/// Declared type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Primitive slot, holds its value inline
    Primitive(Primitive),
    /// Reference slot, holds `Null`, a string or an object
    Reference,
}

impl FieldType {
    /// `boolean` field
    pub const BOOL: Self = Self::Primitive(Primitive::Bool);
    /// `byte` field
    pub const BYTE: Self = Self::Primitive(Primitive::Byte);
    /// `char` field
    pub const CHAR: Self = Self::Primitive(Primitive::Char);
    /// `int` field
    pub const INT: Self = Self::Primitive(Primitive::Int);
    /// `long` field
    pub const LONG: Self = Self::Primitive(Primitive::Long);
    /// `double` field
    pub const DOUBLE: Self = Self::Primitive(Primitive::Double);

    /// The zero value a fresh slot of this type holds
    pub fn zero(self) -> Value {
        match self {
            Self::Primitive(p) => p.zero(),
            Self::Reference => Value::Null,
        }
    }
}

/// Field modifier flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers(u8);

impl Modifiers {
    /// No modifiers
    pub const NONE: Self = Self(0);
    /// Class-level storage, not part of the instance layout
    pub const STATIC: Self = Self(1);
    /// Excluded from persistent state
    pub const TRANSIENT: Self = Self(1 << 1);
    /// Compiler-generated
    pub const SYNTHETIC: Self = Self(1 << 2);
    /// Compiler-generated back-reference to an enclosing instance
    pub const OUTER: Self = Self(1 << 3);

    /// Whether every flag in `other` is set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// `STATIC` is set
    pub const fn is_static(self) -> bool {
        self.contains(Self::STATIC)
    }

    /// `TRANSIENT` is set
    pub const fn is_transient(self) -> bool {
        self.contains(Self::TRANSIENT)
    }

    /// `SYNTHETIC` is set
    pub const fn is_synthetic(self) -> bool {
        self.contains(Self::SYNTHETIC)
    }

    /// `OUTER` is set
    pub const fn is_outer_reference(self) -> bool {
        self.contains(Self::OUTER)
    }
}

impl BitOr for Modifiers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A field declared by one class
#[derive(Debug, Clone)]
pub struct FieldDef {
    name: Arc<str>,
    ty: FieldType,
    modifiers: Modifiers,
    /// Instance slot index; `None` for static fields
    offset: Option<usize>,
}

impl FieldDef {
    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type
    pub fn ty(&self) -> FieldType {
        self.ty
    }

    /// Modifier flags
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Instance slot index, `None` for static fields
    pub fn offset(&self) -> Option<usize> {
        self.offset
    }
}

/// Element type of an array class
#[derive(Debug, Clone)]
pub enum Component {
    /// Array of primitives, stored unboxed
    Primitive(Primitive),
    /// Array of references whose declared element type is the given class
    Class(ClassRef),
}

/// What kind of type a class is
#[derive(Debug, Clone)]
pub enum ClassKind {
    /// Ordinary class with field storage
    Object,
    /// Interface; has no instances of its own
    Interface,
    /// Closed set of named singleton constants
    Enum {
        /// Constant names, by ordinal
        constants: Vec<Arc<str>>,
    },
    /// Array class
    Array(Component),
    /// Built-in with native storage; cannot be allocated without construction
    Native,
}

/// Annotation attached to a class declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    name: Arc<str>,
    inherited: bool,
}

impl Annotation {
    /// Name of the default immutability marker
    pub const IMMUTABLE: &'static str = "Immutable";

    /// Annotation that applies to the annotated class only
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            inherited: false,
        }
    }

    /// Make the annotation apply to subclasses as well
    pub fn inherited(mut self) -> Self {
        self.inherited = true;
        self
    }

    /// `@Immutable`
    pub fn immutable() -> Self {
        Self::new(Self::IMMUTABLE)
    }

    /// `@Immutable(subClass = true)`
    pub fn immutable_with_subclasses() -> Self {
        Self::immutable().inherited()
    }

    /// Annotation name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether subclasses inherit the annotation
    pub fn is_inherited(&self) -> bool {
        self.inherited
    }
}

/// A runtime type
pub struct Class {
    id: ClassId,
    name: Arc<str>,
    kind: ClassKind,
    superclass: Option<ClassRef>,
    interfaces: Vec<ClassRef>,
    /// Fields declared by this class only
    fields: Vec<FieldDef>,
    /// Full instance layout, ancestors first
    layout: Vec<FieldType>,
    annotations: Vec<Annotation>,
    constructor: Option<Constructor>,
    opaque: bool,
}

static OBJECT: LazyLock<ClassRef> = LazyLock::new(|| {
    Arc::new(Class {
        id: ClassId::next(),
        name: Arc::from("Object"),
        kind: ClassKind::Object,
        superclass: None,
        interfaces: Vec::new(),
        fields: Vec::new(),
        layout: Vec::new(),
        annotations: Vec::new(),
        constructor: None,
        opaque: false,
    })
});

/// Interning key for array classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ArrayKey {
    Primitive(Primitive),
    Class(ClassId),
}

/// Global array class table, so every `int[]` shares one class
static ARRAY_CLASSES: LazyLock<DashMap<ArrayKey, ClassRef>> = LazyLock::new(DashMap::new);

impl Class {
    /// The universal root type every ancestry chain ends at
    pub fn object() -> ClassRef {
        OBJECT.clone()
    }

    /// The interned array class for `component`
    pub fn array_of(component: Component) -> ClassRef {
        let key = match &component {
            Component::Primitive(p) => ArrayKey::Primitive(*p),
            Component::Class(c) => ArrayKey::Class(c.id),
        };
        ARRAY_CLASSES
            .entry(key)
            .or_insert_with(|| {
                let name = match &component {
                    Component::Primitive(p) => format!("{}[]", p.name()),
                    Component::Class(c) => format!("{}[]", c.name),
                };
                Arc::new(Class {
                    id: ClassId::next(),
                    name: Arc::from(name),
                    kind: ClassKind::Array(component),
                    superclass: Some(Class::object()),
                    interfaces: Vec::new(),
                    fields: Vec::new(),
                    layout: Vec::new(),
                    annotations: Vec::new(),
                    constructor: None,
                    opaque: false,
                })
            })
            .clone()
    }

    /// Unique id
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Class name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class kind
    pub fn kind(&self) -> &ClassKind {
        &self.kind
    }

    /// Direct superclass; `None` for the root and for interfaces
    pub fn superclass(&self) -> Option<&ClassRef> {
        self.superclass.as_ref()
    }

    /// Directly implemented interfaces
    pub fn interfaces(&self) -> &[ClassRef] {
        &self.interfaces
    }

    /// Fields declared by this class, excluding inherited ones
    pub fn declared_fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Annotations declared on this class
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Declared annotation with the given name
    pub fn annotation(&self, name: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.name() == name)
    }

    /// Constructor hook, if any
    pub fn constructor(&self) -> Option<&Constructor> {
        self.constructor.as_ref()
    }

    /// Full instance layout, ancestors first
    pub fn layout(&self) -> &[FieldType] {
        &self.layout
    }

    /// Number of instance slots
    pub fn instance_size(&self) -> usize {
        self.layout.len()
    }

    /// Element type, for array classes
    pub fn component(&self) -> Option<&Component> {
        match &self.kind {
            ClassKind::Array(c) => Some(c),
            _ => None,
        }
    }

    /// Whether this is the universal root type
    pub fn is_root(&self) -> bool {
        self.id == OBJECT.id
    }

    /// Whether this is an enum class
    pub fn is_enum(&self) -> bool {
        matches!(self.kind, ClassKind::Enum { .. })
    }

    /// Whether this is an array class
    pub fn is_array(&self) -> bool {
        matches!(self.kind, ClassKind::Array(_))
    }

    /// Whether the class was declared opaque
    pub fn is_opaque(&self) -> bool {
        self.opaque
    }

    /// Whether a zero-initialized instance can be allocated without running
    /// any constructor
    pub fn is_instantiable(&self) -> bool {
        matches!(self.kind, ClassKind::Object) && !self.opaque
    }

    /// This class followed by its superclasses, up to and including the root
    pub fn ancestors(&self) -> impl Iterator<Item = &Class> {
        std::iter::successors(Some(self), |c| c.superclass.as_deref())
    }

    /// Most-derived instance field named `name`
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.ancestors()
            .flat_map(|c| c.fields.iter())
            .find(|f| f.offset.is_some() && f.name() == name)
    }

    /// Ordinal of the named enum constant
    pub fn constant_ordinal(&self, name: &str) -> Option<usize> {
        match &self.kind {
            ClassKind::Enum { constants } => constants.iter().position(|c| c.as_ref() == name),
            _ => None,
        }
    }

    /// Whether a value of this class can be used where `target` is expected
    /// (same class, a superclass, or an implemented interface)
    pub fn is_assignable_to(&self, target: &Class) -> bool {
        let mut pending: Vec<&Class> = vec![self];
        while let Some(class) = pending.pop() {
            if class.id == target.id {
                return true;
            }
            if let Some(sup) = &class.superclass {
                pending.push(sup);
            }
            pending.extend(class.interfaces.iter().map(|i| i.as_ref()));
        }
        false
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("id", &self.id.0)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Builder for [`Class`]
pub struct ClassBuilder {
    name: Arc<str>,
    kind: ClassKind,
    superclass: Option<ClassRef>,
    interfaces: Vec<ClassRef>,
    fields: Vec<(Arc<str>, FieldType, Modifiers)>,
    annotations: Vec<Annotation>,
    constructor: Option<Constructor>,
    opaque: bool,
}

impl ClassBuilder {
    fn with_kind(name: impl Into<Arc<str>>, kind: ClassKind) -> Self {
        Self {
            name: name.into(),
            kind,
            superclass: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            annotations: Vec::new(),
            constructor: None,
            opaque: false,
        }
    }

    /// Ordinary class
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self::with_kind(name, ClassKind::Object)
    }

    /// Interface
    pub fn interface(name: impl Into<Arc<str>>) -> Self {
        Self::with_kind(name, ClassKind::Interface)
    }

    /// Enum with the given constants, in ordinal order
    pub fn enumeration<I, S>(name: impl Into<Arc<str>>, constants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        let constants = constants.into_iter().map(Into::into).collect();
        Self::with_kind(name, ClassKind::Enum { constants })
    }

    /// Built-in with native storage
    pub fn native(name: impl Into<Arc<str>>) -> Self {
        Self::with_kind(name, ClassKind::Native)
    }

    /// Set the superclass (defaults to the root)
    pub fn extends(mut self, superclass: &ClassRef) -> Self {
        self.superclass = Some(superclass.clone());
        self
    }

    /// Add an implemented interface
    pub fn implements(mut self, interface: &ClassRef) -> Self {
        self.interfaces.push(interface.clone());
        self
    }

    /// Declare an instance field
    pub fn field(self, name: impl Into<Arc<str>>, ty: FieldType) -> Self {
        self.field_with(name, ty, Modifiers::NONE)
    }

    /// Declare a field with explicit modifiers
    pub fn field_with(
        mut self,
        name: impl Into<Arc<str>>,
        ty: FieldType,
        modifiers: Modifiers,
    ) -> Self {
        self.fields.push((name.into(), ty, modifiers));
        self
    }

    /// Declare a static field
    pub fn static_field(self, name: impl Into<Arc<str>>, ty: FieldType) -> Self {
        self.field_with(name, ty, Modifiers::STATIC)
    }

    /// Declare a transient instance field
    pub fn transient_field(self, name: impl Into<Arc<str>>, ty: FieldType) -> Self {
        self.field_with(name, ty, Modifiers::TRANSIENT)
    }

    /// Declare a compiler-generated instance field
    pub fn synthetic_field(self, name: impl Into<Arc<str>>, ty: FieldType) -> Self {
        self.field_with(name, ty, Modifiers::SYNTHETIC)
    }

    /// Declare the back-reference an inner class keeps to its enclosing instance
    pub fn outer_reference(self, name: impl Into<Arc<str>>) -> Self {
        self.field_with(
            name,
            FieldType::Reference,
            Modifiers::SYNTHETIC | Modifiers::OUTER,
        )
    }

    /// Attach an annotation
    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Set the constructor hook
    pub fn constructor(mut self, f: impl Fn(&ObjRef) + Send + Sync + 'static) -> Self {
        self.constructor = Some(Arc::new(f));
        self
    }

    /// Forbid allocation without construction
    pub fn opaque(mut self) -> Self {
        self.opaque = true;
        self
    }

    /// Finish the class
    pub fn build(self) -> ClassRef {
        let is_interface = matches!(self.kind, ClassKind::Interface);
        let superclass = if is_interface {
            None
        } else {
            Some(self.superclass.unwrap_or_else(Class::object))
        };

        let mut layout = superclass
            .as_ref()
            .map(|s| s.layout.clone())
            .unwrap_or_default();

        // Interfaces carry no instance state
        let fields = self
            .fields
            .into_iter()
            .map(|(name, ty, modifiers)| {
                let modifiers = if is_interface {
                    modifiers | Modifiers::STATIC
                } else {
                    modifiers
                };
                let offset = if modifiers.is_static() {
                    None
                } else {
                    layout.push(ty);
                    Some(layout.len() - 1)
                };
                FieldDef {
                    name,
                    ty,
                    modifiers,
                    offset,
                }
            })
            .collect();

        Arc::new(Class {
            id: ClassId::next(),
            name: self.name,
            kind: self.kind,
            superclass,
            interfaces: self.interfaces,
            fields,
            layout,
            annotations: self.annotations,
            constructor: self.constructor,
            opaque: self.opaque,
        })
    }
}
