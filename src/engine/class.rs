//! Class Registry - Control classes and their attribute tables.
//!
//! A class describes a kind of control: native type, child policy, creation
//! parameter format, an ordered table of attribute descriptors and a set of
//! optional method slots. Classes form single-inheritance chains by parent
//! class; attribute and method lookups walk the chain and the first match
//! wins.
//!
//! # Example
//!
//! ```ignore
//! let mut class = ControlClass::new("label")
//!     .parent("element")
//!     .native_type(NativeType::Control);
//! class.register_attribute("ALIGNMENT", None, Some(set_alignment), Some("ALEFT"), AttrFlags::empty());
//! toolkit.register_class(class)?;
//! ```

use std::collections::HashMap;

use bitflags::bitflags;

use super::attrib::{IdSuffix, split_id_suffix};
use super::events::NativeEvent;
use super::registry::Handle;
use super::toolkit::Toolkit;
use crate::driver::DriverError;
use crate::error::{Result, ToolkitError};
use crate::types::{CallbackResult, ChildType, NativeHandle, NativeType, Param};

// =============================================================================
// Attribute Flags
// =============================================================================

bitflags! {
    /// Behavior flags of an attribute descriptor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AttrFlags: u16 {
        /// Set is ignored.
        const READ_ONLY = 1 << 0;
        /// Get returns nothing and the value is never kept in the store.
        const WRITE_ONLY = 1 << 1;
        /// The registered default is not returned by Get.
        const NO_DEFAULT = 1 << 2;
        /// The value is not inherited by descendants.
        const NO_INHERIT = 1 << 3;
        /// The handlers work before the element is mapped.
        const NOT_MAPPED = 1 << 4;
        /// The value only exists while the element is mapped.
        const MAPPED = 1 << 5;
        /// The value names another element or a native resource. Not listed,
        /// saved or copied.
        const NO_STRING = 1 << 6;
        /// Not saved at unmap.
        const NO_SAVE = 1 << 7;
    }
}

// =============================================================================
// Handler Signatures
// =============================================================================

/// Plain getter. Returning `None` declines and lets Get fall back.
pub type Getter = fn(&Toolkit, Handle) -> Option<String>;
/// Plain setter. Returns whether the raw value is kept in the store.
pub type Setter = fn(&mut Toolkit, Handle, Option<&str>) -> bool;
pub type IdGetter = fn(&Toolkit, Handle, i32) -> Option<String>;
pub type IdSetter = fn(&mut Toolkit, Handle, i32, Option<&str>) -> bool;
pub type Id2Getter = fn(&Toolkit, Handle, i32, i32) -> Option<String>;
pub type Id2Setter = fn(&mut Toolkit, Handle, i32, i32, Option<&str>) -> bool;

/// How an attribute is addressed and which handlers serve it.
#[derive(Debug, Clone, Copy)]
pub enum AttrAccess {
    Plain {
        get: Option<Getter>,
        set: Option<Setter>,
    },
    /// `NAME<id>`
    Id {
        get: Option<IdGetter>,
        set: Option<IdSetter>,
    },
    /// `NAME<lin>:<col>`
    Id2 {
        get: Option<Id2Getter>,
        set: Option<Id2Setter>,
    },
}

impl AttrAccess {
    pub const fn has_getter(&self) -> bool {
        match self {
            Self::Plain { get, .. } => get.is_some(),
            Self::Id { get, .. } => get.is_some(),
            Self::Id2 { get, .. } => get.is_some(),
        }
    }

    pub const fn has_setter(&self) -> bool {
        match self {
            Self::Plain { set, .. } => set.is_some(),
            Self::Id { set, .. } => set.is_some(),
            Self::Id2 { set, .. } => set.is_some(),
        }
    }
}

/// One entry of a class attribute table.
#[derive(Debug, Clone)]
pub struct AttributeDescriptor {
    pub access: AttrAccess,
    pub default: Option<String>,
    /// Global attribute read before `default` (FONT → DEFAULTFONT).
    pub global_default: Option<String>,
    pub flags: AttrFlags,
}

impl AttributeDescriptor {
    pub fn is_inheritable(&self) -> bool {
        !self.flags.contains(AttrFlags::NO_INHERIT)
    }
}

// =============================================================================
// Method Slots
// =============================================================================

/// Optional per-class methods. Unset slots fall back to the parent class.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassMethods {
    /// Validates creation parameters and initializes private data.
    pub create: Option<fn(&mut Toolkit, Handle, &[Param]) -> Result<()>>,
    /// Creates the native resource instead of `Driver::map`. `None` means
    /// the control is mapped without a native of its own.
    pub map: Option<fn(&mut Toolkit, Handle) -> std::result::Result<Option<NativeHandle>, DriverError>>,
    /// Releases private resources before the native is destroyed.
    pub unmap: Option<fn(&mut Toolkit, Handle)>,
    pub destroy: Option<fn(&mut Toolkit, Handle)>,
    /// Called once per class when the toolkit closes.
    pub release: Option<fn(&mut Toolkit)>,
    /// Natural size from the children's already computed natural sizes.
    pub compute_natural_size: Option<fn(&Toolkit, Handle) -> (i32, i32)>,
    pub set_children_current_size: Option<fn(&mut Toolkit, Handle)>,
    /// Receives the control's own position.
    pub set_children_position: Option<fn(&mut Toolkit, Handle, i32, i32)>,
    /// Handles a native event. `None` defers to the standard callback.
    pub handle_event: Option<fn(&mut Toolkit, Handle, &NativeEvent) -> Option<CallbackResult>>,
}

// =============================================================================
// Control Class
// =============================================================================

/// Index of a registered class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub(crate) u32);

impl ClassId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Descriptor of a kind of control.
#[derive(Debug, Clone)]
pub struct ControlClass {
    pub name: String,
    pub parent_name: Option<String>,
    pub native_type: NativeType,
    pub child_type: ChildType,
    pub interactive: bool,
    /// Creation parameter format (`s`, `h`, `g`, `i`).
    pub format: Option<String>,
    pub methods: ClassMethods,
    pub(crate) parent: Option<ClassId>,
    attributes: Vec<(String, AttributeDescriptor)>,
    attribute_index: HashMap<String, usize>,
}

impl ControlClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent_name: None,
            native_type: NativeType::Void,
            child_type: ChildType::None,
            interactive: false,
            format: None,
            methods: ClassMethods::default(),
            parent: None,
            attributes: Vec::new(),
            attribute_index: HashMap::new(),
        }
    }

    pub fn parent(mut self, name: impl Into<String>) -> Self {
        self.parent_name = Some(name.into());
        self
    }

    pub fn native_type(mut self, native_type: NativeType) -> Self {
        self.native_type = native_type;
        self
    }

    pub fn child_type(mut self, child_type: ChildType) -> Self {
        self.child_type = child_type;
        self
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn methods(mut self, methods: ClassMethods) -> Self {
        self.methods = methods;
        self
    }

    /// Insert or replace a descriptor, keeping registration order.
    pub fn insert_descriptor(&mut self, name: &str, descriptor: AttributeDescriptor) {
        match self.attribute_index.get(name) {
            Some(&i) => self.attributes[i].1 = descriptor,
            None => {
                self.attribute_index
                    .insert(name.to_string(), self.attributes.len());
                self.attributes.push((name.to_string(), descriptor));
            }
        }
    }

    pub fn register_attribute(
        &mut self,
        name: &str,
        get: Option<Getter>,
        set: Option<Setter>,
        default: Option<&str>,
        flags: AttrFlags,
    ) {
        self.register_attribute_global(name, get, set, default, None, flags);
    }

    /// Plain attribute whose default comes from the global `global_default`
    /// when that global is set, and from `default` otherwise.
    pub fn register_attribute_global(
        &mut self,
        name: &str,
        get: Option<Getter>,
        set: Option<Setter>,
        default: Option<&str>,
        global_default: Option<&str>,
        flags: AttrFlags,
    ) {
        self.insert_descriptor(
            name,
            AttributeDescriptor {
                access: AttrAccess::Plain { get, set },
                default: default.map(str::to_string),
                global_default: global_default.map(str::to_string),
                flags,
            },
        );
    }

    pub fn register_attribute_id(
        &mut self,
        name: &str,
        get: Option<IdGetter>,
        set: Option<IdSetter>,
        flags: AttrFlags,
    ) {
        self.insert_descriptor(
            name,
            AttributeDescriptor {
                access: AttrAccess::Id { get, set },
                default: None,
                global_default: None,
                flags,
            },
        );
    }

    pub fn register_attribute_id2(
        &mut self,
        name: &str,
        get: Option<Id2Getter>,
        set: Option<Id2Setter>,
        flags: AttrFlags,
    ) {
        self.insert_descriptor(
            name,
            AttributeDescriptor {
                access: AttrAccess::Id2 { get, set },
                default: None,
                global_default: None,
                flags,
            },
        );
    }

    /// Own descriptor only (no chain walk).
    pub fn descriptor(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attribute_index
            .get(name)
            .map(|&i| &self.attributes[i].1)
    }

    fn descriptor_mut(&mut self, name: &str) -> Option<&mut AttributeDescriptor> {
        self.attribute_index
            .get(name)
            .map(|&i| &mut self.attributes[i].1)
    }

    /// Own attribute names in registration order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|(name, _)| name.as_str())
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// A descriptor found for an attribute name, with the parsed ids.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub descriptor: AttributeDescriptor,
    /// Base name the descriptor was registered under.
    pub base: String,
    pub id: i32,
    pub id2: i32,
}

// =============================================================================
// Registry
// =============================================================================

/// All registered classes, addressed by `ClassId`.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: Vec<ControlClass>,
    by_name: HashMap<String, ClassId>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a class. The parent class must already exist.
    pub fn register(&mut self, mut class: ControlClass) -> Result<ClassId> {
        if self.by_name.contains_key(&class.name) {
            return Err(ToolkitError::ClassExists(class.name));
        }
        if let Some(parent_name) = &class.parent_name {
            let parent = self
                .find(parent_name)
                .ok_or_else(|| ToolkitError::UnknownClass(parent_name.clone()))?;
            class.parent = Some(parent);
        }

        let id = ClassId(self.classes.len() as u32);
        self.by_name.insert(class.name.clone(), id);
        self.classes.push(class);
        Ok(id)
    }

    pub fn find(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: ClassId) -> &ControlClass {
        &self.classes[id.index()]
    }

    pub fn get_mut(&mut self, id: ClassId) -> &mut ControlClass {
        &mut self.classes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ClassId> {
        (0..self.classes.len() as u32).map(ClassId)
    }

    pub fn names(&self) -> Vec<String> {
        self.classes.iter().map(|c| c.name.clone()).collect()
    }

    /// The class followed by its ancestors.
    pub fn chain(&self, id: ClassId) -> impl Iterator<Item = &ControlClass> {
        std::iter::successors(Some(self.get(id)), |class| {
            class.parent.map(|parent| self.get(parent))
        })
    }

    /// Whether `id` is `name` or derives from it.
    pub fn class_match(&self, id: ClassId, name: &str) -> bool {
        self.chain(id).any(|class| class.name == name)
    }

    /// First descriptor registered under `name` along the chain.
    pub fn find_descriptor(&self, id: ClassId, name: &str) -> Option<&AttributeDescriptor> {
        self.chain(id).find_map(|class| class.descriptor(name))
    }

    /// First method slot set along the chain.
    pub fn find_method<T>(&self, id: ClassId, slot: impl Fn(&ClassMethods) -> Option<T>) -> Option<T> {
        self.chain(id).find_map(|class| slot(&class.methods))
    }

    /// Resolve an attribute name, parsing `NAME<id>` / `NAME<lin>:<col>`
    /// when no descriptor matches the name exactly.
    ///
    /// A plain name that hits an indexed descriptor gets `NO_ID`.
    pub fn resolve(&self, id: ClassId, name: &str) -> Option<Resolved> {
        use crate::types::NO_ID;

        if let Some(descriptor) = self.find_descriptor(id, name) {
            return Some(Resolved {
                descriptor: descriptor.clone(),
                base: name.to_string(),
                id: NO_ID,
                id2: NO_ID,
            });
        }

        let (base, suffix) = split_id_suffix(name)?;
        let descriptor = self.find_descriptor(id, base)?;
        let (first, second) = match (descriptor.access, suffix) {
            (AttrAccess::Id { .. }, IdSuffix::One(a)) => (a, NO_ID),
            (AttrAccess::Id2 { .. }, IdSuffix::Two(a, b)) => (a, b),
            _ => return None,
        };

        Some(Resolved {
            descriptor: descriptor.clone(),
            base: base.to_string(),
            id: first,
            id2: second,
        })
    }

    /// Every attribute name visible through the chain, own names first.
    pub fn attribute_names(&self, id: ClassId) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for class in self.chain(id) {
            for name in class.attribute_names() {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        names
    }

    /// Change the default of an attribute for this class.
    ///
    /// An inherited descriptor is copied into the class first so the parent
    /// keeps its own default. Unknown names get a handler-less descriptor.
    pub fn set_default(&mut self, id: ClassId, name: &str, value: Option<&str>) {
        let inherited = self.find_descriptor(id, name).cloned();
        let class = self.get_mut(id);

        if let Some(descriptor) = class.descriptor_mut(name) {
            descriptor.default = value.map(str::to_string);
            return;
        }

        let mut descriptor = inherited.unwrap_or(AttributeDescriptor {
            access: AttrAccess::Plain { get: None, set: None },
            default: None,
            global_default: None,
            flags: AttrFlags::empty(),
        });
        descriptor.default = value.map(str::to_string);
        class.insert_descriptor(name, descriptor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NO_ID;

    fn get_title(_tk: &Toolkit, _h: Handle) -> Option<String> {
        Some("title".into())
    }

    fn set_color(_tk: &mut Toolkit, _h: Handle, _id: i32, _v: Option<&str>) -> bool {
        false
    }

    fn set_cell(_tk: &mut Toolkit, _h: Handle, _l: i32, _c: i32, _v: Option<&str>) -> bool {
        false
    }

    fn registry() -> ClassRegistry {
        let mut registry = ClassRegistry::new();

        let mut base = ControlClass::new("base");
        base.register_attribute("TITLE", Some(get_title), None, Some("none"), AttrFlags::empty());
        base.register_attribute("FONT", None, None, Some("Sans, 10"), AttrFlags::empty());
        registry.register(base).unwrap();

        let mut tree = ControlClass::new("tree").parent("base");
        tree.register_attribute_id("COLOR", None, Some(set_color), AttrFlags::NO_INHERIT);
        tree.register_attribute_id2("", None, Some(set_cell), AttrFlags::NO_INHERIT);
        registry.register(tree).unwrap();

        registry
    }

    #[test]
    fn test_register_and_find() {
        let registry = registry();
        assert_eq!(registry.len(), 2);
        let tree = registry.find("tree").unwrap();
        assert_eq!(registry.get(tree).name, "tree");
        assert!(registry.find("nope").is_none());
    }

    #[test]
    fn test_duplicate_class() {
        let mut registry = registry();
        let err = registry.register(ControlClass::new("tree")).unwrap_err();
        assert!(matches!(err, ToolkitError::ClassExists(name) if name == "tree"));
    }

    #[test]
    fn test_unknown_parent() {
        let mut registry = ClassRegistry::new();
        let err = registry
            .register(ControlClass::new("child").parent("missing"))
            .unwrap_err();
        assert!(matches!(err, ToolkitError::UnknownClass(_)));
    }

    #[test]
    fn test_chain_lookup() {
        let registry = registry();
        let tree = registry.find("tree").unwrap();
        assert!(registry.class_match(tree, "base"));
        assert!(!registry.class_match(registry.find("base").unwrap(), "tree"));

        let title = registry.find_descriptor(tree, "TITLE").unwrap();
        assert!(title.access.has_getter());
        assert_eq!(title.default.as_deref(), Some("none"));
    }

    #[test]
    fn test_resolve_ids() {
        let registry = registry();
        let tree = registry.find("tree").unwrap();

        let color = registry.resolve(tree, "COLOR5").unwrap();
        assert_eq!((color.base.as_str(), color.id), ("COLOR", 5));

        let plain = registry.resolve(tree, "COLOR").unwrap();
        assert_eq!(plain.id, NO_ID);

        let cell = registry.resolve(tree, "3:4").unwrap();
        assert_eq!((cell.id, cell.id2), (3, 4));

        assert!(registry.resolve(tree, "COLOR3:4").is_none());
        assert!(registry.resolve(tree, "TITLE7").is_none());
        assert!(registry.resolve(tree, "UNKNOWN").is_none());
    }

    #[test]
    fn test_attribute_names_chain() {
        let registry = registry();
        let tree = registry.find("tree").unwrap();
        assert_eq!(registry.attribute_names(tree), vec!["COLOR", "", "TITLE", "FONT"]);
    }

    #[test]
    fn test_set_default_copies_inherited() {
        let mut registry = registry();
        let base = registry.find("base").unwrap();
        let tree = registry.find("tree").unwrap();

        registry.set_default(tree, "FONT", Some("Mono, 12"));
        assert_eq!(
            registry.find_descriptor(tree, "FONT").unwrap().default.as_deref(),
            Some("Mono, 12")
        );
        assert_eq!(
            registry.find_descriptor(base, "FONT").unwrap().default.as_deref(),
            Some("Sans, 10")
        );

        registry.set_default(tree, "NEWATTR", Some("1"));
        assert!(registry.get(tree).descriptor("NEWATTR").is_some());
    }
}
