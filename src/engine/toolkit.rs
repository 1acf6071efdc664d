//! Toolkit - The context object that owns every registry.
//!
//! One `Toolkit` holds the class registry, the control arena, the names and
//! function tables, global attributes, the driver and the native/timer lookup
//! tables. Nothing is static: two toolkits in one process are independent.
//!
//! # Example
//!
//! ```ignore
//! use portkit::{Toolkit, ToolkitConfig, driver::HeadlessDriver};
//!
//! let mut tk = Toolkit::open(Box::new(HeadlessDriver::new()), ToolkitConfig::default())?;
//! let dlg = tk.create("dialog")?;
//! let btn = tk.create_with("button", &["OK".into()])?;
//! tk.append(dlg, btn)?;
//! tk.map(dlg)?;
//! tk.close();
//! ```

use std::collections::HashMap;

use spark_signals::{Signal, signal};
use tracing::{debug, warn};

use super::attrib::AttributeStore;
use super::class::{
    AttrFlags, ClassId, ClassRegistry, ControlClass, Getter, Id2Getter, Id2Setter, IdGetter, IdSetter, Setter,
};
use super::control::Control;
use super::events::Callback;
use super::registry::{ControlRegistry, Handle};
use crate::config::ToolkitConfig;
use crate::driver::Driver;
use crate::error::{Result, ToolkitError};
use crate::types::{NativeHandle, NativeType, Param};

/// Widget toolkit context.
pub struct Toolkit {
    pub(crate) classes: ClassRegistry,
    pub(crate) controls: ControlRegistry,
    pub(crate) names: HashMap<String, Handle>,
    pub(crate) functions: HashMap<String, Callback>,
    pub(crate) globals: AttributeStore,
    pub(crate) language_strings: HashMap<String, String>,
    pub(crate) driver: Box<dyn Driver>,
    pub(crate) native_table: HashMap<NativeHandle, Handle>,
    pub(crate) timer_table: HashMap<i32, Handle>,
    pub(crate) focus: Signal<Option<Handle>>,
    pub(crate) exit_requested: Signal<bool>,
    pub(crate) strict_hierarchy: Option<bool>,
    pub(crate) auto_names: u32,
}

impl Toolkit {
    /// Create a toolkit over `driver` with the standard classes registered.
    pub fn open(driver: Box<dyn Driver>, config: ToolkitConfig) -> Result<Self> {
        let mut tk = Self {
            classes: ClassRegistry::new(),
            controls: ControlRegistry::new(),
            names: HashMap::new(),
            functions: HashMap::new(),
            globals: AttributeStore::new(),
            language_strings: HashMap::new(),
            driver,
            native_table: HashMap::new(),
            timer_table: HashMap::new(),
            focus: signal(None),
            exit_requested: signal(false),
            strict_hierarchy: config.strict_hierarchy,
            auto_names: 0,
        };

        crate::controls::register_standard_classes(&mut tk)?;

        if let Some(language) = &config.language {
            tk.set_global("LANGUAGE", Some(language));
        }
        for (key, value) in &config.language_strings {
            tk.set_language_string(key, value);
        }
        for (name, value) in &config.globals {
            tk.set_global(name, Some(value));
        }

        debug!(driver = tk.driver.name(), classes = tk.classes.len(), "toolkit opened");
        Ok(tk)
    }

    /// Shorthand for `open` with the default configuration.
    pub fn with_driver(driver: impl Driver + 'static) -> Result<Self> {
        Self::open(Box::new(driver), ToolkitConfig::default())
    }

    /// Destroy every remaining control and release class resources.
    pub fn close(mut self) {
        let roots: Vec<Handle> = self
            .controls
            .handles()
            .into_iter()
            .filter(|&h| self.controls.get(h).is_some_and(|c| c.parent.is_none()))
            .collect();
        for root in roots {
            self.destroy(root);
        }

        let releases: Vec<fn(&mut Toolkit)> = self
            .classes
            .ids()
            .filter_map(|id| self.classes.get(id).methods.release)
            .collect();
        for release in releases {
            release(&mut self);
        }

        debug!("toolkit closed");
    }

    // =========================================================================
    // Classes
    // =========================================================================

    /// Register a class. The driver may adjust it first.
    pub fn register_class(&mut self, mut class: ControlClass) -> Result<ClassId> {
        self.driver.init_class(&mut class);
        let name = class.name.clone();
        let id = self.classes.register(class)?;
        debug!(class = %name, "class registered");
        Ok(id)
    }

    pub fn find_class(&self, name: &str) -> Option<&ControlClass> {
        self.classes.find(name).map(|id| self.classes.get(id))
    }

    /// Add or replace a plain attribute on an already registered class.
    ///
    /// `global_default` names a global attribute Get falls back to before
    /// `default`.
    #[allow(clippy::too_many_arguments)]
    pub fn register_attribute(
        &mut self,
        class: &str,
        name: &str,
        get: Option<Getter>,
        set: Option<Setter>,
        default: Option<&str>,
        global_default: Option<&str>,
        flags: AttrFlags,
    ) -> Result<()> {
        self.registered_class_mut(class)?
            .register_attribute_global(name, get, set, default, global_default, flags);
        Ok(())
    }

    /// Add or replace a `NAME<id>` attribute on an already registered class.
    pub fn register_attribute_id(
        &mut self,
        class: &str,
        name: &str,
        get: Option<IdGetter>,
        set: Option<IdSetter>,
        flags: AttrFlags,
    ) -> Result<()> {
        self.registered_class_mut(class)?
            .register_attribute_id(name, get, set, flags);
        Ok(())
    }

    /// Add or replace a `NAME<lin>:<col>` attribute on an already registered
    /// class.
    pub fn register_attribute_id2(
        &mut self,
        class: &str,
        name: &str,
        get: Option<Id2Getter>,
        set: Option<Id2Setter>,
        flags: AttrFlags,
    ) -> Result<()> {
        self.registered_class_mut(class)?
            .register_attribute_id2(name, get, set, flags);
        Ok(())
    }

    fn registered_class_mut(&mut self, class: &str) -> Result<&mut ControlClass> {
        let id = self
            .classes
            .find(class)
            .ok_or_else(|| ToolkitError::UnknownClass(class.to_string()))?;
        Ok(self.classes.get_mut(id))
    }

    pub fn all_classes(&self) -> Vec<String> {
        self.classes.names()
    }

    /// Start a class deriving from `parent`. The new class takes the parent's
    /// native type, child policy, interactivity and creation format; it still
    /// has to be registered.
    pub fn derive_class(&self, parent: &str, name: &str) -> Result<ControlClass> {
        let base = self
            .find_class(parent)
            .ok_or_else(|| ToolkitError::UnknownClass(parent.to_string()))?;
        let mut class = ControlClass::new(name)
            .parent(parent)
            .native_type(base.native_type)
            .child_type(base.child_type)
            .interactive(base.interactive);
        class.format = base.format.clone();
        Ok(class)
    }

    /// Attribute names visible on a class through its chain.
    pub fn class_attribute_names(&self, class: &str) -> Vec<String> {
        self.classes
            .find(class)
            .map(|id| self.classes.attribute_names(id))
            .unwrap_or_default()
    }

    pub fn set_class_default_attribute(&mut self, class: &str, name: &str, value: Option<&str>) {
        match self.classes.find(class) {
            Some(id) => self.classes.set_default(id, name, value),
            None => warn!(class, "default for unknown class ignored"),
        }
    }

    pub fn get_class_default_attribute(&self, class: &str, name: &str) -> Option<String> {
        let id = self.classes.find(class)?;
        self.classes.find_descriptor(id, name)?.default.clone()
    }

    /// Class name of a control.
    pub fn class_name(&self, h: Handle) -> Option<&str> {
        let control = self.controls.get(h)?;
        Some(self.classes.get(control.class).name.as_str())
    }

    /// Native type of a control's class.
    pub fn class_type(&self, h: Handle) -> Option<NativeType> {
        let control = self.controls.get(h)?;
        Some(self.classes.get(control.class).native_type)
    }

    pub fn class_type_name(&self, h: Handle) -> Option<&'static str> {
        self.class_type(h).map(NativeType::as_str)
    }

    /// Whether the control's class is `class` or derives from it.
    pub fn class_match(&self, h: Handle, class: &str) -> bool {
        self.controls
            .get(h)
            .is_some_and(|c| self.classes.class_match(c.class, class))
    }

    // =========================================================================
    // Creation
    // =========================================================================

    pub fn create(&mut self, class: &str) -> Result<Handle> {
        self.create_with(class, &[])
    }

    /// Create a control, passing positional parameters to the class.
    pub fn create_with(&mut self, class: &str, params: &[Param]) -> Result<Handle> {
        let Some(class_id) = self.classes.find(class) else {
            warn!(class, "create: unknown class");
            return Err(ToolkitError::UnknownClass(class.to_string()));
        };

        check_params(class, self.classes.get(class_id).format.as_deref(), params)?;

        let h = self.controls.allocate(Control::new(class_id));
        if let Some(create) = self.classes.find_method(class_id, |m| m.create) {
            if let Err(err) = create(self, h, params) {
                warn!(class, %err, "create method failed");
                self.destroy(h);
                return Err(err);
            }
        }

        debug!(class, handle = %h, "control created");
        Ok(h)
    }

    // =========================================================================
    // Instance Queries
    // =========================================================================

    pub fn is_alive(&self, h: Handle) -> bool {
        self.controls.is_alive(h)
    }

    pub fn is_mapped(&self, h: Handle) -> bool {
        self.controls.get(h).is_some_and(Control::is_mapped)
    }

    pub fn native(&self, h: Handle) -> Option<NativeHandle> {
        self.controls.get(h)?.native
    }

    /// Driver, child or timer id. -1 when unassigned or stale.
    pub fn serial(&self, h: Handle) -> i32 {
        self.controls.get(h).map_or(-1, |c| c.serial)
    }

    /// Control that owns a native handle.
    pub fn from_native(&self, native: NativeHandle) -> Option<Handle> {
        self.native_table
            .get(&native)
            .copied()
            .filter(|&h| self.controls.is_alive(h))
    }

    /// Number of live controls.
    pub fn control_count(&self) -> usize {
        self.controls.len()
    }

    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    pub(crate) fn control(&self, h: Handle) -> Option<&Control> {
        self.controls.get(h)
    }

    pub(crate) fn control_mut(&mut self, h: Handle) -> Option<&mut Control> {
        self.controls.get_mut(h)
    }

    /// Whether detaching must unmap, config first then driver.
    pub(crate) fn strict_hierarchy(&self) -> bool {
        self.strict_hierarchy
            .unwrap_or_else(|| self.driver.strict_native_hierarchy())
    }
}

/// Validate parameters against a class format.
///
/// Lower-case format characters are required, upper-case are optional.
fn check_params(class: &str, format: Option<&str>, params: &[Param]) -> Result<()> {
    let format: Vec<char> = format.unwrap_or("").chars().collect();

    if params.len() > format.len() {
        return Err(ToolkitError::invalid_params(
            class,
            format!("expected at most {} parameters, got {}", format.len(), params.len()),
        ));
    }

    for (i, &expected) in format.iter().enumerate() {
        match params.get(i) {
            Some(param) if param.format_char() == expected.to_ascii_lowercase() => {}
            Some(param) => {
                return Err(ToolkitError::invalid_params(
                    class,
                    format!(
                        "parameter {i} should be '{}', got '{}'",
                        expected.to_ascii_lowercase(),
                        param.format_char()
                    ),
                ));
            }
            None if expected.is_ascii_lowercase() => {
                return Err(ToolkitError::invalid_params(
                    class,
                    format!("missing required parameter {i}"),
                ));
            }
            None => {}
        }
    }
    Ok(())
}
