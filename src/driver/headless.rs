//! Headless driver - In-memory natives for tests and offscreen use.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use super::{Driver, DriverError, MapRequest};
use crate::types::{NativeHandle, NativeType};

/// One native element created by the headless driver.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeRecord {
    pub class: String,
    pub native_type: NativeType,
    pub parent: Option<NativeHandle>,
    pub attributes: BTreeMap<String, String>,
}

// =============================================================================
// Native Pool
// =============================================================================

/// Native element table shared by the in-process backends.
#[derive(Debug, Default)]
pub(crate) struct NativePool {
    next: u64,
    natives: BTreeMap<NativeHandle, NativeRecord>,
}

impl NativePool {
    pub(crate) fn create(&mut self, request: &MapRequest) -> Result<NativeHandle, DriverError> {
        if let Some(parent) = request.parent {
            if !self.natives.contains_key(&parent) {
                return Err(DriverError::MissingParent);
            }
        }

        self.next += 1;
        let native = NativeHandle(self.next);
        self.natives.insert(
            native,
            NativeRecord {
                class: request.class.clone(),
                native_type: request.native_type,
                parent: request.parent,
                attributes: BTreeMap::new(),
            },
        );
        Ok(native)
    }

    pub(crate) fn remove(&mut self, native: NativeHandle) -> Option<NativeRecord> {
        self.natives.remove(&native)
    }

    pub(crate) fn get(&self, native: NativeHandle) -> Option<&NativeRecord> {
        self.natives.get(&native)
    }

    pub(crate) fn set_attribute(&mut self, native: NativeHandle, name: &str, value: Option<&str>) -> bool {
        let Some(record) = self.natives.get_mut(&native) else {
            return false;
        };
        match value {
            Some(value) => {
                record.attributes.insert(name.to_string(), value.to_string());
            }
            None => {
                record.attributes.remove(name);
            }
        }
        true
    }

    pub(crate) fn get_attribute(&self, native: NativeHandle, name: &str) -> Option<String> {
        self.natives.get(&native)?.attributes.get(name).cloned()
    }

    pub(crate) fn reparent(&mut self, native: NativeHandle, parent: Option<NativeHandle>) -> Result<(), DriverError> {
        if let Some(parent) = parent {
            if !self.natives.contains_key(&parent) {
                return Err(DriverError::MissingParent);
            }
        }
        let record = self
            .natives
            .get_mut(&native)
            .ok_or(DriverError::UnknownNative(native))?;
        record.parent = parent;
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.natives.len()
    }
}

// =============================================================================
// Headless State
// =============================================================================

#[derive(Debug)]
struct HeadlessState {
    pool: NativePool,
    fail_classes: HashSet<String>,
    timers: BTreeMap<i32, u32>,
    next_timer: i32,
    popups: Vec<(NativeHandle, i32, i32)>,
    focus: Option<NativeHandle>,
    exit_requests: usize,
    screen_size: (i32, i32),
    cursor: (i32, i32),
    strict: bool,
}

impl Default for HeadlessState {
    fn default() -> Self {
        Self {
            pool: NativePool::default(),
            fail_classes: HashSet::new(),
            timers: BTreeMap::new(),
            next_timer: 0,
            popups: Vec::new(),
            focus: None,
            exit_requests: 0,
            screen_size: (1024, 768),
            cursor: (0, 0),
            strict: false,
        }
    }
}

// =============================================================================
// Driver
// =============================================================================

/// In-memory backend. Every native is a record in a table.
#[derive(Debug, Default)]
pub struct HeadlessDriver {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_screen_size(self, width: i32, height: i32) -> Self {
        self.state.borrow_mut().screen_size = (width, height);
        self
    }

    /// Make detaching an element unmap it.
    pub fn with_strict_hierarchy(self, strict: bool) -> Self {
        self.state.borrow_mut().strict = strict;
        self
    }

    /// A view on the driver state that stays usable after the driver is
    /// moved into a toolkit.
    pub fn probe(&self) -> HeadlessProbe {
        HeadlessProbe {
            state: Rc::clone(&self.state),
        }
    }
}

impl Driver for HeadlessDriver {
    fn name(&self) -> &str {
        "HEADLESS"
    }

    fn map(&mut self, request: &MapRequest) -> Result<NativeHandle, DriverError> {
        let mut state = self.state.borrow_mut();
        if state.fail_classes.contains(&request.class) {
            return Err(DriverError::Refused {
                class: request.class.clone(),
            });
        }
        let native = state.pool.create(request)?;
        if let Some(title) = &request.title {
            state.pool.set_attribute(native, "TITLE", Some(title));
        }
        Ok(native)
    }

    fn unmap(&mut self, native: NativeHandle) {
        let mut state = self.state.borrow_mut();
        state.pool.remove(native);
        if state.focus == Some(native) {
            state.focus = None;
        }
    }

    fn set_native_attribute(&mut self, native: NativeHandle, name: &str, value: Option<&str>) -> bool {
        self.state.borrow_mut().pool.set_attribute(native, name, value)
    }

    fn get_native_attribute(&self, native: NativeHandle, name: &str) -> Option<String> {
        self.state.borrow().pool.get_attribute(native, name)
    }

    fn natural_size(&self, _class: &str, title: Option<&str>) -> (i32, i32) {
        match title {
            Some(title) if !title.is_empty() => (title.chars().count() as i32 * 8, 16),
            _ => (0, 0),
        }
    }

    fn screen_size(&self) -> (i32, i32) {
        self.state.borrow().screen_size
    }

    fn cursor_pos(&self) -> (i32, i32) {
        self.state.borrow().cursor
    }

    fn strict_native_hierarchy(&self) -> bool {
        self.state.borrow().strict
    }

    fn reparent(&mut self, native: NativeHandle, new_parent: Option<NativeHandle>) -> Result<(), DriverError> {
        self.state.borrow_mut().pool.reparent(native, new_parent)
    }

    fn set_focus(&mut self, native: NativeHandle) {
        self.state.borrow_mut().focus = Some(native);
    }

    fn timer_start(&mut self, interval_ms: u32) -> Option<i32> {
        let mut state = self.state.borrow_mut();
        state.next_timer += 1;
        let id = state.next_timer;
        state.timers.insert(id, interval_ms);
        Some(id)
    }

    fn timer_stop(&mut self, timer_id: i32) {
        self.state.borrow_mut().timers.remove(&timer_id);
    }

    fn menu_popup(&mut self, native: NativeHandle, x: i32, y: i32) -> Result<(), DriverError> {
        let mut state = self.state.borrow_mut();
        if state.pool.get(native).is_none() {
            return Err(DriverError::UnknownNative(native));
        }
        state.popups.push((native, x, y));
        Ok(())
    }

    fn exit_loop(&mut self) {
        self.state.borrow_mut().exit_requests += 1;
    }
}

// =============================================================================
// Probe
// =============================================================================

/// Shared view on a `HeadlessDriver`.
#[derive(Debug, Clone)]
pub struct HeadlessProbe {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessProbe {
    /// Make `map` fail for every element of this class.
    pub fn fail_class(&self, class: &str) {
        self.state.borrow_mut().fail_classes.insert(class.to_string());
    }

    pub fn allow_class(&self, class: &str) {
        self.state.borrow_mut().fail_classes.remove(class);
    }

    pub fn native_count(&self) -> usize {
        self.state.borrow().pool.len()
    }

    pub fn is_alive(&self, native: NativeHandle) -> bool {
        self.state.borrow().pool.get(native).is_some()
    }

    pub fn record(&self, native: NativeHandle) -> Option<NativeRecord> {
        self.state.borrow().pool.get(native).cloned()
    }

    pub fn native_attribute(&self, native: NativeHandle, name: &str) -> Option<String> {
        self.state.borrow().pool.get_attribute(native, name)
    }

    /// Running timers with their interval.
    pub fn timers(&self) -> Vec<(i32, u32)> {
        self.state
            .borrow()
            .timers
            .iter()
            .map(|(&id, &ms)| (id, ms))
            .collect()
    }

    pub fn popups(&self) -> Vec<(NativeHandle, i32, i32)> {
        self.state.borrow().popups.clone()
    }

    pub fn focus(&self) -> Option<NativeHandle> {
        self.state.borrow().focus
    }

    pub fn exit_requests(&self) -> usize {
        self.state.borrow().exit_requests
    }

    pub fn set_cursor(&self, x: i32, y: i32) {
        self.state.borrow_mut().cursor = (x, y);
    }

    pub fn set_strict_hierarchy(&self, strict: bool) {
        self.state.borrow_mut().strict = strict;
    }

    /// Id the next `timer_start` hands out; later ones count up from it.
    pub fn set_next_timer_id(&self, id: i32) {
        self.state.borrow_mut().next_timer = id - 1;
    }

    /// Change a native value behind the toolkit's back, as a user edit would.
    pub fn set_native_attribute(&self, native: NativeHandle, name: &str, value: Option<&str>) {
        self.state.borrow_mut().pool.set_attribute(native, name, value);
    }
}
