//! Control Registry - Slot allocation for control instances.
//!
//! Manages the lifecycle of control slots:
//! - Generational handles so a destroyed control can never be reached again
//! - Free slot pool for O(1) reuse
//! - Allocation order iteration for bulk operations (close, naming)
//!
//! A `Handle` is a slot index plus the generation the slot had when the
//! control was created. Releasing a slot bumps its generation, so every copy
//! of the old handle turns stale at once.

use std::fmt;

use super::control::Control;

// =============================================================================
// Handle
// =============================================================================

/// Reference to a control instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    pub(crate) const fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

// =============================================================================
// Registry State
// =============================================================================

#[derive(Debug)]
struct Slot {
    generation: u32,
    control: Option<Control>,
}

/// Arena of live controls.
#[derive(Debug, Default)]
pub struct ControlRegistry {
    slots: Vec<Slot>,
    /// Pool of freed slots for reuse.
    free: Vec<u32>,
    live: usize,
}

impl ControlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a control, reusing a freed slot when one exists.
    pub fn allocate(&mut self, control: Control) -> Handle {
        self.live += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.control = Some(control);
            return Handle {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            control: Some(control),
        });
        Handle {
            index,
            generation: 0,
        }
    }

    /// Remove a control and return its slot to the pool.
    pub fn release(&mut self, handle: Handle) -> Option<Control> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        let control = slot.control.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.live -= 1;
        Some(control)
    }

    pub fn get(&self, handle: Handle) -> Option<&Control> {
        self.slots
            .get(handle.index())
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.control.as_ref())
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut Control> {
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.control.as_mut())
    }

    pub fn is_alive(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    /// Handles of all live controls, in slot order.
    pub fn handles(&self) -> Vec<Handle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.control.is_some())
            .map(|(index, slot)| Handle {
                index: index as u32,
                generation: slot.generation,
            })
            .collect()
    }

    /// Count of live controls.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of slots ever allocated.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
