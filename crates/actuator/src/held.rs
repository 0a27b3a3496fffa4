//! De-duplication table for held keys and mouse buttons.
//!
//! Keys are claimed per `(owner, key)`. The physical key goes down when its
//! first owner claims it and comes back up when its last owner releases it,
//! so two rules bound to the same key never release each other's press.

use std::collections::{BTreeMap, BTreeSet};

use crate::command::MouseButton;
use crate::key::KeyCode;

/// Result of claiming a key for an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// No owner held the key; the physical key should go down.
    Pressed,
    /// Another owner already holds the key.
    Shared,
    /// This owner already holds the key.
    AlreadyHeld,
}

/// Result of releasing a key for an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// This was the last owner; the physical key should go up.
    Released,
    /// Other owners still hold the key.
    StillHeld,
    /// This owner did not hold the key.
    NotHeld,
}

#[derive(Debug, Default, Clone)]
pub struct HeldKeys {
    owners: BTreeMap<KeyCode, BTreeSet<String>>,
    buttons: BTreeSet<MouseButton>,
}

impl HeldKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, key: KeyCode, owner: &str) -> Claim {
        let owners = self.owners.entry(key).or_default();
        if owners.contains(owner) {
            return Claim::AlreadyHeld;
        }
        let first = owners.is_empty();
        owners.insert(owner.to_string());
        if first {
            Claim::Pressed
        } else {
            Claim::Shared
        }
    }

    pub fn release(&mut self, key: KeyCode, owner: &str) -> Release {
        let Some(owners) = self.owners.get_mut(&key) else {
            return Release::NotHeld;
        };
        if !owners.remove(owner) {
            return Release::NotHeld;
        }
        if owners.is_empty() {
            self.owners.remove(&key);
            Release::Released
        } else {
            Release::StillHeld
        }
    }

    pub fn is_held(&self, key: KeyCode) -> bool {
        self.owners.contains_key(&key)
    }

    pub fn is_held_by(&self, key: KeyCode, owner: &str) -> bool {
        self.owners
            .get(&key)
            .is_some_and(|owners| owners.contains(owner))
    }

    /// Physical keys currently down, in key order.
    pub fn held_keys(&self) -> Vec<KeyCode> {
        self.owners.keys().copied().collect()
    }

    /// Returns `true` when the button was not already down.
    pub fn press_button(&mut self, button: MouseButton) -> bool {
        self.buttons.insert(button)
    }

    /// Returns `true` when the button was down.
    pub fn release_button(&mut self, button: MouseButton) -> bool {
        self.buttons.remove(&button)
    }

    pub fn is_button_down(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button)
    }

    /// Forget every claim, returning the physical keys and buttons that
    /// were down.
    pub fn drain(&mut self) -> (Vec<KeyCode>, Vec<MouseButton>) {
        let keys = std::mem::take(&mut self.owners).into_keys().collect();
        let buttons = std::mem::take(&mut self.buttons).into_iter().collect();
        (keys, buttons)
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty() && self.buttons.is_empty()
    }
}
