use std::collections::VecDeque;

use metaprop_core::{field_value::FieldValue, ids::*};

use crate::traits::FieldSource;

/// One reversible mutation made inside a transaction group.
#[derive(Debug, Clone)]
pub enum Change {
    FieldWritten {
        item_id: ItemId,
        source: FieldSource,
        /// None when a bound field had never been given a value.
        previous: Option<FieldValue>,
    },
    BindingAdded {
        definition_id: DefinitionId,
        category: Category,
    },
}

/// A committed transaction group; every phase it contained undoes together.
#[derive(Debug)]
pub struct UndoEntry {
    pub name: String,
    pub changes: Vec<Change>,
}

pub struct UndoManager {
    undo_stack: VecDeque<UndoEntry>,
    max_depth: usize,
}

impl UndoManager {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            max_depth,
        }
    }

    pub fn push_undo(&mut self, name: String, changes: Vec<Change>) {
        self.undo_stack.push_back(UndoEntry { name, changes });
        // Enforce depth limit by dropping oldest entry
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
        }
    }

    pub fn pop_undo(&mut self) -> Option<UndoEntry> {
        self.undo_stack.pop_back()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Names of the undoable steps, oldest first.
    pub fn step_names(&self) -> Vec<&str> {
        self.undo_stack.iter().map(|e| e.name.as_str()).collect()
    }
}
