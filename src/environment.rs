//! Environment storage: every scope lives in a slot of an arena owned by the
//! interpreter and is addressed through an [`EnvRef`] handle.
//!
//! A handle is reference counted.  Call frames, blocks, closures and bound
//! methods each hold one; when the last handle to a slot is dropped the slot
//! is released and its id recycled.  Frames point at their parent with a
//! handle as well, so a live inner scope keeps its whole chain alive.
//!
//! Any value displaced from a slot (overwritten binding, released frame) is
//! dropped only after the arena borrow has ended, because dropping it may
//! release further handles.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use log::{debug, error};

use crate::error::{Result, RuntimeError};
use crate::token::Token;
use crate::value::Value;

/// One scope: its bindings and the handle of the enclosing scope.
#[derive(Debug, Default)]
struct Frame {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

#[derive(Debug, Default)]
struct Slab {
    frames: Vec<Option<Frame>>,
    free: Vec<usize>,
}

impl Slab {
    fn insert(&mut self, frame: Frame) -> usize {
        match self.free.pop() {
            Some(id) => {
                self.frames[id] = Some(frame);
                id
            }
            None => {
                self.frames.push(Some(frame));
                self.frames.len() - 1
            }
        }
    }

    fn release(&mut self, id: usize) -> Option<Frame> {
        let frame: Option<Frame> = self.frames.get_mut(id).and_then(Option::take);

        if frame.is_some() {
            self.free.push(id);
        }

        frame
    }

    fn frame(&self, id: usize) -> Option<&Frame> {
        self.frames.get(id).and_then(Option::as_ref)
    }

    fn frame_mut(&mut self, id: usize) -> Option<&mut Frame> {
        self.frames.get_mut(id).and_then(Option::as_mut)
    }
}

struct Handle {
    id: usize,
    arena: Weak<RefCell<Slab>>,
}

impl Drop for Handle {
    fn drop(&mut self) {
        // The arena is already gone when the interpreter itself is dropped.
        let Some(arena) = self.arena.upgrade() else {
            return;
        };

        let released: Option<Frame> = match arena.try_borrow_mut() {
            Ok(mut slab) => slab.release(self.id),
            Err(_) => {
                error!("Environment {} released while the arena was borrowed", self.id);
                None
            }
        };

        drop(released);
    }
}

/// Shared handle to one environment slot.
#[derive(Clone)]
pub struct EnvRef(Rc<Handle>);

impl EnvRef {
    /// Arena slot index, stable while any handle is alive.
    pub fn id(&self) -> usize {
        self.0.id
    }
}

impl PartialEq for EnvRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EnvRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EnvRef({})", self.0.id)
    }
}

/// The arena of environments.
#[derive(Default)]
pub struct Environments {
    slab: Rc<RefCell<Slab>>,
}

impl Environments {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&self, enclosing: Option<EnvRef>) -> EnvRef {
        let id: usize = self.slab.borrow_mut().insert(Frame {
            values: HashMap::new(),
            enclosing,
        });

        debug!("Allocated environment {}", id);

        EnvRef(Rc::new(Handle {
            id,
            arena: Rc::downgrade(&self.slab),
        }))
    }

    /// A scope with no parent (the globals).
    pub fn root(&self) -> EnvRef {
        self.allocate(None)
    }

    /// A fresh scope nested in `enclosing`.
    pub fn child(&self, enclosing: &EnvRef) -> EnvRef {
        self.allocate(Some(enclosing.clone()))
    }

    /// Number of slots currently in use.
    pub fn live(&self) -> usize {
        self.slab
            .borrow()
            .frames
            .iter()
            .filter(|f| f.is_some())
            .count()
    }

    /// Bind `name` in exactly `env`, shadowing nothing further out.
    pub fn define(&self, env: &EnvRef, name: &str, value: Value) {
        let displaced: Option<Value> = match self.slab.borrow_mut().frame_mut(env.id()) {
            Some(frame) => frame.values.insert(name.to_string(), value),
            None => {
                error!("define '{}' on released environment {}", name, env.id());
                Some(value)
            }
        };

        drop(displaced);
    }

    /// The scope `distance` enclosing links above `env`.
    pub fn ancestor(&self, env: &EnvRef, distance: usize) -> Option<EnvRef> {
        let slab = self.slab.borrow();
        let mut current: EnvRef = env.clone();

        for _ in 0..distance {
            let next: EnvRef = slab.frame(current.id())?.enclosing.clone()?;
            current = next;
        }

        Some(current)
    }

    /// Read `name` from the scope exactly `distance` links up.
    pub fn get_at(&self, env: &EnvRef, distance: usize, name: &str) -> Option<Value> {
        let target: EnvRef = self.ancestor(env, distance)?;
        let slab = self.slab.borrow();

        slab.frame(target.id())?.values.get(name).cloned()
    }

    /// Overwrite `name` in the scope exactly `distance` links up.  Returns
    /// `false` when no such binding exists.
    pub fn assign_at(&self, env: &EnvRef, distance: usize, name: &str, value: Value) -> bool {
        let Some(target) = self.ancestor(env, distance) else {
            return false;
        };

        let (found, displaced) = self.replace(&target, name, value);
        drop(displaced);

        found
    }

    /// Dynamic lookup starting at `env` and walking outwards.
    pub fn get(&self, env: &EnvRef, name: &Token) -> Result<Value> {
        let slab = self.slab.borrow();
        let mut current: Option<&Frame> = slab.frame(env.id());

        while let Some(frame) = current {
            if let Some(value) = frame.values.get(&name.lexeme) {
                return Ok(value.clone());
            }

            current = frame.enclosing.as_ref().and_then(|e| slab.frame(e.id()));
        }

        Err(RuntimeError::new(
            name,
            format!("Undefined variable '{}'.", name.lexeme),
        ))
    }

    /// Dynamic assignment starting at `env` and walking outwards.
    pub fn assign(&self, env: &EnvRef, name: &Token, value: Value) -> Result<()> {
        let mut current: Option<EnvRef> = Some(env.clone());
        let mut value: Value = value;

        while let Some(scope) = current {
            let (found, displaced) = self.replace(&scope, &name.lexeme, value);

            if found {
                drop(displaced);
                return Ok(());
            }

            // Not bound here: `displaced` is the value handed back.
            value = displaced.unwrap_or(Value::Nil);
            current = self
                .slab
                .borrow()
                .frame(scope.id())
                .and_then(|f| f.enclosing.clone());
        }

        Err(RuntimeError::new(
            name,
            format!("Undefined variable '{}'.", name.lexeme),
        ))
    }

    /// Swap in `value` if `name` is bound directly in `env`.  Returns whether
    /// it was, plus the old value (or `value` itself when unbound).
    fn replace(&self, env: &EnvRef, name: &str, value: Value) -> (bool, Option<Value>) {
        let mut slab = self.slab.borrow_mut();

        match slab
            .frame_mut(env.id())
            .and_then(|f| f.values.get_mut(name))
        {
            Some(slot) => (true, Some(std::mem::replace(slot, value))),
            None => (false, Some(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    fn ident(name: &str) -> Token {
        Token::synthetic(TokenType::IDENTIFIER, name, 1)
    }

    #[test]
    fn child_scope_sees_and_assigns_through_parent() {
        let envs = Environments::new();
        let globals = envs.root();
        let inner = envs.child(&globals);

        envs.define(&globals, "a", Value::Number(1.0));
        envs.assign(&inner, &ident("a"), Value::Number(2.0)).unwrap();

        assert_eq!(envs.get(&globals, &ident("a")).unwrap(), Value::Number(2.0));
        assert_eq!(envs.get_at(&inner, 1, "a"), Some(Value::Number(2.0)));
        assert_eq!(envs.get_at(&inner, 0, "a"), None);
    }

    #[test]
    fn assign_to_unknown_name_fails() {
        let envs = Environments::new();
        let globals = envs.root();

        let err = envs
            .assign(&globals, &ident("nope"), Value::Nil)
            .unwrap_err();

        assert_eq!(err.message, "Undefined variable 'nope'.");
    }

    #[test]
    fn slots_are_released_with_their_last_handle() {
        let envs = Environments::new();
        let globals = envs.root();

        {
            let block = envs.child(&globals);
            let nested = envs.child(&block);
            assert_eq!(envs.live(), 3);
            drop(block);
            // `nested` still pins its parent.
            assert_eq!(envs.live(), 3);
            drop(nested);
        }

        assert_eq!(envs.live(), 1);

        // Released ids are recycled.
        let again = envs.child(&globals);
        assert!(again.id() < 3);
    }
}
