//! Maps effect nodes to their owning effect instance (spec §4.2), so that
//! `Signal`/`Computed` code can schedule a dependent effect by `NodeId`
//! alone, without holding a typed reference back to it (which would create
//! the exact `Rc` reference cycle the registry exists to avoid).

use std::cell::RefCell;
use std::rc::Rc;

use slotmap::SecondaryMap;

use crate::node::NodeId;

/// A unit of scheduled work. Effects are the only job kind the scheduler
/// knows about (spec §4.3: "Effects are the primary job kind").
pub(crate) trait Job {
    fn id(&self) -> NodeId;
    fn is_disposed(&self) -> bool;
    fn run(&self);
}

#[derive(Default)]
pub(crate) struct Registry {
    effects: RefCell<SecondaryMap<NodeId, Rc<dyn Job>>>,
}

impl Registry {
    pub fn set(&self, id: NodeId, job: Rc<dyn Job>) {
        self.effects.borrow_mut().insert(id, job);
    }

    pub fn get(&self, id: NodeId) -> Option<Rc<dyn Job>> {
        self.effects.borrow().get(id).cloned()
    }

    pub fn delete(&self, id: NodeId) {
        self.effects.borrow_mut().remove(id);
    }
}
