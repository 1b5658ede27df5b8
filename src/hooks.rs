//! Maintenance hooks run by [`TaskDb::gc`](crate::db::TaskDb::gc) and
//! [`TaskDb::synch`](crate::db::TaskDb::synch).
//!
//! Both ship as inert defaults. Callers that want status sweeping or remote
//! reconciliation install their own implementation.

use std::fmt::Debug;

use crate::db::IdSequence;
use crate::error::Result;
use crate::store::TaskFile;

/// Mutable access to every data file, handed to a hook for one run
#[derive(Debug)]
pub struct Stores<'a> {
    pub pending: &'a mut TaskFile,
    pub completed: &'a mut TaskFile,
    pub undo: &'a mut TaskFile,
    pub backlog: &'a mut TaskFile,
    pub synch_key: &'a mut TaskFile,
    pub ids: &'a mut IdSequence,
}

pub trait GcHook: Debug {
    /// Tidy the data files, returning how many tasks were moved or changed
    fn collect(&mut self, stores: Stores<'_>) -> Result<usize>;
}

pub trait SyncHook: Debug {
    /// Reconcile local state with a remote
    fn synch(&mut self, stores: Stores<'_>) -> Result<()>;
}

/// Garbage collection that changes nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct InertGc;

impl GcHook for InertGc {
    fn collect(&mut self, _stores: Stores<'_>) -> Result<usize> {
        Ok(0)
    }
}

/// Synchronization that talks to nobody
#[derive(Debug, Default, Clone, Copy)]
pub struct InertSync;

impl SyncHook for InertSync {
    fn synch(&mut self, _stores: Stores<'_>) -> Result<()> {
        Ok(())
    }
}
