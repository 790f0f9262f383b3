//! Scratch storage for intermediate geometries.
//!
//! A [`Workspace`] outlives a whole run. Each traverse line gets a
//! [`LineScope`]; everything stored through the scope is removed when
//! the scope is dropped, whether the line finished or bailed out.

use crate::{engine::PointEvent, engine::UnionPiece, Path};
use geo::geometry::{LineString, MultiPolygon};
use log::debug;
use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
};

/// An intermediate dataset.
#[derive(Debug, Clone)]
pub enum Scratch {
    Route(Path),
    Events(Vec<PointEvent>),
    Lines(Vec<LineString<f64>>),
    Area(MultiPolygon<f64>),
    Pieces(Vec<UnionPiece>),
}

#[derive(Debug, Default)]
pub struct Workspace {
    datasets: RefCell<BTreeMap<String, Scratch>>,
    scopes: Cell<usize>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the scratch scope for one traverse line.
    pub fn scope(&self, section: &str) -> LineScope<'_> {
        let serial = self.scopes.get() + 1;
        self.scopes.set(serial);
        LineScope {
            workspace: self,
            prefix: format!("{section}/"),
            section: section.to_owned(),
            route_id: format!("{section}_{serial:02}"),
        }
    }

    /// Number of datasets currently held.
    pub fn len(&self) -> usize {
        self.datasets.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.borrow().is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.datasets.borrow().contains_key(key)
    }

    /// Fully qualified keys of all held datasets.
    pub fn keys(&self) -> Vec<String> {
        self.datasets.borrow().keys().cloned().collect()
    }
}

/// Per-line view of a [`Workspace`].
#[derive(Debug)]
pub struct LineScope<'w> {
    workspace: &'w Workspace,
    prefix: String,
    section: String,
    route_id: String,
}

impl<'w> LineScope<'w> {
    pub fn section(&self) -> &str {
        &self.section
    }

    /// Transient identifier of this line's route.
    pub fn route_id(&self) -> &str {
        &self.route_id
    }

    /// Stores `data` under `name`, replacing any previous dataset, and
    /// returns the qualified key.
    pub fn put(&self, name: &str, data: Scratch) -> String {
        let key = format!("{}{name}", self.prefix);
        if self
            .workspace
            .datasets
            .borrow_mut()
            .insert(key.clone(), data)
            .is_some()
        {
            debug!("replaced scratch dataset {key}");
        }
        key
    }

    pub fn with<R>(&self, name: &str, f: impl FnOnce(&Scratch) -> R) -> Option<R> {
        let key = format!("{}{name}", self.prefix);
        self.workspace.datasets.borrow().get(&key).map(f)
    }

    pub fn delete(&self, name: &str) -> bool {
        let key = format!("{}{name}", self.prefix);
        self.workspace.datasets.borrow_mut().remove(&key).is_some()
    }
}

impl<'w> Drop for LineScope<'w> {
    fn drop(&mut self) {
        let mut datasets = self.workspace.datasets.borrow_mut();
        let before = datasets.len();
        datasets.retain(|key, _| !key.starts_with(&self.prefix));
        debug!(
            "{}: released {} scratch datasets",
            self.section,
            before - datasets.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{Scratch, Workspace};
    use geo::geometry::MultiPolygon;

    #[test]
    fn test_scope_cleanup() {
        let workspace = Workspace::new();
        {
            let a = workspace.scope("A");
            let key = a.put("buffer", Scratch::Area(MultiPolygon::new(vec![])));
            assert_eq!(key, "A/buffer");
            assert!(workspace.contains("A/buffer"));
            {
                let b = workspace.scope("B");
                b.put("buffer", Scratch::Lines(vec![]));
                assert_eq!(workspace.len(), 2);
            }
            assert_eq!(workspace.keys(), vec!["A/buffer".to_string()]);
            assert!(a.with("buffer", |data| matches!(data, Scratch::Area(_))).unwrap());
            assert!(a.delete("buffer"));
            assert!(!a.delete("buffer"));
        }
        assert!(workspace.is_empty());
    }

    #[test]
    fn test_route_ids_are_unique() {
        let workspace = Workspace::new();
        let first = workspace.scope("A").route_id().to_owned();
        let second = workspace.scope("A").route_id().to_owned();
        assert_eq!(first, "A_01");
        assert_eq!(second, "A_02");
    }

    #[test]
    fn test_cleanup_on_unwind() {
        let workspace = Workspace::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let scope = workspace.scope("A");
            scope.put("route", Scratch::Lines(vec![]));
            panic!("stage failed");
        }));
        assert!(result.is_err());
        assert!(workspace.is_empty());
    }
}
