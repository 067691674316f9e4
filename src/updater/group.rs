use std::cell::RefCell;
use std::panic::Location;
use std::rc::Rc;

use crate::animation::anim::{AnimBase, AnimId, Animation};
use crate::animation::stack::{ApplyParams, StackApplier};
use crate::foundation::core::ObjectId;
use crate::foundation::error::{KinemaError, KinemaResult};
use crate::item::data::ItemData;
use crate::item::tree::ItemTree;
use crate::session::timeline::Timeline;
use crate::updater::params::UpdaterParams;

/// User function run once per sample on a detached copy of the whole group.
pub type GroupUpdateFn = Rc<dyn Fn(&mut ItemTree, &UpdaterParams<'_>) -> anyhow::Result<()>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SampleKey {
    t_bits: u64,
    get_at_left: bool,
    for_rendering: bool,
    generation: u64,
}

impl SampleKey {
    fn of(p: &ApplyParams<'_>) -> Self {
        Self {
            t_bits: p.global_t.to_bits(),
            get_at_left: p.get_at_left,
            for_rendering: p.for_rendering,
            generation: p.appearances.generation(),
        }
    }
}

struct Working {
    /// Structure and origins; node data is overwritten on every sample.
    template: ItemTree,
    /// Aligner sequence number per node, filled once all aligners are registered.
    seqs: RefCell<Vec<u64>>,
    applied: RefCell<Option<(SampleKey, ItemTree)>>,
    funcs: Rc<[GroupUpdateFn]>,
    location: &'static Location<'static>,
}

impl Working {
    fn sample(&self, index: usize, incoming: &ItemData, p: &ApplyParams<'_>) -> KinemaResult<ItemTree> {
        let seqs = self.seqs.borrow().clone();
        let mut tree = self.template.clone();
        for (j, &seq) in seqs.iter().enumerate() {
            let state = if j == index {
                incoming.clone()
            } else {
                let origin = tree.node(j).and_then(|n| n.origin).ok_or_else(|| {
                    KinemaError::stack_consistency(format!("group node {j} has no origin"))
                })?;
                p.appearances
                    .compute_until(origin, p.global_t, p.for_rendering, p.get_at_left, seq)?
            };
            if let Some(d) = tree.data_mut(j) {
                *d = state;
            }
        }

        let params = UpdaterParams {
            global_t: p.global_t,
            alpha: p.alpha,
            range: p.range,
            extra: None,
        };
        for f in self.funcs.iter() {
            f(&mut tree, &params).map_err(|e| KinemaError::updater(self.location, &e))?;
        }
        if tree.len() != self.template.len() {
            return Err(KinemaError::updater_return_type(
                self.location,
                format!(
                    "group updater changed the node count from {} to {}",
                    self.template.len(),
                    tree.len()
                ),
            ));
        }
        Ok(tree)
    }
}

struct Aligner {
    working: Rc<Working>,
    index: usize,
}

impl StackApplier for Aligner {
    fn apply(&self, data: &mut ItemData, p: &ApplyParams<'_>) -> KinemaResult<()> {
        let key = SampleKey::of(p);
        let hit = self
            .working
            .applied
            .borrow()
            .as_ref()
            .filter(|(k, _)| *k == key)
            .and_then(|(_, tree)| tree.node(self.index))
            .map(|n| n.data.clone());
        if let Some(state) = hit {
            *data = state;
            return Ok(());
        }

        let tree = self.working.sample(self.index, data, p)?;
        if let Some(n) = tree.node(self.index) {
            *data = n.data.clone();
        }
        *self.working.applied.borrow_mut() = Some((key, tree));
        Ok(())
    }
}

/// Runs a function on a detached copy of a whole subtree, so it can relate members to each
/// other, then aligns every live member with the copy's result.
///
/// The copy is rebuilt once per sample from each member's state just before its aligning
/// entry; later members of the same sample reuse it.
pub struct GroupUpdater {
    base: AnimBase,
    item: ObjectId,
    funcs: Vec<GroupUpdateFn>,
    show_at_begin: bool,
    hide_at_end: bool,
    become_at_end: bool,
    location: &'static Location<'static>,
    working: Option<Rc<Working>>,
}

impl GroupUpdater {
    /// Update the subtree rooted at `item` with `f`.
    #[track_caller]
    pub fn new(
        item: ObjectId,
        f: impl Fn(&mut ItemTree, &UpdaterParams<'_>) -> anyhow::Result<()> + 'static,
    ) -> Self {
        Self {
            base: AnimBase::new("GroupUpdater"),
            item,
            funcs: vec![Rc::new(f) as GroupUpdateFn],
            show_at_begin: true,
            hide_at_end: false,
            become_at_end: true,
            location: Location::caller(),
            working: None,
        }
    }

    /// Run `f` on the same copy after the functions added so far.
    pub fn add_post_updater(
        mut self,
        f: impl Fn(&mut ItemTree, &UpdaterParams<'_>) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.funcs.push(Rc::new(f));
        self
    }

    /// Show the group when the range starts (default `true`).
    pub fn show_at_begin(mut self, yes: bool) -> Self {
        self.show_at_begin = yes;
        self
    }

    /// Hide the group when the range ends (default `false`).
    pub fn hide_at_end(mut self, yes: bool) -> Self {
        self.hide_at_end = yes;
        self
    }

    /// Commit the final state of every member (default `true`).
    pub fn become_at_end(mut self, yes: bool) -> Self {
        self.become_at_end = yes;
        self
    }
}

impl Animation for GroupUpdater {
    fn base(&self) -> &AnimBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut AnimBase {
        &mut self.base
    }

    fn begin(&mut self, id: AnimId, tl: &mut Timeline) -> KinemaResult<()> {
        let range = self.base.range()?;
        let template = tl.scene().copy_tree(self.item)?;
        let targets: Vec<ObjectId> = template.nodes().iter().filter_map(|n| n.origin).collect();
        let working = Rc::new(Working {
            template,
            seqs: RefCell::new(Vec::with_capacity(targets.len())),
            applied: RefCell::new(None),
            funcs: self.funcs.clone().into(),
            location: self.location,
        });

        let mut seqs = Vec::with_capacity(targets.len());
        for (index, &target) in targets.iter().enumerate() {
            seqs.push(tl.appearances_mut().push_apply(
                target,
                id,
                range,
                self.base.rate(),
                Rc::clone(&self.base.lifecycle),
                Rc::new(Aligner {
                    working: Rc::clone(&working),
                    index,
                }),
            )?);
        }
        *working.seqs.borrow_mut() = seqs;

        if self.show_at_begin {
            tl.set_visible(&targets, range.at, true);
        }
        if self.become_at_end {
            tl.become_computed(&targets, range.end)?;
        }
        if self.hide_at_end {
            tl.set_visible(&targets, range.end, false);
        }
        self.working = Some(working);
        Ok(())
    }

    fn cleanup(&mut self) {
        if let Some(w) = self.working.take() {
            w.applied.borrow_mut().take();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/updater/group.rs"]
mod tests;
