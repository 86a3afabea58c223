//! Tab stacks. A group is an ordered sequence of windows sharing one layout slot;
//! only the member at `current` is shown. The head is always the first member.

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use tracing::{debug, warn};

use crate::model::{WindowId, WindowRegistry};

new_key_type! {
    pub struct GroupId;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    members: Vec<WindowId>,
    current: usize,
    pub locked: bool,
}

impl Group {
    pub fn members(&self) -> &[WindowId] { &self.members }

    pub fn len(&self) -> usize { self.members.len() }

    pub fn is_empty(&self) -> bool { self.members.is_empty() }

    pub fn head(&self) -> Option<WindowId> { self.members.first().copied() }

    pub fn current(&self) -> Option<WindowId> { self.members.get(self.current).copied() }

    pub fn position(&self, window: WindowId) -> Option<usize> {
        self.members.iter().position(|&w| w == window)
    }
}

impl WindowRegistry {
    pub fn group(&self, id: GroupId) -> Option<&Group> { self.groups.get(id) }

    pub fn group_of(&self, window: WindowId) -> Option<GroupId> {
        self.get(window).and_then(|w| w.group)
    }

    pub fn group_members(&self, window: WindowId) -> Vec<WindowId> {
        self.group_of(window)
            .and_then(|g| self.groups.get(g))
            .map(|g| g.members.clone())
            .unwrap_or_default()
    }

    pub fn is_grouped(&self, window: WindowId) -> bool { self.group_of(window).is_some() }

    pub fn is_group_head(&self, window: WindowId) -> bool {
        self.group_of(window)
            .and_then(|g| self.groups.get(g))
            .is_some_and(|g| g.head() == Some(window))
    }

    pub fn group_current(&self, window: WindowId) -> Option<WindowId> {
        self.group_of(window).and_then(|g| self.groups.get(g)).and_then(Group::current)
    }

    /// The member after `window`, wrapping around. A solitary member is its own successor.
    pub fn next_in_group(&self, window: WindowId) -> Option<WindowId> {
        let group = self.groups.get(self.group_of(window)?)?;
        if group.members.len() == 1 {
            return group.head();
        }
        let idx = group.position(window)?;
        Some(group.members[(idx + 1) % group.members.len()])
    }

    /// Turns `window` into a single-member group.
    pub fn create_group(&mut self, window: WindowId) -> Option<GroupId> {
        let w = self.get(window)?;
        if let Some(existing) = w.group {
            return Some(existing);
        }
        let id = self.groups.insert(Group {
            members: vec![window],
            current: 0,
            locked: false,
        });
        if let Some(w) = self.get_mut(window) {
            w.group = Some(id);
            w.hidden = false;
        }
        debug!(?window, group = ?id, "created group");
        Some(id)
    }

    /// Lock, deny and global-lock rules for adding `window` to `target`.
    pub fn can_be_grouped_into(&self, window: WindowId, target: GroupId) -> bool {
        if self.groups_locked {
            return false;
        }
        let (Some(w), Some(group)) = (self.get(window), self.groups.get(target)) else {
            return false;
        };
        if group.locked || w.group_deny {
            return false;
        }
        match w.group {
            Some(own) if own == target => false,
            Some(own) => self.groups.get(own).is_some_and(|g| !g.locked),
            None => true,
        }
    }

    /// Adds `window` to `target` and makes it the visible member. Returns the member
    /// that was visible before.
    pub fn insert_into_group(
        &mut self,
        target: GroupId,
        window: WindowId,
        after_current: bool,
    ) -> Option<WindowId> {
        if self.group_of(window).is_some() {
            self.remove_from_group(window);
        }
        let group = self.groups.get_mut(target)?;
        let previous = group.current();
        let at = if after_current { group.current + 1 } else { group.members.len() };
        group.members.insert(at, window);
        group.current = at;
        if let Some(w) = self.get_mut(window) {
            w.group = Some(target);
        }
        if let Some(prev) = previous {
            self.transplant_geometry(prev, window);
            if let Some(p) = self.get_mut(prev) {
                p.hidden = true;
            }
        }
        if let Some(w) = self.get_mut(window) {
            w.hidden = false;
        }
        previous
    }

    /// Detaches `window`. The group keeps its lock and its head becomes the new first
    /// member. Returns the member now visible when `window` was the visible one.
    pub fn remove_from_group(&mut self, window: WindowId) -> Option<WindowId> {
        let gid = self.group_of(window)?;
        if let Some(w) = self.get_mut(window) {
            w.group = None;
            w.hidden = false;
        }
        let Some(group) = self.groups.get_mut(gid) else {
            warn!(?window, ?gid, "window referenced a missing group");
            return None;
        };
        let idx = group.position(window)?;
        let was_current = idx == group.current;
        group.members.remove(idx);
        if group.members.is_empty() {
            self.groups.remove(gid);
            return None;
        }
        if idx < group.current || group.current >= group.members.len() {
            group.current = group.current.saturating_sub(1);
        }
        if !was_current {
            return None;
        }
        let next = group.current()?;
        self.transplant_geometry(window, next);
        if let Some(w) = self.get_mut(next) {
            w.hidden = false;
        }
        Some(next)
    }

    /// Shows `target` in place of the group's visible member and returns that member.
    pub fn set_group_current(&mut self, target: WindowId) -> Option<WindowId> {
        let gid = self.group_of(target)?;
        let group = self.groups.get_mut(gid)?;
        let idx = group.position(target)?;
        let old = group.current()?;
        if old == target {
            return None;
        }
        group.current = idx;
        self.transplant_geometry(old, target);
        if let Some(w) = self.get_mut(old) {
            w.hidden = true;
        }
        if let Some(w) = self.get_mut(target) {
            w.hidden = false;
        }
        Some(old)
    }

    /// The member `forward`/backward from the visible one, wrapping around.
    pub fn rotated_group_member(&self, window: WindowId, forward: bool) -> Option<WindowId> {
        let group = self.groups.get(self.group_of(window)?)?;
        let n = group.members.len();
        if n < 2 {
            return None;
        }
        let idx = if forward { (group.current + 1) % n } else { (group.current + n - 1) % n };
        group.members.get(idx).copied()
    }

    /// Dissolves the group and returns its members; all of them become visible.
    pub fn destroy_group(&mut self, gid: GroupId) -> Vec<WindowId> {
        let Some(group) = self.groups.remove(gid) else {
            return Vec::new();
        };
        for &m in &group.members {
            if let Some(w) = self.get_mut(m) {
                w.group = None;
                w.hidden = false;
            }
        }
        group.members
    }

    pub fn group_mut(&mut self, gid: GroupId) -> Option<&mut Group> { self.groups.get_mut(gid) }

    fn transplant_geometry(&mut self, from: WindowId, to: WindowId) {
        let Some(src) = self.get(from) else {
            return;
        };
        let (goal, real, floating) = (src.goal, src.real, src.floating);
        if let Some(dst) = self.get_mut(to) {
            dst.goal = goal;
            dst.real = real;
            dst.floating = floating;
            dst.pending_configure = true;
        }
    }
}
