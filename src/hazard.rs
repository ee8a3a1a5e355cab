//! Hazard-tracking groups (spec §4.E): a persistent resource whose shared
//! property is an ordered set of member resources. Groups exist to avoid
//! O(N) per-resource usage bookkeeping for bindless arrays of thousands of
//! textures (spec §9): every member forwards its usage log to the group's
//! own `usages` slot instead of keeping one itself.
//!
//! Wait-index reads/writes are deliberately *not* forwarded (spec §4.E,
//! §9): grouping affects only usage recording.

use crate::descriptor::HazardTrackingGroupDescriptor;
use crate::handle::{self, Handle};
use crate::persistent::{PersistentExtra, PersistentRegistry};
#[cfg(test)]
use crate::handle::HandleFlags;
use std::sync::Mutex;

/// Membership list for one hazard-tracking group. Mutated only under
/// `members`'s own lock (spec §4.E: "Membership is mutated under the
/// registry's own lock; iteration must take that lock.") - a dedicated
/// lock per group rather than the registry-wide free-list spinlock, so
/// membership churn on one group never contends with allocation of another.
#[derive(Default)]
pub struct GroupMembership {
    members: Mutex<Vec<Handle>>,
}

pub type HazardTrackingGroupRegistry = PersistentRegistry<HazardTrackingGroupDescriptor, GroupMembership>;

/// Assigns `group` to `member`. A no-op if `member` already belongs to
/// `group` (spec §8 idempotence list); a programmer-error panic (via
/// `SharedSlots::set_hazard_tracking_group`) if it already belongs to a
/// *different* group: removal is forbidden (spec §4.E), so reassignment
/// can never be legitimate.
pub fn assign<D, X: PersistentExtra>(
    groups: &HazardTrackingGroupRegistry,
    group: Handle,
    members: &PersistentRegistry<D, X>,
    member: Handle,
) {
    assert!(groups.is_valid(group), "hazard-tracking group handle is invalid");
    assert!(members.is_valid(member), "member resource handle is invalid");

    let group_index = handle::index(group) as usize;
    {
        let mut list = groups.extra(group_index).members.lock().unwrap();
        if list.contains(&member) {
            return;
        }
        list.push(member);
    }
    members.shared().set_hazard_tracking_group(handle::index(member) as usize, group);
}

/// Iterates a group's members under its membership lock (spec §4.E).
pub fn members(groups: &HazardTrackingGroupRegistry, group: Handle) -> Vec<Handle> {
    assert!(groups.is_valid(group), "hazard-tracking group handle is invalid");
    let group_index = handle::index(group) as usize;
    groups.extra(group_index).members.lock().unwrap().clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{HazardTrackingGroupDescriptor, HazardTrackingMemberKind};
    use crate::handle::ResourceKind;
    use crate::property::Usage;
    use crate::wait_index::Access;

    /// Scenario S4: hazard-group sharing.
    #[test]
    fn usages_forward_through_the_group() {
        let textures: PersistentRegistry<u32, ()> = PersistentRegistry::new(ResourceKind::Texture, 4);
        let groups: HazardTrackingGroupRegistry = PersistentRegistry::new(ResourceKind::HazardTrackingGroup, 4);

        let (a, a_idx) = textures.allocate_handle(HandleFlags::empty());
        textures.initialize(a_idx, None, 1, Handle::NONE, ());
        let (b, b_idx) = textures.allocate_handle(HandleFlags::empty());
        textures.initialize(b_idx, None, 2, Handle::NONE, ());

        let (g, g_idx) = groups.allocate_handle(HandleFlags::empty());
        groups.initialize(
            g_idx,
            None,
            HazardTrackingGroupDescriptor { member_kind: HazardTrackingMemberKind::Texture },
            Handle::NONE,
            GroupMembership::default(),
        );

        assign(&groups, g, &textures, a);
        assign(&groups, g, &textures, b);
        assert_eq!(members(&groups, g), vec![a, b]);

        // A usage recorded through A's forwarding target (the group's own
        // slot) must be visible via B's forwarding target too, since both
        // point at the same group slot.
        groups.shared().record_usage(g_idx, Usage { render_graph: 0, access: Access::Read });
        assert_eq!(textures.shared().hazard_tracking_group(a_idx), g);
        assert_eq!(textures.shared().hazard_tracking_group(b_idx), g);
        assert_eq!(groups.shared().usages(g_idx).len(), 1);
    }

    #[test]
    fn assigning_same_group_twice_is_a_noop() {
        let textures: PersistentRegistry<u32, ()> = PersistentRegistry::new(ResourceKind::Texture, 4);
        let groups: HazardTrackingGroupRegistry = PersistentRegistry::new(ResourceKind::HazardTrackingGroup, 4);
        let (a, a_idx) = textures.allocate_handle(HandleFlags::empty());
        textures.initialize(a_idx, None, 1, Handle::NONE, ());
        let (g, g_idx) = groups.allocate_handle(HandleFlags::empty());
        groups.initialize(
            g_idx,
            None,
            HazardTrackingGroupDescriptor { member_kind: HazardTrackingMemberKind::Texture },
            Handle::NONE,
            GroupMembership::default(),
        );

        assign(&groups, g, &textures, a);
        assign(&groups, g, &textures, a);
        assert_eq!(members(&groups, g), vec![a]);
    }

    #[test]
    #[should_panic(expected = "different hazard-tracking group")]
    fn reassigning_to_a_different_group_panics() {
        let textures: PersistentRegistry<u32, ()> = PersistentRegistry::new(ResourceKind::Texture, 4);
        let groups: HazardTrackingGroupRegistry = PersistentRegistry::new(ResourceKind::HazardTrackingGroup, 4);
        let (a, a_idx) = textures.allocate_handle(HandleFlags::empty());
        textures.initialize(a_idx, None, 1, Handle::NONE, ());

        let desc = || HazardTrackingGroupDescriptor { member_kind: HazardTrackingMemberKind::Texture };
        let (g1, g1_idx) = groups.allocate_handle(HandleFlags::empty());
        groups.initialize(g1_idx, None, desc(), Handle::NONE, GroupMembership::default());
        let (g2, g2_idx) = groups.allocate_handle(HandleFlags::empty());
        groups.initialize(g2_idx, None, desc(), Handle::NONE, GroupMembership::default());

        assign(&groups, g1, &textures, a);
        assign(&groups, g2, &textures, a);
    }
}
