//! Collision group bitmasks

use rapier3d::prelude as rapier;
use serde::{Deserialize, Serialize};

/// Collision groups for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionGroups {
    /// Which groups this object belongs to (membership)
    pub memberships: u32,
    /// Which groups this object can collide with (filter)
    pub filter: u32,
}

impl CollisionGroups {
    /// Create collision groups that collide with everything
    pub const ALL: Self = Self {
        memberships: u32::MAX,
        filter: u32::MAX,
    };

    /// Create collision groups that collide with nothing
    pub const NONE: Self = Self {
        memberships: 0,
        filter: 0,
    };

    /// Create new collision groups
    pub const fn new(memberships: u32, filter: u32) -> Self {
        Self { memberships, filter }
    }

    /// Query groups that only see colliders belonging to `mask`
    pub const fn query(mask: u32) -> Self {
        Self {
            memberships: u32::MAX,
            filter: mask,
        }
    }

    /// Check if two groups can collide
    pub fn can_collide(&self, other: &CollisionGroups) -> bool {
        (self.memberships & other.filter) != 0 && (other.memberships & self.filter) != 0
    }

    pub(crate) fn to_rapier(self) -> rapier::InteractionGroups {
        rapier::InteractionGroups::new(
            rapier::Group::from_bits_truncate(self.memberships),
            rapier::Group::from_bits_truncate(self.filter),
        )
    }
}

impl Default for CollisionGroups {
    fn default() -> Self {
        Self::ALL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collision_groups() {
        let player = CollisionGroups::new(0b0010, 0b1101);
        let prop = CollisionGroups::new(0b1000, 0b1111);
        let other_player = CollisionGroups::new(0b0010, 0b1101);

        assert!(player.can_collide(&prop));
        assert!(!player.can_collide(&other_player));
        assert!(!CollisionGroups::NONE.can_collide(&CollisionGroups::ALL));
    }

    #[test]
    fn test_query_groups_select_by_membership() {
        let query = CollisionGroups::query(0b0010);
        let player = CollisionGroups::new(0b0010, 0b1101);
        let prop = CollisionGroups::new(0b1000, 0b1111);

        assert!(query.can_collide(&player));
        assert!(!query.can_collide(&prop));
    }
}
