use core::fmt;
use core::num::NonZeroU32;

/// Handle into a bond graph: a component's slot in the graph arena, or a
/// port number local to one component.
///
/// Slots are never reused, so a handle to a removed component stays dead.
/// The zero niche keeps `Option<Id>` the size of `Id`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(NonZeroU32);

impl Id {
    /// # Panics
    ///
    /// If `index` is `u32::MAX`.
    pub const fn from_index(index: u32) -> Self {
        match NonZeroU32::new(index.wrapping_add(1)) {
            Some(raw) => Self(raw),
            None => panic!("id index out of range"),
        }
    }

    /// Id of arena slot `slot`.
    ///
    /// # Panics
    ///
    /// If `slot` does not fit below `u32::MAX`.
    pub fn from_slot(slot: usize) -> Self {
        match u32::try_from(slot) {
            Ok(index) => Self::from_index(index),
            Err(_) => panic!("arena slot {slot} out of range"),
        }
    }

    pub const fn index(self) -> u32 {
        self.0.get() - 1
    }

    /// Position in an arena or a `Vec`.
    pub const fn slot(self) -> usize {
        self.index() as usize
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.index())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Component slot in a graph arena.
pub type CompId = Id;
/// Port number local to one component (`e_<n>` / `f_<n>`).
pub type PortId = Id;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_and_slot_agree() {
        for i in [0_u32, 1, 2, 42, 10_000] {
            let id = Id::from_index(i);
            assert_eq!(id.index(), i);
            assert_eq!(id.slot(), i as usize);
            assert_eq!(Id::from_slot(i as usize), id);
        }
    }

    #[test]
    fn option_id_is_small() {
        assert_eq!(
            core::mem::size_of::<Id>(),
            core::mem::size_of::<Option<Id>>()
        );
    }

    #[test]
    fn ids_order_by_index() {
        let mut ids = vec![Id::from_index(3), Id::from_index(0), Id::from_index(2)];
        ids.sort();
        let raw: Vec<u32> = ids.into_iter().map(Id::index).collect();
        assert_eq!(raw, vec![0, 2, 3]);
    }

    #[test]
    fn port_display_is_the_local_number() {
        const FIRST: PortId = Id::from_index(0);
        assert_eq!(FIRST.to_string(), "0");
        assert_eq!(format!("{:?}", Id::from_index(5)), "Id(5)");
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn last_index_is_rejected() {
        let _ = Id::from_index(u32::MAX);
    }
}
