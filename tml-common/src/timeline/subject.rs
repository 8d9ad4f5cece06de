//! Subject and collection type codes

/// Subject type ids as stored on subjects
pub mod subject_type {
    pub const BOOK: u8 = 1;
    pub const ANIME: u8 = 2;
    pub const MUSIC: u8 = 3;
    pub const GAME: u8 = 4;
    pub const REAL: u8 = 6;
}

/// Collection type ids: wish, done, doing, on hold, dropped
pub mod collection_type {
    pub const WISH: u8 = 1;
    pub const DONE: u8 = 2;
    pub const DOING: u8 = 3;
    pub const ON_HOLD: u8 = 4;
    pub const DROPPED: u8 = 5;
}

/// Timeline subtype of a collection event, indexed by collection type - 1
const BOOK: [u16; 5] = [1, 5, 9, 13, 14];
const ANIME: [u16; 5] = [2, 6, 10, 13, 14];
const MUSIC: [u16; 5] = [3, 7, 11, 13, 14];
const GAME: [u16; 5] = [4, 8, 12, 13, 14];

/// Map a collection type and subject type to the category 3 subtype
///
/// Unknown subject types and out-of-range collection types pass the
/// collection type through unchanged.
pub fn subject_collect_subtype(collection: u8, subject_type: u8) -> u16 {
    let table = match subject_type {
        subject_type::BOOK => &BOOK,
        subject_type::ANIME | subject_type::REAL => &ANIME,
        subject_type::MUSIC => &MUSIC,
        subject_type::GAME => &GAME,
        _ => return collection as u16,
    };
    match collection {
        collection_type::WISH..=collection_type::DROPPED => table[(collection - 1) as usize],
        _ => collection as u16,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtype_per_subject_type() {
        assert_eq!(subject_collect_subtype(collection_type::WISH, subject_type::BOOK), 1);
        assert_eq!(subject_collect_subtype(collection_type::DONE, subject_type::ANIME), 6);
        assert_eq!(subject_collect_subtype(collection_type::DOING, subject_type::MUSIC), 11);
        assert_eq!(subject_collect_subtype(collection_type::DOING, subject_type::REAL), 10);
        assert_eq!(subject_collect_subtype(collection_type::WISH, subject_type::GAME), 4);
    }

    #[test]
    fn test_on_hold_and_dropped_are_shared() {
        for t in [1, 2, 3, 4, 6] {
            assert_eq!(subject_collect_subtype(collection_type::ON_HOLD, t), 13);
            assert_eq!(subject_collect_subtype(collection_type::DROPPED, t), 14);
        }
    }

    #[test]
    fn test_unknown_inputs_pass_through() {
        assert_eq!(subject_collect_subtype(2, 5), 2);
        assert_eq!(subject_collect_subtype(0, subject_type::ANIME), 0);
        assert_eq!(subject_collect_subtype(9, subject_type::BOOK), 9);
    }
}
