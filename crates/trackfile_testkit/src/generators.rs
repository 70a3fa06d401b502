//! Property-based test generators using proptest.

use crate::fixtures::Person;
use proptest::prelude::*;
use trackfile_core::TrackingState;
use uuid::Uuid;

/// Strategy for generating UUIDs.
pub fn uuid_strategy() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

/// Strategy for generating people.
pub fn person_strategy() -> impl Strategy<Value = Person> {
    (
        uuid_strategy(),
        prop::string::string_regex("[A-Za-z][A-Za-z ]{0,23}").expect("Invalid regex"),
        0u32..120,
    )
        .prop_map(|(id, name, age)| Person { id, name, age })
}

/// Strategy for generating people with distinct identifiers.
pub fn people_strategy(max: usize) -> impl Strategy<Value = Vec<Person>> {
    prop::collection::vec(person_strategy(), 0..=max).prop_map(|people| {
        let mut seen = std::collections::HashSet::new();
        people.into_iter().filter(|p| seen.insert(p.id)).collect()
    })
}

/// Strategy for generating tracking states.
pub fn tracking_state_strategy() -> impl Strategy<Value = TrackingState> {
    prop_oneof![
        Just(TrackingState::Detached),
        Just(TrackingState::Unchanged),
        Just(TrackingState::Added),
        Just(TrackingState::Modified),
        Just(TrackingState::Deleted),
    ]
}

/// Strategy for generating (page, page size) pairs, including out-of-range
/// pages.
pub fn page_strategy() -> impl Strategy<Value = (i64, usize)> {
    (-2i64..10, 0usize..8)
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn generated_people_are_unique(people in people_strategy(20)) {
            let mut ids: Vec<_> = people.iter().map(|p| p.id).collect();
            ids.sort();
            ids.dedup();
            prop_assert_eq!(ids.len(), people.len());
        }

        #[test]
        fn generated_names_are_non_empty(person in person_strategy()) {
            prop_assert!(!person.name.is_empty());
            prop_assert!(person.age < 120);
        }
    }
}
