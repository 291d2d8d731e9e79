/// PROPERTY-BASED TESTS: Virtual worker assignment
///
/// Unassigned virtual workers are filled first-come first-served, in the
/// order eligible physical workers are discovered.
use proptest::prelude::*;

use meshwork_shared::{
    Authority, ComponentData, SchemaObject, StatusCode, VirtualWorkerId,
    VIRTUAL_WORKER_TRANSLATION_COMPONENT_ID,
};
use meshwork_test::{ops::*, TestReceiver};

fn arrival_order_strategy() -> impl Strategy<Value = Vec<VirtualWorkerId>> {
    let pool: Vec<VirtualWorkerId> = (0..32).collect();
    proptest::sample::subsequence(pool, 1..8).prop_shuffle()
}

proptest! {
    #[test]
    fn prop_assignment_is_first_come_first_served(
        ids in arrival_order_strategy(),
        worker_count in 0usize..10,
    ) {
        let mut receiver = TestReceiver::default();
        let translation = entity(1);
        let workers: Vec<String> = (0..worker_count).map(|index| format!("worker-{}", index)).collect();

        receiver.receiver.set_virtual_worker_ids(&ids);
        receiver.process(add_entity(translation));
        receiver.process(add_component(
            translation,
            ComponentData::new(VIRTUAL_WORKER_TRANSLATION_COMPONENT_ID, SchemaObject::new()),
        ));
        receiver.process(authority_change(
            translation,
            VIRTUAL_WORKER_TRANSLATION_COMPONENT_ID,
            Authority::Authoritative,
        ));

        let request_id = receiver.connection.entity_queries[0].0;
        let results = workers
            .iter()
            .enumerate()
            .map(|(index, name)| worker_entity(entity(100 + index as i64), name, "UnrealWorker"))
            .collect();
        receiver.process(entity_query_response(request_id, StatusCode::Success, results));

        let assigned = ids.len().min(workers.len());
        for (position, id) in ids.iter().enumerate() {
            let expected = workers.get(position).map(String::as_str);
            prop_assert_eq!(receiver.receiver.get_physical_worker_for_virtual_worker(*id), expected);
        }
        prop_assert_eq!(
            receiver.receiver.translator().unassigned_virtual_workers(),
            ids[assigned..].to_vec()
        );
    }
}

