use std::time::Duration;

use meshwork_shared::{
    Authority, ComponentData, ComponentUpdate, EntityId, SchemaObject, StatusCode,
    VirtualWorkerId, VIRTUAL_WORKER_TRANSLATION_COMPONENT_ID,
};
use meshwork_test::{ops::*, TestReceiver};

const ELIGIBLE: &str = "UnrealWorker";

fn init_logger() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

fn mapping(entries: &[(VirtualWorkerId, &str)]) -> SchemaObject {
    let mut object = SchemaObject::new();
    for (id, name) in entries {
        let mut entry = SchemaObject::new();
        entry.add_u32(1, *id).add_string(2, name);
        object.add_object(1, entry);
    }
    object
}

fn add_translation_entity(receiver: &mut TestReceiver, entity_id: EntityId, initial: SchemaObject) {
    receiver.process(add_entity(entity_id));
    receiver.process(add_component(
        entity_id,
        ComponentData::new(VIRTUAL_WORKER_TRANSLATION_COMPONENT_ID, initial),
    ));
}

fn gain_translation_authority(receiver: &mut TestReceiver, entity_id: EntityId) {
    receiver.process(authority_change(
        entity_id,
        VIRTUAL_WORKER_TRANSLATION_COMPONENT_ID,
        Authority::Authoritative,
    ));
}

#[test]
fn unassigned_workers_filled_in_arrival_order() {
    init_logger();
    let mut receiver = TestReceiver::default();
    let translation = entity(1);
    receiver.receiver.set_virtual_worker_ids(&[3, 1, 4]);
    add_translation_entity(&mut receiver, translation, SchemaObject::new());
    gain_translation_authority(&mut receiver, translation);

    assert_eq!(receiver.connection.entity_queries.len(), 1);
    let request_id = receiver.connection.entity_queries[0].0;

    receiver.process(entity_query_response(
        request_id,
        StatusCode::Success,
        vec![
            worker_entity(entity(10), "A", ELIGIBLE),
            worker_entity(entity(11), "B", ELIGIBLE),
            worker_entity(entity(12), "C", ELIGIBLE),
        ],
    ));

    let receiver_ref = &receiver.receiver;
    assert_eq!(receiver_ref.get_physical_worker_for_virtual_worker(3), Some("A"));
    assert_eq!(receiver_ref.get_physical_worker_for_virtual_worker(1), Some("B"));
    assert_eq!(receiver_ref.get_physical_worker_for_virtual_worker(4), Some("C"));
    assert!(receiver_ref.translator().unassigned_virtual_workers().is_empty());

    // the full mapping is broadcast on the translation entity
    assert_eq!(receiver.connection.component_updates.len(), 1);
    let (updated_entity, update) = &receiver.connection.component_updates[0];
    assert_eq!(*updated_entity, translation);
    assert_eq!(update.component_id, VIRTUAL_WORKER_TRANSLATION_COMPONENT_ID);
    assert_eq!(update.fields.count(1), 3);
}

#[test]
fn ineligible_and_already_assigned_workers_are_skipped() {
    init_logger();
    let mut receiver = TestReceiver::default();
    let translation = entity(2);
    receiver.receiver.set_virtual_worker_ids(&[1, 2, 3]);
    add_translation_entity(&mut receiver, translation, mapping(&[(1, "A")]));
    gain_translation_authority(&mut receiver, translation);

    let request_id = receiver.connection.entity_queries[0].0;
    receiver.process(entity_query_response(
        request_id,
        StatusCode::Success,
        vec![
            worker_entity(entity(10), "A", ELIGIBLE),
            worker_entity(entity(11), "Client", "UnrealClient"),
            worker_entity(entity(12), "B", ELIGIBLE),
        ],
    ));

    let translator = receiver.receiver.translator();
    assert_eq!(translator.get_physical_worker_for_virtual_worker(1), Some("A"));
    assert_eq!(translator.get_physical_worker_for_virtual_worker(2), Some("B"));
    assert_eq!(translator.get_physical_worker_for_virtual_worker(3), None);
    assert_eq!(translator.unassigned_virtual_workers(), vec![3]);
}

#[test]
fn failed_discovery_is_retried_after_delay() {
    init_logger();
    let mut receiver = TestReceiver::default();
    let translation = entity(3);
    receiver.receiver.set_virtual_worker_ids(&[7]);
    add_translation_entity(&mut receiver, translation, SchemaObject::new());
    gain_translation_authority(&mut receiver, translation);

    let first = receiver.connection.entity_queries[0].0;
    receiver.process(entity_query_response(
        first,
        StatusCode::Timeout,
        Vec::new(),
    ));

    receiver.advance(Duration::from_millis(500));
    assert_eq!(receiver.connection.entity_queries.len(), 1);

    receiver.advance(Duration::from_millis(600));
    assert_eq!(receiver.connection.entity_queries.len(), 2);

    // a late answer to the first query changes nothing
    receiver.process(entity_query_response(
        first,
        StatusCode::Success,
        vec![worker_entity(entity(10), "A", ELIGIBLE)],
    ));
    assert_eq!(
        receiver.receiver.get_physical_worker_for_virtual_worker(7),
        None
    );

    let second = receiver.connection.entity_queries[1].0;
    receiver.process(entity_query_response(
        second,
        StatusCode::Success,
        vec![worker_entity(entity(10), "A", ELIGIBLE)],
    ));
    assert_eq!(
        receiver.receiver.get_physical_worker_for_virtual_worker(7),
        Some("A")
    );
}

#[test]
fn no_discovery_when_every_worker_is_assigned() {
    init_logger();
    let mut receiver = TestReceiver::default();
    let translation = entity(4);
    receiver.receiver.set_virtual_worker_ids(&[1]);
    add_translation_entity(&mut receiver, translation, mapping(&[(1, "A")]));
    gain_translation_authority(&mut receiver, translation);

    assert!(receiver.connection.entity_queries.is_empty());
    receiver.advance(Duration::from_secs(5));
    assert!(receiver.connection.entity_queries.is_empty());
}

#[test]
fn non_authoritative_worker_follows_broadcast_mapping() {
    init_logger();
    let mut receiver = TestReceiver::default();
    let translation = entity(5);
    receiver.receiver.set_virtual_worker_ids(&[1, 2]);
    add_translation_entity(&mut receiver, translation, mapping(&[(1, "A")]));

    assert_eq!(
        receiver.receiver.get_physical_worker_for_virtual_worker(1),
        Some("A")
    );
    assert_eq!(receiver.receiver.translator().unassigned_virtual_workers(), vec![2]);

    receiver.process(component_update(
        translation,
        ComponentUpdate::with_fields(
            VIRTUAL_WORKER_TRANSLATION_COMPONENT_ID,
            mapping(&[(1, "C"), (2, "B")]),
        ),
    ));

    assert_eq!(
        receiver.receiver.get_physical_worker_for_virtual_worker(1),
        Some("C")
    );
    assert_eq!(
        receiver.receiver.get_physical_worker_for_virtual_worker(2),
        Some("B")
    );
    assert!(receiver
        .receiver
        .translator()
        .unassigned_virtual_workers()
        .is_empty());
    assert!(receiver.connection.entity_queries.is_empty());
    assert!(receiver.connection.component_updates.is_empty());
}

#[test]
fn losing_authority_discards_discovery_in_flight() {
    init_logger();
    let mut receiver = TestReceiver::default();
    let translation = entity(6);
    receiver.receiver.set_virtual_worker_ids(&[1]);
    add_translation_entity(&mut receiver, translation, SchemaObject::new());
    gain_translation_authority(&mut receiver, translation);
    let request_id = receiver.connection.entity_queries[0].0;

    receiver.process(authority_change(
        translation,
        VIRTUAL_WORKER_TRANSLATION_COMPONENT_ID,
        Authority::NotAuthoritative,
    ));
    assert!(!receiver.receiver.translator().is_authoritative());

    receiver.process(entity_query_response(
        request_id,
        StatusCode::Success,
        vec![worker_entity(entity(10), "A", ELIGIBLE)],
    ));
    assert_eq!(
        receiver.receiver.get_physical_worker_for_virtual_worker(1),
        None
    );
    assert!(receiver.connection.component_updates.is_empty());
}

#[test]
fn ids_declared_after_gaining_authority_are_discovered() {
    init_logger();
    let mut receiver = TestReceiver::default();
    let translation = entity(7);
    add_translation_entity(&mut receiver, translation, SchemaObject::new());
    gain_translation_authority(&mut receiver, translation);
    assert!(receiver.connection.entity_queries.is_empty());

    receiver.receiver.set_virtual_worker_ids(&[3, 1, 4]);
    receiver.advance(Duration::from_millis(16));
    assert_eq!(receiver.connection.entity_queries.len(), 1);

    // only one query in flight at a time
    receiver.advance(Duration::from_secs(5));
    assert_eq!(receiver.connection.entity_queries.len(), 1);

    let request_id = receiver.connection.entity_queries[0].0;
    receiver.process(entity_query_response(
        request_id,
        StatusCode::Success,
        vec![
            worker_entity(entity(10), "A", ELIGIBLE),
            worker_entity(entity(11), "B", ELIGIBLE),
            worker_entity(entity(12), "C", ELIGIBLE),
        ],
    ));

    assert_eq!(
        receiver.receiver.get_physical_worker_for_virtual_worker(3),
        Some("A")
    );
    assert_eq!(
        receiver.receiver.get_physical_worker_for_virtual_worker(4),
        Some("C")
    );
    assert!(receiver
        .receiver
        .translator()
        .unassigned_virtual_workers()
        .is_empty());
}

#[test]
fn empty_broadcast_returns_every_id_to_unassigned() {
    init_logger();
    let mut receiver = TestReceiver::default();
    let translation = entity(8);
    receiver.receiver.set_virtual_worker_ids(&[1, 2]);
    add_translation_entity(&mut receiver, translation, mapping(&[(1, "A"), (2, "B")]));
    assert!(receiver
        .receiver
        .translator()
        .unassigned_virtual_workers()
        .is_empty());

    receiver.process(component_update(
        translation,
        ComponentUpdate::with_fields(VIRTUAL_WORKER_TRANSLATION_COMPONENT_ID, mapping(&[])),
    ));

    assert_eq!(
        receiver.receiver.get_physical_worker_for_virtual_worker(1),
        None
    );
    assert_eq!(
        receiver.receiver.translator().unassigned_virtual_workers(),
        vec![1, 2]
    );
}
