use std::time::Duration;

use meshwork_shared::{ComponentData, ComponentId, EntityId, ObjectRef, SchemaObject};
use meshwork_test::{ops::*, TestReceiver, WorldEvent};

const DATA_COMPONENT: ComponentId = ComponentId::new(1000);
const FIELD: u32 = 1;

fn init_logger() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

fn field_reapplied_count(receiver: &TestReceiver, entity_id: EntityId) -> usize {
    receiver.world.count(|event| {
        *event == WorldEvent::UpdateApplied(entity_id, DATA_COMPONENT, vec![FIELD])
    })
}

/// An update pointing at entity 200 arrives before entity 200 exists; the
/// field is wired up once entity 200 is constructed
#[test]
fn forward_reference_rewired_when_target_arrives() {
    init_logger();
    let mut receiver = TestReceiver::default();
    let holder = entity(20);
    let target = entity(200);

    receiver.process_all(spawn_entity(
        holder,
        vec![ref_component(DATA_COMPONENT, FIELD, ObjectRef::NULL)],
    ));
    receiver.process(ref_update(holder, DATA_COMPONENT, FIELD, ObjectRef::root(target)));

    assert!(receiver
        .world
        .wired_refs(&holder, DATA_COMPONENT, FIELD)
        .is_empty());
    assert_eq!(receiver.receiver.dependents_waiting_on(&target), 1);
    assert_eq!(field_reapplied_count(&receiver, holder), 1);

    receiver.process_all(spawn_entity(target, Vec::new()));

    assert_eq!(
        receiver.world.wired_refs(&holder, DATA_COMPONENT, FIELD),
        vec![ObjectRef::root(target)]
    );
    assert_eq!(field_reapplied_count(&receiver, holder), 2);
    assert_eq!(receiver.receiver.dependents_waiting_on(&target), 0);
    assert_eq!(receiver.receiver.pending_reference_count(), 0);
}

#[test]
fn initial_state_reference_rewired_when_target_arrives() {
    init_logger();
    let mut receiver = TestReceiver::default();
    let holder = entity(21);
    let target = entity(210);

    receiver.process_all(spawn_entity(
        holder,
        vec![ref_component(DATA_COMPONENT, FIELD, ObjectRef::root(target))],
    ));
    assert_eq!(receiver.receiver.dependents_waiting_on(&target), 1);

    // AddEntity alone does not make the reference resolvable
    receiver.process(add_entity(target));
    assert_eq!(field_reapplied_count(&receiver, holder), 0);

    receiver.process(add_component(target, spawn_data_component()));
    receiver.process(add_component(
        target,
        class_metadata_component(TEST_CLASS_PATH),
    ));

    assert_eq!(field_reapplied_count(&receiver, holder), 1);
    assert_eq!(
        receiver.world.wired_refs(&holder, DATA_COMPONENT, FIELD),
        vec![ObjectRef::root(target)]
    );
}

#[test]
fn each_waiting_field_notified_once_and_unrelated_entities_notify_none() {
    init_logger();
    let mut receiver = TestReceiver::default();
    let target = entity(300);
    let holders: Vec<EntityId> = (30..35).map(EntityId::new).collect();

    for holder in &holders {
        receiver.process_all(spawn_entity(
            *holder,
            vec![ref_component(DATA_COMPONENT, FIELD, ObjectRef::root(target))],
        ));
    }
    assert_eq!(receiver.receiver.dependents_waiting_on(&target), holders.len());

    receiver.process_all(spawn_entity(entity(301), Vec::new()));
    for holder in &holders {
        assert_eq!(field_reapplied_count(&receiver, *holder), 0);
    }

    receiver.process_all(spawn_entity(target, Vec::new()));
    for holder in &holders {
        assert_eq!(field_reapplied_count(&receiver, *holder), 1);
    }

    // a second arrival of the same entity finds nobody waiting
    receiver.process(remove_entity(target));
    receiver.process_all(spawn_entity(target, Vec::new()));
    for holder in &holders {
        assert_eq!(field_reapplied_count(&receiver, *holder), 1);
    }
}

#[test]
fn field_with_several_references_waits_for_each() {
    init_logger();
    let mut receiver = TestReceiver::default();
    let holder = entity(40);
    let first = entity(400);
    let second = entity(401);

    let mut fields = SchemaObject::new();
    fields
        .add_object_ref(FIELD, ObjectRef::root(first))
        .add_object_ref(FIELD, ObjectRef::root(second));
    receiver.process_all(spawn_entity(
        holder,
        vec![ComponentData::new(DATA_COMPONENT, fields)],
    ));

    receiver.process_all(spawn_entity(first, Vec::new()));
    assert_eq!(
        receiver.world.wired_refs(&holder, DATA_COMPONENT, FIELD),
        vec![ObjectRef::root(first)]
    );
    assert_eq!(receiver.receiver.dependents_waiting_on(&second), 1);

    receiver.process_all(spawn_entity(second, Vec::new()));
    assert_eq!(
        receiver.world.wired_refs(&holder, DATA_COMPONENT, FIELD),
        vec![ObjectRef::root(first), ObjectRef::root(second)]
    );
    assert_eq!(receiver.receiver.pending_reference_count(), 0);
}

#[test]
fn newer_value_supersedes_pending_reference() {
    init_logger();
    let mut receiver = TestReceiver::default();
    let holder = entity(41);
    let stale = entity(410);

    receiver.process_all(spawn_entity(
        holder,
        vec![ref_component(DATA_COMPONENT, FIELD, ObjectRef::root(stale))],
    ));
    receiver.process(ref_update(holder, DATA_COMPONENT, FIELD, ObjectRef::NULL));
    assert_eq!(receiver.receiver.pending_reference_count(), 0);

    receiver.process_all(spawn_entity(stale, Vec::new()));
    assert_eq!(field_reapplied_count(&receiver, holder), 1);
}

#[test]
fn removing_holder_drops_its_waits() {
    init_logger();
    let mut receiver = TestReceiver::default();
    let holder = entity(50);
    let target = entity(500);

    receiver.process_all(spawn_entity(
        holder,
        vec![ref_component(DATA_COMPONENT, FIELD, ObjectRef::root(target))],
    ));
    assert_eq!(receiver.receiver.pending_reference_count(), 1);

    receiver.process(remove_entity(holder));
    assert_eq!(receiver.receiver.pending_reference_count(), 0);

    receiver.process_all(spawn_entity(target, Vec::new()));
    assert_eq!(field_reapplied_count(&receiver, holder), 0);
}

#[test]
fn removing_component_drops_its_waits() {
    init_logger();
    let mut receiver = TestReceiver::default();
    let holder = entity(51);
    let target = entity(510);

    receiver.process_all(spawn_entity(
        holder,
        vec![ref_component(DATA_COMPONENT, FIELD, ObjectRef::root(target))],
    ));
    receiver.process(remove_component(holder, DATA_COMPONENT));

    assert_eq!(receiver.receiver.pending_reference_count(), 0);
}

#[test]
fn stale_references_are_abandoned_after_ttl() {
    init_logger();
    let mut receiver = TestReceiver::default();
    let holder = entity(52);

    receiver.process_all(spawn_entity(
        holder,
        vec![ref_component(DATA_COMPONENT, FIELD, ObjectRef::root(entity(520)))],
    ));

    receiver.advance(Duration::from_secs(30));
    assert_eq!(receiver.receiver.pending_reference_count(), 1);

    receiver.advance(Duration::from_secs(31));
    assert_eq!(receiver.receiver.pending_reference_count(), 0);
}
