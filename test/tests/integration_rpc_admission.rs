use std::time::Duration;

use meshwork_shared::{
    ComponentId, ComponentUpdate, EntityId, ObjectRef, PackedRpc, RequestId, RpcPayload,
    SchemaObject, CLIENT_RPC_ENDPOINT_COMPONENT_ID, PACKED_RPCS_COMPONENT_ID,
    RPC_PAYLOAD_FIELD_ID, SERVER_RPC_ENDPOINT_COMPONENT_ID,
};
use meshwork_test::{ops::*, TestReceiver};
use meshwork_worker::{ComponentRole, ReceiverConfig, RpcErrorKind};

const DATA_COMPONENT: ComponentId = ComponentId::new(1000);
const SENDER: &str = "ClientWorker-1";

fn init_logger() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

fn rpc(index: u32) -> RpcPayload {
    RpcPayload::new(0, index, vec![index as u8])
}

fn send_command(receiver: &mut TestReceiver, request: i64, entity_id: EntityId, payload: RpcPayload) {
    receiver.process(rpc_command(
        RequestId::new(request),
        entity_id,
        SERVER_RPC_ENDPOINT_COMPONENT_ID,
        payload,
        SENDER,
    ));
}

fn applied_indices(receiver: &TestReceiver, target: ObjectRef) -> Vec<u32> {
    receiver
        .world
        .rpcs_applied_to(&target)
        .into_iter()
        .map(|(index, _)| index)
        .collect()
}

#[test]
fn rpc_to_live_entity_applies_immediately() {
    init_logger();
    let mut receiver = TestReceiver::default();
    let entity_id = entity(1);
    receiver.process_all(spawn_entity(entity_id, Vec::new()));

    send_command(&mut receiver, 1, entity_id, rpc(4));

    assert_eq!(
        receiver.world.rpcs_applied_to(&ObjectRef::root(entity_id)),
        vec![(4, SENDER.to_string())]
    );
    assert_eq!(receiver.receiver.queued_rpc_count(), 0);
    assert_eq!(
        receiver.connection.command_responses,
        vec![(RequestId::new(1), SERVER_RPC_ENDPOINT_COMPONENT_ID)]
    );
}

#[test]
fn rpcs_for_unresolved_target_replay_in_arrival_order() {
    init_logger();
    let mut receiver = TestReceiver::default();
    let entity_id = entity(60);
    let target = ObjectRef::root(entity_id);

    for (request, index) in [(1, 1), (2, 2), (3, 3)] {
        send_command(&mut receiver, request, entity_id, rpc(index));
    }

    assert_eq!(receiver.receiver.queued_rpc_count(), 3);
    assert!(applied_indices(&receiver, target).is_empty());
    // every command is acknowledged on arrival, not on application
    assert_eq!(receiver.connection.command_responses.len(), 3);

    receiver.process_all(spawn_entity(entity_id, Vec::new()));

    assert_eq!(applied_indices(&receiver, target), vec![1, 2, 3]);
    assert_eq!(receiver.receiver.queued_rpc_count(), 0);
    assert_eq!(receiver.receiver.pending_reference_count(), 0);
}

#[test]
fn rpc_arriving_behind_queued_rpcs_waits_its_turn() {
    init_logger();
    let mut receiver = TestReceiver::default();
    let entity_id = entity(61);
    let target = ObjectRef::new(entity_id, DATA_COMPONENT.value());
    receiver.process_all(spawn_entity(entity_id, Vec::new()));

    // the sub-object does not exist yet
    receiver.process(rpc_events(
        entity_id,
        CLIENT_RPC_ENDPOINT_COMPONENT_ID,
        vec![RpcPayload::new(target.offset, 1, Vec::new())],
    ));
    receiver.process(rpc_events(
        entity_id,
        CLIENT_RPC_ENDPOINT_COMPONENT_ID,
        vec![RpcPayload::new(target.offset, 2, Vec::new())],
    ));
    assert_eq!(receiver.receiver.queued_rpc_count(), 2);

    receiver.process(add_component(entity_id, data_component(DATA_COMPONENT, 1, 0)));

    assert_eq!(applied_indices(&receiver, target), vec![1, 2]);
    assert_eq!(receiver.receiver.queued_rpc_count(), 0);
}

#[test]
fn rpcs_in_one_update_keep_their_order() {
    init_logger();
    let mut receiver = TestReceiver::default();
    let entity_id = entity(62);
    let target = ObjectRef::root(entity_id);

    receiver.process(add_entity(entity_id));
    receiver.process(rpc_events(
        entity_id,
        CLIENT_RPC_ENDPOINT_COMPONENT_ID,
        vec![rpc(7), rpc(8), rpc(9)],
    ));
    receiver.process(add_component(entity_id, spawn_data_component()));
    receiver.process(add_component(
        entity_id,
        class_metadata_component(TEST_CLASS_PATH),
    ));

    assert_eq!(applied_indices(&receiver, target), vec![7, 8, 9]);
    for (_, sender) in receiver.world.rpcs_applied_to(&target) {
        assert!(sender.is_empty());
    }
}

#[test]
fn packed_rpcs_are_routed_to_their_own_targets() {
    init_logger();
    let mut receiver = TestReceiver::default();
    let carrier = entity(63);
    let first = entity(630);
    let second = entity(631);
    receiver.process_all(spawn_entity(carrier, Vec::new()));
    receiver.process_all(spawn_entity(first, Vec::new()));

    receiver.process(packed_rpc_events(
        carrier,
        PACKED_RPCS_COMPONENT_ID,
        vec![
            PackedRpc {
                target_entity: first,
                payload: rpc(1),
            },
            PackedRpc {
                target_entity: second,
                payload: rpc(2),
            },
        ],
    ));

    assert_eq!(applied_indices(&receiver, ObjectRef::root(first)), vec![1]);
    assert!(applied_indices(&receiver, ObjectRef::root(carrier)).is_empty());
    assert_eq!(receiver.receiver.queued_rpc_count(), 1);

    receiver.process_all(spawn_entity(second, Vec::new()));
    assert_eq!(applied_indices(&receiver, ObjectRef::root(second)), vec![2]);
}

#[test]
fn registered_endpoint_carries_rpcs() {
    init_logger();
    let mut receiver = TestReceiver::default();
    let endpoint = ComponentId::new(20_000);
    receiver.register_component(endpoint, ComponentRole::RpcEndpoint);
    let entity_id = entity(64);
    receiver.process_all(spawn_entity(entity_id, Vec::new()));

    receiver.process(rpc_events(entity_id, endpoint, vec![rpc(5)]));

    assert_eq!(applied_indices(&receiver, ObjectRef::root(entity_id)), vec![5]);
}

#[test]
fn rpc_waits_for_argument_references_until_timeout() {
    init_logger();
    let mut receiver = TestReceiver::default();
    let entity_id = entity(65);
    let target = ObjectRef::root(entity_id);
    receiver.process_all(spawn_entity(entity_id, Vec::new()));

    send_command(
        &mut receiver,
        1,
        entity_id,
        rpc(1).with_refs(vec![ObjectRef::root(entity(650))]),
    );
    assert_eq!(receiver.receiver.queued_rpc_count(), 1);

    receiver.advance(Duration::from_millis(500));
    assert!(applied_indices(&receiver, target).is_empty());

    receiver.advance(Duration::from_millis(600));
    assert_eq!(applied_indices(&receiver, target), vec![1]);
    assert_eq!(receiver.receiver.queued_rpc_count(), 0);
}

#[test]
fn rpc_applied_once_argument_reference_resolves() {
    init_logger();
    let mut receiver = TestReceiver::default();
    let entity_id = entity(66);
    let argument = entity(660);
    receiver.process_all(spawn_entity(entity_id, Vec::new()));

    send_command(
        &mut receiver,
        1,
        entity_id,
        rpc(1).with_refs(vec![ObjectRef::root(argument)]),
    );
    send_command(&mut receiver, 2, entity_id, rpc(2));
    assert_eq!(receiver.receiver.dependents_waiting_on(&argument), 1);

    receiver.process_all(spawn_entity(argument, Vec::new()));

    assert_eq!(applied_indices(&receiver, ObjectRef::root(entity_id)), vec![1, 2]);
    assert_eq!(receiver.receiver.pending_reference_count(), 0);
}

#[test]
fn unknown_function_is_reported_and_does_not_block_queue() {
    init_logger();
    let mut receiver = TestReceiver::default();
    let entity_id = entity(67);
    receiver.world.unknown_functions.insert(2);

    for (request, index) in [(1, 1), (2, 2), (3, 3)] {
        send_command(&mut receiver, request, entity_id, rpc(index));
    }
    receiver.process_all(spawn_entity(entity_id, Vec::new()));

    assert_eq!(applied_indices(&receiver, ObjectRef::root(entity_id)), vec![1, 3]);
    let errors = receiver.receiver.take_rpc_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, RpcErrorKind::FunctionNotFound);
    assert_eq!(errors[0].rpc_index, 2);
    assert_eq!(errors[0].sender, SENDER);
    assert!(receiver.receiver.take_rpc_errors().is_empty());
}

#[test]
fn undrained_rpc_errors_keep_only_the_newest() {
    init_logger();
    let mut config = ReceiverConfig::default();
    config.rpc.max_buffered_errors = 2;
    let mut receiver = TestReceiver::new(config);
    let entity_id = entity(69);
    receiver.process_all(spawn_entity(entity_id, Vec::new()));
    for index in [5, 6, 7] {
        receiver.world.unknown_functions.insert(index);
    }

    for (request, index) in [(1, 5), (2, 6), (3, 7)] {
        send_command(&mut receiver, request, entity_id, rpc(index));
    }

    let errors = receiver.receiver.take_rpc_errors();
    let indices: Vec<u32> = errors.iter().map(|error| error.rpc_index).collect();
    assert_eq!(indices, vec![6, 7]);
    assert!(errors
        .iter()
        .all(|error| error.kind == RpcErrorKind::FunctionNotFound));
}

#[test]
fn queued_rpcs_are_evicted_after_retention() {
    init_logger();
    let mut receiver = TestReceiver::default();
    let entity_id = entity(68);

    send_command(&mut receiver, 1, entity_id, rpc(1));
    receiver.advance(Duration::from_secs(10));
    send_command(&mut receiver, 2, entity_id, rpc(2));

    receiver.advance(Duration::from_secs(21));
    let errors = receiver.receiver.take_rpc_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, RpcErrorKind::Evicted);
    assert_eq!(errors[0].rpc_index, 1);
    assert_eq!(receiver.receiver.queued_rpc_count(), 1);

    receiver.process_all(spawn_entity(entity_id, Vec::new()));
    assert_eq!(applied_indices(&receiver, ObjectRef::root(entity_id)), vec![2]);
    assert_eq!(receiver.receiver.pending_reference_count(), 0);
}

#[test]
fn removing_target_drops_its_queued_rpcs() {
    init_logger();
    let mut receiver = TestReceiver::default();
    let entity_id = entity(69);
    receiver.process_all(spawn_entity(entity_id, Vec::new()));

    receiver.process(rpc_events(
        entity_id,
        CLIENT_RPC_ENDPOINT_COMPONENT_ID,
        vec![RpcPayload::new(DATA_COMPONENT.value(), 1, Vec::new())],
    ));
    assert_eq!(receiver.receiver.queued_rpc_count(), 1);

    receiver.process(remove_entity(entity_id));

    assert_eq!(receiver.receiver.queued_rpc_count(), 0);
    let errors = receiver.receiver.take_rpc_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, RpcErrorKind::ObjectDestroyed);
}

#[test]
fn malformed_rpc_event_is_reported() {
    init_logger();
    let mut receiver = TestReceiver::default();
    let entity_id = entity(70);
    receiver.process_all(spawn_entity(entity_id, Vec::new()));

    let mut events = SchemaObject::new();
    events
        .add_object(RPC_PAYLOAD_FIELD_ID, SchemaObject::new())
        .add_object(RPC_PAYLOAD_FIELD_ID, rpc(3).to_schema());
    receiver.process(component_update(
        entity_id,
        ComponentUpdate::with_events(CLIENT_RPC_ENDPOINT_COMPONENT_ID, events),
    ));

    let errors = receiver.receiver.take_rpc_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, RpcErrorKind::MalformedPayload);
    assert_eq!(errors[0].rpc_index, 0);
    assert_eq!(applied_indices(&receiver, ObjectRef::root(entity_id)), vec![3]);
}

#[test]
fn command_on_component_without_rpcs_fails() {
    init_logger();
    let mut receiver = TestReceiver::default();
    let entity_id = entity(71);
    receiver.process_all(spawn_entity(entity_id, Vec::new()));

    receiver.process(rpc_command(
        RequestId::new(9),
        entity_id,
        DATA_COMPONENT,
        rpc(1),
        SENDER,
    ));

    assert_eq!(receiver.connection.command_failures.len(), 1);
    assert_eq!(receiver.connection.command_failures[0].0, RequestId::new(9));
    assert!(receiver.connection.command_responses.is_empty());
    assert!(applied_indices(&receiver, ObjectRef::root(entity_id)).is_empty());
}
