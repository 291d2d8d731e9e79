use std::{cell::RefCell, rc::Rc, time::Duration};

use meshwork_shared::{
    ComponentId, EntityQuery, ObjectRef, QueryConstraint, RequestId, RpcPayload, StatusCode,
    SERVER_RPC_ENDPOINT_COMPONENT_ID, WORKER_COMPONENT_ID,
};
use meshwork_test::{ops::*, TestReceiver, WorldEvent};
use meshwork_worker::ReceiverError;

const DATA_COMPONENT: ComponentId = ComponentId::new(1000);

fn init_logger() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

/// A receiver holding something in every queue it owns
fn busy_receiver() -> (TestReceiver, Vec<(RequestId, Rc<RefCell<bool>>)>) {
    let mut receiver = TestReceiver::default();

    let unknown = entity(900);
    for index in 1..=5 {
        receiver.process(rpc_command(
            RequestId::new(index),
            unknown,
            SERVER_RPC_ENDPOINT_COMPONENT_ID,
            RpcPayload::new(0, index as u32, Vec::new()),
            "ClientWorker-1",
        ));
    }

    let holder = entity(10);
    receiver.process_all(spawn_entity(
        holder,
        vec![ref_component(DATA_COMPONENT, 1, ObjectRef::root(entity(901)))],
    ));

    receiver.receiver.send_reliable_rpc(
        &mut receiver.connection,
        holder,
        entity(902),
        SERVER_RPC_ENDPOINT_COMPONENT_ID,
        RpcPayload::new(0, 1, Vec::new()),
    );

    let mut queries = Vec::new();
    for _ in 0..2 {
        let answered = Rc::new(RefCell::new(false));
        let sink = answered.clone();
        let request_id = receiver.receiver.query_entities(
            &mut receiver.connection,
            &EntityQuery::snapshot(
                QueryConstraint::Component(WORKER_COMPONENT_ID),
                vec![WORKER_COMPONENT_ID],
            ),
            Box::new(move |_| *sink.borrow_mut() = true),
        );
        queries.push((request_id, answered));
    }

    assert_eq!(receiver.receiver.queued_rpc_count(), 5);
    assert_eq!(receiver.receiver.pending_request_count(), 2);
    assert!(receiver.receiver.pending_reference_count() > 0);
    assert_eq!(receiver.receiver.reliable_rpc_count(), 1);

    (receiver, queries)
}

#[test]
fn disconnect_discards_all_pending_work() {
    init_logger();
    let (mut receiver, _) = busy_receiver();

    receiver.process(disconnect("lost connection to runtime"));

    assert!(receiver.receiver.is_disconnected());
    assert_eq!(receiver.receiver.queued_rpc_count(), 0);
    assert_eq!(receiver.receiver.pending_request_count(), 0);
    assert_eq!(receiver.receiver.pending_reference_count(), 0);
    assert_eq!(receiver.receiver.reliable_rpc_count(), 0);
    assert!(receiver.receiver.view().is_empty());
    assert_eq!(
        receiver.world.events().last(),
        Some(&WorldEvent::Disconnected(
            "lost connection to runtime".to_string()
        ))
    );
}

#[test]
fn delegates_never_run_after_disconnect() {
    init_logger();
    let (mut receiver, queries) = busy_receiver();

    receiver.process(disconnect("lost connection to runtime"));

    for (request_id, answered) in &queries {
        let result = receiver.try_process(entity_query_response(
            *request_id,
            StatusCode::Success,
            Vec::new(),
        ));
        assert!(matches!(result, Err(ReceiverError::Disconnected)));
        assert!(!*answered.borrow());
    }
}

#[test]
fn advance_is_inert_after_disconnect() {
    init_logger();
    let (mut receiver, _) = busy_receiver();
    receiver.process(disconnect("lost connection to runtime"));
    receiver.world.clear_events();
    let sent = receiver.connection.last_request_id();

    receiver.advance(Duration::from_secs(120));

    assert!(receiver.world.events().is_empty());
    assert!(receiver.receiver.take_rpc_errors().is_empty());
    assert_eq!(receiver.connection.last_request_id(), sent);
}

#[test]
#[should_panic]
fn process_after_disconnect_panics() {
    init_logger();
    let mut receiver = TestReceiver::default();
    receiver.process(disconnect("lost connection to runtime"));

    receiver.process(add_entity(entity(1)));
}
