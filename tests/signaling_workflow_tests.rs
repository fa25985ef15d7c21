use serde_json::json;

use morago::websockets::{call_room_topic, CALL_QUEUE, NOTIFICATION_QUEUE, NOTIFICATION_TOPIC};

mod utils;

use utils::*;

#[tokio::test]
async fn test_initiate_rings_recipient_with_session_caller() {
    let setup = SignalingSetup::new();
    let caller = setup.connect(1).await;
    let _recipient = setup.connect(2).await;

    setup.initiate_call(&caller, 2, 10).await;

    let payload = FrameAssertion::at(&setup.mock_conn_manager, Target::User("2"))
        .await
        .count(1)
        .last_message(CALL_QUEUE);
    assert_eq!(payload["type"], "CALL_INITIATE");
    assert_eq!(payload["callerId"], "1");
    assert_eq!(payload["callId"], "10");
    assert_eq!(payload["channelName"], "call-10");
    assert!(payload["timestamp"].is_string());

    FrameAssertion::at(&setup.mock_conn_manager, Target::User("1"))
        .await
        .received_nothing();
}

#[tokio::test]
async fn test_spoofed_caller_id_is_replaced() {
    let setup = SignalingSetup::new();
    let caller = setup.connect(1).await;

    setup
        .send(
            &caller,
            "/app/call.initiate",
            json!({ "callId": 3, "recipientId": 2, "callerId": 99 }),
        )
        .await;

    let payload = FrameAssertion::at(&setup.mock_conn_manager, Target::User("2"))
        .await
        .last_message(CALL_QUEUE);
    assert_eq!(payload["callerId"], "1");
}

#[tokio::test]
async fn test_full_call_lifecycle() {
    let setup = SignalingSetup::new();
    let caller = setup.connect(1).await;
    let recipient = setup.connect(2).await;
    let translator = setup.connect(3).await;
    let room = call_room_topic("10");

    setup.initiate_call(&caller, 2, 10).await;
    setup.subscribe(&caller, &room).await;
    setup.subscribe(&recipient, &room).await;

    setup
        .send(
            &recipient,
            "/app/call.accept",
            json!({ "callId": 10, "callerId": 1, "recipientId": 2 }),
        )
        .await;

    let accepted = FrameAssertion::at(&setup.mock_conn_manager, Target::User("1"))
        .await
        .count(1)
        .last_message(CALL_QUEUE);
    assert_eq!(accepted["type"], "CALL_ACCEPTED");

    setup
        .send(
            &caller,
            "/app/call.signal/10",
            json!({ "type": "offer", "data": { "sdp": "v=0" } }),
        )
        .await;
    setup
        .send(&translator, "/app/call.translator.join", json!({ "callId": 10 }))
        .await;
    setup.send(&caller, "/app/call.end", json!({ "callId": 10 })).await;

    let room_frames = FrameAssertion::at(&setup.mock_conn_manager, Target::Topic(&room)).await;
    let ended = room_frames.count(4).last_message(&room);
    assert_eq!(ended["type"], "CALL_ENDED");

    let frames = setup.mock_conn_manager.messages_on_topic(&room).await;
    let types: Vec<String> = frames
        .iter()
        .map(|raw| {
            let frame: serde_json::Value = serde_json::from_str(raw).unwrap();
            frame["payload"]["type"].as_str().unwrap_or_default().to_string()
        })
        .collect();
    assert_eq!(
        types,
        vec!["CALL_ACCEPTED", "offer", "TRANSLATOR_JOINED", "CALL_ENDED"]
    );

    let offer: serde_json::Value = serde_json::from_str(&frames[1]).unwrap();
    assert_eq!(offer["payload"]["callId"], "10");
    assert_eq!(offer["payload"]["data"]["sdp"], "v=0");

    let joined: serde_json::Value = serde_json::from_str(&frames[2]).unwrap();
    assert_eq!(joined["payload"]["translatorId"], "3");
}

#[tokio::test]
async fn test_reject_goes_to_caller_only() {
    let setup = SignalingSetup::new();
    let recipient = setup.connect(2).await;

    setup
        .send(
            &recipient,
            "/app/call.reject",
            json!({ "callId": 5, "callerId": 1, "recipientId": 2 }),
        )
        .await;

    let payload = FrameAssertion::at(&setup.mock_conn_manager, Target::User("1"))
        .await
        .last_message(CALL_QUEUE);
    assert_eq!(payload["type"], "CALL_REJECTED");
    assert!(setup
        .mock_conn_manager
        .messages_on_topic(&call_room_topic("5"))
        .await
        .is_empty());
}

#[tokio::test]
async fn test_missing_fields_reply_with_error_frame() {
    let setup = SignalingSetup::new();
    let session = setup.connect(2).await;

    setup
        .send(&session, "/app/call.accept", json!({ "callerId": 1 }))
        .await;

    let error = FrameAssertion::at(
        &setup.mock_conn_manager,
        Target::Connection(session.connection_id),
    )
    .await
    .count(1)
    .last_error();
    assert_eq!(error, "Missing required field: callId");
    FrameAssertion::at(&setup.mock_conn_manager, Target::User("1"))
        .await
        .received_nothing();
}

#[tokio::test]
async fn test_malformed_frames_and_unknown_destinations() {
    let setup = SignalingSetup::new();
    let session = setup.connect(1).await;

    setup
        .send_raw(&session, "{\"command\":\"CONNECT\"}")
        .await;
    setup.send(&session, "/app/does.not.exist", json!({})).await;

    let frames = setup
        .mock_conn_manager
        .messages_for_connection(session.connection_id)
        .await;
    assert_eq!(frames.len(), 2);
    let last = FrameAssertion::at(
        &setup.mock_conn_manager,
        Target::Connection(session.connection_id),
    )
    .await
    .last_error();
    assert_eq!(last, "Unknown destination: /app/does.not.exist");
}

#[tokio::test]
async fn test_subscriptions_are_limited_to_topics() {
    let setup = SignalingSetup::new();
    let session = setup.connect(1).await;

    setup.subscribe(&session, NOTIFICATION_TOPIC).await;
    setup.subscribe(&session, "/app/call.initiate").await;

    let topics = setup
        .mock_conn_manager
        .subscriptions_of(session.connection_id)
        .await;
    assert!(topics.contains(NOTIFICATION_TOPIC));
    assert_eq!(topics.len(), 1);
    assert_eq!(
        FrameAssertion::at(
            &setup.mock_conn_manager,
            Target::Connection(session.connection_id)
        )
        .await
        .last_error(),
        "Cannot subscribe to /app/call.initiate"
    );

    setup.unsubscribe(&session, NOTIFICATION_TOPIC).await;
    assert!(setup
        .mock_conn_manager
        .subscriptions_of(session.connection_id)
        .await
        .is_empty());
}

#[tokio::test]
async fn test_notification_routing() {
    let setup = SignalingSetup::new();
    let sender = setup.connect(1).await;

    setup
        .send(
            &sender,
            "/app/notification.send",
            json!({ "title": "Hi", "text": "Direct", "recipientId": 2, "type": "INFO" }),
        )
        .await;
    setup
        .send(
            &sender,
            "/app/notification.send",
            json!({ "id": "fixed-id", "title": "All", "text": "Broadcast" }),
        )
        .await;

    let direct = FrameAssertion::at(&setup.mock_conn_manager, Target::User("2"))
        .await
        .count(1)
        .last_message(NOTIFICATION_QUEUE);
    assert_eq!(direct["sender"], "1");
    assert_eq!(direct["type"], "INFO");
    assert!(direct["id"].as_str().is_some_and(|id| !id.is_empty()));

    let broadcast = FrameAssertion::at(&setup.mock_conn_manager, Target::Topic(NOTIFICATION_TOPIC))
        .await
        .count(1)
        .last_message(NOTIFICATION_TOPIC);
    assert_eq!(broadcast["id"], "fixed-id");
    assert_eq!(broadcast["text"], "Broadcast");
}

#[tokio::test]
async fn test_system_notifications_from_application_code() {
    let setup = SignalingSetup::new();
    let relay = setup.state.notification_relay();

    relay
        .send_notification_to_user("7", "Deposit", "Approved", "DEPOSIT", Some(json!({ "depositId": 4 })))
        .await
        .unwrap();
    relay
        .broadcast_notification("Maintenance", "Tonight", "SYSTEM", None)
        .await
        .unwrap();

    let direct = FrameAssertion::at(&setup.mock_conn_manager, Target::User("7"))
        .await
        .last_message(NOTIFICATION_QUEUE);
    assert_eq!(direct["sender"], "System");
    assert_eq!(direct["data"]["depositId"], 4);

    let broadcast = FrameAssertion::at(&setup.mock_conn_manager, Target::Topic(NOTIFICATION_TOPIC))
        .await
        .last_message(NOTIFICATION_TOPIC);
    assert_eq!(broadcast["sender"], "System");
}
