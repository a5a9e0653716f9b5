//! Hub tests with real connection outboxes: ordering, routing and
//! connection lifecycle as seen by the clients.

use std::time::Duration;

use murmur::chat::{
    hub::{Inbox, Session},
    protocol::DeliveryStatus,
    ClientEvent, ConnId, Hub, ServerEvent,
};

fn drain(inbox: &mut Inbox) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = inbox.try_recv() {
        events.push(event);
    }
    events
}

async fn joined(hub: &Hub, name: &str) -> (Session, Inbox) {
    let (session, mut inbox) = hub.connect().await;
    session.handle(ClientEvent::Join { username: name.to_owned() }).await;
    drain(&mut inbox);
    (session, inbox)
}

async fn settle(hub: &Hub, connections: usize) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while hub.connections().await != connections {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
}

fn send(message: &str, ack: Option<u64>) -> ClientEvent {
    ClientEvent::SendMessage { message: message.to_owned(), ack }
}

#[tokio::test]
async fn first_event_is_own_connection_id() {
    let hub = Hub::new();
    let (session, mut inbox) = hub.connect().await;

    assert_eq!(drain(&mut inbox), vec![ServerEvent::Connected { id: session.id() }]);
}

#[tokio::test]
async fn join_then_disconnect_is_seen_in_order_by_everyone() {
    let hub = Hub::new();
    let (_observer, mut observer_inbox) = joined(&hub, "watcher").await;

    let (alice, _alice_inbox) = hub.connect().await;
    let alice_id = alice.id();
    alice.handle(ClientEvent::Join { username: "alice".to_owned() }).await;
    alice.close().await;

    let events = drain(&mut observer_inbox);
    assert_eq!(events.len(), 4);
    assert!(matches!(&events[0], ServerEvent::UserList(users) if users.len() == 2));
    assert!(matches!(&events[1], ServerEvent::UserJoined { username, id } if username == "alice" && *id == alice_id));
    assert!(matches!(&events[2], ServerEvent::UserLeft(p) if p.id == alice_id && !p.online));
    assert!(matches!(&events[3], ServerEvent::UserList(users) if users.len() == 1 && users[0].username == "watcher"));
}

#[tokio::test]
async fn send_broadcasts_to_all_and_acks_only_the_sender() {
    let hub = Hub::new();
    let (alice, mut alice_inbox) = joined(&hub, "alice").await;
    let (_bob, mut bob_inbox) = joined(&hub, "bob").await;

    alice.handle(send("hello", Some(11))).await;

    let alice_events = drain(&mut alice_inbox);
    let bob_events = drain(&mut bob_inbox);
    assert_eq!(alice_events.len(), 2);
    assert_eq!(bob_events.len(), 1);
    assert_eq!(alice_events[0], bob_events[0]);

    let ServerEvent::ReceiveMessage(message) = &bob_events[0] else {
        panic!("expected a message, got {:?}", bob_events[0]);
    };
    assert_eq!(message.sender, "alice");
    assert_eq!(message.sender_id, alice.id());
    assert_eq!(
        alice_events[1],
        ServerEvent::MessageAck { ack: 11, status: DeliveryStatus::Delivered, id: message.id }
    );
}

#[tokio::test]
async fn private_message_reaches_only_recipient_and_sender() {
    let hub = Hub::new();
    let (alice, mut alice_inbox) = joined(&hub, "alice").await;
    let (bob, mut bob_inbox) = joined(&hub, "bob").await;
    let (_carol, mut carol_inbox) = joined(&hub, "carol").await;

    alice.handle(ClientEvent::PrivateMessage { to: bob.id(), message: "psst".to_owned() }).await;

    let bob_events = drain(&mut bob_inbox);
    let alice_events = drain(&mut alice_inbox);
    assert_eq!(bob_events.len(), 1);
    assert_eq!(alice_events, bob_events);
    let ServerEvent::PrivateMessage(message) = &bob_events[0] else {
        panic!("expected a private message");
    };
    assert_eq!(message.sender_id, alice.id());
    assert_eq!(message.message, "psst");
    assert!(drain(&mut carol_inbox).is_empty());
    assert!(hub.messages().await.is_empty());
}

#[tokio::test]
async fn private_message_to_missing_recipient_still_echoes() {
    let hub = Hub::new();
    let (alice, mut alice_inbox) = joined(&hub, "alice").await;

    alice.handle(ClientEvent::PrivateMessage { to: ConnId::new(), message: "anyone?".to_owned() }).await;

    let events = drain(&mut alice_inbox);
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], ServerEvent::PrivateMessage(m) if m.message == "anyone?"));
}

#[tokio::test]
async fn concurrent_sends_get_distinct_ordered_ids() {
    let hub = Hub::new();
    let (alice, _a) = joined(&hub, "alice").await;
    let (bob, _b) = joined(&hub, "bob").await;

    tokio::join!(alice.handle(send("from alice", None)), bob.handle(send("from bob", None)));

    let stored = hub.messages().await;
    assert_eq!(stored.len(), 2);
    assert!(stored[0].id < stored[1].id);

    let page = hub.page(1).await;
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].id, stored[1].id);
    assert_eq!(page[1].id, stored[0].id);
}

#[tokio::test]
async fn get_messages_replies_to_requester_only() {
    let hub = Hub::new();
    let (alice, mut alice_inbox) = joined(&hub, "alice").await;
    let (bob, mut bob_inbox) = joined(&hub, "bob").await;
    for i in 0..25 {
        alice.handle(send(&format!("m{i}"), None)).await;
    }
    drain(&mut alice_inbox);
    drain(&mut bob_inbox);

    bob.handle(ClientEvent::GetMessages { page: 2, ack: Some(1) }).await;

    assert!(drain(&mut alice_inbox).is_empty());
    let events = drain(&mut bob_inbox);
    let [ServerEvent::Messages { ack, page, messages }] = &events[..] else {
        panic!("expected one page, got {events:?}");
    };
    assert_eq!((*ack, *page), (Some(1), 2));
    assert_eq!(messages.len(), 5);
    assert_eq!(messages[0].message, "m4");
    assert_eq!(messages[4].message, "m0");
}

#[tokio::test]
async fn history_is_capped() {
    let hub = Hub::new();
    let (alice, _inbox) = joined(&hub, "alice").await;
    for i in 0..210 {
        alice.handle(send(&format!("m{i}"), None)).await;
    }

    let stored = hub.messages().await;
    assert_eq!(stored.len(), 200);
    assert_eq!(stored[0].message, "m10");
}

#[tokio::test]
async fn mark_read_echoes_unknown_ids_too() {
    let hub = Hub::new();
    let (alice, mut alice_inbox) = joined(&hub, "alice").await;
    alice.handle(send("hi", None)).await;
    let id = hub.messages().await[0].id;
    drain(&mut alice_inbox);

    let ids = vec![id, murmur::chat::MessageId(1)];
    alice.handle(ClientEvent::MarkRead(ids.clone())).await;
    alice.handle(ClientEvent::MarkRead(ids.clone())).await;

    assert_eq!(
        drain(&mut alice_inbox),
        vec![ServerEvent::MessagesRead(ids.clone()), ServerEvent::MessagesRead(ids)]
    );
    assert_eq!(hub.messages().await[0].read_by, vec![alice.id()]);
}

#[tokio::test]
async fn dropped_session_disconnects_exactly_once() {
    let hub = Hub::new();
    let (_observer, mut observer_inbox) = joined(&hub, "watcher").await;
    let (alice, _alice_inbox) = joined(&hub, "alice").await;
    let alice_id = alice.id();
    drain(&mut observer_inbox);

    drop(alice);
    settle(&hub, 1).await;

    assert!(!hub.disconnect(alice_id).await);
    let left: Vec<_> = drain(&mut observer_inbox)
        .into_iter()
        .filter(|e| matches!(e, ServerEvent::UserLeft(_)))
        .collect();
    assert_eq!(left.len(), 1);
    assert_eq!(hub.users().await.len(), 1);
}

#[tokio::test]
async fn events_after_disconnect_are_ignored() {
    let hub = Hub::new();
    let (alice, _inbox) = joined(&hub, "alice").await;
    let alice_id = alice.id();
    alice.close().await;

    hub.handle(alice_id, ClientEvent::Join { username: "ghost".to_owned() }).await;
    hub.handle(alice_id, send("boo", None)).await;

    assert!(hub.users().await.is_empty());
    assert!(hub.messages().await.is_empty());
}

#[tokio::test]
async fn disconnect_before_join_is_silent() {
    let hub = Hub::new();
    let (_observer, mut observer_inbox) = joined(&hub, "watcher").await;
    let (lurker, _inbox) = hub.connect().await;

    lurker.close().await;

    assert!(drain(&mut observer_inbox).is_empty());
    assert_eq!(hub.connections().await, 1);
}
