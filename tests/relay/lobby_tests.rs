//! Lobby lifecycle tests
//!
//! Covers registration, discovery, relayed connects and disconnect
//! cleanup through `RelayClient`.

use lobby_relay::{
    ConnectLobbyRequest, ConnectLobbyResponse, ListLobbyRequest, Location, Lobby, RelayClient,
    RelayError,
};

use crate::common::{duck, TestRelay};

fn connect_req(id: &str, password: Option<&str>) -> ConnectLobbyRequest {
    ConnectLobbyRequest {
        id: id.into(),
        payload: "offer".into(),
        password: password.map(str::to_string),
        ..ConnectLobbyRequest::default()
    }
}

fn listed_duck(distance: f64) -> Lobby {
    Lobby {
        location: None,
        distance,
        ..duck()
    }
}

// ============================================================================
// FULL SESSION
// ============================================================================

/// Register, discover, connect, then disconnect and verify the sweep
#[tokio::test]
async fn test_lobby_session_end_to_end() {
    let relay = TestRelay::start().await;
    let host = relay.host().await;

    // Empty relay
    assert!(host.list_lobbies(&ListLobbyRequest::default()).await.unwrap().is_empty());
    let err = host
        .connect_lobby(&ConnectLobbyRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::NotFound), "got {:?}", err);

    host.new_lobby(&duck()).await.unwrap();
    host.new_lobby(&Lobby {
        id: "2".into(),
        hidden: true,
        ..Lobby::default()
    })
    .await
    .unwrap();

    let lobbies = host.list_lobbies(&ListLobbyRequest::default()).await.unwrap();
    assert_eq!(lobbies, vec![listed_duck(0.0)]);

    let lobbies = host
        .list_lobbies(&ListLobbyRequest {
            location: Some(Location::new(1.0, 2.0)),
            ..ListLobbyRequest::default()
        })
        .await
        .unwrap();
    assert_eq!(lobbies.len(), 1);
    assert!((lobbies[0].distance - 111.17799068882648).abs() < 1e-9);
    assert_eq!(lobbies[0], listed_duck(lobbies[0].distance));

    let err = host.connect_lobby(&connect_req("1", None)).await.unwrap_err();
    assert!(matches!(err, RelayError::NotAuthorized), "got {:?}", err);

    let resp = host.connect_lobby(&connect_req("1", Some("test"))).await.unwrap();
    assert_eq!(
        resp,
        ConnectLobbyResponse {
            payload: "webrtc offer".into()
        }
    );

    host.close().await;
    relay.wait_for_lobby_count(0).await;

    let other = relay.client().await;
    assert!(other.list_lobbies(&ListLobbyRequest::default()).await.unwrap().is_empty());
    let err = other.connect_lobby(&connect_req("1", Some("test"))).await.unwrap_err();
    assert!(matches!(err, RelayError::NotFound), "got {:?}", err);
}

// ============================================================================
// OWNERSHIP
// ============================================================================

/// A second connection cannot take over a held ID; the owner can update it
#[tokio::test]
async fn test_register_conflict_between_connections() {
    let relay = TestRelay::start().await;
    let alice = relay.host().await;
    let bob = relay.host().await;

    alice.new_lobby(&duck()).await.unwrap();

    let mut stolen = duck();
    stolen.name = "Goose".into();
    let err = bob.new_lobby(&stolen).await.unwrap_err();
    assert!(matches!(err, RelayError::AlreadyExists), "got {:?}", err);

    let mut update = duck();
    update.people = 3;
    update.capacity = 4;
    alice.new_lobby(&update).await.unwrap();

    let lobbies = bob.list_lobbies(&ListLobbyRequest::default()).await.unwrap();
    assert_eq!(lobbies.len(), 1);
    assert_eq!(lobbies[0].name, "Duck");
    assert_eq!((lobbies[0].people, lobbies[0].capacity), (3, 4));

    // Once the owner leaves, the ID is free again
    alice.close().await;
    relay.wait_for_lobby_count(0).await;
    bob.new_lobby(&stolen).await.unwrap();
    let lobbies = bob.list_lobbies(&ListLobbyRequest::default()).await.unwrap();
    assert_eq!(lobbies[0].name, "Goose");
}

/// Only the closing connection's lobbies are swept
#[tokio::test]
async fn test_disconnect_leaves_other_lobbies() {
    let relay = TestRelay::start().await;
    let alice = relay.host().await;
    let bob = relay.host().await;

    alice.new_lobby(&duck()).await.unwrap();
    bob.new_lobby(&Lobby {
        id: "b".into(),
        ..Lobby::default()
    })
    .await
    .unwrap();
    relay.wait_for_lobby_count(2).await;

    bob.close().await;
    relay.wait_for_lobby_count(1).await;

    let watcher = relay.client().await;
    let lobbies = watcher.list_lobbies(&ListLobbyRequest::default()).await.unwrap();
    assert_eq!(lobbies.len(), 1);
    assert_eq!(lobbies[0].id, "1");
}

/// Closing a connection that never registered anything is harmless
#[tokio::test]
async fn test_disconnect_without_lobbies() {
    let relay = TestRelay::start().await;
    let host = relay.host().await;
    host.new_lobby(&duck()).await.unwrap();

    let idle = relay.client().await;
    idle.close().await;

    let watcher = relay.client().await;
    let lobbies = watcher.list_lobbies(&ListLobbyRequest::default()).await.unwrap();
    assert_eq!(lobbies.len(), 1);
    assert_eq!(relay.registry.stats().lobby_count, 1);
}

// ============================================================================
// RELAYED CONNECT
// ============================================================================

/// Hidden lobbies stay out of discovery but accept connects by ID
#[tokio::test]
async fn test_hidden_lobby_is_connectable() {
    let relay = TestRelay::start().await;
    let host = relay.host().await;
    host.new_lobby(&Lobby {
        id: "secret".into(),
        hidden: true,
        ..Lobby::default()
    })
    .await
    .unwrap();

    let guest = relay.client().await;
    assert!(guest.list_lobbies(&ListLobbyRequest::default()).await.unwrap().is_empty());

    let resp = guest
        .connect_lobby(&connect_req("secret", Some("test")))
        .await
        .unwrap();
    assert_eq!(resp.payload, "webrtc offer");
}

/// A peer can connect to its own lobby without deadlocking its socket
#[tokio::test]
async fn test_connect_to_own_lobby() {
    let relay = TestRelay::start().await;
    let host = relay.host().await;
    host.new_lobby(&duck()).await.unwrap();

    let resp = host.connect_lobby(&connect_req("1", Some("test"))).await.unwrap();
    assert_eq!(resp.payload, "webrtc offer");
}

/// Errors from a creator that cannot answer reach the requester as-is
#[tokio::test]
async fn test_creator_without_handler() {
    let relay = TestRelay::start().await;
    let host = relay.client().await;
    host.new_lobby(&duck()).await.unwrap();

    let guest = relay.client().await;
    let err = guest.connect_lobby(&connect_req("1", None)).await.unwrap_err();
    assert_eq!(err.to_string(), "unknown method: client.connect");
}

/// Many guests connecting at once each get their own answer
#[tokio::test]
async fn test_concurrent_connects() {
    let relay = TestRelay::start().await;
    let host = relay.host().await;
    host.new_lobby(&duck()).await.unwrap();

    let mut guests = Vec::new();
    for _ in 0..8 {
        guests.push(relay.client().await);
    }

    let calls = guests.iter().enumerate().map(|(i, guest)| async move {
        let password = if i % 2 == 0 { Some("test") } else { Some("nope") };
        guest.connect_lobby(&connect_req("1", password)).await
    });
    let results = futures_util::future::join_all(calls).await;

    for (i, result) in results.into_iter().enumerate() {
        if i % 2 == 0 {
            assert_eq!(result.unwrap().payload, "webrtc offer");
        } else {
            assert!(matches!(result, Err(RelayError::NotAuthorized)));
        }
    }
}

// ============================================================================
// DISCOVERY
// ============================================================================

/// With a caller location, results come back nearest first
#[tokio::test]
async fn test_list_sorted_by_distance() {
    let relay = TestRelay::start().await;
    let host = relay.host().await;
    for (id, lat) in [("far", 20.0), ("near", 1.0), ("mid", 5.0)] {
        host.new_lobby(&Lobby {
            id: id.into(),
            location: Some(Location::new(lat, 0.0)),
            ..Lobby::default()
        })
        .await
        .unwrap();
    }

    let lobbies = host
        .list_lobbies(&ListLobbyRequest {
            location: Some(Location::new(0.0, 0.0)),
            ..ListLobbyRequest::default()
        })
        .await
        .unwrap();
    let ids: Vec<_> = lobbies.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec!["near", "mid", "far"]);
    assert!(lobbies.iter().all(|l| l.location.is_none() && l.distance > 0.0));
}

/// Lobbies in different services do not see or collide with each other
#[tokio::test]
async fn test_services_are_partitioned() {
    let relay = TestRelay::start().await;
    let alice = relay.host().await;
    let bob = relay.host().await;

    alice.new_lobby(&duck()).await.unwrap();
    bob.new_lobby(&Lobby {
        service: "chess".into(),
        ..duck()
    })
    .await
    .unwrap();

    let guest = relay.client().await;
    let chess = guest
        .list_lobbies(&ListLobbyRequest {
            service: "chess".into(),
            location: None,
        })
        .await
        .unwrap();
    assert_eq!(chess.len(), 1);
    assert_eq!(chess[0].service, "chess");

    let err = guest
        .connect_lobby(&ConnectLobbyRequest {
            service: "go".into(),
            ..connect_req("1", Some("test"))
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::NotFound));

    bob.close().await;
    relay.wait_for_lobby_count(1).await;
    assert_eq!(
        guest.list_lobbies(&ListLobbyRequest::default()).await.unwrap().len(),
        1
    );
}

/// Connecting to a path other than the relay's is refused
#[tokio::test]
async fn test_wrong_path_rejected() {
    let relay = TestRelay::start().await;
    let url = relay.url.replace("/ws", "/nope");
    let result = RelayClient::connect(&url).await;
    assert!(matches!(result, Err(RelayError::WebSocket(_))));
}
