
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use atlas_core::CleanupPolicy;
use atlas_types::{GameError, ServerMessage};
use test_helpers::*;
use uuid::Uuid;

fn short_reclaim_policy() -> CleanupPolicy {
    CleanupPolicy::new(
        Duration::from_secs(300),
        Duration::from_millis(100),
        Duration::from_secs(7200),
    )
}

#[tokio::test]
async fn test_create_and_join_room() {
    let setup = TestServerSetup::new();
    let (alice, _alice_rx) = setup.connect().await;
    let (bob, _bob_rx) = setup.connect().await;

    let (code, answer) = setup.create_room(alice, "Alice").await;
    assert_eq!(code.len(), 6);
    assert!(setup.catalog.contains(&answer.id));

    let snapshot = setup.join_room(&code, bob, "Bob").await;
    assert_eq!(snapshot.code, code);
    assert_eq!(snapshot.players.len(), 2);
    assert!(snapshot.players[0].is_creator);
    assert!(!snapshot.players[1].is_creator);
    assert!(!snapshot.is_over);
}

#[tokio::test]
async fn test_join_unknown_room_fails() {
    let setup = TestServerSetup::new();
    let (bob, _rx) = setup.connect().await;

    let result = setup.engine.join_room("000000", bob, "Bob").await;
    assert_eq!(
        result.unwrap_err(),
        GameError::RoomNotFound {
            code: "000000".to_string()
        }
    );
}

#[tokio::test]
async fn test_join_notifies_other_members_only() {
    let setup = TestServerSetup::new();
    let (alice, mut alice_rx) = setup.connect().await;
    let (bob, mut bob_rx) = setup.connect().await;

    let (code, _) = setup.create_room(alice, "Alice").await;
    setup.join_room(&code, bob, "Bob").await;

    let joined_seen_by_alice = drain_count(&mut alice_rx, |m| {
        matches!(m, ServerMessage::PlayerJoined { player_name, .. } if player_name == "Bob")
    });
    assert_eq!(joined_seen_by_alice, 1);

    // The joiner gets the snapshot from the handler, not the broadcast
    let joined_seen_by_bob =
        drain_count(&mut bob_rx, |m| matches!(m, ServerMessage::PlayerJoined { .. }));
    assert_eq!(joined_seen_by_bob, 0);
}

#[tokio::test]
async fn test_rejoin_preserves_score() {
    let setup = TestServerSetup::new();
    let (alice, _rx) = setup.connect().await;
    let (code, answer) = setup.create_room(alice, "Alice").await;

    let misses = setup.misses(&answer, 1);
    setup
        .engine
        .submit_guess(&code, alice, &misses[0])
        .await
        .unwrap();

    let snapshot = setup.join_room(&code, alice, "Alice").await;
    assert_eq!(snapshot.players.len(), 1);
    assert_eq!(snapshot.players[0].score, 1);
}

#[tokio::test]
async fn test_guess_increments_score_and_broadcasts() {
    let setup = TestServerSetup::new();
    let (alice, mut alice_rx) = setup.connect().await;
    let (bob, mut bob_rx) = setup.connect().await;

    let (code, answer) = setup.create_room(alice, "Alice").await;
    setup.join_room(&code, bob, "Bob").await;
    drain_count(&mut alice_rx, |_| true);
    drain_count(&mut bob_rx, |_| true);

    let misses = setup.misses(&answer, 1);
    let miss = misses[0].as_str();
    let outcome = setup.engine.submit_guess(&code, alice, miss).await.unwrap();
    assert!(!outcome.became_over);
    assert_eq!(outcome.guess.country, miss);

    // Both members see the guess and the refreshed leaderboard
    for rx in [&mut alice_rx, &mut bob_rx] {
        let mut saw_guess = 0;
        let mut saw_leaderboard = 0;
        while let Ok(message) = rx.try_recv() {
            match message {
                ServerMessage::NewGuess { guess } => {
                    assert_eq!(&guess.country, miss);
                    saw_guess += 1;
                }
                ServerMessage::LeaderboardUpdate { leaderboard } => {
                    assert_eq!(leaderboard[0].score, 1);
                    saw_leaderboard += 1;
                }
                other => panic!("unexpected message {:?}", other),
            }
        }
        assert_eq!(saw_guess, 1);
        assert_eq!(saw_leaderboard, 1);
    }

    let snapshot = setup.engine.room_snapshot(&code).await.unwrap();
    assert_eq!(snapshot.players[0].score, 1);
    assert_eq!(snapshot.players[0].guessed.len(), 1);
}

#[tokio::test]
async fn test_duplicate_guess_leaves_room_unchanged() {
    let setup = TestServerSetup::new();
    let (alice, _rx) = setup.connect().await;
    let (code, answer) = setup.create_room(alice, "Alice").await;

    let misses = setup.misses(&answer, 1);
    let miss = misses[0].as_str();
    setup.engine.submit_guess(&code, alice, miss).await.unwrap();
    let before = setup.engine.room_snapshot(&code).await.unwrap();

    let err = setup
        .engine
        .submit_guess(&code, alice, miss)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        GameError::DuplicateGuess {
            country: miss.to_string()
        }
    );

    let after = setup.engine.room_snapshot(&code).await.unwrap();
    assert_eq!(
        serde_json::to_value(&after).unwrap(),
        serde_json::to_value(&before).unwrap()
    );
}

#[tokio::test]
async fn test_guess_from_non_member_fails() {
    let setup = TestServerSetup::new();
    let (alice, _rx) = setup.connect().await;
    let (code, _) = setup.create_room(alice, "Alice").await;

    let err = setup
        .engine
        .submit_guess(&code, Uuid::new_v4(), "FRA")
        .await
        .unwrap_err();
    assert_eq!(err, GameError::UnknownPlayer);
}

#[tokio::test]
async fn test_unknown_country_fails() {
    let setup = TestServerSetup::new();
    let (alice, _rx) = setup.connect().await;
    let (code, _) = setup.create_room(alice, "Alice").await;

    let err = setup
        .engine
        .submit_guess(&code, alice, "XYZ")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        GameError::InvalidCountry {
            country: "XYZ".to_string()
        }
    );
}

#[tokio::test]
async fn test_all_players_winning_ends_game_exactly_once() {
    let setup = TestServerSetup::new();
    let (alice, mut alice_rx) = setup.connect().await;
    let (bob, _bob_rx) = setup.connect().await;
    let (carol, _carol_rx) = setup.connect().await;

    let (code, answer) = setup.create_room(alice, "Alice").await;
    setup.join_room(&code, bob, "Bob").await;
    setup.join_room(&code, carol, "Carol").await;

    let first = setup
        .engine
        .submit_guess(&code, alice, &answer.id)
        .await
        .unwrap();
    assert!(!first.became_over);
    let second = setup
        .engine
        .submit_guess(&code, bob, &answer.id)
        .await
        .unwrap();
    assert!(!second.became_over);
    let third = setup
        .engine
        .submit_guess(&code, carol, &answer.id)
        .await
        .unwrap();
    assert!(third.became_over);

    assert_eq!(drain_count(&mut alice_rx, is_game_over), 1);
    assert!(setup.engine.room_snapshot(&code).await.unwrap().is_over);

    let err = setup
        .engine
        .submit_guess(&code, alice, "FRA")
        .await
        .unwrap_err();
    assert_eq!(err, GameError::GameAlreadyOver);
}

#[tokio::test]
async fn test_end_game_requires_creator() {
    let setup = TestServerSetup::new();
    let (alice, _alice_rx) = setup.connect().await;
    let (bob, _bob_rx) = setup.connect().await;

    let (code, _) = setup.create_room(alice, "Alice").await;
    setup.join_room(&code, bob, "Bob").await;

    let err = setup.engine.end_game(&code, bob).await.unwrap_err();
    assert_eq!(err, GameError::NotCreator);
    assert!(!setup.engine.room_snapshot(&code).await.unwrap().is_over);
}

#[tokio::test]
async fn test_end_game_by_creator_broadcasts_once() {
    let setup = TestServerSetup::new();
    let (alice, _alice_rx) = setup.connect().await;
    let (bob, mut bob_rx) = setup.connect().await;

    let (code, _) = setup.create_room(alice, "Alice").await;
    setup.join_room(&code, bob, "Bob").await;

    setup.engine.end_game(&code, alice).await.unwrap();
    // A second end is idempotent and silent
    setup.engine.end_game(&code, alice).await.unwrap();

    let over_messages = drain_count(&mut bob_rx, |m| match m {
        ServerMessage::GameOver {
            ended_by_creator,
            winner,
            ..
        } => {
            assert!(ended_by_creator);
            assert!(winner.is_none());
            true
        }
        _ => false,
    });
    assert_eq!(over_messages, 1);
    assert!(setup.engine.room_snapshot(&code).await.unwrap().is_over);
}

#[tokio::test]
async fn test_leaderboard_ranks_winners_by_fewest_guesses() {
    let setup = TestServerSetup::new();
    let (a, _a_rx) = setup.connect().await;
    let (b, _b_rx) = setup.connect().await;
    let (c, _c_rx) = setup.connect().await;

    let (code, answer) = setup.create_room(a, "A").await;
    setup.join_room(&code, b, "B").await;
    setup.join_room(&code, c, "C").await;

    let misses = setup.misses(&answer, 7);

    // A: wins in 3 guesses
    setup.engine.submit_guess(&code, a, &misses[0]).await.unwrap();
    setup.engine.submit_guess(&code, a, &misses[1]).await.unwrap();
    setup.engine.submit_guess(&code, a, &answer.id).await.unwrap();
    // B: wins in 2 guesses
    setup.engine.submit_guess(&code, b, &misses[0]).await.unwrap();
    setup.engine.submit_guess(&code, b, &answer.id).await.unwrap();
    // C: 5 guesses, no win
    for miss in misses.iter().take(5) {
        setup.engine.submit_guess(&code, c, miss).await.unwrap();
    }

    let names: Vec<String> = setup
        .engine
        .leaderboard(&code)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.display_name)
        .collect();
    assert_eq!(names, vec!["B", "A", "C"]);
}

#[tokio::test]
async fn test_removing_last_player_deletes_room_immediately() {
    let setup = TestServerSetup::new();
    let (alice, _rx) = setup.connect().await;
    let (code, _) = setup.create_room(alice, "Alice").await;

    setup.engine.remove_player(&code, alice).await;

    assert!(setup.engine.room_snapshot(&code).await.is_none());
    assert_eq!(setup.engine.active_rooms(), 0);
}

#[tokio::test]
async fn test_disconnect_removes_player_and_notifies() {
    let setup = TestServerSetup::new();
    let (alice, mut alice_rx) = setup.connect().await;
    let (bob, _bob_rx) = setup.connect().await;

    let (code, _) = setup.create_room(alice, "Alice").await;
    setup.join_room(&code, bob, "Bob").await;
    drain_count(&mut alice_rx, |_| true);

    setup.engine.disconnect(bob).await;

    let left_messages = drain_count(&mut alice_rx, |m| {
        matches!(m, ServerMessage::PlayerLeft { players, .. } if players.len() == 1)
    });
    assert_eq!(left_messages, 1);

    // Disconnecting someone who is in no room is a no-op
    setup.engine.disconnect(Uuid::new_v4()).await;

    setup.engine.disconnect(alice).await;
    assert_eq!(setup.engine.active_rooms(), 0);
}

#[tokio::test]
async fn test_concurrent_room_creations_get_unique_codes() {
    let setup = Arc::new(TestServerSetup::new());
    let mut handles = Vec::new();

    for i in 0..30 {
        let setup = Arc::clone(&setup);
        handles.push(tokio::spawn(async move {
            let (player, _rx) = setup.connect().await;
            let (code, _) = setup
                .engine
                .create_room(player, &format!("Player{}", i))
                .await
                .unwrap();
            code
        }));
    }

    let mut codes = HashSet::new();
    for handle in handles {
        codes.insert(handle.await.unwrap());
    }
    assert_eq!(codes.len(), 30);
    assert_eq!(setup.engine.active_rooms(), 30);
}

#[tokio::test]
async fn test_room_capacity_enforced() {
    let setup = TestServerSetup::with_policy_and_capacity(CleanupPolicy::default(), 2);
    let (alice, _a) = setup.connect().await;
    let (bob, _b) = setup.connect().await;
    let (carol, _c) = setup.connect().await;

    let (code, _) = setup.create_room(alice, "Alice").await;
    setup.join_room(&code, bob, "Bob").await;

    let err = setup
        .engine
        .join_room(&code, carol, "Carol")
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::RoomFull { .. }));
}

#[tokio::test]
async fn test_room_reclaimed_after_post_game_delay() {
    let setup = TestServerSetup::with_policy(short_reclaim_policy());
    let (alice, _rx) = setup.connect().await;
    let (code, answer) = setup.create_room(alice, "Alice").await;

    let outcome = setup
        .engine
        .submit_guess(&code, alice, &answer.id)
        .await
        .unwrap();
    assert!(outcome.became_over);

    // Still visible during the linger window
    assert!(setup.engine.room_snapshot(&code).await.is_some());

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(setup.engine.room_snapshot(&code).await.is_none());
}

#[tokio::test]
async fn test_room_reclaimed_at_max_age_without_activity() {
    let policy = CleanupPolicy::new(
        Duration::from_secs(300),
        Duration::from_secs(30),
        Duration::from_millis(100),
    );
    let setup = TestServerSetup::with_policy(policy);
    let (alice, _rx) = setup.connect().await;
    let (code, _) = setup.create_room(alice, "Alice").await;

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(setup.engine.room_snapshot(&code).await.is_none());
}

#[tokio::test]
async fn test_grace_deadline_ends_game_without_further_activity() {
    let policy = CleanupPolicy::new(
        Duration::from_millis(100),
        Duration::from_secs(3600),
        Duration::from_secs(7200),
    );
    let setup = TestServerSetup::with_policy(policy);
    let (alice, _alice_rx) = setup.connect().await;
    let (bob, mut bob_rx) = setup.connect().await;

    let (code, answer) = setup.create_room(alice, "Alice").await;
    setup.join_room(&code, bob, "Bob").await;

    setup
        .engine
        .submit_guess(&code, alice, &answer.id)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(setup.engine.room_snapshot(&code).await.unwrap().is_over);
    assert_eq!(drain_count(&mut bob_rx, is_game_over), 1);
}

#[tokio::test]
async fn test_empty_room_cancels_pending_cleanup() {
    let setup = TestServerSetup::with_policy(short_reclaim_policy());
    let (alice, _rx) = setup.connect().await;
    let (code, answer) = setup.create_room(alice, "Alice").await;

    setup
        .engine
        .submit_guess(&code, alice, &answer.id)
        .await
        .unwrap();
    // Leaving empties the room before the cleanup timer fires
    setup.engine.remove_player(&code, alice).await;

    assert!(setup.engine.room_snapshot(&code).await.is_none());
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(setup.engine.active_rooms(), 0);
}
