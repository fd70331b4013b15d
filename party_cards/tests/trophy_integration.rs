//! Integration tests for trophies loaded from pack JSON and awarded at
//! the end of a game.

use party_cards::{
    GameSettings, Pack, PlayerId, Session, SessionEvent, Stage, game::Requirement,
};

const PACK: &str = r#"{
    "id": "trophy_test",
    "name": "Trophy Test",
    "cards": [
        { "id": "b_why", "content": { "en": "Why ____?" } },
        { "id": "w_0", "content": { "en": "zero" } },
        { "id": "w_1", "content": { "en": "one" } },
        { "id": "w_2", "content": { "en": "two" } },
        { "id": "w_3", "content": { "en": "three" } },
        { "id": "w_4", "content": { "en": "four" } },
        { "id": "w_5", "content": { "en": "five" } },
        { "id": "w_6", "content": { "en": "six" } },
        { "id": "w_7", "content": { "en": "seven" } },
        { "id": "w_8", "content": { "en": "eight" } },
        { "id": "w_9", "content": { "en": "nine" } },
        { "id": "w_10", "content": { "en": "ten" } },
        { "id": "w_11", "content": { "en": "eleven" } },
        { "id": "w_12", "content": { "en": "twelve" } },
        { "id": "w_13", "content": { "en": "thirteen" } },
        { "id": "w_14", "content": { "en": "fourteen" } },
        { "id": "w_15", "content": { "en": "fifteen" } },
        { "id": "x_oops", "content": { "en": "skipped" } }
    ],
    "trophies": [
        {
            "id": "champ",
            "name": { "en": "Champion" },
            "requirements": [{ "type": "win_proportion", "percent": 100 }]
        },
        {
            "id": "part_a",
            "trophy_class": "participation",
            "trophy_grade": 1,
            "requirements": [{ "type": "all", "requirements": [] }]
        },
        {
            "id": "part_b",
            "trophy_class": "participation",
            "trophy_grade": 1,
            "requirements": [{ "type": "all", "requirements": [] }]
        },
        {
            "id": "part_gold",
            "trophy_class": "Participation",
            "trophy_grade": 2,
            "requirements": [{ "type": "any", "requirements": [{ "type": "all", "requirements": [] }] }]
        },
        {
            "id": "lewd",
            "requirements": [{ "type": "card_proportion", "flags": ["lewd"] }]
        },
        {
            "id": "robot_food",
            "requirements": [{ "type": "lost_to_bot" }]
        }
    ]
}"#;

fn trophies_of(session: &Session, id: PlayerId) -> Vec<String> {
    session
        .player(id)
        .unwrap()
        .trophies()
        .iter()
        .map(|t| t.id.clone())
        .collect()
}

/// Plays one judged round and lets the round-end pause run out.
fn play_deciding_round(session: &mut Session) -> (PlayerId, PlayerId) {
    let judge = session.judge().unwrap().id();
    let players: Vec<(PlayerId, String)> = session
        .players()
        .iter()
        .filter(|p| p.id() != judge)
        .map(|p| (p.id(), p.hand()[0].id.clone()))
        .collect();
    for (id, card) in &players {
        session.play_cards(*id, &[card.clone()]).unwrap();
    }
    let winner = session.round_plays()[0].player;
    session.judge_cards(judge, 0).unwrap();
    assert!(session.round_end_elapsed(session.round()));
    (judge, winner)
}

#[test]
fn test_pack_parses_trophies() {
    let pack = Pack::from_json(PACK).unwrap();
    assert_eq!(pack.black_cards.len(), 1);
    assert_eq!(pack.white_cards.len(), 16);
    assert_eq!(pack.trophies.len(), 6);
    assert!(matches!(
        pack.trophies[4].requirements[0],
        Requirement::CardProportion(_)
    ));
}

#[test]
fn test_trophies_awarded_at_game_end() {
    let pack = Pack::from_json(PACK).unwrap();
    let settings = GameSettings {
        max_points: 1,
        hand_size: 4,
        ..GameSettings::default()
    };
    let mut session = Session::new(&[pack], settings);
    let ids: Vec<PlayerId> = ["ann", "ben", "cat"]
        .iter()
        .map(|name| session.create_player(Some(name), false, None).unwrap())
        .collect();
    session.drain_events();

    let (judge, winner) = play_deciding_round(&mut session);
    assert_eq!(session.stage(), Stage::GameEnd);
    assert_eq!(session.winners(), vec![winner]);
    let loser = *ids.iter().find(|id| **id != judge && **id != winner).unwrap();

    assert_eq!(trophies_of(&session, winner), vec!["champ", "part_gold"]);
    assert_eq!(trophies_of(&session, loser), vec!["part_gold"]);
    assert_eq!(trophies_of(&session, judge), vec!["part_gold"]);

    let awarded = session
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, SessionEvent::TrophyAwarded { .. }))
        .count();
    // part_a then part_gold for everyone, plus champ for the winner
    assert_eq!(awarded, 7);
}

#[test]
fn test_flagged_players_get_nothing_and_awards_reset() {
    let pack = Pack::from_json(PACK).unwrap();
    let settings = GameSettings {
        max_points: 1,
        hand_size: 4,
        ..GameSettings::default()
    };
    let mut session = Session::new(&[pack], settings);
    for name in ["ann", "ben", "cat"] {
        session.create_player(Some(name), false, None).unwrap();
    }
    let judge = session.judge().unwrap().id();
    session.set_asshole(judge, true).unwrap();

    play_deciding_round(&mut session);
    assert!(trophies_of(&session, judge).is_empty());

    assert!(session.game_end_elapsed(session.game_number()));
    assert_eq!(session.stage(), Stage::RoundInProgress);
    assert_eq!(session.round(), 1);
    for player in session.players() {
        assert!(player.trophies().is_empty());
        assert_eq!(player.score(), 0);
        assert!(player.history().is_empty());
    }
}

#[test]
fn test_stale_timers_are_ignored() {
    let pack = Pack::from_json(PACK).unwrap();
    let settings = GameSettings {
        hand_size: 4,
        ..GameSettings::default()
    };
    let mut session = Session::new(&[pack], settings);
    for name in ["ann", "ben", "cat"] {
        session.create_player(Some(name), false, None).unwrap();
    }
    assert!(!session.round_end_elapsed(session.round()));
    assert!(!session.game_end_elapsed(session.game_number()));
    assert_eq!(session.stage(), Stage::RoundInProgress);
}
