use atlas_core::{CountryCatalog, Room};
use atlas_types::{Player, PlayerId};
use uuid::Uuid;

pub fn create_test_catalog() -> CountryCatalog {
    CountryCatalog::with_test_countries()
}

/// Room with the test catalog's France as the answer and two players.
pub fn create_standard_room() -> (Room, CountryCatalog, Vec<PlayerId>) {
    let catalog = create_test_catalog();
    let answer = catalog.get("FRA").unwrap().clone();
    let mut room = Room::new("123456".to_string(), answer);

    let mut ids = Vec::new();
    for (name, is_creator) in [("Alice", true), ("Bob", false)] {
        let id = Uuid::new_v4();
        room.add_player(id, name, is_creator, 10).unwrap();
        ids.push(id);
    }
    (room, catalog, ids)
}

#[allow(dead_code)]
pub fn find_player<'a>(room: &'a Room, id: PlayerId) -> &'a Player {
    room.players()
        .iter()
        .find(|p| p.id == id)
        .expect("player should be in room")
}
