//! Sample-room seeding for demo and test deployments.

use chrono::{Duration, Utc};

use crate::registry::{CreateRoomParams, RoomRegistry};

/// The fixed set of public sample rooms.
fn sample_rooms() -> Vec<(&'static str, &'static str, &'static str)> {
    vec![
        (
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "Friday Night Horror Marathon",
            "Horror",
        ),
        (
            "https://www.youtube.com/watch?v=example2",
            "Rom-Com Evening",
            "Romance",
        ),
        (
            "https://www.youtube.com/watch?v=example3",
            "Action Movie Night",
            "Action",
        ),
        (
            "https://www.youtube.com/watch?v=example4",
            "Comedy Central",
            "Comedy",
        ),
        (
            "https://www.youtube.com/watch?v=example5",
            "Thriller Thursday",
            "Thriller",
        ),
        (
            "https://www.youtube.com/watch?v=example6",
            "Drama Club",
            "Drama",
        ),
        (
            "https://www.youtube.com/watch?v=example7",
            "Weekend Movie Fest",
            "Action",
        ),
        (
            "https://www.youtube.com/watch?v=example8",
            "Late Night Cinema",
            "Horror",
        ),
    ]
}

/// Seed the registry with public sample rooms. Creation times are staggered
/// backwards so the newest-first listing order matches the declaration
/// order above.
pub fn seed_rooms(registry: &RoomRegistry) {
    let now = Utc::now();
    let mut seeded = 0;

    for (index, (movie_link, name, genre)) in sample_rooms().into_iter().enumerate() {
        let params = CreateRoomParams {
            movie_link: Some(movie_link.to_string()),
            room_name: Some(name.to_string()),
            genre_tag: Some(genre.to_string()),
            ..CreateRoomParams::default()
        };
        match registry.create_room_at(params, now - Duration::minutes(index as i64)) {
            Ok(room_id) => {
                tracing::info!(room_id = %room_id, name, genre, "seeded sample room");
                seeded += 1;
            }
            Err(e) => tracing::warn!(name, error = %e, "failed to seed sample room"),
        }
    }

    tracing::info!(seeded, "sample room seeding complete");
}
