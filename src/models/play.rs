use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;
use validator::Validate;

use super::actor::{Actor, ActorView};
use super::genre::Genre;
use crate::filters::PlayFilter;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Play {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// Path of the uploaded poster under the media root.
    pub image: Option<String>,
}

/// Genre row joined through `play_genres`.
#[derive(Debug, Clone, FromRow)]
pub struct PlayGenreRow {
    pub play_id: i64,
    pub id: i64,
    pub name: String,
}

/// Actor row joined through `play_actors`.
#[derive(Debug, Clone, FromRow)]
pub struct PlayActorRow {
    pub play_id: i64,
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
}

/// A play with its relations loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayWithRelations {
    pub play: Play,
    pub genres: Vec<Genre>,
    pub actors: Vec<Actor>,
}

impl PlayWithRelations {
    /// Attaches relation rows to their plays, keeping the order of `plays`.
    pub fn assemble(
        plays: Vec<Play>,
        genres: Vec<PlayGenreRow>,
        actors: Vec<PlayActorRow>,
    ) -> Vec<PlayWithRelations> {
        let mut genres_by_play: HashMap<i64, Vec<Genre>> = HashMap::new();
        for row in genres {
            genres_by_play
                .entry(row.play_id)
                .or_default()
                .push(Genre { id: row.id, name: row.name });
        }

        let mut actors_by_play: HashMap<i64, Vec<Actor>> = HashMap::new();
        for row in actors {
            actors_by_play.entry(row.play_id).or_default().push(Actor {
                id: row.id,
                first_name: row.first_name,
                last_name: row.last_name,
            });
        }

        plays
            .into_iter()
            .map(|play| PlayWithRelations {
                genres: genres_by_play.remove(&play.id).unwrap_or_default(),
                actors: actors_by_play.remove(&play.id).unwrap_or_default(),
                play,
            })
            .collect()
    }
}

impl Play {
    pub async fn list(pool: &sqlx::PgPool, filter: &PlayFilter) -> Result<Vec<PlayWithRelations>, sqlx::Error> {
        let plays = filter
            .select_query()
            .build_query_as::<Play>()
            .fetch_all(pool)
            .await?;
        Self::with_relations(pool, plays).await
    }

    pub async fn find(pool: &sqlx::PgPool, id: i64) -> Result<Option<PlayWithRelations>, sqlx::Error> {
        let play = sqlx::query_as::<_, Play>("SELECT id, title, description, image FROM plays WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        match play {
            Some(play) => Ok(Self::with_relations(pool, vec![play]).await?.pop()),
            None => Ok(None),
        }
    }

    pub async fn exists<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM plays WHERE id = $1)")
            .bind(id)
            .fetch_one(executor)
            .await
    }

    /// Loads genres and actors of `plays` with one query per relation.
    pub async fn with_relations(pool: &sqlx::PgPool, plays: Vec<Play>) -> Result<Vec<PlayWithRelations>, sqlx::Error> {
        if plays.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = plays.iter().map(|p| p.id).collect();

        let genres = sqlx::query_as::<_, PlayGenreRow>(
            "SELECT pg.play_id, g.id, g.name
             FROM play_genres pg JOIN genres g ON g.id = pg.genre_id
             WHERE pg.play_id = ANY($1)
             ORDER BY g.id",
        )
        .bind(&ids)
        .fetch_all(pool)
        .await?;

        let actors = sqlx::query_as::<_, PlayActorRow>(
            "SELECT pa.play_id, a.id, a.first_name, a.last_name
             FROM play_actors pa JOIN actors a ON a.id = pa.actor_id
             WHERE pa.play_id = ANY($1)
             ORDER BY a.id",
        )
        .bind(&ids)
        .fetch_all(pool)
        .await?;

        Ok(PlayWithRelations::assemble(plays, genres, actors))
    }

    /// Inserts the play and its relation links in one transaction.
    /// Relation ids must already be checked to exist.
    pub async fn create(pool: &sqlx::PgPool, new: &NewPlay) -> Result<Play, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let play = sqlx::query_as::<_, Play>(
            "INSERT INTO plays (title, description) VALUES ($1, $2) RETURNING id, title, description, image",
        )
        .bind(new.title.trim())
        .bind(&new.description)
        .fetch_one(&mut *tx)
        .await?;

        let genres = NewPlay::unique_ids(&new.genres);
        if !genres.is_empty() {
            sqlx::query("INSERT INTO play_genres (play_id, genre_id) SELECT $1, UNNEST($2::bigint[])")
                .bind(play.id)
                .bind(&genres)
                .execute(&mut *tx)
                .await?;
        }

        let actors = NewPlay::unique_ids(&new.actors);
        if !actors.is_empty() {
            sqlx::query("INSERT INTO play_actors (play_id, actor_id) SELECT $1, UNNEST($2::bigint[])")
                .bind(play.id)
                .bind(&actors)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(play)
    }

    pub async fn set_image(pool: &sqlx::PgPool, id: i64, image: &str) -> Result<Option<Play>, sqlx::Error> {
        sqlx::query_as::<_, Play>(
            "UPDATE plays SET image = $2 WHERE id = $1 RETURNING id, title, description, image",
        )
        .bind(id)
        .bind(image)
        .fetch_optional(pool)
        .await
    }
}

/// List shape: relations flattened to genre names and actor full names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayListView {
    pub id: i64,
    pub title: String,
    pub genres: Vec<String>,
    pub actors: Vec<String>,
    pub image: Option<String>,
}

impl From<PlayWithRelations> for PlayListView {
    fn from(p: PlayWithRelations) -> Self {
        PlayListView {
            id: p.play.id,
            title: p.play.title,
            genres: p.genres.into_iter().map(|g| g.name).collect(),
            actors: p.actors.iter().map(Actor::full_name).collect(),
            image: p.play.image,
        }
    }
}

/// Detail shape: nested genre and actor objects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayDetailView {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub genres: Vec<Genre>,
    pub actors: Vec<ActorView>,
    pub image: Option<String>,
}

impl From<PlayWithRelations> for PlayDetailView {
    fn from(p: PlayWithRelations) -> Self {
        PlayDetailView {
            id: p.play.id,
            title: p.play.title,
            description: p.play.description,
            genres: p.genres,
            actors: p.actors.into_iter().map(ActorView::from).collect(),
            image: p.play.image,
        }
    }
}

/// Response of the poster upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayImageView {
    pub id: i64,
    pub image: Option<String>,
}

impl From<Play> for PlayImageView {
    fn from(play: Play) -> Self {
        PlayImageView { id: play.id, image: play.image }
    }
}

/// Poster file name: slugified title plus a random suffix, keeping the
/// lowercased extension of the uploaded file.
pub fn image_file_name(title: &str, original: &str) -> String {
    let extension = std::path::Path::new(original)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();
    format!("{}-{}{}", slug::slugify(title), uuid::Uuid::new_v4(), extension)
}

/// Write shape: relations as primary keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayView {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub genres: Vec<i64>,
    pub actors: Vec<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewPlay {
    #[validate(length(min = 1, max = 255, message = "Ensure this field has between 1 and 255 characters."))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub genres: Vec<i64>,
    #[serde(default)]
    pub actors: Vec<i64>,
}

impl NewPlay {
    /// Relation ids with duplicates removed, first occurrence wins.
    pub fn unique_ids(ids: &[i64]) -> Vec<i64> {
        let mut seen = std::collections::HashSet::new();
        ids.iter().copied().filter(|id| seen.insert(*id)).collect()
    }
}
