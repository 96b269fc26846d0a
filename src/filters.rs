//! Query-string filters for list endpoints.
//!
//! Raw query parameters arrive as strings (`?genres=1,2`), get parsed into
//! typed filters here, and are then rendered into SQL with `QueryBuilder`
//! so every value is a bind parameter.

use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};

use crate::error::ApiError;

/// Parses a comma-separated id list such as `"2,5"`. Blank items are
/// skipped, anything else that is not an integer is an error.
pub fn parse_ids(raw: &str) -> Result<Vec<i64>, String> {
    let mut ids = Vec::new();
    for item in raw.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let id = item
            .parse::<i64>()
            .map_err(|_| format!("'{item}' is not a valid integer id"))?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

fn ids_param(name: &str, raw: Option<&str>) -> Result<Vec<i64>, ApiError> {
    match raw {
        Some(raw) => parse_ids(raw).map_err(|msg| ApiError::field(name, msg)),
        None => Ok(Vec::new()),
    }
}

/// Escapes `%`, `_` and `\` so user text matches literally inside `ILIKE`.
pub fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[derive(Debug, Default, Deserialize)]
pub struct PlayQuery {
    pub title: Option<String>,
    pub genres: Option<String>,
    pub actors: Option<String>,
}

/// `title` is a case-insensitive substring; `genres`/`actors` match plays
/// having at least one of the ids. Parameters combine with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayFilter {
    pub title: Option<String>,
    pub genres: Vec<i64>,
    pub actors: Vec<i64>,
}

impl TryFrom<PlayQuery> for PlayFilter {
    type Error = ApiError;

    fn try_from(q: PlayQuery) -> Result<Self, Self::Error> {
        Ok(PlayFilter {
            title: q.title.filter(|t| !t.is_empty()),
            genres: ids_param("genres", q.genres.as_deref())?,
            actors: ids_param("actors", q.actors.as_deref())?,
        })
    }
}

impl PlayFilter {
    /// Stable key for caching the filtered list.
    pub fn cache_key(&self) -> String {
        let join = |ids: &[i64]| ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
        format!(
            "title={}&genres={}&actors={}",
            self.title.as_deref().unwrap_or_default().to_lowercase(),
            join(&self.genres),
            join(&self.actors)
        )
    }

    /// `SELECT id, title, description FROM plays p WHERE ...`. The relation
    /// filters use `EXISTS` so a play matching several ids appears once.
    pub fn select_query(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT p.id, p.title, p.description, p.image FROM plays p WHERE TRUE");

        if let Some(title) = &self.title {
            qb.push(" AND p.title ILIKE ");
            qb.push_bind(like_pattern(title));
        }
        if !self.genres.is_empty() {
            qb.push(" AND EXISTS (SELECT 1 FROM play_genres pg WHERE pg.play_id = p.id AND pg.genre_id = ANY(");
            qb.push_bind(self.genres.clone());
            qb.push("))");
        }
        if !self.actors.is_empty() {
            qb.push(" AND EXISTS (SELECT 1 FROM play_actors pa WHERE pa.play_id = p.id AND pa.actor_id = ANY(");
            qb.push_bind(self.actors.clone());
            qb.push("))");
        }
        qb.push(" ORDER BY p.id");
        qb
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PerformanceQuery {
    pub date: Option<String>,
    pub play: Option<String>,
}

/// `date` (YYYY-MM-DD) matches the calendar day of `show_time`; `play` is
/// a play id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceFilter {
    pub date: Option<NaiveDate>,
    pub play: Option<i64>,
}

impl TryFrom<PerformanceQuery> for PerformanceFilter {
    type Error = ApiError;

    fn try_from(q: PerformanceQuery) -> Result<Self, Self::Error> {
        let date = match q.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(d) => Some(NaiveDate::parse_from_str(d, "%Y-%m-%d").map_err(|_| {
                ApiError::field("date", "Date has wrong format. Use YYYY-MM-DD.")
            })?),
            None => None,
        };
        let play = match q.play.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) => Some(
                p.parse::<i64>()
                    .map_err(|_| ApiError::field("play", "A valid integer is required."))?,
            ),
            None => None,
        };
        Ok(PerformanceFilter { date, play })
    }
}

impl PerformanceFilter {
    pub fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(date) = self.date {
            qb.push(" AND pf.show_time::date = ");
            qb.push_bind(date);
        }
        if let Some(play) = self.play {
            qb.push(" AND pf.play_id = ");
            qb.push_bind(play);
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// Page-number pagination, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    pub fn from_query(q: &PageQuery, size: u32) -> Result<Self, ApiError> {
        let number = match q.page.as_deref() {
            None | Some("") => 1,
            Some("last") => u32::MAX,
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n >= 1)
                .ok_or(ApiError::NotFound)?,
        };
        Ok(Page { number, size })
    }

    /// Resolves `last` and rejects pages past the end (page 1 always exists).
    pub fn clamp_to(self, count: i64) -> Result<Self, ApiError> {
        let pages = self.total_pages(count);
        if self.number == u32::MAX {
            return Ok(Page { number: pages, ..self });
        }
        if self.number > pages {
            return Err(ApiError::NotFound);
        }
        Ok(self)
    }

    pub fn total_pages(&self, count: i64) -> u32 {
        let size = i64::from(self.size);
        let pages = (count.max(0) + size - 1) / size;
        u32::try_from(pages.max(1)).unwrap_or(u32::MAX)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.number.saturating_sub(1)) * i64::from(self.size)
    }

    /// `(previous, next)` links relative to `path`.
    pub fn links(&self, path: &str, count: i64) -> (Option<String>, Option<String>) {
        let previous = match self.number {
            0 | 1 => None,
            2 => Some(path.to_string()),
            n => Some(format!("{path}?page={}", n - 1)),
        };
        let next = (self.number < self.total_pages(count))
            .then(|| format!("{path}?page={}", self.number + 1));
        (previous, next)
    }
}
