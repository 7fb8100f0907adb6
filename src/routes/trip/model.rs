use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::validation::{Checker, FieldError, Validate};

const MAX_LIMIT: i64 = 100;
// Keeps `(page - 1) * limit` within i64 for any accepted limit.
const MAX_PAGE: i64 = i64::MAX / MAX_LIMIT;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "trip_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    #[default]
    Planning,
    Booked,
    Completed,
    Cancelled,
}

impl FromStr for TripStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planning" => Ok(TripStatus::Planning),
            "booked" => Ok(TripStatus::Booked),
            "completed" => Ok(TripStatus::Completed),
            "cancelled" => Ok(TripStatus::Cancelled),
            _ => Err(()),
        }
    }
}

pub const INVALID_STATUS: &str =
    "Invalid enum value. Expected 'planning' | 'booked' | 'completed' | 'cancelled'";

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TripStop {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub trip_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub budget: Option<f64>,
    pub status: TripStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub destinations: Vec<TripStop>,
}

#[derive(Debug, Deserialize)]
struct StopBody {
    name: Option<String>,
    description: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripBody {
    title: Option<String>,
    description: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    budget: Option<f64>,
    status: Option<String>,
    destinations: Option<Vec<StopBody>>,
}

#[derive(Debug)]
pub struct StopInput {
    pub name: String,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

/// Validated body shared by create and update; update replaces every field.
#[derive(Debug)]
pub struct TripInput {
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub budget: Option<f64>,
    pub status: TripStatus,
    pub destinations: Vec<StopInput>,
}

impl Validate for TripInput {
    type Raw = TripBody;

    fn validate(raw: Self::Raw) -> Result<Self, Vec<FieldError>> {
        let mut c = Checker::new();
        let title = c.text("title", raw.title, 1, 100);
        let description = c.optional_text("description", raw.description, 2000);
        let start_date = c.date("startDate", raw.start_date);
        let end_date = c.date("endDate", raw.end_date);
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if end < start {
                c.push("endDate", "End date must not be before start date");
            }
        }
        let budget = c.non_negative("budget", raw.budget);
        let status = match raw.status {
            None => TripStatus::default(),
            Some(s) => s.trim().parse().unwrap_or_else(|_| {
                c.push("status", INVALID_STATUS);
                TripStatus::default()
            }),
        };

        let mut destinations = Vec::new();
        for (i, stop) in raw.destinations.unwrap_or_default().into_iter().enumerate() {
            destinations.push(StopInput {
                name: c.text(&format!("destinations.{}.name", i), stop.name, 1, 100),
                description: c.optional_text(
                    &format!("destinations.{}.description", i),
                    stop.description,
                    2000,
                ),
                date: c.optional_date(&format!("destinations.{}.date", i), stop.date),
            });
        }

        match (start_date, end_date) {
            (Some(start_date), Some(end_date)) => c.finish(TripInput {
                title,
                description,
                start_date,
                end_date,
                budget,
                status,
                destinations,
            }),
            // Both dates were already reported.
            _ => Err(c.finish(()).err().unwrap_or_default()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripListQuery {
    pub status: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl TripListQuery {
    pub fn paging(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).clamp(1, MAX_PAGE);
        let limit = self.limit.unwrap_or(10).clamp(1, MAX_LIMIT);
        (page, limit)
    }

    /// Column to sort by; unknown names fall back to the start date.
    fn sort_column(&self) -> &'static str {
        match self.sort_by.as_deref() {
            Some("endDate") => "end_date",
            Some("createdAt") => "created_at",
            Some("title") => "title",
            Some("budget") => "budget",
            _ => "start_date",
        }
    }

    fn direction(&self) -> &'static str {
        match self.order.as_deref() {
            Some(o) if o.eq_ignore_ascii_case("asc") => "ASC",
            _ => "DESC",
        }
    }

    fn status_filter(&self) -> Option<Result<TripStatus, ()>> {
        self.status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("all"))
            .map(str::parse)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPage {
    pub trips: Vec<Trip>,
    pub total: i64,
    pub pages: i64,
    pub current_page: i64,
}

/// Outcome of listing: an unknown status filter is a client error, not an empty page.
pub enum TripList {
    Page(TripPage),
    InvalidStatus,
}

const COLUMNS: &str = "id, user_id, title, description, start_date, end_date, budget, status, created_at, updated_at";

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, user_id: Uuid, status: Option<TripStatus>) {
    qb.push(" WHERE user_id = ").push_bind(user_id);
    if let Some(status) = status {
        qb.push(" AND status = ").push_bind(status);
    }
}

async fn insert_stops(
    conn: &mut PgConnection,
    trip_id: Uuid,
    stops: &[StopInput],
) -> Result<Vec<TripStop>, sqlx::Error> {
    let mut inserted = Vec::with_capacity(stops.len());
    for (position, stop) in stops.iter().enumerate() {
        let row = sqlx::query_as::<_, TripStop>(
            r#"
            INSERT INTO trip_destinations (id, trip_id, name, description, date, position)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, trip_id, name, description, date, position
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(trip_id)
        .bind(&stop.name)
        .bind(&stop.description)
        .bind(stop.date)
        .bind(position as i32)
        .fetch_one(&mut *conn)
        .await?;
        inserted.push(row);
    }
    Ok(inserted)
}

async fn attach_stops(pool: &PgPool, trips: &mut [Trip]) -> Result<(), sqlx::Error> {
    if trips.is_empty() {
        return Ok(());
    }
    let ids: Vec<Uuid> = trips.iter().map(|t| t.id).collect();
    let stops = sqlx::query_as::<_, TripStop>(
        r#"
        SELECT id, trip_id, name, description, date, position
        FROM trip_destinations
        WHERE trip_id = ANY($1)
        ORDER BY position ASC
        "#,
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let mut by_trip: HashMap<Uuid, Vec<TripStop>> = HashMap::new();
    for stop in stops {
        by_trip.entry(stop.trip_id).or_default().push(stop);
    }
    for trip in trips.iter_mut() {
        trip.destinations = by_trip.remove(&trip.id).unwrap_or_default();
    }
    Ok(())
}

impl Trip {
    pub async fn list(
        pool: &PgPool,
        user_id: Uuid,
        query: &TripListQuery,
    ) -> Result<TripList, sqlx::Error> {
        let status = match query.status_filter() {
            Some(Err(())) => return Ok(TripList::InvalidStatus),
            Some(Ok(status)) => Some(status),
            None => None,
        };
        let (page, limit) = query.paging();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM trips");
        push_filters(&mut count, user_id, status);
        let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM trips", COLUMNS));
        push_filters(&mut select, user_id, status);
        select
            .push(format!(
                " ORDER BY {} {} LIMIT ",
                query.sort_column(),
                query.direction()
            ))
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind((page - 1) * limit);
        let mut trips: Vec<Trip> = select.build_query_as().fetch_all(pool).await?;
        attach_stops(pool, &mut trips).await?;

        Ok(TripList::Page(TripPage {
            trips,
            total,
            pages: (total + limit - 1) / limit,
            current_page: page,
        }))
    }

    pub async fn find(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let trip = sqlx::query_as::<_, Trip>(&format!(
            "SELECT {} FROM trips WHERE id = $1 AND user_id = $2",
            COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        let Some(trip) = trip else {
            return Ok(None);
        };
        let mut trips = [trip];
        attach_stops(pool, &mut trips).await?;
        let [trip] = trips;
        Ok(Some(trip))
    }

    pub async fn create(pool: &PgPool, user_id: Uuid, input: TripInput) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let mut trip = sqlx::query_as::<_, Trip>(&format!(
            r#"
            INSERT INTO trips (id, user_id, title, description, start_date, end_date, budget, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.budget)
        .bind(input.status)
        .fetch_one(&mut *tx)
        .await?;
        trip.destinations = insert_stops(&mut tx, trip.id, &input.destinations).await?;

        tx.commit().await?;
        Ok(trip)
    }

    /// Replaces the trip and its stop list. `None` when the caller owns no such trip.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
        input: TripInput,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let trip = sqlx::query_as::<_, Trip>(&format!(
            r#"
            UPDATE trips
            SET title = $3, description = $4, start_date = $5, end_date = $6,
                budget = $7, status = $8, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.budget)
        .bind(input.status)
        .fetch_optional(&mut *tx)
        .await?;

        // Dropping the transaction rolls it back.
        let Some(mut trip) = trip else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM trip_destinations WHERE trip_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        trip.destinations = insert_stops(&mut tx, id, &input.destinations).await?;

        tx.commit().await?;
        Ok(Some(trip))
    }

    pub async fn delete(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM trips WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
