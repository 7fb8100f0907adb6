use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::validation::{Checker, FieldError, Validate};

const MAX_LIMIT: i64 = 100;
// Keeps `(page - 1) * limit` within i64 for any accepted limit.
const MAX_PAGE: i64 = i64::MAX / MAX_LIMIT;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, FromRow)]
struct DestinationRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    category: Option<String>,
    price_range: Option<String>,
    image: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<Location>,
    pub category: Option<String>,
    pub price_range: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DestinationRow> for Destination {
    fn from(row: DestinationRow) -> Self {
        let location = match (row.latitude, row.longitude) {
            (Some(latitude), Some(longitude)) => Some(Location {
                latitude,
                longitude,
            }),
            _ => None,
        };
        Destination {
            id: row.id,
            name: row.name,
            description: row.description,
            location,
            category: row.category,
            price_range: row.price_range,
            image: row.image,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LocationBody {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationBody {
    name: Option<String>,
    description: Option<String>,
    location: Option<LocationBody>,
    category: Option<String>,
    price_range: Option<String>,
    image: Option<String>,
}

/// Validated body shared by create and update.
#[derive(Debug)]
pub struct DestinationInput {
    pub name: String,
    pub description: Option<String>,
    pub location: Option<Location>,
    pub category: Option<String>,
    pub price_range: Option<String>,
    pub image: Option<String>,
}

impl Validate for DestinationInput {
    type Raw = DestinationBody;

    fn validate(raw: Self::Raw) -> Result<Self, Vec<FieldError>> {
        let mut c = Checker::new();
        let name = c.text("name", raw.name, 2, 100);
        let description = c.optional_text("description", raw.description, 2000);
        let location = raw.location.map(|loc| Location {
            latitude: c.range("location.latitude", loc.latitude, -90.0, 90.0),
            longitude: c.range("location.longitude", loc.longitude, -180.0, 180.0),
        });
        let category = c.optional_text("category", raw.category, 50);
        let price_range = c.optional_text("priceRange", raw.price_range, 50);
        let image = c.url("image", raw.image);

        c.finish(DestinationInput {
            name,
            description,
            location,
            category,
            price_range,
            image,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub price_range: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ListQuery {
    /// `(page, limit)`, both at least one; `limit` is capped at [`MAX_LIMIT`].
    pub fn paging(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).clamp(1, MAX_PAGE);
        let limit = self.limit.unwrap_or(10).clamp(1, MAX_LIMIT);
        (page, limit)
    }
}

// "All" is what the catalog filter UI sends for "no filter".
fn filter_value(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, query: &'a ListQuery) {
    qb.push(" WHERE TRUE");
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(category) = filter_value(&query.category) {
        qb.push(" AND category = ").push_bind(category);
    }
    if let Some(price_range) = filter_value(&query.price_range) {
        qb.push(" AND price_range = ").push_bind(price_range);
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationPage {
    pub destinations: Vec<Destination>,
    pub total: i64,
    pub pages: i64,
    pub current_page: i64,
}

impl DestinationPage {
    pub fn new(destinations: Vec<Destination>, total: i64, page: i64, limit: i64) -> Self {
        DestinationPage {
            destinations,
            total,
            pages: (total + limit - 1) / limit,
            current_page: page,
        }
    }
}

const COLUMNS: &str = "id, name, description, latitude, longitude, category, price_range, image, created_at, updated_at";

impl Destination {
    pub async fn list(pool: &PgPool, query: &ListQuery) -> Result<DestinationPage, sqlx::Error> {
        let (page, limit) = query.paging();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM destinations");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM destinations", COLUMNS));
        push_filters(&mut select, query);
        select
            .push(" ORDER BY name ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind((page - 1) * limit);
        let rows: Vec<DestinationRow> = select.build_query_as().fetch_all(pool).await?;

        Ok(DestinationPage::new(
            rows.into_iter().map(Destination::from).collect(),
            total,
            page,
            limit,
        ))
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let row = sqlx::query_as::<_, DestinationRow>(&format!(
            "SELECT {} FROM destinations WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(Destination::from))
    }

    pub async fn create(pool: &PgPool, input: DestinationInput) -> Result<Self, sqlx::Error> {
        let row = sqlx::query_as::<_, DestinationRow>(&format!(
            r#"
            INSERT INTO destinations
                (id, name, description, latitude, longitude, category, price_range, image)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.location.map(|l| l.latitude))
        .bind(input.location.map(|l| l.longitude))
        .bind(&input.category)
        .bind(&input.price_range)
        .bind(&input.image)
        .fetch_one(pool)
        .await?;
        Ok(row.into())
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        input: DestinationInput,
    ) -> Result<Option<Self>, sqlx::Error> {
        let row = sqlx::query_as::<_, DestinationRow>(&format!(
            r#"
            UPDATE destinations
            SET name = $2, description = $3, latitude = $4, longitude = $5,
                category = $6, price_range = $7, image = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.location.map(|l| l.latitude))
        .bind(input.location.map(|l| l.longitude))
        .bind(&input.category)
        .bind(&input.price_range)
        .bind(&input.image)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(Destination::from))
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM destinations WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_reports_nested_location_and_image() {
        let raw: DestinationBody = serde_json::from_str(
            r#"{"name":"Lisbon","location":{"latitude":120.0,"longitude":-9.1},"image":"ftp://x"}"#,
        )
        .unwrap();
        let errors = DestinationInput::validate(raw).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["location.latitude", "image"]);
    }

    #[test]
    fn short_name_is_rejected() {
        let raw: DestinationBody = serde_json::from_str(r#"{"name":"L"}"#).unwrap();
        let errors = DestinationInput::validate(raw).unwrap_err();
        assert_eq!(
            errors,
            vec![FieldError::new(
                "name",
                "String must contain at least 2 character(s)"
            )]
        );
    }

    #[test]
    fn all_means_no_filter() {
        assert_eq!(filter_value(&Some("All".into())), None);
        assert_eq!(filter_value(&Some(" ".into())), None);
        assert_eq!(filter_value(&Some("beach".into())), Some("beach"));
    }

    #[test]
    fn paging_defaults_and_clamps() {
        let query = ListQuery {
            search: None,
            category: None,
            price_range: None,
            page: Some(0),
            limit: Some(1000),
        };
        assert_eq!(query.paging(), (1, MAX_LIMIT));

        let page = DestinationPage::new(Vec::new(), 21, 3, 10);
        assert_eq!(page.pages, 3);
        assert_eq!(page.current_page, 3);
    }

    #[test]
    fn huge_page_keeps_offset_in_range() {
        let query = ListQuery {
            search: None,
            category: None,
            price_range: None,
            page: Some(i64::MAX),
            limit: Some(MAX_LIMIT),
        };
        let (page, limit) = query.paging();
        assert_eq!(page, MAX_PAGE);
        assert!((page - 1).checked_mul(limit).is_some());
    }

    #[test]
    fn location_is_only_reported_when_complete() {
        let now = Utc::now();
        let row = DestinationRow {
            id: Uuid::nil(),
            name: "Lisbon".into(),
            description: None,
            latitude: Some(38.7),
            longitude: None,
            category: None,
            price_range: None,
            image: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(Destination::from(row)).unwrap();
        assert!(json["location"].is_null());
        assert!(json.get("priceRange").is_some());
    }
}
