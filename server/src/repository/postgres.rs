use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{
    EventRepository, FeedbackRepository, NotificationRepository, ProfileRepository,
    RegistrationRepository,
};
use crate::models::{
    Admission, Category, Event, Feedback, Notification, Profile, Registration, StatusTransition,
};
use crate::services::ledger;
use crate::utils::error::{AppError, AppResult, ConflictKind};

const UNIQUE_VIOLATION: &str = "23505";

const EVENT_COLUMNS: &str = "id, title, description, date, start_time, end_time, location, \
     capacity, price, currency, category_id, organizer_id, tags, status, is_featured, \
     check_in_code, created_at, updated_at";

const REGISTRATION_COLUMNS: &str =
    "id, event_id, user_id, status, registered_at, checked_in_at";

const FEEDBACK_COLUMNS: &str = "id, event_id, user_id, rating, comment, created_at";

const PROFILE_COLUMNS: &str = "id, email, full_name, role, bio, location, created_at";

const NOTIFICATION_COLUMNS: &str = "id, user_id, title, message, kind, read, created_at";

#[derive(FromRow)]
struct EventRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    date: NaiveDate,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
    location: Option<String>,
    capacity: i32,
    price: Decimal,
    currency: String,
    category_id: Option<Uuid>,
    organizer_id: Uuid,
    tags: Vec<String>,
    status: String,
    is_featured: bool,
    check_in_code: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = AppError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Event {
            id: row.id,
            title: row.title,
            description: row.description,
            date: row.date,
            time: row.start_time,
            end_time: row.end_time,
            location: row.location,
            capacity: row.capacity,
            price: row.price,
            currency: row.currency,
            category_id: row.category_id,
            organizer_id: row.organizer_id,
            tags: row.tags,
            status: row.status.parse()?,
            is_featured: row.is_featured,
            check_in_code: row.check_in_code,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct RegistrationRow {
    id: Uuid,
    event_id: Uuid,
    user_id: Uuid,
    status: String,
    registered_at: DateTime<Utc>,
    checked_in_at: Option<DateTime<Utc>>,
}

impl TryFrom<RegistrationRow> for Registration {
    type Error = AppError;

    fn try_from(row: RegistrationRow) -> Result<Self, Self::Error> {
        Ok(Registration {
            id: row.id,
            event_id: row.event_id,
            user_id: row.user_id,
            status: row.status.parse()?,
            registered_at: row.registered_at,
            checked_in_at: row.checked_in_at,
        })
    }
}

#[derive(FromRow)]
struct ProfileRow {
    id: Uuid,
    email: String,
    full_name: String,
    role: String,
    bio: Option<String>,
    location: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = AppError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(Profile {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            role: row.role.parse()?,
            bio: row.bio,
            location: row.location,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    message: String,
    kind: String,
    read: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = AppError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            message: row.message,
            kind: row.kind.parse()?,
            read: row.read,
            created_at: row.created_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> AppResult<Vec<T>>
where
    T: TryFrom<R, Error = AppError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Maps a unique-constraint violation to the given conflict.
fn conflict_on_unique(kind: ConflictKind) -> impl FnOnce(sqlx::Error) -> AppError {
    move |err| match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            AppError::Conflict(kind)
        }
        _ => AppError::DatabaseError(err),
    }
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for PgStore {
    async fn create(&self, event: &Event) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO events
            (id, title, description, date, start_time, end_time, location, capacity, price,
             currency, category_id, organizer_id, tags, status, is_featured, check_in_code,
             created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.date)
        .bind(event.time)
        .bind(event.end_time)
        .bind(&event.location)
        .bind(event.capacity)
        .bind(event.price)
        .bind(&event.currency)
        .bind(event.category_id)
        .bind(event.organizer_id)
        .bind(&event.tags)
        .bind(event.status.as_str())
        .bind(event.is_featured)
        .bind(&event.check_in_code)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, event: &Event) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE events
            SET title = $2, description = $3, date = $4, start_time = $5, end_time = $6,
                location = $7, capacity = $8, price = $9, currency = $10, category_id = $11,
                tags = $12, status = $13, is_featured = $14, updated_at = $15
            WHERE id = $1
            "#,
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.date)
        .bind(event.time)
        .bind(event.end_time)
        .bind(&event.location)
        .bind(event.capacity)
        .bind(event.price)
        .bind(&event.currency)
        .bind(event.category_id)
        .bind(&event.tags)
        .bind(event.status.as_str())
        .bind(event.is_featured)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() < 1 {
            return Err(AppError::NotFound(format!("Event '{}' was not found", event.id)));
        }
        Ok(())
    }

    async fn find_by_id(&self, event_id: Uuid) -> AppResult<Option<Event>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
        sqlx::query_as::<_, EventRow>(&sql)
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Event::try_from)
            .transpose()
    }

    async fn find_all(&self) -> AppResult<Vec<Event>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY date, start_time");
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn find_by_organizer(&self, organizer_id: Uuid) -> AppResult<Vec<Event>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE organizer_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(organizer_id)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn categories(&self) -> AppResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, color, icon FROM event_categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }
}

#[async_trait]
impl RegistrationRepository for PgStore {
    async fn admit(&self, admission: Admission) -> AppResult<Registration> {
        let mut tx = self.pool.begin().await?;

        // The row lock on the event serializes admissions for that event until
        // commit; the partial unique index backs up the duplicate check.
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE");
        let event = sqlx::query_as::<_, EventRow>(&sql)
            .bind(admission.event_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Event '{}' was not found", admission.event_id))
            })
            .and_then(Event::try_from)?;

        let sql = format!("SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE event_id = $1");
        let rows = sqlx::query_as::<_, RegistrationRow>(&sql)
            .bind(admission.event_id)
            .fetch_all(&mut *tx)
            .await?;
        let registrations: Vec<Registration> = convert_all(rows)?;

        ledger::check_admission(
            &event,
            &registrations,
            admission.user_id,
            admission.requested_at.date_naive(),
        )?;

        let registration =
            Registration::confirmed(admission.event_id, admission.user_id, admission.requested_at);
        sqlx::query(
            r#"
            INSERT INTO registrations (id, event_id, user_id, status, registered_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(registration.id)
        .bind(registration.event_id)
        .bind(registration.user_id)
        .bind(registration.status.as_str())
        .bind(registration.registered_at)
        .execute(&mut *tx)
        .await
        .map_err(conflict_on_unique(ConflictKind::AlreadyRegistered))?;

        tx.commit().await?;
        Ok(registration)
    }

    async fn transition(&self, transition: StatusTransition) -> AppResult<Option<Registration>> {
        let sql = format!(
            r#"
            UPDATE registrations
            SET status = $3,
                checked_in_at = CASE WHEN $3 = 'checked_in' THEN $4 ELSE checked_in_at END
            WHERE id = $1 AND status = $2
            RETURNING {REGISTRATION_COLUMNS}
            "#
        );
        sqlx::query_as::<_, RegistrationRow>(&sql)
            .bind(transition.registration_id)
            .bind(transition.from.as_str())
            .bind(transition.to.as_str())
            .bind(transition.at)
            .fetch_optional(&self.pool)
            .await?
            .map(Registration::try_from)
            .transpose()
    }

    async fn find_by_id(&self, registration_id: Uuid) -> AppResult<Option<Registration>> {
        let sql = format!("SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = $1");
        sqlx::query_as::<_, RegistrationRow>(&sql)
            .bind(registration_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Registration::try_from)
            .transpose()
    }

    async fn find_by_event(&self, event_id: Uuid) -> AppResult<Vec<Registration>> {
        let sql = format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE event_id = $1 ORDER BY registered_at"
        );
        let rows = sqlx::query_as::<_, RegistrationRow>(&sql)
            .bind(event_id)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn find_by_user(&self, user_id: Uuid) -> AppResult<Vec<Registration>> {
        let sql = format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE user_id = $1 ORDER BY registered_at DESC"
        );
        let rows = sqlx::query_as::<_, RegistrationRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn find_all(&self) -> AppResult<Vec<Registration>> {
        let sql = format!("SELECT {REGISTRATION_COLUMNS} FROM registrations");
        let rows = sqlx::query_as::<_, RegistrationRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }
}

#[async_trait]
impl FeedbackRepository for PgStore {
    async fn create(&self, feedback: &Feedback) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO feedback (id, event_id, user_id, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(feedback.id)
        .bind(feedback.event_id)
        .bind(feedback.user_id)
        .bind(feedback.rating)
        .bind(&feedback.comment)
        .bind(feedback.created_at)
        .execute(&self.pool)
        .await
        .map_err(conflict_on_unique(ConflictKind::FeedbackExists))?;
        Ok(())
    }

    async fn find_by_event(&self, event_id: Uuid) -> AppResult<Vec<Feedback>> {
        let sql = format!(
            "SELECT {FEEDBACK_COLUMNS} FROM feedback WHERE event_id = $1 ORDER BY created_at DESC"
        );
        let feedback = sqlx::query_as::<_, Feedback>(&sql)
            .bind(event_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(feedback)
    }

    async fn find_all(&self) -> AppResult<Vec<Feedback>> {
        let sql = format!("SELECT {FEEDBACK_COLUMNS} FROM feedback");
        let feedback = sqlx::query_as::<_, Feedback>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(feedback)
    }
}

#[async_trait]
impl ProfileRepository for PgStore {
    async fn create(&self, profile: &Profile) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (id, email, full_name, role, bio, location, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(profile.id)
        .bind(&profile.email)
        .bind(&profile.full_name)
        .bind(profile.role.as_str())
        .bind(&profile.bio)
        .bind(&profile.location)
        .bind(profile.created_at)
        .execute(&self.pool)
        .await
        .map_err(conflict_on_unique(ConflictKind::EmailTaken))?;
        Ok(())
    }

    async fn update(&self, profile: &Profile) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET full_name = $2, bio = $3, location = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(profile.id)
        .bind(&profile.full_name)
        .bind(&profile.bio)
        .bind(&profile.location)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() < 1 {
            return Err(AppError::NotFound(format!("User '{}' was not found", profile.id)));
        }
        Ok(())
    }

    async fn find_by_id(&self, user_id: Uuid) -> AppResult<Option<Profile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1");
        sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Profile::try_from)
            .transpose()
    }

    async fn count(&self) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

#[async_trait]
impl NotificationRepository for PgStore {
    async fn create(&self, notification: &Notification) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, title, message, kind, read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(notification.id)
        .bind(notification.user_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.kind.as_str())
        .bind(notification.read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, notification_id: Uuid) -> AppResult<Option<Notification>> {
        let sql = format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1");
        sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(notification_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Notification::try_from)
            .transpose()
    }

    async fn find_by_user(&self, user_id: Uuid) -> AppResult<Vec<Notification>> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn mark_read(&self, notification_id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1")
            .bind(notification_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
