//! User repository for database operations.
//!
//! Writes that must share a transaction with other tables (registration,
//! profile changes, deletion) are free functions over a `PgConnection`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use ramen_map_core::pagination::{Page, PageRequest, SortKey};
use ramen_map_core::search::user_search_tokens;
use ramen_map_core::{AuthMethod, Email, UserId, UserRole};

use super::{RepositoryError, conflict_on_unique, push_keyset};

/// A user profile.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub role: UserRole,
    pub auth_method: AuthMethod,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Pagination key.
    #[must_use]
    pub fn sort_key(&self) -> SortKey {
        SortKey::new(self.created_at, self.id.as_i32())
    }
}

/// Fields for a new account.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a Email,
    pub display_name: &'a str,
    pub auth_method: AuthMethod,
}

/// Profile fields a user may change. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    /// `Some(None)` clears the avatar.
    pub avatar_url: Option<Option<String>>,
}

/// Account fields only admins may change.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminUserUpdate {
    pub role: Option<UserRole>,
    pub email_verified: Option<bool>,
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    display_name: String,
    avatar_url: Option<String>,
    role: UserRole,
    auth_method: AuthMethod,
    email_verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            display_name: row.display_name,
            avatar_url: row.avatar_url,
            role: row.role,
            auth_method: row.auth_method,
            email_verified: row.email_verified,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const USER_COLUMNS: &str = "app_user.id, app_user.email, app_user.display_name, \
     app_user.avatar_url, app_user.role, app_user.auth_method, app_user.email_verified, \
     app_user.created_at, app_user.updated_at";

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        get_in(&mut conn, id).await
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM app_user WHERE app_user.email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a user and their password hash by email.
    ///
    /// Returns `None` if the user doesn't exist or has no password set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        #[derive(sqlx::FromRow)]
        struct Row {
            #[sqlx(flatten)]
            user: UserRow,
            password_hash: Option<String>,
        }

        let row = sqlx::query_as::<_, Row>(&format!(
            "SELECT {USER_COLUMNS}, p.password_hash \
             FROM app_user LEFT JOIN user_password p ON p.user_id = app_user.id \
             WHERE app_user.email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let Some(password_hash) = row.password_hash else {
            return Ok(None);
        };

        Ok(Some((row.user.try_into()?, password_hash)))
    }

    /// List users newest first, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        tokens: &[String],
        page: &PageRequest,
    ) -> Result<Page<User>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {USER_COLUMNS} FROM app_user WHERE TRUE"
        ));
        if !tokens.is_empty() {
            qb.push(" AND app_user.search_tokens @> ")
                .push_bind(tokens.to_vec());
        }
        push_keyset(&mut qb, "app_user", page);

        let rows = qb.build_query_as::<UserRow>().fetch_all(self.pool).await?;
        let users = rows
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::from_rows(users, page, User::sort_key))
    }

    /// Recompute search tokens for every user. Returns the number updated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn reindex_all(&self) -> Result<u64, RepositoryError> {
        let rows: Vec<(i32, String, String)> =
            sqlx::query_as("SELECT id, display_name, email FROM app_user")
                .fetch_all(self.pool)
                .await?;

        let mut updated = 0;
        for (id, display_name, email) in rows {
            sqlx::query("UPDATE app_user SET search_tokens = $2 WHERE id = $1")
                .bind(id)
                .bind(user_search_tokens(&display_name, &email))
                .execute(self.pool)
                .await?;
            updated += 1;
        }
        Ok(updated)
    }
}

/// Get a user by ID on an existing connection.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_in(conn: &mut PgConnection, id: UserId) -> Result<Option<User>, RepositoryError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM app_user WHERE app_user.id = $1"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    row.map(TryInto::try_into).transpose()
}

/// Insert a user and their password hash.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the email already exists.
pub async fn insert_with_password(
    conn: &mut PgConnection,
    new_user: &NewUser<'_>,
    password_hash: &str,
) -> Result<User, RepositoryError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "INSERT INTO app_user (email, display_name, auth_method, search_tokens) \
         VALUES ($1, $2, $3, $4) \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(new_user.email.as_str())
    .bind(new_user.display_name)
    .bind(new_user.auth_method)
    .bind(user_search_tokens(new_user.display_name, new_user.email.as_str()))
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| conflict_on_unique(e, "email"))?;

    let user = User::try_from(row)?;

    sqlx::query("INSERT INTO user_password (user_id, password_hash) VALUES ($1, $2)")
        .bind(user.id)
        .bind(password_hash)
        .execute(&mut *conn)
        .await?;

    Ok(user)
}

/// Apply a profile update and refresh the user's search tokens.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the user doesn't exist.
pub async fn update_profile_in(
    conn: &mut PgConnection,
    id: UserId,
    update: &ProfileUpdate,
) -> Result<User, RepositoryError> {
    let current = get_in(&mut *conn, id)
        .await?
        .ok_or(RepositoryError::NotFound)?;

    let display_name = update
        .display_name
        .clone()
        .unwrap_or_else(|| current.display_name.clone());
    let avatar_url = update
        .avatar_url
        .clone()
        .unwrap_or_else(|| current.avatar_url.clone());

    let row = sqlx::query_as::<_, UserRow>(&format!(
        "UPDATE app_user SET display_name = $2, avatar_url = $3, search_tokens = $4, \
                             updated_at = NOW() \
         WHERE app_user.id = $1 \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(&display_name)
    .bind(&avatar_url)
    .bind(user_search_tokens(&display_name, current.email.as_str()))
    .fetch_one(&mut *conn)
    .await?;

    row.try_into()
}

/// Apply an admin update (role, email verification).
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the user doesn't exist.
pub async fn update_admin_fields_in(
    conn: &mut PgConnection,
    id: UserId,
    update: AdminUserUpdate,
) -> Result<User, RepositoryError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "UPDATE app_user SET role = COALESCE($2, role), \
                             email_verified = COALESCE($3, email_verified), \
                             updated_at = NOW() \
         WHERE app_user.id = $1 \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(update.role)
    .bind(update.email_verified)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)?;

    row.try_into()
}

/// Set a user's role by email.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if no user has that email.
pub async fn set_role_by_email_in(
    conn: &mut PgConnection,
    email: &Email,
    role: UserRole,
) -> Result<User, RepositoryError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "UPDATE app_user SET role = $2, updated_at = NOW() \
         WHERE app_user.email = $1 \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(email.as_str())
    .bind(role)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)?;

    row.try_into()
}

/// Delete a user.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the user doesn't exist.
pub async fn delete_in(conn: &mut PgConnection, id: UserId) -> Result<(), RepositoryError> {
    let result = sqlx::query("DELETE FROM app_user WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}
