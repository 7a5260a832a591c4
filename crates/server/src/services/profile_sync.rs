//! Keeps the author fields copied onto reviews in step with the user table.
//!
//! Every operation here that changes a user runs the review update in the
//! same transaction, so a review never shows a name its author no longer has.

use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use tracing::instrument;
use url::Url;

use ramen_map_core::{Email, UserId, UserRole};

use super::auth::{AuthError, validate_display_name};
use crate::db::users::{self, AdminUserUpdate, ProfileUpdate};
use crate::db::{RepositoryError, User};

/// Display name shown on reviews whose author deleted their account.
pub const DELETED_USER_NAME: &str = "Deleted user";

/// Errors from profile changes.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("invalid display name: {0}")]
    InvalidDisplayName(String),

    #[error("avatar URL must be an http(s) URL")]
    InvalidAvatarUrl,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for ProfileError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Copy a user's display name, avatar and role onto all their reviews.
///
/// Returns the number of reviews updated.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn sync_profile_to_reviews(
    conn: &mut PgConnection,
    user: &User,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        "UPDATE review SET user_display_name = $2, user_avatar_url = $3, user_role = $4 \
         WHERE user_id = $1",
    )
    .bind(user.id)
    .bind(&user.display_name)
    .bind(&user.avatar_url)
    .bind(user.role)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Detach a user's reviews from their account before it is deleted.
///
/// Returns the number of reviews anonymized.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn anonymize_reviews(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        "UPDATE review SET user_id = NULL, user_display_name = $2, \
                           user_avatar_url = NULL, user_role = $3 \
         WHERE user_id = $1",
    )
    .bind(user_id)
    .bind(DELETED_USER_NAME)
    .bind(UserRole::Normal)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// User profile changes that fan out to reviews.
pub struct ProfileService<'a> {
    pool: &'a PgPool,
}

impl<'a> ProfileService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Change a user's own display name or avatar.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::InvalidDisplayName` or `ProfileError::InvalidAvatarUrl`
    /// for bad input, and `RepositoryError::NotFound` if the user is gone.
    #[instrument(skip(self, update))]
    pub async fn update_profile(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> Result<User, ProfileError> {
        let update = validate_profile_update(update)?;

        let mut tx = self.pool.begin().await?;
        let user = users::update_profile_in(&mut tx, user_id, &update).await?;
        let synced = sync_profile_to_reviews(&mut tx, &user).await?;
        tx.commit().await?;

        tracing::info!(%user_id, synced, "Profile updated");
        Ok(user)
    }

    /// Change a user's role or verification flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    #[instrument(skip(self))]
    pub async fn update_admin_fields(
        &self,
        user_id: UserId,
        update: AdminUserUpdate,
    ) -> Result<User, ProfileError> {
        let mut tx = self.pool.begin().await?;
        let user = users::update_admin_fields_in(&mut tx, user_id, update).await?;
        let synced = sync_profile_to_reviews(&mut tx, &user).await?;
        tx.commit().await?;

        tracing::info!(%user_id, role = ?user.role, synced, "User updated by admin");
        Ok(user)
    }

    /// Grant the admin role to the user with `email`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no user has that email.
    pub async fn promote_by_email(&self, email: &Email) -> Result<User, ProfileError> {
        let mut tx = self.pool.begin().await?;
        let user = users::set_role_by_email_in(&mut tx, email, UserRole::Admin).await?;
        sync_profile_to_reviews(&mut tx, &user).await?;
        tx.commit().await?;
        Ok(user)
    }

    /// Delete a user, anonymizing their reviews first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, user_id: UserId) -> Result<u64, ProfileError> {
        let mut tx = self.pool.begin().await?;
        let anonymized = anonymize_reviews(&mut tx, user_id).await?;
        users::delete_in(&mut tx, user_id).await?;
        tx.commit().await?;

        tracing::info!(%user_id, anonymized, "User deleted");
        Ok(anonymized)
    }
}

/// Trim and check the fields of a profile update.
///
/// A blank avatar URL clears the avatar.
///
/// # Errors
///
/// Returns `ProfileError` for a blank or long display name or a non-http(s) avatar.
pub fn validate_profile_update(update: ProfileUpdate) -> Result<ProfileUpdate, ProfileError> {
    let display_name = update
        .display_name
        .map(|name| {
            validate_display_name(&name).map_err(|e| match e {
                AuthError::InvalidDisplayName(msg) => ProfileError::InvalidDisplayName(msg),
                other => ProfileError::InvalidDisplayName(other.to_string()),
            })
        })
        .transpose()?;

    let avatar_url = match update.avatar_url {
        None => None,
        Some(None) => Some(None),
        Some(Some(raw)) if raw.trim().is_empty() => Some(None),
        Some(Some(raw)) => {
            let url = Url::parse(raw.trim()).map_err(|_| ProfileError::InvalidAvatarUrl)?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ProfileError::InvalidAvatarUrl);
            }
            Some(Some(url.to_string()))
        }
    };

    Ok(ProfileUpdate {
        display_name,
        avatar_url,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::test_support::{insert_user, review_draft, shop_draft};
    use crate::db::{Review, ReviewAuthor, ReviewRepository, ShopRepository};

    /// A user with one review; returns both.
    async fn reviewer(pool: &PgPool) -> (User, Review) {
        let user = insert_user(pool, "kenji@example.com", "Kenji").await;
        let shop = ShopRepository::new(pool)
            .create(&shop_draft("Afuri", None))
            .await
            .unwrap();
        let review = ReviewRepository::new(pool)
            .create(&review_draft(shop.id), &ReviewAuthor::from(&user))
            .await
            .unwrap();
        (user, review)
    }

    async fn reload(pool: &PgPool, review: &Review) -> Review {
        ReviewRepository::new(pool)
            .get(review.id)
            .await
            .unwrap()
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_profile_update_reaches_reviews(pool: PgPool) {
        let (user, review) = reviewer(&pool).await;

        ProfileService::new(&pool)
            .update_profile(
                user.id,
                ProfileUpdate {
                    display_name: Some(" Kenji T ".to_owned()),
                    avatar_url: Some(Some("https://example.com/kenji.png".to_owned())),
                },
            )
            .await
            .unwrap();

        let synced = reload(&pool, &review).await;
        assert_eq!(synced.author.user_id, Some(user.id));
        assert_eq!(synced.author.display_name, "Kenji T");
        assert_eq!(
            synced.author.avatar_url.as_deref(),
            Some("https://example.com/kenji.png")
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_admin_role_change_reaches_reviews(pool: PgPool) {
        let (user, review) = reviewer(&pool).await;

        ProfileService::new(&pool)
            .update_admin_fields(
                user.id,
                AdminUserUpdate {
                    role: Some(UserRole::Admin),
                    email_verified: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(reload(&pool, &review).await.author.role, UserRole::Admin);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_delete_user_anonymizes_reviews(pool: PgPool) {
        let (user, review) = reviewer(&pool).await;
        let service = ProfileService::new(&pool);
        service
            .update_admin_fields(
                user.id,
                AdminUserUpdate {
                    role: Some(UserRole::Admin),
                    email_verified: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(service.delete_user(user.id).await.unwrap(), 1);

        let kept = reload(&pool, &review).await;
        assert_eq!(
            kept.author,
            ReviewAuthor {
                user_id: None,
                display_name: DELETED_USER_NAME.to_owned(),
                avatar_url: None,
                role: UserRole::Normal,
            }
        );
        assert!(
            crate::db::UserRepository::new(&pool)
                .get_by_id(user.id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_delete_unknown_user_is_not_found(pool: PgPool) {
        let result = ProfileService::new(&pool).delete_user(UserId::new(9999)).await;
        assert!(matches!(
            result,
            Err(ProfileError::Repository(RepositoryError::NotFound))
        ));
    }

    #[test]
    fn test_validate_profile_update_trims_name() {
        let update = validate_profile_update(ProfileUpdate {
            display_name: Some("  Hanako ".to_owned()),
            avatar_url: None,
        })
        .unwrap();
        assert_eq!(update.display_name.as_deref(), Some("Hanako"));
        assert!(update.avatar_url.is_none());
    }

    #[test]
    fn test_validate_profile_update_rejects_blank_name() {
        let result = validate_profile_update(ProfileUpdate {
            display_name: Some("  ".to_owned()),
            avatar_url: None,
        });
        assert!(matches!(result, Err(ProfileError::InvalidDisplayName(_))));
    }

    #[test]
    fn test_validate_profile_update_avatar() {
        let cleared = validate_profile_update(ProfileUpdate {
            display_name: None,
            avatar_url: Some(Some("   ".to_owned())),
        })
        .unwrap();
        assert_eq!(cleared.avatar_url, Some(None));

        let set = validate_profile_update(ProfileUpdate {
            display_name: None,
            avatar_url: Some(Some("https://example.com/me.png".to_owned())),
        })
        .unwrap();
        assert_eq!(
            set.avatar_url,
            Some(Some("https://example.com/me.png".to_owned()))
        );

        let bad = validate_profile_update(ProfileUpdate {
            display_name: None,
            avatar_url: Some(Some("javascript:alert(1)".to_owned())),
        });
        assert!(matches!(bad, Err(ProfileError::InvalidAvatarUrl)));
    }
}
