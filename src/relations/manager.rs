//! Relationship manager: the only component with cross-entity logic
//!
//! Every operation runs inside one store transaction and commits only when
//! all of its steps succeeded, so multi-step work such as "create a user
//! with its profile" or "delete a profile, then its user" is atomic.

use crate::core::entity::to_fields;
use crate::core::error::{EntityError, LinkError, RelateError, RelateResult};
use crate::core::model::{
    Category, NewPost, NewUser, Post, PostChanges, PostWithCategories, Profile, User,
    UserWithPosts, UserWithProfile,
};
use crate::core::schema::EntityKind;
use crate::core::store::{EntityStore, Fields, StoreError};
use crate::relations::changes::CategoryChanges;
use crate::relations::session::Session;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Links, unlinks and keeps related entities consistent
///
/// Cheap to clone; all clones share the injected store.
#[derive(Clone)]
pub struct RelationshipManager {
    store: Arc<dyn EntityStore>,
}

impl RelationshipManager {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    async fn session(&self) -> RelateResult<Session> {
        Ok(Session::begin(self.store.as_ref()).await?)
    }

    // -------------------------------------------------------------------------
    // One-to-one: User <-> Profile
    // -------------------------------------------------------------------------

    /// Create a user and its profile together
    ///
    /// Either both rows exist afterwards or neither does.
    #[instrument(skip(self, user), level = "debug")]
    pub async fn create_with_profile(
        &self,
        user: NewUser,
        bio: Option<String>,
    ) -> RelateResult<UserWithProfile> {
        let mut tx = self.session().await?;

        let user: User = tx.create(to_fields(EntityKind::User, &user)?).await?;

        let mut fields = Fields::new();
        fields.insert("userId".to_string(), Value::from(user.id));
        if let Some(bio) = bio {
            fields.insert("bio".to_string(), Value::from(bio));
        }
        let profile: Profile = tx.create(fields).await?;

        tx.commit().await?;
        info!(user_id = user.id, profile_id = profile.id, "user created with profile");

        Ok(UserWithProfile {
            user,
            profile: Some(profile),
        })
    }

    /// Fetch a user with its embedded profile
    #[instrument(skip(self), level = "debug")]
    pub async fn find_user_with_profile(&self, user_id: i64) -> RelateResult<UserWithProfile> {
        let mut tx = self.session().await?;
        let user: User = tx.require(user_id).await?;
        let profile = Self::profile_of(&mut tx, user_id).await?;
        Ok(UserWithProfile { user, profile })
    }

    /// Replace the bio of the profile linked to a user
    ///
    /// `None` leaves the bio as it is; `Some(None)` clears it.
    #[instrument(skip(self), level = "debug")]
    pub async fn update_profile_by_user(
        &self,
        user_id: i64,
        bio: Option<Option<String>>,
    ) -> RelateResult<Profile> {
        let mut tx = self.session().await?;

        let profile = Self::profile_of(&mut tx, user_id)
            .await?
            .ok_or(EntityError::NotFound {
                entity: EntityKind::Profile,
                id: user_id,
            })?;

        let Some(bio) = bio else {
            debug!(user_id, profile_id = profile.id, "no profile changes");
            return Ok(profile);
        };

        let mut fields = Fields::new();
        fields.insert("bio".to_string(), Value::from(bio));
        let profile: Profile = tx.update(profile.id, fields).await?;

        tx.commit().await?;
        info!(user_id, profile_id = profile.id, "profile updated");
        Ok(profile)
    }

    /// Delete a user after its profile
    ///
    /// A user without a profile is deleted all the same. A user that still
    /// owns posts is not deleted, and neither is its profile.
    #[instrument(skip(self), level = "debug")]
    pub async fn delete_user_cascade(&self, user_id: i64) -> RelateResult<User> {
        let mut tx = self.session().await?;
        tx.require::<User>(user_id).await?;

        match Self::profile_of(&mut tx, user_id).await? {
            Some(profile) => {
                tx.delete::<Profile>(profile.id).await?;
                debug!(user_id, profile_id = profile.id, "profile deleted");
            }
            None => debug!(user_id, "user has no profile"),
        }

        let user: User = tx.delete(user_id).await?;
        tx.commit().await?;

        info!(user_id, "user and profile deleted");
        Ok(user)
    }

    async fn profile_of(tx: &mut Session, user_id: i64) -> RelateResult<Option<Profile>> {
        let profiles: Vec<Profile> = tx.find_by("userId", Value::from(user_id)).await?;
        Ok(profiles.into_iter().next())
    }

    // -------------------------------------------------------------------------
    // One-to-many: User <-> Post
    // -------------------------------------------------------------------------

    /// Create a post owned by a user
    ///
    /// A missing owner is detected by the store's foreign key check and
    /// reported as `NotFound`.
    #[instrument(skip(self, post), level = "debug")]
    pub async fn create_post_for_user(&self, user_id: i64, post: NewPost) -> RelateResult<Post> {
        let mut tx = self.session().await?;

        let mut fields = to_fields(EntityKind::Post, &post)?;
        fields.insert("userId".to_string(), Value::from(user_id));

        let post: Post = tx.create(fields).await.map_err(|e| match e {
            StoreError::ForeignKeyViolation {
                target: EntityKind::User,
                id,
                ..
            } => RelateError::from(EntityError::NotFound {
                entity: EntityKind::User,
                id,
            }),
            other => other.into(),
        })?;

        tx.commit().await?;
        info!(user_id, post_id = post.id, "post created");
        Ok(post)
    }

    /// Fetch a user with its posts in creation order
    #[instrument(skip(self), level = "debug")]
    pub async fn list_posts_of_user(&self, user_id: i64) -> RelateResult<UserWithPosts> {
        let mut tx = self.session().await?;
        let user: User = tx.require(user_id).await?;
        let posts: Vec<Post> = tx.find_by("userId", Value::from(user_id)).await?;
        Ok(UserWithPosts { user, posts })
    }

    /// Update a post by id, whoever owns it
    ///
    /// An empty change set returns the post as stored.
    #[instrument(skip(self), level = "debug")]
    pub async fn update_post(&self, post_id: i64, changes: PostChanges) -> RelateResult<Post> {
        let mut tx = self.session().await?;
        if changes.is_empty() {
            return Ok(tx.require::<Post>(post_id).await?);
        }

        let post: Post = tx
            .update(post_id, to_fields(EntityKind::Post, &changes)?)
            .await?;
        tx.commit().await?;

        info!(post_id, "post updated");
        Ok(post)
    }

    /// Delete a post by id, detaching its categories first
    ///
    /// The categories themselves are kept.
    #[instrument(skip(self), level = "debug")]
    pub async fn delete_post(&self, post_id: i64) -> RelateResult<Post> {
        let mut tx = self.session().await?;

        for category_id in tx.category_ids(post_id).await? {
            tx.disconnect(post_id, category_id).await?;
        }
        let post: Post = tx.delete(post_id).await?;
        tx.commit().await?;

        info!(post_id, "post deleted");
        Ok(post)
    }

    // -------------------------------------------------------------------------
    // Many-to-many: Post <-> Category
    // -------------------------------------------------------------------------

    /// Fetch a post with its categories
    #[instrument(skip(self), level = "debug")]
    pub async fn find_post_with_categories(
        &self,
        post_id: i64,
    ) -> RelateResult<PostWithCategories> {
        let mut tx = self.session().await?;
        let post: Post = tx.require(post_id).await?;
        let categories = tx.categories_of(post_id).await?;
        Ok(PostWithCategories { post, categories })
    }

    /// Find-or-create a category by name and link it to a post
    ///
    /// Repeating the call with the same name creates neither a second
    /// category nor a second link.
    #[instrument(skip(self), level = "debug")]
    pub async fn attach_category_to_post(
        &self,
        post_id: i64,
        name: Option<String>,
    ) -> RelateResult<PostWithCategories> {
        let mut tx = self.session().await?;
        let post: Post = tx.require(post_id).await?;

        let mut fields = Fields::new();
        if let Some(name) = name {
            fields.insert("name".to_string(), Value::from(name));
        }
        let category: Category = tx.upsert("name", fields).await?;

        let added = tx.connect(post_id, category.id).await?;
        let categories = tx.categories_of(post_id).await?;
        tx.commit().await?;

        info!(post_id, category_id = category.id, added, "category attached");
        Ok(PostWithCategories { post, categories })
    }

    /// Attach and detach category ids in one operation
    ///
    /// Both lists are read against the state before the operation; an id
    /// present in both ends detached. Attaching an id that names no category
    /// fails the whole operation; detaching one is a no-op.
    #[instrument(skip(self), level = "debug")]
    pub async fn replace_post_categories(
        &self,
        post_id: i64,
        changes: CategoryChanges,
    ) -> RelateResult<PostWithCategories> {
        let plan = changes.plan();
        let mut tx = self.session().await?;
        let post: Post = tx.require(post_id).await?;

        if plan.is_empty() {
            debug!(post_id, "no category changes");
            let categories = tx.categories_of(post_id).await?;
            return Ok(PostWithCategories { post, categories });
        }

        for category_id in &plan.connect {
            tx.connect(post_id, *category_id).await?;
        }
        for category_id in &plan.disconnect {
            tx.disconnect(post_id, *category_id).await?;
        }

        let categories = tx.categories_of(post_id).await?;
        tx.commit().await?;

        info!(
            post_id,
            connected = plan.connect.len(),
            disconnected = plan.disconnect.len(),
            "post categories replaced"
        );
        Ok(PostWithCategories { post, categories })
    }

    /// Unlink one category from a post
    ///
    /// Both entities must exist; an absent link is not an error.
    #[instrument(skip(self), level = "debug")]
    pub async fn detach_category_from_post(
        &self,
        post_id: i64,
        category_id: i64,
    ) -> RelateResult<PostWithCategories> {
        let mut tx = self.session().await?;

        let post = tx.get::<Post>(post_id).await?;
        let category = tx.get::<Category>(category_id).await?;
        let (Some(post), Some(_)) = (post, category) else {
            return Err(LinkError::NotFound {
                post_id,
                category_id,
            }
            .into());
        };

        let removed = tx.disconnect(post_id, category_id).await?;
        let categories = tx.categories_of(post_id).await?;
        tx.commit().await?;

        info!(post_id, category_id, removed, "category detached");
        Ok(PostWithCategories { post, categories })
    }
}
