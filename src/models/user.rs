use crate::models::role::Role;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
}

impl SocialLinks {
    /// Overlay the links present in `patch`, keeping the others
    pub fn apply(&mut self, patch: &SocialLinks) {
        if let Some(twitter) = &patch.twitter {
            self.twitter = Some(twitter.clone());
        }
        if let Some(facebook) = &patch.facebook {
            self.facebook = Some(facebook.clone());
        }
        if let Some(instagram) = &patch.instagram {
            self.instagram = Some(instagram.clone());
        }
    }
}

/// Server-side user record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    /// argon2 PHC string, never leaves the server
    pub password_hash: String,
    pub role: Role,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub social_links: SocialLinks,
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Unix milliseconds
    pub created_at: i64,
    /// Unix milliseconds
    pub updated_at: i64,
}

impl User {
    pub fn new(username: String, email: String, password_hash: String, role: Role, now: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            role,
            bio: None,
            social_links: SocialLinks::default(),
            avatar_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn to_public(&self) -> PublicUser {
        PublicUser::from(self)
    }
}

/// User record as it appears on the wire: everything but the credential
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub social_links: SocialLinks,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            bio: user.bio.clone(),
            social_links: user.social_links.clone(),
            avatar_url: user.avatar_url.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Owner-editable profile fields. Absent fields are left unchanged.
/// A `role` key in a PATCH body has no field to land in and is dropped.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_links: Option<SocialLinks>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.bio.is_none() && self.social_links.is_none() && self.avatar_url.is_none()
    }

    pub fn apply_to(&self, user: &mut User) {
        if let Some(bio) = &self.bio {
            user.bio = Some(bio.clone());
        }
        if let Some(links) = &self.social_links {
            user.social_links.apply(links);
        }
        if let Some(avatar_url) = &self.avatar_url {
            user.avatar_url = Some(avatar_url.clone());
        }
    }
}
