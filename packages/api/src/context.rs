//! # Application context: session and preferences, passed explicitly
//!
//! [`AppContext`] is built once at startup and handed to whatever needs it. It owns
//! the [`SessionStore`] and the [`PreferenceResolver`], and ties the second to the
//! first: the resolver listens to the session store, and every change of user resets
//! preferences to their defaults inside the transition itself, before any other
//! listener runs. Theme state therefore never outlives the session it belongs to, no
//! matter which handle drove the change.
//!
//! The reset is synchronous; loading the new user's saved values is not. The
//! wrappers here ([`start`](AppContext::start), [`sign_in`](AppContext::sign_in), ...)
//! finish that load before returning. After driving [`AppContext::session`] directly,
//! call [`refresh_preferences`](AppContext::refresh_preferences).
//!
//! Record access goes through [`EntityController`]s handed out by
//! [`entities`](AppContext::entities); the `*_mine` helpers scope them to the
//! signed-in user.

use std::sync::Arc;

use store::{Entity, EntityController, Profile, RecordStore};

use crate::auth::{AuthBackend, Session, SessionStore};
use crate::error::{AuthError, ClientError};
use crate::models::AuthUser;
use crate::profile::{ProfileOutcome, ProfileReconciler};
use crate::theme::PreferenceResolver;

pub struct AppContext<A: AuthBackend, S: RecordStore + Clone> {
    session: SessionStore<A>,
    theme: Arc<PreferenceResolver<S>>,
    store: S,
}

impl<A, S> AppContext<A, S>
where
    A: AuthBackend,
    S: RecordStore + Clone + Send + Sync + 'static,
{
    pub fn new(auth: A, store: S) -> Self {
        let session = SessionStore::new(auth);
        let theme = Arc::new(PreferenceResolver::new(ProfileReconciler::new(store.clone())));

        // Registered first, so later listeners already see the reset.
        let resolver = theme.clone();
        session.on_session_change(move |change| {
            if change.user_changed() {
                resolver.reset_for(change.current.as_ref());
            }
        });

        Self {
            session,
            theme,
            store,
        }
    }

    pub fn session(&self) -> &SessionStore<A> {
        &self.session
    }

    pub fn theme(&self) -> &Arc<PreferenceResolver<S>> {
        &self.theme
    }

    pub fn profiles(&self) -> &ProfileReconciler<S> {
        self.theme.profiles()
    }

    /// Restore the previous session, if any, and load its preferences.
    pub async fn start(&self) -> Option<Session> {
        let session = self.session.restore().await;
        self.theme.load_pending().await;
        session
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        self.session.sign_up(email, password).await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self.session.sign_in(email, password).await?;
        self.theme.load_pending().await;
        Ok(session)
    }

    /// Sign out; preferences reset even if the backend call failed.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let result = self.session.sign_out().await;
        self.theme.load_pending().await;
        result
    }

    /// Drop a session the backend stopped honouring.
    pub async fn invalidate(&self) {
        self.session.invalidate();
        self.theme.load_pending().await;
    }

    /// Load the current user's saved preferences if a user change left them pending.
    pub async fn refresh_preferences(&self) -> Option<ProfileOutcome> {
        self.theme.load_pending().await
    }

    pub fn require_user_id(&self) -> Result<String, AuthError> {
        Ok(self.session.require_user()?.id)
    }

    /// CRUD controller for `E`.
    pub fn entities<E: Entity>(&self) -> EntityController<E, S> {
        EntityController::new(self.store.clone())
    }

    /// The signed-in user's profile, created on first access.
    pub async fn my_profile(&self) -> Result<ProfileOutcome, ClientError> {
        let user = self.session.require_user()?;
        Ok(self.profiles().reconcile(&user.id, &user.email).await)
    }

    /// Partner name from the signed-in user's profile, if set.
    pub async fn partner_name(&self) -> Result<Option<String>, ClientError> {
        let profile: Profile = self.my_profile().await?.into_profile();
        Ok(profile.partner_name)
    }

    pub async fn update_partner_name(&self, name: &str) -> Result<(), ClientError> {
        let user_id = self.require_user_id()?;
        Ok(self.profiles().update_partner_name(&user_id, name).await?)
    }

    /// All of the signed-in user's `E` records in their usual order.
    pub async fn list_mine<E: Entity>(&self) -> Result<Vec<E>, ClientError> {
        let user_id = self.require_user_id()?;
        Ok(self.entities::<E>().list_default(&user_id).await?)
    }

    pub async fn create_mine<E: Entity>(&self, draft: E::Draft) -> Result<E, ClientError> {
        let user_id = self.require_user_id()?;
        Ok(self.entities::<E>().create(&user_id, draft).await?)
    }
}
