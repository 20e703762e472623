//! # Theme preferences: device scheme + saved choice → one palette
//!
//! Three sources feed the active appearance:
//!
//! 1. the device's reported color scheme (may be unknown),
//! 2. the user's saved [`ThemeMode`] and accent color from their profile row,
//! 3. whatever the user just picked in this session (applied optimistically).
//!
//! The pure pieces, [`resolve_scheme`], [`resolve_color`], [`derive_palette`] and
//! [`NavigationTheme::from_palette`], have no side effects and are tested on their own.
//! [`PreferenceResolver`] holds the in-memory state and persists changes through the
//! [`ProfileReconciler`].
//!
//! ## User changes
//!
//! Preferences never carry over from one account to the next. A user change first
//! resets to `{ mode: system, color: DEFAULT_PRIMARY }`
//! ([`begin_user_change`](PreferenceResolver::begin_user_change)), then loads the new
//! user's saved values ([`finish_load`](PreferenceResolver::finish_load)). Each reset
//! hands out a [`LoadTicket`]; a load whose ticket has been superseded by a later user
//! change is dropped when it completes.
//!
//! [`reset_for`](PreferenceResolver::reset_for) does the reset from inside a session
//! listener and parks the ticket; [`load_pending`](PreferenceResolver::load_pending)
//! finishes it once the caller is back in async code.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use store::{DataError, RecordStore, ThemeMode, DEFAULT_PRIMARY};

use crate::auth::Session;
use crate::profile::{ProfileOutcome, ProfileReconciler, ThemePatch};

/// Light or dark appearance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Light,
    Dark,
}

impl ColorScheme {
    /// Read a device report. Only `"dark"` is dark; anything else, including no
    /// report at all, is light.
    pub fn from_device(report: Option<&str>) -> Self {
        match report {
            Some("dark") => Self::Dark,
            _ => Self::Light,
        }
    }
}

/// Pick the appearance for `mode`, deferring to the device when the mode is `system`.
pub fn resolve_scheme(device: Option<ColorScheme>, mode: ThemeMode) -> ColorScheme {
    match mode {
        ThemeMode::System => device.unwrap_or_default(),
        ThemeMode::Light => ColorScheme::Light,
        ThemeMode::Dark => ColorScheme::Dark,
    }
}

fn is_hex_color(s: &str) -> bool {
    s.len() == 7
        && s.starts_with('#')
        && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Uppercased `#RRGGBB`, or [`DEFAULT_PRIMARY`] for anything else. Never fails.
pub fn resolve_color(input: &str) -> String {
    let v = input.trim();
    if is_hex_color(v) {
        v.to_ascii_uppercase()
    } else {
        DEFAULT_PRIMARY.to_string()
    }
}

const DANGER: &str = "#EF4444";

/// Colors every screen draws with.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Palette {
    pub primary: String,
    pub background: String,
    pub card: String,
    pub text: String,
    pub border: String,
    pub muted_text: String,
    pub danger: String,
}

/// Palette for `scheme` with `accent` as the primary color.
pub fn derive_palette(scheme: ColorScheme, accent: &str) -> Palette {
    let (background, card, text, border, muted_text) = match scheme {
        ColorScheme::Dark => ("#0B1220", "#111827", "#F9FAFB", "#243044", "#9CA3AF"),
        ColorScheme::Light => ("#F9FAFB", "#FFFFFF", "#1F2937", "#E5E7EB", "#6B7280"),
    };
    Palette {
        primary: accent.to_string(),
        background: background.to_string(),
        card: card.to_string(),
        text: text.to_string(),
        border: border.to_string(),
        muted_text: muted_text.to_string(),
        danger: DANGER.to_string(),
    }
}

/// Colors handed to the navigation container.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NavigationColors {
    pub primary: String,
    pub background: String,
    pub card: String,
    pub text: String,
    pub border: String,
    pub notification: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NavigationTheme {
    pub dark: bool,
    pub colors: NavigationColors,
}

impl NavigationTheme {
    pub fn from_palette(scheme: ColorScheme, palette: &Palette) -> Self {
        Self {
            dark: scheme == ColorScheme::Dark,
            colors: NavigationColors {
                primary: palette.primary.clone(),
                background: palette.background.clone(),
                card: palette.card.clone(),
                text: palette.text.clone(),
                border: palette.border.clone(),
                notification: palette.primary.clone(),
            },
        }
    }
}

/// The user's choice, before the device is taken into account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThemePreferences {
    pub mode: ThemeMode,
    pub color: String,
}

impl Default for ThemePreferences {
    fn default() -> Self {
        Self {
            mode: ThemeMode::System,
            color: DEFAULT_PRIMARY.to_string(),
        }
    }
}

/// Everything a screen needs to draw itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedTheme {
    pub mode: ThemeMode,
    pub color: String,
    pub scheme: ColorScheme,
    pub palette: Palette,
    pub navigation: NavigationTheme,
}

impl ResolvedTheme {
    pub fn resolve(device: Option<ColorScheme>, prefs: &ThemePreferences) -> Self {
        let scheme = resolve_scheme(device, prefs.mode);
        let palette = derive_palette(scheme, &prefs.color);
        let navigation = NavigationTheme::from_palette(scheme, &palette);
        Self {
            mode: prefs.mode,
            color: prefs.color.clone(),
            scheme,
            palette,
            navigation,
        }
    }
}

/// Proof of a user change; see [`PreferenceResolver::finish_load`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    user: Option<(String, String)>,
}

#[derive(Debug, Default)]
struct State {
    device: Option<ColorScheme>,
    prefs: ThemePreferences,
    user_id: Option<String>,
}

/// In-memory theme state for the current user.
pub struct PreferenceResolver<S: RecordStore> {
    profiles: ProfileReconciler<S>,
    state: Mutex<State>,
    generation: AtomicU64,
    pending: Mutex<Option<LoadTicket>>,
}

impl<S: RecordStore> PreferenceResolver<S> {
    pub fn new(profiles: ProfileReconciler<S>) -> Self {
        Self {
            profiles,
            state: Mutex::new(State::default()),
            generation: AtomicU64::new(0),
            pending: Mutex::new(None),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn profiles(&self) -> &ProfileReconciler<S> {
        &self.profiles
    }

    pub fn set_device_scheme(&self, report: Option<&str>) {
        self.state().device = report.map(|r| ColorScheme::from_device(Some(r)));
    }

    pub fn preferences(&self) -> ThemePreferences {
        self.state().prefs.clone()
    }

    pub fn resolved(&self) -> ResolvedTheme {
        let state = self.state();
        ResolvedTheme::resolve(state.device, &state.prefs)
    }

    /// Reset to defaults for a new user (or none) and start a load.
    pub fn begin_user_change(&self, session: Option<&Session>) -> LoadTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.state();
        state.prefs = ThemePreferences::default();
        state.user_id = session.map(|s| s.user_id().to_string());
        LoadTicket {
            generation,
            user: session.map(|s| (s.user_id().to_string(), s.user.email.clone())),
        }
    }

    /// [`begin_user_change`](Self::begin_user_change), keeping the ticket for
    /// [`load_pending`](Self::load_pending). Safe to call from a session listener.
    pub fn reset_for(&self, session: Option<&Session>) {
        let ticket = self.begin_user_change(session);
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(ticket);
    }

    /// Finish the load started by the last [`reset_for`](Self::reset_for), if any.
    pub async fn load_pending(&self) -> Option<ProfileOutcome> {
        let ticket = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;
        self.finish_load(ticket).await
    }

    fn is_current(&self, ticket: &LoadTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.generation
    }

    /// Load the ticket's user's saved preferences. Returns `None` without touching
    /// state if no user is signed in or the ticket was superseded meanwhile.
    pub async fn finish_load(&self, ticket: LoadTicket) -> Option<ProfileOutcome> {
        let (user_id, email) = ticket.user.clone()?;
        let outcome = self.profiles.reconcile(&user_id, &email).await;
        if !self.is_current(&ticket) {
            tracing::debug!("Discarding stale preference load for {}", user_id);
            return None;
        }

        let profile = outcome.profile();
        let prefs = ThemePreferences {
            mode: profile.theme_mode,
            color: resolve_color(profile.theme_color.as_deref().unwrap_or(DEFAULT_PRIMARY)),
        };
        self.state().prefs = prefs;
        Some(outcome)
    }

    /// Reset and load in one go.
    pub async fn load_for_user(&self, session: Option<&Session>) -> Option<ProfileOutcome> {
        let ticket = self.begin_user_change(session);
        self.finish_load(ticket).await
    }

    /// Apply `mode` now, then save it. A failed save is returned but not rolled back.
    pub async fn set_mode(&self, mode: ThemeMode) -> Result<(), DataError> {
        let user_id = {
            let mut state = self.state();
            state.prefs.mode = mode;
            state.user_id.clone()
        };
        let patch = ThemePatch {
            theme_mode: Some(mode),
            ..Default::default()
        };
        self.persist(user_id, patch).await
    }

    /// Apply `input` (validated, falling back to the default accent) now, then save it.
    /// Returns the color actually applied.
    pub async fn set_color(&self, input: &str) -> Result<String, DataError> {
        let color = resolve_color(input);
        let user_id = {
            let mut state = self.state();
            state.prefs.color = color.clone();
            state.user_id.clone()
        };
        let patch = ThemePatch {
            theme_color: Some(color.clone()),
            ..Default::default()
        };
        self.persist(user_id, patch).await?;
        Ok(color)
    }

    async fn persist(&self, user_id: Option<String>, patch: ThemePatch) -> Result<(), DataError> {
        let Some(user_id) = user_id else {
            return Ok(());
        };
        self.profiles
            .update_theme(&user_id, &patch)
            .await
            .inspect_err(|e| tracing::warn!("Theme change kept locally, save failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuthUser;
    use store::{Collection, MemoryStore, Operation};

    fn session(id: &str) -> Session {
        Session::new(AuthUser::new(id, format!("{id}@example.com")), "token")
    }

    fn resolver(store: &MemoryStore) -> PreferenceResolver<MemoryStore> {
        PreferenceResolver::new(ProfileReconciler::new(store.clone()))
    }

    #[test]
    fn test_resolve_scheme_table() {
        let devices = [
            Some(ColorScheme::Light),
            Some(ColorScheme::Dark),
            None,
        ];
        for device in devices {
            assert_eq!(resolve_scheme(device, ThemeMode::Light), ColorScheme::Light);
            assert_eq!(resolve_scheme(device, ThemeMode::Dark), ColorScheme::Dark);
            let expected = if device == Some(ColorScheme::Dark) {
                ColorScheme::Dark
            } else {
                ColorScheme::Light
            };
            assert_eq!(resolve_scheme(device, ThemeMode::System), expected);
        }
    }

    #[test]
    fn test_device_report() {
        assert_eq!(ColorScheme::from_device(Some("dark")), ColorScheme::Dark);
        assert_eq!(ColorScheme::from_device(Some("light")), ColorScheme::Light);
        assert_eq!(ColorScheme::from_device(Some("Dark")), ColorScheme::Light);
        assert_eq!(ColorScheme::from_device(None), ColorScheme::Light);
    }

    #[test]
    fn test_resolve_color() {
        assert_eq!(resolve_color("#8b5cf6"), "#8B5CF6");
        assert_eq!(resolve_color("#AbCdEf"), "#ABCDEF");
        assert_eq!(resolve_color(" #10b981 "), "#10B981");
        for bad in ["", "blue", "#FFF", "8B5CF6", "#8B5CF6F", "#GGGGGG", "##12345"] {
            assert_eq!(resolve_color(bad), DEFAULT_PRIMARY, "input {bad:?}");
        }
    }

    #[test]
    fn test_palette_tables() {
        let light = derive_palette(ColorScheme::Light, "#10B981");
        assert_eq!(light.primary, "#10B981");
        assert_eq!(light.background, "#F9FAFB");
        assert_eq!(light.card, "#FFFFFF");
        assert_eq!(light.text, "#1F2937");

        let dark = derive_palette(ColorScheme::Dark, "#10B981");
        assert_eq!(dark.background, "#0B1220");
        assert_eq!(dark.muted_text, "#9CA3AF");
        assert_eq!(dark.danger, light.danger);
    }

    #[test]
    fn test_palette_is_deterministic() {
        let build = || {
            derive_palette(
                resolve_scheme(Some(ColorScheme::Dark), ThemeMode::System),
                &resolve_color("#ec4899"),
            )
        };
        let a = serde_json::to_vec(&build()).unwrap();
        let b = serde_json::to_vec(&build()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_navigation_theme() {
        let palette = derive_palette(ColorScheme::Dark, "#F59E0B");
        let nav = NavigationTheme::from_palette(ColorScheme::Dark, &palette);
        assert!(nav.dark);
        assert_eq!(nav.colors.notification, "#F59E0B");
        assert_eq!(nav.colors.card, palette.card);
    }

    #[tokio::test]
    async fn test_load_applies_saved_values() {
        let store = MemoryStore::new();
        let theme = resolver(&store);
        let ann = session("ann");
        theme.load_for_user(Some(&ann)).await;

        theme.set_mode(ThemeMode::Dark).await.unwrap();
        theme.set_color("#ec4899").await.unwrap();

        // A fresh resolver, as after a relaunch.
        let relaunched = resolver(&store);
        let outcome = relaunched.load_for_user(Some(&ann)).await.unwrap();
        assert!(matches!(outcome, ProfileOutcome::Found(_)));
        assert_eq!(
            relaunched.preferences(),
            ThemePreferences {
                mode: ThemeMode::Dark,
                color: "#EC4899".to_string(),
            }
        );
        assert_eq!(relaunched.resolved().scheme, ColorScheme::Dark);
    }

    #[tokio::test]
    async fn test_persisted_garbage_color_reads_as_default() {
        let store = MemoryStore::new();
        let profiles = ProfileReconciler::new(store.clone());
        profiles.ensure_profile("ann", "ann@example.com").await.unwrap();
        profiles
            .update_theme(
                "ann",
                &ThemePatch {
                    theme_color: Some("not-a-color".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let theme = PreferenceResolver::new(profiles);
        theme.load_for_user(Some(&session("ann"))).await;
        assert_eq!(theme.preferences().color, DEFAULT_PRIMARY);
    }

    #[tokio::test]
    async fn test_no_leak_between_users() {
        let store = MemoryStore::new();
        let theme = resolver(&store);
        theme.load_for_user(Some(&session("ann"))).await;
        theme.set_mode(ThemeMode::Dark).await.unwrap();
        theme.set_color("#EF4444").await.unwrap();

        // Sign out, then sign in as someone else.
        theme.load_for_user(None).await;
        let ticket = theme.begin_user_change(Some(&session("bob")));
        assert_eq!(theme.preferences(), ThemePreferences::default());

        theme.finish_load(ticket).await.unwrap();
        assert_eq!(theme.preferences(), ThemePreferences::default());
    }

    #[tokio::test]
    async fn test_pending_load_is_taken_once() {
        let store = MemoryStore::new();
        let theme = resolver(&store);
        assert!(theme.load_pending().await.is_none());

        theme.reset_for(Some(&session("ann")));
        assert!(matches!(
            theme.load_pending().await,
            Some(ProfileOutcome::CreatedDefault(_))
        ));
        assert!(theme.load_pending().await.is_none());

        // A newer reset supersedes the parked one.
        theme.reset_for(Some(&session("ann")));
        theme.reset_for(None);
        assert!(theme.load_pending().await.is_none());
        assert_eq!(theme.preferences(), ThemePreferences::default());
    }

    #[tokio::test]
    async fn test_stale_load_discarded() {
        let store = MemoryStore::new();
        let profiles = ProfileReconciler::new(store.clone());
        profiles.ensure_profile("ann", "ann@example.com").await.unwrap();
        profiles
            .update_theme(
                "ann",
                &ThemePatch {
                    theme_mode: Some(ThemeMode::Dark),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let theme = PreferenceResolver::new(profiles);

        let ann_ticket = theme.begin_user_change(Some(&session("ann")));
        let bob_ticket = theme.begin_user_change(Some(&session("bob")));

        assert!(theme.finish_load(ann_ticket).await.is_none());
        assert_eq!(theme.preferences().mode, ThemeMode::System);
        assert!(theme.finish_load(bob_ticket).await.is_some());
        assert_eq!(theme.preferences().mode, ThemeMode::System);
    }

    #[tokio::test]
    async fn test_failed_save_is_not_rolled_back() {
        let store = MemoryStore::new();
        let theme = resolver(&store);
        theme.load_for_user(Some(&session("ann"))).await;
        store.fail_on(Collection::Profiles, Operation::Update);

        assert!(theme.set_mode(ThemeMode::Light).await.is_err());
        assert_eq!(theme.preferences().mode, ThemeMode::Light);

        assert!(theme.set_color("#8b5cf6").await.is_err());
        assert_eq!(theme.preferences().color, "#8B5CF6");
    }

    #[tokio::test]
    async fn test_lookup_failure_uses_defaults() {
        let store = MemoryStore::new();
        store.fail_on(Collection::Profiles, Operation::Select);
        let theme = resolver(&store);
        theme.set_device_scheme(Some("dark"));

        let outcome = theme.load_for_user(Some(&session("ann"))).await.unwrap();
        assert!(matches!(outcome, ProfileOutcome::DefaultOnly(_)));
        assert_eq!(theme.preferences(), ThemePreferences::default());
        assert_eq!(theme.resolved().scheme, ColorScheme::Dark);
    }

    #[tokio::test]
    async fn test_signed_out_changes_stay_local() {
        let store = MemoryStore::new();
        let theme = resolver(&store);
        theme.load_for_user(None).await;

        theme.set_mode(ThemeMode::Dark).await.unwrap();
        assert_eq!(theme.preferences().mode, ThemeMode::Dark);
        assert!(store.rows(Collection::Profiles).is_empty());
    }
}
