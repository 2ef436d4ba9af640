use std::future::Future;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use leptos::prelude::*;
use leptos::task::spawn_local;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use crate::api;
use crate::models::{GenerationOverrides, ModeInfo, SessionView, ThemeView};

const CLIENT_ID_KEY: &str = "sarux.client_id";

/// Shared application state, provided via Leptos context.
#[derive(Clone, Copy)]
pub struct AppState {
    pub client_id: StoredValue<String>,

    // --- Read signals (for components to subscribe to) ---
    pub session: ReadSignal<Option<SessionView>>,
    pub modes: ReadSignal<Vec<ModeInfo>>,
    pub theme: ReadSignal<Option<ThemeView>>,
    pub is_sending: ReadSignal<bool>,
    pub error: ReadSignal<Option<String>>,

    // --- Write signals (for mutating state) ---
    pub set_session: WriteSignal<Option<SessionView>>,
    pub set_modes: WriteSignal<Vec<ModeInfo>>,
    pub set_theme: WriteSignal<Option<ThemeView>>,
    pub set_is_sending: WriteSignal<bool>,
    pub set_error: WriteSignal<Option<String>>,
}

impl AppState {
    /// Create a new `AppState` and provide it in the current Leptos context.
    pub fn provide() -> Self {
        let (session, set_session) = signal(None::<SessionView>);
        let (modes, set_modes) = signal(Vec::<ModeInfo>::new());
        let (theme, set_theme) = signal(None::<ThemeView>);
        let (is_sending, set_is_sending) = signal(false);
        let (error, set_error) = signal(None::<String>);

        let state = Self {
            client_id: StoredValue::new(load_client_id()),
            session,
            modes,
            theme,
            is_sending,
            error,
            set_session,
            set_modes,
            set_theme,
            set_is_sending,
            set_error,
        };

        provide_context(state);
        state
    }

    /// Load the mode list and the stored theme.
    pub fn load(&self) {
        let state = *self;
        spawn_local(async move {
            match api::fetch_modes().await {
                Ok(modes) => state.set_modes.set(modes),
                Err(e) => {
                    log::error!("Failed to fetch modes: {e}");
                    state.set_error.set(Some(e));
                }
            }

            let client_id = state.client_id.get_value();
            match api::fetch_theme(&client_id).await {
                Ok(view) => state.apply_theme(view),
                Err(e) => log::warn!("Failed to fetch theme: {e}"),
            }
        });
    }

    /// Opens the chat widget; the backend restores history for this client.
    pub fn open_chat(&self) {
        let state = *self;
        spawn_local(async move {
            let client_id = state.client_id.get_value();
            match api::open_session(&client_id).await {
                Ok(view) => {
                    state.set_error.set(None);
                    state.set_session.set(Some(view));
                }
                Err(e) => {
                    log::error!("Failed to open session: {e}");
                    state.set_error.set(Some(e));
                }
            }
        });
    }

    pub fn close_chat(&self) {
        let Some(id) = self.session_id() else {
            return;
        };
        self.set_session.set(None);
        self.set_is_sending.set(false);
        spawn_local(async move {
            if let Err(e) = api::close_session(&id).await {
                log::warn!("Failed to close session {id}: {e}");
            }
        });
    }

    pub fn send_message(&self, text: String) {
        if self.is_sending.get_untracked() || self.session_id().is_none() {
            return;
        }
        self.set_is_sending.set(true);
        let set_is_sending = self.set_is_sending;
        self.run(move |id| async move {
            let result = api::submit(&id, text).await;
            set_is_sending.set(false);
            result
        });
    }

    /// Reads a picked file and stages it; the backend validates type and size.
    pub fn stage_file(&self, file: web_sys::File) {
        let name = file.name();
        let media_type = file.type_();
        self.run(move |id| async move {
            let buffer = JsFuture::from(file.array_buffer())
                .await
                .map_err(|e| format!("Failed to read {name}: {e:?}"))?;
            let bytes = js_sys::Uint8Array::new(&buffer).to_vec();
            api::stage_attachment(&id, &name, &media_type, STANDARD.encode(bytes)).await
        });
    }

    pub fn unstage(&self, attachment_id: String) {
        self.run(move |id| async move { api::unstage_attachment(&id, &attachment_id).await });
    }

    pub fn set_mode(&self, mode: String) {
        self.run(move |id| async move { api::set_mode(&id, &mode).await });
    }

    pub fn update_settings(&self, overrides: GenerationOverrides) {
        self.run(move |id| async move { api::set_settings(&id, &overrides).await });
    }

    /// `undo`, `redo` or `clear`.
    pub fn session_action(&self, action: &'static str) {
        self.run(move |id| async move { api::session_action(&id, action).await });
    }

    /// `improve`, `like`, `pin` or `save`.
    pub fn message_action(&self, message_id: u64, action: &'static str) {
        self.run(move |id| async move { api::message_action(&id, message_id, action).await });
    }

    pub fn edit_message(&self, message_id: u64, content: String) {
        self.run(move |id| async move { api::edit_message(&id, message_id, content).await });
    }

    pub fn clear_saved(&self) {
        self.run(|id| async move { api::clear_saved(&id).await });
    }

    pub fn toggle_theme(&self) {
        let state = *self;
        spawn_local(async move {
            let client_id = state.client_id.get_value();
            match api::toggle_theme(&client_id).await {
                Ok(view) => state.apply_theme(view),
                Err(e) => {
                    log::error!("Failed to toggle theme: {e}");
                    state.set_error.set(Some(e));
                }
            }
        });
    }

    fn session_id(&self) -> Option<String> {
        self.session.with_untracked(|s| s.as_ref().map(|s| s.id.clone()))
    }

    /// Runs a session call and replaces the view with whatever it returns.
    fn run<F, Fut>(&self, call: F)
    where
        F: FnOnce(String) -> Fut + 'static,
        Fut: Future<Output = Result<SessionView, String>> + 'static,
    {
        let Some(id) = self.session_id() else {
            return;
        };
        let state = *self;
        spawn_local(async move {
            match call(id).await {
                Ok(view) => {
                    state.set_error.set(None);
                    // The widget may have been closed while the call was in flight.
                    if state.session_id().as_deref() == Some(view.id.as_str()) {
                        state.set_session.set(Some(view));
                    }
                }
                Err(e) => {
                    log::error!("Session call failed: {e}");
                    state.set_error.set(Some(e));
                }
            }
        });
    }

    fn apply_theme(&self, view: ThemeView) {
        apply_tokens(&view);
        self.set_theme.set(Some(view));
    }
}

/// Reads the per-browser client id, minting one on first visit.
fn load_client_id() -> String {
    let storage = web_sys::window().and_then(|w| w.local_storage().ok().flatten());
    if let Some(id) = storage
        .as_ref()
        .and_then(|s| s.get_item(CLIENT_ID_KEY).ok().flatten())
    {
        return id;
    }

    let id = format!(
        "client-{}-{}",
        js_sys::Date::now() as u64,
        (js_sys::Math::random() * 1e9) as u64
    );
    if let Some(storage) = storage {
        if storage.set_item(CLIENT_ID_KEY, &id).is_err() {
            log::warn!("localStorage unavailable; client id will not persist");
        }
    }
    id
}

/// Writes the theme's style variables and class onto the document root.
fn apply_tokens(view: &ThemeView) {
    let Some(root) = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.document_element())
    else {
        return;
    };

    let classes = root.class_list();
    let _ = classes.remove_2("dark", "light");
    let _ = classes.add_1(&view.theme);

    let Ok(root) = root.dyn_into::<web_sys::HtmlElement>() else {
        return;
    };
    let style = root.style();
    let tokens = &view.tokens;
    for (name, value) in [
        ("color-scheme", tokens.color_scheme.as_str()),
        ("--color-background", tokens.background.as_str()),
        ("--color-text", tokens.text.as_str()),
        ("--color-text-secondary", tokens.text_secondary.as_str()),
    ] {
        if let Err(e) = style.set_property(name, value) {
            log::warn!("Failed to set {name}: {e:?}");
        }
    }
}
