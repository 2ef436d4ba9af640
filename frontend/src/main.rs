mod api;
mod components;
mod markdown;
mod models;
mod state;

use leptos::mount::mount_to_body;
use leptos::prelude::*;

use components::chat::ChatArea;
use components::sidebar::Sidebar;
use state::AppState;

/// Root application component.
#[component]
fn App() -> impl IntoView {
    let state = AppState::provide();

    // Modes and the stored theme on mount
    state.load();

    view! {
        <div class="app-container">
            <Sidebar />
            <Show
                when=move || state.session.with(|s| s.is_some())
                fallback=move || {
                    view! {
                        <main class="landing">
                            <h1>"Sarux AI"</h1>
                            <p>"A coding assistant that reads and writes code with you."</p>
                            <button class="open-chat-btn" on:click=move |_| state.open_chat()>
                                "Try Sarux AI"
                            </button>
                        </main>
                    }
                }
            >
                <ChatArea />
            </Show>
        </div>
    }
}

fn main() {
    console_log::init_with_level(log::Level::Debug).expect("Failed to init logger");
    mount_to_body(App);
}
