use leptos::prelude::*;

use crate::models::{GenerationOverrides, Message};
use crate::state::AppState;

const PREVIEW_CHARS: usize = 80;

fn preview(content: &str) -> String {
    let mut text: String = content.chars().take(PREVIEW_CHARS).collect();
    if content.chars().count() > PREVIEW_CHARS {
        text.push('…');
    }
    text
}

/// Sidebar: theme toggle, history controls and the saved/pinned lists.
#[component]
pub fn Sidebar() -> impl IntoView {
    let state = expect_context::<AppState>();

    let has_session = move || state.session.with(|s| s.is_some());
    let can_undo = move || state.session.with(|s| s.as_ref().is_some_and(|s| s.can_undo));
    let can_redo = move || state.session.with(|s| s.as_ref().is_some_and(|s| s.can_redo));

    view! {
        <aside class="sidebar">
            <div class="sidebar-header">
                <h2>"Sarux AI"</h2>
                <button class="theme-btn" on:click=move |_| state.toggle_theme()>
                    {move || match state.theme.get() {
                        Some(view) if view.theme == "light" => "Dark mode",
                        _ => "Light mode",
                    }}
                </button>
            </div>

            <div class="history-controls">
                <button disabled=move || !can_undo() on:click=move |_| state.session_action("undo")>
                    "Undo"
                </button>
                <button disabled=move || !can_redo() on:click=move |_| state.session_action("redo")>
                    "Redo"
                </button>
                <button disabled=move || !has_session() on:click=move |_| state.session_action("clear")>
                    "Clear chat"
                </button>
            </div>

            <Show when=has_session>
                <SettingsPanel />
            </Show>

            <MessageList
                title="Pinned"
                empty="Nothing pinned"
                messages=Signal::derive(move || {
                    state.session.get()
                        .map(|s| {
                            s.messages
                                .into_iter()
                                .filter(|m| s.pinned.contains(&m.id))
                                .collect()
                        })
                        .unwrap_or_default()
                })
            />

            <MessageList
                title="Saved"
                empty="No saved messages"
                messages=Signal::derive(move || {
                    state.session.get().map(|s| s.saved).unwrap_or_default()
                })
            />
            <button
                class="clear-saved-btn"
                disabled=move || state.session.with(|s| s.as_ref().is_none_or(|s| s.saved.is_empty()))
                on:click=move |_| state.clear_saved()
            >
                "Clear saved"
            </button>
        </aside>
    }
}

#[component]
fn MessageList(
    title: &'static str,
    empty: &'static str,
    messages: Signal<Vec<Message>>,
) -> impl IntoView {
    view! {
        <div class="message-list">
            <h3>{title}</h3>
            {move || {
                let messages = messages.get();
                if messages.is_empty() {
                    view! {
                        <div style="padding:0.5rem;color:var(--text-secondary);font-size:0.85rem">
                            {empty}
                        </div>
                    }.into_any()
                } else {
                    messages
                        .into_iter()
                        .map(|m| {
                            view! {
                                <div class="message-list-item" title=m.created_at.clone()>
                                    {preview(&m.content)}
                                </div>
                            }
                        })
                        .collect_view()
                        .into_any()
                }
            }}
        </div>
    }
}

/// Sampling overrides for the current mode; each change replaces one field.
#[component]
fn SettingsPanel() -> impl IntoView {
    let state = expect_context::<AppState>();

    let params = move || state.session.with(|s| s.as_ref().map(|s| s.params).unwrap_or_default());
    let overrides = move || {
        state
            .session
            .with_untracked(|s| s.as_ref().map(|s| s.overrides.clone()).unwrap_or_default())
    };
    let update = move |apply: fn(&mut GenerationOverrides, &str), value: String| {
        let mut next = overrides();
        apply(&mut next, &value);
        state.update_settings(next);
    };

    view! {
        <div class="settings-panel">
            <h3>"Settings"</h3>
            <label>
                {move || format!("Temperature {:.2}", params().temperature)}
                <input
                    type="range" min="0" max="2" step="0.05"
                    prop:value=move || params().temperature.to_string()
                    on:change=move |ev| update(|o, v| o.temperature = v.parse().ok(), event_target_value(&ev))
                />
            </label>
            <label>
                {move || format!("Top P {:.2}", params().top_p)}
                <input
                    type="range" min="0" max="1" step="0.01"
                    prop:value=move || params().top_p.to_string()
                    on:change=move |ev| update(|o, v| o.top_p = v.parse().ok(), event_target_value(&ev))
                />
            </label>
            <label>
                "Top K"
                <input
                    type="number" min="1"
                    prop:value=move || params().top_k.to_string()
                    on:change=move |ev| update(|o, v| o.top_k = v.parse().ok(), event_target_value(&ev))
                />
            </label>
            <label>
                "Max output tokens"
                <input
                    type="number" min="1" max="8192"
                    prop:value=move || params().max_output_tokens.to_string()
                    on:change=move |ev| {
                        update(|o, v| o.max_output_tokens = v.parse().ok(), event_target_value(&ev))
                    }
                />
            </label>
            <button on:click=move |_| state.update_settings(GenerationOverrides::default())>
                "Reset to mode defaults"
            </button>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::preview;

    #[test]
    fn preview_truncates_long_content() {
        let long = "x".repeat(100);
        let shown = preview(&long);
        assert_eq!(shown.chars().count(), 81);
        assert!(shown.ends_with('…'));
        assert_eq!(preview("short"), "short");
    }
}
