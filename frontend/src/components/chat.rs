use leptos::ev;
use leptos::prelude::*;

use crate::api;
use crate::markdown;
use crate::models::Message;
use crate::state::AppState;

/// Chat widget: notices, mode bar, message log, and input.
#[component]
pub fn ChatArea() -> impl IntoView {
    let state = expect_context::<AppState>();

    let pending = move || state.session.with(|s| s.as_ref().is_some_and(|s| s.is_pending()));

    view! {
        <main class="chat-area">
            // Error banner
            {move || {
                state.error.get().map(|err| {
                    view! {
                        <div class="error-banner">{err}</div>
                    }
                })
            }}

            // Configuration / quota notice raised by the last turn
            {move || {
                state.session.get().and_then(|s| s.notice).map(|notice| {
                    view! {
                        <div class=format!("notice-banner {}", notice.level)>{notice.text}</div>
                    }
                })
            }}

            <div class="chat-header">
                <span>"Sarux AI"</span>
                <button class="close-btn" on:click=move |_| state.close_chat()>
                    "Close"
                </button>
            </div>

            <ModeBar />

            // Messages
            <div class="messages-container">
                {move || {
                    let Some(session) = state.session.get() else {
                        return ().into_any();
                    };
                    if session.messages.is_empty() {
                        view! {
                            <div class="empty-state">
                                "Ask Sarux anything about your code"
                            </div>
                        }.into_any()
                    } else {
                        let session_id = session.id.clone();
                        session.messages
                            .into_iter()
                            .map(|message| {
                                view! {
                                    <MessageBubble message=message session_id=session_id.clone() />
                                }
                            })
                            .collect_view()
                            .into_any()
                    }
                }}
                {move || {
                    pending().then(|| {
                        view! {
                            <div class="message assistant">
                                <div class="role-label">"assistant"</div>
                                <div class="typing-indicator">"Thinking…"</div>
                            </div>
                        }
                    })
                }}
            </div>

            <ChatInput />
        </main>
    }
}

/// One button per response mode; the active one is highlighted.
#[component]
fn ModeBar() -> impl IntoView {
    let state = expect_context::<AppState>();
    let current = move || state.session.with(|s| s.as_ref().map(|s| s.mode.clone()));

    view! {
        <div class="mode-bar">
            {move || {
                let current = current();
                state.modes.get()
                    .into_iter()
                    .map(|info| {
                        let active = current.as_deref() == Some(info.mode.as_str());
                        let title = format!(
                            "temperature {:.1}, max {} tokens",
                            info.defaults.temperature,
                            info.defaults.max_output_tokens,
                        );
                        let mode = info.mode;
                        view! {
                            <button
                                class="mode-btn"
                                class:active=active
                                title=title
                                on:click=move |_| state.set_mode(mode.clone())
                            >
                                {info.label}
                            </button>
                        }
                    })
                    .collect_view()
            }}
        </div>
    }
}

/// A single chat message with its engagement controls.
#[component]
fn MessageBubble(message: Message, session_id: String) -> impl IntoView {
    let state = expect_context::<AppState>();
    let id = message.id;
    let is_user = message.is_user();
    let css_class = match (is_user, message.failed()) {
        (true, _) => "message user",
        (false, true) => "message assistant failed",
        (false, false) => "message assistant",
    };
    let label = if message.edited {
        format!("{} (edited)", message.role)
    } else {
        message.role.clone()
    };

    let pending = move || state.session.with(|s| s.as_ref().is_some_and(|s| s.is_pending()));
    let (editing, set_editing) = signal(false);
    let (edit_text, set_edit_text) = signal(message.content.clone());

    let images = message
        .images
        .iter()
        .map(|image| {
            let src = api::attachment_url(&session_id, &image.attachment_id);
            view! { <img class="message-image" src=src alt=image.name.clone() /> }
        })
        .collect_view();

    let content = message.content.clone();
    let engagement = message.engagement;

    view! {
        <div class=css_class>
            <div class="role-label">{label}</div>
            {images}
            {move || {
                if editing.get() {
                    view! {
                        <div class="edit-box">
                            <textarea
                                prop:value=edit_text
                                on:input=move |ev| set_edit_text.set(event_target_value(&ev))
                            />
                            <button on:click=move |_| {
                                state.edit_message(id, edit_text.get_untracked());
                                set_editing.set(false);
                            }>
                                "Save"
                            </button>
                            <button on:click=move |_| set_editing.set(false)>"Cancel"</button>
                        </div>
                    }.into_any()
                } else {
                    view! { <div class="message-body" inner_html=markdown::to_html(&content)></div> }
                        .into_any()
                }
            }}
            <div class="message-actions">
                <button
                    class:active=engagement.liked
                    on:click=move |_| state.message_action(id, "like")
                >
                    "Like"
                </button>
                <button
                    class:active=engagement.pinned
                    on:click=move |_| state.message_action(id, "pin")
                >
                    "Pin"
                </button>
                <button
                    class:active=engagement.saved
                    on:click=move |_| state.message_action(id, "save")
                >
                    "Save"
                </button>
                {is_user.then(|| {
                    view! {
                        <button disabled=pending on:click=move |_| state.message_action(id, "improve")>
                            "Improve"
                        </button>
                        <button disabled=pending on:click=move |_| set_editing.set(true)>
                            "Edit"
                        </button>
                    }
                })}
            </div>
        </div>
    }
}

/// Staged images waiting for the next submit, each removable.
#[component]
fn StagedAttachments() -> impl IntoView {
    let state = expect_context::<AppState>();

    view! {
        <div class="staged-attachments">
            {move || {
                state.session.get()
                    .map(|s| s.staged)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|staged| {
                        let id = staged.id;
                        let title = format!("{} bytes", staged.size);
                        view! {
                            <span class="staged-chip" title=title>
                                {staged.name}
                                <button
                                    class="chip-remove"
                                    on:click=move |_| state.unstage(id.clone())
                                >
                                    "×"
                                </button>
                            </span>
                        }
                    })
                    .collect_view()
            }}
        </div>
    }
}

/// Chat input form with image picker, textarea and send button.
#[component]
fn ChatInput() -> impl IntoView {
    let state = expect_context::<AppState>();
    let (input, set_input) = signal(String::new());

    let is_sending = move || {
        state.is_sending.get() || state.session.with(|s| s.as_ref().is_some_and(|s| s.is_pending()))
    };
    let has_staged = move || state.session.with(|s| s.as_ref().is_some_and(|s| !s.staged.is_empty()));

    let send = move || {
        let text = input.get_untracked().trim().to_string();
        if (text.is_empty() && !has_staged()) || is_sending() {
            return;
        }
        set_input.set(String::new());
        state.send_message(text);
    };

    let on_keydown = move |ev: ev::KeyboardEvent| {
        if ev.key() == "Enter" && !ev.shift_key() {
            ev.prevent_default();
            send();
        }
    };

    let on_pick = move |ev: ev::Event| {
        let input = event_target::<web_sys::HtmlInputElement>(&ev);
        if let Some(files) = input.files() {
            for index in 0..files.length() {
                if let Some(file) = files.get(index) {
                    state.stage_file(file);
                }
            }
        }
        input.set_value("");
    };

    view! {
        <div class="input-area">
            <StagedAttachments />
            <div class="input-row">
                <label class="attach-btn" title="Attach an image">
                    "Image"
                    <input
                        type="file"
                        accept="image/png,image/jpeg,image/gif"
                        multiple=true
                        style="display:none"
                        on:change=on_pick
                        disabled=is_sending
                    />
                </label>
                <textarea
                    rows="1"
                    placeholder="Ask about code… (Enter to send, Shift+Enter for newline)"
                    prop:value=input
                    on:input=move |ev| {
                        set_input.set(event_target_value(&ev));
                    }
                    on:keydown=on_keydown
                    disabled=is_sending
                />
                <button
                    class="send-btn"
                    on:click=move |_| send()
                    disabled=move || is_sending() || (input.get().trim().is_empty() && !has_staged())
                >
                    {move || if is_sending() { "Sending…" } else { "Send" }}
                </button>
            </div>
        </div>
    }
}
