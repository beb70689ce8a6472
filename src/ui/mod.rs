use leptos::*;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::sync::Arc;

use crate::core::config::GeneratorConfig;
use crate::core::idea::{BookIdea, BookType, GeneratorOptions, Length, TargetAge, Tone};
use crate::core::io::{MemoryStorage, Storage, WebStorage};
use crate::services::catalog::Catalog;
use crate::services::generator::IdeaGenerator;
use crate::services::store::IdeaStore;

#[component]
pub fn App() -> impl IntoView {
    let storage: Arc<dyn Storage> = match WebStorage::new() {
        Ok(s) => Arc::new(s),
        Err(e) => {
            log::warn!("localStorage unavailable, ideas will not survive a reload: {}", e);
            Arc::new(MemoryStorage::new())
        }
    };
    let store = Rc::new(IdeaStore::new(storage));

    view! {
        <div class="app-container">
            <h1>"BookSpark"</h1>
            {match Catalog::builtin() {
                Ok(catalog) => view! { <Workbench catalog=catalog store=store/> }.into_view(),
                Err(e) => view! { <p>"Error loading catalog: " {e.to_string()}</p> }.into_view(),
            }}
        </div>
    }
}

#[component]
pub fn Workbench(catalog: &'static Catalog, store: Rc<IdeaStore>) -> impl IntoView {
    let defaults = GeneratorOptions::default();
    let (book_type, set_book_type) = create_signal(defaults.book_type);
    let (genre, set_genre) = create_signal(defaults.genre);
    let (length, set_length) = create_signal(defaults.length);
    let (target_age, set_target_age) = create_signal(defaults.target_age);
    let (tone, set_tone) = create_signal(defaults.tone);

    let (idea, set_idea) = create_signal(None::<BookIdea>);
    let (favorites, set_favorites) = create_signal(0usize);
    let (status, set_status) = create_signal(String::new());

    let refresh = {
        let store = store.clone();
        move || {
            let store = store.clone();
            spawn_local(async move {
                set_favorites.set(store.get_favorites().await.len());
            });
        }
    };

    // Initial fetch, and pre-fill from the last session
    {
        let store = store.clone();
        let refresh = refresh.clone();
        create_effect(move |_| {
            refresh();
            let store = store.clone();
            spawn_local(async move {
                if let Some(last) = store.last_options().await {
                    set_book_type.set(last.book_type);
                    set_genre.set(last.genre);
                    set_length.set(last.length);
                    set_target_age.set(last.target_age);
                    set_tone.set(last.tone);
                }
            });
        });
    }

    // Keep the genre valid for the selected book type
    create_effect(move |_| {
        let book_type = book_type.get();
        if !catalog.is_known_genre(book_type, &genre.get_untracked()) {
            if let Some(first) = catalog.genres_for(book_type).first() {
                set_genre.set(first.to_string());
            }
        }
    });

    let on_generate = {
        let store = store.clone();
        move |_| {
            let options = GeneratorOptions {
                book_type: book_type.get_untracked(),
                genre: genre.get_untracked(),
                length: length.get_untracked(),
                target_age: target_age.get_untracked(),
                tone: tone.get_untracked(),
            };
            let generated = IdeaGenerator::new(catalog, &GeneratorConfig::default()).generate(&options);
            set_idea.set(Some(generated.clone()));
            set_status.set(String::new());

            let store = store.clone();
            spawn_local(async move {
                store.add_to_history(&generated).await;
                if let Err(e) = store.remember_options(&options).await {
                    log::warn!("Failed to remember options: {}", e);
                }
            });
        }
    };

    let on_save = {
        let store = store.clone();
        let refresh = refresh.clone();
        move |_| {
            let Some(current) = idea.get_untracked() else {
                return;
            };
            let store = store.clone();
            let refresh = refresh.clone();
            spawn_local(async move {
                match store.save_favorite(&current).await {
                    Ok(()) => set_status.set(format!("Saved \"{}\"", current.headline())),
                    Err(e) => set_status.set(e.to_string()),
                }
                refresh();
            });
        }
    };

    let on_clear = move |_| {
        let store = store.clone();
        let refresh = refresh.clone();
        spawn_local(async move {
            if let Err(e) = store.clear_favorites().await {
                leptos::logging::error!("Failed to clear: {:?}", e);
            } else {
                leptos::logging::log!("Cleared!");
                refresh();
            }
        });
    };

    view! {
        <div style="border: 1px solid #ccc; padding: 10px; margin: 10px;">
            <h3>"Options"</h3>
            {enum_select("Book type", BookType::ALL, book_type, set_book_type)}
            <label>
                "Genre"
                <select on:change=move |ev| set_genre.set(event_target_value(&ev))>
                    {move || {
                        catalog
                            .genres_for(book_type.get())
                            .into_iter()
                            .map(|g| view! { <option value=g selected=move || genre.get() == g>{g}</option> })
                            .collect_view()
                    }}
                </select>
            </label>
            {enum_select("Length", Length::ALL, length, set_length)}
            {enum_select("Target age", TargetAge::ALL, target_age, set_target_age)}
            {enum_select("Tone", Tone::ALL, tone, set_tone)}
            <button on:click=on_generate>"Generate"</button>
        </div>
        {move || idea.get().map(|idea| view! { <IdeaCard idea=idea/> })}
        <div style="border: 1px solid #ccc; padding: 10px; margin: 10px;">
            <h3>"Favorites"</h3>
            <p>"Saved ideas: " {move || favorites.get()}</p>
            <button on:click=on_save disabled=move || idea.get().is_none()>"Save to favorites"</button>
            <button on:click=on_clear>"Clear favorites"</button>
            <p>{move || status.get()}</p>
        </div>
    }
}

#[component]
fn IdeaCard(idea: BookIdea) -> impl IntoView {
    let headline = idea.headline().to_string();
    let audience = idea.target_audience.to_string();
    let themes = idea.themes.join(", ");
    let BookIdea {
        title,
        genre,
        concept,
        main_character,
        setting,
        conflict,
        opening_line,
        ..
    } = idea;
    let alternatives = title
        .into_iter()
        .skip(1)
        .map(|t| view! { <li>{t}</li> })
        .collect_view();

    view! {
        <article style="padding: 10px; margin: 10px;">
            <h2>{headline}</h2>
            <ul>{alternatives}</ul>
            <p><b>"Genre: "</b>{genre}" ("{audience}")"</p>
            <p><b>"Concept: "</b>{concept}</p>
            <p><b>"Main character: "</b>{main_character}</p>
            <p><b>"Setting: "</b>{setting}</p>
            <p><b>"Conflict: "</b>{conflict}</p>
            <p><i>{opening_line}</i></p>
            <p><b>"Themes: "</b>{themes}</p>
        </article>
    }
}

fn enum_select<T>(
    label: &'static str,
    all: &'static [T],
    value: ReadSignal<T>,
    set_value: WriteSignal<T>,
) -> impl IntoView
where
    T: Copy + PartialEq + fmt::Display + FromStr + 'static,
{
    view! {
        <label>
            {label}
            <select on:change=move |ev| {
                if let Ok(v) = event_target_value(&ev).parse::<T>() {
                    set_value.set(v);
                }
            }>
                {all
                    .iter()
                    .map(|&v| view! { <option value=v.to_string() selected=move || value.get() == v>{v.to_string()}</option> })
                    .collect_view()}
            </select>
        </label>
    }
}
