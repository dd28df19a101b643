
use std::time::Duration;

use foxtrail::client::{HttpGenerator, LocalStorageStore};
use foxtrail::task::BLANK;
use foxtrail::{
    Answer, BiomeConfig, CardState, ChatMessage, ChatRole, Column, DEMO_SWATCHES, EmotionConfig,
    LevelStatus, MemoryProgress, PickOutcome, Preferences, PromptTemplates, RankedEmotions,
    RequestSlot, Rgb, SessionTiming, Task, TaskRunner, TaskSession, TaskState, TrainingError,
    UserInfo, UserInfoUpdate, WorldConfig, chat_reply, complete_level, demo_tasks, frontier,
    generate_descriptors, generate_tasks, generate_world, level_color, level_emotion,
};
use leptos::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use wasm_bindgen::prelude::wasm_bindgen;

const XP_PER_CORRECT_ANSWER: u64 = 10;
const MAX_ATTEMPTS: u32 = 3;

fn set_body_theme(theme: &str) {
    if let Some(document) = leptos::window().document() {
        if let Some(body) = document.body() {
            let _ = body.set_attribute("data-theme", theme);
        }
    }
}

fn prompt_templates() -> Result<PromptTemplates, Banner> {
    PromptTemplates::new(
        include_str!("../prompts/descriptorgenerator.txt"),
        include_str!("../prompts/taskgenerator.txt"),
        Some(include_str!("../prompts/patient_chat.txt").to_string()),
    )
    .map_err(|error| Banner::new(&TrainingError::from(error), Retry::Load))
}

fn runner_for(session: &TaskSession) -> Option<TaskRunner> {
    let mut rng = StdRng::from_entropy();
    session
        .active_runner(&mut rng)
        .map(|runner| runner.with_attempt_limit(MAX_ATTEMPTS))
}

#[derive(Clone, PartialEq)]
struct Target {
    emotion: String,
    level: Option<u32>,
}

#[derive(Clone, PartialEq)]
enum Scene {
    Map,
    Mix,
    Training(Target),
}

/// What "Try again" re-runs.
#[derive(Clone, Copy, PartialEq)]
enum Retry {
    Load,
    Chat,
}

#[derive(Clone, PartialEq)]
struct Banner {
    message: String,
    retry: Option<Retry>,
}

impl Banner {
    fn new(error: &TrainingError, action: Retry) -> Self {
        Self {
            message: error.banner_message(),
            retry: error.is_retryable().then_some(action),
        }
    }
}

#[component]
fn MapScreen(world: RwSignal<Vec<BiomeConfig>>, on_play: Callback<u32>) -> impl IntoView {
    let next_level = move || world.with(|world| frontier(world).map(|level| level.id));

    view! {
        <section class="journey-map">
            {move || {
                next_level()
                    .map(|id| {
                        let on_play = on_play.clone();
                        view! {
                            <button class="primary" on:click=move |_| on_play.call(id)>
                                {format!("Continue at level {}", id)}
                            </button>
                        }
                    })
            }}
            {move || {
                world
                    .with(|world| {
                        world
                            .iter()
                            .map(|biome| {
                                let nodes = biome
                                    .levels
                                    .iter()
                                    .map(|level| {
                                        let id = level.id;
                                        let status = match level.status {
                                            LevelStatus::Locked => "level-node locked",
                                            LevelStatus::Active => "level-node active",
                                            LevelStatus::Completed => "level-node completed",
                                        };
                                        let on_play = on_play.clone();

                                        view! {
                                            <button
                                                class=status
                                                style=format!(
                                                    "position:absolute;left:{:.1}%;top:{:.2}%;\
                                                     transform:translate(-50%,-50%);background:{}",
                                                    level.x,
                                                    level.y,
                                                    level_color(id),
                                                )
                                                disabled=!level.is_playable()
                                                on:click=move |_| on_play.call(id)
                                            >
                                                {id.to_string()}
                                            </button>
                                        }
                                    })
                                    .collect_view();

                                view! {
                                    <div class=format!("biome {}", biome.css_class)>
                                        <h2 class="biome-title">{biome.kind.to_string()}</h2>
                                        <p class="biome-count">
                                            {format!("{} levels", biome.levels.len())}
                                        </p>
                                        <div
                                            class="biome-path"
                                            style=format!(
                                                "position:relative;height:{}px",
                                                biome.height,
                                            )
                                        >
                                            {nodes}
                                        </div>
                                    </div>
                                }
                            })
                            .collect_view()
                    })
            }}
        </section>
    }
}

#[component]
fn MixScreen(
    ranked: StoredValue<Result<RankedEmotions, String>>,
    on_train: Callback<String>,
) -> impl IntoView {
    let (left, set_left) = create_signal(DEMO_SWATCHES[0].to_string());
    let (right, set_right) = create_signal(DEMO_SWATCHES[1].to_string());

    let mixed = create_memo(move |_| Rgb::from_hex(&left.get()).mix(&Rgb::from_hex(&right.get())));
    let emotion = create_memo(move |_| {
        let sample = mixed.get().to_sample();
        ranked.with_value(|ranked| match ranked {
            Ok(ranked) => Ok(ranked.lookup(sample).to_string()),
            Err(message) => Err(message.clone()),
        })
    });

    view! {
        <section class="mix-screen">
            <div class="swatches">
                <input
                    type="color"
                    prop:value=left
                    on:input=move |event| set_left.set(event_target_value(&event))
                />
                <div
                    class="swatch mixed"
                    style=move || format!("background:{}", mixed.get().to_hex())
                ></div>
                <input
                    type="color"
                    prop:value=right
                    on:input=move |event| set_right.set(event_target_value(&event))
                />
            </div>
            {move || match emotion.get() {
                Ok(label) => {
                    let chosen = label.clone();
                    let on_train = on_train.clone();
                    view! {
                        <p class="emotion-label">{label}</p>
                        <button class="primary" on:click=move |_| on_train.call(chosen.clone())>
                            "Train on this feeling"
                        </button>
                    }
                    .into_view()
                }
                Err(message) => view! { <p class="error-banner">{message}</p> }.into_view(),
            }}
        </section>
    }
}

fn task_view(
    runner: &TaskRunner,
    on_answer: impl Fn(Answer) + Copy + 'static,
    on_pick: impl Fn(Column, usize) + Copy + 'static,
) -> View {
    let feedback = match runner.state() {
        TaskState::Correct => "Nice work.",
        TaskState::Incorrect => "Not quite. Try again.",
        TaskState::Locked => "Let's move on.",
        TaskState::Unanswered | TaskState::Selected => "",
    };

    let choice_buttons = |make: fn(&str) -> Answer| {
        runner
            .options()
            .iter()
            .map(|option| {
                let answer = make(option);
                let class = if runner.selected() == Some(&answer) {
                    "option picked"
                } else {
                    "option"
                };
                view! {
                    <button class=class on:click=move |_| on_answer(answer.clone())>
                        {option.clone()}
                    </button>
                }
            })
            .collect_view()
    };

    let body = match runner.task() {
        Task::MultipleChoice(task) => view! {
            <p class="task-question">{task.question.clone()}</p>
            <div class="options-grid">
                {choice_buttons(|option| Answer::Choice(option.to_string()))}
            </div>
        }
        .into_view(),
        Task::TrueFalse(task) => view! {
            <p class="task-question">{task.question.clone()}</p>
            <div class="options-grid">
                {choice_buttons(|option| Answer::Bool(option == "True"))}
            </div>
        }
        .into_view(),
        Task::FillInBlank(task) => {
            let (before, after) = task.split_question();
            let filled = match runner.selected() {
                Some(Answer::Word(word)) => word.clone(),
                _ => BLANK.to_string(),
            };
            view! {
                <p class="task-question">
                    {before.to_string()}
                    <span class="blank">{filled}</span>
                    {after.to_string()}
                </p>
                <div class="word-bank">
                    {choice_buttons(|option| Answer::Word(option.to_string()))}
                </div>
            }
            .into_view()
        }
        Task::MatchDefinition(_) => match runner.board() {
            Some(board) => {
                let column_view = |column: Column| {
                    board
                        .cards(column)
                        .iter()
                        .enumerate()
                        .map(|(index, card)| {
                            let class = match board.card_state(column, index) {
                                CardState::Default => "card",
                                CardState::Picked => "card picked",
                                CardState::Matched => "card matched",
                                CardState::Error => "card error",
                            };
                            view! {
                                <button
                                    class=class
                                    disabled=card.matched
                                    on:click=move |_| on_pick(column, index)
                                >
                                    {card.text.clone()}
                                </button>
                            }
                        })
                        .collect_view()
                };

                view! {
                    <p class="task-question">"Match each term with its definition."</p>
                    <div class="match-board">
                        <div class="match-column">{column_view(Column::Terms)}</div>
                        <div class="match-column">{column_view(Column::Definitions)}</div>
                    </div>
                }
                .into_view()
            }
            None => ().into_view(),
        },
    };

    view! {
        <div class="task-card">
            <p class="eyebrow">{runner.task().kind_label()}</p>
            {body}
            <p class="feedback-text">{feedback}</p>
        </div>
    }
    .into_view()
}

#[component]
fn ChatPanel(
    messages: RwSignal<Vec<ChatMessage>>,
    replying: RwSignal<bool>,
    on_send: Callback<String>,
) -> impl IntoView {
    let draft = create_rw_signal(String::new());

    let submit = move |event: ev::SubmitEvent| {
        event.prevent_default();
        let text = draft.get_untracked().trim().to_string();
        if text.is_empty() || replying.get_untracked() {
            return;
        }
        draft.set(String::new());
        on_send.call(text);
    };

    view! {
        <section class="chat-panel">
            <h3>"Talk with the patient"</h3>
            <div class="chat-log">
                {move || {
                    messages
                        .with(|messages| {
                            messages
                                .iter()
                                .map(|message| {
                                    let class = match message.role {
                                        ChatRole::User => "chat-message user",
                                        ChatRole::Model => "chat-message patient",
                                    };
                                    view! { <p class=class>{message.content.clone()}</p> }
                                })
                                .collect_view()
                        })
                }}
                {move || replying.get().then(|| view! { <p class="chat-message typing">"..."</p> })}
            </div>
            <form class="chat-input" on:submit=submit>
                <input
                    type="text"
                    placeholder="Say something"
                    prop:value=draft
                    on:input=move |event| draft.set(event_target_value(&event))
                />
                <button class="pill" type="submit" disabled=move || replying.get()>
                    "Send"
                </button>
            </form>
        </section>
    }
}

#[component]
fn TrainingScreen(
    target: Target,
    on_finish: Callback<usize>,
    on_back: Callback<()>,
) -> impl IntoView {
    let timing = SessionTiming::default();
    let templates = prompt_templates();
    let load_slot = RequestSlot::new();
    let chat_slot = RequestSlot::new();
    {
        let load_slot = load_slot.clone();
        let chat_slot = chat_slot.clone();
        on_cleanup(move || {
            load_slot.cancel();
            chat_slot.cancel();
        });
    }

    let descriptors = create_rw_signal::<Option<String>>(None);
    let session = create_rw_signal::<Option<TaskSession>>(None);
    let runner = create_rw_signal::<Option<TaskRunner>>(None);
    let banner = create_rw_signal::<Option<Banner>>(None);
    let loading = create_rw_signal(false);
    let messages = create_rw_signal(Vec::<ChatMessage>::new());
    let replying = create_rw_signal(false);

    let start_session = move |tasks: Vec<Task>| {
        let next = TaskSession::new(tasks);
        runner.set(runner_for(&next));
        session.set(Some(next));
    };

    let load = store_value({
        let templates = templates.clone();
        let emotion = target.emotion.clone();
        let load_slot = load_slot.clone();
        move || {
            let templates = match templates.clone() {
                Ok(templates) => templates,
                Err(error) => {
                    banner.set(Some(error));
                    return;
                }
            };
            let emotion = emotion.clone();
            let cancel = load_slot.begin();

            loading.set(true);
            banner.set(None);

            spawn_local(async move {
                let generator = HttpGenerator::default();
                let result = async {
                    let found =
                        generate_descriptors(&generator, &templates, &emotion, &cancel).await?;
                    let tasks =
                        generate_tasks(&generator, &templates, &emotion, Some(&found), &cancel)
                            .await?;
                    Ok::<_, TrainingError>((found, tasks))
                }
                .await;

                if cancel.is_cancelled() {
                    return;
                }
                loading.set(false);

                match result {
                    Ok((found, tasks)) => {
                        descriptors.set(Some(found));
                        start_session(tasks);
                    }
                    Err(error) => banner.set(Some(Banner::new(&error, Retry::Load))),
                }
            });
        }
    });

    // Asks for the patient's answer to the transcript as it stands.
    let ask_patient = store_value({
        let emotion = target.emotion.clone();
        move || {
            let templates = match templates.clone() {
                Ok(templates) => templates,
                Err(error) => {
                    banner.set(Some(error));
                    return;
                }
            };
            let emotion = emotion.clone();
            let history = messages.get_untracked();
            let found = descriptors.get_untracked();
            let cancel = chat_slot.begin();

            replying.set(true);
            banner.set(None);

            spawn_local(async move {
                let reply = chat_reply(
                    &HttpGenerator::default(),
                    &templates,
                    Some(&emotion),
                    found.as_deref(),
                    &history,
                    &cancel,
                )
                .await;

                if cancel.is_cancelled() {
                    return;
                }
                replying.set(false);

                match reply {
                    Ok(reply) => messages.update(|messages| messages.push(reply)),
                    Err(error) => banner.set(Some(Banner::new(&error, Retry::Chat))),
                }
            });
        }
    });

    let send_chat = Callback::new(move |text: String| {
        messages.update(|messages| messages.push(ChatMessage::user(text)));
        ask_patient.with_value(|ask| ask());
    });

    load.with_value(|load| load());

    let use_practice_set = move |_| {
        load_slot.cancel();
        loading.set(false);
        banner.set(None);
        start_session(demo_tasks());
    };

    let finish_task = move |is_correct: bool| {
        set_timeout(
            move || {
                let next = session
                    .try_update(|current| {
                        let current = current.as_mut()?;
                        current.advance(is_correct).ok()?;
                        Some(runner_for(current))
                    })
                    .flatten();

                if let Some(next) = next {
                    runner.set(next);
                }
            },
            Duration::from_millis(u64::from(timing.success_display_ms)),
        );
    };

    let on_answer = move |answer: Answer| {
        let evaluation = runner
            .try_update(|current| current.as_mut().map(|current| current.submit(answer)))
            .flatten();

        match evaluation {
            Some(Ok(evaluation)) => {
                if let Some(completion) = evaluation.completion {
                    finish_task(completion.is_correct);
                }
            }
            Some(Err(error)) => log::debug!("answer ignored: {}", error),
            None => {}
        }
    };

    let on_pick = move |column: Column, index: usize| {
        let outcome = runner
            .try_update(|current| current.as_mut().map(|current| current.pick(column, index)))
            .flatten();

        match outcome {
            Some(Ok(PickOutcome::Matched {
                completion: Some(completion),
            })) => finish_task(completion.is_correct),
            Some(Ok(PickOutcome::Mismatched)) => set_timeout(
                move || {
                    runner.update(|current| {
                        if let Some(current) = current {
                            current.reset();
                        }
                    })
                },
                Duration::from_millis(u64::from(timing.mismatch_flash_ms)),
            ),
            Some(Ok(_)) => {}
            Some(Err(error)) => log::debug!("pick ignored: {}", error),
            None => {}
        }
    };

    let on_skip = move |_| {
        let completion = runner
            .try_update(|current| current.as_mut().and_then(TaskRunner::forfeit))
            .flatten();
        if let Some(completion) = completion {
            finish_task(completion.is_correct);
        }
    };

    let progress = move || {
        session.with(|session| {
            session
                .as_ref()
                .map(TaskSession::progress_percent)
                .unwrap_or(0)
        })
    };

    let emotion = target.emotion.clone();

    view! {
        <section class="training-screen">
            <header class="training-header">
                <button class="pill" on:click=move |_| on_back.call(())>"Back"</button>
                <h2 class="emotion-label">{emotion}</h2>
                <div class="progress-bar">
                    <div class="progress-fill" style=move || format!("width:{}%", progress())></div>
                </div>
            </header>

            {move || {
                descriptors
                    .get()
                    .map(|found| view! { <p class="descriptors">{found}</p> })
            }}

            {move || {
                banner
                    .get()
                    .map(|banner| {
                        let busy = loading.get() || replying.get();
                        let retry = banner
                            .retry
                            .filter(|_| !busy)
                            .map(|action| {
                                view! {
                                    <button
                                        class="pill"
                                        on:click=move |_| match action {
                                            Retry::Load => load.with_value(|load| load()),
                                            Retry::Chat => ask_patient.with_value(|ask| ask()),
                                        }
                                    >
                                        "Try again"
                                    </button>
                                }
                            });
                        view! {
                            <div class="error-banner">
                                <p>{banner.message}</p>
                                {retry}
                                <button class="pill" on:click=use_practice_set.clone()>
                                    "Use the practice set"
                                </button>
                            </div>
                        }
                    })
            }}

            {move || loading.get().then(|| view! { <p class="loading">"Preparing exercises..."</p> })}

            {move || {
                let summary = session
                    .with(|session| {
                        session
                            .as_ref()
                            .filter(|session| session.state().completed)
                            .map(|session| (session.state().score, session.total()))
                    });

                match summary {
                    Some((score, total)) => {
                        let on_finish = on_finish.clone();
                        view! {
                            <div class="session-summary">
                                <p>{format!("You got {} of {} right.", score, total)}</p>
                                <button class="primary" on:click=move |_| on_finish.call(score)>
                                    "Continue"
                                </button>
                            </div>
                        }
                        .into_view()
                    }
                    None => runner
                        .with(|current| {
                            current
                                .as_ref()
                                .map(|current| {
                                    let finished = current.is_finished();
                                    view! {
                                        {task_view(current, on_answer, on_pick)}
                                        <button class="pill" disabled=finished on:click=on_skip>
                                            "Skip"
                                        </button>
                                    }
                                    .into_view()
                                })
                        })
                        .unwrap_or_else(|| ().into_view()),
                }
            }}

            <ChatPanel messages=messages replying=replying on_send=send_chat />
        </section>
    }
}

#[component]
fn App() -> impl IntoView {
    let preferences = create_rw_signal(Preferences::load(&LocalStorageStore));
    let user = create_rw_signal(UserInfo::load(&LocalStorageStore));
    let scene = create_rw_signal(Scene::Map);

    let ranked = store_value(RankedEmotions::bundled().map_err(|error| error.to_string()));
    let progress = store_value(MemoryProgress::new());
    let world = create_rw_signal(generate_world(&WorldConfig::default()));

    create_effect(move |_| {
        set_body_theme(preferences.get().theme());
    });

    let toggle_theme = move |_| {
        preferences.update(|preferences| preferences.toggle_dark_mode(&mut LocalStorageStore));
    };

    let play = Callback::new(move |level: u32| {
        let emotion = ranked.with_value(|ranked| {
            ranked
                .as_ref()
                .ok()
                .map(|ranked| level_emotion(level, ranked, &EmotionConfig::default()).to_string())
        });

        match emotion {
            Some(emotion) => scene.set(Scene::Training(Target {
                emotion,
                level: Some(level),
            })),
            None => log::warn!("no emotion list available for level {}", level),
        }
    });

    let train = Callback::new(move |emotion: String| {
        scene.set(Scene::Training(Target {
            emotion,
            level: None,
        }));
    });

    let finish = Callback::new(move |score: usize| {
        if let Scene::Training(Target {
            level: Some(level), ..
        }) = scene.get_untracked()
        {
            world.update(|world| {
                progress.update_value(|progress| {
                    complete_level(world, progress, level);
                });
            });
        }

        user.update(|user| {
            let fields = UserInfoUpdate {
                xp: Some(user.xp + score as u64 * XP_PER_CORRECT_ANSWER),
                streak: Some(user.streak + 1),
                ..UserInfoUpdate::default()
            };
            user.update(fields, &mut LocalStorageStore);
        });

        scene.set(Scene::Map);
    });

    let back = Callback::new(move |_: ()| scene.set(Scene::Map));

    view! {
        <main class="page">
            <header class="page-header">
                <div>
                    <p class="eyebrow">{move || user.with(|user| user.username.clone())}</p>
                    <p class="value">
                        {move || user.with(|user| format!("{} XP, {} day streak", user.xp, user.streak))}
                    </p>
                </div>
                <div class="header-actions">
                    <button class="pill" on:click=move |_| scene.set(Scene::Map)>"Journey"</button>
                    <button class="pill" on:click=move |_| scene.set(Scene::Mix)>"Mix a feeling"</button>
                    <button class="pill" on:click=toggle_theme>
                        {move || {
                            if preferences.get().dark_mode { "Switch to light" } else { "Switch to dark" }
                        }}
                    </button>
                </div>
            </header>

            {move || match scene.get() {
                Scene::Map => view! { <MapScreen world=world on_play=play.clone() /> }.into_view(),
                Scene::Mix => {
                    view! { <MixScreen ranked=ranked on_train=train.clone() /> }.into_view()
                }
                Scene::Training(target) => {
                    view! {
                        <TrainingScreen
                            target=target
                            on_finish=finish.clone()
                            on_back=back.clone()
                        />
                    }
                    .into_view()
                }
            }}
        </main>
    }
}

#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    mount_to_body(|| view! { <App /> });
}
