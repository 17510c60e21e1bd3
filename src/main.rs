use clap::Parser;
use crossterm::event::{read, Event, KeyCode};
use dotenvy::dotenv;
use stackuser_tool::follow_store::FollowStore;
use stackuser_tool::stack_client::StackClient;
use stackuser_tool::store::Store;
use stackuser_tool::ui::{self, UI};
use std::env;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Where the followed-user set is persisted
    #[arg(long, default_value = "./var/follows.json")]
    follows_path: PathBuf,

    /// Fetch once and print the list instead of starting the interactive UI
    #[arg(long)]
    no_tui: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    dotenv().ok();

    // Optional; anonymous requests work against a smaller quota.
    let api_key = env::var("STACKAPPS_KEY").ok();
    let stack_client = StackClient::new(api_key);
    let follow_store = FollowStore::load(&args.follows_path)?;
    let store = Store::new(Box::new(stack_client), follow_store);

    if args.no_tui {
        store.load_users().await;
        let state = store.state();
        if let Some(error) = &state.error {
            eprintln!("{error}");
            std::process::exit(1);
        }
        for user in &state.users {
            let followed = if state.followed.contains(&user.user_id) {
                " *"
            } else {
                "  "
            };
            println!(
                "{:>10}{followed} {}  {}",
                user.reputation,
                user.display_name,
                user.location.as_deref().unwrap_or("")
            );
        }
        return Ok(());
    }

    let mut ui = UI::new()?;
    ui.render(&store.state())?;
    store.load_users().await;
    ui.render(&store.state())?;

    loop {
        match read()? {
            Event::Key(key_event) => {
                let state = store.state();
                if state.search_active {
                    match key_event.code {
                        KeyCode::Esc | KeyCode::Enter => store.set_search_active(false),
                        KeyCode::Backspace => {
                            let mut query = state.search_query.clone();
                            query.pop();
                            store.update_search_query(&query);
                        }
                        KeyCode::Char(ch) => {
                            let mut query = state.search_query.clone();
                            query.push(ch);
                            store.update_search_query(&query);
                        }
                        _ => (),
                    }
                    ui.render(&store.state())?;
                } else {
                    match key_event.code {
                        KeyCode::Esc => ui.render(&state)?,
                        KeyCode::Up => ui.move_selection(-1, &state)?,
                        KeyCode::Down => ui.move_selection(1, &state)?,
                        KeyCode::Char('f') => {
                            let selected = ui.selected_user(&state).map(|user| user.user_id);
                            if let Some(user_id) = selected {
                                store.toggle_follow(user_id);
                            }
                            ui.render(&store.state())?;
                        }
                        KeyCode::Tab => {
                            ui.toggle_view();
                            ui.render(&state)?;
                        }
                        KeyCode::Char('/') => {
                            store.set_search_active(true);
                            ui.render(&store.state())?;
                        }
                        KeyCode::Char('r') => {
                            store.retry().await;
                            ui.render(&store.state())?;
                        }
                        KeyCode::Char('i') => ui.log_selected_user(&state)?,
                        KeyCode::Char('q') => {
                            ui::reset();
                            std::process::exit(0);
                        }
                        _ => (),
                    }
                }
            }
            Event::Resize(cols, rows) => {
                ui.resize(cols, rows);
                ui.render(&store.state())?;
            }
            _ => (),
        }
    }
}
