use crate::stack_client::api;
use crate::store::UsersState;
use anyhow::Result;
use chrono::{Local, TimeZone};
use crossterm::style::{self, Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, size, Clear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::{cursor, execute, queue};
use std::io::{stdout, Write};
use unicode_truncate::UnicodeTruncateStr;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UIMode {
    Log,
    Interactive,
}

/// The two tabs of the original client: everyone, or just followed users.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum View {
    All,
    Following,
}

/// Which list the frontend should draw: the filtered subsequence when a
/// non-empty query is in effect, the full list otherwise (an empty query
/// filters down to nothing, so it falls back to the unfiltered list here).
pub fn visible_users(state: &UsersState) -> &[api::User] {
    match &state.filtered {
        Some(filtered) if !state.search_query.is_empty() => filtered,
        _ => &state.users,
    }
}

/// The rows for one view: the search-visible list, narrowed to followed
/// users on the Following view.
pub fn listed_users(state: &UsersState, view: View) -> Vec<&api::User> {
    let users = visible_users(state);
    match view {
        View::All => users.iter().collect(),
        View::Following => users
            .iter()
            .filter(|user| state.followed.contains(&user.user_id))
            .collect(),
    }
}

fn display_width(text: &str) -> u16 {
    let (_, width) = text.unicode_truncate(usize::MAX);
    width as u16
}

pub struct UI {
    mode: UIMode,
    view: View,
    cols: u16,
    rows: u16,
    selected_index: usize,
    view_offset: usize,
}

impl UI {
    pub fn new() -> Result<Self> {
        let (cols, rows) = size()?;
        Ok(Self {
            mode: UIMode::Log,
            view: View::All,
            cols,
            rows,
            selected_index: 0,
            view_offset: 0,
        })
    }

    pub fn selected_user<'a>(&self, state: &'a UsersState) -> Option<&'a api::User> {
        listed_users(state, self.view).get(self.selected_index).copied()
    }

    pub fn toggle_view(&mut self) {
        self.view = match self.view {
            View::All => View::Following,
            View::Following => View::All,
        };
        self.selected_index = 0;
        self.view_offset = 0;
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.cols = cols;
        self.rows = rows;
    }

    fn set_mode(&mut self, mode: UIMode) -> Result<()> {
        let prev_mode = self.mode;
        self.mode = mode;

        if prev_mode == UIMode::Log && mode == UIMode::Interactive {
            execute!(stdout(), EnterAlternateScreen)?;
            enable_raw_mode()?;
        } else if prev_mode == UIMode::Interactive && mode == UIMode::Log {
            execute!(stdout(), LeaveAlternateScreen)?;
            disable_raw_mode()?;
        }

        Ok(())
    }

    pub fn move_selection(&mut self, delta: isize, state: &UsersState) -> Result<()> {
        let num_visible = listed_users(state, self.view).len();
        if num_visible == 0 {
            return Ok(());
        }
        let new_index = self.selected_index.saturating_add_signed(delta);
        self.selected_index = new_index.min(num_visible - 1);

        let view_height = self.list_height() as usize;
        if self.selected_index < self.view_offset {
            self.view_offset = self.selected_index;
        } else if self.selected_index >= self.view_offset + view_height {
            self.view_offset = self.selected_index + 1 - view_height;
        }
        self.render(state)
    }

    /// Drops the terminal back to normal output and dumps the selected user.
    pub fn log_selected_user(&mut self, state: &UsersState) -> Result<()> {
        if let Some(user) = self.selected_user(state) {
            let user = user.clone();
            self.set_mode(UIMode::Log)?;
            println!("{user:?}");
        }
        Ok(())
    }

    fn list_height(&self) -> u16 {
        self.rows.saturating_sub(2)
    }

    pub fn render(&mut self, state: &UsersState) -> Result<()> {
        self.set_mode(UIMode::Interactive)?;

        let users = listed_users(state, self.view);
        // Clamp in case the visible list shrank under the cursor.
        self.selected_index = self.selected_index.min(users.len().saturating_sub(1));
        self.view_offset = self.view_offset.min(self.selected_index);

        let mut stdout = stdout();
        queue!(stdout, Clear(ClearType::All))?;

        if state.loading && users.is_empty() {
            queue!(stdout, cursor::MoveTo(0, 0))?;
            queue!(stdout, Print("Loading users..."))?;
        }

        for i in 0..self.list_height() {
            let index = self.view_offset + i as usize;
            let Some(user) = users.get(index) else {
                break;
            };

            let mut col_offset: u16 = 0;

            let reputation = format!("{:>10}  > ", user.reputation);
            queue!(stdout, cursor::MoveTo(col_offset, i))?;
            queue!(stdout, SetForegroundColor(Color::DarkGrey))?;
            queue!(stdout, style::Print(&reputation))?;
            queue!(stdout, ResetColor)?;
            col_offset += display_width(&reputation) + 1;

            let followed = state.followed.contains(&user.user_id);
            let toggling = state.toggling.contains(&user.user_id);
            let marker = if toggling {
                "~"
            } else if followed {
                "*"
            } else {
                " "
            };
            let name = format!("{marker} {}", user.display_name);
            queue!(stdout, cursor::MoveTo(col_offset, i))?;
            queue!(
                stdout,
                SetForegroundColor(if followed {
                    Color::Yellow
                } else {
                    Color::DarkCyan
                })
            )?;
            queue!(stdout, style::Print(&name))?;
            queue!(stdout, ResetColor)?;
            col_offset += display_width(&name) + 2;

            let last_seen = Local
                .timestamp_opt(user.last_access_date, 0)
                .single()
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "????-??-??".to_string());
            let location = user.location.as_deref().unwrap_or("");
            let detail = format!("{location}  (last seen {last_seen})");
            let (truncated, _) =
                detail.unicode_truncate(self.cols.saturating_sub(col_offset) as usize);
            queue!(stdout, cursor::MoveTo(col_offset, i))?;
            queue!(stdout, SetForegroundColor(Color::DarkGrey))?;
            queue!(stdout, style::Print(truncated))?;
            queue!(stdout, ResetColor)?;
        }

        self.render_search_line(state)?;
        self.render_status_bar(state)?;

        queue!(
            stdout,
            cursor::MoveTo(14, (self.selected_index - self.view_offset) as u16)
        )?;
        stdout.flush()?;
        Ok(())
    }

    fn render_search_line(&self, state: &UsersState) -> Result<()> {
        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, self.rows.saturating_sub(2)))?;
        if state.search_active {
            queue!(stdout, Print(format!("/ {}", state.search_query)))?;
        }
        Ok(())
    }

    fn render_status_bar(&self, state: &UsersState) -> Result<()> {
        let mut stdout = stdout();
        let num_visible = listed_users(state, self.view).len();

        queue!(stdout, cursor::MoveTo(0, self.rows.saturating_sub(1)))?;
        queue!(stdout, SetForegroundColor(Color::Black))?;
        queue!(stdout, SetBackgroundColor(Color::White))?;

        let view_tag = match self.view {
            View::All => "",
            View::Following => "[following] ",
        };
        let status = if let Some(error) = &state.error {
            format!("error: {error}  [r to retry]")
        } else if state.loading {
            "loading...".to_string()
        } else {
            format!(
                "{view_tag}{}/{} users, {} followed  [f follow, / search, tab view, r reload, q quit]",
                self.selected_index.min(num_visible.saturating_sub(1)),
                num_visible,
                state.followed.len()
            )
        };
        let (truncated, _) = status.unicode_truncate(self.cols as usize);
        queue!(stdout, Print(truncated))?;
        queue!(stdout, ResetColor)?;

        stdout.flush()?;
        Ok(())
    }
}

pub fn reset() {
    let _ = execute!(stdout(), LeaveAlternateScreen);
    let _ = disable_raw_mode();
}
