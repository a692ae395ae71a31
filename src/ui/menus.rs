use serenity::all::ButtonStyle;
use serenity::builder::{CreateActionRow, CreateButton};

use crate::ui::Page;

pub const QUICKSTART_CHANNELS_PREFIX: &str = "qs:ch:";

/* Prev/next buttons for the Quickstart channel list */
pub fn quickstart_channels_row<T>(page: &Page<'_, T>) -> CreateActionRow {
    let prev = page.index.saturating_sub(1);
    let next = page.index + 1;
    CreateActionRow::Buttons(vec![
        CreateButton::new(format!("{QUICKSTART_CHANNELS_PREFIX}{prev}"))
            .label("◀ Previous")
            .style(ButtonStyle::Secondary)
            .disabled(page.index == 0),
        CreateButton::new(format!("{QUICKSTART_CHANNELS_PREFIX}{next}"))
            .label("Next ▶")
            .style(ButtonStyle::Secondary)
            .disabled(next >= page.total),
    ])
}
