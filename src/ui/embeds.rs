use serenity::all::{ChannelId, Colour, CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter, User};

use crate::ui::Page;
use crate::utils::mention_channel;

pub const COLOR_DEFAULT: Colour = Colour::new(0x6FCF97);
pub const COLOR_RED: Colour = Colour::new(0xDD2E44);
pub const LOADING_SPINNER: &str = "https://i.gifer.com/ZZ5H.gif";

pub fn parrot_embed() -> CreateEmbed {
    CreateEmbed::new().colour(COLOR_DEFAULT)
}

pub fn error_embed(text: impl Into<String>) -> CreateEmbed {
    CreateEmbed::new().colour(COLOR_RED).description(text)
}

pub fn notice_embed(text: impl Into<String>) -> CreateEmbed {
    parrot_embed().description(text)
}

pub fn scan_progress_text(channel: &str, collected: u64) -> String {
    format!("**Scanning {channel}...**\nCollected {collected} new messages...")
}

/// `who` is "you" when the invoker scanned for themselves, otherwise the target's name.
pub fn scan_complete_text(channel: &str, collected: u64, who: &str) -> String {
    let mut text = format!("**Scan in {channel} complete.**\nCollected {collected} new messages.");
    if collected == 0 {
        text.push_str(&format!("\n😕 Couldn't find any messages from {who} in this channel."));
    }
    text
}

/// `whose` is "your" or "<@target>'s".
pub fn scanning_notice_text(whose: &str) -> String {
    format!(
        "Parrot is now scanning this channel and learning from {whose} past messages.\n\
         This could take a few minutes.\n\
         Check your DMs to see its progress."
    )
}

fn scanning_for(target: &User) -> CreateEmbedFooter {
    CreateEmbedFooter::new(format!("Scanning for {}", target.name)).icon_url(target.face())
}

pub fn scan_status_embed(source: ChannelId, collected: u64, target: &User) -> CreateEmbed {
    parrot_embed()
        .description(scan_progress_text(&mention_channel(source.get()), collected))
        .author(CreateEmbedAuthor::new("Quickstart").icon_url(LOADING_SPINNER))
        .footer(scanning_for(target))
}

pub fn scan_complete_embed(source: ChannelId, collected: u64, target: &User, who: &str) -> CreateEmbed {
    let embed = parrot_embed()
        .description(scan_complete_text(&mention_channel(source.get()), collected, who))
        .author(CreateEmbedAuthor::new("✅ Quickstart"))
        .footer(scanning_for(target));
    if collected == 0 {
        embed.colour(COLOR_RED)
    } else {
        embed
    }
}

pub fn scan_failed_embed(source: ChannelId, collected: u64, target: &User) -> CreateEmbed {
    CreateEmbed::new()
        .colour(COLOR_RED)
        .author(CreateEmbedAuthor::new("❌ Quickstart"))
        .description(format!(
            "**Scan in {} stopped early.**\nCollected {collected} new messages before something went wrong.",
            mention_channel(source.get())
        ))
        .footer(scanning_for(target))
}

pub fn scanning_notice_embed(whose: &str) -> CreateEmbed {
    parrot_embed()
        .title("Quickstart is scanning")
        .description(scanning_notice_text(whose))
}

pub fn quickstart_channels_text(page: &Page<'_, String>) -> String {
    let mut text = String::from(
        "Quickstart is available in channels where Parrot can learn from your messages. \
         Try running Quickstart again in one of these channels:",
    );
    if page.items.is_empty() {
        text.push_str("\n*Parrot can't learn in any channels in this server yet.*");
    }
    for entry in page.items {
        text.push('\n');
        text.push_str(entry);
    }
    text
}

pub fn quickstart_channels_embed(page: &Page<'_, String>) -> CreateEmbed {
    parrot_embed()
        .title("Quickstart Channels")
        .description(quickstart_channels_text(page))
        .footer(CreateEmbedFooter::new(format!("Page {}/{}", page.index + 1, page.total)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::paginate;

    #[test]
    fn progress_text() {
        assert_eq!(
            scan_progress_text("<#1>", 0),
            "**Scanning <#1>...**\nCollected 0 new messages..."
        );
    }

    #[test]
    fn complete_text_explains_empty_scans() {
        assert_eq!(
            scan_complete_text("<#1>", 12, "you"),
            "**Scan in <#1> complete.**\nCollected 12 new messages."
        );
        let empty = scan_complete_text("<#1>", 0, "you");
        assert!(empty.ends_with("😕 Couldn't find any messages from you in this channel."));
    }

    #[test]
    fn notice_names_whose_messages() {
        assert!(scanning_notice_text("your").contains("learning from your past messages"));
        assert!(scanning_notice_text("<@5>'s").contains("learning from <@5>'s past messages"));
    }

    #[test]
    fn channel_list_lists_page_entries() {
        let entries = vec!["<#1>".to_string(), "<#2>".to_string()];
        let text = quickstart_channels_text(&paginate(&entries, 10, 0));
        assert!(text.ends_with("\n<#1>\n<#2>"));

        let none: Vec<String> = Vec::new();
        assert!(quickstart_channels_text(&paginate(&none, 10, 0)).contains("can't learn in any channels"));
    }
}
