use colored::Colorize;
use gallery::endpoints::Endpoint;
use gallery::model::{Album, EntityId, Photo, User};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const DEFAULT_LINE_WIDTH: usize = 100;
const ID_WIDTH: usize = 5;

/// Terminal width, or a fixed width when stdout is not a terminal.
pub(super) fn line_width() -> usize {
    console::Term::stdout()
        .size_checked()
        .map(|(_, cols)| cols as usize)
        .unwrap_or(DEFAULT_LINE_WIDTH)
}

pub(super) fn print_success(message: &str) {
    println!("{}", message.green());
}

pub(super) fn print_info(message: &str) {
    println!("{}", message.dimmed());
}

/// An error shown in place of content that failed to load.
pub(super) fn print_inline_error(indent: usize, message: &str) {
    println!("{}{}", " ".repeat(indent), message.red());
}

pub(super) fn render_users(users: &[User], width: usize) -> String {
    if users.is_empty() {
        return format!("{}\n", "No users.".dimmed());
    }
    users
        .iter()
        .map(|user| render_row(0, &user.id, &user.name, None, width))
        .collect()
}

pub(super) fn render_albums(indent: usize, albums: &[Album], width: usize) -> String {
    if albums.is_empty() {
        return format!("{}{}\n", " ".repeat(indent), "No albums.".dimmed());
    }
    albums
        .iter()
        .map(|album| render_row(indent, &album.id, &album.title, None, width))
        .collect()
}

pub(super) fn render_photos(indent: usize, photos: &[Photo], width: usize) -> String {
    if photos.is_empty() {
        return format!("{}{}\n", " ".repeat(indent), "No photos.".dimmed());
    }
    photos
        .iter()
        .map(|photo| render_row(indent, &photo.id, &photo.title, Some(photo.url.as_str()), width))
        .collect()
}

pub(super) fn render_endpoints<'a>(endpoints: impl Iterator<Item = &'a Endpoint>) -> String {
    let mut output = String::new();
    for endpoint in endpoints {
        output.push_str(&format!(
            "{:<14} {:<9} {:<7} {}\n",
            endpoint.name.bold(),
            endpoint.kind.to_string().dimmed(),
            endpoint.method.to_string().yellow(),
            endpoint.path
        ));
    }
    output
}

fn render_row(indent: usize, id: &EntityId, label: &str, detail: Option<&str>, width: usize) -> String {
    let prefix = " ".repeat(indent);
    let id_str = format!("{:>w$}.", id, w = ID_WIDTH);
    let fixed = indent + id_str.width() + 1;
    let available = width.saturating_sub(fixed);

    let detail_text = detail.filter(|d| !d.is_empty()).map(|d| format!("  {}", d));
    let detail_width = detail_text.as_deref().map_or(0, UnicodeWidthStr::width);

    // The label keeps priority; the detail is dropped before the label is cut.
    let (label, detail_text) = if label.width() + detail_width <= available {
        (label.to_string(), detail_text)
    } else {
        (truncate_to_width(label, available), None)
    };

    format!(
        "{}{} {}{}\n",
        prefix,
        id_str.yellow(),
        label,
        detail_text.map(|d| d.dimmed().to_string()).unwrap_or_default()
    )
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }

    let mut result = String::new();
    let mut current_width = 0;
    let limit = max_width.saturating_sub(1);

    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > limit {
            break;
        }
        result.push(c);
        current_width += char_width;
    }
    result.push('…');
    result
}
