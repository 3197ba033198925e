//! Stateless presentation: header, profile panel, and post layout.
//!
//! Pure formatting over the data the core publishes; no state, no I/O, no
//! store access.

use feed_core::{MAX_BODY_CHARS, Post};

pub const PAGE_TITLE: &str = "My Wall";

pub const PROFILE_NAME: &str = "Danyael Dela Cruz";

pub const PROFILE_BIO: &str = "My name is Danyael, but feel free to call me Yael. I am a 5th \
    year Computer Science student from the University of the Philippines Diliman. I am a \
    full-stack developer with a passion for creating well designed and functional \
    applications. I am also a tech and finance enthusiast. I love playing video games, \
    watching movies and series, and reading books in my spare time. Currently, I am studying \
    to become a Cloud Engineer.";

/// Page header with the live-mode indicator.
pub fn header(live: bool) -> String {
    let mode = if live { "live" } else { "offline" };
    format!("=== {} [{}] ===\n", PAGE_TITLE, mode)
}

/// The profile panel.
pub fn profile() -> String {
    format!("{}\n{}\n", PROFILE_NAME, PROFILE_BIO)
}

/// A single post: author, display date, body, optional photo line.
pub fn post(post: &Post) -> String {
    let mut out = format!("{} · {}\n{}\n", post.author, post.display_date(), post.body);
    if let Some(url) = &post.photo_url {
        out.push_str(&format!("[photo] {}\n", url));
    }
    out
}

/// The whole displayed feed, posts separated by blank lines.
pub fn feed(posts: &[Post]) -> String {
    let mut out = String::new();
    for p in posts {
        out.push_str(&post(p));
        out.push('\n');
    }
    out
}

/// Composer status line shown under the input.
pub fn composer_status(remaining: usize, has_image: bool) -> String {
    let image = if has_image { " [image attached]" } else { "" };
    format!("{}/{} characters remaining{}", remaining, MAX_BODY_CHARS, image)
}
