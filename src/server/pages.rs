//! HTML pages for browsing albums.
//!
//! Pages are rendered with `format!` into a shared layout. Every album or
//! photo name is HTML-escaped; names placed in URLs are percent-encoded
//! first.

use crate::album::{photo_title, AlbumInfo, PhotoNeighbors, Tier};

/// Escape HTML special characters to prevent XSS attacks.
fn html_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// Site-relative URL of a photo page or one of its renditions.
fn photo_url(album: &AlbumInfo, photo: &str, suffix: &str) -> String {
    format!("{}{}/{}", album.url(), urlencoding::encode(photo), suffix)
}

/// Wrap `body` in the common page chrome.
///
/// `authenticated` shows the link that drops all remembered passwords.
fn layout(title: &str, body: &str, authenticated: bool) -> String {
    let forget = if authenticated {
        r#"<a class="forget" href="/forget-passwords">Forget passwords</a>"#
    } else {
        ""
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <link rel="stylesheet" href="/static/style.css">
</head>
<body>
    <header>
        <a class="home" href="/">Albums</a>
        {forget}
    </header>
    <main>
{body}
    </main>
</body>
</html>
"#,
        title = html_escape(title),
        forget = forget,
        body = body,
    )
}

/// Index page listing albums newest first.
pub fn index_page(albums: &[std::sync::Arc<AlbumInfo>], authenticated: bool) -> String {
    let mut body = String::from("        <ul class=\"albums\">\n");

    for album in albums {
        let lock = if album.tier == Tier::Protected {
            r#" <span class="lock" title="Password required">&#128274;</span>"#
        } else {
            ""
        };
        body.push_str(&format!(
            r#"            <li>
                <a href="{url}">
                    <img src="{preview}" alt="" width="288" height="96">
                    <span class="title">{title}</span>{lock}
                    <span class="date">{date}</span>
                </a>
            </li>
"#,
            url = html_escape(&album.url()),
            preview = html_escape(&album.preview_url()),
            title = html_escape(album.title()),
            lock = lock,
            date = album.created_display(),
        ));
    }

    if albums.is_empty() {
        body.push_str("            <li class=\"empty\">No albums yet.</li>\n");
    }
    body.push_str("        </ul>");

    layout("Albums", &body, authenticated)
}

/// Album page with a thumbnail grid.
pub fn album_page(album: &AlbumInfo, authenticated: bool) -> String {
    let mut body = format!(
        "        <h1>{}</h1>\n        <ul class=\"photos\">\n",
        html_escape(album.title())
    );

    for photo in &album.photos {
        body.push_str(&format!(
            "            <li><a href=\"{page}\"><img src=\"{thumb}\" alt=\"{title}\"></a></li>\n",
            page = html_escape(&photo_url(album, photo, "")),
            thumb = html_escape(&photo_url(album, photo, "thumbnail")),
            title = html_escape(photo_title(photo)),
        ));
    }
    body.push_str("        </ul>");

    layout(album.title(), &body, authenticated)
}

/// Photo detail page with previous/next navigation.
pub fn photo_page(
    album: &AlbumInfo,
    photo: &str,
    neighbors: &PhotoNeighbors,
    authenticated: bool,
) -> String {
    let title = photo_title(photo);

    let previous = match &neighbors.previous {
        Some(previous) => format!(
            r#"<a class="previous" href="{}">Previous</a>"#,
            html_escape(&photo_url(album, previous, ""))
        ),
        None => String::new(),
    };
    let next = match &neighbors.next {
        Some(next) => format!(
            r#"<a class="next" href="{}">Next</a>"#,
            html_escape(&photo_url(album, next, ""))
        ),
        None => String::new(),
    };

    let body = format!(
        r#"        <h1><a href="{album_url}">{album_title}</a> / {title}</h1>
        <nav>{previous} {next}</nav>
        <a href="{original}"><img class="display" src="{display}" alt="{title}"></a>"#,
        album_url = html_escape(&album.url()),
        album_title = html_escape(album.title()),
        title = html_escape(title),
        previous = previous,
        next = next,
        original = html_escape(&photo_url(album, photo, "original")),
        display = html_escape(&photo_url(album, photo, "display")),
    );

    layout(title, &body, authenticated)
}

/// Password form for a protected or private album.
///
/// The form posts back to `/authenticate` with the same album and redirect.
pub fn authenticate_page(album: &AlbumInfo, redirect: &str, wrong: bool) -> String {
    let action = format!(
        "/authenticate?album={}&redirect={}",
        urlencoding::encode(&album.name),
        urlencoding::encode(redirect)
    );
    let warning = if wrong {
        "        <p class=\"wrong\">Wrong password, try again.</p>\n"
    } else {
        ""
    };

    let body = format!(
        r#"        <h1>{title}</h1>
{warning}        <form method="post" action="{action}">
            <label>Password <input type="password" name="password" autofocus></label>
            <button type="submit">Open album</button>
        </form>"#,
        title = html_escape(album.title()),
        warning = warning,
        action = html_escape(&action),
    );

    layout(album.title(), &body, false)
}
