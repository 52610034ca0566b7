//! YouTube URL rules

use url::Url;

pub const HOSTS: &[&str] = &["youtube.com", "www.youtube.com", "m.youtube.com", "youtu.be"];

const SHORT_LINK_HOST: &str = "youtu.be";

/// Path prefixes carrying the id as the next segment
const ID_PATH_PREFIXES: &[&str] = &["shorts", "embed", "live", "v"];

const WATCH_PAGE: &str = "https://www.youtube.com/watch";

pub fn watch_url(video_id: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("v", video_id)
        .finish();
    format!("{}?{}", WATCH_PAGE, query)
}

/// Extract the video id from a URL already known to be on a YouTube host
pub fn video_id(url: &Url) -> Option<String> {
    let host = url.host_str()?;

    if host.eq_ignore_ascii_case(SHORT_LINK_HOST) {
        return first_segment(url);
    }

    if let Some(id) = url
        .query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
    {
        return valid_id(&id);
    }

    let mut segments = url.path_segments()?;
    let prefix = segments.next()?;
    if ID_PATH_PREFIXES.contains(&prefix) {
        return segments.next().and_then(valid_id);
    }

    None
}

fn first_segment(url: &Url) -> Option<String> {
    url.path_segments()?.next().and_then(valid_id)
}

/// Video ids are URL-safe base64: anything else is not an id, even after decoding
fn valid_id(id: &str) -> Option<String> {
    let valid = !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    valid.then(|| id.to_string())
}
