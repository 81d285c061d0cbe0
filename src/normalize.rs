//! Reshaping of upstream search responses.
//!
//! The unofficial API has no documented schema and has changed shape before,
//! so every field is read defensively: a missing `results` array yields an
//! empty list, and a malformed item is logged and skipped.

use serde_json::{Map, Value};

use crate::models::SimplifiedSong;

const UNKNOWN_TITLE: &str = "Unknown Title";
const UNKNOWN_ARTIST: &str = "Unknown Artist";
const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Entities decoded by [`decode_html_entities`], in application order.
const ENTITIES: [(&str, &str); 5] = [
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
];

/// Decode the handful of named entities the upstream leaves in text fields.
///
/// Entities are replaced one after the other, `&amp;` first, and no entity
/// is revisited afterwards. A double-encoded `&amp;lt;` therefore ends up as
/// `<`, while `&lt;amp;` stays `<amp;`.
pub fn decode_html_entities(text: &str) -> String {
    ENTITIES.iter().fold(text.to_string(), |acc, (entity, literal)| {
        acc.replace(entity, literal)
    })
}

/// Like [`decode_html_entities`] for arbitrary JSON; non-strings pass through.
pub fn decode_html_entities_value(value: Value) -> Value {
    match value {
        Value::String(text) => Value::String(decode_html_entities(&text)),
        other => other,
    }
}

/// Reason a single result item could not be read.
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error("field `{field}` has unexpected type: expected {expected}, found {found}")]
    UnexpectedShape {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Read a text field; falsy or absent values are `None`.
fn text_field<'a>(
    value: Option<&'a Value>,
    field: &'static str,
) -> Result<Option<&'a str>, ItemError> {
    match value {
        None => Ok(None),
        Some(v) if is_falsy(v) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(ItemError::UnexpectedShape {
            field,
            expected: "string",
            found: type_name(other),
        }),
    }
}

fn object_field<'a>(
    value: &'a Value,
    field: &'static str,
) -> Result<&'a Map<String, Value>, ItemError> {
    value.as_object().ok_or(ItemError::UnexpectedShape {
        field,
        expected: "object",
        found: type_name(value),
    })
}

/// First primary artist name. Shapes other than a list of objects count as
/// "no artist"; only a `null` first entry is an error.
fn primary_artist(more_info: &Map<String, Value>) -> Result<Option<&str>, ItemError> {
    let Some(first) = more_info
        .get("artistMap")
        .and_then(Value::as_object)
        .and_then(|artist_map| artist_map.get("primary_artists"))
        .and_then(Value::as_array)
        .and_then(|primary| primary.first())
    else {
        return Ok(None);
    };

    match first {
        Value::Null => Err(ItemError::UnexpectedShape {
            field: "more_info.artistMap.primary_artists[0]",
            expected: "object",
            found: "null",
        }),
        Value::Object(artist) => {
            text_field(artist.get("name"), "more_info.artistMap.primary_artists[0].name")
        }
        _ => Ok(None),
    }
}

/// Upscale thumbnail URLs to the 500x500 rendition.
fn upscale_image(image: &str) -> String {
    image.replace("150x150", "500x500").replace("50x50", "500x500")
}

/// Convert one `type == "song"` item, or `None` if it is unusable.
fn parse_song(item: &Value, more_info: &Value) -> Result<Option<SimplifiedSong>, ItemError> {
    let more_info = object_field(more_info, "more_info")?;

    let name = text_field(item.get("title"), "title")?.unwrap_or(UNKNOWN_TITLE);
    let artist = primary_artist(more_info)?.unwrap_or(UNKNOWN_ARTIST);
    let album = text_field(more_info.get("album"), "more_info.album")?.unwrap_or(UNKNOWN_ALBUM);

    let image = match item.get("image") {
        Some(Value::String(image)) => upscale_image(image),
        _ => String::new(),
    };

    let song_url = text_field(
        more_info.get("encrypted_media_url"),
        "more_info.encrypted_media_url",
    )?
    .unwrap_or_default();

    if song_url.is_empty() || name == UNKNOWN_TITLE {
        return Ok(None);
    }

    Ok(Some(SimplifiedSong {
        name: decode_html_entities(name),
        artist: decode_html_entities(artist),
        album: decode_html_entities(album),
        image,
        song_url: song_url.to_string(),
    }))
}

/// Reduce a raw search response to the playable songs it contains.
///
/// Never fails: an unexpected top-level shape is logged and produces an
/// empty list, and items that cannot be read are logged and skipped.
pub fn normalize_search_results(response: &Value) -> Vec<SimplifiedSong> {
    let Some(results) = response.get("results").and_then(Value::as_array) else {
        tracing::warn!(
            received = %response,
            "Search response has no `results` array; the upstream format may have changed"
        );
        return Vec::new();
    };

    results
        .iter()
        .filter(|item| item.get("type").and_then(Value::as_str) == Some("song"))
        .filter_map(|item| {
            let more_info = item.get("more_info").filter(|v| !is_falsy(v))?;
            match parse_song(item, more_info) {
                Ok(song) => song,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        item = %item,
                        "Skipping unreadable search result"
                    );
                    None
                }
            }
        })
        .collect()
}
