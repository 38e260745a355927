//! Regex-based parsing of `xmlapi2/plays` responses.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::BggError;

static PLAYS_ROOT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<plays\b([^>]*)>").unwrap());
static PLAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<play\s([^>]*?)(?:/>|>(.*?)</play>)").unwrap());
static ITEM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<item\s([^>]*?)/?>").unwrap());
static COMMENTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<comments>(.*?)</comments>").unwrap());
static PLAYER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<player\s([^>]*?)/?>").unwrap());
static ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([\w:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());
static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#x[0-9a-fA-F]+|#[0-9]+|amp|lt|gt|quot|apos);").unwrap());

/// BGG answers an unknown username with an HTML-ish error snippet instead of
/// an empty `<plays>` document.
const UNKNOWN_USER_MARKER: &str = "Invalid object or user";

/// One page of a user's play history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaysPage {
    /// Total plays across all pages, as declared by the root element.
    pub total: u32,
    pub page: u32,
    pub plays: Vec<BggPlay>,
}

/// A logged play as BGG reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BggPlay {
    pub id: String,
    pub date: String,
    pub quantity: u32,
    pub length_minutes: Option<i64>,
    pub incomplete: bool,
    pub location: Option<String>,
    pub game_name: String,
    pub game_bgg_id: Option<String>,
    pub comments: Option<String>,
    pub players: Vec<BggPlayer>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BggPlayer {
    pub username: Option<String>,
    pub name: String,
    pub score: Option<String>,
    pub color: Option<String>,
    pub win: bool,
    pub new: bool,
}

impl BggPlay {
    /// Session keys this play expands into. A play logged with quantity `q`
    /// stands for `q` sessions on the same day: the first keeps the BGG id,
    /// the k-th becomes `"<id>-<k>"`.
    pub fn dedup_keys(&self) -> Vec<String> {
        (1..=self.quantity.max(1))
            .map(|k| {
                if k == 1 {
                    self.id.clone()
                } else {
                    format!("{}-{k}", self.id)
                }
            })
            .collect()
    }
}

impl BggPlayer {
    /// Name shown on the session: the display name, else the BGG username.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            self.username.as_deref().unwrap_or("")
        } else {
            &self.name
        }
    }
}

/// Parse one `xmlapi2/plays` response body.
pub fn parse_plays_page(xml: &str) -> Result<PlaysPage, BggError> {
    let Some(root) = PLAYS_ROOT_RE.captures(xml) else {
        if xml.contains(UNKNOWN_USER_MARKER) {
            return Ok(PlaysPage::default());
        }
        return Err(BggError::Parse("missing <plays> root element".into()));
    };
    let root_attrs = attributes(&root[1]);
    let total = root_attrs
        .get("total")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let page = root_attrs
        .get("page")
        .and_then(|v| v.parse().ok())
        .unwrap_or(1);

    let plays = PLAY_RE
        .captures_iter(xml)
        .map(|cap| {
            let attrs = attributes(&cap[1]);
            let body = cap.get(2).map_or("", |m| m.as_str());
            parse_play(&attrs, body)
        })
        .collect();

    Ok(PlaysPage { total, page, plays })
}

fn parse_play(attrs: &HashMap<String, String>, body: &str) -> BggPlay {
    let item = ITEM_RE
        .captures(body)
        .map(|cap| attributes(&cap[1]))
        .unwrap_or_default();
    let comments = COMMENTS_RE
        .captures(body)
        .map(|cap| decode_entities(cap[1].trim()))
        .filter(|s| !s.is_empty());
    let players = PLAYER_RE
        .captures_iter(body)
        .map(|cap| {
            let p = attributes(&cap[1]);
            BggPlayer {
                username: non_empty(p.get("username")),
                name: p.get("name").cloned().unwrap_or_default(),
                score: non_empty(p.get("score")),
                color: non_empty(p.get("color")),
                win: flag(p.get("win")),
                new: flag(p.get("new")),
            }
        })
        .collect();

    BggPlay {
        id: attrs.get("id").cloned().unwrap_or_default(),
        date: attrs.get("date").cloned().unwrap_or_default(),
        quantity: attrs
            .get("quantity")
            .and_then(|v| v.parse().ok())
            .unwrap_or(1),
        length_minutes: attrs
            .get("length")
            .and_then(|v| v.parse().ok())
            .filter(|m| *m > 0),
        incomplete: flag(attrs.get("incomplete")),
        location: non_empty(attrs.get("location")),
        game_name: item.get("name").cloned().unwrap_or_default(),
        game_bgg_id: non_empty(item.get("objectid")),
        comments,
        players,
    }
}

/// Attribute map of one start tag, with entities decoded.
fn attributes(tag: &str) -> HashMap<String, String> {
    ATTR_RE
        .captures_iter(tag)
        .map(|cap| {
            let raw = cap.get(2).or_else(|| cap.get(3)).map_or("", |m| m.as_str());
            (cap[1].to_string(), decode_entities(raw))
        })
        .collect()
}

fn non_empty(v: Option<&String>) -> Option<String> {
    v.map(|s| s.trim()).filter(|s| !s.is_empty()).map(str::to_string)
}

fn flag(v: Option<&String>) -> bool {
    v.is_some_and(|s| s == "1" || s.eq_ignore_ascii_case("true"))
}

/// Decode the five predefined XML entities and numeric character references.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    ENTITY_RE
        .replace_all(s, |cap: &regex::Captures<'_>| {
            let entity = &cap[1];
            match entity {
                "amp" => "&".to_string(),
                "lt" => "<".to_string(),
                "gt" => ">".to_string(),
                "quot" => "\"".to_string(),
                "apos" => "'".to_string(),
                _ => {
                    let code = if let Some(hex) = entity.strip_prefix("#x") {
                        u32::from_str_radix(hex, 16).ok()
                    } else {
                        entity[1..].parse().ok()
                    };
                    code.and_then(char::from_u32)
                        .map(String::from)
                        .unwrap_or_else(|| cap[0].to_string())
                }
            }
        })
        .into_owned()
}
