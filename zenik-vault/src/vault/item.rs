//! Vault items: notes and logins.
//!
//! Items serialize as `{"type": "note" | "login", ...}` inside the encrypted
//! collection document. They carry no persistent id; within a loaded
//! snapshot an item is identified by its position.

use std::fmt;
use std::str::FromStr;

use chrono::Local;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Format of `created_at` / `updated_at`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Number of leading characters left visible by [`mask_secret`].
pub const MASK_KEEP: usize = 2;

/// Character used to hide the rest of a masked secret.
pub const MASK_CHAR: char = '*';

/// A single vault record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Item {
    Note {
        title: String,
        value: String,
        #[serde(default)]
        tags: Vec<String>,
        #[serde(default)]
        created_at: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        updated_at: Option<String>,
    },
    Login {
        title: String,
        username: String,
        password: String,
        #[serde(default)]
        url: String,
        #[serde(default)]
        note: String,
        #[serde(default)]
        tags: Vec<String>,
        #[serde(default)]
        created_at: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        updated_at: Option<String>,
    },
}

/// Which variant an item is, without its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Note,
    Login,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Note => write!(f, "note"),
            Self::Login => write!(f, "login"),
        }
    }
}

/// A single copyable field of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemField {
    Title,
    Username,
    Password,
    Url,
    Note,
    Value,
}

impl ItemField {
    /// Secret fields are masked on screen and auto-cleared from the clipboard.
    pub fn is_secret(&self) -> bool {
        matches!(self, Self::Password | Self::Value)
    }
}

impl fmt::Display for ItemField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Title => "title",
            Self::Username => "username",
            Self::Password => "password",
            Self::Url => "url",
            Self::Note => "note",
            Self::Value => "value",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ItemField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "title" => Ok(Self::Title),
            "username" | "user" => Ok(Self::Username),
            "password" | "pass" => Ok(Self::Password),
            "url" => Ok(Self::Url),
            "note" => Ok(Self::Note),
            "value" | "text" => Ok(Self::Value),
            other => Err(format!("unknown field '{}'", other)),
        }
    }
}

/// Input for a new login item.
#[derive(Debug, Clone, Default)]
pub struct NewLogin<'a> {
    pub title: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub url: Option<&'a str>,
    pub note: Option<&'a str>,
    /// Raw tag input, split on commas and whitespace.
    pub tags: &'a str,
}

/// Optional field changes applied by an edit. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct ItemEdit {
    pub title: Option<String>,
    pub value: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub url: Option<String>,
    pub note: Option<String>,
    /// Raw tag input replacing the whole tag set.
    pub tags: Option<String>,
}

/// Display record for one item, with the secret masked unless revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemView {
    pub kind: ItemKind,
    pub title: String,
    pub created_at: String,
    pub updated_at: Option<String>,
    /// Tags joined with ", ", empty when there are none.
    pub tags: String,
    pub username: Option<String>,
    pub url: Option<String>,
    pub note: Option<String>,
    /// Which field `secret` holds (`password` or `value`).
    pub secret_field: ItemField,
    pub secret: String,
    pub revealed: bool,
}

/// One-line description used when picking an item from a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemSummary {
    pub title: String,
    pub kind: ItemKind,
    pub tags: String,
}

impl fmt::Display for ItemSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.kind)?;
        if !self.tags.is_empty() {
            write!(f, " | tags: {}", self.tags)?;
        }
        Ok(())
    }
}

impl Item {
    pub fn kind(&self) -> ItemKind {
        match self {
            Item::Note { .. } => ItemKind::Note,
            Item::Login { .. } => ItemKind::Login,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Item::Note { title, .. } | Item::Login { title, .. } => title,
        }
    }

    pub fn tags(&self) -> &[String] {
        match self {
            Item::Note { tags, .. } | Item::Login { tags, .. } => tags,
        }
    }

    pub fn created_at(&self) -> &str {
        match self {
            Item::Note { created_at, .. } | Item::Login { created_at, .. } => created_at,
        }
    }

    pub fn updated_at(&self) -> Option<&str> {
        match self {
            Item::Note { updated_at, .. } | Item::Login { updated_at, .. } => {
                updated_at.as_deref()
            }
        }
    }

    /// The field that is masked on screen: `password` for logins, `value`
    /// for notes.
    pub fn secret_field(&self) -> ItemField {
        match self {
            Item::Note { .. } => ItemField::Value,
            Item::Login { .. } => ItemField::Password,
        }
    }

    /// Raw value of `field`, or `None` if the variant has no such field.
    pub fn field(&self, field: ItemField) -> Option<&str> {
        match (self, field) {
            (_, ItemField::Title) => Some(self.title()),
            (Item::Note { value, .. }, ItemField::Value) => Some(value),
            (Item::Login { username, .. }, ItemField::Username) => Some(username),
            (Item::Login { password, .. }, ItemField::Password) => Some(password),
            (Item::Login { url, .. }, ItemField::Url) => Some(url),
            (Item::Login { note, .. }, ItemField::Note) => Some(note),
            _ => None,
        }
    }

    /// True if the tag set contains `tag` after normalization.
    pub fn has_tag(&self, tag: &str) -> bool {
        let wanted = tag.trim().to_lowercase();
        self.tags().iter().any(|t| *t == wanted)
    }

    pub fn summary(&self) -> ItemSummary {
        ItemSummary {
            title: self.title().to_string(),
            kind: self.kind(),
            tags: format_tags(self.tags()),
        }
    }

    /// Build the display record. The secret is masked unless `reveal` is set;
    /// revealing is a sensitive event the caller is expected to log.
    pub fn view(&self, reveal: bool) -> ItemView {
        let secret_field = self.secret_field();
        let raw = self.field(secret_field).unwrap_or_default();
        let secret = if reveal {
            raw.to_string()
        } else {
            mask_secret(raw)
        };

        let (username, url, note) = match self {
            Item::Note { .. } => (None, None, None),
            Item::Login {
                username, url, note, ..
            } => (
                Some(username.clone()),
                Some(url.clone()),
                (!note.is_empty()).then(|| note.clone()),
            ),
        };

        ItemView {
            kind: self.kind(),
            title: self.title().to_string(),
            created_at: self.created_at().to_string(),
            updated_at: self.updated_at().map(str::to_string),
            tags: format_tags(self.tags()),
            username,
            url,
            note,
            secret_field,
            secret,
            revealed: reveal,
        }
    }

    /// Overwrite secret fields in place. Used before an item is dropped.
    pub(crate) fn wipe_secrets(&mut self) {
        match self {
            Item::Note { value, .. } => value.zeroize(),
            Item::Login { password, .. } => password.zeroize(),
        }
    }
}

/// Current local time in the item timestamp format.
pub fn now_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Normalize raw tag input into an ordered set.
///
/// Commas and whitespace both separate tags; tags are lower-cased and
/// de-duplicated keeping the first occurrence.
pub fn parse_tags(input: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for raw in input.split(|c: char| c == ',' || c.is_whitespace()) {
        let tag = raw.trim().to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// Join tags for display.
pub fn format_tags(tags: &[String]) -> String {
    tags.join(", ")
}

/// Partially redact a secret for on-screen display.
///
/// Keeps the first [`MASK_KEEP`] characters. Secrets of that length or
/// shorter are fully masked; the empty string stays empty.
pub fn mask_secret(secret: &str) -> String {
    let len = secret.chars().count();
    if len == 0 {
        return String::new();
    }
    if len <= MASK_KEEP {
        return MASK_CHAR.to_string().repeat(len);
    }

    let mut masked: String = secret.chars().take(MASK_KEEP).collect();
    masked.extend(std::iter::repeat(MASK_CHAR).take(len - MASK_KEEP));
    masked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login() -> Item {
        Item::Login {
            title: "Gmail".into(),
            username: "me@example.com".into(),
            password: "hunter22".into(),
            url: "https://mail.google.com".into(),
            note: String::new(),
            tags: vec!["mail".into(), "personal".into()],
            created_at: "2024-01-02 03:04:05".into(),
            updated_at: None,
        }
    }

    #[test]
    fn test_parse_tags_normalizes() {
        assert_eq!(parse_tags("Work, work  WORK"), vec!["work"]);
        assert_eq!(parse_tags("b,a  B c"), vec!["b", "a", "c"]);
        assert!(parse_tags("  , ,").is_empty());
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "");
        assert_eq!(mask_secret("a"), "*");
        assert_eq!(mask_secret("ab"), "**");
        assert_eq!(mask_secret("abcdef"), "ab****");
        assert_eq!(mask_secret("pässwört"), "pä******");
    }

    #[test]
    fn test_login_json_shape() {
        let json = serde_json::to_value(login()).unwrap();
        assert_eq!(json["type"], "login");
        assert_eq!(json["username"], "me@example.com");
        assert_eq!(json["note"], "");
        assert!(json.get("updated_at").is_none());
    }

    #[test]
    fn test_note_deserializes_without_optional_fields() {
        let item: Item = serde_json::from_str(
            r#"{"type":"note","title":"Wifi","value":"pw123","created_at":"2024-01-01 00:00:00"}"#,
        )
        .unwrap();
        assert_eq!(item.kind(), ItemKind::Note);
        assert!(item.tags().is_empty());
        assert_eq!(item.updated_at(), None);
    }

    #[test]
    fn test_view_masks_by_default() {
        let item = login();

        let masked = item.view(false);
        assert_eq!(masked.secret, "hu******");
        assert_eq!(masked.secret_field, ItemField::Password);
        assert_eq!(masked.tags, "mail, personal");
        assert_eq!(masked.note, None);
        assert!(!masked.revealed);

        let revealed = item.view(true);
        assert_eq!(revealed.secret, "hunter22");
        assert!(revealed.revealed);
    }

    #[test]
    fn test_field_access_by_variant() {
        let item = login();
        assert_eq!(item.field(ItemField::Username), Some("me@example.com"));
        assert_eq!(item.field(ItemField::Value), None);
        assert!(item.has_tag(" MAIL "));
        assert!(!item.has_tag("work"));
    }

    #[test]
    fn test_summary_line() {
        assert_eq!(
            login().summary().to_string(),
            "Gmail (login) | tags: mail, personal"
        );
    }

    #[test]
    fn test_item_field_from_str() {
        assert_eq!("Password".parse::<ItemField>(), Ok(ItemField::Password));
        assert_eq!("user".parse::<ItemField>(), Ok(ItemField::Username));
        assert!("colour".parse::<ItemField>().is_err());
    }
}
