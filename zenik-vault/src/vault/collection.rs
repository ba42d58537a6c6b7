//! In-memory item collection.
//!
//! `ItemStore` is also the plaintext document that gets encrypted to disk:
//! it serializes as `{"items": [...]}`. All mutations either fully apply or
//! return an error without touching the collection.

use std::io;

use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use super::error::{VaultError, VaultResult};
use super::item::{now_timestamp, parse_tags, Item, ItemEdit, NewLogin};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStore {
    #[serde(default)]
    items: Vec<Item>,
}

fn require(field: &str, value: &str) -> VaultResult<()> {
    if value.trim().is_empty() {
        return Err(VaultError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> VaultResult<&Item> {
        self.items.get(index).ok_or(VaultError::Index {
            index,
            len: self.items.len(),
        })
    }

    /// Append a note. Title and text are both required.
    pub fn add_note(&mut self, title: &str, value: &str, tags: &str) -> VaultResult<Item> {
        let title = title.trim();
        let value = value.trim_end();
        require("title", title)?;
        require("note text", value)?;

        let item = Item::Note {
            title: title.to_string(),
            value: value.to_string(),
            tags: parse_tags(tags),
            created_at: now_timestamp(),
            updated_at: None,
        };
        self.items.push(item.clone());
        debug!("Added note at position {}", self.items.len() - 1);
        Ok(item)
    }

    /// Append a login. Title, username and password are required.
    ///
    /// The password is stored exactly as given; everything else is trimmed.
    pub fn add_login(&mut self, login: NewLogin<'_>) -> VaultResult<Item> {
        let title = login.title.trim();
        let username = login.username.trim();
        require("title", title)?;
        require("username", username)?;
        require("password", login.password)?;

        let item = Item::Login {
            title: title.to_string(),
            username: username.to_string(),
            password: login.password.to_string(),
            url: login.url.unwrap_or_default().trim().to_string(),
            note: login.note.unwrap_or_default().trim().to_string(),
            tags: parse_tags(login.tags),
            created_at: now_timestamp(),
            updated_at: None,
        };
        self.items.push(item.clone());
        debug!("Added login at position {}", self.items.len() - 1);
        Ok(item)
    }

    /// Remove the item at `index`, keeping the order of the rest.
    pub fn delete(&mut self, index: usize) -> VaultResult<Item> {
        self.get(index)?;
        Ok(self.items.remove(index))
    }

    /// Put an item back at `index`. Used to undo a delete whose save failed.
    pub(crate) fn insert(&mut self, index: usize, item: Item) {
        let index = index.min(self.items.len());
        self.items.insert(index, item);
    }

    /// Drop the most recently appended item. Used to undo an add whose save
    /// failed.
    pub(crate) fn pop(&mut self) -> Option<Item> {
        self.items.pop()
    }

    /// Swap in `item` at `index` and return what was there.
    pub(crate) fn replace(&mut self, index: usize, item: Item) -> VaultResult<Item> {
        let len = self.items.len();
        let slot = self
            .items
            .get_mut(index)
            .ok_or(VaultError::Index { index, len })?;
        Ok(std::mem::replace(slot, item))
    }

    /// Apply `edit` to the item at `index` and return the previous version.
    ///
    /// The edited item is validated with the same rules as a new one and gets
    /// a fresh `updated_at`; `created_at` never changes.
    pub fn edit(&mut self, index: usize, edit: &ItemEdit) -> VaultResult<Item> {
        let mut updated = self.get(index)?.clone();

        match &mut updated {
            Item::Note {
                title, value, tags, ..
            } => {
                for (name, given) in [
                    ("username", &edit.username),
                    ("password", &edit.password),
                    ("url", &edit.url),
                    ("note", &edit.note),
                ] {
                    if given.is_some() {
                        return Err(VaultError::Validation(format!(
                            "{} does not apply to a note",
                            name
                        )));
                    }
                }
                if let Some(new) = &edit.title {
                    *title = new.trim().to_string();
                }
                if let Some(new) = &edit.value {
                    *value = new.trim_end().to_string();
                }
                if let Some(new) = &edit.tags {
                    *tags = parse_tags(new);
                }
                require("title", title)?;
                require("note text", value)?;
            }
            Item::Login {
                title,
                username,
                password,
                url,
                note,
                tags,
                ..
            } => {
                if edit.value.is_some() {
                    return Err(VaultError::Validation(
                        "value does not apply to a login".into(),
                    ));
                }
                if let Some(new) = &edit.title {
                    *title = new.trim().to_string();
                }
                if let Some(new) = &edit.username {
                    *username = new.trim().to_string();
                }
                if let Some(new) = &edit.password {
                    *password = new.clone();
                }
                if let Some(new) = &edit.url {
                    *url = new.trim().to_string();
                }
                if let Some(new) = &edit.note {
                    *note = new.trim().to_string();
                }
                if let Some(new) = &edit.tags {
                    *tags = parse_tags(new);
                }
                require("title", title)?;
                require("username", username)?;
                require("password", password)?;
            }
        }

        match &mut updated {
            Item::Note { updated_at, .. } | Item::Login { updated_at, .. } => {
                *updated_at = Some(now_timestamp());
            }
        }

        self.replace(index, updated)
    }

    /// Case-insensitive substring search over each item's serialized form,
    /// written with `", "` and `": "` separators.
    ///
    /// An empty query matches nothing. Results keep storage order and carry
    /// their position.
    pub fn search(&self, query: &str) -> Vec<(usize, &Item)> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }

        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| {
                search_text(item)
                    .map(|blob| Zeroizing::new(blob.to_lowercase()).contains(&query))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Items in storage order, optionally only those carrying `tag_filter`.
    ///
    /// A blank filter is the same as no filter.
    pub fn list(&self, tag_filter: Option<&str>) -> Vec<(usize, &Item)> {
        let filter = tag_filter
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty());

        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| match &filter {
                Some(tag) => item.has_tag(tag),
                None => true,
            })
            .collect()
    }
}

/// JSON formatter with a space after every `,` and `:`.
struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

fn search_text(item: &Item) -> Option<Zeroizing<String>> {
    let mut buf = Zeroizing::new(Vec::new());
    let mut ser = serde_json::Serializer::with_formatter(&mut *buf, SpacedFormatter);
    item.serialize(&mut ser).ok()?;
    let text = std::str::from_utf8(&buf).ok()?;
    Some(Zeroizing::new(text.to_string()))
}

impl Drop for ItemStore {
    fn drop(&mut self) {
        for item in &mut self.items {
            item.wipe_secrets();
        }
    }
}
