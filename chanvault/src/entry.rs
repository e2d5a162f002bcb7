//! Flat, serializable archive entries.
//!
//! One [`MessageEntry`] is one line of a snapshot file. Entries are plain
//! value structs built field-by-field by the normalizer — nothing here
//! references the platform client, and nothing is shared between entries
//! (attachments and users are copied inline). Once written, an entry is
//! never modified.

use chanvault_api::types::Snowflake;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One archived message. The channel is implied by the snapshot file and
/// deliberately not stored per entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEntry {
    pub id: Snowflake,
    pub author: UserEntry,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reactions: Vec<ReactionEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<EmbedEntry>,
}

/// A restricted projection of a platform user record: identity and avatar
/// URLs only, no tokens, no behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEntry {
    pub id: Snowflake,
    pub username: String,
    pub display_avatar_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Attachment metadata, owned exclusively by its message entry. The
/// binary content lives beside the snapshot under its deterministic
/// attachment path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentEntry {
    pub id: Snowflake,
    pub filename: String,
    pub url: String,
    #[serde(default)]
    pub spoiler: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// An emoji annotation with its reacting users fully materialized at
/// archive time.
///
/// `partial` is set when the platform reported more reacting users than
/// one page holds. Deeper pagination is disabled because the platform's
/// boundary cursor does not reliably advance past the first page for this
/// resource, so rather than claim completeness the entry records that the
/// list may be truncated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionEntry {
    pub emoji: String,
    pub users: Vec<UserEntry>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub partial: bool,
}

/// Rich-content metadata, reduced to whitelisted URL/text/dimension
/// fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedMediaEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedMediaEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<EmbedMediaEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooterEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<EmbedProviderEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthorEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedMediaEntry {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedFooterEntry {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedProviderEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedAuthorEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_icon_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_serializes_without_empty_collections() {
        let entry = MessageEntry {
            id: Snowflake(42),
            author: UserEntry {
                id: Snowflake(7),
                username: "len".to_string(),
                display_avatar_url: "https://cdn.example.test/7.png".to_string(),
                avatar_url: None,
            },
            content: "hello".to_string(),
            created_at: Utc::now(),
            attachments: Vec::new(),
            reactions: Vec::new(),
            embeds: Vec::new(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["id"], "42");
        assert!(json.get("attachments").is_none());
        assert!(json.get("reactions").is_none());
        assert!(json.get("channel").is_none());
    }

    #[test]
    fn partial_flag_omitted_when_complete() {
        let reaction = ReactionEntry {
            emoji: "🔥".to_string(),
            users: Vec::new(),
            partial: false,
        };
        let json = serde_json::to_value(&reaction).unwrap();
        assert!(json.get("partial").is_none());

        let truncated = ReactionEntry {
            partial: true,
            ..reaction
        };
        let json = serde_json::to_value(&truncated).unwrap();
        assert_eq!(json["partial"], true);
    }
}
