use serde::{Deserialize, Deserializer, Serialize};

use crate::types::Role;

/// One server-sent event of a streamed chat completion.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    /// Identifier shared by every chunk of one completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The incremental choices; greg only ever asks for one.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

/// A choice within a streamed chunk.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// Index of the choice.
    #[serde(default)]
    pub index: u32,

    /// The delta carried by this chunk; `null` reads as empty.
    #[serde(default, deserialize_with = "null_as_default")]
    pub delta: ChunkDelta,

    /// Set on the final chunk of the choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// The incremental content of a choice.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChunkDelta {
    /// Present on the first chunk only.  Roles greg does not know read as
    /// absent.
    #[serde(
        default,
        deserialize_with = "lenient_role",
        skip_serializing_if = "Option::is_none"
    )]
    pub role: Option<Role>,

    /// A text fragment, absent on role-only and finishing chunks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_role<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|role| serde_json::from_value(role).ok()))
}

impl ChatCompletionChunk {
    /// The text fragment of the first choice, if this chunk carries one.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
    }

    /// The finish reason of the first choice, if this is a finishing chunk.
    pub fn finish_reason(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.finish_reason.as_deref())
    }
}
