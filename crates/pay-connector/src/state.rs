use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Opaque resume token owned by one connector for one (connector, kind) pair.
///
/// The engine stores and hands it back; it never looks inside. Connectors
/// that keep JSON cursors can use [`CursorState::from_json`] /
/// [`CursorState::to_json`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorState(Vec<u8>);

impl CursorState {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn from_json<T: Serialize>(v: &T) -> Result<Self, serde_json::Error> {
        Ok(Self(serde_json::to_vec(v)?))
    }

    /// `None` for the empty (never persisted) state.
    pub fn to_json<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        if self.0.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(&self.0).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct PageCursor {
        last_id: String,
    }

    #[test]
    fn empty_state_decodes_to_none() {
        let s = CursorState::empty();
        assert_eq!(s.to_json::<PageCursor>().unwrap(), None);
    }

    #[test]
    fn json_cursor_survives_storage() {
        let s = CursorState::from_json(&PageCursor {
            last_id: "py_9".into(),
        })
        .unwrap();
        let back: PageCursor = s.to_json().unwrap().unwrap();
        assert_eq!(back.last_id, "py_9");
    }
}
