use bytes::{Bytes, BytesMut};

/// Default upload file name for a recorded utterance
pub const DEFAULT_FILE_NAME: &str = "audio.webm";

/// One finalized recording of a single user turn
///
/// Not `Clone`: an utterance is handed to the relay exactly once.
#[derive(Debug)]
pub struct Utterance {
    data: Bytes,
    mime_type: String,
    file_name: String,
}

impl Utterance {
    pub fn new(data: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
            file_name: DEFAULT_FILE_NAME.to_string(),
        }
    }

    /// Join fragments in the order they arrived
    pub fn from_fragments(fragments: Vec<Bytes>, mime_type: impl Into<String>) -> Self {
        let total = fragments.iter().map(Bytes::len).sum();
        let mut buf = BytesMut::with_capacity(total);
        for fragment in fragments {
            buf.extend_from_slice(&fragment);
        }
        Self::new(buf.freeze(), mime_type)
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}
