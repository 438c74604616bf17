use serde::{Deserialize, Serialize};

/// One received SMS, as delivered by the native broadcast source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsEvent {
    pub raw_text: String,
}

impl SmsEvent {
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
        }
    }

    /// Assemble a multipart SMS from its PDU bodies, in arrival order.
    ///
    /// Parts that failed to decode arrive as empty strings and are skipped.
    pub fn from_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut raw_text = String::new();
        for part in parts {
            let part = part.as_ref();
            if !part.is_empty() {
                raw_text.push_str(part);
            }
        }
        Self { raw_text }
    }
}
