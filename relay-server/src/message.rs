//! Decoded callback message model.
//!
//! A decrypted envelope body is the vendor's XML message document. It is
//! decoded here once per request and re-serialized as compact JSON for the
//! downstream relay; fields absent from the XML are omitted from the JSON.

use serde::{Deserialize, Serialize};

/// One decoded vendor message.
///
/// Field names follow the vendor's PascalCase element names in both the
/// XML and the relayed JSON. Type-specific fields (`Content`, `PicUrl`,
/// `MediaId`, `Format`) are populated according to `MsgType`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "ToUserName", default, skip_serializing_if = "Option::is_none")]
    pub to_user_name: Option<String>,

    #[serde(rename = "FromUserName", default, skip_serializing_if = "Option::is_none")]
    pub from_user_name: Option<String>,

    #[serde(rename = "CreateTime", default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<u32>,

    #[serde(rename = "MsgType", default, skip_serializing_if = "Option::is_none")]
    pub msg_type: Option<String>,

    /// Image
    #[serde(rename = "PicUrl", default, skip_serializing_if = "Option::is_none")]
    pub pic_url: Option<String>,

    /// Text
    #[serde(rename = "Content", default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Image/Voice
    #[serde(rename = "MediaId", default, skip_serializing_if = "Option::is_none")]
    pub media_id: Option<String>,

    /// Voice
    #[serde(rename = "Format", default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(rename = "MsgId", default, skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<u64>,

    #[serde(rename = "AgentId", default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<u32>,
}

impl Envelope {
    /// Decode a decrypted envelope body.
    ///
    /// Unknown elements are ignored; the vendor adds fields over time.
    pub fn from_xml(raw: &[u8]) -> Result<Self, quick_xml::DeError> {
        quick_xml::de::from_reader(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_message_from_xml() {
        let raw = br#"<xml>
            <ToUserName><![CDATA[wx1]]></ToUserName>
            <FromUserName><![CDATA[user01]]></FromUserName>
            <CreateTime>1400000000</CreateTime>
            <MsgType><![CDATA[text]]></MsgType>
            <Content><![CDATA[hello relay]]></Content>
            <MsgId>6054768590064713728</MsgId>
            <AgentId>1000002</AgentId>
        </xml>"#;

        let envelope = Envelope::from_xml(raw).unwrap();

        assert_eq!(envelope.to_user_name.as_deref(), Some("wx1"));
        assert_eq!(envelope.from_user_name.as_deref(), Some("user01"));
        assert_eq!(envelope.create_time, Some(1400000000));
        assert_eq!(envelope.msg_type.as_deref(), Some("text"));
        assert_eq!(envelope.content.as_deref(), Some("hello relay"));
        assert_eq!(envelope.msg_id, Some(6054768590064713728));
        assert_eq!(envelope.agent_id, Some(1000002));
        assert_eq!(envelope.pic_url, None);
    }

    #[test]
    fn test_voice_message_from_xml() {
        let raw = br#"<xml>
            <MsgType><![CDATA[voice]]></MsgType>
            <MediaId><![CDATA[media-123]]></MediaId>
            <Format><![CDATA[amr]]></Format>
        </xml>"#;

        let envelope = Envelope::from_xml(raw).unwrap();
        assert_eq!(envelope.msg_type.as_deref(), Some("voice"));
        assert_eq!(envelope.media_id.as_deref(), Some("media-123"));
        assert_eq!(envelope.format.as_deref(), Some("amr"));
    }

    #[test]
    fn test_unknown_elements_ignored() {
        let raw = br#"<xml>
            <MsgType>text</MsgType>
            <Content>hi</Content>
            <SomeFutureField>zzz</SomeFutureField>
        </xml>"#;

        let envelope = Envelope::from_xml(raw).unwrap();
        assert_eq!(envelope.content.as_deref(), Some("hi"));
    }

    #[test]
    fn test_invalid_xml_rejected() {
        assert!(Envelope::from_xml(b"this is not xml at all <<<").is_err());
        assert!(Envelope::from_xml(b"").is_err());
    }

    #[test]
    fn test_relay_json_omits_absent_fields() {
        let envelope = Envelope {
            from_user_name: Some("user01".to_string()),
            msg_type: Some("text".to_string()),
            content: Some("hi".to_string()),
            ..Default::default()
        };

        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains("\"FromUserName\":\"user01\""));
        assert!(json.contains("\"Content\":\"hi\""));
        assert!(!json.contains("PicUrl"));
        assert!(!json.contains("MsgId"));
    }

    #[test]
    fn test_relay_json_round_trip() {
        let envelope = Envelope {
            to_user_name: Some("wx1".to_string()),
            msg_type: Some("image".to_string()),
            pic_url: Some("https://example.com/p.jpg".to_string()),
            media_id: Some("m1".to_string()),
            msg_id: Some(42),
            ..Default::default()
        };

        let json = serde_json::to_vec(&envelope).unwrap();
        let parsed: Envelope = serde_json::from_slice(&json).unwrap();
        assert_eq!(parsed, envelope);
    }
}
