//! Minimal XML-RPC client used to fingerprint endpoints.
//!
//! Discovery only ever issues parameterless calls such as `system.listMethods`,
//! so this is not a general XML-RPC library: it encodes a `methodCall`, decodes
//! a `methodResponse` (or `fault`), and reports transport failures with the
//! full response context attached.
//!
//! The [`XmlRpcTransport`] trait is the seam the discovery protocol talks to;
//! [`HttpXmlRpcTransport`] is the default network-backed implementation.

use crate::config::HttpConfig;
use crate::error::{TransportError, TransportErrorKind};
use crate::fetcher::{build_client, read_body};
use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;
use url::Url;

/// A decoded XML-RPC value.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcValue {
    /// `<string>` or untyped `<value>` text.
    String(String),
    /// `<int>`, `<i4>`, or `<i8>`.
    Int(i64),
    /// `<boolean>`.
    Bool(bool),
    /// `<double>`.
    Double(f64),
    /// `<array>`.
    Array(Vec<RpcValue>),
    /// `<struct>`, members in document order.
    Struct(Vec<(String, RpcValue)>),
    /// `<base64>`, kept encoded.
    Base64(String),
    /// `<dateTime.iso8601>`, kept as text.
    DateTime(String),
    /// `<nil/>`.
    Nil,
}

impl RpcValue {
    /// The string payload, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The value as a list of strings, if it is an array containing only strings.
    ///
    /// This is the shape of a `system.listMethods` reply.
    #[must_use]
    pub fn as_string_list(&self) -> Option<Vec<&str>> {
        match self {
            Self::Array(items) => items.iter().map(Self::as_str).collect(),
            _ => None,
        }
    }

    /// Look up a struct member by name.
    #[must_use]
    pub fn member(&self, name: &str) -> Option<&Self> {
        match self {
            Self::Struct(members) => members.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }
}

/// A successful XML-RPC exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcResponse {
    /// The decoded return value.
    pub value: RpcValue,
    /// The URL that finally answered, after any redirects the HTTP layer followed.
    pub url: Option<Url>,
    /// HTTP status of the final response.
    pub status: u16,
}

/// Something that can invoke an XML-RPC method on an endpoint.
#[async_trait]
pub trait XmlRpcTransport: Send + Sync {
    /// Call `method` on `endpoint`.
    ///
    /// Failures must keep the resolved URL, HTTP status, and body whenever a
    /// response was received.
    async fn call(
        &self,
        endpoint: &Url,
        method: &str,
        params: &[RpcValue],
    ) -> Result<RpcResponse, TransportError>;
}

/// XML-RPC over HTTP POST, with a fresh client per call.
#[derive(Debug, Clone, Default)]
pub struct HttpXmlRpcTransport {
    config: HttpConfig,
}

impl HttpXmlRpcTransport {
    /// Create a transport using the given HTTP settings.
    #[must_use]
    pub const fn new(config: HttpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl XmlRpcTransport for HttpXmlRpcTransport {
    async fn call(
        &self,
        endpoint: &Url,
        method: &str,
        params: &[RpcValue],
    ) -> Result<RpcResponse, TransportError> {
        let client = build_client(&self.config)?;
        let body = encode_method_call(method, params);

        debug!(endpoint = %endpoint, method, "Calling XML-RPC method");

        let response = client
            .post(endpoint.clone())
            .header(CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;

        let url = response.url().clone();
        let status = response.status();
        let bytes = read_body(response, self.config.max_body_bytes).await?;

        if !status.is_success() {
            let kind = if status == StatusCode::UNAUTHORIZED {
                TransportErrorKind::UserCancelledAuth
            } else {
                TransportErrorKind::HttpStatus
            };
            return Err(TransportError::new(kind, format!("HTTP {status} from {url}"))
                .with_url(url)
                .with_status(status.as_u16())
                .with_body(bytes));
        }

        let text = String::from_utf8_lossy(&bytes);
        match decode_method_response(&text) {
            Ok(MethodResponse::Value(value)) => Ok(RpcResponse {
                value,
                url: Some(url),
                status: status.as_u16(),
            }),
            Ok(MethodResponse::Fault { code, message }) => Err(TransportError::new(
                TransportErrorKind::Fault,
                format!("XML-RPC fault {code}: {message}"),
            )
            .with_url(url)
            .with_status(status.as_u16())
            .with_body(bytes.clone())),
            Err(reason) => Err(TransportError::new(
                TransportErrorKind::InvalidResponse,
                format!("Response from {url} is not XML-RPC: {reason}"),
            )
            .with_url(url)
            .with_status(status.as_u16())
            .with_body(bytes.clone())),
        }
    }
}

/// Decoded `methodResponse` payload.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResponse {
    /// A normal return value.
    Value(RpcValue),
    /// A `<fault>` reply.
    Fault {
        /// `faultCode`.
        code: i64,
        /// `faultString`.
        message: String,
    },
}

/// Encode a `methodCall` document.
#[must_use]
pub fn encode_method_call(method: &str, params: &[RpcValue]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\"?><methodCall><methodName>");
    xml.push_str(&escape(method));
    xml.push_str("</methodName><params>");
    for param in params {
        xml.push_str("<param>");
        encode_value(&mut xml, param);
        xml.push_str("</param>");
    }
    xml.push_str("</params></methodCall>");
    xml
}

fn encode_value(xml: &mut String, value: &RpcValue) {
    xml.push_str("<value>");
    match value {
        RpcValue::String(s) => {
            xml.push_str("<string>");
            xml.push_str(&escape(s.as_str()));
            xml.push_str("</string>");
        },
        RpcValue::Int(i) => xml.push_str(&format!("<int>{i}</int>")),
        RpcValue::Bool(b) => xml.push_str(&format!("<boolean>{}</boolean>", u8::from(*b))),
        RpcValue::Double(d) => xml.push_str(&format!("<double>{d}</double>")),
        RpcValue::Array(items) => {
            xml.push_str("<array><data>");
            for item in items {
                encode_value(xml, item);
            }
            xml.push_str("</data></array>");
        },
        RpcValue::Struct(members) => {
            xml.push_str("<struct>");
            for (name, member) in members {
                xml.push_str("<member><name>");
                xml.push_str(&escape(name.as_str()));
                xml.push_str("</name>");
                encode_value(xml, member);
                xml.push_str("</member>");
            }
            xml.push_str("</struct>");
        },
        RpcValue::Base64(s) => {
            xml.push_str("<base64>");
            xml.push_str(s);
            xml.push_str("</base64>");
        },
        RpcValue::DateTime(s) => {
            xml.push_str("<dateTime.iso8601>");
            xml.push_str(&escape(s.as_str()));
            xml.push_str("</dateTime.iso8601>");
        },
        RpcValue::Nil => xml.push_str("<nil/>"),
    }
    xml.push_str("</value>");
}

/// Decode a `methodResponse` document.
///
/// Returns a description of the problem when the document is not a well-formed
/// XML-RPC response (an HTML page, a truncated body, an unknown value type).
pub fn decode_method_response(xml: &str) -> Result<MethodResponse, String> {
    let root = parse_tree(xml)?;
    let response = root
        .child("methodResponse")
        .ok_or_else(|| "missing <methodResponse>".to_string())?;

    if let Some(fault) = response.child("fault") {
        let value = decode_value(
            fault
                .child("value")
                .ok_or_else(|| "<fault> without <value>".to_string())?,
        )?;
        let code = match value.member("faultCode") {
            Some(RpcValue::Int(code)) => *code,
            _ => 0,
        };
        let message = value
            .member("faultString")
            .and_then(RpcValue::as_str)
            .unwrap_or_default()
            .to_string();
        return Ok(MethodResponse::Fault { code, message });
    }

    let value = response
        .child("params")
        .and_then(|p| p.child("param"))
        .and_then(|p| p.child("value"))
        .ok_or_else(|| "missing <params><param><value>".to_string())?;

    decode_value(value).map(MethodResponse::Value)
}

fn decode_value(node: &Node) -> Result<RpcValue, String> {
    let Some(typed) = node.children.first() else {
        return Ok(RpcValue::String(node.text.clone()));
    };

    let text = typed.text.trim();
    match typed.name.as_str() {
        "string" => Ok(RpcValue::String(typed.text.clone())),
        "int" | "i4" | "i8" => text
            .parse()
            .map(RpcValue::Int)
            .map_err(|e| format!("bad integer '{text}': {e}")),
        "boolean" => match text {
            "1" => Ok(RpcValue::Bool(true)),
            "0" => Ok(RpcValue::Bool(false)),
            other => Err(format!("bad boolean '{other}'")),
        },
        "double" => text
            .parse()
            .map(RpcValue::Double)
            .map_err(|e| format!("bad double '{text}': {e}")),
        "array" => {
            let data = typed
                .child("data")
                .ok_or_else(|| "<array> without <data>".to_string())?;
            data.children
                .iter()
                .filter(|c| c.name == "value")
                .map(decode_value)
                .collect::<Result<Vec<_>, _>>()
                .map(RpcValue::Array)
        },
        "struct" => typed
            .children
            .iter()
            .filter(|c| c.name == "member")
            .map(|member| {
                let name = member
                    .child("name")
                    .ok_or_else(|| "<member> without <name>".to_string())?;
                let value = member
                    .child("value")
                    .ok_or_else(|| "<member> without <value>".to_string())?;
                Ok((name.text.trim().to_string(), decode_value(value)?))
            })
            .collect::<Result<Vec<_>, String>>()
            .map(RpcValue::Struct),
        "base64" => Ok(RpcValue::Base64(text.to_string())),
        "dateTime.iso8601" => Ok(RpcValue::DateTime(text.to_string())),
        "nil" => Ok(RpcValue::Nil),
        other => Err(format!("unknown value type <{other}>")),
    }
}

/// Bare-bones element tree; XML-RPC needs nothing more.
#[derive(Debug, Default)]
struct Node {
    name: String,
    text: String,
    children: Vec<Node>,
}

impl Node {
    fn named(name: &[u8]) -> Self {
        Self {
            name: String::from_utf8_lossy(name).into_owned(),
            ..Self::default()
        }
    }

    fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|c| c.name == name)
    }
}

fn parse_tree(xml: &str) -> Result<Node, String> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut stack = vec![Node::default()];

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => stack.push(Node::named(e.local_name().as_ref())),
            Ok(Event::Empty(e)) => {
                let node = Node::named(e.local_name().as_ref());
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(node);
                }
            },
            Ok(Event::End(_)) => {
                let node = stack.pop().ok_or_else(|| "unbalanced XML".to_string())?;
                let parent = stack
                    .last_mut()
                    .ok_or_else(|| "unbalanced XML".to_string())?;
                parent.children.push(node);
            },
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|e| e.to_string())?;
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&text);
                }
            },
            Ok(Event::CData(e)) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&String::from_utf8_lossy(&e));
                }
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("XML parse error: {e}")),
            _ => {},
        }
        buf.clear();
    }

    if stack.len() != 1 {
        return Err("unexpected end of document".to_string());
    }
    stack.pop().ok_or_else(|| "empty document".to_string())
}
