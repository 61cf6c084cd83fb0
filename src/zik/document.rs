//! Reply document model.
//!
//! A reply payload is an XML document rooted at `<answer path="...">`. It is
//! parsed into a small node tree so the info decoders can look up the subtree
//! they are bound to, e.g. `/system/battery` in:
//!
//! ```xml
//! <answer path="/api/system/battery/get"><system><battery state="in_use" percent="80"/></system></answer>
//! ```
//!
//! A device-side failure is reported as `<answer path="..."><error/></answer>`.

use std::str;

use quick_xml::{
   Reader,
   events::{BytesStart, Event},
};
use smallvec::SmallVec;
use smol_str::SmolStr;
use thiserror::Error;

use crate::zik::protocol::API_ROOT;

const ANSWER: &str = "answer";
const ERROR: &str = "error";

/// Error type for reply document parsing.
#[derive(Error, Debug)]
pub enum ParseError {
   #[error("reply contains no markup")]
   Empty,

   #[error("reply is not valid UTF-8")]
   InvalidUtf8,

   #[error("XML error: {0}")]
   Xml(#[from] quick_xml::Error),

   #[error("element <{0}> is never closed")]
   Unclosed(String),

   #[error("closing tag without a matching opening tag")]
   UnmatchedClose,

   #[error("more than one top-level element")]
   MultipleRoots,

   #[error("unexpected top-level element <{0}>")]
   UnexpectedRoot(String),

   #[error("<{node}> is missing required attribute '{attribute}'")]
   MissingAttribute {
      node: String,
      attribute: &'static str,
   },
}

type Attributes = SmallVec<[(SmolStr, String); 4]>;

/// One element of a reply document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
   name: SmolStr,
   attributes: Attributes,
   children: Vec<Node>,
}

impl Node {
   fn from_start(start: &BytesStart<'_>) -> Result<Self, ParseError> {
      let qname = start.name();
      let name = str::from_utf8(qname.as_ref()).map_err(|_| ParseError::InvalidUtf8)?;

      let mut attributes = Attributes::new();
      for attr in start.attributes() {
         let attr = attr.map_err(quick_xml::Error::from)?;
         let key = str::from_utf8(attr.key.as_ref()).map_err(|_| ParseError::InvalidUtf8)?;
         let value = attr.unescape_value()?;
         attributes.push((SmolStr::new(key), value.into_owned()));
      }

      Ok(Self {
         name: SmolStr::new(name),
         attributes,
         children: Vec::new(),
      })
   }

   pub fn name(&self) -> &str {
      &self.name
   }

   pub fn attribute(&self, key: &str) -> Option<&str> {
      self
         .attributes
         .iter()
         .find(|(k, _)| k == key)
         .map(|(_, v)| v.as_str())
   }

   pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
      self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
   }

   pub fn children(&self) -> &[Node] {
      &self.children
   }

   pub fn child(&self, name: &str) -> Option<&Node> {
      self.children.iter().find(|c| c.name == name)
   }
}

/// Parsed form of one reply payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
   path: String,
   root: Node,
}

impl Document {
   /// Builds the node tree for a reply payload.
   ///
   /// Bytes preceding the first `<` are ignored; some firmware revisions
   /// prefix the markup with a short binary header.
   pub fn parse(payload: &[u8]) -> Result<Self, ParseError> {
      let start = payload
         .iter()
         .position(|&b| b == b'<')
         .ok_or(ParseError::Empty)?;
      let text = str::from_utf8(&payload[start..]).map_err(|_| ParseError::InvalidUtf8)?;

      let mut reader = Reader::from_str(text.trim_end_matches('\0'));
      reader.config_mut().trim_text(true);

      let mut stack: Vec<Node> = Vec::new();
      let mut root = None;
      loop {
         match reader.read_event()? {
            Event::Start(e) => stack.push(Node::from_start(&e)?),
            Event::Empty(e) => attach(&mut stack, &mut root, Node::from_start(&e)?)?,
            Event::End(_) => {
               let node = stack.pop().ok_or(ParseError::UnmatchedClose)?;
               attach(&mut stack, &mut root, node)?;
            },
            Event::Eof => break,
            _ => {},
         }
      }

      if let Some(open) = stack.last() {
         return Err(ParseError::Unclosed(open.name.to_string()));
      }
      Self::from_root(root.ok_or(ParseError::Empty)?)
   }

   fn from_root(root: Node) -> Result<Self, ParseError> {
      match root.name() {
         ANSWER => {
            let path = root
               .attribute("path")
               .ok_or_else(|| ParseError::MissingAttribute {
                  node: ANSWER.to_owned(),
                  attribute: "path",
               })?
               .to_owned();
            Ok(Self { path, root })
         },
         ERROR => Ok(Self {
            path: String::new(),
            root,
         }),
         other => Err(ParseError::UnexpectedRoot(other.to_owned())),
      }
   }

   /// The request path echoed by the device, e.g. `/api/system/battery/get`.
   pub fn path(&self) -> &str {
      &self.path
   }

   pub fn root(&self) -> &Node {
      &self.root
   }

   /// Whether the device answered with an error marker.
   pub fn has_error(&self) -> bool {
      self.root.name() == ERROR
         || matches!(self.root.children(), [only] if only.name() == ERROR)
   }

   /// Locates the node at `path`, relative to the answer element.
   ///
   /// A leading `/api` is accepted and ignored, so request paths can be
   /// passed as-is when the reply nests the data at the same location.
   pub fn find_subtree(&self, path: &str) -> Option<&Node> {
      let relative = match path.strip_prefix(API_ROOT) {
         Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
         _ => path,
      };

      relative
         .split('/')
         .filter(|segment| !segment.is_empty())
         .try_fold(&self.root, |node, segment| node.child(segment))
   }
}

fn attach(stack: &mut [Node], root: &mut Option<Node>, node: Node) -> Result<(), ParseError> {
   if let Some(parent) = stack.last_mut() {
      parent.children.push(node);
      Ok(())
   } else if root.is_none() {
      *root = Some(node);
      Ok(())
   } else {
      Err(ParseError::MultipleRoots)
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   const BATTERY: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<answer path="/api/system/battery/get">
  <system>
    <battery state="discharging" percent="42"/>
  </system>
</answer>"#;

   #[test]
   fn test_parse_battery_reply() {
      let doc = Document::parse(BATTERY.as_bytes()).unwrap();

      assert_eq!(doc.path(), "/api/system/battery/get");
      assert!(!doc.has_error());

      let battery = doc.find_subtree("/system/battery").unwrap();
      assert_eq!(battery.name(), "battery");
      assert_eq!(battery.attribute("state"), Some("discharging"));
      assert_eq!(battery.attribute("percent"), Some("42"));
      assert_eq!(battery.attribute("missing"), None);
      assert_eq!(battery.attributes().count(), 2);
   }

   #[test]
   fn test_binary_prelude_is_skipped() {
      let mut payload = vec![0x01, 0x00, 0x00, 0x00];
      payload.extend_from_slice(BATTERY.as_bytes());
      payload.push(0);

      let doc = Document::parse(&payload).unwrap();
      assert!(doc.find_subtree("/system/battery").is_some());
   }

   #[test]
   fn test_find_subtree_accepts_request_prefix() {
      let doc = Document::parse(BATTERY.as_bytes()).unwrap();

      assert!(doc.find_subtree("/api/system/battery").is_some());
      assert_eq!(doc.find_subtree("/api/system").unwrap().name(), "system");
      assert!(doc.find_subtree("/system/color").is_none());
      assert!(doc.find_subtree("/audio/noise_control").is_none());
      assert!(doc.find_subtree("/apiary/system").is_none());
   }

   #[test]
   fn test_error_document() {
      let doc = Document::parse(br#"<answer path="/api/audio/volume/get"><error/></answer>"#).unwrap();
      assert!(doc.has_error());

      let doc = Document::parse(b"<error/>").unwrap();
      assert!(doc.has_error());

      // An error node next to data is not an error document.
      let doc = Document::parse(
         br#"<answer path="/api/x/get"><error/><system pi="1"/></answer>"#,
      )
      .unwrap();
      assert!(!doc.has_error());
   }

   #[test]
   fn test_nested_children_keep_order() {
      let doc = Document::parse(
         br#"<answer path="/api/audio/track/metadata/get"><audio><track><metadata playing="true" title="A"/></track><source type="a2dp"/></audio></answer>"#,
      )
      .unwrap();

      let audio = doc.find_subtree("/audio").unwrap();
      let names: Vec<_> = audio.children().iter().map(Node::name).collect();
      assert_eq!(names, ["track", "source"]);
      assert_eq!(
         doc.find_subtree("/audio/track/metadata").unwrap().attribute("title"),
         Some("A")
      );
   }

   #[test]
   fn test_escaped_attribute_values() {
      let doc = Document::parse(
         br#"<answer path="/api/bluetooth/friendlyname/get"><bluetooth friendlyname="Tom &amp; Jerry"/></answer>"#,
      )
      .unwrap();
      assert_eq!(
         doc.find_subtree("/bluetooth").unwrap().attribute("friendlyname"),
         Some("Tom & Jerry")
      );
   }

   #[test]
   fn test_structural_errors() {
      assert!(matches!(Document::parse(b""), Err(ParseError::Empty)));
      assert!(matches!(Document::parse(b"\x00\x01"), Err(ParseError::Empty)));
      assert!(Document::parse(br#"<answer path="/x"><system>"#).is_err());
      assert!(Document::parse(br#"<answer path="/x"><system></audio></answer>"#).is_err());
      assert!(matches!(
         Document::parse(br#"<answer path="/x"/><answer path="/y"/>"#),
         Err(ParseError::MultipleRoots)
      ));
      assert!(matches!(
         Document::parse(b"<answer><system/></answer>"),
         Err(ParseError::MissingAttribute { attribute: "path", .. })
      ));
      assert!(matches!(
         Document::parse(br#"<notify path="/api/x"/>"#),
         Err(ParseError::UnexpectedRoot(name)) if name == "notify"
      ));
   }
}
